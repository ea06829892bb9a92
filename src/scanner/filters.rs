use crate::chain::types::OptionQuote;
use crate::state::{EdgeRecord, ScanParameters};
use std::cmp::Ordering;

/// A quote that survived the pre-simulation filters, with derived prices.
#[derive(Debug, Clone)]
pub struct PricedQuote {
    pub quote: OptionQuote,
    pub mid: f64,
    pub spread_pct: f64,
}

/// Pre-simulation filters, applied in order:
///   1. bid > 0
///   2. derive mid and spread %
///   3. strike < spot (when otm_only)
///   4. strike inside [spot - far_otm_max, spot - far_otm_min]
///   5. spread % <= max_spread_pct and mid >= min_premium
pub fn prefilter(chain: &[OptionQuote], spot: f64, params: &ScanParameters) -> Vec<PricedQuote> {
    let quoted: Vec<PricedQuote> = chain
        .iter()
        .filter(|q| q.bid > 0.0)
        .map(|q| PricedQuote {
            quote: q.clone(),
            mid: q.mid(),
            spread_pct: q.spread_pct(),
        })
        .collect();
    tracing::debug!(remaining = quoted.len(), total = chain.len(), "stage: bid > 0");

    let otm: Vec<PricedQuote> = quoted
        .into_iter()
        .filter(|c| !params.otm_only || c.quote.strike < spot)
        .collect();
    tracing::debug!(remaining = otm.len(), otm_only = params.otm_only, "stage: otm");

    let (lower, upper) = params.strike_band(spot);
    let banded: Vec<PricedQuote> = otm
        .into_iter()
        .filter(|c| c.quote.strike >= lower && c.quote.strike <= upper)
        .collect();
    tracing::debug!(remaining = banded.len(), lower, upper, "stage: strike band");

    let tradable: Vec<PricedQuote> = banded
        .into_iter()
        .filter(|c| c.spread_pct <= params.max_spread_pct && c.mid >= params.min_premium)
        .collect();
    tracing::debug!(remaining = tradable.len(), "stage: spread + premium");

    tradable
}

/// Post-scoring filters: liquidity first, then minimum edge.
pub fn postfilter(records: Vec<EdgeRecord>, params: &ScanParameters) -> Vec<EdgeRecord> {
    let liquid: Vec<EdgeRecord> = records
        .into_iter()
        .filter(|r| r.volume >= params.min_volume && r.open_interest >= params.min_oi)
        .collect();
    tracing::debug!(remaining = liquid.len(), "stage: liquidity");

    let edged: Vec<EdgeRecord> = liquid
        .into_iter()
        .filter(|r| r.edge_itm >= params.min_edge)
        .collect();
    tracing::debug!(remaining = edged.len(), min_edge = params.min_edge, "stage: min edge");

    edged
}

/// Best edge first; EV per contract breaks ties. Stable.
pub fn rank(records: &mut [EdgeRecord]) {
    records.sort_by(compare_ranked);
}

#[inline]
fn compare_ranked(a: &EdgeRecord, b: &EdgeRecord) -> Ordering {
    b.edge_itm
        .total_cmp(&a.edge_itm)
        .then_with(|| b.ev_per_contract.total_cmp(&a.ev_per_contract))
}
