//! Edge and expected-value scoring for one candidate.
//!
//! edge_itm   = market P(ITM) - model P(ITM)
//! edge_touch = market P(touch) - model P(touch)
//! EV/share   = premium - model P(ITM) * E[K - S_T | ITM]
//! EV/contract = 100 * EV/share
//!
//! Model values are the mean over whichever simulators produced an outcome.

use super::filters::PricedQuote;
use crate::state::{EdgeRecord, ModelBreakdown};

/// Shares per listed equity option contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Mean of the present values. Absent values are ignored; if every value is
/// absent the result is absent.
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Simulator outputs averaged across models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConsensus {
    pub prob_itm: f64,
    pub prob_touch: f64,
    pub avg_shortfall_given_itm: f64,
}

impl ModelConsensus {
    pub fn from_breakdown(models: &ModelBreakdown) -> Option<Self> {
        let outcomes = models.outcomes();
        Some(Self {
            prob_itm: mean_present(outcomes.iter().map(|o| o.map(|o| o.prob_itm)))?,
            prob_touch: mean_present(outcomes.iter().map(|o| o.map(|o| o.prob_touch)))?,
            avg_shortfall_given_itm: mean_present(
                outcomes.iter().map(|o| o.map(|o| o.avg_shortfall_given_itm)),
            )?,
        })
    }
}

/// Market-implied side of a candidate.
#[derive(Debug, Clone, Copy)]
pub struct MarketView {
    pub iv: f64,
    pub prob_itm: f64,
    pub prob_touch: f64,
}

/// Build the scored record. `None` when no simulator could price the scenario.
pub fn score(
    candidate: &PricedQuote,
    expiry: &str,
    market: MarketView,
    models: ModelBreakdown,
) -> Option<EdgeRecord> {
    let consensus = ModelConsensus::from_breakdown(&models)?;

    let edge_itm = market.prob_itm - consensus.prob_itm;
    let edge_touch = market.prob_touch - consensus.prob_touch;
    let imbalance_itm_ratio = if consensus.prob_itm > 0.0 {
        Some(market.prob_itm / consensus.prob_itm)
    } else {
        None
    };

    let premium = candidate.mid;
    let ev_per_share = premium - consensus.prob_itm * consensus.avg_shortfall_given_itm;
    let ev_per_contract = ev_per_share * CONTRACT_MULTIPLIER;

    let q = &candidate.quote;
    Some(EdgeRecord {
        expiry: expiry.to_string(),
        strike: q.strike,
        bid: q.bid,
        ask: q.ask,
        mid: candidate.mid,
        iv: market.iv,
        spread_pct: candidate.spread_pct,
        volume: q.volume,
        open_interest: q.open_interest,
        market_prob_itm: market.prob_itm,
        market_prob_touch: market.prob_touch,
        model_prob_itm: consensus.prob_itm,
        model_prob_touch: consensus.prob_touch,
        avg_shortfall_given_itm: consensus.avg_shortfall_given_itm,
        edge_itm,
        edge_touch,
        imbalance_itm_ratio,
        ev_per_share,
        ev_per_contract,
        models,
    })
}
