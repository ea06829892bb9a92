pub mod edge;
pub mod filters;

use crate::chain::types::OptionQuote;
use crate::errors::{EngineError, EngineResult};
use crate::models::black_scholes::{market_touch_from_itm, BlackScholesPut};
use crate::models::bootstrap::BootstrapModel;
use crate::models::gbm::GbmModel;
use crate::models::jump_diffusion::JumpDiffusionModel;
use crate::models::simulation::{derive_seed, simulate, PathScenario, SimConfig};
use crate::models::PathModel;
use crate::state::*;
use chrono::{DateTime, NaiveDate, Utc};
use edge::MarketView;
use filters::PricedQuote;
use rayon::prelude::*;

/// Analytic model runs with zero carry.
const RISK_FREE_RATE: f64 = 0.0;
const DAYS_PER_YEAR: f64 = 365.0;

// Random stream ids, one per simulator
const STREAM_GBM: u64 = 1;
const STREAM_BOOTSTRAP: u64 = 2;
const STREAM_JUMP: u64 = 3;

/// Year fraction from `now` to midnight UTC of `expiry` (`YYYY-MM-DD`),
/// counted in whole calendar days and floored at zero.
pub fn time_to_expiry(expiry: &str, now: DateTime<Utc>) -> EngineResult<f64> {
    let date = NaiveDate::parse_from_str(expiry.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidExpiry(expiry.to_string()))?;
    let close = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| EngineError::InvalidExpiry(expiry.to_string()))?
        .and_utc();

    let days = (close - now).num_days().max(0);
    Ok(days as f64 / DAYS_PER_YEAR)
}

/// Scores a put chain for overpriced write candidates.
///
/// Pipeline per scan:
///   1-5. pre-filter the chain (bid, OTM, strike band, spread, premium)
///   6.   price each survivor analytically and with all three simulators
///   7-8. drop illiquid records and records below the edge threshold
///   9.   rank by edge, then EV per contract
///
/// Candidates are scored in parallel. Each one draws from generators derived
/// from the scan seed and its strike, so output is reproducible.
pub struct EdgeScanner {
    params: ScanParameters,
    jump: JumpParams,
    pricing: BlackScholesPut,
}

impl EdgeScanner {
    pub fn new(params: ScanParameters, jump: JumpParams) -> EngineResult<Self> {
        params.validate()?;
        jump.validate()?;
        Ok(Self {
            params,
            jump,
            pricing: BlackScholesPut::new(),
        })
    }

    #[inline]
    pub fn params(&self) -> &ScanParameters {
        &self.params
    }

    pub fn scan(
        &self,
        chain: &[OptionQuote],
        spot: f64,
        expiry: &str,
        returns: &[f64],
        cancel: &CancelToken,
    ) -> EngineResult<Vec<EdgeRecord>> {
        self.scan_at(chain, spot, expiry, returns, cancel, Utc::now())
    }

    /// Same as [`EdgeScanner::scan`] with an explicit clock.
    pub fn scan_at(
        &self,
        chain: &[OptionQuote],
        spot: f64,
        expiry: &str,
        returns: &[f64],
        cancel: &CancelToken,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<EdgeRecord>> {
        let ttl_years = time_to_expiry(expiry, now)?;
        let scan_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("scan", %scan_id, expiry, spot);
        let _guard = span.enter();

        let candidates = filters::prefilter(chain, spot, &self.params);
        if candidates.is_empty() {
            tracing::info!(chain = chain.len(), "no candidates survived pre-filters");
            return Ok(Vec::new());
        }

        tracing::info!(
            candidates = candidates.len(),
            ttl_years,
            n_sims = self.params.n_sims,
            steps = self.params.steps,
            "scoring candidates"
        );

        let scored: Vec<Option<EdgeRecord>> = candidates
            .par_iter()
            .map(|candidate| {
                if cancel.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }
                self.score_candidate(candidate, spot, ttl_years, expiry, returns)
            })
            .collect::<EngineResult<_>>()?;

        let records: Vec<EdgeRecord> = scored.into_iter().flatten().collect();
        let priced = records.len();

        let mut ranked = filters::postfilter(records, &self.params);
        filters::rank(&mut ranked);

        tracing::info!(
            candidates = candidates.len(),
            priced,
            selected = ranked.len(),
            "scan complete"
        );
        Ok(ranked)
    }

    fn score_candidate(
        &self,
        candidate: &PricedQuote,
        spot: f64,
        ttl_years: f64,
        expiry: &str,
        returns: &[f64],
    ) -> EngineResult<Option<EdgeRecord>> {
        let strike = candidate.quote.strike;

        let Some(iv) = candidate.quote.priceable_iv() else {
            tracing::debug!(strike, "skipping: no usable implied volatility");
            return Ok(None);
        };

        let params = ModelParams::new(spot, strike, ttl_years, iv);
        let Some(market_itm) = self.pricing.prob_put_expire_itm(&params, RISK_FREE_RATE) else {
            tracing::debug!(strike, ttl_years, "skipping: cannot price");
            return Ok(None);
        };
        let market = MarketView {
            iv,
            prob_itm: market_itm,
            prob_touch: market_touch_from_itm(market_itm),
        };

        let scenario = PathScenario { spot, strike, ttl_years };
        let seed = derive_seed(self.params.seed, strike.to_bits());

        let gbm = GbmModel::new(iv);
        let bootstrap = BootstrapModel::new(returns)?;
        let jump = JumpDiffusionModel::new(iv, self.jump)?;

        let models = ModelBreakdown {
            gbm: self.run_model(&gbm, &scenario, derive_seed(seed, STREAM_GBM))?,
            bootstrap: self.run_model(&bootstrap, &scenario, derive_seed(seed, STREAM_BOOTSTRAP))?,
            jump: self.run_model(&jump, &scenario, derive_seed(seed, STREAM_JUMP))?,
        };

        let record = edge::score(candidate, expiry, market, models);
        if let Some(r) = &record {
            tracing::debug!(
                strike,
                market_itm = r.market_prob_itm,
                model_itm = r.model_prob_itm,
                edge_itm = r.edge_itm,
                ev_per_contract = r.ev_per_contract,
                "candidate scored"
            );
        }
        Ok(record)
    }

    fn run_model(
        &self,
        model: &dyn PathModel,
        scenario: &PathScenario,
        seed: u64,
    ) -> EngineResult<Option<SimulationOutcome>> {
        let config = SimConfig {
            n_sims: self.params.n_sims,
            steps: self.params.steps,
            seed,
        };
        let outcome = simulate(model, scenario, &config)?;
        tracing::trace!(model = model.name(), strike = scenario.strike, ?outcome, "simulated");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use filters::tests::quote;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    // 90 calendar days after now()
    const EXPIRY: &str = "2030-04-01";

    fn returns() -> Vec<f64> {
        (0..250)
            .map(|i| match i % 10 {
                0 => -0.025,
                1 | 2 => -0.01,
                3 | 4 => 0.0,
                5 | 6 | 7 => 0.006,
                _ => 0.012,
            })
            .collect()
    }

    fn fast_params() -> ScanParameters {
        ScanParameters {
            n_sims: 4000,
            steps: 30,
            min_edge: -1.0,
            max_spread_pct: 0.15,
            min_premium: 0.15,
            min_volume: 50,
            min_oi: 200,
            far_otm_min: 1.0,
            far_otm_max: Some(60.0),
            otm_only: true,
            seed: 7,
        }
    }

    fn scanner(params: ScanParameters) -> EdgeScanner {
        EdgeScanner::new(params, JumpParams::default()).unwrap()
    }

    #[test]
    fn test_time_to_expiry() {
        let t = time_to_expiry(EXPIRY, now()).unwrap();
        assert!((t - 90.0 / 365.0).abs() < 1e-12, "t={t}");

        let partial_day = Utc.with_ymd_and_hms(2030, 3, 30, 12, 0, 0).unwrap();
        assert!((time_to_expiry(EXPIRY, partial_day).unwrap() - 1.0 / 365.0).abs() < 1e-12);

        assert_eq!(time_to_expiry("2029-06-01", now()).unwrap(), 0.0);
    }

    #[test]
    fn test_malformed_expiry_rejected() {
        for bad in ["", "2030/04/01", "next friday", "2030-13-01"] {
            let err = time_to_expiry(bad, now()).unwrap_err();
            assert!(matches!(err, EngineError::InvalidExpiry(_)), "{bad:?} -> {err}");
        }
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let params = ScanParameters { n_sims: 0, ..fast_params() };
        assert!(matches!(
            EdgeScanner::new(params, JumpParams::default()),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_single_survivor_scored_once() {
        let chain = [quote(95.0, 1.00, 1.10)];
        let out = scanner(fast_params())
            .scan_at(&chain, 100.0, EXPIRY, &returns(), &CancelToken::new(), now())
            .unwrap();

        assert_eq!(out.len(), 1);
        let r = &out[0];
        assert_eq!(r.strike, 95.0);
        assert!((r.mid - 1.05).abs() < 1e-12);
        assert!((r.spread_pct - 0.1 / 1.05).abs() < 1e-12);
        assert!(r.market_prob_touch >= r.market_prob_itm);
        assert!(r.model_prob_touch >= r.model_prob_itm);
        assert!(r.avg_shortfall_given_itm >= 0.0);

        let expected_ev = (r.mid - r.model_prob_itm * r.avg_shortfall_given_itm) * 100.0;
        assert!((r.ev_per_contract - expected_ev).abs() < 1e-9);
        assert!((r.edge_itm - (r.market_prob_itm - r.model_prob_itm)).abs() < 1e-12);
        assert!(r.models.gbm.is_some() && r.models.bootstrap.is_some() && r.models.jump.is_some());
    }

    #[test]
    fn test_identical_seed_identical_output() {
        let chain = [
            quote(97.0, 2.00, 2.10),
            quote(95.0, 1.00, 1.10),
            quote(90.0, 0.40, 0.45),
            quote(85.0, 0.20, 0.22),
        ];
        let s = scanner(fast_params());
        let a = s.scan_at(&chain, 100.0, EXPIRY, &returns(), &CancelToken::new(), now()).unwrap();
        let b = s.scan_at(&chain, 100.0, EXPIRY, &returns(), &CancelToken::new(), now()).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
        assert_eq!(a.len(), 4);

        for pair in a.windows(2) {
            let (x, y) = (&pair[0], &pair[1]);
            assert!(
                x.edge_itm > y.edge_itm
                    || (x.edge_itm == y.edge_itm && x.ev_per_contract >= y.ev_per_contract),
                "rank violated: {} / {}",
                x.strike,
                y.strike
            );
        }
    }

    #[test]
    fn test_unpriceable_rows_excluded() {
        let mut no_iv = quote(94.0, 1.0, 1.1);
        no_iv.implied_volatility = None;
        let mut zero_iv = quote(93.0, 1.0, 1.1);
        zero_iv.implied_volatility = Some(0.0);
        let chain = [no_iv, zero_iv, quote(95.0, 1.0, 1.1)];

        let out = scanner(fast_params())
            .scan_at(&chain, 100.0, EXPIRY, &returns(), &CancelToken::new(), now())
            .unwrap();
        let strikes: Vec<f64> = out.iter().map(|r| r.strike).collect();
        assert_eq!(strikes, vec![95.0]);
    }

    #[test]
    fn test_expired_chain_is_empty_not_error() {
        let chain = [quote(95.0, 1.0, 1.1)];
        let out = scanner(fast_params())
            .scan_at(&chain, 100.0, "2029-12-01", &returns(), &CancelToken::new(), now())
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_liquidity_and_edge_filters() {
        let mut thin = quote(95.0, 1.0, 1.1);
        thin.volume = 10;
        let out = scanner(fast_params())
            .scan_at(&[thin], 100.0, EXPIRY, &returns(), &CancelToken::new(), now())
            .unwrap();
        assert!(out.is_empty(), "illiquid quote should be dropped");

        let strict = ScanParameters { min_edge: 1.0, ..fast_params() };
        let out = scanner(strict)
            .scan_at(&[quote(95.0, 1.0, 1.1)], 100.0, EXPIRY, &returns(), &CancelToken::new(), now())
            .unwrap();
        assert!(out.is_empty(), "edge can never reach 1.0 here");
    }

    #[test]
    fn test_empty_returns_fatal_when_resampling_runs() {
        let chain = [quote(95.0, 1.0, 1.1)];
        let err = scanner(fast_params())
            .scan_at(&chain, 100.0, EXPIRY, &[], &CancelToken::new(), now())
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyReturns));
    }

    #[test]
    fn test_nothing_survives_prefilter() {
        let chain = [quote(95.0, 0.0, 0.1), quote(120.0, 20.0, 20.5)];
        let out = scanner(fast_params())
            .scan_at(&chain, 100.0, EXPIRY, &[], &CancelToken::new(), now())
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_cancelled_scan() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let chain = [quote(95.0, 1.0, 1.1)];
        let err = scanner(fast_params())
            .scan_at(&chain, 100.0, EXPIRY, &returns(), &cancel, now())
            .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[test]
    fn test_seed_changes_model_output() {
        let chain = [quote(95.0, 1.0, 1.1)];
        let a = scanner(fast_params())
            .scan_at(&chain, 100.0, EXPIRY, &returns(), &CancelToken::new(), now())
            .unwrap();
        let b = scanner(ScanParameters { seed: 8, ..fast_params() })
            .scan_at(&chain, 100.0, EXPIRY, &returns(), &CancelToken::new(), now())
            .unwrap();
        assert_ne!(a[0].model_prob_itm, b[0].model_prob_itm);
        assert_eq!(a[0].market_prob_itm, b[0].market_prob_itm);
    }
}
