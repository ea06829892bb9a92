use crate::errors::{EngineError, EngineResult};
use portable_atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Width of the default strike band when no far-OTM ceiling is given:
/// the band then reaches `spot + 100` dollars below spot, i.e. every strike.
const DEFAULT_FAR_OTM_PAD: f64 = 100.0;

// ── Scan configuration ──

/// Immutable configuration for one scan.
#[derive(Debug, Clone)]
pub struct ScanParameters {
    pub n_sims: usize,
    pub steps: usize,
    pub min_edge: f64,
    pub max_spread_pct: f64,
    pub min_premium: f64,
    pub min_volume: u64,
    pub min_oi: u64,
    /// Strike band, in dollars below spot: [spot - far_otm_max, spot - far_otm_min]
    pub far_otm_min: f64,
    pub far_otm_max: Option<f64>,
    pub otm_only: bool,
    /// Root seed for every random stream used by the scan
    pub seed: u64,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            n_sims: 15_000,
            steps: 60,
            min_edge: 0.03,
            max_spread_pct: 0.15,
            min_premium: 0.15,
            min_volume: 50,
            min_oi: 200,
            far_otm_min: 1.0,
            far_otm_max: None,
            otm_only: true,
            seed: 42,
        }
    }
}

impl ScanParameters {
    /// Reject configurations that would produce degenerate statistics.
    pub fn validate(&self) -> EngineResult<()> {
        if self.n_sims == 0 {
            return Err(EngineError::Config("n_sims must be > 0".into()));
        }
        if self.steps == 0 {
            return Err(EngineError::Config("steps must be >= 1".into()));
        }

        let finite = [
            ("min_edge", self.min_edge),
            ("max_spread_pct", self.max_spread_pct),
            ("min_premium", self.min_premium),
            ("far_otm_min", self.far_otm_min),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(EngineError::Config(format!("{name} must be finite, got {value}")));
            }
        }

        if let Some(max) = self.far_otm_max {
            if !max.is_finite() {
                return Err(EngineError::Config(format!("far_otm_max must be finite, got {max}")));
            }
            if max < self.far_otm_min {
                return Err(EngineError::Config(format!(
                    "far_otm_max ({max}) must be >= far_otm_min ({})",
                    self.far_otm_min
                )));
            }
        }

        Ok(())
    }

    /// Inclusive strike band `(lower, upper)` for a given spot.
    #[inline]
    pub fn strike_band(&self, spot: f64) -> (f64, f64) {
        let far_otm_max = self.far_otm_max.unwrap_or(spot + DEFAULT_FAR_OTM_PAD);
        (spot - far_otm_max, spot - self.far_otm_min)
    }
}

/// Parameters of the downside jump overlay used by the jump-diffusion simulator.
/// Defaults are calibrated for equity crash risk.
#[derive(Debug, Clone, Copy)]
pub struct JumpParams {
    pub annual_probability: f64,
    pub mean: f64,
    pub std: f64,
}

impl Default for JumpParams {
    fn default() -> Self {
        Self {
            annual_probability: 0.35,
            mean: -0.06,
            std: 0.03,
        }
    }
}

impl JumpParams {
    pub fn validate(&self) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&self.annual_probability) {
            return Err(EngineError::Config(format!(
                "jump annual_probability must be in [0, 1], got {}",
                self.annual_probability
            )));
        }
        if !self.mean.is_finite() || !self.std.is_finite() || self.std < 0.0 {
            return Err(EngineError::Config(format!(
                "jump mean/std must be finite with std >= 0, got mean={} std={}",
                self.mean, self.std
            )));
        }
        Ok(())
    }

    /// Per-step jump probability for a step of `dt` years:
    /// 1 - (1 - p_annual)^dt
    #[inline]
    pub fn step_probability(&self, dt: f64) -> f64 {
        1.0 - (1.0 - self.annual_probability).powf(dt)
    }
}

// ── Precomputed analytic model parameters (stack, no alloc) ──

#[derive(Debug, Clone, Copy)]
pub struct ModelParams {
    pub spot: f64,
    pub strike: f64,
    pub ttl_years: f64,
    pub sigma: f64,
    // Precomputed
    pub ln_s_k: f64,
    pub sigma_sqrt_t: f64,
    pub half_sigma_sq: f64,
}

impl ModelParams {
    #[inline]
    pub fn new(spot: f64, strike: f64, ttl_years: f64, sigma: f64) -> Self {
        let ln_s_k = (spot / strike).ln();
        let sigma_sqrt_t = sigma * ttl_years.max(0.0).sqrt();
        let half_sigma_sq = 0.5 * sigma * sigma;
        Self {
            spot,
            strike,
            ttl_years,
            sigma,
            ln_s_k,
            sigma_sqrt_t,
            half_sigma_sq,
        }
    }

    /// True when the closed-form model can price this scenario.
    #[inline]
    pub fn is_priceable(&self) -> bool {
        self.ttl_years > 0.0 && self.sigma > 0.0 && self.spot > 0.0 && self.strike > 0.0
    }
}

// ── Simulation output ──

/// Statistics every path simulator reduces its ensemble to.
/// `prob_touch >= prob_itm` holds exactly for every run.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SimulationOutcome {
    pub prob_itm: f64,
    pub prob_touch: f64,
    /// Mean of (K - S_T) over paths finishing below K; 0.0 if none did.
    pub avg_shortfall_given_itm: f64,
}

/// Each simulator's outcome for one strike. `None` means the model could not
/// price the scenario.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ModelBreakdown {
    pub gbm: Option<SimulationOutcome>,
    pub bootstrap: Option<SimulationOutcome>,
    pub jump: Option<SimulationOutcome>,
}

impl ModelBreakdown {
    #[inline]
    pub fn outcomes(&self) -> [Option<SimulationOutcome>; 3] {
        [self.gbm, self.bootstrap, self.jump]
    }
}

// ── Scored candidate ──

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EdgeRecord {
    pub expiry: String,
    pub strike: f64,
    pub bid: f64,
    pub ask: f64,
    pub mid: f64,
    pub iv: f64,
    pub spread_pct: f64,
    pub volume: u64,
    pub open_interest: u64,

    pub market_prob_itm: f64,
    pub market_prob_touch: f64,

    pub model_prob_itm: f64,
    pub model_prob_touch: f64,
    pub avg_shortfall_given_itm: f64,

    pub edge_itm: f64,
    pub edge_touch: f64,
    /// market / model ITM probability; absent when the model saw no ITM paths
    pub imbalance_itm_ratio: Option<f64>,

    pub ev_per_share: f64,
    pub ev_per_contract: f64,

    pub models: ModelBreakdown,
}

// ── Cooperative cancellation (lock-free) ──

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
