pub mod black_scholes;
pub mod bootstrap;
pub mod gbm;
pub mod jump_diffusion;
pub mod simulation;

/// Random stream owned by one chunk of simulated paths.
pub type PathRng = rand::rngs::StdRng;

/// Per-step price update rule. All path simulators implement this trait and
/// share one runner and one reduction (see [`simulation::simulate`]).
///
/// `advance` must be a pure function of its inputs and the draws it takes from
/// `rng`: deterministic output for a fixed seed.
/// Send + Sync required for use across rayon workers.
pub trait PathModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// False when the scenario cannot be simulated by this model
    /// (e.g. non-positive volatility). The runner then reports no outcome.
    fn can_simulate(&self) -> bool {
        true
    }

    /// Multiply every price in `prices` by one step's gross return over `dt` years.
    fn advance(&self, prices: &mut [f64], dt: f64, rng: &mut PathRng);
}
