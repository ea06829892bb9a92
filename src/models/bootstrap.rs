use super::{PathModel, PathRng};
use crate::errors::{EngineError, EngineResult};
use rand::Rng;

/// Historical bootstrap: each step multiplies by (1 + r), with r drawn with
/// replacement from observed daily returns. Keeps the empirical fat tails and
/// skew the diffusion models lack.
///
/// The step size is ignored: one step consumes one historical return.
pub struct BootstrapModel<'a> {
    returns: &'a [f64],
}

impl<'a> BootstrapModel<'a> {
    /// Fails when there is nothing to resample from.
    pub fn new(returns: &'a [f64]) -> EngineResult<Self> {
        if returns.is_empty() {
            return Err(EngineError::EmptyReturns);
        }
        Ok(Self { returns })
    }
}

impl PathModel for BootstrapModel<'_> {
    #[inline]
    fn name(&self) -> &'static str {
        "Bootstrap"
    }

    fn advance(&self, prices: &mut [f64], _dt: f64, rng: &mut PathRng) {
        let n = self.returns.len();
        for p in prices.iter_mut() {
            let r = self.returns[rng.random_range(0..n)];
            *p *= 1.0 + r;
        }
    }
}
