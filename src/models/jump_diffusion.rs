use super::{PathModel, PathRng};
use crate::errors::EngineResult;
use crate::state::JumpParams;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};

/// Diffusion with an occasional downside jump.
///
/// Each step applies the GBM move, and with probability
/// p_step = 1 - (1 - p_annual)^dt an extra factor exp(J), J ~ N(jump_mean, jump_std).
/// Jumps are drawn independently per path per step.
pub struct JumpDiffusionModel {
    vol: f64,
    jump: JumpParams,
    jump_size: Normal<f64>,
}

impl JumpDiffusionModel {
    pub fn new(vol: f64, jump: JumpParams) -> EngineResult<Self> {
        jump.validate()?;
        let jump_size = Normal::new(jump.mean, jump.std)?;
        Ok(Self { vol, jump, jump_size })
    }
}

impl PathModel for JumpDiffusionModel {
    #[inline]
    fn name(&self) -> &'static str {
        "Jump-Diffusion"
    }

    #[inline]
    fn can_simulate(&self) -> bool {
        self.vol.is_finite() && self.vol > 0.0
    }

    fn advance(&self, prices: &mut [f64], dt: f64, rng: &mut PathRng) {
        let drift = -0.5 * self.vol * self.vol * dt;
        let diffusion = self.vol * dt.sqrt();
        let p_step = self.jump.step_probability(dt);

        for p in prices.iter_mut() {
            let z: f64 = rng.sample(StandardNormal);
            let mut growth = drift + diffusion * z;
            if rng.random::<f64>() < p_step {
                growth += self.jump_size.sample(rng);
            }
            *p *= growth.exp();
        }
    }
}
