use super::{PathModel, PathRng};
use rand::Rng;
use rand_distr::StandardNormal;

/// Log-normal diffusion with zero expected return.
///
/// S_{t+dt} = S_t * exp(-0.5 * sigma^2 * dt + sigma * sqrt(dt) * Z),  Z ~ N(0, 1)
pub struct GbmModel {
    vol: f64,
}

impl GbmModel {
    pub fn new(vol: f64) -> Self {
        Self { vol }
    }
}

impl PathModel for GbmModel {
    #[inline]
    fn name(&self) -> &'static str {
        "GBM"
    }

    #[inline]
    fn can_simulate(&self) -> bool {
        self.vol.is_finite() && self.vol > 0.0
    }

    fn advance(&self, prices: &mut [f64], dt: f64, rng: &mut PathRng) {
        let drift = -0.5 * self.vol * self.vol * dt;
        let diffusion = self.vol * dt.sqrt();
        for p in prices.iter_mut() {
            let z: f64 = rng.sample(StandardNormal);
            *p *= (drift + diffusion * z).exp();
        }
    }
}
