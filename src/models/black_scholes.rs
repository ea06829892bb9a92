use crate::state::ModelParams;
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes probability that a put finishes in the money.
///
/// P(S_T < K) = Phi(-d2)
///
/// where d2 = (ln(S/K) + (r - sigma^2/2)*T) / (sigma * sqrt(T))
///
/// All computation uses precomputed ModelParams. No allocations.
pub struct BlackScholesPut {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholesPut {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }

    /// Market-implied ITM probability from the quote's implied volatility.
    /// `None` when T, sigma, S or K is non-positive: the candidate cannot be priced.
    #[inline]
    pub fn prob_put_expire_itm(&self, params: &ModelParams, rate: f64) -> Option<f64> {
        if !params.is_priceable() {
            return None;
        }

        let d2 = (params.ln_s_k + (rate - params.half_sigma_sq) * params.ttl_years)
            / params.sigma_sqrt_t;

        Some(self.normal.cdf(-d2))
    }
}

/// Trader's rule of thumb: P(touch) ~= 2 * P(expire ITM), capped at 1.
///
/// Rough by construction; it ignores skew and drift. Callers holding an
/// optional probability map over it so an absent input stays absent.
#[inline]
pub fn market_touch_from_itm(prob_itm: f64) -> f64 {
    (2.0 * prob_itm).min(1.0)
}

/// Rough 1-sigma dollar move over the horizon: S * iv * sqrt(T).
#[inline]
pub fn expected_move_one_sigma(spot: f64, iv: f64, ttl_years: f64) -> Option<f64> {
    if ttl_years <= 0.0 || iv <= 0.0 {
        return None;
    }
    Some(spot * iv * ttl_years.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_the_forward_is_half() {
        let model = BlackScholesPut::new();
        let (spot, iv, t, r): (f64, f64, f64, f64) = (100.0, 0.3, 0.25, 0.02);
        let forward_strike = spot * ((r - 0.5 * iv * iv) * t).exp();
        let params = ModelParams::new(spot, forward_strike, t, iv);
        let p = model.prob_put_expire_itm(&params, r).unwrap();
        assert!((p - 0.5).abs() < 1e-12, "at-the-forward prob={p} should be 0.5");
    }

    #[test]
    fn test_otm_put_probability() {
        let model = BlackScholesPut::new();
        let params = ModelParams::new(100.0, 90.0, 0.25, 0.30);
        let p = model.prob_put_expire_itm(&params, 0.0).unwrap();
        // d2 = (ln(100/90) - 0.045 * 0.25) / 0.15 ~= 0.6274
        assert!((p - 0.2652).abs() < 1e-3, "10-point OTM put prob={p}");
    }

    #[test]
    fn test_deep_itm_put() {
        let model = BlackScholesPut::new();
        let params = ModelParams::new(80.0, 100.0, 0.1, 0.2);
        let p = model.prob_put_expire_itm(&params, 0.0).unwrap();
        assert!(p > 0.95 && p <= 1.0, "deep ITM put prob={p}");
    }

    #[test]
    fn test_unpriceable_inputs() {
        let model = BlackScholesPut::new();
        let cases = [
            ModelParams::new(100.0, 90.0, 0.0, 0.3),
            ModelParams::new(100.0, 90.0, -0.1, 0.3),
            ModelParams::new(100.0, 90.0, 0.25, 0.0),
            ModelParams::new(0.0, 90.0, 0.25, 0.3),
            ModelParams::new(100.0, 0.0, 0.25, 0.3),
        ];
        for params in cases {
            assert!(model.prob_put_expire_itm(&params, 0.0).is_none(), "{params:?} should not price");
        }
    }

    #[test]
    fn test_touch_heuristic() {
        for p in [0.0, 0.1, 0.25, 0.5, 0.51, 0.9, 1.0] {
            let touch = market_touch_from_itm(p);
            assert_eq!(touch, (2.0 * p).min(1.0));
            assert!(touch >= p && (0.0..=1.0).contains(&touch), "p={p} touch={touch}");
        }
        assert_eq!(None::<f64>.map(market_touch_from_itm), None);
    }

    #[test]
    fn test_expected_move() {
        let em = expected_move_one_sigma(400.0, 0.2, 0.25).unwrap();
        assert!((em - 40.0).abs() < 1e-12, "em={em}");
        assert!(expected_move_one_sigma(400.0, 0.0, 0.25).is_none());
        assert!(expected_move_one_sigma(400.0, 0.2, 0.0).is_none());
    }
}
