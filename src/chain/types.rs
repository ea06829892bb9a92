use serde::{Deserialize, Deserializer, Serialize};

// ── Option chain row ──

/// One put from a chain snapshot. Field names follow the data provider.
///
/// `volume` and `openInterest` default to 0 when missing, null, or not a
/// usable number. `impliedVolatility` stays `None` when missing; a present but
/// non-positive value is kept and rejected by [`OptionQuote::priceable_iv`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub strike: f64,
    pub bid: f64,
    pub ask: f64,
    #[serde(rename = "impliedVolatility", default)]
    pub implied_volatility: Option<f64>,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub volume: u64,
    #[serde(rename = "openInterest", default, deserialize_with = "count_or_zero")]
    pub open_interest: u64,
}

impl OptionQuote {
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// (ask - bid) / mid
    #[inline]
    pub fn spread_pct(&self) -> f64 {
        (self.ask - self.bid) / self.mid()
    }

    /// IV usable for pricing, or `None` for the unpriceable sentinel.
    #[inline]
    pub fn priceable_iv(&self) -> Option<f64> {
        self.implied_volatility.filter(|iv| iv.is_finite() && *iv > 0.0)
    }
}

fn count_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(match raw {
        Some(v) if v.is_finite() && v > 0.0 => v as u64,
        _ => 0,
    })
}
