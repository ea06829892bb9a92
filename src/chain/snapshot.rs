use super::types::OptionQuote;
use crate::errors::{EngineError, EngineResult};
use std::path::Path;

/// Supplier of the market inputs a scan consumes.
/// Retrieval happens entirely before the scan; implementations may block.
pub trait MarketDataSource {
    fn spot(&self) -> f64;

    /// Expiry of the chain as `YYYY-MM-DD`.
    fn expiry(&self) -> &str;

    fn puts(&self) -> &[OptionQuote];

    /// Daily fractional returns used by the resampling simulator.
    fn daily_returns(&self) -> EngineResult<Vec<f64>>;
}

// Snapshot document format:
// {
//   "ticker": "SPY",
//   "spot": 512.31,
//   "expiry": "2026-12-18",
//   "puts": [ { "strike": 480, "bid": 2.1, "ask": 2.2, "impliedVolatility": 0.19,
//               "volume": 812, "openInterest": 10450 } ],
//   "returns": [0.0012, -0.0031],      // optional
//   "closes": [508.1, 509.0, 507.4]    // optional, used when returns are absent
// }

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub ticker: Option<String>,
    pub spot: f64,
    pub expiry: String,
    #[serde(default)]
    pub puts: Vec<OptionQuote>,
    #[serde(default)]
    pub returns: Option<Vec<f64>>,
    #[serde(default)]
    pub closes: Option<Vec<f64>>,
}

impl SnapshotFile {
    pub fn load(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let snapshot: SnapshotFile = serde_json::from_str(raw)?;

        if !snapshot.spot.is_finite() {
            return Err(EngineError::Parse(format!("invalid spot: {}", snapshot.spot)));
        }

        tracing::debug!(
            ticker = snapshot.ticker.as_deref().unwrap_or("?"),
            spot = snapshot.spot,
            expiry = %snapshot.expiry,
            puts = snapshot.puts.len(),
            "snapshot parsed"
        );
        Ok(snapshot)
    }
}

impl MarketDataSource for SnapshotFile {
    #[inline]
    fn spot(&self) -> f64 {
        self.spot
    }

    #[inline]
    fn expiry(&self) -> &str {
        &self.expiry
    }

    #[inline]
    fn puts(&self) -> &[OptionQuote] {
        &self.puts
    }

    fn daily_returns(&self) -> EngineResult<Vec<f64>> {
        if let Some(returns) = &self.returns {
            return Ok(returns.iter().copied().filter(|r| r.is_finite()).collect());
        }
        match &self.closes {
            Some(closes) => Ok(returns_from_closes(closes)),
            None => Ok(Vec::new()),
        }
    }
}

/// Simple percentage change between consecutive closes.
/// The first (undefined) change and any non-finite result are dropped.
pub fn returns_from_closes(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "ticker": "SPY",
        "spot": 100.0,
        "expiry": "2030-01-18",
        "puts": [
            {"strike": 95.0, "bid": 1.0, "ask": 1.1, "impliedVolatility": 0.3, "volume": 500, "openInterest": 1000},
            {"strike": 90.0, "bid": 0.4, "ask": 0.5, "impliedVolatility": null}
        ],
        "closes": [100.0, 101.0, 99.99]
    }"#;

    #[test]
    fn test_snapshot_parses() {
        let snap = SnapshotFile::from_json(SNAPSHOT).unwrap();
        assert_eq!(snap.spot(), 100.0);
        assert_eq!(snap.expiry(), "2030-01-18");
        assert_eq!(snap.puts().len(), 2);
        assert_eq!(snap.puts()[1].implied_volatility, None);
    }

    #[test]
    fn test_returns_derived_from_closes() {
        let snap = SnapshotFile::from_json(SNAPSHOT).unwrap();
        let r = snap.daily_returns().unwrap();
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.01).abs() < 1e-12, "r0={}", r[0]);
        assert!((r[1] - (99.99 / 101.0 - 1.0)).abs() < 1e-12, "r1={}", r[1]);
    }

    #[test]
    fn test_explicit_returns_preferred() {
        let raw = r#"{"spot": 50.0, "expiry": "2030-01-18", "returns": [0.01, -0.02], "closes": [1.0, 2.0, 3.0]}"#;
        let snap = SnapshotFile::from_json(raw).unwrap();
        assert_eq!(snap.daily_returns().unwrap(), vec![0.01, -0.02]);
        assert!(snap.puts().is_empty());
    }

    #[test]
    fn test_malformed_snapshot_is_parse_error() {
        let err = SnapshotFile::from_json("{\"spot\": }").unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }
}
