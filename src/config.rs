use crate::errors::{EngineError, EngineResult};
use crate::state::{JumpParams, ScanParameters};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub snapshot_path: PathBuf,
    pub scan: ScanParameters,
    pub jump: JumpParams,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = ScanParameters::default();
        let scan = ScanParameters {
            n_sims: parse_env("SCAN_N_SIMS", defaults.n_sims)?,
            steps: parse_env("SCAN_STEPS", defaults.steps)?,
            min_edge: parse_env("SCAN_MIN_EDGE", defaults.min_edge)?,
            max_spread_pct: parse_env("SCAN_MAX_SPREAD_PCT", defaults.max_spread_pct)?,
            min_premium: parse_env("SCAN_MIN_PREMIUM", defaults.min_premium)?,
            min_volume: parse_env("SCAN_MIN_VOLUME", defaults.min_volume)?,
            min_oi: parse_env("SCAN_MIN_OI", defaults.min_oi)?,
            far_otm_min: parse_env("SCAN_FAR_OTM_MIN", defaults.far_otm_min)?,
            far_otm_max: parse_env_opt("SCAN_FAR_OTM_MAX")?,
            otm_only: parse_env("SCAN_OTM_ONLY", defaults.otm_only)?,
            seed: parse_env("SCAN_SEED", defaults.seed)?,
        };
        scan.validate()?;

        let jump_defaults = JumpParams::default();
        let jump = JumpParams {
            annual_probability: parse_env("JUMP_PROB_ANNUAL", jump_defaults.annual_probability)?,
            mean: parse_env("JUMP_MEAN", jump_defaults.mean)?,
            std: parse_env("JUMP_STD", jump_defaults.std)?,
        };
        jump.validate()?;

        Ok(Self {
            snapshot_path: PathBuf::from(env_var_or("SNAPSHOT_PATH", "data/snapshot.json")),
            scan,
            jump,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> EngineResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

/// Unset or blank means "not configured".
fn parse_env_opt<T>(key: &str) -> EngineResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(key, &raw).map(Some),
        _ => Ok(None),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> EngineResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| EngineError::Config(format!("{key}: {e}")))
}
