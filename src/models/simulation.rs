use super::{PathModel, PathRng};
use crate::errors::{EngineError, EngineResult};
use crate::state::SimulationOutcome;
use rand::SeedableRng;
use rayon::prelude::*;

/// Paths per parallel work unit. Each chunk owns its own generator, so
/// results depend on the seed and this constant, never on the thread count.
pub const CHUNK_PATHS: usize = 2048;

/// Single (spot, strike, horizon) scenario to simulate.
#[derive(Debug, Clone, Copy)]
pub struct PathScenario {
    pub spot: f64,
    pub strike: f64,
    pub ttl_years: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub n_sims: usize,
    pub steps: usize,
    pub seed: u64,
}

/// Running counts for one chunk of paths.
#[derive(Debug, Clone, Copy, Default)]
struct ChunkTally {
    itm: u64,
    touched: u64,
    shortfall_sum: f64,
}

impl ChunkTally {
    #[inline]
    fn merge(self, other: &ChunkTally) -> Self {
        Self {
            itm: self.itm + other.itm,
            touched: self.touched + other.touched,
            shortfall_sum: self.shortfall_sum + other.shortfall_sum,
        }
    }

    fn into_outcome(self, n_sims: usize) -> SimulationOutcome {
        let n = n_sims as f64;
        let avg_shortfall_given_itm = if self.itm == 0 {
            0.0
        } else {
            self.shortfall_sum / self.itm as f64
        };
        SimulationOutcome {
            prob_itm: self.itm as f64 / n,
            prob_touch: self.touched as f64 / n,
            avg_shortfall_given_itm,
        }
    }
}

/// Simulate `n_sims` paths of `steps` steps under `model` and reduce them.
///
/// Returns `Ok(None)` when the scenario cannot be simulated (T <= 0, or the
/// model reports it cannot run). Zero paths or zero steps is a configuration
/// error.
pub fn simulate(
    model: &dyn PathModel,
    scenario: &PathScenario,
    config: &SimConfig,
) -> EngineResult<Option<SimulationOutcome>> {
    if config.n_sims == 0 || config.steps == 0 {
        return Err(EngineError::Config(format!(
            "{}: n_sims and steps must be > 0 (got {} x {})",
            model.name(),
            config.n_sims,
            config.steps
        )));
    }

    if scenario.ttl_years.is_nan() || scenario.ttl_years <= 0.0 || !model.can_simulate() {
        return Ok(None);
    }

    let dt = scenario.ttl_years / config.steps as f64;
    let n_chunks = config.n_sims.div_ceil(CHUNK_PATHS);

    // Collected in chunk order and summed sequentially: float addition order
    // stays fixed for a given seed.
    let tallies: Vec<ChunkTally> = (0..n_chunks)
        .into_par_iter()
        .map(|chunk| {
            let start = chunk * CHUNK_PATHS;
            let len = CHUNK_PATHS.min(config.n_sims - start);
            let mut rng = PathRng::seed_from_u64(derive_seed(config.seed, chunk as u64));
            run_chunk(model, scenario, dt, config.steps, len, &mut rng)
        })
        .collect();

    let total = tallies
        .iter()
        .fold(ChunkTally::default(), |acc, t| acc.merge(t));

    Ok(Some(total.into_outcome(config.n_sims)))
}

fn run_chunk(
    model: &dyn PathModel,
    scenario: &PathScenario,
    dt: f64,
    steps: usize,
    len: usize,
    rng: &mut PathRng,
) -> ChunkTally {
    let mut prices = vec![scenario.spot; len];
    // Running minimum includes the initial spot
    let mut minimums = prices.clone();

    for _ in 0..steps {
        model.advance(&mut prices, dt, rng);
        for (min, &price) in minimums.iter_mut().zip(&prices) {
            if price < *min {
                *min = price;
            }
        }
    }

    let strike = scenario.strike;
    let mut tally = ChunkTally::default();
    for (&final_price, &min) in prices.iter().zip(&minimums) {
        if min <= strike {
            tally.touched += 1;
        }
        if final_price < strike {
            tally.itm += 1;
            tally.shortfall_sum += strike - final_price;
        }
    }
    tally
}

/// splitmix64 mix of a root seed and a stream id. Used to give every chunk,
/// candidate and model an independent, reproducible generator.
#[inline]
pub fn derive_seed(root: u64, stream: u64) -> u64 {
    let mut z = root
        .wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
