//! Batch stepping across independent environment instances.
//!
//! There is no concurrency *inside* a step — each environment is stepped
//! exactly as in the sequential path, one instance per Rayon task.  Results
//! are therefore bitwise identical to stepping each environment in a loop.

use rayon::prelude::*;

use crate::{env::MettaGrid, error::EnvResult};

/// Step every environment once, in parallel.
///
/// The result vector is index-aligned with `envs`.
pub fn step_batch(envs: &mut [MettaGrid]) -> Vec<EnvResult<()>> {
    envs.par_iter_mut().map(|env| env.step()).collect()
}
