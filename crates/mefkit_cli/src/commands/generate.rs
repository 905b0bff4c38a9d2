//! Generate command implementation.

use super::write::{report, write_samples, WriteOptions};
use mefkit_core::signal::pink_noise;
use mefkit_core::SessionWriter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

/// Pink noise parameters.
#[derive(Debug, Clone, Copy)]
pub struct NoiseOptions {
    /// Signal length in seconds.
    pub seconds: f64,
    /// Lower amplitude bound.
    pub low: f64,
    /// Upper amplitude bound.
    pub high: f64,
    /// RNG seed; random when absent.
    pub seed: Option<u64>,
}

/// Runs the generate command.
pub fn run(
    writer: &mut SessionWriter,
    noise: NoiseOptions,
    options: &WriteOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = match noise.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let samples = pink_noise(
        options.sampling_frequency,
        noise.seconds,
        noise.low,
        noise.high,
        &mut rng,
    )?;
    info!(channel = %options.channel, samples = samples.len(), "generated pink noise");

    let summary = write_samples(writer, &samples, options)?;
    report(&summary);
    Ok(())
}
