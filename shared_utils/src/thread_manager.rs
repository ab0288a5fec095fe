//! Encoder thread sizing
//!
//! The orchestrator itself is single-threaded; the only parallelism is the
//! `-threads` hint handed to the encoder process.

/// Upper bound of the encoder thread hint.
pub const MAX_ENCODER_THREADS: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct ThreadConfig {
    /// When false no `-threads` directive is emitted at all.
    pub multithreading: bool,
    pub max_threads: usize,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            multithreading: true,
            max_threads: MAX_ENCODER_THREADS,
        }
    }
}

/// Clamps a CPU count into `1..=max_threads`.
pub fn clamp_threads(cpu_count: usize, max_threads: usize) -> usize {
    cpu_count.clamp(1, max_threads.max(1))
}

/// Thread hint for the encoder, or `None` when multithreading is off.
pub fn encoder_threads(config: &ThreadConfig) -> Option<usize> {
    config
        .multithreading
        .then(|| clamp_threads(num_cpus::get(), config.max_threads))
}
