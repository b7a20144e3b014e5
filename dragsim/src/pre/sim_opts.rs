use clap::Parser;
use helpers::general::InputValueError;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    author = "Alexander Heilmeier <alexander.heilmeier@tum.de>",
    name = "DRAG-RS",
    about = "A two-lane pixel drag race written in Rust"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging and progress printing
    #[clap(short, long)]
    pub debug: bool,

    /// Activate GUI - the race is played in real-time against the AI or a second player
    #[clap(short, long)]
    pub gui: bool,

    /// Print the event log after every headless race
    #[clap(short, long)]
    pub events: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of headless AI-vs-AI races (only for non-GUI mode, ignored in GUI mode)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the game parameter file (OPTIONAL: if not set, built-in defaults are used)
    #[clap(short, long)]
    pub parfile_path: Option<PathBuf>,

    /// Set real-time factor (only relevant in GUI mode)
    #[clap(short, long, default_value = "1.0")]
    pub realtime_factor: f64,

    /// Set simulation tick rate in Hz, should be in the range [10, 240]
    #[clap(short, long, default_value = "60")]
    pub tick_rate: u32,

    /// Seed for the random number generator (OPTIONAL: if not set, a random seed is drawn)
    #[clap(short, long)]
    pub seed: Option<u64>,

    /// Override the AI difficulty from the parameter file, should be in the range ]0.0, 2.0]
    #[clap(long)]
    pub difficulty: Option<f64>,
}

impl SimOpts {
    /// validate checks the option ranges the simulation loop relies on.
    pub fn validate(&self) -> Result<(), InputValueError> {
        if !(10..=240).contains(&self.tick_rate) {
            return Err(InputValueError::new(format!(
                "tick_rate must be in [10, 240] Hz, but is {}",
                self.tick_rate
            )));
        }
        if self.realtime_factor <= 0.0 {
            return Err(InputValueError::new(format!(
                "realtime_factor must be positive, but is {}",
                self.realtime_factor
            )));
        }
        Ok(())
    }
}

/// run_seed returns the seed of the headless run with the given index. Seeds wrap around at the
/// end of the u64 range.
pub fn run_seed(seed: u64, run: u64) -> u64 {
    seed.wrapping_add(run)
}
