use anyhow::Context;
use clap::Parser;
use dragsim::core::handle_session::{handle_session_headless, handle_session_realtime};
use dragsim::pre::read_sim_pars::load_game_pars;
use dragsim::pre::sim_opts::{run_seed, SimOpts};
use gui::core::gui::RaceView;
use rayon::prelude::*;
use std::thread;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();
    sim_opts.validate().context("Invalid command line options!")?;

    // set up logging, RUST_LOG still takes precedence if set
    let default_filter = if sim_opts.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // get game parameters
    if let Some(parfile_path) = &sim_opts.parfile_path {
        log::info!("Reading game parameters from {:?}", parfile_path);
    } else {
        log::info!("No parameter file given, using built-in defaults");
    }
    let mut game_pars = load_game_pars(sim_opts.parfile_path.as_deref())?;

    if let Some(difficulty) = sim_opts.difficulty {
        game_pars.ai_pars.difficulty = difficulty;
        game_pars
            .validate()
            .context("Invalid difficulty given on the command line!")?;
    }

    let seed = sim_opts.seed.unwrap_or_else(rand::random);
    log::info!(
        "Race distance {:.0}, tick rate {} Hz, seed {}",
        game_pars.race_pars.race_distance,
        sim_opts.tick_rate,
        seed
    );

    // EXECUTION -----------------------------------------------------------------------------------
    if !sim_opts.gui {
        // NON-GUI CASE
        log::info!("Running {} headless race(s)...", sim_opts.no_sim_runs);
        let t_start = Instant::now();

        let race_results: Vec<_> = (0..sim_opts.no_sim_runs as u64)
            .into_par_iter()
            .map(|i| handle_session_headless(&game_pars, run_seed(seed, i), sim_opts.tick_rate))
            .collect::<anyhow::Result<_>>()?;

        log::info!("Execution time: {}ms", t_start.elapsed().as_millis());

        // POST-PROCESSING -------------------------------------------------------------------------
        for (i, race_result) in race_results.iter().enumerate() {
            println!("RESULT: Race {} (seed {})", i + 1, run_seed(seed, i as u64));
            race_result.print_race_times();
            if sim_opts.events {
                race_result.print_events();
            }
        }
    } else {
        // GUI CASE
        log::info!("Starting interactive session...");

        // create channels for the communication between GUI and simulator
        let (tx_frame, rx_frame) = flume::unbounded();
        let (tx_input, rx_input) = flume::unbounded();

        // run the simulator in a separate thread, the GUI must stay on the main thread
        let sim_opts_thread = sim_opts.clone();
        let game_pars_thread = game_pars.clone();

        let _ = thread::spawn(move || {
            let result = handle_session_realtime(
                &game_pars_thread,
                seed,
                sim_opts_thread.tick_rate,
                sim_opts_thread.realtime_factor,
                &tx_frame,
                &rx_input,
            );
            if let Err(e) = &result {
                log::error!("Simulator stopped: {:#}", e);
            }
            result
        });

        let gui = RaceView::new(rx_frame, tx_input);
        let native_options = eframe::NativeOptions {
            initial_window_size: Some(eframe::egui::Vec2::new(1280.0, 720.0)),
            ..eframe::NativeOptions::default()
        };
        eframe::run_native(Box::new(gui), native_options);
    }

    Ok(())
}
