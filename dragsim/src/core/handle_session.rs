use crate::core::session::{GamePars, GameState, Session, SessionCommand};
use crate::interfaces::clock::{Clock, ManualClock, MonotonicClock};
use crate::interfaces::gui_interface::{
    FrameState, InputMsg, SpriteColors, MAX_GUI_UPDATE_FREQUENCY,
};
use crate::interfaces::input::{InputState, Key};
use crate::interfaces::render::{DrawList, RgbColor};
use crate::post::race_result::RaceResult;
use anyhow::Context;
use flume::{Receiver, Sender, TryRecvError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Upper bound for a headless race, ten minutes at 60 Hz.
const MAX_HEADLESS_TICKS: u64 = 36_000;

/// handle_session_headless races two AI cars against each other as fast as possible and returns
/// the results for post-processing. The clock advances by one tick duration per simulated tick.
pub fn handle_session_headless(
    game_pars: &GamePars,
    seed: u64,
    tick_rate: u32,
) -> anyhow::Result<RaceResult> {
    let mut session = Session::new_autopilot(game_pars.to_owned(), StdRng::seed_from_u64(seed));
    anyhow::ensure!(tick_rate > 0, "Tick rate must be positive!");
    let clock = ManualClock::new(0);
    let idle = InputState::new();

    session.on_key_press(Key::Space, clock.now_ms());
    session.on_key_press(Key::Space, clock.now_ms());

    let mut t_progress_print = 0u64;

    while session.game_state != GameState::Finished {
        if session.tick >= MAX_HEADLESS_TICKS {
            anyhow::bail!(
                "Race with seed {} did not finish within {} ticks!",
                seed,
                MAX_HEADLESS_TICKS
            );
        }

        clock.advance(
            tick_end_ms(session.tick + 1, tick_rate) - tick_end_ms(session.tick, tick_rate),
        );
        session.update(&clock, &idle);

        if clock.now_ms() >= t_progress_print + 1000 {
            log::debug!(
                "Simulating... Current time is {:.3}s, lead car at {:.0} of {:.0}",
                clock.now_ms() as f64 / 1000.0,
                session.lead_distance(),
                session.race_distance()
            );
            t_progress_print = clock.now_ms();
        }
    }

    log::info!("Race with seed {} finished after {} ticks", seed, session.tick);
    Ok(session.race_result())
}

/// handle_session_realtime runs an interactive session in real-time. Input arrives from the GUI
/// through `rx`, rendered frames are sent back through `tx`. The loop ends when the GUI quits or
/// disconnects. Returns the result of the last finished race, if any.
pub fn handle_session_realtime(
    game_pars: &GamePars,
    seed: u64,
    tick_rate: u32,
    realtime_factor: f64,
    tx: &Sender<FrameState>,
    rx: &Receiver<InputMsg>,
) -> anyhow::Result<Option<RaceResult>> {
    let sprite_colors = SpriteColors {
        player: RgbColor::from_css(&game_pars.vehicle_pars.player_color)
            .context("Invalid player car color!")?,
        opponent: RgbColor::from_css(&game_pars.vehicle_pars.opponent_color)
            .context("Invalid opponent car color!")?,
    };

    anyhow::ensure!(tick_rate > 0, "Tick rate must be positive!");
    anyhow::ensure!(realtime_factor > 0.0, "Real-time factor must be positive!");

    let mut session = Session::new(game_pars.to_owned(), StdRng::seed_from_u64(seed));
    let clock = MonotonicClock::new();
    let tick_duration_s = 1.0 / tick_rate as f64;
    let mut input = InputState::new();
    let mut last_result = None;
    let mut result_sent = false;
    let mut t_gui_update: Option<Instant> = None;

    loop {
        let t_start = Instant::now();

        // handle input messages
        loop {
            match rx.try_recv() {
                Ok(InputMsg::Keys(keys)) => input = keys,
                Ok(InputMsg::KeyPressed(key)) => {
                    match session.on_key_press(key, clock.now_ms()) {
                        SessionCommand::Continue => {}
                        SessionCommand::Reset => {
                            session = session.reset();
                            result_sent = false;
                        }
                        SessionCommand::Quit => return Ok(last_result),
                    }
                }
                Ok(InputMsg::Quit) | Err(TryRecvError::Disconnected) => return Ok(last_result),
                Err(TryRecvError::Empty) => break,
            }
        }

        session.update(&clock, &input);

        let final_result = if session.game_state == GameState::Finished && !result_sent {
            let result = session.race_result();
            result.print_race_times();
            last_result = Some(result.to_owned());
            result_sent = true;
            Some(result)
        } else {
            None
        };

        let gui_due = match t_gui_update {
            Some(t) => t.elapsed().as_secs_f64() > 1.0 / MAX_GUI_UPDATE_FREQUENCY - 0.001,
            None => true,
        };
        if gui_due || final_result.is_some() {
            let mut draw_list = DrawList::new();
            session.render(&mut draw_list, clock.now_ms());

            let frame = FrameState {
                draw_cmds: draw_list.cmds,
                game_state: session.game_state,
                sprite_colors,
                final_result,
            };

            // a failed send means the window was closed
            if tx.send(frame).is_err() {
                log::info!("GUI disconnected, stopping the session");
                return Ok(last_result);
            }
            t_gui_update = Some(Instant::now());
        }

        // sleep until the tick is finished in real-time as well
        let t_sleep = tick_duration_s / realtime_factor - t_start.elapsed().as_secs_f64();

        if t_sleep > 0.0 {
            sleep(Duration::from_secs_f64(t_sleep));
        } else {
            log::warn!("Could not keep up with real-time!")
        }
    }
}

/// tick_end_ms returns the clock time at the end of the given tick. Rounding happens per tick
/// boundary, so the fractional part of the tick length never accumulates.
fn tick_end_ms(tick: u64, tick_rate: u32) -> u64 {
    tick * 1000 / tick_rate as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_race_finishes_with_both_cars() {
        let result = handle_session_headless(&GamePars::default(), 42, 60).unwrap();
        assert_eq!(result.vehicles.len(), 2);
        assert!(result.vehicles.iter().all(|v| v.race_time_s.is_some()));
        assert!(result.vehicles.iter().all(|v| !v.is_human));
        assert!(result.ticks < MAX_HEADLESS_TICKS);
    }

    #[test]
    fn headless_races_are_reproducible_per_seed() {
        let a = handle_session_headless(&GamePars::default(), 7, 60).unwrap();
        let b = handle_session_headless(&GamePars::default(), 7, 60).unwrap();
        assert_eq!(a.ticks, b.ticks);
        assert_eq!(a.events, b.events);
        assert_eq!(a.vehicles, b.vehicles);
    }

    #[test]
    fn tick_boundaries_keep_fractional_milliseconds() {
        assert_eq!(tick_end_ms(1, 60), 16);
        assert_eq!(tick_end_ms(2, 60), 33);
        assert_eq!(tick_end_ms(60, 60), 1000);
        // tick rates above 1000 Hz still move the clock forward on average
        assert_eq!(tick_end_ms(2000, 2000), 1000);
    }

    #[test]
    fn headless_race_finishes_at_high_tick_rate() {
        let result = handle_session_headless(&GamePars::default(), 42, 2000).unwrap();
        assert!(result.vehicles.iter().all(|v| v.race_time_s.is_some()));
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        assert!(handle_session_headless(&GamePars::default(), 1, 0).is_err());
    }

    #[test]
    fn realtime_session_stops_on_quit() {
        let (tx_frame, rx_frame) = flume::unbounded();
        let (tx_input, rx_input) = flume::unbounded();
        tx_input.send(InputMsg::KeyPressed(Key::Space)).unwrap();
        tx_input.send(InputMsg::Quit).unwrap();

        let result =
            handle_session_realtime(&GamePars::default(), 1, 60, 1.0, &tx_frame, &rx_input)
                .unwrap();
        assert!(result.is_none());
        // quitting happens before the first frame is rendered
        assert!(rx_frame.try_recv().is_err());
    }

    #[test]
    fn realtime_session_sends_frames_until_gui_disconnects() {
        let (tx_frame, rx_frame) = flume::bounded(1);
        let (_tx_input, rx_input) = flume::unbounded::<InputMsg>();

        let handle = std::thread::spawn(move || {
            handle_session_realtime(&GamePars::default(), 3, 60, 10.0, &tx_frame, &rx_input)
        });

        let frame = rx_frame.recv().unwrap();
        assert_eq!(frame.game_state, GameState::Title);
        assert!(!frame.draw_cmds.is_empty());
        assert_eq!(frame.sprite_colors.player, RgbColor::new(0xe0, 0x30, 0x30));
        drop(rx_frame);

        assert!(handle.join().unwrap().unwrap().is_none());
    }
}
