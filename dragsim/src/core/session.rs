use crate::core::controller::{AiController, AiPars, Controller, PlayerSlot};
use crate::core::obstacles::{LightState, ObstaclePars, ObstacleSet};
use crate::core::particles::{ParticleEngine, ParticleShape};
use crate::core::vehicle::{TickEvents, Vehicle, VehiclePars};
use crate::interfaces::clock::Clock;
use crate::interfaces::input::{InputState, Key};
use crate::interfaces::render::{RenderSink, RgbColor, RgbaColor, SpriteId, TextSize};
use crate::post::race_result::{
    outcome_text, Outcome, RaceEvent, RaceEventKind, RaceResult, VehicleSummary,
};
use helpers::general::{lerp_towards, max, InputValueError};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Deserialize;
use std::f64::consts::PI;
use std::fmt;

pub const SCREEN_WIDTH: f64 = 800.0;
pub const SCREEN_HEIGHT: f64 = 600.0;
/// Baselines of lane 0 (player) and lane 1 (opponent).
pub const LANE_Y: [f64; 2] = [SCREEN_HEIGHT - 180.0, SCREEN_HEIGHT - 260.0];

const RAMP_WIDTH: f64 = 120.0;
const OIL_RADIUS: f64 = 25.0;
const MARKER_SPACING: f64 = 500.0;
const SEASON_TRANSITION_RANGE: f64 = 100.0;

const WHITE: RgbColor = RgbColor::new(255, 255, 255);
const LIGHT_GRAY: RgbColor = RgbColor::new(200, 200, 200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn from_index(idx: usize) -> Season {
        match idx {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// from_progress maps the race progress fraction onto four equal quartiles.
    pub fn from_progress(progress: f64) -> Season {
        Season::from_index(season_index(progress))
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        }
    }

    /// ramp_colors returns fill and outline colour of the ramps.
    fn ramp_colors(self) -> (RgbColor, RgbColor) {
        match self {
            Season::Spring => (RgbColor::new(100, 180, 100), RgbColor::new(80, 140, 80)),
            Season::Summer => (RgbColor::new(180, 140, 60), RgbColor::new(140, 100, 40)),
            Season::Autumn => (RgbColor::new(170, 90, 40), RgbColor::new(130, 70, 30)),
            Season::Winter => (RgbColor::new(200, 200, 220), RgbColor::new(170, 170, 190)),
        }
    }
}

/// season_index returns min(3, floor(4 * min(1, progress))).
pub fn season_index(progress: f64) -> usize {
    ((progress.clamp(0.0, 1.0) * 4.0) as usize).min(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GameState {
    Title,
    Ready,
    Countdown,
    Racing,
    Finished,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            GameState::Title => "title",
            GameState::Ready => "ready",
            GameState::Countdown => "countdown",
            GameState::Racing => "racing",
            GameState::Finished => "finished",
        };
        write!(f, "{}", name)
    }
}

/// SessionCommand tells the driver what to do after a key press. Resetting and quitting replace
/// or drop the session value, so they cannot be done by the session itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Continue,
    Reset,
    Quit,
}

/// * `race_distance` - (units) Distance from the start to the finish line
/// * `countdown_steps` - Number of countdown steps before the start signal
/// * `countdown_step_ms` - (ms) Clock time per countdown step
/// * `camera_lead` - (units) Distance the camera keeps behind the lead car
/// * `camera_smoothing` - (-) Fraction of the camera gap closed per tick
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RacePars {
    pub race_distance: f64,
    pub countdown_steps: u32,
    pub countdown_step_ms: u64,
    pub camera_lead: f64,
    pub camera_smoothing: f64,
}

impl Default for RacePars {
    fn default() -> Self {
        RacePars {
            race_distance: 6000.0,
            countdown_steps: 3,
            countdown_step_ms: 1000,
            camera_lead: 300.0,
            camera_smoothing: 0.1,
        }
    }
}

/// GamePars bundles all parameters required to set up a session.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GamePars {
    pub race_pars: RacePars,
    pub vehicle_pars: VehiclePars,
    pub obstacle_pars: ObstaclePars,
    pub ai_pars: AiPars,
}

impl GamePars {
    pub fn validate(&self) -> Result<(), InputValueError> {
        let race_pars = &self.race_pars;

        // oil spills need a placement window between both track margins
        if race_pars.race_distance < 1600.0 {
            return Err(InputValueError::new(format!(
                "race_distance must be at least 1600, but is {}",
                race_pars.race_distance
            )));
        }
        if race_pars.countdown_steps == 0 {
            return Err(InputValueError::new("countdown_steps must be positive"));
        }
        if !(race_pars.camera_smoothing > 0.0 && race_pars.camera_smoothing <= 1.0) {
            return Err(InputValueError::new(format!(
                "camera_smoothing must be in ]0.0, 1.0], but is {}",
                race_pars.camera_smoothing
            )));
        }

        self.vehicle_pars.validate()?;
        self.obstacle_pars.validate(race_pars.race_distance)?;
        self.ai_pars.validate()
    }
}

/// Session is the race state machine title -> ready -> countdown -> racing -> finished. It owns
/// both vehicles, the obstacles, the environment particles and the random number generator.
#[derive(Debug)]
pub struct Session {
    pub game_state: GameState,
    pub countdown: u32,
    countdown_timer_ms: u64,
    pub race_start_ms: u64,
    pub camera_offset: f64,
    pub two_player_mode: bool,
    pub autopilot: bool,
    pub player: Vehicle,
    pub opponent: Vehicle,
    pub obstacles: ObstacleSet,
    pub particles: ParticleEngine,
    pub tick: u64,
    pub events: Vec<RaceEvent>,
    pars: GamePars,
    rng: StdRng,
}

impl Session {
    /// new creates a session on the title screen with the player against the AI.
    pub fn new(pars: GamePars, rng: StdRng) -> Session {
        Session::build(pars, rng, false, false)
    }

    /// new_autopilot creates a session in which the player car is driven by the AI as well. The
    /// headless driver uses it for AI-vs-AI races.
    pub fn new_autopilot(pars: GamePars, rng: StdRng) -> Session {
        Session::build(pars, rng, false, true)
    }

    fn build(pars: GamePars, mut rng: StdRng, two_player_mode: bool, autopilot: bool) -> Session {
        let player_controller = if autopilot {
            Controller::Ai(AiController::new(pars.ai_pars.difficulty, &mut rng))
        } else {
            Controller::Human(PlayerSlot::One)
        };
        let player = Vehicle::new(
            &pars.vehicle_pars,
            0,
            LANE_Y[0],
            SpriteId::PlayerCar,
            player_controller,
        );
        let opponent = build_opponent(&pars, two_player_mode, &mut rng);
        let obstacles = ObstacleSet::new(&pars.obstacle_pars, pars.race_pars.race_distance);

        Session {
            game_state: GameState::Title,
            countdown: pars.race_pars.countdown_steps,
            countdown_timer_ms: 0,
            race_start_ms: 0,
            camera_offset: 0.0,
            two_player_mode,
            autopilot,
            player,
            opponent,
            obstacles,
            particles: ParticleEngine::new(),
            tick: 0,
            events: Vec::new(),
            pars,
            rng,
        }
    }

    /// reset consumes the session and returns a fresh one in the ready state. Game mode,
    /// parameters and the random number stream are carried over.
    pub fn reset(self) -> Session {
        let mut session =
            Session::build(self.pars, self.rng, self.two_player_mode, self.autopilot);
        session.game_state = GameState::Ready;
        log::info!("Session reset");
        session
    }

    pub fn pars(&self) -> &GamePars {
        &self.pars
    }

    pub fn race_distance(&self) -> f64 {
        self.pars.race_pars.race_distance
    }

    // ---------------------------------------------------------------------------------------------
    // STATE TRANSITIONS ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// on_key_press handles the discrete key events of the menus.
    pub fn on_key_press(&mut self, key: Key, now_ms: u64) -> SessionCommand {
        match (key, self.game_state) {
            (Key::Escape, _) => SessionCommand::Quit,
            (Key::Space, GameState::Title) => {
                self.set_state(GameState::Ready);
                SessionCommand::Continue
            }
            (Key::Space, GameState::Ready) => {
                self.start_countdown(now_ms);
                SessionCommand::Continue
            }
            (Key::T, GameState::Title) => {
                self.toggle_two_player_mode();
                SessionCommand::Continue
            }
            (Key::R, GameState::Racing) | (Key::R, GameState::Finished) => SessionCommand::Reset,
            _ => SessionCommand::Continue,
        }
    }

    /// toggle_two_player_mode swaps the opponent between AI and the second human player. Only
    /// possible on the title screen.
    pub fn toggle_two_player_mode(&mut self) -> bool {
        if self.game_state != GameState::Title {
            return self.two_player_mode;
        }
        self.two_player_mode = !self.two_player_mode;
        self.opponent = build_opponent(&self.pars, self.two_player_mode, &mut self.rng);
        log::debug!("Two player mode: {}", self.two_player_mode);
        self.two_player_mode
    }

    pub fn start_countdown(&mut self, now_ms: u64) {
        if self.game_state != GameState::Ready {
            return;
        }
        self.set_state(GameState::Countdown);
        self.countdown = self.pars.race_pars.countdown_steps;
        self.countdown_timer_ms = now_ms;
    }

    pub fn start_race(&mut self, now_ms: u64) {
        if self.game_state != GameState::Countdown {
            return;
        }
        self.set_state(GameState::Racing);
        self.race_start_ms = now_ms;
        self.player.start_time_ms = now_ms;
        self.opponent.start_time_ms = now_ms;
    }

    fn set_state(&mut self, state: GameState) {
        log::debug!("Game state {} -> {}", self.game_state, state);
        self.game_state = state;
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// update advances the session by one tick.
    pub fn update(&mut self, clock: &dyn Clock, input: &InputState) {
        let now_ms = clock.now_ms();
        self.tick += 1;

        if self.game_state == GameState::Countdown {
            self.update_countdown(now_ms);
        }

        let race_active = self.game_state == GameState::Racing;
        let time_s = self.race_time_s(now_ms);

        if race_active {
            self.obstacles.advance_lights();
        }

        // vehicles
        let Session {
            player,
            opponent,
            obstacles,
            rng,
            events,
            tick,
            ..
        } = self;

        for (idx, vehicle) in [player, opponent].into_iter().enumerate() {
            // a red light standstill ignores all controls
            let controllable = race_active && !vehicle.finished && !vehicle.penalized;
            if controllable && vehicle.apply_controls(input, rng) {
                push_event(events, RaceEventKind::Boost, *tick, time_s, idx);
            }

            let tick_events = vehicle.update(
                race_active,
                &obstacles.ramps,
                &obstacles.oil_spills,
                &obstacles.traffic_lights,
                rng,
            );
            log_tick_events(events, &tick_events, *tick, time_s, idx);
        }

        if race_active {
            if let Some(spill) = self.obstacles.update_oil_spawning(&mut self.rng, now_ms) {
                log::debug!(
                    "Oil spill at {} in lane {} (tick {})",
                    spill.position,
                    spill.lane,
                    self.tick
                );
            }

            let target = (self.lead_distance() - self.pars.race_pars.camera_lead).max(0.0);
            self.camera_offset = lerp_towards(
                self.camera_offset,
                target,
                self.pars.race_pars.camera_smoothing,
            );

            self.check_finish(now_ms, time_s);

            if self.player.finished && self.opponent.finished {
                self.set_state(GameState::Finished);
            }
        }

        self.particles.advance();
        self.spawn_environment_particles();
    }

    fn update_countdown(&mut self, now_ms: u64) {
        let elapsed_ms = now_ms.saturating_sub(self.countdown_timer_ms);
        if elapsed_ms <= self.pars.race_pars.countdown_step_ms {
            return;
        }

        self.countdown = self.countdown.saturating_sub(1);
        self.countdown_timer_ms = now_ms;

        for _ in 0..20 {
            self.particles.sparks(
                &mut self.rng,
                SCREEN_WIDTH / 2.0,
                SCREEN_HEIGHT / 2.0 + 50.0,
                30,
            );
        }

        if self.countdown == 0 {
            self.start_race(now_ms);
        }
    }

    /// check_finish flags every vehicle that reached the finish line in this tick.
    fn check_finish(&mut self, now_ms: u64, time_s: f64) {
        let race_distance = self.pars.race_pars.race_distance;

        for idx in 0..2 {
            let vehicle = if idx == 0 {
                &mut self.player
            } else {
                &mut self.opponent
            };
            if vehicle.finished || vehicle.distance < race_distance {
                continue;
            }

            vehicle.mark_finished(now_ms);
            let lane_y = vehicle.y;
            log::info!(
                "Vehicle {} finished after {:.3}s",
                idx,
                vehicle.race_time_ms().unwrap_or(0) as f64 / 1000.0
            );
            push_event(&mut self.events, RaceEventKind::Finish, self.tick, time_s, idx);

            for _ in 0..50 {
                let x = SCREEN_WIDTH - 100.0 + self.rng.gen_range(-20.0..=20.0);
                let y = lane_y + self.rng.gen_range(-20.0..=20.0);
                self.particles.sparks(&mut self.rng, x, y, 50);
            }
        }
    }

    /// spawn_environment_particles adds the screen space effects: ambient particles, season
    /// transition particles and bubbles over visible oil spills.
    fn spawn_environment_particles(&mut self) {
        let racing = self.game_state == GameState::Racing;

        if (racing || self.game_state == GameState::Countdown) && self.rng.gen::<f64>() < 0.1 {
            let x = self.rng.gen_range(0..=SCREEN_WIDTH as u32) as f64;
            let y = self.rng.gen_range(0..=(SCREEN_HEIGHT / 2.0) as u32) as f64;
            self.spawn_drifting(x, y, WHITE, (1.0, 3.0), (0.5, 2.0), 0.2, (30, 90), 100);
        }

        if !racing {
            return;
        }

        let lead = self.lead_distance();
        let season_length = self.race_distance() / 4.0;
        for boundary_idx in 1..4 {
            let boundary = boundary_idx as f64 * season_length;
            if (lead - boundary).abs() >= SEASON_TRANSITION_RANGE {
                continue;
            }

            let color = match boundary_idx {
                1 => RgbColor::new(255, 255, 100),
                2 => RgbColor::new(200, 100, 50),
                _ => WHITE,
            };
            for _ in 0..5 {
                let x = self.rng.gen_range(0..=SCREEN_WIDTH as u32) as f64;
                let y = self.rng.gen_range(0..=(SCREEN_HEIGHT / 2.0) as u32) as f64;
                self.spawn_drifting(x, y, color, (2.0, 5.0), (1.0, 3.0), 0.5, (30, 60), 150);
            }
        }

        let visible: Vec<(f64, f64)> = self
            .obstacles
            .oil_spills
            .iter()
            .map(|s| (self.world_to_screen(s.position), LANE_Y[s.lane] + 35.0))
            .filter(|(x, _)| (0.0..=SCREEN_WIDTH).contains(x))
            .collect();
        for (x, y) in visible {
            if self.rng.gen::<f64>() <= 0.9 {
                continue;
            }
            let px = x + self.rng.gen_range(-OIL_RADIUS..=OIL_RADIUS);
            let py = y + self.rng.gen_range(-OIL_RADIUS / 2.0..=OIL_RADIUS / 2.0);
            let size = self.rng.gen_range(1.0..=3.0);
            let speed = self.rng.gen_range(0.2..=0.5);
            let direction = self.rng.gen_range(0.0..=2.0 * PI);
            let lifetime = self.rng.gen_range(10..=30);
            self.particles.spawn(
                px,
                py,
                RgbColor::new(30, 30, 30),
                size,
                speed,
                direction,
                lifetime,
                150,
                ParticleShape::Circle,
            );
        }
    }

    /// spawn_drifting adds one particle falling roughly downwards.
    #[allow(clippy::too_many_arguments)]
    fn spawn_drifting(
        &mut self,
        x: f64,
        y: f64,
        color: RgbColor,
        size: (f64, f64),
        speed: (f64, f64),
        spread: f64,
        lifetime: (u32, u32),
        alpha: u8,
    ) {
        let size = self.rng.gen_range(size.0..=size.1);
        let speed = self.rng.gen_range(speed.0..=speed.1);
        let direction = PI / 2.0 + self.rng.gen_range(-spread..=spread);
        let lifetime = self.rng.gen_range(lifetime.0..=lifetime.1);
        self.particles.spawn(
            x,
            y,
            color,
            size,
            speed,
            direction,
            lifetime,
            alpha,
            ParticleShape::Circle,
        );
    }

    // ---------------------------------------------------------------------------------------------
    // QUERIES -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// lead_distance returns the distance of the car further down the track.
    pub fn lead_distance(&self) -> f64 {
        max(&[self.player.distance, self.opponent.distance])
    }

    pub fn progress_fraction(&self) -> f64 {
        (self.lead_distance() / self.race_distance()).min(1.0)
    }

    pub fn season_index(&self) -> usize {
        season_index(self.progress_fraction())
    }

    /// season returns the season shown in the background, summer while in the menus.
    pub fn season(&self) -> Season {
        match self.game_state {
            GameState::Racing | GameState::Finished => Season::from_index(self.season_index()),
            _ => Season::Summer,
        }
    }

    fn race_time_s(&self, now_ms: u64) -> f64 {
        match self.game_state {
            GameState::Racing | GameState::Finished => {
                now_ms.saturating_sub(self.race_start_ms) as f64 / 1000.0
            }
            _ => 0.0,
        }
    }

    fn world_to_screen(&self, position: f64) -> f64 {
        self.pars.vehicle_pars.lane_origin_x + position - self.camera_offset
    }

    /// race_result collects the summary of the current race for post-processing.
    pub fn race_result(&self) -> RaceResult {
        RaceResult {
            race_distance: self.race_distance(),
            ticks: self.tick,
            vehicles: vec![
                summarize(&self.player, 0),
                summarize(&self.opponent, 1),
            ],
            events: self.events.to_owned(),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // RENDERING -----------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// render draws the complete frame. It does not change the session.
    pub fn render(&self, sink: &mut dyn RenderSink, now_ms: u64) {
        let season = self.season();
        sink.blit(SpriteId::Background(season), 0.0, 0.0);

        self.render_ramps(sink, Season::from_index(self.season_index()));
        self.render_finish_line(sink);
        self.render_markers(sink);
        self.render_oil_spills(sink);
        self.render_traffic_lights(sink);

        self.particles.render(sink, 0.0);
        self.player.render(sink, self.camera_offset);
        self.opponent.render(sink, self.camera_offset);

        self.render_hud(sink, now_ms);
    }

    fn render_ramps(&self, sink: &mut dyn RenderSink, season: Season) {
        let (fill, outline) = season.ramp_colors();
        let road_y = LANE_Y[0] + 35.0;

        for ramp in self.obstacles.ramps.iter() {
            let x = self.world_to_screen(ramp.position);
            if !(0.0..=SCREEN_WIDTH).contains(&x) {
                continue;
            }
            let h = ramp.height;
            let points = [
                (x, road_y),
                (x + RAMP_WIDTH, road_y),
                (x + RAMP_WIDTH, road_y - h),
                (x + RAMP_WIDTH / 3.0, road_y - h / 3.0),
            ];
            sink.polygon(fill.into(), &points);
            for i in 0..points.len() {
                sink.line(outline.into(), points[i], points[(i + 1) % points.len()], 3.0);
            }

            let highlight_width = if season == Season::Winter { 3.0 } else { 2.0 };
            sink.line(WHITE.into(), points[3], points[2], highlight_width);
            sink.text(
                "RAMP",
                x + RAMP_WIDTH / 2.0 - 20.0,
                road_y - h / 2.0 - 10.0,
                TextSize::Small,
                WHITE.into(),
            );

            // warning stripes
            let stripe_width = RAMP_WIDTH / 5.0;
            for i in 0..5 {
                let color = if i % 2 == 0 {
                    RgbColor::new(255, 255, 0)
                } else {
                    RgbColor::new(0, 0, 0)
                };
                let stripe_x = x + i as f64 * stripe_width;
                sink.rect(color.into(), stripe_x, road_y - 5.0, stripe_width, 5.0);
            }
        }
    }

    fn render_finish_line(&self, sink: &mut dyn RenderSink) {
        let x = self.world_to_screen(self.race_distance());
        if !(0.0..=SCREEN_WIDTH).contains(&x) {
            return;
        }
        for row in 0..(SCREEN_HEIGHT / 10.0) as usize {
            for col in 0..2 {
                let color = if (row + col) % 2 == 0 {
                    WHITE
                } else {
                    RgbColor::new(0, 0, 0)
                };
                let (rect_x, rect_y) = (x + col as f64 * 10.0, row as f64 * 10.0);
                sink.rect(color.into(), rect_x, rect_y, 10.0, 10.0);
            }
        }
    }

    fn render_markers(&self, sink: &mut dyn RenderSink) {
        let no_markers = (self.race_distance() / MARKER_SPACING) as usize;
        for i in 1..=no_markers {
            let distance = i as f64 * MARKER_SPACING;
            let x = self.world_to_screen(distance);
            if !(0.0..=SCREEN_WIDTH).contains(&x) {
                continue;
            }
            sink.line(
                LIGHT_GRAY.into(),
                (x, SCREEN_HEIGHT - 300.0),
                (x, SCREEN_HEIGHT),
                1.0,
            );
            sink.text(
                &format!("{}m", distance),
                x - 15.0,
                SCREEN_HEIGHT - 320.0,
                TextSize::Small,
                WHITE.into(),
            );
        }
    }

    fn render_oil_spills(&self, sink: &mut dyn RenderSink) {
        for spill in self.obstacles.oil_spills.iter() {
            let x = self.world_to_screen(spill.position);
            if !(0.0..=SCREEN_WIDTH).contains(&x) {
                continue;
            }
            let y = LANE_Y[spill.lane] + 35.0;
            sink.polygon(
                RgbColor::new(20, 20, 20).into(),
                &ellipse_points((x, y), OIL_RADIUS, OIL_RADIUS / 2.0),
            );
            sink.polygon(
                RgbColor::new(40, 40, 40).into(),
                &ellipse_points((x, y), OIL_RADIUS / 2.0, OIL_RADIUS / 4.0),
            );
        }
    }

    fn render_traffic_lights(&self, sink: &mut dyn RenderSink) {
        for light in self.obstacles.traffic_lights.iter() {
            let x = self.world_to_screen(light.position);
            if !(0.0..=SCREEN_WIDTH).contains(&x) {
                continue;
            }

            // pole and housing
            let housing_y = SCREEN_HEIGHT - 380.0;
            sink.rect(
                RgbColor::new(100, 100, 100).into(),
                x - 5.0,
                SCREEN_HEIGHT - 300.0,
                10.0,
                150.0,
            );
            sink.rect(RgbColor::new(50, 50, 50).into(), x - 15.0, housing_y, 30.0, 80.0);

            let lamps = [
                (LightState::Red, 15.0, RgbColor::new(255, 0, 0), RgbColor::new(100, 0, 0)),
                (LightState::Yellow, 40.0, RgbColor::new(255, 255, 0), RgbColor::new(100, 100, 0)),
                (LightState::Green, 65.0, RgbColor::new(0, 255, 0), RgbColor::new(0, 100, 0)),
            ];
            for (state, dy, on, off) in lamps {
                let color = if light.state == state { on } else { off };
                sink.circle(color.into(), (x, housing_y + dy), 10.0);
                if light.state == state {
                    let glow = RgbaColor {
                        r: on.r.max(100),
                        g: on.g.max(100),
                        b: 100,
                        a: 100,
                    };
                    sink.circle(glow, (x, housing_y + dy), 15.0);
                }
            }
        }
    }

    fn render_hud(&self, sink: &mut dyn RenderSink, now_ms: u64) {
        let center_x = SCREEN_WIDTH / 2.0;

        match self.game_state {
            GameState::Title => {
                let yellow = RgbColor::new(255, 255, 0);
                large_text(sink, "PIXEL DRAG RACE", center_x - 150.0, 100.0, yellow);
                small_text(sink, "Press SPACE to start", center_x - 90.0, 160.0, WHITE);

                let (mode, color) = if self.two_player_mode {
                    ("TWO PLAYER MODE", RgbColor::new(0, 255, 255))
                } else {
                    ("ONE PLAYER MODE", WHITE)
                };
                small_text(sink, mode, center_x - 80.0, 200.0, color);
                small_text(
                    sink,
                    "Press T to toggle game mode",
                    center_x - 120.0,
                    230.0,
                    LIGHT_GRAY,
                );

                let instructions: &[&str] = if self.two_player_mode {
                    &[
                        "Player 1 Controls:",
                        "RIGHT/UP: Accelerate, SPACE: Boost",
                        "Player 2 Controls:",
                        "W/D: Accelerate, LEFT SHIFT: Boost",
                        "R: Restart race",
                    ]
                } else {
                    &[
                        "Controls:",
                        "RIGHT/UP: Accelerate",
                        "SPACE: Boost (when green light is on)",
                        "R: Restart race",
                    ]
                };
                for (i, line) in instructions.iter().enumerate() {
                    let y = 270.0 + i as f64 * 30.0;
                    small_text(sink, line, center_x - 150.0, y, LIGHT_GRAY);
                }
            }
            GameState::Ready => {
                large_text(sink, "Ready?", center_x - 50.0, 100.0, WHITE);
                small_text(
                    sink,
                    "Press SPACE to start countdown",
                    center_x - 130.0,
                    160.0,
                    WHITE,
                );
            }
            GameState::Countdown => {
                let red = RgbColor::new(255, 0, 0);
                large_text(sink, &self.countdown.to_string(), center_x - 10.0, 100.0, red);
            }
            GameState::Racing => {
                self.render_status(sink);
                let elapsed = format!("Time: {:.2}s", self.race_time_s(now_ms));
                small_text(sink, &elapsed, SCREEN_WIDTH - 150.0, 20.0, WHITE);
            }
            GameState::Finished => {
                self.render_status(sink);
                self.render_finish_screen(sink);
            }
        }
    }

    fn render_status(&self, sink: &mut dyn RenderSink) {
        let p = &self.player;
        let speed = format!("Speed: {} km/h", (p.speed * 20.0) as i64);
        let distance = format!("Distance: {} / {}", p.distance as i64, self.race_distance());
        small_text(sink, &speed, 20.0, 20.0, WHITE);
        small_text(sink, &distance, 20.0, 50.0, WHITE);

        let (boost, color) = if p.boost_available {
            ("BOOST: READY", RgbColor::new(0, 255, 0))
        } else if p.boosting {
            ("BOOST: ACTIVE", RgbColor::new(255, 165, 0))
        } else {
            ("BOOST: CHARGING", RgbColor::new(150, 150, 150))
        };
        small_text(sink, boost, 20.0, 80.0, color);

        let season = format!("Season: {}", Season::from_index(self.season_index()).name());
        small_text(sink, &season, 20.0, 110.0, WHITE);

        if p.in_air {
            small_text(sink, "AIR TIME!", 20.0, 140.0, RgbColor::new(100, 200, 255));
        }
        if p.spinning {
            small_text(sink, "SPINNING!", 20.0, 170.0, RgbColor::new(255, 50, 50));
        }
        if p.penalized {
            let red = RgbColor::new(255, 0, 0);
            let remaining = format!("Stop: {:.1}s", p.penalty_remaining_s());
            small_text(sink, "RED LIGHT PENALTY!", 20.0, 200.0, red);
            small_text(sink, &remaining, 20.0, 230.0, red);
        }
    }

    fn render_finish_screen(&self, sink: &mut dyn RenderSink) {
        let overlay = RgbColor::new(0, 0, 0).with_alpha(150);
        sink.rect(overlay, 0.0, 0.0, SCREEN_WIDTH, SCREEN_HEIGHT);

        let outcome = self.race_result().outcome();
        let color = match outcome {
            Outcome::PlayerWins => RgbColor::new(0, 255, 0),
            Outcome::OpponentWins => RgbColor::new(255, 0, 0),
            _ => RgbColor::new(255, 255, 0),
        };
        let center_x = SCREEN_WIDTH / 2.0;
        let center_y = SCREEN_HEIGHT / 2.0;
        let time = |v: &Vehicle| v.race_time_ms().unwrap_or(0) as f64 / 1000.0;
        let player_time = format!("Your Time: {:.2}s", time(&self.player));
        let opponent_time = format!("Opponent Time: {:.2}s", time(&self.opponent));

        large_text(sink, outcome_text(outcome), center_x - 90.0, center_y - 60.0, color);
        small_text(sink, &player_time, center_x - 80.0, center_y, WHITE);
        small_text(sink, &opponent_time, center_x - 95.0, center_y + 30.0, WHITE);
        small_text(
            sink,
            "Press R to restart or ESC to quit",
            center_x - 140.0,
            center_y + 80.0,
            LIGHT_GRAY,
        );
    }
}

fn small_text(sink: &mut dyn RenderSink, text: &str, x: f64, y: f64, color: RgbColor) {
    sink.text(text, x, y, TextSize::Small, color.into());
}

fn large_text(sink: &mut dyn RenderSink, text: &str, x: f64, y: f64, color: RgbColor) {
    sink.text(text, x, y, TextSize::Large, color.into());
}

fn build_opponent<R: Rng + ?Sized>(
    pars: &GamePars,
    two_player_mode: bool,
    rng: &mut R,
) -> Vehicle {
    let controller = if two_player_mode {
        Controller::Human(PlayerSlot::Two)
    } else {
        Controller::Ai(AiController::new(pars.ai_pars.difficulty, rng))
    };
    Vehicle::new(
        &pars.vehicle_pars,
        1,
        LANE_Y[1],
        SpriteId::OpponentCar,
        controller,
    )
}

fn push_event(
    events: &mut Vec<RaceEvent>,
    kind: RaceEventKind,
    tick: u64,
    time_s: f64,
    vehicle: usize,
) {
    events.push(RaceEvent {
        kind,
        tick,
        time_s,
        vehicle,
    });
}

fn log_tick_events(
    events: &mut Vec<RaceEvent>,
    tick_events: &TickEvents,
    tick: u64,
    time_s: f64,
    vehicle: usize,
) {
    if tick_events.launched {
        push_event(events, RaceEventKind::Jump, tick, time_s, vehicle);
    }
    if tick_events.spun_out {
        log::debug!("Vehicle {} hit an oil spill", vehicle);
        push_event(events, RaceEventKind::SpinOut, tick, time_s, vehicle);
    }
    if tick_events.penalized {
        log::debug!("Vehicle {} ran a red light", vehicle);
        push_event(events, RaceEventKind::RedLightPenalty, tick, time_s, vehicle);
    }
}

fn summarize(vehicle: &Vehicle, idx: usize) -> VehicleSummary {
    let name = match &vehicle.controller {
        Controller::Human(PlayerSlot::One) => String::from("Player 1"),
        Controller::Human(PlayerSlot::Two) => String::from("Player 2"),
        Controller::Ai(_) => format!("AI {}", idx + 1),
    };
    VehicleSummary {
        name,
        is_human: vehicle.controller.is_human(),
        race_time_s: vehicle.race_time_ms().map(|t| t as f64 / 1000.0),
        distance: vehicle.distance,
        top_speed: vehicle.stats.top_speed,
        jumps: vehicle.stats.jumps,
        spin_outs: vehicle.stats.spin_outs,
        penalties: vehicle.stats.penalties,
        boosts: vehicle.stats.boosts,
        max_air_time: vehicle.stats.max_air_time,
    }
}

/// ellipse_points approximates an axis-aligned ellipse by a polygon.
fn ellipse_points(center: (f64, f64), rx: f64, ry: f64) -> Vec<(f64, f64)> {
    const NO_SEGMENTS: usize = 16;
    (0..NO_SEGMENTS)
        .map(|i| {
            let phi = 2.0 * PI * i as f64 / NO_SEGMENTS as f64;
            (center.0 + rx * phi.cos(), center.1 + ry * phi.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::clock::ManualClock;
    use crate::interfaces::render::{DrawCmd, DrawList};
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn session(seed: u64) -> Session {
        Session::new(GamePars::default(), StdRng::seed_from_u64(seed))
    }

    /// racing_session runs the menus and the countdown on a manual clock.
    fn racing_session(seed: u64, clock: &ManualClock) -> Session {
        let mut s = session(seed);
        s.on_key_press(Key::Space, clock.now_ms());
        s.on_key_press(Key::Space, clock.now_ms());
        let idle = InputState::new();
        while s.game_state != GameState::Racing {
            clock.advance(17);
            s.update(clock, &idle);
        }
        s
    }

    #[test]
    fn season_quartiles() {
        assert_eq!(season_index(0.0), 0);
        assert_eq!(season_index(0.249), 0);
        assert_eq!(season_index(0.25), 1);
        assert_eq!(season_index(0.74), 2);
        assert_eq!(season_index(0.99), 3);
        assert_eq!(season_index(1.0), 3);
        assert_eq!(Season::from_progress(0.5), Season::Autumn);
    }

    #[test]
    fn menu_keys_move_forward_only() {
        let mut s = session(1);
        assert_eq!(s.on_key_press(Key::R, 0), SessionCommand::Continue);
        assert_eq!(s.game_state, GameState::Title);

        s.on_key_press(Key::Space, 0);
        assert_eq!(s.game_state, GameState::Ready);
        s.on_key_press(Key::T, 0);
        assert!(!s.two_player_mode);

        s.on_key_press(Key::Space, 100);
        assert_eq!(s.game_state, GameState::Countdown);
        s.on_key_press(Key::Space, 200);
        assert_eq!(s.game_state, GameState::Countdown);
        assert_eq!(s.on_key_press(Key::Escape, 0), SessionCommand::Quit);
    }

    #[test]
    fn countdown_waits_more_than_a_second_per_step() {
        let clock = ManualClock::new(0);
        let mut s = session(2);
        s.on_key_press(Key::Space, 0);
        s.on_key_press(Key::Space, 0);
        let idle = InputState::new();

        clock.advance(1000);
        s.update(&clock, &idle);
        assert_eq!(s.countdown, 3);

        clock.advance(1);
        s.update(&clock, &idle);
        assert_eq!(s.countdown, 2);
        assert!(!s.particles.is_empty());

        for _ in 0..2 {
            clock.advance(1001);
            s.update(&clock, &idle);
        }
        assert_eq!(s.game_state, GameState::Racing);
        assert_eq!(s.race_start_ms, 3003);
        assert_eq!(s.player.start_time_ms, 3003);
        assert_eq!(s.opponent.start_time_ms, 3003);
    }

    #[test]
    fn toggle_swaps_opponent_controller_on_title_only() {
        let mut s = session(3);
        assert!(!s.opponent.controller.is_human());
        assert!(s.toggle_two_player_mode());
        assert!(s.opponent.controller.is_human());
        assert_eq!(s.on_key_press(Key::T, 0), SessionCommand::Continue);
        assert!(!s.two_player_mode);
        assert!(!s.opponent.controller.is_human());

        s.on_key_press(Key::T, 0);
        s.on_key_press(Key::Space, 0);
        assert_eq!(s.game_state, GameState::Ready);
        // no mode changes once the title screen is left
        assert!(s.toggle_two_player_mode());
        assert!(s.opponent.controller.is_human());
    }

    #[test]
    fn reset_keeps_mode_and_starts_ready() {
        let clock = ManualClock::new(0);
        let mut s = session(4);
        s.toggle_two_player_mode();
        s.on_key_press(Key::Space, 0);
        s.on_key_press(Key::Space, 0);
        let idle = InputState::new();
        while s.game_state != GameState::Racing {
            clock.advance(17);
            s.update(&clock, &idle);
        }
        s.player.distance = 3000.0;
        assert_eq!(s.on_key_press(Key::R, clock.now_ms()), SessionCommand::Reset);

        let s = s.reset();
        assert_eq!(s.game_state, GameState::Ready);
        assert!(s.two_player_mode);
        assert!(s.opponent.controller.is_human());
        assert_eq!(s.player.distance, 0.0);
        assert_eq!(s.tick, 0);
        assert!(s.events.is_empty());
        assert!(s.obstacles.oil_spills.is_empty());
    }

    #[test]
    fn camera_follows_lead_with_smoothing() {
        let clock = ManualClock::new(0);
        let mut s = racing_session(5, &clock);
        s.opponent.distance = 1300.0;
        s.camera_offset = 0.0;

        clock.advance(17);
        s.update(&clock, &InputState::new());
        let lead = s.lead_distance();
        assert_relative_eq!(s.camera_offset, (lead - 300.0) * 0.1, epsilon = 1e-9);
    }

    #[test]
    fn finished_only_after_both_vehicles() {
        let clock = ManualClock::new(0);
        let mut s = racing_session(6, &clock);
        let idle = InputState::new();

        s.player.distance = 6000.0;
        clock.advance(17);
        s.update(&clock, &idle);
        assert!(s.player.finished);
        assert!(!s.opponent.finished);
        assert_eq!(s.game_state, GameState::Racing);
        let finish_time = s.player.finish_time_ms;

        s.opponent.distance = 6100.0;
        clock.advance(17);
        s.update(&clock, &idle);
        assert!(s.opponent.finished);
        assert_eq!(s.game_state, GameState::Finished);
        assert_eq!(s.player.finish_time_ms, finish_time);

        let result = s.race_result();
        assert_eq!(result.outcome(), Outcome::PlayerWins);
        assert_eq!(result.count_events(0, RaceEventKind::Finish), 1);
        assert_eq!(result.count_events(1, RaceEventKind::Finish), 1);
    }

    #[test]
    fn human_player_accelerates_only_while_racing() {
        let clock = ManualClock::new(0);
        let mut s = session(7);
        let throttle = InputState::from_keys(vec![Key::ArrowUp]);
        s.update(&clock, &throttle);
        assert_eq!(s.player.distance, 0.0);

        let mut s = racing_session(7, &clock);
        for _ in 0..10 {
            clock.advance(17);
            s.update(&clock, &throttle);
        }
        assert!(s.player.distance > 0.0);
    }

    #[test]
    fn penalized_player_ignores_throttle_and_boost() {
        let clock = ManualClock::new(0);
        let mut s = racing_session(8, &clock);
        s.player.penalized = true;
        s.player.penalty_timer = 5;
        let input = InputState::from_keys(vec![Key::ArrowUp, Key::Space]);

        clock.advance(17);
        s.update(&clock, &input);
        assert_eq!(s.player.acceleration, 0.0);
        assert_eq!(s.player.speed, 0.0);
        assert!(!s.player.boosting);
        assert_eq!(s.player.stats.boosts, 0);
        assert_eq!(s.player.penalty_timer, 4);
    }

    #[test]
    fn title_frame_shows_summer_background_first() {
        let s = session(8);
        let mut sink = DrawList::new();
        s.render(&mut sink, 0);
        assert_eq!(
            sink.cmds[0],
            DrawCmd::Blit {
                sprite: SpriteId::Background(Season::Summer),
                x: 0.0,
                y: 0.0
            }
        );
        assert!(sink
            .cmds
            .iter()
            .any(|c| matches!(c, DrawCmd::Text { text, .. } if text == "PIXEL DRAG RACE")));
    }

    #[test]
    fn background_follows_lead_progress() {
        let clock = ManualClock::new(0);
        let mut s = racing_session(9, &clock);
        s.opponent.distance = 3100.0;
        assert_eq!(s.season(), Season::Autumn);

        let mut sink = DrawList::new();
        s.render(&mut sink, clock.now_ms());
        assert!(matches!(
            sink.cmds[0],
            DrawCmd::Blit {
                sprite: SpriteId::Background(Season::Autumn),
                ..
            }
        ));
    }

    #[test]
    fn validation_rejects_short_races() {
        let mut pars = GamePars::default();
        assert!(pars.validate().is_ok());
        pars.race_pars.race_distance = 1000.0;
        assert!(pars.validate().is_err());
    }
}
