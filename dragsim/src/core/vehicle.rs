use crate::core::controller::{Controller, Intent};
use crate::core::obstacles::{LightState, OilSpill, Ramp, TrafficLight};
use crate::core::particles::{ParticleEngine, ParticleShape};
use crate::interfaces::input::InputState;
use crate::interfaces::render::{RenderSink, RgbColor, SpriteId, TextSize};
use helpers::general::{clamp_abs, InputValueError};
use rand::Rng;
use serde::Deserialize;
use std::f64::consts::PI;

pub const CAR_WIDTH: f64 = 80.0;
pub const CAR_HEIGHT: f64 = 40.0;

/// Contact window around ramps and oil spills.
const CONTACT_TOLERANCE: f64 = 30.0;
const LAUNCH_BASE_VELOCITY: f64 = 15.0;
const LAUNCH_SPEED_GAIN: f64 = 0.8;
const MAX_ROTATION: f64 = 30.0;
const SPIN_RATE: f64 = 15.0;
const SPIN_SPEED_DECAY: f64 = 0.95;
const BOUNCE_SPEED: f64 = 0.2;
const BOUNCE_MAX: f64 = 2.0;

const PENALTY_RED: RgbColor = RgbColor::new(255, 0, 0);
const OIL_DARK: RgbColor = RgbColor::new(30, 30, 30);

/// * `max_speed` - (units/tick) Top speed
/// * `base_acceleration` - (units/tick^2) Acceleration at full throttle
/// * `drag` - (-) Fraction of the speed lost per tick
/// * `boost_duration` - (ticks) Duration of a boost
/// * `boost_cooldown` - (ticks) Time until the boost is available again
/// * `spin_duration` - (ticks) Duration of a spin-out after hitting oil
/// * `penalty_duration` - (ticks) Standstill after running a red light
/// * `gravity` - (units/tick^2) Vertical deceleration while airborne
/// * `lane_origin_x` - (px) Screen x of a car at distance 0
/// * `player_color`, `opponent_color` - CSS colours handed to the asset provider
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VehiclePars {
    pub max_speed: f64,
    pub base_acceleration: f64,
    pub drag: f64,
    pub boost_duration: u32,
    pub boost_cooldown: u32,
    pub spin_duration: u32,
    pub penalty_duration: u32,
    pub gravity: f64,
    pub lane_origin_x: f64,
    pub player_color: String,
    pub opponent_color: String,
}

impl Default for VehiclePars {
    fn default() -> Self {
        VehiclePars {
            max_speed: 15.0,
            base_acceleration: 0.2,
            drag: 0.05,
            boost_duration: 60,
            boost_cooldown: 180,
            spin_duration: 60,
            penalty_duration: 120,
            gravity: 0.5,
            lane_origin_x: 100.0,
            player_color: String::from("#e03030"),
            opponent_color: String::from("#3060e0"),
        }
    }
}

impl VehiclePars {
    pub fn validate(&self) -> Result<(), InputValueError> {
        if self.max_speed <= 0.0 || self.base_acceleration <= 0.0 || self.gravity <= 0.0 {
            return Err(InputValueError::new(
                "max_speed, base_acceleration and gravity must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.drag) {
            return Err(InputValueError::new(format!(
                "drag must be in [0.0, 1.0[, but is {}",
                self.drag
            )));
        }
        if self.boost_duration == 0 || self.boost_cooldown == 0 {
            return Err(InputValueError::new("boost durations must be positive"));
        }
        Ok(())
    }
}

/// TickEvents reports which obstacle reactions were triggered during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEvents {
    pub launched: bool,
    pub landed: bool,
    pub spun_out: bool,
    pub penalized: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleStats {
    pub jumps: u32,
    pub spin_outs: u32,
    pub penalties: u32,
    pub boosts: u32,
    pub top_speed: f64,
    pub max_air_time: u32,
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub lane: usize,
    pub lane_origin_x: f64,
    pub y: f64,
    pub sprite: SpriteId,
    pub controller: Controller,

    // kinematics
    pub speed: f64,
    pub acceleration: f64,
    pub base_acceleration: f64,
    pub drag: f64,
    pub max_speed: f64,
    pub distance: f64,

    // race
    pub finished: bool,
    pub start_time_ms: u64,
    pub finish_time_ms: u64,

    // boost
    pub boost_available: bool,
    pub boosting: bool,
    boost_time: u32,
    boost_duration: u32,
    boost_cooldown: u32,
    boost_timer: u32,

    // airborne
    pub in_air: bool,
    pub jump_height: f64,
    pub jump_velocity: f64,
    pub rotation: f64,
    pub air_time: u32,
    gravity: f64,

    // spin-out
    pub spinning: bool,
    pub spin_timer: u32,
    pub spin_angle: f64,
    spin_duration: u32,

    // red light penalty
    pub penalized: bool,
    pub penalty_timer: u32,
    penalty_duration: u32,

    // cosmetics
    pub bounce_offset: f64,
    bounce_direction: f64,

    pub stats: VehicleStats,
    pub particles: ParticleEngine,
}

impl Vehicle {
    /// new creates a car standing at the start of the given lane. AI controllers scale the
    /// car's acceleration and drag with their difficulty.
    pub fn new(
        pars: &VehiclePars,
        lane: usize,
        lane_y: f64,
        sprite: SpriteId,
        controller: Controller,
    ) -> Vehicle {
        let mut base_acceleration = pars.base_acceleration;
        let mut drag = pars.drag;

        if let Controller::Ai(ai) = &controller {
            base_acceleration *= ai.difficulty;
            drag *= (2.0 - ai.difficulty) * 0.8;
        }

        Vehicle {
            lane,
            lane_origin_x: pars.lane_origin_x,
            y: lane_y,
            sprite,
            controller,
            speed: 0.0,
            acceleration: 0.0,
            base_acceleration,
            drag,
            max_speed: pars.max_speed,
            distance: 0.0,
            finished: false,
            start_time_ms: 0,
            finish_time_ms: 0,
            boost_available: true,
            boosting: false,
            boost_time: 0,
            boost_duration: pars.boost_duration,
            boost_cooldown: pars.boost_cooldown,
            boost_timer: 0,
            in_air: false,
            jump_height: 0.0,
            jump_velocity: 0.0,
            rotation: 0.0,
            air_time: 0,
            gravity: pars.gravity,
            spinning: false,
            spin_timer: 0,
            spin_angle: 0.0,
            spin_duration: pars.spin_duration,
            penalized: false,
            penalty_timer: 0,
            penalty_duration: pars.penalty_duration,
            bounce_offset: 0.0,
            bounce_direction: 1.0,
            stats: VehicleStats::default(),
            particles: ParticleEngine::new(),
        }
    }

    /// x returns the horizontal world position of the car's left edge.
    pub fn x(&self) -> f64 {
        self.lane_origin_x + self.distance
    }

    /// body_y returns the current vertical position of the car's top edge including the jump.
    fn body_y(&self) -> f64 {
        self.y - self.jump_height
    }

    /// cooldown_fraction returns how far the boost cooldown has progressed, 1.0 when ready.
    pub fn cooldown_fraction(&self) -> f64 {
        if self.boost_available || self.boosting {
            return 1.0;
        }
        1.0 - self.boost_timer as f64 / self.boost_cooldown as f64
    }

    /// penalty_remaining_s returns the remaining standstill in seconds at 60 ticks per second.
    pub fn penalty_remaining_s(&self) -> f64 {
        self.penalty_timer as f64 / 60.0
    }

    pub fn mark_finished(&mut self, now_ms: u64) {
        self.finished = true;
        self.finish_time_ms = now_ms;
    }

    /// race_time_ms returns the time from the start signal to the finish line.
    pub fn race_time_ms(&self) -> Option<u64> {
        if self.finished {
            Some(self.finish_time_ms.saturating_sub(self.start_time_ms))
        } else {
            None
        }
    }

    // ---------------------------------------------------------------------------------------------
    // CONTROL -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// apply_controls lets the controller set acceleration and boost for the coming tick.
    /// Returns true if a boost was activated.
    pub fn apply_controls<R: Rng + ?Sized>(&mut self, input: &InputState, rng: &mut R) -> bool {
        let Intent { throttle, boost } = self.controller.decide(input, rng);

        self.acceleration = self.base_acceleration * throttle;
        if throttle > 0.0 {
            self.add_effects(rng);
        }

        if boost && self.activate_boost(rng) {
            self.add_effects(rng);
            return true;
        }
        false
    }

    /// activate_boost starts a boost if one is available. Calling it again while boosting is a
    /// no-op.
    pub fn activate_boost<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if !self.boost_available || self.boosting {
            return false;
        }

        self.boosting = true;
        self.boost_time = self.boost_duration;
        self.boost_available = false;
        self.stats.boosts += 1;

        let (x, y) = (self.x() + 10.0, self.body_y() + 30.0);
        self.particles.sparks(rng, x, y, 20);
        true
    }

    /// add_effects emits exhaust, tire smoke and boost sparks matching the current driving state.
    pub fn add_effects<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let x = self.x();
        let y = self.body_y();

        if self.speed > 0.0 {
            let intensity = (self.speed / 2.0) as usize + 1;
            for _ in 0..intensity {
                let dy = rng.gen_range(-3.0..=3.0);
                self.particles.flame(rng, x + 10.0, y + 30.0 + dy);
            }
        }

        if self.acceleration > 0.1 && self.speed < 5.0 && !self.in_air {
            for _ in 0..2 {
                let dx = rng.gen_range(-5.0..=5.0);
                self.particles.smoke(rng, x + 20.0 + dx, y + 35.0);
            }
        }

        if self.boosting {
            for _ in 0..3 {
                let dx = rng.gen_range(-5.0..=5.0);
                let dy = rng.gen_range(-3.0..=3.0);
                self.particles.sparks(rng, x + 10.0 + dx, y + 30.0 + dy, 3);
            }
        }
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// update advances the car by one tick. Obstacles are checked in list order and the first
    /// matching ramp or spill wins.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        race_active: bool,
        ramps: &[Ramp],
        oil_spills: &[OilSpill],
        traffic_lights: &[TrafficLight],
        rng: &mut R,
    ) -> TickEvents {
        let mut events = TickEvents::default();

        if !race_active || self.finished {
            self.speed = self.speed.max(0.0).min(self.max_speed);
            self.update_bounce();
            self.particles.advance();
            return events;
        }

        // red light standstill blocks everything else
        if self.penalized {
            self.update_penalty(rng);
            self.particles.advance();
            return events;
        }

        // acceleration
        if self.boosting {
            self.speed += self.base_acceleration * 2.0;
            self.boost_time = self.boost_time.saturating_sub(1);
            if self.boost_time == 0 {
                self.boosting = false;
                self.boost_available = false;
                self.boost_timer = self.boost_cooldown;
            }
        } else {
            self.speed += self.acceleration;
        }

        // drag, less air resistance than rolling resistance
        let drag_factor = if self.in_air { self.drag * 0.5 } else { self.drag };
        self.speed -= drag_factor * self.speed;
        self.speed = self.speed.max(0.0).min(self.max_speed);

        if self.spinning {
            self.update_spin(rng);
        }

        let old_distance = self.distance;
        self.distance += self.speed;
        self.stats.top_speed = self.stats.top_speed.max(self.speed);

        if self.check_traffic_lights(old_distance, traffic_lights, rng) {
            events.penalized = true;
        }

        if !self.boost_available && !self.boosting {
            self.boost_timer = self.boost_timer.saturating_sub(1);
            if self.boost_timer == 0 {
                self.boost_available = true;
            }
        }

        if !self.in_air && self.check_ramps(ramps, rng) {
            events.launched = true;
        }

        if !self.in_air && !self.spinning && self.check_oil_spills(oil_spills, rng) {
            events.spun_out = true;
        }

        if self.in_air && self.update_airborne(rng) {
            events.landed = true;
        }

        if !self.in_air && !self.spinning && !self.penalized {
            self.update_bounce();
        }

        self.particles.advance();
        events
    }

    // ---------------------------------------------------------------------------------------------
    // UPDATE PARTS --------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn update_penalty<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.speed = 0.0;
        self.acceleration = 0.0;

        // flashing warning above the car
        if self.penalty_timer % 10 < 5 {
            let x = self.x() + CAR_WIDTH / 2.0 + rng.gen_range(-15.0..=15.0);
            self.particles.spawn(
                x,
                self.body_y() - 10.0,
                PENALTY_RED,
                rng.gen_range(2.0..=4.0),
                rng.gen_range(0.5..=1.5),
                -PI / 2.0 + rng.gen_range(-0.3..=0.3),
                rng.gen_range(8..=15),
                255,
                ParticleShape::Circle,
            );
        }

        self.penalty_timer = self.penalty_timer.saturating_sub(1);
        if self.penalty_timer == 0 {
            self.penalized = false;
        }
    }

    fn update_spin<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.spin_timer = self.spin_timer.saturating_sub(1);
        self.spin_angle = (self.spin_angle + SPIN_RATE) % 360.0;
        self.speed *= SPIN_SPEED_DECAY;

        if rng.gen::<f64>() < 0.3 {
            let x = self.x() + rng.gen_range(0.0..=CAR_WIDTH);
            self.particles.spawn(
                x,
                self.y + CAR_HEIGHT,
                OIL_DARK,
                rng.gen_range(2.0..=5.0),
                rng.gen_range(0.5..=2.0),
                rng.gen_range(0.0..=2.0 * PI),
                rng.gen_range(15..=30),
                180,
                ParticleShape::Circle,
            );
        }

        if self.spin_timer == 0 {
            self.spinning = false;
            self.spin_angle = 0.0;
        }
    }

    /// check_traffic_lights penalizes the car for every red light passed in this tick.
    fn check_traffic_lights<R: Rng + ?Sized>(
        &mut self,
        old_distance: f64,
        traffic_lights: &[TrafficLight],
        rng: &mut R,
    ) -> bool {
        let mut penalized = false;

        for light in traffic_lights.iter() {
            let crossed = old_distance < light.position && light.position < self.distance;
            if !crossed || light.state != LightState::Red {
                continue;
            }

            self.penalized = true;
            self.penalty_timer = self.penalty_duration;
            self.stats.penalties += 1;
            penalized = true;

            let (x, y) = (self.x() + CAR_WIDTH / 2.0, self.body_y() + CAR_HEIGHT / 2.0);
            self.burst(rng, x, y, PENALTY_RED, 15);
        }

        penalized
    }

    fn check_ramps<R: Rng + ?Sized>(&mut self, ramps: &[Ramp], rng: &mut R) -> bool {
        let hit = ramps
            .iter()
            .any(|ramp| (self.distance - ramp.position).abs() < CONTACT_TOLERANCE);
        // a car standing on the ramp would relaunch on every landing
        if !hit || self.speed <= 0.0 {
            return false;
        }

        self.in_air = true;
        self.jump_height = 0.0;
        self.jump_velocity = LAUNCH_BASE_VELOCITY + LAUNCH_SPEED_GAIN * self.speed;
        self.air_time = 0;
        self.stats.jumps += 1;

        let (x, y) = (self.x() + 10.0, self.y + CAR_HEIGHT);
        self.particles.sparks(rng, x, y, 10);
        true
    }

    fn check_oil_spills<R: Rng + ?Sized>(&mut self, oil_spills: &[OilSpill], rng: &mut R) -> bool {
        let hit = oil_spills.iter().any(|spill| {
            spill.lane == self.lane && (self.distance - spill.position).abs() < CONTACT_TOLERANCE
        });
        if !hit {
            return false;
        }

        self.spinning = true;
        self.spin_timer = self.spin_duration;
        self.spin_angle = 0.0;
        self.stats.spin_outs += 1;

        let (x, y) = (self.x() + CAR_WIDTH / 2.0, self.y + CAR_HEIGHT);
        self.burst(rng, x, y, OIL_DARK, 15);
        true
    }

    /// update_airborne integrates the jump and returns true on touchdown.
    fn update_airborne<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        self.air_time += 1;
        self.jump_height += self.jump_velocity;
        self.jump_velocity -= self.gravity;

        // nose up while climbing, nose down while falling
        self.rotation = clamp_abs(self.jump_velocity * 2.0, MAX_ROTATION);

        let (x, y) = (self.x() + 10.0, self.body_y() + 30.0);
        self.particles.air_stream(rng, x, y);
        if self.boosting {
            self.particles.boost_trail(rng, x, y);
        }

        if self.jump_height <= 0.0 && self.jump_velocity < 0.0 {
            self.stats.max_air_time = self.stats.max_air_time.max(self.air_time);
            self.in_air = false;
            self.jump_height = 0.0;
            self.jump_velocity = 0.0;
            self.rotation = 0.0;

            for _ in 0..3 {
                let dx = rng.gen_range(0.0..=CAR_WIDTH);
                self.particles.smoke(rng, self.x() + dx, self.y + CAR_HEIGHT);
            }
            return true;
        }
        false
    }

    fn update_bounce(&mut self) {
        self.bounce_offset +=
            self.bounce_direction * BOUNCE_SPEED * (0.5 + self.speed / self.max_speed);
        if self.bounce_offset.abs() > BOUNCE_MAX {
            self.bounce_direction *= -1.0;
        }
    }

    fn burst<R: Rng + ?Sized>(&mut self, rng: &mut R, x: f64, y: f64, color: RgbColor, count: usize) {
        for _ in 0..count {
            self.particles.spawn(
                x,
                y,
                color,
                rng.gen_range(2.0..=6.0),
                rng.gen_range(1.0..=4.0),
                rng.gen_range(0.0..=2.0 * PI),
                rng.gen_range(15..=35),
                230,
                ParticleShape::Circle,
            );
        }
    }

    // ---------------------------------------------------------------------------------------------
    // RENDERING -----------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// render draws the car's particles, the car itself, its boost indicator and status banners.
    pub fn render(&self, sink: &mut dyn RenderSink, camera_offset: f64) {
        self.particles.render(sink, camera_offset);

        let draw_x = self.x() - camera_offset;
        let draw_y = self.y + self.bounce_offset - self.jump_height;

        if self.in_air {
            sink.blit_rotated(self.sprite, draw_x, draw_y, self.rotation);
        } else if self.spinning {
            sink.blit_rotated(self.sprite, draw_x, draw_y, self.spin_angle);
        } else {
            sink.blit(self.sprite, draw_x, draw_y);
        }

        let indicator_color = if self.boost_available {
            RgbColor::new(0, 255, 0)
        } else if self.boosting {
            RgbColor::new(255, 165, 0)
        } else if self.cooldown_fraction() > 0.5 {
            RgbColor::new(255, 255, 0)
        } else {
            RgbColor::new(150, 150, 150)
        };
        sink.circle(indicator_color.into(), (draw_x + 70.0, draw_y + 10.0), 5.0);

        let banner = if self.penalized {
            Some(("STOP!", RgbColor::new(255, 0, 0)))
        } else if self.in_air {
            Some(("AIR TIME!", RgbColor::new(100, 200, 255)))
        } else if self.spinning {
            Some(("SPINNING!", RgbColor::new(255, 50, 50)))
        } else {
            None
        };
        if let Some((text, color)) = banner {
            sink.text(text, draw_x, draw_y - 20.0, TextSize::Small, color.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::{AiController, PlayerSlot};
    use crate::interfaces::render::{DrawCmd, DrawList};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn car() -> Vehicle {
        Vehicle::new(
            &VehiclePars::default(),
            0,
            420.0,
            SpriteId::PlayerCar,
            Controller::Human(PlayerSlot::One),
        )
    }

    fn light(position: f64, state: LightState) -> TrafficLight {
        TrafficLight {
            position,
            state,
            timer: 0,
            cycle_time: 180,
        }
    }

    #[test]
    fn speed_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let ramps = [Ramp {
            position: 500.0,
            height: 80.0,
        }];

        for _ in 0..500 {
            let mut v = car();
            v.speed = rng.gen_range(-50.0..50.0);
            v.acceleration = rng.gen_range(-2.0..5.0);
            v.distance = rng.gen_range(0.0..1000.0);
            v.in_air = rng.gen_bool(0.3);
            v.spinning = rng.gen_bool(0.3);
            v.spin_timer = 5;
            if rng.gen_bool(0.5) {
                v.activate_boost(&mut rng);
            }

            for _ in 0..20 {
                v.update(true, &ramps, &[], &[], &mut rng);
                assert!(v.speed >= 0.0 && v.speed <= v.max_speed, "speed {}", v.speed);
            }
        }
    }

    #[test]
    fn boost_cannot_be_activated_twice() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut v = car();

        assert!(v.activate_boost(&mut rng));
        let particles_after_first = v.particles.len();
        let boost_time = v.boost_time;

        assert!(!v.activate_boost(&mut rng));
        assert!(v.boosting);
        assert!(!v.boost_available);
        assert_eq!(v.boost_time, boost_time);
        assert_eq!(v.particles.len(), particles_after_first);
        assert_eq!(v.stats.boosts, 1);
    }

    #[test]
    fn boost_runs_out_then_cools_down() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut v = car();
        v.activate_boost(&mut rng);

        for _ in 0..60 {
            v.update(true, &[], &[], &[], &mut rng);
        }
        assert!(!v.boosting);
        assert!(!v.boost_available);
        assert!(v.cooldown_fraction() < 0.5);

        // the cooldown already counts down in the tick the boost ends
        for _ in 0..178 {
            v.update(true, &[], &[], &[], &mut rng);
        }
        assert!(!v.boost_available);
        v.update(true, &[], &[], &[], &mut rng);
        assert!(v.boost_available);
    }

    #[test]
    fn boost_doubles_acceleration() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut v = car();
        v.activate_boost(&mut rng);
        v.update(true, &[], &[], &[], &mut rng);

        // (0 + 2 * 0.2) * (1 - 0.05)
        assert_relative_eq!(v.speed, 0.38, epsilon = 1e-12);
    }

    #[test]
    fn red_light_crossing_penalizes_in_same_tick() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut v = car();
        v.distance = 1490.0;
        v.speed = 15.0;

        let events = v.update(true, &[], &[], &[light(1500.0, LightState::Red)], &mut rng);
        assert!(events.penalized);
        assert!(v.penalized);
        assert_eq!(v.penalty_timer, 120);

        // next tick the car stands still
        let d = v.distance;
        v.acceleration = 0.2;
        v.update(true, &[], &[], &[], &mut rng);
        assert_eq!(v.speed, 0.0);
        assert_eq!(v.distance, d);
        assert_eq!(v.penalty_timer, 119);
    }

    #[test]
    fn every_red_light_crossed_in_one_tick_counts() {
        let mut rng = StdRng::seed_from_u64(16);
        let mut v = car();
        v.distance = 1490.0;
        v.speed = 15.0;
        let lights = [
            light(1495.0, LightState::Green),
            light(1500.0, LightState::Red),
            light(1502.0, LightState::Red),
        ];

        let events = v.update(true, &[], &[], &lights, &mut rng);
        assert!(v.distance > 1502.0);
        assert!(events.penalized);
        assert!(v.penalized);
        assert_eq!(v.stats.penalties, 2);
    }

    #[test]
    fn green_and_yellow_lights_are_harmless() {
        let mut rng = StdRng::seed_from_u64(5);
        for state in [LightState::Green, LightState::Yellow] {
            let mut v = car();
            v.distance = 1490.0;
            v.speed = 15.0;
            let events = v.update(true, &[], &[], &[light(1500.0, state)], &mut rng);
            assert!(!events.penalized);
            assert!(!v.penalized);
            assert!(v.distance > 1500.0);
        }
    }

    #[test]
    fn light_exactly_at_start_position_is_not_crossed() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut v = car();
        v.distance = 1500.0;
        v.speed = 10.0;
        v.update(true, &[], &[], &[light(1500.0, LightState::Red)], &mut rng);
        assert!(!v.penalized);
    }

    #[test]
    fn penalty_expires_after_its_duration() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut v = car();
        v.penalized = true;
        v.penalty_timer = 3;
        for _ in 0..3 {
            v.update(true, &[], &[], &[], &mut rng);
        }
        assert!(!v.penalized);
        v.acceleration = 0.2;
        v.update(true, &[], &[], &[], &mut rng);
        assert!(v.speed > 0.0);
    }

    #[test]
    fn ramp_launch_uses_speed_at_contact() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut v = car();
        let ramps = [Ramp {
            position: 1000.0,
            height: 100.0,
        }];
        v.distance = 985.0;
        v.speed = 10.0;

        let events = v.update(true, &ramps, &[], &[], &mut rng);
        let pre_ramp_speed = 10.0 * 0.95;
        assert!(events.launched);
        assert!(v.in_air);
        assert!((v.distance - 1000.0).abs() < 30.0);
        // the launch tick already integrates the first step of the jump
        assert_relative_eq!(v.jump_height, 15.0 + 0.8 * pre_ramp_speed, epsilon = 1e-12);
        assert_relative_eq!(v.jump_velocity, 15.0 + 0.8 * pre_ramp_speed - 0.5, epsilon = 1e-12);
        assert_eq!(v.air_time, 1);
        assert_relative_eq!(v.rotation, 30.0);
    }

    #[test]
    fn jump_lands_and_halves_drag_in_the_air() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut v = car();
        v.in_air = true;
        v.jump_velocity = 2.0;
        v.speed = 10.0;

        v.update(true, &[], &[], &[], &mut rng);
        assert_relative_eq!(v.speed, 10.0 * (1.0 - 0.025), epsilon = 1e-12);

        let mut ticks = 1;
        while v.in_air {
            let events = v.update(true, &[], &[], &[], &mut rng);
            ticks += 1;
            if !v.in_air {
                assert!(events.landed);
            }
            assert!(ticks < 100);
        }
        assert_eq!(v.jump_height, 0.0);
        assert_eq!(v.rotation, 0.0);
        assert!(v.stats.max_air_time > 0);
    }

    #[test]
    fn oil_only_affects_its_own_lane() {
        let mut rng = StdRng::seed_from_u64(10);
        let spill = OilSpill {
            position: 2000.0,
            lane: 1,
            spawned_at_ms: 0,
        };

        let mut v = car();
        v.distance = 1990.0;
        v.update(true, &[], &[spill], &[], &mut rng);
        assert!(!v.spinning);

        let mut v = car();
        v.lane = 1;
        v.distance = 1990.0;
        let events = v.update(true, &[], &[spill], &[], &mut rng);
        assert!(events.spun_out);
        assert!(v.spinning);
        assert_eq!(v.spin_timer, 60);
    }

    #[test]
    fn spin_rotates_and_slows_the_car() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut v = car();
        v.spinning = true;
        v.spin_timer = 2;
        v.speed = 10.0;

        v.update(true, &[], &[], &[], &mut rng);
        assert_relative_eq!(v.spin_angle, 15.0);
        assert_relative_eq!(v.speed, 10.0 * 0.95 * 0.95, epsilon = 1e-12);

        v.update(true, &[], &[], &[], &mut rng);
        assert!(!v.spinning);
        assert_eq!(v.spin_angle, 0.0);
    }

    #[test]
    fn airborne_car_ignores_oil() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut v = car();
        v.in_air = true;
        v.jump_height = 50.0;
        v.distance = 1990.0;
        let spill = OilSpill {
            position: 2000.0,
            lane: 0,
            spawned_at_ms: 0,
        };
        v.update(true, &[], &[spill], &[], &mut rng);
        assert!(!v.spinning);
    }

    #[test]
    fn airborne_car_ignores_ramps() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut v = car();
        v.in_air = true;
        v.jump_height = 50.0;
        v.jump_velocity = 5.0;
        v.air_time = 3;
        v.distance = 990.0;
        v.speed = 10.0;
        let ramps = [Ramp {
            position: 1000.0,
            height: 100.0,
        }];

        let events = v.update(true, &ramps, &[], &[], &mut rng);
        assert!((v.distance - 1000.0).abs() < 30.0);
        assert!(!events.launched);
        assert_relative_eq!(v.jump_velocity, 4.5);
        assert_eq!(v.air_time, 4);
        assert_eq!(v.stats.jumps, 0);
    }

    #[test]
    fn spinning_car_ignores_further_oil() {
        let mut rng = StdRng::seed_from_u64(18);
        let mut v = car();
        v.spinning = true;
        v.spin_timer = 10;
        v.distance = 1990.0;
        v.speed = 5.0;
        let spill = OilSpill {
            position: 2000.0,
            lane: 0,
            spawned_at_ms: 0,
        };

        let events = v.update(true, &[], &[spill], &[], &mut rng);
        assert!((v.distance - 2000.0).abs() < 30.0);
        assert!(!events.spun_out);
        assert_eq!(v.spin_timer, 9);
        assert_eq!(v.stats.spin_outs, 0);
    }

    #[test]
    fn standing_car_on_a_ramp_does_not_launch() {
        let mut rng = StdRng::seed_from_u64(19);
        let mut v = car();
        v.distance = 975.0;
        let ramps = [Ramp {
            position: 1000.0,
            height: 100.0,
        }];

        for _ in 0..400 {
            v.update(true, &ramps, &[], &[], &mut rng);
        }
        assert!(!v.in_air);
        assert_eq!(v.stats.jumps, 0);
        assert_eq!(v.distance, 975.0);
    }

    #[test]
    fn speed_is_clamped_when_not_racing() {
        let mut rng = StdRng::seed_from_u64(20);
        let mut v = car();
        v.speed = 20.0;
        v.update(false, &[], &[], &[], &mut rng);
        assert_eq!(v.speed, v.max_speed);

        let mut v = car();
        v.finished = true;
        v.speed = -3.0;
        v.update(true, &[], &[], &[], &mut rng);
        assert_eq!(v.speed, 0.0);
    }

    #[test]
    fn inactive_race_only_animates() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut v = car();
        v.acceleration = 0.2;
        v.update(false, &[], &[], &[], &mut rng);
        assert_eq!(v.speed, 0.0);
        assert_eq!(v.distance, 0.0);
        assert_relative_eq!(v.bounce_offset, 0.1);
    }

    #[test]
    fn bounce_reverses_beyond_amplitude() {
        let mut v = car();
        v.bounce_offset = 1.95;
        v.update_bounce();
        assert!(v.bounce_offset > 2.0);
        let peak = v.bounce_offset;
        v.update_bounce();
        assert!(v.bounce_offset < peak);
    }

    #[test]
    fn ai_difficulty_scales_acceleration_and_drag() {
        let mut rng = StdRng::seed_from_u64(14);
        let ai = AiController::new(1.5, &mut rng);
        let v = Vehicle::new(
            &VehiclePars::default(),
            1,
            340.0,
            SpriteId::OpponentCar,
            Controller::Ai(ai),
        );
        assert_relative_eq!(v.base_acceleration, 0.3, epsilon = 1e-12);
        assert_relative_eq!(v.drag, 0.05 * 0.5 * 0.8, epsilon = 1e-12);
    }

    #[test]
    fn controls_set_acceleration_and_emit_effects() {
        let mut rng = StdRng::seed_from_u64(15);
        let mut v = car();
        let input = InputState::from_keys(vec![
            crate::interfaces::input::Key::ArrowUp,
            crate::interfaces::input::Key::Space,
        ]);

        assert!(v.apply_controls(&input, &mut rng));
        assert_relative_eq!(v.acceleration, 0.2);
        assert!(v.boosting);
        assert!(!v.particles.is_empty());

        assert!(!v.apply_controls(&InputState::new(), &mut rng));
        assert_eq!(v.acceleration, 0.0);
    }

    #[test]
    fn render_draws_particles_before_rotated_sprite() {
        let mut rng = StdRng::seed_from_u64(16);
        let mut v = car();
        v.activate_boost(&mut rng);
        v.in_air = true;
        v.jump_height = 40.0;
        v.rotation = 12.0;
        v.distance = 500.0;

        let mut sink = DrawList::new();
        v.render(&mut sink, 300.0);

        let sprite_idx = sink
            .cmds
            .iter()
            .position(|c| matches!(c, DrawCmd::BlitRotated { .. }))
            .unwrap();
        assert_eq!(sprite_idx, v.particles.len());
        match &sink.cmds[sprite_idx] {
            DrawCmd::BlitRotated { x, y, angle, .. } => {
                assert_relative_eq!(*x, 300.0);
                assert_relative_eq!(*y, 380.0);
                assert_relative_eq!(*angle, 12.0);
            }
            _ => unreachable!(),
        }
        assert!(sink
            .cmds
            .iter()
            .any(|c| matches!(c, DrawCmd::Text { text, .. } if text == "AIR TIME!")));
    }
}
