use helpers::general::InputValueError;
use rand::Rng;
use serde::Deserialize;

/// Minimum gap between an oil spill and any ramp or traffic light.
const OIL_MIN_GAP_FIXED: f64 = 300.0;
/// Minimum gap between two oil spills.
const OIL_MIN_GAP_OIL: f64 = 500.0;
/// Oil spills are never placed closer than this to the start or the finish.
const OIL_TRACK_MARGIN: f64 = 800.0;
const OIL_PLACEMENT_ATTEMPTS: u32 = 10;
const OIL_SPAWN_CHANCE: f64 = 0.3;

/// * `position` - Track position of the ramp's lip
/// * `height` - Drawn height of the ramp, launch speed does not depend on it
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub position: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OilSpill {
    pub position: f64,
    pub lane: usize,
    pub spawned_at_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LightState {
    Green,
    Yellow,
    Red,
}

impl LightState {
    pub fn next(self) -> LightState {
        match self {
            LightState::Green => LightState::Yellow,
            LightState::Yellow => LightState::Red,
            LightState::Red => LightState::Green,
        }
    }
}

/// * `position` - Track position of the stop line
/// * `timer` - Ticks spent in the current state, the initial value acts as phase offset
/// * `cycle_time` - Ticks per state
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TrafficLight {
    pub position: f64,
    #[serde(default = "default_light_state")]
    pub state: LightState,
    #[serde(default)]
    pub timer: u32,
    pub cycle_time: u32,
}

fn default_light_state() -> LightState {
    LightState::Green
}

impl TrafficLight {
    /// advance counts one tick and switches to the next state once the cycle time is reached.
    pub fn advance(&mut self) {
        self.timer += 1;
        if self.timer >= self.cycle_time {
            self.timer = 0;
            self.state = self.state.next();
        }
    }
}

/// * `ramps` - Static ramps, in the order they are checked for contact
/// * `traffic_lights` - Static traffic lights
/// * `oil_spawn_interval` - (ticks) Time between two oil spawn attempts
/// * `max_oil_spills` - Maximum number of oil spills on the track
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ObstaclePars {
    pub ramps: Vec<Ramp>,
    pub traffic_lights: Vec<TrafficLight>,
    pub oil_spawn_interval: u32,
    pub max_oil_spills: usize,
}

impl Default for ObstaclePars {
    fn default() -> Self {
        ObstaclePars {
            ramps: vec![
                Ramp {
                    position: 1000.0,
                    height: 80.0,
                },
                Ramp {
                    position: 2500.0,
                    height: 100.0,
                },
                Ramp {
                    position: 4000.0,
                    height: 120.0,
                },
                Ramp {
                    position: 5500.0,
                    height: 90.0,
                },
            ],
            traffic_lights: [(1500.0, 0), (3000.0, 60), (4500.0, 120)]
                .iter()
                .map(|&(position, timer)| TrafficLight {
                    position,
                    state: LightState::Green,
                    timer,
                    cycle_time: 180,
                })
                .collect(),
            oil_spawn_interval: 300,
            max_oil_spills: 5,
        }
    }
}

impl ObstaclePars {
    pub fn validate(&self, race_distance: f64) -> Result<(), InputValueError> {
        if self.traffic_lights.iter().any(|l| l.cycle_time == 0) {
            return Err(InputValueError::new("traffic light cycle_time must be positive"));
        }
        if self.oil_spawn_interval == 0 {
            return Err(InputValueError::new("oil_spawn_interval must be positive"));
        }
        let out_of_track = |p: f64| !(0.0..=race_distance).contains(&p);
        if self.ramps.iter().any(|r| out_of_track(r.position))
            || self.traffic_lights.iter().any(|l| out_of_track(l.position))
        {
            return Err(InputValueError::new(format!(
                "obstacles must lie within [0, {}]",
                race_distance
            )));
        }
        Ok(())
    }
}

/// ObstacleSet holds everything on the track the cars can interact with. Ramps and traffic lights
/// are fixed for the whole session, oil spills appear while racing and are only cleared by
/// building a new session.
#[derive(Debug, Clone)]
pub struct ObstacleSet {
    pub ramps: Vec<Ramp>,
    pub oil_spills: Vec<OilSpill>,
    pub traffic_lights: Vec<TrafficLight>,
    race_distance: f64,
    oil_spawn_interval: u32,
    max_oil_spills: usize,
    next_oil_spawn: u32,
}

impl ObstacleSet {
    pub fn new(pars: &ObstaclePars, race_distance: f64) -> ObstacleSet {
        ObstacleSet {
            ramps: pars.ramps.to_owned(),
            oil_spills: Vec::new(),
            traffic_lights: pars.traffic_lights.to_owned(),
            race_distance,
            oil_spawn_interval: pars.oil_spawn_interval,
            max_oil_spills: pars.max_oil_spills,
            next_oil_spawn: 0,
        }
    }

    /// advance_lights moves all traffic lights one tick through their cycle.
    pub fn advance_lights(&mut self) {
        for light in self.traffic_lights.iter_mut() {
            light.advance();
        }
    }

    /// update_oil_spawning runs the per-tick oil spill policy and returns the spill added in this
    /// tick, if any.
    pub fn update_oil_spawning<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now_ms: u64,
    ) -> Option<OilSpill> {
        if self.oil_spills.len() >= self.max_oil_spills {
            return None;
        }

        self.next_oil_spawn = self.next_oil_spawn.saturating_sub(1);
        if self.next_oil_spawn > 0 {
            return None;
        }
        self.next_oil_spawn = self.oil_spawn_interval;

        if rng.gen::<f64>() >= OIL_SPAWN_CHANCE {
            return None;
        }

        let (position, lane) = self.sample_oil_position(rng)?;
        let spill = OilSpill {
            position,
            lane,
            spawned_at_ms: now_ms,
        };
        self.oil_spills.push(spill);
        Some(spill)
    }

    /// sample_oil_position draws up to ten random (position, lane) candidates and returns the
    /// first one that keeps the required distance to all other obstacles.
    pub fn sample_oil_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(f64, usize)> {
        let lo = OIL_TRACK_MARGIN as i64;
        let hi = (self.race_distance - OIL_TRACK_MARGIN) as i64;
        if hi < lo {
            return None;
        }

        for _ in 0..OIL_PLACEMENT_ATTEMPTS {
            let position = rng.gen_range(lo..=hi) as f64;
            let lane = rng.gen_range(0..=1);

            if self.is_valid_oil_position(position) {
                return Some((position, lane));
            }
        }
        None
    }

    pub fn is_valid_oil_position(&self, position: f64) -> bool {
        self.ramps
            .iter()
            .all(|r| (position - r.position).abs() >= OIL_MIN_GAP_FIXED)
            && self
                .traffic_lights
                .iter()
                .all(|l| (position - l.position).abs() >= OIL_MIN_GAP_FIXED)
            && self
                .oil_spills
                .iter()
                .all(|s| (position - s.position).abs() >= OIL_MIN_GAP_OIL)
    }
}
