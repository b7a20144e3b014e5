use crate::interfaces::input::{InputState, Key};
use helpers::general::InputValueError;
use rand::Rng;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    pub fn accelerate_keys(self) -> &'static [Key] {
        match self {
            PlayerSlot::One => &[Key::ArrowRight, Key::ArrowUp],
            PlayerSlot::Two => &[Key::W, Key::D],
        }
    }

    pub fn boost_key(self) -> Key {
        match self {
            PlayerSlot::One => Key::Space,
            PlayerSlot::Two => Key::LeftShift,
        }
    }
}

/// * `difficulty` - (-) Skill factor in ]0.0, 2.0], 1.0 is normal
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AiPars {
    pub difficulty: f64,
}

impl Default for AiPars {
    fn default() -> Self {
        AiPars { difficulty: 1.0 }
    }
}

impl AiPars {
    pub fn validate(&self) -> Result<(), InputValueError> {
        if !(self.difficulty > 0.0 && self.difficulty <= 2.0) {
            return Err(InputValueError::new(format!(
                "AI difficulty must be in ]0.0, 2.0], but is {}",
                self.difficulty
            )));
        }
        Ok(())
    }
}

/// Intent is what a controller wants the car to do in the current tick.
/// * `throttle` - Fraction of the base acceleration to apply, 0.0 for coasting
/// * `boost` - Try to activate the boost
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    pub throttle: f64,
    pub boost: bool,
}

#[derive(Debug, Clone)]
pub struct AiController {
    pub difficulty: f64,
    reaction_timer: f64,
    decision_timer: u32,
    decision_interval: u32,
}

impl AiController {
    pub fn new<R: Rng + ?Sized>(difficulty: f64, rng: &mut R) -> AiController {
        AiController {
            difficulty,
            reaction_timer: rng.gen_range(30.0..=60.0) / difficulty,
            decision_timer: 0,
            decision_interval: rng.gen_range(30..=90),
        }
    }

    /// reacting returns true as long as the AI has not yet reacted to the start.
    pub fn reacting(&self) -> bool {
        self.reaction_timer > 0.0
    }

    fn decide<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Intent {
        if self.reaction_timer > 0.0 {
            self.reaction_timer -= 1.0;
            return Intent::default();
        }

        let mut intent = Intent {
            throttle: rng.gen_range(0.8..=1.0),
            boost: false,
        };

        self.decision_timer += 1;
        if self.decision_timer >= self.decision_interval {
            self.decision_timer = 0;
            self.decision_interval = rng.gen_range(30..=90);

            // higher difficulty -> more eager to boost
            intent.boost = rng.gen::<f64>() < 0.3 * self.difficulty;
        }

        intent
    }
}

/// Controller decides acceleration and boost for a car, either from the keyboard or from the
/// built-in opponent logic. The physics is the same for both.
#[derive(Debug, Clone)]
pub enum Controller {
    Human(PlayerSlot),
    Ai(AiController),
}

impl Controller {
    pub fn decide<R: Rng + ?Sized>(&mut self, input: &InputState, rng: &mut R) -> Intent {
        match self {
            Controller::Human(slot) => Intent {
                throttle: if input.any_pressed(slot.accelerate_keys()) {
                    1.0
                } else {
                    0.0
                },
                boost: input.is_pressed(slot.boost_key()),
            },
            Controller::Ai(ai) => ai.decide(rng),
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Controller::Human(_))
    }

    /// difficulty returns the AI difficulty, humans count as 1.0.
    pub fn difficulty(&self) -> f64 {
        match self {
            Controller::Human(_) => 1.0,
            Controller::Ai(ai) => ai.difficulty,
        }
    }
}
