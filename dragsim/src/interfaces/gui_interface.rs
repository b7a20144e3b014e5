use crate::core::session::GameState;
use crate::interfaces::input::{InputState, Key};
use crate::interfaces::render::{DrawCmd, RgbColor};
use crate::post::race_result::RaceResult;

pub const MAX_GUI_UPDATE_FREQUENCY: f64 = 60.0;

/// SpriteColors are the car colours the front end uses to paint the sprite handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteColors {
    pub player: RgbColor,
    pub opponent: RgbColor,
}

/// FrameState is sent from the simulator thread to the GUI once per displayed frame.
#[derive(Debug, Clone)]
pub struct FrameState {
    pub draw_cmds: Vec<DrawCmd>,
    pub game_state: GameState,
    pub sprite_colors: SpriteColors,

    // final results payload (sent once when both cars have finished)
    pub final_result: Option<RaceResult>,
}

/// InputMsg is sent from the GUI to the simulator thread.
#[derive(Debug, Clone)]
pub enum InputMsg {
    /// Keys currently held down
    Keys(InputState),
    /// A key went down in this frame
    KeyPressed(Key),
    Quit,
}
