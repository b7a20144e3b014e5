pub mod clock;
pub mod gui_interface;
pub mod input;
pub mod render;
