pub mod controller;
pub mod handle_session;
pub mod obstacles;
pub mod particles;
pub mod session;
pub mod vehicle;
