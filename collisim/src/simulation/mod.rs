pub mod states;
pub mod error;
pub mod params;
pub mod engine;
pub mod collision;
pub mod grid;
pub mod step;
pub mod gravity;
pub mod command;
pub mod scenario;
