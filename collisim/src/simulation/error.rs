//! Error taxonomy for the engine
//!
//! Configuration and spawn errors are reported through [`SimError`].
//! A body found outside the grid during a step is a contract violation
//! and is handled by the grid itself (see `grid::UniformGrid::rebucket`).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Invalid construction parameter (cell size, arena, threshold...)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Spawn request with a radius or mass the engine cannot simulate
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// Spawn position outside the arena / grid extent
    #[error("position ({x}, {y}) is outside the {width}x{height} arena")]
    OutOfBounds { x: f64, y: f64, width: f64, height: f64 },
}

pub type SimResult<T> = Result<T, SimError>;
