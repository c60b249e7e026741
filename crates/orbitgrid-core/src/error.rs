//! Error types for orbitgrid

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum OrbitError {
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),
    #[error("Unknown effect: {0}")]
    UnknownEffect(String),
    #[error("Invalid subdivision: {0}")]
    InvalidSubdivision(String),
    #[error("Invalid base length: {0} beats")]
    InvalidBaseLength(u32),
    #[error("Invalid hit character '{ch}' at step {step}")]
    InvalidHit { ch: char, step: usize },
}

pub type Result<T> = std::result::Result<T, OrbitError>;
