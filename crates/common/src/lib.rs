//! Shared types for the Infracon deployment service.

pub mod error;

pub use error::{DeployError, Error, Result, Stage, StageExt};
