//! Dockerfile Generator
//!
//! Synthesizes build definitions for native (buildpack-less) applications:
//! a declared runtime kind plus build/run commands become a Dockerfile that
//! the deploy service feeds to the container engine. Docker-mode deployments
//! bypass this crate entirely and use the caller-supplied Dockerfile.

pub mod images;
pub mod synth;

pub use images::RuntimeImages;
pub use synth::{synthesize, DockerfileSpec};
