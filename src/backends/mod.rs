//! Speech synthesis backends.
//!
//! This module contains implementations of [`crate::SpeechSynthesis`].
//!
//! # Available Backends
//!
//! - `memory` - scripted in-process backend that records utterances
//!   (always available; used by tests and the demo)
//!
//! Enable platform backends via Cargo features:
//! - `espeak` - plays utterances through the `espeak-ng` binary

pub mod memory;

#[cfg(feature = "espeak")]
pub mod espeak;
