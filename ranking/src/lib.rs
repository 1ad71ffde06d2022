//! Hotness scoring.
//!
//! Two algorithms are available, both pure functions of net votes and age:
//!
//! - [`Algorithm::DecayBySign`]: `log10(max(|net|, 1)) + sign(net) * seconds / 45000`
//! - [`Algorithm::GravityDecay`]: `max(net, 0) / (hours + 2)^1.8`
//!
//! Unknown algorithm names fail to parse with [`agora_core::ConfigError::UnknownAlgorithm`];
//! there is no fallback algorithm.

pub mod algorithm;
pub mod engine;

pub use algorithm::{decay_by_sign, gravity_decay, Algorithm};
pub use engine::RankingEngine;
