use agora_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seconds of age worth one order of magnitude of net votes.
pub const DECAY_BY_SIGN_DIVISOR: f64 = 45_000.0;

/// Exponent applied to the age term of the gravity algorithm.
pub const GRAVITY: f64 = 1.8;

/// Hours added to every post's age so fresh posts do not divide by ~0.
pub const GRAVITY_AGE_OFFSET_HOURS: f64 = 2.0;

/// Hotness algorithms. Selected once, when the engine is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Logarithmic in vote magnitude, drifting with age in the direction of the vote sign
    DecayBySign,
    /// Net votes divided by a power of age in hours
    GravityDecay,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::DecayBySign => "decay-by-sign",
            Algorithm::GravityDecay => "gravity-decay",
        }
    }

    /// Score a post with `net_votes` that has been visible for `elapsed_secs`.
    pub fn score(&self, net_votes: i64, elapsed_secs: f64) -> f64 {
        match self {
            Algorithm::DecayBySign => decay_by_sign(net_votes, elapsed_secs),
            Algorithm::GravityDecay => gravity_decay(net_votes, elapsed_secs / 3600.0),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decay-by-sign" | "reddit" => Ok(Algorithm::DecayBySign),
            "gravity-decay" | "hacker-news" | "hn" => Ok(Algorithm::GravityDecay),
            _ => Err(ConfigError::UnknownAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

/// `log10(max(|net|, 1)) + sign(net) * seconds / 45000`
pub fn decay_by_sign(net_votes: i64, elapsed_secs: f64) -> f64 {
    let magnitude = (net_votes.unsigned_abs().max(1) as f64).log10();
    let sign = net_votes.signum() as f64;
    magnitude + sign * elapsed_secs / DECAY_BY_SIGN_DIVISOR
}

/// `max(net, 0) / (age_hours + 2)^1.8`
pub fn gravity_decay(net_votes: i64, age_hours: f64) -> f64 {
    let points = net_votes.max(0) as f64;
    points / (age_hours.max(0.0) + GRAVITY_AGE_OFFSET_HOURS).powf(GRAVITY)
}
