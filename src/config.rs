//! Configuration for a tracking session.
//!
//! [`Config`] bundles the settings of every component so a [`crate::Session`] can be started
//! from one value, either built in code or read from the environment.

use std::env;

use log::warn;

use crate::{
    rewriter::RewriteConfig,
    runtime::DispatchConfig,
    symbolic::{LiteralPolicy, SolverConfig},
};

/// Configuration of a tracking session.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Which classes the rewriter leaves alone.
    pub rewrite: RewriteConfig,

    /// Whether and how comparisons are recorded.
    pub dispatch: DispatchConfig,

    /// Which unlabeled values become constants in expressions (default: `-10..=10`).
    pub literals: LiteralPolicy,

    /// How to reach the external solver (default: in-process solver).
    pub solver: SolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Tag-presence recording, the in-process solver and the default literal window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rewrite: RewriteConfig::new(),
            dispatch: DispatchConfig::new(),
            literals: LiteralPolicy::new(),
            solver: SolverConfig::new(),
        }
    }

    /// Preset recording by operand magnitude instead of tag lookups.
    ///
    /// Cheaper on the hot path but records unlabeled comparisons too.
    #[must_use]
    pub fn performance(threshold: f64) -> Self {
        Self {
            dispatch: DispatchConfig::magnitude(threshold),
            ..Self::new()
        }
    }

    /// Preset that rewrites code but never records.
    #[must_use]
    pub fn untracked() -> Self {
        Self {
            dispatch: DispatchConfig::disabled(),
            ..Self::new()
        }
    }

    /// Defaults overridden from the environment.
    ///
    /// - `SAT_SERVER`, `SAT_PORT`: external solver address, see [`SolverConfig::from_env`]
    /// - `PATHCOND_TRACKING`: `off` disables recording
    /// - `PATHCOND_EXCLUDE`: comma-separated extra class prefixes to leave alone
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.solver = SolverConfig::from_env();

        if let Ok(tracking) = env::var("PATHCOND_TRACKING") {
            match tracking.as_str() {
                "off" | "0" | "false" => config.dispatch = DispatchConfig::disabled(),
                "on" | "1" | "true" => {}
                other => warn!("ignoring invalid PATHCOND_TRACKING value '{other}'"),
            }
        }

        if let Ok(prefixes) = env::var("PATHCOND_EXCLUDE") {
            config.rewrite.excluded_prefixes.extend(
                prefixes
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from),
            );
        }

        config
    }
}
