//! Coach configuration loaded from TOML.
//!
//! Every threshold that drives the pipeline (sanity ranges, hysteresis
//! thresholds, debounce counts, cooldowns) is an operator-tunable value with
//! defaults matching the original deployment. The loaded config is passed
//! explicitly into each component at construction so stabilizer behavior is
//! fully reproducible in tests; there is no ambient global.
//!
//! ## Loading Order
//!
//! 1. `PACELINE_CONFIG` environment variable (path to TOML file)
//! 2. `coach.toml` in the current working directory
//! 3. Built-in defaults

mod coach_config;

pub use coach_config::*;
