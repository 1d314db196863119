//! Matcher configuration: auto-match thresholds and default level.

use serde::{Deserialize, Serialize};

use crate::classifier::Level;
use crate::errors::{Error, Result};

/// Auto-match thresholds per entity kind.
///
/// Absolute thresholds gate the top candidate's normalized score; relative
/// thresholds demand separation from the runner-up. Defaults match the
/// tuning the matcher has shipped with for years: 0.85 / 0.085, Full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Classifier level used when a pass doesn't pick its own.
    #[serde(default = "default_level")]
    pub auto_match_level: Level,

    #[serde(default = "default_abs_threshold")]
    pub abs_class_threshold: f64,
    #[serde(default = "default_rel_threshold")]
    pub rel_class_threshold: f64,

    #[serde(default = "default_abs_threshold")]
    pub abs_method_threshold: f64,
    #[serde(default = "default_rel_threshold")]
    pub rel_method_threshold: f64,

    #[serde(default = "default_abs_threshold")]
    pub abs_field_threshold: f64,
    #[serde(default = "default_rel_threshold")]
    pub rel_field_threshold: f64,

    #[serde(default = "default_abs_threshold")]
    pub abs_var_threshold: f64,
    #[serde(default = "default_rel_threshold")]
    pub rel_var_threshold: f64,
}

fn default_level() -> Level {
    Level::Full
}

fn default_abs_threshold() -> f64 {
    0.85
}

fn default_rel_threshold() -> f64 {
    0.085
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            auto_match_level: default_level(),
            abs_class_threshold: default_abs_threshold(),
            rel_class_threshold: default_rel_threshold(),
            abs_method_threshold: default_abs_threshold(),
            rel_method_threshold: default_rel_threshold(),
            abs_field_threshold: default_abs_threshold(),
            rel_field_threshold: default_rel_threshold(),
            abs_var_threshold: default_abs_threshold(),
            rel_var_threshold: default_rel_threshold(),
        }
    }
}

impl MatcherConfig {
    /// Check that every threshold lies in its meaningful range.
    pub fn validate(&self) -> Result<()> {
        let abs = [
            ("abs_class_threshold", self.abs_class_threshold),
            ("abs_method_threshold", self.abs_method_threshold),
            ("abs_field_threshold", self.abs_field_threshold),
            ("abs_var_threshold", self.abs_var_threshold),
        ];

        for (name, value) in abs {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        let rel = [
            ("rel_class_threshold", self.rel_class_threshold),
            ("rel_method_threshold", self.rel_method_threshold),
            ("rel_field_threshold", self.rel_field_threshold),
            ("rel_var_threshold", self.rel_var_threshold),
        ];

        for (name, value) in rel {
            if !(0.0..1.0).contains(&value) {
                return Err(Error::Configuration(format!(
                    "{name} must be within [0, 1), got {value}"
                )));
            }
        }

        Ok(())
    }
}
