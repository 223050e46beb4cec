//! Configuration for the evaluation pipeline.
//!
//! All knobs live in one [`EvalConfig`] tree with sensible defaults, so the
//! common path is `EvalConfig::default()`. Weights and thresholds are
//! validated up front; a misconfigured engine fails at construction rather
//! than producing silently skewed scores.

use crate::error::{EvalError, Result};

/// Classification thresholds for novelty detection.
///
/// Similarity at or above `duplicate` classifies as a duplicate, at or above
/// `variant` as a variant, below as novel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoveltyThresholds {
    pub duplicate: f64,
    pub variant: f64,
}

impl Default for NoveltyThresholds {
    fn default() -> Self {
        Self {
            duplicate: 0.95,
            variant: 0.70,
        }
    }
}

/// Weights for the stability composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityWeights {
    pub hash_consistency: f64,
    pub selectors_variance: f64,
    pub semantic_variance: f64,
}

impl Default for StabilityWeights {
    fn default() -> Self {
        Self {
            hash_consistency: 0.5,
            selectors_variance: 0.3,
            semantic_variance: 0.2,
        }
    }
}

/// Weights for the huntability composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HuntabilityWeights {
    pub commandline_specificity: f64,
    pub ttp_clarity: f64,
    pub parent_child: f64,
    pub telemetry_feasibility: f64,
    pub overfitting: f64,
}

impl Default for HuntabilityWeights {
    fn default() -> Self {
        Self {
            commandline_specificity: 0.25,
            ttp_clarity: 0.20,
            parent_child: 0.15,
            telemetry_feasibility: 0.15,
            overfitting: 0.25,
        }
    }
}

/// Top-level configuration for [`EvalEngine`](crate::EvalEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct EvalConfig {
    pub novelty: NoveltyThresholds,
    pub stability: StabilityWeights,
    pub huntability: HuntabilityWeights,
    /// Default number of generation runs for stability testing.
    pub stability_runs: usize,
    /// Evaluate dataset items on the rayon thread pool.
    pub parallel: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            novelty: NoveltyThresholds::default(),
            stability: StabilityWeights::default(),
            huntability: HuntabilityWeights::default(),
            stability_runs: 5,
            parallel: true,
        }
    }
}

impl EvalConfig {
    /// Validate the configuration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sigma_eval::EvalConfig;
    ///
    /// assert!(EvalConfig::default().validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.novelty.duplicate)
            || !(0.0..=1.0).contains(&self.novelty.variant)
        {
            return Err(EvalError::ConfigError(
                "Novelty thresholds must lie in [0, 1]".to_string(),
            ));
        }
        if self.novelty.variant > self.novelty.duplicate {
            return Err(EvalError::ConfigError(
                "Variant threshold must not exceed duplicate threshold".to_string(),
            ));
        }

        let stability_sum = self.stability.hash_consistency
            + self.stability.selectors_variance
            + self.stability.semantic_variance;
        if (stability_sum - 1.0).abs() > 1e-6 {
            return Err(EvalError::ConfigError(format!(
                "Stability weights must sum to 1.0, got {stability_sum}"
            )));
        }

        let huntability_sum = self.huntability.commandline_specificity
            + self.huntability.ttp_clarity
            + self.huntability.parent_child
            + self.huntability.telemetry_feasibility
            + self.huntability.overfitting;
        if (huntability_sum - 1.0).abs() > 1e-6 {
            return Err(EvalError::ConfigError(format!(
                "Huntability weights must sum to 1.0, got {huntability_sum}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EvalConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_novelty_thresholds_rejected() {
        let mut config = EvalConfig::default();
        config.novelty.variant = 0.99;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EvalError::ConfigError(_)));
    }

    #[test]
    fn test_stability_weights_must_sum_to_one() {
        let mut config = EvalConfig::default();
        config.stability.hash_consistency = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huntability_weights_must_sum_to_one() {
        let mut config = EvalConfig::default();
        config.huntability.overfitting = 0.5;
        assert!(config.validate().is_err());
    }
}
