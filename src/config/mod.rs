//! Tunable engine constants: IRR solver, exit pricing, scenario shocks,
//! optimizer bounds and validation thresholds
//!
//! Everything defaults to the standard underwriting values and can be
//! overridden from a `key,value` CSV file (see [`loader`]) or from
//! `CRE_*` environment variables.

pub mod loader;

use crate::error::{EngineError, EngineResult, LoadError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Prefix for environment overrides, e.g. `CRE_IRR_MAX_ITERATIONS`
pub const ENV_PREFIX: &str = "CRE_";

/// Every overridable key, in `section.field` form
pub const OVERRIDE_KEYS: &[&str] = &[
    "irr.initial_guess",
    "irr.max_iterations",
    "irr.tolerance",
    "irr.rate_floor",
    "irr.rate_ceiling",
    "irr.bisection_max_iterations",
    "exit.selling_cost_rate",
    "exit.noi_basis",
    "scenarios.noi_growth_shift",
    "scenarios.exit_cap_shift",
    "scenarios.min_exit_cap_ratio",
    "optimizer.min_equity_fraction",
    "optimizer.max_equity_fraction",
    "optimizer.max_iterations",
    "optimizer.irr_tolerance",
    "validation.low_equity_fraction",
    "validation.min_market_irr",
];

/// Newton-Raphson and fallback bisection settings for the IRR solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrConfig {
    /// Starting rate for the iteration
    pub initial_guess: f64,
    pub max_iterations: u32,
    /// Stop once successive estimates differ by less than this
    pub tolerance: f64,
    /// Estimates are clamped here so (1 + r) stays positive
    pub rate_floor: f64,
    /// Upper clamp keeping divergent estimates finite
    pub rate_ceiling: f64,
    /// Budget for bisecting [floor, ceiling] when Newton does not converge
    pub bisection_max_iterations: u32,
}

impl Default for IrrConfig {
    fn default() -> Self {
        Self {
            initial_guess: 0.12,
            max_iterations: 50,
            tolerance: 1e-7,
            rate_floor: -0.99,
            rate_ceiling: 10.0,
            bisection_max_iterations: 100,
        }
    }
}

/// Which NOI the exit cap rate is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitNoiBasis {
    /// NOI of the year after the hold (buyer's first year)
    Forward,
    /// NOI of the final hold year
    Trailing,
}

impl ExitNoiBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitNoiBasis::Forward => "forward",
            ExitNoiBasis::Trailing => "trailing",
        }
    }
}

impl std::str::FromStr for ExitNoiBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(ExitNoiBasis::Forward),
            "trailing" => Ok(ExitNoiBasis::Trailing),
            other => Err(format!("unknown NOI basis: {}", other)),
        }
    }
}

/// Sale pricing at the end of the hold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitConfig {
    /// Brokerage, transfer and closing costs as a fraction of sale value
    pub selling_cost_rate: f64,
    pub noi_basis: ExitNoiBasis,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            selling_cost_rate: 0.02,
            noi_basis: ExitNoiBasis::Forward,
        }
    }
}

/// Perturbations applied to the base case for conservative/aggressive runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioShocks {
    /// Subtracted from NOI growth (conservative), added (aggressive)
    pub noi_growth_shift: f64,
    /// Added to the exit cap (conservative), subtracted (aggressive)
    pub exit_cap_shift: f64,
    /// Aggressive exit cap never drops below this share of the base cap
    pub min_exit_cap_ratio: f64,
}

impl Default for ScenarioShocks {
    fn default() -> Self {
        Self {
            noi_growth_shift: 0.01,
            exit_cap_shift: 0.005,
            min_exit_cap_ratio: 0.5,
        }
    }
}

/// Bisection bounds for the target-IRR leverage search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub min_equity_fraction: f64,
    pub max_equity_fraction: f64,
    pub max_iterations: u32,
    /// Achieved IRR within this distance of the target counts as reached
    pub irr_tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_equity_fraction: 0.05,
            max_equity_fraction: 1.0,
            max_iterations: 60,
            irr_tolerance: 1e-4,
        }
    }
}

/// Thresholds behind the advisory validation warnings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationThresholds {
    pub low_equity_fraction: f64,
    pub min_market_irr: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            low_equity_fraction: 0.25,
            min_market_irr: 0.08,
        }
    }
}

/// Container for all engine tunables
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub irr: IrrConfig,
    pub exit: ExitConfig,
    pub scenarios: ScenarioShocks,
    pub optimizer: OptimizerConfig,
    pub validation: ValidationThresholds,
}

impl EngineConfig {
    /// Defaults with any `CRE_*` environment overrides applied
    pub fn from_env() -> Result<Self, LoadError> {
        let mut config = Self::default();
        for key in OVERRIDE_KEYS {
            if let Ok(value) = env::var(env_var_name(key)) {
                config.apply_override(key, &value)?;
            }
        }
        Ok(config)
    }

    /// Defaults with the overrides from a `key,value` CSV file applied
    pub fn from_csv_path(path: &Path) -> Result<Self, LoadError> {
        let mut config = Self::default();
        for (key, value) in loader::load_overrides(path)? {
            config.apply_override(&key, &value)?;
        }
        Ok(config)
    }

    /// Set one tunable by its `section.field` key
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), LoadError> {
        let invalid = || LoadError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let float = || value.trim().parse::<f64>().map_err(|_| invalid());
        let count = || value.trim().parse::<u32>().map_err(|_| invalid());

        match key {
            "irr.initial_guess" => self.irr.initial_guess = float()?,
            "irr.max_iterations" => self.irr.max_iterations = count()?,
            "irr.tolerance" => self.irr.tolerance = float()?,
            "irr.rate_floor" => self.irr.rate_floor = float()?,
            "irr.rate_ceiling" => self.irr.rate_ceiling = float()?,
            "irr.bisection_max_iterations" => self.irr.bisection_max_iterations = count()?,
            "exit.selling_cost_rate" => self.exit.selling_cost_rate = float()?,
            "exit.noi_basis" => self.exit.noi_basis = value.parse().map_err(|_| invalid())?,
            "scenarios.noi_growth_shift" => self.scenarios.noi_growth_shift = float()?,
            "scenarios.exit_cap_shift" => self.scenarios.exit_cap_shift = float()?,
            "scenarios.min_exit_cap_ratio" => self.scenarios.min_exit_cap_ratio = float()?,
            "optimizer.min_equity_fraction" => self.optimizer.min_equity_fraction = float()?,
            "optimizer.max_equity_fraction" => self.optimizer.max_equity_fraction = float()?,
            "optimizer.max_iterations" => self.optimizer.max_iterations = count()?,
            "optimizer.irr_tolerance" => self.optimizer.irr_tolerance = float()?,
            "validation.low_equity_fraction" => self.validation.low_equity_fraction = float()?,
            "validation.min_market_irr" => self.validation.min_market_irr = float()?,
            other => return Err(LoadError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn check(&self) -> EngineResult<()> {
        let irr = &self.irr;
        if irr.max_iterations == 0 {
            return Err(EngineError::engine_config("irr.max_iterations", "must be at least 1"));
        }
        if irr.bisection_max_iterations == 0 {
            return Err(EngineError::engine_config("irr.bisection_max_iterations", "must be at least 1"));
        }
        if !(irr.tolerance > 0.0) {
            return Err(EngineError::engine_config("irr.tolerance", "must be positive"));
        }
        if !(irr.rate_floor > -1.0) || !(irr.rate_ceiling > irr.rate_floor) {
            return Err(EngineError::engine_config(
                "irr.rate_floor",
                format!(
                    "need -1 < floor < ceiling, got floor {} ceiling {}",
                    irr.rate_floor, irr.rate_ceiling
                ),
            ));
        }
        if !(irr.initial_guess >= irr.rate_floor && irr.initial_guess <= irr.rate_ceiling) {
            return Err(EngineError::engine_config(
                "irr.initial_guess",
                "must lie between the rate floor and ceiling",
            ));
        }

        if !(0.0..1.0).contains(&self.exit.selling_cost_rate) {
            return Err(EngineError::engine_config(
                "exit.selling_cost_rate",
                format!("must be in [0, 1), got {}", self.exit.selling_cost_rate),
            ));
        }

        let shocks = &self.scenarios;
        if !(shocks.noi_growth_shift >= 0.0) || !(shocks.exit_cap_shift >= 0.0) {
            return Err(EngineError::engine_config(
                "scenarios",
                "shifts are magnitudes and must be non-negative",
            ));
        }
        if !(shocks.min_exit_cap_ratio > 0.0 && shocks.min_exit_cap_ratio <= 1.0) {
            return Err(EngineError::engine_config(
                "scenarios.min_exit_cap_ratio",
                "must be in (0, 1]",
            ));
        }

        let opt = &self.optimizer;
        if !(opt.min_equity_fraction > 0.0
            && opt.min_equity_fraction < opt.max_equity_fraction
            && opt.max_equity_fraction <= 1.0)
        {
            return Err(EngineError::engine_config(
                "optimizer.min_equity_fraction",
                format!(
                    "need 0 < min < max <= 1, got [{}, {}]",
                    opt.min_equity_fraction, opt.max_equity_fraction
                ),
            ));
        }
        if opt.max_iterations == 0 {
            return Err(EngineError::engine_config("optimizer.max_iterations", "must be at least 1"));
        }
        if !(opt.irr_tolerance > 0.0) {
            return Err(EngineError::engine_config("optimizer.irr_tolerance", "must be positive"));
        }

        Ok(())
    }
}

/// `irr.max_iterations` -> `CRE_IRR_MAX_ITERATIONS`
pub fn env_var_name(key: &str) -> String {
    format!("{}{}", ENV_PREFIX, key.replace('.', "_").to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_underwriting_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.irr.initial_guess, 0.12);
        assert_eq!(config.irr.max_iterations, 50);
        assert_eq!(config.irr.tolerance, 1e-7);
        assert_eq!(config.irr.rate_floor, -0.99);
        assert_eq!(config.irr.bisection_max_iterations, 100);
        assert_eq!(config.exit.selling_cost_rate, 0.02);
        assert_eq!(config.exit.noi_basis, ExitNoiBasis::Forward);
        assert_eq!(config.optimizer.min_equity_fraction, 0.05);
        assert_eq!(config.optimizer.max_equity_fraction, 1.0);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_apply_override() {
        let mut config = EngineConfig::default();
        config.apply_override("exit.selling_cost_rate", "0.03").unwrap();
        config.apply_override("irr.max_iterations", " 80 ").unwrap();
        config.apply_override("exit.noi_basis", "Trailing").unwrap();

        assert_eq!(config.exit.selling_cost_rate, 0.03);
        assert_eq!(config.irr.max_iterations, 80);
        assert_eq!(config.exit.noi_basis, ExitNoiBasis::Trailing);
    }

    #[test]
    fn test_apply_override_rejects_bad_input() {
        let mut config = EngineConfig::default();
        assert!(matches!(
            config.apply_override("irr.warp_factor", "9"),
            Err(LoadError::UnknownKey(_))
        ));
        assert!(matches!(
            config.apply_override("irr.max_iterations", "-3"),
            Err(LoadError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.apply_override("exit.noi_basis", "sideways"),
            Err(LoadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_every_key_is_overridable() {
        for key in OVERRIDE_KEYS {
            let mut config = EngineConfig::default();
            let value = if *key == "exit.noi_basis" { "forward" } else { "1" };
            assert!(config.apply_override(key, value).is_ok(), "key {} rejected", key);
        }
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("irr.max_iterations"), "CRE_IRR_MAX_ITERATIONS");
        assert_eq!(env_var_name("exit.selling_cost_rate"), "CRE_EXIT_SELLING_COST_RATE");
    }

    #[test]
    fn test_from_env_reads_prefixed_vars() {
        // only this test touches CRE_SCENARIOS_EXIT_CAP_SHIFT
        env::set_var("CRE_SCENARIOS_EXIT_CAP_SHIFT", "0.0075");
        let config = EngineConfig::from_env().unwrap();
        env::remove_var("CRE_SCENARIOS_EXIT_CAP_SHIFT");

        assert_eq!(config.scenarios.exit_cap_shift, 0.0075);
    }

    #[test]
    fn test_check_rejects_inverted_optimizer_bounds() {
        let mut config = EngineConfig::default();
        config.optimizer.min_equity_fraction = 0.8;
        config.optimizer.max_equity_fraction = 0.4;
        let err = config.check().unwrap_err();
        assert_eq!(err.field(), "optimizer.min_equity_fraction");
    }

    #[test]
    fn test_check_rejects_floor_at_minus_one() {
        let mut config = EngineConfig::default();
        config.irr.rate_floor = -1.0;
        assert!(config.check().is_err());
    }
}
