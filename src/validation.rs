//! Advisory checks on deal assumptions and their returns
//!
//! Validation never fails. Anything that would make the engine refuse the
//! deal is reported as an error message; softer concerns are warnings.

use crate::config::ValidationThresholds;
use crate::deal::{DealAssumptions, MAX_TERM_YEARS};
use crate::projection::{DerivedMetrics, ReturnEngine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub severity: Severity,
    pub message: String,
}

impl ValidationMessage {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationMessage>,
    pub warnings: Vec<ValidationMessage>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warning(&self, text: &str) -> bool {
        self.warnings.iter().any(|w| w.message.contains(text))
    }

    /// Errors first, then warnings
    pub fn messages(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.errors.iter().chain(self.warnings.iter())
    }

    fn push(&mut self, message: ValidationMessage) {
        match message.severity {
            Severity::Error => self.errors.push(message),
            Severity::Warning => self.warnings.push(message),
        }
    }
}

/// Rules that look at the assumptions alone
pub fn check_assumptions(assumptions: &DealAssumptions, thresholds: &ValidationThresholds) -> ValidationReport {
    let mut report = ValidationReport::default();
    let a = assumptions;

    let fields = [
        ("purchase price", a.purchase_price),
        ("equity fraction", a.equity_fraction),
        ("interest rate", a.annual_interest_rate),
        ("first-year NOI", a.first_year_noi),
        ("NOI growth", a.annual_noi_growth),
        ("exit cap rate", a.exit_cap_rate),
    ];
    for (name, value) in fields {
        if !value.is_finite() {
            report.push(ValidationMessage::error(format!("{} is not a finite number", name)));
        }
    }

    if a.equity_fraction <= 0.0 || a.equity_fraction > 1.0 {
        report.push(ValidationMessage::error(format!(
            "equity fraction must be in (0, 1], got {}",
            a.equity_fraction
        )));
    }
    if a.exit_cap_rate <= 0.0 {
        report.push(ValidationMessage::error(format!(
            "exit cap rate must be positive, got {}",
            a.exit_cap_rate
        )));
    }
    if a.purchase_price <= 0.0 {
        report.push(ValidationMessage::error(format!(
            "purchase price must be positive, got {}",
            a.purchase_price
        )));
    }
    if a.annual_interest_rate < 0.0 {
        report.push(ValidationMessage::error(format!(
            "interest rate must not be negative, got {}",
            a.annual_interest_rate
        )));
    }
    if a.annual_noi_growth <= -1.0 {
        report.push(ValidationMessage::error("NOI growth must be above -100%"));
    }
    if a.hold_years == 0 {
        report.push(ValidationMessage::error("hold period must be at least one year"));
    }
    if a.amortization_years == 0 {
        report.push(ValidationMessage::error("amortization must be at least one year"));
    }
    if a.hold_years > MAX_TERM_YEARS {
        report.push(ValidationMessage::error(format!(
            "hold period must be at most {} years, got {}",
            MAX_TERM_YEARS, a.hold_years
        )));
    }
    if a.amortization_years > MAX_TERM_YEARS {
        report.push(ValidationMessage::error(format!(
            "amortization must be at most {} years, got {}",
            MAX_TERM_YEARS, a.amortization_years
        )));
    }

    if a.equity_fraction > 0.0 && a.equity_fraction < thresholds.low_equity_fraction {
        report.push(ValidationMessage::warning(format!(
            "low equity increases risk ({:.1}% equity)",
            a.equity_fraction * 100.0
        )));
    }
    if a.exit_cap_rate < a.annual_interest_rate {
        report.push(ValidationMessage::warning(format!(
            "exit cap below interest rate ({:.2}% vs {:.2}%)",
            a.exit_cap_rate * 100.0,
            a.annual_interest_rate * 100.0
        )));
    }

    report
}

/// Assumption rules plus the return checks against `metrics`
pub fn validate_with_metrics(
    assumptions: &DealAssumptions,
    metrics: &DerivedMetrics,
    thresholds: &ValidationThresholds,
) -> ValidationReport {
    let mut report = check_assumptions(assumptions, thresholds);

    if !metrics.irr_converged() {
        report.push(ValidationMessage::warning(format!(
            "IRR did not converge ({}); treat it as an estimate",
            metrics.irr_status
        )));
    }
    if metrics.irr < thresholds.min_market_irr {
        report.push(ValidationMessage::warning(format!(
            "IRR below market expectations ({:.2}% < {:.2}%)",
            metrics.irr * 100.0,
            thresholds.min_market_irr * 100.0
        )));
    }

    report
}

impl ReturnEngine {
    /// Validate assumptions, computing returns when the deal is well formed
    pub fn validate(&self, assumptions: &DealAssumptions) -> ValidationReport {
        let thresholds = &self.config().validation;
        let report = check_assumptions(assumptions, thresholds);
        if !report.is_valid() {
            return report;
        }

        match self.compute_outputs(assumptions) {
            Ok(metrics) => validate_with_metrics(assumptions, &metrics, thresholds),
            Err(e) => {
                let mut report = report;
                report.push(ValidationMessage::error(e.to_string()));
                report
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_deal() -> DealAssumptions {
        DealAssumptions {
            purchase_price: 10_000_000.0,
            equity_fraction: 0.4,
            annual_interest_rate: 0.065,
            amortization_years: 30,
            hold_years: 5,
            first_year_noi: 650_000.0,
            annual_noi_growth: 0.025,
            exit_cap_rate: 0.07,
        }
    }

    #[test]
    fn test_clean_deal() {
        let report = ReturnEngine::default().validate(&DealAssumptions {
            annual_interest_rate: 0.05,
            exit_cap_rate: 0.06,
            ..fixture_deal()
        });
        assert!(report.is_valid());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_low_equity_and_cap_below_rate() {
        let deal = DealAssumptions {
            equity_fraction: 0.1,
            exit_cap_rate: 0.04,
            annual_interest_rate: 0.06,
            ..fixture_deal()
        };
        let report = check_assumptions(&deal, &ValidationThresholds::default());

        assert!(report.is_valid());
        assert!(report.has_warning("low equity increases risk"));
        assert!(report.has_warning("exit cap below interest rate"));
    }

    #[test]
    fn test_fatal_conditions_are_errors() {
        let deal = DealAssumptions {
            equity_fraction: 0.0,
            exit_cap_rate: 0.0,
            hold_years: 0,
            ..fixture_deal()
        };
        let report = ReturnEngine::default().validate(&deal);

        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
        assert!(report.errors.iter().all(|m| m.severity == Severity::Error));
        // no metrics are computed for a broken deal
        assert!(!report.has_warning("IRR"));
    }

    #[test]
    fn test_equity_above_one() {
        let deal = DealAssumptions {
            equity_fraction: 1.5,
            ..fixture_deal()
        };
        let report = check_assumptions(&deal, &ValidationThresholds::default());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("equity fraction"));
    }

    #[test]
    fn test_low_irr_warning() {
        // flat NOI and an exit cap well above entry
        let deal = DealAssumptions {
            annual_noi_growth: 0.0,
            exit_cap_rate: 0.08,
            ..fixture_deal()
        };
        let report = ReturnEngine::default().validate(&deal);
        assert!(report.is_valid());
        assert!(report.has_warning("IRR below market expectations"));
    }

    #[test]
    fn test_validate_agrees_with_engine() {
        let engine = ReturnEngine::default();
        let broken = [
            DealAssumptions { purchase_price: -1.0, ..fixture_deal() },
            DealAssumptions { amortization_years: 0, ..fixture_deal() },
            DealAssumptions { amortization_years: 400_000_000, ..fixture_deal() },
            DealAssumptions { hold_years: MAX_TERM_YEARS + 1, ..fixture_deal() },
            DealAssumptions { annual_noi_growth: f64::INFINITY, ..fixture_deal() },
        ];
        for deal in broken {
            assert!(engine.compute_outputs(&deal).is_err());
            assert!(!engine.validate(&deal).is_valid());
        }
        assert!(engine.compute_outputs(&fixture_deal()).is_ok());
        assert!(engine.validate(&fixture_deal()).is_valid());
    }

    #[test]
    fn test_unconverged_irr_warning() {
        let deal = fixture_deal();
        let mut metrics = ReturnEngine::default().compute_outputs(&deal).unwrap();
        metrics.irr_status = crate::projection::IrrStatus::MaxIterations;

        let report = validate_with_metrics(&deal, &metrics, &ValidationThresholds::default());
        assert!(report.has_warning("did not converge"));
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&ValidationMessage::warning("x")).unwrap();
        assert_eq!(json, r#"{"severity":"warning","message":"x"}"#);
    }
}
