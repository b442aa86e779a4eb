//! Deal assumption records

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Longest amortization term or hold period the engine will project, in years
pub const MAX_TERM_YEARS: u32 = 100;

/// Underwriting assumptions for a single acquisition
///
/// Values are raw decimals (0.065 for 6.5%). The struct is a plain value:
/// callers own it and pass it by reference into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DealAssumptions {
    /// Acquisition price in currency units
    pub purchase_price: f64,

    /// Share of the price funded with equity; the rest is the loan
    pub equity_fraction: f64,

    /// Nominal annual loan rate, compounded monthly
    pub annual_interest_rate: f64,

    /// Amortization term of the loan in years
    pub amortization_years: u32,

    /// Years from acquisition to sale
    pub hold_years: u32,

    /// Net operating income in the first year of ownership
    pub first_year_noi: f64,

    /// Annual NOI growth rate
    pub annual_noi_growth: f64,

    /// Cap rate used to price the sale
    pub exit_cap_rate: f64,
}

impl DealAssumptions {
    /// Equity written at closing
    pub fn initial_equity(&self) -> f64 {
        self.purchase_price * self.equity_fraction
    }

    /// Loan principal at closing
    pub fn loan_amount(&self) -> f64 {
        self.purchase_price * (1.0 - self.equity_fraction)
    }

    /// Loan-to-cost ratio
    pub fn loan_to_cost(&self) -> f64 {
        1.0 - self.equity_fraction
    }

    /// Going-in cap rate (year-one NOI over price)
    pub fn entry_cap_rate(&self) -> f64 {
        self.first_year_noi / self.purchase_price
    }

    /// Copy with only the leverage changed
    pub fn with_equity_fraction(&self, equity_fraction: f64) -> Self {
        Self {
            equity_fraction,
            ..*self
        }
    }

    /// Copy with any fields present in the patch replaced
    pub fn apply_patch(&self, patch: &AssumptionPatch) -> Self {
        Self {
            purchase_price: patch.purchase_price.unwrap_or(self.purchase_price),
            equity_fraction: patch.equity_fraction.unwrap_or(self.equity_fraction),
            annual_interest_rate: patch.annual_interest_rate.unwrap_or(self.annual_interest_rate),
            amortization_years: patch.amortization_years.unwrap_or(self.amortization_years),
            hold_years: patch.hold_years.unwrap_or(self.hold_years),
            first_year_noi: patch.first_year_noi.unwrap_or(self.first_year_noi),
            annual_noi_growth: patch.annual_noi_growth.unwrap_or(self.annual_noi_growth),
            exit_cap_rate: patch.exit_cap_rate.unwrap_or(self.exit_cap_rate),
        }
    }

    /// Fail on the first assumption the model is not defined for
    ///
    /// Runs before any computation; nothing partial is produced on error.
    pub fn check(&self) -> EngineResult<()> {
        let finite = [
            ("purchase_price", self.purchase_price),
            ("equity_fraction", self.equity_fraction),
            ("annual_interest_rate", self.annual_interest_rate),
            ("first_year_noi", self.first_year_noi),
            ("annual_noi_growth", self.annual_noi_growth),
            ("exit_cap_rate", self.exit_cap_rate),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(EngineError::configuration(field, format!("must be finite, got {}", value)));
            }
        }

        if self.purchase_price <= 0.0 {
            return Err(EngineError::configuration(
                "purchase_price",
                format!("must be positive, got {}", self.purchase_price),
            ));
        }
        if self.equity_fraction <= 0.0 || self.equity_fraction > 1.0 {
            return Err(EngineError::configuration(
                "equity_fraction",
                format!("must be in (0, 1], got {}", self.equity_fraction),
            ));
        }
        if self.annual_interest_rate < 0.0 {
            return Err(EngineError::configuration(
                "annual_interest_rate",
                format!("must not be negative, got {}", self.annual_interest_rate),
            ));
        }
        let terms = [
            ("amortization_years", self.amortization_years),
            ("hold_years", self.hold_years),
        ];
        for (field, years) in terms {
            if years == 0 {
                return Err(EngineError::configuration(field, "must be at least 1"));
            }
            if years > MAX_TERM_YEARS {
                return Err(EngineError::configuration(
                    field,
                    format!("must be at most {} years, got {}", MAX_TERM_YEARS, years),
                ));
            }
        }
        if self.exit_cap_rate <= 0.0 {
            return Err(EngineError::configuration(
                "exit_cap_rate",
                format!("must be positive, got {}", self.exit_cap_rate),
            ));
        }
        if self.annual_noi_growth <= -1.0 {
            return Err(EngineError::configuration(
                "annual_noi_growth",
                format!("must be above -100%, got {}", self.annual_noi_growth),
            ));
        }

        Ok(())
    }
}

/// Partial set of assumptions, e.g. suggestions from an advisory service
///
/// Applied with [`DealAssumptions::apply_patch`]; patched values get no
/// special treatment beyond the normal validator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AssumptionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity_fraction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_interest_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amortization_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_year_noi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_noi_growth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_cap_rate: Option<f64>,
}

impl AssumptionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A named deal as loaded from a deal sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// Unique deal identifier
    pub deal_id: u32,

    /// Display name
    pub name: String,

    pub assumptions: DealAssumptions,
}

impl Deal {
    pub fn new(deal_id: u32, name: impl Into<String>, assumptions: DealAssumptions) -> Self {
        Self {
            deal_id,
            name: name.into(),
            assumptions,
        }
    }
}
