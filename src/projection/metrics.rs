//! Return metrics derived from an equity cash flow series

use super::amortization::LoanSchedule;
use super::cashflows::CashFlowSeries;
use super::irr::{solve_irr, IrrStatus};
use crate::config::IrrConfig;
use crate::deal::DealAssumptions;
use serde::{Deserialize, Serialize};

/// Headline returns for one set of assumptions
///
/// Rates and ratios are raw decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Annual levered IRR; only meaningful when `irr_status` is converged
    pub irr: f64,
    pub irr_status: IrrStatus,
    /// Distributions over equity invested
    pub equity_multiple: f64,
    /// Year-one NOI less debt service, over equity
    pub cash_on_cash_year1: f64,
    pub annual_debt_service: f64,
    pub initial_equity: f64,
    pub total_distributions: f64,
    pub net_profit: f64,
    /// Year-one NOI over debt service; `None` for an all-equity deal
    pub dscr_year1: Option<f64>,
}

impl DerivedMetrics {
    pub fn compute(assumptions: &DealAssumptions, series: &CashFlowSeries, irr_config: &IrrConfig) -> Self {
        let loan = LoanSchedule::new(
            assumptions.loan_amount(),
            assumptions.annual_interest_rate,
            assumptions.amortization_years,
        );
        let annual_debt_service = loan.annual_debt_service();

        let initial_equity = series.initial_equity();
        let total_distributions = series.total_distributions();
        let irr = solve_irr(series.as_slice(), irr_config);

        let dscr_year1 = if annual_debt_service > 0.0 {
            Some(assumptions.first_year_noi / annual_debt_service)
        } else {
            None
        };

        Self {
            irr: irr.rate,
            irr_status: irr.status,
            equity_multiple: total_distributions / initial_equity,
            cash_on_cash_year1: (assumptions.first_year_noi - annual_debt_service) / initial_equity,
            annual_debt_service,
            initial_equity,
            total_distributions,
            net_profit: total_distributions - initial_equity,
            dscr_year1,
        }
    }

    pub fn irr_converged(&self) -> bool {
        self.irr_status.is_converged()
    }
}
