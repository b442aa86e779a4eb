//! Annual cash flow output structures

use super::amortization::LoanSchedule;
use super::exit::ExitValuation;
use crate::deal::DealAssumptions;
use serde::{Deserialize, Serialize};

/// One hold year of the levered projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnualRow {
    pub year: u32,
    pub noi: f64,
    pub debt_service: f64,
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub ending_loan_balance: f64,

    /// NOI less debt service
    pub operating_cash_flow: f64,

    /// Net sale proceeds, final year only
    pub exit_proceeds: f64,

    /// Equity cash flow for the year
    pub total_cash_flow: f64,

    /// NOI over debt service; `None` once nothing is owed
    pub dscr: Option<f64>,
}

impl AnnualRow {
    pub fn new(year: u32) -> Self {
        Self {
            year,
            noi: 0.0,
            debt_service: 0.0,
            interest_paid: 0.0,
            principal_paid: 0.0,
            ending_loan_balance: 0.0,
            operating_cash_flow: 0.0,
            exit_proceeds: 0.0,
            total_cash_flow: 0.0,
            dscr: None,
        }
    }
}

/// Equity cash flows by year, year 0 being the equity check
///
/// Always `hold_years + 1` entries with `flows[0] < 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSeries {
    pub flows: Vec<f64>,
}

impl CashFlowSeries {
    pub fn new(flows: Vec<f64>) -> Self {
        Self { flows }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.flows
    }

    /// Equity invested at closing, as a positive amount
    pub fn initial_equity(&self) -> f64 {
        self.flows.first().map(|cf| -cf).unwrap_or(0.0)
    }

    /// Sum of every flow after closing, exit included
    pub fn total_distributions(&self) -> f64 {
        self.flows.iter().skip(1).sum()
    }
}

/// Complete projection of one deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub assumptions: DealAssumptions,
    pub loan: LoanSchedule,
    pub rows: Vec<AnnualRow>,
    pub exit: ExitValuation,
    pub series: CashFlowSeries,
}

impl ProjectionResult {
    /// Summary statistics across the hold
    pub fn summary(&self) -> ProjectionSummary {
        ProjectionSummary {
            hold_years: self.rows.len() as u32,
            total_noi: self.rows.iter().map(|r| r.noi).sum(),
            total_debt_service: self.rows.iter().map(|r| r.debt_service).sum(),
            total_interest: self.rows.iter().map(|r| r.interest_paid).sum(),
            total_operating_cash_flow: self.rows.iter().map(|r| r.operating_cash_flow).sum(),
            net_sale_proceeds: self.exit.net_proceeds,
            min_dscr: self.rows.iter().filter_map(|r| r.dscr).reduce(f64::min),
        }
    }
}

/// Totals over a projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub hold_years: u32,
    pub total_noi: f64,
    pub total_debt_service: f64,
    pub total_interest: f64,
    pub total_operating_cash_flow: f64,
    pub net_sale_proceeds: f64,
    pub min_dscr: Option<f64>,
}
