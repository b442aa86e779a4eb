//! Levered cash flow projection and return metrics for a single deal

pub mod amortization;
mod cashflows;
mod engine;
mod exit;
pub mod irr;
mod metrics;

pub use amortization::{LoanSchedule, LoanYear};
pub use cashflows::{AnnualRow, CashFlowSeries, ProjectionResult, ProjectionSummary};
pub use engine::{BatchOutcome, DealEvaluation, ReturnEngine};
pub use exit::ExitValuation;
pub use irr::{npv, solve_irr, IrrSolution, IrrStatus};
pub use metrics::DerivedMetrics;
