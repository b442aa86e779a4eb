//! CRE Returns - deterministic return engine for commercial real estate deals
//!
//! This library provides:
//! - Loan amortization and levered annual cash flow projection
//! - Exit valuation, IRR, equity multiple and cash-on-cash metrics
//! - Conservative / base / aggressive scenario generation
//! - Target-IRR leverage search
//! - Advisory validation of deal assumptions
//!
//! The free functions below run with [`EngineConfig::default`]; build a
//! [`ReturnEngine`] to use other settings.

pub mod config;
pub mod deal;
pub mod error;
pub mod optimizer;
pub mod projection;
pub mod scenario;
pub mod validation;

// Re-export commonly used types
pub use config::EngineConfig;
pub use deal::{AssumptionPatch, Deal, DealAssumptions};
pub use error::{EngineError, EngineResult, LoadError};
pub use optimizer::OptimizationResult;
pub use projection::{DerivedMetrics, IrrStatus, ProjectionResult, ReturnEngine};
pub use scenario::{Scenario, ScenarioLabel, ScenarioSet};
pub use validation::{Severity, ValidationMessage, ValidationReport};

/// IRR, equity multiple, cash-on-cash and debt service for one deal
pub fn compute_outputs(assumptions: &DealAssumptions) -> EngineResult<DerivedMetrics> {
    ReturnEngine::default().compute_outputs(assumptions)
}

/// Conservative, base and aggressive variants of a deal
pub fn generate_scenarios(assumptions: &DealAssumptions) -> EngineResult<ScenarioSet> {
    ReturnEngine::default().generate_scenarios(assumptions)
}

/// Equity fraction that brings the deal's IRR to `target_irr`
pub fn optimize_for_irr(assumptions: &DealAssumptions, target_irr: f64) -> EngineResult<OptimizationResult> {
    ReturnEngine::default().optimize_for_irr(assumptions, target_irr)
}

/// Errors and warnings for a deal; never fails
pub fn validate(assumptions: &DealAssumptions) -> ValidationReport {
    ReturnEngine::default().validate(assumptions)
}
