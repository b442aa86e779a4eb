//! Core return engine: assumptions in, projection and metrics out

use super::amortization::LoanSchedule;
use super::cashflows::{AnnualRow, CashFlowSeries, ProjectionResult};
use super::exit::ExitValuation;
use super::metrics::DerivedMetrics;
use crate::config::EngineConfig;
use crate::deal::{Deal, DealAssumptions};
use crate::error::EngineResult;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Main return engine
///
/// Holds only configuration; every call builds its own schedule and flows,
/// so one engine can be shared across threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnEngine {
    config: EngineConfig,
}

/// Projection plus the metrics derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealEvaluation {
    pub projection: ProjectionResult,
    pub metrics: DerivedMetrics,
}

/// Result of one deal in a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub deal_id: u32,
    pub name: String,
    pub metrics: Option<DerivedMetrics>,
    pub error: Option<String>,
}

impl ReturnEngine {
    /// Create an engine, rejecting unusable tuning constants
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.check()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Project the levered equity cash flows for one deal
    pub fn project(&self, assumptions: &DealAssumptions) -> EngineResult<ProjectionResult> {
        assumptions.check()?;

        let loan = LoanSchedule::new(
            assumptions.loan_amount(),
            assumptions.annual_interest_rate,
            assumptions.amortization_years,
        );
        let loan_years = loan.annual_summary(assumptions.hold_years);

        let mut rows = Vec::with_capacity(loan_years.len());
        let mut flows = Vec::with_capacity(loan_years.len() + 1);
        flows.push(-assumptions.initial_equity());

        for loan_year in &loan_years {
            let year = loan_year.year;
            let noi = assumptions.first_year_noi * (1.0 + assumptions.annual_noi_growth).powi(year as i32 - 1);
            let debt_service = loan.debt_service_for_year(year);

            let mut row = AnnualRow::new(year);
            row.noi = noi;
            row.debt_service = debt_service;
            row.interest_paid = loan_year.interest;
            row.principal_paid = loan_year.principal;
            row.ending_loan_balance = loan_year.ending_balance;
            row.operating_cash_flow = noi - debt_service;
            row.total_cash_flow = row.operating_cash_flow;
            row.dscr = (debt_service > 0.0).then(|| noi / debt_service);
            rows.push(row);
        }

        let (final_noi, payoff) = rows
            .last()
            .map(|r| (r.noi, r.ending_loan_balance))
            .unwrap_or((assumptions.first_year_noi, loan.principal));

        let exit = ExitValuation::compute(
            final_noi,
            assumptions.annual_noi_growth,
            assumptions.exit_cap_rate,
            payoff,
            &self.config.exit,
        )?;

        if let Some(last) = rows.last_mut() {
            last.exit_proceeds = exit.net_proceeds;
            last.total_cash_flow += exit.net_proceeds;
        }
        flows.extend(rows.iter().map(|r| r.total_cash_flow));

        debug!(
            "projected {} years: equity {:.2}, sale {:.2}, net proceeds {:.2}",
            rows.len(),
            assumptions.initial_equity(),
            exit.sale_price,
            exit.net_proceeds
        );

        Ok(ProjectionResult {
            assumptions: *assumptions,
            loan,
            rows,
            exit,
            series: CashFlowSeries::new(flows),
        })
    }

    /// Project a deal and derive its metrics
    pub fn evaluate(&self, assumptions: &DealAssumptions) -> EngineResult<DealEvaluation> {
        let projection = self.project(assumptions)?;
        let metrics = DerivedMetrics::compute(assumptions, &projection.series, &self.config.irr);

        if !metrics.irr_converged() {
            warn!(
                "IRR did not converge ({}), last estimate {:.6}",
                metrics.irr_status, metrics.irr
            );
        }
        debug!(
            "irr {:.6} ({}), multiple {:.4}, cash-on-cash {:.4}",
            metrics.irr, metrics.irr_status, metrics.equity_multiple, metrics.cash_on_cash_year1
        );

        Ok(DealEvaluation { projection, metrics })
    }

    /// Headline metrics for one set of assumptions
    pub fn compute_outputs(&self, assumptions: &DealAssumptions) -> EngineResult<DerivedMetrics> {
        self.evaluate(assumptions).map(|e| e.metrics)
    }

    /// Evaluate many deals in parallel; a bad deal does not stop the rest
    pub fn evaluate_batch(&self, deals: &[Deal]) -> Vec<BatchOutcome> {
        deals
            .par_iter()
            .map(|deal| {
                let (metrics, error) = match self.compute_outputs(&deal.assumptions) {
                    Ok(metrics) => (Some(metrics), None),
                    Err(e) => {
                        warn!("deal {} ({}) skipped: {}", deal.deal_id, deal.name, e);
                        (None, Some(e.to_string()))
                    }
                };
                BatchOutcome {
                    deal_id: deal.deal_id,
                    name: deal.name.clone(),
                    metrics,
                    error,
                }
            })
            .collect()
    }
}

impl Default for ReturnEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExitConfig, ExitNoiBasis};
    use crate::projection::IrrStatus;
    use approx::assert_relative_eq;

    fn fixture_deal() -> DealAssumptions {
        DealAssumptions {
            purchase_price: 10_000_000.0,
            equity_fraction: 0.4,
            annual_interest_rate: 0.065,
            amortization_years: 30,
            hold_years: 5,
            first_year_noi: 650_000.0,
            annual_noi_growth: 0.025,
            exit_cap_rate: 0.06,
        }
    }

    #[test]
    fn test_fixture_cash_flows() {
        let engine = ReturnEngine::default();
        let projection = engine.project(&fixture_deal()).unwrap();

        let expected = [
            -4_000_000.0,
            194_911.023_085_064_95,
            211_161.023_085_064_95,
            227_817.273_085_064_95,
            244_889.929_335_064_72,
            6_657_514.615_686_273,
        ];
        assert_eq!(projection.series.flows.len(), 6);
        for (actual, expected) in projection.series.flows.iter().zip(expected) {
            assert_relative_eq!(*actual, expected, epsilon = 1e-4);
        }

        assert_relative_eq!(projection.exit.loan_payoff, 5_616_658.646_493_834, epsilon = 1e-4);
        assert_eq!(projection.rows[4].exit_proceeds, projection.exit.net_proceeds);
        assert_eq!(projection.rows[0].exit_proceeds, 0.0);
    }

    #[test]
    fn test_fixture_metrics() {
        let metrics = ReturnEngine::default().compute_outputs(&fixture_deal()).unwrap();

        assert_eq!(metrics.irr_status, IrrStatus::Converged);
        assert_relative_eq!(metrics.irr, 0.145_522_611_108_28, epsilon = 1e-6);
        assert_relative_eq!(metrics.equity_multiple, 1.884_073_466_069_133_2, epsilon = 1e-9);
        assert_relative_eq!(metrics.cash_on_cash_year1, 0.048_727_755_771_266_236, epsilon = 1e-9);
        assert!(metrics.annual_debt_service > 455_000.0 && metrics.annual_debt_service < 460_000.0);
    }

    #[test]
    fn test_zero_interest_deal() {
        let deal = DealAssumptions {
            purchase_price: 1_000.0,
            equity_fraction: 0.5,
            annual_interest_rate: 0.0,
            amortization_years: 10,
            hold_years: 3,
            first_year_noi: 100.0,
            annual_noi_growth: 0.0,
            exit_cap_rate: 0.1,
        };
        let projection = ReturnEngine::default().project(&deal).unwrap();
        let flows = &projection.series.flows;

        assert_relative_eq!(projection.loan.monthly_payment, 500.0 / 120.0, epsilon = 1e-12);
        assert_relative_eq!(flows[0], -500.0);
        assert_relative_eq!(flows[1], 50.0, epsilon = 1e-9);
        assert_relative_eq!(flows[3], 680.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hold_beyond_amortization() {
        let deal = DealAssumptions {
            amortization_years: 3,
            annual_interest_rate: 0.06,
            annual_noi_growth: 0.02,
            ..fixture_deal()
        };
        let evaluation = ReturnEngine::default().evaluate(&deal).unwrap();
        let rows = &evaluation.projection.rows;

        assert!(rows[2].debt_service > 0.0);
        assert_eq!(rows[3].debt_service, 0.0);
        assert_eq!(rows[4].debt_service, 0.0);
        assert_eq!(rows[3].ending_loan_balance, 0.0);
        assert!(rows[3].dscr.is_none());
        assert_eq!(evaluation.projection.exit.loan_payoff, 0.0);

        assert!(evaluation.metrics.irr_converged());
        assert_relative_eq!(evaluation.metrics.irr, 0.113_333_280_481_040_63, epsilon = 1e-6);
    }

    #[test]
    fn test_rows_reconcile() {
        let projection = ReturnEngine::default().project(&fixture_deal()).unwrap();
        for (row, flow) in projection.rows.iter().zip(projection.series.flows.iter().skip(1)) {
            assert_relative_eq!(row.total_cash_flow, *flow);
            assert_relative_eq!(row.operating_cash_flow + row.exit_proceeds, *flow, epsilon = 1e-9);
        }

        let summary = projection.summary();
        assert_eq!(summary.hold_years, 5);
        assert!(summary.min_dscr.unwrap() > 1.0);
    }

    #[test]
    fn test_trailing_exit_basis_lowers_value() {
        let mut config = EngineConfig::default();
        config.exit = ExitConfig {
            noi_basis: ExitNoiBasis::Trailing,
            ..ExitConfig::default()
        };
        let trailing = ReturnEngine::new(config).unwrap().compute_outputs(&fixture_deal()).unwrap();
        let forward = ReturnEngine::default().compute_outputs(&fixture_deal()).unwrap();
        assert!(trailing.irr < forward.irr);
    }

    #[test]
    fn test_invalid_assumptions_fail_fast() {
        let deal = DealAssumptions {
            exit_cap_rate: 0.0,
            ..fixture_deal()
        };
        let err = ReturnEngine::default().compute_outputs(&deal).unwrap_err();
        assert_eq!(err.field(), "exit_cap_rate");
    }

    #[test]
    fn test_oversized_terms_are_rejected_before_projection() {
        let engine = ReturnEngine::default();

        let deal = DealAssumptions {
            amortization_years: 400_000_000,
            ..fixture_deal()
        };
        assert_eq!(engine.project(&deal).unwrap_err().field(), "amortization_years");

        let deal = DealAssumptions {
            hold_years: u32::MAX,
            ..fixture_deal()
        };
        assert_eq!(engine.compute_outputs(&deal).unwrap_err().field(), "hold_years");
        assert!(engine.generate_scenarios(&deal).is_err());
        assert!(engine.optimize_for_irr(&deal, 0.15).is_err());
    }

    #[test]
    fn test_evaluate_batch() {
        let deals = vec![
            Deal::new(1, "Fixture", fixture_deal()),
            Deal::new(2, "Broken", DealAssumptions { hold_years: 0, ..fixture_deal() }),
        ];
        let outcomes = ReturnEngine::default().evaluate_batch(&deals);

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].deal_id, 1);
        assert!(outcomes[0].metrics.is_some());
        assert!(outcomes[1].metrics.is_none());
        assert!(outcomes[1].error.as_deref().unwrap_or_default().contains("hold_years"));
    }

    #[test]
    fn test_engine_rejects_bad_config() {
        let mut config = EngineConfig::default();
        config.optimizer.min_equity_fraction = 0.9;
        config.optimizer.max_equity_fraction = 0.1;
        assert!(ReturnEngine::new(config).is_err());
    }
}
