//! Internal Rate of Return (IRR) calculation
//!
//! Newton-Raphson on annual cash flows, falling back to bisection over the
//! configured rate bounds when Newton does not settle. The solver never
//! fails: when no root can be found it hands back an estimate with a status
//! saying why.

use crate::config::IrrConfig;
use serde::{Deserialize, Serialize};

/// How the solver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrStatus {
    /// Newton step size fell below tolerance inside the rate bounds
    Converged,
    /// Newton failed but bisection isolated the root between the bounds
    Bracketed,
    /// Iteration budget ran out
    MaxIterations,
    /// NPV, its derivative, or the update stopped being finite
    NonFinite,
    /// The root lies beyond the floor or ceiling
    PinnedAtBound,
    /// Flows never change sign, so no rate zeroes the NPV
    NoSignChange,
}

impl IrrStatus {
    /// True when the rate is a root of the NPV within tolerance
    pub fn is_converged(&self) -> bool {
        matches!(self, IrrStatus::Converged | IrrStatus::Bracketed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IrrStatus::Converged => "converged",
            IrrStatus::Bracketed => "bracketed",
            IrrStatus::MaxIterations => "max_iterations",
            IrrStatus::NonFinite => "non_finite",
            IrrStatus::PinnedAtBound => "pinned_at_bound",
            IrrStatus::NoSignChange => "no_sign_change",
        }
    }
}

impl std::fmt::Display for IrrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Solver output: the rate estimate plus how it was reached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrSolution {
    pub rate: f64,
    pub status: IrrStatus,
    pub iterations: u32,
}

impl IrrSolution {
    pub fn converged(&self) -> bool {
        self.status.is_converged()
    }
}

/// Net present value of annual flows at `rate`, with `flows[0]` undiscounted
pub fn npv(rate: f64, flows: &[f64]) -> f64 {
    flows
        .iter()
        .enumerate()
        .map(|(t, &cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

/// Solve for the annual IRR of `flows`
pub fn solve_irr(flows: &[f64], config: &IrrConfig) -> IrrSolution {
    let has_positive = flows.iter().any(|&cf| cf > 0.0);
    let has_negative = flows.iter().any(|&cf| cf < 0.0);
    if !has_positive || !has_negative {
        // no root; report the bound NPV is heading toward
        let rate = if has_positive { config.rate_ceiling } else { config.rate_floor };
        return IrrSolution {
            rate,
            status: IrrStatus::NoSignChange,
            iterations: 0,
        };
    }

    let newton = solve_newton(flows, config);
    if newton.converged() {
        return newton;
    }

    let low = config.rate_floor;
    let high = config.rate_ceiling;
    let npv_low = npv(low, flows);
    let npv_high = npv(high, flows);
    if !npv_low.is_finite() || !npv_high.is_finite() {
        return newton;
    }

    if npv_low * npv_high > 0.0 {
        // same sign at both bounds: the root sits past one of them
        let rate = if npv_low < 0.0 { low } else { high };
        return IrrSolution {
            rate,
            status: IrrStatus::PinnedAtBound,
            iterations: newton.iterations,
        };
    }

    match solve_bisection(flows, low, high, npv_low, config) {
        (rate, Some(steps)) => IrrSolution {
            rate,
            status: IrrStatus::Bracketed,
            iterations: newton.iterations + steps,
        },
        (rate, None) => IrrSolution {
            rate,
            status: IrrStatus::MaxIterations,
            iterations: newton.iterations + config.bisection_max_iterations,
        },
    }
}

/// Newton-Raphson from the configured guess, clamped to the rate bounds
fn solve_newton(flows: &[f64], config: &IrrConfig) -> IrrSolution {
    let mut rate = config.initial_guess;

    for iteration in 1..=config.max_iterations {
        let (value, derivative) = npv_and_derivative(flows, rate);
        if !value.is_finite() || !derivative.is_finite() || derivative == 0.0 {
            return IrrSolution {
                rate,
                status: IrrStatus::NonFinite,
                iterations: iteration,
            };
        }

        let raw = rate - value / derivative;
        if !raw.is_finite() {
            return IrrSolution {
                rate,
                status: IrrStatus::NonFinite,
                iterations: iteration,
            };
        }

        let next = raw.max(config.rate_floor).min(config.rate_ceiling);
        if (next - rate).abs() < config.tolerance {
            let status = if next != raw {
                IrrStatus::PinnedAtBound
            } else {
                IrrStatus::Converged
            };
            return IrrSolution {
                rate: next,
                status,
                iterations: iteration,
            };
        }

        rate = next;
    }

    IrrSolution {
        rate,
        status: IrrStatus::MaxIterations,
        iterations: config.max_iterations,
    }
}

/// Bisection on a bracket whose endpoints have NPVs of opposite sign
///
/// Returns the midpoint and the step count it settled at, or the midpoint
/// of the remaining bracket with `None` when the budget runs out first.
fn solve_bisection(
    flows: &[f64],
    mut low: f64,
    mut high: f64,
    mut npv_low: f64,
    config: &IrrConfig,
) -> (f64, Option<u32>) {
    for step in 1..=config.bisection_max_iterations {
        let mid = (low + high) / 2.0;
        let npv_mid = npv(mid, flows);

        if npv_mid == 0.0 || (high - low) / 2.0 < config.tolerance {
            return (mid, Some(step));
        }

        if (npv_mid > 0.0) == (npv_low > 0.0) {
            low = mid;
            npv_low = npv_mid;
        } else {
            high = mid;
        }
    }

    ((low + high) / 2.0, None)
}

/// NPV and dNPV/dr at `rate`
fn npv_and_derivative(flows: &[f64], rate: f64) -> (f64, f64) {
    let mut value = 0.0;
    let mut derivative = 0.0;

    for (t, &cf) in flows.iter().enumerate() {
        let discount = (1.0 + rate).powi(t as i32);
        value += cf / discount;
        if t > 0 {
            derivative -= (t as f64) * cf / (discount * (1.0 + rate));
        }
    }

    (value, derivative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_simple_irr() {
        // invest 100, get 110 back after a year
        let solution = solve_irr(&[-100.0, 110.0], &IrrConfig::default());
        assert!(solution.converged());
        assert!((solution.rate - 0.10).abs() < 1e-6, "Expected ~10% IRR, got {}", solution.rate);
    }

    #[test]
    fn test_multi_year_irr() {
        let flows = [-500.0, 50.0, 50.0, 680.0];
        let solution = solve_irr(&flows, &IrrConfig::default());
        assert!(solution.converged());
        assert_relative_eq!(solution.rate, 0.173_244_643_450_686_9, epsilon = 1e-7);
        assert!(npv(solution.rate, &flows).abs() < 1e-4);
    }

    #[test]
    fn test_negative_irr() {
        // lose 20% over two years
        let solution = solve_irr(&[-1000.0, 0.0, 800.0], &IrrConfig::default());
        assert!(solution.converged());
        assert_relative_eq!(solution.rate, 0.8_f64.sqrt() - 1.0, epsilon = 1e-7);
    }

    #[test]
    fn test_no_positive_flow() {
        let config = IrrConfig::default();
        let solution = solve_irr(&[-1000.0, -50.0, -50.0], &config);
        assert_eq!(solution.status, IrrStatus::NoSignChange);
        assert_eq!(solution.rate, config.rate_floor);
        assert!(!solution.converged());
    }

    #[test]
    fn test_empty_flows() {
        let solution = solve_irr(&[], &IrrConfig::default());
        assert_eq!(solution.status, IrrStatus::NoSignChange);
    }

    #[test]
    fn test_losing_deal_falls_back_to_bisection() {
        // deeply negative carry with a small reversion: Newton runs to the ceiling
        let flows = [-600_000.0, -197_247.0, -197_247.0, -197_247.0, -197_247.0, 279_665.0];
        let config = IrrConfig::default();
        let solution = solve_irr(&flows, &config);

        assert_eq!(solution.status, IrrStatus::Bracketed, "got {:?}", solution);
        assert!(solution.converged());
        assert!(solution.rate < 0.0);
        assert_ne!(solution.rate, config.rate_ceiling);
        assert_relative_eq!(solution.rate, -0.421_147_004_589_438_5, epsilon = 1e-6);
    }

    #[test]
    fn test_thin_equity_losses_never_report_the_ceiling() {
        // 5% equity, 7% over 25 years, flat NOI of 600k, 6.5% exit cap
        let flows = [-500_000.0, -205_728.28, -205_728.28, -205_728.28, -205_728.28, 180_021.08];
        let config = IrrConfig::default();
        let solution = solve_irr(&flows, &config);

        assert!(solution.converged(), "got {:?}", solution);
        assert!(solution.rate > config.rate_floor && solution.rate < 0.0);
        assert_relative_eq!(solution.rate, -0.536_785_5, epsilon = 1e-5);
    }

    #[test]
    fn test_root_beyond_ceiling_is_pinned() {
        // a 99x one-year return: the true rate is above the ceiling
        let config = IrrConfig::default();
        let solution = solve_irr(&[-1.0, 100.0], &config);
        assert_eq!(solution.status, IrrStatus::PinnedAtBound);
        assert_eq!(solution.rate, config.rate_ceiling);
        assert!(!solution.converged());

        let solution = solve_irr(&[-1000.0, 5.0], &config);
        assert_eq!(solution.status, IrrStatus::PinnedAtBound);
        assert_eq!(solution.rate, config.rate_floor);
    }

    #[test]
    fn test_iteration_budget() {
        // one Newton step is not enough; bisection finishes the job
        let config = IrrConfig {
            max_iterations: 1,
            ..IrrConfig::default()
        };
        let flows = [-500.0, 50.0, 50.0, 680.0];
        let solution = solve_irr(&flows, &config);
        assert_eq!(solution.status, IrrStatus::Bracketed);
        assert!(solution.iterations > 1);
        assert_relative_eq!(solution.rate, 0.173_244_643_450_686_9, epsilon = 1e-6);

        let config = IrrConfig {
            max_iterations: 1,
            bisection_max_iterations: 3,
            ..IrrConfig::default()
        };
        let solution = solve_irr(&flows, &config);
        assert_eq!(solution.status, IrrStatus::MaxIterations);
        assert_eq!(solution.iterations, 4);
        assert!(!solution.converged());
    }

    #[test]
    fn test_npv_at_zero_rate_is_sum() {
        let flows = [-100.0, 30.0, 40.0, 50.0];
        assert_relative_eq!(npv(0.0, &flows), 20.0);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&IrrStatus::PinnedAtBound).unwrap();
        assert_eq!(json, "\"pinned_at_bound\"");
        assert_eq!(IrrStatus::PinnedAtBound.to_string(), "pinned_at_bound");
        assert_eq!(IrrStatus::Bracketed.to_string(), "bracketed");
    }
}
