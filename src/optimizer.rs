//! Target-IRR leverage search
//!
//! Bisects `equity_fraction` inside the configured bounds, holding every other
//! assumption fixed. Only evaluations whose IRR converged are used to bracket
//! the target. A bound whose IRR does not converge (thin equity on a losing
//! deal, say) is first pulled inward to the nearest equity fraction that does.

use crate::deal::DealAssumptions;
use crate::error::{EngineError, EngineResult};
use crate::projection::{IrrStatus, ReturnEngine};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Outcome of a target-IRR search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub target_irr: f64,
    /// Best equity fraction found
    pub equity_fraction: f64,
    /// IRR at `equity_fraction`
    pub achieved_irr: f64,
    pub irr_status: IrrStatus,
    /// False when no equity fraction in bounds hits the target within tolerance
    pub reachable: bool,
    /// Bisection steps taken toward the target
    pub iterations: u32,
}

/// One evaluation of the deal at a given equity fraction
#[derive(Debug, Clone, Copy)]
struct Trial {
    equity_fraction: f64,
    irr: f64,
    status: IrrStatus,
}

impl Trial {
    fn gap(&self, target: f64) -> f64 {
        self.irr - target
    }

    fn converged(&self) -> bool {
        self.status.is_converged()
    }
}

impl ReturnEngine {
    /// Find the equity fraction whose levered IRR matches `target_irr`
    pub fn optimize_for_irr(&self, assumptions: &DealAssumptions, target_irr: f64) -> EngineResult<OptimizationResult> {
        if !target_irr.is_finite() {
            return Err(EngineError::configuration(
                "target_irr",
                format!("must be finite, got {}", target_irr),
            ));
        }
        assumptions.check()?;

        let opt = self.config().optimizer;
        let tolerance = opt.irr_tolerance;
        let evaluate_at = |equity_fraction: f64| -> EngineResult<Trial> {
            let metrics = self.compute_outputs(&assumptions.with_equity_fraction(equity_fraction))?;
            Ok(Trial {
                equity_fraction,
                irr: metrics.irr,
                status: metrics.irr_status,
            })
        };
        let finish = |best: Trial, reachable: bool, iterations: u32| {
            if !reachable {
                info!(
                    "target IRR {:.4} not reachable; best {:.6} at equity {:.4}",
                    target_irr, best.irr, best.equity_fraction
                );
            }
            OptimizationResult {
                target_irr,
                equity_fraction: best.equity_fraction,
                achieved_irr: best.irr,
                irr_status: best.status,
                reachable,
                iterations,
            }
        };

        // Bisect between an unconverged bound and a converged one for the
        // converged trial closest to the unconverged bound
        let tighten = |mut bad: Trial, mut good: Trial| -> EngineResult<Trial> {
            for _ in 0..opt.max_iterations {
                let mid = 0.5 * (bad.equity_fraction + good.equity_fraction);
                if mid == bad.equity_fraction || mid == good.equity_fraction {
                    break;
                }
                let trial = evaluate_at(mid)?;
                if trial.converged() {
                    good = trial;
                } else {
                    bad = trial;
                }
            }
            debug!(
                "bound {:.4} ({}) tightened to {:.6}",
                bad.equity_fraction, bad.status, good.equity_fraction
            );
            Ok(good)
        };

        let mut lo = evaluate_at(opt.min_equity_fraction)?;
        let mut hi = evaluate_at(opt.max_equity_fraction)?;
        debug!(
            "bounds: irr {:.6} ({}) at {:.4}, irr {:.6} ({}) at {:.4}",
            lo.irr, lo.status, lo.equity_fraction, hi.irr, hi.status, hi.equity_fraction
        );

        match (lo.converged(), hi.converged()) {
            (true, true) => {}
            (false, true) => lo = tighten(lo, hi)?,
            (true, false) => hi = tighten(hi, lo)?,
            (false, false) => {
                // nothing trusted to move toward
                return Ok(finish(hi, false, 0));
            }
        }

        let closer = |a: Trial, b: Trial| if b.gap(target_irr).abs() < a.gap(target_irr).abs() { b } else { a };
        let mut best = closer(hi, lo);

        if best.gap(target_irr).abs() <= tolerance {
            return Ok(finish(best, true, 0));
        }
        if lo.gap(target_irr).signum() == hi.gap(target_irr).signum() {
            return Ok(finish(best, false, 0));
        }

        for iteration in 1..=opt.max_iterations {
            let mid = evaluate_at(0.5 * (lo.equity_fraction + hi.equity_fraction))?;
            if !mid.converged() {
                return Ok(finish(best, false, iteration));
            }

            best = closer(best, mid);
            if mid.gap(target_irr).abs() <= tolerance {
                return Ok(finish(mid, true, iteration));
            }

            if mid.gap(target_irr).signum() == lo.gap(target_irr).signum() {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let reachable = best.gap(target_irr).abs() <= tolerance;
        Ok(finish(best, reachable, opt.max_iterations))
    }
}
