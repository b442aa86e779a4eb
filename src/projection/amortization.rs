//! Fixed-rate, fully amortizing loan schedule
//!
//! Payments are monthly; the schedule is rebuilt for every evaluation.

use serde::{Deserialize, Serialize};

/// Level-payment mortgage on the acquisition loan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanSchedule {
    /// Original principal
    pub principal: f64,
    /// Nominal annual rate / 12
    pub monthly_rate: f64,
    /// Number of scheduled payments
    pub payment_count: u32,
    /// Level monthly payment
    pub monthly_payment: f64,
}

/// Loan activity for one year of the hold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanYear {
    pub year: u32,
    pub payments: f64,
    pub interest: f64,
    pub principal: f64,
    pub ending_balance: f64,
}

impl LoanSchedule {
    pub fn new(principal: f64, annual_interest_rate: f64, amortization_years: u32) -> Self {
        let monthly_rate = annual_interest_rate / 12.0;
        let payment_count = amortization_years.saturating_mul(12);
        let monthly_payment = level_payment(principal, monthly_rate, payment_count);

        Self {
            principal,
            monthly_rate,
            payment_count,
            monthly_payment,
        }
    }

    /// Twelve monthly payments
    pub fn annual_debt_service(&self) -> f64 {
        self.monthly_payment * 12.0
    }

    /// Payments made during `year` (1-based); zero once the loan is retired
    pub fn debt_service_for_year(&self, year: u32) -> f64 {
        let first = year.saturating_sub(1).saturating_mul(12).saturating_add(1);
        let last = year.saturating_mul(12).min(self.payment_count);
        if year == 0 || first > last {
            return 0.0;
        }
        self.monthly_payment * f64::from(last - first + 1)
    }

    /// Outstanding principal after `month` payments
    pub fn balance_after(&self, month: u32) -> f64 {
        if month >= self.payment_count {
            return 0.0;
        }

        let mut balance = self.principal;
        for _ in 0..month {
            balance = self.step(balance);
        }
        balance
    }

    /// Year-by-year interest, principal and balance for the first `years` years
    pub fn annual_summary(&self, years: u32) -> Vec<LoanYear> {
        let mut rows = Vec::with_capacity(years as usize);
        let mut balance = self.principal;
        let mut month = 0;

        for year in 1..=years {
            let opening = balance;
            let mut interest = 0.0;
            let mut payments = 0.0;

            for _ in 0..12 {
                month += 1;
                if month > self.payment_count {
                    break;
                }
                interest += balance * self.monthly_rate;
                payments += self.monthly_payment;
                balance = self.step(balance);
            }

            if month >= self.payment_count {
                balance = 0.0;
            }

            rows.push(LoanYear {
                year,
                payments,
                interest,
                principal: opening - balance,
                ending_balance: balance,
            });
        }

        rows
    }

    fn step(&self, balance: f64) -> f64 {
        let interest = balance * self.monthly_rate;
        (balance - (self.monthly_payment - interest)).max(0.0)
    }
}

fn level_payment(principal: f64, monthly_rate: f64, payment_count: u32) -> f64 {
    if payment_count == 0 {
        return principal;
    }
    if monthly_rate == 0.0 {
        return principal / f64::from(payment_count);
    }
    let periods = i32::try_from(payment_count).unwrap_or(i32::MAX);
    monthly_rate * principal / (1.0 - (1.0 + monthly_rate).powi(-periods))
}
