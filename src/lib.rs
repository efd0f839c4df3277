//! `repayment_plan` is a Rust library for generating repayment plans for
//! fixed-rate annuity loans.
//!
//! Given a loan amount, a nominal annual interest rate, a duration in monthly
//! periods and a start date, it produces the exact sequence of monthly
//! payments (outstanding principal, interest, principal portion, due date)
//! that fully amortizes the loan by the final period.
//!
//! Interest accrues on a 30/360 day-count basis: every month counts as 30
//! days and every year as 360 days, regardless of the calendar. Due dates
//! advance by exactly 30 days per period for the same reason.
//!
//! ## Usage
//!
//! Add `repayment_plan` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! repayment_plan = "0.1.0"
//! rust_decimal_macros = "1.39.0"
//! chrono = "0.4"
//! ```
//!
//! Then use `calculate_repayment_plan` to get the payment sequence:
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use repayment_plan::{calculate_repayment_plan, LoanRequest};
//! use rust_decimal_macros::dec;
//!
//! fn main() {
//!     let request = LoanRequest {
//!         duration: Some(24),
//!         nominal_rate: Some(dec!(5.0)),
//!         loan_amount: Some(dec!(5000)),
//!         start_date: Some(Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 0).unwrap()),
//!     };
//!
//!     match calculate_repayment_plan(&request) {
//!         Ok(plan) => {
//!             println!("Number of payments: {}", plan.total);
//!             println!("Monthly payment:    {}", plan.borrower_payments[0].borrower_payment_amount);
//!         }
//!         Err(e) => {
//!             eprintln!("Error generating repayment plan: {}", e);
//!         }
//!     }
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use log::{debug, trace};
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Days per month under the 30/360 day-count convention.
const DAYS_IN_MONTH: i64 = 30;
/// Days per year under the 30/360 day-count convention.
const DAYS_IN_YEAR: i64 = DAYS_IN_MONTH * 12;

/// Error raised when a value required by the annuity or interest formulas is
/// absent or unusable at the point of use.
///
/// Upstream request validation is expected to reject such inputs before the
/// plan is computed, so these checks are defensive. The computation is
/// deterministic: retrying with the same input yields the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    /// A mandatory field was not supplied. Carries the other supplied values
    /// so the caller can build a complete diagnostic message.
    #[error(
        "{field} is mandatory for the calculation (duration: {duration:?}, rate: {rate:?}, loan amount: {loan_amount:?})"
    )]
    MissingField {
        field: &'static str,
        duration: Option<u32>,
        rate: Option<Decimal>,
        loan_amount: Option<Decimal>,
    },
    /// The annuity formula has no defined payment for a loan with no periods.
    #[error("duration must cover at least one period")]
    ZeroDuration,
}

/// Criteria describing the loan to amortize.
///
/// Every field is optional so that a partially populated request (for
/// example, deserialized from JSON with fields missing) can still be
/// represented; the calculation fails with [`InvalidInput::MissingField`]
/// when a required value is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRequest {
    /// Duration of the loan in monthly periods.
    pub duration: Option<u32>,
    /// Nominal interest rate per year, as a percentage (e.g. 5 for 5%).
    pub nominal_rate: Option<Decimal>,
    /// Borrowed principal amount.
    pub loan_amount: Option<Decimal>,
    /// Due date of the first payment.
    pub start_date: Option<DateTime<Utc>>,
}

/// Payment details for a single monthly period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// 1-based index of the period.
    pub period: u32,
    /// Total amount due this period. Equal to the fixed annuity amount for
    /// every period except the last, where the clamp caps it at the
    /// remaining balance.
    pub borrower_payment_amount: Decimal,
    /// Payment due date.
    pub date: DateTime<Utc>,
    /// Outstanding principal at the start of the period.
    pub initial_outstanding_principal: Decimal,
    /// Interest accrued this period on the outstanding principal.
    pub interest: Decimal,
    /// Principal repaid this period.
    pub principal: Decimal,
    /// Outstanding principal after this period's principal is applied.
    pub remaining_outstanding_principal: Decimal,
}

/// A complete repayment plan for one loan request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentPlan {
    /// One payment per period, in due-date order.
    pub borrower_payments: Vec<Payment>,
    /// Number of payments in the plan. A count, not a monetary sum.
    pub total: u64,
}

/// Derives the effective monthly interest rate from the nominal annual rate.
///
/// Formula: `(rate / 100) / 12`, carried at full decimal precision. This
/// rate feeds the annuity formula only; per-period interest accrual uses its
/// own independently rounded 30/360 rate (see [`calculate_interest`]) and
/// the two must not be unified.
///
/// # Errors
///
/// Returns [`InvalidInput::MissingField`] if the rate or the duration is
/// absent.
pub fn calculate_effective_rate(
    duration: Option<u32>,
    nominal_rate: Option<Decimal>,
) -> Result<Decimal, InvalidInput> {
    let missing = |field| InvalidInput::MissingField {
        field,
        duration,
        rate: nominal_rate,
        loan_amount: None,
    };
    if duration.is_none() {
        return Err(missing("duration"));
    }
    let Some(rate) = nominal_rate else {
        return Err(missing("nominal rate"));
    };
    Ok(rate / dec!(100) / dec!(12))
}

/// Calculates the fixed annuity amount paid each period.
///
/// Formula: `rate * principal / (1 - (1 + rate)^-duration)`, evaluated at
/// full decimal precision. The result is rounded to 2 decimal places *away
/// from zero* rather than half-up: a payment rounded down could leave the
/// loan short of full amortization at 2-decimal precision, so the annuity is
/// never allowed to be insufficient.
///
/// A zero rate collapses the formula's denominator to zero; the loan then
/// amortizes in equal installments of `principal / duration`, rounded away
/// from zero the same way.
///
/// # Errors
///
/// Returns [`InvalidInput::MissingField`] if the duration, rate or principal
/// is absent, and [`InvalidInput::ZeroDuration`] for a loan with no periods.
pub fn calculate_annuity_payment(
    duration: Option<u32>,
    effective_rate: Option<Decimal>,
    loan_amount: Option<Decimal>,
) -> Result<Decimal, InvalidInput> {
    let missing = |field| InvalidInput::MissingField {
        field,
        duration,
        rate: effective_rate,
        loan_amount,
    };
    let Some(periods) = duration else {
        return Err(missing("duration"));
    };
    let Some(rate) = effective_rate else {
        return Err(missing("effective rate"));
    };
    let Some(principal) = loan_amount else {
        return Err(missing("loan amount"));
    };
    if periods == 0 {
        return Err(InvalidInput::ZeroDuration);
    }
    if rate.is_zero() {
        let installment = principal / Decimal::from(periods);
        return Ok(installment.round_dp_with_strategy(2, RoundingStrategy::AwayFromZero));
    }

    let compounded = (dec!(1) + rate).powu(u64::from(periods));
    let payment = rate * principal / (dec!(1) - dec!(1) / compounded);
    Ok(payment.round_dp_with_strategy(2, RoundingStrategy::AwayFromZero))
}

/// Calculates one period's interest on the outstanding principal.
///
/// Day-count basis is 30/360: `((rate / 100) * 30 * outstanding) / 360`.
/// The rate term is rounded to 4 decimal places half-up, the division result
/// again to 4 decimal places half-up, and the final amount to 2 decimal
/// places half-up. This cascade determines the published cent values and is
/// independent of the full-precision rate used by the annuity formula.
pub fn calculate_interest(nominal_rate: Decimal, outstanding: Decimal) -> Decimal {
    let rate = (nominal_rate / dec!(100))
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
    (rate * Decimal::from(DAYS_IN_MONTH) * outstanding / Decimal::from(DAYS_IN_YEAR))
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Calculates the principal portion of one period's payment: the annuity
/// amount less the period's interest, rounded half-up to 2 decimal places.
pub fn calculate_principal(annuity: Decimal, interest: Decimal) -> Decimal {
    (annuity - interest).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Generates the full payment sequence for a loan, one record per period.
///
/// The loop runs exactly `duration` times and never terminates early; if the
/// balance reaches zero before the last period, the remaining periods are
/// emitted with all-zero amounts.
///
/// # Errors
///
/// Returns [`InvalidInput::MissingField`] if any of the request fields is
/// absent.
pub fn generate_schedule(
    annuity: Decimal,
    request: &LoanRequest,
) -> Result<RepaymentPlan, InvalidInput> {
    let missing = |field| InvalidInput::MissingField {
        field,
        duration: request.duration,
        rate: request.nominal_rate,
        loan_amount: request.loan_amount,
    };
    let Some(periods) = request.duration else {
        return Err(missing("duration"));
    };
    let Some(nominal_rate) = request.nominal_rate else {
        return Err(missing("nominal rate"));
    };
    let Some(loan_amount) = request.loan_amount else {
        return Err(missing("loan amount"));
    };
    let Some(start_date) = request.start_date else {
        return Err(missing("start date"));
    };

    debug!(
        "generating repayment plan: amount {loan_amount}, nominal rate {nominal_rate}%, {periods} periods"
    );

    let mut annuity = annuity;
    let mut outstanding = loan_amount;
    let mut due_date = start_date;
    let mut payments = Vec::with_capacity(periods as usize);

    for period in 1..=periods {
        let interest = calculate_interest(nominal_rate, outstanding);
        let mut principal = calculate_principal(annuity, interest);

        // Once the remaining balance no longer covers a full annuity, the
        // payment and the principal are both capped at the balance so the
        // borrower never overpays. The interest accrued above is still
        // reported unchanged, so in the clamped period the payment amount
        // does not equal principal + interest.
        if outstanding <= annuity {
            annuity = outstanding;
            principal = outstanding;
        }

        let remaining = outstanding
            - principal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        trace!(
            "period {period}: outstanding {outstanding}, interest {interest}, principal {principal}, remaining {remaining}"
        );

        payments.push(Payment {
            period,
            borrower_payment_amount: annuity,
            date: due_date,
            initial_outstanding_principal: outstanding,
            interest,
            principal,
            remaining_outstanding_principal: remaining,
        });

        // Every period falls exactly 30 days after the previous one;
        // calendar month lengths never apply under the 30/360 convention.
        due_date += Duration::days(DAYS_IN_MONTH);
        outstanding = (outstanding - principal)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    }

    Ok(RepaymentPlan {
        total: payments.len() as u64,
        borrower_payments: payments,
    })
}

/// Calculates the repayment plan for a loan request.
///
/// This is the main entry point of the library. The fixed annuity amount is
/// calculated once up front, then the plan is simulated period by period.
/// The computation is pure and keeps no state between calls, so it is safe
/// to invoke concurrently for independent requests.
///
/// # Errors
///
/// Returns [`InvalidInput`] if any of the request fields is absent or the
/// duration is zero.
pub fn calculate_repayment_plan(request: &LoanRequest) -> Result<RepaymentPlan, InvalidInput> {
    let effective_rate = calculate_effective_rate(request.duration, request.nominal_rate)?;
    let annuity =
        calculate_annuity_payment(request.duration, Some(effective_rate), request.loan_amount)?;
    trace!("annuity amount: {annuity}");
    generate_schedule(annuity, request)
}
