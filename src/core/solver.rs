use serde::Serialize;
use thiserror::Error;

use super::engine::{round_currency, simulate_amortization};
use super::types::LoanParameters;

/// Bisection stops once the prepayment bracket is this narrow.
pub const DEFAULT_PREPAYMENT_TOLERANCE: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrepaymentSearchConfig {
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for PrepaymentSearchConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_PREPAYMENT_TOLERANCE,
            max_iterations: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepaymentSearchIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate: f64,
    pub achieved_tenure_years: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepaymentSolveResult {
    pub target_tenure_years: Option<u32>,
    pub required_prepayment: f64,
    pub achieved_tenure_years: f64,
    pub iterations: Vec<PrepaymentSearchIteration>,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverConfigError {
    #[error("tolerance must be finite and > 0, got {0}")]
    InvalidTolerance(f64),
    #[error("max_iterations must be > 0")]
    ZeroIterations,
}

/// Flat annual prepayment needed to retire the loan within
/// `target_tenure_years`, or 0 when no target shorter than the tenure is set.
pub fn solve_required_prepayment(params: &LoanParameters) -> f64 {
    search_prepayment(params, PrepaymentSearchConfig::default()).required_prepayment
}

pub fn solve_required_prepayment_with(
    params: &LoanParameters,
    config: PrepaymentSearchConfig,
) -> Result<PrepaymentSolveResult, SolverConfigError> {
    validate_config(config)?;
    Ok(search_prepayment(params, config))
}

fn search_prepayment(params: &LoanParameters, config: PrepaymentSearchConfig) -> PrepaymentSolveResult {
    let target = match params.target_tenure_years {
        Some(target) if target > 0 && target < params.tenure_years => target,
        _ => {
            return PrepaymentSolveResult {
                target_tenure_years: params.target_tenure_years,
                required_prepayment: 0.0,
                achieved_tenure_years: evaluate_candidate(params, 0.0),
                iterations: Vec::new(),
                converged: true,
            };
        }
    };
    let target_years = f64::from(target);

    // Clearing the whole principal evenly over the target years always suffices.
    let mut lo = 0.0;
    let mut hi = params.principal / target_years;
    log::debug!(
        "solving prepayment for {}y target on {}y tenure, bracket [{lo}, {hi}]",
        target,
        params.tenure_years
    );

    let mut iterations = Vec::new();
    let mut converged = true;
    while hi - lo > config.tolerance {
        if iterations.len() as u32 >= config.max_iterations {
            converged = false;
            log::warn!(
                "prepayment search hit {} iterations with bracket width {:.2}",
                config.max_iterations,
                hi - lo
            );
            break;
        }

        let mid = (lo + hi) * 0.5;
        let achieved = evaluate_candidate(params, mid);
        iterations.push(PrepaymentSearchIteration {
            iteration: iterations.len() as u32 + 1,
            lower_bound: lo,
            upper_bound: hi,
            candidate: mid,
            achieved_tenure_years: achieved,
        });

        if achieved > target_years {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let required_prepayment = round_currency((lo + hi) * 0.5);
    PrepaymentSolveResult {
        target_tenure_years: Some(target),
        required_prepayment,
        achieved_tenure_years: evaluate_candidate(params, required_prepayment),
        iterations,
        converged,
    }
}

/// Realized tenure for a flat prepayment. Prepayment escalation is ignored
/// here; EMI escalation is kept.
fn evaluate_candidate(params: &LoanParameters, annual_prepayment: f64) -> f64 {
    let candidate = LoanParameters {
        annual_prepayment,
        prepayment_increase_percent: 0.0,
        ..params.clone()
    };
    simulate_amortization(&candidate).actual_tenure_years
}

fn validate_config(config: PrepaymentSearchConfig) -> Result<(), SolverConfigError> {
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolverConfigError::InvalidTolerance(config.tolerance));
    }
    if config.max_iterations == 0 {
        return Err(SolverConfigError::ZeroIterations);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn home_loan() -> LoanParameters {
        LoanParameters::new(5_000_000.0, 8.5, 20)
    }

    #[test]
    fn no_target_needs_no_prepayment() {
        assert_eq!(solve_required_prepayment(&home_loan()), 0.0);
    }

    #[test]
    fn target_not_shorter_than_tenure_needs_no_prepayment() {
        assert_eq!(solve_required_prepayment(&home_loan().with_target_tenure(20)), 0.0);
        assert_eq!(solve_required_prepayment(&home_loan().with_target_tenure(25)), 0.0);
        assert_eq!(solve_required_prepayment(&home_loan().with_target_tenure(0)), 0.0);
    }

    #[test]
    fn solves_ten_year_target_on_home_loan() {
        let result =
            solve_required_prepayment_with(&home_loan().with_target_tenure(10), Default::default())
                .expect("valid config");

        assert!(result.converged);
        assert_eq!(result.required_prepayment, 231_934.0);
        assert_eq!(result.iterations.len(), 9);
        assert_close(result.achieved_tenure_years, 10.1, 1e-9);
        assert_eq!(
            solve_required_prepayment(&home_loan().with_target_tenure(10)),
            result.required_prepayment
        );
    }

    #[test]
    fn solves_fifteen_year_target_on_home_loan() {
        let required = solve_required_prepayment(&home_loan().with_target_tenure(15));
        assert_eq!(required, 73_242.0);

        let check = simulate_amortization(&home_loan().with_prepayment(required, 0.0));
        assert_close(check.actual_tenure_years, 15.0, 1e-9);
    }

    #[test]
    fn search_keeps_emi_escalation() {
        let params = LoanParameters::new(1_000_000.0, 9.0, 15)
            .with_emi_increase(5.0)
            .with_target_tenure(5);
        assert_eq!(solve_required_prepayment(&params), 120_703.0);
    }

    #[test]
    fn search_ignores_prepayment_escalation() {
        let flat = home_loan().with_target_tenure(12);
        let escalating = flat.clone().with_prepayment(0.0, 10.0);
        assert_eq!(
            solve_required_prepayment(&flat),
            solve_required_prepayment(&escalating)
        );
    }

    #[test]
    fn iterations_narrow_the_bracket() {
        let result =
            solve_required_prepayment_with(&home_loan().with_target_tenure(8), Default::default())
                .expect("valid config");

        let first = result.iterations.first().expect("at least one step");
        assert_eq!(first.iteration, 1);
        assert_eq!(first.lower_bound, 0.0);
        assert_eq!(first.upper_bound, 5_000_000.0 / 8.0);
        for pair in result.iterations.windows(2) {
            let before = pair[0].upper_bound - pair[0].lower_bound;
            let after = pair[1].upper_bound - pair[1].lower_bound;
            assert_close(after, before / 2.0, 1e-6);
        }
        let last = result.iterations.last().expect("at least one step");
        assert!(last.upper_bound - last.lower_bound > DEFAULT_PREPAYMENT_TOLERANCE);
    }

    #[test]
    fn finer_tolerance_takes_more_steps() {
        let params = home_loan().with_target_tenure(10);
        let coarse = solve_required_prepayment_with(&params, Default::default()).expect("valid");
        let fine = solve_required_prepayment_with(
            &params,
            PrepaymentSearchConfig {
                tolerance: 1.0,
                ..Default::default()
            },
        )
        .expect("valid");

        assert!(fine.iterations.len() > coarse.iterations.len());
        assert_close(fine.required_prepayment, coarse.required_prepayment, 1_000.0);
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let result = solve_required_prepayment_with(
            &home_loan().with_target_tenure(10),
            PrepaymentSearchConfig {
                tolerance: 1_000.0,
                max_iterations: 2,
            },
        )
        .expect("valid config");

        assert!(!result.converged);
        assert_eq!(result.iterations.len(), 2);
        assert!(result.required_prepayment > 0.0);
    }

    #[test]
    fn rejects_invalid_config() {
        let params = home_loan().with_target_tenure(10);
        for tolerance in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = solve_required_prepayment_with(
                &params,
                PrepaymentSearchConfig {
                    tolerance,
                    ..Default::default()
                },
            )
            .expect_err("must reject tolerance");
            assert!(matches!(err, SolverConfigError::InvalidTolerance(_)));
        }

        let err = solve_required_prepayment_with(
            &params,
            PrepaymentSearchConfig {
                max_iterations: 0,
                ..Default::default()
            },
        )
        .expect_err("must reject zero iterations");
        assert_eq!(err, SolverConfigError::ZeroIterations);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_solved_prepayment_lands_near_target(
            principal in 500_000u32..20_000_000,
            rate_bp in 100u32..1_500,
            tenure in 5u32..31,
            target_offset in 1u32..30
        ) {
            let target = tenure - 1 - (target_offset % (tenure - 1));
            prop_assert!(target >= 1 && target < tenure);
            let params = LoanParameters::new(principal as f64, rate_bp as f64 / 100.0, tenure)
                .with_target_tenure(target);

            let required = solve_required_prepayment(&params);
            prop_assert!(required >= 0.0);
            let achieved = simulate_amortization(&params.clone().with_prepayment(required, 0.0))
                .actual_tenure_years;
            prop_assert!(
                (achieved - target as f64).abs() <= 1.0,
                "target {} achieved {} with {}",
                target,
                achieved,
                required
            );
        }
    }
}
