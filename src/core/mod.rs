mod compare;
mod engine;
mod solver;
mod types;

pub use compare::{compare_loan_offers, compare_prepayment_scenarios};
pub use engine::{
    PAYOFF_EPSILON, monthly_installment, round_currency, simulate_amortization, yearly_summary,
};
pub use solver::{
    DEFAULT_PREPAYMENT_TOLERANCE, PrepaymentSearchConfig, PrepaymentSearchIteration,
    PrepaymentSolveResult, SolverConfigError, solve_required_prepayment,
    solve_required_prepayment_with,
};
pub use types::{
    AmortizationResult, AmortizationRow, LoanOffer, LoanParameters, OfferComparison, OfferQuote,
    ScenarioComparison, YearSummary,
};
