use super::types::{AmortizationResult, AmortizationRow, LoanParameters, YearSummary};

/// Outstanding balance at or below this is treated as paid off.
pub const PAYOFF_EPSILON: f64 = 1.0;

const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Default, Clone, Copy)]
struct RunningTotals {
    interest: f64,
    prepayments: f64,
    paid: f64,
}

/// Rounds half-up to the nearest whole currency unit, the way the
/// calculator front end has always displayed amounts.
pub fn round_currency(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub(crate) fn round_to_tenth(value: f64) -> f64 {
    round_currency(value * 10.0) / 10.0
}

fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / (12.0 * 100.0)
}

fn total_months(tenure_years: u32) -> u32 {
    tenure_years.saturating_mul(MONTHS_PER_YEAR)
}

pub fn monthly_installment(principal: f64, annual_rate_percent: f64, tenure_years: u32) -> f64 {
    let rate = monthly_rate(annual_rate_percent);
    let months = f64::from(total_months(tenure_years));

    // Zero-rate loans are a straight split and are not rounded.
    if rate == 0.0 {
        return principal / months;
    }

    let growth = (1.0 + rate).powf(months);
    round_currency(principal * rate * growth / (growth - 1.0))
}

fn scheduled_prepayment(params: &LoanParameters, year: u32) -> f64 {
    let years_since_start = f64::from(year - 1);
    params.annual_prepayment
        * (1.0 + params.prepayment_increase_percent / 100.0).powf(years_since_start)
}

pub fn simulate_amortization(params: &LoanParameters) -> AmortizationResult {
    let rate = monthly_rate(params.annual_rate_percent);
    let month_cap = total_months(params.tenure_years);

    let mut current_emi = monthly_installment(
        params.principal,
        params.annual_rate_percent,
        params.tenure_years,
    );
    let mut balance = params.principal;
    let mut totals = RunningTotals::default();
    let mut schedule = Vec::with_capacity(month_cap.min(1_200) as usize);

    let mut month = 1;
    while balance > PAYOFF_EPSILON && month <= month_cap {
        let year = month.div_ceil(MONTHS_PER_YEAR);
        let is_year_end = month % MONTHS_PER_YEAR == 0;

        let interest_component = balance * rate;
        let mut principal_component = current_emi - interest_component;
        if principal_component > balance {
            principal_component = balance;
            current_emi = principal_component + interest_component;
        }

        let prepayment = if is_year_end && params.annual_prepayment > 0.0 {
            scheduled_prepayment(params, year).min(balance - principal_component)
        } else {
            0.0
        };

        balance = balance - principal_component - prepayment;

        totals.interest += interest_component;
        totals.prepayments += prepayment;
        totals.paid += current_emi + prepayment;

        schedule.push(AmortizationRow {
            month,
            year,
            emi: round_currency(current_emi),
            principal_component: round_currency(principal_component),
            interest_component: round_currency(interest_component),
            prepayment: round_currency(prepayment),
            balance: round_currency(balance.max(0.0)),
            cumulative_paid: round_currency(totals.paid),
        });

        if balance <= PAYOFF_EPSILON {
            break;
        }

        // Escalation takes effect from the first month of the next year.
        if is_year_end && params.emi_increase_percent > 0.0 {
            current_emi *= 1.0 + params.emi_increase_percent / 100.0;
        }

        month += 1;
    }

    let actual_tenure_years = round_to_tenth(schedule.len() as f64 / 12.0);
    log::debug!(
        "simulated principal={} rate={}% tenure={}y prepayment={}: {} months, residual {:.2}",
        params.principal,
        params.annual_rate_percent,
        params.tenure_years,
        params.annual_prepayment,
        schedule.len(),
        balance.max(0.0)
    );

    AmortizationResult {
        schedule,
        total_interest: round_currency(totals.interest),
        total_principal: params.principal,
        total_prepayments: round_currency(totals.prepayments),
        total_amount_paid: round_currency(totals.paid),
        actual_tenure_years,
    }
}

/// Rolls a monthly schedule up into one entry per loan year.
pub fn yearly_summary(schedule: &[AmortizationRow]) -> Vec<YearSummary> {
    let mut years: Vec<YearSummary> = Vec::new();
    for row in schedule {
        match years.last_mut() {
            Some(current) if current.year == row.year => {
                current.principal_component += row.principal_component;
                current.interest_component += row.interest_component;
                current.prepayment += row.prepayment;
                current.total_emi += row.emi;
                current.closing_balance = row.balance;
                current.month_count += 1;
            }
            _ => years.push(YearSummary {
                year: row.year,
                principal_component: row.principal_component,
                interest_component: row.interest_component,
                prepayment: row.prepayment,
                total_emi: row.emi,
                closing_balance: row.balance,
                month_count: 1,
            }),
        }
    }
    years
}
