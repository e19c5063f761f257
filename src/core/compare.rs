use super::engine::{monthly_installment, round_to_tenth, simulate_amortization};
use super::types::{LoanOffer, LoanParameters, OfferComparison, OfferQuote, ScenarioComparison};

/// Runs the loan once as a plain amortizing loan and once with the caller's
/// prepayment and escalation plan, and reports what the plan saves.
pub fn compare_prepayment_scenarios(params: &LoanParameters) -> ScenarioComparison {
    let standard = simulate_amortization(&params.standard());
    let with_prepayment = simulate_amortization(params);

    let interest_saved = standard.total_interest - with_prepayment.total_interest;
    let tenure_reduction_years =
        round_to_tenth(standard.actual_tenure_years - with_prepayment.actual_tenure_years);
    let savings_percent = if standard.total_interest > 0.0 {
        interest_saved / standard.total_interest * 100.0
    } else {
        0.0
    };
    let return_on_prepayment_percent = (with_prepayment.total_prepayments > 0.0)
        .then(|| interest_saved / with_prepayment.total_prepayments * 100.0);

    ScenarioComparison {
        monthly_installment: monthly_installment(
            params.principal,
            params.annual_rate_percent,
            params.tenure_years,
        ),
        standard,
        with_prepayment,
        interest_saved,
        tenure_reduction_years,
        savings_percent,
        return_on_prepayment_percent,
    }
}

fn quote_offer(offer: &LoanOffer) -> OfferQuote {
    let emi = monthly_installment(offer.principal, offer.annual_rate_percent, offer.tenure_years);
    let total_payment = emi * f64::from(offer.tenure_years) * 12.0;
    let total_interest = total_payment - offer.principal;
    let interest_percent = if offer.principal > 0.0 {
        total_interest / offer.principal * 100.0
    } else {
        0.0
    };
    OfferQuote {
        name: offer.name.clone(),
        principal: offer.principal,
        annual_rate_percent: offer.annual_rate_percent,
        tenure_years: offer.tenure_years,
        monthly_installment: emi,
        total_payment,
        total_interest,
        interest_percent,
    }
}

fn index_of_min(quotes: &[OfferQuote], key: impl Fn(&OfferQuote) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, quote) in quotes.iter().enumerate() {
        let value = key(quote);
        match best {
            Some((_, current)) if value >= current => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

pub fn compare_loan_offers(offers: &[LoanOffer]) -> OfferComparison {
    let quotes: Vec<OfferQuote> = offers.iter().map(quote_offer).collect();
    let lowest_emi_index = index_of_min(&quotes, |q| q.monthly_installment);
    let lowest_interest_index = index_of_min(&quotes, |q| q.total_interest);

    OfferComparison {
        quotes,
        lowest_emi_index,
        lowest_interest_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    fn offer(name: &str, principal: f64, rate: f64, tenure: u32) -> LoanOffer {
        LoanOffer {
            name: name.to_string(),
            principal,
            annual_rate_percent: rate,
            tenure_years: tenure,
        }
    }

    #[test]
    fn flat_prepayment_saves_interest_and_years() {
        let params = LoanParameters::new(5_000_000.0, 8.5, 20).with_prepayment(100_000.0, 0.0);
        let comparison = compare_prepayment_scenarios(&params);

        assert_approx(comparison.monthly_installment, 43_391.0);
        assert_approx(comparison.standard.total_interest, 5_413_941.0);
        assert_approx(comparison.with_prepayment.total_interest, 3_558_514.0);
        assert_approx(comparison.interest_saved, 1_855_427.0);
        assert_approx(comparison.tenure_reduction_years, 6.0);
        assert_approx(comparison.savings_percent, 1_855_427.0 / 5_413_941.0 * 100.0);
        assert_approx(
            comparison.return_on_prepayment_percent.expect("prepayments were made"),
            1_855_427.0 / 1_300_000.0 * 100.0,
        );
    }

    #[test]
    fn standard_scenario_drops_every_escalation() {
        let params = LoanParameters::new(5_000_000.0, 8.5, 20)
            .with_prepayment(100_000.0, 5.0)
            .with_emi_increase(5.0);
        let comparison = compare_prepayment_scenarios(&params);

        assert_eq!(comparison.standard.schedule.len(), 240);
        assert_approx(comparison.standard.total_prepayments, 0.0);
        assert_approx(comparison.with_prepayment.total_interest, 2_711_410.0);
        assert_approx(comparison.with_prepayment.actual_tenure_years, 10.0);
        assert_approx(comparison.interest_saved, 2_702_531.0);
        assert_approx(comparison.tenure_reduction_years, 10.0);
    }

    #[test]
    fn no_prepayment_has_no_return() {
        let comparison = compare_prepayment_scenarios(&LoanParameters::new(1_000_000.0, 9.0, 10));
        assert_approx(comparison.interest_saved, 0.0);
        assert_approx(comparison.tenure_reduction_years, 0.0);
        assert_eq!(comparison.return_on_prepayment_percent, None);
    }

    #[test]
    fn zero_rate_loan_reports_zero_savings_percent() {
        let params = LoanParameters::new(120_000.0, 0.0, 10).with_prepayment(12_000.0, 0.0);
        let comparison = compare_prepayment_scenarios(&params);
        assert_approx(comparison.savings_percent, 0.0);
        assert_approx(comparison.tenure_reduction_years, 5.0);
        assert_eq!(comparison.return_on_prepayment_percent, Some(0.0));
    }

    #[test]
    fn offers_are_quoted_and_ranked() {
        let comparison = compare_loan_offers(&[
            offer("Bank A", 5_000_000.0, 8.5, 20),
            offer("Bank B", 5_000_000.0, 8.75, 20),
            offer("Bank C", 5_000_000.0, 8.5, 25),
        ]);

        assert_eq!(comparison.quotes.len(), 3);
        assert_approx(comparison.quotes[0].monthly_installment, 43_391.0);
        assert_approx(comparison.quotes[0].total_payment, 10_413_840.0);
        assert_approx(comparison.quotes[0].total_interest, 5_413_840.0);
        assert_approx(comparison.quotes[1].monthly_installment, 44_186.0);
        assert_approx(comparison.quotes[2].monthly_installment, 40_261.0);
        assert_approx(comparison.quotes[2].total_interest, 7_078_300.0);
        assert_approx(
            comparison.quotes[0].interest_percent,
            5_413_840.0 / 5_000_000.0 * 100.0,
        );
        assert_approx(
            comparison.quotes[2].interest_percent,
            7_078_300.0 / 5_000_000.0 * 100.0,
        );

        assert_eq!(comparison.lowest_emi_index, Some(2));
        assert_eq!(comparison.lowest_interest_index, Some(0));
    }

    #[test]
    fn ties_keep_the_first_offer() {
        let comparison = compare_loan_offers(&[
            offer("First", 1_000_000.0, 9.0, 10),
            offer("Second", 1_000_000.0, 9.0, 10),
        ]);
        assert_eq!(comparison.lowest_emi_index, Some(0));
        assert_eq!(comparison.lowest_interest_index, Some(0));
    }

    #[test]
    fn zero_principal_offer_reports_zero_interest_percent() {
        let comparison = compare_loan_offers(&[offer("Empty", 0.0, 9.0, 10)]);
        assert_approx(comparison.quotes[0].interest_percent, 0.0);
    }

    #[test]
    fn empty_offer_list_has_no_best() {
        let comparison = compare_loan_offers(&[]);
        assert!(comparison.quotes.is_empty());
        assert_eq!(comparison.lowest_emi_index, None);
        assert_eq!(comparison.lowest_interest_index, None);
    }
}
