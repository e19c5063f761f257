use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct LoanParameters {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub tenure_years: u32,
    pub annual_prepayment: f64,
    pub prepayment_increase_percent: f64,
    pub emi_increase_percent: f64,
    pub target_tenure_years: Option<u32>,
}

impl LoanParameters {
    /// A plain amortizing loan with no prepayment or escalation policy.
    pub fn new(principal: f64, annual_rate_percent: f64, tenure_years: u32) -> Self {
        Self {
            principal,
            annual_rate_percent,
            tenure_years,
            annual_prepayment: 0.0,
            prepayment_increase_percent: 0.0,
            emi_increase_percent: 0.0,
            target_tenure_years: None,
        }
    }

    pub fn with_prepayment(mut self, annual_prepayment: f64, increase_percent: f64) -> Self {
        self.annual_prepayment = annual_prepayment;
        self.prepayment_increase_percent = increase_percent;
        self
    }

    pub fn with_emi_increase(mut self, increase_percent: f64) -> Self {
        self.emi_increase_percent = increase_percent;
        self
    }

    pub fn with_target_tenure(mut self, target_tenure_years: u32) -> Self {
        self.target_tenure_years = Some(target_tenure_years);
        self
    }

    /// Same loan with every prepayment and escalation knob zeroed.
    pub fn standard(&self) -> Self {
        Self::new(self.principal, self.annual_rate_percent, self.tenure_years)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    pub month: u32,
    pub year: u32,
    pub emi: f64,
    pub principal_component: f64,
    pub interest_component: f64,
    pub prepayment: f64,
    pub balance: f64,
    pub cumulative_paid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationResult {
    pub schedule: Vec<AmortizationRow>,
    pub total_interest: f64,
    pub total_principal: f64,
    pub total_prepayments: f64,
    pub total_amount_paid: f64,
    pub actual_tenure_years: f64,
}

impl AmortizationResult {
    pub fn final_balance(&self) -> f64 {
        self.schedule.last().map(|row| row.balance).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub year: u32,
    pub principal_component: f64,
    pub interest_component: f64,
    pub prepayment: f64,
    pub total_emi: f64,
    pub closing_balance: f64,
    pub month_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioComparison {
    pub monthly_installment: f64,
    pub standard: AmortizationResult,
    pub with_prepayment: AmortizationResult,
    pub interest_saved: f64,
    pub tenure_reduction_years: f64,
    pub savings_percent: f64,
    pub return_on_prepayment_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoanOffer {
    pub name: String,
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub tenure_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferQuote {
    pub name: String,
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub tenure_years: u32,
    pub monthly_installment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
    /// Total interest as a percent of the principal.
    pub interest_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferComparison {
    pub quotes: Vec<OfferQuote>,
    pub lowest_emi_index: Option<usize>,
    pub lowest_interest_index: Option<usize>,
}
