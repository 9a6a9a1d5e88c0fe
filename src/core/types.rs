use chrono::Datelike;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "401k", alias = "401K", alias = "k401")]
    K401,
    #[serde(rename = "Roth", alias = "roth")]
    Roth,
    #[serde(rename = "Taxable", alias = "taxable", alias = "Brokerage")]
    Taxable,
    #[serde(rename = "HSA", alias = "hsa")]
    Hsa,
    #[serde(rename = "IRA", alias = "ira")]
    Ira,
    #[serde(rename = "Other", alias = "other")]
    Other,
}

impl AccountType {
    pub const ALL: [AccountType; 6] = [
        AccountType::K401,
        AccountType::Roth,
        AccountType::Taxable,
        AccountType::Hsa,
        AccountType::Ira,
        AccountType::Other,
    ];

    pub fn is_tax_deferred(self) -> bool {
        matches!(self, AccountType::K401 | AccountType::Ira)
    }

    pub fn label(self) -> &'static str {
        match self {
            AccountType::K401 => "401k",
            AccountType::Roth => "Roth",
            AccountType::Taxable => "Taxable",
            AccountType::Hsa => "HSA",
            AccountType::Ira => "IRA",
            AccountType::Other => "Other",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    #[default]
    Primary,
    Spouse,
    Joint,
}

/// One amount per account type. Used for balances, distributions and contributions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByAccountType {
    #[serde(rename = "401k")]
    pub k401: f64,
    pub roth: f64,
    pub taxable: f64,
    pub hsa: f64,
    pub ira: f64,
    pub other: f64,
}

impl ByAccountType {
    pub fn get(&self, account_type: AccountType) -> f64 {
        match account_type {
            AccountType::K401 => self.k401,
            AccountType::Roth => self.roth,
            AccountType::Taxable => self.taxable,
            AccountType::Hsa => self.hsa,
            AccountType::Ira => self.ira,
            AccountType::Other => self.other,
        }
    }

    pub fn get_mut(&mut self, account_type: AccountType) -> &mut f64 {
        match account_type {
            AccountType::K401 => &mut self.k401,
            AccountType::Roth => &mut self.roth,
            AccountType::Taxable => &mut self.taxable,
            AccountType::Hsa => &mut self.hsa,
            AccountType::Ira => &mut self.ira,
            AccountType::Other => &mut self.other,
        }
    }

    pub fn total(&self) -> f64 {
        AccountType::ALL.iter().map(|t| self.get(*t)).sum()
    }

    pub fn map(&self, mut f: impl FnMut(AccountType, f64) -> f64) -> Self {
        let mut out = Self::default();
        for account_type in AccountType::ALL {
            *out.get_mut(account_type) = f(account_type, self.get(account_type));
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Owner,
    pub account_type: AccountType,
    pub balance: f64,
    #[serde(default)]
    pub annual_contribution: f64,
    /// Only meaningful for taxable accounts; defaults to the balance.
    #[serde(default)]
    pub cost_basis: Option<f64>,
}

/// Monthly amounts; the engine annualizes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(default)]
    pub name: String,
    pub amount_before_65: f64,
    pub amount_after_65: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherIncome {
    #[serde(default)]
    pub name: String,
    pub annual_amount: f64,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub inflation_adjusted: bool,
}

impl OtherIncome {
    pub fn is_active(&self, year: i32) -> bool {
        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if start > end {
                return false;
            }
        }
        self.start_year.is_none_or(|start| year >= start)
            && self.end_year.is_none_or(|end| year <= end)
    }
}

/// One-off cost in today's dollars, charged in `year`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialExpense {
    #[serde(default)]
    pub name: String,
    pub year: i32,
    pub amount: f64,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    #[default]
    #[serde(alias = "Single")]
    Single,
    #[serde(alias = "Married Filing Jointly", alias = "mfj")]
    MarriedFilingJointly,
    #[serde(alias = "Married Filing Separately", alias = "mfs")]
    MarriedFilingSeparately,
    #[serde(alias = "Head of Household", alias = "hoh")]
    HeadOfHousehold,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStrategy {
    #[default]
    Default,
    Longevity,
    Legacy,
    #[serde(alias = "tax-optimization", alias = "taxOptimization")]
    TaxOptimization,
    #[serde(alias = "stable-income", alias = "stableIncome")]
    StableIncome,
    #[serde(alias = "sequence-risk", alias = "sequenceRisk")]
    SequenceRisk,
    Liquidity,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    #[default]
    Brackets,
    #[serde(alias = "flat", alias = "flatRate")]
    FlatRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorSettings {
    pub current_year: i32,
    pub retirement_age: Option<u32>,
    pub years_to_retirement: Option<u32>,
    pub annual_retirement_expense: f64,
    pub pre_retirement_growth_rate: f64,
    pub post_retirement_growth_rate: f64,
    pub capital_gains_tax_rate: f64,
    pub income_tax_rate: f64,
    pub inflation_rate: f64,
    pub enable_borrowing: bool,
    pub borrowing_rate: f64,
    pub ssa_start_age: u32,
    pub withdrawal_strategy: WithdrawalStrategy,
    pub secondary_withdrawal_strategy: WithdrawalStrategy,
    pub filing_status: Option<FilingStatus>,
    pub tax_mode: TaxMode,
}

pub const DEFAULT_RETIREMENT_AGE: u32 = 65;
pub const DEFAULT_SSA_START_AGE: u32 = 67;

impl Default for CalculatorSettings {
    fn default() -> Self {
        Self {
            current_year: chrono::Local::now().year(),
            retirement_age: Some(DEFAULT_RETIREMENT_AGE),
            years_to_retirement: None,
            annual_retirement_expense: 0.0,
            pre_retirement_growth_rate: 0.07,
            post_retirement_growth_rate: 0.05,
            capital_gains_tax_rate: 0.15,
            income_tax_rate: 0.22,
            inflation_rate: 0.03,
            enable_borrowing: false,
            borrowing_rate: 0.07,
            ssa_start_age: DEFAULT_SSA_START_AGE,
            withdrawal_strategy: WithdrawalStrategy::Default,
            secondary_withdrawal_strategy: WithdrawalStrategy::Default,
            filing_status: None,
            tax_mode: TaxMode::Brackets,
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

impl CalculatorSettings {
    /// Copy with every rate forced into a usable range. Non-finite values fall back to
    /// the defaults.
    pub fn sanitized(&self) -> Self {
        let defaults = Self {
            current_year: self.current_year,
            ..Self::default()
        };
        Self {
            annual_retirement_expense: finite_or(self.annual_retirement_expense, 0.0).max(0.0),
            pre_retirement_growth_rate: finite_or(
                self.pre_retirement_growth_rate,
                defaults.pre_retirement_growth_rate,
            )
            .clamp(-0.99, 1.0),
            post_retirement_growth_rate: finite_or(
                self.post_retirement_growth_rate,
                defaults.post_retirement_growth_rate,
            )
            .clamp(-0.99, 1.0),
            capital_gains_tax_rate: finite_or(
                self.capital_gains_tax_rate,
                defaults.capital_gains_tax_rate,
            )
            .clamp(0.0, 1.0),
            income_tax_rate: finite_or(self.income_tax_rate, defaults.income_tax_rate)
                .clamp(0.0, 1.0),
            inflation_rate: finite_or(self.inflation_rate, defaults.inflation_rate)
                .clamp(-0.5, 1.0),
            borrowing_rate: finite_or(self.borrowing_rate, defaults.borrowing_rate)
                .clamp(0.0, 1.0),
            ssa_start_age: self.ssa_start_age.clamp(62, 70),
            ..self.clone()
        }
    }

    pub fn resolved_retirement_age(&self, current_age: u32) -> u32 {
        match (self.retirement_age, self.years_to_retirement) {
            (Some(age), _) => age,
            (None, Some(years)) => current_age.saturating_add(years),
            (None, None) => DEFAULT_RETIREMENT_AGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub birth_year: Option<i32>,
    pub life_expectancy: u32,
    #[serde(default)]
    pub include_spouse: bool,
    #[serde(default)]
    pub spouse_birth_year: Option<i32>,
    #[serde(default)]
    pub spouse_life_expectancy: Option<u32>,
    #[serde(default = "default_true")]
    pub include_ssa: bool,
    #[serde(default)]
    pub include_spouse_ssa: bool,
    #[serde(default)]
    pub annual_income: f64,
    #[serde(default)]
    pub spouse_annual_income: f64,
    /// Explicit annual benefit at full retirement age; bypasses the estimator.
    #[serde(default)]
    pub ssa_benefit: Option<f64>,
    #[serde(default)]
    pub spouse_ssa_benefit: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl Default for Household {
    fn default() -> Self {
        Self {
            birth_year: None,
            life_expectancy: 90,
            include_spouse: false,
            spouse_birth_year: None,
            spouse_life_expectancy: None,
            include_ssa: true,
            include_spouse_ssa: false,
            annual_income: 0.0,
            spouse_annual_income: 0.0,
            ssa_benefit: None,
            spouse_ssa_benefit: None,
        }
    }
}

impl Household {
    pub fn spouse(&self) -> Option<(i32, u32)> {
        if !self.include_spouse {
            return None;
        }
        let birth_year = self.spouse_birth_year?;
        Some((birth_year, self.spouse_life_expectancy.unwrap_or(self.life_expectancy)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionInputs {
    pub household: Household,
    pub settings: Option<CalculatorSettings>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub other_income: Vec<OtherIncome>,
    #[serde(default)]
    pub special_expenses: Vec<SpecialExpense>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionDetail {
    pub year: i32,
    pub age: Option<u32>,
    pub spouse_age: Option<u32>,
    pub event: String,
    pub ssa_income: f64,
    pub distributions: ByAccountType,
    pub other_income: f64,
    pub total_income: f64,
    pub after_tax_income: f64,
    pub living_expenses: f64,
    pub special_expenses: f64,
    pub total_expenses: f64,
    pub gap_excess: f64,
    pub cumulative_liability: f64,
    pub debt_balance: f64,
    pub debt_interest_paid: f64,
    pub debt_principal_paid: f64,
    pub assets_remaining: f64,
    pub net_worth: f64,
    pub balances: ByAccountType,
    pub contributions: f64,
    pub surplus_to_taxable: f64,
    pub growth: f64,
    pub taxable_income: f64,
    pub income_tax: f64,
    pub capital_gains_tax: f64,
    pub tax_paid: f64,
}

impl ProjectionDetail {
    pub fn total_distributions(&self) -> f64 {
        self.distributions.total()
    }
}
