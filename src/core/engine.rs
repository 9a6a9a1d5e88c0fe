use tracing::{debug, warn};

use super::error::ProjectionError;
use super::growth::{DebtState, TaxableBasis, advance_year, apply_shortfall};
use super::solver::{
    GrossUpSolution, GuaranteedIncome, SolveConfig, YearTax, solve_gross_withdrawal,
    tax_for_draws,
};
use super::ssa::{effective_start_age, estimate_ssa, start_age_factor};
use super::strategy::SelectorState;
use super::tax::{TaxCalculator, resolve_filing_status};
use super::types::{
    Account, AccountType, ByAccountType, CalculatorSettings, Household, Owner,
    ProjectionDetail, ProjectionInputs,
};

const EXPENSE_SWITCH_AGE: u32 = 65;
const MONTHS_PER_YEAR: f64 = 12.0;
const DEPLETED_EPS: f64 = 0.005;
/// Rows past the first year are capped here whatever the life expectancy.
pub const MAX_HORIZON_YEARS: i32 = 150;

pub const EVENT_RETIREMENT: &str = "Retirement";
pub const EVENT_SSA_START: &str = "SSA Start";
pub const EVENT_SPOUSE_SSA_START: &str = "Spouse SSA Start";
pub const EVENT_PLANNER_DECEASED: &str = "Planner Deceased";
pub const EVENT_SPOUSE_DECEASED: &str = "Spouse Deceased";
pub const EVENT_ACCOUNTS_DEPLETED: &str = "Accounts Depleted";
pub const EVENT_BORROWING: &str = "Borrowing";

/// Runs the projection, or returns an empty sequence when a prerequisite is missing.
pub fn run_projection(inputs: &ProjectionInputs) -> Vec<ProjectionDetail> {
    match try_run_projection(inputs) {
        Ok(rows) => rows,
        Err(err) => {
            warn!("{err}");
            Vec::new()
        }
    }
}

pub fn try_run_projection(
    inputs: &ProjectionInputs,
) -> Result<Vec<ProjectionDetail>, ProjectionError> {
    let (birth_year, settings) = check_prerequisites(inputs)?;
    Ok(simulate_household(inputs, birth_year, &settings.sanitized()))
}

/// Birth year and settings, the two inputs no projection can run without.
pub fn check_prerequisites(
    inputs: &ProjectionInputs,
) -> Result<(i32, &CalculatorSettings), ProjectionError> {
    let birth_year = inputs
        .household
        .birth_year
        .ok_or(ProjectionError::MissingBirthYear)?;
    let settings = inputs
        .settings
        .as_ref()
        .ok_or(ProjectionError::MissingSettings)?;
    Ok((birth_year, settings))
}

#[derive(Debug, Clone, Copy)]
struct LifeTrack {
    birth_year: i32,
    final_year: i32,
}

impl LifeTrack {
    fn new(birth_year: i32, life_expectancy: u32) -> Self {
        let years = i32::try_from(life_expectancy).unwrap_or(i32::MAX);
        Self {
            birth_year,
            final_year: birth_year.saturating_add(years),
        }
    }

    fn age(&self, year: i32) -> u32 {
        year.saturating_sub(self.birth_year).max(0) as u32
    }

    fn alive(&self, year: i32) -> bool {
        year <= self.final_year
    }
}

#[derive(Debug, Clone, Copy)]
struct Lives {
    planner: LifeTrack,
    spouse: Option<LifeTrack>,
}

impl Lives {
    fn new(household: &Household, birth_year: i32) -> Self {
        Self {
            planner: LifeTrack::new(birth_year, household.life_expectancy),
            spouse: household
                .spouse()
                .map(|(year, life_expectancy)| LifeTrack::new(year, life_expectancy)),
        }
    }

    fn final_year(&self) -> i32 {
        self.spouse
            .map(|s| s.final_year.max(self.planner.final_year))
            .unwrap_or(self.planner.final_year)
    }

    fn planner_alive(&self, year: i32) -> bool {
        self.planner.alive(year)
    }

    fn spouse_alive(&self, year: i32) -> bool {
        self.spouse.is_some_and(|s| s.alive(year))
    }

    /// Age that drives expense tiers and the selector: the planner's while alive, the
    /// surviving spouse's after that.
    fn reference_age(&self, year: i32) -> u32 {
        match self.spouse {
            Some(spouse) if !self.planner_alive(year) => spouse.age(year),
            _ => self.planner.age(year),
        }
    }

    fn owner_alive(&self, owner: Owner, year: i32) -> bool {
        match owner {
            Owner::Primary => self.planner_alive(year),
            Owner::Spouse => self.spouse_alive(year),
            Owner::Joint => self.planner_alive(year) || self.spouse_alive(year),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SocialSecurity {
    start_age: u32,
    planner_benefit: Option<f64>,
    spouse_benefit: Option<f64>,
}

impl SocialSecurity {
    fn new(household: &Household, settings: &CalculatorSettings, has_spouse: bool) -> Self {
        let start_age = effective_start_age(settings.ssa_start_age);
        let factor = start_age_factor(start_age);
        let planner_benefit = household.include_ssa.then(|| {
            household
                .ssa_benefit
                .unwrap_or_else(|| estimate_ssa(household.annual_income, true))
                .max(0.0)
                * factor
        });
        let spouse_benefit = (has_spouse && household.include_spouse_ssa).then(|| {
            household
                .spouse_ssa_benefit
                .unwrap_or_else(|| estimate_ssa(household.spouse_annual_income, false))
                .max(0.0)
                * factor
        });
        Self {
            start_age,
            planner_benefit,
            spouse_benefit,
        }
    }

    /// Household benefit in today's dollars. A survivor keeps the larger of the two
    /// benefits once old enough to claim.
    fn household_benefit(&self, lives: &Lives, year: i32) -> f64 {
        let planner_alive = lives.planner_alive(year);
        let spouse_alive = lives.spouse_alive(year);
        let planner_claiming = planner_alive && lives.planner.age(year) >= self.start_age;
        let spouse_claiming =
            spouse_alive && lives.spouse.is_some_and(|s| s.age(year) >= self.start_age);

        let own_planner = self.planner_benefit.unwrap_or(0.0);
        let own_spouse = self.spouse_benefit.unwrap_or(0.0);
        match (planner_alive, spouse_alive) {
            (true, true) => {
                let mut total = 0.0;
                if planner_claiming {
                    total += own_planner;
                }
                if spouse_claiming {
                    total += own_spouse;
                }
                total
            }
            (true, false) if planner_claiming => {
                if lives.spouse.is_some() {
                    own_planner.max(own_spouse)
                } else {
                    own_planner
                }
            }
            (false, true) if spouse_claiming => own_spouse.max(own_planner),
            _ => 0.0,
        }
    }

    fn planner_starts(&self, lives: &Lives, year: i32) -> bool {
        self.planner_benefit.is_some()
            && lives.planner_alive(year)
            && lives.planner.age(year) == self.start_age
    }

    fn spouse_starts(&self, lives: &Lives, year: i32) -> bool {
        self.spouse_benefit.is_some()
            && lives.spouse_alive(year)
            && lives.spouse.is_some_and(|s| s.age(year) == self.start_age)
    }
}

fn clean_amount(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn opening_balances(accounts: &[Account]) -> (ByAccountType, TaxableBasis) {
    let mut balances = ByAccountType::default();
    let mut basis = 0.0;
    for account in accounts {
        let balance = clean_amount(account.balance);
        *balances.get_mut(account.account_type) += balance;
        if account.account_type == AccountType::Taxable {
            basis += account.cost_basis.map(clean_amount).unwrap_or(balance);
        }
    }
    (balances, TaxableBasis::new(basis, balances.taxable))
}

fn contributions_for_year(accounts: &[Account], lives: &Lives, year: i32) -> ByAccountType {
    let mut contributions = ByAccountType::default();
    for account in accounts {
        if lives.owner_alive(account.owner, year) {
            *contributions.get_mut(account.account_type) +=
                clean_amount(account.annual_contribution);
        }
    }
    contributions
}

fn inflation_factor(settings: &CalculatorSettings, year: i32) -> f64 {
    let years = (year - settings.current_year).max(0);
    (1.0 + settings.inflation_rate).powi(years)
}

#[derive(Debug, Clone, Copy, Default)]
struct YearExpenses {
    living: f64,
    special: f64,
}

impl YearExpenses {
    fn total(&self) -> f64 {
        self.living + self.special
    }
}

fn expenses_for_year(
    inputs: &ProjectionInputs,
    settings: &CalculatorSettings,
    reference_age: u32,
    retired: bool,
    year: i32,
) -> YearExpenses {
    let inflation = inflation_factor(settings, year);
    let monthly: f64 = inputs
        .expenses
        .iter()
        .map(|e| {
            if reference_age >= EXPENSE_SWITCH_AGE {
                clean_amount(e.amount_after_65)
            } else {
                clean_amount(e.amount_before_65)
            }
        })
        .sum();
    let living = if inputs.expenses.is_empty() && retired {
        settings.annual_retirement_expense * inflation
    } else {
        monthly * MONTHS_PER_YEAR * inflation
    };
    let special = inputs
        .special_expenses
        .iter()
        .filter(|s| s.year == year)
        .map(|s| clean_amount(s.amount))
        .sum::<f64>()
        * inflation;
    YearExpenses { living, special }
}

fn other_income_for_year(inputs: &ProjectionInputs, settings: &CalculatorSettings, year: i32) -> f64 {
    let inflation = inflation_factor(settings, year);
    inputs
        .other_income
        .iter()
        .filter(|income| income.is_active(year))
        .map(|income| {
            let amount = clean_amount(income.annual_amount);
            if income.inflation_adjusted {
                amount * inflation
            } else {
                amount
            }
        })
        .sum()
}

#[derive(Debug)]
struct HouseholdState {
    balances: ByAccountType,
    taxable_basis: TaxableBasis,
    debt: DebtState,
    cumulative_liability: f64,
    first_retired_year: Option<i32>,
    depleted_reported: bool,
    borrowing_reported: bool,
}

#[derive(Debug, Default)]
struct YearFlows {
    distributions: ByAccountType,
    contributions: f64,
    growth: f64,
    tax: YearTax,
    gap_excess: f64,
    surplus_to_taxable: f64,
    interest_paid: f64,
    principal_paid: f64,
    borrowed: f64,
}

fn simulate_household(
    inputs: &ProjectionInputs,
    birth_year: i32,
    settings: &CalculatorSettings,
) -> Vec<ProjectionDetail> {
    let lives = Lives::new(&inputs.household, birth_year);
    let first_year = settings.current_year;
    let final_year = lives
        .final_year()
        .min(first_year.saturating_add(MAX_HORIZON_YEARS));
    if final_year < first_year {
        return Vec::new();
    }

    let retirement_age = settings.resolved_retirement_age(lives.planner.age(first_year));
    let retirement_year =
        birth_year.saturating_add(i32::try_from(retirement_age).unwrap_or(i32::MAX));
    let social_security = SocialSecurity::new(&inputs.household, settings, lives.spouse.is_some());

    let (balances, taxable_basis) = opening_balances(&inputs.accounts);
    let mut state = HouseholdState {
        balances,
        taxable_basis,
        debt: DebtState::default(),
        cumulative_liability: 0.0,
        first_retired_year: None,
        depleted_reported: false,
        borrowing_reported: false,
    };

    let mut rows = Vec::with_capacity((final_year - first_year + 1) as usize);
    for year in first_year..=final_year {
        let planner_alive = lives.planner_alive(year);
        let retired = !planner_alive || lives.planner.age(year) >= retirement_age;
        let reference_age = lives.reference_age(year);

        let spouse_ssa_active = inputs.household.include_spouse_ssa && lives.spouse_alive(year);
        let filing_status = resolve_filing_status(settings.filing_status, spouse_ssa_active);
        let tax = TaxCalculator::new(settings, filing_status);

        let income = GuaranteedIncome {
            ssa: social_security.household_benefit(&lives, year) * inflation_factor(settings, year),
            other: other_income_for_year(inputs, settings, year),
        };
        let expenses = expenses_for_year(inputs, settings, reference_age, retired, year);

        let flows = if retired {
            let first_retired_year = *state.first_retired_year.get_or_insert(year);
            let selector = SelectorState {
                balances: ByAccountType::default(),
                age: reference_age,
                years_remaining: (final_year - year).max(0) as u32,
                years_since_retirement: (year - first_retired_year).max(0) as u32,
                retired: true,
                base_ordinary_income: income.ordinary_income(),
                filing_status,
                primary: settings.withdrawal_strategy,
                secondary: settings.secondary_withdrawal_strategy,
            };
            retirement_year_flows(settings, &tax, &income, &expenses, selector, &mut state)
        } else {
            accumulation_year_flows(inputs, settings, &lives, &tax, &income, year, &mut state)
        };

        let event = year_events(
            &lives,
            &social_security,
            &mut state,
            &flows,
            year,
            retirement_year,
            first_year,
        );

        let total_distributions = flows.distributions.total();
        let total_income = income.ssa + total_distributions + income.other;
        let assets_remaining = state.balances.total();
        rows.push(ProjectionDetail {
            year,
            age: planner_alive.then(|| lives.planner.age(year)),
            spouse_age: lives
                .spouse
                .filter(|s| s.alive(year))
                .map(|s| s.age(year)),
            event,
            ssa_income: income.ssa,
            distributions: flows.distributions,
            other_income: income.other,
            total_income,
            after_tax_income: total_income - flows.tax.total(),
            living_expenses: expenses.living,
            special_expenses: expenses.special,
            total_expenses: expenses.total(),
            gap_excess: flows.gap_excess,
            cumulative_liability: state.cumulative_liability,
            debt_balance: state.debt.balance,
            debt_interest_paid: flows.interest_paid,
            debt_principal_paid: flows.principal_paid,
            assets_remaining,
            net_worth: assets_remaining - state.debt.balance,
            balances: state.balances,
            contributions: flows.contributions,
            surplus_to_taxable: flows.surplus_to_taxable,
            growth: flows.growth,
            taxable_income: flows.tax.taxable_income(),
            income_tax: flows.tax.income_tax,
            capital_gains_tax: flows.tax.gains_tax,
            tax_paid: flows.tax.total(),
        });
    }

    debug!(
        years = rows.len(),
        final_net_worth = rows.last().map(|r| r.net_worth).unwrap_or(0.0),
        "projection complete"
    );
    rows
}

/// No account is drawn; earned income funds living costs. Guaranteed income left after
/// tax is surplus and goes to debt, then the taxable account.
fn accumulation_year_flows(
    inputs: &ProjectionInputs,
    settings: &CalculatorSettings,
    lives: &Lives,
    tax: &TaxCalculator,
    income: &GuaranteedIncome,
    year: i32,
    state: &mut HouseholdState,
) -> YearFlows {
    let contributions = contributions_for_year(&inputs.accounts, lives, year);
    let advanced = advance_year(
        &state.balances,
        &contributions,
        &ByAccountType::default(),
        settings.pre_retirement_growth_rate,
    );
    state.taxable_basis.add(contributions.taxable);
    state.taxable_basis.cap_to(advanced.balances.taxable);
    state.balances = advanced.balances;

    let year_tax = tax_for_draws(tax, income, &ByAccountType::default(), 0.0);
    let gap_excess = (income.cash() - year_tax.total()).max(0.0);
    let debt = apply_shortfall(
        state.debt,
        gap_excess,
        settings.enable_borrowing,
        settings.borrowing_rate,
    );
    state.debt = debt.state;
    let sweep = debt.surplus_remaining;
    state.balances.taxable += sweep;
    state.taxable_basis.add(sweep);

    YearFlows {
        contributions: contributions.total(),
        growth: advanced.growth,
        tax: year_tax,
        gap_excess,
        surplus_to_taxable: sweep,
        interest_paid: debt.interest_paid,
        principal_paid: debt.principal_paid,
        ..YearFlows::default()
    }
}

fn retirement_year_flows(
    settings: &CalculatorSettings,
    tax: &TaxCalculator,
    income: &GuaranteedIncome,
    expenses: &YearExpenses,
    mut selector: SelectorState,
    state: &mut HouseholdState,
) -> YearFlows {
    let rate = settings.post_retirement_growth_rate;
    let no_flow = ByAccountType::default();
    let grown = advance_year(&state.balances, &no_flow, &no_flow, rate).balances;
    state.taxable_basis.cap_to(grown.taxable);
    selector.balances = grown;

    let solution: GrossUpSolution = solve_gross_withdrawal(
        &selector,
        tax,
        income,
        expenses.total(),
        &state.taxable_basis,
        SolveConfig::default(),
    );
    if !solution.converged && !solution.exhausted {
        debug!(
            iterations = solution.iterations,
            residual = solution.residual,
            "gross-up did not converge; using best estimate"
        );
    }

    let draws = solution.plan.draws;
    let advanced = advance_year(&state.balances, &no_flow, &draws, rate);
    state.taxable_basis.sell(grown.taxable, draws.taxable);
    state.balances = advanced.balances;

    let mut gap_excess = solution.net_cash - expenses.total();
    if solution.converged {
        gap_excess = gap_excess.max(0.0);
    }
    if gap_excess < 0.0 {
        state.cumulative_liability += -gap_excess;
    }

    let debt = apply_shortfall(
        state.debt,
        gap_excess,
        settings.enable_borrowing,
        settings.borrowing_rate,
    );
    state.debt = debt.state;
    let sweep = debt.surplus_remaining;
    state.balances.taxable += sweep;
    state.taxable_basis.add(sweep);

    YearFlows {
        distributions: draws,
        contributions: 0.0,
        growth: advanced.growth,
        tax: solution.tax,
        gap_excess,
        surplus_to_taxable: sweep,
        interest_paid: debt.interest_paid,
        principal_paid: debt.principal_paid,
        borrowed: debt.borrowed,
    }
}

fn year_events(
    lives: &Lives,
    social_security: &SocialSecurity,
    state: &mut HouseholdState,
    flows: &YearFlows,
    year: i32,
    retirement_year: i32,
    first_year: i32,
) -> String {
    let mut events = Vec::new();
    if year == retirement_year && lives.planner_alive(year) {
        events.push(EVENT_RETIREMENT);
    }
    if social_security.planner_starts(lives, year) {
        events.push(EVENT_SSA_START);
    }
    if social_security.spouse_starts(lives, year) {
        events.push(EVENT_SPOUSE_SSA_START);
    }
    if year > first_year && year == lives.planner.final_year.saturating_add(1) {
        events.push(EVENT_PLANNER_DECEASED);
    }
    if let Some(spouse) = lives.spouse {
        if year > first_year && year == spouse.final_year.saturating_add(1) {
            events.push(EVENT_SPOUSE_DECEASED);
        }
    }
    if !state.depleted_reported
        && state.first_retired_year.is_some()
        && state.balances.total() <= DEPLETED_EPS
    {
        state.depleted_reported = true;
        events.push(EVENT_ACCOUNTS_DEPLETED);
    }
    if !state.borrowing_reported && flows.borrowed > 0.0 {
        state.borrowing_reported = true;
        events.push(EVENT_BORROWING);
    }
    events.join(", ")
}
