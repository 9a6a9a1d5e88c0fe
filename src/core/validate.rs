use super::error::InputError;
use super::sweep::SweepGrid;
use super::types::{CalculatorSettings, ProjectionInputs};

pub const MAX_GRID_CELLS: usize = 400;

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), InputError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(InputError::OutOfRange { field, min, max })
    }
}

fn check_amount(field: impl Into<String>, value: f64) -> Result<(), InputError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InputError::NegativeAmount {
            field: field.into(),
        })
    }
}

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2200;
pub const MAX_AGE: u32 = 120;

pub fn validate_settings(settings: &CalculatorSettings) -> Result<(), InputError> {
    check_range(
        "currentYear",
        settings.current_year as f64,
        MIN_YEAR as f64,
        MAX_YEAR as f64,
    )?;
    if let Some(age) = settings.retirement_age {
        check_range("retirementAge", age as f64, 0.0, MAX_AGE as f64)?;
    }
    if let Some(years) = settings.years_to_retirement {
        check_range("yearsToRetirement", years as f64, 0.0, 100.0)?;
    }
    check_range(
        "preRetirementGrowthRate",
        settings.pre_retirement_growth_rate,
        -1.0,
        1.0,
    )?;
    check_range(
        "postRetirementGrowthRate",
        settings.post_retirement_growth_rate,
        -1.0,
        1.0,
    )?;
    check_range(
        "capitalGainsTaxRate",
        settings.capital_gains_tax_rate,
        0.0,
        1.0,
    )?;
    check_range("incomeTaxRate", settings.income_tax_rate, 0.0, 1.0)?;
    check_range("inflationRate", settings.inflation_rate, -0.5, 1.0)?;
    check_range("borrowingRate", settings.borrowing_rate, 0.0, 1.0)?;
    check_range("ssaStartAge", settings.ssa_start_age as f64, 62.0, 70.0)?;
    check_amount("annualRetirementExpense", settings.annual_retirement_expense)?;
    Ok(())
}

/// Strict checks for request payloads. Prerequisites (birth year, settings) are not
/// checked here; the engine reports those in-band.
pub fn validate_inputs(inputs: &ProjectionInputs) -> Result<(), InputError> {
    let household = &inputs.household;
    if let Some(birth_year) = household.birth_year {
        check_range("birthYear", birth_year as f64, MIN_YEAR as f64, MAX_YEAR as f64)?;
    }
    check_range(
        "lifeExpectancy",
        household.life_expectancy as f64,
        1.0,
        MAX_AGE as f64,
    )?;
    if let Some(birth_year) = household.spouse_birth_year {
        check_range(
            "spouseBirthYear",
            birth_year as f64,
            MIN_YEAR as f64,
            MAX_YEAR as f64,
        )?;
    }
    if let Some(life_expectancy) = household.spouse_life_expectancy {
        check_range(
            "spouseLifeExpectancy",
            life_expectancy as f64,
            1.0,
            MAX_AGE as f64,
        )?;
    }

    if let Some(settings) = &inputs.settings {
        validate_settings(settings)?;

        if let Some(birth_year) = household.birth_year {
            let current_age = settings.current_year.saturating_sub(birth_year).max(0) as u32;
            let life_expectancy = inputs.household.life_expectancy;
            if life_expectancy < current_age && inputs.household.spouse().is_none() {
                return Err(InputError::HorizonBeforeStart {
                    life_expectancy,
                    current_age,
                });
            }
            let retirement_age = settings.resolved_retirement_age(current_age);
            if retirement_age > life_expectancy {
                return Err(InputError::RetirementAfterHorizon {
                    retirement_age,
                    life_expectancy,
                });
            }
        }
    }

    if household.include_spouse && household.spouse_birth_year.is_none() {
        return Err(InputError::MissingSpouseBirthYear);
    }
    check_amount("annualIncome", household.annual_income)?;
    check_amount("spouseAnnualIncome", household.spouse_annual_income)?;
    if let Some(benefit) = household.ssa_benefit {
        check_amount("ssaBenefit", benefit)?;
    }
    if let Some(benefit) = household.spouse_ssa_benefit {
        check_amount("spouseSsaBenefit", benefit)?;
    }

    for account in &inputs.accounts {
        check_amount(format!("account '{}' balance", account.name), account.balance)?;
        check_amount(
            format!("account '{}' annualContribution", account.name),
            account.annual_contribution,
        )?;
        if let Some(basis) = account.cost_basis {
            check_amount(format!("account '{}' costBasis", account.name), basis)?;
        }
    }
    for expense in &inputs.expenses {
        check_amount(
            format!("expense '{}' amountBefore65", expense.name),
            expense.amount_before_65,
        )?;
        check_amount(
            format!("expense '{}' amountAfter65", expense.name),
            expense.amount_after_65,
        )?;
    }
    for income in &inputs.other_income {
        check_amount(
            format!("income '{}' annualAmount", income.name),
            income.annual_amount,
        )?;
        if let (Some(start), Some(end)) = (income.start_year, income.end_year) {
            if start > end {
                return Err(InputError::InvertedIncomeWindow {
                    name: income.name.clone(),
                    start,
                    end,
                });
            }
        }
    }
    for special in &inputs.special_expenses {
        check_amount(format!("special expense '{}'", special.name), special.amount)?;
    }
    Ok(())
}

pub fn validate_grid(grid: &SweepGrid) -> Result<(), InputError> {
    let cells = grid.retirement_ages.len() * grid.pre_retirement_growth_rates.len();
    if cells == 0 {
        return Err(InputError::EmptyGrid);
    }
    if cells > MAX_GRID_CELLS {
        return Err(InputError::GridTooLarge {
            cells,
            max: MAX_GRID_CELLS,
        });
    }
    for age in &grid.retirement_ages {
        check_range("retirementAges", *age as f64, 30.0, 100.0)?;
    }
    for rate in &grid.pre_retirement_growth_rates {
        check_range("preRetirementGrowthRates", *rate, -1.0, 1.0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Account, AccountType, Household, OtherIncome, Owner};

    fn valid_inputs() -> ProjectionInputs {
        ProjectionInputs {
            household: Household {
                birth_year: Some(1970),
                life_expectancy: 90,
                ..Household::default()
            },
            settings: Some(CalculatorSettings {
                current_year: 2025,
                ..CalculatorSettings::default()
            }),
            accounts: vec![Account {
                name: "work".to_string(),
                owner: Owner::Primary,
                account_type: AccountType::K401,
                balance: 1_000.0,
                annual_contribution: 100.0,
                cost_basis: None,
            }],
            ..ProjectionInputs::default()
        }
    }

    #[test]
    fn accepts_reasonable_inputs() {
        assert_eq!(validate_inputs(&valid_inputs()), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_rates() {
        let mut inputs = valid_inputs();
        if let Some(settings) = inputs.settings.as_mut() {
            settings.income_tax_rate = 1.5;
        }
        let err = validate_inputs(&inputs).expect_err("must reject tax rate");
        assert!(err.to_string().contains("incomeTaxRate"));
    }

    #[test]
    fn rejects_inverted_income_window() {
        let mut inputs = valid_inputs();
        inputs.other_income.push(OtherIncome {
            name: "pension".to_string(),
            annual_amount: 10_000.0,
            start_year: Some(2040),
            end_year: Some(2030),
            inflation_adjusted: false,
        });
        assert!(matches!(
            validate_inputs(&inputs),
            Err(InputError::InvertedIncomeWindow { .. })
        ));
    }

    #[test]
    fn rejects_negative_balances_and_missing_spouse() {
        let mut inputs = valid_inputs();
        inputs.accounts[0].balance = -1.0;
        let err = validate_inputs(&inputs).expect_err("must reject balance");
        assert!(err.to_string().contains("work"));

        let mut inputs = valid_inputs();
        inputs.household.include_spouse = true;
        assert_eq!(
            validate_inputs(&inputs),
            Err(InputError::MissingSpouseBirthYear)
        );
    }

    #[test]
    fn rejects_retirement_after_horizon() {
        let mut inputs = valid_inputs();
        inputs.household.life_expectancy = 60;
        assert!(matches!(
            validate_inputs(&inputs),
            Err(InputError::RetirementAfterHorizon { .. })
        ));
    }

    fn out_of_range_field(inputs: &ProjectionInputs) -> &'static str {
        match validate_inputs(inputs) {
            Err(InputError::OutOfRange { field, .. }) => field,
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn rejects_extreme_years_and_ages() {
        let mut inputs = valid_inputs();
        if let Some(settings) = inputs.settings.as_mut() {
            settings.current_year = i32::MIN;
        }
        assert_eq!(out_of_range_field(&inputs), "currentYear");

        let mut inputs = valid_inputs();
        inputs.household.life_expectancy = u32::MAX;
        assert_eq!(out_of_range_field(&inputs), "lifeExpectancy");

        let mut inputs = valid_inputs();
        inputs.household.include_spouse = true;
        inputs.household.spouse_birth_year = Some(1972);
        inputs.household.spouse_life_expectancy = Some(u32::MAX);
        assert_eq!(out_of_range_field(&inputs), "spouseLifeExpectancy");

        let mut inputs = valid_inputs();
        if let Some(settings) = inputs.settings.as_mut() {
            settings.retirement_age = None;
            settings.years_to_retirement = Some(u32::MAX);
        }
        assert_eq!(out_of_range_field(&inputs), "yearsToRetirement");

        let mut inputs = valid_inputs();
        inputs.household.birth_year = Some(i32::MAX);
        assert_eq!(out_of_range_field(&inputs), "birthYear");
    }

    #[test]
    fn grid_limits_are_enforced() {
        let grid = SweepGrid {
            retirement_ages: vec![60, 65],
            pre_retirement_growth_rates: vec![0.05],
        };
        assert_eq!(validate_grid(&grid), Ok(()));

        let empty = SweepGrid {
            retirement_ages: Vec::new(),
            ..grid.clone()
        };
        assert_eq!(validate_grid(&empty), Err(InputError::EmptyGrid));

        let huge = SweepGrid {
            retirement_ages: (30..=100).collect(),
            pre_retirement_growth_rates: vec![0.01; 10],
        };
        assert!(matches!(
            validate_grid(&huge),
            Err(InputError::GridTooLarge { cells: 710, .. })
        ));

        let bad_rate = SweepGrid {
            pre_retirement_growth_rates: vec![f64::NAN],
            ..grid
        };
        assert!(validate_grid(&bad_rate).is_err());
    }
}
