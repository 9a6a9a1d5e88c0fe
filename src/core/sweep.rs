use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use super::engine::{EVENT_ACCOUNTS_DEPLETED, check_prerequisites, try_run_projection};
use super::error::ProjectionError;
use super::types::{ProjectionDetail, ProjectionInputs};

#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    pub retirement_ages: Vec<u32>,
    pub pre_retirement_growth_rates: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub retirement_age: u32,
    pub pre_retirement_growth_rate: f64,
    pub years: usize,
    pub final_net_worth: f64,
    pub depletion_year: Option<i32>,
    pub lifetime_tax: f64,
    pub peak_debt: f64,
    pub cumulative_shortfall: f64,
}

impl ScenarioSummary {
    fn from_rows(retirement_age: u32, growth_rate: f64, rows: &[ProjectionDetail]) -> Self {
        Self {
            retirement_age,
            pre_retirement_growth_rate: growth_rate,
            years: rows.len(),
            final_net_worth: rows.last().map(|r| r.net_worth).unwrap_or(0.0),
            depletion_year: rows
                .iter()
                .find(|r| r.event.split(", ").any(|e| e == EVENT_ACCOUNTS_DEPLETED))
                .map(|r| r.year),
            lifetime_tax: rows.iter().map(|r| r.tax_paid).sum(),
            peak_debt: rows.iter().map(|r| r.debt_balance).fold(0.0, f64::max),
            cumulative_shortfall: rows.last().map(|r| r.cumulative_liability).unwrap_or(0.0),
        }
    }

    pub fn sustainable(&self) -> bool {
        self.depletion_year.is_none()
    }
}

/// Output order follows the grid: ages outer, rates inner.
pub fn run_sweep(
    inputs: &ProjectionInputs,
    grid: &SweepGrid,
) -> Result<Vec<ScenarioSummary>, ProjectionError> {
    check_prerequisites(inputs)?;

    let cells: Vec<(u32, f64)> = grid
        .retirement_ages
        .iter()
        .flat_map(|age| {
            grid.pre_retirement_growth_rates
                .iter()
                .map(move |rate| (*age, *rate))
        })
        .collect();
    info!(cells = cells.len(), "running scenario sweep");

    cells
        .par_iter()
        .map(|&(retirement_age, growth_rate)| {
            let mut scenario = inputs.clone();
            if let Some(settings) = scenario.settings.as_mut() {
                settings.retirement_age = Some(retirement_age);
                settings.pre_retirement_growth_rate = growth_rate;
            }
            let rows = try_run_projection(&scenario)?;
            Ok(ScenarioSummary::from_rows(retirement_age, growth_rate, &rows))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        Account, AccountType, CalculatorSettings, Expense, Household, Owner,
    };

    fn inputs() -> ProjectionInputs {
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
                balance: 250_000.0,
                annual_contribution: 20_000.0,
                cost_basis: None,
            }],
            expenses: vec![Expense {
                name: "living".to_string(),
                amount_before_65: 5_000.0,
                amount_after_65: 4_000.0,
            }],
            ..ProjectionInputs::default()
        }
    }

    fn grid() -> SweepGrid {
        SweepGrid {
            retirement_ages: vec![60, 65, 70],
            pre_retirement_growth_rates: vec![0.04, 0.08],
        }
    }

    #[test]
    fn sweep_covers_grid_in_order() {
        let summaries = run_sweep(&inputs(), &grid()).expect("sweep runs");
        let cells: Vec<(u32, f64)> = summaries
            .iter()
            .map(|s| (s.retirement_age, s.pre_retirement_growth_rate))
            .collect();
        assert_eq!(
            cells,
            vec![
                (60, 0.04),
                (60, 0.08),
                (65, 0.04),
                (65, 0.08),
                (70, 0.04),
                (70, 0.08)
            ]
        );
        assert!(summaries.iter().all(|s| s.years == 36));
    }

    #[test]
    fn later_retirement_and_higher_growth_leave_more_behind() {
        let summaries = run_sweep(&inputs(), &grid()).expect("sweep runs");
        let worth = |age: u32, rate: f64| {
            summaries
                .iter()
                .find(|s| s.retirement_age == age && s.pre_retirement_growth_rate == rate)
                .map(|s| s.final_net_worth - s.cumulative_shortfall)
                .expect("cell present")
        };
        assert!(worth(70, 0.08) > worth(60, 0.04));
        assert!(worth(65, 0.08) > worth(65, 0.04));
    }

    #[test]
    fn sweep_matches_direct_projection() {
        let summaries = run_sweep(&inputs(), &grid()).expect("sweep runs");
        let mut direct = inputs();
        if let Some(settings) = direct.settings.as_mut() {
            settings.retirement_age = Some(65);
            settings.pre_retirement_growth_rate = 0.08;
        }
        let rows = try_run_projection(&direct).expect("projection runs");
        let expected = ScenarioSummary::from_rows(65, 0.08, &rows);
        assert!(summaries.contains(&expected));
    }

    #[test]
    fn missing_birth_year_fails_whole_sweep() {
        let mut inputs = inputs();
        inputs.household.birth_year = None;
        assert_eq!(
            run_sweep(&inputs, &grid()),
            Err(ProjectionError::MissingBirthYear)
        );
    }

    #[test]
    fn empty_grid_yields_no_cells() {
        let grid = SweepGrid {
            retirement_ages: Vec::new(),
            pre_retirement_growth_rates: vec![0.05],
        };
        assert_eq!(run_sweep(&inputs(), &grid), Ok(Vec::new()));
    }
}
