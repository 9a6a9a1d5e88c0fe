mod engine;
mod error;
mod growth;
mod solver;
mod ssa;
mod strategy;
mod sweep;
mod tax;
mod types;
mod validate;

pub use engine::{
    EVENT_ACCOUNTS_DEPLETED, EVENT_BORROWING, EVENT_PLANNER_DECEASED, EVENT_RETIREMENT,
    EVENT_SPOUSE_DECEASED, EVENT_SPOUSE_SSA_START, EVENT_SSA_START, check_prerequisites,
    run_projection, try_run_projection,
};
pub use error::{InputError, ProjectionError};
pub use growth::{DebtOutcome, DebtState, TaxableBasis, YearAdvance, advance_year, apply_shortfall};
pub use solver::{
    GrossUpSolution, GuaranteedIncome, SolveConfig, YearTax, solve_gross_withdrawal,
    tax_for_draws,
};
pub use ssa::{estimate_ssa, start_age_factor};
pub use strategy::{
    DrawSlot, SelectorState, WithdrawalPlan, choose_withdrawal_order, ranked_account_types,
};
pub use sweep::{ScenarioSummary, SweepGrid, run_sweep};
pub use tax::{
    TaxCalculator, capital_gains_tax, estimate_capital_gains_rate, estimate_marginal_rate,
    progressive_tax, resolve_filing_status, standard_deduction,
};
pub use types::{
    Account, AccountType, ByAccountType, CalculatorSettings, Expense, FilingStatus, Household,
    OtherIncome, Owner, ProjectionDetail, ProjectionInputs, SpecialExpense, TaxMode,
    WithdrawalStrategy,
};
pub use validate::{MAX_GRID_CELLS, validate_grid, validate_inputs, validate_settings};
