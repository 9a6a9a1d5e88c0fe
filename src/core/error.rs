use thiserror::Error;

/// A prerequisite the caller must configure before any projection can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("cannot compute projection: configure birth year first")]
    MissingBirthYear,
    #[error("cannot compute projection: configure calculator settings first")]
    MissingSettings,
}

/// Rejected request payloads. The engine itself tolerates all of these by clamping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} must be a finite number >= 0")]
    NegativeAmount { field: String },
    #[error("other income '{name}' starts in {start} but ends in {end}")]
    InvertedIncomeWindow { name: String, start: i32, end: i32 },
    #[error("spouse birth year is required when the spouse is included")]
    MissingSpouseBirthYear,
    #[error("life expectancy {life_expectancy} is below the current age {current_age}")]
    HorizonBeforeStart { life_expectancy: u32, current_age: u32 },
    #[error("retirement age {retirement_age} exceeds life expectancy {life_expectancy}")]
    RetirementAfterHorizon {
        retirement_age: u32,
        life_expectancy: u32,
    },
    #[error("scenario grid needs at least one retirement age and one growth rate")]
    EmptyGrid,
    #[error("scenario grid has {cells} cells; at most {max} are allowed")]
    GridTooLarge { cells: usize, max: usize },
}
