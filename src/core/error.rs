use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("no tax-law table for {year} (published tables cover {earliest}-{latest})")]
    UnsupportedYear {
        year: i32,
        earliest: i32,
        latest: i32,
    },

    #[error("invalid inputs: {0}")]
    InvalidInputs(String),

    #[error("no RMD divisor for age {age}")]
    NoDivisorForAge { age: u32 },

    #[error("projection already completed")]
    ProjectionComplete,
}

pub type Result<T> = std::result::Result<T, ProjectionError>;

pub(crate) fn invalid(msg: impl Into<String>) -> ProjectionError {
    ProjectionError::InvalidInputs(msg.into())
}
