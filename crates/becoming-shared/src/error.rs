use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("weekly schedule must have exactly 7 entries, got {0}")]
    WrongLength(usize),

    #[error("invalid weekly schedule mask: {0:?}")]
    InvalidMask(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Malformed session token")]
    Malformed,

    #[error("Session expired")]
    Expired,

    #[error("Invalid session signature")]
    BadSignature,

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),
}
