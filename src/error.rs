use thiserror::Error;

/// The only failure the pipeline surfaces to its caller. Network trouble,
/// rule faults and explanation failures all degrade to weaker signals
/// inside the assessment instead of erroring.
#[derive(Debug, Error)]
pub enum AssessError {
    #[error("invalid input URL: {0}")]
    InvalidInput(String),
}
