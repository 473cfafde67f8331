pub mod config;
pub mod error;
pub mod fusion;
pub mod heuristics;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod reputation;

pub use config::Config;
pub use error::AssessError;
pub use model::{RiskAssessment, RiskBand};
pub use pipeline::{Analyzer, AssessmentStore, ExplanationGenerator, InMemoryStore};
