//! Wiring between the data source, the event cache and the engine.

pub mod cross_check;
pub mod ensure;
pub mod orchestrator;

pub use cross_check::{compare_totals, CrossChecker, MonthlyComparison};
pub use ensure::{IngestionError, IngestionResult, Ingestor};
pub use orchestrator::{OrchestrationError, Orchestrator};
