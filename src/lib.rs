pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod report;

pub use config::Config;
pub use datasource::{DataSource, DataSourceError, GitHubDataSource, MockDataSource};
pub use db::{init_db, Repository};
pub use domain::{Login, Payment, SponsorshipAction, SponsorshipEvent, Tier};
pub use engine::{reconstruct_payments, ReconstructionError, ShortMonthPolicy};
pub use error::AppError;
