//! Configuration models for optimizer settings and the service.

pub mod service;
pub mod settings;

pub use service::ServiceConfig;
pub use settings::{
    BoatScheduleSettings, MatchMatrixSettings, OptimizerSettings, SearchBudget, SettingsChoice,
};
