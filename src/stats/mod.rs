//! Stream statistics

pub mod metrics;

pub use metrics::{FpsCounter, RegistrySummary};
