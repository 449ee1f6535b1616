// src/lib.rs
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod evaluation;
pub mod transport;

pub use client::KycClient;
pub use config::KycConfig;
pub use errors::{KycError, Result};
pub use evaluation::{ApplicantFields, Evaluation, OowAnswer, OowResponses, SummaryResult};
