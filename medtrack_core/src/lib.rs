#![forbid(unsafe_code)]

//! Core domain model and business logic for the medication refill tracker.
//!
//! This crate provides:
//! - Domain types (medications, dose records, status snapshots)
//! - Status calculation (supply, adherence, refill timing)
//! - Input validation
//! - Persistence (JSON medication store)
//! - CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod validation;
pub mod status;
pub mod store;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use status::{compute_status, generate_scheduled_doses, local_today, select_refill_candidates};
pub use store::{JsonFileStore, MedicationRepository, MemoryStore};
pub use export::{export_to_dir, format_display_date, write_csv};
