pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{DisabledRecognizer, LocalStorage, TesseractRecognizer};
pub use app::pipelines::{ReceiptPipeline, SubmissionRequest};
pub use config::AppConfig;
pub use core::{engine::ValidationEngine, ledger::Ledger, ledger::LedgerStore};
pub use utils::error::{ReceiptError, Result};
