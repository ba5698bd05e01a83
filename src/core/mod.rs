pub mod engine;
pub mod exif;
pub mod export;
pub mod hash;
pub mod ledger;
pub mod ocr;
pub mod risk;

pub use crate::domain::model::{Submission, SubmissionOutcome, ValidationReport};
pub use crate::domain::ports::{Pipeline, Storage, TextRecognizer};
pub use crate::utils::error::Result;
