pub mod receipt_pipeline;

pub use receipt_pipeline::{ReceiptPipeline, SubmissionRequest};
