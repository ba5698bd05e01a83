// Adapters layer: concrete implementations for external systems (filesystem, OCR engine).

pub mod ocr;
pub mod storage;

pub use ocr::{recognizer_from_config, DisabledRecognizer, TesseractRecognizer};
pub use storage::LocalStorage;
