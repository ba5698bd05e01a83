use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("File rejected ({path}): {reason}")]
    FileRejected { path: String, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Request {request_id} cannot move from {from} to {to}")]
    InvalidTransition {
        request_id: u32,
        from: String,
        to: String,
    },

    #[error("OCR failed: {message}")]
    OcrError { message: String },

    #[error("Validation stage '{stage}' failed: {details}")]
    StageError { stage: String, details: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Workflow,
    External,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReceiptError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReceiptError::ConfigValidationError { .. }
            | ReceiptError::InvalidConfigValueError { .. }
            | ReceiptError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ReceiptError::FileRejected { .. } | ReceiptError::NotFound { .. } => {
                ErrorCategory::Input
            }
            ReceiptError::Conflict { .. }
            | ReceiptError::InvalidTransition { .. }
            | ReceiptError::StageError { .. } => ErrorCategory::Workflow,
            ReceiptError::OcrError { .. } => ErrorCategory::External,
            ReceiptError::ZipError(_)
            | ReceiptError::CsvError(_)
            | ReceiptError::IoError(_)
            | ReceiptError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReceiptError::OcrError { .. } => ErrorSeverity::Low,
            ReceiptError::FileRejected { .. }
            | ReceiptError::NotFound { .. }
            | ReceiptError::Conflict { .. }
            | ReceiptError::InvalidTransition { .. } => ErrorSeverity::Medium,
            ReceiptError::ConfigValidationError { .. }
            | ReceiptError::InvalidConfigValueError { .. }
            | ReceiptError::MissingConfigError { .. }
            | ReceiptError::StageError { .. }
            | ReceiptError::CsvError(_) => ErrorSeverity::High,
            ReceiptError::ZipError(_)
            | ReceiptError::IoError(_)
            | ReceiptError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ReceiptError::ConfigValidationError { field, .. }
            | ReceiptError::InvalidConfigValueError { field, .. } => {
                format!("Check the '{}' entry in the configuration file", field)
            }
            ReceiptError::MissingConfigError { field } => {
                format!("Add '{}' to the configuration file or environment", field)
            }
            ReceiptError::FileRejected { .. } => {
                "Upload a JPG, PNG or PDF receipt within the size limit".to_string()
            }
            ReceiptError::NotFound { entity, .. } => {
                format!("List existing {} records and retry with a valid id", entity)
            }
            ReceiptError::Conflict { .. } => {
                "Use different identifying details or update the existing record".to_string()
            }
            ReceiptError::InvalidTransition { .. } => {
                "Only pending or under-review requests can be reviewed".to_string()
            }
            ReceiptError::OcrError { .. } => {
                "Make sure tesseract is installed and on PATH, or disable OCR".to_string()
            }
            ReceiptError::StageError { .. } => {
                "Re-run with --verbose to see which validation layer failed".to_string()
            }
            ReceiptError::ZipError(_) | ReceiptError::CsvError(_) => {
                "Check free disk space and the export output path".to_string()
            }
            ReceiptError::IoError(_) => {
                "Check that the upload and data directories exist and are writable".to_string()
            }
            ReceiptError::SerializationError(_) => {
                "The ledger file may be corrupted; restore it from a backup".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Invalid input: {}", self),
            ErrorCategory::Workflow => format!("Operation not allowed: {}", self),
            ErrorCategory::External => format!("External tool problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        ReceiptError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReceiptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_maps_by_category() {
        let err = ReceiptError::not_found("student", 7);
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.to_string(), "student not found: 7");

        let io = ReceiptError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_user_friendly_message_includes_cause() {
        let err = ReceiptError::InvalidTransition {
            request_id: 3,
            from: "approved".to_string(),
            to: "rejected".to_string(),
        };
        let msg = err.user_friendly_message();
        assert!(msg.starts_with("Operation not allowed"));
        assert!(msg.contains("approved"));
    }
}
