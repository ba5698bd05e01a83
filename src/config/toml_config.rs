use crate::utils::error::{ReceiptError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
    pub thresholds: ThresholdConfig,
    pub ocr: OcrConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "Student Reimbursement Platform".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 上傳根目錄，其餘路徑皆相對於此
    pub upload_dir: String,
    pub receipts_dir: String,
    pub documents_dir: String,
    pub ledger_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
            receipts_dir: "receipts".to_string(),
            documents_dir: "student_documents".to_string(),
            ledger_file: "ledger.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            allowed_extensions: ["jpg", "jpeg", "png", "pdf"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// 綜合分數達到此值時請求轉為人工複審
    pub tampering_score: f64,
    pub ocr_confidence: f64,
    pub photo_max_age_days: i64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            tampering_score: 0.7,
            ocr_confidence: 0.6,
            photo_max_age_days: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,
    pub tesseract_cmd: String,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract_cmd: "tesseract".to_string(),
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: bool,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReceiptError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ReceiptError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ReceiptError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("storage.upload_dir", &self.storage.upload_dir)?;
        validation::validate_path("storage.receipts_dir", &self.storage.receipts_dir)?;
        validation::validate_path("storage.documents_dir", &self.storage.documents_dir)?;
        validation::validate_path("storage.ledger_file", &self.storage.ledger_file)?;

        validation::validate_positive_number("limits.max_file_size", self.limits.max_file_size, 1)?;
        if self.limits.allowed_extensions.is_empty() {
            return Err(ReceiptError::InvalidConfigValueError {
                field: "limits.allowed_extensions".to_string(),
                value: "[]".to_string(),
                reason: "At least one extension must be allowed".to_string(),
            });
        }

        validation::validate_range(
            "thresholds.tampering_score",
            self.thresholds.tampering_score,
            0.0,
            1.0,
        )?;
        validation::validate_range(
            "thresholds.ocr_confidence",
            self.thresholds.ocr_confidence,
            0.0,
            1.0,
        )?;
        validation::validate_positive_number(
            "thresholds.photo_max_age_days",
            self.thresholds.photo_max_age_days.max(0) as u64,
            1,
        )?;

        if self.ocr.enabled {
            for (field, value) in [
                ("ocr.tesseract_cmd", &self.ocr.tesseract_cmd),
                ("ocr.language", &self.ocr.language),
            ] {
                if value.trim().is_empty() {
                    return Err(ReceiptError::MissingConfigError {
                        field: field.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn upload_root(&self) -> PathBuf {
        PathBuf::from(&self.storage.upload_dir)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_platform_settings() {
        let config = AppConfig::default();
        assert_eq!(config.limits.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.thresholds.tampering_score, 0.7);
        assert_eq!(config.thresholds.ocr_confidence, 0.6);
        assert_eq!(config.storage.receipts_dir, "receipts");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[storage]
upload_dir = "/srv/reimbursements"

[thresholds]
tampering_score = 0.8
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.storage.upload_dir, "/srv/reimbursements");
        assert_eq!(config.storage.ledger_file, "ledger.json");
        assert_eq!(config.thresholds.tampering_score, 0.8);
        assert_eq!(config.thresholds.ocr_confidence, 0.6);
        assert!(config.ocr.enabled);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RG_TEST_UPLOAD_DIR", "/tmp/rg-uploads");

        let toml_content = r#"
[storage]
upload_dir = "${RG_TEST_UPLOAD_DIR}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.storage.upload_dir, "/tmp/rg-uploads");

        std::env::remove_var("RG_TEST_UPLOAD_DIR");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[thresholds]
ocr_confidence = 1.5
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let toml_content = r#"
[limits]
allowed_extensions = []
"#;
        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_enabled_ocr_needs_command() {
        let config = AppConfig::from_toml_str("[ocr]\ntesseract_cmd = \"  \"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ReceiptError::MissingConfigError { .. })
        ));

        let config =
            AppConfig::from_toml_str("[ocr]\nenabled = false\ntesseract_cmd = \"\"\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[service]
name = "file-test"

[ocr]
enabled = false
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.service.name, "file-test");
        assert!(!config.ocr.enabled);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default("/nonexistent/receipt-guard.toml").unwrap();
        assert_eq!(config.storage.upload_dir, "uploads");
    }
}
