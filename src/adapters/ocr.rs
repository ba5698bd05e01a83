use crate::config::toml_config::OcrConfig;
use crate::domain::ports::TextRecognizer;
use crate::utils::error::{ReceiptError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// 呼叫外部 tesseract 執行檔做文字辨識
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    command: String,
    language: String,
}

impl TesseractRecognizer {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.tesseract_cmd.clone(), config.language.clone())
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image_path: &Path) -> Result<String> {
        tracing::debug!(
            "Running {} on {} (lang={})",
            self.command,
            image_path.display(),
            self.language
        );

        let output = Command::new(&self.command)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await
            .map_err(|e| ReceiptError::OcrError {
                message: format!("cannot start '{}': {}", self.command, e),
            })?;

        if !output.status.success() {
            return Err(ReceiptError::OcrError {
                message: format!(
                    "'{}' exited with {}: {}",
                    self.command,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// OCR 停用時使用，永遠回傳空字串
#[derive(Debug, Clone, Default)]
pub struct DisabledRecognizer;

#[async_trait]
impl TextRecognizer for DisabledRecognizer {
    async fn recognize(&self, _image_path: &Path) -> Result<String> {
        Ok(String::new())
    }
}

/// 依配置選擇 OCR 引擎
pub fn recognizer_from_config(config: &OcrConfig) -> Box<dyn TextRecognizer> {
    if config.enabled {
        Box::new(TesseractRecognizer::from_config(config))
    } else {
        tracing::info!("OCR disabled, Layer 3 will be skipped");
        Box::new(DisabledRecognizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_ocr_error() {
        let recognizer = TesseractRecognizer::new("definitely-not-tesseract-xyz", "eng");
        let err = recognizer
            .recognize(Path::new("receipt.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReceiptError::OcrError { .. }));
    }

    #[tokio::test]
    async fn test_disabled_recognizer_returns_empty_text() {
        let text = DisabledRecognizer.recognize(Path::new("x.png")).await.unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_config_selects_disabled_recognizer() {
        let config = OcrConfig {
            enabled: false,
            ..OcrConfig::default()
        };
        let recognizer = recognizer_from_config(&config);
        let text = recognizer.recognize(Path::new("x.png")).await.unwrap();
        assert!(text.is_empty());
    }
}
