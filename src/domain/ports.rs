use crate::domain::model::{Submission, SubmissionOutcome, ValidationReport};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    fn delete_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// OCR 引擎介面
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image_path: &Path) -> Result<String>;
}

#[async_trait]
impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    async fn recognize(&self, image_path: &Path) -> Result<String> {
        (**self).recognize(image_path).await
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Submission>;
    async fn transform(&self, submission: Submission) -> Result<ValidationReport>;
    async fn load(&self, report: ValidationReport) -> Result<SubmissionOutcome>;
}
