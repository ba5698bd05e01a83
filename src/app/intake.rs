use crate::config::toml_config::AppConfig;
use crate::core::ledger::LedgerStore;
use crate::domain::model::{DocumentType, StudentDocument, StudentId};
use crate::domain::ports::Storage;
use crate::utils::error::{ReceiptError, Result};
use crate::utils::validation;
use std::path::Path;

/// 複製學生證明文件到 documents_dir/<student_id>/ 並登記到帳本
pub async fn store_document<S: Storage>(
    store: &LedgerStore<S>,
    config: &AppConfig,
    student_id: StudentId,
    document_type: DocumentType,
    source: &Path,
) -> Result<StudentDocument> {
    let metadata = tokio::fs::metadata(source)
        .await
        .map_err(|e| ReceiptError::FileRejected {
            path: source.display().to_string(),
            reason: format!("cannot read file: {}", e),
        })?;
    let extension = validation::validate_file_extension(source, &config.limits.allowed_extensions)?;
    validation::validate_file_size(source, metadata.len(), config.limits.max_file_size)?;

    let mut ledger = store.load().await?;
    ledger.student(student_id)?;

    let bytes = tokio::fs::read(source).await?;
    let relative_path = format!(
        "{}/{}/{}.{}",
        config.storage.documents_dir.trim_end_matches('/'),
        student_id,
        uuid::Uuid::new_v4(),
        extension
    );
    store.storage().write_file(&relative_path, &bytes).await?;

    let document = ledger.add_document(student_id, document_type, relative_path)?;
    store.save(&ledger).await?;

    tracing::info!(
        "📎 Stored {:?} for student {} at {}",
        document.document_type,
        student_id,
        document.file_path
    );
    Ok(document)
}
