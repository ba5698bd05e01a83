use crate::config::toml_config::AppConfig;
use crate::core::ledger::{Ledger, LedgerStore};
use crate::core::{exif, hash, ocr, risk};
use crate::domain::model::{
    ReceiptMetadata, Receipt, RequestStatus, StudentId, Submission, SubmissionAction,
    SubmissionOutcome, ValidationReport,
};
use crate::domain::ports::{Pipeline, Storage, TextRecognizer};
use crate::utils::error::{ReceiptError, Result};
use crate::utils::validation;
use chrono::{Datelike, Local, Utc};
use std::path::PathBuf;
use tokio::sync::Mutex;

/// 一次收據上傳的輸入
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub file: PathBuf,
    pub student_id: StudentId,
    pub comment: Option<String>,
    /// 只跑驗證，不寫入帳本
    pub dry_run: bool,
}

/// 收據驗證 Pipeline：extract 讀檔與基本檢查，transform 跑各層驗證，load 寫入帳本
pub struct ReceiptPipeline<S: Storage, R: TextRecognizer> {
    store: LedgerStore<S>,
    recognizer: R,
    config: AppConfig,
    request: SubmissionRequest,
    ledger: Mutex<Option<Ledger>>,
}

impl<S: Storage, R: TextRecognizer> ReceiptPipeline<S, R> {
    pub fn new(store: LedgerStore<S>, recognizer: R, config: AppConfig, request: SubmissionRequest) -> Self {
        Self {
            store,
            recognizer,
            config,
            request,
            ledger: Mutex::new(None),
        }
    }

    fn ledger_not_loaded(stage: &str) -> ReceiptError {
        ReceiptError::StageError {
            stage: stage.to_string(),
            details: "ledger was not loaded by the extract stage".to_string(),
        }
    }

    fn rejection_message(report: &ValidationReport) -> String {
        if report.integrity.fraud_suspected {
            "⚠️ FRAUD ALERT: This receipt was already submitted by another student!".to_string()
        } else {
            "⚠️ You already submitted this exact receipt before.".to_string()
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, R: TextRecognizer> Pipeline for ReceiptPipeline<S, R> {
    async fn extract(&self) -> Result<Submission> {
        let path = &self.request.file;
        tracing::debug!("Reading upload {}", path.display());

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ReceiptError::FileRejected {
                path: path.display().to_string(),
                reason: format!("cannot read file: {}", e),
            })?;
        if !metadata.is_file() {
            return Err(ReceiptError::FileRejected {
                path: path.display().to_string(),
                reason: "not a regular file".to_string(),
            });
        }

        let extension =
            validation::validate_file_extension(path, &self.config.limits.allowed_extensions)?;
        validation::validate_file_size(path, metadata.len(), self.config.limits.max_file_size)?;

        let ledger = self.store.load().await?;
        let student = ledger.student(self.request.student_id)?.clone();
        *self.ledger.lock().await = Some(ledger);

        let bytes = tokio::fs::read(path).await?;
        let original_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Submission {
            student,
            source_path: path.clone(),
            original_filename,
            extension,
            bytes,
            comment: self.request.comment.clone(),
        })
    }

    async fn transform(&self, submission: Submission) -> Result<ValidationReport> {
        let guard = self.ledger.lock().await;
        let ledger = guard
            .as_ref()
            .ok_or_else(|| Self::ledger_not_loaded("transform"))?;

        let student_id = submission.student.student_id;
        let integrity = hash::validate_file_integrity(ledger, &submission.bytes, student_id);
        drop(guard);

        let mut report = ValidationReport {
            student_id,
            original_filename: submission.original_filename.clone(),
            extension: submission.extension.clone(),
            file_size: submission.bytes.len() as u64,
            integrity,
            exif: None,
            ocr: None,
            risk: None,
            comment: submission.comment.clone(),
            bytes: Vec::new(),
        };

        if report.integrity.is_rejected() {
            tracing::warn!("⛔ Layer 1 rejected {}", report.original_filename);
            return Ok(report);
        }
        tracing::debug!("✅ Layer 1 passed ({})", report.integrity.sha256_hash);

        let thresholds = &self.config.thresholds;
        let exif_analysis = exif::analyze_bytes(
            &submission.bytes,
            Local::now().naive_local(),
            thresholds.photo_max_age_days,
        );
        tracing::debug!(
            "Layer 2: {:.2} ({}) flags={:?}",
            exif_analysis.risk_score,
            exif_analysis.assessment,
            exif_analysis.flags
        );

        let ocr_analysis = if self.config.ocr.enabled {
            let analysis = ocr::analyze_receipt(
                &self.recognizer,
                &submission.source_path,
                Some(submission.student.stpt_id.as_str()),
                thresholds.ocr_confidence,
            )
            .await;
            tracing::debug!(
                "Layer 3: {:.2} flags={:?}",
                analysis.risk_score,
                analysis.flags
            );
            Some(analysis)
        } else {
            tracing::debug!("Layer 3 skipped (OCR disabled)");
            None
        };

        let combined = risk::combine(&report.integrity, &exif_analysis, ocr_analysis.as_ref());

        report.exif = Some(exif_analysis);
        report.ocr = ocr_analysis;
        report.risk = Some(combined);
        report.bytes = submission.bytes;
        Ok(report)
    }

    async fn load(&self, mut report: ValidationReport) -> Result<SubmissionOutcome> {
        if report.integrity.is_rejected() {
            return Ok(SubmissionOutcome {
                action: SubmissionAction::Rejected,
                message: Self::rejection_message(&report),
                request_id: None,
                request_status: None,
                receipt_id: None,
                file_location: None,
                report,
            });
        }

        let (exif_analysis, combined) = match (&report.exif, &report.risk) {
            (Some(exif_analysis), Some(combined)) => (exif_analysis.clone(), combined.clone()),
            _ => {
                return Err(ReceiptError::StageError {
                    stage: "load".to_string(),
                    details: "validation report is missing layer results".to_string(),
                })
            }
        };

        if self.request.dry_run {
            return Ok(SubmissionOutcome {
                action: SubmissionAction::Scanned,
                message: format!(
                    "🔍 Scan complete: tampering score {:.2} ({}), nothing saved",
                    combined.tampering_score, combined.assessment
                ),
                request_id: None,
                request_status: None,
                receipt_id: None,
                file_location: None,
                report,
            });
        }

        let mut guard = self.ledger.lock().await;
        let ledger = guard
            .as_mut()
            .ok_or_else(|| Self::ledger_not_loaded("load"))?;

        let receipt_id = uuid::Uuid::new_v4().to_string();
        let file_location = format!(
            "{}/{}/{}.{}",
            self.config.storage.receipts_dir.trim_end_matches('/'),
            Utc::now().year(),
            receipt_id,
            report.extension
        );
        let status = if combined.tampering_score >= self.config.thresholds.tampering_score {
            RequestStatus::UnderReview
        } else {
            RequestStatus::Pending
        };
        // 帳本變更先在副本上完成，檔案與帳本都寫成功才提交
        let mut staged = ledger.clone();
        let request = staged.open_request(report.student_id, report.comment.clone(), status)?;

        staged.record_receipt(Receipt {
            receipt_id: receipt_id.clone(),
            student_id: report.student_id,
            request_id: request.request_id,
            file_path: file_location.clone(),
            sha256_hash: report.integrity.sha256_hash.clone(),
        })?;

        let ocr_analysis = report.ocr.as_ref();
        staged.record_metadata(ReceiptMetadata {
            receipt_id: receipt_id.clone(),
            exif_status: exif_analysis.exif_status,
            has_editing_software: exif_analysis.has_editing_software,
            editing_software: exif_analysis.editing_software,
            is_mobile_camera: exif_analysis.is_mobile_camera,
            camera_model: exif_analysis.camera_model,
            photo_age_days: exif_analysis.photo_age_days,
            has_exif_inconsistencies: exif_analysis.has_inconsistencies,
            exif_flags: exif_analysis.flags,
            layer2_risk_score: exif_analysis.risk_score,
            extracted_receipt_id: ocr_analysis.and_then(|o| o.receipt_id.clone()),
            extracted_stpt_id: ocr_analysis.and_then(|o| o.stpt_id.clone()),
            ocr_confidence: ocr_analysis.map_or(0.0, |o| o.average_confidence),
            ocr_flags: ocr_analysis.map(|o| o.flags.clone()).unwrap_or_default(),
            layer3_risk_score: ocr_analysis.map_or(0.0, |o| o.risk_score),
            tampering_score: combined.tampering_score,
            assessment: combined.assessment,
            risk_factors: combined.risk_factors.clone(),
            created_at: Utc::now(),
        })?;

        let bytes = std::mem::take(&mut report.bytes);
        let storage = self.store.storage();
        storage.write_file(&file_location, &bytes).await?;

        if let Err(e) = self.store.save(&staged).await {
            tracing::error!("❌ Ledger save failed, removing {}", file_location);
            if let Err(cleanup) = storage.delete_file(&file_location).await {
                tracing::warn!("⚠️ Could not remove {}: {}", file_location, cleanup);
            }
            return Err(e);
        }
        *ledger = staged;

        let message = match status {
            RequestStatus::UnderReview => format!(
                "🚩 Receipt saved but flagged for manual review (score {:.2})",
                combined.tampering_score
            ),
            _ => "✅ Receipt passed validation and was saved".to_string(),
        };

        Ok(SubmissionOutcome {
            action: SubmissionAction::Saved,
            message,
            request_id: Some(request.request_id),
            request_status: Some(status),
            receipt_id: Some(receipt_id),
            file_location: Some(file_location),
            report,
        })
    }
}
