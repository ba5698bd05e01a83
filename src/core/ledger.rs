//! 報銷帳本：學生、文件、請求、收據與驗證結果的持久化狀態。
//!
//! 帳本整份存成一個 JSON 檔，透過 [`Storage`] 讀寫；
//! 所有寫入都先在記憶體中完成檢查，再由 [`LedgerStore::save`] 落盤。

use crate::domain::model::{
    DocumentType, NewStudent, Receipt, ReceiptMetadata, Request, RequestId, RequestStatus,
    ReviewDecision, Student, StudentDocument, StudentId,
};
use crate::domain::ports::Storage;
use crate::utils::error::{ReceiptError, Result};
use crate::utils::validation;
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ledger {
    next_student_id: StudentId,
    next_request_id: RequestId,
    students: Vec<Student>,
    documents: Vec<StudentDocument>,
    requests: Vec<Request>,
    receipts: Vec<Receipt>,
    metadata: Vec<ReceiptMetadata>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_student(&mut self, new: NewStudent) -> Result<Student> {
        validation::validate_non_empty_string("student.name", &new.name)?;
        validation::validate_email("student.email", &new.email)?;
        validation::validate_iban("student.iban", &new.iban)?;
        let stpt_id = new.stpt_id.trim().to_string();
        if stpt_id.is_empty() || !stpt_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ReceiptError::InvalidConfigValueError {
                field: "student.stpt_id".to_string(),
                value: new.stpt_id.clone(),
                reason: "STPT card id must be numeric".to_string(),
            });
        }

        let email = new.email.trim().to_ascii_lowercase();
        if self.students.iter().any(|s| s.email == email) {
            return Err(ReceiptError::Conflict {
                message: format!("email {} is already registered", email),
            });
        }
        if self.students.iter().any(|s| s.stpt_id == stpt_id) {
            return Err(ReceiptError::Conflict {
                message: format!("STPT card {} belongs to another student", stpt_id),
            });
        }

        self.next_student_id += 1;
        let student = Student {
            student_id: self.next_student_id,
            name: new.name.trim().to_string(),
            email,
            iban: new.iban.split_whitespace().collect(),
            stpt_id,
        };
        tracing::info!(
            "👤 Registered student {} ({})",
            student.student_id,
            student.email
        );
        self.students.push(student.clone());
        Ok(student)
    }

    pub fn student(&self, student_id: StudentId) -> Result<&Student> {
        self.students
            .iter()
            .find(|s| s.student_id == student_id)
            .ok_or_else(|| ReceiptError::not_found("student", student_id))
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn add_document(
        &mut self,
        student_id: StudentId,
        document_type: DocumentType,
        file_path: String,
    ) -> Result<StudentDocument> {
        self.student(student_id)?;

        let document = StudentDocument {
            document_id: uuid::Uuid::new_v4().to_string(),
            student_id,
            document_type,
            file_path,
            uploaded_at: Utc::now(),
        };
        self.documents.push(document.clone());
        Ok(document)
    }

    pub fn documents_for(&self, student_id: StudentId) -> Vec<&StudentDocument> {
        self.documents
            .iter()
            .filter(|d| d.student_id == student_id)
            .collect()
    }

    pub fn open_request(
        &mut self,
        student_id: StudentId,
        comment: Option<String>,
        status: RequestStatus,
    ) -> Result<Request> {
        self.student(student_id)?;

        self.next_request_id += 1;
        let request = Request {
            request_id: self.next_request_id,
            student_id,
            comment,
            status,
            submit_timestamp: Utc::now(),
            review_timestamp: None,
        };
        self.requests.push(request.clone());
        Ok(request)
    }

    pub fn request(&self, request_id: RequestId) -> Result<&Request> {
        self.requests
            .iter()
            .find(|r| r.request_id == request_id)
            .ok_or_else(|| ReceiptError::not_found("request", request_id))
    }

    pub fn requests(&self, status: Option<RequestStatus>) -> Vec<&Request> {
        self.requests
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect()
    }

    /// 審核狀態轉換：
    /// - Approve / Reject：pending 或 under_review 皆可
    /// - Flag：只能從 pending
    pub fn review(&mut self, request_id: RequestId, decision: ReviewDecision) -> Result<Request> {
        let request = self
            .requests
            .iter_mut()
            .find(|r| r.request_id == request_id)
            .ok_or_else(|| ReceiptError::not_found("request", request_id))?;

        let target = decision.target_status();
        let allowed = match decision {
            ReviewDecision::Approve | ReviewDecision::Reject => matches!(
                request.status,
                RequestStatus::Pending | RequestStatus::UnderReview
            ),
            ReviewDecision::Flag => request.status == RequestStatus::Pending,
        };

        if !allowed {
            return Err(ReceiptError::InvalidTransition {
                request_id,
                from: request.status.to_string(),
                to: target.to_string(),
            });
        }

        request.status = target;
        if decision != ReviewDecision::Flag {
            request.review_timestamp = Some(Utc::now());
        }
        tracing::info!("📝 Request {} is now {}", request_id, target);
        Ok(request.clone())
    }

    pub fn record_receipt(&mut self, receipt: Receipt) -> Result<()> {
        let request = self.request(receipt.request_id)?;
        if request.student_id != receipt.student_id {
            return Err(ReceiptError::Conflict {
                message: format!(
                    "request {} belongs to student {}, not {}",
                    request.request_id, request.student_id, receipt.student_id
                ),
            });
        }
        if self.receipts.iter().any(|r| r.receipt_id == receipt.receipt_id) {
            return Err(ReceiptError::Conflict {
                message: format!("receipt {} already recorded", receipt.receipt_id),
            });
        }

        self.receipts.push(receipt);
        Ok(())
    }

    pub fn receipt(&self, receipt_id: &str) -> Result<&Receipt> {
        self.receipts
            .iter()
            .find(|r| r.receipt_id == receipt_id)
            .ok_or_else(|| ReceiptError::not_found("receipt", receipt_id))
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    pub fn receipts_for_request(&self, request_id: RequestId) -> Vec<&Receipt> {
        self.receipts
            .iter()
            .filter(|r| r.request_id == request_id)
            .collect()
    }

    pub fn receipts_with_hash<'a>(&'a self, sha256_hash: &'a str) -> impl Iterator<Item = &'a Receipt> {
        self.receipts
            .iter()
            .filter(move |r| r.sha256_hash == sha256_hash)
    }

    /// 每張收據只保留一筆驗證結果，重複寫入時覆蓋
    pub fn record_metadata(&mut self, metadata: ReceiptMetadata) -> Result<()> {
        self.receipt(&metadata.receipt_id)?;

        match self
            .metadata
            .iter_mut()
            .find(|m| m.receipt_id == metadata.receipt_id)
        {
            Some(existing) => *existing = metadata,
            None => self.metadata.push(metadata),
        }
        Ok(())
    }

    pub fn metadata_for(&self, receipt_id: &str) -> Option<&ReceiptMetadata> {
        self.metadata.iter().find(|m| m.receipt_id == receipt_id)
    }
}

/// 透過 [`Storage`] 讀寫帳本檔
pub struct LedgerStore<S: Storage> {
    storage: S,
    ledger_file: String,
}

impl<S: Storage> LedgerStore<S> {
    pub fn new(storage: S, ledger_file: impl Into<String>) -> Self {
        Self {
            storage,
            ledger_file: ledger_file.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// 帳本檔不存在時回傳空帳本
    pub async fn load(&self) -> Result<Ledger> {
        if !self.storage.exists(&self.ledger_file).await {
            tracing::debug!("Ledger {} not found, starting empty", self.ledger_file);
            return Ok(Ledger::new());
        }

        let data = self.storage.read_file(&self.ledger_file).await?;
        let ledger: Ledger = serde_json::from_slice(&data)?;
        tracing::debug!(
            "Loaded ledger: {} students, {} requests, {} receipts",
            ledger.students.len(),
            ledger.requests.len(),
            ledger.receipts.len()
        );
        Ok(ledger)
    }

    pub async fn save(&self, ledger: &Ledger) -> Result<()> {
        let data = serde_json::to_vec_pretty(ledger)?;
        self.storage.write_file(&self.ledger_file, &data).await?;
        tracing::debug!("💾 Ledger saved to {}", self.ledger_file);
        Ok(())
    }
}
