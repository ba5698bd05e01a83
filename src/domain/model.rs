use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub type StudentId = u32;
pub type RequestId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: StudentId,
    pub name: String,
    pub email: String,
    pub iban: String,
    /// 學生登記的 STPT 交通卡序號
    pub stpt_id: String,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub iban: String,
    pub stpt_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    StudentId,
    StptCard,
    BankProof,
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "student_id" => Ok(DocumentType::StudentId),
            "stpt_card" => Ok(DocumentType::StptCard),
            "bank_proof" => Ok(DocumentType::BankProof),
            other => Err(format!("unknown document type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDocument {
    pub document_id: String,
    pub student_id: StudentId,
    pub document_type: DocumentType,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    UnderReview,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::UnderReview => "under_review",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "under_review" => Ok(RequestStatus::UnderReview),
            other => Err(format!("unknown request status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
    /// 標記為人工複審
    Flag,
}

impl ReviewDecision {
    pub fn target_status(&self) -> RequestStatus {
        match self {
            ReviewDecision::Approve => RequestStatus::Approved,
            ReviewDecision::Reject => RequestStatus::Rejected,
            ReviewDecision::Flag => RequestStatus::UnderReview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: RequestId,
    pub student_id: StudentId,
    pub comment: Option<String>,
    pub status: RequestStatus,
    pub submit_timestamp: DateTime<Utc>,
    pub review_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_id: String,
    pub student_id: StudentId,
    pub request_id: RequestId,
    /// 相對於上傳根目錄的路徑
    pub file_path: String,
    pub sha256_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptMetadata {
    pub receipt_id: String,

    // Layer 2: EXIF
    pub exif_status: ExifStatus,
    pub has_editing_software: bool,
    pub editing_software: Option<String>,
    pub is_mobile_camera: bool,
    pub camera_model: Option<String>,
    pub photo_age_days: Option<i64>,
    pub has_exif_inconsistencies: bool,
    pub exif_flags: Vec<String>,
    pub layer2_risk_score: f64,

    // Layer 3: OCR
    pub extracted_receipt_id: Option<String>,
    pub extracted_stpt_id: Option<String>,
    pub ocr_confidence: f64,
    pub ocr_flags: Vec<String>,
    pub layer3_risk_score: f64,

    // Layer 5: combined
    pub tampering_score: f64,
    pub assessment: Assessment,
    pub risk_factors: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExifStatus {
    Present,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    LowRisk,
    MediumRisk,
    HighRisk,
}

impl Assessment {
    /// >= 0.7 高風險，>= 0.4 中風險
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            Assessment::HighRisk
        } else if score >= 0.4 {
            Assessment::MediumRisk
        } else {
            Assessment::LowRisk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Assessment::LowRisk => "low_risk",
            Assessment::MediumRisk => "medium_risk",
            Assessment::HighRisk => "high_risk",
        }
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layer 1 結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityCheck {
    pub sha256_hash: String,
    pub is_duplicate: bool,
    pub duplicate_receipt_id: Option<String>,
    pub is_global_duplicate: bool,
    pub fraud_suspected: bool,
    pub other_student_id: Option<StudentId>,
}

impl IntegrityCheck {
    pub fn is_rejected(&self) -> bool {
        self.fraud_suspected || self.is_duplicate
    }
}

/// Layer 2 結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExifAnalysis {
    pub exif_status: ExifStatus,
    pub has_editing_software: bool,
    pub editing_software: Option<String>,
    pub is_mobile_camera: bool,
    pub camera_model: Option<String>,
    pub photo_age_days: Option<i64>,
    pub has_inconsistencies: bool,
    pub flags: Vec<String>,
    pub risk_score: f64,
    pub assessment: Assessment,
}

/// Layer 3 結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrAnalysis {
    pub ocr_successful: bool,
    pub raw_text: String,
    pub stpt_id: Option<String>,
    pub stpt_id_confidence: f64,
    pub receipt_id: Option<String>,
    pub receipt_id_confidence: f64,
    pub average_confidence: f64,
    pub risk_score: f64,
    pub flags: Vec<String>,
}

/// Layer 5 綜合風險
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tampering_score: f64,
    pub assessment: Assessment,
    pub risk_factors: serde_json::Value,
}

/// 已讀入記憶體、通過基本檢查的上傳檔案
#[derive(Debug, Clone)]
pub struct Submission {
    pub student: Student,
    pub source_path: PathBuf,
    pub original_filename: String,
    pub extension: String,
    pub bytes: Vec<u8>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub student_id: StudentId,
    pub original_filename: String,
    pub extension: String,
    pub file_size: u64,
    pub integrity: IntegrityCheck,
    pub exif: Option<ExifAnalysis>,
    pub ocr: Option<OcrAnalysis>,
    pub risk: Option<RiskAssessment>,
    #[serde(skip)]
    pub comment: Option<String>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionAction {
    Saved,
    Rejected,
    Scanned,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub action: SubmissionAction,
    pub message: String,
    pub request_id: Option<RequestId>,
    pub request_status: Option<RequestStatus>,
    pub receipt_id: Option<String>,
    pub file_location: Option<String>,
    pub report: ValidationReport,
}
