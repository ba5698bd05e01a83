//! Layer 3: OCR & semantic checks.

use crate::domain::model::OcrAnalysis;
use crate::domain::ports::TextRecognizer;
use regex::{Regex, RegexBuilder};
use std::path::Path;
use std::sync::LazyLock;

const ID_SUFFIX: &str = r"\s*[:\-]?\s*";

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("invalid built-in OCR pattern {}: {}", pattern, e))
}

/// (pattern, confidence)；依序比對，先中先用
static STPT_PATTERNS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    [
        (r"SERIE\s*CARD", 0.9),
        (r"CARD\s*ID", 0.7),
        (r"CARD\s*NO", 0.7),
        (r"STPT\s*ID", 0.7),
        (r"STPT\s*CARD", 0.7),
    ]
    .iter()
    .map(|(label, confidence)| {
        (
            case_insensitive(&format!(r"{}{}(\d{{6,10}})", label, ID_SUFFIX)),
            *confidence,
        )
    })
    .collect()
});

static RECEIPT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let mut patterns = vec![case_insensitive(r"(TR\d{14})")];
    patterns.extend(["RECEIPT", "TRANSACTION", "REF"].iter().map(|label| {
        case_insensitive(&format!(r"{}{}([A-Z0-9\-]{{8,20}})", label, ID_SUFFIX))
    }));
    patterns
});

const RECEIPT_ID_CONFIDENCE: f64 = 0.8;

/// 從收據文字擷取 STPT 卡號，例如 "SERIE CARD:555845"
pub fn extract_stpt_id(text: &str) -> Option<(String, f64)> {
    STPT_PATTERNS.iter().find_map(|(re, confidence)| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| (m.as_str().to_string(), *confidence))
    })
}

/// 擷取交易編號，例如 TR20250215001234、REC-123456
pub fn extract_receipt_id(text: &str) -> Option<(String, f64)> {
    RECEIPT_PATTERNS.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| (m.as_str().to_string(), RECEIPT_ID_CONFIDENCE))
    })
}

pub fn analyze_text(text: &str, expected_stpt_id: Option<&str>, min_confidence: f64) -> OcrAnalysis {
    let raw_text = text.trim();
    if raw_text.is_empty() {
        return OcrAnalysis {
            ocr_successful: false,
            raw_text: String::new(),
            stpt_id: None,
            stpt_id_confidence: 0.0,
            receipt_id: None,
            receipt_id_confidence: 0.0,
            average_confidence: 0.0,
            risk_score: 0.5,
            flags: vec!["ocr_failed".to_string()],
        };
    }

    let (stpt_id, stpt_confidence) = match extract_stpt_id(raw_text) {
        Some((id, confidence)) => (Some(id), confidence),
        None => (None, 0.0),
    };
    let (receipt_id, receipt_confidence) = match extract_receipt_id(raw_text) {
        Some((id, confidence)) => (Some(id), confidence),
        None => (None, 0.0),
    };

    let mut risk_score: f64 = 0.0;
    let mut flags = Vec::new();

    match &stpt_id {
        None => {
            risk_score += 0.4;
            flags.push("stpt_id_not_found".to_string());
        }
        Some(found) => {
            if stpt_confidence < 0.7 {
                risk_score += 0.2;
                flags.push("stpt_id_low_confidence".to_string());
            }
            if let Some(expected) = expected_stpt_id {
                if found != expected {
                    tracing::warn!(
                        "🪪 Receipt card {} does not match registered card {}",
                        found,
                        expected
                    );
                    risk_score += 0.4;
                    flags.push("stpt_id_mismatch".to_string());
                }
            }
        }
    }

    if receipt_id.is_none() {
        risk_score += 0.1;
        flags.push("receipt_id_not_found".to_string());
    }

    let average_confidence = if stpt_id.is_some() || receipt_id.is_some() {
        (stpt_confidence + receipt_confidence) / 2.0
    } else {
        0.0
    };

    if average_confidence < min_confidence {
        risk_score += 0.2;
        flags.push("low_ocr_quality".to_string());
    }

    OcrAnalysis {
        ocr_successful: true,
        raw_text: raw_text.to_string(),
        stpt_id,
        stpt_id_confidence: stpt_confidence,
        receipt_id,
        receipt_id_confidence: receipt_confidence,
        average_confidence,
        risk_score: risk_score.min(1.0),
        flags,
    }
}

/// 辨識失敗時記錄錯誤並視為空白文字
pub async fn analyze_receipt<R: TextRecognizer + ?Sized>(
    recognizer: &R,
    image_path: &Path,
    expected_stpt_id: Option<&str>,
    min_confidence: f64,
) -> OcrAnalysis {
    let text = match recognizer.recognize(image_path).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Error extracting text from {}: {}", image_path.display(), e);
            String::new()
        }
    };
    analyze_text(&text, expected_stpt_id, min_confidence)
}
