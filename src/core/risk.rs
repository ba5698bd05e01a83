//! Layer 5: combined tampering score.

use crate::domain::model::{Assessment, ExifAnalysis, IntegrityCheck, OcrAnalysis, RiskAssessment};
use serde_json::json;

const FRAUD_RISK: f64 = 0.9;
const DUPLICATE_RISK: f64 = 0.3;

/// 各層風險相加後封頂 1.0
pub fn combine(
    integrity: &IntegrityCheck,
    exif: &ExifAnalysis,
    ocr: Option<&OcrAnalysis>,
) -> RiskAssessment {
    let mut total_risk = exif.risk_score;

    if integrity.fraud_suspected {
        total_risk += FRAUD_RISK;
    } else if integrity.is_duplicate {
        total_risk += DUPLICATE_RISK;
    }

    total_risk += ocr.map_or(0.0, |o| o.risk_score);

    let tampering_score = total_risk.clamp(0.0, 1.0);
    let assessment = Assessment::from_score(tampering_score);

    let layer3 = match ocr {
        Some(o) => json!({
            "risk_score": o.risk_score,
            "flags": o.flags,
            "stpt_id": o.stpt_id,
            "receipt_id": o.receipt_id,
            "average_confidence": o.average_confidence,
        }),
        None => json!(null),
    };

    let risk_factors = json!({
        "layer1": {
            "fraud_detected": integrity.fraud_suspected,
            "duplicate_detected": integrity.is_duplicate,
        },
        "layer2": {
            "risk_score": exif.risk_score,
            "flags": exif.flags,
            "has_editing_software": exif.has_editing_software,
            "editing_software": exif.editing_software,
        },
        "layer3": layer3,
        "total_risk": tampering_score,
        "assessment": assessment,
    });

    RiskAssessment {
        tampering_score,
        assessment,
        risk_factors,
    }
}
