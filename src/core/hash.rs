//! Layer 1: file integrity and duplicate detection.

use crate::core::ledger::Ledger;
use crate::domain::model::{IntegrityCheck, StudentId};
use crate::utils::error::Result;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 4096;

pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for chunk in data.chunks(CHUNK_SIZE) {
        hasher.update(chunk);
    }
    hex::encode(hasher.finalize())
}

/// 分塊讀檔，避免大型 PDF 一次載入
pub fn compute_sha256_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// 同一學生是否已經交過同一份檔案
pub fn check_duplicate(ledger: &Ledger, file_hash: &str, student_id: StudentId) -> Option<String> {
    ledger
        .receipts_with_hash(file_hash)
        .find(|r| r.student_id == student_id)
        .map(|r| r.receipt_id.clone())
}

/// 其他學生是否交過同一份檔案
pub fn check_global_duplicate(
    ledger: &Ledger,
    file_hash: &str,
    student_id: StudentId,
) -> Option<StudentId> {
    ledger
        .receipts_with_hash(file_hash)
        .find(|r| r.student_id != student_id)
        .map(|r| r.student_id)
}

pub fn validate_file_integrity(ledger: &Ledger, data: &[u8], student_id: StudentId) -> IntegrityCheck {
    let sha256_hash = compute_sha256(data);

    let duplicate_receipt_id = check_duplicate(ledger, &sha256_hash, student_id);
    let other_student_id = check_global_duplicate(ledger, &sha256_hash, student_id);

    if let Some(other) = other_student_id {
        tracing::warn!(
            "🚨 Receipt {} from student {} was already submitted by student {}",
            &sha256_hash[..12],
            student_id,
            other
        );
    } else if let Some(existing) = &duplicate_receipt_id {
        tracing::warn!(
            "⚠️ Student {} resubmitted receipt {}",
            student_id,
            existing
        );
    }

    IntegrityCheck {
        is_duplicate: duplicate_receipt_id.is_some(),
        is_global_duplicate: other_student_id.is_some(),
        fraud_suspected: other_student_id.is_some(),
        sha256_hash,
        duplicate_receipt_id,
        other_student_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::tests::new_student;
    use crate::domain::model::{Receipt, RequestStatus};
    use std::io::Write;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn ledger_with_receipt(data: &[u8]) -> Ledger {
        let mut ledger = Ledger::new();
        let ana = ledger
            .register_student(new_student("Ana", "ana@upt.ro", "555845"))
            .unwrap();
        ledger
            .register_student(new_student("Bob", "bob@upt.ro", "555846"))
            .unwrap();
        let request = ledger
            .open_request(ana.student_id, None, RequestStatus::Pending)
            .unwrap();
        ledger
            .record_receipt(Receipt {
                receipt_id: "r-ana".to_string(),
                student_id: ana.student_id,
                request_id: request.request_id,
                file_path: "receipts/2025/r-ana.jpg".to_string(),
                sha256_hash: compute_sha256(data),
            })
            .unwrap();
        ledger
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(compute_sha256(b"abc"), ABC_SHA256);
    }

    #[test]
    fn test_file_hash_matches_memory_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();

        assert_eq!(compute_sha256_file(file.path()).unwrap(), compute_sha256(&data));
    }

    #[test]
    fn test_fresh_file_passes() {
        let ledger = ledger_with_receipt(b"ticket-1");
        let check = validate_file_integrity(&ledger, b"ticket-2", 1);

        assert!(!check.is_duplicate);
        assert!(!check.fraud_suspected);
        assert!(!check.is_rejected());
        assert_eq!(check.sha256_hash.len(), 64);
    }

    #[test]
    fn test_same_student_duplicate() {
        let ledger = ledger_with_receipt(b"ticket-1");
        let check = validate_file_integrity(&ledger, b"ticket-1", 1);

        assert!(check.is_duplicate);
        assert_eq!(check.duplicate_receipt_id.as_deref(), Some("r-ana"));
        assert!(!check.is_global_duplicate);
        assert!(!check.fraud_suspected);
        assert!(check.other_student_id.is_none());
    }

    #[test]
    fn test_cross_student_duplicate_is_fraud() {
        let ledger = ledger_with_receipt(b"ticket-1");
        let check = validate_file_integrity(&ledger, b"ticket-1", 2);

        assert!(!check.is_duplicate);
        assert!(check.is_global_duplicate);
        assert!(check.fraud_suspected);
        assert_eq!(check.other_student_id, Some(1));
    }
}
