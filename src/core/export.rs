use crate::core::ledger::Ledger;
use crate::domain::model::{Receipt, ReceiptMetadata, Request};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const CSV_ENTRY: &str = "requests.csv";
pub const JSON_ENTRY: &str = "reports.json";

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    request_id: u32,
    student_id: u32,
    status: &'a str,
    submitted_at: String,
    receipt_id: &'a str,
    sha256_hash: &'a str,
    tampering_score: Option<f64>,
    assessment: Option<&'a str>,
    flags: String,
}

#[derive(Debug, Serialize)]
struct ReceiptReport<'a> {
    request: &'a Request,
    receipt: &'a Receipt,
    metadata: Option<&'a ReceiptMetadata>,
}

fn collect_reports(ledger: &Ledger) -> Vec<ReceiptReport<'_>> {
    let mut reports: Vec<ReceiptReport<'_>> = ledger
        .receipts()
        .iter()
        .filter_map(|receipt| {
            let request = ledger.request(receipt.request_id).ok()?;
            Some(ReceiptReport {
                request,
                receipt,
                metadata: ledger.metadata_for(&receipt.receipt_id),
            })
        })
        .collect();
    reports.sort_by_key(|r| r.request.request_id);
    reports
}

pub fn render_csv(ledger: &Ledger) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for report in collect_reports(ledger) {
        let flags = report
            .metadata
            .map(|m| {
                m.exif_flags
                    .iter()
                    .chain(m.ocr_flags.iter())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(";")
            })
            .unwrap_or_default();

        writer.serialize(ReportRow {
            request_id: report.request.request_id,
            student_id: report.request.student_id,
            status: report.request.status.as_str(),
            submitted_at: report.request.submit_timestamp.to_rfc3339(),
            receipt_id: &report.receipt.receipt_id,
            sha256_hash: &report.receipt.sha256_hash,
            tampering_score: report.metadata.map(|m| m.tampering_score),
            assessment: report.metadata.map(|m| m.assessment.as_str()),
            flags,
        })?;
    }

    let data = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// 打包成 ZIP：requests.csv + reports.json
pub fn build_archive(ledger: &Ledger) -> Result<Vec<u8>> {
    let csv_output = render_csv(ledger)?;
    let json_output = serde_json::to_string_pretty(&collect_reports(ledger))?;

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    zip.start_file::<_, ()>(CSV_ENTRY, FileOptions::default())?;
    zip.write_all(csv_output.as_bytes())?;

    zip.start_file::<_, ()>(JSON_ENTRY, FileOptions::default())?;
    zip.write_all(json_output.as_bytes())?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

pub async fn export_reports<S: Storage>(ledger: &Ledger, storage: &S, output_path: &str) -> Result<usize> {
    let archive = build_archive(ledger)?;
    tracing::debug!("Writing export ({} bytes) to {}", archive.len(), output_path);
    storage.write_file(output_path, &archive).await?;
    Ok(ledger.receipts().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::tests::{new_student, sample_metadata, MockStorage};
    use crate::domain::model::{Assessment, RequestStatus};
    use std::io::Read;

    fn populated_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        let ana = ledger
            .register_student(new_student("Ana", "ana@upt.ro", "555845"))
            .unwrap();
        for (idx, status) in [RequestStatus::Pending, RequestStatus::UnderReview]
            .into_iter()
            .enumerate()
        {
            let request = ledger.open_request(ana.student_id, None, status).unwrap();
            let receipt_id = format!("r-{}", idx);
            ledger
                .record_receipt(Receipt {
                    receipt_id: receipt_id.clone(),
                    student_id: ana.student_id,
                    request_id: request.request_id,
                    file_path: format!("receipts/2025/{}.jpg", receipt_id),
                    sha256_hash: format!("{:064}", idx),
                })
                .unwrap();
            let mut metadata = sample_metadata(&receipt_id);
            if status == RequestStatus::UnderReview {
                metadata.tampering_score = 0.85;
                metadata.assessment = Assessment::HighRisk;
                metadata.exif_flags = vec!["no_exif_data".to_string()];
                metadata.ocr_flags = vec!["stpt_id_mismatch".to_string()];
            }
            ledger.record_metadata(metadata).unwrap();
        }
        ledger
    }

    #[test]
    fn test_render_csv_rows() {
        let csv_output = render_csv(&populated_ledger()).unwrap();
        let lines: Vec<&str> = csv_output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("request_id,student_id,status"));
        assert!(lines[1].starts_with("1,1,pending"));
        assert!(lines[2].starts_with("2,1,under_review"));
        assert!(lines[2].contains("high_risk"));
        assert!(lines[2].contains("no_exif_data;stpt_id_mismatch"));
    }

    #[tokio::test]
    async fn test_export_archive_contents() {
        let ledger = populated_ledger();
        let storage = MockStorage::default();

        let count = export_reports(&ledger, &storage, "exports/reports.zip")
            .await
            .unwrap();
        assert_eq!(count, 2);

        let data = storage.read_file("exports/reports.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut json_text = String::new();
        archive
            .by_name(JSON_ENTRY)
            .unwrap()
            .read_to_string(&mut json_text)
            .unwrap();
        let reports: serde_json::Value = serde_json::from_str(&json_text).unwrap();
        assert_eq!(reports.as_array().unwrap().len(), 2);
        assert_eq!(reports[1]["metadata"]["assessment"], "high_risk");
        assert_eq!(reports[0]["request"]["status"], "pending");
    }

    #[test]
    fn test_empty_ledger_exports_empty_csv() {
        let csv_output = render_csv(&Ledger::new()).unwrap();
        // csv 在沒有任何列時不會輸出標頭
        assert!(csv_output.is_empty());
        assert!(build_archive(&Ledger::new()).is_ok());
    }
}
