use receipt_guard::app::intake;
use receipt_guard::core::export;
use receipt_guard::domain::model::{DocumentType, NewStudent};
use receipt_guard::utils::error::ReceiptError;
use receipt_guard::{
    AppConfig, DisabledRecognizer, LedgerStore, LocalStorage, ReceiptPipeline, SubmissionRequest,
    ValidationEngine,
};
use std::io::Read;
use tempfile::TempDir;

fn setup() -> (TempDir, AppConfig) {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.storage.upload_dir = dir.path().join("data").to_string_lossy().to_string();
    config.ocr.enabled = false;
    (dir, config)
}

fn store(config: &AppConfig) -> LedgerStore<LocalStorage> {
    LedgerStore::new(
        LocalStorage::new(config.upload_root()),
        config.storage.ledger_file.clone(),
    )
}

async fn register(config: &AppConfig, email: &str, stpt_id: &str) -> anyhow::Result<u32> {
    let store = store(config);
    let mut ledger = store.load().await?;
    let student = ledger.register_student(NewStudent {
        name: "Maria Ionescu".to_string(),
        email: email.to_string(),
        iban: "RO49AAAA1B31007593840000".to_string(),
        stpt_id: stpt_id.to_string(),
    })?;
    store.save(&ledger).await?;
    Ok(student.student_id)
}

#[tokio::test]
async fn test_document_intake_copies_file_and_records_it() -> anyhow::Result<()> {
    let (dir, config) = setup();
    let student_id = register(&config, "maria@student.upt.ro", "123456").await?;

    let source = dir.path().join("card.png");
    std::fs::write(&source, b"png bytes of the STPT card")?;

    let store = store(&config);
    let document =
        intake::store_document(&store, &config, student_id, DocumentType::StptCard, &source).await?;

    assert_eq!(document.student_id, student_id);
    assert!(document
        .file_path
        .starts_with(&format!("student_documents/{}/", student_id)));
    let copied = config.upload_root().join(&document.file_path);
    assert_eq!(std::fs::read(copied)?, b"png bytes of the STPT card");

    let ledger = store.load().await?;
    let documents = ledger.documents_for(student_id);
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].document_type, DocumentType::StptCard);
    Ok(())
}

#[tokio::test]
async fn test_document_intake_requires_known_student() -> anyhow::Result<()> {
    let (dir, config) = setup();
    let source = dir.path().join("id.jpg");
    std::fs::write(&source, b"student id")?;

    let err = intake::store_document(&store(&config), &config, 7, DocumentType::StudentId, &source)
        .await
        .unwrap_err();
    assert!(matches!(err, ReceiptError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() -> anyhow::Result<()> {
    let (_dir, config) = setup();
    register(&config, "maria@student.upt.ro", "123456").await?;

    let err = register(&config, "MARIA@student.upt.ro", "654321")
        .await
        .unwrap_err();
    let err = err.downcast::<ReceiptError>()?;
    assert!(matches!(err, ReceiptError::Conflict { .. }));
    Ok(())
}

#[tokio::test]
async fn test_export_after_submissions() -> anyhow::Result<()> {
    let (dir, config) = setup();
    let student_id = register(&config, "maria@student.upt.ro", "123456").await?;

    for (name, body) in [("jan.jpg", "january pass"), ("feb.jpg", "february pass")] {
        let file = dir.path().join(name);
        std::fs::write(&file, body)?;
        let pipeline = ReceiptPipeline::new(
            store(&config),
            DisabledRecognizer,
            config.clone(),
            SubmissionRequest {
                file,
                student_id,
                comment: None,
                dry_run: false,
            },
        );
        ValidationEngine::new(pipeline).run().await?;
    }

    let store = store(&config);
    let ledger = store.load().await?;
    let count = export::export_reports(&ledger, store.storage(), "exports/reports.zip").await?;
    assert_eq!(count, 2);

    let zip_data = std::fs::read(config.upload_root().join("exports/reports.zip"))?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;
    let file_names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).map(|f| f.name().to_string()))
        .collect::<Result<_, _>>()?;
    assert!(file_names.contains(&export::CSV_ENTRY.to_string()));
    assert!(file_names.contains(&export::JSON_ENTRY.to_string()));

    let mut csv_content = String::new();
    archive
        .by_name(export::CSV_ENTRY)?
        .read_to_string(&mut csv_content)?;
    assert_eq!(csv_content.lines().count(), 3);
    assert!(csv_content.contains("medium_risk"));
    assert!(csv_content.contains("no_exif_data"));
    Ok(())
}
