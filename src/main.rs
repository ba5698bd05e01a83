use clap::Parser;
use receipt_guard::adapters::recognizer_from_config;
use receipt_guard::app::intake;
use receipt_guard::config::cli::{Command, DocumentArgs, StudentCommand, SubmitArgs};
use receipt_guard::core::export;
use receipt_guard::domain::model::{DocumentType, NewStudent, RequestStatus, SubmissionAction};
use receipt_guard::domain::ports::Storage;
use receipt_guard::utils::error::{ErrorSeverity, ReceiptError};
use receipt_guard::utils::logger;
use receipt_guard::utils::validation::Validate;
use receipt_guard::{
    AppConfig, CliConfig, LedgerStore, LocalStorage, ReceiptPipeline, SubmissionRequest, ValidationEngine,
};
use serde::Serialize;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match AppConfig::load_or_default(&cli.config).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            tracing::error!("❌ Configuration validation failed: {}", e);
            exit_with(e);
        }
    };

    // 初始化日誌
    if cli.json_logs || config.monitoring.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting {} v{}", config.service.name, config.service.version);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(cli, config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        exit_with(e);
    }
}

async fn run(cli: CliConfig, config: AppConfig) -> receipt_guard::Result<()> {
    let storage = LocalStorage::new(config.upload_root());
    let store = LedgerStore::new(storage, config.storage.ledger_file.clone());
    let monitor_enabled = cli.monitor.unwrap_or_else(|| config.monitoring_enabled());

    match cli.command {
        Command::Student(StudentCommand::Add {
            name,
            email,
            iban,
            stpt_id,
        }) => {
            let mut ledger = store.load().await?;
            let student = ledger.register_student(NewStudent {
                name,
                email,
                iban,
                stpt_id,
            })?;
            store.save(&ledger).await?;
            tracing::info!("✅ Registered student {}", student.student_id);
            print_json(&student)?;
        }
        Command::Student(StudentCommand::List) => {
            let ledger = store.load().await?;
            print_json(&ledger.students())?;
        }
        Command::Document(DocumentArgs {
            student_id,
            document_type,
            file,
        }) => {
            let document_type = document_type
                .parse::<DocumentType>()
                .map_err(|reason| invalid_argument("type", &document_type, reason))?;
            let document = intake::store_document(&store, &config, student_id, document_type, &file).await?;
            print_json(&document)?;
        }
        Command::Submit(args) => submit(store, config, args, monitor_enabled).await?,
        Command::Requests { status } => {
            let status = status
                .map(|s| {
                    s.parse::<RequestStatus>()
                        .map_err(|reason| invalid_argument("status", &s, reason))
                })
                .transpose()?;
            let ledger = store.load().await?;
            print_json(&ledger.requests(status))?;
        }
        Command::Review { request_id, decision } => {
            let mut ledger = store.load().await?;
            let request = ledger.review(request_id, decision.into())?;
            store.save(&ledger).await?;
            tracing::info!("✅ Request {} is now {}", request.request_id, request.status);
            print_json(&request)?;
        }
        Command::Report { receipt_id } => {
            let ledger = store.load().await?;
            let receipt = ledger.receipt(&receipt_id)?;
            let metadata = ledger
                .metadata_for(&receipt_id)
                .ok_or_else(|| ReceiptError::not_found("receipt metadata", &receipt_id))?;
            print_json(&serde_json::json!({
                "receipt": receipt,
                "metadata": metadata,
            }))?;
        }
        Command::Export { output } => {
            let ledger = store.load().await?;
            let count = export::export_reports(&ledger, store.storage(), &output).await?;
            let location = store.storage().base_path().join(&output);
            tracing::info!("📁 Exported {} receipts to {}", count, location.display());
            println!("✅ Exported {} receipts", count);
            println!("📁 Output saved to: {}", location.display());
        }
        Command::Health => {
            let ledger_present = store.storage().exists(&config.storage.ledger_file).await;
            let ledger = store.load().await?;
            print_json(&serde_json::json!({
                "status": "healthy",
                "service": config.service.name,
                "version": config.service.version,
                "upload_root": config.upload_root(),
                "ledger_present": ledger_present,
                "students": ledger.students().len(),
                "requests": ledger.requests(None).len(),
                "receipts": ledger.receipts().len(),
                "ocr_enabled": config.ocr.enabled,
            }))?;
        }
    }

    Ok(())
}

async fn submit(
    store: LedgerStore<LocalStorage>,
    config: AppConfig,
    args: SubmitArgs,
    monitor_enabled: bool,
) -> receipt_guard::Result<()> {
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let recognizer = recognizer_from_config(&config.ocr);
    let request = SubmissionRequest {
        file: args.file,
        student_id: args.student_id,
        comment: args.comment,
        dry_run: args.dry_run,
    };
    let pipeline = ReceiptPipeline::new(store, recognizer, config, request);
    let engine = ValidationEngine::new_with_monitoring(pipeline, monitor_enabled);

    let outcome = engine.run().await?;
    match outcome.action {
        SubmissionAction::Rejected => eprintln!("{}", outcome.message),
        _ => println!("{}", outcome.message),
    }
    print_json(&outcome)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> receipt_guard::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn invalid_argument(field: &str, value: &str, reason: String) -> ReceiptError {
    ReceiptError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason,
    }
}

fn exit_with(e: ReceiptError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
