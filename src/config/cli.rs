use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "receipt-guard")]
#[command(about = "Fraud screening and review for student transport reimbursements")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "receipt-guard.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override monitoring setting from config
    #[arg(long, global = true)]
    pub monitor: Option<bool>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Manage registered students
    #[command(subcommand)]
    Student(StudentCommand),

    /// Attach a supporting document (student ID, STPT card, bank proof)
    Document(DocumentArgs),

    /// Submit a receipt for reimbursement
    Submit(SubmitArgs),

    /// List reimbursement requests
    Requests {
        #[arg(long)]
        status: Option<String>,
    },

    /// Approve, reject or flag a request
    Review {
        request_id: u32,
        #[arg(value_enum)]
        decision: DecisionArg,
    },

    /// Show the validation report of a receipt
    Report { receipt_id: String },

    /// Export review reports as a ZIP archive
    Export {
        #[arg(long, default_value = "exports/review_reports.zip")]
        output: String,
    },

    /// Show configuration and storage status
    Health,
}

#[derive(Debug, Clone, Subcommand)]
pub enum StudentCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        iban: String,
        #[arg(long)]
        stpt_id: String,
    },
    List,
}

#[derive(Debug, Clone, Args)]
pub struct DocumentArgs {
    #[arg(long)]
    pub student_id: u32,
    /// student-id, stpt-card or bank-proof
    #[arg(long = "type")]
    pub document_type: String,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct SubmitArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub student_id: u32,
    #[arg(long)]
    pub comment: Option<String>,
    /// Run every validation layer but persist nothing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionArg {
    Approve,
    Reject,
    Flag,
}

impl From<DecisionArg> for crate::domain::model::ReviewDecision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Approve => Self::Approve,
            DecisionArg::Reject => Self::Reject,
            DecisionArg::Flag => Self::Flag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit_command() {
        let cli = CliConfig::try_parse_from([
            "receipt-guard",
            "--verbose",
            "submit",
            "ticket.jpg",
            "--student-id",
            "4",
            "--dry-run",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Command::Submit(args) => {
                assert_eq!(args.student_id, 4);
                assert!(args.dry_run);
                assert_eq!(args.file, PathBuf::from("ticket.jpg"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_review_command() {
        let cli = CliConfig::try_parse_from(["receipt-guard", "review", "12", "flag"]).unwrap();
        match cli.command {
            Command::Review { request_id, decision } => {
                assert_eq!(request_id, 12);
                assert_eq!(decision, DecisionArg::Flag);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
