use crate::domain::model::SubmissionOutcome;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct ValidationEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ValidationEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<SubmissionOutcome> {
        tracing::info!("🚀 Starting receipt validation");

        // Extract
        let submission = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Loaded {} ({} bytes) for student {}",
            submission.original_filename,
            submission.bytes.len(),
            submission.student.student_id
        );
        self.monitor.log_stats("Extract");

        // Transform
        let report = self.pipeline.transform(submission).await?;
        match &report.risk {
            Some(risk) => tracing::info!(
                "🔎 Validation layers finished: score {:.2} ({})",
                risk.tampering_score,
                risk.assessment
            ),
            None => tracing::info!("🔎 Validation stopped at integrity check"),
        }
        self.monitor.log_stats("Transform");

        // Load
        let outcome = self.pipeline.load(report).await?;
        tracing::info!("💾 {}", outcome.message);
        self.monitor.log_final_stats();

        Ok(outcome)
    }
}
