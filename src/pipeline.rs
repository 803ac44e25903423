//! Generation Pipeline
//!
//! Sequential orchestration of one run: documents, tickets, assembly,
//! generation, substitution, delivery. Every externally-backed stage is
//! caught at its own boundary and folded into a per-stage outcome, so the
//! run always finishes with an explanation of what each stage contributed.
//! All intermediate state is local to the run and threaded by parameter;
//! nothing is shared across runs.

use crate::assembly::{assemble_prompt, build_instruction};
use crate::config::LureConfig;
use crate::documents::load_documents;
use crate::provider::TextGenerator;
use crate::sink::{DeliveryRecord, ResultSink};
use crate::substitution::{LinkSubstitutor, SubstitutionOutcome};
use crate::tickets::{normalize, render_ticket_context, TicketSummary, TrackerClient};
use tracing::{error, info, warn};

/// Inputs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Recipient being addressed
    pub target: String,
    /// Purported sender, when impersonation is requested
    pub impersonate: Option<String>,
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Documents,
    Tickets,
    Assembly,
    Generation,
    Substitution,
    Delivery,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Documents => "documents",
            Stage::Tickets => "tickets",
            Stage::Assembly => "assembly",
            Stage::Generation => "generation",
            Stage::Substitution => "substitution",
            Stage::Delivery => "delivery",
        }
    }
}

/// What one stage contributed to the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    /// Stage ran and contributed; carries a short summary
    Completed(String),
    /// Stage had nothing to do or lacked configuration; carries the reason
    Skipped(String),
    /// Stage attempted work and failed; carries the reason
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
}

/// Full account of one pipeline run. Every stage appears exactly once.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub stages: Vec<StageReport>,
    pub final_text: Option<String>,
    pub ticket_count: usize,
}

impl RunReport {
    fn record(&mut self, stage: Stage, status: StageStatus) {
        self.stages.push(StageReport { stage, status });
    }

    /// True when generation produced text, regardless of degraded stages.
    pub fn produced_text(&self) -> bool {
        self.final_text.is_some()
    }
}

/// One-shot pipeline over borrowed collaborators.
pub struct Pipeline<'a> {
    config: &'a LureConfig,
    generator: &'a dyn TextGenerator,
    sink: Option<&'a dyn ResultSink>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a LureConfig,
        generator: &'a dyn TextGenerator,
        sink: Option<&'a dyn ResultSink>,
    ) -> Self {
        Self {
            config,
            generator,
            sink,
        }
    }

    pub async fn run(&self, request: &PipelineRequest) -> RunReport {
        let mut report = RunReport::default();

        // Documents
        let documents = load_documents(&self.config.context.prompts_dir, self.config.context.budget);
        if documents.is_empty() {
            report.record(
                Stage::Documents,
                StageStatus::Skipped("no fragment sources loaded".to_string()),
            );
        } else {
            report.record(
                Stage::Documents,
                StageStatus::Completed(format!(
                    "{} fragment(s), {} chars",
                    documents.fragments.len(),
                    documents.consumed_chars
                )),
            );
        }

        // Tickets
        let tickets = self.fetch_tickets(request, &mut report).await;
        report.ticket_count = tickets.len();

        // Assembly: the ticket block is always rebuilt from this run's
        // tickets so the request reflects current record state.
        let ticket_block = render_ticket_context(&tickets);
        let instruction = build_instruction(
            Some(request.target.as_str()),
            request.impersonate.as_deref(),
        );
        let prompt = assemble_prompt(&documents.rendered, &ticket_block, &instruction);
        report.record(
            Stage::Assembly,
            StageStatus::Completed(format!("prompt of {} chars", prompt.char_count())),
        );

        // Generation; on failure the tail of the pipeline is skipped.
        info!(target = %request.target, model = %self.generator.model_name(), "Generating email");
        let generated = match self.generator.generate(prompt.as_str()).await {
            Ok(text) => {
                report.record(
                    Stage::Generation,
                    StageStatus::Completed(format!("{} chars generated", text.chars().count())),
                );
                text
            }
            Err(e) => {
                error!(error = %e, "Generation failed");
                report.record(Stage::Generation, StageStatus::Failed(e.to_string()));
                let reason = "no generated text".to_string();
                report.record(Stage::Substitution, StageStatus::Skipped(reason.clone()));
                report.record(Stage::Delivery, StageStatus::Skipped(reason));
                return report;
            }
        };

        // Substitution
        let substitutor = LinkSubstitutor::new(self.config.minter.clone());
        let (final_text, outcome) = substitutor.substitute(&generated).await;
        let substitution_status = match &outcome {
            SubstitutionOutcome::Replaced { .. } | SubstitutionOutcome::MarkerAbsent => {
                StageStatus::Completed(outcome.describe())
            }
            _ => StageStatus::Skipped(outcome.describe()),
        };
        report.record(Stage::Substitution, substitution_status);

        // Delivery
        match self.sink {
            Some(sink) => {
                let record = DeliveryRecord {
                    text: &final_text,
                    target: &request.target,
                    ticket_count: report.ticket_count,
                };
                match sink.deliver(&record) {
                    Ok(description) => {
                        report.record(Stage::Delivery, StageStatus::Completed(description));
                    }
                    Err(e) => {
                        error!(error = %e, "Delivery failed");
                        report.record(Stage::Delivery, StageStatus::Failed(e.to_string()));
                    }
                }
            }
            None => {
                report.record(
                    Stage::Delivery,
                    StageStatus::Skipped("no sink configured".to_string()),
                );
            }
        }

        report.final_text = Some(final_text);
        report
    }

    async fn fetch_tickets(
        &self,
        request: &PipelineRequest,
        report: &mut RunReport,
    ) -> Vec<TicketSummary> {
        let client = match TrackerClient::new(&self.config.tracker) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Tracker not usable, continuing without ticket context");
                report.record(Stage::Tickets, StageStatus::Skipped(e.to_string()));
                return Vec::new();
            }
        };

        match client
            .active_issues_for(&request.target, self.config.tracker.max_results)
            .await
        {
            Ok(raw) => {
                let tickets: Vec<TicketSummary> = raw.iter().map(normalize).collect();
                info!(count = tickets.len(), target = %request.target, "Fetched active tickets");
                report.record(
                    Stage::Tickets,
                    StageStatus::Completed(format!("{} active ticket(s)", tickets.len())),
                );
                tickets
            }
            Err(e) => {
                warn!(error = %e, "Ticket fetch failed, continuing without ticket context");
                report.record(Stage::Tickets, StageStatus::Failed(e.to_string()));
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, SinkError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedGenerator {
        response: Option<String>,
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
            self.response
                .clone()
                .ok_or_else(|| BackendError::RequestFailed("backend down".to_string()))
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[derive(Default)]
    struct CapturingSink {
        delivered: Mutex<Option<String>>,
    }

    impl ResultSink for CapturingSink {
        fn deliver(&self, record: &DeliveryRecord<'_>) -> Result<String, SinkError> {
            *self.delivered.lock().unwrap() = Some(record.text.to_string());
            Ok("captured".to_string())
        }
    }

    fn test_config(prompts_dir: &TempDir) -> LureConfig {
        let mut config = LureConfig::default();
        config.context.prompts_dir = prompts_dir.path().to_path_buf();
        config
    }

    fn status_of(report: &RunReport, stage: Stage) -> &StageStatus {
        &report
            .stages
            .iter()
            .find(|s| s.stage == stage)
            .expect("stage missing from report")
            .status
    }

    #[tokio::test]
    async fn test_full_run_reports_every_stage_once() {
        let prompts = TempDir::new().unwrap();
        std::fs::write(prompts.path().join("org_context.txt"), "We ship software.").unwrap();

        let config = test_config(&prompts);
        let generator = FixedGenerator {
            response: Some("Hello, click LINK_HERE".to_string()),
        };
        let sink = CapturingSink::default();
        let pipeline = Pipeline::new(&config, &generator, Some(&sink));

        let report = pipeline
            .run(&PipelineRequest {
                target: "d.mau@example.com".to_string(),
                impersonate: None,
            })
            .await;

        assert_eq!(report.stages.len(), 6);
        let order: Vec<Stage> = report.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            order,
            vec![
                Stage::Documents,
                Stage::Tickets,
                Stage::Assembly,
                Stage::Generation,
                Stage::Substitution,
                Stage::Delivery
            ]
        );

        // Tracker has no credentials in this run: degraded, not fatal.
        assert!(matches!(
            status_of(&report, Stage::Tickets),
            StageStatus::Skipped(_)
        ));
        // Minter has no credentials either: text passes through unchanged.
        assert_eq!(report.final_text.as_deref(), Some("Hello, click LINK_HERE"));
        assert_eq!(
            sink.delivered.lock().unwrap().as_deref(),
            Some("Hello, click LINK_HERE")
        );
    }

    #[tokio::test]
    async fn test_generation_failure_halts_tail_gracefully() {
        let prompts = TempDir::new().unwrap();
        let config = test_config(&prompts);
        let generator = FixedGenerator { response: None };
        let sink = CapturingSink::default();
        let pipeline = Pipeline::new(&config, &generator, Some(&sink));

        let report = pipeline
            .run(&PipelineRequest {
                target: "t@example.com".to_string(),
                impersonate: None,
            })
            .await;

        assert_eq!(report.stages.len(), 6);
        assert!(matches!(
            status_of(&report, Stage::Generation),
            StageStatus::Failed(_)
        ));
        assert!(matches!(
            status_of(&report, Stage::Substitution),
            StageStatus::Skipped(_)
        ));
        assert!(matches!(
            status_of(&report, Stage::Delivery),
            StageStatus::Skipped(_)
        ));
        assert!(!report.produced_text());
        assert!(sink.delivered.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_without_sink_still_produces_text() {
        let prompts = TempDir::new().unwrap();
        let config = test_config(&prompts);
        let generator = FixedGenerator {
            response: Some("plain email".to_string()),
        };
        let pipeline = Pipeline::new(&config, &generator, None);

        let report = pipeline
            .run(&PipelineRequest {
                target: "t@example.com".to_string(),
                impersonate: Some("IT Support".to_string()),
            })
            .await;

        assert!(matches!(
            status_of(&report, Stage::Delivery),
            StageStatus::Skipped(_)
        ));
        assert_eq!(report.final_text.as_deref(), Some("plain email"));
    }
}
