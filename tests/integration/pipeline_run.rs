//! End-to-end pipeline runs against a stubbed generation backend

use async_trait::async_trait;
use lure::config::LureConfig;
use lure::error::BackendError;
use lure::pipeline::{Pipeline, PipelineRequest, Stage, StageStatus};
use lure::provider::TextGenerator;
use lure::sink::{FileSink, ResultSink};
use std::fs;
use tempfile::TempDir;

struct StubGenerator {
    response: String,
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        // The assembled prompt must carry the instruction sentence last.
        assert!(prompt.contains("cybersecurity awareness training"));
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

fn run_config(prompts: &TempDir) -> LureConfig {
    let mut config = LureConfig::default();
    config.context.prompts_dir = prompts.path().to_path_buf();
    config
}

#[tokio::test]
async fn full_run_writes_report_file_with_unmodified_text() {
    let prompts = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::write(
        prompts.path().join("org_context.txt"),
        "We build accounting software.",
    )
    .unwrap();

    let config = run_config(&prompts);
    let generator = StubGenerator {
        response: "Subject: Action needed\n\nPlease review LINK_HERE today.".to_string(),
    };
    let sink = FileSink::new(out.path().to_path_buf());
    let pipeline = Pipeline::new(&config, &generator, Some(&sink as &dyn ResultSink));

    let report = pipeline
        .run(&PipelineRequest {
            target: "d.mau@example.com".to_string(),
            impersonate: Some("IT Support".to_string()),
        })
        .await;

    // Minting credentials are absent, so the placeholder survives verbatim.
    assert_eq!(
        report.final_text.as_deref(),
        Some("Subject: Action needed\n\nPlease review LINK_HERE today.")
    );

    let written =
        fs::read_to_string(out.path().join("phishing_email_d_mau_example_com.txt")).unwrap();
    assert!(written.contains("Please review LINK_HERE today."));
    assert!(written.contains("Target Email: d.mau@example.com"));
}

#[tokio::test]
async fn every_stage_is_accounted_for_even_when_degraded() {
    let prompts = TempDir::new().unwrap();
    let config = run_config(&prompts);
    let generator = StubGenerator {
        response: "No placeholders here.".to_string(),
    };
    let pipeline = Pipeline::new(&config, &generator, None);

    let report = pipeline
        .run(&PipelineRequest {
            target: "t@example.com".to_string(),
            impersonate: None,
        })
        .await;

    let names: Vec<&str> = report.stages.iter().map(|s| s.stage.name()).collect();
    assert_eq!(
        names,
        vec![
            "documents",
            "tickets",
            "assembly",
            "generation",
            "substitution",
            "delivery"
        ]
    );

    // Empty prompts dir and unconfigured tracker degrade; the run still
    // finishes and produces text.
    assert!(matches!(
        report.stages[0].status,
        StageStatus::Skipped(_)
    ));
    assert!(matches!(
        report.stages[1].status,
        StageStatus::Skipped(_)
    ));
    assert!(report.produced_text());

    // Marker-absent substitution completes without changing the text.
    let substitution = report
        .stages
        .iter()
        .find(|s| s.stage == Stage::Substitution)
        .unwrap();
    assert!(matches!(substitution.status, StageStatus::Completed(_)));
    assert_eq!(report.final_text.as_deref(), Some("No placeholders here."));
}
