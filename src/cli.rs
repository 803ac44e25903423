//! CLI domain: parse, route, and presentation.
//!
//! No pipeline orchestration here; commands resolve configuration and
//! collaborators, call into the domain modules, and format what comes back.

use crate::config::{ConfigLoader, LureConfig};
use crate::documents::load_documents;
use crate::error::ConfigError;
use crate::pipeline::{Pipeline, PipelineRequest, RunReport, StageStatus};
use crate::provider::{OpenAiGenerator, TextGenerator};
use crate::sink::{FileSink, ResultSink};
use crate::tickets::{normalize, TrackerClient};
use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Input;
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "lure",
    version,
    about = "Context-driven phishing simulation generator for security awareness training"
)]
pub struct Cli {
    /// Path to a config file (default: ~/.config/lure/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full generation pipeline for one target
    Generate {
        /// Target email address (prompted for when omitted)
        #[arg(long)]
        target: Option<String>,

        /// Person the email should appear to come from
        #[arg(long)]
        impersonate: Option<String>,

        /// Directory of context fragment sources
        #[arg(long)]
        prompts_dir: Option<PathBuf>,

        /// Model identifier override
        #[arg(long)]
        model: Option<String>,

        /// Write the result to this file instead of the derived name
        #[arg(long)]
        output: Option<PathBuf>,

        /// Skip writing the result to disk
        #[arg(long)]
        no_save: bool,
    },

    /// Probe the tracker connection and list active tickets for an assignee
    Tickets {
        /// Assignee email address
        #[arg(long)]
        assignee: String,

        /// Maximum number of tickets to fetch
        #[arg(long, default_value_t = 10)]
        max_results: u32,
    },

    /// Render the budgeted document context block for inspection
    Context {
        /// Directory of context fragment sources
        #[arg(long)]
        prompts_dir: Option<PathBuf>,

        /// Character budget override
        #[arg(long)]
        budget: Option<usize>,
    },

    /// Answer a one-off question over the document context
    Ask {
        /// Question to answer
        prompt: String,

        /// Directory of context fragment sources
        #[arg(long)]
        prompts_dir: Option<PathBuf>,
    },
}

/// Resolved execution context for one CLI invocation.
pub struct RunContext {
    config: LureConfig,
}

impl RunContext {
    pub fn new(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let config = ConfigLoader::load(config_path)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LureConfig {
        &self.config
    }

    pub async fn execute(&self, command: &Commands) -> anyhow::Result<()> {
        match command {
            Commands::Generate {
                target,
                impersonate,
                prompts_dir,
                model,
                output,
                no_save,
            } => {
                self.run_generate(
                    target.clone(),
                    impersonate.clone(),
                    prompts_dir.clone(),
                    model.clone(),
                    output.clone(),
                    *no_save,
                )
                .await
            }
            Commands::Tickets {
                assignee,
                max_results,
            } => self.run_tickets(assignee, *max_results).await,
            Commands::Context {
                prompts_dir,
                budget,
            } => self.run_context(prompts_dir.clone(), *budget),
            Commands::Ask {
                prompt,
                prompts_dir,
            } => self.run_ask(prompt, prompts_dir.clone()).await,
        }
    }

    async fn run_generate(
        &self,
        target: Option<String>,
        impersonate: Option<String>,
        prompts_dir: Option<PathBuf>,
        model: Option<String>,
        output: Option<PathBuf>,
        no_save: bool,
    ) -> anyhow::Result<()> {
        let mut config = self.config.clone();
        if let Some(dir) = prompts_dir {
            config.context.prompts_dir = dir;
        }
        if let Some(model) = model {
            config.generator.model = model;
        }

        let target = match target.filter(|t| !t.is_empty()) {
            Some(target) => target,
            None => Input::<String>::new()
                .with_prompt("Target email address")
                .interact_text()
                .context("Failed to read target email")?,
        };
        let impersonate = match impersonate {
            Some(impersonate) => Some(impersonate).filter(|s| !s.is_empty()),
            None => {
                let entered = Input::<String>::new()
                    .with_prompt("Person to impersonate (optional)")
                    .allow_empty(true)
                    .interact_text()
                    .context("Failed to read impersonation subject")?;
                Some(entered).filter(|s| !s.is_empty())
            }
        };

        let generator = OpenAiGenerator::new(&config.generator)
            .context("Text-generation backend is not configured")?;

        let file_sink = if no_save {
            None
        } else {
            Some(build_file_sink(output))
        };
        let sink_ref: Option<&dyn ResultSink> =
            file_sink.as_ref().map(|s| s as &dyn ResultSink);

        let pipeline = Pipeline::new(&config, &generator, sink_ref);
        let report = pipeline
            .run(&PipelineRequest {
                target,
                impersonate,
            })
            .await;

        print_report(&report);
        match &report.final_text {
            Some(text) => {
                println!("\n{}", "=".repeat(60));
                println!("{}", "GENERATED PHISHING EMAIL".bold());
                println!("{}", "=".repeat(60));
                println!("{}", text);
                println!("{}", "=".repeat(60));
                Ok(())
            }
            None => anyhow::bail!("Generation produced no text; see stage report above"),
        }
    }

    async fn run_tickets(&self, assignee: &str, max_results: u32) -> anyhow::Result<()> {
        let client = TrackerClient::new(&self.config.tracker)
            .context("Tracker backend is not configured")?;

        let who = client
            .myself()
            .await
            .context("Failed to connect to tracker")?;
        println!("{} Connected as: {}", "✓".green(), who);

        let raw = client
            .active_issues_for(assignee, max_results)
            .await
            .context("Failed to fetch tickets")?;

        if raw.is_empty() {
            println!("No active tickets found for {}", assignee);
            return Ok(());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec![
            "Key", "Type", "Summary", "Status", "Priority", "Project",
        ]);
        for issue in &raw {
            let ticket = normalize(issue);
            table.add_row(vec![
                ticket.key,
                ticket.issue_type,
                ticket.summary,
                ticket.status,
                ticket.priority,
                format!("{} ({})", ticket.project_name, ticket.project_key),
            ]);
        }

        println!("{}", table);
        println!("{} active ticket(s) for {}", raw.len(), assignee);
        Ok(())
    }

    fn run_context(
        &self,
        prompts_dir: Option<PathBuf>,
        budget: Option<usize>,
    ) -> anyhow::Result<()> {
        let dir = prompts_dir.unwrap_or_else(|| self.config.context.prompts_dir.clone());
        let limit = budget.unwrap_or(self.config.context.budget);

        let context = load_documents(&dir, limit);
        if context.is_empty() {
            println!("No document context available under {}", dir.display());
            return Ok(());
        }

        println!("{}", context.rendered);
        println!(
            "{} fragment(s), {} of {} budget chars used",
            context.fragments.len(),
            context.consumed_chars,
            limit
        );
        Ok(())
    }

    async fn run_ask(&self, prompt: &str, prompts_dir: Option<PathBuf>) -> anyhow::Result<()> {
        let dir = prompts_dir.unwrap_or_else(|| self.config.context.prompts_dir.clone());
        let context = load_documents(&dir, self.config.context.budget);

        let full_prompt = if context.is_empty() {
            prompt.to_string()
        } else {
            format!(
                "{}\n\nBased on the above context, please respond to: {}",
                context.rendered, prompt
            )
        };

        let generator = OpenAiGenerator::new(&self.config.generator)
            .context("Text-generation backend is not configured")?;
        let response = generator
            .generate(&full_prompt)
            .await
            .context("Generation request failed")?;

        println!("{}", response);
        Ok(())
    }
}

fn build_file_sink(output: Option<PathBuf>) -> FileSink {
    match output {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "lure_output.txt".to_string());
            FileSink::with_filename(directory, filename)
        }
        None => FileSink::new(PathBuf::from(".")),
    }
}

/// Print the per-stage account of a pipeline run.
pub fn print_report(report: &RunReport) {
    for stage in &report.stages {
        match &stage.status {
            StageStatus::Completed(summary) => {
                println!("{} {}: {}", "✓".green(), stage.stage.name(), summary);
            }
            StageStatus::Skipped(reason) => {
                println!("{} {}: {}", "⚠".yellow(), stage.stage.name(), reason);
            }
            StageStatus::Failed(reason) => {
                println!("{} {}: {}", "✗".red(), stage.stage.name(), reason);
            }
        }
    }
}
