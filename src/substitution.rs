//! Placeholder Link Substitution
//!
//! Scans generated text for the sentinel marker, mints exactly one tracking
//! link, and replaces every marker occurrence with that single link. All
//! degraded paths (no marker, incomplete credentials, mint failure) return
//! the input text unchanged and carry an explicit reason, so callers never
//! lose the generated text and always know why substitution did not happen.

use crate::config::MinterConfig;
use crate::minter::{LinkMinter, MintCredentials};
use tracing::{info, warn};

/// Sentinel token the generation backend is instructed to emit where a
/// tracking link belongs.
pub const LINK_MARKER: &str = "LINK_HERE";

/// Outcome of one substitution pass. Only `Replaced` changes the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionOutcome {
    /// Every marker occurrence now carries the minted short URL
    Replaced { short_url: String, occurrences: usize },
    /// No marker in the input; nothing to do (not an error)
    MarkerAbsent,
    /// A minting credential is missing; substitution skipped
    MissingCredential(&'static str),
    /// The workspace identifier is not parseable as an integer
    InvalidWorkspace(String),
    /// Minting failed or returned no usable URL
    MintFailed(String),
}

impl SubstitutionOutcome {
    /// Short human-readable form for the run report.
    pub fn describe(&self) -> String {
        match self {
            SubstitutionOutcome::Replaced {
                short_url,
                occurrences,
            } => format!("replaced {} placeholder(s) with {}", occurrences, short_url),
            SubstitutionOutcome::MarkerAbsent => "no placeholder found".to_string(),
            SubstitutionOutcome::MissingCredential(field) => {
                format!("skipped: missing {}", field)
            }
            SubstitutionOutcome::InvalidWorkspace(value) => {
                format!("skipped: workspace id {:?} is not an integer", value)
            }
            SubstitutionOutcome::MintFailed(reason) => format!("skipped: {}", reason),
        }
    }
}

/// Replace every marker occurrence with `short_url`; returns the new text and
/// the occurrence count.
pub fn replace_marker(text: &str, short_url: &str) -> (String, usize) {
    let occurrences = text.matches(LINK_MARKER).count();
    (text.replace(LINK_MARKER, short_url), occurrences)
}

/// Validate minting credentials, naming the first missing or invalid field.
fn credential_gate(config: &MinterConfig) -> Result<MintCredentials, SubstitutionOutcome> {
    let email = config
        .email
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or(SubstitutionOutcome::MissingCredential("minter email"))?;
    let api_key = config
        .api_key
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or(SubstitutionOutcome::MissingCredential("minter api_key"))?;
    let raw_workspace = config
        .workspace_id
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or(SubstitutionOutcome::MissingCredential("minter workspace_id"))?;

    let workspace_id = raw_workspace
        .trim()
        .parse::<i64>()
        .map_err(|_| SubstitutionOutcome::InvalidWorkspace(raw_workspace))?;

    Ok(MintCredentials {
        email,
        api_key,
        workspace_id,
    })
}

/// Substitutes the sentinel marker in generated text with one minted link.
pub struct LinkSubstitutor {
    config: MinterConfig,
}

impl LinkSubstitutor {
    pub fn new(config: MinterConfig) -> Self {
        Self { config }
    }

    /// Run one substitution pass. The returned text equals the input unless
    /// the outcome is `Replaced`.
    pub async fn substitute(&self, text: &str) -> (String, SubstitutionOutcome) {
        if !text.contains(LINK_MARKER) {
            info!("No link placeholder in generated text");
            return (text.to_string(), SubstitutionOutcome::MarkerAbsent);
        }

        let credentials = match credential_gate(&self.config) {
            Ok(credentials) => credentials,
            Err(outcome) => {
                warn!(reason = %outcome.describe(), "Link substitution skipped");
                return (text.to_string(), outcome);
            }
        };

        // Count is diagnostic only; one link serves every occurrence.
        let occurrences = text.matches(LINK_MARKER).count();
        info!(occurrences, "Found link placeholder(s), minting tracking link");

        let minter = match LinkMinter::new(&self.config) {
            Ok(minter) => minter,
            Err(e) => {
                warn!(error = %e, "Failed to build mint client");
                return (
                    text.to_string(),
                    SubstitutionOutcome::MintFailed(e.to_string()),
                );
            }
        };

        match minter.mint(&credentials, &self.config.destination_url).await {
            Ok(link) => {
                let (updated, replaced) = replace_marker(text, &link.short_url);
                info!(occurrences = replaced, short_url = %link.short_url, "Replaced placeholder(s) with tracking link");
                (
                    updated,
                    SubstitutionOutcome::Replaced {
                        short_url: link.short_url,
                        occurrences: replaced,
                    },
                )
            }
            Err(e) => {
                warn!(error = %e, "Tracking link mint failed, text left unchanged");
                (
                    text.to_string(),
                    SubstitutionOutcome::MintFailed(e.to_string()),
                )
            }
        }
    }
}
