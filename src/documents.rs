//! Document Context Loading
//!
//! Reads a directory of plain-text fragment sources, orders them by priority
//! convention, and renders a labeled context block under a global character
//! budget. Pure function of directory contents and the budget limit: no state
//! survives a load, and a reload always reflects the current directory.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default global character budget across all fragments
pub const DEFAULT_CONTEXT_BUDGET: usize = 90_000;

/// Remaining budget at or below this is too small to carry a useful partial
/// fragment; the source is dropped instead of truncated.
pub const MIN_USEFUL_BUDGET: usize = 100;

const TRUNCATION_SUFFIX: &str = "... [truncated]";
const CONTEXT_OPEN: &str = "=== CONTEXT INFORMATION ===";
const CONTEXT_CLOSE: &str = "=== END OF CONTEXT ===";

/// Token in a source name that marks it as priority material
const PRIORITY_TOKEN: &str = "context";

/// One source file's contribution to the assembled context.
///
/// Immutable once created; `content` holds the post-budget text actually
/// emitted (possibly truncated).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFragment {
    pub name: String,
    pub content: String,
    pub is_priority: bool,
}

/// Running character budget, consumed monotonically as fragments append.
///
/// Invariant: `consumed <= limit` after every charge.
#[derive(Debug, Clone, Copy)]
pub struct ContextBudget {
    consumed: usize,
    limit: usize,
}

impl ContextBudget {
    pub fn new(limit: usize) -> Self {
        Self { consumed: 0, limit }
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.consumed
    }

    fn charge(&mut self, chars: usize) {
        debug_assert!(chars <= self.remaining());
        self.consumed += chars;
    }
}

/// Result of loading a fragment directory: the emitted fragments in final
/// order plus the rendered, budget-bounded context block.
#[derive(Debug, Clone, Default)]
pub struct DocumentContext {
    pub fragments: Vec<ContextFragment>,
    pub rendered: String,
    pub consumed_chars: usize,
}

impl DocumentContext {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Load all `.txt` sources directly under `dir` (non-recursive) and render
/// them into one context block bounded by `limit` content characters.
///
/// A missing directory or an empty one is a warnable condition, not an error:
/// the result is an empty context. Individual unreadable sources are skipped.
pub fn load_documents(dir: &Path, limit: usize) -> DocumentContext {
    if !dir.is_dir() {
        warn!(directory = %dir.display(), "Prompts directory not found, no document context loaded");
        return DocumentContext::default();
    }

    let sources = discover_sources(dir);
    if sources.is_empty() {
        warn!(directory = %dir.display(), "No .txt sources found, no document context loaded");
        return DocumentContext::default();
    }

    let mut budget = ContextBudget::new(limit);
    let mut fragments = Vec::new();

    for (name, path, is_priority) in sources {
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(source = %name, error = %e, "Failed to read fragment source, skipping");
                continue;
            }
        };

        let content = raw.trim();
        if content.is_empty() {
            debug!(source = %name, "Empty fragment source, skipping");
            continue;
        }

        let len = content.chars().count();
        if len <= budget.remaining() {
            budget.charge(len);
            debug!(source = %name, chars = len, priority = is_priority, "Loaded fragment");
            fragments.push(ContextFragment {
                name,
                content: content.to_string(),
                is_priority,
            });
            continue;
        }

        // Overflow. A usable remainder gets a truncated tail fragment and
        // ends the load; anything smaller drops this source and keeps
        // scanning in case a shorter one still fits.
        let remaining = budget.remaining();
        if remaining > MIN_USEFUL_BUDGET {
            let mut truncated = truncate_chars(content, remaining).to_string();
            truncated.push_str(TRUNCATION_SUFFIX);
            budget.charge(remaining);
            warn!(source = %name, kept = remaining, dropped = len - remaining, "Fragment truncated to fit context budget");
            fragments.push(ContextFragment {
                name,
                content: truncated,
                is_priority,
            });
            break;
        }

        debug!(source = %name, remaining, "Fragment skipped, remaining budget too small");
    }

    let rendered = render_fragments(&fragments);
    DocumentContext {
        consumed_chars: budget.consumed(),
        fragments,
        rendered,
    }
}

/// Discover `.txt` sources, priority-named first, lexicographic within each
/// class for determinism.
fn discover_sources(dir: &Path) -> Vec<(String, std::path::PathBuf, bool)> {
    // BTreeMap keyed by name gives the lexicographic order inside each class
    let mut priority = BTreeMap::new();
    let mut other = BTreeMap::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let is_priority = name.to_lowercase().contains(PRIORITY_TOKEN);
        let class = if is_priority { &mut priority } else { &mut other };
        class.insert(name.clone(), (name, path.to_path_buf(), is_priority));
    }

    priority.into_values().chain(other.into_values()).collect()
}

/// Render fragments as labeled sections wrapped in context banners.
fn render_fragments(fragments: &[ContextFragment]) -> String {
    if fragments.is_empty() {
        return String::new();
    }

    let mut parts = vec![CONTEXT_OPEN.to_string()];
    for fragment in fragments {
        let marker = if fragment.is_priority {
            " [PRIORITY]"
        } else {
            ""
        };
        parts.push(format!(
            "\n--- {}{} ---",
            fragment.name.to_uppercase(),
            marker
        ));
        parts.push(fragment.content.clone());
    }
    parts.push(format!("\n{}\n", CONTEXT_CLOSE));
    parts.join("\n")
}

/// Truncate to at most `max_chars` characters, respecting UTF-8 boundaries.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
