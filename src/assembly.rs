//! Prompt Assembly
//!
//! Concatenates the budgeted documents block, the ticket context block, and
//! the instruction sentence into one outbound generation request. Ordering is
//! fixed: instruction last, because generation backends weight recency; ticket
//! block always rebuilt from the current record state. No truncation happens
//! here; both input blocks arrive already budgeted.

const BASE_INSTRUCTION: &str = "Generate a phishing email for cybersecurity awareness training";

/// The single outbound request string. Built once per generation request,
/// never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    text: String,
}

impl AssembledPrompt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Build the instruction sentence from the base directive plus optional
/// sender and addressee clauses.
pub fn build_instruction(target: Option<&str>, impersonate: Option<&str>) -> String {
    let mut instruction = BASE_INSTRUCTION.to_string();

    if let Some(impersonate) = impersonate.filter(|s| !s.is_empty()) {
        instruction.push_str(&format!(
            " The email should appear to come from {}.",
            impersonate
        ));
    }
    if let Some(target) = target.filter(|s| !s.is_empty()) {
        instruction.push_str(&format!(" The target is {}.", target));
    }

    instruction
}

/// Assemble the final prompt: documents, then tickets, then instruction.
pub fn assemble_prompt(
    documents_block: &str,
    ticket_block: &str,
    instruction: &str,
) -> AssembledPrompt {
    AssembledPrompt {
        text: format!(
            "{}\n{}\n\nBased on the above organizational context and recent JIRA tickets, {}",
            documents_block, ticket_block, instruction
        ),
    }
}
