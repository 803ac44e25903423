//! Integration tests for document context loading and budgeting

use lure::documents::{load_documents, DEFAULT_CONTEXT_BUDGET};
use std::fs;
use tempfile::TempDir;

fn write_source(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

#[test]
fn priority_fragment_loads_in_full_and_tail_is_dropped() {
    // 50-char priority source plus 50-char plain source against a 60-char
    // budget: the priority source lands whole, the plain one would leave a
    // remainder too small to be useful and is dropped.
    let temp = TempDir::new().unwrap();
    write_source(&temp, "context_org.txt", &"p".repeat(50));
    write_source(&temp, "notes.txt", &"n".repeat(50));

    let ctx = load_documents(temp.path(), 60);

    assert!(ctx.rendered.contains(&"p".repeat(50)));
    assert!(!ctx.rendered.contains(&"n".repeat(50)));
    assert!(ctx.consumed_chars <= 60);
}

#[test]
fn priority_ordering_holds_regardless_of_creation_order() {
    let temp = TempDir::new().unwrap();
    // Created in reverse of the expected output order
    write_source(&temp, "aaa_notes.txt", "plain material");
    write_source(&temp, "zzz_context.txt", "priority material");

    let ctx = load_documents(temp.path(), DEFAULT_CONTEXT_BUDGET);

    let priority_pos = ctx.rendered.find("priority material").unwrap();
    let plain_pos = ctx.rendered.find("plain material").unwrap();
    assert!(priority_pos < plain_pos);
}

#[test]
fn rendered_block_is_bounded_by_budget_plus_fixed_overhead() {
    let temp = TempDir::new().unwrap();
    for i in 0..8 {
        write_source(&temp, &format!("doc{}.txt", i), &"x".repeat(400));
    }

    let limit = 1_000;
    let ctx = load_documents(temp.path(), limit);

    assert!(ctx.consumed_chars <= limit);

    // Banner/header overhead is fixed per emitted fragment, so the rendered
    // block stays within limit + overhead.
    let overhead: usize = ctx
        .rendered
        .lines()
        .filter(|line| line.starts_with("=== ") || line.starts_with("--- "))
        .map(|line| line.chars().count() + 1)
        .sum();
    let suffix_allowance = "... [truncated]".chars().count();
    let separator_allowance = 3 * ctx.fragments.len() + 3;
    let total = ctx.rendered.chars().count();
    assert!(total <= limit + overhead + suffix_allowance + separator_allowance);
}

#[test]
fn reload_reflects_current_directory_contents() {
    let temp = TempDir::new().unwrap();
    write_source(&temp, "a.txt", "first version");

    let before = load_documents(temp.path(), DEFAULT_CONTEXT_BUDGET);
    assert!(before.rendered.contains("first version"));

    write_source(&temp, "a.txt", "second version");
    let after = load_documents(temp.path(), DEFAULT_CONTEXT_BUDGET);
    assert!(after.rendered.contains("second version"));
    assert!(!after.rendered.contains("first version"));
}
