//! Lure: Context-Driven Phishing Simulation Generator
//!
//! Assembles a size-bounded textual context from reference documents and
//! issue-tracker records, merges it with an instruction template into a single
//! generation request, and post-processes the generated text by substituting a
//! placeholder token with a minted tracking link. Built for security awareness
//! training exercises.

pub mod assembly;
pub mod cli;
pub mod config;
pub mod documents;
pub mod error;
pub mod http;
pub mod logging;
pub mod minter;
pub mod pipeline;
pub mod provider;
pub mod sink;
pub mod substitution;
pub mod tickets;
