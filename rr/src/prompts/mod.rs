//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for the three model calls
//! and the guide chat.
//!
//! Template loading chain:
//! 1. `.routeroulette/prompts/{name}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader, Template};
