//! Request orchestration for the Atrium real-estate Q&A agent.
//!
//! This crate wires the LLM-coupled stages around the deterministic core:
//!
//! 1. **Routing & extraction** (`router`) - one structured call classifies
//!    intent and extracts entities, corrected by the deterministic gate
//! 2. **Planning** (`planner`) - restricted query-plan generation with
//!    static safety validation before anything runs
//! 3. **Execution** - delegated to the core sandbox over a private table
//!    copy
//! 4. **Composition** (`composer`) - final answers grounded strictly in
//!    the result rows or profile context
//!
//! The `pipeline` module threads one `ConversationTurn` through these
//! stages as a strict state machine. The model is only ever a translator:
//! every irreversible decision is either deterministic or fails closed
//! into a canonical outcome.

pub mod composer;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod prompts;
pub mod router;
pub mod schemas;

pub use llm::{ChatMessage, CompletionRequest, LlmClient, LlmError, OpenAiClient};
pub use pipeline::{ConversationTurn, Pipeline, TurnOutcome};
