//! Assistant Core Components
//!
//! The assistant decides what structured data goes into a prompt:
//! - Query classification into keyword sets
//! - Role-specific context assembly
//! - Prompt compilation
//! - Language model dispatch with a fixed fallback

mod assembler;
mod classifier;
mod language_model;
mod prompt;

pub use assembler::{
    AdminContext, AssembledContext, ContextAssembler, FileFinding, StudentContext,
    DEFAULT_POLICY_TEXT,
};
pub use classifier::{KeywordSet, QueryClassifier, FILE_TRIGGERS, LISTING_TRIGGERS, POLICY_TRIGGERS};
pub use language_model::{
    GeminiClient, GenerationConfig, LanguageModel, ModelHandle, ResponseGateway,
    FALLBACK_RESPONSE,
};
pub use prompt::PromptCompiler;
