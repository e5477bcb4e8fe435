pub mod analyzer;
pub mod assembler;

pub use analyzer::ConversationAnalyzer;
pub use assembler::{AssembledContext, ContextAssembler};
