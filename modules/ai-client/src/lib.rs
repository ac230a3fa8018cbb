//! Chat-completion client for OpenAI-compatible providers (OpenAI, DeepSeek,
//! and anything else serving `/chat/completions`).

pub mod openai;
pub mod traits;
pub mod util;

pub use openai::OpenAi;
pub use traits::{ChatModel, Message, MessageRole};
