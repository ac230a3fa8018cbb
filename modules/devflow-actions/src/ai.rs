// AI answer suggestions.
//
// The action validates the request, builds a prompt from the question, its
// body, and the user's draft answer, and returns the model's markdown reply.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use ai_client::{ChatModel, Message};
use devflow_common::params::AiAnswerParams;
use devflow_common::{ActionResponse, DevflowError, Validate};

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that provides informative responses \
in markdown format. Use appropriate markdown syntax for headings, lists, code blocks, and emphasis \
where necessary. For code blocks, use short-form smaller case language identifiers (e.g., 'js' for \
JavaScript, 'py' for Python, 'ts' for TypeScript, 'html' for HTML, 'css' for CSS, etc.).";

/// Produces a markdown answer for a question.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str, content: &str, user_answer: Option<&str>)
        -> Result<String>;
}

/// Build the user turn. A blank draft is treated as no draft.
pub fn user_prompt(question: &str, content: &str, user_answer: Option<&str>) -> String {
    let mut prompt = format!(
        "Generate a markdown-formatted response to the following question: \"{}\".\n\n\
         Consider the provided context:\n**Context:** {}\n",
        question.trim(),
        content.trim()
    );

    if let Some(answer) = user_answer.map(str::trim).filter(|a| !a.is_empty()) {
        prompt.push_str(&format!(
            "\nAlso, prioritize and incorporate the user's answer when formulating your response:\n\
             **User's Answer:** {answer}\n\n\
             Prioritize the user's answer only if it's correct. If it's incomplete or incorrect, \
             improve or correct it while keeping the response concise and to the point.\n"
        ));
    }

    prompt.push_str("\nProvide the final answer in markdown format.");
    prompt
}

/// [`AnswerGenerator`] backed by any chat-completion model.
pub struct ChatAnswerGenerator<M> {
    model: M,
}

impl<M: ChatModel> ChatAnswerGenerator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: ChatModel> AnswerGenerator for ChatAnswerGenerator<M> {
    async fn generate(
        &self,
        question: &str,
        content: &str,
        user_answer: Option<&str>,
    ) -> Result<String> {
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(user_prompt(question, content, user_answer)),
        ];
        debug!(model = self.model.model(), "Requesting answer suggestion");
        self.model.chat(messages).await
    }
}

/// Ask the model for a suggested answer. `None` means no provider is configured.
pub async fn ai_answer(
    generator: Option<&dyn AnswerGenerator>,
    params: AiAnswerParams,
) -> ActionResponse<String> {
    crate::respond("ai_answer", ai_answer_inner(generator, params).await)
}

async fn ai_answer_inner(
    generator: Option<&dyn AnswerGenerator>,
    params: AiAnswerParams,
) -> Result<String, DevflowError> {
    params.validate()?;

    let generator = generator
        .ok_or_else(|| DevflowError::Ai(anyhow::anyhow!("no AI provider configured")))?;

    let text = generator
        .generate(
            &params.question,
            &params.content,
            params.user_answer.as_deref(),
        )
        .await
        .map_err(DevflowError::Ai)?;

    info!(chars = text.len(), "Answer suggestion generated");
    Ok(text)
}
