//! Shared fixtures for the action tests. Everything runs against the
//! in-memory store.

#![allow(dead_code)]

use uuid::Uuid;

use devflow_actions::question::create_question;
use devflow_common::params::{AskQuestionParams, CreateAnswerParams, EditQuestionParams};
use devflow_common::types::{Actor, Question};
use devflow_store::{MemoryState, MemoryStore};

pub const BODY: &str = "I have a question about ownership and would like some help.";

pub fn actor() -> Actor {
    Actor::new(Uuid::new_v4())
}

pub fn ask(title: &str, tags: &[&str]) -> AskQuestionParams {
    AskQuestionParams {
        title: title.to_string(),
        content: BODY.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn edit(question: &Question, title: &str, content: &str, tags: &[&str]) -> EditQuestionParams {
    EditQuestionParams {
        question_id: question.id,
        title: title.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn answer_params(question_id: Uuid) -> CreateAnswerParams {
    CreateAnswerParams {
        question_id,
        content: "a".repeat(120),
    }
}

/// Create a question and return it, panicking if the action fails.
pub async fn seed_question(store: &MemoryStore, author: &Actor, tags: &[&str]) -> Question {
    let resp = create_question(store, Some(author), ask("How does borrowing work?", tags)).await;
    assert!(resp.success, "seed failed: {:?}", resp.error);
    resp.data.unwrap()
}

pub fn tag_count(state: &MemoryState, name: &str) -> Option<i64> {
    state.tag_by_name(name).map(|t| t.questions)
}

pub fn assert_consistent(state: &MemoryState) {
    let violations = state.consistency_violations();
    assert!(violations.is_empty(), "inconsistent store: {violations:#?}");
}

/// Committed records that an aborted action must leave untouched.
pub fn same_records(a: &MemoryState, b: &MemoryState) -> bool {
    a.questions == b.questions
        && a.tags == b.tags
        && a.links == b.links
        && a.votes == b.votes
        && a.answers == b.answers
        && a.saved == b.saved
        && a.users == b.users
}
