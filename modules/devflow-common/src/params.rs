//! Typed action inputs and the rules that accept or reject them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AnswerSort, TagSort, TargetKind, UserSort, VoteKind};
use crate::validation::{FieldErrors, Validate};

pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 100;
pub const TAG_MAX_LEN: usize = 30;
pub const TAGS_MAX: usize = 3;
pub const ANSWER_MIN: usize = 100;
pub const AI_QUESTION_MIN: usize = 5;
pub const AI_QUESTION_MAX: usize = 130;
pub const AI_CONTENT_MIN: usize = 10;
pub const NAME_MAX: usize = 50;
pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 30;

fn check_question_fields(errors: &mut FieldErrors, title: &str, content: &str, tags: &[String]) {
    errors.check_len(
        "title",
        title,
        TITLE_MIN,
        Some(TITLE_MAX),
        "Title is required.",
        "Title cannot exceed 100 characters.",
    );
    errors.check_len("content", content, 1, None, "Body is required.", "");

    if tags.is_empty() {
        errors.push("tags", "At least one tag is required.");
    }
    if tags.len() > TAGS_MAX {
        errors.push("tags", "Cannot add more than 3 tags.");
    }
    for tag in tags {
        errors.check_len(
            "tags",
            tag,
            1,
            Some(TAG_MAX_LEN),
            "Tag is required.",
            "Tag cannot exceed 30 characters.",
        );
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskQuestionParams {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Validate for AskQuestionParams {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_question_fields(&mut errors, &self.title, &self.content, &self.tags);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditQuestionParams {
    pub question_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Validate for EditQuestionParams {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_question_fields(&mut errors, &self.title, &self.content, &self.tags);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteParams {
    pub target_id: Uuid,
    pub target_kind: TargetKind,
    pub vote_kind: VoteKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnswerParams {
    pub question_id: Uuid,
    pub content: String,
}

impl Validate for CreateAnswerParams {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check_len(
            "content",
            &self.content,
            ANSWER_MIN,
            None,
            "Answer has to have more than 100 characters.",
            "",
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTagsParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub query: Option<String>,
    pub filter: Option<TagSort>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAnswersParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub filter: Option<AnswerSort>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnswerParams {
    pub question: String,
    pub content: String,
    #[serde(default)]
    pub user_answer: Option<String>,
}

impl Validate for AiAnswerParams {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check_len(
            "question",
            &self.question,
            AI_QUESTION_MIN,
            Some(AI_QUESTION_MAX),
            "Question is required.",
            "Question cannot exceed 130 characters.",
        );
        errors.check_len(
            "content",
            &self.content,
            AI_CONTENT_MIN,
            None,
            "Answer has to have more than 10 characters.",
            "",
        );
        errors.into_result()
    }
}

/// Profile fields the actor sets for themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveProfileParams {
    pub name: String,
    pub username: String,
}

impl Validate for SaveProfileParams {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check_len(
            "name",
            &self.name,
            1,
            Some(NAME_MAX),
            "Name is required.",
            "Name cannot exceed 50 characters.",
        );
        errors.check_len(
            "username",
            &self.username,
            USERNAME_MIN,
            Some(USERNAME_MAX),
            "Username has to be at least 3 characters.",
            "Username cannot exceed 30 characters.",
        );
        if !self
            .username
            .trim()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            errors.push(
                "username",
                "Username can only contain letters, numbers, and underscores.",
            );
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub query: Option<String>,
    pub filter: Option<UserSort>,
}

/// Normalize an optional search query: blank means no filter.
pub fn search_query(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase)
}
