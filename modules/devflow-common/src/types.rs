use std::collections::HashSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Identity ---

/// The authenticated user behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
}

impl Actor {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

// --- Vote Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Upvote,
    Downvote,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Upvote => "upvote",
            VoteKind::Downvote => "downvote",
        }
    }
}

impl std::fmt::Display for VoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VoteKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" => Ok(VoteKind::Upvote),
            "downvote" => Ok(VoteKind::Downvote),
            other => Err(anyhow::anyhow!("unknown vote kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Question,
    Answer,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Question => "question",
            TargetKind::Answer => "answer",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "question" => Ok(TargetKind::Question),
            "answer" => Ok(TargetKind::Answer),
            other => Err(anyhow::anyhow!("unknown target kind: {other}")),
        }
    }
}

/// Something a vote can point at. Carries the id so dispatch never needs a
/// separate kind lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteTarget {
    Question(Uuid),
    Answer(Uuid),
}

impl VoteTarget {
    pub fn new(kind: TargetKind, id: Uuid) -> Self {
        match kind {
            TargetKind::Question => VoteTarget::Question(id),
            TargetKind::Answer => VoteTarget::Answer(id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            VoteTarget::Question(id) | VoteTarget::Answer(id) => *id,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            VoteTarget::Question(_) => TargetKind::Question,
            VoteTarget::Answer(_) => TargetKind::Answer,
        }
    }
}

impl std::fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

// --- Vote Tally ---

/// Denormalized vote counters carried by questions and answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteTally {
    pub fn count(&self, kind: VoteKind) -> i64 {
        match kind {
            VoteKind::Upvote => self.upvotes,
            VoteKind::Downvote => self.downvotes,
        }
    }

    pub fn apply(&mut self, kind: VoteKind, delta: i64) {
        match kind {
            VoteKind::Upvote => self.upvotes += delta,
            VoteKind::Downvote => self.downvotes += delta,
        }
    }
}

/// Entities that carry a [`VoteTally`].
pub trait Tallied {
    fn tally(&self) -> &VoteTally;
    fn tally_mut(&mut self) -> &mut VoteTally;

    fn apply_vote(&mut self, kind: VoteKind, delta: i64) {
        self.tally_mut().apply(kind, delta);
    }
}

// --- Tags ---

/// A tag name normalized for case-insensitive identity: trimmed, lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagName(String);

impl TagName {
    /// Normalize a raw tag. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize raw tag names, dropping blanks and case-insensitive duplicates.
/// First occurrence wins, so input order is preserved.
pub fn normalize_tag_names<S: AsRef<str>>(raw: &[S]) -> Vec<TagName> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|s| TagName::parse(s.as_ref()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    /// Number of questions currently linked to this tag.
    pub questions: i64,
    pub created_at: DateTime<Utc>,
}

/// Join record between a tag and a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagLink {
    pub tag_id: Uuid,
    pub question_id: Uuid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TagSort {
    #[default]
    Popular,
    Recent,
    Oldest,
    Name,
}

// --- Questions ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    /// Ordered tag references. Mirrors the question's link records.
    pub tag_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub tally: VoteTally,
    pub views: i64,
    pub answers: i64,
    pub created_at: DateTime<Utc>,
}

impl Tallied for Question {
    fn tally(&self) -> &VoteTally {
        &self.tally
    }

    fn tally_mut(&mut self) -> &mut VoteTally {
        &mut self.tally
    }
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
}

/// A question with its tags resolved, in the question's tag order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCount {
    pub views: i64,
}

// --- Answers ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    #[serde(flatten)]
    pub tally: VoteTally,
    pub created_at: DateTime<Utc>,
}

impl Tallied for Answer {
    fn tally(&self) -> &VoteTally {
        &self.tally
    }

    fn tally_mut(&mut self) -> &mut VoteTally {
        &mut self.tally
    }
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub question_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSort {
    #[default]
    Latest,
    Oldest,
    Popular,
}

// --- Votes ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: Uuid,
    pub voter_id: Uuid,
    pub target_id: Uuid,
    pub target_kind: TargetKind,
    pub kind: VoteKind,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn target(&self) -> VoteTarget {
        VoteTarget::new(self.target_kind, self.target_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteState {
    pub has_upvoted: bool,
    pub has_downvoted: bool,
}

impl VoteState {
    pub fn from_vote(vote: Option<&Vote>) -> Self {
        match vote.map(|v| v.kind) {
            Some(VoteKind::Upvote) => Self {
                has_upvoted: true,
                has_downvoted: false,
            },
            Some(VoteKind::Downvote) => Self {
                has_upvoted: false,
                has_downvoted: true,
            },
            None => Self::default(),
        }
    }
}

// --- Collections ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuestion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    pub saved: bool,
}

// --- Users ---

/// Public profile listed in the community directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserSort {
    #[default]
    NewUsers,
    OldUsers,
    /// Most questions authored first.
    TopContributors,
}

// --- Paging ---

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page window. Stores fetch `limit + 1` rows to detect `is_next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// Split an over-fetched result into the page and the `is_next` flag.
    pub fn finish<T>(&self, mut rows: Vec<T>) -> (Vec<T>, bool) {
        let is_next = rows.len() > self.page_size as usize;
        rows.truncate(self.page_size as usize);
        (rows, is_next)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagList {
    pub tags: Vec<Tag>,
    pub is_next: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagQuestions {
    pub tag: Tag,
    pub questions: Vec<Question>,
    pub is_next: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserList {
    pub users: Vec<User>,
    pub is_next: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerList {
    pub answers: Vec<Answer>,
    pub is_next: bool,
    pub total_answers: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_names_collapse_case_and_keep_first_order() {
        let names = normalize_tag_names(&["Java", "java", " Python ", "", "JAVA"]);
        let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["java", "python"]);
    }

    #[test]
    fn blank_tag_is_rejected() {
        assert_eq!(TagName::parse("   "), None);
    }

    #[test]
    fn tally_apply_targets_one_counter() {
        let mut tally = VoteTally::default();
        tally.apply(VoteKind::Upvote, 1);
        tally.apply(VoteKind::Downvote, 2);
        tally.apply(VoteKind::Upvote, -1);
        assert_eq!(tally, VoteTally { upvotes: 0, downvotes: 2 });
    }

    #[test]
    fn vote_target_round_trips_kind() {
        let id = Uuid::new_v4();
        let target = VoteTarget::new(TargetKind::Answer, id);
        assert_eq!(target, VoteTarget::Answer(id));
        assert_eq!(target.kind(), TargetKind::Answer);
        assert_eq!(target.id(), id);
    }

    #[test]
    fn vote_state_reflects_kind() {
        assert_eq!(VoteState::from_vote(None), VoteState::default());
    }

    #[test]
    fn page_clamps_and_detects_next() {
        let page = Page::new(Some(0), Some(500));
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, MAX_PAGE_SIZE);

        let page = Page::new(Some(2), Some(2));
        assert_eq!(page.offset(), 2);
        let (rows, is_next) = page.finish(vec![1, 2, 3]);
        assert_eq!(rows, vec![1, 2]);
        assert!(is_next);
        let (rows, is_next) = page.finish(vec![1]);
        assert_eq!(rows, vec![1]);
        assert!(!is_next);
    }

    #[test]
    fn question_serializes_tally_flat() {
        let q = Question {
            id: Uuid::nil(),
            title: "t".into(),
            content: "c".into(),
            author_id: Uuid::nil(),
            tag_ids: vec![],
            tally: VoteTally { upvotes: 3, downvotes: 1 },
            views: 0,
            answers: 0,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["upvotes"], 3);
        assert_eq!(json["downvotes"], 1);
        assert!(json.get("tagIds").is_some());
    }
}
