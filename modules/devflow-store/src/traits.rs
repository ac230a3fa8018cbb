// Repository traits for the Q&A stores.
//
// Each repository is implemented by the unit-of-work type, so a workflow holds
// a single `&mut tx` and every read and write it makes lands in the same
// transaction. Two implementations exist: PgUnitOfWork (sqlx, production) and
// MemoryTx (in-memory, tests).

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use devflow_common::types::{
    Answer, AnswerSort, NewAnswer, NewQuestion, Page, Question, SavedQuestion, Tag, TagLink,
    TagName, TagSort, User, UserSort, Vote, VoteKind, VoteTally, VoteTarget,
};

// ---------------------------------------------------------------------------
// Store: unit-of-work factory
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Store: Send + Sync {
    type Tx: UnitOfWork;

    /// Start a transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// A live transaction. Dropping it without `commit` discards every write.
#[async_trait]
pub trait UnitOfWork:
    QuestionRepo + TagRepo + VoteRepo + AnswerRepo + CollectionRepo + UserRepo + Send + Sized
{
    async fn commit(self) -> Result<()>;
    async fn rollback(self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// QuestionRepo
// ---------------------------------------------------------------------------

#[async_trait]
pub trait QuestionRepo: Send {
    /// Insert a question with an empty tag list and zeroed counters.
    async fn insert_question(&mut self, new: &NewQuestion) -> Result<Question>;

    async fn find_question(&mut self, id: Uuid) -> Result<Option<Question>>;

    /// Load a question and hold its row until the unit of work ends, so
    /// concurrent edits of the same question run one after another.
    async fn lock_question(&mut self, id: Uuid) -> Result<Option<Question>>;

    /// Persist title, content, and the ordered tag list.
    async fn save_question(&mut self, question: &Question) -> Result<()>;

    /// Increment the view counter. `None` if the question does not exist.
    async fn increment_views(&mut self, id: Uuid) -> Result<Option<i64>>;

    /// Adjust the answer counter. Returns false if the question does not exist.
    async fn adjust_answer_count(&mut self, id: Uuid, delta: i64) -> Result<bool>;

    /// Questions linked to a tag, newest first. Fetches one row past the page
    /// so callers can compute `is_next`.
    async fn questions_for_tag(
        &mut self,
        tag_id: Uuid,
        title_query: Option<&str>,
        page: Page,
    ) -> Result<Vec<Question>>;
}

// ---------------------------------------------------------------------------
// TagRepo: tag registry and tag-question links
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TagRepo: Send {
    /// Insert the tag with a counter of 1, or increment the existing one.
    async fn upsert_tag(&mut self, name: &TagName) -> Result<Tag>;

    async fn find_tag(&mut self, id: Uuid) -> Result<Option<Tag>>;

    /// Resolve ids to tags, in the order given. Unknown ids are skipped.
    async fn tags_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Tag>>;

    /// Decrement each tag's counter by one. Returns the number of tags touched.
    async fn decrement_tags(&mut self, ids: &[Uuid]) -> Result<u64>;

    /// Page through tags, fetching one row past the page.
    async fn list_tags(&mut self, name_query: Option<&str>, sort: TagSort, page: Page)
        -> Result<Vec<Tag>>;

    /// Returns the number of links written. Pairs that already exist are
    /// skipped and not counted.
    async fn insert_tag_links(&mut self, links: &[TagLink]) -> Result<u64>;

    /// Delete the question's links to the given tags. Returns rows removed.
    async fn delete_tag_links(&mut self, question_id: Uuid, tag_ids: &[Uuid]) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// VoteRepo: votes and the denormalized tally
// ---------------------------------------------------------------------------

#[async_trait]
pub trait VoteRepo: Send {
    /// Hold the target's row until the unit of work ends. Every vote
    /// transition on a target takes this first. False if the target does not
    /// exist.
    async fn lock_vote_target(&mut self, target: VoteTarget) -> Result<bool>;

    async fn find_vote(&mut self, voter_id: Uuid, target: VoteTarget) -> Result<Option<Vote>>;

    async fn insert_vote(
        &mut self,
        voter_id: Uuid,
        target: VoteTarget,
        kind: VoteKind,
    ) -> Result<Vote>;

    /// Returns rows changed: 0 if the vote is gone.
    async fn set_vote_kind(&mut self, vote_id: Uuid, kind: VoteKind) -> Result<u64>;

    /// Returns rows removed: 0 if the vote is gone.
    async fn delete_vote(&mut self, vote_id: Uuid) -> Result<u64>;

    /// Add `delta` to the target's counter for `kind`. Returns the updated
    /// tally, or `None` if the target does not exist.
    async fn apply_tally(
        &mut self,
        target: VoteTarget,
        kind: VoteKind,
        delta: i64,
    ) -> Result<Option<VoteTally>>;
}

// ---------------------------------------------------------------------------
// AnswerRepo
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AnswerRepo: Send {
    async fn insert_answer(&mut self, new: &NewAnswer) -> Result<Answer>;

    /// Page through a question's answers, fetching one row past the page.
    async fn list_answers(
        &mut self,
        question_id: Uuid,
        sort: AnswerSort,
        page: Page,
    ) -> Result<Vec<Answer>>;

    async fn count_answers(&mut self, question_id: Uuid) -> Result<i64>;
}

// ---------------------------------------------------------------------------
// CollectionRepo: saved questions
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CollectionRepo: Send {
    async fn find_saved(&mut self, user_id: Uuid, question_id: Uuid)
        -> Result<Option<SavedQuestion>>;

    async fn insert_saved(&mut self, user_id: Uuid, question_id: Uuid) -> Result<SavedQuestion>;

    async fn delete_saved(&mut self, id: Uuid) -> Result<()>;
}

// ---------------------------------------------------------------------------
// UserRepo: community directory
// ---------------------------------------------------------------------------

#[async_trait]
pub trait UserRepo: Send {
    /// Create the profile for `id`, or overwrite its name and username.
    async fn upsert_user(&mut self, id: Uuid, name: &str, username: &str) -> Result<User>;

    /// Case-insensitive username lookup.
    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>>;

    /// Page through profiles matching a name or username substring, fetching
    /// one row past the page.
    async fn list_users(&mut self, query: Option<&str>, sort: UserSort, page: Page)
        -> Result<Vec<User>>;
}
