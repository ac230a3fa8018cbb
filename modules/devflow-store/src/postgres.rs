// Postgres implementation of the Q&A repositories.
//
// PgStore hands out PgUnitOfWork values wrapping a sqlx transaction. Every
// repository call runs on that transaction; dropping it uncommitted rolls back.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use devflow_common::types::{
    Answer, AnswerSort, NewAnswer, NewQuestion, Page, Question, SavedQuestion, Tag, TagLink,
    TagName, TagSort, User, UserSort, Vote, VoteKind, VoteTally, VoteTarget,
};

use crate::traits::{
    AnswerRepo, CollectionRepo, QuestionRepo, Store, TagRepo, UnitOfWork, UserRepo, VoteRepo,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        info!("Migrations complete");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork> {
        let tx = self.pool.begin().await.context("Failed to begin transaction")?;
        Ok(PgUnitOfWork { tx })
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// --- Rows ---

#[derive(Debug, sqlx::FromRow)]
struct QuestionRow {
    id: Uuid,
    title: String,
    content: String,
    author_id: Uuid,
    tag_ids: Vec<Uuid>,
    upvotes: i64,
    downvotes: i64,
    views: i64,
    answers: i64,
    created_at: DateTime<Utc>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            tag_ids: row.tag_ids,
            tally: VoteTally {
                upvotes: row.upvotes,
                downvotes: row.downvotes,
            },
            views: row.views,
            answers: row.answers,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TagRow {
    id: Uuid,
    name: String,
    questions: i64,
    created_at: DateTime<Utc>,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            questions: row.questions,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnswerRow {
    id: Uuid,
    question_id: Uuid,
    author_id: Uuid,
    content: String,
    upvotes: i64,
    downvotes: i64,
    created_at: DateTime<Utc>,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: row.id,
            question_id: row.question_id,
            author_id: row.author_id,
            content: row.content,
            tally: VoteTally {
                upvotes: row.upvotes,
                downvotes: row.downvotes,
            },
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VoteRow {
    id: Uuid,
    voter_id: Uuid,
    target_id: Uuid,
    target_kind: String,
    kind: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = anyhow::Error;

    fn try_from(row: VoteRow) -> Result<Self> {
        Ok(Vote {
            id: row.id,
            voter_id: row.voter_id,
            target_id: row.target_id,
            target_kind: row.target_kind.parse()?,
            kind: row.kind.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SavedRow {
    id: Uuid,
    user_id: Uuid,
    question_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<SavedRow> for SavedQuestion {
    fn from(row: SavedRow) -> Self {
        SavedQuestion {
            id: row.id,
            user_id: row.user_id,
            question_id: row.question_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    username: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            username: row.username,
            created_at: row.created_at,
        }
    }
}

fn tag_order(sort: TagSort) -> &'static str {
    match sort {
        TagSort::Popular => "questions DESC, name ASC",
        TagSort::Recent => "created_at DESC",
        TagSort::Oldest => "created_at ASC",
        TagSort::Name => "name ASC",
    }
}

fn user_order(sort: UserSort) -> &'static str {
    match sort {
        UserSort::NewUsers => "u.created_at DESC",
        UserSort::OldUsers => "u.created_at ASC",
        UserSort::TopContributors => {
            "(SELECT COUNT(*) FROM questions q WHERE q.author_id = u.id) DESC, u.created_at ASC"
        }
    }
}

fn answer_order(sort: AnswerSort) -> &'static str {
    match sort {
        AnswerSort::Latest => "created_at DESC",
        AnswerSort::Oldest => "created_at ASC",
        AnswerSort::Popular => "upvotes DESC, created_at DESC",
    }
}

// --- QuestionRepo ---

#[async_trait]
impl QuestionRepo for PgUnitOfWork {
    async fn insert_question(&mut self, new: &NewQuestion) -> Result<Question> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            INSERT INTO questions (id, title, content, author_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.content)
        .bind(new.author_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn find_question(&mut self, id: Uuid) -> Result<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>("SELECT * FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn lock_question(&mut self, id: Uuid) -> Result<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(
            "SELECT * FROM questions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn save_question(&mut self, question: &Question) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE questions
            SET title = $2, content = $3, tag_ids = $4
            WHERE id = $1
            "#,
        )
        .bind(question.id)
        .bind(&question.title)
        .bind(&question.content)
        .bind(&question.tag_ids)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            bail!("question {} vanished before save", question.id);
        }
        Ok(())
    }

    async fn increment_views(&mut self, id: Uuid) -> Result<Option<i64>> {
        let views = sqlx::query_scalar::<_, i64>(
            "UPDATE questions SET views = views + 1 WHERE id = $1 RETURNING views",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(views)
    }

    async fn adjust_answer_count(&mut self, id: Uuid, delta: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE questions SET answers = answers + $2 WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn questions_for_tag(
        &mut self,
        tag_id: Uuid,
        title_query: Option<&str>,
        page: Page,
    ) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT q.* FROM questions q
            JOIN tag_questions tq ON tq.question_id = q.id
            WHERE tq.tag_id = $1
              AND ($2::text IS NULL OR position($2 in lower(q.title)) > 0)
            ORDER BY q.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tag_id)
        .bind(title_query)
        .bind(page.limit() + 1)
        .bind(page.offset())
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// --- TagRepo ---

#[async_trait]
impl TagRepo for PgUnitOfWork {
    async fn upsert_tag(&mut self, name: &TagName) -> Result<Tag> {
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            INSERT INTO tags (id, name, questions)
            VALUES ($1, $2, 1)
            ON CONFLICT (name) DO UPDATE SET questions = tags.questions + 1
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        debug!(tag = %row.name, questions = row.questions, "Tag upserted");
        Ok(row.into())
    }

    async fn find_tag(&mut self, id: Uuid) -> Result<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn tags_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, TagRow>("SELECT * FROM tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await?;

        let mut tags: Vec<Tag> = rows.into_iter().map(Into::into).collect();
        tags.sort_by_key(|t| ids.iter().position(|id| *id == t.id));
        Ok(tags)
    }

    async fn decrement_tags(&mut self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("UPDATE tags SET questions = questions - 1 WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_tags(
        &mut self,
        name_query: Option<&str>,
        sort: TagSort,
        page: Page,
    ) -> Result<Vec<Tag>> {
        let sql = format!(
            r#"
            SELECT * FROM tags
            WHERE $1::text IS NULL OR position($1 in name) > 0
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            tag_order(sort)
        );

        let rows = sqlx::query_as::<_, TagRow>(&sql)
            .bind(name_query)
            .bind(page.limit() + 1)
            .bind(page.offset())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_tag_links(&mut self, links: &[TagLink]) -> Result<u64> {
        if links.is_empty() {
            return Ok(0);
        }

        let (tag_ids, question_ids): (Vec<Uuid>, Vec<Uuid>) =
            links.iter().map(|l| (l.tag_id, l.question_id)).unzip();

        let result = sqlx::query(
            r#"
            INSERT INTO tag_questions (tag_id, question_id)
            SELECT * FROM UNNEST($1::uuid[], $2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&tag_ids)
        .bind(&question_ids)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_tag_links(&mut self, question_id: Uuid, tag_ids: &[Uuid]) -> Result<u64> {
        if tag_ids.is_empty() {
            return Ok(0);
        }

        let result =
            sqlx::query("DELETE FROM tag_questions WHERE question_id = $1 AND tag_id = ANY($2)")
                .bind(question_id)
                .bind(tag_ids)
                .execute(&mut *self.tx)
                .await?;

        Ok(result.rows_affected())
    }
}

// --- VoteRepo ---

#[async_trait]
impl VoteRepo for PgUnitOfWork {
    async fn lock_vote_target(&mut self, target: VoteTarget) -> Result<bool> {
        let sql = match target {
            VoteTarget::Question(_) => "SELECT id FROM questions WHERE id = $1 FOR UPDATE",
            VoteTarget::Answer(_) => "SELECT id FROM answers WHERE id = $1 FOR UPDATE",
        };

        let row = sqlx::query_scalar::<_, Uuid>(sql)
            .bind(target.id())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.is_some())
    }

    async fn find_vote(&mut self, voter_id: Uuid, target: VoteTarget) -> Result<Option<Vote>> {
        let row = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT * FROM votes
            WHERE voter_id = $1 AND target_id = $2 AND target_kind = $3
            "#,
        )
        .bind(voter_id)
        .bind(target.id())
        .bind(target.kind().as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Vote::try_from).transpose()
    }

    async fn insert_vote(
        &mut self,
        voter_id: Uuid,
        target: VoteTarget,
        kind: VoteKind,
    ) -> Result<Vote> {
        let row = sqlx::query_as::<_, VoteRow>(
            r#"
            INSERT INTO votes (id, voter_id, target_id, target_kind, kind)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(voter_id)
        .bind(target.id())
        .bind(target.kind().as_str())
        .bind(kind.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn set_vote_kind(&mut self, vote_id: Uuid, kind: VoteKind) -> Result<u64> {
        let result = sqlx::query("UPDATE votes SET kind = $2 WHERE id = $1")
            .bind(vote_id)
            .bind(kind.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_vote(&mut self, vote_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM votes WHERE id = $1")
            .bind(vote_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn apply_tally(
        &mut self,
        target: VoteTarget,
        kind: VoteKind,
        delta: i64,
    ) -> Result<Option<VoteTally>> {
        let sql = match (target, kind) {
            (VoteTarget::Question(_), VoteKind::Upvote) => {
                "UPDATE questions SET upvotes = upvotes + $2 WHERE id = $1 RETURNING upvotes, downvotes"
            }
            (VoteTarget::Question(_), VoteKind::Downvote) => {
                "UPDATE questions SET downvotes = downvotes + $2 WHERE id = $1 RETURNING upvotes, downvotes"
            }
            (VoteTarget::Answer(_), VoteKind::Upvote) => {
                "UPDATE answers SET upvotes = upvotes + $2 WHERE id = $1 RETURNING upvotes, downvotes"
            }
            (VoteTarget::Answer(_), VoteKind::Downvote) => {
                "UPDATE answers SET downvotes = downvotes + $2 WHERE id = $1 RETURNING upvotes, downvotes"
            }
        };

        let row = sqlx::query_as::<_, (i64, i64)>(sql)
            .bind(target.id())
            .bind(delta)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(|(upvotes, downvotes)| VoteTally { upvotes, downvotes }))
    }
}

// --- AnswerRepo ---

#[async_trait]
impl AnswerRepo for PgUnitOfWork {
    async fn insert_answer(&mut self, new: &NewAnswer) -> Result<Answer> {
        let row = sqlx::query_as::<_, AnswerRow>(
            r#"
            INSERT INTO answers (id, question_id, author_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.question_id)
        .bind(new.author_id)
        .bind(&new.content)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn list_answers(
        &mut self,
        question_id: Uuid,
        sort: AnswerSort,
        page: Page,
    ) -> Result<Vec<Answer>> {
        let sql = format!(
            r#"
            SELECT * FROM answers
            WHERE question_id = $1
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            answer_order(sort)
        );

        let rows = sqlx::query_as::<_, AnswerRow>(&sql)
            .bind(question_id)
            .bind(page.limit() + 1)
            .bind(page.offset())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_answers(&mut self, question_id: Uuid) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM answers WHERE question_id = $1")
                .bind(question_id)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(count)
    }
}

// --- CollectionRepo ---

#[async_trait]
impl CollectionRepo for PgUnitOfWork {
    async fn find_saved(
        &mut self,
        user_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<SavedQuestion>> {
        let row = sqlx::query_as::<_, SavedRow>(
            "SELECT * FROM saved_questions WHERE user_id = $1 AND question_id = $2",
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_saved(&mut self, user_id: Uuid, question_id: Uuid) -> Result<SavedQuestion> {
        let row = sqlx::query_as::<_, SavedRow>(
            r#"
            INSERT INTO saved_questions (id, user_id, question_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(question_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn delete_saved(&mut self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM saved_questions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}

// --- UserRepo ---

#[async_trait]
impl UserRepo for PgUnitOfWork {
    async fn upsert_user(&mut self, id: Uuid, name: &str, username: &str) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, username)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, username = EXCLUDED.username
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(username)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE lower(username) = lower($1)",
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_users(
        &mut self,
        query: Option<&str>,
        sort: UserSort,
        page: Page,
    ) -> Result<Vec<User>> {
        let sql = format!(
            r#"
            SELECT u.* FROM users u
            WHERE $1::text IS NULL
               OR position($1 in lower(u.name)) > 0
               OR position($1 in lower(u.username)) > 0
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            user_order(sort)
        );

        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(query)
            .bind(page.limit() + 1)
            .bind(page.offset())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
