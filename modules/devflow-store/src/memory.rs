// In-memory store for tests.
//
// A transaction takes the state lock for its whole lifetime and keeps a
// snapshot of the state as it was at `begin`. Dropping the transaction without
// a successful commit puts the snapshot back, so a failed workflow leaves no
// trace. Individual repository calls can be made to fail with `fail_on`.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use devflow_common::types::{
    Answer, AnswerSort, NewAnswer, NewQuestion, Page, Question, SavedQuestion, Tag, TagLink,
    Tallied, TagName, TagSort, User, UserSort, Vote, VoteKind, VoteTally, VoteTarget,
};

use crate::traits::{
    AnswerRepo, CollectionRepo, QuestionRepo, Store, TagRepo, UnitOfWork, UserRepo, VoteRepo,
};

/// Repository calls that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    InsertQuestion,
    SaveQuestion,
    UpsertTag,
    InsertTagLinks,
    DeleteTagLinks,
    DecrementTags,
    InsertVote,
    SetVoteKind,
    DeleteVote,
    ApplyTally,
    InsertAnswer,
    AdjustAnswerCount,
    InsertSaved,
    UpsertUser,
    Commit,
}

// ---------------------------------------------------------------------------
// MemoryState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub questions: HashMap<Uuid, Question>,
    pub tags: HashMap<Uuid, Tag>,
    pub links: BTreeSet<TagLink>,
    pub votes: HashMap<Uuid, Vote>,
    pub answers: HashMap<Uuid, Answer>,
    pub saved: HashMap<Uuid, SavedQuestion>,
    pub users: HashMap<Uuid, User>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Strictly increasing timestamps so recency ordering is deterministic.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    pub fn tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.values().find(|t| t.name == name)
    }

    pub fn links_for_question(&self, question_id: Uuid) -> BTreeSet<Uuid> {
        self.links
            .iter()
            .filter(|l| l.question_id == question_id)
            .map(|l| l.tag_id)
            .collect()
    }

    pub fn links_for_tag(&self, tag_id: Uuid) -> usize {
        self.links.iter().filter(|l| l.tag_id == tag_id).count()
    }

    /// Every way the stored counters and references disagree with the
    /// records they summarize. Empty when the state is consistent.
    pub fn consistency_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for q in self.questions.values() {
            let listed: BTreeSet<Uuid> = q.tag_ids.iter().copied().collect();
            if listed.len() != q.tag_ids.len() {
                violations.push(format!("question {} lists a tag twice", q.id));
            }
            if listed != self.links_for_question(q.id) {
                violations.push(format!("question {} tag list differs from its links", q.id));
            }
            let tally = self.tally_from_votes(VoteTarget::Question(q.id));
            if tally != q.tally {
                violations.push(format!(
                    "question {} tally {:?} but votes say {:?}",
                    q.id, q.tally, tally
                ));
            }
            let answers = self.answers.values().filter(|a| a.question_id == q.id).count();
            if answers as i64 != q.answers {
                violations.push(format!(
                    "question {} answer count {} but has {}",
                    q.id, q.answers, answers
                ));
            }
        }

        for tag in self.tags.values() {
            let linked = self.links_for_tag(tag.id) as i64;
            if linked != tag.questions {
                violations.push(format!(
                    "tag {} counter {} but has {} links",
                    tag.name, tag.questions, linked
                ));
            }
        }

        for a in self.answers.values() {
            let tally = self.tally_from_votes(VoteTarget::Answer(a.id));
            if tally != a.tally {
                violations.push(format!(
                    "answer {} tally {:?} but votes say {:?}",
                    a.id, a.tally, tally
                ));
            }
        }

        let mut seen = HashSet::new();
        for v in self.votes.values() {
            if !seen.insert((v.voter_id, v.target())) {
                violations.push(format!("voter {} has two votes on {}", v.voter_id, v.target()));
            }
        }

        violations
    }

    fn tally_from_votes(&self, target: VoteTarget) -> VoteTally {
        let mut tally = VoteTally::default();
        for v in self.votes.values().filter(|v| v.target() == target) {
            tally.apply(v.kind, 1);
        }
        tally
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<AsyncMutex<MemoryState>>,
    faults: Arc<Mutex<HashSet<Fault>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call matching `fault` fail until cleared.
    pub fn fail_on(&self, fault: Fault) {
        self.faults.lock().unwrap().insert(fault);
    }

    pub fn clear_faults(&self) {
        self.faults.lock().unwrap().clear();
    }

    /// Copy of the committed state. Waits for any open transaction.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = Some(guard.clone());
        Ok(MemoryTx {
            state: guard,
            snapshot,
            faults: self.faults.clone(),
        })
    }
}

pub struct MemoryTx {
    state: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
    faults: Arc<Mutex<HashSet<Fault>>>,
}

impl MemoryTx {
    fn check(&self, fault: Fault) -> Result<()> {
        if self.faults.lock().unwrap().contains(&fault) {
            bail!("MemoryStore: forced failure on {fault:?}");
        }
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.state = snapshot;
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryTx {
    async fn commit(mut self) -> Result<()> {
        self.check(Fault::Commit)?;
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

fn matches_query(haystack: &str, query: Option<&str>) -> bool {
    query.map_or(true, |q| haystack.to_lowercase().contains(q))
}

fn window<T>(rows: Vec<T>, page: Page) -> Vec<T> {
    rows.into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize + 1)
        .collect()
}

// --- QuestionRepo ---

#[async_trait]
impl QuestionRepo for MemoryTx {
    async fn insert_question(&mut self, new: &NewQuestion) -> Result<Question> {
        self.check(Fault::InsertQuestion)?;
        let question = Question {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            content: new.content.clone(),
            author_id: new.author_id,
            tag_ids: Vec::new(),
            tally: VoteTally::default(),
            views: 0,
            answers: 0,
            created_at: self.state.next_timestamp(),
        };
        self.state.questions.insert(question.id, question.clone());
        Ok(question)
    }

    async fn find_question(&mut self, id: Uuid) -> Result<Option<Question>> {
        Ok(self.state.questions.get(&id).cloned())
    }

    async fn lock_question(&mut self, id: Uuid) -> Result<Option<Question>> {
        // The state lock already serializes units of work.
        self.find_question(id).await
    }

    async fn save_question(&mut self, question: &Question) -> Result<()> {
        self.check(Fault::SaveQuestion)?;
        let Some(stored) = self.state.questions.get_mut(&question.id) else {
            bail!("question {} vanished before save", question.id);
        };
        stored.title = question.title.clone();
        stored.content = question.content.clone();
        stored.tag_ids = question.tag_ids.clone();
        Ok(())
    }

    async fn increment_views(&mut self, id: Uuid) -> Result<Option<i64>> {
        Ok(self.state.questions.get_mut(&id).map(|q| {
            q.views += 1;
            q.views
        }))
    }

    async fn adjust_answer_count(&mut self, id: Uuid, delta: i64) -> Result<bool> {
        self.check(Fault::AdjustAnswerCount)?;
        Ok(match self.state.questions.get_mut(&id) {
            Some(q) => {
                q.answers += delta;
                true
            }
            None => false,
        })
    }

    async fn questions_for_tag(
        &mut self,
        tag_id: Uuid,
        title_query: Option<&str>,
        page: Page,
    ) -> Result<Vec<Question>> {
        let mut rows: Vec<Question> = self
            .state
            .links
            .iter()
            .filter(|l| l.tag_id == tag_id)
            .filter_map(|l| self.state.questions.get(&l.question_id))
            .filter(|q| matches_query(&q.title, title_query))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(window(rows, page))
    }
}

// --- TagRepo ---

#[async_trait]
impl TagRepo for MemoryTx {
    async fn upsert_tag(&mut self, name: &TagName) -> Result<Tag> {
        self.check(Fault::UpsertTag)?;
        if let Some(tag) = self.state.tags.values_mut().find(|t| t.name == name.as_str()) {
            tag.questions += 1;
            return Ok(tag.clone());
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.as_str().to_string(),
            questions: 1,
            created_at: self.state.next_timestamp(),
        };
        self.state.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn find_tag(&mut self, id: Uuid) -> Result<Option<Tag>> {
        Ok(self.state.tags.get(&id).cloned())
    }

    async fn tags_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Tag>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.state.tags.get(id).cloned())
            .collect())
    }

    async fn decrement_tags(&mut self, ids: &[Uuid]) -> Result<u64> {
        self.check(Fault::DecrementTags)?;
        let mut touched = 0;
        for id in ids {
            if let Some(tag) = self.state.tags.get_mut(id) {
                tag.questions -= 1;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn list_tags(
        &mut self,
        name_query: Option<&str>,
        sort: TagSort,
        page: Page,
    ) -> Result<Vec<Tag>> {
        let mut rows: Vec<Tag> = self
            .state
            .tags
            .values()
            .filter(|t| matches_query(&t.name, name_query))
            .cloned()
            .collect();
        match sort {
            TagSort::Popular => {
                rows.sort_by(|a, b| b.questions.cmp(&a.questions).then(a.name.cmp(&b.name)))
            }
            TagSort::Recent => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            TagSort::Oldest => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            TagSort::Name => rows.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        Ok(window(rows, page))
    }

    async fn insert_tag_links(&mut self, links: &[TagLink]) -> Result<u64> {
        self.check(Fault::InsertTagLinks)?;
        let mut inserted = 0;
        for link in links {
            if self.state.links.insert(*link) {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn delete_tag_links(&mut self, question_id: Uuid, tag_ids: &[Uuid]) -> Result<u64> {
        self.check(Fault::DeleteTagLinks)?;
        let mut removed = 0;
        for tag_id in tag_ids {
            if self.state.links.remove(&TagLink {
                tag_id: *tag_id,
                question_id,
            }) {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

// --- VoteRepo ---

#[async_trait]
impl VoteRepo for MemoryTx {
    async fn lock_vote_target(&mut self, target: VoteTarget) -> Result<bool> {
        Ok(match target {
            VoteTarget::Question(id) => self.state.questions.contains_key(&id),
            VoteTarget::Answer(id) => self.state.answers.contains_key(&id),
        })
    }

    async fn find_vote(&mut self, voter_id: Uuid, target: VoteTarget) -> Result<Option<Vote>> {
        Ok(self
            .state
            .votes
            .values()
            .find(|v| v.voter_id == voter_id && v.target() == target)
            .cloned())
    }

    async fn insert_vote(
        &mut self,
        voter_id: Uuid,
        target: VoteTarget,
        kind: VoteKind,
    ) -> Result<Vote> {
        self.check(Fault::InsertVote)?;
        if self
            .state
            .votes
            .values()
            .any(|v| v.voter_id == voter_id && v.target() == target)
        {
            bail!("duplicate vote for {voter_id} on {target}");
        }
        let vote = Vote {
            id: Uuid::new_v4(),
            voter_id,
            target_id: target.id(),
            target_kind: target.kind(),
            kind,
            created_at: self.state.next_timestamp(),
        };
        self.state.votes.insert(vote.id, vote.clone());
        Ok(vote)
    }

    async fn set_vote_kind(&mut self, vote_id: Uuid, kind: VoteKind) -> Result<u64> {
        self.check(Fault::SetVoteKind)?;
        Ok(match self.state.votes.get_mut(&vote_id) {
            Some(vote) => {
                vote.kind = kind;
                1
            }
            None => 0,
        })
    }

    async fn delete_vote(&mut self, vote_id: Uuid) -> Result<u64> {
        self.check(Fault::DeleteVote)?;
        Ok(u64::from(self.state.votes.remove(&vote_id).is_some()))
    }

    async fn apply_tally(
        &mut self,
        target: VoteTarget,
        kind: VoteKind,
        delta: i64,
    ) -> Result<Option<VoteTally>> {
        self.check(Fault::ApplyTally)?;
        let entity: Option<&mut dyn Tallied> = match target {
            VoteTarget::Question(id) => {
                self.state.questions.get_mut(&id).map(|q| q as &mut dyn Tallied)
            }
            VoteTarget::Answer(id) => {
                self.state.answers.get_mut(&id).map(|a| a as &mut dyn Tallied)
            }
        };
        Ok(entity.map(|e| {
            e.apply_vote(kind, delta);
            *e.tally()
        }))
    }
}

// --- AnswerRepo ---

#[async_trait]
impl AnswerRepo for MemoryTx {
    async fn insert_answer(&mut self, new: &NewAnswer) -> Result<Answer> {
        self.check(Fault::InsertAnswer)?;
        let answer = Answer {
            id: Uuid::new_v4(),
            question_id: new.question_id,
            author_id: new.author_id,
            content: new.content.clone(),
            tally: VoteTally::default(),
            created_at: self.state.next_timestamp(),
        };
        self.state.answers.insert(answer.id, answer.clone());
        Ok(answer)
    }

    async fn list_answers(
        &mut self,
        question_id: Uuid,
        sort: AnswerSort,
        page: Page,
    ) -> Result<Vec<Answer>> {
        let mut rows: Vec<Answer> = self
            .state
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect();
        match sort {
            AnswerSort::Latest => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            AnswerSort::Oldest => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            AnswerSort::Popular => rows.sort_by(|a, b| {
                b.tally
                    .upvotes
                    .cmp(&a.tally.upvotes)
                    .then(b.created_at.cmp(&a.created_at))
            }),
        }
        Ok(window(rows, page))
    }

    async fn count_answers(&mut self, question_id: Uuid) -> Result<i64> {
        Ok(self
            .state
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .count() as i64)
    }
}

// --- CollectionRepo ---

#[async_trait]
impl CollectionRepo for MemoryTx {
    async fn find_saved(
        &mut self,
        user_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<SavedQuestion>> {
        Ok(self
            .state
            .saved
            .values()
            .find(|s| s.user_id == user_id && s.question_id == question_id)
            .cloned())
    }

    async fn insert_saved(&mut self, user_id: Uuid, question_id: Uuid) -> Result<SavedQuestion> {
        self.check(Fault::InsertSaved)?;
        let saved = SavedQuestion {
            id: Uuid::new_v4(),
            user_id,
            question_id,
            created_at: self.state.next_timestamp(),
        };
        self.state.saved.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete_saved(&mut self, id: Uuid) -> Result<()> {
        self.state.saved.remove(&id);
        Ok(())
    }
}

// --- UserRepo ---

#[async_trait]
impl UserRepo for MemoryTx {
    async fn upsert_user(&mut self, id: Uuid, name: &str, username: &str) -> Result<User> {
        self.check(Fault::UpsertUser)?;
        let created_at = match self.state.users.get(&id) {
            Some(existing) => existing.created_at,
            None => self.state.next_timestamp(),
        };
        let user = User {
            id,
            name: name.to_string(),
            username: username.to_string(),
            created_at,
        };
        self.state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn list_users(
        &mut self,
        query: Option<&str>,
        sort: UserSort,
        page: Page,
    ) -> Result<Vec<User>> {
        let mut rows: Vec<User> = self
            .state
            .users
            .values()
            .filter(|u| matches_query(&u.name, query) || matches_query(&u.username, query))
            .cloned()
            .collect();
        match sort {
            UserSort::NewUsers => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            UserSort::OldUsers => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            UserSort::TopContributors => {
                let authored = |id: Uuid| {
                    self.state
                        .questions
                        .values()
                        .filter(|q| q.author_id == id)
                        .count()
                };
                rows.sort_by(|a, b| {
                    authored(b.id)
                        .cmp(&authored(a.id))
                        .then(a.created_at.cmp(&b.created_at))
                });
            }
        }
        Ok(window(rows, page))
    }
}
