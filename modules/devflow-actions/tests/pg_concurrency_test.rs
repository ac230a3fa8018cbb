//! Concurrent workflows against Postgres.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

mod harness;

use futures::future::join_all;
use uuid::Uuid;

use devflow_actions::question::{create_question, edit_question};
use devflow_actions::vote::cast_vote;
use devflow_common::params::CastVoteParams;
use devflow_common::types::{Actor, Page, Question, TargetKind, VoteKind, VoteTally, VoteTarget};
use devflow_store::{PgStore, QuestionRepo, Store, TagRepo, VoteRepo};

use harness::*;

const ROUNDS: usize = 6;

async fn test_store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let store = PgStore::connect(&url, 10).await.ok()?;
    store.migrate().await.ok()?;
    Some(store)
}

/// A tag name no other test run uses, within the 30 character limit.
fn unique_tag(prefix: &str) -> String {
    format!("{prefix}{}", &Uuid::new_v4().simple().to_string()[..12])
}

async fn seed(store: &PgStore, author: &Actor, tags: &[&str]) -> Question {
    let resp = create_question(store, Some(author), ask("How does borrowing work?", tags)).await;
    assert!(resp.success, "seed failed: {:?}", resp.error);
    resp.data.unwrap()
}

fn question_vote(question: &Question, vote_kind: VoteKind) -> CastVoteParams {
    CastVoteParams {
        target_id: question.id,
        target_kind: TargetKind::Question,
        vote_kind,
    }
}

/// Counter and live link count for one tag.
async fn tag_state(store: &PgStore, tag_id: Uuid) -> (i64, usize) {
    let mut tx = store.begin().await.unwrap();
    let counter = tx.find_tag(tag_id).await.unwrap().unwrap().questions;
    let links = tx
        .questions_for_tag(tag_id, None, Page::new(None, Some(100)))
        .await
        .unwrap()
        .len();
    (counter, links)
}

#[tokio::test]
async fn concurrent_repeat_votes_keep_tally_equal_to_live_votes() {
    let Some(store) = test_store().await else {
        return;
    };
    let question = seed(&store, &actor(), &[unique_tag("v").as_str()]).await;
    let voter = actor();

    let resp = cast_vote(&store, Some(&voter), question_vote(&question, VoteKind::Upvote)).await;
    assert!(resp.success);

    let down = question_vote(&question, VoteKind::Downvote);
    let results = join_all((0..ROUNDS).map(|_| cast_vote(&store, Some(&voter), down))).await;
    assert!(results.iter().all(|r| r.success), "{results:?}");

    let mut tx = store.begin().await.unwrap();
    let tally = tx.find_question(question.id).await.unwrap().unwrap().tally;
    let live = tx
        .find_vote(voter.user_id, VoteTarget::Question(question.id))
        .await
        .unwrap();

    let mut expected = VoteTally::default();
    if let Some(vote) = &live {
        expected.apply(vote.kind, 1);
    }
    assert_eq!(tally, expected);
    // Switch, retract, repeat: an even number of downvotes ends with no vote.
    assert!(live.is_none());
    assert_eq!(tally, VoteTally::default());
}

#[tokio::test]
async fn concurrent_first_votes_from_many_voters_all_count() {
    let Some(store) = test_store().await else {
        return;
    };
    let question = seed(&store, &actor(), &[unique_tag("m").as_str()]).await;
    let voters: Vec<_> = (0..ROUNDS).map(|_| actor()).collect();

    let up = question_vote(&question, VoteKind::Upvote);
    let results = join_all(voters.iter().map(|v| cast_vote(&store, Some(v), up))).await;
    assert!(results.iter().all(|r| r.success), "{results:?}");

    let mut tx = store.begin().await.unwrap();
    let tally = tx.find_question(question.id).await.unwrap().unwrap().tally;
    assert_eq!(tally, VoteTally { upvotes: ROUNDS as i64, downvotes: 0 });
}

#[tokio::test]
async fn concurrent_identical_edits_keep_counters_equal_to_links() {
    let Some(store) = test_store().await else {
        return;
    };
    let author = actor();
    let old_tag = unique_tag("a");
    let new_tag = unique_tag("b");
    let question = seed(&store, &author, &[old_tag.as_str()]).await;
    let old_id = question.tag_ids[0];

    let results = join_all((0..ROUNDS).map(|_| {
        edit_question(
            &store,
            Some(&author),
            edit(&question, &question.title, BODY, &[new_tag.as_str()]),
        )
    }))
    .await;
    assert!(results.iter().all(|r| r.success), "{results:?}");

    let mut tx = store.begin().await.unwrap();
    let stored = tx.find_question(question.id).await.unwrap().unwrap();
    assert_eq!(stored.tag_ids.len(), 1);
    let new_id = stored.tag_ids[0];
    drop(tx);

    assert_eq!(tag_state(&store, old_id).await, (0, 0));
    assert_eq!(tag_state(&store, new_id).await, (1, 1));
}

#[tokio::test]
async fn concurrent_creates_sharing_a_new_tag_count_once_each() {
    let Some(store) = test_store().await else {
        return;
    };
    let author = actor();
    let shared = unique_tag("s");

    let results = join_all((0..ROUNDS).map(|i| {
        let tags = [shared.to_uppercase(), format!("{shared}{i}")];
        let params = ask("What does Send mean?", &[tags[0].as_str(), tags[1].as_str()]);
        create_question(&store, Some(&author), params)
    }))
    .await;
    assert!(results.iter().all(|r| r.success), "{results:?}");

    let tag_id = results[0].data.as_ref().unwrap().tag_ids[0];
    assert!(results
        .iter()
        .all(|r| r.data.as_ref().unwrap().tag_ids[0] == tag_id));
    assert_eq!(tag_state(&store, tag_id).await, (ROUNDS as i64, ROUNDS));
}
