//! Vote state machine and tally bookkeeping.

mod harness;

use devflow_actions::answer::create_answer;
use devflow_actions::vote::{cast_vote, update_vote_count, vote_state};
use devflow_common::params::CastVoteParams;
use devflow_common::types::{Actor, TargetKind, VoteKind, VoteState, VoteTally, VoteTarget};
use devflow_common::{DevflowError, ErrorKind};
use devflow_store::{Fault, MemoryStore, Store};
use uuid::Uuid;

use harness::*;

fn vote(target_id: Uuid, target_kind: TargetKind, vote_kind: VoteKind) -> CastVoteParams {
    CastVoteParams {
        target_id,
        target_kind,
        vote_kind,
    }
}

async fn question_tally(store: &MemoryStore, id: Uuid) -> VoteTally {
    store.snapshot().await.questions[&id].tally
}

async fn state_for(store: &MemoryStore, voter: &Actor, target: VoteTarget) -> VoteState {
    vote_state(store, Some(voter), target).await.data.unwrap()
}

#[tokio::test]
async fn upvote_then_repeat_toggles_off() {
    let store = MemoryStore::new();
    let question = seed_question(&store, &actor(), &["rust"]).await;
    let voter = actor();
    let up = vote(question.id, TargetKind::Question, VoteKind::Upvote);

    let resp = cast_vote(&store, Some(&voter), up).await;
    assert!(resp.success);
    assert!(resp.data.is_none());
    assert_eq!(question_tally(&store, question.id).await.upvotes, 1);

    cast_vote(&store, Some(&voter), up).await;
    let state = store.snapshot().await;
    assert_eq!(state.questions[&question.id].tally, VoteTally::default());
    assert!(state.votes.is_empty());
    assert_consistent(&state);
}

#[tokio::test]
async fn switching_kind_moves_the_count() {
    let store = MemoryStore::new();
    let question = seed_question(&store, &actor(), &["rust"]).await;
    let voter = actor();
    let target = VoteTarget::Question(question.id);

    cast_vote(&store, Some(&voter), vote(question.id, TargetKind::Question, VoteKind::Upvote)).await;
    let resp = cast_vote(
        &store,
        Some(&voter),
        vote(question.id, TargetKind::Question, VoteKind::Downvote),
    )
    .await;
    assert!(resp.success);

    assert_eq!(
        question_tally(&store, question.id).await,
        VoteTally { upvotes: 0, downvotes: 1 }
    );
    assert_eq!(
        state_for(&store, &voter, target).await,
        VoteState { has_upvoted: false, has_downvoted: true }
    );
    let state = store.snapshot().await;
    assert_eq!(state.votes.len(), 1);
    assert_consistent(&state);
}

#[tokio::test]
async fn many_voters_each_hold_one_vote() {
    let store = MemoryStore::new();
    let question = seed_question(&store, &actor(), &["rust"]).await;
    let voters: Vec<Actor> = (0..5).map(|_| actor()).collect();

    for (i, voter) in voters.iter().enumerate() {
        let kind = if i % 2 == 0 { VoteKind::Upvote } else { VoteKind::Downvote };
        cast_vote(&store, Some(voter), vote(question.id, TargetKind::Question, kind)).await;
    }
    // The first voter flips, the second retracts.
    cast_vote(&store, Some(&voters[0]), vote(question.id, TargetKind::Question, VoteKind::Downvote)).await;
    cast_vote(&store, Some(&voters[1]), vote(question.id, TargetKind::Question, VoteKind::Downvote)).await;

    let state = store.snapshot().await;
    assert_eq!(state.votes.len(), 4);
    assert_eq!(state.questions[&question.id].tally, VoteTally { upvotes: 2, downvotes: 2 });
    assert_consistent(&state);
}

#[tokio::test]
async fn concurrent_votes_from_one_voter_stay_consistent() {
    let store = MemoryStore::new();
    let question = seed_question(&store, &actor(), &["rust"]).await;
    let voter = actor();
    let up = vote(question.id, TargetKind::Question, VoteKind::Upvote);

    let (a, b, c) = futures::join!(
        cast_vote(&store, Some(&voter), up),
        cast_vote(&store, Some(&voter), up),
        cast_vote(&store, Some(&voter), up),
    );
    assert!(a.success && b.success && c.success);

    let state = store.snapshot().await;
    assert_eq!(state.votes.len(), 1);
    assert_eq!(state.questions[&question.id].tally.upvotes, 1);
    assert_consistent(&state);
}

#[tokio::test]
async fn votes_on_answers_update_the_answer() {
    let store = MemoryStore::new();
    let author = actor();
    let question = seed_question(&store, &author, &["rust"]).await;
    let answer = create_answer(&store, Some(&author), answer_params(question.id))
        .await
        .data
        .unwrap();
    let voter = actor();

    cast_vote(&store, Some(&voter), vote(answer.id, TargetKind::Answer, VoteKind::Downvote)).await;

    let state = store.snapshot().await;
    assert_eq!(state.answers[&answer.id].tally.downvotes, 1);
    assert_eq!(state.questions[&question.id].tally, VoteTally::default());
    assert_eq!(
        state_for(&store, &voter, VoteTarget::Answer(answer.id)).await,
        VoteState { has_upvoted: false, has_downvoted: true }
    );
    // Same id, other kind: nothing recorded.
    assert_eq!(
        state_for(&store, &voter, VoteTarget::Question(answer.id)).await,
        VoteState::default()
    );
}

#[tokio::test]
async fn vote_on_missing_target_fails_and_rolls_back() {
    let store = MemoryStore::new();
    let resp = cast_vote(
        &store,
        Some(&actor()),
        vote(Uuid::new_v4(), TargetKind::Answer, VoteKind::Upvote),
    )
    .await;

    assert!(!resp.success);
    assert_eq!(resp.message(), Some("Failed to update vote count"));
    assert!(store.snapshot().await.votes.is_empty());
}

#[tokio::test]
async fn tally_failure_discards_vote_record() {
    let store = MemoryStore::new();
    let question = seed_question(&store, &actor(), &["rust"]).await;
    let voter = actor();
    let up = vote(question.id, TargetKind::Question, VoteKind::Upvote);
    cast_vote(&store, Some(&voter), up).await;
    let before = store.snapshot().await;

    store.fail_on(Fault::ApplyTally);
    let resp = cast_vote(
        &store,
        Some(&voter),
        vote(question.id, TargetKind::Question, VoteKind::Downvote),
    )
    .await;
    store.clear_faults();

    assert!(!resp.success);
    assert!(same_records(&before, &store.snapshot().await));
}

#[tokio::test]
async fn voting_requires_actor() {
    let store = MemoryStore::new();
    let question = seed_question(&store, &actor(), &["rust"]).await;

    let resp = cast_vote(&store, None, vote(question.id, TargetKind::Question, VoteKind::Upvote)).await;
    assert_eq!(resp.error_kind(), Some(ErrorKind::Unauthorized));

    let resp = vote_state(&store, None, VoteTarget::Question(question.id)).await;
    assert_eq!(resp.error_kind(), Some(ErrorKind::Unauthorized));
}

#[tokio::test]
async fn no_vote_reports_both_flags_false() {
    let store = MemoryStore::new();
    let question = seed_question(&store, &actor(), &["rust"]).await;

    let resp = vote_state(&store, Some(&actor()), VoteTarget::Question(question.id)).await;
    assert!(resp.success);
    assert_eq!(resp.data, Some(VoteState::default()));
}

#[tokio::test]
async fn update_vote_count_reports_missing_target() {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.unwrap();

    let err = update_vote_count(&mut tx, VoteTarget::Question(Uuid::new_v4()), VoteKind::Upvote, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, DevflowError::VoteCountUpdate));
}
