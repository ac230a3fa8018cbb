// Voting on questions and answers.
//
// Each (voter, target) pair is in one of three states: no vote, upvoted, or
// downvoted. Every transition changes the vote record and the target's tally
// in the same unit of work.

use anyhow::anyhow;
use tracing::info;

use devflow_common::params::CastVoteParams;
use devflow_common::types::{Actor, Vote, VoteKind, VoteState, VoteTally, VoteTarget};
use devflow_common::{ActionResponse, DevflowError};
use devflow_store::{Store, UnitOfWork, VoteRepo};

use crate::{require_actor, respond, respond_done, settle};

/// What a cast did to the voter's existing vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Cast(VoteKind),
    Retracted(VoteKind),
    Switched { from: VoteKind, to: VoteKind },
}

/// Cast, retract, or switch a vote. Repeating the current kind retracts it.
pub async fn cast_vote<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    params: CastVoteParams,
) -> ActionResponse<()> {
    respond_done("cast_vote", cast_vote_inner(store, actor, params).await)
}

async fn cast_vote_inner<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    params: CastVoteParams,
) -> Result<(), DevflowError> {
    let actor = require_actor(actor)?;
    let target = VoteTarget::new(params.target_kind, params.target_id);

    let mut tx = store.begin().await?;
    let result = transition(&mut tx, actor, target, params.vote_kind).await;
    let outcome = settle(tx, result).await?;

    info!(voter_id = %actor.user_id, %target, ?outcome, "Vote recorded");
    Ok(())
}

async fn transition<U: UnitOfWork>(
    tx: &mut U,
    actor: &Actor,
    target: VoteTarget,
    kind: VoteKind,
) -> Result<VoteOutcome, DevflowError> {
    if !tx.lock_vote_target(target).await? {
        return Err(DevflowError::VoteCountUpdate);
    }

    match tx.find_vote(actor.user_id, target).await? {
        None => {
            tx.insert_vote(actor.user_id, target, kind).await?;
            update_vote_count(tx, target, kind, 1).await?;
            Ok(VoteOutcome::Cast(kind))
        }
        Some(existing) if existing.kind == kind => {
            require_row(tx.delete_vote(existing.id).await?, &existing)?;
            update_vote_count(tx, target, kind, -1).await?;
            Ok(VoteOutcome::Retracted(kind))
        }
        Some(existing) => {
            require_row(tx.set_vote_kind(existing.id, kind).await?, &existing)?;
            update_vote_count(tx, target, existing.kind, -1).await?;
            update_vote_count(tx, target, kind, 1).await?;
            Ok(VoteOutcome::Switched {
                from: existing.kind,
                to: kind,
            })
        }
    }
}

/// A vote read under the target lock must still be there when it is changed.
fn require_row(rows: u64, vote: &Vote) -> Result<(), DevflowError> {
    if rows == 0 {
        return Err(anyhow!("vote {} on {} disappeared mid-transition", vote.id, vote.target()).into());
    }
    Ok(())
}

/// Apply a signed change to one counter on the target. A missing target is an
/// error so the surrounding unit of work rolls back.
pub async fn update_vote_count<U: VoteRepo>(
    tx: &mut U,
    target: VoteTarget,
    kind: VoteKind,
    delta: i64,
) -> Result<VoteTally, DevflowError> {
    tx.apply_tally(target, kind, delta)
        .await?
        .ok_or(DevflowError::VoteCountUpdate)
}

/// Whether the actor currently up- or downvotes the target.
pub async fn vote_state<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    target: VoteTarget,
) -> ActionResponse<VoteState> {
    respond("vote_state", vote_state_inner(store, actor, target).await)
}

async fn vote_state_inner<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    target: VoteTarget,
) -> Result<VoteState, DevflowError> {
    let actor = require_actor(actor)?;

    let mut tx = store.begin().await?;
    let result = tx
        .find_vote(actor.user_id, target)
        .await
        .map_err(DevflowError::from);
    let vote = settle(tx, result).await?;

    Ok(VoteState::from_vote(vote.as_ref()))
}
