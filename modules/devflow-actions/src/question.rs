// Question workflows: create, edit, read, and view counting.
//
// Create and edit touch four records per tag (question, tag, link, tag
// counter). They run inside one unit of work so the tag counters always equal
// the number of live links.

use anyhow::anyhow;
use tracing::{info, warn};
use uuid::Uuid;

use devflow_common::params::{AskQuestionParams, EditQuestionParams};
use devflow_common::types::{
    normalize_tag_names, Actor, NewQuestion, Question, QuestionDetail, TagLink, TagName, ViewCount,
};
use devflow_common::{ActionResponse, DevflowError, Validate};
use devflow_store::{QuestionRepo, Store, TagRepo, UnitOfWork};

use crate::tag::diff_tags;
use crate::{require_actor, respond, settle};

/// Ask a new question, registering its tags.
pub async fn create_question<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    params: AskQuestionParams,
) -> ActionResponse<Question> {
    respond("create_question", create_question_inner(store, actor, params).await)
}

async fn create_question_inner<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    params: AskQuestionParams,
) -> Result<Question, DevflowError> {
    params.validate()?;
    let actor = require_actor(actor)?;

    let new = NewQuestion {
        title: params.title.trim().to_string(),
        content: params.content.trim().to_string(),
        author_id: actor.user_id,
    };
    let tags = normalize_tag_names(&params.tags);

    let mut tx = store.begin().await?;
    let result = insert_with_tags(&mut tx, &new, &tags).await;
    let question = settle(tx, result).await?;

    info!(
        question_id = %question.id,
        author_id = %question.author_id,
        tags = question.tag_ids.len(),
        "Question created"
    );
    Ok(question)
}

async fn insert_with_tags<U: UnitOfWork>(
    tx: &mut U,
    new: &NewQuestion,
    tags: &[TagName],
) -> Result<Question, DevflowError> {
    let mut question = tx.insert_question(new).await.map_err(|e| {
        warn!(error = %e, "Question insert failed");
        DevflowError::QuestionCreation
    })?;

    let mut links = Vec::with_capacity(tags.len());
    for name in tags {
        let tag = tx.upsert_tag(name).await?;
        question.tag_ids.push(tag.id);
        links.push(TagLink {
            tag_id: tag.id,
            question_id: question.id,
        });
    }

    link_tags(tx, &links).await?;
    tx.save_question(&question).await?;
    Ok(question)
}

/// Edit a question's title, content, and tags. Only the author may edit.
pub async fn edit_question<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    params: EditQuestionParams,
) -> ActionResponse<Question> {
    respond("edit_question", edit_question_inner(store, actor, params).await)
}

async fn edit_question_inner<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    params: EditQuestionParams,
) -> Result<Question, DevflowError> {
    params.validate()?;
    let actor = *require_actor(actor)?;

    let mut tx = store.begin().await?;
    let result = apply_edit(&mut tx, &actor, &params).await;
    let question = settle(tx, result).await?;

    info!(
        question_id = %question.id,
        tags = question.tag_ids.len(),
        "Question edited"
    );
    Ok(question)
}

async fn apply_edit<U: UnitOfWork>(
    tx: &mut U,
    actor: &Actor,
    params: &EditQuestionParams,
) -> Result<Question, DevflowError> {
    let mut question = tx
        .lock_question(params.question_id)
        .await?
        .ok_or(DevflowError::NotFound("Question"))?;

    if question.author_id != actor.user_id {
        return Err(DevflowError::Unauthorized);
    }

    let title = params.title.trim();
    let content = params.content.trim();
    if question.title != title || question.content != content {
        question.title = title.to_string();
        question.content = content.to_string();
    }

    let current = tx.tags_by_ids(&question.tag_ids).await?;
    let wanted = normalize_tag_names(&params.tags);
    let diff = diff_tags(&current, &wanted);

    let mut links = Vec::with_capacity(diff.add.len());
    for name in &diff.add {
        let tag = tx.upsert_tag(name).await?;
        question.tag_ids.push(tag.id);
        links.push(TagLink {
            tag_id: tag.id,
            question_id: question.id,
        });
    }

    if !diff.remove.is_empty() {
        tx.decrement_tags(&diff.remove).await?;
        tx.delete_tag_links(question.id, &diff.remove).await?;
        question.tag_ids.retain(|id| !diff.remove.contains(id));
    }

    link_tags(tx, &links).await?;
    tx.save_question(&question).await?;
    Ok(question)
}

/// Write the links for tags whose counters were just raised. A link that
/// already exists means the counter was raised twice for one pair.
async fn link_tags<U: TagRepo>(tx: &mut U, links: &[TagLink]) -> Result<(), DevflowError> {
    let inserted = tx.insert_tag_links(links).await?;
    if inserted != links.len() as u64 {
        return Err(anyhow!(
            "{} of {} tag links already existed",
            links.len() as u64 - inserted,
            links.len()
        )
        .into());
    }
    Ok(())
}

/// A question with its tags resolved.
pub async fn get_question<S: Store>(store: &S, question_id: Uuid) -> ActionResponse<QuestionDetail> {
    respond("get_question", get_question_inner(store, question_id).await)
}

async fn get_question_inner<S: Store>(
    store: &S,
    question_id: Uuid,
) -> Result<QuestionDetail, DevflowError> {
    let mut tx = store.begin().await?;
    let result = async {
        let question = tx
            .find_question(question_id)
            .await?
            .ok_or(DevflowError::NotFound("Question"))?;
        let tags = tx.tags_by_ids(&question.tag_ids).await?;
        Ok::<_, DevflowError>(QuestionDetail { question, tags })
    }
    .await;
    settle(tx, result).await
}

pub async fn increment_views<S: Store>(store: &S, question_id: Uuid) -> ActionResponse<ViewCount> {
    respond("increment_views", increment_views_inner(store, question_id).await)
}

async fn increment_views_inner<S: Store>(
    store: &S,
    question_id: Uuid,
) -> Result<ViewCount, DevflowError> {
    let mut tx = store.begin().await?;
    let result = match tx.increment_views(question_id).await {
        Ok(Some(views)) => Ok(ViewCount { views }),
        Ok(None) => Err(DevflowError::NotFound("Question")),
        Err(e) => Err(e.into()),
    };
    settle(tx, result).await
}
