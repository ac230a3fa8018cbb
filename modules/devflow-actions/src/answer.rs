use tracing::info;
use uuid::Uuid;

use devflow_common::params::{CreateAnswerParams, ListAnswersParams};
use devflow_common::types::{Actor, Answer, AnswerList, NewAnswer, Page};
use devflow_common::{ActionResponse, DevflowError, Validate};
use devflow_store::{AnswerRepo, QuestionRepo, Store, UnitOfWork};

use crate::{require_actor, respond, settle};

/// Post an answer and bump the question's answer count.
pub async fn create_answer<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    params: CreateAnswerParams,
) -> ActionResponse<Answer> {
    respond("create_answer", create_answer_inner(store, actor, params).await)
}

async fn create_answer_inner<S: Store>(
    store: &S,
    actor: Option<&Actor>,
    params: CreateAnswerParams,
) -> Result<Answer, DevflowError> {
    params.validate()?;
    let actor = require_actor(actor)?;

    let new = NewAnswer {
        question_id: params.question_id,
        author_id: actor.user_id,
        content: params.content.trim().to_string(),
    };

    let mut tx = store.begin().await?;
    let result = insert_answer(&mut tx, &new).await;
    let answer = settle(tx, result).await?;

    info!(
        answer_id = %answer.id,
        question_id = %answer.question_id,
        "Answer created"
    );
    Ok(answer)
}

async fn insert_answer<U: UnitOfWork>(tx: &mut U, new: &NewAnswer) -> Result<Answer, DevflowError> {
    if tx.find_question(new.question_id).await?.is_none() {
        return Err(DevflowError::NotFound("Question"));
    }

    let answer = tx.insert_answer(new).await?;
    if !tx.adjust_answer_count(new.question_id, 1).await? {
        return Err(DevflowError::NotFound("Question"));
    }
    Ok(answer)
}

/// Page through a question's answers.
pub async fn list_answers<S: Store>(
    store: &S,
    question_id: Uuid,
    params: ListAnswersParams,
) -> ActionResponse<AnswerList> {
    respond("list_answers", list_answers_inner(store, question_id, params).await)
}

async fn list_answers_inner<S: Store>(
    store: &S,
    question_id: Uuid,
    params: ListAnswersParams,
) -> Result<AnswerList, DevflowError> {
    let page = Page::new(params.page, params.page_size);
    let sort = params.filter.unwrap_or_default();

    let mut tx = store.begin().await?;
    let result = async {
        if tx.find_question(question_id).await?.is_none() {
            return Err(DevflowError::NotFound("Question"));
        }
        let rows = tx.list_answers(question_id, sort, page).await?;
        let total = tx.count_answers(question_id).await?;
        Ok::<_, DevflowError>((rows, total))
    }
    .await;
    let (rows, total_answers) = settle(tx, result).await?;

    let (answers, is_next) = page.finish(rows);
    Ok(AnswerList {
        answers,
        is_next,
        total_answers,
    })
}
