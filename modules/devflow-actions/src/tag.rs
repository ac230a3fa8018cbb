use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use devflow_common::params::{search_query, ListTagsParams, PageParams};
use devflow_common::types::{Page, Tag, TagList, TagName, TagQuestions};
use devflow_common::{ActionResponse, DevflowError};
use devflow_store::{QuestionRepo, Store, TagRepo};

use crate::{respond, settle};

/// How a question's tag set must change to match a new list of names.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Names not currently on the question, in input order.
    pub add: Vec<TagName>,
    /// Current tags whose name is absent from the new list, in question order.
    pub remove: Vec<Uuid>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Compare current tags against the wanted names, case-insensitively.
pub fn diff_tags(current: &[Tag], wanted: &[TagName]) -> TagDiff {
    let current_names: HashSet<TagName> = current
        .iter()
        .filter_map(|t| TagName::parse(&t.name))
        .collect();
    let wanted_names: HashSet<&TagName> = wanted.iter().collect();

    TagDiff {
        add: wanted
            .iter()
            .filter(|name| !current_names.contains(*name))
            .cloned()
            .collect(),
        remove: current
            .iter()
            .filter(|t| {
                TagName::parse(&t.name).map_or(true, |name| !wanted_names.contains(&name))
            })
            .map(|t| t.id)
            .collect(),
    }
}

/// Page through all tags, optionally filtered by a name substring.
pub async fn list_tags<S: Store>(store: &S, params: ListTagsParams) -> ActionResponse<TagList> {
    respond("list_tags", list_tags_inner(store, params).await)
}

async fn list_tags_inner<S: Store>(
    store: &S,
    params: ListTagsParams,
) -> Result<TagList, DevflowError> {
    let page = Page::new(params.page, params.page_size);
    let query = search_query(params.query.as_deref());
    let sort = params.filter.unwrap_or_default();

    let mut tx = store.begin().await?;
    let result = tx
        .list_tags(query.as_deref(), sort, page)
        .await
        .map_err(DevflowError::from);
    let rows = settle(tx, result).await?;

    let (tags, is_next) = page.finish(rows);
    debug!(count = tags.len(), is_next, ?sort, "Listed tags");
    Ok(TagList { tags, is_next })
}

/// Questions carrying a tag, newest first.
pub async fn tag_questions<S: Store>(
    store: &S,
    tag_id: Uuid,
    params: PageParams,
) -> ActionResponse<TagQuestions> {
    respond("tag_questions", tag_questions_inner(store, tag_id, params).await)
}

async fn tag_questions_inner<S: Store>(
    store: &S,
    tag_id: Uuid,
    params: PageParams,
) -> Result<TagQuestions, DevflowError> {
    let page = Page::new(params.page, params.page_size);
    let query = search_query(params.query.as_deref());

    let mut tx = store.begin().await?;
    let result = async {
        let tag = tx
            .find_tag(tag_id)
            .await?
            .ok_or(DevflowError::NotFound("Tag"))?;
        let rows = tx.questions_for_tag(tag_id, query.as_deref(), page).await?;
        Ok::<_, DevflowError>((tag, rows))
    }
    .await;
    let (tag, rows) = settle(tx, result).await?;

    let (questions, is_next) = page.finish(rows);
    Ok(TagQuestions {
        tag,
        questions,
        is_next,
    })
}
