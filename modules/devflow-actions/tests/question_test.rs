//! Question create/edit workflows: tag registry, links, and rollback.

mod harness;

use devflow_actions::question::{create_question, edit_question, get_question, increment_views};
use devflow_common::types::{TagLink, TagName};
use devflow_common::ErrorKind;
use devflow_store::{Fault, MemoryStore, Store, TagRepo, UnitOfWork};
use uuid::Uuid;

use harness::*;

// =========================================================================
// Create
// =========================================================================

#[tokio::test]
async fn create_collapses_case_duplicates() {
    let store = MemoryStore::new();
    let author = actor();

    let question = seed_question(&store, &author, &["Java", "java", "Python"]).await;
    assert_eq!(question.tag_ids.len(), 2);

    let state = store.snapshot().await;
    assert_eq!(state.tags.len(), 2);
    assert_eq!(tag_count(&state, "java"), Some(1));
    assert_eq!(tag_count(&state, "python"), Some(1));
    assert_eq!(state.links_for_question(question.id).len(), 2);
    assert_consistent(&state);
}

#[tokio::test]
async fn tags_differing_only_in_case_share_one_record() {
    let store = MemoryStore::new();
    let author = actor();

    seed_question(&store, &author, &["Rust"]).await;
    seed_question(&store, &author, &["rust"]).await;

    let state = store.snapshot().await;
    assert_eq!(state.tags.len(), 1);
    let tag = state.tag_by_name("rust").unwrap();
    assert_eq!(tag.questions, 2);
    assert_eq!(state.links_for_tag(tag.id), 2);
    assert_consistent(&state);
}

#[tokio::test]
async fn create_keeps_tag_input_order() {
    let store = MemoryStore::new();
    let question = seed_question(&store, &actor(), &["tokio", "axum", "sqlx"]).await;

    let detail = get_question(&store, question.id).await.data.unwrap();
    let names: Vec<&str> = detail.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["tokio", "axum", "sqlx"]);
}

#[tokio::test]
async fn create_requires_actor() {
    let store = MemoryStore::new();
    let resp = create_question(&store, None, ask("How does borrowing work?", &["rust"])).await;

    assert!(!resp.success);
    assert_eq!(resp.error_kind(), Some(ErrorKind::Unauthorized));
    assert_eq!(resp.message(), Some("Unauthorized"));
    assert!(store.snapshot().await.questions.is_empty());
}

#[tokio::test]
async fn create_rejects_invalid_params_before_writing() {
    let store = MemoryStore::new();
    let resp = create_question(&store, Some(&actor()), ask("Hey", &[])).await;

    assert_eq!(resp.error_kind(), Some(ErrorKind::Validation));
    let details = resp.error.unwrap().details.unwrap();
    assert!(details.get("title").is_some());
    assert!(details.get("tags").is_some());
    assert!(store.snapshot().await.questions.is_empty());
}

#[tokio::test]
async fn failed_insert_reports_creation_failure() {
    let store = MemoryStore::new();
    store.fail_on(Fault::InsertQuestion);

    let resp = create_question(&store, Some(&actor()), ask("How does borrowing work?", &["rust"])).await;
    assert_eq!(resp.message(), Some("Failed to create question"));
}

#[tokio::test]
async fn failure_after_tag_upsert_rolls_everything_back() {
    let store = MemoryStore::new();
    let author = actor();
    seed_question(&store, &author, &["rust"]).await;
    let before = store.snapshot().await;

    for fault in [Fault::InsertTagLinks, Fault::SaveQuestion, Fault::Commit] {
        store.fail_on(fault);
        let resp =
            create_question(&store, Some(&author), ask("What is a lifetime?", &["rust", "go"])).await;
        store.clear_faults();

        assert!(!resp.success, "{fault:?} should fail the action");
        assert_eq!(resp.message(), Some("An unexpected error occurred"));
        let after = store.snapshot().await;
        assert!(same_records(&before, &after), "{fault:?} leaked writes");
    }
}

// =========================================================================
// Edit
// =========================================================================

#[tokio::test]
async fn edit_swaps_tags_and_keeps_empty_tag() {
    let store = MemoryStore::new();
    let author = actor();
    let question = seed_question(&store, &author, &["java"]).await;

    let resp = edit_question(
        &store,
        Some(&author),
        edit(&question, &question.title, BODY, &["python"]),
    )
    .await;
    assert!(resp.success, "{:?}", resp.error);
    let edited = resp.data.unwrap();

    let state = store.snapshot().await;
    assert_eq!(tag_count(&state, "java"), Some(0));
    assert_eq!(tag_count(&state, "python"), Some(1));
    assert_eq!(state.links_for_question(question.id).len(), 1);
    assert_eq!(edited.tag_ids, vec![state.tag_by_name("python").unwrap().id]);
    assert_consistent(&state);
}

#[tokio::test]
async fn edit_with_same_tags_changes_nothing_tag_side() {
    let store = MemoryStore::new();
    let author = actor();
    let question = seed_question(&store, &author, &["rust", "async"]).await;
    let before = store.snapshot().await;

    let resp = edit_question(
        &store,
        Some(&author),
        edit(&question, &question.title, BODY, &["Async", "RUST"]),
    )
    .await;
    assert!(resp.success);

    let after = store.snapshot().await;
    assert_eq!(before.tags, after.tags);
    assert_eq!(before.links, after.links);
    assert_eq!(after.questions[&question.id].tag_ids, question.tag_ids);
}

#[tokio::test]
async fn edit_updates_title_and_content_when_either_changes() {
    let store = MemoryStore::new();
    let author = actor();
    let question = seed_question(&store, &author, &["rust"]).await;

    let new_body = "Updated body with more detail about the borrow checker.";
    let resp = edit_question(
        &store,
        Some(&author),
        edit(&question, &question.title, new_body, &["rust"]),
    )
    .await;
    assert!(resp.success);

    let stored = &store.snapshot().await.questions[&question.id];
    assert_eq!(stored.content, new_body);
    assert_eq!(stored.title, question.title);
}

#[tokio::test]
async fn edit_by_non_author_is_rejected_without_writes() {
    let store = MemoryStore::new();
    let author = actor();
    let question = seed_question(&store, &author, &["java"]).await;
    let before = store.snapshot().await;

    let resp = edit_question(
        &store,
        Some(&actor()),
        edit(&question, "A completely new title", BODY, &["python"]),
    )
    .await;

    assert!(!resp.success);
    assert_eq!(resp.message(), Some("Unauthorized"));
    assert!(same_records(&before, &store.snapshot().await));
}

#[tokio::test]
async fn edit_missing_question_is_not_found() {
    let store = MemoryStore::new();
    let author = actor();
    let question = seed_question(&store, &author, &["java"]).await;

    let mut params = edit(&question, &question.title, BODY, &["java"]);
    params.question_id = Uuid::new_v4();
    let resp = edit_question(&store, Some(&author), params).await;

    assert_eq!(resp.error_kind(), Some(ErrorKind::NotFound));
    assert_eq!(resp.message(), Some("Question not found"));
}

#[tokio::test]
async fn failure_while_removing_tags_restores_previous_state() {
    let store = MemoryStore::new();
    let author = actor();
    let question = seed_question(&store, &author, &["java", "go"]).await;
    let before = store.snapshot().await;

    for fault in [Fault::DecrementTags, Fault::DeleteTagLinks, Fault::UpsertTag] {
        store.fail_on(fault);
        let resp = edit_question(
            &store,
            Some(&author),
            edit(&question, "Renamed question title", BODY, &["python"]),
        )
        .await;
        store.clear_faults();

        assert!(!resp.success, "{fault:?} should fail the action");
        assert!(same_records(&before, &store.snapshot().await), "{fault:?} leaked writes");
    }
}

#[tokio::test]
async fn edit_aborts_when_a_new_link_already_exists() {
    let store = MemoryStore::new();
    let author = actor();
    let question = seed_question(&store, &author, &["java"]).await;

    // A link the question's tag list does not know about.
    let mut tx = store.begin().await.unwrap();
    let python = tx.upsert_tag(&TagName::parse("python").unwrap()).await.unwrap();
    let stale = TagLink {
        tag_id: python.id,
        question_id: question.id,
    };
    tx.insert_tag_links(&[stale]).await.unwrap();
    tx.commit().await.unwrap();
    let before = store.snapshot().await;

    let resp = edit_question(
        &store,
        Some(&author),
        edit(&question, &question.title, BODY, &["java", "python"]),
    )
    .await;

    assert_eq!(resp.error_kind(), Some(ErrorKind::Internal));
    assert_eq!(resp.message(), Some("An unexpected error occurred"));
    assert!(same_records(&before, &store.snapshot().await));
    assert_eq!(tag_count(&store.snapshot().await, "python"), Some(1));
}

#[tokio::test]
async fn counters_match_links_after_mixed_edits() {
    let store = MemoryStore::new();
    let author = actor();
    let first = seed_question(&store, &author, &["rust", "tokio"]).await;
    let second = seed_question(&store, &author, &["Tokio", "axum"]).await;

    let steps: [(&_, &[&str]); 4] = [
        (&first, &["rust", "axum"]),
        (&second, &["sqlx"]),
        (&first, &["SQLX", "Tokio", "rust"]),
        (&second, &["axum", "tokio"]),
    ];
    for (question, tags) in steps {
        let resp = edit_question(
            &store,
            Some(&author),
            edit(question, &question.title, BODY, tags),
        )
        .await;
        assert!(resp.success, "{:?}", resp.error);
        assert_consistent(&store.snapshot().await);
    }

    let state = store.snapshot().await;
    assert_eq!(tag_count(&state, "tokio"), Some(2));
    assert_eq!(tag_count(&state, "sqlx"), Some(1));
    assert_eq!(tag_count(&state, "axum"), Some(1));
    assert_eq!(tag_count(&state, "rust"), Some(1));
}

// =========================================================================
// Read
// =========================================================================

#[tokio::test]
async fn get_question_resolves_tags() {
    let store = MemoryStore::new();
    let question = seed_question(&store, &actor(), &["rust"]).await;

    let resp = get_question(&store, question.id).await;
    let detail = resp.data.unwrap();
    assert_eq!(detail.question.id, question.id);
    assert_eq!(detail.tags.len(), 1);
    assert_eq!(detail.tags[0].name, "rust");

    let missing = get_question(&store, Uuid::new_v4()).await;
    assert_eq!(missing.error_kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn views_increment_one_at_a_time() {
    let store = MemoryStore::new();
    let question = seed_question(&store, &actor(), &["rust"]).await;

    assert_eq!(increment_views(&store, question.id).await.data.unwrap().views, 1);
    assert_eq!(increment_views(&store, question.id).await.data.unwrap().views, 2);

    let missing = increment_views(&store, Uuid::new_v4()).await;
    assert_eq!(missing.error_kind(), Some(ErrorKind::NotFound));
}
