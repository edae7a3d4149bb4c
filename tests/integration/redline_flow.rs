//! Review workflow: reconciler output becomes suggestions, a reviewer acts
//! on them through a shared handle, and the document is saved and reloaded.

use redline_core::anchor::{anchor_text, DEFAULT_MIN_PARAGRAPH_CHARS};
use redline_core::persist::{AutoSaver, JsonFileSink, PersistedDocument};
use redline_core::reconcile::{Correction, Reconciler};
use redline_core::redline::{
    DocumentHandle, Navigation, RedlineEvent, RedlineStore, SuggestionDefaults, SuggestionFilter,
    SuggestionStatus, SuggestionType,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

const OPINION: &str = "The appellant argue that the trial court erred.\n\n\
We disagree, and affirm the judgement of the district court.\n\n\
See Smith v. Jones, 123 F.3d 456 (9th Cir. 1997).";

fn corrections(anchored: &redline_core::AnchoredText) -> Vec<Correction> {
    let ids: Vec<_> = anchored.map().iter().map(|entry| entry.id).collect();
    vec![
        Correction::new(ids[0], 14, 19, "argue", "argues").with_kind("grammar"),
        Correction::new(ids[1], 28, 37, "judgement", "judgment")
            .with_kind("spelling")
            .with_explanation("American usage"),
        Correction::new(ids[2], 4, 18, "Smith v. Jones", "Smith v. Jones, Inc.")
            .with_kind("citation"),
    ]
}

fn store_from_reconciler() -> RedlineStore {
    let anchored = anchor_text(OPINION, DEFAULT_MIN_PARAGRAPH_CHARS).unwrap();
    let resolved: Vec<_> = Reconciler::default()
        .resolve(&anchored, &corrections(&anchored))
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    let mut store = RedlineStore::new("opinion-1", OPINION);
    store
        .suggestions_from_resolved(&anchored, &resolved, SuggestionDefaults::default())
        .unwrap();
    store
}

#[test]
fn resolved_corrections_point_into_clean_text() {
    let store = store_from_reconciler();
    let texts: Vec<&str> = store
        .suggestions()
        .map(|s| &OPINION[s.start..s.end])
        .collect();
    assert_eq!(texts, vec!["argue", "judgement", "Smith v. Jones"]);

    let kinds: Vec<SuggestionType> = store.suggestions().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SuggestionType::Grammar,
            SuggestionType::Spelling,
            SuggestionType::Citation
        ]
    );
}

#[test]
fn accepting_all_matches_reconciler_output() {
    let anchored = anchor_text(OPINION, DEFAULT_MIN_PARAGRAPH_CHARS).unwrap();
    let report = Reconciler::default().reconcile(&anchored, &corrections(&anchored));

    let mut store = store_from_reconciler();
    let ids: Vec<_> = store.suggestions().map(|s| s.id).collect();
    for id in ids {
        store.accept(id).unwrap();
    }

    assert_eq!(
        store.current_content(),
        redline_core::strip_anchors(&report.text)
    );
    assert_eq!(store.original_content(), OPINION);
    assert_eq!(store.metadata().accepted_suggestions, 3);
}

#[test]
fn review_session_with_navigation_and_filters() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut store = store_from_reconciler();
    store.subscribe(tx);

    let first = store.navigate(Navigation::Next).unwrap().unwrap();
    store.modify(first, "contends").unwrap();
    let second = store.navigate(Navigation::Next).unwrap().unwrap();
    store.reject(second).unwrap();
    let third = store.navigate(Navigation::Next).unwrap().unwrap();
    store.accept(third).unwrap();

    assert!(store
        .current_content()
        .starts_with("The appellant contends that"));
    assert!(store.current_content().contains("the judgement of"));
    assert!(store.current_content().contains("See Smith v. Jones, Inc., 123"));

    let pending = store.apply_filters(&SuggestionFilter::pending_only());
    assert!(pending.iter().all(|s| s.status == SuggestionStatus::Modified));

    let mutations = std::iter::from_fn(|| rx.try_recv().ok())
        .filter(RedlineEvent::is_mutation)
        .count();
    assert_eq!(mutations, 3);
}

#[test]
fn accepted_text_is_found_in_rendered_html() {
    let mut store = store_from_reconciler();
    let citation = store
        .suggestions()
        .find(|s| s.kind == SuggestionType::Citation)
        .map(|s| s.id)
        .unwrap();
    store.accept(citation).unwrap();

    let html = "<p>See <i>Smith&nbsp;v.&nbsp;Jones,&nbsp;Inc.</i>, 123 F.3d 456.</p>";
    let located = store.locate_in_html(citation, html).unwrap();
    assert_eq!(
        &html[located.range.as_range()],
        "Smith&nbsp;v.&nbsp;Jones,&nbsp;Inc."
    );
}

#[tokio::test]
async fn handle_autosaves_to_disk_and_reloads() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(JsonFileSink::new(dir.path()));
    let saver = Arc::new(AutoSaver::spawn(sink.clone(), Duration::from_millis(10)));
    let handle = DocumentHandle::new(store_from_reconciler()).with_autosave(saver.clone());

    let ids = handle
        .read(|store| store.suggestions().map(|s| s.id).collect::<Vec<_>>())
        .await;
    handle.accept(ids[1]).await.unwrap();
    handle.reject(ids[0]).await.unwrap();
    saver.shutdown().await;

    let loaded = sink.load("opinion-1").await.unwrap();
    assert_eq!(loaded, handle.snapshot().await);
    assert_eq!(loaded.metadata.accepted_suggestions, 1);
    assert_eq!(loaded.metadata.rejected_suggestions, 1);

    let restored = loaded.into_store();
    assert!(restored.current_content().contains("the judgment of"));
    let citation = restored.get(ids[2]).unwrap();
    assert_eq!(
        &restored.current_content()[citation.start..citation.end],
        "Smith v. Jones"
    );
    assert_eq!(
        PersistedDocument::from_store(&restored).content_hash,
        handle.snapshot().await.content_hash
    );
}
