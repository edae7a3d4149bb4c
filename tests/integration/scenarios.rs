//! The documented end-to-end scenarios, run against the public API.

use redline_core::anchor::{anchor_text, AnchorId, DEFAULT_MIN_PARAGRAPH_CHARS};
use redline_core::locator::{find_text_in_html, LocateStrategy, TextLocator};
use redline_core::reconcile::{Correction, Outcome, Reconciler};
use redline_core::redline::{NewSuggestion, RedlineStore, SuggestionStatus};

const PLEADING: &str = "Plaintiff alleges fraud.\n\nDefendant denies all claims.";

#[test]
fn scenario_a_two_paragraphs_two_anchors() {
    let anchored = anchor_text(PLEADING, DEFAULT_MIN_PARAGRAPH_CHARS).unwrap();

    assert_eq!(anchored.map().len(), 2);
    assert!(anchored.as_str().starts_with("⟦P-00001⟧Plaintiff alleges fraud."));
    assert!(anchored
        .as_str()
        .contains("\n\n⟦P-00002⟧Defendant denies all claims."));
}

#[test]
fn scenario_b_correction_shifts_later_anchor() {
    let anchored = anchor_text(PLEADING, DEFAULT_MIN_PARAGRAPH_CHARS).unwrap();
    let second = AnchorId::new(2).unwrap();
    let before = anchored.map().get(second).unwrap().offset;

    let payload = r#"[{"anchor":"P-00001","start_offset":0,"end_offset":9,
        "orig":"Plaintiff","suggested":"Plaintiffs"}]"#;
    let report = Reconciler::default()
        .reconcile_payload(&anchored, payload)
        .unwrap();

    assert_eq!(report.applied_count(), 1);
    assert!(report.text.contains("⟦P-00001⟧Plaintiffs alleges fraud."));
    let after = report.anchors().unwrap().get(second).unwrap().offset;
    assert_eq!(after, before + 1);
}

#[test]
fn scenario_c_entities_resolve_through_mapping() {
    let html = "<p>Smith&nbsp;v.&nbsp;Jones</p>";

    let located = TextLocator::default()
        .locate(html, "Smith v. Jones", None)
        .unwrap();
    assert_eq!(located.strategy, LocateStrategy::PositionMap);

    let range = find_text_in_html(html, "Smith v. Jones").unwrap();
    assert!(range.start < range.end && range.end <= html.len());
    assert_eq!(&html[range.as_range()], "Smith&nbsp;v.&nbsp;Jones");
}

#[test]
fn scenario_d_accept_then_reject_keeps_shifted_range() {
    let content = format!(
        "{}{}{}{}{}",
        "0123456789", "aaaaaaaaaa", "0123456789", "bbbbbbbbbb", " tail"
    );
    let mut store = RedlineStore::new("scenario-d", content);
    let a = store
        .add_suggestion(NewSuggestion::new(10, 20, "aaaaaaaaaa", "AAAAAAAAAAAAAA"))
        .unwrap();
    let b = store
        .add_suggestion(NewSuggestion::new(30, 40, "bbbbbbbbbb", "BBBBBBBBBB"))
        .unwrap();

    store.accept(a).unwrap();
    let content_after_accept = store.current_content().to_string();
    store.reject(b).unwrap();

    let b = store.get(b).unwrap();
    assert_eq!((b.start, b.end), (34, 44));
    assert_eq!(b.status, SuggestionStatus::Rejected);
    assert_eq!(store.current_content(), content_after_accept);
    assert!(store.current_content().contains("bbbbbbbbbb"));
}

#[test]
fn scenario_e_mismatch_changes_nothing() {
    let anchored = anchor_text(PLEADING, DEFAULT_MIN_PARAGRAPH_CHARS).unwrap();
    let correction = Correction::new(AnchorId::new(1).unwrap(), 0, 9, "Defendant", "Defendants");

    let report = Reconciler::default().reconcile(&anchored, &[correction]);

    assert_eq!(report.text, anchored.as_str());
    assert!(matches!(
        report.outcomes[0].outcome,
        Outcome::ValidationMismatch { .. }
    ));
}
