//! Model output in the shapes it actually arrives in.

use redline_core::anchor::{anchor_text, DEFAULT_MIN_PARAGRAPH_CHARS};
use redline_core::reconcile::{
    Outcome, ParseFailure, PayloadSource, ReconcileError, Reconciler,
};

const BRIEF: &str = "The court have jurisdiction over this matter.\n\n\
II.\n\n\
Defendant filed it's motion on March 3.";

fn reconcile(payload: &str) -> Result<redline_core::ReconcileReport, ReconcileError> {
    let anchored = anchor_text(BRIEF, DEFAULT_MIN_PARAGRAPH_CHARS).unwrap();
    Reconciler::default().reconcile_payload(&anchored, payload)
}

#[test]
fn prose_wrapped_array_is_extracted() {
    let payload = r#"Sure! Here are the corrections you asked for:
[{"anchor":"P-00001","start_offset":10,"end_offset":14,"type":"grammar",
  "status":"error","errors":["subject-verb agreement"],"orig":"have","suggested":"has"}]
Hope this helps."#;

    let report = reconcile(payload).unwrap();
    assert_eq!(report.source, Some(PayloadSource::Extracted));
    assert!(report.text.contains("The court has jurisdiction"));
}

#[test]
fn footnote_markers_in_prose_do_not_hide_the_array() {
    let payload = r#"Per note [1] the verb is wrong [sic]. Corrections:
[{"anchor":"P-00001","start_offset":10,"end_offset":14,"orig":"have","suggested":"has",
  "errors":"agreement","status":1}]"#;

    let report = reconcile(payload).unwrap();
    assert_eq!(report.source, Some(PayloadSource::Extracted));
    assert_eq!(report.applied_count(), 1);
    assert!(report.text.contains("The court has jurisdiction"));
}

#[test]
fn short_heading_does_not_consume_an_anchor() {
    // "II." is too short to anchor, so the third paragraph is P-00002.
    let payload = r#"```
[{"anchor":"⟦P-00002⟧","start_offset":16,"end_offset":20,"orig":"it's","suggested":"its"}]
```"#;

    let report = reconcile(payload).unwrap();
    assert_eq!(report.source, Some(PayloadSource::Fenced));
    assert_eq!(report.applied_count(), 1);
    assert!(report.text.contains("Defendant filed its motion"));
}

#[test]
fn every_item_gets_an_outcome() {
    let payload = r#"[
        {"anchor":"P-00001","start_offset":10,"end_offset":14,"orig":"have","suggested":"has"},
        {"anchor":"P-00001","start_offset":10,"end_offset":27,"orig":"have jurisdiction","suggested":"has authority"},
        {"anchor":"P-00042","start_offset":0,"end_offset":3,"orig":"The","suggested":"A"},
        {"anchor":"P-00002","start_offset":0,"end_offset":9,"orig":"Plaintiff","suggested":"Defendant"},
        {"anchor":"P-00002","start_offset":-1,"end_offset":3,"orig":"Def","suggested":"def"},
        "not an object",
        {"anchor":"P-00002","start_offset":0,"end_offset":9,"orig":"Defendant","suggested":"Defendant"}
    ]"#;

    let report = reconcile(payload).unwrap();
    let labels: Vec<&str> = report.outcomes.iter().map(|o| o.outcome.label()).collect();
    assert_eq!(
        labels,
        vec![
            "applied",
            "conflicting-range",
            "anchor-not-found",
            "validation-mismatch",
            "offset-out-of-range",
            "malformed",
            "no-change",
        ]
    );
    assert_eq!(report.failed_count(), 5);
}

#[test]
fn whole_payload_failures_surface_to_caller() {
    assert!(matches!(
        reconcile(""),
        Err(ReconcileError::Parse(ParseFailure::Empty))
    ));
    assert!(matches!(
        reconcile("I could not find any errors."),
        Err(ReconcileError::Parse(ParseFailure::InvalidJson { .. }))
    ));
    assert!(matches!(
        reconcile(r#"{"corrections": []}"#),
        Err(ReconcileError::Parse(ParseFailure::NotAnArray { .. }))
    ));
}

#[test]
fn empty_array_is_a_successful_no_op() {
    let report = reconcile("[]").unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(
        redline_core::strip_anchors(&report.text),
        BRIEF
    );
}

#[test]
fn report_serializes_outcomes_with_status_tag() {
    let report = reconcile(
        r#"[{"anchor":"P-00001","start_offset":10,"end_offset":14,"orig":"have","suggested":"has"}]"#,
    )
    .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcomes"][0]["status"], "applied");
    assert_eq!(json["outcomes"][0]["anchor"], "P-00001");
    assert!(matches!(report.outcomes[0].outcome, Outcome::Applied { .. }));
}
