//! Integration tests for the `redline` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const PLEADING: &str = "Plaintiff alleges fraud.\n\nDefendant denies all claims.";

fn redline(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_redline"))
        .args(args)
        .env_remove("REDLINE_CONFIG")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_help_lists_subcommands() {
    let output = redline(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["anchor", "reconcile", "locate", "map", "extract"] {
        assert!(text.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_anchor_prints_anchored_text() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "pleading.txt", PLEADING);

    let output = redline(&["anchor", &file]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "⟦P-00001⟧Plaintiff alleges fraud.\n\n⟦P-00002⟧Defendant denies all claims."
    );
}

#[test]
fn test_anchor_map_is_json() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "pleading.txt", PLEADING);

    let output = redline(&["anchor", &file, "--map"]);
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 2);
    assert_eq!(entries[1]["id"], "P-00002");
    assert_eq!(entries[0]["offset"], 13);
}

#[test]
fn test_reconcile_writes_corrected_text() {
    let dir = TempDir::new().unwrap();
    let text = write(dir.path(), "pleading.txt", PLEADING);
    let corrections = write(
        dir.path(),
        "corrections.json",
        r#"[{"anchor":"P-00001","start_offset":0,"end_offset":9,"orig":"Plaintiff","suggested":"Plaintiffs"},
            {"anchor":"P-00002","start_offset":0,"end_offset":9,"orig":"Plaintiff","suggested":"X"}]"#,
    );
    let out = dir.path().join("out.txt");

    let output = redline(&[
        "reconcile",
        "--text",
        &text,
        "--corrections",
        &corrections,
        "--out",
        out.to_str().unwrap(),
        "--diff",
    ]);
    assert!(output.status.success());

    let report = stdout(&output);
    assert!(report.contains("1 applied"));
    assert!(report.contains("1 failed"));
    assert!(report.contains("+Plaintiffs alleges fraud."));
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "Plaintiffs alleges fraud.\n\nDefendant denies all claims."
    );
}

#[test]
fn test_reconcile_json_report() {
    let dir = TempDir::new().unwrap();
    let text = write(dir.path(), "pleading.txt", PLEADING);
    let corrections = write(
        dir.path(),
        "corrections.txt",
        "```json\n[{\"anchor\":\"P-00002\",\"start_offset\":10,\"end_offset\":16,\"orig\":\"denies\",\"suggested\":\"denied\"}]\n```",
    );

    let output = redline(&["reconcile", "-t", &text, "-r", &corrections, "--json"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["source"], "fenced");
    assert_eq!(report["outcomes"][0]["status"], "applied");
}

#[test]
fn test_reconcile_fails_on_unparseable_payload() {
    let dir = TempDir::new().unwrap();
    let text = write(dir.path(), "pleading.txt", PLEADING);
    let corrections = write(dir.path(), "corrections.txt", "no corrections, sorry");

    let output = redline(&["reconcile", "--text", &text, "--corrections", &corrections]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not valid JSON"));
}

#[test]
fn test_locate_reports_strategy() {
    let dir = TempDir::new().unwrap();
    let html = write(dir.path(), "doc.html", "<p>Smith&nbsp;v.&nbsp;Jones</p>");

    let output = redline(&["locate", "--haystack", &html, "--needle", "Smith v. Jones"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "3 27 position-map");

    let missing = redline(&["locate", "--haystack", &html, "--needle", "habeas corpus"]);
    assert_eq!(missing.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("could not locate text"));
}

#[test]
fn test_map_both_directions() {
    let dir = TempDir::new().unwrap();
    let html = write(dir.path(), "doc.html", "<p>ab</p>");

    let to_html = redline(&["map", "--html", &html, "--plain", "1"]);
    assert_eq!(stdout(&to_html).trim(), "4");

    let to_plain = redline(&["map", "--html", &html, "--html-pos", "4"]);
    assert_eq!(stdout(&to_plain).trim(), "1");

    let neither = redline(&["map", "--html", &html]);
    assert!(!neither.status.success());
}

#[test]
fn test_extract_normalizes_whitespace() {
    let dir = TempDir::new().unwrap();
    let html = write(
        dir.path(),
        "doc.html",
        "<html><body><p>Smith&nbsp;v.\n   Jones</p><script>var x = 1;</script></body></html>",
    );

    let output = redline(&["extract", &html]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim_end(), "Smith v. Jones");
}

#[test]
fn test_config_flag_changes_anchoring() {
    let dir = TempDir::new().unwrap();
    let file = write(dir.path(), "doc.txt", "Short one.\n\nA much longer paragraph here.");
    let config = write(dir.path(), "redline.toml", "[anchors]\nmin_paragraph_chars = 20\n");

    let output = redline(&["--config", &config, "anchor", &file]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "Short one.\n\n⟦P-00001⟧A much longer paragraph here."
    );

    let bad = write(dir.path(), "bad.toml", "[anchors]\nmin_paragraph_chars = 0\n");
    let output = redline(&["--config", &bad, "anchor", &file]);
    assert!(!output.status.success());
}
