//! Integrity sweep integration tests
//!
//! Each test builds a throwaway `interviews/` tree:
//! - guides at `<root>/interviews/*.json`
//! - sessions at `<root>/interviews/sessions/*.json`

use std::fs;
use std::path::{Path, PathBuf};

use daria_common::config::DataLayout;
use daria_common::{Error, GuideStore, PipelineEvent, SessionStore};
use daria_sweep::{IntegritySweeper, SweepOptions, SweepReport};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Scratch data root with the standard layout
struct Fixture {
    _temp_dir: TempDir,
    layout: DataLayout,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let layout = DataLayout::from_root(temp_dir.path());
        fs::create_dir_all(&layout.sessions_dir).unwrap();
        Self {
            _temp_dir: temp_dir,
            layout,
        }
    }

    fn session(&self, id: &str, content: &str) -> &Self {
        fs::write(self.session_path(id), content).unwrap();
        self
    }

    fn guide(&self, id: &str, value: Value) -> &Self {
        fs::write(self.guide_path(id), serde_json::to_string(&value).unwrap()).unwrap();
        self
    }

    fn raw_guide(&self, id: &str, content: &str) -> &Self {
        fs::write(self.guide_path(id), content).unwrap();
        self
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.layout.sessions_dir.join(format!("{id}.json"))
    }

    fn guide_path(&self, id: &str) -> PathBuf {
        self.layout.guides_dir.join(format!("{id}.json"))
    }

    fn read_guide(&self, id: &str) -> Value {
        serde_json::from_str(&fs::read_to_string(self.guide_path(id)).unwrap()).unwrap()
    }

    fn raw_guide_content(&self, id: &str) -> String {
        fs::read_to_string(self.guide_path(id)).unwrap()
    }

    fn sweeper(&self) -> IntegritySweeper {
        IntegritySweeper::new(
            SessionStore::new(&self.layout.sessions_dir),
            GuideStore::new(&self.layout.guides_dir),
        )
    }

    fn sweep(&self) -> SweepReport {
        self.sweeper().sweep().unwrap()
    }

    fn snapshot(&self) -> Vec<(String, Vec<u8>)> {
        let mut files = Vec::new();
        collect_files(&self.layout.guides_dir, &mut files);
        files.sort();
        files
    }
}

fn collect_files(dir: &Path, out: &mut Vec<(String, Vec<u8>)>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push((path.display().to_string(), fs::read(&path).unwrap()));
        }
    }
}

#[test]
fn test_deletes_empty_session_and_cleans_guide() {
    // A non-empty, B zero bytes, C never existed
    let fx = Fixture::new();
    fx.session("A", r#"{"id": "A"}"#)
        .session("B", "")
        .guide("G", json!({"sessions": ["A", "B", "C"]}));

    let report = fx.sweep();

    assert!(fx.session_path("A").exists());
    assert!(!fx.session_path("B").exists());
    assert_eq!(fx.read_guide("G")["sessions"], json!(["A"]));

    assert_eq!(
        report.events,
        vec![
            PipelineEvent::DeletedEmptySession {
                session_id: "B".to_string()
            },
            PipelineEvent::UpdatedGuide {
                guide: "G.json".to_string(),
                removed_ids: vec!["B".to_string(), "C".to_string()],
            },
        ]
    );
    assert_eq!(report.stats.sessions_scanned, 2);
    assert_eq!(report.stats.sessions_deleted, 1);
    assert_eq!(report.stats.guides_updated, 1);
    assert!(report.valid_ids.contains("A"));
    assert!(!report.valid_ids.contains("B"));
}

#[test]
fn test_sweep_is_a_fixed_point() {
    let fx = Fixture::new();
    fx.session("A", "{}")
        .session("B", "")
        .session("D", r#"{"transcript": "x"}"#)
        .guide("G1", json!({"title": "one", "sessions": ["D", "B", "A", "Z", "A"]}))
        .guide("G2", json!({"sessions": ["Q"]}))
        .raw_guide("broken", "{");

    fx.sweep();
    let after_first = fx.snapshot();

    let second = fx.sweep();
    assert_eq!(fx.snapshot(), after_first);
    assert!(second
        .events
        .iter()
        .all(|e| matches!(e, PipelineEvent::SkippedGuide { .. })));
    assert_eq!(second.stats.guides_updated, 0);
    assert_eq!(second.stats.sessions_deleted, 0);
}

#[test]
fn test_stable_filter_keeps_order_and_duplicates() {
    let fx = Fixture::new();
    fx.session("A", "{}")
        .session("C", "{}")
        .guide("G", json!({"sessions": ["C", "X", "A", "C", "Y", "A"]}));

    fx.sweep();

    assert_eq!(fx.read_guide("G")["sessions"], json!(["C", "A", "C", "A"]));
}

#[test]
fn test_other_guide_fields_are_preserved() {
    let fx = Fixture::new();
    fx.session("A", "{}").raw_guide(
        "G",
        r#"{"id": "G", "title": "Checkout study", "sessions": ["A", "gone"], "questions": [{"q": "why"}], "archived": false}"#,
    );

    fx.sweep();

    let guide = fx.read_guide("G");
    assert_eq!(guide["title"], json!("Checkout study"));
    assert_eq!(guide["questions"], json!([{"q": "why"}]));
    assert_eq!(guide["archived"], json!(false));
    assert_eq!(guide["sessions"], json!(["A"]));
    let keys: Vec<_> = guide.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["id", "title", "sessions", "questions", "archived"]);
}

#[test]
fn test_number_literals_survive_guide_rewrite() {
    let fx = Fixture::new();
    fx.session("A", "{}").raw_guide(
        "G",
        r#"{"big": 123456789012345678901234567890, "ratio": 1.50, "sessions": ["A", "B"]}"#,
    );

    let report = fx.sweep();

    assert_eq!(report.stats.guides_updated, 1);
    assert_eq!(
        fx.raw_guide_content("G"),
        "{\n  \"big\": 123456789012345678901234567890,\n  \"ratio\": 1.50,\n  \"sessions\": [\n    \"A\"\n  ]\n}"
    );
}

#[test]
fn test_empty_sessions_list_is_not_rewritten() {
    let fx = Fixture::new();
    fx.raw_guide("G", r#"{"sessions":[]}"#);

    let report = fx.sweep();

    assert_eq!(fx.raw_guide_content("G"), r#"{"sessions":[]}"#);
    assert!(report.events.is_empty());
}

#[test]
fn test_guides_without_session_list_are_untouched() {
    let fx = Fixture::new();
    fx.raw_guide("absent", r#"{"title":"no sessions"}"#)
        .raw_guide("scalar", r#"{"sessions":"A"}"#)
        .raw_guide("array", r#"["A","B"]"#);

    let report = fx.sweep();

    assert_eq!(fx.raw_guide_content("absent"), r#"{"title":"no sessions"}"#);
    assert_eq!(fx.raw_guide_content("scalar"), r#"{"sessions":"A"}"#);
    assert_eq!(fx.raw_guide_content("array"), r#"["A","B"]"#);
    assert!(report.events.is_empty());
    assert_eq!(report.stats.guides_scanned, 3);
}

#[test]
fn test_subset_guide_is_not_rewritten() {
    let fx = Fixture::new();
    fx.session("A", "{}")
        .session("B", "{}")
        .raw_guide("G", r#"{"sessions":["B","A"]}"#);

    fx.sweep();

    assert_eq!(fx.raw_guide_content("G"), r#"{"sessions":["B","A"]}"#);
}

#[test]
fn test_malformed_guide_is_skipped_and_sweep_continues() {
    let fx = Fixture::new();
    fx.session("A", "{}")
        .raw_guide("a-broken", "{\"sessions\": [\"A\"")
        .guide("b-good", json!({"sessions": ["A", "missing"]}));

    let report = fx.sweep();

    assert_eq!(fx.raw_guide_content("a-broken"), "{\"sessions\": [\"A\"");
    assert_eq!(fx.read_guide("b-good")["sessions"], json!(["A"]));
    assert!(matches!(
        &report.events[0],
        PipelineEvent::SkippedGuide { guide, .. } if guide == "a-broken.json"
    ));
    assert_eq!(report.stats.guides_skipped, 1);
    assert_eq!(report.stats.guides_updated, 1);
}

#[test]
fn test_non_string_session_entries_skip_guide() {
    let fx = Fixture::new();
    let original = r#"{"sessions":["A",{"id":"B"}]}"#;
    fx.raw_guide("G", original);

    let report = fx.sweep();

    assert_eq!(fx.raw_guide_content("G"), original);
    assert!(matches!(
        &report.events[..],
        [PipelineEvent::SkippedGuide { .. }]
    ));
}

#[test]
fn test_braces_only_session_is_retained() {
    let fx = Fixture::new();
    fx.session("S", "{}").guide("G", json!({"sessions": ["S"]}));

    let report = fx.sweep();

    assert!(fx.session_path("S").exists());
    assert!(report.valid_ids.contains("S"));
    assert_eq!(fx.read_guide("G")["sessions"], json!(["S"]));
}

#[test]
fn test_dry_run_reports_without_modifying() {
    let fx = Fixture::new();
    fx.session("A", "{}")
        .session("B", "")
        .guide("G", json!({"sessions": ["A", "B"]}));
    let before = fx.snapshot();

    let report = fx
        .sweeper()
        .with_options(SweepOptions { dry_run: true })
        .sweep()
        .unwrap();

    assert_eq!(fx.snapshot(), before);
    assert!(report.dry_run);
    assert_eq!(report.stats.sessions_deleted, 1);
    assert_eq!(report.stats.guides_updated, 1);
    assert_eq!(
        report.events.last(),
        Some(&PipelineEvent::UpdatedGuide {
            guide: "G.json".to_string(),
            removed_ids: vec!["B".to_string()],
        })
    );
    assert!(!report.valid_ids.contains("B"));
}

#[test]
fn test_invariants_hold_after_sweep() {
    let fx = Fixture::new();
    for (i, content) in ["", "{}", "", "{\"id\":3}", "x"].iter().enumerate() {
        fx.session(&format!("s{i}"), content);
    }
    let before = vec!["s4", "s0", "s9", "s1", "s2", "s3", "s1"];
    fx.guide("G", json!({ "sessions": before }));

    fx.sweep();

    for entry in fs::read_dir(&fx.layout.sessions_dir).unwrap() {
        assert!(entry.unwrap().metadata().unwrap().len() > 0);
    }

    let after: Vec<String> = serde_json::from_value(fx.read_guide("G")["sessions"].clone()).unwrap();
    for id in &after {
        assert!(fx.session_path(id).exists(), "{id} must exist");
    }
    let expected: Vec<String> = before
        .iter()
        .filter(|id| fx.session_path(id).exists())
        .map(|s| s.to_string())
        .collect();
    assert_eq!(after, expected);
}

#[test]
fn test_missing_directories_fail_at_startup() {
    let temp_dir = TempDir::new().unwrap();
    let sweeper = IntegritySweeper::new(
        SessionStore::new(temp_dir.path().join("nope")),
        GuideStore::new(temp_dir.path()),
    );
    assert!(matches!(sweeper.sweep(), Err(Error::Startup(_))));

    let fx = Fixture::new();
    fx.session("B", "");
    let sweeper = IntegritySweeper::new(
        SessionStore::new(&fx.layout.sessions_dir),
        GuideStore::new(fx.layout.guides_dir.join("missing")),
    );
    assert!(matches!(sweeper.sweep(), Err(Error::Startup(_))));
    // Nothing is deleted when startup fails
    assert!(fx.session_path("B").exists());
}
