//! Library-level tests for the build pipeline.
//!
//! These drive `run_build` directly on temporary trees, without the binary.

use folio::context::BuildContext;
use folio::domain::DiagnosticKind;
use folio::pipeline::{BuildOutcome, BuildSettings, run_build};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn kinds(outcome: &BuildOutcome) -> Vec<DiagnosticKind> {
    outcome.log.sorted().iter().map(|d| d.kind).collect()
}

async fn check(root: &Path) -> BuildOutcome {
    run_build(&BuildSettings::new(root), &BuildContext::new(4)).await
}

#[tokio::test]
async fn directory_links_resolve_to_landing_pages() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "README.md", "# Home\n\n[Guide](guide/)\n[API](api)\n");
    write(dir.path(), "guide/README.md", "# Guide\n");
    write(dir.path(), "api/index.md", "# API\n");

    let outcome = check(dir.path()).await;

    assert!(outcome.log.is_empty(), "{:?}", kinds(&outcome));
    assert_eq!(outcome.links.resolved, 2);
}

#[tokio::test]
async fn anchors_follow_heading_slugs() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "a.md",
        "# A\n\n## Getting Started\n\n## Getting Started\n\n[one](#getting-started)\n[two](#getting-started-1)\n[three](#getting-started-2)\n",
    );

    let outcome = check(dir.path()).await;

    assert_eq!(kinds(&outcome), vec![DiagnosticKind::BrokenAnchor]);
    assert_eq!(outcome.log.sorted()[0].location.as_ref().unwrap().line, Some(9));
}

#[tokio::test]
async fn external_links_are_counted_not_checked() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "a.md",
        "# A\n\n[web](https://example.com/x.md)\n[mail](mailto:a@example.com)\n",
    );

    let outcome = check(dir.path()).await;

    assert!(outcome.log.is_empty());
    assert_eq!(outcome.links.external, 2);
    assert_eq!(outcome.links.broken, 0);
}

#[tokio::test]
async fn reports_are_stable_across_runs() {
    let dir = TempDir::new().unwrap();
    for i in 0..20 {
        write(
            dir.path(),
            &format!("s{}/p{i}.md", i % 3),
            &format!("# P{i}\n\n[next](../s{}/p{}.md)\n[gone](x{i}.md)\n", (i + 1) % 3, i + 1),
        );
    }

    let first = check(dir.path()).await.report();
    let second = check(dir.path()).await.report();

    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(first.links, second.links);
    assert_eq!(first.diagnostics.len(), 21);
}

#[tokio::test]
async fn build_writes_every_page() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(dir.path(), "README.md", "# Home\n");
    write(dir.path(), "a/b/c.md", "# Deep\n\n[home](../../README.md)\n");

    let mut settings = BuildSettings::new(dir.path());
    settings.output = Some(out.path().to_path_buf());
    let outcome = run_build(&settings, &BuildContext::new(2)).await;

    assert!(outcome.success());
    assert_eq!(outcome.site.unwrap().pages_written, 2);
    let deep = fs::read_to_string(out.path().join("a/b/c.html")).unwrap();
    assert!(deep.contains(r#"href="../../index.html""#));
}

#[tokio::test]
async fn cancellation_from_another_task_stops_the_run() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.md", "# A\n");
    let ctx = BuildContext::new(1);
    ctx.cancel();

    let outcome = run_build(&BuildSettings::new(dir.path()), &ctx).await;

    assert!(outcome.cancelled);
    assert!(!outcome.success());
    assert!(kinds(&outcome).contains(&DiagnosticKind::Cancelled));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Every internal link is either resolved or broken, never both or neither.
    #[test]
    fn link_counts_add_up(targets in prop::collection::vec(0usize..8, 1..12)) {
        let dir = TempDir::new().unwrap();
        for i in 0..4 {
            write(dir.path(), &format!("p{i}.md"), &format!("# P{i}\n"));
        }
        let body: String = targets
            .iter()
            .map(|t| format!("[l](p{t}.md)\n"))
            .collect();
        write(dir.path(), "index.md", &format!("# Index\n\n{body}"));

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let outcome = runtime.block_on(check(dir.path()));

        let expected_broken = targets.iter().filter(|t| **t >= 4).count();
        prop_assert_eq!(outcome.links.resolved + outcome.links.broken, targets.len());
        prop_assert_eq!(outcome.links.broken, expected_broken);
        prop_assert_eq!(outcome.log.warning_count(), expected_broken);
    }
}
