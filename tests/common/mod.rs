#![allow(dead_code)]

use std::sync::Arc;

use atimewatch::driver::{RunReport, WatchDriver};
use atimewatch::exec::CommandSpec;
use atimewatch::fs::mock::MockFileSystem;
use atimewatch::normalize::AtimeNormalizer;
use atimewatch::resolve::{CompositeResolver, PatternResolver, TreeFilter, TreeResolver};
use atimewatch::types::Classification;
use atimewatch_test_utils::fake_runner::FakeRunner;
use atimewatch_test_utils::recorder::RecordingReporter;
use atimewatch_test_utils::with_timeout;

pub use atimewatch_test_utils::init_tracing;

/// Driver over `fs` watching glob `patterns`.
pub fn pattern_driver(fs: &MockFileSystem, patterns: &[&str]) -> WatchDriver {
    let resolver = PatternResolver::new(patterns.iter().copied()).expect("valid patterns");
    WatchDriver::new(
        Arc::new(fs.clone()),
        Box::new(resolver),
        AtimeNormalizer::default(),
    )
    .with_cwd("/work")
}

/// Driver over `fs` walking `roots` with the default excludes.
pub fn tree_driver(fs: &MockFileSystem, roots: &[&str]) -> WatchDriver {
    let resolver = CompositeResolver::new().with(TreeResolver::new(
        roots.iter().map(Into::into).collect(),
        TreeFilter::with_defaults().expect("default excludes"),
    ));
    WatchDriver::new(
        Arc::new(fs.clone()),
        Box::new(resolver),
        AtimeNormalizer::default(),
    )
    .with_cwd("/work")
}

/// Run `driver` once with `runner`, returning the report and what the
/// reporter saw.
pub async fn run_once(
    driver: &mut WatchDriver,
    runner: &mut FakeRunner,
) -> (RunReport, Vec<(String, Classification)>) {
    let mut reporter = RecordingReporter::new();
    let report = with_timeout(driver.run(runner, &CommandSpec::shell("fake"), &mut reporter))
        .await
        .expect("driver run");
    (report, reporter.changes())
}

pub fn change(path: &str, kind: Classification) -> (String, Classification) {
    (path.to_string(), kind)
}
