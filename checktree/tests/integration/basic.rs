// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::helpers::*;
use checktree::{Completion, FinishReason};
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[tokio::test]
async fn pass_and_fail_then_finish() -> Result<()> {
    let (root, receiver) = untimed_root("root")?;
    root.check(true, "a");
    root.check(false, "b");
    root.finish();

    assert_eq!((root.passed(), root.failed(), root.total()), (1, 1, 2));
    ensure!(root.is_complete(), "root is complete");
    ensure!(!root.is_passed(), "root has a failing checkpoint");
    assert_eq!(
        receiver.await?,
        Completion {
            reason: None,
            passed: false
        }
    );
    Ok(())
}

#[tokio::test]
async fn subtest_resolves_through_expected_count() -> Result<()> {
    let (root, receiver) = untimed_root("root")?;
    root.add_expected(1);
    root.subtest("child").run(|child| async move {
        child.add_expected(1);
        child.check(true, "x");
    });

    let completion = receiver.await?;
    assert_eq!(
        completion,
        Completion {
            reason: None,
            passed: true
        }
    );
    assert_eq!((root.passed(), root.failed(), root.pending()), (1, 0, 0));
    Ok(())
}

#[tokio::test]
async fn duplicate_finish_adds_one_error() -> Result<()> {
    let (root, receiver) = untimed_root("root")?;
    root.finish_with(FinishReason::Custom("x".to_owned()));
    let errors = root.errors();

    root.finish_with(FinishReason::Custom("x".to_owned()));
    assert_eq!(root.finish_reason(), Some(FinishReason::Custom("x".to_owned())));
    assert_eq!(root.errors(), errors + 1);

    let completion = receiver.await?;
    assert_eq!(completion.reason, Some(FinishReason::Custom("x".to_owned())));
    Ok(())
}

#[tokio::test]
async fn error_annotation_fails_passing_checks() -> Result<()> {
    let (root, receiver) = untimed_root("root")?;
    root.check(true, "looks fine");
    root.error(serde_json::json!({ "unexpected": "state" }));
    root.finish();

    ensure!(!root.is_passed(), "errors fail the test");
    assert_eq!(root.failed(), 0);
    assert_eq!(error_messages(&root), vec![r#"{"unexpected":"state"}"#.to_owned()]);
    assert!(!receiver.await?.passed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn idle_root_times_out() -> Result<()> {
    let (root, receiver) = timed_root("root", Duration::from_millis(50))?;
    tokio::time::sleep(Duration::from_millis(60)).await;

    let completion = receiver.await?;
    assert_eq!(completion.reason, Some(FinishReason::Timeout));
    assert_eq!(root.finish_reason(), Some(FinishReason::Timeout));

    let errors = error_messages(&root);
    assert_eq!(errors.len(), 1);
    ensure!(errors[0].contains("50"), "message mentions the timeout: {}", errors[0]);
    Ok(())
}

#[tokio::test]
async fn deferred_notification_fires_once() -> Result<()> {
    let (root, mut receiver) = untimed_root("root")?;
    let child = root
        .subtest("child")
        .start()
        .expect("root hasn't finished");
    root.finish();
    ensure!(receiver.try_recv().is_err(), "not notified while child is pending");

    child.check(true, "inner");
    child.finish();
    assert_eq!(
        receiver.await?,
        Completion {
            reason: None,
            passed: true
        }
    );
    Ok(())
}

#[tokio::test]
async fn subtest_after_finish_is_rejected() -> Result<()> {
    let (root, _receiver) = untimed_root("root")?;
    root.finish();
    ensure!(root.subtest("late").start().is_none(), "late subtest rejected");
    assert_eq!((root.total(), root.pending()), (0, 0));
    assert_eq!(
        error_messages(&root),
        vec!["subtest `late` started after test finished".to_owned()],
    );
    Ok(())
}

#[tokio::test]
async fn config_file_drives_timeouts() -> Result<()> {
    use camino_tempfile::tempdir;
    use checktree::{TestBuilder, config::TreeConfig};

    let dir = tempdir()?;
    let path = dir.path().join("checktree.toml");
    std::fs::write(&path, "default-timeout = \"0s\"\nsubtest-timeout = \"750ms\"\n")?;
    let config = TreeConfig::from_sources(Some(path.as_path()))?;

    let root = TestBuilder::from_config("root", &config).build()?;
    let child = root.subtest("child").start().expect("root is running");
    assert_eq!(root.timeout(), Duration::ZERO);
    assert_eq!(child.timeout(), Duration::from_millis(750));
    Ok(())
}
