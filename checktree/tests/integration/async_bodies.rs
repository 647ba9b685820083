// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::helpers::*;
use checktree::{Completion, ContentSnapshot, FinishReason, Test};
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use std::time::Duration;

/// Builds a tree `depth` levels deep where each level has `width` subtests, and every leaf
/// records a single passing checkpoint after yielding.
fn spawn_tree(parent: &Test, depth: usize, width: usize) {
    parent.add_expected(width as i64);
    for i in 0..width {
        parent.subtest(format!("level {depth} #{i}")).run(move |test| async move {
            tokio::task::yield_now().await;
            if depth == 0 {
                test.check(true, "leaf");
                test.finish();
            } else {
                spawn_tree(&test, depth - 1, width);
            }
        });
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn nested_tree_resolves_once() -> Result<()> {
    let (root, receiver) = untimed_root("root")?;
    spawn_tree(&root, 3, 3);

    let completion = receiver.await?;
    assert_eq!(
        completion,
        Completion {
            reason: None,
            passed: true
        }
    );
    ensure!(root.is_passed(), "every leaf passed");
    assert_eq!((root.passed(), root.failed(), root.total()), (3, 0, 3));

    fn count_leaves(snapshot: &checktree::TestSnapshot) -> usize {
        snapshot
            .contents
            .iter()
            .map(|content| match content {
                ContentSnapshot::Checkpoint(_) => 1,
                ContentSnapshot::Subtest(subtest) => count_leaves(subtest),
                ContentSnapshot::Annotation(_) => 0,
            })
            .sum()
    }
    assert_eq!(count_leaves(&root.snapshot()), 81);
    Ok(())
}

#[tokio::test]
async fn panicking_subtest_fails_parent_but_not_siblings() -> Result<()> {
    let (root, receiver) = untimed_root("root")?;
    root.add_expected(2);
    root.subtest("good").run(|test| async move {
        test.check(true, "fine");
        test.finish();
    });
    root.subtest("bad").run(|test| async move {
        test.check(true, "fine so far");
        checktree::spawn(async {
            tokio::task::yield_now().await;
            explode("background work failed");
        });
    });

    let completion = receiver.await?;
    assert_eq!(completion.reason, None);
    ensure!(!completion.passed, "one subtest bailed");
    assert_eq!((root.passed(), root.failed()), (1, 1));
    ensure!(error_messages(&root).is_empty(), "root itself has no errors");

    let contents = root.contents();
    let bad = contents[1].as_subtest().expect("second entry is a subtest");
    assert_eq!(bad.finish_reason(), Some(FinishReason::Bail));
    assert_eq!(
        error_messages(bad),
        vec![
            "background work failed".to_owned(),
            "uncaught panic or error in test body, bailing out".to_owned(),
        ],
    );
    Ok(())
}

#[tokio::test]
async fn body_error_bails() -> Result<()> {
    let (root, receiver) = untimed_root("root")?;
    root.run(|test| async move {
        test.check(true, "before");
        let value: u32 = "not a number".parse()?;
        test.check(value > 0, "after");
        Ok::<_, std::num::ParseIntError>(())
    });

    let completion = receiver.await?;
    assert_eq!(completion.reason, Some(FinishReason::Bail));
    assert_eq!(root.total(), 1, "the body stopped at the error");
    assert_eq!(
        error_messages(&root)[0],
        "invalid digit found in string".to_owned(),
    );
    Ok(())
}

#[tokio::test]
async fn multiple_bodies_race_on_one_test() -> Result<()> {
    let (root, receiver) = untimed_root("root")?;
    root.add_expected(4);
    for name in ["a", "b", "c", "d"] {
        root.run(move |test| async move {
            tokio::task::yield_now().await;
            test.check(true, name);
        });
    }

    assert_eq!(
        receiver.await?,
        Completion {
            reason: None,
            passed: true
        }
    );
    let mut names: Vec<_> = root
        .contents()
        .iter()
        .filter_map(|content| content.as_checkpoint().map(|checkpoint| checkpoint.name.clone()))
        .collect();
    names.sort();
    assert_eq!(names, vec!["a", "b", "c", "d"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn hung_subtest_times_out_and_late_activity_is_misuse() -> Result<()> {
    let (root, receiver) = untimed_root("root")?;
    let mut builder = root.subtest("hung");
    builder.set_timeout(Duration::from_millis(100));
    builder.run(|test| async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        test.check(true, "woke up");
    });
    root.finish();

    let completion = receiver.await?;
    assert_eq!(completion.reason, None);
    ensure!(!completion.passed, "the hung subtest timed out");

    let hung = root.contents()[0]
        .as_subtest()
        .cloned()
        .expect("first entry is a subtest");
    assert_eq!(hung.finish_reason(), Some(FinishReason::Timeout));

    tokio::time::sleep(Duration::from_secs(10)).await;
    tokio::task::yield_now().await;
    assert_eq!(hung.total(), 0, "late check was rejected");
    assert_eq!(
        error_messages(&hung),
        vec![
            "test timed out after 100ms without activity".to_owned(),
            "check `woke up` recorded after test finished".to_owned(),
        ],
    );
    assert_eq!(root.failed(), 1, "parent counters are unaffected");
    Ok(())
}
