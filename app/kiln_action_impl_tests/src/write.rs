/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use assert_matches::assert_matches;
use dupe::Dupe;
use indexmap::IndexMap;
use indexmap::IndexSet;
use kiln_action_impl::actions::execute::action_executor::ActionExecutor;
use kiln_action_impl::actions::impls::write::UnregisteredWriteAction;
use kiln_analysis::analysis::calculation::analyze_rule;
use kiln_analysis::analysis::context::AnalysisResult;
use kiln_analysis::events::AnalysisEvent;
use kiln_analysis::events::CollectingEventSink;
use kiln_artifact::artifact::declaration::ArtifactDeclarationError;
use kiln_artifact::artifact::declaration::DeclarationFailureReason;
use kiln_core::fs::out_path::OutPathResolver;
use kiln_core::fs::paths::forward_rel_path::ForwardRelativePathBuf;
use kiln_core::fs::paths::project_rel_path::ProjectRelativePathBuf;
use kiln_core::fs::project::ArtifactFilesystem;
use kiln_core::fs::project::ProjectRootTemp;
use kiln_core::target::BuildTarget;

/// Analyzes `//foo:bar` with a single write action over `paths`.
fn analyze_write(
    paths: &[&str],
    contents: &str,
    is_executable: bool,
    events: Arc<CollectingEventSink>,
) -> kiln_error::Result<AnalysisResult> {
    analyze_rule(
        BuildTarget::testing_parse("//foo:bar"),
        IndexMap::new(),
        &OutPathResolver::default(),
        events,
        |ctx| {
            let mut factory = ctx.action_factory();
            let outputs = paths
                .iter()
                .map(|p| factory.declare_artifact(p))
                .collect::<kiln_error::Result<IndexSet<_>>>()?;
            factory.register_action(
                IndexSet::new(),
                outputs,
                UnregisteredWriteAction::new(contents, is_executable),
            )?;
            Ok(())
        },
    )
}

async fn execute_all(fs: &ProjectRootTemp, result: &AnalysisResult) -> kiln_error::Result<()> {
    let events = CollectingEventSink::new();
    let executor = ActionExecutor::new(fs.path(), &events);
    for (_, action) in result.iter() {
        executor.execute(action).await?;
    }
    Ok(())
}

fn base() -> ProjectRelativePathBuf {
    OutPathResolver::default().package_path(&BuildTarget::testing_parse("//foo:bar"))
}

fn output(path: &str) -> ProjectRelativePathBuf {
    base().join(&ForwardRelativePathBuf::new(path).unwrap())
}

#[tokio::test]
async fn writes_content_to_every_output() -> kiln_error::Result<()> {
    let fs = ProjectRootTemp::new()?;
    let result = analyze_write(
        &["bar1", "bar2"],
        "foobar",
        false,
        Arc::new(CollectingEventSink::new()),
    )?;
    assert_eq!(1, result.get_registered_action_data().len());
    execute_all(&fs, &result).await?;

    assert_eq!("kiln-out/gen/foo/__bar__/bar1", output("bar1").as_str());
    for path in ["bar1", "bar2"] {
        assert_eq!(
            Some(b"foobar".to_vec()),
            fs.path().read_if_exists(&output(path))?
        );
        assert!(!fs.path().is_executable(&output(path))?);
    }
    Ok(())
}

#[tokio::test]
async fn creates_nested_parent_directories() -> kiln_error::Result<()> {
    let fs = ProjectRootTemp::new()?;
    let result = analyze_write(
        &["foo/bar1"],
        "foobar",
        false,
        Arc::new(CollectingEventSink::new()),
    )?;
    assert!(!fs.path().resolve(&output("foo")).exists());
    execute_all(&fs, &result).await?;

    assert!(fs.path().resolve(&output("foo")).is_dir());
    assert_eq!(
        Some(b"foobar".to_vec()),
        fs.path().read_if_exists(&output("foo/bar1"))?
    );
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn marks_outputs_executable() -> kiln_error::Result<()> {
    let fs = ProjectRootTemp::new()?;
    let result = analyze_write(
        &["bar1", "bar2"],
        "foobar",
        true,
        Arc::new(CollectingEventSink::new()),
    )?;
    execute_all(&fs, &result).await?;

    for path in ["bar1", "bar2"] {
        assert_eq!(
            Some(b"foobar".to_vec()),
            fs.path().read_if_exists(&output(path))?
        );
        assert!(fs.path().is_executable(&output(path))?);
    }
    Ok(())
}

#[tokio::test]
async fn escaping_path_produces_nothing() -> kiln_error::Result<()> {
    let fs = ProjectRootTemp::new()?;
    let events = Arc::new(CollectingEventSink::new());
    let err = analyze_write(&["../escape"], "foobar", false, events.dupe()).unwrap_err();

    assert!(err.is_input());
    assert_matches!(
        err.downcast_ref::<ArtifactDeclarationError>(),
        Some(ArtifactDeclarationError {
            reason: DeclarationFailureReason::PathTraversal,
            ..
        })
    );
    // Nothing was declared, registered or written.
    assert!(events.take().is_empty());
    assert!(!fs.path().resolve(&base()).exists());
    assert!(!fs.path().root().join("kiln-out").exists());
    Ok(())
}

#[test]
fn invalid_declarations_are_classified() {
    let cases = [
        ("/abs/path", DeclarationFailureReason::AbsolutePath),
        ("", DeclarationFailureReason::EmptyPath),
        (".", DeclarationFailureReason::EmptyPath),
        ("foo/./bar", DeclarationFailureReason::PathTraversal),
        ("a/../..", DeclarationFailureReason::PathTraversal),
    ];
    for (path, expected) in cases {
        let err = analyze_write(&[path], "x", false, Arc::new(CollectingEventSink::new()))
            .unwrap_err();
        assert_eq!(
            Some(expected),
            err.downcast_ref::<ArtifactDeclarationError>()
                .map(|e| e.reason),
            "{}: {}",
            path,
            err
        );
    }
}

#[test]
fn analysis_reports_events() -> kiln_error::Result<()> {
    let events = Arc::new(CollectingEventSink::new());
    analyze_write(&["bar1", "bar2"], "foobar", false, events.dupe())?;
    assert_matches!(
        &events.take()[..],
        [
            AnalysisEvent::ArtifactDeclared { .. },
            AnalysisEvent::ArtifactDeclared { .. },
            AnalysisEvent::ActionRegistered {
                category: "write",
                ..
            },
        ]
    );
    Ok(())
}
