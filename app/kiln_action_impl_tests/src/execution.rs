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
use indexmap::indexmap;
use indexmap::indexset;
use indexmap::IndexMap;
use indexmap::IndexSet;
use kiln_action_impl::actions::execute::action_executor::ActionExecutor;
use kiln_action_impl::actions::execute::error::ExecuteError;
use kiln_action_impl::actions::impls::copy::UnregisteredCopyAction;
use kiln_action_impl::actions::impls::run::UnregisteredRunAction;
use kiln_action_impl::actions::impls::write::UnregisteredWriteAction;
use kiln_analysis::analysis::calculation::analyze_rule;
use kiln_analysis::analysis::context::AnalysisResult;
use kiln_analysis::events::AnalysisEvent;
use kiln_analysis::events::CollectingEventSink;
use kiln_analysis::events::NullEventSink;
use kiln_analysis::provider::ProviderInfoCollection;
use kiln_analysis::provider::RuleAnalysisKey;
use kiln_artifact::artifact::artifact_type::Artifact;
use kiln_artifact::artifact::artifact_type::ArtifactLike;
use kiln_core::fs::out_path::OutPathResolver;
use kiln_core::fs::project::ArtifactFilesystem;
use kiln_core::fs::project::ProjectRootTemp;
use kiln_core::target::BuildTarget;

/// What `//lib:gen` exposes to its dependents.
#[derive(Debug)]
struct GeneratedInfo {
    file: Artifact,
}

fn analyze_generator(contents: &'static str) -> kiln_error::Result<AnalysisResult> {
    analyze_rule(
        BuildTarget::testing_parse("root//lib:gen"),
        IndexMap::new(),
        &OutPathResolver::default(),
        Arc::new(NullEventSink),
        |ctx| {
            let mut factory = ctx.action_factory();
            let out = factory.declare_artifact("gen.txt")?;
            factory.register_action(
                IndexSet::new(),
                indexset![out],
                UnregisteredWriteAction::new(contents, false),
            )?;
            Ok(())
        },
    )
}

fn analyze_copier(generated: Artifact) -> kiln_error::Result<AnalysisResult> {
    let dep = BuildTarget::testing_parse("root//lib:gen");
    let deps = indexmap! {
        RuleAnalysisKey::new(dep.dupe()) =>
            ProviderInfoCollection::builder().with(GeneratedInfo { file: generated }).build(),
    };
    analyze_rule(
        BuildTarget::testing_parse("root//app:copy"),
        deps,
        &OutPathResolver::default(),
        Arc::new(NullEventSink),
        |ctx| {
            let input = ctx
                .deps()
                .get(&RuleAnalysisKey::new(dep))
                .and_then(|p| p.get::<GeneratedInfo>())
                .map(|info| info.file.dupe())
                .ok_or_else(|| kiln_error::internal_error!("missing GeneratedInfo"))?;
            let mut factory = ctx.action_factory();
            let out = factory.declare_artifact("copied.txt")?;
            factory.register_action(
                indexset![input],
                indexset![out],
                UnregisteredCopyAction::new(false),
            )?;
            Ok(())
        },
    )
}

fn only_output(result: &AnalysisResult) -> Artifact {
    let (_, action) = result.iter().next().unwrap();
    Artifact::from(action.outputs()[0].dupe())
}

#[tokio::test]
async fn outputs_flow_to_dependents() -> kiln_error::Result<()> {
    let fs = ProjectRootTemp::new()?;
    let gen = analyze_generator("generated")?;
    let generated = only_output(&gen);
    assert!(generated.is_bound());
    assert_eq!(
        "<generated file 'root/lib/__gen__/gen.txt'>",
        generated.to_string()
    );

    let copy = analyze_copier(generated.dupe())?;
    let (_, copy_action) = copy.iter().next().unwrap();
    assert_eq!(&indexset![generated.dupe()], copy_action.inputs());
    assert_eq!(
        Some(&BuildTarget::testing_parse("root//lib:gen")),
        copy_action.inputs()[0].owner()
    );

    let events = CollectingEventSink::new();
    let executor = ActionExecutor::new(fs.path(), &events);
    for result in [&gen, &copy] {
        for (_, action) in result.iter() {
            executor.execute(action).await?;
        }
    }
    let copied = copy_action.outputs()[0].get_source_path();
    assert_eq!(
        Some(b"generated".to_vec()),
        fs.path().read_if_exists(copied)?
    );
    assert_eq!(
        2,
        events
            .take()
            .iter()
            .filter(|e| matches!(e, AnalysisEvent::ActionExecutionFinished { success: true, .. }))
            .count()
    );
    Ok(())
}

#[tokio::test]
async fn dependent_of_unbuilt_output_fails() -> kiln_error::Result<()> {
    let fs = ProjectRootTemp::new()?;
    let gen = analyze_generator("generated")?;
    let copy = analyze_copier(only_output(&gen))?;

    // The generator never ran, so the copy has nothing to read.
    let events = CollectingEventSink::new();
    let (_, action) = copy.iter().next().unwrap();
    let err = ActionExecutor::new(fs.path(), &events)
        .execute(action)
        .await
        .unwrap_err();
    assert_matches!(
        err.execute_error(),
        ExecuteError::StepFailed { diagnostic, .. } if diagnostic.contains("gen.txt")
    );
    assert_eq!(action.key(), err.key());
    Ok(())
}

#[tokio::test]
async fn failures_are_isolated_per_action() -> kiln_error::Result<()> {
    let fs = ProjectRootTemp::new()?;
    let result = analyze_rule(
        BuildTarget::testing_parse("root//mixed:target"),
        IndexMap::new(),
        &OutPathResolver::default(),
        Arc::new(NullEventSink),
        |ctx| {
            let mut factory = ctx.action_factory();
            let broken = factory.declare_artifact("broken")?;
            let fine = factory.declare_artifact("fine")?;
            factory.register_action(
                IndexSet::new(),
                indexset![broken],
                UnregisteredRunAction::new("kiln-no-such-program"),
            )?;
            factory.register_action(
                IndexSet::new(),
                indexset![fine],
                UnregisteredWriteAction::new("ok", false),
            )?;
            Ok(())
        },
    )?;

    let events = CollectingEventSink::new();
    let executor = ActionExecutor::new(fs.path(), &events);
    let mut actions = result.iter().map(|(_, a)| a);
    let (broken, fine) = (actions.next().unwrap(), actions.next().unwrap());
    let (broken_res, fine_res) = tokio::join!(executor.execute(broken), executor.execute(fine));

    let err: kiln_error::Error = broken_res.unwrap_err().into();
    assert!(err.is_input());
    assert!(err.to_string().contains("run"), "{}", err);
    let outputs = fine_res?;
    assert_eq!(
        Some(b"ok".to_vec()),
        fs.path().read_if_exists(&outputs.outputs()[0])?
    );
    assert_eq!(None, fs.path().read_if_exists(broken.outputs()[0].get_source_path())?);
    Ok(())
}
