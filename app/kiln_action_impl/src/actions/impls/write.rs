/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexSet;
use kiln_analysis::actions::Step;
use kiln_analysis::actions::StepExecutionContext;
use kiln_analysis::actions::StepExecutionResult;
use kiln_analysis::actions::UnregisteredAction;
use kiln_artifact::artifact::artifact_type::Artifact;
use kiln_artifact::artifact::build_artifact::BuildArtifact;
use kiln_core::fs::paths::project_rel_path::ProjectRelativePathBuf;
use kiln_error::ErrorTag;
use kiln_error::TaggedError;

#[derive(Debug, thiserror::Error)]
enum WriteActionValidationError {
    #[error("WriteAction received inputs")]
    TooManyInputs,
    #[error("WriteAction received no outputs")]
    NoOutputs,
}

impl TaggedError for WriteActionValidationError {
    fn error_tag(&self) -> ErrorTag {
        ErrorTag::Input
    }
}

/// Writes fixed content to every one of its outputs.
#[derive(Debug)]
pub struct UnregisteredWriteAction {
    contents: Arc<[u8]>,
    is_executable: bool,
}

impl UnregisteredWriteAction {
    pub fn new(contents: impl Into<Vec<u8>>, is_executable: bool) -> Self {
        let contents: Vec<u8> = contents.into();
        Self {
            contents: contents.into(),
            is_executable,
        }
    }
}

impl UnregisteredAction for UnregisteredWriteAction {
    fn category(&self) -> &'static str {
        "write"
    }

    fn register(
        self: Box<Self>,
        inputs: &IndexSet<Artifact>,
        outputs: &IndexSet<BuildArtifact>,
    ) -> kiln_error::Result<Vec<Arc<dyn Step>>> {
        if !inputs.is_empty() {
            return Err(WriteActionValidationError::TooManyInputs.into());
        }
        if outputs.is_empty() {
            return Err(WriteActionValidationError::NoOutputs.into());
        }
        Ok(vec![Arc::new(WriteStep {
            outputs: outputs
                .iter()
                .map(|o| o.get_source_path().clone())
                .collect(),
            contents: self.contents,
            is_executable: self.is_executable,
        })])
    }
}

#[derive(Debug)]
struct WriteStep {
    outputs: Vec<ProjectRelativePathBuf>,
    contents: Arc<[u8]>,
    is_executable: bool,
}

#[async_trait]
impl Step for WriteStep {
    fn name(&self) -> &str {
        "write"
    }

    async fn execute(
        &self,
        ctx: &StepExecutionContext<'_>,
    ) -> kiln_error::Result<StepExecutionResult> {
        for output in &self.outputs {
            ctx.fs.write(output, &self.contents)?;
            if self.is_executable {
                ctx.fs.set_executable(output)?;
            }
        }
        Ok(StepExecutionResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use dupe::Dupe;
    use indexmap::indexset;
    use indexmap::IndexSet;
    use kiln_analysis::actions::Step;
    use kiln_analysis::actions::UnregisteredAction;
    use kiln_artifact::actions::key::ActionIndex;
    use kiln_artifact::artifact::artifact_type::testing::BuildArtifactTestingExt;
    use kiln_artifact::artifact::artifact_type::Artifact;
    use kiln_artifact::artifact::build_artifact::BuildArtifact;
    use kiln_core::target::BuildTarget;

    use crate::actions::impls::write::UnregisteredWriteAction;

    #[test]
    fn write_rejects_inputs() {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let input = BuildArtifact::testing_new(target.dupe(), "in", ActionIndex::new(0));
        let output = BuildArtifact::testing_new(target, "out", ActionIndex::new(1));
        let err = Box::new(UnregisteredWriteAction::new("x", false))
            .register(&indexset![Artifact::from(input)], &indexset![output])
            .unwrap_err();
        assert!(err.is_input());
        assert_eq!("WriteAction received inputs", err.to_string());
    }

    #[test]
    fn write_needs_outputs() {
        let err = Box::new(UnregisteredWriteAction::new("x", false))
            .register(&IndexSet::new(), &IndexSet::new())
            .unwrap_err();
        assert!(err.is_input());
    }

    #[test]
    fn write_produces_one_step() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let steps = Box::new(UnregisteredWriteAction::new("x", true)).register(
            &IndexSet::new(),
            &indexset![
                BuildArtifact::testing_new(target.dupe(), "a", ActionIndex::new(0)),
                BuildArtifact::testing_new(target, "b", ActionIndex::new(0)),
            ],
        )?;
        assert_eq!(1, steps.len());
        assert_eq!("write", steps[0].name());
        Ok(())
    }
}
