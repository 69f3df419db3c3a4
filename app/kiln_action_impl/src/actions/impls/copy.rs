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
enum CopyActionValidationError {
    #[error("Exactly one input file must be specified for a copy action, got {0}")]
    WrongNumberOfInputs(usize),
    #[error("Exactly one output file must be specified for a copy action, got {0}")]
    WrongNumberOfOutputs(usize),
}

impl TaggedError for CopyActionValidationError {
    fn error_tag(&self) -> ErrorTag {
        ErrorTag::Input
    }
}

/// Copies its single input to its single output.
#[derive(Debug, Default)]
pub struct UnregisteredCopyAction {
    is_executable: bool,
}

impl UnregisteredCopyAction {
    pub fn new(is_executable: bool) -> Self {
        Self { is_executable }
    }
}

impl UnregisteredAction for UnregisteredCopyAction {
    fn category(&self) -> &'static str {
        "copy"
    }

    fn register(
        self: Box<Self>,
        inputs: &IndexSet<Artifact>,
        outputs: &IndexSet<BuildArtifact>,
    ) -> kiln_error::Result<Vec<Arc<dyn Step>>> {
        let (src, dst) = match (inputs.first(), outputs.first()) {
            (Some(src), Some(dst)) if inputs.len() == 1 && outputs.len() == 1 => (src, dst),
            _ if inputs.len() != 1 => {
                return Err(CopyActionValidationError::WrongNumberOfInputs(inputs.len()).into());
            }
            _ => {
                return Err(CopyActionValidationError::WrongNumberOfOutputs(outputs.len()).into());
            }
        };
        Ok(vec![Arc::new(CopyStep {
            src: src.resolved_path().clone(),
            dst: dst.get_source_path().clone(),
            is_executable: self.is_executable,
        })])
    }
}

#[derive(Debug)]
struct CopyStep {
    src: ProjectRelativePathBuf,
    dst: ProjectRelativePathBuf,
    is_executable: bool,
}

#[async_trait]
impl Step for CopyStep {
    fn name(&self) -> &str {
        "copy"
    }

    async fn execute(
        &self,
        ctx: &StepExecutionContext<'_>,
    ) -> kiln_error::Result<StepExecutionResult> {
        let contents = match ctx.fs.read_if_exists(&self.src)? {
            Some(contents) => contents,
            None => {
                return Ok(StepExecutionResult::Failure {
                    diagnostic: format!("Input `{}` does not exist", self.src),
                });
            }
        };
        ctx.fs.write(&self.dst, &contents)?;
        if self.is_executable {
            ctx.fs.set_executable(&self.dst)?;
        }
        Ok(StepExecutionResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use dupe::Dupe;
    use indexmap::indexset;
    use indexmap::IndexSet;
    use kiln_analysis::actions::Step;
    use kiln_analysis::actions::StepExecutionContext;
    use kiln_analysis::actions::StepExecutionResult;
    use kiln_analysis::actions::UnregisteredAction;
    use kiln_artifact::actions::key::ActionIndex;
    use kiln_artifact::artifact::artifact_type::testing::BuildArtifactTestingExt;
    use kiln_artifact::artifact::artifact_type::Artifact;
    use kiln_artifact::artifact::build_artifact::BuildArtifact;
    use kiln_artifact::artifact::source_artifact::SourceArtifact;
    use kiln_core::fs::paths::project_rel_path::ProjectRelativePathBuf;
    use kiln_core::fs::project::ArtifactFilesystem;
    use kiln_core::fs::project::ProjectRootTemp;
    use kiln_core::target::BuildTarget;

    use crate::actions::impls::copy::UnregisteredCopyAction;

    fn source(path: &str) -> Artifact {
        Artifact::from(SourceArtifact::new(
            ProjectRelativePathBuf::new(path).unwrap(),
        ))
    }

    #[test]
    fn copy_needs_one_input_and_output() {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let out = BuildArtifact::testing_new(target, "out", ActionIndex::new(0));

        let err = Box::new(UnregisteredCopyAction::default())
            .register(&IndexSet::new(), &indexset![out.dupe()])
            .unwrap_err();
        assert!(err.is_input());
        assert!(err.to_string().contains("input"), "{}", err);

        let err = Box::new(UnregisteredCopyAction::default())
            .register(&indexset![source("a"), source("b")], &indexset![out])
            .unwrap_err();
        assert!(err.is_input());

        let err = Box::new(UnregisteredCopyAction::default())
            .register(&indexset![source("a")], &IndexSet::new())
            .unwrap_err();
        assert!(err.to_string().contains("output"), "{}", err);
    }

    #[tokio::test]
    async fn copy_source_file() -> kiln_error::Result<()> {
        let fs = ProjectRootTemp::new()?;
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let out = BuildArtifact::testing_new(target, "copied", ActionIndex::new(0));
        let src = ProjectRelativePathBuf::new("src.txt")?;
        fs.path().write(&src, b"hello")?;
        fs.path().mkdirs(&out.get_source_path().parent().unwrap())?;

        let steps = Box::new(UnregisteredCopyAction::new(true))
            .register(&indexset![source("src.txt")], &indexset![out.dupe()])?;
        let ctx = StepExecutionContext {
            fs: fs.path(),
            key: out.key(),
        };
        assert_eq!(StepExecutionResult::Success, steps[0].execute(&ctx).await?);
        assert_eq!(
            Some(b"hello".to_vec()),
            fs.path().read_if_exists(out.get_source_path())?
        );
        assert!(fs.path().is_executable(out.get_source_path())?);
        Ok(())
    }

    #[tokio::test]
    async fn copy_missing_input_fails() -> kiln_error::Result<()> {
        let fs = ProjectRootTemp::new()?;
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let out = BuildArtifact::testing_new(target, "copied", ActionIndex::new(0));
        let steps = Box::new(UnregisteredCopyAction::default())
            .register(&indexset![source("missing.txt")], &indexset![out.dupe()])?;
        let ctx = StepExecutionContext {
            fs: fs.path(),
            key: out.key(),
        };
        assert_matches!(
            steps[0].execute(&ctx).await?,
            StepExecutionResult::Failure { diagnostic } if diagnostic.contains("missing.txt")
        );
        assert_eq!(None, fs.path().read_if_exists(out.get_source_path())?);
        Ok(())
    }
}
