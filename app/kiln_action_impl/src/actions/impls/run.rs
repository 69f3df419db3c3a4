/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::ffi::OsString;
use std::process::Stdio;
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
enum RunActionValidationError {
    #[error("Argument refers to input {index}, but the action only has {len} inputs")]
    NoSuchInput { index: usize, len: usize },
    #[error("Argument refers to output {index}, but the action only has {len} outputs")]
    NoSuchOutput { index: usize, len: usize },
}

impl TaggedError for RunActionValidationError {
    fn error_tag(&self) -> ErrorTag {
        ErrorTag::Input
    }
}

/// One argument of a run action. Artifacts are referred to by their position in the action's
/// inputs or outputs, and passed to the command as absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunArg {
    Literal(String),
    Input(usize),
    Output(usize),
}

/// Runs an external command in the project root.
#[derive(Debug)]
pub struct UnregisteredRunAction {
    program: String,
    args: Vec<RunArg>,
}

impl UnregisteredRunAction {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: RunArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn literal(self, arg: impl Into<String>) -> Self {
        self.arg(RunArg::Literal(arg.into()))
    }
}

impl UnregisteredAction for UnregisteredRunAction {
    fn category(&self) -> &'static str {
        "run"
    }

    fn register(
        self: Box<Self>,
        inputs: &IndexSet<Artifact>,
        outputs: &IndexSet<BuildArtifact>,
    ) -> kiln_error::Result<Vec<Arc<dyn Step>>> {
        let args = self
            .args
            .into_iter()
            .map(|arg| match arg {
                RunArg::Literal(s) => Ok(CommandArg::Literal(s)),
                RunArg::Input(index) => inputs
                    .get_index(index)
                    .map(|i| CommandArg::Path(i.resolved_path().clone()))
                    .ok_or(RunActionValidationError::NoSuchInput {
                        index,
                        len: inputs.len(),
                    }),
                RunArg::Output(index) => outputs
                    .get_index(index)
                    .map(|o| CommandArg::Path(o.get_source_path().clone()))
                    .ok_or(RunActionValidationError::NoSuchOutput {
                        index,
                        len: outputs.len(),
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vec![Arc::new(RunStep {
            program: self.program,
            args,
        })])
    }
}

#[derive(Debug)]
enum CommandArg {
    Literal(String),
    Path(ProjectRelativePathBuf),
}

#[derive(Debug)]
struct RunStep {
    program: String,
    args: Vec<CommandArg>,
}

#[async_trait]
impl Step for RunStep {
    fn name(&self) -> &str {
        &self.program
    }

    async fn execute(
        &self,
        ctx: &StepExecutionContext<'_>,
    ) -> kiln_error::Result<StepExecutionResult> {
        let args: Vec<OsString> = self
            .args
            .iter()
            .map(|arg| match arg {
                CommandArg::Literal(s) => OsString::from(s),
                CommandArg::Path(p) => ctx.fs.resolve(p).into_os_string(),
            })
            .collect();
        let cwd = ctx
            .fs
            .resolve(&ProjectRelativePathBuf::unchecked_new(String::new()));

        tracing::debug!("Running `{}` with {} args for {}", self.program, args.len(), ctx.key);
        let output = match tokio::process::Command::new(&self.program)
            .args(&args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return Ok(StepExecutionResult::Failure {
                    diagnostic: format!("Failed to spawn `{}`: {}", self.program, e),
                });
            }
        };

        if output.status.success() {
            return Ok(StepExecutionResult::Success);
        }
        Ok(StepExecutionResult::Exited {
            // Killed by a signal.
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
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
    use kiln_artifact::artifact::build_artifact::BuildArtifact;
    use kiln_core::fs::project::ArtifactFilesystem;
    use kiln_core::fs::project::ProjectRootTemp;
    use kiln_core::target::BuildTarget;

    use crate::actions::impls::run::RunArg;
    use crate::actions::impls::run::UnregisteredRunAction;

    fn output() -> BuildArtifact {
        BuildArtifact::testing_new(
            BuildTarget::testing_parse("cell//pkg:foo"),
            "out",
            ActionIndex::new(0),
        )
    }

    #[test]
    fn argument_out_of_range() {
        let err = Box::new(UnregisteredRunAction::new("true").arg(RunArg::Input(0)))
            .register(&IndexSet::new(), &indexset![output()])
            .unwrap_err();
        assert!(err.is_input());

        let err = Box::new(UnregisteredRunAction::new("true").arg(RunArg::Output(1)))
            .register(&IndexSet::new(), &indexset![output()])
            .unwrap_err();
        assert_eq!(
            "Argument refers to output 1, but the action only has 1 outputs",
            err.to_string()
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_failure() -> kiln_error::Result<()> {
        let fs = ProjectRootTemp::new()?;
        let out = output();
        let steps = Box::new(UnregisteredRunAction::new("kiln-no-such-program"))
            .register(&IndexSet::new(), &indexset![out.dupe()])?;
        let ctx = StepExecutionContext {
            fs: fs.path(),
            key: out.key(),
        };
        assert_matches!(
            steps[0].execute(&ctx).await?,
            StepExecutionResult::Failure { diagnostic } if diagnostic.contains("kiln-no-such-program")
        );
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_writes_output() -> kiln_error::Result<()> {
        let fs = ProjectRootTemp::new()?;
        let out = output();
        fs.path().mkdirs(&out.get_source_path().parent().unwrap())?;
        let steps = Box::new(
            UnregisteredRunAction::new("sh")
                .literal("-c")
                .literal("printf hello > \"$1\"")
                .literal("sh")
                .arg(RunArg::Output(0)),
        )
        .register(&IndexSet::new(), &indexset![out.dupe()])?;
        let ctx = StepExecutionContext {
            fs: fs.path(),
            key: out.key(),
        };
        assert_eq!(StepExecutionResult::Success, steps[0].execute(&ctx).await?);
        assert_eq!(
            Some(b"hello".to_vec()),
            fs.path().read_if_exists(out.get_source_path())?
        );
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit() -> kiln_error::Result<()> {
        let fs = ProjectRootTemp::new()?;
        let out = output();
        let steps = Box::new(
            UnregisteredRunAction::new("sh")
                .literal("-c")
                .literal("echo broken >&2; exit 3"),
        )
        .register(&IndexSet::new(), &indexset![out.dupe()])?;
        let ctx = StepExecutionContext {
            fs: fs.path(),
            key: out.key(),
        };
        assert_eq!(
            StepExecutionResult::Exited {
                exit_code: 3,
                stderr: "broken\n".to_owned()
            },
            steps[0].execute(&ctx).await?
        );
        Ok(())
    }
}
