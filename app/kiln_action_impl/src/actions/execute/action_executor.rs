/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::time::Duration;
use std::time::Instant;

use dupe::Dupe;
use kiln_analysis::actions::StepExecutionContext;
use kiln_analysis::actions::StepExecutionResult;
use kiln_analysis::analysis::data::ActionAnalysisData;
use kiln_analysis::events::AnalysisEvent;
use kiln_analysis::events::EventSink;
use kiln_artifact::actions::key::ActionKey;
use kiln_core::fs::paths::project_rel_path::ProjectRelativePathBuf;
use kiln_core::fs::project::ArtifactFilesystem;

use crate::actions::execute::error::ActionError;
use crate::actions::execute::error::ExecuteError;

/// What a successful action produced.
#[derive(Debug, Clone)]
pub struct ActionOutputs {
    key: ActionKey,
    outputs: Vec<ProjectRelativePathBuf>,
    wall_time: Duration,
}

impl ActionOutputs {
    pub fn key(&self) -> &ActionKey {
        &self.key
    }

    /// The resolved locations of the declared outputs, in declaration order.
    pub fn outputs(&self) -> &[ProjectRelativePathBuf] {
        &self.outputs
    }

    pub fn wall_time(&self) -> Duration {
        self.wall_time
    }
}

/// Runs registered actions against a filesystem.
///
/// Holds no per-action state: unrelated actions may be executed concurrently through the same
/// executor. Deciding when an action's inputs are ready is up to the caller.
pub struct ActionExecutor<'a> {
    fs: &'a dyn ArtifactFilesystem,
    events: &'a dyn EventSink,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(fs: &'a dyn ArtifactFilesystem, events: &'a dyn EventSink) -> Self {
        Self { fs, events }
    }

    /// Creates the output directories, then runs the steps in order, stopping at the first
    /// failure. Nothing is retried, and outputs written before a failure are left in place.
    pub async fn execute(&self, action: &ActionAnalysisData) -> Result<ActionOutputs, ActionError> {
        let key = action.key();
        tracing::info!("Executing {} action {}", action.category(), key);
        self.events.send(AnalysisEvent::ActionExecutionStarted {
            key: key.dupe(),
            category: action.category(),
        });

        let start = Instant::now();
        let res = self.execute_steps(action).await;
        let wall_time = start.elapsed();

        self.events.send(AnalysisEvent::ActionExecutionFinished {
            key: key.dupe(),
            success: res.is_ok(),
        });

        match res {
            Ok(outputs) => {
                tracing::info!("Finished {} in {:?}", key, wall_time);
                Ok(ActionOutputs {
                    key: key.dupe(),
                    outputs,
                    wall_time,
                })
            }
            Err(e) => {
                let e = ActionError::new(key.dupe(), action.category(), e);
                tracing::warn!("{}", e);
                Err(e)
            }
        }
    }

    async fn execute_steps(
        &self,
        action: &ActionAnalysisData,
    ) -> Result<Vec<ProjectRelativePathBuf>, ExecuteError> {
        let outputs: Vec<ProjectRelativePathBuf> = action
            .outputs()
            .iter()
            .map(|o| o.get_source_path().clone())
            .collect();
        for output in &outputs {
            if let Some(dir) = output.parent() {
                self.fs.mkdirs(&dir)?;
            }
        }

        let ctx = StepExecutionContext {
            fs: self.fs,
            key: action.key(),
        };
        for step in action.steps() {
            tracing::debug!("Running step `{}` of {}", step.name(), action.key());
            match step.execute(&ctx).await? {
                StepExecutionResult::Success => {}
                StepExecutionResult::Failure { diagnostic } => {
                    return Err(ExecuteError::StepFailed {
                        step: step.name().to_owned(),
                        diagnostic,
                    });
                }
                StepExecutionResult::Exited { exit_code, stderr } => {
                    return Err(ExecuteError::CommandFailed {
                        step: step.name().to_owned(),
                        exit_code,
                        stderr,
                    });
                }
            }
        }
        Ok(outputs)
    }
}
