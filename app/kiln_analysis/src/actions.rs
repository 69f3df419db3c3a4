/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexSet;
use kiln_artifact::actions::key::ActionKey;
use kiln_artifact::artifact::artifact_type::Artifact;
use kiln_artifact::artifact::build_artifact::BuildArtifact;
use kiln_core::fs::paths::forward_rel_path::ForwardRelativePathBuf;
use kiln_core::fs::project::ArtifactFilesystem;
use kiln_core::target::BuildTarget;
use kiln_error::ErrorTag;
use kiln_error::TaggedError;

pub mod registry;
pub mod testing;

#[derive(Debug, thiserror::Error)]
pub enum ActionErrors {
    #[error("Output path `{0}` conflicts with already declared output `{1}`")]
    ConflictingOutputPath(ForwardRelativePathBuf, ForwardRelativePathBuf),
    #[error("Action registered by `{0}` must have at least one output")]
    NoOutputs(BuildTarget),
    #[error("Output {output} belongs to `{owner}`, it cannot be produced by an action of `{target}`")]
    ForeignOutput {
        output: String,
        owner: BuildTarget,
        target: BuildTarget,
    },
    #[error("Output {0} is already bound to another action")]
    OutputAlreadyBound(BuildArtifact),
    #[error("Outputs declared by `{0}` were never bound to an action: {1}")]
    UnboundOutputs(BuildTarget, String),
}

impl TaggedError for ActionErrors {
    fn error_tag(&self) -> ErrorTag {
        match self {
            ActionErrors::ConflictingOutputPath(..)
            | ActionErrors::NoOutputs(_)
            | ActionErrors::UnboundOutputs(..) => ErrorTag::Input,
            ActionErrors::ForeignOutput { .. } | ActionErrors::OutputAlreadyBound(_) => {
                ErrorTag::InternalError
            }
        }
    }
}

/// What a step hands back once it has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepExecutionResult {
    Success,
    Failure { diagnostic: String },
    /// An external process exited unsuccessfully.
    Exited { exit_code: i32, stderr: String },
}

impl StepExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, StepExecutionResult::Success)
    }
}

/// What a step may see while it runs.
pub struct StepExecutionContext<'a> {
    pub fs: &'a dyn ArtifactFilesystem,
    pub key: &'a ActionKey,
}

/// One unit of work inside an action. Steps of an action run in order, one at a time, so a step
/// may depend on the filesystem effects of the previous ones.
#[async_trait]
pub trait Step: Debug + Send + Sync + 'static {
    /// Short human-readable description, used in logs and diagnostics.
    fn name(&self) -> &str;

    /// `Err` is reserved for failures to even attempt the step (I/O errors and the like); an
    /// attempted step that did not succeed returns a non-success [`StepExecutionResult`].
    async fn execute(
        &self,
        ctx: &StepExecutionContext<'_>,
    ) -> kiln_error::Result<StepExecutionResult>;
}

/// An action as created by rule logic, before its outputs are bound.
pub trait UnregisteredAction: Send + 'static {
    fn category(&self) -> &'static str;

    /// Validates the action against its bound outputs and produces its steps.
    ///
    /// Called before any output is bound: an error here leaves the registry untouched.
    fn register(
        self: Box<Self>,
        inputs: &IndexSet<Artifact>,
        outputs: &IndexSet<BuildArtifact>,
    ) -> kiln_error::Result<Vec<Arc<dyn Step>>>;
}
