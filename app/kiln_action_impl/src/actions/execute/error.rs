/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;

use kiln_artifact::actions::key::ActionKey;
use kiln_error::ErrorTag;

/// This type intentionally does not implement `std::error::Error`. It is "incomplete": it only
/// becomes reportable once it is wrapped in an [`ActionError`] naming the failed action.
#[derive(Debug)]
pub enum ExecuteError {
    /// A step ran and reported failure.
    StepFailed { step: String, diagnostic: String },
    /// An external command exited unsuccessfully.
    CommandFailed {
        step: String,
        exit_code: i32,
        stderr: String,
    },
    /// The step could not be attempted, or the filesystem failed around it.
    Error { error: kiln_error::Error },
}

impl From<kiln_error::Error> for ExecuteError {
    fn from(error: kiln_error::Error) -> Self {
        Self::Error { error }
    }
}

/// The failure of one action, as surfaced to whoever asked for it to run.
#[derive(Debug)]
pub struct ActionError {
    key: ActionKey,
    category: &'static str,
    execute_error: ExecuteError,
}

impl ActionError {
    pub fn new(key: ActionKey, category: &'static str, execute_error: ExecuteError) -> Self {
        Self {
            key,
            category,
            execute_error,
        }
    }

    pub fn key(&self) -> &ActionKey {
        &self.key
    }

    pub fn execute_error(&self) -> &ExecuteError {
        &self.execute_error
    }

    /// Failing steps are problems with the build, not with kiln, unless the underlying error
    /// says otherwise.
    pub fn tags(&self) -> Vec<ErrorTag> {
        match &self.execute_error {
            ExecuteError::StepFailed { .. } => vec![ErrorTag::Input],
            ExecuteError::CommandFailed { .. } => {
                vec![ErrorTag::Input, ErrorTag::ActionCommandFailure]
            }
            ExecuteError::Error { error } if error.is_internal() => error.tags().to_vec(),
            ExecuteError::Error { error } => {
                let mut tags = vec![ErrorTag::Input];
                tags.extend(error.tags());
                tags
            }
        }
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action failed: {} {}", self.category, self.key)?;
        match &self.execute_error {
            ExecuteError::StepFailed { step, diagnostic } => {
                write!(f, "\nStep `{}` failed: {}", step, diagnostic)
            }
            ExecuteError::CommandFailed {
                step,
                exit_code,
                stderr,
            } => {
                write!(f, "\nStep `{}` exited with code {}", step, exit_code)?;
                if !stderr.is_empty() {
                    write!(f, "\nstderr:\n{}", stderr.trim_end())?;
                }
                Ok(())
            }
            ExecuteError::Error { error } => write!(f, "\n{}", error),
        }
    }
}

impl std::error::Error for ActionError {}

impl From<ActionError> for kiln_error::Error {
    fn from(e: ActionError) -> Self {
        let tags = e.tags();
        kiln_error::Error::new(e).tag(tags)
    }
}

#[cfg(test)]
mod tests {
    use kiln_artifact::actions::key::ActionIndex;
    use kiln_artifact::actions::key::ActionKey;
    use kiln_core::target::BuildTarget;
    use kiln_error::ErrorTag;

    use crate::actions::execute::error::ActionError;
    use crate::actions::execute::error::ExecuteError;

    fn key() -> ActionKey {
        ActionKey::new(
            BuildTarget::testing_parse("cell//pkg:foo"),
            ActionIndex::new(3),
        )
    }

    #[test]
    fn command_failure() {
        let e = ActionError::new(
            key(),
            "run",
            ExecuteError::CommandFailed {
                step: "false".to_owned(),
                exit_code: 1,
                stderr: "oops\n".to_owned(),
            },
        );
        assert_eq!(
            "Action failed: run (target: `cell//pkg:foo`, id: `3`)\n\
             Step `false` exited with code 1\n\
             stderr:\n\
             oops",
            e.to_string()
        );
        let e: kiln_error::Error = e.into();
        assert!(e.is_input());
        assert!(e.has_tag(ErrorTag::ActionCommandFailure));
        assert!(e.downcast_ref::<ActionError>().is_some());
    }

    #[test]
    fn internal_errors_stay_internal() {
        let e: kiln_error::Error = ActionError::new(
            key(),
            "write",
            ExecuteError::from(kiln_error::internal_error!("broken")),
        )
        .into();
        assert!(e.is_internal());
        assert!(!e.is_input());
    }

    #[test]
    fn io_errors_are_build_failures() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let e: kiln_error::Error =
            ActionError::new(key(), "write", ExecuteError::from(kiln_error::Error::from(io)))
                .into();
        assert!(e.is_input());
        assert!(e.has_tag(ErrorTag::IoSystem));
    }
}
