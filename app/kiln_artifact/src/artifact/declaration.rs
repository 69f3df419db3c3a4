/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Validation of the output paths a rule asks to declare.
//!
//! The check is lexical: symlinks are not consulted.

use std::path::Path;

use derive_more::Display;
use dupe::Dupe;
use kiln_core::fs::paths::forward_rel_path::ForwardRelativePathBuf;
use kiln_core::target::BuildTarget;
use kiln_error::ErrorTag;
use kiln_error::TaggedError;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationFailureReason {
    #[display("absolute paths are not allowed")]
    AbsolutePath,
    #[display("the path is empty or points at the target's own output directory")]
    EmptyPath,
    #[display("the path must be normalized and stay inside the target's output directory")]
    PathTraversal,
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid output path `{path}` declared by `{target}`: {reason}")]
pub struct ArtifactDeclarationError {
    pub reason: DeclarationFailureReason,
    pub target: BuildTarget,
    pub path: String,
}

impl TaggedError for ArtifactDeclarationError {
    fn error_tag(&self) -> ErrorTag {
        ErrorTag::Input
    }
}

/// Checks `path` and returns it as a forward relative path.
///
/// Separators are collapsed first, so `foo//bar/` is accepted as `foo/bar`. Any `.` or `..`
/// segment is rejected, including a leading `..` which a plain normalizer would keep.
pub fn validate_output_path(
    target: &BuildTarget,
    path: &str,
) -> Result<ForwardRelativePathBuf, ArtifactDeclarationError> {
    let fail = |reason| ArtifactDeclarationError {
        reason,
        target: target.dupe(),
        path: path.to_owned(),
    };

    if path.starts_with('/') || Path::new(path).is_absolute() {
        return Err(fail(DeclarationFailureReason::AbsolutePath));
    }

    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let mut normalized: Vec<&str> = Vec::with_capacity(components.len());
    for component in &components {
        match *component {
            "." => {}
            ".." => match normalized.last() {
                Some(last) if *last != ".." => {
                    normalized.pop();
                }
                _ => normalized.push(".."),
            },
            c => normalized.push(c),
        }
    }

    if normalized.is_empty() {
        return Err(fail(DeclarationFailureReason::EmptyPath));
    }
    if normalized != components || normalized.contains(&"..") {
        return Err(fail(DeclarationFailureReason::PathTraversal));
    }

    Ok(ForwardRelativePathBuf::unchecked_new(normalized.join("/")))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use kiln_core::target::BuildTarget;

    use crate::artifact::declaration::validate_output_path;
    use crate::artifact::declaration::ArtifactDeclarationError;
    use crate::artifact::declaration::DeclarationFailureReason;

    fn reason(path: &str) -> Option<DeclarationFailureReason> {
        validate_output_path(&BuildTarget::testing_parse("//foo:bar"), path)
            .err()
            .map(|e| e.reason)
    }

    #[test]
    fn valid_paths() {
        for p in ["bar1", "foo/bar1", "a/b/c.txt", "foo//bar", "foo/", ".hidden", "a..b"] {
            assert_eq!(None, reason(p), "{}", p);
        }
        assert_eq!(
            "foo/bar",
            validate_output_path(&BuildTarget::testing_parse("//foo:bar"), "foo//bar/")
                .unwrap()
                .as_str()
        );
    }

    #[test]
    fn absolute_paths() {
        assert_eq!(Some(DeclarationFailureReason::AbsolutePath), reason("/tmp/x"));
        assert_eq!(Some(DeclarationFailureReason::AbsolutePath), reason("/"));
    }

    #[test]
    fn empty_paths() {
        for p in ["", ".", "./", "foo/..", "a/b/../.."] {
            assert_eq!(Some(DeclarationFailureReason::EmptyPath), reason(p), "{}", p);
        }
    }

    #[test]
    fn traversal_paths() {
        for p in ["../escape", "..", "foo/../../x", "foo/../bar", "./foo", "foo/./bar"] {
            assert_eq!(
                Some(DeclarationFailureReason::PathTraversal),
                reason(p),
                "{}",
                p
            );
        }
    }

    #[test]
    fn error_carries_target_and_path() {
        let target = BuildTarget::testing_parse("//foo:bar");
        assert_matches!(
            validate_output_path(&target, "../escape"),
            Err(ArtifactDeclarationError { target: t, path, .. }) => {
                assert_eq!(t, target);
                assert_eq!("../escape", path);
            }
        );
        let err = kiln_error::Error::from(validate_output_path(&target, "/x").unwrap_err());
        assert!(err.is_input());
        assert_eq!(
            "Invalid output path `/x` declared by `//foo:bar`: absolute paths are not allowed",
            err.to_string()
        );
    }
}
