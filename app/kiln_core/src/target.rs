/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;
use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;
use kiln_error::ErrorTag;
use kiln_error::TaggedError;

use crate::fs::paths::forward_rel_path::ForwardRelativePathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TargetParseError {
    #[error("Target `{0}` must contain `//`")]
    MissingSlashes(String),
    #[error("Target `{0}` must contain `:` followed by a name")]
    MissingName(String),
    #[error("Target `{0}` has an invalid name; names are non-empty and contain no `/`")]
    InvalidName(String),
    #[error("Target `{0}` has an invalid package path")]
    InvalidPackage(String),
    #[error("Target `{0}` has an invalid cell; cells are a single path component other than `.` or `..`")]
    InvalidCell(String),
}

impl TaggedError for TargetParseError {
    fn error_tag(&self) -> ErrorTag {
        ErrorTag::Input
    }
}

/// The identity of a rule instance, e.g. `cell//foo/bar:baz` or `//foo:bar`.
#[derive(Clone, Dupe, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Allocative)]
pub struct BuildTarget(Arc<BuildTargetData>);

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}//{}:{}", self.0.cell, self.0.package, self.0.name)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Allocative)]
struct BuildTargetData {
    cell: String,
    package: ForwardRelativePathBuf,
    name: String,
}

impl BuildTarget {
    pub fn parse(target: &str) -> Result<BuildTarget, TargetParseError> {
        let (cell, rest) = target
            .split_once("//")
            .ok_or_else(|| TargetParseError::MissingSlashes(target.to_owned()))?;
        let (package, name) = rest
            .rsplit_once(':')
            .ok_or_else(|| TargetParseError::MissingName(target.to_owned()))?;
        if name.is_empty() || name.contains('/') {
            return Err(TargetParseError::InvalidName(target.to_owned()));
        }
        // The cell becomes the first component of every output path of the target.
        if !cell.is_empty()
            && (cell.contains(['/', ':']) || ForwardRelativePathBuf::new(cell).is_err())
        {
            return Err(TargetParseError::InvalidCell(target.to_owned()));
        }
        let package = ForwardRelativePathBuf::new(package)
            .map_err(|_| TargetParseError::InvalidPackage(target.to_owned()))?;
        Ok(BuildTarget(Arc::new(BuildTargetData {
            cell: cell.to_owned(),
            package,
            name: name.to_owned(),
        })))
    }

    pub fn cell(&self) -> &str {
        &self.0.cell
    }

    pub fn package(&self) -> &ForwardRelativePathBuf {
        &self.0.package
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The directory, below the generated-output root, that holds this target's outputs:
    /// `[cell/]package/__name__`.
    pub fn base_path(&self) -> ForwardRelativePathBuf {
        let mut components = Vec::new();
        if !self.0.cell.is_empty() {
            components.push(self.0.cell.clone());
        }
        components.extend(self.0.package.iter().map(str::to_owned));
        components.push(format!("__{}__", self.0.name));
        ForwardRelativePathBuf::unchecked_new(components.join("/"))
    }

    pub fn testing_parse(target: &str) -> BuildTarget {
        BuildTarget::parse(target).unwrap()
    }
}
