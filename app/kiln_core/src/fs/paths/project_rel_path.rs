/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use allocative::Allocative;
use derive_more::Display;

use crate::fs::paths::forward_rel_path::ForwardRelativePathBuf;
use crate::fs::paths::forward_rel_path::ForwardRelativePathError;

/// A path relative to the project root.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Allocative)]
#[display("{}", _0)]
pub struct ProjectRelativePathBuf(ForwardRelativePathBuf);

impl ProjectRelativePathBuf {
    pub fn new(path: impl Into<String>) -> Result<Self, ForwardRelativePathError> {
        Ok(Self(ForwardRelativePathBuf::new(path)?))
    }

    pub fn unchecked_new(path: String) -> Self {
        Self(ForwardRelativePathBuf::unchecked_new(path))
    }

    pub fn as_forward_relative_path(&self) -> &ForwardRelativePathBuf {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn join(&self, path: &ForwardRelativePathBuf) -> ProjectRelativePathBuf {
        Self(self.0.join(path))
    }

    pub fn parent(&self) -> Option<ProjectRelativePathBuf> {
        self.0.parent().map(Self)
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        let suffix: Vec<&str> = suffix.split('/').filter(|c| !c.is_empty()).collect();
        let ours: Vec<&str> = self.0.iter().collect();
        ours.len() >= suffix.len() && ours[ours.len() - suffix.len()..] == suffix[..]
    }
}

impl From<ForwardRelativePathBuf> for ProjectRelativePathBuf {
    fn from(path: ForwardRelativePathBuf) -> Self {
        Self(path)
    }
}

impl PartialEq<&str> for ProjectRelativePathBuf {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
