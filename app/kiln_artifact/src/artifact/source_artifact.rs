/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;
use kiln_core::fs::paths::project_rel_path::ProjectRelativePathBuf;

/// A checked-in file. Sources have no lifecycle: they exist before the build starts.
#[derive(Clone, Dupe, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Allocative)]
#[display("{}", path)]
pub struct SourceArtifact {
    path: Arc<ProjectRelativePathBuf>,
}

impl SourceArtifact {
    pub fn new(path: ProjectRelativePathBuf) -> Self {
        Self {
            path: Arc::new(path),
        }
    }

    pub fn get_path(&self) -> &ProjectRelativePathBuf {
        &self.path
    }
}
