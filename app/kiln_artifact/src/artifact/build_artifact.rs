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
use kiln_core::fs::paths::forward_rel_path::ForwardRelativePathBuf;
use kiln_core::fs::paths::project_rel_path::ProjectRelativePathBuf;
use kiln_core::target::BuildTarget;
use kiln_error::internal_error;

use crate::actions::key::ActionKey;

/// Where a build output lives: `gen_root/base_path/path`, owned by `owner`.
///
/// The location is known at declaration time, before any action is attached.
#[derive(Clone, Dupe, Debug, PartialEq, Eq, Hash, Allocative)]
pub struct BuildArtifactPath(Arc<BuildArtifactPathData>);

impl fmt::Display for BuildArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_path())
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Allocative)]
struct BuildArtifactPathData {
    owner: BuildTarget,
    gen_root: ProjectRelativePathBuf,
    base_path: ForwardRelativePathBuf,
    path: ForwardRelativePathBuf,
}

impl BuildArtifactPath {
    pub fn new(
        owner: BuildTarget,
        gen_root: ProjectRelativePathBuf,
        base_path: ForwardRelativePathBuf,
        path: ForwardRelativePathBuf,
    ) -> Self {
        Self(Arc::new(BuildArtifactPathData {
            owner,
            gen_root,
            base_path,
            path,
        }))
    }

    pub fn owner(&self) -> &BuildTarget {
        &self.0.owner
    }

    pub fn gen_root(&self) -> &ProjectRelativePathBuf {
        &self.0.gen_root
    }

    pub fn base_path(&self) -> &ForwardRelativePathBuf {
        &self.0.base_path
    }

    /// The path as declared, relative to the owner's output directory.
    pub fn path(&self) -> &ForwardRelativePathBuf {
        &self.0.path
    }

    /// `base_path/path`: the artifact's location without the generated-output root.
    pub fn short_path(&self) -> ForwardRelativePathBuf {
        self.0.base_path.join(&self.0.path)
    }

    pub fn resolve(&self) -> ProjectRelativePathBuf {
        self.0.gen_root.join(&self.short_path())
    }
}

/// An artifact that is built by the build system: a declared output bound to its producer.
#[derive(Clone, Dupe, Debug, PartialEq, Eq, Hash, Allocative)]
pub struct BuildArtifact(Arc<BuildArtifactData>);

impl fmt::Display for BuildArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`, action: {}", self.0.path, self.0.key)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Allocative)]
struct BuildArtifactData {
    path: BuildArtifactPath,
    key: ActionKey,
    /// Computed once when the artifact is bound.
    resolved: ProjectRelativePathBuf,
}

impl BuildArtifact {
    pub fn new(path: BuildArtifactPath, key: ActionKey) -> kiln_error::Result<Self> {
        if key.owner() != path.owner() {
            return Err(internal_error!(
                "Owner mismatch: in action key: {}, in path: {}",
                key.owner(),
                path.owner(),
            ));
        }
        let resolved = path.resolve();
        Ok(BuildArtifact(Arc::new(BuildArtifactData {
            path,
            key,
            resolved,
        })))
    }

    pub fn get_path(&self) -> &BuildArtifactPath {
        &self.0.path
    }

    pub fn key(&self) -> &ActionKey {
        &self.0.key
    }

    pub fn owner(&self) -> &BuildTarget {
        self.0.path.owner()
    }

    /// The project-relative location the producing action writes to.
    pub fn get_source_path(&self) -> &ProjectRelativePathBuf {
        &self.0.resolved
    }
}
