/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use allocative::Allocative;

use crate::env::EnvHelper;
use crate::fs::paths::forward_rel_path::ForwardRelativePathBuf;
use crate::fs::paths::project_rel_path::ProjectRelativePathBuf;
use crate::target::BuildTarget;

static GEN_ROOT: EnvHelper<String> = EnvHelper::string("KILN_GEN_ROOT");

/// Decides where generated outputs live inside the project.
#[derive(Clone, Debug, PartialEq, Eq, Allocative)]
pub struct OutPathResolver {
    gen_root: ProjectRelativePathBuf,
}

impl OutPathResolver {
    pub const DEFAULT_GEN_ROOT: &'static str = "kiln-out/gen";

    pub fn new(gen_root: ProjectRelativePathBuf) -> Self {
        Self { gen_root }
    }

    /// Uses `$KILN_GEN_ROOT` if set, the default root otherwise.
    pub fn from_env() -> kiln_error::Result<Self> {
        let gen_root = match GEN_ROOT.get()? {
            Some(root) => ProjectRelativePathBuf::new(root.as_str())?,
            None => ProjectRelativePathBuf::unchecked_new(Self::DEFAULT_GEN_ROOT.to_owned()),
        };
        Ok(Self::new(gen_root))
    }

    pub fn gen_root(&self) -> &ProjectRelativePathBuf {
        &self.gen_root
    }

    /// `gen_root/target_base_path`, the directory holding all outputs of `target`.
    pub fn package_path(&self, target: &BuildTarget) -> ProjectRelativePathBuf {
        self.gen_root.join(&target.base_path())
    }

    pub fn resolve_gen(
        &self,
        target: &BuildTarget,
        path: &ForwardRelativePathBuf,
    ) -> ProjectRelativePathBuf {
        self.package_path(target).join(path)
    }
}

impl Default for OutPathResolver {
    fn default() -> Self {
        Self::new(ProjectRelativePathBuf::unchecked_new(
            Self::DEFAULT_GEN_ROOT.to_owned(),
        ))
    }
}
