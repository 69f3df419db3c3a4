/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Actions for exercising registration without a real implementation.

use std::sync::Arc;

use indexmap::IndexSet;
use kiln_artifact::artifact::artifact_type::Artifact;
use kiln_artifact::artifact::build_artifact::BuildArtifact;
use kiln_error::ErrorTag;

use crate::actions::Step;
use crate::actions::UnregisteredAction;

/// Registers with a fixed list of steps, or refuses to register at all.
pub struct SimpleUnregisteredAction {
    steps: Vec<Arc<dyn Step>>,
    reject: bool,
}

impl SimpleUnregisteredAction {
    pub fn new(steps: Vec<Arc<dyn Step>>) -> Self {
        Self {
            steps,
            reject: false,
        }
    }

    pub fn rejecting() -> Self {
        Self {
            steps: Vec::new(),
            reject: true,
        }
    }
}

impl UnregisteredAction for SimpleUnregisteredAction {
    fn category(&self) -> &'static str {
        "simple"
    }

    fn register(
        self: Box<Self>,
        _inputs: &IndexSet<Artifact>,
        _outputs: &IndexSet<BuildArtifact>,
    ) -> kiln_error::Result<Vec<Arc<dyn Step>>> {
        if self.reject {
            return Err(kiln_error::kiln_error!(
                ErrorTag::Input,
                "simple action rejected its outputs"
            ));
        }
        Ok(self.steps)
    }
}
