/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::IndexSet;
use kiln_artifact::actions::key::ActionIndex;
use kiln_artifact::actions::key::ActionKey;
use kiln_artifact::artifact::artifact_type::Artifact;
use kiln_artifact::artifact::build_artifact::BuildArtifact;
use kiln_core::target::BuildTarget;
use kiln_error::internal_error;

use crate::actions::Step;

/// An action as registered during analysis: what it reads, what it writes and how.
///
/// Immutable once constructed; cheap to clone.
#[derive(Clone, Debug)]
pub struct ActionAnalysisData {
    key: ActionKey,
    category: &'static str,
    inputs: IndexSet<Artifact>,
    outputs: IndexSet<BuildArtifact>,
    steps: Arc<[Arc<dyn Step>]>,
}

impl ActionAnalysisData {
    pub fn new(
        key: ActionKey,
        category: &'static str,
        inputs: IndexSet<Artifact>,
        outputs: IndexSet<BuildArtifact>,
        steps: Vec<Arc<dyn Step>>,
    ) -> Self {
        Self {
            key,
            category,
            inputs,
            outputs,
            steps: steps.into(),
        }
    }

    pub fn key(&self) -> &ActionKey {
        &self.key
    }

    pub fn owner(&self) -> &BuildTarget {
        self.key.owner()
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    pub fn inputs(&self) -> &IndexSet<Artifact> {
        &self.inputs
    }

    pub fn outputs(&self) -> &IndexSet<BuildArtifact> {
        &self.outputs
    }

    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }
}

/// The actions registered while analyzing one target, keyed by their local index.
#[derive(Debug)]
pub struct ActionAnalysisDataRegistry {
    owner: BuildTarget,
    actions: IndexMap<ActionIndex, ActionAnalysisData>,
}

impl ActionAnalysisDataRegistry {
    pub fn new(owner: BuildTarget) -> Self {
        Self {
            owner,
            actions: IndexMap::new(),
        }
    }

    pub fn owner(&self) -> &BuildTarget {
        &self.owner
    }

    /// Fails unless an action of `key` could be inserted right now.
    ///
    /// Both failures here mean the registry handing out keys is broken, so they are internal.
    pub fn check_can_register(&self, key: &ActionKey) -> kiln_error::Result<()> {
        if key.owner() != &self.owner {
            return Err(internal_error!(
                "Action {} registered in the analysis of `{}`",
                key,
                self.owner
            ));
        }
        if self.actions.contains_key(&key.action_index()) {
            return Err(internal_error!(
                "Action of key {} was already registered",
                key
            ));
        }
        Ok(())
    }

    pub fn register_action(&mut self, data: ActionAnalysisData) -> kiln_error::Result<()> {
        self.check_can_register(data.key())?;
        self.actions.insert(data.key().action_index(), data);
        Ok(())
    }

    pub fn get(&self, key: &ActionKey) -> Option<&ActionAnalysisData> {
        if key.owner() != &self.owner {
            return None;
        }
        self.actions.get(&key.action_index())
    }

    pub fn actions(&self) -> &IndexMap<ActionIndex, ActionAnalysisData> {
        &self.actions
    }

    pub fn into_actions(self) -> IndexMap<ActionIndex, ActionAnalysisData> {
        self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
