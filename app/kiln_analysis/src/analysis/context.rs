/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use dupe::Dupe;
use indexmap::IndexMap;
use indexmap::IndexSet;
use kiln_artifact::actions::key::ActionIndex;
use kiln_artifact::actions::key::ActionKey;
use kiln_artifact::artifact::artifact_type::Artifact;
use kiln_artifact::artifact::artifact_type::DeclaredArtifact;
use kiln_core::fs::out_path::OutPathResolver;
use kiln_core::target::BuildTarget;

use crate::actions::registry::ActionRegistry;
use crate::actions::UnregisteredAction;
use crate::analysis::data::ActionAnalysisData;
use crate::analysis::data::ActionAnalysisDataRegistry;
use crate::events::EventSink;
use crate::provider::ProviderInfoCollection;
use crate::provider::RuleAnalysisKey;

/// Everything rule logic sees while analyzing one target.
///
/// Created once per target per analysis, and consumed by [`RuleAnalysisContext::finish`] once
/// the rule returns.
pub struct RuleAnalysisContext {
    target: BuildTarget,
    deps: IndexMap<RuleAnalysisKey, ProviderInfoCollection>,
    actions: ActionRegistry,
    action_data: ActionAnalysisDataRegistry,
    events: Arc<dyn EventSink>,
}

impl RuleAnalysisContext {
    pub fn new(
        target: BuildTarget,
        deps: IndexMap<RuleAnalysisKey, ProviderInfoCollection>,
        out_path: &OutPathResolver,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            actions: ActionRegistry::new(target.dupe(), out_path, events.dupe()),
            action_data: ActionAnalysisDataRegistry::new(target.dupe()),
            target,
            deps,
            events,
        }
    }

    pub fn build_target(&self) -> &BuildTarget {
        &self.target
    }

    pub fn deps(&self) -> &IndexMap<RuleAnalysisKey, ProviderInfoCollection> {
        &self.deps
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// The registry of this context. Every call hands out the same registry.
    pub fn action_factory(&mut self) -> ActionFactory<'_> {
        ActionFactory {
            actions: &mut self.actions,
            action_data: &mut self.action_data,
        }
    }

    pub fn get_registered_action_data(&self) -> &IndexMap<ActionIndex, ActionAnalysisData> {
        self.action_data.actions()
    }

    /// Ends the analysis of this target. Fails if any declared output was left without an
    /// action producing it.
    pub fn finish(self) -> kiln_error::Result<AnalysisResult> {
        self.actions.ensure_bound()?;
        Ok(AnalysisResult {
            target: self.target,
            actions: self.action_data.into_actions(),
        })
    }
}

/// Declares outputs and registers actions on behalf of a [`RuleAnalysisContext`].
pub struct ActionFactory<'a> {
    actions: &'a mut ActionRegistry,
    action_data: &'a mut ActionAnalysisDataRegistry,
}

impl<'a> ActionFactory<'a> {
    pub fn declare_artifact(&mut self, path: &str) -> kiln_error::Result<DeclaredArtifact> {
        self.actions.declare_artifact(path)
    }

    pub fn register_action<A: UnregisteredAction>(
        &mut self,
        inputs: IndexSet<Artifact>,
        outputs: IndexSet<DeclaredArtifact>,
        action: A,
    ) -> kiln_error::Result<ActionKey> {
        self.actions
            .register(&mut *self.action_data, inputs, outputs, action)
    }

    pub fn registry(&self) -> &ActionRegistry {
        self.actions
    }
}

/// The immutable outcome of analyzing one target, ready to be merged into the build graph.
#[derive(Debug)]
pub struct AnalysisResult {
    target: BuildTarget,
    actions: IndexMap<ActionIndex, ActionAnalysisData>,
}

impl AnalysisResult {
    pub fn target(&self) -> &BuildTarget {
        &self.target
    }

    pub fn get_registered_action_data(&self) -> &IndexMap<ActionIndex, ActionAnalysisData> {
        &self.actions
    }

    pub fn get(&self, key: &ActionKey) -> Option<&ActionAnalysisData> {
        if key.owner() != &self.target {
            return None;
        }
        self.actions.get(&key.action_index())
    }

    /// Actions in registration order, addressed by their build-wide key.
    pub fn iter(&self) -> impl Iterator<Item = (&ActionKey, &ActionAnalysisData)> {
        self.actions.values().map(|data| (data.key(), data))
    }
}
