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
use indexmap::IndexSet;
use itertools::Itertools;
use kiln_artifact::actions::key::ActionIndex;
use kiln_artifact::actions::key::ActionKey;
use kiln_artifact::artifact::artifact_type::Artifact;
use kiln_artifact::artifact::artifact_type::ArtifactLike;
use kiln_artifact::artifact::artifact_type::DeclaredArtifact;
use kiln_artifact::artifact::build_artifact::BuildArtifact;
use kiln_core::fs::out_path::OutPathResolver;
use kiln_core::fs::paths::forward_rel_path::ForwardRelativePathBuf;
use kiln_core::fs::paths::project_rel_path::ProjectRelativePathBuf;
use kiln_core::target::BuildTarget;

use crate::actions::ActionErrors;
use crate::actions::UnregisteredAction;
use crate::analysis::data::ActionAnalysisData;
use crate::analysis::data::ActionAnalysisDataRegistry;
use crate::events::AnalysisEvent;
use crate::events::EventSink;

/// The actions registry for a particular analysis of a rule implementation
pub struct ActionRegistry {
    owner: BuildTarget,
    gen_root: ProjectRelativePathBuf,
    base_path: ForwardRelativePathBuf,
    next_index: u32,
    artifacts: IndexSet<DeclaredArtifact>,
    events: Arc<dyn EventSink>,
}

impl ActionRegistry {
    pub fn new(owner: BuildTarget, out_path: &OutPathResolver, events: Arc<dyn EventSink>) -> Self {
        Self {
            base_path: owner.base_path(),
            owner,
            gen_root: out_path.gen_root().clone(),
            next_index: 0,
            artifacts: IndexSet::new(),
            events,
        }
    }

    pub fn owner(&self) -> &BuildTarget {
        &self.owner
    }

    fn claim_output_path(&self, path: &ForwardRelativePathBuf) -> kiln_error::Result<()> {
        for declared in &self.artifacts {
            let existing = declared.get_path().path().clone();
            if path.starts_with(&existing) || existing.starts_with(path) {
                return Err(ActionErrors::ConflictingOutputPath(path.clone(), existing).into());
            }
        }
        Ok(())
    }

    /// Declares a new output file that will be generated by some action.
    pub fn declare_artifact(&mut self, path: &str) -> kiln_error::Result<DeclaredArtifact> {
        let declared = DeclaredArtifact::declare(
            self.owner.dupe(),
            self.gen_root.clone(),
            self.base_path.clone(),
            path,
        )?;
        let short = declared.get_path().path().clone();
        self.claim_output_path(&short)?;
        tracing::debug!("Declared output `{}` of `{}`", short, self.owner);
        self.events.send(AnalysisEvent::ArtifactDeclared {
            target: self.owner.dupe(),
            path: short,
        });
        self.artifacts.insert(declared.dupe());
        Ok(declared)
    }

    /// Registers the supplied action, binding every output to it.
    ///
    /// Nothing is bound and no id is consumed unless the whole registration succeeds.
    pub fn register<A: UnregisteredAction>(
        &mut self,
        registry: &mut ActionAnalysisDataRegistry,
        inputs: IndexSet<Artifact>,
        outputs: IndexSet<DeclaredArtifact>,
        action: A,
    ) -> kiln_error::Result<ActionKey> {
        if outputs.is_empty() {
            return Err(ActionErrors::NoOutputs(self.owner.dupe()).into());
        }
        for output in &outputs {
            let owner = output.owner();
            if owner != self.owner {
                return Err(ActionErrors::ForeignOutput {
                    output: output.to_string(),
                    owner,
                    target: self.owner.dupe(),
                }
                .into());
            }
            if let Ok(bound) = output.as_build_artifact() {
                return Err(ActionErrors::OutputAlreadyBound(bound).into());
            }
        }

        let key = ActionKey::new(self.owner.dupe(), ActionIndex::new(self.next_index));
        registry.check_can_register(&key)?;
        let planned = outputs
            .iter()
            .map(|o| BuildArtifact::new(o.get_path(), key.dupe()))
            .collect::<kiln_error::Result<IndexSet<_>>>()?;
        let category = action.category();
        let steps = Box::new(action).register(&inputs, &planned)?;

        let mut bound = IndexSet::with_capacity(outputs.len());
        for output in &outputs {
            bound.insert(output.materialize(key.dupe())?);
        }
        registry.register_action(ActionAnalysisData::new(
            key.dupe(),
            category,
            inputs,
            bound,
            steps,
        ))?;
        self.next_index += 1;

        tracing::debug!("Registered {} action {}", category, key);
        self.events.send(AnalysisEvent::ActionRegistered {
            key: key.dupe(),
            category,
        });
        Ok(key)
    }

    /// Every artifact declared so far, in declaration order.
    pub fn artifacts(&self) -> &IndexSet<DeclaredArtifact> {
        &self.artifacts
    }

    /// Fails if any declared artifact was never bound to an action, naming every such artifact.
    pub fn ensure_bound(&self) -> kiln_error::Result<()> {
        let unbound = self
            .artifacts
            .iter()
            .filter(|a| !a.is_bound())
            .map(|a| a.get_path().path().to_string())
            .join(", ");
        if unbound.is_empty() {
            return Ok(());
        }
        Err(ActionErrors::UnboundOutputs(self.owner.dupe(), unbound).into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use dupe::Dupe;
    use indexmap::indexset;
    use indexmap::IndexSet;
    use kiln_artifact::actions::key::ActionIndex;
    use kiln_artifact::actions::key::ActionKey;
    use kiln_artifact::artifact::artifact_type::Artifact;
    use kiln_artifact::artifact::artifact_type::ArtifactLike;
    use kiln_artifact::artifact::artifact_type::DeclaredArtifact;
    use kiln_artifact::artifact::artifact_type::testing::BuildArtifactTestingExt;
    use kiln_artifact::artifact::build_artifact::BuildArtifact;
    use kiln_core::fs::out_path::OutPathResolver;
    use kiln_core::target::BuildTarget;

    use crate::actions::registry::ActionRegistry;
    use crate::actions::testing::SimpleUnregisteredAction;
    use crate::actions::ActionErrors;
    use crate::actions::Step;
    use crate::analysis::data::ActionAnalysisData;
    use crate::analysis::data::ActionAnalysisDataRegistry;
    use crate::events::AnalysisEvent;
    use crate::events::CollectingEventSink;
    use crate::events::NullEventSink;

    fn registry(target: &BuildTarget) -> ActionRegistry {
        ActionRegistry::new(
            target.dupe(),
            &OutPathResolver::default(),
            Arc::new(NullEventSink),
        )
    }

    #[test]
    fn declaring_artifacts() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let mut actions = registry(&target);
        let out = actions.declare_artifact("bar.out")?;
        assert!(!out.is_bound());
        assert_eq!(
            "kiln-out/gen/cell/pkg/__foo__/bar.out",
            out.get_path().resolve().as_str()
        );
        assert_eq!(1, actions.artifacts().len());
        Ok(())
    }

    #[test]
    fn invalid_declaration_leaves_no_artifact() {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let mut actions = registry(&target);
        let err = actions.declare_artifact("../escape").unwrap_err();
        assert!(err.is_input());
        assert!(actions.artifacts().is_empty());
    }

    #[test]
    fn claiming_conflicting_path() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let mut actions = registry(&target);
        actions.declare_artifact("a/b")?;

        for conflict in ["a/b", "a", "a/b/c"] {
            let err = actions.declare_artifact(conflict).unwrap_err();
            assert!(err.is_input());
            assert_matches!(
                err.downcast_ref::<ActionErrors>(),
                Some(ActionErrors::ConflictingOutputPath(..))
            );
        }
        actions.declare_artifact("a/c")?;
        actions.declare_artifact("ab")?;
        assert_eq!(3, actions.artifacts().len());
        Ok(())
    }

    #[test]
    fn register_binds_outputs_in_order() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let mut actions = registry(&target);
        let mut data = ActionAnalysisDataRegistry::new(target.dupe());

        let out1 = actions.declare_artifact("bar1.out")?;
        let out2 = actions.declare_artifact("bar2.out")?;
        let key1 = actions.register(
            &mut data,
            IndexSet::new(),
            indexset![out1.dupe()],
            SimpleUnregisteredAction::new(Vec::new()),
        )?;
        let key2 = actions.register(
            &mut data,
            indexset![Artifact::from(out1.as_build_artifact()?)],
            indexset![out2.dupe()],
            SimpleUnregisteredAction::new(Vec::new()),
        )?;

        assert_eq!(ActionKey::new(target.dupe(), ActionIndex::new(0)), key1);
        assert_eq!(ActionKey::new(target.dupe(), ActionIndex::new(1)), key2);
        assert_eq!(key1, out1.get_action_data_key()?);
        assert_eq!(key2, out2.get_action_data_key()?);
        assert_eq!(2, data.len());
        let registered = data.get(&key2).unwrap();
        assert_eq!(1, registered.inputs().len());
        assert_eq!(
            vec!["bar2.out"],
            registered
                .outputs()
                .iter()
                .map(|o| o.get_path().path().to_string())
                .collect::<Vec<_>>()
        );
        Ok(())
    }

    #[test]
    fn register_foreign_output_is_internal_error() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let other = BuildTarget::testing_parse("cell//pkg:other");
        let mut actions = registry(&target);
        let mut other_actions = registry(&other);
        let mut data = ActionAnalysisDataRegistry::new(target.dupe());

        let foreign = other_actions.declare_artifact("x")?;
        let err = actions
            .register(
                &mut data,
                IndexSet::new(),
                indexset![foreign.dupe()],
                SimpleUnregisteredAction::new(Vec::new()),
            )
            .unwrap_err();
        assert!(err.is_internal());
        assert!(!foreign.is_bound());
        assert!(data.is_empty());
        Ok(())
    }

    #[test]
    fn register_bound_output_fails_without_consuming_id() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let mut actions = registry(&target);
        let mut data = ActionAnalysisDataRegistry::new(target.dupe());

        let out = actions.declare_artifact("out")?;
        let fresh = actions.declare_artifact("fresh")?;
        actions.register(
            &mut data,
            IndexSet::new(),
            indexset![out.dupe()],
            SimpleUnregisteredAction::new(Vec::new()),
        )?;
        let err = actions
            .register(
                &mut data,
                IndexSet::new(),
                indexset![fresh.dupe(), out.dupe()],
                SimpleUnregisteredAction::new(Vec::new()),
            )
            .unwrap_err();
        assert!(err.is_internal());
        assert!(!fresh.is_bound());

        let key = actions.register(
            &mut data,
            IndexSet::new(),
            indexset![fresh.dupe()],
            SimpleUnregisteredAction::new(Vec::new()),
        )?;
        assert_eq!(ActionIndex::new(1), key.action_index());
        Ok(())
    }

    #[test]
    fn occupied_slot_binds_nothing() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let mut actions = registry(&target);
        let mut data = ActionAnalysisDataRegistry::new(target.dupe());
        data.register_action(ActionAnalysisData::new(
            ActionKey::new(target.dupe(), ActionIndex::new(0)),
            "test",
            IndexSet::new(),
            indexset![BuildArtifact::testing_new(
                target.dupe(),
                "elsewhere",
                ActionIndex::new(0)
            )],
            Vec::new(),
        ))?;

        let out = actions.declare_artifact("out")?;
        let err = actions
            .register(
                &mut data,
                IndexSet::new(),
                indexset![out.dupe()],
                SimpleUnregisteredAction::new(Vec::new()),
            )
            .unwrap_err();
        assert!(err.is_internal());
        assert!(err.to_string().contains("already registered"), "{}", err);
        assert!(!out.is_bound());
        assert_eq!(1, data.len());
        Ok(())
    }

    #[test]
    fn registry_of_other_target_binds_nothing() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let other = BuildTarget::testing_parse("cell//pkg:other");
        let mut actions = registry(&target);
        let mut data = ActionAnalysisDataRegistry::new(other);

        let out = actions.declare_artifact("out")?;
        let err = actions
            .register(
                &mut data,
                IndexSet::new(),
                indexset![out.dupe()],
                SimpleUnregisteredAction::new(Vec::new()),
            )
            .unwrap_err();
        assert!(err.is_internal());
        assert!(!out.is_bound());
        assert!(data.is_empty());

        // The id was not consumed either.
        let mut data = ActionAnalysisDataRegistry::new(target.dupe());
        let key = actions.register(
            &mut data,
            IndexSet::new(),
            indexset![out.dupe()],
            SimpleUnregisteredAction::new(Vec::new()),
        )?;
        assert_eq!(ActionIndex::new(0), key.action_index());
        assert!(out.is_bound());
        Ok(())
    }

    #[test]
    fn rejected_action_binds_nothing() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let mut actions = registry(&target);
        let mut data = ActionAnalysisDataRegistry::new(target.dupe());

        let out = actions.declare_artifact("out")?;
        let err = actions
            .register(
                &mut data,
                IndexSet::new(),
                indexset![out.dupe()],
                SimpleUnregisteredAction::rejecting(),
            )
            .unwrap_err();
        assert!(err.is_input());
        assert!(!out.is_bound());
        assert!(data.is_empty());
        Ok(())
    }

    #[test]
    fn register_without_outputs() {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let mut actions = registry(&target);
        let mut data = ActionAnalysisDataRegistry::new(target.dupe());
        let err = actions
            .register(
                &mut data,
                IndexSet::new(),
                IndexSet::<DeclaredArtifact>::new(),
                SimpleUnregisteredAction::new(Vec::<Arc<dyn Step>>::new()),
            )
            .unwrap_err();
        assert_matches!(
            err.downcast_ref::<ActionErrors>(),
            Some(ActionErrors::NoOutputs(_))
        );
    }

    #[test]
    fn ensure_bound_names_unbound_outputs() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let mut actions = registry(&target);
        let mut data = ActionAnalysisDataRegistry::new(target.dupe());
        let bound = actions.declare_artifact("bound")?;
        actions.declare_artifact("left1")?;
        actions.declare_artifact("left2")?;
        actions.register(
            &mut data,
            IndexSet::new(),
            indexset![bound],
            SimpleUnregisteredAction::new(Vec::new()),
        )?;

        let err = actions.ensure_bound().unwrap_err();
        assert!(err.is_input());
        assert!(err.to_string().contains("left1, left2"), "{}", err);
        Ok(())
    }

    #[test]
    fn emits_events() -> kiln_error::Result<()> {
        let target = BuildTarget::testing_parse("cell//pkg:foo");
        let sink = Arc::new(CollectingEventSink::new());
        let mut actions =
            ActionRegistry::new(target.dupe(), &OutPathResolver::default(), sink.dupe());
        let mut data = ActionAnalysisDataRegistry::new(target.dupe());
        let out = actions.declare_artifact("out")?;
        let key = actions.register(
            &mut data,
            IndexSet::new(),
            indexset![out],
            SimpleUnregisteredAction::new(Vec::new()),
        )?;

        let events = sink.take();
        assert_eq!(2, events.len());
        assert_matches!(&events[0], AnalysisEvent::ArtifactDeclared { path, .. } if path == "out");
        assert_eq!(
            AnalysisEvent::ActionRegistered {
                key,
                category: "simple"
            },
            events[1]
        );
        Ok(())
    }
}
