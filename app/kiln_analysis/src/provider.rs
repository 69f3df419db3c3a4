/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Providers are the results a dependency's analysis exposes to its dependents. They are opaque
//! to this crate: a rule looks them up by type.

use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use derive_more::Display;
use dupe::Dupe;
use indexmap::IndexMap;
use kiln_core::target::BuildTarget;

/// Identifies the analysis whose providers a dependent consumes.
#[derive(Clone, Dupe, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleAnalysisKey(BuildTarget);

impl RuleAnalysisKey {
    pub fn new(target: BuildTarget) -> Self {
        Self(target)
    }

    pub fn target(&self) -> &BuildTarget {
        &self.0
    }
}

/// The providers produced by one analyzed target, at most one per type.
#[derive(Clone, Dupe, Default)]
pub struct ProviderInfoCollection {
    providers: Arc<IndexMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync>)>>,
}

impl ProviderInfoCollection {
    pub fn builder() -> ProviderInfoCollectionBuilder {
        ProviderInfoCollectionBuilder::default()
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.providers
            .get(&TypeId::of::<T>())
            .and_then(|(_, p)| p.downcast_ref::<T>())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.providers.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderInfoCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.providers.values().map(|(name, _)| name))
            .finish()
    }
}

#[derive(Default)]
pub struct ProviderInfoCollectionBuilder {
    providers: IndexMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync>)>,
}

impl ProviderInfoCollectionBuilder {
    /// Adds a provider, replacing a previous one of the same type.
    pub fn with<T: Any + Send + Sync>(mut self, provider: T) -> Self {
        self.providers.insert(
            TypeId::of::<T>(),
            (std::any::type_name::<T>(), Arc::new(provider)),
        );
        self
    }

    pub fn build(self) -> ProviderInfoCollection {
        ProviderInfoCollection {
            providers: Arc::new(self.providers),
        }
    }
}
