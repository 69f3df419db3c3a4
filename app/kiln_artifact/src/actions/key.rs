/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use allocative::Allocative;
use dupe::Dupe;
use kiln_core::target::BuildTarget;

/// A key to look up an action registered during the analysis of `owner`.
#[derive(
    Debug,
    Eq,
    PartialEq,
    Hash,
    Clone,
    Dupe,
    PartialOrd,
    Ord,
    derive_more::Display,
    Allocative
)]
#[display("(target: `{owner}`, id: `{id}`)")]
pub struct ActionKey {
    owner: BuildTarget,
    id: ActionIndex,
}

/// An identifier for an action, unique among the actions with the same owner.
#[derive(
    Debug,
    Eq,
    PartialEq,
    Hash,
    Clone,
    Dupe,
    Copy,
    PartialOrd,
    Ord,
    derive_more::Display,
    Allocative
)]
pub struct ActionIndex(u32);

impl ActionIndex {
    pub fn new(v: u32) -> ActionIndex {
        Self(v)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl ActionKey {
    pub fn new(owner: BuildTarget, id: ActionIndex) -> ActionKey {
        ActionKey { owner, id }
    }

    pub fn owner(&self) -> &BuildTarget {
        &self.owner
    }

    pub fn action_index(&self) -> ActionIndex {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use dupe::Dupe;
    use kiln_core::target::BuildTarget;

    use crate::actions::key::ActionIndex;
    use crate::actions::key::ActionKey;

    #[test]
    fn display_and_identity() {
        let target = BuildTarget::testing_parse("//foo:bar");
        let key = ActionKey::new(target.dupe(), ActionIndex::new(3));
        assert_eq!("(target: `//foo:bar`, id: `3`)", key.to_string());
        assert_eq!(key, ActionKey::new(target.dupe(), ActionIndex::new(3)));
        assert_ne!(key, ActionKey::new(target, ActionIndex::new(4)));
        assert_ne!(
            key,
            ActionKey::new(BuildTarget::testing_parse("//foo:baz"), ActionIndex::new(3))
        );
    }
}
