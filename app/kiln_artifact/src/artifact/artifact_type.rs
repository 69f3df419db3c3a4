/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;

use allocative::Allocative;
use derive_more::From;
use dupe::Dupe;
use kiln_core::fs::paths::forward_rel_path::ForwardRelativePathBuf;
use kiln_core::fs::paths::project_rel_path::ProjectRelativePathBuf;
use kiln_core::target::BuildTarget;
use kiln_error::ErrorTag;
use kiln_error::TaggedError;

use crate::actions::key::ActionKey;
use crate::artifact::build_artifact::BuildArtifact;
use crate::artifact::build_artifact::BuildArtifactPath;
use crate::artifact::declaration::validate_output_path;
use crate::artifact::declaration::ArtifactDeclarationError;
use crate::artifact::source_artifact::SourceArtifact;

/// The operations every artifact supports, whatever its lifecycle state.
pub trait ArtifactLike {
    /// Whether the artifact has a producer (sources always do).
    fn is_bound(&self) -> bool;

    fn is_source(&self) -> bool;

    fn as_source(&self) -> Option<SourceArtifact>;

    /// Fails unless the artifact is a bound build artifact.
    fn as_build_artifact(&self) -> kiln_error::Result<BuildArtifact>;

    fn short_path(&self) -> ForwardRelativePathBuf;

    fn basename(&self) -> String {
        self.short_path().file_name().unwrap_or_default().to_owned()
    }

    fn extension(&self) -> Option<String> {
        self.short_path().extension().map(str::to_owned)
    }
}

/// An immutable artifact: either a source file or a bound build output. This is what
/// registered actions hold and what can cross threads.
#[derive(Clone, Debug, Dupe, PartialEq, Eq, Hash, From, Allocative)]
pub enum Artifact {
    Source(SourceArtifact),
    Build(BuildArtifact),
}

impl Artifact {
    /// The target whose action produces this artifact, if any.
    pub fn owner(&self) -> Option<&BuildTarget> {
        match self {
            Artifact::Source(_) => None,
            Artifact::Build(b) => Some(b.owner()),
        }
    }

    /// The action that produces this artifact, if any.
    pub fn action_key(&self) -> Option<&ActionKey> {
        match self {
            Artifact::Source(_) => None,
            Artifact::Build(b) => Some(b.key()),
        }
    }

    /// The project-relative location of the artifact's content.
    pub fn resolved_path(&self) -> &ProjectRelativePathBuf {
        match self {
            Artifact::Source(s) => s.get_path(),
            Artifact::Build(b) => b.get_source_path(),
        }
    }
}

impl ArtifactLike for Artifact {
    fn is_bound(&self) -> bool {
        true
    }

    fn is_source(&self) -> bool {
        matches!(self, Artifact::Source(_))
    }

    fn as_source(&self) -> Option<SourceArtifact> {
        match self {
            Artifact::Source(s) => Some(s.dupe()),
            Artifact::Build(_) => None,
        }
    }

    fn as_build_artifact(&self) -> kiln_error::Result<BuildArtifact> {
        match self {
            Artifact::Source(s) => Err(ArtifactErrors::NotABuildArtifact(s.dupe()).into()),
            Artifact::Build(b) => Ok(b.dupe()),
        }
    }

    fn short_path(&self) -> ForwardRelativePathBuf {
        match self {
            Artifact::Source(s) => s.get_path().as_forward_relative_path().clone(),
            Artifact::Build(b) => b.get_path().short_path(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Source(_) => write!(f, "<source file '{}'>", self.short_path()),
            Artifact::Build(_) => write!(f, "<generated file '{}'>", self.short_path()),
        }
    }
}

/// An artifact that is "declared" by a rule implementation, which will be an artifact that can be
/// made available by running some action created by that rule implementation.
///
/// This type should only exist within the analysis of the declaring rule. It starts unbound and
/// is bound exactly once, by [`DeclaredArtifact::materialize`], when the producing action is
/// registered. Bound-only accessors fail with an internal error before that.
#[derive(Clone, Debug, Dupe)]
pub struct DeclaredArtifact {
    /// `Rc` here is not optimization: `DeclaredArtifactKind` is a shared mutable state.
    artifact: Rc<RefCell<DeclaredArtifactKind>>,
}

#[derive(Debug)]
enum DeclaredArtifactKind {
    Unbound(UnboundArtifact),
    Bound(BuildArtifact),
}

#[derive(Clone, Dupe, Debug)]
pub struct UnboundArtifact(BuildArtifactPath);

impl fmt::Display for UnboundArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl DeclaredArtifact {
    /// Declares `path` as an output of `owner`, to be located at
    /// `gen_root/package_base_path/path`. Fails before creating anything if `path` is invalid.
    pub fn declare(
        owner: BuildTarget,
        gen_root: ProjectRelativePathBuf,
        package_base_path: ForwardRelativePathBuf,
        path: &str,
    ) -> Result<DeclaredArtifact, ArtifactDeclarationError> {
        let path = validate_output_path(&owner, path)?;
        Ok(Self::new(BuildArtifactPath::new(
            owner,
            gen_root,
            package_base_path,
            path,
        )))
    }

    fn new(path: BuildArtifactPath) -> DeclaredArtifact {
        DeclaredArtifact {
            artifact: Rc::new(RefCell::new(DeclaredArtifactKind::Unbound(UnboundArtifact(
                path,
            )))),
        }
    }

    pub fn get_path(&self) -> BuildArtifactPath {
        match &*self.artifact.borrow() {
            DeclaredArtifactKind::Unbound(u) => u.0.dupe(),
            DeclaredArtifactKind::Bound(b) => b.get_path().dupe(),
        }
    }

    pub fn owner(&self) -> BuildTarget {
        self.get_path().owner().dupe()
    }

    /// Binds the artifact to the action identified by `key`.
    ///
    /// Fails if the artifact is already bound, even to the same key. On failure the artifact is
    /// left exactly as it was.
    pub fn materialize(&self, key: ActionKey) -> kiln_error::Result<BuildArtifact> {
        let mut state = self.artifact.borrow_mut();
        let unbound = match &*state {
            DeclaredArtifactKind::Bound(existing) => {
                return Err(ArtifactErrors::DuplicateBind(existing.dupe(), key).into());
            }
            DeclaredArtifactKind::Unbound(unbound) => unbound.dupe(),
        };
        let built = BuildArtifact::new(unbound.0, key)?;
        tracing::debug!("Bound {}", built);
        *state = DeclaredArtifactKind::Bound(built.dupe());
        Ok(built)
    }

    pub fn get_action_data_key(&self) -> kiln_error::Result<ActionKey> {
        Ok(self.as_build_artifact()?.key().dupe())
    }

    /// The resolved location of the output. Requires the artifact to be bound.
    pub fn get_source_path(&self) -> kiln_error::Result<ProjectRelativePathBuf> {
        Ok(self.as_build_artifact()?.get_source_path().clone())
    }

    /// Like [`ArtifactLike::as_build_artifact`], but an unbound artifact is the rule's fault:
    /// used once analysis is over and every declared output must have a producer.
    pub fn ensure_bound(&self) -> kiln_error::Result<BuildArtifact> {
        match &*self.artifact.borrow() {
            DeclaredArtifactKind::Bound(b) => Ok(b.dupe()),
            DeclaredArtifactKind::Unbound(u) => {
                Err(ArtifactErrors::UnboundArtifact(u.dupe()).into())
            }
        }
    }
}

impl ArtifactLike for DeclaredArtifact {
    fn is_bound(&self) -> bool {
        matches!(&*self.artifact.borrow(), DeclaredArtifactKind::Bound(_))
    }

    fn is_source(&self) -> bool {
        false
    }

    fn as_source(&self) -> Option<SourceArtifact> {
        None
    }

    fn as_build_artifact(&self) -> kiln_error::Result<BuildArtifact> {
        match &*self.artifact.borrow() {
            DeclaredArtifactKind::Bound(b) => Ok(b.dupe()),
            DeclaredArtifactKind::Unbound(u) => Err(ArtifactErrors::NotBound(u.dupe()).into()),
        }
    }

    fn short_path(&self) -> ForwardRelativePathBuf {
        self.get_path().short_path()
    }
}

impl fmt::Display for DeclaredArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<generated file '{}'>", self.short_path())
    }
}

impl Hash for DeclaredArtifact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get_path().hash(state)
    }
}

impl PartialEq for DeclaredArtifact {
    fn eq(&self, other: &Self) -> bool {
        self.get_path() == other.get_path()
    }
}

impl Eq for DeclaredArtifact {}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactErrors {
    #[error(
        "Attempted to bind an artifact which was already bound\n  Artifact: {0}\n  Attempted to bind to an action: {1}"
    )]
    DuplicateBind(BuildArtifact, ActionKey),
    #[error("Artifact `{0}` is not bound to an action yet")]
    NotBound(UnboundArtifact),
    #[error("Source artifact `{0}` is not a build artifact")]
    NotABuildArtifact(SourceArtifact),
    #[error(
        "Artifact must be bound by now. Every declared output must be an output of exactly one action.\n  Artifact: {0}"
    )]
    UnboundArtifact(UnboundArtifact),
}

impl TaggedError for ArtifactErrors {
    fn error_tag(&self) -> ErrorTag {
        match self {
            ArtifactErrors::UnboundArtifact(_) => ErrorTag::Input,
            ArtifactErrors::DuplicateBind(..)
            | ArtifactErrors::NotBound(_)
            | ArtifactErrors::NotABuildArtifact(_) => ErrorTag::InternalError,
        }
    }
}

pub mod testing {
    use dupe::Dupe;
    use kiln_core::fs::out_path::OutPathResolver;
    use kiln_core::fs::paths::forward_rel_path::ForwardRelativePathBuf;
    use kiln_core::target::BuildTarget;

    use crate::actions::key::ActionIndex;
    use crate::actions::key::ActionKey;
    use crate::artifact::build_artifact::BuildArtifact;
    use crate::artifact::build_artifact::BuildArtifactPath;

    pub trait BuildArtifactTestingExt {
        fn testing_new(target: BuildTarget, path: &str, id: ActionIndex) -> BuildArtifact;
    }

    impl BuildArtifactTestingExt for BuildArtifact {
        fn testing_new(target: BuildTarget, path: &str, id: ActionIndex) -> BuildArtifact {
            BuildArtifact::new(
                BuildArtifactPath::new(
                    target.dupe(),
                    OutPathResolver::default().gen_root().clone(),
                    target.base_path(),
                    ForwardRelativePathBuf::new(path).unwrap(),
                ),
                ActionKey::new(target, id),
            )
            .unwrap()
        }
    }
}
