/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;
use std::io;

/// Classification attached to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorTag {
    /// The build input (a rule, a declared path, an action definition) is wrong.
    Input,
    /// A framework invariant was violated. Never the user's fault.
    InternalError,
    /// Infrastructure problem that we did not classify further.
    Tier0,
    /// Failed interacting with the filesystem or OS.
    IoSystem,
    /// A command run by an action exited unsuccessfully.
    ActionCommandFailure,
}

/// Error enums implement this to choose the tag they get when converted into [`Error`].
pub trait TaggedError: std::error::Error + Send + Sync + 'static {
    fn error_tag(&self) -> ErrorTag;
}

/// Like `anyhow::Error`, this type intentionally does not implement `std::error::Error`, so that
/// it can be constructed from any `TaggedError` with `?`.
pub struct Error {
    inner: anyhow::Error,
    tags: Vec<ErrorTag>,
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        Self {
            inner: anyhow::Error::new(e),
            tags: Vec::new(),
        }
    }

    pub fn from_any_with_tag<E: std::error::Error + Send + Sync + 'static>(
        e: E,
        tag: ErrorTag,
    ) -> Self {
        Self::new(e).tag([tag])
    }

    #[doc(hidden)]
    pub fn from_anyhow(inner: anyhow::Error) -> Self {
        Self {
            inner,
            tags: Vec::new(),
        }
    }

    pub fn tag(mut self, tags: impl IntoIterator<Item = ErrorTag>) -> Self {
        for tag in tags {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self
    }

    pub fn tags(&self) -> &[ErrorTag] {
        &self.tags
    }

    pub fn has_tag(&self, tag: ErrorTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Whether this error signals a bug in kiln rather than in the build definition.
    pub fn is_internal(&self) -> bool {
        self.has_tag(ErrorTag::InternalError)
    }

    pub fn is_input(&self) -> bool {
        self.has_tag(ErrorTag::Input)
    }

    pub fn context<C>(self, context: C) -> Self
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        Self {
            inner: self.inner.context(context),
            tags: self.tags,
        }
    }

    /// Finds an error of type `T` anywhere in the context chain.
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("tags", &self.tags)
            .field("error", &self.inner)
            .finish()
    }
}

impl<E: TaggedError> From<E> for Error {
    #[cold]
    fn from(e: E) -> Self {
        let tag = e.error_tag();
        Error::new(e).tag([tag])
    }
}

impl From<io::Error> for Error {
    #[cold]
    fn from(e: io::Error) -> Self {
        Error::from_any_with_tag(e, ErrorTag::IoSystem)
    }
}

impl From<anyhow::Error> for Error {
    #[cold]
    fn from(e: anyhow::Error) -> Self {
        Error::from_anyhow(e)
    }
}
