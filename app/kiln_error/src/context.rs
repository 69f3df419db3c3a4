/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt::Display;

use crate::Error;
use crate::ErrorTag;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct NoneError(String);

/// Adds context to a `Result` or `Option`, producing a `kiln_error::Result`.
pub trait KilnErrorContext<T>: Sized {
    fn kiln_error_context<C>(self, context: C) -> crate::Result<T>
    where
        C: Display + Send + Sync + 'static;

    fn with_kiln_error_context<C, F>(self, f: F) -> crate::Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> KilnErrorContext<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn kiln_error_context<C>(self, context: C) -> crate::Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| e.into().context(context))
    }

    fn with_kiln_error_context<C, F>(self, f: F) -> crate::Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().context(f()))
    }
}

impl<T> KilnErrorContext<T> for Option<T> {
    fn kiln_error_context<C>(self, context: C) -> crate::Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::from_any_with_tag(NoneError(context.to_string()), ErrorTag::Tier0))
    }

    fn with_kiln_error_context<C, F>(self, f: F) -> crate::Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::from_any_with_tag(NoneError(f().to_string()), ErrorTag::Tier0))
    }
}
