/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The error type used throughout kiln.
//!
//! Errors carry a set of [`ErrorTag`]s. The two tags that matter most are [`ErrorTag::Input`],
//! which marks a problem with what the user asked us to build, and
//! [`ErrorTag::InternalError`], which marks a violated framework invariant. Internal errors are
//! still ordinary values so that callers decide how loudly to fail; see [`internal_error!`].

mod context;
mod error;
pub mod macros;

pub use context::KilnErrorContext;
pub use error::Error;
pub use error::ErrorTag;
pub use error::TaggedError;

pub type Result<T> = std::result::Result<T, crate::Error>;

#[doc(hidden)]
pub mod __for_macro {
    pub use anyhow;
}
