/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt::Arguments;

use crate::ErrorTag;

#[doc(hidden)]
#[cold]
#[track_caller]
pub fn internal_error_impl(args: Arguments) -> crate::Error {
    let anyhow_error = anyhow::anyhow!("{} (internal error)", args);
    crate::Error::from_anyhow(anyhow_error).tag([ErrorTag::InternalError])
}

#[doc(hidden)]
#[cold]
pub fn kiln_error_impl(tag: ErrorTag, args: Arguments) -> crate::Error {
    crate::Error::from_anyhow(anyhow::anyhow!("{}", args)).tag([tag])
}

/// Indicates a bug in kiln.
#[macro_export]
macro_rules! internal_error {
    ($format:expr) => {
        $crate::internal_error!($format,)
    };
    ($format:expr , $($arg:tt)*) => {
        $crate::macros::internal_error_impl(format_args!($format, $($arg)*))
    };
}

/// Creates an ad-hoc error with the given tag.
#[macro_export]
macro_rules! kiln_error {
    ($tag:expr, $format:expr) => {
        $crate::kiln_error!($tag, $format,)
    };
    ($tag:expr, $format:expr , $($arg:tt)*) => {
        $crate::macros::kiln_error_impl($tag, format_args!($format, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use crate::ErrorTag;

    #[test]
    fn internal_error_is_tagged() {
        let e = internal_error!("action of key {} already registered", "(//foo:bar, 0)");
        assert!(e.is_internal());
        assert_eq!(
            "action of key (//foo:bar, 0) already registered (internal error)",
            e.to_string()
        );
    }

    #[test]
    fn kiln_error_macro() {
        let e = kiln_error!(ErrorTag::Tier0, "no value");
        assert!(e.has_tag(ErrorTag::Tier0));
        assert_eq!("no value", e.to_string());
    }
}
