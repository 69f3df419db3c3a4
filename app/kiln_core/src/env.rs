/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Environment-variable overrides, read once per process.

use std::env;
use std::env::VarError;
use std::sync::OnceLock;

use kiln_error::ErrorTag;
use kiln_error::KilnErrorContext;

pub struct EnvHelper<T: 'static> {
    convert: fn(&str) -> kiln_error::Result<T>,
    var: &'static str,
    cell: OnceLock<Option<T>>,
}

fn convert_string(v: &str) -> kiln_error::Result<String> {
    Ok(v.to_owned())
}

impl EnvHelper<String> {
    pub const fn string(var: &'static str) -> Self {
        Self::with_converter(var, convert_string)
    }
}

impl<T: Send + Sync + 'static> EnvHelper<T> {
    pub const fn with_converter(
        var: &'static str,
        convert: fn(&str) -> kiln_error::Result<T>,
    ) -> Self {
        Self {
            convert,
            var,
            cell: OnceLock::new(),
        }
    }

    pub fn var(&self) -> &'static str {
        self.var
    }

    // `EnvHelper` caches the computed value, so it only makes sense in a static.
    pub fn get(&'static self) -> kiln_error::Result<Option<&'static T>> {
        if let Some(v) = self.cell.get() {
            return Ok(v.as_ref());
        }
        let value = self
            .compute()
            .with_kiln_error_context(|| format!("Invalid value for ${}", self.var))?;
        // A racing thread may have won; either value came from the same variable.
        let _ = self.cell.set(value);
        Ok(self.cell.get().and_then(Option::as_ref))
    }

    fn compute(&self) -> kiln_error::Result<Option<T>> {
        match env::var(self.var) {
            Ok(v) => {
                tracing::info!("Env override found: ${} = {}", self.var, v);
                Ok(Some((self.convert)(&v)?))
            }
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(..)) => Err(kiln_error::kiln_error!(
                ErrorTag::Tier0,
                "Variable is not unicode"
            )),
        }
    }
}
