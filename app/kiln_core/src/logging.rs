/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use kiln_error::ErrorTag;
use kiln_error::KilnErrorContext;
use tracing_subscriber::filter::Filtered;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::EnvFilter;

use crate::env::EnvHelper;

static KILN_LOG: EnvHelper<String> = EnvHelper::string("KILN_LOG");

pub trait LogConfigurationReloadHandle: Send + Sync + 'static {
    fn update_log_filter(&self, format: &str) -> kiln_error::Result<()>;
}

impl<L, R> LogConfigurationReloadHandle for Handle<Filtered<L, EnvFilter, R>, R>
where
    L: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn update_log_filter(&self, raw: &str) -> kiln_error::Result<()> {
        let filter = EnvFilter::try_new(raw)
            .map_err(|e| kiln_error::Error::from_any_with_tag(e, ErrorTag::Input))
            .kiln_error_context("Invalid log filter")?;
        self.modify(|layer| *layer.filter_mut() = filter)
            .map_err(|e| kiln_error::Error::from_any_with_tag(e, ErrorTag::Tier0))
            .kiln_error_context("Error updating log filter")?;
        tracing::debug!("Log filter was updated to: `{}`", raw);
        Ok(())
    }
}

/// Installs the global tracing subscriber. Fails if one is already installed.
pub fn init_tracing_for_writer<W>(
    writer: W,
) -> kiln_error::Result<Arc<dyn LogConfigurationReloadHandle>>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    // By default, show warnings/errors.
    let filter = match KILN_LOG.get()? {
        Some(v) => EnvFilter::try_new(v)
            .map_err(|e| kiln_error::Error::from_any_with_tag(e, ErrorTag::Input))
            .with_kiln_error_context(|| {
                format!("Failed to parse ${} as a filter", KILN_LOG.var())
            })?,
        None => EnvFilter::new("warn"),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_filter(filter);

    let (layer, handle) = reload::Layer::new(layer);

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| kiln_error::Error::from_any_with_tag(e, ErrorTag::Tier0))?;

    Ok(Arc::new(handle) as _)
}

#[cfg(test)]
mod tests {
    use crate::logging::init_tracing_for_writer;

    #[test]
    fn init_and_reload() -> kiln_error::Result<()> {
        let handle = init_tracing_for_writer(std::io::sink)?;
        handle.update_log_filter("debug")?;
        assert!(handle.update_log_filter("kiln=not_a_level").is_err());
        // Only one global subscriber per process.
        assert!(init_tracing_for_writer(std::io::sink).is_err());
        Ok(())
    }
}
