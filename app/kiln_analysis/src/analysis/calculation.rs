/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Runs a rule's analysis function against a fresh context.

use std::sync::Arc;

use dupe::Dupe;
use indexmap::IndexMap;
use kiln_core::fs::out_path::OutPathResolver;
use kiln_core::target::BuildTarget;
use kiln_error::KilnErrorContext;

use crate::analysis::context::AnalysisResult;
use crate::analysis::context::RuleAnalysisContext;
use crate::events::EventSink;
use crate::provider::ProviderInfoCollection;
use crate::provider::RuleAnalysisKey;

/// Analyzes `target` with `rule`, returning the actions it registered.
///
/// Each call owns its context, so independent targets may be analyzed on different threads.
pub fn analyze_rule<F>(
    target: BuildTarget,
    deps: IndexMap<RuleAnalysisKey, ProviderInfoCollection>,
    out_path: &OutPathResolver,
    events: Arc<dyn EventSink>,
    rule: F,
) -> kiln_error::Result<AnalysisResult>
where
    F: FnOnce(&mut RuleAnalysisContext) -> kiln_error::Result<()>,
{
    let span = tracing::debug_span!("analysis", target = %target);
    let _guard = span.enter();

    let mut ctx = RuleAnalysisContext::new(target.dupe(), deps, out_path, events);
    let res = rule(&mut ctx)
        .and_then(|()| ctx.finish())
        .with_kiln_error_context(|| format!("Error analyzing `{}`", target));
    match &res {
        Ok(result) => tracing::debug!(
            "Analysis of `{}` registered {} actions",
            target,
            result.get_registered_action_data().len()
        ),
        Err(e) if e.is_internal() => tracing::error!("{:#}", e),
        Err(e) => tracing::debug!("{:#}", e),
    }
    res
}
