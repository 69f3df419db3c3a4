/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The analysis-time half of the action graph.
//!
//! A [`RuleAnalysisContext`](analysis::context::RuleAnalysisContext) is created for each target
//! being analyzed. Rule logic declares outputs and registers actions through its
//! [`ActionRegistry`](actions::registry::ActionRegistry); once the rule returns, the context is
//! consumed into an immutable [`AnalysisResult`](analysis::context::AnalysisResult).

pub mod actions;
pub mod analysis;
pub mod events;
pub mod provider;
