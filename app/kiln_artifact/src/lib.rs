/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Artifacts are the files flowing through the action graph. A rule declares an output artifact
//! first and binds it to the producing action later; see [`artifact::artifact_type`].

pub mod actions;
pub mod artifact;
