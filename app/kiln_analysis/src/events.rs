/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Mutex;

use crossbeam_channel::Sender;
use kiln_artifact::actions::key::ActionKey;
use kiln_core::fs::paths::forward_rel_path::ForwardRelativePathBuf;
use kiln_core::target::BuildTarget;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisEvent {
    ArtifactDeclared {
        target: BuildTarget,
        path: ForwardRelativePathBuf,
    },
    ActionRegistered {
        key: ActionKey,
        category: &'static str,
    },
    ActionExecutionStarted {
        key: ActionKey,
        category: &'static str,
    },
    ActionExecutionFinished {
        key: ActionKey,
        success: bool,
    },
}

/// Where analysis and execution report what they do.
pub trait EventSink: Send + Sync {
    fn send(&self, event: AnalysisEvent);
}

pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: AnalysisEvent) {}
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<AnalysisEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<AnalysisEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventSink for CollectingEventSink {
    fn send(&self, event: AnalysisEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Forwards events to a channel. Events sent after the receiver is gone are dropped.
pub struct ChannelEventSink {
    sender: Sender<AnalysisEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: Sender<AnalysisEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: AnalysisEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Event receiver disconnected, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use kiln_core::fs::paths::forward_rel_path::ForwardRelativePathBuf;
    use kiln_core::target::BuildTarget;

    use crate::events::AnalysisEvent;
    use crate::events::ChannelEventSink;
    use crate::events::CollectingEventSink;
    use crate::events::EventSink;

    fn event() -> AnalysisEvent {
        AnalysisEvent::ArtifactDeclared {
            target: BuildTarget::testing_parse("//foo:bar"),
            path: ForwardRelativePathBuf::unchecked_new("out".to_owned()),
        }
    }

    #[test]
    fn collecting_sink() {
        let sink = CollectingEventSink::new();
        sink.send(event());
        assert_eq!(vec![event()], sink.take());
        assert!(sink.take().is_empty());
    }

    #[test]
    fn channel_sink() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = ChannelEventSink::new(tx);
        sink.send(event());
        assert_eq!(event(), rx.recv().unwrap());
        drop(rx);
        // Must not panic.
        sink.send(event());
    }
}
