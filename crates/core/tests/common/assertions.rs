//! Custom assertion helpers for workflow tests.

#![allow(dead_code)]

use sk_protocol::{Event, Scene, WorkflowStep};
use std::sync::Arc;

/// Assert that busy went up and came back down, ending idle.
pub fn assert_busy_cycle(events: &[Event]) {
    let busy: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            Event::BusyChanged { busy } => Some(*busy),
            _ => None,
        })
        .collect();

    assert!(!busy.is_empty(), "Expected BusyChanged events, got: {events:?}");
    assert_eq!(busy.first(), Some(&true), "Busy should rise first");
    assert_eq!(busy.last(), Some(&false), "Busy should end cleared");
    assert!(
        busy.windows(2).all(|w| w[0] != w[1]),
        "Busy transitions should alternate: {busy:?}"
    );
}

pub fn has_error_raised(events: &[Event]) -> bool {
    events.iter().any(|e| matches!(e, Event::ErrorRaised { .. }))
}

/// Last step announced by a StepChanged event.
pub fn last_step(events: &[Event]) -> Option<WorkflowStep> {
    events.iter().rev().find_map(|e| match e {
        Event::StepChanged { step } => Some(*step),
        _ => None,
    })
}

/// Concatenate every StreamChunk payload.
pub fn streamed_text(events: &[Event]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            Event::StreamChunk { chunk, .. } => Some(chunk.as_str()),
            _ => None,
        })
        .collect()
}

pub fn count_matching(events: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|e| predicate(e)).count()
}

/// Assert that every scene except `changed` kept its allocation.
pub fn assert_only_changed(before: &[Arc<Scene>], after: &[Arc<Scene>], changed: u32) {
    assert_eq!(before.len(), after.len(), "Scene count should not change");
    for (old, new) in before.iter().zip(after) {
        if old.scene_number == changed {
            assert!(
                !Arc::ptr_eq(old, new),
                "Scene {changed} should have been replaced"
            );
        } else {
            assert!(
                Arc::ptr_eq(old, new),
                "Scene {} should keep its reference",
                old.scene_number
            );
        }
    }
}
