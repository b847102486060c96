//! Tests for #[derive(Action)] macro

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use aisle_macros::Action;
use chrono::{DateTime, Utc};

#[derive(Action, Clone, Debug, PartialEq)]
enum ChecklistAction {
    #[command]
    AddTask {
        title: String,
    },

    #[command]
    CompleteTask,

    #[event]
    TaskAdded {
        id: String,
        title: String,
        timestamp: DateTime<Utc>,
    },

    #[event]
    TaskCompleted {
        timestamp: DateTime<Utc>,
    },

    // Untagged variants are neither commands nor events
    Noop,
}

#[test]
fn test_is_command() {
    let action = ChecklistAction::AddTask {
        title: "Book florist".to_string(),
    };
    assert!(action.is_command());
    assert!(!action.is_event());
}

#[test]
fn test_is_event() {
    let action = ChecklistAction::TaskAdded {
        id: "task-1".to_string(),
        title: "Book florist".to_string(),
        timestamp: Utc::now(),
    };
    assert!(!action.is_command());
    assert!(action.is_event());
}

#[test]
fn test_event_type() {
    let action = ChecklistAction::TaskCompleted {
        timestamp: Utc::now(),
    };
    assert_eq!(action.event_type(), "TaskCompleted.v1");
}

#[test]
fn test_command_event_type() {
    let action = ChecklistAction::AddTask {
        title: "Book florist".to_string(),
    };
    // Commands don't have event types
    assert_eq!(action.event_type(), "unknown");
}

#[test]
fn test_unit_variant_is_command() {
    assert!(ChecklistAction::CompleteTask.is_command());
}

#[test]
fn test_untagged_variant() {
    let action = ChecklistAction::Noop;
    assert!(!action.is_command());
    assert!(!action.is_event());
    assert_eq!(action.event_type(), "unknown");
}
