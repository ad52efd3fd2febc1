//! Application state machine
//!
//! ```text
//! Created ─► Initializing ─► Initialized ─► Starting ─► Running
//!                 │               │             │           │
//!                 ▼               │             ▼           │
//!               Failed ◄──────────┼──────── (failure) ◄─────┤
//!                 │               ▼                         │
//!                 └──────────► Stopping ◄───────────────────┘
//!                                 │
//!                                 ▼
//!                              Stopped
//! ```
//!
//! `Stopped` and `Failed` return to `Created` only through an explicit reset.

use serde::Serialize;
use strum_macros::{Display, EnumIter};

/// Lifecycle state of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AppState {
    Created,
    Initializing,
    Initialized,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl AppState {
    /// Whether `self -> next` is an edge of the lifecycle graph.
    ///
    /// `Initialized -> Stopping` exists so that an application that was
    /// initialized but never started can still be shut down, and the two
    /// edges back to `Created` are only taken by an explicit reset.
    pub fn can_transition_to(self, next: AppState) -> bool {
        use AppState::*;
        matches!(
            (self, next),
            (Created, Initializing)
                | (Initializing, Initialized)
                | (Initializing, Failed)
                | (Initialized, Starting)
                | (Initialized, Stopping)
                | (Starting, Running)
                | (Starting, Failed)
                | (Running, Stopping)
                | (Running, Failed)
                | (Failed, Stopping)
                | (Stopping, Stopped)
                | (Stopped, Created)
                | (Failed, Created)
        )
    }

    /// Stopped and Failed end a lifecycle until the application is reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, AppState::Stopped | AppState::Failed)
    }

    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        use AppState::*;
        match value {
            0 => Created,
            1 => Initializing,
            2 => Initialized,
            3 => Starting,
            4 => Running,
            5 => Stopping,
            6 => Stopped,
            _ => Failed,
        }
    }
}

/// A pass of one lifecycle operation over every registered component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum Phase {
    Initialize,
    Start,
    Stop,
}
