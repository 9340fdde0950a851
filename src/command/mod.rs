//! Background commands with observable status.
//!
//! Long-running work such as loading a dataset is wrapped in a [`Command`]
//! and handed to the [`CommandQueue`]. Interested parties register a
//! [`CommandObserver`]; UI code wraps its observer with a
//! [`CommandEventQueue`] so notifications arrive on its own thread.

mod observer;
mod queue;
mod status;
mod task;

pub use observer::{
    CommandEventQueue, CommandObserver, CommandObserverEvent, ObserverId, QueuedObserver,
};
pub use queue::CommandQueue;
pub use status::CommandStatus;
pub use task::{Command, CommandContext, CommandTask};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command '{title}' already finished ({status})")]
    AlreadyTerminal {
        title: String,
        status: CommandStatus,
    },

    #[error("Command queue is stopped")]
    QueueStopped,

    #[error("Failed to spawn command worker: {0}")]
    Spawn(String),
}
