//! Commands: units of background work with observable status.
//!
//! A [`Command`] wraps a task closure. Whoever runs it (usually the
//! [`CommandQueue`](super::CommandQueue) worker) drives it through its
//! states and every registered observer hears about each transition, on
//! the running thread. Observers that need the notification elsewhere go
//! through a [`CommandEventQueue`](super::CommandEventQueue).

use super::observer::{CommandObserver, ObserverId};
use super::status::CommandStatus;
use super::CommandError;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// The work performed by a command.
pub trait CommandTask: Send {
    fn execute(&mut self, ctx: &CommandContext) -> anyhow::Result<()>;
}

impl<F> CommandTask for F
where
    F: FnMut(&CommandContext) -> anyhow::Result<()> + Send,
{
    fn execute(&mut self, ctx: &CommandContext) -> anyhow::Result<()> {
        self(ctx)
    }
}

/// What a running task can see of its command.
pub struct CommandContext<'a> {
    id: u64,
    title: &'a str,
    abort: &'a AtomicBool,
}

impl CommandContext<'_> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn title(&self) -> &str {
        self.title
    }

    /// Someone called [`Command::abort`]. Long tasks should poll this.
    pub fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// `Err` once an abort was requested. Use with `?`.
    pub fn check_abort(&self) -> anyhow::Result<()> {
        if self.abort_requested() {
            anyhow::bail!("command '{}' aborted", self.title);
        }
        Ok(())
    }
}

struct CommandState {
    status: CommandStatus,
    failure: Option<String>,
    observers: Vec<(ObserverId, Arc<dyn CommandObserver>)>,
    next_observer: u64,
}

struct CommandInner {
    id: u64,
    title: String,
    abort: AtomicBool,
    state: Mutex<CommandState>,
    task: Mutex<Option<Box<dyn CommandTask>>>,
}

/// A shareable handle to one command. Clones refer to the same command.
#[derive(Clone)]
pub struct Command {
    inner: Arc<CommandInner>,
}

impl Command {
    pub fn new<F>(title: impl Into<String>, task: F) -> Self
    where
        F: FnMut(&CommandContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self::from_task(title, task)
    }

    pub fn from_task(title: impl Into<String>, task: impl CommandTask + 'static) -> Self {
        Self {
            inner: Arc::new(CommandInner {
                id: NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed),
                title: title.into(),
                abort: AtomicBool::new(false),
                state: Mutex::new(CommandState {
                    status: CommandStatus::Waiting,
                    failure: None,
                    observers: Vec::new(),
                    next_observer: 0,
                }),
                task: Mutex::new(Some(Box::new(task))),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn status(&self) -> CommandStatus {
        self.state().status
    }

    /// Error chain of a failed command.
    pub fn failure(&self) -> Option<String> {
        self.state().failure.clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn abort_requested(&self) -> bool {
        self.inner.abort.load(Ordering::SeqCst)
    }

    /// Whether two handles refer to the same command.
    pub fn same_as(&self, other: &Command) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register an observer for future transitions.
    pub fn add_observer(
        &self,
        observer: Arc<dyn CommandObserver>,
    ) -> Result<ObserverId, CommandError> {
        let mut state = self.state();
        if state.status.is_terminal() {
            return Err(CommandError::AlreadyTerminal {
                title: self.inner.title.clone(),
                status: state.status,
            });
        }
        let id = ObserverId(state.next_observer);
        state.next_observer += 1;
        state.observers.push((id, observer));
        Ok(id)
    }

    /// Unregister an observer. Returns whether it was registered.
    pub fn remove_observer(&self, id: ObserverId) -> Result<bool, CommandError> {
        let mut state = self.state();
        if state.status.is_terminal() {
            return Err(CommandError::AlreadyTerminal {
                title: self.inner.title.clone(),
                status: state.status,
            });
        }
        let before = state.observers.len();
        state.observers.retain(|(observer, _)| *observer != id);
        Ok(state.observers.len() != before)
    }

    /// Request an abort. A waiting command ends as `Aborted` right away; a
    /// running task has to notice through its context.
    pub fn abort(&self) {
        self.inner.abort.store(true, Ordering::SeqCst);
        self.transition(|status| status == CommandStatus::Waiting, CommandStatus::Aborted, None);
    }

    /// Execute the task on the calling thread and return the final status.
    ///
    /// Only a waiting command runs; otherwise the current status is returned.
    pub fn run(&self) -> CommandStatus {
        if self.abort_requested() {
            self.transition(|s| s == CommandStatus::Waiting, CommandStatus::Aborted, None);
            return self.status();
        }
        if !self.transition(|s| s == CommandStatus::Waiting, CommandStatus::Running, None) {
            return self.status();
        }

        tracing::debug!("Running command {} '{}'", self.inner.id, self.inner.title);
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        let (status, failure) = match task {
            Some(mut task) => {
                let ctx = CommandContext {
                    id: self.inner.id,
                    title: &self.inner.title,
                    abort: &self.inner.abort,
                };
                match catch_unwind(AssertUnwindSafe(|| task.execute(&ctx))) {
                    Ok(Ok(())) => (CommandStatus::Success, None),
                    Ok(Err(_)) if self.abort_requested() => (CommandStatus::Aborted, None),
                    Ok(Err(e)) => (CommandStatus::Failed, Some(format!("{:#}", e))),
                    Err(payload) => (
                        CommandStatus::Failed,
                        Some(format!("task panicked: {}", panic_message(&*payload))),
                    ),
                }
            }
            None => (
                CommandStatus::Failed,
                Some("task already consumed".to_string()),
            ),
        };

        match &failure {
            Some(message) => tracing::warn!(
                "Command {} '{}' failed: {}",
                self.inner.id,
                self.inner.title,
                message
            ),
            None => tracing::debug!(
                "Command {} '{}' finished: {}",
                self.inner.id,
                self.inner.title,
                status
            ),
        }

        self.transition(|s| s == CommandStatus::Running, status, failure);
        self.status()
    }

    fn state(&self) -> MutexGuard<'_, CommandState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move to `next` if `allowed(current)`, then notify observers outside
    /// the state lock. Returns whether the transition happened.
    fn transition(
        &self,
        allowed: impl Fn(CommandStatus) -> bool,
        next: CommandStatus,
        failure: Option<String>,
    ) -> bool {
        let observers: Vec<Arc<dyn CommandObserver>> = {
            let mut state = self.state();
            if !allowed(state.status) {
                return false;
            }
            state.status = next;
            if failure.is_some() {
                state.failure = failure;
            }
            state.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
        };

        for observer in observers {
            observer.on_status(self, next);
        }
        true
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.inner.id)
            .field("title", &self.inner.title)
            .field("status", &self.status())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
