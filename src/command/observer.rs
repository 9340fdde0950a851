use super::status::CommandStatus;
use super::task::Command;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

/// Receives command status changes.
///
/// Called on whatever thread runs the command. Implementations must not
/// block; forward through a [`QueuedObserver`] to react on another thread.
pub trait CommandObserver: Send + Sync {
    fn on_status(&self, command: &Command, status: CommandStatus);
}

/// Handle returned by [`Command::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// A notification waiting to be delivered on the draining thread.
pub struct CommandObserverEvent {
    pub observer: Arc<dyn CommandObserver>,
    pub command: Command,
    pub status: CommandStatus,
}

impl CommandObserverEvent {
    pub fn dispatch(self) {
        self.observer.on_status(&self.command, self.status);
    }
}

/// Cross-thread mailbox for command notifications.
///
/// The owning thread (typically the UI thread) drains it at a safe point
/// with [`dispatch_pending`](Self::dispatch_pending). Delivery order is
/// the order the notifications were issued.
pub struct CommandEventQueue {
    tx: Sender<CommandObserverEvent>,
    rx: Receiver<CommandObserverEvent>,
}

impl CommandEventQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Wrap `target` so its notifications are delivered through this queue.
    pub fn observer(&self, target: Arc<dyn CommandObserver>) -> Arc<QueuedObserver> {
        Arc::new(QueuedObserver {
            target,
            tx: self.tx.clone(),
        })
    }

    /// Deliver everything queued so far. Returns the number of events.
    pub fn dispatch_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.rx.try_recv() {
            event.dispatch();
            count += 1;
        }
        count
    }

    /// Wait up to `timeout` for the first event, then drain the rest.
    pub fn dispatch_blocking(&self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => {
                event.dispatch();
                1 + self.dispatch_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for CommandEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer that defers to another observer via a [`CommandEventQueue`].
pub struct QueuedObserver {
    target: Arc<dyn CommandObserver>,
    tx: Sender<CommandObserverEvent>,
}

impl CommandObserver for QueuedObserver {
    fn on_status(&self, command: &Command, status: CommandStatus) {
        let event = CommandObserverEvent {
            observer: Arc::clone(&self.target),
            command: command.clone(),
            status,
        };
        if self.tx.send(event).is_err() {
            tracing::debug!(
                "Command event queue gone, dropping {} for '{}'",
                status,
                command.title()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    #[derive(Default)]
    struct Log {
        entries: Mutex<Vec<(String, CommandStatus, thread::ThreadId)>>,
    }

    impl CommandObserver for Log {
        fn on_status(&self, command: &Command, status: CommandStatus) {
            self.entries.lock().unwrap().push((
                command.title().to_string(),
                status,
                thread::current().id(),
            ));
        }
    }

    #[test]
    fn test_queued_delivery_happens_on_draining_thread() {
        let queue = CommandEventQueue::new();
        let log = Arc::new(Log::default());
        let command = Command::new("remote", |_| Ok(()));
        command.add_observer(queue.observer(log.clone())).unwrap();

        let runner = command.clone();
        thread::spawn(move || runner.run()).join().unwrap();

        assert!(log.entries.lock().unwrap().is_empty());
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dispatch_pending(), 2);

        let entries = log.entries.lock().unwrap();
        let statuses: Vec<_> = entries.iter().map(|(_, s, _)| *s).collect();
        assert_eq!(statuses, vec![CommandStatus::Running, CommandStatus::Success]);
        assert!(entries.iter().all(|(_, _, t)| *t == thread::current().id()));
    }

    #[test]
    fn test_dispatch_blocking_times_out() {
        let queue = CommandEventQueue::new();
        assert_eq!(queue.dispatch_blocking(Duration::from_millis(5)), 0);
        assert!(queue.is_empty());
    }
}
