//! Background worker executing commands one at a time, in submission order.

use super::task::Command;
use super::CommandError;
use crate::config::CommandSettings;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

struct QueueShared {
    stopping: AtomicBool,
    current: Mutex<Option<Command>>,
}

/// Runs submitted commands on a dedicated `command-queue` thread.
///
/// The queue is single-use: once stopped it rejects further submissions.
pub struct CommandQueue {
    tx: Mutex<Option<Sender<Command>>>,
    rx: Receiver<Command>,
    shared: Arc<QueueShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CommandQueue {
    pub fn new(settings: &CommandSettings) -> Self {
        let (tx, rx) = bounded(settings.queue_capacity.max(1));
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
            shared: Arc::new(QueueShared {
                stopping: AtomicBool::new(false),
                current: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Enqueue a command. Blocks while the queue is full.
    pub fn submit(&self, command: Command) -> Result<(), CommandError> {
        let tx = lock(&self.tx).clone().ok_or(CommandError::QueueStopped)?;
        tracing::debug!("Queued command {} '{}'", command.id(), command.title());
        tx.send(command).map_err(|_| CommandError::QueueStopped)
    }

    /// Number of commands waiting to run.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.worker).is_some()
    }

    pub fn start(&self) -> Result<(), CommandError> {
        let mut worker = lock(&self.worker);
        if worker.is_some() {
            tracing::warn!("Command queue already running");
            return Ok(());
        }
        if self.shared.stopping.load(Ordering::SeqCst) {
            return Err(CommandError::QueueStopped);
        }

        let rx = self.rx.clone();
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("command-queue".to_string())
            .spawn(move || worker_loop(rx, shared))
            .map_err(|e| CommandError::Spawn(e.to_string()))?;
        *worker = Some(handle);
        tracing::info!("Command queue started");
        Ok(())
    }

    /// Abort the running command and every pending one, then join the worker.
    pub fn stop(&self) {
        {
            // Same lock the worker holds while claiming a command.
            let current = lock(&self.shared.current);
            if self.shared.stopping.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(current) = current.as_ref() {
                current.abort();
            }
        }
        // Dropping the sender lets the worker drain and exit.
        lock(&self.tx).take();

        match lock(&self.worker).take() {
            Some(handle) => {
                if handle.join().is_err() {
                    tracing::error!("Command queue worker panicked");
                }
            }
            None => {
                // Never started: nobody else will drain the channel.
                while let Ok(command) = self.rx.try_recv() {
                    command.abort();
                }
            }
        }
        tracing::info!("Command queue stopped");
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(rx: Receiver<Command>, shared: Arc<QueueShared>) {
    while let Ok(command) = rx.recv() {
        let claimed = {
            let mut current = lock(&shared.current);
            let claimed = !shared.stopping.load(Ordering::SeqCst);
            if claimed {
                *current = Some(command.clone());
            }
            claimed
        };
        if !claimed {
            tracing::debug!("Aborting pending command '{}'", command.title());
            command.abort();
            continue;
        }

        let status = command.run();
        *lock(&shared.current) = None;
        tracing::trace!("Command '{}' ended as {}", command.title(), status);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
