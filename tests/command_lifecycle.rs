//! Integration tests for commands running on the background queue
//!
//! Notifications are observed through a `CommandEventQueue` the way a UI
//! thread would: issued on the worker, delivered when the test drains.

mod common;

use common::{test_timeout, wait_for};
use dirvis_rs::command::{
    Command, CommandError, CommandEventQueue, CommandObserver, CommandQueue, CommandStatus,
};
use dirvis_rs::config::CommandSettings;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Collects `(title, status, thread)` for every notification.
#[derive(Default)]
struct Transcript {
    entries: Mutex<Vec<(String, CommandStatus, thread::ThreadId)>>,
}

impl Transcript {
    fn statuses_of(&self, title: &str) -> Vec<CommandStatus> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _, _)| t == title)
            .map(|(_, s, _)| *s)
            .collect()
    }
}

impl CommandObserver for Transcript {
    fn on_status(&self, command: &Command, status: CommandStatus) {
        self.entries.lock().unwrap().push((
            command.title().to_string(),
            status,
            thread::current().id(),
        ));
    }
}

fn queue() -> CommandQueue {
    CommandQueue::new(&CommandSettings { queue_capacity: 16 })
}

#[test]
fn test_each_command_reports_running_then_one_terminal_state() {
    let queue = queue();
    let events = CommandEventQueue::new();
    let transcript = Arc::new(Transcript::default());

    let commands = vec![
        Command::new("ok", |_| Ok(())),
        Command::new("fails", |_| anyhow::bail!("no such file")),
        Command::new("panics", |_| panic!("bug")),
    ];
    for command in &commands {
        command
            .add_observer(events.observer(transcript.clone()))
            .unwrap();
        queue.submit(command.clone()).unwrap();
    }
    queue.start().unwrap();

    assert!(wait_for(test_timeout(), || commands
        .iter()
        .all(|c| c.is_terminal())));
    queue.stop();

    // Nothing reached the observer before the queue was drained.
    assert!(transcript.entries.lock().unwrap().is_empty());
    assert_eq!(events.dispatch_pending(), 6);

    assert_eq!(
        transcript.statuses_of("ok"),
        vec![CommandStatus::Running, CommandStatus::Success]
    );
    assert_eq!(
        transcript.statuses_of("fails"),
        vec![CommandStatus::Running, CommandStatus::Failed]
    );
    assert_eq!(
        transcript.statuses_of("panics"),
        vec![CommandStatus::Running, CommandStatus::Failed]
    );
    assert_eq!(commands[1].failure().unwrap(), "no such file");

    let here = thread::current().id();
    assert!(transcript
        .entries
        .lock()
        .unwrap()
        .iter()
        .all(|(_, _, t)| *t == here));
}

#[test]
fn test_direct_observers_run_on_worker_thread() {
    let queue = queue();
    let transcript = Arc::new(Transcript::default());
    let command = Command::new("direct", |_| Ok(()));
    command.add_observer(transcript.clone()).unwrap();

    queue.submit(command.clone()).unwrap();
    queue.start().unwrap();
    assert!(wait_for(test_timeout(), || command.is_terminal()));
    queue.stop();

    let entries = transcript.entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|(_, _, t)| *t != thread::current().id()));
}

#[test]
fn test_observer_registration_after_completion_fails() {
    let command = Command::new("quick", |_| Ok(()));
    command.run();
    let err = command
        .add_observer(Arc::new(Transcript::default()))
        .unwrap_err();
    assert_eq!(
        err,
        CommandError::AlreadyTerminal {
            title: "quick".to_string(),
            status: CommandStatus::Success
        }
    );
}

#[test]
fn test_stop_aborts_running_and_pending_commands() {
    let queue = queue();
    let (started_tx, started_rx) = crossbeam_channel::bounded(1);
    let running = Command::new("long", move |ctx| {
        let _ = started_tx.send(());
        while !ctx.abort_requested() {
            thread::sleep(Duration::from_millis(1));
        }
        ctx.check_abort()
    });
    let pending = Command::new("pending", |_| Ok(()));

    queue.submit(running.clone()).unwrap();
    queue.submit(pending.clone()).unwrap();
    queue.start().unwrap();
    started_rx.recv_timeout(test_timeout()).unwrap();

    queue.stop();
    assert_eq!(running.status(), CommandStatus::Aborted);
    assert_eq!(pending.status(), CommandStatus::Aborted);
    assert_eq!(
        queue.submit(Command::new("late", |_| Ok(()))),
        Err(CommandError::QueueStopped)
    );
}
