//! Settings sections of [`AppConfig`](super::AppConfig)
//!
//! Every field has a serde default so partial files (and files written by
//! older versions) load cleanly.
//!
//! # Main Types
//!
//! - [`NetworkSettings`] - Scheduler idle interval and status channel size
//! - [`CommandSettings`] - Background command queue
//! - [`LoggingSettings`] - Log filter and optional log file
//! - [`FrameSettings`] - Frame pacing of the headless driver

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Processing network scheduler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Upper bound on how long the idle scheduler sleeps between checks
    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,

    /// Capacity of the status event channel; events beyond it are dropped
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Start the scheduler thread as soon as the network is built
    #[serde(default = "default_true")]
    pub start_on_launch: bool,
}

fn default_idle_wait_ms() -> u64 {
    100
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            idle_wait_ms: default_idle_wait_ms(),
            event_channel_capacity: default_event_channel_capacity(),
            start_on_launch: true,
        }
    }
}

impl NetworkSettings {
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }
}

/// Background command queue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSettings {
    /// Commands that can wait before `submit` blocks
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives, used when `RUST_LOG` is not set
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Also write logs to a file in the app data directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Log file name inside the app data directory
    #[serde(default = "default_log_file")]
    pub file_name: String,
}

fn default_filter() -> String {
    "info,dirvis_rs=debug".to_string()
}

fn default_log_file() -> String {
    "dirvis.log".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            log_to_file: false,
            file_name: default_log_file(),
        }
    }
}

/// Frame loop settings for the headless driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSettings {
    /// Target time between two frames
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Frames to render before shutting down
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_frame_count() -> u32 {
    120
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            frame_count: default_frame_count(),
        }
    }
}

impl FrameSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
