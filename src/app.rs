//! Application context
//!
//! Owns the processing network and the command queue and hands out shared
//! references to whoever needs them (display surface, loaders). There is no
//! global instance; create one [`Application`] at startup.

use crate::algorithms::{DataInject, Injector, RenderLines, RenderTriangles, TriangleNormals};
use crate::command::{
    Command, CommandEventQueue, CommandObserver, CommandQueue, CommandStatus,
};
use crate::config::AppConfig;
use crate::error::{Result, ResultExt};
use crate::network::{shared, AlgorithmId, NetworkEvent, NetworkResult, ProcessingNetwork};
use crate::types::{demo, LineDataSet, TriangleDataSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Ids of the demo graph's algorithms.
#[derive(Debug, Clone, Copy)]
pub struct DemoNetwork {
    pub surface_source: AlgorithmId,
    pub normals: AlgorithmId,
    pub render_triangles: AlgorithmId,
    pub lines_source: AlgorithmId,
    pub render_lines: AlgorithmId,
}

/// Logs command transitions on the frame thread.
#[derive(Default)]
struct CommandLog {
    finished: Mutex<Vec<(String, CommandStatus)>>,
}

impl CommandObserver for CommandLog {
    fn on_status(&self, command: &Command, status: CommandStatus) {
        match status {
            CommandStatus::Failed => tracing::error!(
                "Command '{}' failed: {}",
                command.title(),
                command.failure().unwrap_or_default()
            ),
            _ => tracing::info!("Command '{}' {}", command.title(), status),
        }
        if status.is_terminal() {
            if let Ok(mut finished) = self.finished.lock() {
                finished.push((command.title().to_string(), status));
            }
        }
    }
}

/// Summary of a headless frame run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub frames: u32,
    pub visualizations: usize,
    pub network_events: usize,
}

pub struct Application {
    config: AppConfig,
    network: Arc<ProcessingNetwork>,
    commands: CommandQueue,
    command_events: CommandEventQueue,
    command_log: Arc<CommandLog>,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self {
            network: Arc::new(ProcessingNetwork::new(&config.network)),
            commands: CommandQueue::new(&config.commands),
            command_events: CommandEventQueue::new(),
            command_log: Arc::new(CommandLog::default()),
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn network(&self) -> &Arc<ProcessingNetwork> {
        &self.network
    }

    /// Start the command worker and, if configured, the network scheduler.
    pub fn start(&self) -> Result<()> {
        self.commands.start().context("Starting command queue")?;
        if self.config.network.start_on_launch {
            self.network.start().context("Starting processing network")?;
        }
        Ok(())
    }

    /// Build the demo graph:
    /// surface inject -> normals -> triangle renderer, lines inject -> line renderer.
    pub fn build_demo_network(&self) -> Result<(DemoNetwork, Injector, Injector)> {
        let surface = DataInject::of::<TriangleDataSet>();
        let surface_injector = surface.injector();
        let lines = DataInject::of::<LineDataSet>();
        let lines_injector = lines.injector();

        let ids = wire_demo(&self.network, surface, lines).context("Building demo network")?;

        Ok((ids, surface_injector, lines_injector))
    }

    /// Generate the demo datasets on the command worker and inject them.
    pub fn load_demo_data(
        &self,
        surface: Injector,
        lines: Injector,
        resolution: u32,
    ) -> Result<Command> {
        let command = Command::new("Generate demo data", move |ctx| {
            let set = demo::wave_surface(resolution);
            ctx.check_abort()?;
            tracing::debug!("Generated {} triangles", set.triangles.triangle_count());
            surface.inject_value(set)?;
            lines.inject_value(demo::spiral_lines(16, 128))?;
            Ok(())
        });
        command
            .add_observer(self.command_events.observer(self.command_log.clone()))
            .context("Observing demo data command")?;
        self.commands
            .submit(command.clone())
            .context("Submitting demo data command")?;
        Ok(command)
    }

    /// Drive the visualizations the way a display surface would: prepare
    /// once, update and render per frame, finalize at the end.
    pub fn run_frames(&self) -> FrameSummary {
        let frames = &self.config.frames;
        let events = self.network.events();
        let mut summary = FrameSummary {
            visualizations: self
                .network
                .visit_visualizations(|vis| vis.prepare()),
            ..Default::default()
        };

        for _ in 0..frames.frame_count {
            let started = Instant::now();

            self.command_events.dispatch_pending();
            for event in events.try_iter() {
                summary.network_events += 1;
                log_network_event(&event);
            }

            self.network.visit_visualizations(|vis| {
                vis.update();
                vis.render();
            });
            summary.frames += 1;

            if let Some(rest) = frames.frame_interval().checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }

        self.network.visit_visualizations(|vis| vis.finalize());
        self.command_events.dispatch_pending();
        summary
    }

    /// Commands that reached a terminal state, as seen on the frame thread.
    pub fn finished_commands(&self) -> Vec<(String, CommandStatus)> {
        self.command_log
            .finished
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    /// Wait until the network has nothing left to do, up to `timeout`.
    pub fn wait_until_settled(&self, ids: &[AlgorithmId], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            self.command_events.dispatch_pending();
            let busy = ids
                .iter()
                .any(|&id| self.network.is_dirty(id).unwrap_or(false));
            if !busy {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    /// Stop the command worker and the scheduler.
    pub fn shutdown(&self) {
        self.commands.stop();
        self.network.stop();
        let stats = self.network.stats();
        tracing::info!(
            "Shut down after {} cycles, {} executions, {} failures",
            stats.cycles,
            stats.executions,
            stats.failures
        );
    }
}

fn wire_demo(
    net: &ProcessingNetwork,
    surface: DataInject,
    lines: DataInject,
) -> NetworkResult<DemoNetwork> {
    let surface_source = net.add_algorithm(shared(surface))?;
    let normals = net.add_algorithm(shared(TriangleNormals::new()))?;
    let render_triangles = net.add_algorithm(shared(RenderTriangles::new()))?;
    let lines_source = net.add_algorithm(shared(lines))?;
    let render_lines = net.add_algorithm(shared(RenderLines::new()))?;

    net.connect(surface_source, "Data", normals, "Triangles")?;
    net.connect(normals, "Triangles", render_triangles, "Triangles")?;
    net.connect(lines_source, "Data", render_lines, "Lines")?;

    Ok(DemoNetwork {
        surface_source,
        normals,
        render_triangles,
        lines_source,
        render_lines,
    })
}

fn log_network_event(event: &NetworkEvent) {
    match event {
        NetworkEvent::AlgorithmProcessed { name, elapsed, .. } => {
            tracing::debug!("{} processed in {:?}", name, elapsed)
        }
        NetworkEvent::AlgorithmFailed { name, error, .. } => {
            tracing::warn!("{} failed: {}", name, error)
        }
        NetworkEvent::DataRejected { id, port, message } => {
            tracing::warn!("{:?}.{} rejected data: {}", id, port, message)
        }
        NetworkEvent::Started | NetworkEvent::Stopped => tracing::debug!("Network {:?}", event),
    }
}
