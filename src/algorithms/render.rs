//! Visualizations: the last stage of the network, drawn once per frame.
//!
//! No graphics backend is linked. A visualization keeps the latest dataset
//! from `process()`, flattens it into an interleaved vertex buffer on
//! `update()` and records draw calls on `render()`, which is what a GPU
//! backend would consume.

use crate::network::{
    Algorithm, DataType, PortDescriptor, ProcessContext, ProcessingError,
    Visualization,
};
use crate::types::{LineDataSet, TriangleDataSet, Vec3};
use std::sync::Arc;

/// CPU-side copy of what would be uploaded to the GPU.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBuffer {
    /// Interleaved vertex attributes, `stride` floats per vertex.
    pub data: Vec<f32>,
    pub stride: usize,
    pub indices: Vec<u32>,
}

impl VertexBuffer {
    pub fn vertex_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }
}

/// Frame counters of one visualization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub prepared: bool,
    pub finalized: bool,
    /// Buffer rebuilds triggered by new data.
    pub uploads: u64,
    pub updates: u64,
    pub draw_calls: u64,
    pub indices_drawn: u64,
}

/// Buffer and bookkeeping shared by all visualizations.
#[derive(Debug, Default)]
struct RenderState<T> {
    latest: Option<Arc<T>>,
    pending: bool,
    buffer: Option<VertexBuffer>,
    stats: RenderStats,
}

impl<T> RenderState<T> {
    fn receive(&mut self, data: Option<Arc<T>>) {
        let changed = match (&self.latest, &data) {
            (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
            (None, None) => false,
            _ => true,
        };
        if changed {
            self.latest = data;
            self.pending = true;
        }
    }

    fn update(&mut self, build: impl FnOnce(&T) -> VertexBuffer) {
        self.stats.updates += 1;
        if !self.pending {
            return;
        }
        self.pending = false;
        self.buffer = self.latest.as_deref().map(build);
        self.stats.uploads += 1;
    }

    fn render(&mut self, name: &str) {
        let Some(buffer) = &self.buffer else {
            return;
        };
        if !self.stats.prepared {
            tracing::warn!("{} rendered before prepare()", name);
            return;
        }
        self.stats.draw_calls += 1;
        self.stats.indices_drawn += buffer.indices.len() as u64;
    }

    fn prepare(&mut self) {
        self.stats.prepared = true;
        self.stats.finalized = false;
    }

    fn finalize(&mut self) {
        self.buffer = None;
        self.stats.prepared = false;
        self.stats.finalized = true;
    }
}

fn push3(data: &mut Vec<f32>, v: Vec3) {
    data.extend_from_slice(&v);
}

// ── RenderTriangles ──

pub const TRIANGLES_INPUT: &str = "Triangles";

/// Shaded triangle mesh. Vertex layout: position, normal, color (10 floats).
pub struct RenderTriangles {
    ports: Vec<PortDescriptor>,
    state: RenderState<TriangleDataSet>,
}

impl RenderTriangles {
    pub const STRIDE: usize = 10;

    pub fn new() -> Self {
        Self {
            ports: vec![PortDescriptor::input(
                TRIANGLES_INPUT,
                "The triangle mesh to render.",
                DataType::of::<TriangleDataSet>(),
            )],
            state: RenderState::default(),
        }
    }

    pub fn stats(&self) -> RenderStats {
        self.state.stats
    }

    pub fn buffer(&self) -> Option<&VertexBuffer> {
        self.state.buffer.as_ref()
    }

    fn build(set: &TriangleDataSet) -> VertexBuffer {
        let tris = &set.triangles;
        let mut data = Vec::with_capacity(tris.vertex_count() * Self::STRIDE);
        for (i, &v) in tris.vertices.iter().enumerate() {
            push3(&mut data, v);
            push3(&mut data, set.normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]));
            data.extend_from_slice(&set.color(i));
        }
        VertexBuffer {
            data,
            stride: Self::STRIDE,
            indices: tris.indices.iter().flatten().copied().collect(),
        }
    }
}

impl Default for RenderTriangles {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for RenderTriangles {
    fn name(&self) -> &str {
        "Render Triangles"
    }

    fn description(&self) -> &str {
        "Renders a triangle mesh with per-vertex normals and colors."
    }

    fn ports(&self) -> &[PortDescriptor] {
        &self.ports
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessingError> {
        let data = ctx.input_opt::<TriangleDataSet>(TRIANGLES_INPUT)?;
        self.state.receive(data);
        Ok(())
    }

    fn as_visualization_mut(&mut self) -> Option<&mut dyn Visualization> {
        Some(self)
    }
}

impl Visualization for RenderTriangles {
    fn prepare(&mut self) {
        self.state.prepare();
    }

    fn update(&mut self) {
        self.state.update(Self::build);
    }

    fn render(&mut self) {
        self.state.render("Render Triangles");
    }

    fn finalize(&mut self) {
        self.state.finalize();
    }
}

// ── RenderLines ──

pub const LINES_INPUT: &str = "Lines";

/// Colored line strips drawn as a line list. Vertex layout: position, color (7 floats).
pub struct RenderLines {
    ports: Vec<PortDescriptor>,
    state: RenderState<LineDataSet>,
}

impl RenderLines {
    pub const STRIDE: usize = 7;

    pub fn new() -> Self {
        Self {
            ports: vec![PortDescriptor::input(
                LINES_INPUT,
                "The lines to render.",
                DataType::of::<LineDataSet>(),
            )],
            state: RenderState::default(),
        }
    }

    pub fn stats(&self) -> RenderStats {
        self.state.stats
    }

    pub fn buffer(&self) -> Option<&VertexBuffer> {
        self.state.buffer.as_ref()
    }

    fn build(set: &LineDataSet) -> VertexBuffer {
        let lines = &set.lines;
        let mut data = Vec::with_capacity(lines.vertices.len() * Self::STRIDE);
        for (i, &v) in lines.vertices.iter().enumerate() {
            push3(&mut data, v);
            data.extend_from_slice(&set.color(i));
        }
        let n = lines.vertices.len() as u32;
        let indices = lines
            .strips
            .iter()
            .flat_map(|strip| strip.windows(2).flat_map(|w| [w[0], w[1]]))
            .filter(|&i| i < n)
            .collect();
        VertexBuffer {
            data,
            stride: Self::STRIDE,
            indices,
        }
    }
}

impl Default for RenderLines {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for RenderLines {
    fn name(&self) -> &str {
        "Render Lines"
    }

    fn description(&self) -> &str {
        "Renders colored line strips."
    }

    fn ports(&self) -> &[PortDescriptor] {
        &self.ports
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessingError> {
        let data = ctx.input_opt::<LineDataSet>(LINES_INPUT)?;
        if let Some(set) = &data {
            if set.lines.strips.iter().flatten().any(|&i| i as usize >= set.lines.vertices.len()) {
                return Err(ProcessingError::invalid_data(format!(
                    "line set '{}' references missing vertices",
                    set.name
                )));
            }
        }
        self.state.receive(data);
        Ok(())
    }

    fn as_visualization_mut(&mut self) -> Option<&mut dyn Visualization> {
        Some(self)
    }
}

impl Visualization for RenderLines {
    fn prepare(&mut self) {
        self.state.prepare();
    }

    fn update(&mut self) {
        self.state.update(Self::build);
    }

    fn render(&mut self) {
        self.state.render("Render Lines");
    }

    fn finalize(&mut self) {
        self.state.finalize();
    }
}
