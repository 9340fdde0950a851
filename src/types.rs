//! Geometry datasets flowing through the processing network.
//!
//! # Main Types
//!
//! - [`Triangles`] / [`TriangleDataSet`] - indexed triangle mesh with optional
//!   per-vertex normals and colors
//! - [`Lines`] / [`LineDataSet`] - line strips with per-vertex RGBA colors
//! - [`Bounds`] - axis-aligned bounding box
//!
//! Datasets are immutable once injected; algorithms produce new datasets
//! and share them through `Arc`.

use serde::{Deserialize, Serialize};

pub type Vec3 = [f32; 3];
pub type Rgba = [f32; 4];

pub const DEFAULT_COLOR: Rgba = [0.8, 0.8, 0.8, 1.0];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Unit-length copy of `v`, or zero if `v` is degenerate.
pub fn normalize(v: Vec3) -> Vec3 {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len <= f32::EPSILON {
        [0.0; 3]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Box around `points`, or `None` if there are none.
    pub fn of(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        Some(points.iter().fold(
            Bounds {
                min: first,
                max: first,
            },
            |mut b, p| {
                for axis in 0..3 {
                    b.min[axis] = b.min[axis].min(p[axis]);
                    b.max[axis] = b.max[axis].max(p[axis]);
                }
                b
            },
        ))
    }

    pub fn center(&self) -> Vec3 {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }
}

/// Indexed triangle grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Triangles {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
}

impl Triangles {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// First triangle referencing a vertex that does not exist.
    pub fn find_invalid_index(&self) -> Option<usize> {
        let n = self.vertices.len();
        self.indices
            .iter()
            .position(|tri| tri.iter().any(|&i| i as usize >= n))
    }

    /// Twice the area-weighted face normal of triangle `t`. Indices must be valid.
    pub fn face_normal(&self, t: usize) -> Vec3 {
        let [a, b, c] = self.indices[t];
        let (a, b, c) = (
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        );
        cross(sub(b, a), sub(c, a))
    }
}

/// A triangle mesh plus per-vertex attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleDataSet {
    pub name: String,
    pub triangles: Triangles,
    /// Per-vertex normals, empty until computed.
    #[serde(default)]
    pub normals: Vec<Vec3>,
    /// Per-vertex colors, empty means [`DEFAULT_COLOR`].
    #[serde(default)]
    pub colors: Vec<Rgba>,
}

impl TriangleDataSet {
    pub fn new(name: impl Into<String>, triangles: Triangles) -> Self {
        Self {
            name: name.into(),
            triangles,
            normals: Vec::new(),
            colors: Vec::new(),
        }
    }

    pub fn with_colors(mut self, colors: Vec<Rgba>) -> Self {
        self.colors = colors;
        self
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.triangles.vertex_count()
    }

    pub fn color(&self, vertex: usize) -> Rgba {
        self.colors.get(vertex).copied().unwrap_or(DEFAULT_COLOR)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of(&self.triangles.vertices)
    }
}

/// A set of line strips over a shared vertex array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lines {
    pub vertices: Vec<Vec3>,
    /// Each strip is a list of vertex indices.
    pub strips: Vec<Vec<u32>>,
}

impl Lines {
    /// Number of line segments over all strips.
    pub fn segment_count(&self) -> usize {
        self.strips.iter().map(|s| s.len().saturating_sub(1)).sum()
    }
}

/// Lines with a per-vertex RGBA color attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineDataSet {
    pub name: String,
    pub lines: Lines,
    #[serde(default)]
    pub colors: Vec<Rgba>,
}

impl LineDataSet {
    pub fn new(name: impl Into<String>, lines: Lines, colors: Vec<Rgba>) -> Self {
        Self {
            name: name.into(),
            lines,
            colors,
        }
    }

    pub fn color(&self, vertex: usize) -> Rgba {
        self.colors.get(vertex).copied().unwrap_or(DEFAULT_COLOR)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of(&self.lines.vertices)
    }
}

/// Procedural datasets for the headless driver and benchmarks.
pub mod demo {
    use super::*;
    use std::f32::consts::TAU;

    /// A height-field surface on a `resolution x resolution` grid over [-1, 1]².
    pub fn wave_surface(resolution: u32) -> TriangleDataSet {
        let n = resolution.max(2);
        let step = 2.0 / (n - 1) as f32;
        let mut vertices = Vec::with_capacity((n * n) as usize);
        let mut colors = Vec::with_capacity((n * n) as usize);

        for j in 0..n {
            for i in 0..n {
                let x = -1.0 + i as f32 * step;
                let y = -1.0 + j as f32 * step;
                let z = 0.25 * (x * TAU * 0.5).sin() * (y * TAU * 0.5).cos();
                vertices.push([x, y, z]);
                let t = (z + 0.25) * 2.0;
                colors.push([t, 0.3, 1.0 - t, 1.0]);
            }
        }

        let mut indices = Vec::with_capacity(((n - 1) * (n - 1) * 2) as usize);
        for j in 0..n - 1 {
            for i in 0..n - 1 {
                let a = j * n + i;
                let b = a + 1;
                let c = a + n;
                let d = c + 1;
                indices.push([a, b, d]);
                indices.push([a, d, c]);
            }
        }

        TriangleDataSet::new("wave surface", Triangles { vertices, indices }).with_colors(colors)
    }

    /// `count` streamlines circling the z axis at increasing radii.
    pub fn spiral_lines(count: u32, points_per_line: u32) -> LineDataSet {
        let points = points_per_line.max(2);
        let mut lines = Lines::default();
        let mut colors = Vec::new();

        for l in 0..count {
            let radius = 0.2 + 0.8 * (l as f32 + 1.0) / count.max(1) as f32;
            let mut strip = Vec::with_capacity(points as usize);
            for p in 0..points {
                let t = p as f32 / (points - 1) as f32;
                let angle = t * TAU;
                strip.push(lines.vertices.len() as u32);
                lines
                    .vertices
                    .push([radius * angle.cos(), radius * angle.sin(), t - 0.5]);
                colors.push([t, 1.0 - t, radius, 1.0]);
            }
            lines.strips.push(strip);
        }

        LineDataSet::new("spiral lines", lines, colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Triangles {
        Triangles {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    #[test]
    fn test_face_normal_points_up() {
        let tris = quad();
        assert_eq!(normalize(tris.face_normal(0)), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_invalid_index_detection() {
        let mut tris = quad();
        assert_eq!(tris.find_invalid_index(), None);
        tris.indices.push([0, 1, 9]);
        assert_eq!(tris.find_invalid_index(), Some(2));
    }

    #[test]
    fn test_bounds() {
        let bounds = Bounds::of(&quad().vertices).unwrap();
        assert_eq!(bounds.min, [0.0, 0.0, 0.0]);
        assert_eq!(bounds.max, [1.0, 1.0, 0.0]);
        assert_eq!(bounds.center(), [0.5, 0.5, 0.0]);
        assert!(Bounds::of(&[]).is_none());
    }

    #[test]
    fn test_default_colors() {
        let set = TriangleDataSet::new("q", quad());
        assert_eq!(set.color(3), DEFAULT_COLOR);
        assert!(!set.has_normals());
    }

    #[test]
    fn test_demo_surface_shape() {
        let set = demo::wave_surface(4);
        assert_eq!(set.triangles.vertex_count(), 16);
        assert_eq!(set.triangles.triangle_count(), 18);
        assert_eq!(set.colors.len(), 16);
        assert_eq!(set.triangles.find_invalid_index(), None);
    }

    #[test]
    fn test_demo_lines_shape() {
        let set = demo::spiral_lines(3, 10);
        assert_eq!(set.lines.strips.len(), 3);
        assert_eq!(set.lines.segment_count(), 27);
        assert_eq!(set.colors.len(), set.lines.vertices.len());
    }

    #[test]
    fn test_dataset_serde_roundtrip() {
        let set = TriangleDataSet::new("q", quad());
        let json = serde_json::to_string(&set).unwrap();
        let back: TriangleDataSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
