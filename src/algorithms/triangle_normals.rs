use crate::network::{
    Algorithm, AlgorithmData, DataType, PortDescriptor, ProcessContext, ProcessingError,
};
use crate::types::{normalize, TriangleDataSet};

pub const INPUT: &str = "Triangles";
pub const OUTPUT: &str = "Triangles";

/// Triangles processed between two stop-flag checks.
const CHUNK: usize = 4096;

/// Computes area-weighted per-vertex normals for a triangle mesh.
pub struct TriangleNormals {
    ports: Vec<PortDescriptor>,
}

impl TriangleNormals {
    pub fn new() -> Self {
        Self {
            ports: vec![
                PortDescriptor::input(
                    INPUT,
                    "The triangle mesh.",
                    DataType::of::<TriangleDataSet>(),
                ),
                PortDescriptor::output(
                    OUTPUT,
                    "The mesh with per-vertex normals.",
                    DataType::of::<TriangleDataSet>(),
                ),
            ],
        }
    }
}

impl Default for TriangleNormals {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for TriangleNormals {
    fn name(&self) -> &str {
        "Triangle Normals"
    }

    fn description(&self) -> &str {
        "Calculates per-vertex normals by averaging the area-weighted normals of adjacent triangles."
    }

    fn ports(&self) -> &[PortDescriptor] {
        &self.ports
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessingError> {
        let Some(input) = ctx.input_opt::<TriangleDataSet>(INPUT)? else {
            return Ok(());
        };

        if let Some(t) = input.triangles.find_invalid_index() {
            return Err(ProcessingError::invalid_data(format!(
                "triangle {} of '{}' references a vertex outside 0..{}",
                t,
                input.name,
                input.triangles.vertex_count()
            )));
        }

        let tris = &input.triangles;
        let mut normals = vec![[0.0f32; 3]; tris.vertex_count()];
        for (chunk, indices) in tris.indices.chunks(CHUNK).enumerate() {
            ctx.check_stop()?;
            for (offset, tri) in indices.iter().enumerate() {
                // Unnormalized, so larger faces weigh more.
                let face = tris.face_normal(chunk * CHUNK + offset);
                for &v in tri {
                    let n = &mut normals[v as usize];
                    n[0] += face[0];
                    n[1] += face[1];
                    n[2] += face[2];
                }
            }
        }
        for n in &mut normals {
            *n = normalize(*n);
        }

        let mut output = (*input).clone();
        output.normals = normals;
        ctx.set_output(OUTPUT, AlgorithmData::new(output))
    }
}
