//! # Mesh Reuse & Diff Engine
//!
//! Every cached draw owns a [`MeshSlot`]. Each tick the submitted vertex
//! buffer is compared against what the slot already holds:
//!
//! ```text
//!   hash == prev hash ────────────────────────────► Reused   (no backend work)
//!   interpolating && same format ─────────────────► Staged   (lerped per sub-frame)
//!   otherwise ────────────────────────────────────► Rebuilt  (destroy + create + upload)
//! ```
//!
//! A slot holds three float buffers: `prev` (last tick), `staged` (this
//! tick) and `delta` (last per-float change, used to spot teleports and
//! texture-coordinate wraparound). At commit the staged buffer becomes the
//! previous one by swapping, so steady-state interpolation never allocates.

use std::ops::Range;

use tickframe_core::lerp_f32;
use tracing::{debug, trace};

use crate::backend::{MeshHandle, RenderBackend};
use crate::shader::ProgramInfo;

/// Where the interpolation guards look inside a vertex, in floats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    /// Position components.
    pub position: Range<usize>,
    /// Texture coordinate components.
    pub texcoord: Range<usize>,
}

impl VertexLayout {
    /// Position xyz at floats 0..3, texcoord uv at floats 7..9.
    pub const LEGACY: Self = Self {
        position: 0..3,
        texcoord: 7..9,
    };
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::LEGACY
    }
}

/// Shape of a submitted vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexFormat {
    /// Vertices in the buffer.
    pub vertex_count: u32,
    /// Bytes per vertex.
    pub vertex_stride: u32,
    /// Indices drawn (sequential).
    pub index_count: u32,
    /// The program samples a texture.
    pub uses_texture: bool,
    /// Mesh is raytraced.
    pub raytrace: bool,
}

impl VertexFormat {
    /// Format of `float_len` floats drawn as `triangle_count` triangles with
    /// `program`.
    ///
    /// # Panics
    ///
    /// Panics if the triangle count doesn't match the vertex count.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn for_program(program: &ProgramInfo, float_len: usize, triangle_count: u32, raytrace: bool) -> Self {
        let vertex_stride = program.vertex_stride();
        let vertex_count = (float_len * 4) as u32 / vertex_stride;
        assert_eq!(
            triangle_count,
            vertex_count / 3,
            "triangle count {triangle_count} does not match {vertex_count} vertices"
        );
        Self {
            vertex_count,
            vertex_stride,
            index_count: triangle_count * 3,
            uses_texture: program.uses_texture(),
            raytrace,
        }
    }

    /// Floats per vertex.
    #[inline]
    #[must_use]
    pub const fn floats_per_vertex(&self) -> usize {
        (self.vertex_stride / 4) as usize
    }

    /// Returns true if a mesh of `self` can take `other`'s vertices in place.
    #[inline]
    #[must_use]
    pub const fn compatible(&self, other: &Self) -> bool {
        self.vertex_count == other.vertex_count
            && self.vertex_stride == other.vertex_stride
            && self.index_count == other.index_count
            && self.raytrace == other.raytrace
    }
}

/// What [`process_mesh`] did with a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshDecision {
    /// Content unchanged; the existing mesh draws as-is.
    Reused,
    /// Content changed in place; sub-frames interpolate it.
    Staged,
    /// A new backend mesh was created.
    Rebuilt,
}

/// Guards fired while settling one mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshSettle {
    /// Position floats snapped for moving too far.
    pub teleports: u32,
    /// Texture coordinate floats whose wraparound was hidden.
    pub wraps: u32,
}

/// One cached mesh.
#[derive(Debug, Clone)]
pub struct MeshSlot {
    mesh: MeshHandle,
    format: VertexFormat,
    prev: Vec<f32>,
    prev_hash: u64,
    staged: Vec<f32>,
    staged_hash: u64,
    staged_valid: bool,
    delta: Vec<f32>,
}

impl MeshSlot {
    /// Creates a backend mesh, uploads `data` and keeps it as the baseline.
    pub fn create<B: RenderBackend>(backend: &mut B, data: &[f32], hash: u64, format: VertexFormat) -> Self {
        let mesh = backend.create_mesh(format.raytrace);
        backend.set_mesh(mesh, data, format.vertex_count, format.vertex_stride, format.index_count);
        Self {
            mesh,
            format,
            prev: data.to_vec(),
            prev_hash: hash,
            staged: Vec::new(),
            staged_hash: 0,
            staged_valid: false,
            delta: Vec::new(),
        }
    }

    /// Destroys the backend mesh.
    pub fn release<B: RenderBackend>(self, backend: &mut B) {
        if !self.mesh.is_null() {
            backend.destroy_mesh(self.mesh);
        }
    }

    /// Backend mesh.
    #[inline]
    #[must_use]
    pub const fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    /// Current format.
    #[inline]
    #[must_use]
    pub const fn format(&self) -> &VertexFormat {
        &self.format
    }

    /// Hash of the baseline buffer.
    #[inline]
    #[must_use]
    pub const fn prev_hash(&self) -> u64 {
        self.prev_hash
    }

    /// Baseline buffer.
    #[must_use]
    pub fn prev(&self) -> &[f32] {
        &self.prev
    }

    /// Buffer staged this tick, empty until first staged.
    #[must_use]
    pub fn staged(&self) -> &[f32] {
        &self.staged
    }

    /// Per-float change recorded at the last settle.
    #[must_use]
    pub fn delta(&self) -> &[f32] {
        &self.delta
    }

    /// Returns true if sub-frames interpolate this mesh.
    #[inline]
    #[must_use]
    pub const fn is_staged(&self) -> bool {
        self.staged_valid
    }

    /// Stages this tick's vertices for interpolation.
    pub fn stage(&mut self, data: &[f32], hash: u64) {
        if self.staged.is_empty() || hash != self.staged_hash {
            self.staged.clear();
            self.staged.extend_from_slice(data);
        }
        if self.delta.is_empty() {
            self.delta.resize(self.prev.len(), 0.0);
        }
        self.staged_hash = hash;
        self.staged_valid = true;
    }

    /// Runs the teleport and wraparound guards and records this tick's
    /// deltas. Does nothing unless staged.
    pub fn settle(&mut self, layout: &VertexLayout) -> MeshSettle {
        let mut report = MeshSettle::default();
        if !self.staged_valid {
            return report;
        }

        let per_vertex = self.format.floats_per_vertex().max(1);
        let check_texcoord = self.format.uses_texture;
        let floats = self.prev.iter_mut().zip(&self.staged).zip(self.delta.iter_mut());
        for (i, ((prev, &new), delta)) in floats.enumerate() {
            let component = i % per_vertex;
            let mut step = new - *prev;
            if layout.position.contains(&component) {
                if step.abs() / delta.abs().max(1.0) >= 10.0 {
                    *prev = new;
                    report.teleports += 1;
                }
            } else if check_texcoord && layout.texcoord.contains(&component) && step * *delta < 0.0 {
                step = *delta;
                *prev = new - step;
                report.wraps += 1;
            }
            *delta = step;
        }
        report
    }

    /// Writes the buffer at weight `t` into `out`.
    pub fn sample_into(&self, t: f32, out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.prev.iter().zip(&self.staged).map(|(&a, &b)| lerp_f32(a, b, t)));
    }

    /// Makes the staged buffer the new baseline. Returns true if it was
    /// staged.
    pub fn advance(&mut self) -> bool {
        if !self.staged_valid {
            return false;
        }
        std::mem::swap(&mut self.prev, &mut self.staged);
        std::mem::swap(&mut self.prev_hash, &mut self.staged_hash);
        self.staged_valid = false;
        true
    }
}

/// Decides what the mesh at `index` of `meshes` does with a submission and
/// returns the handle to draw.
///
/// `can_reuse` is whether the owning instance has a valid previous tick;
/// `interpolate` is whether the draw may be staged instead of rebuilt.
///
/// # Panics
///
/// Panics if `index` skips past the end of `meshes`.
#[allow(clippy::too_many_arguments)]
pub fn process_mesh<B: RenderBackend>(
    backend: &mut B,
    meshes: &mut Vec<MeshSlot>,
    index: usize,
    data: &[f32],
    hash: u64,
    format: VertexFormat,
    can_reuse: bool,
    interpolate: bool,
) -> (MeshHandle, MeshDecision) {
    assert!(index <= meshes.len(), "mesh index {index} skips past {}", meshes.len());

    if can_reuse {
        if let Some(slot) = meshes.get_mut(index) {
            if slot.prev_hash == hash {
                trace!(index, "mesh reused");
                return (slot.mesh, MeshDecision::Reused);
            }
            if interpolate && slot.format.compatible(&format) {
                slot.stage(data, hash);
                trace!(index, "mesh staged");
                return (slot.mesh, MeshDecision::Staged);
            }
        }
    }

    let slot = MeshSlot::create(backend, data, hash, format);
    let mesh = slot.mesh;
    if index < meshes.len() {
        let old = std::mem::replace(&mut meshes[index], slot);
        old.release(backend);
    } else {
        meshes.push(slot);
    }
    debug!(
        index,
        vertices = format.vertex_count,
        stride = format.vertex_stride,
        raytrace = format.raytrace,
        "mesh rebuilt"
    );
    (mesh, MeshDecision::Rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::shader::SHADER_TEXEL0;

    // Textured, no inputs: 36 bytes = 9 floats per vertex.
    fn textured() -> ProgramInfo {
        ProgramInfo::decode(SHADER_TEXEL0)
    }

    fn triangle(offset: f32) -> Vec<f32> {
        (0..27).map(|i| i as f32 * 0.01 + offset).collect()
    }

    fn format() -> VertexFormat {
        VertexFormat::for_program(&textured(), 27, 1, true)
    }

    #[test]
    fn test_format_from_program() {
        let f = format();
        assert_eq!(f.vertex_stride, 36);
        assert_eq!(f.vertex_count, 3);
        assert_eq!(f.index_count, 3);
        assert!(f.uses_texture);
        assert_eq!(f.floats_per_vertex(), 9);
    }

    #[test]
    #[should_panic(expected = "triangle count")]
    fn test_format_triangle_mismatch_panics() {
        let _ = VertexFormat::for_program(&textured(), 27, 2, false);
    }

    #[test]
    fn test_decisions() {
        let mut backend = HeadlessBackend::new();
        let mut meshes = Vec::new();
        let a = triangle(0.0);
        let b = triangle(0.5);

        let (first, d) = process_mesh(&mut backend, &mut meshes, 0, &a, 1, format(), false, true);
        assert_eq!(d, MeshDecision::Rebuilt);

        let (same, d) = process_mesh(&mut backend, &mut meshes, 0, &a, 1, format(), true, true);
        assert_eq!(d, MeshDecision::Reused);
        assert_eq!(same, first);

        let (staged, d) = process_mesh(&mut backend, &mut meshes, 0, &b, 2, format(), true, true);
        assert_eq!(d, MeshDecision::Staged);
        assert_eq!(staged, first);
        assert!(meshes[0].is_staged());

        let (rebuilt, d) = process_mesh(&mut backend, &mut meshes, 0, &b, 2, format(), true, false);
        assert_eq!(d, MeshDecision::Rebuilt);
        assert_ne!(rebuilt, first);
        assert_eq!(backend.live_meshes(), 1);
        assert_eq!(backend.counters().meshes_destroyed, 1);
    }

    #[test]
    fn test_incompatible_format_rebuilds() {
        let mut backend = HeadlessBackend::new();
        let mut meshes = Vec::new();
        let a = triangle(0.0);
        process_mesh(&mut backend, &mut meshes, 0, &a, 1, format(), false, true);

        let raster = VertexFormat { raytrace: false, ..format() };
        let (_, d) = process_mesh(&mut backend, &mut meshes, 0, &a, 9, raster, true, true);
        assert_eq!(d, MeshDecision::Rebuilt);
    }

    #[test]
    fn test_sample_midpoint_and_advance_swaps() {
        let mut backend = HeadlessBackend::new();
        let mut meshes = Vec::new();
        let a = triangle(0.0);
        let b = triangle(1.0);
        process_mesh(&mut backend, &mut meshes, 0, &a, 1, format(), false, true);
        process_mesh(&mut backend, &mut meshes, 0, &b, 2, format(), true, true);

        let mut out = Vec::new();
        meshes[0].sample_into(0.5, &mut out);
        for ((&x, &p), &n) in out.iter().zip(&a).zip(&b) {
            assert!((x - (p + n) * 0.5).abs() < 1e-6);
        }

        assert!(meshes[0].advance());
        assert_eq!(meshes[0].prev(), b.as_slice());
        assert_eq!(meshes[0].prev_hash(), 2);
        assert!(!meshes[0].is_staged());
        assert!(!meshes[0].advance());
    }

    #[test]
    fn test_settle_texcoord_wrap_reuses_previous_delta() {
        let mut backend = HeadlessBackend::new();
        let mut meshes = Vec::new();
        let a = vec![0.0; 27];
        process_mesh(&mut backend, &mut meshes, 0, &a, 1, format(), false, true);

        // Tick 1: u moves +0.9.
        let mut b = a.clone();
        b[7] = 0.9;
        process_mesh(&mut backend, &mut meshes, 0, &b, 2, format(), true, true);
        let report = meshes[0].settle(&VertexLayout::LEGACY);
        assert_eq!(report.wraps, 0);
        assert!((meshes[0].delta()[7] - 0.9).abs() < 1e-6);
        meshes[0].advance();

        // Tick 2: u wraps back to 0.0, a -0.9 step.
        process_mesh(&mut backend, &mut meshes, 0, &a, 3, format(), true, true);
        let report = meshes[0].settle(&VertexLayout::LEGACY);
        assert_eq!(report.wraps, 1);
        assert!((meshes[0].delta()[7] - 0.9).abs() < 1e-6);
        assert!((meshes[0].prev()[7] - -0.9).abs() < 1e-6);
    }

    #[test]
    fn test_settle_position_teleport_snaps() {
        let mut backend = HeadlessBackend::new();
        let mut meshes = Vec::new();
        let a = vec![0.0; 27];
        process_mesh(&mut backend, &mut meshes, 0, &a, 1, format(), false, true);

        let mut b = a.clone();
        b[0] = 50.0;
        b[9] = 5.0;
        process_mesh(&mut backend, &mut meshes, 0, &b, 2, format(), true, true);
        let report = meshes[0].settle(&VertexLayout::LEGACY);

        assert_eq!(report.teleports, 1);
        assert_eq!(meshes[0].prev()[0], 50.0);
        assert_eq!(meshes[0].prev()[9], 0.0);
        assert_eq!(meshes[0].delta()[0], 50.0);
    }
}
