//! # Tick Commit
//!
//! Split around the sub-frames of a tick:
//!
//! ```text
//!   submissions ──► settle ──► sub-frame × N ──► advance ──► next tick
//!                   │                            │
//!                   ├─ trim to live count        ├─ instances: prev ← new
//!                   ├─ rotation flip guard       ├─ meshes: swap prev/staged
//!                   └─ vertex delta guards       ├─ untouched lists evicted
//!                                                └─ camera: prev ← new
//! ```
//!
//! The guards run before any frame is drawn so the frames never show the
//! motion they suppress.

use std::f32::consts::FRAC_1_SQRT_2;

use tickframe_shared::{Matrix4, Vec3};
use tracing::debug;

use crate::backend::RenderBackend;
use crate::display_list::DisplayListCache;
use crate::interpolator::CameraTrack;
use crate::mesh::VertexLayout;

/// What [`settle`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleReport {
    /// Instances destroyed past the live count.
    pub trimmed_instances: usize,
    /// Meshes destroyed past the live count.
    pub trimmed_meshes: usize,
    /// Instances whose rotation flipped and were snapped.
    pub rotation_snaps: u32,
    /// Position floats snapped for teleporting.
    pub vertex_teleports: u32,
    /// Texture coordinate floats whose wraparound was hidden.
    pub texcoord_wraps: u32,
}

/// What [`advance`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Instances committed.
    pub committed_instances: usize,
    /// Staged meshes swapped into place.
    pub swapped_meshes: usize,
    /// Lists evicted for not being drawn.
    pub evicted_lists: usize,
    /// Transient instances destroyed.
    pub transient_released: usize,
}

/// Returns true if any basis axis turns by more than 135° between `prev`
/// and `new`.
#[must_use]
pub fn rotation_flipped(prev: &Matrix4, new: &Matrix4) -> bool {
    [Vec3::X, Vec3::Y, Vec3::Z].into_iter().any(|axis| {
        let a = prev.transform_direction(axis).normalize();
        let b = new.transform_direction(axis).normalize();
        a.dot(b) < -FRAC_1_SQRT_2
    })
}

/// Pre-render half of the commit.
pub fn settle<B: RenderBackend>(cache: &mut DisplayListCache, backend: &mut B, layout: &VertexLayout) -> SettleReport {
    let mut report = SettleReport::default();

    for list in cache.cached_mut() {
        let (instances, meshes) = list.trim(backend);
        report.trimmed_instances += instances;
        report.trimmed_meshes += meshes;

        for slot in &mut list.instances {
            if slot.prev_valid() && rotation_flipped(&slot.transform.prev(), &slot.transform.current()) {
                slot.transform.snap();
                report.rotation_snaps += 1;
            }
        }

        for mesh in &mut list.meshes {
            let guards = mesh.settle(layout);
            report.vertex_teleports += guards.teleports;
            report.texcoord_wraps += guards.wraps;
        }
    }

    if report.trimmed_instances + report.trimmed_meshes > 0 || report.rotation_snaps > 0 {
        debug!(
            trimmed_instances = report.trimmed_instances,
            trimmed_meshes = report.trimmed_meshes,
            rotation_snaps = report.rotation_snaps,
            "settled tick"
        );
    }
    report
}

/// Post-render half of the commit.
pub fn advance<B: RenderBackend>(
    cache: &mut DisplayListCache,
    backend: &mut B,
    camera: &mut CameraTrack,
) -> AdvanceReport {
    let mut report = AdvanceReport::default();

    for list in cache.cached_mut() {
        for slot in &mut list.instances {
            slot.commit();
            report.committed_instances += 1;
        }
        for mesh in &mut list.meshes {
            if mesh.advance() {
                report.swapped_meshes += 1;
            }
        }
    }

    report.evicted_lists = cache.evict_untouched(backend);
    for list in cache.cached_mut() {
        list.transform.commit();
        list.touched = false;
        list.live_count = 0;
    }
    report.transient_released = cache.release_transient(backend);

    camera.commit();

    if report.evicted_lists > 0 {
        debug!(evicted = report.evicted_lists, "display lists evicted");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    #[test]
    fn test_rotation_flip_threshold() {
        let flip = Matrix4::rotation_z(std::f32::consts::PI);
        assert!(rotation_flipped(&Matrix4::IDENTITY, &flip));

        let quarter = Matrix4::rotation_z(std::f32::consts::FRAC_PI_2);
        assert!(!rotation_flipped(&Matrix4::IDENTITY, &quarter));

        let scaled = Matrix4::scale(4.0);
        assert!(!rotation_flipped(&Matrix4::IDENTITY, &scaled));
    }

    #[test]
    fn test_mirrored_x_axis_flips() {
        let mirror = Matrix4::from_rows([
            [-1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert!(rotation_flipped(&Matrix4::IDENTITY, &mirror));
    }

    #[test]
    fn test_settle_snaps_flipped_instance() {
        let mut backend = HeadlessBackend::new();
        let mut cache = DisplayListCache::new();
        let list = cache.list_mut(7);
        let slot = list.instance_at(&mut backend, 0);
        slot.stage(Matrix4::IDENTITY, Default::default(), Default::default());
        slot.commit();
        slot.stage(Matrix4::rotation_z(std::f32::consts::PI), Default::default(), Default::default());
        list.live_count = 1;
        list.touched = true;

        let report = settle(&mut cache, &mut backend, &VertexLayout::LEGACY);
        assert_eq!(report.rotation_snaps, 1);
        let slot = &cache.get(7).unwrap().instances()[0];
        assert_eq!(slot.transform().prev(), slot.transform().current());
    }

    #[test]
    fn test_advance_evicts_and_resets() {
        let mut backend = HeadlessBackend::new();
        let mut cache = DisplayListCache::new();
        let mut camera = CameraTrack::new();

        let list = cache.list_mut(42);
        list.instance_at(&mut backend, 0);
        list.live_count = 1;
        list.touched = true;
        cache.list_mut(0).instance_at(&mut backend, 0);

        let report = advance(&mut cache, &mut backend, &mut camera);
        assert_eq!(report.evicted_lists, 0);
        assert_eq!(report.transient_released, 1);
        assert!(camera.prev_valid());
        let list = cache.get(42).unwrap();
        assert!(!list.touched());
        assert_eq!(list.live_count(), 0);
        assert!(list.instances()[0].prev_valid());

        let report = advance(&mut cache, &mut backend, &mut camera);
        assert_eq!(report.evicted_lists, 1);
        assert!(!cache.contains(42));
        assert_eq!(backend.live_instances(), 0);
    }
}
