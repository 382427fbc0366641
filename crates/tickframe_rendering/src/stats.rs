//! Per-tick statistics.

use crate::commit::{AdvanceReport, SettleReport};

/// What one logic tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Draws submitted.
    pub draws: u32,
    /// Draws whose mesh was reused untouched.
    pub reused_meshes: u32,
    /// Draws whose mesh was staged for interpolation.
    pub staged_meshes: u32,
    /// Draws that created a new mesh.
    pub rebuilt_meshes: u32,
    /// Shader variants created on demand.
    pub shader_variants_created: u32,
    /// Dynamic lights emitted.
    pub dynamic_lights: usize,
    /// Lights pushed to the backend.
    pub scene_lights: usize,
    /// Sub-frames rendered.
    pub sub_frames: u32,
    /// Pre-render commit results.
    pub settle: SettleReport,
    /// Post-render commit results.
    pub advance: AdvanceReport,
}

impl TickStats {
    /// Share of draws that needed no mesh rebuild.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reuse_ratio(&self) -> f32 {
        if self.draws > 0 {
            (self.reused_meshes + self.staged_meshes) as f32 / self.draws as f32
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_ratio() {
        let stats = TickStats {
            draws: 4,
            reused_meshes: 2,
            staged_meshes: 1,
            rebuilt_meshes: 1,
            ..TickStats::default()
        };
        assert_eq!(stats.reuse_ratio(), 0.75);
        assert_eq!(TickStats::default().reuse_ratio(), 0.0);
    }
}
