//! # Materials
//!
//! The per-draw surface description handed to the backend, and the sparse
//! overrides that patch it. An override only carries meaning for the
//! fields whose bit is set in its [`AttributeMask`].

use tickframe_shared::{Vec3, Vec4};

/// Light group bitmask that receives every light.
pub const LIGHT_GROUP_MASK_ALL: u32 = 0xFFFF_FFFF;

/// Group bits assigned to lights that don't specify one.
pub const LIGHT_GROUP_DEFAULT: u32 = 0x1;

/// Which material fields an override carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct AttributeMask(u32);

impl AttributeMask {
    /// No fields.
    pub const NONE: Self = Self(0);
    /// `ignore_normal_factor`
    pub const IGNORE_NORMAL_FACTOR: Self = Self(1 << 0);
    /// `uv_detail_scale`
    pub const UV_DETAIL_SCALE: Self = Self(1 << 1);
    /// `reflection_factor`
    pub const REFLECTION_FACTOR: Self = Self(1 << 2);
    /// `reflection_fresnel_factor`
    pub const REFLECTION_FRESNEL_FACTOR: Self = Self(1 << 3);
    /// `reflection_shine_factor`
    pub const REFLECTION_SHINE_FACTOR: Self = Self(1 << 4);
    /// `refraction_factor`
    pub const REFRACTION_FACTOR: Self = Self(1 << 5);
    /// `specular_color`
    pub const SPECULAR_COLOR: Self = Self(1 << 6);
    /// `specular_exponent`
    pub const SPECULAR_EXPONENT: Self = Self(1 << 7);
    /// `solid_alpha_multiplier`
    pub const SOLID_ALPHA_MULTIPLIER: Self = Self(1 << 8);
    /// `shadow_alpha_multiplier`
    pub const SHADOW_ALPHA_MULTIPLIER: Self = Self(1 << 9);
    /// `depth_bias`
    pub const DEPTH_BIAS: Self = Self(1 << 10);
    /// `shadow_ray_bias`
    pub const SHADOW_RAY_BIAS: Self = Self(1 << 11);
    /// `self_light`
    pub const SELF_LIGHT: Self = Self(1 << 12);
    /// `light_group_mask_bits`
    pub const LIGHT_GROUP_MASK_BITS: Self = Self(1 << 13);
    /// `diffuse_color_mix`
    pub const DIFFUSE_COLOR_MIX: Self = Self(1 << 14);

    /// Creates a mask from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Returns true if no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for AttributeMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for AttributeMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Surface description of one draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Fields this material overrides when used as a mod.
    pub enabled: AttributeMask,
    /// How much the shading normal is ignored.
    pub ignore_normal_factor: f32,
    /// Scale applied to detail texture coordinates.
    pub uv_detail_scale: f32,
    /// Reflectivity.
    pub reflection_factor: f32,
    /// Fresnel weight of reflections.
    pub reflection_fresnel_factor: f32,
    /// Shine added by reflections.
    pub reflection_shine_factor: f32,
    /// Refraction amount.
    pub refraction_factor: f32,
    /// Specular tint.
    pub specular_color: Vec3,
    /// Specular exponent.
    pub specular_exponent: f32,
    /// Alpha multiplier for solid shading.
    pub solid_alpha_multiplier: f32,
    /// Alpha multiplier for shadow rays.
    pub shadow_alpha_multiplier: f32,
    /// Depth bias.
    pub depth_bias: f32,
    /// Shadow ray origin bias.
    pub shadow_ray_bias: f32,
    /// Emissive color.
    pub self_light: Vec3,
    /// Light groups affecting this surface.
    pub light_group_mask_bits: u32,
    /// Color blended over the diffuse texture (alpha is the blend weight).
    pub diffuse_color_mix: Vec4,
    /// Fog color.
    pub fog_color: Vec3,
    /// Fog multiplier.
    pub fog_mul: f32,
    /// Fog offset.
    pub fog_offset: f32,
    /// Fog toggle.
    pub fog_enabled: bool,
}

impl Material {
    /// The material every draw starts from.
    pub const DEFAULT: Self = Self {
        enabled: AttributeMask::NONE,
        ignore_normal_factor: 0.0,
        uv_detail_scale: 1.0,
        reflection_factor: 0.0,
        reflection_fresnel_factor: 1.0,
        reflection_shine_factor: 0.0,
        refraction_factor: 0.0,
        specular_color: Vec3::ONE,
        specular_exponent: 5.0,
        solid_alpha_multiplier: 1.0,
        shadow_alpha_multiplier: 1.0,
        depth_bias: 0.0,
        shadow_ray_bias: 0.0,
        self_light: Vec3::ZERO,
        light_group_mask_bits: LIGHT_GROUP_MASK_ALL,
        diffuse_color_mix: Vec4::ZERO,
        fog_color: Vec3::ONE,
        fog_mul: 0.0,
        fog_offset: 0.0,
        fog_enabled: false,
    };

    /// An override that touches nothing yet.
    #[must_use]
    pub const fn empty_mod() -> Self {
        Self::DEFAULT
    }

    /// Copies every field enabled in `src` onto `self`.
    ///
    /// `self.enabled` is left untouched.
    pub fn apply_attributes(&mut self, src: &Self) {
        let mask = src.enabled;
        if mask.is_empty() {
            return;
        }
        if mask.contains(AttributeMask::IGNORE_NORMAL_FACTOR) {
            self.ignore_normal_factor = src.ignore_normal_factor;
        }
        if mask.contains(AttributeMask::UV_DETAIL_SCALE) {
            self.uv_detail_scale = src.uv_detail_scale;
        }
        if mask.contains(AttributeMask::REFLECTION_FACTOR) {
            self.reflection_factor = src.reflection_factor;
        }
        if mask.contains(AttributeMask::REFLECTION_FRESNEL_FACTOR) {
            self.reflection_fresnel_factor = src.reflection_fresnel_factor;
        }
        if mask.contains(AttributeMask::REFLECTION_SHINE_FACTOR) {
            self.reflection_shine_factor = src.reflection_shine_factor;
        }
        if mask.contains(AttributeMask::REFRACTION_FACTOR) {
            self.refraction_factor = src.refraction_factor;
        }
        if mask.contains(AttributeMask::SPECULAR_COLOR) {
            self.specular_color = src.specular_color;
        }
        if mask.contains(AttributeMask::SPECULAR_EXPONENT) {
            self.specular_exponent = src.specular_exponent;
        }
        if mask.contains(AttributeMask::SOLID_ALPHA_MULTIPLIER) {
            self.solid_alpha_multiplier = src.solid_alpha_multiplier;
        }
        if mask.contains(AttributeMask::SHADOW_ALPHA_MULTIPLIER) {
            self.shadow_alpha_multiplier = src.shadow_alpha_multiplier;
        }
        if mask.contains(AttributeMask::DEPTH_BIAS) {
            self.depth_bias = src.depth_bias;
        }
        if mask.contains(AttributeMask::SHADOW_RAY_BIAS) {
            self.shadow_ray_bias = src.shadow_ray_bias;
        }
        if mask.contains(AttributeMask::SELF_LIGHT) {
            self.self_light = src.self_light;
        }
        if mask.contains(AttributeMask::LIGHT_GROUP_MASK_BITS) {
            self.light_group_mask_bits = src.light_group_mask_bits;
        }
        if mask.contains(AttributeMask::DIFFUSE_COLOR_MIX) {
            self.diffuse_color_mix = src.diffuse_color_mix;
        }
    }

    /// Marks the selection highlight: magenta mix, full self light, no
    /// scene lighting.
    pub fn highlight(&mut self) {
        self.diffuse_color_mix = Vec4::new(1.0, 0.0, 1.0, 0.5);
        self.self_light = Vec3::ONE;
        self.light_group_mask_bits = 0;
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_material_values() {
        let m = Material::default();
        assert_eq!(m.uv_detail_scale, 1.0);
        assert_eq!(m.reflection_fresnel_factor, 1.0);
        assert_eq!(m.specular_exponent, 5.0);
        assert_eq!(m.light_group_mask_bits, LIGHT_GROUP_MASK_ALL);
        assert!(m.enabled.is_empty());
        assert!(!m.fog_enabled);
    }

    #[test]
    fn test_apply_only_enabled_fields() {
        let mut patch = Material::empty_mod();
        patch.enabled = AttributeMask::REFLECTION_FACTOR | AttributeMask::SELF_LIGHT;
        patch.reflection_factor = 0.8;
        patch.self_light = Vec3::new(0.5, 0.5, 0.5);
        patch.specular_exponent = 99.0; // not enabled

        let mut target = Material::default();
        target.apply_attributes(&patch);

        assert_eq!(target.reflection_factor, 0.8);
        assert_eq!(target.self_light, Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(target.specular_exponent, 5.0);
        assert!(target.enabled.is_empty());
    }

    #[test]
    fn test_mask_union_is_idempotent() {
        let a = AttributeMask::DEPTH_BIAS | AttributeMask::SPECULAR_COLOR;
        assert_eq!(a | a, a);
        assert!(a.contains(AttributeMask::DEPTH_BIAS));
        assert!(!a.contains(AttributeMask::SELF_LIGHT));
    }

    #[test]
    fn test_highlight() {
        let mut m = Material::default();
        m.highlight();
        assert_eq!(m.diffuse_color_mix, Vec4::new(1.0, 0.0, 1.0, 0.5));
        assert_eq!(m.light_group_mask_bits, 0);
    }
}
