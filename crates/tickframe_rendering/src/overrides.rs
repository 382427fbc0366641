//! # Persisted Overrides
//!
//! Document models for the three override files: texture mods, geo layout
//! mods and level lights. Reading and writing the files is left to the
//! host; these types convert between documents and the live registries and
//! round-trip through TOML.
//!
//! Material mods are sparse: only fields whose attribute bit is enabled are
//! written, and loading a field enables its bit. Older documents may carry
//! `normalMapScale` (read as `uvDetailScale`) and `specularIntensity`
//! (read as a grey specular color, or intensity × diffuse for lights); the
//! current keys win when both are present.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tickframe_core::NameRegistry;
use tickframe_shared::constants::{MAX_AREAS, MAX_LEVELS};
use tickframe_shared::{Vec3, Vec4};
use tracing::warn;

use crate::error::RenderResult;
use crate::light::{LevelLights, Light};
use crate::material::{AttributeMask, Material};
use crate::mods::{Mod, ModRegistry};

/// Parses any override document from TOML.
///
/// # Errors
///
/// Returns an error if the text is not a valid document.
pub fn from_toml_str<T: DeserializeOwned>(text: &str) -> RenderResult<T> {
    Ok(toml::from_str(text)?)
}

/// Writes any override document as TOML.
///
/// # Errors
///
/// Returns an error if the document cannot be represented in TOML.
pub fn to_toml_string<T: Serialize>(doc: &T) -> RenderResult<String> {
    Ok(toml::to_string_pretty(doc)?)
}

/// Sparse material override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct MaterialModDoc {
    #[serde(skip_serializing)]
    pub normal_map_scale: Option<f32>,
    #[serde(skip_serializing)]
    pub specular_intensity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_normal_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv_detail_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_fresnel_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_shine_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refraction_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specular_color: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specular_exponent: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solid_alpha_multiplier: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_alpha_multiplier: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_bias: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_ray_bias: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_light: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_group_mask_bits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diffuse_color_mix: Option<[f32; 4]>,
}

fn load_field<T: Copy>(value: Option<T>, bit: AttributeMask, mask: &mut AttributeMask, dst: &mut T) {
    if let Some(value) = value {
        *dst = value;
        *mask |= bit;
    }
}

fn save_field<T>(material: &Material, bit: AttributeMask, value: T) -> Option<T> {
    material.enabled.contains(bit).then_some(value)
}

impl MaterialModDoc {
    /// Material override with every present field enabled.
    #[must_use]
    pub fn to_material(&self) -> Material {
        let mut m = Material::empty_mod();
        let mut mask = AttributeMask::NONE;

        load_field(self.normal_map_scale, AttributeMask::UV_DETAIL_SCALE, &mut mask, &mut m.uv_detail_scale);
        if let Some(intensity) = self.specular_intensity {
            m.specular_color = Vec3::new(intensity, intensity, intensity);
            mask |= AttributeMask::SPECULAR_COLOR;
        }

        load_field(self.ignore_normal_factor, AttributeMask::IGNORE_NORMAL_FACTOR, &mut mask, &mut m.ignore_normal_factor);
        load_field(self.uv_detail_scale, AttributeMask::UV_DETAIL_SCALE, &mut mask, &mut m.uv_detail_scale);
        load_field(self.reflection_factor, AttributeMask::REFLECTION_FACTOR, &mut mask, &mut m.reflection_factor);
        load_field(
            self.reflection_fresnel_factor,
            AttributeMask::REFLECTION_FRESNEL_FACTOR,
            &mut mask,
            &mut m.reflection_fresnel_factor,
        );
        load_field(
            self.reflection_shine_factor,
            AttributeMask::REFLECTION_SHINE_FACTOR,
            &mut mask,
            &mut m.reflection_shine_factor,
        );
        load_field(self.refraction_factor, AttributeMask::REFRACTION_FACTOR, &mut mask, &mut m.refraction_factor);
        load_field(
            self.specular_color.map(Vec3::from_array),
            AttributeMask::SPECULAR_COLOR,
            &mut mask,
            &mut m.specular_color,
        );
        load_field(self.specular_exponent, AttributeMask::SPECULAR_EXPONENT, &mut mask, &mut m.specular_exponent);
        load_field(
            self.solid_alpha_multiplier,
            AttributeMask::SOLID_ALPHA_MULTIPLIER,
            &mut mask,
            &mut m.solid_alpha_multiplier,
        );
        load_field(
            self.shadow_alpha_multiplier,
            AttributeMask::SHADOW_ALPHA_MULTIPLIER,
            &mut mask,
            &mut m.shadow_alpha_multiplier,
        );
        load_field(self.depth_bias, AttributeMask::DEPTH_BIAS, &mut mask, &mut m.depth_bias);
        load_field(self.shadow_ray_bias, AttributeMask::SHADOW_RAY_BIAS, &mut mask, &mut m.shadow_ray_bias);
        load_field(self.self_light.map(Vec3::from_array), AttributeMask::SELF_LIGHT, &mut mask, &mut m.self_light);
        load_field(
            self.light_group_mask_bits,
            AttributeMask::LIGHT_GROUP_MASK_BITS,
            &mut mask,
            &mut m.light_group_mask_bits,
        );
        load_field(
            self.diffuse_color_mix.map(Vec4::from_array),
            AttributeMask::DIFFUSE_COLOR_MIX,
            &mut mask,
            &mut m.diffuse_color_mix,
        );

        m.enabled = mask;
        m
    }

    /// Document holding only the enabled fields of `m`.
    #[must_use]
    pub fn from_material(m: &Material) -> Self {
        Self {
            normal_map_scale: None,
            specular_intensity: None,
            ignore_normal_factor: save_field(m, AttributeMask::IGNORE_NORMAL_FACTOR, m.ignore_normal_factor),
            uv_detail_scale: save_field(m, AttributeMask::UV_DETAIL_SCALE, m.uv_detail_scale),
            reflection_factor: save_field(m, AttributeMask::REFLECTION_FACTOR, m.reflection_factor),
            reflection_fresnel_factor: save_field(m, AttributeMask::REFLECTION_FRESNEL_FACTOR, m.reflection_fresnel_factor),
            reflection_shine_factor: save_field(m, AttributeMask::REFLECTION_SHINE_FACTOR, m.reflection_shine_factor),
            refraction_factor: save_field(m, AttributeMask::REFRACTION_FACTOR, m.refraction_factor),
            specular_color: save_field(m, AttributeMask::SPECULAR_COLOR, m.specular_color.to_array()),
            specular_exponent: save_field(m, AttributeMask::SPECULAR_EXPONENT, m.specular_exponent),
            solid_alpha_multiplier: save_field(m, AttributeMask::SOLID_ALPHA_MULTIPLIER, m.solid_alpha_multiplier),
            shadow_alpha_multiplier: save_field(m, AttributeMask::SHADOW_ALPHA_MULTIPLIER, m.shadow_alpha_multiplier),
            depth_bias: save_field(m, AttributeMask::DEPTH_BIAS, m.depth_bias),
            shadow_ray_bias: save_field(m, AttributeMask::SHADOW_RAY_BIAS, m.shadow_ray_bias),
            self_light: save_field(m, AttributeMask::SELF_LIGHT, m.self_light.to_array()),
            light_group_mask_bits: save_field(m, AttributeMask::LIGHT_GROUP_MASK_BITS, m.light_group_mask_bits),
            diffuse_color_mix: save_field(m, AttributeMask::DIFFUSE_COLOR_MIX, m.diffuse_color_mix.to_array()),
        }
    }
}

/// Light definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct LightDoc {
    pub position: [f32; 3],
    pub attenuation_radius: f32,
    pub point_radius: f32,
    pub diffuse_color: [f32; 3],
    #[serde(default, skip_serializing)]
    pub specular_intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_color: Option<[f32; 3]>,
    #[serde(default)]
    pub shadow_offset: f32,
    #[serde(default)]
    pub attenuation_exponent: f32,
    #[serde(default)]
    pub flicker_intensity: f32,
    #[serde(default)]
    pub group_bits: u32,
}

impl LightDoc {
    /// Light described by this document.
    #[must_use]
    pub fn to_light(&self) -> Light {
        let diffuse = Vec3::from_array(self.diffuse_color);
        let mut specular = Vec3::ZERO;
        if let Some(intensity) = self.specular_intensity {
            specular = diffuse * intensity;
        }
        if let Some(color) = self.specular_color {
            specular = Vec3::from_array(color);
        }
        Light {
            position: Vec3::from_array(self.position),
            attenuation_radius: self.attenuation_radius,
            point_radius: self.point_radius,
            diffuse_color: diffuse,
            specular_color: specular,
            shadow_offset: self.shadow_offset,
            attenuation_exponent: self.attenuation_exponent,
            flicker_intensity: self.flicker_intensity,
            group_bits: self.group_bits,
        }
    }

    /// Document describing `light`.
    #[must_use]
    pub fn from_light(light: &Light) -> Self {
        Self {
            position: light.position.to_array(),
            attenuation_radius: light.attenuation_radius,
            point_radius: light.point_radius,
            diffuse_color: light.diffuse_color.to_array(),
            specular_intensity: None,
            specular_color: Some(light.specular_color.to_array()),
            shadow_offset: light.shadow_offset,
            attenuation_exponent: light.attenuation_exponent,
            flicker_intensity: light.flicker_intensity,
            group_bits: light.group_bits,
        }
    }
}

/// Reference to a texture by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRefDoc {
    /// Texture name.
    pub name: String,
}

/// One texture's overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureModDoc {
    /// Texture name.
    pub name: String,
    /// Other names that resolve to this texture.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Material override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_mod: Option<MaterialModDoc>,
    /// Emitted light.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_mod: Option<LightDoc>,
    /// Normal map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_map_mod: Option<MapRefDoc>,
    /// Specular map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_map_mod: Option<MapRefDoc>,
}

/// Texture mods file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureModsDocument {
    /// Per-texture entries.
    #[serde(default)]
    pub textures: Vec<TextureModDoc>,
}

/// One geo layout's overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLayoutModDoc {
    /// Geo layout name.
    pub name: String,
    /// Present and false to draw without interpolation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpolation_enabled: Option<bool>,
    /// Material override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_mod: Option<MaterialModDoc>,
    /// Emitted light.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_mod: Option<LightDoc>,
    /// Normal map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_map_mod: Option<MapRefDoc>,
    /// Specular map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_map_mod: Option<MapRefDoc>,
}

/// Geo layout mods file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLayoutModsDocument {
    /// Per-layout entries.
    #[serde(default)]
    pub geo_layouts: Vec<GeoLayoutModDoc>,
}

/// Lights of one area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDoc {
    /// Area index.
    pub id: usize,
    /// Static lights.
    #[serde(default)]
    pub lights: Vec<LightDoc>,
}

/// Areas of one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDoc {
    /// Level index.
    pub id: usize,
    /// Areas.
    #[serde(default)]
    pub areas: Vec<AreaDoc>,
}

/// Level lights file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelLightsDocument {
    /// Levels.
    #[serde(default)]
    pub levels: Vec<LevelDoc>,
}

fn map_ref(names: &NameRegistry, hash: u64) -> Option<MapRefDoc> {
    if hash == 0 {
        return None;
    }
    names.name_of(hash).map(|name| MapRefDoc { name: name.to_owned() })
}

fn map_hash(names: &mut NameRegistry, map: Option<&MapRefDoc>) -> u64 {
    map.map_or(0, |map| names.register(&map.name))
}

fn mod_parts(
    names: &mut NameRegistry,
    material: Option<&MaterialModDoc>,
    light: Option<&LightDoc>,
    normal: Option<&MapRefDoc>,
    specular: Option<&MapRefDoc>,
) -> Mod {
    Mod {
        material: material.map(MaterialModDoc::to_material),
        light: light.map(LightDoc::to_light),
        normal_map_hash: map_hash(names, normal),
        specular_map_hash: map_hash(names, specular),
        interpolation_enabled: true,
    }
}

/// Loads texture mods, registering every name mentioned in `names`.
/// Returns how many mods were loaded.
pub fn import_texture_mods(doc: &TextureModsDocument, mods: &mut ModRegistry, names: &mut NameRegistry) -> usize {
    for entry in &doc.textures {
        let hash = names.register(&entry.name);
        let m = mod_parts(
            names,
            entry.material_mod.as_ref(),
            entry.light_mod.as_ref(),
            entry.normal_map_mod.as_ref(),
            entry.specular_map_mod.as_ref(),
        );
        mods.set_texture_mod(hash, m);
        for alias in &entry.aliases {
            let alias_hash = names.register(alias);
            mods.aliases_mut().insert(alias_hash, hash);
        }
    }
    doc.textures.len()
}

/// Texture mods of every named texture, in name order.
#[must_use]
pub fn export_texture_mods(mods: &ModRegistry, names: &NameRegistry) -> TextureModsDocument {
    let textures = names
        .iter()
        .filter_map(|(name, hash)| {
            let m = mods.texture_mod(hash)?;
            Some(TextureModDoc {
                name: name.to_owned(),
                aliases: mods
                    .aliases()
                    .aliases_of(hash)
                    .iter()
                    .filter_map(|&alias| names.name_of(alias).map(str::to_owned))
                    .collect(),
                material_mod: m.material.as_ref().map(MaterialModDoc::from_material),
                light_mod: m.light.as_ref().map(LightDoc::from_light),
                normal_map_mod: map_ref(names, m.normal_map_hash),
                specular_map_mod: map_ref(names, m.specular_map_hash),
            })
        })
        .collect();
    TextureModsDocument { textures }
}

/// Loads geo layout mods for layouts already registered in `mods`.
/// Unknown layout names are skipped with a warning. Returns how many mods
/// were loaded.
pub fn import_geo_layout_mods(doc: &GeoLayoutModsDocument, mods: &mut ModRegistry, names: &mut NameRegistry) -> usize {
    let mut loaded = 0;
    for entry in &doc.geo_layouts {
        let Some(handle) = mods.find_geo_layout(&entry.name) else {
            warn!(name = %entry.name, "geo layout not recognized, mod skipped");
            continue;
        };
        let mut m = mod_parts(
            names,
            entry.material_mod.as_ref(),
            entry.light_mod.as_ref(),
            entry.normal_map_mod.as_ref(),
            entry.specular_map_mod.as_ref(),
        );
        m.interpolation_enabled = entry.interpolation_enabled.unwrap_or(true);
        if mods.set_geo_layout_mod(handle, m) {
            loaded += 1;
        }
    }
    loaded
}

/// Geo layout mods of every registered layout, in name order.
#[must_use]
pub fn export_geo_layout_mods(mods: &ModRegistry, names: &NameRegistry) -> GeoLayoutModsDocument {
    let geo_layouts = mods
        .geo_layouts()
        .filter_map(|(name, handle)| {
            let m = mods.geo_layout_mod(handle)?;
            Some(GeoLayoutModDoc {
                name: name.to_owned(),
                interpolation_enabled: (!m.interpolation_enabled).then_some(false),
                material_mod: m.material.as_ref().map(MaterialModDoc::from_material),
                light_mod: m.light.as_ref().map(LightDoc::from_light),
                normal_map_mod: map_ref(names, m.normal_map_hash),
                specular_map_mod: map_ref(names, m.specular_map_hash),
            })
        })
        .collect();
    GeoLayoutModsDocument { geo_layouts }
}

/// Replaces the static lights of every area listed in `doc`.
///
/// # Errors
///
/// Returns an error if a level or area id is out of range or an area lists
/// too many lights. Areas before the failing one stay loaded.
pub fn import_level_lights(doc: &LevelLightsDocument, table: &mut LevelLights) -> RenderResult<()> {
    for level in &doc.levels {
        for area in &level.areas {
            let lights = area.lights.iter().map(LightDoc::to_light).collect();
            table.set(level.id, area.id, lights)?;
        }
    }
    Ok(())
}

/// Every level and area of `table`.
///
/// # Errors
///
/// Never fails for a table built through [`LevelLights`]; the result is
/// kept for symmetry with the import.
pub fn export_level_lights(table: &LevelLights) -> RenderResult<LevelLightsDocument> {
    let mut levels = Vec::with_capacity(MAX_LEVELS);
    for level in 0..MAX_LEVELS {
        let mut areas = Vec::with_capacity(MAX_AREAS);
        for area in 0..MAX_AREAS {
            let lights = table.get(level, area)?.iter().map(LightDoc::from_light).collect();
            areas.push(AreaDoc { id: area, lights });
        }
        levels.push(LevelDoc { id: level, areas });
    }
    Ok(LevelLightsDocument { levels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use tickframe_core::hash_name;

    #[test]
    fn test_material_doc_enables_present_fields() {
        let doc: MaterialModDoc = from_toml_str("reflectionFactor = 0.5\nselfLight = [1.0, 0.0, 0.0]\n").unwrap();
        let m = doc.to_material();
        assert_eq!(m.enabled, AttributeMask::REFLECTION_FACTOR | AttributeMask::SELF_LIGHT);
        assert_eq!(m.reflection_factor, 0.5);
        assert_eq!(m.self_light, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_legacy_material_keys() {
        let doc: MaterialModDoc = from_toml_str("normalMapScale = 2.0\nspecularIntensity = 0.25\n").unwrap();
        let m = doc.to_material();
        assert_eq!(m.uv_detail_scale, 2.0);
        assert_eq!(m.specular_color, Vec3::new(0.25, 0.25, 0.25));
        assert!(m.enabled.contains(AttributeMask::UV_DETAIL_SCALE | AttributeMask::SPECULAR_COLOR));

        let doc: MaterialModDoc = from_toml_str("normalMapScale = 2.0\nuvDetailScale = 3.0\n").unwrap();
        assert_eq!(doc.to_material().uv_detail_scale, 3.0);
    }

    #[test]
    fn test_legacy_light_specular_intensity() {
        let text = r"
            position = [0.0, 1.0, 2.0]
            attenuationRadius = 100.0
            pointRadius = 5.0
            diffuseColor = [1.0, 0.5, 0.0]
            specularIntensity = 0.5
            groupBits = 1
        ";
        let light = from_toml_str::<LightDoc>(text).unwrap().to_light();
        assert_eq!(light.specular_color, Vec3::new(0.5, 0.25, 0.0));
        assert_eq!(light.position, Vec3::new(0.0, 1.0, 2.0));
    }

    #[test]
    fn test_export_writes_only_enabled_fields() {
        let mut m = Material::empty_mod();
        m.enabled = AttributeMask::DEPTH_BIAS;
        m.depth_bias = 1.5;
        m.reflection_factor = 0.9;
        let doc = MaterialModDoc::from_material(&m);
        assert_eq!(doc.depth_bias, Some(1.5));
        assert_eq!(doc.reflection_factor, None);
    }

    #[test]
    fn test_texture_mods_round_trip() {
        let text = r#"
            [[textures]]
            name = "grass"
            aliases = ["grass_old"]

            [textures.materialMod]
            reflectionFactor = 0.25

            [textures.normalMapMod]
            name = "grass_normal"

            [textures.specularMapMod]
            name = "grass_spec"
        "#;
        let doc: TextureModsDocument = from_toml_str(text).unwrap();
        let mut mods = ModRegistry::new();
        let mut names = NameRegistry::new();
        assert_eq!(import_texture_mods(&doc, &mut mods, &mut names), 1);

        let grass = mods.resolve_texture_mod(hash_name("grass_old")).unwrap();
        assert_eq!(grass.normal_map_hash, hash_name("grass_normal"));
        assert_eq!(grass.specular_map_hash, hash_name("grass_spec"));

        let exported = export_texture_mods(&mods, &names);
        assert_eq!(exported.textures.len(), 1);
        assert_eq!(exported.textures[0].aliases, vec!["grass_old".to_owned()]);
        assert_eq!(
            exported.textures[0].specular_map_mod,
            Some(MapRefDoc { name: "grass_spec".to_owned() })
        );

        let reparsed: TextureModsDocument = from_toml_str(&to_toml_string(&exported).unwrap()).unwrap();
        assert_eq!(reparsed, exported);
    }

    #[test]
    fn test_unknown_geo_layout_skipped() {
        let text = r#"
            [[geoLayouts]]
            name = "known"
            interpolationEnabled = false

            [[geoLayouts]]
            name = "unknown"
        "#;
        let doc: GeoLayoutModsDocument = from_toml_str(text).unwrap();
        let mut mods = ModRegistry::new();
        let mut names = NameRegistry::new();
        let known = mods.geo_layout("known");

        assert_eq!(import_geo_layout_mods(&doc, &mut mods, &mut names), 1);
        assert!(!mods.geo_layout_mod(known).unwrap().interpolation_enabled);
        assert!(mods.find_geo_layout("unknown").is_none());

        let exported = export_geo_layout_mods(&mods, &names);
        assert_eq!(exported.geo_layouts[0].interpolation_enabled, Some(false));
    }

    #[test]
    fn test_level_lights_import_and_range() {
        let text = r"
            [[levels]]
            id = 3

            [[levels.areas]]
            id = 1

            [[levels.areas.lights]]
            position = [1.0, 2.0, 3.0]
            attenuationRadius = 50.0
            pointRadius = 1.0
            diffuseColor = [1.0, 1.0, 1.0]
        ";
        let doc: LevelLightsDocument = from_toml_str(text).unwrap();
        let mut table = LevelLights::new();
        import_level_lights(&doc, &mut table).unwrap();
        assert_eq!(table.get(3, 1).unwrap().len(), 1);
        assert_eq!(table.get(3, 0).unwrap().len(), 2);

        let bad = LevelLightsDocument {
            levels: vec![LevelDoc {
                id: MAX_LEVELS,
                areas: vec![AreaDoc { id: 0, lights: Vec::new() }],
            }],
        };
        assert!(matches!(
            import_level_lights(&bad, &mut table),
            Err(RenderError::LevelOutOfRange { .. })
        ));

        let exported = export_level_lights(&table).unwrap();
        assert_eq!(exported.levels.len(), MAX_LEVELS);
        assert_eq!(exported.levels[3].areas[1].lights.len(), 1);
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let result: RenderResult<TextureModsDocument> = from_toml_str("textures = 5");
        assert!(matches!(result, Err(RenderError::Parse(_))));
    }
}
