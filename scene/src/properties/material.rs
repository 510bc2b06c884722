use super::texture::{TextureInfo, TextureSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

impl AlphaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlphaMode::Opaque => "OPAQUE",
            AlphaMode::Mask => "MASK",
            AlphaMode::Blend => "BLEND",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPAQUE" => Some(AlphaMode::Opaque),
            "MASK" => Some(AlphaMode::Mask),
            "BLEND" => Some(AlphaMode::Blend),
            _ => None,
        }
    }
}

/// Metallic-roughness PBR material.
///
/// Textures are graph links (see [`Document::set_texture`]); the per-slot
/// [`TextureInfo`] lives here because it belongs to this usage only.
///
/// [`Document::set_texture`]: crate::Document::set_texture
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub normal_scale: f32,
    pub occlusion_strength: f32,
    texture_infos: [TextureInfo; TextureSlot::ALL.len()],
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0; 4],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            emissive_factor: [0.0; 3],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            texture_infos: [TextureInfo::default(); TextureSlot::ALL.len()],
        }
    }
}

impl MaterialData {
    pub fn set_base_color_factor(&mut self, factor: [f32; 4]) -> &mut Self {
        self.base_color_factor = factor;
        self
    }

    pub fn set_metallic_factor(&mut self, factor: f32) -> &mut Self {
        self.metallic_factor = factor;
        self
    }

    pub fn set_roughness_factor(&mut self, factor: f32) -> &mut Self {
        self.roughness_factor = factor;
        self
    }

    pub fn set_emissive_factor(&mut self, factor: [f32; 3]) -> &mut Self {
        self.emissive_factor = factor;
        self
    }

    pub fn set_alpha_mode(&mut self, mode: AlphaMode) -> &mut Self {
        self.alpha_mode = mode;
        self
    }

    pub fn set_alpha_cutoff(&mut self, cutoff: f32) -> &mut Self {
        self.alpha_cutoff = cutoff;
        self
    }

    pub fn set_double_sided(&mut self, double_sided: bool) -> &mut Self {
        self.double_sided = double_sided;
        self
    }

    pub fn set_normal_scale(&mut self, scale: f32) -> &mut Self {
        self.normal_scale = scale;
        self
    }

    pub fn set_occlusion_strength(&mut self, strength: f32) -> &mut Self {
        self.occlusion_strength = strength;
        self
    }

    pub fn texture_info(&self, slot: TextureSlot) -> &TextureInfo {
        &self.texture_infos[slot.position()]
    }

    pub fn texture_info_mut(&mut self, slot: TextureSlot) -> &mut TextureInfo {
        &mut self.texture_infos[slot.position()]
    }
}
