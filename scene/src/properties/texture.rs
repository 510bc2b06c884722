//! Textures, per-slot texture info and sampler settings.

use crate::io::mime;

/// Encoded image bytes plus how to identify them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureData {
    /// Encoded image (PNG, JPEG, ...). Empty when the image is only
    /// referenced through `uri`.
    pub image: Vec<u8>,
    pub mime_type: Option<String>,
    pub uri: Option<String>,
}

impl TextureData {
    pub fn set_image(&mut self, image: Vec<u8>) -> &mut Self {
        self.image = image;
        self
    }

    pub fn set_mime_type(&mut self, mime_type: impl Into<String>) -> &mut Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.uri = Some(uri.into());
        self
    }

    /// Explicit MIME type, or the one sniffed from the image signature.
    pub fn resolved_mime_type(&self) -> Option<&str> {
        self.mime_type
            .as_deref()
            .or_else(|| mime::sniff(&self.image))
    }
}

/// Material slot a texture is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSlot {
    BaseColor,
    MetallicRoughness,
    Normal,
    Occlusion,
    Emissive,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 5] = [
        TextureSlot::BaseColor,
        TextureSlot::MetallicRoughness,
        TextureSlot::Normal,
        TextureSlot::Occlusion,
        TextureSlot::Emissive,
    ];

    /// Relation name used when synthesizing external image names.
    pub fn relation_name(&self) -> &'static str {
        match self {
            TextureSlot::BaseColor => "baseColor",
            TextureSlot::MetallicRoughness => "metallicRoughness",
            TextureSlot::Normal => "normal",
            TextureSlot::Occlusion => "occlusion",
            TextureSlot::Emissive => "emissive",
        }
    }

    pub(crate) fn position(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagFilter {
    Nearest,
    Linear,
}

impl MagFilter {
    pub fn gl_enum(&self) -> u32 {
        match self {
            MagFilter::Nearest => 9728,
            MagFilter::Linear => 9729,
        }
    }

    pub fn from_gl_enum(value: u32) -> Option<Self> {
        match value {
            9728 => Some(MagFilter::Nearest),
            9729 => Some(MagFilter::Linear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl MinFilter {
    pub fn gl_enum(&self) -> u32 {
        match self {
            MinFilter::Nearest => 9728,
            MinFilter::Linear => 9729,
            MinFilter::NearestMipmapNearest => 9984,
            MinFilter::LinearMipmapNearest => 9985,
            MinFilter::NearestMipmapLinear => 9986,
            MinFilter::LinearMipmapLinear => 9987,
        }
    }

    pub fn from_gl_enum(value: u32) -> Option<Self> {
        Some(match value {
            9728 => MinFilter::Nearest,
            9729 => MinFilter::Linear,
            9984 => MinFilter::NearestMipmapNearest,
            9985 => MinFilter::LinearMipmapNearest,
            9986 => MinFilter::NearestMipmapLinear,
            9987 => MinFilter::LinearMipmapLinear,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    ClampToEdge,
    MirroredRepeat,
    #[default]
    Repeat,
}

impl WrapMode {
    pub fn gl_enum(&self) -> u32 {
        match self {
            WrapMode::ClampToEdge => 33071,
            WrapMode::MirroredRepeat => 33648,
            WrapMode::Repeat => 10497,
        }
    }

    pub fn from_gl_enum(value: u32) -> Option<Self> {
        match value {
            33071 => Some(WrapMode::ClampToEdge),
            33648 => Some(WrapMode::MirroredRepeat),
            10497 => Some(WrapMode::Repeat),
            _ => None,
        }
    }
}

/// Sampler state. Compared by value; equal settings share one sampler entry
/// in written files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerSettings {
    pub mag_filter: Option<MagFilter>,
    pub min_filter: Option<MinFilter>,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

impl SamplerSettings {
    pub fn set_wrap(&mut self, wrap_s: WrapMode, wrap_t: WrapMode) -> &mut Self {
        self.wrap_s = wrap_s;
        self.wrap_t = wrap_t;
        self
    }

    pub fn set_filters(
        &mut self,
        mag_filter: Option<MagFilter>,
        min_filter: Option<MinFilter>,
    ) -> &mut Self {
        self.mag_filter = mag_filter;
        self.min_filter = min_filter;
        self
    }
}

/// Per-usage settings of a texture bound to a material slot.
///
/// Two materials may bind the same texture, each with its own
/// `TextureInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextureInfo {
    pub tex_coord: u32,
    pub sampler: SamplerSettings,
}

impl TextureInfo {
    pub fn set_tex_coord(&mut self, tex_coord: u32) -> &mut Self {
        self.tex_coord = tex_coord;
        self
    }

    pub fn set_wrap(&mut self, wrap_s: WrapMode, wrap_t: WrapMode) -> &mut Self {
        self.sampler.set_wrap(wrap_s, wrap_t);
        self
    }

    pub fn set_filters(
        &mut self,
        mag_filter: Option<MagFilter>,
        min_filter: Option<MinFilter>,
    ) -> &mut Self {
        self.sampler.set_filters(mag_filter, min_filter);
        self
    }
}
