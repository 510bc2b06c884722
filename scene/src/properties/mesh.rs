/// A mesh carries no attributes of its own; its primitives are links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    pub fn gl_enum(&self) -> u32 {
        match self {
            PrimitiveMode::Points => 0,
            PrimitiveMode::Lines => 1,
            PrimitiveMode::LineLoop => 2,
            PrimitiveMode::LineStrip => 3,
            PrimitiveMode::Triangles => 4,
            PrimitiveMode::TriangleStrip => 5,
            PrimitiveMode::TriangleFan => 6,
        }
    }

    pub fn from_gl_enum(value: u32) -> Option<Self> {
        Some(match value {
            0 => PrimitiveMode::Points,
            1 => PrimitiveMode::Lines,
            2 => PrimitiveMode::LineLoop,
            3 => PrimitiveMode::LineStrip,
            4 => PrimitiveMode::Triangles,
            5 => PrimitiveMode::TriangleStrip,
            6 => PrimitiveMode::TriangleFan,
            _ => return None,
        })
    }
}

/// Draw call geometry; attributes, indices and material are links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimitiveData {
    pub mode: PrimitiveMode,
}

impl PrimitiveData {
    pub fn set_mode(&mut self, mode: PrimitiveMode) -> &mut Self {
        self.mode = mode;
        self
    }
}
