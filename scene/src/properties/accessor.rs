//! Typed numeric arrays.

/// Shape of one accessor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementType {
    #[default]
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    pub fn component_count(&self) -> usize {
        match self {
            ElementType::Scalar => 1,
            ElementType::Vec2 => 2,
            ElementType::Vec3 => 3,
            ElementType::Vec4 => 4,
            ElementType::Mat2 => 4,
            ElementType::Mat3 => 9,
            ElementType::Mat4 => 16,
        }
    }

    /// glTF `type` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Scalar => "SCALAR",
            ElementType::Vec2 => "VEC2",
            ElementType::Vec3 => "VEC3",
            ElementType::Vec4 => "VEC4",
            ElementType::Mat2 => "MAT2",
            ElementType::Mat3 => "MAT3",
            ElementType::Mat4 => "MAT4",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "SCALAR" => ElementType::Scalar,
            "VEC2" => ElementType::Vec2,
            "VEC3" => ElementType::Vec3,
            "VEC4" => ElementType::Vec4,
            "MAT2" => ElementType::Mat2,
            "MAT3" => ElementType::Mat3,
            "MAT4" => ElementType::Mat4,
            _ => return None,
        })
    }
}

/// Numeric type of one component, with its GL enum value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    #[default]
    F32,
}

impl ComponentType {
    /// Size in bytes
    pub fn size(&self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }

    pub fn gl_enum(&self) -> u32 {
        match self {
            ComponentType::I8 => 5120,
            ComponentType::U8 => 5121,
            ComponentType::I16 => 5122,
            ComponentType::U16 => 5123,
            ComponentType::U32 => 5125,
            ComponentType::F32 => 5126,
        }
    }

    pub fn from_gl_enum(value: u32) -> Option<Self> {
        Some(match value {
            5120 => ComponentType::I8,
            5121 => ComponentType::U8,
            5122 => ComponentType::I16,
            5123 => ComponentType::U16,
            5125 => ComponentType::U32,
            5126 => ComponentType::F32,
            _ => return None,
        })
    }

    fn read(&self, bytes: &[u8]) -> f64 {
        match self {
            ComponentType::I8 => bytes[0] as i8 as f64,
            ComponentType::U8 => bytes[0] as f64,
            ComponentType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            ComponentType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            ComponentType::U32 => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            ComponentType::F32 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
        }
    }
}

/// Tightly packed little-endian array data.
///
/// The byte offset inside the output buffer is assigned only at write time;
/// the array itself is independent of where it ends up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessorData {
    pub element_type: ElementType,
    pub component_type: ComponentType,
    pub normalized: bool,
    /// Raw element bytes, `count() * element_size()` long.
    pub array: Vec<u8>,
}

impl AccessorData {
    /// Bytes per element
    pub fn element_size(&self) -> usize {
        self.element_type.component_count() * self.component_type.size()
    }

    /// Number of whole elements in the array.
    pub fn count(&self) -> usize {
        self.array.len() / self.element_size()
    }

    /// Bytes covered by whole elements.
    pub fn byte_length(&self) -> usize {
        self.count() * self.element_size()
    }

    pub fn set_element_type(&mut self, element_type: ElementType) -> &mut Self {
        self.element_type = element_type;
        self
    }

    pub fn set_normalized(&mut self, normalized: bool) -> &mut Self {
        self.normalized = normalized;
        self
    }

    /// Replace the array with raw bytes of the given component type.
    pub fn set_raw(&mut self, component_type: ComponentType, bytes: Vec<u8>) -> &mut Self {
        self.component_type = component_type;
        self.array = bytes;
        self
    }

    pub fn set_f32(&mut self, values: &[f32]) -> &mut Self {
        self.set_raw(ComponentType::F32, bytemuck::cast_slice(values).to_vec())
    }

    pub fn set_u32(&mut self, values: &[u32]) -> &mut Self {
        self.set_raw(ComponentType::U32, bytemuck::cast_slice(values).to_vec())
    }

    pub fn set_u16(&mut self, values: &[u16]) -> &mut Self {
        self.set_raw(ComponentType::U16, bytemuck::cast_slice(values).to_vec())
    }

    pub fn set_u8(&mut self, values: &[u8]) -> &mut Self {
        self.set_raw(ComponentType::U8, values.to_vec())
    }

    /// Pack Vec3 data (positions, normals, ...).
    pub fn set_vec3(&mut self, values: &[[f32; 3]]) -> &mut Self {
        self.element_type = ElementType::Vec3;
        self.set_f32(bytemuck::cast_slice(values))
    }

    /// Pack Vec2 data (UVs, ...).
    pub fn set_vec2(&mut self, values: &[[f32; 2]]) -> &mut Self {
        self.element_type = ElementType::Vec2;
        self.set_f32(bytemuck::cast_slice(values))
    }

    /// Pack Vec4 data (colors, tangents, weights, ...).
    pub fn set_vec4(&mut self, values: &[[f32; 4]]) -> &mut Self {
        self.element_type = ElementType::Vec4;
        self.set_f32(bytemuck::cast_slice(values))
    }

    /// Array as `f32` components, `None` for other component types.
    pub fn as_f32(&self) -> Option<Vec<f32>> {
        (self.component_type == ComponentType::F32).then(|| {
            self.words::<4>()
                .map(f32::from_le_bytes)
                .collect()
        })
    }

    pub fn as_u16(&self) -> Option<Vec<u16>> {
        (self.component_type == ComponentType::U16).then(|| {
            self.words::<2>()
                .map(u16::from_le_bytes)
                .collect()
        })
    }

    pub fn as_u32(&self) -> Option<Vec<u32>> {
        (self.component_type == ComponentType::U32).then(|| {
            self.words::<4>()
                .map(u32::from_le_bytes)
                .collect()
        })
    }

    fn words<const N: usize>(&self) -> impl Iterator<Item = [u8; N]> + '_ {
        self.array[..self.byte_length()]
            .chunks_exact(N)
            .map(|chunk| {
                let mut word = [0u8; N];
                word.copy_from_slice(chunk);
                word
            })
    }

    /// Per-component min/max over all elements.
    ///
    /// `None` when empty, or when a bound is NaN or infinite: JSON has no
    /// encoding for those values.
    pub fn bounds(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        if self.count() == 0 {
            return None;
        }
        let components = self.element_type.component_count();
        let size = self.component_type.size();
        let mut min = vec![f64::INFINITY; components];
        let mut max = vec![f64::NEG_INFINITY; components];

        for element in self.array[..self.byte_length()].chunks_exact(self.element_size()) {
            for (i, component) in element.chunks_exact(size).enumerate() {
                let value = self.component_type.read(component);
                min[i] = min[i].min(value);
                max[i] = max[i].max(value);
            }
        }

        let finite = min.iter().chain(&max).all(|v| v.is_finite());
        finite.then_some((min, max))
    }
}
