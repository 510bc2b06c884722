/// Local transform of a node. Children and mesh are links.
///
/// `matrix`, when set, is written instead of the TRS fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
    pub matrix: Option<[f32; 16]>,
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
            matrix: None,
        }
    }
}

impl NodeData {
    pub fn set_translation(&mut self, translation: [f32; 3]) -> &mut Self {
        self.translation = translation;
        self
    }

    pub fn set_rotation(&mut self, rotation: [f32; 4]) -> &mut Self {
        self.rotation = rotation;
        self
    }

    pub fn set_scale(&mut self, scale: [f32; 3]) -> &mut Self {
        self.scale = scale;
        self
    }

    pub fn set_matrix(&mut self, matrix: Option<[f32; 16]>) -> &mut Self {
        self.matrix = matrix;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneData;
