//! Element variants and typed handles.

use serde_json::{Map, Value};

use crate::graph::ElementId;
use crate::properties::{
    AccessorData, BufferData, MaterialData, MeshData, NodeData, PrimitiveData, RootData, SceneData,
    TextureData,
};

/// Caller-defined data attached to an element, written as glTF `extras`.
pub type Extras = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Root,
    Scene,
    Node,
    Mesh,
    Primitive,
    Material,
    Texture,
    Accessor,
    Buffer,
}

impl ElementKind {
    /// Top-level kinds are attached to Root when created.
    pub fn is_top_level(&self) -> bool {
        !matches!(self, ElementKind::Root | ElementKind::Primitive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Root => "root",
            ElementKind::Scene => "scene",
            ElementKind::Node => "node",
            ElementKind::Mesh => "mesh",
            ElementKind::Primitive => "primitive",
            ElementKind::Material => "material",
            ElementKind::Texture => "texture",
            ElementKind::Accessor => "accessor",
            ElementKind::Buffer => "buffer",
        }
    }
}

/// Per-type attributes. Links never live here; the graph owns them.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementData {
    Root(RootData),
    Scene(SceneData),
    Node(NodeData),
    Mesh(MeshData),
    Primitive(PrimitiveData),
    Material(MaterialData),
    Texture(TextureData),
    Accessor(AccessorData),
    Buffer(BufferData),
}

impl ElementData {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementData::Root(_) => ElementKind::Root,
            ElementData::Scene(_) => ElementKind::Scene,
            ElementData::Node(_) => ElementKind::Node,
            ElementData::Mesh(_) => ElementKind::Mesh,
            ElementData::Primitive(_) => ElementKind::Primitive,
            ElementData::Material(_) => ElementKind::Material,
            ElementData::Texture(_) => ElementKind::Texture,
            ElementData::Accessor(_) => ElementKind::Accessor,
            ElementData::Buffer(_) => ElementKind::Buffer,
        }
    }
}

/// One node of the resource graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: Option<String>,
    pub extras: Extras,
    pub data: ElementData,
}

impl Element {
    pub fn new(data: ElementData) -> Self {
        Self {
            name: None,
            extras: Extras::new(),
            data,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn kind(&self) -> ElementKind {
        self.data.kind()
    }
}

/// Typed reference to an element of a known kind.
///
/// Handles are plain ids; they stay valid after the element is disposed and
/// simply resolve to `None` from then on.
pub trait Handle: Copy + Into<ElementId> {
    type Data;
    const KIND: ElementKind;

    #[doc(hidden)]
    fn from_id(id: ElementId) -> Self;

    fn data(data: &ElementData) -> Option<&Self::Data>;

    fn data_mut(data: &mut ElementData) -> Option<&mut Self::Data>;
}

macro_rules! handles {
    ($($(#[$meta:meta])* $name:ident => $data:ident,)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(ElementId);

            impl $name {
                pub fn id(&self) -> ElementId {
                    self.0
                }
            }

            impl From<$name> for ElementId {
                fn from(handle: $name) -> ElementId {
                    handle.0
                }
            }

            impl Handle for $name {
                type Data = $data;
                const KIND: ElementKind = ElementKind::$name;

                fn from_id(id: ElementId) -> Self {
                    $name(id)
                }

                fn data(data: &ElementData) -> Option<&$data> {
                    match data {
                        ElementData::$name(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn data_mut(data: &mut ElementData) -> Option<&mut $data> {
                    match data {
                        ElementData::$name(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

handles! {
    /// The document root.
    Root => RootData,
    Scene => SceneData,
    Node => NodeData,
    Mesh => MeshData,
    /// A draw call of a mesh. Not top-level; owned by its mesh.
    Primitive => PrimitiveData,
    Material => MaterialData,
    Texture => TextureData,
    Accessor => AccessorData,
    Buffer => BufferData,
}
