//! Per-type element attributes.
//!
//! These structs hold only value attributes. Links to other elements live
//! in the [`Graph`](crate::Graph) and are set through the
//! [`Document`](crate::Document).

mod accessor;
mod buffer;
mod material;
mod mesh;
mod node;
mod root;
mod texture;

pub use accessor::{AccessorData, ComponentType, ElementType};
pub use buffer::BufferData;
pub use material::{AlphaMode, MaterialData};
pub use mesh::{MeshData, PrimitiveData, PrimitiveMode};
pub use node::{NodeData, SceneData};
pub use root::{AssetInfo, RootData};
pub use texture::{
    MagFilter, MinFilter, SamplerSettings, TextureData, TextureInfo, TextureSlot, WrapMode,
};
