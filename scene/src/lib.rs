//! Nether-Scene: glTF 2.0 document model with graph-tracked resources
//!
//! A [`Document`] owns a [`Graph`] of elements (scenes, nodes, meshes,
//! primitives, materials, textures, accessors and buffers). Every reference
//! between elements is a graph link, so the document always knows who uses
//! what: elements can be listed by parent, detached, disposed or deep-cloned
//! without dangling references.
//!
//! # Key Features
//!
//! - **Typed handles**: [`Node`], [`Mesh`], [`Texture`]... are cheap ids checked at the type level
//! - **Reachability**: only elements reachable from the [`Root`] are written
//! - **Packing**: one `.glb`, `.gltf` + external files, or `.gltf` with data URIs
//! - **Deduplication**: identical images, samplers and texture entries are written once
//!
//! # Usage
//!
//! ```
//! use nether_scene::{Document, WriteOptions, write};
//!
//! let mut doc = Document::new();
//! let scene = doc.create_scene("main");
//! let node = doc.create_node("cube");
//! doc.add_scene_node(scene, node).unwrap();
//!
//! let output = write(&doc, &WriteOptions::binary()).unwrap();
//! assert!(output.glb.is_some());
//! ```

pub mod document;
pub mod element;
pub mod error;
pub mod graph;
pub mod io;
pub mod properties;

pub use document::Document;
pub use element::{
    Accessor, Buffer, Element, ElementData, ElementKind, Extras, Handle, Material, Mesh, Node,
    Primitive, Root, Scene, Texture,
};
pub use error::{Error, Result};
pub use graph::{CloneMap, ElementId, Graph, GraphId, Link, LinkKind, Relation};
pub use io::{
    ByteResolver, FsResolver, MemoryResolver, NoResolver, Packing, WriteOptions, WriteOutput,
    read, read_json, write,
};
pub use properties::{
    AccessorData, AlphaMode, AssetInfo, BufferData, ComponentType, ElementType, MagFilter,
    MaterialData, MeshData, MinFilter, NodeData, PrimitiveData, PrimitiveMode, RootData,
    SamplerSettings, SceneData, TextureData, TextureInfo, TextureSlot, WrapMode,
};
