//! glTF 2.0 reading and writing.
//!
//! - [`read`] / [`read_json`]: `.glb` or `.gltf` bytes into a [`Document`](crate::Document)
//! - [`write`]: a document into JSON plus binary payloads, laid out per [`Packing`]
//!
//! External files are never touched directly while reading; they come from a
//! [`ByteResolver`].

pub mod glb;
pub(crate) mod mime;
mod options;
mod reader;
mod resolver;
pub mod wire;
mod writer;

pub use options::{Packing, WriteOptions};
pub use reader::{read, read_gltf, read_json};
pub use resolver::{ByteResolver, FsResolver, MemoryResolver, NoResolver};
pub use writer::{WriteOutput, write};
