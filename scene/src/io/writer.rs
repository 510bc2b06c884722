//! Document -> glTF JSON + packed binary.
//!
//! Writing runs in fixed steps over the elements reachable from Root:
//! index assignment, image collection (with dedup), buffer packing, naming of
//! external files, then one `build_*` step per JSON array. The document is
//! only borrowed, so a failed write leaves it untouched.

use std::collections::BTreeMap;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hashbrown::{HashMap, HashSet};
use serde_json::Value;
use xxhash_rust::xxh3::xxh3_64;

use crate::document::Document;
use crate::element::{Accessor, Buffer, Element, Handle, Material, Mesh, Node, Scene, Texture};
use crate::error::{Error, Result};
use crate::graph::{ElementId, Relation};
use crate::io::glb;
use crate::io::mime;
use crate::io::options::{Packing, WriteOptions};
use crate::io::resolver::MemoryResolver;
use crate::io::wire::{
    AccessorJson, AssetJson, BufferJson, BufferViewJson, GltfJson, ImageJson, MaterialJson,
    MeshJson, NodeJson, PbrJson, PrimitiveJson, SamplerJson, SceneJson, TARGET_INDICES,
    TARGET_VERTICES, TextureInfoJson, TextureJson,
};
use crate::properties::{AlphaMode, MaterialData, PrimitiveMode, SamplerSettings, TextureSlot};

/// Result of [`write`]: the JSON description plus every byte payload that
/// lives outside it.
#[derive(Debug, Clone)]
pub struct WriteOutput {
    pub json: GltfJson,
    /// Complete `.glb` file for [`Packing::Binary`].
    pub glb: Option<Vec<u8>>,
    /// External files by URI (buffers and images), relative to the main file.
    pub resources: BTreeMap<String, Vec<u8>>,
}

impl WriteOutput {
    /// Bytes of the main file: the GLB container, or pretty-printed JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match &self.glb {
            Some(glb) => Ok(glb.clone()),
            None => Ok(serde_json::to_vec_pretty(&self.json)?),
        }
    }

    /// Resolver serving [`resources`](Self::resources), for reading the
    /// output back without touching the filesystem.
    pub fn resolver(&self) -> MemoryResolver {
        MemoryResolver::from(self.resources.clone())
    }

    /// Write the main file to `path` and every resource next to it.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        for (uri, bytes) in &self.resources {
            std::fs::write(dir.join(uri), bytes)?;
        }
        tracing::info!(
            "Saved {} (+{} resources)",
            path.display(),
            self.resources.len()
        );
        Ok(())
    }
}

/// Serialize every element reachable from Root.
///
/// Output is deterministic: the same document and options always give the
/// same indices, offsets and names.
pub fn write(doc: &Document, options: &WriteOptions) -> Result<WriteOutput> {
    let mut ctx = WriteContext::new(doc, options);
    ctx.collect_images()?;
    ctx.plan_buffers();
    ctx.pack_accessors();
    ctx.pack_images();
    ctx.name_images();
    ctx.build_buffers()?;
    ctx.build_materials();
    ctx.build_meshes();
    ctx.build_nodes();
    ctx.build_scenes();
    ctx.build_asset();
    ctx.finish()
}

// ---------------------------------------------------------------------------
// Write context
// ---------------------------------------------------------------------------

/// Reachable element together with its attributes.
struct Item<'a, H: Handle> {
    handle: H,
    element: &'a Element,
    data: &'a H::Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Only the texture's URI is written.
    UriOnly,
    /// Bytes written as an external file.
    File,
    /// Bytes packed into a buffer view.
    View,
}

struct ImagePlan {
    /// First texture carrying this image.
    texture: usize,
    mime_type: Option<String>,
    placement: Placement,
}

struct WriteContext<'a> {
    doc: &'a Document,
    options: &'a WriteOptions,
    reachable: HashSet<ElementId>,
    json: GltfJson,

    scenes: Vec<Item<'a, Scene>>,
    nodes: Vec<Item<'a, Node>>,
    meshes: Vec<Item<'a, Mesh>>,
    materials: Vec<Item<'a, Material>>,
    textures: Vec<Item<'a, Texture>>,
    accessors: Vec<Item<'a, Accessor>>,
    buffer_items: Vec<Item<'a, Buffer>>,
    index: HashMap<ElementId, usize>,

    // Image dedup: content hash -> candidate image indices
    image_hashes: HashMap<u64, Vec<usize>>,
    images: Vec<ImagePlan>,
    texture_image: HashMap<ElementId, usize>,
    sampler_map: HashMap<SamplerSettings, usize>,
    // (image, sampler) -> glTF texture index
    texture_map: HashMap<(usize, usize), usize>,

    // Packed bytes per output buffer
    buffers: Vec<Vec<u8>>,
    bin: Option<Vec<u8>>,

    taken_names: HashSet<String>,
    name_counters: HashMap<&'static str, usize>,
    buffer_counter: usize,
    resources: BTreeMap<String, Vec<u8>>,
}

impl<'a> WriteContext<'a> {
    fn new(doc: &'a Document, options: &'a WriteOptions) -> Self {
        let reachable = doc.reachable();
        let mut ctx = Self {
            doc,
            options,
            scenes: collect(doc, &reachable),
            nodes: collect(doc, &reachable),
            meshes: collect(doc, &reachable),
            materials: collect(doc, &reachable),
            textures: collect(doc, &reachable),
            accessors: collect(doc, &reachable),
            buffer_items: collect(doc, &reachable),
            reachable,
            json: GltfJson::default(),
            index: HashMap::new(),
            image_hashes: HashMap::new(),
            images: Vec::new(),
            texture_image: HashMap::new(),
            sampler_map: HashMap::new(),
            texture_map: HashMap::new(),
            buffers: Vec::new(),
            bin: None,
            taken_names: HashSet::new(),
            name_counters: HashMap::new(),
            buffer_counter: 0,
            resources: BTreeMap::new(),
        };

        // Ids are unique across kinds, so one map holds every index.
        let ids = ctx
            .scenes
            .iter()
            .enumerate()
            .map(|(i, item)| (item.handle.id(), i))
            .chain(ctx.nodes.iter().enumerate().map(|(i, item)| (item.handle.id(), i)))
            .chain(ctx.meshes.iter().enumerate().map(|(i, item)| (item.handle.id(), i)))
            .chain(ctx.materials.iter().enumerate().map(|(i, item)| (item.handle.id(), i)))
            .chain(ctx.accessors.iter().enumerate().map(|(i, item)| (item.handle.id(), i)))
            .chain(ctx.buffer_items.iter().enumerate().map(|(i, item)| (item.handle.id(), i)))
            .collect();
        ctx.index = ids;

        let explicit = ctx
            .textures
            .iter()
            .filter_map(|item| item.data.uri.clone())
            .chain(ctx.buffer_items.iter().filter_map(|item| item.data.uri.clone()));
        ctx.taken_names.extend(explicit);

        tracing::debug!(
            "Writing {} nodes, {} meshes, {} materials, {} textures, {} accessors",
            ctx.nodes.len(),
            ctx.meshes.len(),
            ctx.materials.len(),
            ctx.textures.len(),
            ctx.accessors.len()
        );
        ctx
    }

    fn index_of(&self, id: impl Into<ElementId>) -> Option<usize> {
        self.index.get(&id.into()).copied()
    }

    // -- Step 1: Collect images ----------------------------------------------

    fn collect_images(&mut self) -> Result<()> {
        for (i, item) in self.textures.iter().enumerate() {
            let texture = item.data;
            let mime_type = texture.resolved_mime_type().map(str::to_string);

            let placement = if texture.image.is_empty() {
                if texture.uri.is_none() {
                    return Err(Error::UnknownImageFormat {
                        index: i,
                        name: item.element.name.clone(),
                    });
                }
                Placement::UriOnly
            } else if self.options.packing == Packing::Separate {
                if mime_type.is_none() && texture.uri.is_none() {
                    return Err(Error::UnknownImageFormat {
                        index: i,
                        name: item.element.name.clone(),
                    });
                }
                Placement::File
            } else {
                if mime_type.is_none() {
                    return Err(Error::UnknownImageFormat {
                        index: i,
                        name: item.element.name.clone(),
                    });
                }
                Placement::View
            };

            let hash = xxh3_64(&texture.image);
            let existing = self.image_hashes.get(&hash).and_then(|candidates| {
                candidates.iter().copied().find(|&image| {
                    let plan = &self.images[image];
                    let other = self.textures[plan.texture].data;
                    plan.mime_type == mime_type
                        && other.uri == texture.uri
                        && other.image == texture.image
                })
            });
            if let Some(image) = existing {
                tracing::debug!("Texture {} reuses image {}", i, image);
                self.texture_image.insert(item.handle.id(), image);
                continue;
            }

            let image = self.images.len();
            self.image_hashes.entry(hash).or_default().push(image);
            self.texture_image.insert(item.handle.id(), image);
            self.json.images.push(ImageJson {
                uri: match placement {
                    Placement::UriOnly => texture.uri.clone(),
                    _ => None,
                },
                mime_type: match placement {
                    Placement::UriOnly => texture.mime_type.clone(),
                    _ => mime_type.clone(),
                },
                buffer_view: None,
                name: item.element.name.clone(),
                extras: extras(item.element),
            });
            self.images.push(ImagePlan {
                texture: i,
                mime_type,
                placement,
            });
        }
        Ok(())
    }

    // -- Step 2: Pack binary payloads ----------------------------------------

    fn plan_buffers(&mut self) {
        self.buffers = vec![Vec::new(); self.buffer_items.len()];

        let needs_data = self
            .accessors
            .iter()
            .any(|item| item.data.byte_length() > 0)
            || self
                .images
                .iter()
                .any(|plan| plan.placement == Placement::View);
        if self.buffers.is_empty() && needs_data {
            tracing::debug!("No buffer in document; packing into an implicit one");
            self.buffers.push(Vec::new());
        }
    }

    fn buffer_for(&self, id: ElementId) -> usize {
        self.doc
            .graph()
            .target(id, &Relation::Buffer)
            .and_then(|buffer| self.index_of(buffer))
            .unwrap_or(0)
    }

    /// Append `bytes` at the next 8-byte boundary of `buffer` and record the
    /// view.
    fn push_view(&mut self, buffer: usize, bytes: &[u8], target: Option<u32>) -> usize {
        let data = &mut self.buffers[buffer];
        let offset = data.len().next_multiple_of(8);
        data.resize(offset, 0);
        data.extend_from_slice(bytes);

        let view = self.json.buffer_views.len();
        self.json.buffer_views.push(BufferViewJson {
            buffer: Some(buffer),
            byte_offset: offset,
            byte_length: Some(bytes.len()),
            byte_stride: None,
            target,
        });
        tracing::debug!(
            "bufferView {}: buffer {} offset {} length {}",
            view,
            buffer,
            offset,
            bytes.len()
        );
        view
    }

    fn pack_accessors(&mut self) {
        let doc = self.doc;
        let graph = doc.graph();
        for i in 0..self.accessors.len() {
            let item = &self.accessors[i];
            let (id, element, data) = (item.handle.id(), item.element, item.data);
            let bytes = &data.array[..data.byte_length()];

            let buffer_view = if bytes.is_empty() {
                None
            } else {
                let used_as_indices = graph.parent_links(id).iter().any(|link| {
                    link.relation == Relation::Indices && self.reachable.contains(&link.element)
                });
                let target = if used_as_indices {
                    TARGET_INDICES
                } else {
                    TARGET_VERTICES
                };
                let buffer = self.buffer_for(id);
                Some(self.push_view(buffer, bytes, Some(target)))
            };

            let (min, max) = data.bounds().unwrap_or_default();
            self.json.accessors.push(AccessorJson {
                buffer_view,
                byte_offset: 0,
                component_type: Some(data.component_type.gl_enum()),
                normalized: data.normalized,
                count: Some(data.count()),
                element_type: Some(data.element_type.as_str().to_string()),
                min,
                max,
                sparse: None,
                name: element.name.clone(),
                extras: extras(element),
            });
        }
    }

    fn pack_images(&mut self) {
        for image in 0..self.images.len() {
            if self.images[image].placement != Placement::View {
                continue;
            }
            let item = &self.textures[self.images[image].texture];
            let (id, data) = (item.handle.id(), item.data);
            let buffer = self.buffer_for(id);
            let view = self.push_view(buffer, &data.image, None);
            self.json.images[image].buffer_view = Some(view);
        }
    }

    // -- Step 3: External names ----------------------------------------------

    /// `<relation>_<n>.<ext>`, skipping names already taken.
    fn next_name(&mut self, relation: &'static str, extension: &str) -> String {
        let counter = self.name_counters.entry(relation).or_insert(0);
        loop {
            *counter += 1;
            let name = format!("{relation}_{counter}.{extension}");
            if self.taken_names.insert(name.clone()) {
                return name;
            }
        }
    }

    /// First material slot using the texture, in material index order.
    fn relation_name(&self, texture: Texture) -> &'static str {
        self.materials
            .iter()
            .find_map(|material| {
                TextureSlot::ALL
                    .into_iter()
                    .find(|&slot| self.doc.texture(material.handle, slot) == Some(texture))
            })
            .map_or("image", |slot| slot.relation_name())
    }

    fn name_images(&mut self) {
        for image in 0..self.images.len() {
            if self.images[image].placement != Placement::File {
                continue;
            }
            let item = &self.textures[self.images[image].texture];
            let (handle, data) = (item.handle, item.data);

            let uri = match &data.uri {
                Some(uri) => uri.clone(),
                None => {
                    let relation = self.relation_name(handle);
                    let extension = self.images[image]
                        .mime_type
                        .as_deref()
                        .map_or("bin", mime::extension);
                    self.next_name(relation, extension)
                }
            };
            tracing::debug!("Image {} -> {}", image, uri);
            self.resources.insert(uri.clone(), data.image.clone());
            self.json.images[image].uri = Some(uri);
        }
    }

    fn next_buffer_name(&mut self) -> Result<String> {
        let basename = self.options.basename.as_deref().ok_or_else(|| {
            Error::UnsupportedPackingOption(
                "external buffers without a URI need a basename".into(),
            )
        })?;
        loop {
            let name = match self.buffer_counter {
                0 => format!("{basename}.bin"),
                n => format!("{basename}_{n}.bin"),
            };
            self.buffer_counter += 1;
            if self.taken_names.insert(name.clone()) {
                return Ok(name);
            }
        }
    }

    // -- Step 4: JSON arrays -------------------------------------------------

    fn build_buffers(&mut self) -> Result<()> {
        for index in 0..self.buffers.len() {
            let mut data = std::mem::take(&mut self.buffers[index]);
            data.resize(data.len().next_multiple_of(8), 0);
            let (explicit_uri, name, buffer_extras) = match self.buffer_items.get(index) {
                Some(item) => (
                    item.data.uri.clone(),
                    item.element.name.clone(),
                    extras(item.element),
                ),
                None => (None, None, None),
            };

            let uri = match self.options.packing {
                Packing::Binary if index == 0 => {
                    if !data.is_empty() {
                        self.bin = Some(data.clone());
                    }
                    None
                }
                Packing::Embedded => Some(format!(
                    "data:application/octet-stream;base64,{}",
                    STANDARD.encode(&data)
                )),
                _ => {
                    let uri = match explicit_uri {
                        Some(uri) => uri,
                        None => self.next_buffer_name()?,
                    };
                    self.resources.insert(uri.clone(), data.clone());
                    Some(uri)
                }
            };

            tracing::debug!("Buffer {}: {} bytes", index, data.len());
            self.json.buffers.push(BufferJson {
                byte_length: Some(data.len()),
                uri,
                name,
                extras: buffer_extras,
            });
        }
        Ok(())
    }

    fn sampler(&mut self, settings: SamplerSettings) -> usize {
        if let Some(&index) = self.sampler_map.get(&settings) {
            return index;
        }
        let index = self.json.samplers.len();
        self.json.samplers.push(SamplerJson {
            mag_filter: settings.mag_filter.map(|filter| filter.gl_enum()),
            min_filter: settings.min_filter.map(|filter| filter.gl_enum()),
            wrap_s: settings.wrap_s.gl_enum(),
            wrap_t: settings.wrap_t.gl_enum(),
        });
        self.sampler_map.insert(settings, index);
        index
    }

    /// glTF texture entry for one usage of `texture` by a material slot.
    fn texture_info(
        &mut self,
        material: Material,
        data: &MaterialData,
        slot: TextureSlot,
    ) -> Option<TextureInfoJson> {
        let texture = self.doc.texture(material, slot)?;
        let image = *self.texture_image.get(&texture.id())?;
        let info = data.texture_info(slot);
        let sampler = self.sampler(info.sampler);

        let key = (image, sampler);
        let index = match self.texture_map.get(&key) {
            Some(&index) => index,
            None => {
                let index = self.json.textures.len();
                self.json.textures.push(TextureJson {
                    source: Some(image),
                    sampler: Some(sampler),
                    name: None,
                });
                self.texture_map.insert(key, index);
                index
            }
        };

        Some(TextureInfoJson {
            index: Some(index),
            tex_coord: info.tex_coord,
            scale: (slot == TextureSlot::Normal).then_some(data.normal_scale),
            strength: (slot == TextureSlot::Occlusion).then_some(data.occlusion_strength),
        })
    }

    fn build_materials(&mut self) {
        for i in 0..self.materials.len() {
            let item = &self.materials[i];
            let (handle, element, data) = (item.handle, item.element, item.data);

            let material = MaterialJson {
                name: element.name.clone(),
                pbr_metallic_roughness: Some(PbrJson {
                    base_color_factor: Some(data.base_color_factor),
                    base_color_texture: self.texture_info(handle, data, TextureSlot::BaseColor),
                    metallic_factor: Some(data.metallic_factor),
                    roughness_factor: Some(data.roughness_factor),
                    metallic_roughness_texture: self.texture_info(
                        handle,
                        data,
                        TextureSlot::MetallicRoughness,
                    ),
                }),
                normal_texture: self.texture_info(handle, data, TextureSlot::Normal),
                occlusion_texture: self.texture_info(handle, data, TextureSlot::Occlusion),
                emissive_texture: self.texture_info(handle, data, TextureSlot::Emissive),
                emissive_factor: (data.emissive_factor != [0.0; 3])
                    .then_some(data.emissive_factor),
                alpha_mode: (data.alpha_mode != AlphaMode::Opaque)
                    .then(|| data.alpha_mode.as_str().to_string()),
                alpha_cutoff: (data.alpha_mode == AlphaMode::Mask || data.alpha_cutoff != 0.5)
                    .then_some(data.alpha_cutoff),
                double_sided: data.double_sided,
                extras: extras(element),
            };
            self.json.materials.push(material);
        }
    }

    fn build_meshes(&mut self) {
        let doc = self.doc;
        for item in &self.meshes {
            let primitives = doc
                .mesh_primitives(item.handle)
                .into_iter()
                .filter_map(|primitive| {
                    let element = doc.element(primitive)?;
                    let data = doc.get(primitive)?;
                    Some(PrimitiveJson {
                        attributes: doc
                            .attributes(primitive)
                            .into_iter()
                            .filter_map(|(semantic, accessor)| {
                                Some((semantic, self.index_of(accessor)?))
                            })
                            .collect(),
                        indices: doc
                            .indices(primitive)
                            .and_then(|accessor| self.index_of(accessor)),
                        material: doc
                            .material(primitive)
                            .and_then(|material| self.index_of(material)),
                        mode: (data.mode != PrimitiveMode::Triangles)
                            .then(|| data.mode.gl_enum()),
                        extras: extras(element),
                    })
                })
                .collect();

            let mesh = MeshJson {
                primitives,
                name: item.element.name.clone(),
                extras: extras(item.element),
            };
            self.json.meshes.push(mesh);
        }
    }

    fn build_nodes(&mut self) {
        let doc = self.doc;
        for item in &self.nodes {
            let data = item.data;
            let trs = data.matrix.is_none();
            let node = NodeJson {
                name: item.element.name.clone(),
                children: doc
                    .node_children(item.handle)
                    .into_iter()
                    .filter_map(|child| self.index_of(child))
                    .collect(),
                mesh: doc
                    .node_mesh(item.handle)
                    .and_then(|mesh| self.index_of(mesh)),
                translation: (trs && data.translation != [0.0; 3]).then_some(data.translation),
                rotation: (trs && data.rotation != [0.0, 0.0, 0.0, 1.0])
                    .then_some(data.rotation),
                scale: (trs && data.scale != [1.0; 3]).then_some(data.scale),
                matrix: data.matrix,
                extras: extras(item.element),
            };
            self.json.nodes.push(node);
        }
    }

    fn build_scenes(&mut self) {
        let doc = self.doc;
        for item in &self.scenes {
            let scene = SceneJson {
                name: item.element.name.clone(),
                nodes: doc
                    .scene_nodes(item.handle)
                    .into_iter()
                    .filter_map(|node| self.index_of(node))
                    .collect(),
                extras: extras(item.element),
            };
            self.json.scenes.push(scene);
        }
        self.json.scene = doc
            .default_scene()
            .and_then(|scene| self.index_of(scene));
    }

    fn build_asset(&mut self) {
        let root = self.doc.root();
        let asset = self.doc.get(root).map(|data| data.asset.clone()).unwrap_or_default();
        self.json.asset = AssetJson {
            version: "2.0".into(),
            generator: asset
                .generator
                .or_else(|| Some(self.options.generator.clone())),
            copyright: asset.copyright,
            extras: None,
        };
        self.json.extras = self.doc.element(root).and_then(extras);
    }

    fn finish(self) -> Result<WriteOutput> {
        let glb = match self.options.packing {
            Packing::Binary => {
                let json = serde_json::to_vec(&self.json)?;
                Some(glb::encode(&json, self.bin.as_deref()))
            }
            Packing::Separate | Packing::Embedded => None,
        };

        tracing::info!(
            "Wrote glTF ({:?}): {} accessors, {} images, {} samplers, {} textures, {} buffers",
            self.options.packing,
            self.json.accessors.len(),
            self.json.images.len(),
            self.json.samplers.len(),
            self.json.textures.len(),
            self.json.buffers.len()
        );

        Ok(WriteOutput {
            json: self.json,
            glb,
            resources: self.resources,
        })
    }
}

/// Reachable elements of one kind, in creation order.
fn collect<'a, H: Handle>(doc: &'a Document, reachable: &HashSet<ElementId>) -> Vec<Item<'a, H>> {
    doc.graph()
        .iter()
        .filter(|(id, _)| reachable.contains(id))
        .filter_map(|(id, element)| {
            H::data(&element.data).map(|data| Item {
                handle: H::from_id(id),
                element,
                data,
            })
        })
        .collect()
}

fn extras(element: &Element) -> Option<Value> {
    (!element.extras.is_empty()).then(|| Value::Object(element.extras.clone()))
}
