//! glTF JSON + binary -> Document.
//!
//! Entities are built in dependency order (buffers, views, samplers,
//! accessors, images, texture entries, materials, meshes, nodes, scenes) so
//! every index reference resolves against an already-built array. Any bad
//! reference fails the whole read with [`Error::MalformedDocument`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::document::Document;
use crate::element::{Accessor, Buffer, Material, Mesh, Node, Scene, Texture};
use crate::error::{Error, Result, malformed};
use crate::graph::ElementId;
use crate::io::glb;
use crate::io::resolver::ByteResolver;
use crate::io::wire::{GltfJson, TextureInfoJson};
use crate::properties::{
    AlphaMode, ComponentType, ElementType, MagFilter, MinFilter, PrimitiveMode, SamplerSettings,
    TextureSlot, WrapMode,
};

/// Read a `.glb` file or `.gltf` JSON, detected from the leading bytes.
pub fn read(bytes: &[u8], resolver: &dyn ByteResolver) -> Result<Document> {
    if glb::is_glb(bytes) {
        let glb = glb::parse(bytes)?;
        read_json(glb.json, glb.bin, resolver)
    } else {
        read_json(bytes, None, resolver)
    }
}

/// Read glTF JSON. `bin` is the GLB BIN chunk backing a URI-less buffer 0.
pub fn read_json(json: &[u8], bin: Option<&[u8]>, resolver: &dyn ByteResolver) -> Result<Document> {
    let gltf: GltfJson = serde_json::from_slice(json)?;
    read_gltf(&gltf, bin, resolver)
}

/// Build a document from already-parsed JSON.
pub fn read_gltf(
    gltf: &GltfJson,
    bin: Option<&[u8]>,
    resolver: &dyn ByteResolver,
) -> Result<Document> {
    let mut ctx = ReadContext::new(gltf, bin, resolver);
    ctx.read_asset()?;
    ctx.read_buffers()?;
    ctx.read_views()?;
    ctx.read_samplers()?;
    ctx.read_accessors()?;
    ctx.read_images()?;
    ctx.read_texture_entries()?;
    ctx.read_materials()?;
    ctx.read_meshes()?;
    ctx.read_nodes()?;
    ctx.read_scenes()?;

    tracing::info!(
        "Read glTF: {} buffers, {} accessors, {} textures, {} materials, {} meshes, {} nodes",
        ctx.buffers.len(),
        ctx.accessors.len(),
        ctx.textures.len(),
        ctx.materials.len(),
        ctx.meshes.len(),
        ctx.nodes.len()
    );
    Ok(ctx.doc)
}

struct LoadedBuffer {
    handle: Buffer,
    data: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
struct View {
    buffer: usize,
    offset: usize,
    length: usize,
    stride: Option<usize>,
}

struct ReadContext<'a> {
    gltf: &'a GltfJson,
    bin: Option<&'a [u8]>,
    resolver: &'a dyn ByteResolver,
    doc: Document,

    buffers: Vec<LoadedBuffer>,
    views: Vec<View>,
    samplers: Vec<SamplerSettings>,
    accessors: Vec<Accessor>,
    /// One texture element per image.
    textures: Vec<Texture>,
    /// glTF texture entries: shared image element plus sampler settings.
    texture_entries: Vec<(Texture, SamplerSettings)>,
    materials: Vec<Material>,
    meshes: Vec<Mesh>,
    nodes: Vec<Node>,
    scenes: Vec<Scene>,
}

impl<'a> ReadContext<'a> {
    fn new(gltf: &'a GltfJson, bin: Option<&'a [u8]>, resolver: &'a dyn ByteResolver) -> Self {
        Self {
            gltf,
            bin,
            resolver,
            doc: Document::new(),
            buffers: Vec::new(),
            views: Vec::new(),
            samplers: Vec::new(),
            accessors: Vec::new(),
            textures: Vec::new(),
            texture_entries: Vec::new(),
            materials: Vec::new(),
            meshes: Vec::new(),
            nodes: Vec::new(),
            scenes: Vec::new(),
        }
    }

    fn apply_extras(
        &mut self,
        id: impl Into<ElementId>,
        extras: &Option<Value>,
        entity: &'static str,
        index: usize,
    ) {
        match extras {
            Some(Value::Object(map)) => self.doc.set_extras(id, map.clone()),
            Some(_) => tracing::warn!("Ignoring non-object extras on {} {}", entity, index),
            None => {}
        }
    }

    fn read_asset(&mut self) -> Result<()> {
        let gltf = self.gltf;
        let asset = &gltf.asset;
        if asset.version.is_empty() {
            return Err(malformed("asset", 0, "missing version"));
        }
        if !asset.version.starts_with("2.") {
            return Err(malformed(
                "asset",
                0,
                format!("unsupported version {}", asset.version),
            ));
        }
        if !gltf.extensions_required.is_empty() {
            tracing::warn!(
                "Required extensions are not supported and will be dropped: {:?}",
                gltf.extensions_required
            );
        }

        let root = self.doc.root();
        if let Some(data) = self.doc.get_mut(root) {
            data.asset.generator = asset.generator.clone();
            data.asset.copyright = asset.copyright.clone();
        }
        self.apply_extras(root, &gltf.extras, "root", 0);
        Ok(())
    }

    // -- Binary data ---------------------------------------------------------

    fn read_buffers(&mut self) -> Result<()> {
        let gltf = self.gltf;
        for (i, buffer) in gltf.buffers.iter().enumerate() {
            let byte_length = buffer
                .byte_length
                .ok_or_else(|| malformed("buffer", i, "missing byteLength"))?;

            let mut data = match &buffer.uri {
                None => match (i, self.bin) {
                    (0, Some(bin)) => bin.to_vec(),
                    _ if byte_length == 0 => Vec::new(),
                    _ => return Err(malformed("buffer", i, "no uri and no BIN chunk")),
                },
                Some(uri) if uri.starts_with("data:") => {
                    decode_data_uri(uri).map_err(|message| malformed("buffer", i, message))?
                }
                Some(uri) => self.resolver.resolve(uri).map_err(|source| Error::Resolve {
                    uri: uri.clone(),
                    source,
                })?,
            };
            if data.len() < byte_length {
                return Err(malformed(
                    "buffer",
                    i,
                    format!(
                        "byteLength {byte_length} exceeds the {} bytes available",
                        data.len()
                    ),
                ));
            }
            data.truncate(byte_length);

            let handle = self.doc.create_buffer(buffer.name.as_deref().unwrap_or(""));
            if let Some(uri) = buffer.uri.as_deref().filter(|uri| !uri.starts_with("data:")) {
                if let Some(buffer) = self.doc.get_mut(handle) {
                    buffer.set_uri(uri);
                }
            }
            self.apply_extras(handle, &buffer.extras, "buffer", i);
            tracing::debug!("Buffer {}: {} bytes", i, data.len());
            self.buffers.push(LoadedBuffer { handle, data });
        }
        Ok(())
    }

    fn read_views(&mut self) -> Result<()> {
        let gltf = self.gltf;
        for (i, view) in gltf.buffer_views.iter().enumerate() {
            let buffer = view
                .buffer
                .ok_or_else(|| malformed("bufferView", i, "missing buffer"))?;
            let length = view
                .byte_length
                .ok_or_else(|| malformed("bufferView", i, "missing byteLength"))?;
            let available = self
                .buffers
                .get(buffer)
                .map(|buffer| buffer.data.len())
                .ok_or_else(|| malformed("bufferView", i, format!("buffer {buffer} out of range")))?;

            let end = view.byte_offset.checked_add(length);
            if end.is_none_or(|end| end > available) {
                return Err(malformed(
                    "bufferView",
                    i,
                    format!(
                        "range {}+{} exceeds buffer {} length {}",
                        view.byte_offset, length, buffer, available
                    ),
                ));
            }
            if view.byte_stride == Some(0) {
                return Err(malformed("bufferView", i, "byteStride must be positive"));
            }

            self.views.push(View {
                buffer,
                offset: view.byte_offset,
                length,
                stride: view.byte_stride,
            });
        }
        Ok(())
    }

    fn view(&self, entity: &'static str, index: usize, view: usize) -> Result<(View, &[u8])> {
        let info = *self
            .views
            .get(view)
            .ok_or_else(|| malformed(entity, index, format!("bufferView {view} out of range")))?;
        let data = &self.buffers[info.buffer].data[info.offset..info.offset + info.length];
        Ok((info, data))
    }

    // -- Samplers and accessors ----------------------------------------------

    fn read_samplers(&mut self) -> Result<()> {
        let gltf = self.gltf;
        for (i, sampler) in gltf.samplers.iter().enumerate() {
            let enum_value = |name: &str, value: u32| {
                malformed("sampler", i, format!("unknown {name} {value}"))
            };
            let mag_filter = sampler
                .mag_filter
                .map(|v| MagFilter::from_gl_enum(v).ok_or_else(|| enum_value("magFilter", v)))
                .transpose()?;
            let min_filter = sampler
                .min_filter
                .map(|v| MinFilter::from_gl_enum(v).ok_or_else(|| enum_value("minFilter", v)))
                .transpose()?;
            let wrap_s = WrapMode::from_gl_enum(sampler.wrap_s)
                .ok_or_else(|| enum_value("wrapS", sampler.wrap_s))?;
            let wrap_t = WrapMode::from_gl_enum(sampler.wrap_t)
                .ok_or_else(|| enum_value("wrapT", sampler.wrap_t))?;

            self.samplers.push(SamplerSettings {
                mag_filter,
                min_filter,
                wrap_s,
                wrap_t,
            });
        }
        Ok(())
    }

    fn read_accessors(&mut self) -> Result<()> {
        let gltf = self.gltf;
        for (i, accessor) in gltf.accessors.iter().enumerate() {
            if accessor.sparse.is_some() {
                return Err(malformed("accessor", i, "sparse accessors are not supported"));
            }
            let raw_component = accessor
                .component_type
                .ok_or_else(|| malformed("accessor", i, "missing componentType"))?;
            let component_type = ComponentType::from_gl_enum(raw_component).ok_or_else(|| {
                malformed("accessor", i, format!("unknown componentType {raw_component}"))
            })?;
            let count = accessor
                .count
                .ok_or_else(|| malformed("accessor", i, "missing count"))?;
            let raw_type = accessor
                .element_type
                .as_deref()
                .ok_or_else(|| malformed("accessor", i, "missing type"))?;
            let element_type = ElementType::parse(raw_type)
                .ok_or_else(|| malformed("accessor", i, format!("unknown type {raw_type}")))?;

            let element_size = element_type.component_count() * component_type.size();
            let too_large = || malformed("accessor", i, format!("count {count} is too large"));
            let byte_length = count.checked_mul(element_size).ok_or_else(too_large)?;

            let (array, buffer) = match accessor.buffer_view {
                None => (vec![0; byte_length], None),
                Some(view_index) => {
                    let (view, data) = self.view("accessor", i, view_index)?;
                    let stride = view.stride.unwrap_or(element_size);
                    if stride < element_size {
                        return Err(malformed(
                            "accessor",
                            i,
                            format!("byteStride {stride} is smaller than element size {element_size}"),
                        ));
                    }
                    let needed = match count {
                        0 => accessor.byte_offset,
                        _ => stride
                            .checked_mul(count - 1)
                            .and_then(|n| n.checked_add(element_size))
                            .and_then(|n| n.checked_add(accessor.byte_offset))
                            .ok_or_else(too_large)?,
                    };
                    if needed > data.len() {
                        return Err(malformed(
                            "accessor",
                            i,
                            format!(
                                "needs {needed} bytes but bufferView {view_index} has {}",
                                data.len()
                            ),
                        ));
                    }

                    let data = &data[accessor.byte_offset..];
                    let array = if stride == element_size {
                        data[..byte_length].to_vec()
                    } else {
                        data.chunks(stride)
                            .take(count)
                            .flat_map(|element| &element[..element_size])
                            .copied()
                            .collect()
                    };
                    (array, Some(self.buffers[view.buffer].handle))
                }
            };

            let handle = self
                .doc
                .create_accessor(accessor.name.as_deref().unwrap_or(""));
            if let Some(data) = self.doc.get_mut(handle) {
                data.set_element_type(element_type)
                    .set_normalized(accessor.normalized)
                    .set_raw(component_type, array);
            }
            self.doc.set_accessor_buffer(handle, buffer)?;
            self.apply_extras(handle, &accessor.extras, "accessor", i);
            self.accessors.push(handle);
        }
        Ok(())
    }

    // -- Images and textures -------------------------------------------------

    fn read_images(&mut self) -> Result<()> {
        let gltf = self.gltf;
        for (i, image) in gltf.images.iter().enumerate() {
            let mut mime_type = image.mime_type.clone();
            let mut uri = None;
            let mut buffer = None;

            let bytes = match (image.buffer_view, image.uri.as_deref()) {
                (Some(view_index), _) => {
                    let (view, data) = self.view("image", i, view_index)?;
                    buffer = Some(self.buffers[view.buffer].handle);
                    data.to_vec()
                }
                (None, Some(data_uri)) if data_uri.starts_with("data:") => {
                    if mime_type.is_none() {
                        mime_type = data_uri_mime(data_uri);
                    }
                    decode_data_uri(data_uri).map_err(|message| malformed("image", i, message))?
                }
                (None, Some(external)) => {
                    uri = Some(external.to_string());
                    self.resolver
                        .resolve(external)
                        .map_err(|source| Error::Resolve {
                            uri: external.to_string(),
                            source,
                        })?
                }
                (None, None) => {
                    return Err(malformed("image", i, "neither uri nor bufferView"));
                }
            };

            let handle = self.doc.create_texture(image.name.as_deref().unwrap_or(""));
            if let Some(texture) = self.doc.get_mut(handle) {
                texture.set_image(bytes);
                if let Some(mime_type) = mime_type {
                    texture.set_mime_type(mime_type);
                }
                if let Some(uri) = uri {
                    texture.set_uri(uri);
                }
            }
            self.doc.set_texture_buffer(handle, buffer)?;
            self.apply_extras(handle, &image.extras, "image", i);
            self.textures.push(handle);
        }
        Ok(())
    }

    fn read_texture_entries(&mut self) -> Result<()> {
        let gltf = self.gltf;
        for (i, texture) in gltf.textures.iter().enumerate() {
            let source = texture
                .source
                .ok_or_else(|| malformed("texture", i, "missing source"))?;
            let image = *self
                .textures
                .get(source)
                .ok_or_else(|| malformed("texture", i, format!("image {source} out of range")))?;
            let sampler = match texture.sampler {
                Some(sampler) => *self.samplers.get(sampler).ok_or_else(|| {
                    malformed("texture", i, format!("sampler {sampler} out of range"))
                })?,
                None => SamplerSettings::default(),
            };
            self.texture_entries.push((image, sampler));
        }
        Ok(())
    }

    // -- Materials and meshes ------------------------------------------------

    fn bind_texture(
        &mut self,
        material: Material,
        index: usize,
        slot: TextureSlot,
        info: Option<&TextureInfoJson>,
    ) -> Result<()> {
        let Some(info) = info else {
            return Ok(());
        };
        let entry = info.index.ok_or_else(|| {
            malformed(
                "material",
                index,
                format!("{} texture is missing index", slot.relation_name()),
            )
        })?;
        let (texture, sampler) = *self.texture_entries.get(entry).ok_or_else(|| {
            malformed("material", index, format!("texture {entry} out of range"))
        })?;

        self.doc.set_texture(material, slot, Some(texture))?;
        if let Some(data) = self.doc.get_mut(material) {
            data.texture_info_mut(slot).tex_coord = info.tex_coord;
            data.texture_info_mut(slot).sampler = sampler;
            match slot {
                TextureSlot::Normal => data.normal_scale = info.scale.unwrap_or(1.0),
                TextureSlot::Occlusion => {
                    data.occlusion_strength = info.strength.unwrap_or(1.0)
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn read_materials(&mut self) -> Result<()> {
        let gltf = self.gltf;
        for (i, material) in gltf.materials.iter().enumerate() {
            let alpha_mode = match material.alpha_mode.as_deref() {
                None => AlphaMode::Opaque,
                Some(mode) => AlphaMode::parse(mode)
                    .ok_or_else(|| malformed("material", i, format!("unknown alphaMode {mode}")))?,
            };

            let handle = self
                .doc
                .create_material(material.name.as_deref().unwrap_or(""));
            let pbr = material.pbr_metallic_roughness.as_ref();
            if let Some(data) = self.doc.get_mut(handle) {
                data.set_alpha_mode(alpha_mode)
                    .set_double_sided(material.double_sided);
                if let Some(cutoff) = material.alpha_cutoff {
                    data.set_alpha_cutoff(cutoff);
                }
                if let Some(factor) = material.emissive_factor {
                    data.set_emissive_factor(factor);
                }
                if let Some(factor) = pbr.and_then(|pbr| pbr.base_color_factor) {
                    data.set_base_color_factor(factor);
                }
                if let Some(factor) = pbr.and_then(|pbr| pbr.metallic_factor) {
                    data.set_metallic_factor(factor);
                }
                if let Some(factor) = pbr.and_then(|pbr| pbr.roughness_factor) {
                    data.set_roughness_factor(factor);
                }
            }

            let slots = [
                (
                    TextureSlot::BaseColor,
                    pbr.and_then(|pbr| pbr.base_color_texture.as_ref()),
                ),
                (
                    TextureSlot::MetallicRoughness,
                    pbr.and_then(|pbr| pbr.metallic_roughness_texture.as_ref()),
                ),
                (TextureSlot::Normal, material.normal_texture.as_ref()),
                (TextureSlot::Occlusion, material.occlusion_texture.as_ref()),
                (TextureSlot::Emissive, material.emissive_texture.as_ref()),
            ];
            for (slot, info) in slots {
                self.bind_texture(handle, i, slot, info)?;
            }

            self.apply_extras(handle, &material.extras, "material", i);
            self.materials.push(handle);
        }
        Ok(())
    }

    fn read_meshes(&mut self) -> Result<()> {
        let gltf = self.gltf;
        for (i, mesh) in gltf.meshes.iter().enumerate() {
            let handle = self.doc.create_mesh(mesh.name.as_deref().unwrap_or(""));

            for (p, primitive) in mesh.primitives.iter().enumerate() {
                let accessor = |index: usize| {
                    self.accessors.get(index).copied().ok_or_else(|| {
                        malformed(
                            "mesh",
                            i,
                            format!("primitive {p}: accessor {index} out of range"),
                        )
                    })
                };
                let attributes = primitive
                    .attributes
                    .iter()
                    .map(|(semantic, &index)| Ok((semantic.as_str(), accessor(index)?)))
                    .collect::<Result<Vec<_>>>()?;
                let indices = primitive.indices.map(accessor).transpose()?;
                let material = primitive
                    .material
                    .map(|index| {
                        self.materials.get(index).copied().ok_or_else(|| {
                            malformed(
                                "mesh",
                                i,
                                format!("primitive {p}: material {index} out of range"),
                            )
                        })
                    })
                    .transpose()?;
                let mode = match primitive.mode {
                    None => PrimitiveMode::Triangles,
                    Some(mode) => PrimitiveMode::from_gl_enum(mode).ok_or_else(|| {
                        malformed("mesh", i, format!("primitive {p}: unknown mode {mode}"))
                    })?,
                };

                let prim = self.doc.create_primitive("");
                if let Some(data) = self.doc.get_mut(prim) {
                    data.set_mode(mode);
                }
                for (semantic, accessor) in attributes {
                    self.doc.set_attribute(prim, semantic, Some(accessor))?;
                }
                self.doc.set_indices(prim, indices)?;
                self.doc.set_material(prim, material)?;
                self.doc.add_primitive(handle, prim)?;
                self.apply_extras(prim, &primitive.extras, "primitive", p);
            }

            self.apply_extras(handle, &mesh.extras, "mesh", i);
            self.meshes.push(handle);
        }
        Ok(())
    }

    // -- Hierarchy -----------------------------------------------------------

    fn read_nodes(&mut self) -> Result<()> {
        let gltf = self.gltf;
        for (i, node) in gltf.nodes.iter().enumerate() {
            let handle = self.doc.create_node(node.name.as_deref().unwrap_or(""));
            if let Some(data) = self.doc.get_mut(handle) {
                if let Some(translation) = node.translation {
                    data.set_translation(translation);
                }
                if let Some(rotation) = node.rotation {
                    data.set_rotation(rotation);
                }
                if let Some(scale) = node.scale {
                    data.set_scale(scale);
                }
                data.set_matrix(node.matrix);
            }
            self.apply_extras(handle, &node.extras, "node", i);
            self.nodes.push(handle);
        }

        // Links need every node to exist first.
        for (i, node) in gltf.nodes.iter().enumerate() {
            let parent = self.nodes[i];
            if let Some(index) = node.mesh {
                let mesh = *self
                    .meshes
                    .get(index)
                    .ok_or_else(|| malformed("node", i, format!("mesh {index} out of range")))?;
                self.doc.set_node_mesh(parent, Some(mesh))?;
            }
            for &index in &node.children {
                let child = *self
                    .nodes
                    .get(index)
                    .ok_or_else(|| malformed("node", i, format!("child {index} out of range")))?;
                if self.doc.node_parent(child).is_some() {
                    return Err(malformed(
                        "node",
                        i,
                        format!("child {index} already has a parent"),
                    ));
                }
                self.doc
                    .add_child(parent, child)
                    .map_err(|_| malformed("node", i, format!("child {index} forms a cycle")))?;
            }
        }
        Ok(())
    }

    fn read_scenes(&mut self) -> Result<()> {
        let gltf = self.gltf;
        for (i, scene) in gltf.scenes.iter().enumerate() {
            let handle = self.doc.create_scene(scene.name.as_deref().unwrap_or(""));
            for &index in &scene.nodes {
                let node = *self
                    .nodes
                    .get(index)
                    .ok_or_else(|| malformed("scene", i, format!("node {index} out of range")))?;
                self.doc.add_scene_node(handle, node)?;
            }
            self.apply_extras(handle, &scene.extras, "scene", i);
            self.scenes.push(handle);
        }

        if let Some(index) = gltf.scene {
            let scene = *self
                .scenes
                .get(index)
                .ok_or_else(|| malformed("scene", index, "default scene out of range"))?;
            self.doc.set_default_scene(Some(scene))?;
        }
        Ok(())
    }
}

/// Payload of a base64 `data:` URI.
fn decode_data_uri(uri: &str) -> std::result::Result<Vec<u8>, String> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| "data URI has no payload".to_string())?;
    if !header.ends_with(";base64") {
        return Err("only base64 data URIs are supported".into());
    }
    STANDARD
        .decode(payload)
        .map_err(|err| format!("invalid base64 data URI: {err}"))
}

/// MIME type declared in a `data:<mime>;base64,` header.
fn data_uri_mime(uri: &str) -> Option<String> {
    let header = uri.strip_prefix("data:")?.split([';', ',']).next()?;
    (!header.is_empty()).then(|| header.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_uri() {
        assert_eq!(
            decode_data_uri("data:application/octet-stream;base64,AQID").unwrap(),
            vec![1, 2, 3]
        );
        assert!(decode_data_uri("data:text/plain,hello").is_err());
        assert!(decode_data_uri("data:application/octet-stream;base64").is_err());
    }

    #[test]
    fn test_data_uri_mime() {
        assert_eq!(
            data_uri_mime("data:image/png;base64,AAAA").as_deref(),
            Some("image/png")
        );
        assert_eq!(data_uri_mime("data:;base64,AAAA"), None);
    }
}
