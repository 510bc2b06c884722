//! Shared fixtures for the nether-scene integration tests.
#![allow(dead_code)]

use nether_scene::{
    Accessor, Buffer, Document, ElementType, Extras, Material, Mesh, Node, Scene, Texture,
    TextureSlot, WrapMode,
};
use serde_json::json;

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Bytes starting with the PNG signature followed by `payload`.
pub fn png(payload: &[u8]) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

pub fn extras(value: serde_json::Value) -> Extras {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("extras must be an object, got {other}"),
    }
}

/// Handles of the elements built by [`textured_cube`].
pub struct Fixture {
    pub doc: Document,
    pub buffer: Buffer,
    pub scene: Scene,
    pub parent: Node,
    pub child: Node,
    pub mesh: Mesh,
    pub material: Material,
    pub texture: Texture,
    pub positions: Accessor,
    pub indices: Accessor,
}

/// One scene, a two-node hierarchy, one triangle mesh and one textured
/// material, all data assigned to a single buffer.
pub fn textured_cube() -> Fixture {
    let mut doc = Document::new();
    doc.get_mut(doc.root()).unwrap().set_copyright("test fixture");

    let buffer = doc.create_buffer("main");

    let positions = doc.create_accessor("positions");
    doc.get_mut(positions)
        .unwrap()
        .set_vec3(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    doc.set_accessor_buffer(positions, Some(buffer)).unwrap();

    let uvs = doc.create_accessor("uvs");
    doc.get_mut(uvs)
        .unwrap()
        .set_vec2(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    doc.set_accessor_buffer(uvs, Some(buffer)).unwrap();

    let indices = doc.create_accessor("indices");
    doc.get_mut(indices)
        .unwrap()
        .set_u16(&[0, 1, 2])
        .set_element_type(ElementType::Scalar);
    doc.set_accessor_buffer(indices, Some(buffer)).unwrap();

    let texture = doc.create_texture("albedo");
    doc.get_mut(texture).unwrap().set_image(png(b"albedo pixels"));
    doc.set_texture_buffer(texture, Some(buffer)).unwrap();
    doc.set_extras(texture, extras(json!({ "source": "paint.psd" })));

    let material = doc.create_material("painted");
    doc.get_mut(material)
        .unwrap()
        .set_base_color_factor([1.0, 0.5, 0.25, 1.0])
        .set_roughness_factor(0.7)
        .texture_info_mut(TextureSlot::BaseColor)
        .set_wrap(WrapMode::ClampToEdge, WrapMode::MirroredRepeat);
    doc.set_texture(material, TextureSlot::BaseColor, Some(texture))
        .unwrap();
    doc.set_extras(material, extras(json!({ "tags": ["shiny", 3] })));

    let mesh = doc.create_mesh("tri");
    let primitive = doc.create_primitive("");
    doc.set_attribute(primitive, "POSITION", Some(positions)).unwrap();
    doc.set_attribute(primitive, "TEXCOORD_0", Some(uvs)).unwrap();
    doc.set_indices(primitive, Some(indices)).unwrap();
    doc.set_material(primitive, Some(material)).unwrap();
    doc.add_primitive(mesh, primitive).unwrap();

    let parent = doc.create_node("parent");
    doc.get_mut(parent).unwrap().set_translation([0.0, 2.0, 0.0]);
    let child = doc.create_node("child");
    doc.get_mut(child).unwrap().set_scale([2.0, 2.0, 2.0]);
    doc.set_node_mesh(child, Some(mesh)).unwrap();
    doc.add_child(parent, child).unwrap();
    doc.set_extras(child, extras(json!({ "lod": 0, "note": null })));

    let scene = doc.create_scene("main");
    doc.add_scene_node(scene, parent).unwrap();
    doc.set_default_scene(Some(scene)).unwrap();

    Fixture {
        doc,
        buffer,
        scene,
        parent,
        child,
        mesh,
        material,
        texture,
        positions,
        indices,
    }
}
