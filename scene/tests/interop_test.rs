//! Cross-check written files with the independent `gltf` parser.

mod common;

use nether_scene::{TextureSlot, WriteOptions, write};

#[test]
fn test_glb_parses_with_gltf_crate() {
    common::init_tracing();
    let fixture = common::textured_cube();

    let output = write(&fixture.doc, &WriteOptions::binary()).unwrap();
    let gltf = gltf::Gltf::from_slice(&output.to_bytes().unwrap()).unwrap();

    assert_eq!(gltf.meshes().count(), 1);
    assert_eq!(gltf.nodes().count(), 2);
    assert_eq!(gltf.accessors().count(), 3);
    assert_eq!(gltf.images().count(), 1);

    let blob = gltf.blob.as_ref().unwrap();
    assert_eq!(blob.len() % 8, 0);
    assert_eq!(gltf.buffers().next().unwrap().length(), blob.len());

    for view in gltf.views() {
        assert_eq!(view.offset() % 8, 0);
        assert!(view.offset() + view.length() <= blob.len());
    }

    let primitive = gltf.meshes().next().unwrap().primitives().next().unwrap();
    assert_eq!(primitive.indices().unwrap().count(), 3);
    let material = primitive.material();
    let info = material.pbr_metallic_roughness().base_color_texture().unwrap();
    assert_eq!(info.texture().source().index(), 0);
    assert_eq!(
        info.texture().sampler().wrap_s(),
        gltf::texture::WrappingMode::ClampToEdge
    );

    let scene = gltf.default_scene().unwrap();
    assert_eq!(scene.nodes().count(), 1);
    let root = scene.nodes().next().unwrap();
    assert_eq!(root.children().next().unwrap().name(), Some("child"));
}

#[test]
fn test_image_views_parse_with_gltf_crate() {
    common::init_tracing();
    let fixture = common::textured_cube();

    let output = write(&fixture.doc, &WriteOptions::binary()).unwrap();
    let gltf = gltf::Gltf::from_slice(&output.to_bytes().unwrap()).unwrap();

    let image = gltf.images().next().unwrap();
    match image.source() {
        gltf::image::Source::View { view, mime_type } => {
            assert_eq!(mime_type, "image/png");
            let blob = gltf.blob.as_ref().unwrap();
            let bytes = &blob[view.offset()..view.offset() + view.length()];
            assert_eq!(bytes, common::png(b"albedo pixels").as_slice());
        }
        gltf::image::Source::Uri { uri, .. } => panic!("expected a view, got uri {uri}"),
    }
}

#[test]
fn test_separate_json_parses_with_gltf_crate() {
    common::init_tracing();
    let mut fixture = common::textured_cube();
    let second = fixture.doc.create_material("second");
    fixture
        .doc
        .set_texture(second, TextureSlot::Normal, Some(fixture.texture))
        .unwrap();

    let output = write(&fixture.doc, &WriteOptions::separate("cube")).unwrap();
    let gltf = gltf::Gltf::from_slice(&output.to_bytes().unwrap()).unwrap();

    assert!(gltf.blob.is_none());
    let buffer = gltf.buffers().next().unwrap();
    match buffer.source() {
        gltf::buffer::Source::Uri(uri) => assert_eq!(uri, "cube.bin"),
        gltf::buffer::Source::Bin => panic!("expected an external buffer"),
    }
    let image = gltf.images().next().unwrap();
    match image.source() {
        gltf::image::Source::Uri { uri, .. } => {
            assert!(output.resources.contains_key(uri), "{uri}");
        }
        gltf::image::Source::View { .. } => panic!("expected an external image"),
    }
    // Two usages with different samplers of the same image.
    assert_eq!(gltf.textures().count(), 2);
    assert!(gltf.textures().all(|texture| texture.source().index() == 0));
}

#[test]
fn test_embedded_json_parses_with_gltf_crate() {
    common::init_tracing();
    let fixture = common::textured_cube();

    let output = write(&fixture.doc, &WriteOptions::embedded()).unwrap();
    let gltf = gltf::Gltf::from_slice(&output.to_bytes().unwrap()).unwrap();

    let buffer = gltf.buffers().next().unwrap();
    match buffer.source() {
        gltf::buffer::Source::Uri(uri) => assert!(uri.starts_with("data:")),
        gltf::buffer::Source::Bin => panic!("expected a data URI"),
    }
}
