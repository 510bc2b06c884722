//! Integration tests: write a document, read it back, compare.
//!
//! Elements are matched by position in their kind's list; the writer emits
//! them in creation order and the reader creates them in index order.

mod common;

use nether_scene::{
    Document, Handle, MemoryResolver, NoResolver, Packing, TextureSlot, WriteOptions, read, write,
};

fn position<H: Handle + PartialEq>(list: &[H], handle: H) -> usize {
    list.iter()
        .position(|&h| h == handle)
        .expect("handle not in list")
}

fn assert_same_names_and_extras<H: Handle + PartialEq>(a: &Document, b: &Document) {
    let (left, right) = (a.list::<H>(), b.list::<H>());
    assert_eq!(left.len(), right.len(), "{:?} count", H::KIND);
    for (&l, &r) in left.iter().zip(&right) {
        assert_eq!(a.name(l), b.name(r), "{:?} name", H::KIND);
        assert_eq!(a.extras(l), b.extras(r), "{:?} extras", H::KIND);
    }
}

/// Same element counts, attributes, extras and link topology.
fn assert_equivalent(a: &Document, b: &Document) {
    assert_same_names_and_extras::<nether_scene::Scene>(a, b);
    assert_same_names_and_extras::<nether_scene::Node>(a, b);
    assert_same_names_and_extras::<nether_scene::Mesh>(a, b);
    assert_same_names_and_extras::<nether_scene::Material>(a, b);
    assert_same_names_and_extras::<nether_scene::Texture>(a, b);
    assert_same_names_and_extras::<nether_scene::Accessor>(a, b);
    assert_same_names_and_extras::<nether_scene::Buffer>(a, b);
    assert_eq!(a.extras(a.root()), b.extras(b.root()));

    let (nodes_a, nodes_b) = (a.list_nodes(), b.list_nodes());
    let (meshes_a, meshes_b) = (a.list_meshes(), b.list_meshes());
    let (materials_a, materials_b) = (a.list_materials(), b.list_materials());
    let (textures_a, textures_b) = (a.list_textures(), b.list_textures());
    let (accessors_a, accessors_b) = (a.list_accessors(), b.list_accessors());

    for (&sa, &sb) in a.list_scenes().iter().zip(&b.list_scenes()) {
        let left: Vec<_> = a.scene_nodes(sa).into_iter().map(|n| position(&nodes_a, n)).collect();
        let right: Vec<_> = b.scene_nodes(sb).into_iter().map(|n| position(&nodes_b, n)).collect();
        assert_eq!(left, right, "scene nodes");
    }

    for (&na, &nb) in nodes_a.iter().zip(&nodes_b) {
        assert_eq!(a.get(na), b.get(nb), "node attributes");
        let left: Vec<_> = a.node_children(na).into_iter().map(|n| position(&nodes_a, n)).collect();
        let right: Vec<_> = b.node_children(nb).into_iter().map(|n| position(&nodes_b, n)).collect();
        assert_eq!(left, right, "node children");
        assert_eq!(
            a.node_mesh(na).map(|m| position(&meshes_a, m)),
            b.node_mesh(nb).map(|m| position(&meshes_b, m)),
            "node mesh"
        );
    }

    for (&ma, &mb) in meshes_a.iter().zip(&meshes_b) {
        let (prims_a, prims_b) = (a.mesh_primitives(ma), b.mesh_primitives(mb));
        assert_eq!(prims_a.len(), prims_b.len());
        for (&pa, &pb) in prims_a.iter().zip(&prims_b) {
            assert_eq!(a.get(pa), b.get(pb), "primitive mode");
            assert_eq!(a.extras(pa), b.extras(pb), "primitive extras");
            let left: Vec<_> = a
                .attributes(pa)
                .into_iter()
                .map(|(semantic, acc)| (semantic, position(&accessors_a, acc)))
                .collect();
            let right: Vec<_> = b
                .attributes(pb)
                .into_iter()
                .map(|(semantic, acc)| (semantic, position(&accessors_b, acc)))
                .collect();
            assert_eq!(left, right, "primitive attributes");
            assert_eq!(
                a.indices(pa).map(|i| position(&accessors_a, i)),
                b.indices(pb).map(|i| position(&accessors_b, i))
            );
            assert_eq!(
                a.material(pa).map(|m| position(&materials_a, m)),
                b.material(pb).map(|m| position(&materials_b, m))
            );
        }
    }

    for (&ma, &mb) in materials_a.iter().zip(&materials_b) {
        assert_eq!(a.get(ma), b.get(mb), "material attributes");
        for slot in TextureSlot::ALL {
            assert_eq!(
                a.texture(ma, slot).map(|t| position(&textures_a, t)),
                b.texture(mb, slot).map(|t| position(&textures_b, t)),
                "{} texture",
                slot.relation_name()
            );
        }
    }

    for (&ta, &tb) in textures_a.iter().zip(&textures_b) {
        assert_eq!(a.get(ta).unwrap().image, b.get(tb).unwrap().image);
    }

    for (&aa, &ab) in accessors_a.iter().zip(&accessors_b) {
        assert_eq!(a.get(aa), b.get(ab), "accessor data");
    }
}

fn roundtrip(doc: &Document, options: &WriteOptions) -> Document {
    let output = write(doc, options).unwrap();
    let bytes = output.to_bytes().unwrap();
    match options.packing {
        Packing::Separate => read(&bytes, &output.resolver()).unwrap(),
        Packing::Binary | Packing::Embedded => read(&bytes, &NoResolver).unwrap(),
    }
}

#[test]
fn test_roundtrip_binary() {
    common::init_tracing();
    let fixture = common::textured_cube();

    let back = roundtrip(&fixture.doc, &WriteOptions::binary());

    assert_equivalent(&fixture.doc, &back);
    assert_eq!(
        back.get(back.root()).unwrap().asset.copyright.as_deref(),
        Some("test fixture")
    );
    let scene = back.list_scenes()[0];
    assert_eq!(back.default_scene(), Some(scene));
}

#[test]
fn test_roundtrip_separate() {
    common::init_tracing();
    let fixture = common::textured_cube();

    let back = roundtrip(&fixture.doc, &WriteOptions::separate("cube"));

    assert_equivalent(&fixture.doc, &back);
    let buffer = back.list_buffers()[0];
    assert_eq!(back.get(buffer).unwrap().uri.as_deref(), Some("cube.bin"));
    let texture = back.list_textures()[0];
    assert_eq!(
        back.get(texture).unwrap().uri.as_deref(),
        Some("baseColor_1.png")
    );
}

#[test]
fn test_roundtrip_embedded() {
    common::init_tracing();
    let fixture = common::textured_cube();

    let back = roundtrip(&fixture.doc, &WriteOptions::embedded());

    assert_equivalent(&fixture.doc, &back);
}

#[test]
fn test_roundtrip_is_stable() {
    common::init_tracing();
    let fixture = common::textured_cube();
    let options = WriteOptions::binary();

    let first = write(&fixture.doc, &options).unwrap();
    let back = read(&first.to_bytes().unwrap(), &NoResolver).unwrap();
    let second = write(&back, &options).unwrap();

    assert_eq!(first.json.buffer_views, second.json.buffer_views);
    assert_eq!(first.json.accessors, second.json.accessors);
    assert_eq!(first.json.materials, second.json.materials);
    assert_eq!(first.json.samplers, second.json.samplers);
}

#[test]
fn test_roundtrip_shared_texture_stays_shared() {
    common::init_tracing();
    let mut fixture = common::textured_cube();
    let doc = &mut fixture.doc;
    let second = doc.create_material("second");
    doc.set_texture(second, TextureSlot::Emissive, Some(fixture.texture))
        .unwrap();

    let back = roundtrip(doc, &WriteOptions::binary());

    assert_equivalent(doc, &back);
    let texture = back.list_textures()[0];
    assert_eq!(back.parents_of::<nether_scene::Material>(texture).len(), 2);
}

#[test]
fn test_roundtrip_external_texture_uri() {
    common::init_tracing();
    let mut doc = Document::new();
    let texture = doc.create_texture("remote");
    doc.get_mut(texture).unwrap().set_uri("textures/remote.png");

    let output = write(&doc, &WriteOptions::separate("scene")).unwrap();
    assert_eq!(
        output.json.images[0].uri.as_deref(),
        Some("textures/remote.png")
    );
    assert!(output.resources.is_empty());

    let mut resolver = MemoryResolver::new();
    resolver.insert("textures/remote.png", common::png(b"remote"));
    let back = read(&output.to_bytes().unwrap(), &resolver).unwrap();
    let texture = back.list_textures()[0];
    assert_eq!(back.get(texture).unwrap().image, common::png(b"remote"));
    assert_eq!(
        back.get(texture).unwrap().uri.as_deref(),
        Some("textures/remote.png")
    );
}

#[test]
fn test_roundtrip_non_finite_accessor_values() {
    common::init_tracing();
    let mut fixture = common::textured_cube();
    let weights = fixture.doc.create_accessor("weights");
    fixture
        .doc
        .get_mut(weights)
        .unwrap()
        .set_f32(&[1.0, f32::INFINITY, f32::NAN]);

    let output = write(&fixture.doc, &WriteOptions::binary()).unwrap();
    let written = output
        .json
        .accessors
        .iter()
        .find(|accessor| accessor.name.as_deref() == Some("weights"))
        .unwrap();
    assert!(written.min.is_empty());
    assert!(written.max.is_empty());

    let back = read(&output.to_bytes().unwrap(), &NoResolver).unwrap();

    assert_equivalent(&fixture.doc, &back);
    let values = back.get(back.list_accessors()[3]).unwrap().as_f32().unwrap();
    assert_eq!(values[..2], [1.0, f32::INFINITY]);
    assert!(values[2].is_nan());
}
