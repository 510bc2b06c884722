//! Public facade over the element graph.
//!
//! A [`Document`] owns one [`Graph`] and its Root element. Factories register
//! new elements and attach top-level kinds to Root; link setters translate
//! typed calls into graph edges.
//!
//! ```
//! use nether_scene::{Document, TextureSlot};
//!
//! let mut doc = Document::new();
//! let texture = doc.create_texture("albedo");
//! let a = doc.create_material("a");
//! let b = doc.create_material("b");
//! doc.set_texture(a, TextureSlot::BaseColor, Some(texture)).unwrap();
//! doc.set_texture(b, TextureSlot::BaseColor, Some(texture)).unwrap();
//!
//! assert_eq!(doc.parents_of::<nether_scene::Material>(texture).len(), 2);
//! ```

use hashbrown::HashSet;

use crate::element::{
    Accessor, Buffer, Element, ElementData, ElementKind, Extras, Handle, Material, Mesh, Node,
    Primitive, Root, Scene, Texture,
};
use crate::error::{Error, Result};
use crate::graph::{CloneMap, ElementId, Graph, Relation};
use crate::properties::{
    AccessorData, BufferData, MaterialData, MeshData, NodeData, PrimitiveData, RootData, SceneData,
    TextureData, TextureSlot,
};

/// A glTF asset held as a graph of elements.
#[derive(Debug)]
pub struct Document {
    graph: Graph,
    root: Root,
}

impl Document {
    pub fn new() -> Self {
        let mut graph = Graph::new();
        let root = Root::from_id(graph.insert(Element::new(ElementData::Root(RootData::default()))));
        Self { graph, root }
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    // ------------------------------------------------------------------
    // Factories
    // ------------------------------------------------------------------

    pub fn create_scene(&mut self, name: &str) -> Scene {
        self.create(name, ElementData::Scene(SceneData))
    }

    pub fn create_node(&mut self, name: &str) -> Node {
        self.create(name, ElementData::Node(NodeData::default()))
    }

    pub fn create_mesh(&mut self, name: &str) -> Mesh {
        self.create(name, ElementData::Mesh(MeshData))
    }

    /// Primitives are not top-level; add them to a mesh with
    /// [`add_primitive`](Self::add_primitive).
    pub fn create_primitive(&mut self, name: &str) -> Primitive {
        self.create(name, ElementData::Primitive(PrimitiveData::default()))
    }

    pub fn create_material(&mut self, name: &str) -> Material {
        self.create(name, ElementData::Material(MaterialData::default()))
    }

    pub fn create_texture(&mut self, name: &str) -> Texture {
        self.create(name, ElementData::Texture(TextureData::default()))
    }

    pub fn create_accessor(&mut self, name: &str) -> Accessor {
        self.create(name, ElementData::Accessor(AccessorData::default()))
    }

    pub fn create_buffer(&mut self, name: &str) -> Buffer {
        self.create(name, ElementData::Buffer(BufferData::default()))
    }

    fn create<H: Handle>(&mut self, name: &str, data: ElementData) -> H {
        let name = (!name.is_empty()).then(|| name.to_string());
        let element = Element::new(data).with_name(name);
        let id = if H::KIND.is_top_level() {
            self.graph
                .insert_linked(self.root.id(), Relation::Member, element)
        } else {
            self.graph.insert(element)
        };
        H::from_id(id)
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Attributes of `handle`, `None` once disposed or for foreign handles.
    pub fn get<H: Handle>(&self, handle: H) -> Option<&H::Data> {
        self.graph
            .get(handle.into())
            .and_then(|element| H::data(&element.data))
    }

    pub fn get_mut<H: Handle>(&mut self, handle: H) -> Option<&mut H::Data> {
        self.graph
            .get_mut(handle.into())
            .and_then(|element| H::data_mut(&mut element.data))
    }

    pub fn element(&self, id: impl Into<ElementId>) -> Option<&Element> {
        self.graph.get(id.into())
    }

    pub fn kind(&self, id: impl Into<ElementId>) -> Option<ElementKind> {
        self.element(id).map(Element::kind)
    }

    pub fn name(&self, id: impl Into<ElementId>) -> Option<&str> {
        self.element(id).and_then(|element| element.name.as_deref())
    }

    /// Rename a live element. An empty name clears it.
    pub fn set_name(&mut self, id: impl Into<ElementId>, name: &str) {
        if let Some(element) = self.graph.get_mut(id.into()) {
            element.name = (!name.is_empty()).then(|| name.to_string());
        }
    }

    pub fn extras(&self, id: impl Into<ElementId>) -> Option<&Extras> {
        self.element(id).map(|element| &element.extras)
    }

    pub fn extras_mut(&mut self, id: impl Into<ElementId>) -> Option<&mut Extras> {
        self.graph.get_mut(id.into()).map(|element| &mut element.extras)
    }

    pub fn set_extras(&mut self, id: impl Into<ElementId>, extras: Extras) {
        if let Some(element) = self.graph.get_mut(id.into()) {
            element.extras = extras;
        }
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    pub fn add_scene_node(&mut self, scene: Scene, node: Node) -> Result<()> {
        self.graph.link(scene.id(), Relation::SceneNode, node.id())
    }

    pub fn remove_scene_node(&mut self, scene: Scene, node: Node) {
        self.graph.unlink(scene.id(), &Relation::SceneNode, node.id());
    }

    pub fn scene_nodes(&self, scene: Scene) -> Vec<Node> {
        self.typed_targets(scene.id(), &Relation::SceneNode)
    }

    /// Make `child` a child of `parent`, detaching it from its previous
    /// parent node. Fails when `child` is an ancestor of `parent`.
    pub fn add_child(&mut self, parent: Node, child: Node) -> Result<()> {
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::InvalidLink {
                    owner: parent.id(),
                    target: child.id(),
                    reason: "node hierarchy would contain a cycle",
                });
            }
            cursor = self.node_parent(node);
        }

        let previous: Vec<ElementId> = self
            .graph
            .parent_links(child.id())
            .iter()
            .filter(|link| link.relation == Relation::Child && link.element != parent.id())
            .map(|link| link.element)
            .collect();
        self.graph.link(parent.id(), Relation::Child, child.id())?;
        for owner in previous {
            self.graph.unlink(owner, &Relation::Child, child.id());
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent: Node, child: Node) {
        self.graph.unlink(parent.id(), &Relation::Child, child.id());
    }

    pub fn node_children(&self, node: Node) -> Vec<Node> {
        self.typed_targets(node.id(), &Relation::Child)
    }

    pub fn node_parent(&self, node: Node) -> Option<Node> {
        self.graph
            .parent_links(node.id())
            .iter()
            .find(|link| link.relation == Relation::Child)
            .map(|link| Node::from_id(link.element))
    }

    pub fn set_node_mesh(&mut self, node: Node, mesh: Option<Mesh>) -> Result<()> {
        self.set_single(node.id(), Relation::Mesh, mesh.map(Into::into))
    }

    pub fn node_mesh(&self, node: Node) -> Option<Mesh> {
        self.typed_target(node.id(), &Relation::Mesh)
    }

    pub fn add_primitive(&mut self, mesh: Mesh, primitive: Primitive) -> Result<()> {
        self.graph.link(mesh.id(), Relation::Primitive, primitive.id())
    }

    pub fn remove_primitive(&mut self, mesh: Mesh, primitive: Primitive) {
        self.graph.unlink(mesh.id(), &Relation::Primitive, primitive.id());
    }

    pub fn mesh_primitives(&self, mesh: Mesh) -> Vec<Primitive> {
        self.typed_targets(mesh.id(), &Relation::Primitive)
    }

    /// Bind (or with `None`, remove) the accessor for a vertex semantic such
    /// as `POSITION` or `TEXCOORD_0`.
    pub fn set_attribute(
        &mut self,
        primitive: Primitive,
        semantic: &str,
        accessor: Option<Accessor>,
    ) -> Result<()> {
        self.set_single(
            primitive.id(),
            Relation::Attribute(semantic.to_string()),
            accessor.map(Into::into),
        )
    }

    pub fn attribute(&self, primitive: Primitive, semantic: &str) -> Option<Accessor> {
        self.typed_target(primitive.id(), &Relation::Attribute(semantic.to_string()))
    }

    /// Semantic/accessor pairs in link order.
    pub fn attributes(&self, primitive: Primitive) -> Vec<(String, Accessor)> {
        self.graph
            .links(primitive.id())
            .iter()
            .filter_map(|link| match &link.relation {
                Relation::Attribute(semantic) => {
                    Some((semantic.clone(), Accessor::from_id(link.element)))
                }
                _ => None,
            })
            .collect()
    }

    pub fn set_indices(&mut self, primitive: Primitive, accessor: Option<Accessor>) -> Result<()> {
        self.set_single(primitive.id(), Relation::Indices, accessor.map(Into::into))
    }

    pub fn indices(&self, primitive: Primitive) -> Option<Accessor> {
        self.typed_target(primitive.id(), &Relation::Indices)
    }

    pub fn set_material(&mut self, primitive: Primitive, material: Option<Material>) -> Result<()> {
        self.set_single(primitive.id(), Relation::Material, material.map(Into::into))
    }

    pub fn material(&self, primitive: Primitive) -> Option<Material> {
        self.typed_target(primitive.id(), &Relation::Material)
    }

    /// Bind a texture to a material slot. Sampler settings for this usage
    /// live in [`MaterialData::texture_info_mut`].
    pub fn set_texture(
        &mut self,
        material: Material,
        slot: TextureSlot,
        texture: Option<Texture>,
    ) -> Result<()> {
        self.set_single(material.id(), Relation::Texture(slot), texture.map(Into::into))
    }

    pub fn texture(&self, material: Material, slot: TextureSlot) -> Option<Texture> {
        self.typed_target(material.id(), &Relation::Texture(slot))
    }

    /// Bound slots in slot order.
    pub fn material_textures(&self, material: Material) -> Vec<(TextureSlot, Texture)> {
        TextureSlot::ALL
            .iter()
            .filter_map(|&slot| self.texture(material, slot).map(|texture| (slot, texture)))
            .collect()
    }

    pub fn set_accessor_buffer(&mut self, accessor: Accessor, buffer: Option<Buffer>) -> Result<()> {
        self.set_single(accessor.id(), Relation::Buffer, buffer.map(Into::into))
    }

    pub fn accessor_buffer(&self, accessor: Accessor) -> Option<Buffer> {
        self.typed_target(accessor.id(), &Relation::Buffer)
    }

    pub fn set_texture_buffer(&mut self, texture: Texture, buffer: Option<Buffer>) -> Result<()> {
        self.set_single(texture.id(), Relation::Buffer, buffer.map(Into::into))
    }

    pub fn texture_buffer(&self, texture: Texture) -> Option<Buffer> {
        self.typed_target(texture.id(), &Relation::Buffer)
    }

    pub fn set_default_scene(&mut self, scene: Option<Scene>) -> Result<()> {
        self.set_single(self.root.id(), Relation::DefaultScene, scene.map(Into::into))
    }

    pub fn default_scene(&self) -> Option<Scene> {
        self.typed_target(self.root.id(), &Relation::DefaultScene)
    }

    fn set_single(
        &mut self,
        owner: ElementId,
        relation: Relation,
        target: Option<ElementId>,
    ) -> Result<()> {
        match target {
            Some(target) => self.graph.link(owner, relation, target),
            None => {
                self.graph.unlink_relation(owner, &relation);
                Ok(())
            }
        }
    }

    fn typed_target<H: Handle>(&self, owner: ElementId, relation: &Relation) -> Option<H> {
        self.graph
            .target(owner, relation)
            .filter(|&id| self.kind(id) == Some(H::KIND))
            .map(H::from_id)
    }

    fn typed_targets<H: Handle>(&self, owner: ElementId, relation: &Relation) -> Vec<H> {
        self.graph
            .targets(owner, relation)
            .into_iter()
            .filter(|&id| self.kind(id) == Some(H::KIND))
            .map(H::from_id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    /// Top-level elements of one kind attached to Root, in Root order.
    pub fn list<H: Handle>(&self) -> Vec<H> {
        self.typed_targets(self.root.id(), &Relation::Member)
    }

    pub fn list_scenes(&self) -> Vec<Scene> {
        self.list()
    }

    pub fn list_nodes(&self) -> Vec<Node> {
        self.list()
    }

    pub fn list_meshes(&self) -> Vec<Mesh> {
        self.list()
    }

    pub fn list_materials(&self) -> Vec<Material> {
        self.list()
    }

    pub fn list_textures(&self) -> Vec<Texture> {
        self.list()
    }

    pub fn list_accessors(&self) -> Vec<Accessor> {
        self.list()
    }

    pub fn list_buffers(&self) -> Vec<Buffer> {
        self.list()
    }

    /// Elements linking to `id` (Root included for top-level elements).
    pub fn list_parents(&self, id: impl Into<ElementId>) -> Vec<ElementId> {
        self.graph.list_parents(id.into())
    }

    pub fn list_children(&self, id: impl Into<ElementId>) -> Vec<ElementId> {
        self.graph.list_children(id.into())
    }

    /// Referrers of one kind, e.g. the materials using a texture.
    pub fn parents_of<H: Handle>(&self, id: impl Into<ElementId>) -> Vec<H> {
        self.graph
            .list_parents(id.into())
            .into_iter()
            .filter(|&parent| self.kind(parent) == Some(H::KIND))
            .map(H::from_id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Remove every link to and from `id`, Root membership included. The
    /// element stays alive and mutable but is no longer written.
    pub fn disconnect(&mut self, id: impl Into<ElementId>) {
        self.graph.disconnect(id.into());
    }

    /// Re-attach a top-level element to Root.
    pub fn attach(&mut self, id: impl Into<ElementId>) -> Result<()> {
        let id = id.into();
        match self.kind(id) {
            Some(kind) if kind.is_top_level() => {
                self.graph.link(self.root.id(), Relation::Member, id)
            }
            _ => Err(Error::InvalidLink {
                owner: self.root.id(),
                target: id,
                reason: "only live top-level elements attach to root",
            }),
        }
    }

    /// Disconnect and evict `id`. Root cannot be disposed.
    pub fn dispose(&mut self, id: impl Into<ElementId>) -> Option<Element> {
        let id = id.into();
        if id == self.root.id() {
            return None;
        }
        self.graph.dispose(id)
    }

    /// Elements the writer serializes.
    pub fn reachable(&self) -> HashSet<ElementId> {
        self.graph.reachable(self.root.id())
    }

    // ------------------------------------------------------------------
    // Cloning
    // ------------------------------------------------------------------

    /// Deep clone of `source`: exclusive sub-resources are copied, shared
    /// ones referenced. Top-level copies are attached to Root.
    pub fn clone_element<H: Handle>(&mut self, source: H) -> Result<H> {
        let (copy, map) = self.graph.deep_clone(source.into())?;
        self.attach_copies(&map)?;
        Ok(H::from_id(copy))
    }

    /// Overwrite `target` with `source`'s attributes, name, extras and
    /// outgoing links. Root membership and referrers of `target` are kept.
    pub fn copy_element<H: Handle>(&mut self, target: H, source: H) -> Result<()> {
        let map = self.graph.copy_from(target.into(), source.into())?;
        self.attach_copies(&map)
    }

    fn attach_copies(&mut self, map: &CloneMap) -> Result<()> {
        let mut copies: Vec<ElementId> = map.values().copied().collect();
        copies.sort();
        for copy in copies {
            if self.kind(copy).is_some_and(|kind| kind.is_top_level()) {
                self.graph.link(self.root.id(), Relation::Member, copy)?;
            }
        }
        Ok(())
    }

    /// The element of this document at the same arena position as `handle`.
    ///
    /// Maps handles of a document to handles of its [`Clone`].
    pub fn counterpart<H: Handle>(&self, handle: H) -> Option<H> {
        self.graph
            .id_at(handle.into().index())
            .filter(|&id| self.kind(id) == Some(H::KIND))
            .map(H::from_id)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        let graph = self.graph.duplicate();
        let root = Root::from_id(graph.rebase(self.root.id()));
        Self { graph, root }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::WrapMode;

    #[test]
    fn test_factories_attach_top_level_only() {
        let mut doc = Document::new();
        let mesh = doc.create_mesh("box");
        let prim = doc.create_primitive("");

        assert_eq!(doc.list_meshes(), vec![mesh]);
        assert_eq!(doc.name(mesh), Some("box"));
        assert_eq!(doc.name(prim), None);
        assert!(doc.list_parents(prim).is_empty());
    }

    #[test]
    fn test_get_after_dispose_is_none() {
        let mut doc = Document::new();
        let node = doc.create_node("n");
        assert!(doc.get(node).is_some());

        doc.dispose(node);
        assert!(doc.get(node).is_none());
        assert!(doc.list_nodes().is_empty());
    }

    #[test]
    fn test_foreign_handle_is_rejected() {
        let mut a = Document::new();
        let mut b = Document::new();
        let scene = a.create_scene("");
        let node = b.create_node("");

        assert!(a.get(node).is_none());
        assert!(matches!(
            a.add_scene_node(scene, node),
            Err(Error::InvalidLink { .. })
        ));
    }

    #[test]
    fn test_add_child_reparents() {
        let mut doc = Document::new();
        let a = doc.create_node("a");
        let b = doc.create_node("b");
        let child = doc.create_node("child");

        doc.add_child(a, child).unwrap();
        doc.add_child(b, child).unwrap();

        assert!(doc.node_children(a).is_empty());
        assert_eq!(doc.node_children(b), vec![child]);
        assert_eq!(doc.node_parent(child), Some(b));
    }

    #[test]
    fn test_add_child_rejects_cycle() {
        let mut doc = Document::new();
        let a = doc.create_node("a");
        let b = doc.create_node("b");
        doc.add_child(a, b).unwrap();

        assert!(doc.add_child(b, a).is_err());
        assert_eq!(doc.node_parent(b), Some(a));
    }

    #[test]
    fn test_attribute_swap_and_clear() {
        let mut doc = Document::new();
        let prim = doc.create_primitive("");
        let first = doc.create_accessor("");
        let second = doc.create_accessor("");

        doc.set_attribute(prim, "POSITION", Some(first)).unwrap();
        doc.set_attribute(prim, "POSITION", Some(second)).unwrap();
        assert_eq!(doc.attribute(prim, "POSITION"), Some(second));
        assert_eq!(doc.attributes(prim).len(), 1);

        doc.set_attribute(prim, "POSITION", None).unwrap();
        assert!(doc.attribute(prim, "POSITION").is_none());
    }

    #[test]
    fn test_texture_users() {
        let mut doc = Document::new();
        let texture = doc.create_texture("");
        let a = doc.create_material("a");
        let b = doc.create_material("b");
        doc.set_texture(a, TextureSlot::Normal, Some(texture)).unwrap();
        doc.set_texture(b, TextureSlot::BaseColor, Some(texture)).unwrap();

        assert_eq!(doc.parents_of::<Material>(texture), vec![a, b]);
        assert_eq!(
            doc.material_textures(a),
            vec![(TextureSlot::Normal, texture)]
        );
    }

    #[test]
    fn test_disconnect_and_attach() {
        let mut doc = Document::new();
        let buffer = doc.create_buffer("");
        doc.disconnect(buffer);
        assert!(!doc.reachable().contains(&buffer.id()));
        assert!(doc.get(buffer).is_some());

        doc.attach(buffer).unwrap();
        assert!(doc.reachable().contains(&buffer.id()));

        let prim = doc.create_primitive("");
        assert!(doc.attach(prim).is_err());
    }

    #[test]
    fn test_clone_mesh_shares_material() {
        let mut doc = Document::new();
        let mesh = doc.create_mesh("mesh");
        let prim = doc.create_primitive("");
        let position = doc.create_accessor("position");
        let material = doc.create_material("mat");
        doc.add_primitive(mesh, prim).unwrap();
        doc.set_attribute(prim, "POSITION", Some(position)).unwrap();
        doc.set_material(prim, Some(material)).unwrap();

        let copy = doc.clone_element(mesh).unwrap();

        let prim_copy = doc.mesh_primitives(copy)[0];
        assert_ne!(prim_copy, prim);
        assert_eq!(doc.material(prim_copy), Some(material));
        let position_copy = doc.attribute(prim_copy, "POSITION").unwrap();
        assert_ne!(position_copy, position);
        assert_eq!(doc.list_meshes(), vec![mesh, copy]);
        assert_eq!(doc.list_accessors(), vec![position, position_copy]);
        assert_eq!(doc.name(copy), Some("mesh"));
    }

    #[test]
    fn test_clone_does_not_alias_attributes() {
        let mut doc = Document::new();
        let node = doc.create_node("");
        let copy = doc.clone_element(node).unwrap();

        doc.get_mut(copy).unwrap().set_translation([1.0, 2.0, 3.0]);
        assert_eq!(doc.get(node).unwrap().translation, [0.0; 3]);
    }

    #[test]
    fn test_copy_element_replaces_state() {
        let mut doc = Document::new();
        let source = doc.create_material("source");
        let target = doc.create_material("target");
        let texture = doc.create_texture("");
        doc.get_mut(source)
            .unwrap()
            .texture_info_mut(TextureSlot::BaseColor)
            .set_wrap(WrapMode::ClampToEdge, WrapMode::ClampToEdge);
        doc.set_texture(source, TextureSlot::BaseColor, Some(texture))
            .unwrap();
        doc.extras_mut(source)
            .unwrap()
            .insert("tag".into(), serde_json::json!([1, 2]));

        doc.copy_element(target, source).unwrap();

        assert_eq!(doc.name(target), Some("source"));
        assert_eq!(doc.texture(target, TextureSlot::BaseColor), Some(texture));
        assert_eq!(doc.extras(target), doc.extras(source));
        assert_eq!(doc.list_materials(), vec![source, target]);
    }

    #[test]
    fn test_document_clone_is_independent() {
        let mut doc = Document::new();
        let node = doc.create_node("a");
        let scene = doc.create_scene("");
        doc.add_scene_node(scene, node).unwrap();

        let mut copy = doc.clone();
        let node_copy = copy.counterpart(node).unwrap();
        copy.set_name(node_copy, "b");

        assert_eq!(doc.name(node), Some("a"));
        assert_eq!(copy.name(node_copy), Some("b"));
        let scene_copy = copy.counterpart(scene).unwrap();
        assert_eq!(copy.scene_nodes(scene_copy), vec![node_copy]);
        assert!(copy.get(node).is_none());
    }

    #[test]
    fn test_document_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Document>();
    }
}
