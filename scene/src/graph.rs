//! Element arena and link bookkeeping.
//!
//! The [`Graph`] owns every [`Element`] of a document and is the only place
//! where links between elements are recorded. Each live element keeps two
//! adjacency lists (outgoing links and incoming links), updated together on
//! every [`Graph::link`] / [`Graph::unlink`], so "who references me" queries
//! and dispose-time cleanup never scan the whole arena.
//!
//! # Link kinds
//!
//! Every [`Relation`] is either [`LinkKind::Exclusive`] or
//! [`LinkKind::Shared`]. The kind only matters for [`Graph::deep_clone`] and
//! [`Graph::copy_from`]: exclusive targets are copied recursively, shared
//! targets are re-pointed at the same element.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use hashbrown::{HashMap, HashSet};

use crate::element::Element;
use crate::error::{Error, Result};
use crate::properties::TextureSlot;

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a [`Graph`]; element ids carry it so cross-graph links fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u32);

impl GraphId {
    fn next() -> Self {
        GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable identity of an element. Ordering follows creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    graph: GraphId,
    index: u32,
}

impl ElementId {
    /// Arena position of the element (creation order within its graph).
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn graph(&self) -> GraphId {
        self.graph
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.graph.0, self.index)
    }
}

/// Typed edge label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Root -> top-level element.
    Member,
    /// Root -> scene rendered by default.
    DefaultScene,
    /// Scene -> root node of the scene.
    SceneNode,
    /// Node -> child node.
    Child,
    /// Node -> mesh instance.
    Mesh,
    /// Mesh -> primitive.
    Primitive,
    /// Primitive -> vertex attribute accessor, keyed by semantic.
    Attribute(String),
    /// Primitive -> index accessor.
    Indices,
    /// Primitive -> material.
    Material,
    /// Material -> texture bound to a slot.
    Texture(TextureSlot),
    /// Accessor or texture -> buffer receiving its bytes on write.
    Buffer,
}

/// Whether a link target is owned by (exclusive) or shared with the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Exclusive,
    Shared,
}

impl Relation {
    pub fn kind(&self) -> LinkKind {
        match self {
            Relation::Child | Relation::Primitive | Relation::Attribute(_) | Relation::Indices => {
                LinkKind::Exclusive
            }
            _ => LinkKind::Shared,
        }
    }

    /// Single-valued relations hold at most one target per owner.
    pub fn is_single(&self) -> bool {
        matches!(
            self,
            Relation::DefaultScene
                | Relation::Mesh
                | Relation::Attribute(_)
                | Relation::Indices
                | Relation::Material
                | Relation::Texture(_)
                | Relation::Buffer
        )
    }
}

/// One adjacency entry: the relation and the element at the other end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub relation: Relation,
    pub element: ElementId,
}

#[derive(Debug, Clone)]
struct Slot {
    element: Element,
    /// Outgoing links, in link order.
    children: Vec<Link>,
    /// Incoming links; `element` is the owner.
    parents: Vec<Link>,
}

/// Maps source elements to the copies created by a clone or copy.
pub type CloneMap = HashMap<ElementId, ElementId>;

/// Arena of elements plus their links.
#[derive(Debug)]
pub struct Graph {
    id: GraphId,
    slots: Vec<Option<Slot>>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            id: GraphId::next(),
            slots: Vec::new(),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Register a new element and return its identity.
    pub fn insert(&mut self, element: Element) -> ElementId {
        let id = ElementId {
            graph: self.id,
            index: self.slots.len() as u32,
        };
        self.slots.push(Some(Slot {
            element,
            children: Vec::new(),
            parents: Vec::new(),
        }));
        id
    }

    /// Register a new element and link it from `owner`.
    ///
    /// A fresh element has no edges, so none of the checks in
    /// [`link`](Self::link) apply. If `owner` is not live the element is
    /// inserted unlinked.
    pub fn insert_linked(
        &mut self,
        owner: ElementId,
        relation: Relation,
        element: Element,
    ) -> ElementId {
        let id = self.insert(element);
        if !self.contains(owner) {
            return id;
        }
        if let Some(slot) = self.slot_mut(id) {
            slot.parents.push(Link {
                relation: relation.clone(),
                element: owner,
            });
        }
        if let Some(slot) = self.slot_mut(owner) {
            slot.children.push(Link {
                relation,
                element: id,
            });
        }
        id
    }

    /// Whether `id` names a live element of this graph.
    pub fn contains(&self, id: ElementId) -> bool {
        self.slot(id).is_some()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.slot(id).map(|slot| &slot.element)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.slot_mut(id).map(|slot| &mut slot.element)
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live elements in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> + '_ {
        let graph = self.id;
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            slot.as_ref().map(|slot| {
                (
                    ElementId {
                        graph,
                        index: index as u32,
                    },
                    &slot.element,
                )
            })
        })
    }

    /// Register a directed edge `owner -relation-> target`.
    ///
    /// Single-valued relations replace their previous target. Re-linking an
    /// identical edge is a no-op.
    pub fn link(&mut self, owner: ElementId, relation: Relation, target: ElementId) -> Result<()> {
        if !self.contains(owner) {
            return Err(Error::InvalidLink {
                owner,
                target,
                reason: "owner is not part of this graph",
            });
        }
        if !self.contains(target) {
            return Err(Error::InvalidLink {
                owner,
                target,
                reason: "target is not part of this graph",
            });
        }
        if owner == target {
            return Err(Error::InvalidLink {
                owner,
                target,
                reason: "an element cannot link to itself",
            });
        }

        if relation.is_single() {
            if self.target(owner, &relation) == Some(target) {
                return Ok(());
            }
            self.unlink_relation(owner, &relation);
        } else if self.has_link(owner, &relation, target) {
            return Ok(());
        }

        if let Some(slot) = self.slot_mut(owner) {
            slot.children.push(Link {
                relation: relation.clone(),
                element: target,
            });
        }
        if let Some(slot) = self.slot_mut(target) {
            slot.parents.push(Link {
                relation,
                element: owner,
            });
        }
        Ok(())
    }

    /// Remove one edge; no-op if absent.
    pub fn unlink(&mut self, owner: ElementId, relation: &Relation, target: ElementId) {
        if let Some(slot) = self.slot_mut(owner) {
            slot.children
                .retain(|link| !(link.element == target && &link.relation == relation));
        }
        if let Some(slot) = self.slot_mut(target) {
            slot.parents
                .retain(|link| !(link.element == owner && &link.relation == relation));
        }
    }

    /// Remove every edge of `relation` going out of `owner`.
    pub fn unlink_relation(&mut self, owner: ElementId, relation: &Relation) {
        for target in self.targets(owner, relation) {
            self.unlink(owner, relation, target);
        }
    }

    pub fn has_link(&self, owner: ElementId, relation: &Relation, target: ElementId) -> bool {
        self.links(owner)
            .iter()
            .any(|link| link.element == target && &link.relation == relation)
    }

    /// First target of `relation` (the only one for single relations).
    pub fn target(&self, owner: ElementId, relation: &Relation) -> Option<ElementId> {
        self.links(owner)
            .iter()
            .find(|link| &link.relation == relation)
            .map(|link| link.element)
    }

    /// Targets of `relation` in link order.
    pub fn targets(&self, owner: ElementId, relation: &Relation) -> Vec<ElementId> {
        self.links(owner)
            .iter()
            .filter(|link| &link.relation == relation)
            .map(|link| link.element)
            .collect()
    }

    /// Outgoing links of `id` (empty for unknown ids).
    pub fn links(&self, id: ElementId) -> &[Link] {
        self.slot(id).map(|slot| slot.children.as_slice()).unwrap_or(&[])
    }

    /// Incoming links of `id`; each link's `element` is the owner.
    pub fn parent_links(&self, id: ElementId) -> &[Link] {
        self.slot(id).map(|slot| slot.parents.as_slice()).unwrap_or(&[])
    }

    /// Distinct elements linking to `id`, in link order.
    pub fn list_parents(&self, id: ElementId) -> Vec<ElementId> {
        distinct(self.parent_links(id))
    }

    /// Distinct elements `id` links to, in link order.
    pub fn list_children(&self, id: ElementId) -> Vec<ElementId> {
        distinct(self.links(id))
    }

    /// Remove every edge touching `id`. The element stays alive.
    pub fn disconnect(&mut self, id: ElementId) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        let children = std::mem::take(&mut slot.children);
        let parents = std::mem::take(&mut slot.parents);

        for link in children {
            if let Some(target) = self.slot_mut(link.element) {
                target
                    .parents
                    .retain(|back| !(back.element == id && back.relation == link.relation));
            }
        }
        for link in parents {
            if let Some(owner) = self.slot_mut(link.element) {
                owner
                    .children
                    .retain(|fwd| !(fwd.element == id && fwd.relation == link.relation));
            }
        }
    }

    /// Disconnect and evict `id`, returning its last state.
    pub fn dispose(&mut self, id: ElementId) -> Option<Element> {
        if !self.contains(id) {
            return None;
        }
        self.disconnect(id);
        self.slots
            .get_mut(id.index as usize)
            .and_then(Option::take)
            .map(|slot| slot.element)
    }

    /// Elements reachable from `root` over outgoing links, `root` included.
    pub fn reachable(&self, root: ElementId) -> HashSet<ElementId> {
        let mut visited = HashSet::new();
        if !self.contains(root) {
            return visited;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            for link in self.links(id) {
                if !visited.contains(&link.element) {
                    stack.push(link.element);
                }
            }
        }
        visited
    }

    /// Structural copy of `source`.
    ///
    /// Exclusive links are followed and their targets copied; shared links
    /// point the copy at the original targets. The copy has no parents.
    pub fn deep_clone(&mut self, source: ElementId) -> Result<(ElementId, CloneMap)> {
        if !self.contains(source) {
            return Err(Error::InvalidLink {
                owner: source,
                target: source,
                reason: "cannot clone an element outside this graph",
            });
        }
        let mut map = CloneMap::new();
        let copy = self.clone_recursive(source, &mut map)?;
        Ok((copy, map))
    }

    /// Overwrite `target` with the attributes of `source` and re-create
    /// `source`'s outgoing links on it using the clone rules.
    pub fn copy_from(&mut self, target: ElementId, source: ElementId) -> Result<CloneMap> {
        if target == source {
            return Ok(CloneMap::new());
        }
        let element = self
            .get(source)
            .cloned()
            .ok_or(Error::InvalidLink {
                owner: target,
                target: source,
                reason: "copy source is not part of this graph",
            })?;
        let Some(slot) = self.slot_mut(target) else {
            return Err(Error::InvalidLink {
                owner: target,
                target: source,
                reason: "copy target is not part of this graph",
            });
        };
        slot.element = element;

        let outgoing: Vec<Link> = self.links(target).to_vec();
        for link in outgoing {
            self.unlink(target, &link.relation, link.element);
        }

        let mut map = CloneMap::new();
        map.insert(source, target);
        for link in self.links(source).to_vec() {
            let child = match link.relation.kind() {
                LinkKind::Exclusive => self.clone_recursive(link.element, &mut map)?,
                LinkKind::Shared => link.element,
            };
            self.link(target, link.relation, child)?;
        }
        map.remove(&source);
        Ok(map)
    }

    /// Copy of the whole graph under a fresh identity. Arena positions are
    /// preserved, so `index()` of every element is unchanged.
    pub fn duplicate(&self) -> Graph {
        let id = GraphId::next();
        let rehome = |link: &Link| Link {
            relation: link.relation.clone(),
            element: ElementId {
                graph: id,
                index: link.element.index,
            },
        };
        let slots = self
            .slots
            .iter()
            .map(|slot| {
                slot.as_ref().map(|slot| Slot {
                    element: slot.element.clone(),
                    children: slot.children.iter().map(rehome).collect(),
                    parents: slot.parents.iter().map(rehome).collect(),
                })
            })
            .collect();
        Graph { id, slots }
    }

    /// Id of the element at `index` in this graph, if live.
    pub fn id_at(&self, index: u32) -> Option<ElementId> {
        let id = ElementId {
            graph: self.id,
            index,
        };
        self.contains(id).then_some(id)
    }

    /// `id` re-homed into this graph, whether or not it is live here.
    pub(crate) fn rebase(&self, id: ElementId) -> ElementId {
        ElementId {
            graph: self.id,
            index: id.index,
        }
    }

    fn clone_recursive(&mut self, source: ElementId, map: &mut CloneMap) -> Result<ElementId> {
        if let Some(&copy) = map.get(&source) {
            return Ok(copy);
        }
        let element = self
            .get(source)
            .cloned()
            .ok_or(Error::InvalidLink {
                owner: source,
                target: source,
                reason: "dangling link during clone",
            })?;
        let copy = self.insert(element);
        map.insert(source, copy);

        for link in self.links(source).to_vec() {
            let child = match link.relation.kind() {
                LinkKind::Exclusive => self.clone_recursive(link.element, map)?,
                LinkKind::Shared => link.element,
            };
            self.link(copy, link.relation, child)?;
        }
        Ok(copy)
    }

    fn slot(&self, id: ElementId) -> Option<&Slot> {
        if id.graph != self.id {
            return None;
        }
        self.slots.get(id.index as usize).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: ElementId) -> Option<&mut Slot> {
        if id.graph != self.id {
            return None;
        }
        self.slots.get_mut(id.index as usize).and_then(Option::as_mut)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

fn distinct(links: &[Link]) -> Vec<ElementId> {
    let mut seen = HashSet::new();
    links
        .iter()
        .filter(|link| seen.insert(link.element))
        .map(|link| link.element)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementData;
    use crate::properties::{AccessorData, MaterialData, MeshData, NodeData, PrimitiveData};

    fn node(graph: &mut Graph) -> ElementId {
        graph.insert(Element::new(ElementData::Node(NodeData::default())))
    }

    #[test]
    fn test_link_tracks_both_directions() {
        let mut graph = Graph::new();
        let a = node(&mut graph);
        let b = node(&mut graph);

        graph.link(a, Relation::Child, b).unwrap();

        assert_eq!(graph.list_children(a), vec![b]);
        assert_eq!(graph.list_parents(b), vec![a]);
        assert!(graph.list_parents(a).is_empty());
    }

    #[test]
    fn test_insert_linked_adds_both_directions() {
        let mut graph = Graph::new();
        let owner = node(&mut graph);

        let child = graph.insert_linked(
            owner,
            Relation::Child,
            Element::new(ElementData::Node(NodeData::default())),
        );

        assert_eq!(graph.targets(owner, &Relation::Child), vec![child]);
        assert_eq!(graph.list_parents(child), vec![owner]);
    }

    #[test]
    fn test_insert_linked_without_live_owner_stays_unlinked() {
        let mut graph = Graph::new();
        let owner = node(&mut graph);
        graph.dispose(owner);

        let orphan = graph.insert_linked(
            owner,
            Relation::Child,
            Element::new(ElementData::Node(NodeData::default())),
        );

        assert!(graph.contains(orphan));
        assert!(graph.parent_links(orphan).is_empty());
    }

    #[test]
    fn test_link_rejects_foreign_and_disposed_elements() {
        let mut graph = Graph::new();
        let mut other = Graph::new();
        let a = node(&mut graph);
        let b = node(&mut graph);
        let foreign = node(&mut other);

        assert!(matches!(
            graph.link(a, Relation::Child, foreign),
            Err(Error::InvalidLink { .. })
        ));
        assert!(matches!(
            graph.link(a, Relation::Child, a),
            Err(Error::InvalidLink { .. })
        ));

        graph.dispose(b);
        assert!(graph.get(b).is_none());
        assert!(matches!(
            graph.link(a, Relation::Child, b),
            Err(Error::InvalidLink { .. })
        ));
    }

    #[test]
    fn test_single_relation_swaps_target() {
        let mut graph = Graph::new();
        let prim = graph.insert(Element::new(ElementData::Primitive(PrimitiveData::default())));
        let first = graph.insert(Element::new(ElementData::Accessor(AccessorData::default())));
        let second = graph.insert(Element::new(ElementData::Accessor(AccessorData::default())));
        let position = Relation::Attribute("POSITION".into());

        graph.link(prim, position.clone(), first).unwrap();
        graph.link(prim, position.clone(), second).unwrap();

        assert_eq!(graph.targets(prim, &position), vec![second]);
        assert!(graph.list_parents(first).is_empty());
    }

    #[test]
    fn test_list_relation_ignores_duplicate_edge() {
        let mut graph = Graph::new();
        let a = node(&mut graph);
        let b = node(&mut graph);

        graph.link(a, Relation::Child, b).unwrap();
        graph.link(a, Relation::Child, b).unwrap();

        assert_eq!(graph.links(a).len(), 1);
        assert_eq!(graph.parent_links(b).len(), 1);
    }

    #[test]
    fn test_unlink_missing_edge_is_noop() {
        let mut graph = Graph::new();
        let a = node(&mut graph);
        let b = node(&mut graph);
        graph.unlink(a, &Relation::Child, b);
        assert!(graph.links(a).is_empty());
    }

    #[test]
    fn test_disconnect_removes_edges_both_ways() {
        let mut graph = Graph::new();
        let parent = node(&mut graph);
        let middle = node(&mut graph);
        let child = node(&mut graph);
        graph.link(parent, Relation::Child, middle).unwrap();
        graph.link(middle, Relation::Child, child).unwrap();

        graph.disconnect(middle);

        assert!(graph.contains(middle));
        assert!(graph.links(parent).is_empty());
        assert!(graph.parent_links(child).is_empty());
        assert!(graph.links(middle).is_empty());
    }

    #[test]
    fn test_reachable_visits_each_element_once() {
        let mut graph = Graph::new();
        let root = node(&mut graph);
        let a = node(&mut graph);
        let b = node(&mut graph);
        let detached = node(&mut graph);
        graph.link(root, Relation::Child, a).unwrap();
        graph.link(root, Relation::SceneNode, b).unwrap();
        graph.link(a, Relation::Mesh, b).unwrap();
        // Cycle back to root must not loop.
        graph.link(b, Relation::SceneNode, root).unwrap();

        let reachable = graph.reachable(root);
        assert_eq!(reachable.len(), 3);
        assert!(!reachable.contains(&detached));
    }

    #[test]
    fn test_deep_clone_copies_exclusive_and_shares_shared() {
        let mut graph = Graph::new();
        let mesh = graph.insert(Element::new(ElementData::Mesh(MeshData)));
        let prim = graph.insert(Element::new(ElementData::Primitive(PrimitiveData::default())));
        let accessor = graph.insert(Element::new(ElementData::Accessor(AccessorData::default())));
        let material = graph.insert(Element::new(ElementData::Material(MaterialData::default())));
        graph.link(mesh, Relation::Primitive, prim).unwrap();
        graph
            .link(prim, Relation::Attribute("POSITION".into()), accessor)
            .unwrap();
        graph.link(prim, Relation::Material, material).unwrap();

        let (copy, map) = graph.deep_clone(mesh).unwrap();

        assert_ne!(copy, mesh);
        let prim_copy = graph.target(copy, &Relation::Primitive).unwrap();
        assert_ne!(prim_copy, prim);
        let accessor_copy = graph
            .target(prim_copy, &Relation::Attribute("POSITION".into()))
            .unwrap();
        assert_ne!(accessor_copy, accessor);
        assert_eq!(graph.target(prim_copy, &Relation::Material), Some(material));
        assert_eq!(map.len(), 3);
        assert_eq!(graph.list_parents(material).len(), 2);
    }

    #[test]
    fn test_deep_clone_preserves_diamonds() {
        let mut graph = Graph::new();
        let prim = graph.insert(Element::new(ElementData::Primitive(PrimitiveData::default())));
        let accessor = graph.insert(Element::new(ElementData::Accessor(AccessorData::default())));
        graph
            .link(prim, Relation::Attribute("POSITION".into()), accessor)
            .unwrap();
        graph
            .link(prim, Relation::Attribute("NORMAL".into()), accessor)
            .unwrap();

        let (copy, _) = graph.deep_clone(prim).unwrap();

        let position = graph.target(copy, &Relation::Attribute("POSITION".into()));
        let normal = graph.target(copy, &Relation::Attribute("NORMAL".into()));
        assert_eq!(position, normal);
        assert_ne!(position, Some(accessor));
    }

    #[test]
    fn test_duplicate_rehomes_links() {
        let mut graph = Graph::new();
        let a = node(&mut graph);
        let b = node(&mut graph);
        graph.link(a, Relation::Child, b).unwrap();

        let copy = graph.duplicate();

        assert_ne!(copy.id(), graph.id());
        let a2 = copy.id_at(a.index()).unwrap();
        let b2 = copy.id_at(b.index()).unwrap();
        assert_eq!(copy.list_children(a2), vec![b2]);
        assert!(!copy.contains(a));
    }
}
