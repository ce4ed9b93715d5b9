//! Core architecture model for Structo workspaces.
//!
//! A workspace holds three flat collections: elements (a tree through
//! `parent` links), relationships (directed edges between elements), and
//! views (named visualization scopes). Collection order is significant:
//! the generator walks elements, relationships, and views in the order
//! they are stored here.

use crate::id::Id;
use crate::resolve::{readable_id, sanitize_key};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Key (and identity) of the landscape view every workspace carries.
pub const LANDSCAPE_VIEW_KEY: &str = "landscape";

/// Tag that marks an element as external in the DSL.
pub const EXTERNAL_TAG: &str = "External";

// ─── Geometry ────────────────────────────────────────────────────────────

/// Top-left screen position of an element on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Fixed size, only meaningful for group-kind elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

// ─── Element kinds ───────────────────────────────────────────────────────

/// The closed set of element kinds.
///
/// Every kind except `Group` has a DSL keyword; groups are declared with
/// `group "Name" { ... }` and only enclose other elements visually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Person,
    SoftwareSystem,
    Container,
    Component,
    DeploymentNode,
    InfrastructureNode,
    Group,
}

impl ElementKind {
    /// All kinds, in style-table order.
    pub const ALL: [ElementKind; 7] = [
        ElementKind::Person,
        ElementKind::SoftwareSystem,
        ElementKind::Container,
        ElementKind::Component,
        ElementKind::DeploymentNode,
        ElementKind::InfrastructureNode,
        ElementKind::Group,
    ];

    /// DSL declaration keyword (`group` has no `ident = kind` form).
    pub fn keyword(self) -> &'static str {
        match self {
            ElementKind::Person => "person",
            ElementKind::SoftwareSystem => "softwareSystem",
            ElementKind::Container => "container",
            ElementKind::Component => "component",
            ElementKind::DeploymentNode => "deploymentNode",
            ElementKind::InfrastructureNode => "infrastructureNode",
            ElementKind::Group => "group",
        }
    }

    /// Parse an element declaration keyword. `group` is not a declaration
    /// keyword and is rejected here.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "person" => Some(ElementKind::Person),
            "softwareSystem" => Some(ElementKind::SoftwareSystem),
            "container" => Some(ElementKind::Container),
            "component" => Some(ElementKind::Component),
            "deploymentNode" => Some(ElementKind::DeploymentNode),
            "infrastructureNode" => Some(ElementKind::InfrastructureNode),
            _ => None,
        }
    }

    /// Suffix appended to readable identities (`UserPerson`, `ShopSystem`).
    pub fn type_suffix(self) -> &'static str {
        match self {
            ElementKind::Person => "Person",
            ElementKind::SoftwareSystem => "System",
            ElementKind::Container => "Container",
            ElementKind::Component => "Component",
            ElementKind::DeploymentNode => "Node",
            ElementKind::InfrastructureNode => "Infra",
            ElementKind::Group => "Group",
        }
    }

    /// Implicit tag name, used by the `styles` section.
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Person => "Person",
            ElementKind::SoftwareSystem => "Software System",
            ElementKind::Container => "Container",
            ElementKind::Component => "Component",
            ElementKind::DeploymentNode => "Deployment Node",
            ElementKind::InfrastructureNode => "Infrastructure Node",
            ElementKind::Group => "Group",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for ElementKind {
    type Err = crate::validate::ValidationError;

    /// Accepts every declaration keyword plus `group`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "group" {
            return Ok(ElementKind::Group);
        }
        ElementKind::from_keyword(s).ok_or_else(|| crate::validate::ValidationError::UnknownKind {
            kind: s.to_string(),
        })
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

/// A node in the diagram hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: Id,
    pub kind: ElementKind,
    pub name: String,
    pub description: String,
    pub technology: Option<String>,
    pub tags: SmallVec<[String; 2]>,
    /// Containing element; `None` for root-level elements.
    pub parent: Option<Id>,
    pub external: bool,
    pub position: Position,
    /// Only used by `Group` elements.
    pub size: Option<Size>,
}

impl Element {
    pub fn new(id: Id, kind: ElementKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            description: String::new(),
            technology: None,
            tags: SmallVec::new(),
            parent: None,
            external: false,
            position: Position::default(),
            size: None,
        }
    }

    pub fn with_parent(mut self, parent: Id) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ─── Relationships ───────────────────────────────────────────────────────

/// Semantic kind of a relationship. A single kind is in use today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelationshipKind {
    #[default]
    Uses,
}

/// A directed, described edge between two elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Id,
    pub source: Id,
    pub target: Id,
    pub description: String,
    pub technology: Option<String>,
    pub kind: RelationshipKind,
    pub tags: SmallVec<[String; 2]>,
}

impl Relationship {
    pub fn new(id: Id, source: Id, target: Id, description: impl Into<String>) -> Self {
        Self {
            id,
            source,
            target,
            description: description.into(),
            technology: None,
            kind: RelationshipKind::Uses,
            tags: SmallVec::new(),
        }
    }
}

// ─── Views ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    SystemLandscape,
    SystemContext,
    Container,
    Component,
    Deployment,
}

impl ViewKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ViewKind::SystemLandscape => "systemLandscape",
            ViewKind::SystemContext => "systemContext",
            ViewKind::Container => "container",
            ViewKind::Component => "component",
            ViewKind::Deployment => "deployment",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "systemLandscape" => Some(ViewKind::SystemLandscape),
            "systemContext" => Some(ViewKind::SystemContext),
            "container" => Some(ViewKind::Container),
            "component" => Some(ViewKind::Component),
            "deployment" => Some(ViewKind::Deployment),
            _ => None,
        }
    }

    /// Element kinds that can appear (and get position metadata) in this view.
    pub fn accepts(self, kind: ElementKind) -> bool {
        use ElementKind as E;
        match self {
            ViewKind::SystemLandscape | ViewKind::SystemContext => {
                matches!(kind, E::Person | E::SoftwareSystem | E::Group)
            }
            ViewKind::Container => {
                matches!(kind, E::Person | E::SoftwareSystem | E::Container | E::Group)
            }
            ViewKind::Component => matches!(
                kind,
                E::Person | E::SoftwareSystem | E::Container | E::Component | E::Group
            ),
            ViewKind::Deployment => matches!(
                kind,
                E::DeploymentNode | E::InfrastructureNode | E::Container | E::Group
            ),
        }
    }

    /// Kind an anchor must have, for views that require one.
    pub fn anchor_kind(self) -> Option<ElementKind> {
        match self {
            ViewKind::SystemContext | ViewKind::Container => Some(ElementKind::SoftwareSystem),
            ViewKind::Component => Some(ElementKind::Container),
            ViewKind::SystemLandscape | ViewKind::Deployment => None,
        }
    }
}

/// A named visualization scope over the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: Id,
    /// Textual key, restricted to `[A-Za-z0-9_-]`.
    pub key: String,
    pub kind: ViewKind,
    pub anchor: Option<Id>,
    pub name: String,
    pub description: String,
}

impl View {
    /// The well-known landscape view.
    pub fn landscape() -> Self {
        Self {
            id: Id::intern(LANDSCAPE_VIEW_KEY),
            key: LANDSCAPE_VIEW_KEY.to_string(),
            kind: ViewKind::SystemLandscape,
            anchor: None,
            name: "System Landscape".to_string(),
            description: String::new(),
        }
    }

    /// Containers view for a software system.
    pub fn containers_of(system: &Element) -> Self {
        let key = container_view_key(system.id);
        Self {
            id: Id::intern(&format!("view-{key}")),
            key,
            kind: ViewKind::Container,
            anchor: Some(system.id),
            name: format!("{} - Containers", system.name),
            description: String::new(),
        }
    }

    /// Components view for a container.
    pub fn components_of(container: &Element) -> Self {
        let key = component_view_key(container.id);
        Self {
            id: Id::intern(&format!("view-{key}")),
            key,
            kind: ViewKind::Component,
            anchor: Some(container.id),
            name: format!("{} - Components", container.name),
            description: String::new(),
        }
    }

    /// Deployment view for a deployment node.
    pub fn deployment_of(node: &Element) -> Self {
        let key = deployment_view_key(node.id);
        Self {
            id: Id::intern(&format!("view-{key}")),
            key,
            kind: ViewKind::Deployment,
            anchor: None,
            name: node.name.clone(),
            description: String::new(),
        }
    }
}

pub fn container_view_key(system: Id) -> String {
    sanitize_key(&format!("{system}-containers"))
}

pub fn component_view_key(container: Id) -> String {
    sanitize_key(&format!("{container}-components"))
}

pub fn deployment_view_key(node: Id) -> String {
    sanitize_key(&format!("deployment-{node}"))
}

// ─── Workspace ───────────────────────────────────────────────────────────

/// The aggregate root: name, description, and the three model collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    pub description: String,
    pub elements: Vec<Element>,
    pub relationships: Vec<Relationship>,
    pub views: Vec<View>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new("Untitled Workspace", "")
    }
}

impl Workspace {
    /// A new workspace holding only the landscape view.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            elements: Vec::new(),
            relationships: Vec::new(),
            views: vec![View::landscape()],
        }
    }

    pub fn element(&self, id: Id) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn element_mut(&mut self, id: Id) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    pub fn relationship(&self, id: Id) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == id)
    }

    pub fn view(&self, id: Id) -> Option<&View> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn view_by_key(&self, key: &str) -> Option<&View> {
        self.views.iter().find(|v| v.key == key)
    }

    /// Root-level elements, in collection order.
    pub fn roots(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.parent.is_none())
    }

    /// Direct children of `id`, in collection order.
    pub fn children(&self, id: Id) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.parent == Some(id))
    }

    /// Whether any identity (element, relationship, or view) equals `id`.
    pub fn contains_id(&self, id: Id) -> bool {
        self.elements.iter().any(|e| e.id == id)
            || self.relationships.iter().any(|r| r.id == id)
            || self.views.iter().any(|v| v.id == id)
    }

    /// Build the parent → child containment graph.
    ///
    /// Elements whose parent is missing are left unattached; validation
    /// reports those separately.
    pub fn hierarchy(&self) -> (DiGraph<Id, ()>, HashMap<Id, NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.elements.len(), self.elements.len());
        let mut index = HashMap::with_capacity(self.elements.len());
        for element in &self.elements {
            index.insert(element.id, graph.add_node(element.id));
        }
        for element in &self.elements {
            if let Some(parent) = element.parent
                && let (Some(&p), Some(&c)) = (index.get(&parent), index.get(&element.id))
            {
                graph.add_edge(p, c, ());
            }
        }
        (graph, index)
    }

    /// `id` and every element nested below it.
    pub fn subtree(&self, id: Id) -> HashSet<Id> {
        let (graph, index) = self.hierarchy();
        let mut found = HashSet::new();
        if let Some(&start) = index.get(&id) {
            let mut dfs = Dfs::new(&graph, start);
            while let Some(nx) = dfs.next(&graph) {
                found.insert(graph[nx]);
            }
        }
        found
    }

    /// Every element nested below `id`, in collection order.
    pub fn descendants(&self, id: Id) -> Vec<Id> {
        let set = self.subtree(id);
        self.elements
            .iter()
            .map(|e| e.id)
            .filter(|e| *e != id && set.contains(e))
            .collect()
    }

    /// Allocate an unused identity of the form `{prefix}_{n}`.
    pub fn fresh_id(&self, prefix: &str) -> Id {
        let mut n = self.relationships.len() + self.views.len() + 1;
        loop {
            let candidate = Id::intern(&format!("{prefix}_{n}"));
            if !self.contains_id(candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Add an element with a readable identity derived from its kind and
    /// name. Adding a software system also creates its containers view;
    /// adding a container creates its components view.
    pub fn add_element(&mut self, kind: ElementKind, name: &str, parent: Option<Id>) -> Id {
        let id = readable_id(kind, name, |candidate| self.contains_id(candidate));
        let mut element = Element::new(id, kind, name);
        element.parent = parent;
        self.insert_element(element);
        id
    }

    /// Insert a fully built element, creating its auto-views.
    pub fn insert_element(&mut self, element: Element) {
        let view = match element.kind {
            ElementKind::SoftwareSystem => Some(View::containers_of(&element)),
            ElementKind::Container => Some(View::components_of(&element)),
            _ => None,
        };
        self.elements.push(element);
        if let Some(view) = view
            && self.view_by_key(&view.key).is_none()
        {
            self.views.push(view);
        }
    }

    /// Remove an element with everything nested below it, every
    /// relationship touching the removed set, and every view anchored on it.
    /// Returns the number of elements removed.
    pub fn remove_element(&mut self, id: Id) -> usize {
        let doomed = self.subtree(id);
        if doomed.is_empty() {
            return 0;
        }
        let before = self.elements.len();
        self.elements.retain(|e| !doomed.contains(&e.id));
        self.relationships
            .retain(|r| !doomed.contains(&r.source) && !doomed.contains(&r.target));
        self.views
            .retain(|v| v.anchor.is_none_or(|a| !doomed.contains(&a)));
        before - self.elements.len()
    }

    /// Connect two elements. Returns `None` if either endpoint is unknown.
    pub fn add_relationship(&mut self, source: Id, target: Id, description: &str) -> Option<Id> {
        if self.element(source).is_none() || self.element(target).is_none() {
            return None;
        }
        let id = self.fresh_id("rel");
        self.relationships
            .push(Relationship::new(id, source, target, description));
        Some(id)
    }

    pub fn remove_relationship(&mut self, id: Id) -> Option<Relationship> {
        let pos = self.relationships.iter().position(|r| r.id == id)?;
        Some(self.relationships.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_workspace_has_landscape() {
        let ws = Workspace::new("Bank", "Internet banking");
        assert_eq!(ws.views.len(), 1);
        assert_eq!(ws.views[0].kind, ViewKind::SystemLandscape);
        assert_eq!(ws.views[0].id, Id::intern(LANDSCAPE_VIEW_KEY));
    }

    #[test]
    fn add_system_creates_containers_view() {
        let mut ws = Workspace::default();
        let sys = ws.add_element(ElementKind::SoftwareSystem, "Online Shop", None);
        assert_eq!(sys.as_str(), "OnlineShopSystem");
        let view = ws
            .views
            .iter()
            .find(|v| v.kind == ViewKind::Container)
            .expect("containers view");
        assert_eq!(view.anchor, Some(sys));
        assert_eq!(view.name, "Online Shop - Containers");

        let api = ws.add_element(ElementKind::Container, "API", Some(sys));
        assert!(
            ws.views
                .iter()
                .any(|v| v.kind == ViewKind::Component && v.anchor == Some(api))
        );
    }

    #[test]
    fn add_element_collision_gets_numeric_suffix() {
        let mut ws = Workspace::default();
        let a = ws.add_element(ElementKind::Person, "User", None);
        let b = ws.add_element(ElementKind::Person, "User", None);
        assert_eq!(a.as_str(), "UserPerson");
        assert_eq!(b.as_str(), "UserPerson2");
    }

    #[test]
    fn remove_element_cascades() {
        let mut ws = Workspace::default();
        let user = ws.add_element(ElementKind::Person, "User", None);
        let sys = ws.add_element(ElementKind::SoftwareSystem, "Shop", None);
        let web = ws.add_element(ElementKind::Container, "Web", Some(sys));
        ws.add_relationship(user, web, "Browses").unwrap();
        ws.add_relationship(user, sys, "Uses").unwrap();

        let removed = ws.remove_element(sys);
        assert_eq!(removed, 2);
        assert!(ws.element(web).is_none());
        assert!(ws.relationships.is_empty());
        assert_eq!(ws.views.len(), 1, "only the landscape survives");
    }

    #[test]
    fn add_relationship_rejects_unknown_endpoint() {
        let mut ws = Workspace::default();
        let user = ws.add_element(ElementKind::Person, "User", None);
        assert!(ws.add_relationship(user, Id::intern("nope"), "x").is_none());
    }

    #[test]
    fn children_keep_collection_order() {
        let mut ws = Workspace::default();
        let sys = ws.add_element(ElementKind::SoftwareSystem, "Shop", None);
        let b = ws.add_element(ElementKind::Container, "B", Some(sys));
        let a = ws.add_element(ElementKind::Container, "A", Some(sys));
        let kids: Vec<Id> = ws.children(sys).map(|e| e.id).collect();
        assert_eq!(kids, vec![b, a]);

        let c = ws.add_element(ElementKind::Component, "C", Some(a));
        assert_eq!(ws.descendants(sys), vec![b, a, c]);
        assert!(ws.descendants(c).is_empty());
    }

    #[test]
    fn kind_from_str() {
        assert_eq!("group".parse::<ElementKind>().unwrap(), ElementKind::Group);
        assert_eq!(
            "softwareSystem".parse::<ElementKind>().unwrap(),
            ElementKind::SoftwareSystem
        );
        assert!("database".parse::<ElementKind>().is_err());
    }
}
