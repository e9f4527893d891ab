//! Arena-backed DOM for chapter markup.
//!
//! html5ever builds the tree, the injectors rewrite it in place (media
//! containers go in next to paragraphs, text nodes get split around hint
//! markers) and the serializer writes it back out. Nodes are never freed:
//! a detached node keeps its id, so ids handed out to the page stay valid
//! for the lifetime of the chapter.

use html5ever::{LocalName, QualName, ns};

/// Index of a node in its [`ChapterDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Split `class` attribute, kept in step by `set_attr`.
        classes: Vec<String>,
    },
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

/// One node plus its tree links.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl Node {
    fn detached(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

fn class_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

fn attr_name(local: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(local))
}

fn attr_pairs(attrs: &[(&str, &str)]) -> Vec<Attribute> {
    attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: attr_name(name),
            value: value.to_string(),
        })
        .collect()
}

/// The parsed document of one chapter.
///
/// Link operations silently ignore ids that don't belong to this DOM.
pub struct ChapterDom {
    nodes: Vec<Node>,
}

impl ChapterDom {
    /// A DOM holding only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::detached(NodeData::Document)],
        }
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::detached(data));
        id
    }

    fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let classes = attrs
            .iter()
            .find(|a| &*a.name.local == "class")
            .map(|a| class_list(&a.value))
            .unwrap_or_default();
        self.push(NodeData::Element {
            name,
            attrs,
            classes,
        })
    }

    /// New HTML element from a tag and `(name, value)` pairs, in order.
    pub fn element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(tag));
        self.create_element(name, attr_pairs(attrs))
    }

    /// New SVG element, for player icons.
    pub fn svg_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let name = QualName::new(None, ns!(svg), LocalName::from(tag));
        self.create_element(name, attr_pairs(attrs))
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.push(NodeData::Text(text))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.push(NodeData::Comment(text))
    }

    pub fn create_doctype(&mut self, name: String, public_id: String, system_id: String) -> NodeId {
        self.push(NodeData::Doctype {
            name,
            public_id,
            system_id,
        })
    }

    /// Append `tag` holding `text` as the last child of `parent`.
    pub fn append_element_with_text(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> NodeId {
        let element = self.element(tag, attrs);
        let text = self.create_text(text.to_string());
        self.append(element, text);
        self.append(parent, element);
        element
    }

    // ========================================================================
    // Tree edits
    // ========================================================================

    /// Move `child` to the end of `parent`'s children.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.detach(child);
        let prev = self.nodes[parent.index()].last_child;
        self.link(child, Some(parent), prev, None);
    }

    /// Append text to `parent`, extending its last child if that is text.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last = self.get(parent).and_then(|n| n.last_child);
        if let Some(NodeData::Text(existing)) = last.and_then(|id| self.get_mut(id)).map(|n| &mut n.data) {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text.to_string());
        self.append(parent, node);
    }

    /// Move `node` in front of `sibling`. No-op when `sibling` is detached.
    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        if !self.contains(node) || sibling == node {
            return;
        }
        self.detach(node);
        let Some((Some(parent), prev)) = self.get(sibling).map(|n| (n.parent, n.prev_sibling)) else {
            return;
        };
        self.link(node, Some(parent), prev, Some(sibling));
    }

    /// Move `node` right after `sibling`. No-op when `sibling` is detached.
    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        if !self.contains(node) || sibling == node {
            return;
        }
        self.detach(node);
        let Some((Some(parent), next)) = self.get(sibling).map(|n| (n.parent, n.next_sibling)) else {
            return;
        };
        self.link(node, Some(parent), Some(sibling), next);
    }

    /// Unlink `node` from its parent and siblings; its subtree comes along.
    pub fn detach(&mut self, node: NodeId) {
        let Some(n) = self.get_mut(node) else {
            return;
        };
        let (parent, prev, next) = (n.parent.take(), n.prev_sibling.take(), n.next_sibling.take());
        let Some(parent) = parent else {
            return;
        };

        match prev {
            Some(prev) => self.nodes[prev.index()].next_sibling = next,
            None => self.nodes[parent.index()].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next.index()].prev_sibling = prev,
            None => self.nodes[parent.index()].last_child = prev,
        }
    }

    /// Splice a detached node between `prev` and `next` under `parent`.
    fn link(&mut self, node: NodeId, parent: Option<NodeId>, prev: Option<NodeId>, next: Option<NodeId>) {
        let n = &mut self.nodes[node.index()];
        n.parent = parent;
        n.prev_sibling = prev;
        n.next_sibling = next;

        let Some(parent) = parent else {
            return;
        };
        match prev {
            Some(prev) => self.nodes[prev.index()].next_sibling = Some(node),
            None => self.nodes[parent.index()].first_child = Some(node),
        }
        match next {
            Some(next) => self.nodes[next.index()].prev_sibling = Some(node),
            None => self.nodes[parent.index()].last_child = Some(node),
        }
    }

    // ========================================================================
    // Navigation and queries
    // ========================================================================

    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        ChildrenIter {
            dom: self,
            next: self.get(parent).and_then(|n| n.first_child),
        }
    }

    /// Pre-order walk of everything under `root`, excluding `root`.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            dom: self,
            root,
            next: self.get(root).and_then(|n| n.first_child),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next_sibling
    }

    /// Elements under `root` accepted by `predicate`, in document order.
    pub fn find_all<F>(&self, root: NodeId, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&ChapterDom, NodeId) -> bool,
    {
        self.descendants(root)
            .filter(|&id| self.element_name(id).is_some() && predicate(self, id))
            .collect()
    }

    /// First element named `tag` anywhere in the document.
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.document())
            .find(|&id| self.element_name(id).is_some_and(|n| &**n == tag))
    }

    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.find_all(root, |dom, id| {
            dom.element_name(id).is_some_and(|n| &**n == tag)
        })
    }

    pub fn elements_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.find_all(root, |dom, id| dom.has_class(id, class))
    }

    pub fn first_by_class(&self, root: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(root).find(|&id| self.has_class(id, class))
    }

    /// `<body>`, or the document node for a tree without one.
    pub fn body(&self) -> NodeId {
        self.find_by_tag("body").unwrap_or(self.document())
    }

    /// Whether some ancestor of `id` is accepted by `predicate`.
    pub fn has_ancestor<F>(&self, id: NodeId, predicate: F) -> bool
    where
        F: Fn(&ChapterDom, NodeId) -> bool,
    {
        std::iter::successors(self.parent(id), |&p| self.parent(p)).any(|p| predicate(self, p))
    }

    // ========================================================================
    // Elements
    // ========================================================================

    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        match &self.get(id)?.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        }
    }

    pub fn get_attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| &*a.name.local == name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    /// Set an attribute, appending it if the element doesn't have it yet.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(NodeData::Element { attrs, classes, .. }) = self.get_mut(id).map(|n| &mut n.data) else {
            return;
        };
        match attrs.iter_mut().find(|a| &*a.name.local == name) {
            Some(attr) => attr.value = value.to_string(),
            None => attrs.push(Attribute {
                name: attr_name(name),
                value: value.to_string(),
            }),
        }
        if name == "class" {
            *classes = class_list(value);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { classes, .. }) => classes.iter().any(|c| c == class),
            _ => false,
        }
    }

    // ========================================================================
    // Text
    // ========================================================================

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    /// Contents of a text node; `None` for anything else.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: String) {
        if let Some(NodeData::Text(text)) = self.get_mut(id).map(|n| &mut n.data) {
            *text = value;
        }
    }

    /// Concatenated text under `id` (the DOM `textContent`).
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id).filter_map(|d| self.text(d)).collect()
    }
}

impl Default for ChapterDom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChapterDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapterDom")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

pub struct ChildrenIter<'a> {
    dom: &'a ChapterDom,
    next: Option<NodeId>,
}

impl Iterator for ChildrenIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.dom.next_sibling(id);
        Some(id)
    }
}

/// Iterator returned by [`ChapterDom::descendants`].
pub struct Descendants<'a> {
    dom: &'a ChapterDom,
    root: NodeId,
    next: Option<NodeId>,
}

impl Descendants<'_> {
    /// The node after `id`'s subtree, without leaving `root`.
    fn after_subtree(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = id;
        loop {
            if cursor == self.root {
                return None;
            }
            if let Some(next) = self.dom.next_sibling(cursor) {
                return Some(next);
            }
            cursor = self.dom.parent(cursor)?;
        }
    }
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self
            .dom
            .get(id)
            .and_then(|n| n.first_child)
            .or_else(|| self.after_subtree(id));
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(dom: &mut ChapterDom, count: usize) -> (NodeId, Vec<NodeId>) {
        let parent = dom.element("div", &[]);
        let document = dom.document();
        dom.append(document, parent);
        let children = (0..count)
            .map(|_| {
                let p = dom.element("p", &[]);
                dom.append(parent, p);
                p
            })
            .collect();
        (parent, children)
    }

    #[test]
    fn test_classes_follow_class_attribute() {
        let mut dom = ChapterDom::new();
        let div = dom.element("div", &[("class", "media-container"), ("data-type", "audio")]);
        assert!(dom.has_class(div, "media-container"));
        assert_eq!(dom.get_attr(div, "data-type"), Some("audio"));

        dom.set_attr(div, "class", "custom-audio-player audio-launcher");
        assert!(!dom.has_class(div, "media-container"));
        assert!(dom.has_class(div, "audio-launcher"));
        assert_eq!(dom.element_name(div).map(|n| &**n), Some("div"));
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut dom = ChapterDom::new();
        let (parent, ps) = container(&mut dom, 2);
        let (a, b) = (ps[0], ps[1]);

        let before = dom.element("div", &[("class", "media-container")]);
        dom.insert_before(a, before);
        let between = dom.element("div", &[("class", "media-caption")]);
        dom.insert_after(a, between);
        let after = dom.element("div", &[]);
        dom.insert_after(b, after);

        let order: Vec<_> = dom.children(parent).collect();
        assert_eq!(order, vec![before, a, between, b, after]);
        assert_eq!(dom.get(parent).unwrap().first_child, Some(before));
        assert_eq!(dom.get(parent).unwrap().last_child, Some(after));
    }

    #[test]
    fn test_insert_moves_attached_node() {
        let mut dom = ChapterDom::new();
        let (parent, ps) = container(&mut dom, 3);
        dom.insert_after(ps[2], ps[0]);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), vec![ps[1], ps[2], ps[0]]);
    }

    #[test]
    fn test_detach_keeps_siblings_linked() {
        let mut dom = ChapterDom::new();
        let (parent, ps) = container(&mut dom, 3);

        dom.detach(ps[1]);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), vec![ps[0], ps[2]]);
        assert_eq!(dom.parent(ps[1]), None);

        dom.detach(ps[2]);
        dom.detach(ps[0]);
        assert_eq!(dom.children(parent).count(), 0);
        assert_eq!(dom.get(parent).unwrap().last_child, None);
    }

    #[test]
    fn test_text_runs_merge() {
        let mut dom = ChapterDom::new();
        let (_, ps) = container(&mut dom, 1);
        dom.append_text(ps[0], "Погода была ");
        dom.append_text(ps[0], "ясной.");

        let texts: Vec<_> = dom.children(ps[0]).collect();
        assert_eq!(texts.len(), 1);
        assert_eq!(dom.text(texts[0]), Some("Погода была ясной."));
    }

    #[test]
    fn test_descendants_stay_inside_root() {
        let mut dom = ChapterDom::new();
        let (_, ps) = container(&mut dom, 2);
        let em = dom.element("em", &[]);
        dom.append(ps[0], em);
        dom.append_text(em, "внутри");
        dom.append_text(ps[1], "снаружи");

        assert_eq!(dom.text_content(ps[0]), "внутри");
        assert_eq!(dom.descendants(ps[0]).count(), 2);
        assert!(dom.has_ancestor(em, |d, id| id == ps[0] && d.element_name(id).is_some()));
    }

    #[test]
    fn test_foreign_ids_are_ignored() {
        let mut dom = ChapterDom::new();
        let (parent, _) = container(&mut dom, 1);
        dom.append(parent, NodeId(999));
        dom.detach(NodeId(999));
        assert_eq!(dom.children(parent).count(), 1);
        assert_eq!(dom.get_attr(NodeId(999), "class"), None);
    }
}
