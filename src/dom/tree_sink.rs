//! html5ever tree builder target for [`ChapterDom`].

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, QualName, local_name, ns};

use super::arena::{Attribute, ChapterDom, NodeId};

static NO_NAME: QualName = QualName {
    prefix: None,
    ns: ns!(),
    local: local_name!(""),
};

/// A node as the tree builder sees it.
///
/// Elements carry their name so `elem_name` can lend it out without
/// reaching into the arena behind the `RefCell`.
#[derive(Debug, Clone)]
pub struct SinkNode {
    id: NodeId,
    name: Option<Rc<QualName>>,
}

impl SinkNode {
    fn plain(id: NodeId) -> Self {
        Self { id, name: None }
    }
}

/// Builds a [`ChapterDom`] while html5ever parses.
///
/// The tree builder only hands out `&self`, hence the `RefCell`.
pub struct ChapterSink {
    dom: RefCell<ChapterDom>,
}

impl ChapterSink {
    pub fn new() -> Self {
        Self {
            dom: RefCell::new(ChapterDom::new()),
        }
    }

    pub fn into_dom(self) -> ChapterDom {
        self.dom.into_inner()
    }

    fn insert(&self, child: NodeOrText<SinkNode>, place: impl FnOnce(&mut ChapterDom, NodeId)) {
        let mut dom = self.dom.borrow_mut();
        let id = match child {
            NodeOrText::AppendNode(node) => node.id,
            NodeOrText::AppendText(text) => dom.create_text(text.to_string()),
        };
        place(&mut dom, id);
    }
}

impl TreeSink for ChapterSink {
    type Handle = SinkNode;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    // Chapters are hand-edited fragments; recover silently like a browser.
    fn parse_error(&self, _msg: Cow<'static, str>) {}

    fn get_document(&self) -> SinkNode {
        SinkNode::plain(self.dom.borrow().document())
    }

    fn elem_name<'a>(&'a self, target: &'a SinkNode) -> &'a QualName {
        target.name.as_deref().unwrap_or(&NO_NAME)
    }

    fn create_element(&self, name: QualName, attrs: Vec<Html5Attribute>, _flags: ElementFlags) -> SinkNode {
        let attrs = attrs
            .into_iter()
            .map(|a| Attribute {
                name: a.name,
                value: a.value.to_string(),
            })
            .collect();
        let id = self.dom.borrow_mut().create_element(name.clone(), attrs);
        SinkNode {
            id,
            name: Some(Rc::new(name)),
        }
    }

    fn create_comment(&self, text: StrTendril) -> SinkNode {
        SinkNode::plain(self.dom.borrow_mut().create_comment(text.to_string()))
    }

    fn create_pi(&self, _target: StrTendril, data: StrTendril) -> SinkNode {
        self.create_comment(data)
    }

    fn append(&self, parent: &SinkNode, child: NodeOrText<SinkNode>) {
        // Adjacent text runs are merged by the arena.
        if let NodeOrText::AppendText(text) = &child {
            self.dom.borrow_mut().append_text(parent.id, text);
            return;
        }
        self.insert(child, |dom, id| dom.append(parent.id, id));
    }

    fn append_based_on_parent_node(
        &self,
        element: &SinkNode,
        prev_element: &SinkNode,
        child: NodeOrText<SinkNode>,
    ) {
        let has_parent = self.dom.borrow().parent(element.id).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(&self, name: StrTendril, public_id: StrTendril, system_id: StrTendril) {
        let mut dom = self.dom.borrow_mut();
        let doctype = dom.create_doctype(name.to_string(), public_id.to_string(), system_id.to_string());
        let document = dom.document();
        dom.append(document, doctype);
    }

    fn get_template_contents(&self, target: &SinkNode) -> SinkNode {
        target.clone()
    }

    fn same_node(&self, x: &SinkNode, y: &SinkNode) -> bool {
        x.id == y.id
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &SinkNode, new_node: NodeOrText<SinkNode>) {
        self.insert(new_node, |dom, id| dom.insert_before(sibling.id, id));
    }

    fn add_attrs_if_missing(&self, target: &SinkNode, attrs: Vec<Html5Attribute>) {
        let mut dom = self.dom.borrow_mut();
        for attr in attrs {
            if dom.get_attr(target.id, &attr.name.local).is_none() {
                dom.set_attr(target.id, &attr.name.local, &attr.value);
            }
        }
    }

    fn remove_from_parent(&self, target: &SinkNode) {
        self.dom.borrow_mut().detach(target.id);
    }

    fn reparent_children(&self, node: &SinkNode, new_parent: &SinkNode) {
        let mut dom = self.dom.borrow_mut();
        let children: Vec<NodeId> = dom.children(node.id).collect();
        for child in children {
            dom.detach(child);
            dom.append(new_parent.id, child);
        }
    }
}
