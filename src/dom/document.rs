//! Arena-backed document tree

use super::{Descendants, DocumentTree, NodeId, NodeKind};

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable document tree
///
/// Nodes are never freed; detached nodes simply become unreachable from
/// [`Document::root`]. A document lives for one engine session, so the arena
/// only grows by the markers and split text nodes highlighting creates.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    doctype: Option<String>,
    content_root_tag: String,
}

impl Document {
    /// Create a document whose root element is also its content root
    pub fn new(root_tag: &str) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            doctype: None,
            content_root_tag: root_tag.to_ascii_lowercase(),
        };
        doc.root = doc.create_element(root_tag);
        doc
    }

    /// Use the first element named `tag` as the content root
    pub fn with_content_root(mut self, tag: &str) -> Self {
        self.content_root_tag = tag.to_ascii_lowercase();
        self
    }

    /// The document element
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    pub fn set_doctype(&mut self, doctype: impl Into<String>) {
        self.doctype = Some(doctype.into());
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.create_element(name);
        self.append_child(parent, id);
        id
    }

    /// Create a text node and append it to `parent`
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs.as_slice(),
            _ => &[],
        }
    }

    /// Set an attribute on an element (no-op for other node kinds)
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    /// Replace the character data of a text or comment node
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        match &mut self.nodes[node.0].data {
            NodeData::Text(t) | NodeData::Comment(t) => *t = text.into(),
            NodeData::Element { .. } => {}
        }
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Move `child` to position `index` among `parent`'s children
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Remove a node (and its subtree) from its parent
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    /// Put `replacement` where `old` was and detach `old`
    pub fn replace_node(&mut self, old: NodeId, replacement: NodeId) {
        let Some(parent) = self.nodes[old.0].parent else {
            return;
        };
        let index = self.index_in_parent(old).unwrap_or(0);
        self.detach(old);
        self.insert_child(parent, index, replacement);
    }

    /// Copy a node without its children
    pub fn shallow_clone(&mut self, node: NodeId) -> NodeId {
        let data = self.nodes[node.0].data.clone();
        self.push(data)
    }

    /// Merge adjacent text children and drop empty ones
    pub fn normalize(&mut self, node: NodeId) {
        let children = self.nodes[node.0].children.clone();
        let mut previous_text: Option<NodeId> = None;

        for child in children {
            let NodeData::Text(text) = &self.nodes[child.0].data else {
                previous_text = None;
                continue;
            };
            if text.is_empty() {
                self.detach(child);
                continue;
            }
            match previous_text {
                Some(prev) => {
                    let text = text.clone();
                    if let NodeData::Text(prev_text) = &mut self.nodes[prev.0].data {
                        prev_text.push_str(&text);
                    }
                    self.detach(child);
                }
                None => previous_text = Some(child),
            }
        }
    }

    /// Whether the node is reachable from the document element
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(self.root, node)
    }

    /// Text of the first `<title>` element, if any
    pub fn title(&self) -> Option<String> {
        Descendants::new(self, self.root)
            .find(|n| self.tag_name(*n) == Some("title"))
            .map(|n| self.text_content(n).trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Follow raw child indices down from `from`
    pub fn node_at_path(&self, from: NodeId, path: &[usize]) -> Option<NodeId> {
        path.iter()
            .try_fold(from, |node, index| self.children(node).get(*index).copied())
    }

    /// Character data of a text node as an owned string (empty otherwise)
    pub(crate) fn text_value(&self, node: NodeId) -> String {
        self.text(node).unwrap_or("").to_string()
    }
}

impl DocumentTree for Document {
    fn content_root(&self) -> Option<NodeId> {
        if self.tag_name(self.root) == Some(self.content_root_tag.as_str()) {
            return Some(self.root);
        }
        Descendants::new(self, self.root)
            .find(|n| self.tag_name(*n) == Some(self.content_root_tag.as_str()))
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        match self.nodes[node.0].data {
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
        }
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attributes(node)
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text(t) | NodeData::Comment(t) => Some(t.as_str()),
            NodeData::Element { .. } => None,
        }
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        std::iter::once(self.root)
            .chain(Descendants::new(self, self.root))
            .find(|n| self.attribute(*n, "id") == Some(id))
    }
}
