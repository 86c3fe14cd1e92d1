//! Arena-allocated document tree.
//!
//! Nodes live in one vector and link to each other by index, so addresses
//! held by the highlighting code stay valid across splits, wraps and
//! unwraps. Detached nodes are simply unreachable; they are never reused.

/// Index of a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }

    fn get(self) -> Option<NodeId> {
        self.is_some().then_some(self)
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

/// A node and its tree links.
#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// A mutable document tree with a single document root.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId::NONE,
        };
        doc.root = doc.alloc(Node::new(NodeData::Document));
        doc
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn create_element(
        &mut self,
        name: impl Into<String>,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        self.alloc(Node::new(NodeData::Element {
            name: name.into(),
            attrs,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text.into())))
    }

    // ========================================================================
    // Links
    // ========================================================================

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.get())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.get())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child.get())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.get())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.get())
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Append a child to a parent node. The child must be detached.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }
        if let Some(last_node) = self.get_mut(last_child) {
            last_node.next_sibling = child;
        }
        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert a detached node before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let Some((parent, prev)) = self.get(sibling).map(|n| (n.parent, n.prev_sibling)) else {
            return;
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }
        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }
        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Insert a detached node after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, new_node: NodeId) {
        match self.next_sibling(sibling) {
            Some(next) => self.insert_before(next, new_node),
            None => {
                if let Some(parent) = self.parent(sibling) {
                    self.append(parent, new_node);
                }
            }
        }
    }

    /// Unlink a node (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        let Some((parent, prev, next)) = self
            .get(id)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };

        if let Some(p) = self.get_mut(prev) {
            p.next_sibling = next;
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = next;
        }
        if let Some(n) = self.get_mut(next) {
            n.prev_sibling = prev;
        } else if let Some(par) = self.get_mut(parent) {
            par.last_child = prev;
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Append text to the parent's last child if it is text, otherwise add a
    /// new text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);
        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(existing) = &mut last.data
        {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text);
        self.append(parent, node);
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            doc: self,
            current: self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE),
        }
    }

    /// Pre-order descendants of `scope`, excluding `scope` itself.
    pub fn descendants(&self, scope: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            scope,
            next: self.first_child(scope),
        }
    }

    /// Text nodes under `scope` in document order.
    pub fn text_nodes(&self, scope: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(scope).filter(|&id| self.is_text(id))
    }

    /// First text node under `scope` satisfying `keep`.
    pub fn first_text(&self, scope: NodeId, keep: impl Fn(&str) -> bool) -> Option<NodeId> {
        self.text_nodes(scope).find(|&id| self.text(id).is_some_and(&keep))
    }

    /// Last text node under `scope` satisfying `keep`.
    pub fn last_text(&self, scope: NodeId, keep: impl Fn(&str) -> bool) -> Option<NodeId> {
        self.text_nodes(scope)
            .filter(|&id| self.text(id).is_some_and(&keep))
            .last()
    }

    /// Find the element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|&node| self.attr(node, "id") == Some(id))
    }

    /// First element with the given (case-insensitive) tag name.
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|&node| self.element_name(node).is_some_and(|n| n.eq_ignore_ascii_case(tag)))
    }

    /// The `body` element, when the markup has one.
    pub fn body(&self) -> Option<NodeId> {
        self.find_by_tag("body")
    }

    // ========================================================================
    // Node accessors
    // ========================================================================

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(attr_name))
            .map(|(_, v)| v.as_str())
    }

    /// Set `attr_name` unless the element already carries it.
    pub fn add_attr_if_missing(&mut self, id: NodeId, attr_name: String, value: String) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Element { attrs, .. } = &mut node.data
            && !attrs.iter().any(|(k, _)| k.eq_ignore_ascii_case(&attr_name))
        {
            attrs.push((attr_name, value));
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| matches!(n.data, NodeData::Text(_)))
    }

    /// Contents of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn set_text(&mut self, id: NodeId, value: String) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Text(text) = &mut node.data
        {
            *text = value;
        }
    }

    /// Concatenated text of a node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.text_nodes(id).filter_map(|t| self.text(t)).collect()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Split a text node at a character offset. The node keeps the text
    /// before the offset; the returned new sibling holds the rest. Returns
    /// `None` when the offset is out of range or the node is not text.
    pub fn split_text(&mut self, id: NodeId, char_offset: usize) -> Option<NodeId> {
        let text = self.text(id)?;
        if char_offset > text.chars().count() {
            return None;
        }
        let at = crate::util::char_to_byte(text, char_offset);
        let tail = text[at..].to_string();
        let head = text[..at].to_string();

        self.set_text(id, head);
        let new_node = self.create_text(tail);
        self.insert_after(id, new_node);
        Some(new_node)
    }

    /// Wrap `node` in the detached element `wrapper`.
    pub fn wrap(&mut self, node: NodeId, wrapper: NodeId) {
        self.insert_before(node, wrapper);
        self.detach(node);
        self.append(wrapper, node);
    }

    /// Replace an element by its children. Returns the former parent.
    pub fn unwrap(&mut self, element: NodeId) -> Option<NodeId> {
        let parent = self.parent(element)?;
        while let Some(child) = self.first_child(element) {
            self.detach(child);
            self.insert_before(element, child);
        }
        self.detach(element);
        Some(parent)
    }

    /// Merge adjacent text children and drop empty ones, throughout the
    /// subtree rooted at `scope`.
    pub fn normalize(&mut self, scope: NodeId) {
        let mut cursor = self.first_child(scope);
        while let Some(current) = cursor {
            if self.is_text(current) {
                while let Some(next) = self.next_sibling(current)
                    && let Some(next_text) = self.text(next).map(str::to_string)
                {
                    self.detach(next);
                    if let Some(node) = self.get_mut(current)
                        && let NodeData::Text(text) = &mut node.data
                    {
                        text.push_str(&next_text);
                    }
                }
                let next = self.next_sibling(current);
                if self.text(current).is_some_and(str::is_empty) {
                    self.detach(current);
                }
                cursor = next;
            } else {
                self.normalize(current);
                cursor = self.next_sibling(current);
            }
        }
    }
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    current: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current.get()?;
        self.current = self.doc.get(id).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Pre-order walk over a subtree.
pub struct Descendants<'a> {
    doc: &'a Document,
    scope: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let (doc, scope) = (self.doc, self.scope);
        self.next = doc.first_child(id).or_else(|| {
            let mut node = id;
            loop {
                if node == scope {
                    return None;
                }
                if let Some(sibling) = doc.next_sibling(node) {
                    return Some(sibling);
                }
                node = doc.parent(node)?;
            }
        });
        Some(id)
    }
}
