//! XML Document Tree - Arena-based representation
//!
//! Storage model:
//! - Arena allocation for nodes, `NodeId` indices for traversal
//! - First/last-child plus sibling links instead of per-node child vectors
//! - Document-level attributes hold the `<?xml ?>` declaration fields
//! - The document owns every node; dropping it frees the whole tree
//!
//! Names are fixed at creation; values and attributes grow as the builder
//! feeds tokens in.

use crate::encoding::ByteOrder;
use crate::error::Result;

use super::entities;

/// Compact node identifier (index into the document arena).
pub type NodeId = u32;

/// One name/value pair on a node or on the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An element node in the arena.
#[derive(Debug, Clone)]
pub struct TreeNode {
    name: String,
    value: String,
    attributes: Vec<Attribute>,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl TreeNode {
    fn new(name: &str) -> TreeNode {
        TreeNode {
            name: name.to_string(),
            value: String::new(),
            attributes: Vec::new(),
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }

    /// Element name (immutable after creation).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accumulated text content.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value of the named attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    #[inline]
    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }

    #[inline]
    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    #[inline]
    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    #[inline]
    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }
}

/// Read-only tree traversal callback.
pub trait Visitor {
    /// Called once per visited node, preorder. Returning an error aborts
    /// the walk and propagates to the `visit` caller.
    fn node(&mut self, document: &Document, id: NodeId, depth: usize) -> Result<()>;
}

/// An XML document: node arena, root, and declaration metadata.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<TreeNode>,
    root: Option<NodeId>,
    /// Pseudo-attributes of the `<?xml ?>` declaration.
    attributes: Vec<Attribute>,
    /// Raw DOCTYPE body, captured verbatim and uninterpreted.
    doctype: Option<String>,
    /// Byte order of the decoded input, when it had one.
    byte_order: Option<ByteOrder>,
}

impl Document {
    pub fn new() -> Document {
        Document::default()
    }

    /// Root element id, if a root has been established.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Get a node by id.
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id as usize)
    }

    /// Number of nodes in the arena.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Declaration attributes (`version`, `encoding`, `standalone`, ...).
    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value of the named declaration attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Encoding label declared in the `<?xml ?>` declaration.
    pub fn encoding(&self) -> Option<&str> {
        self.attribute("encoding")
    }

    /// Raw DOCTYPE body, if the input carried one.
    #[inline]
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    /// Byte order of the input stream, for multi-byte encodings.
    #[inline]
    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }

    /// Iterate the direct children of a node, in document order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            document: self,
            next: self.node(id).and_then(TreeNode::first_child),
        }
    }

    /// Iterate a subtree in preorder, starting at (and including) `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            document: self,
            stack: vec![id],
        }
    }

    /// Walk the tree from the root, preorder, invoking the visitor per node.
    /// With `recursive` false only the root and its direct children are
    /// visited. A document without a root visits nothing.
    pub fn visit<V: Visitor>(&self, visitor: &mut V, recursive: bool) -> Result<()> {
        let root = match self.root {
            Some(root) => root,
            None => return Ok(()),
        };
        visitor.node(self, root, 0)?;
        if !recursive {
            for child in self.children(root) {
                visitor.node(self, child, 1)?;
            }
            return Ok(());
        }
        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        self.push_children(root, 1, &mut stack);
        while let Some((id, depth)) = stack.pop() {
            visitor.node(self, id, depth)?;
            self.push_children(id, depth + 1, &mut stack);
        }
        Ok(())
    }

    /// Push the children of `id` in reverse document order, so the stack
    /// pops them forward. Walks last-child -> prev-sibling to avoid a
    /// temporary collection.
    fn push_children(&self, id: NodeId, depth: usize, stack: &mut Vec<(NodeId, usize)>) {
        let mut child = self.node(id).and_then(TreeNode::last_child);
        while let Some(c) = child {
            stack.push((c, depth));
            child = self.node(c).and_then(TreeNode::prev_sibling);
        }
    }

    /// Serialize the document back to XML text: declaration, DOCTYPE, then
    /// the element tree with escaped values. Childless empty elements use
    /// the self-closing form.
    pub fn to_xml(&self) -> String {
        let mut buf = String::with_capacity(64 + self.nodes.len() * 16);
        if !self.attributes.is_empty() {
            buf.push_str("<?xml");
            for attr in &self.attributes {
                buf.push(' ');
                buf.push_str(&attr.name);
                buf.push_str("=\"");
                entities::escape_into(&attr.value, &mut buf);
                buf.push('"');
            }
            buf.push_str("?>");
        }
        if let Some(doctype) = &self.doctype {
            buf.push_str("<!DOCTYPE");
            buf.push_str(doctype);
            buf.push('>');
        }
        if let Some(root) = self.root {
            self.write_node(root, &mut buf);
        }
        buf
    }

    /// Iterative subtree serialization with an explicit enter/close stack,
    /// so deep trees cannot overflow the call stack.
    fn write_node(&self, id: NodeId, buf: &mut String) {
        enum Entry {
            Enter(NodeId),
            Close(NodeId),
        }

        let mut stack: Vec<Entry> = Vec::with_capacity(16);
        stack.push(Entry::Enter(id));

        while let Some(entry) = stack.pop() {
            match entry {
                Entry::Close(id) => {
                    if let Some(node) = self.node(id) {
                        buf.push_str("</");
                        buf.push_str(&node.name);
                        buf.push('>');
                    }
                }
                Entry::Enter(id) => {
                    let node = match self.node(id) {
                        Some(node) => node,
                        None => continue,
                    };
                    buf.push('<');
                    buf.push_str(&node.name);
                    for attr in &node.attributes {
                        buf.push(' ');
                        buf.push_str(&attr.name);
                        buf.push_str("=\"");
                        entities::escape_into(&attr.value, buf);
                        buf.push('"');
                    }
                    if node.value.is_empty() && node.first_child.is_none() {
                        buf.push_str("/>");
                        continue;
                    }
                    buf.push('>');
                    entities::escape_into(&node.value, buf);
                    stack.push(Entry::Close(id));
                    // children in reverse so the stack pops them forward
                    let mut child = node.last_child;
                    while let Some(c) = child {
                        stack.push(Entry::Enter(c));
                        child = self.node(c).and_then(TreeNode::prev_sibling);
                    }
                }
            }
        }
    }

    // --- builder-facing mutation (ids are arena-internal invariants) ---

    /// Allocate a node; it is unlinked until `set_root` or `link_child`.
    pub(crate) fn add_node(&mut self, name: &str) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(TreeNode::new(name));
        id
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// Append `child` as the last child of `parent`, maintaining the
    /// sibling chain.
    pub(crate) fn link_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child as usize].parent = Some(parent);
        match self.nodes[parent as usize].last_child {
            Some(last) => {
                self.nodes[child as usize].prev_sibling = Some(last);
                self.nodes[last as usize].next_sibling = Some(child);
            }
            None => {
                self.nodes[parent as usize].first_child = Some(child);
            }
        }
        self.nodes[parent as usize].last_child = Some(child);
    }

    pub(crate) fn node_name(&self, id: NodeId) -> &str {
        &self.nodes[id as usize].name
    }

    pub(crate) fn node_value(&self, id: NodeId) -> &str {
        &self.nodes[id as usize].value
    }

    pub(crate) fn append_value(&mut self, id: NodeId, text: &str) {
        self.nodes[id as usize].value.push_str(text);
    }

    /// Start a new attribute on a node; its value arrives in later tokens.
    pub(crate) fn push_attribute(&mut self, id: NodeId, name: &str) {
        self.nodes[id as usize].attributes.push(Attribute {
            name: name.to_string(),
            value: String::new(),
        });
    }

    /// Append to the most recently started attribute of a node.
    pub(crate) fn append_attribute(&mut self, id: NodeId, text: &str) {
        if let Some(attr) = self.nodes[id as usize].attributes.last_mut() {
            attr.value.push_str(text);
        }
    }

    pub(crate) fn push_document_attribute(&mut self, name: &str) {
        self.attributes.push(Attribute {
            name: name.to_string(),
            value: String::new(),
        });
    }

    pub(crate) fn append_document_attribute(&mut self, text: &str) {
        if let Some(attr) = self.attributes.last_mut() {
            attr.value.push_str(text);
        }
    }

    /// Record the DOCTYPE body; the first declaration wins.
    pub(crate) fn set_doctype(&mut self, text: &str) {
        if self.doctype.is_none() {
            self.doctype = Some(text.to_string());
        }
    }

    pub(crate) fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = Some(order);
    }
}

/// Iterator over the direct children of one node.
pub struct Children<'a> {
    document: &'a Document,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.document.node(id).and_then(TreeNode::next_sibling);
        Some(id)
    }
}

/// Preorder iterator over a subtree, including its start node.
pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let mut child = self.document.node(id).and_then(TreeNode::last_child);
        while let Some(c) = child {
            self.stack.push(c);
            child = self.document.node(c).and_then(TreeNode::prev_sibling);
        }
        Some(id)
    }
}
