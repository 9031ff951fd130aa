//! XMP node tree
//!
//! Nodes live in an arena owned by a [`Tree`] and are addressed by [`NodeId`]
//! handles. Released nodes go back to a process-wide [`NodePool`] so their
//! allocations can be reused by the next parse or marshal.
//!
//! A node has a namespace-qualified name, attributes, text and ordered
//! children. Top-level nodes of a document may additionally own a typed model.

use crate::core::context::Context;
use crate::core::namespace::ns;
use crate::model::Model;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

/// Namespace-qualified name of a node or attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI, empty for unqualified names
    pub space: String,
    /// Local part of the name
    pub local: String,
}

impl QName {
    pub fn new(space: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            local: local.into(),
        }
    }

    /// Name in the RDF namespace
    pub fn rdf(local: &str) -> Self {
        Self::new(ns::RDF, local)
    }

    pub fn is(&self, space: &str, local: &str) -> bool {
        self.space == space && self.local == local
    }

    pub fn is_rdf(&self, local: &str) -> bool {
        self.is(ns::RDF, local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.space.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.space, self.local)
        }
    }
}

/// A node attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: QName,
    pub value: String,
}

/// Handle of a node inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Node payload
#[derive(Default)]
pub struct NodeData {
    /// Qualified name
    pub name: QName,
    /// Attributes in insertion order, names unique
    pub attrs: Vec<Attr>,
    /// Text content
    pub value: String,
    /// Typed model bound to this node, top-level nodes only
    pub model: Option<Box<dyn Model>>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl NodeData {
    fn new(name: QName) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Reset to a blank shell, keeping allocations
    fn reset(&mut self) {
        self.name.space.clear();
        self.name.local.clear();
        self.attrs.clear();
        self.value.clear();
        self.model = None;
        self.children.clear();
        self.parent = None;
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Attribute value by name
    pub fn attr(&self, space: &str, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.is(space, local))
            .map(|a| a.value.as_str())
    }
}

impl fmt::Debug for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeData")
            .field("name", &self.name)
            .field("attrs", &self.attrs)
            .field("value", &self.value)
            .field("model", &self.model.as_ref().map(|m| m.type_name()))
            .field("children", &self.children)
            .finish()
    }
}

/// Default number of node shells kept for reuse
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Bounded free list of node shells shared by every tree of a context
///
/// Acquire takes a shell if one is available, release returns it unless the
/// pool is full, in which case the shell is dropped.
pub struct NodePool {
    tx: Sender<NodeData>,
    rx: Receiver<NodeData>,
}

impl NodePool {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    fn acquire(&self, name: QName) -> NodeData {
        match self.rx.try_recv() {
            Ok(mut node) => {
                node.name = name;
                node
            }
            Err(_) => NodeData::new(name),
        }
    }

    fn release(&self, mut node: NodeData) {
        node.reset();
        // pool full: let the shell drop
        let _ = self.tx.try_send(node);
    }

    /// Number of shells currently pooled
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }
}

impl fmt::Debug for NodePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePool")
            .field("pooled", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Arena of nodes
///
/// Handles stay valid until the node is released. Using a released handle
/// with the indexing operators panics; [`Tree::get`] returns `None` instead.
pub struct Tree {
    slots: Vec<Option<NodeData>>,
    free: Vec<u32>,
    ctx: Arc<Context>,
}

impl Tree {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            ctx,
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Take a fresh, detached node from the pool
    pub fn acquire(&mut self, name: QName) -> NodeId {
        let data = self.ctx.pool().acquire(name);
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(data);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(data));
                NodeId((self.slots.len() - 1) as u32)
            }
        }
    }

    /// Acquire a node carrying a text value
    pub fn acquire_text(&mut self, name: QName, value: impl Into<String>) -> NodeId {
        let id = self.acquire(name);
        self[id].value = value.into();
        id
    }

    /// Release a node and its whole subtree back to the pool
    ///
    /// The node is detached from its parent first. Releasing an already
    /// released handle does nothing.
    pub fn release(&mut self, id: NodeId) {
        if self.get(id).is_none() {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(data) = self.slots.get_mut(next.0 as usize).and_then(Option::take) else {
                continue;
            };
            stack.extend(data.children.iter().copied());
            self.free.push(next.0);
            self.ctx.pool().release(data);
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Append `child` as last child of `parent`
    ///
    /// A child that already has a parent is moved.
    ///
    /// # Panics
    ///
    /// Panics if `child` is `parent` itself or one of its ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            assert!(node != child, "node cannot be inserted below itself");
            cursor = self.parent(node);
        }
        self.detach(child);
        self[child].parent = Some(parent);
        self[parent].children.push(child);
    }

    /// Append `child`, replacing and releasing any child with the same local name
    pub fn add_or_replace_child(&mut self, parent: NodeId, child: NodeId) {
        let local = self[child].name.local.clone();
        let existing = self
            .children(parent)
            .iter()
            .copied()
            .find(|&c| c != child && self[c].name.local == local);
        match existing {
            Some(old) => {
                self.detach(child);
                let pos = self[parent].children.iter().position(|&c| c == old);
                self.release(old);
                self[child].parent = Some(parent);
                match pos {
                    Some(pos) => self[parent].children.insert(pos, child),
                    None => self[parent].children.push(child),
                }
            }
            None => self.append_child(parent, child),
        }
    }

    /// Unlink a node from its parent, keeping it alive
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != id);
        }
        self[id].parent = None;
    }

    /// First child matching `pred`
    pub fn find_child(&self, parent: NodeId, pred: impl Fn(&NodeData) -> bool) -> Option<NodeId> {
        self.children(parent).iter().copied().find(|&c| pred(&self[c]))
    }

    /// First child whose name is in namespace `uri`
    pub fn find_child_by_ns(&self, parent: NodeId, uri: &str) -> Option<NodeId> {
        self.find_child(parent, |n| n.name.space == uri)
    }

    /// First child whose model handles the given prefix or URI
    pub fn find_child_by_model(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.find_child(parent, |n| n.model.as_ref().is_some_and(|m| m.can(name)))
    }

    /// Set an attribute, last write wins
    pub fn set_attr(&mut self, id: NodeId, name: QName, value: impl Into<String>) {
        let value = value.into();
        let node = &mut self[id];
        match node.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => node.attrs.push(Attr { name, value }),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, space: &str, local: &str) -> Option<String> {
        let node = &mut self[id];
        let pos = node.attrs.iter().position(|a| a.name.is(space, local))?;
        Some(node.attrs.remove(pos).value)
    }

    /// Deep copy a subtree of `src` into this tree, returning the detached copy
    ///
    /// Models are not copied.
    pub fn copy_from(&mut self, src: &Tree, id: NodeId) -> NodeId {
        let node = &src[id];
        let copy = self.acquire(node.name.clone());
        self[copy].attrs = node.attrs.clone();
        self[copy].value = node.value.clone();
        for &child in node.children() {
            let child_copy = self.copy_from(src, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Deep copy a subtree within this tree
    pub fn copy(&mut self, id: NodeId) -> NodeId {
        let (name, attrs, value, children) = {
            let node = &self[id];
            (
                node.name.clone(),
                node.attrs.clone(),
                node.value.clone(),
                node.children.clone(),
            )
        };
        let copy = self.acquire(name);
        self[copy].attrs = attrs;
        self[copy].value = value;
        for child in children {
            let child_copy = self.copy(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Release every live node
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(data) = slot.take() {
                self.ctx.pool().release(data);
            }
        }
        self.slots.clear();
        self.free.clear();
    }
}

impl Index<NodeId> for Tree {
    type Output = NodeData;

    fn index(&self, id: NodeId) -> &NodeData {
        self.get(id).unwrap_or_else(|| panic!("stale node handle {:?}", id))
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("stale node handle {:?}", id))
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree").field("live", &self.len()).finish()
    }
}
