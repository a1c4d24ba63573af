//! The variable descriptor registry.
//!
//! An insertion-ordered, doubly linked list of every live foreign-backed
//! variable, used for orderly teardown. Backed by a slab so removal from
//! an arbitrary position is O(1) and never compacts; node ids stay valid
//! until their node is removed.

use std::rc::Rc;

use host_params::ParamOps;

/// Identifier of one registry node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// One registered descriptor: the bound name and the binding identity
/// teardown uses to splice the exact descriptor out of its shadow chain.
pub struct RegistryEntry {
    /// Owned copy of the variable name.
    pub name: String,
    /// The descriptor's dispatch ops.
    pub ops: Rc<dyn ParamOps>,
}

struct Node {
    prev: Option<usize>,
    next: Option<usize>,
    entry: RegistryEntry,
}

/// Insertion-ordered descriptor list.
#[derive(Default)]
pub struct Registry {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// Appends an entry, returning its node id.
    pub fn push_back(&mut self, entry: RegistryEntry) -> NodeId {
        let node = Node {
            prev: self.tail,
            next: None,
            entry,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                index
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        if let Some(tail) = self.tail {
            if let Some(Some(tail_node)) = self.nodes.get_mut(tail) {
                tail_node.next = Some(index);
            }
        } else {
            self.head = Some(index);
        }
        self.tail = Some(index);
        self.len += 1;
        NodeId(index)
    }

    /// Unlinks a node in O(1). Returns its entry, or `None` when the id
    /// was already removed.
    pub fn remove(&mut self, id: NodeId) -> Option<RegistryEntry> {
        let node = self.nodes.get_mut(id.0)?.take()?;
        match node.prev {
            Some(prev) => {
                if let Some(Some(prev_node)) = self.nodes.get_mut(prev) {
                    prev_node.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(Some(next_node)) = self.nodes.get_mut(next) {
                    next_node.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }
        self.free.push(id.0);
        self.len -= 1;
        Some(node.entry)
    }

    /// The entry behind a node id.
    pub fn entry(&self, id: NodeId) -> Option<&RegistryEntry> {
        self.nodes.get(id.0)?.as_ref().map(|n| &n.entry)
    }

    /// Node ids in insertion order, front to back.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(index) = cursor {
            out.push(NodeId(index));
            cursor = self.nodes.get(index).and_then(|n| n.as_ref()).and_then(|n| n.next);
        }
        out
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
