//! The operation tree: the analyzed, cacheable structure of a filter
//! definition, independent of any particular captured values.

use std::fmt;
use crate::literal::Operator;
use crate::filter::DefinitionId;

/// Refers to one value slot of an `OperationTree`. Slots are numbered in
/// depth-first, left-to-right order of the leaves referencing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    /// The zero-based index of this slot within its tree's slot table.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// A single node of an operation tree.
///
/// Leaves never contain literal values, only `SlotId`s, which are resolved
/// against the captured values of a filter instance at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Equality, inequality, or an ordering comparison.
    Comparison {
        /// Name of the compared document field.
        field: &'static str,
        /// One of `Eq`, `Ne`, `Gt`, `Gte`, `Lt`, `Lte`.
        operator: Operator,
        /// The value the field is compared against.
        slot: SlotId,
    },
    /// The negation of an ordering comparison: matches every document the
    /// comparison doesn't, including ones lacking the field.
    NegatedComparison {
        /// Name of the compared document field.
        field: &'static str,
        /// One of `Gt`, `Gte`, `Lt`, `Lte`.
        operator: Operator,
        /// The value the field is compared against.
        slot: SlotId,
    },
    /// All children must match.
    And(Vec<Node>),
    /// At least one of the children must match. Children are kept in
    /// source order.
    Or(Vec<Node>),
    /// At least one element of an array field matches the subtree, which
    /// refers to the fields of the element type.
    ElementMatch {
        /// Name of the array field.
        field: &'static str,
        /// The criteria an array element has to satisfy.
        subtree: Box<Node>,
    },
    /// The array field has exactly the given number of elements.
    ArraySize {
        /// Name of the array field.
        field: &'static str,
        /// The expected number of elements.
        slot: SlotId,
    },
    /// Tests the field against an array of values.
    Membership {
        /// Name of the tested field.
        field: &'static str,
        /// One of `In`, `Nin`, `All`.
        operator: Operator,
        /// The array of values.
        slot: SlotId,
    },
}

impl Node {
    /// The total number of nodes in the subtree rooted at `self`.
    pub fn node_count(&self) -> usize {
        match *self {
            Node::And(ref children) | Node::Or(ref children) => {
                1 + children.iter().map(Node::node_count).sum::<usize>()
            }
            Node::ElementMatch { ref subtree, .. } => 1 + subtree.node_count(),
            Node::Comparison { .. } |
            Node::NegatedComparison { .. } |
            Node::ArraySize { .. } |
            Node::Membership { .. } => 1,
        }
    }

    /// The field directly referenced by this node, if it is a leaf or an
    /// element match.
    pub fn field(&self) -> Option<&'static str> {
        match *self {
            Node::Comparison { field, .. } |
            Node::NegatedComparison { field, .. } |
            Node::ElementMatch { field, .. } |
            Node::ArraySize { field, .. } |
            Node::Membership { field, .. } => Some(field),
            Node::And(_) | Node::Or(_) => None,
        }
    }
}

/// The analyzed form of a filter definition. Immutable once built, and
/// shared between all instances of the same definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTree {
    /// The definition this tree was built from.
    definition: DefinitionId,
    /// The root of the tree.
    root: Node,
    /// Maps each `SlotId` (by index) to the position of the captured value
    /// it refers to.
    slots: Vec<usize>,
}

impl OperationTree {
    /// Assembles a tree. `slots[i]` is the capture position of `SlotId(i)`.
    pub(crate) fn new(definition: DefinitionId, root: Node, slots: Vec<usize>) -> Self {
        OperationTree { definition, root, slots }
    }

    /// The identity of the definition this tree was analyzed from.
    pub fn definition(&self) -> DefinitionId {
        self.definition
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The number of value slots referenced by the leaves of this tree.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The position, among the captured values of a filter instance, of the
    /// value referenced by `slot`. Returns `None` for slots not in this tree.
    pub fn capture_position(&self, slot: SlotId) -> Option<usize> {
        self.slots.get(slot.0).cloned()
    }

    /// The total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}
