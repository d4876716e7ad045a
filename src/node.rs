use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::schema::NodeType;

/// A field value: null, boolean, integer, finite non-integer number, string,
/// or a homogeneous array of values (spec.md §3 "Field").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Structural equality used by the template matcher (spec.md §4.4 step 4):
    /// null equals null, null never equals non-null, everything else is
    /// value equality including recursive array comparison.
    pub fn structurally_eq(&self, other: &FieldValue) -> bool {
        self == other
    }

    pub fn is_finite_non_integer(&self) -> bool {
        matches!(self, FieldValue::Float(f) if f.is_finite() && f.fract() != 0.0)
    }
}

/// One child relation: either a single optional child, or an ordered array
/// of children (spec.md §3 "Node" / "children_map").
#[derive(Clone, Debug)]
pub enum Branch {
    Single(Option<NodeRef>),
    Array(Vec<NodeRef>),
}

impl Branch {
    pub fn is_array(&self) -> bool {
        matches!(self, Branch::Array(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Branch::Single(Some(_)) => 1,
            Branch::Single(None) => 0,
            Branch::Array(v) => v.len(),
        }
    }
}

/// Non-owning back-reference to a node's parent, written exactly once at
/// construction time (spec.md §3 "parent_edge").
pub struct ParentEdge {
    pub parent: Weak<RefCell<NodeData>>,
    pub branch_name: String,
    pub display_name: String,
}

/// Walk-assigned metadata (spec.md §3 "attrs").
#[derive(Clone, Copy, Debug, Default)]
pub struct Attrs {
    pub number: Option<u32>,
    pub depth: u32,
}

pub struct NodeData {
    pub node_type: &'static NodeType,
    /// Field values in schema-declared order (only non-deleted, present fields).
    pub fields: Vec<(&'static str, FieldValue)>,
    /// Child relations in schema-declared order.
    pub children: Vec<(&'static str, Branch)>,
    pub parent_edge: Option<ParentEdge>,
    pub attrs: Attrs,
}

pub type NodeRef = Rc<RefCell<NodeData>>;

impl NodeData {
    pub fn new(node_type: &'static NodeType) -> NodeRef {
        Rc::new(RefCell::new(NodeData {
            node_type,
            fields: Vec::new(),
            children: Vec::new(),
            parent_edge: None,
            attrs: Attrs::default(),
        }))
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.children.iter().find(|(n, _)| *n == name).map(|(_, b)| b)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(n, _)| *n).collect()
    }

    pub fn branch_names(&self) -> Vec<&'static str> {
        self.children.iter().map(|(n, _)| *n).collect()
    }
}

/// Set parent_edge exactly once, as a non-owning back-reference.
pub fn attach_parent(child: &NodeRef, parent: &NodeRef, branch_name: &'static str, display_name: String) {
    child.borrow_mut().parent_edge = Some(ParentEdge {
        parent: Rc::downgrade(parent),
        branch_name: branch_name.to_string(),
        display_name,
    });
}
