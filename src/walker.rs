use crate::node::{Attrs, Branch, NodeRef};

/// What `begin` returned for one node: descend naturally, prune entirely, or
/// descend only into an explicit override list (spec.md §4.2).
pub enum Descend {
    Natural,
    Prune,
    Override(Vec<(&'static str, ChildOrArray)>),
}

#[derive(Clone)]
pub enum ChildOrArray {
    Child(NodeRef),
    Array(Vec<NodeRef>),
}

/// Callbacks a tree walk invokes. `begin`/`end` bracket every visited node;
/// `empty_array` fires once per zero-length array branch instead of `begin`.
pub trait Visitor {
    fn begin(&mut self, node: &NodeRef, attrs: Attrs) -> Descend;
    fn end(&mut self, node: &NodeRef, attrs: Attrs);
    fn empty_array(&mut self, name: &'static str, parent_attrs: Attrs);
}

/// Walks `root` depth-first, calling `begin`/`end` around every node and
/// `empty_array` for zero-length array branches. `number` is a monotone
/// counter local to this walk, distinct from the pre-order numbering
/// assigned by `depth_first_number` (spec.md §4.2).
pub fn walk<V: Visitor>(root: &NodeRef, visitor: &mut V) {
    let mut counter: u32 = 0;
    walk_node(root, 0, &mut counter, visitor);
}

fn walk_node<V: Visitor>(node: &NodeRef, depth: u32, counter: &mut u32, visitor: &mut V) {
    let attrs = Attrs { number: Some(*counter), depth };
    *counter += 1;

    match visitor.begin(node, attrs) {
        Descend::Prune => {}
        Descend::Natural => {
            let children: Vec<(&'static str, Branch)> = node.borrow().children.clone();
            for (name, branch) in children {
                match branch {
                    Branch::Single(Some(child)) => walk_node(&child, depth + 1, counter, visitor),
                    Branch::Single(None) => {}
                    Branch::Array(items) => {
                        if items.is_empty() {
                            visitor.empty_array(name, attrs);
                        } else {
                            for item in items {
                                walk_node(&item, depth + 1, counter, visitor);
                            }
                        }
                    }
                }
            }
            visitor.end(node, attrs);
        }
        Descend::Override(overrides) => {
            for (name, child_or_array) in overrides {
                match child_or_array {
                    ChildOrArray::Child(child) => walk_node(&child, depth + 1, counter, visitor),
                    ChildOrArray::Array(items) => {
                        if items.is_empty() {
                            visitor.empty_array(name, attrs);
                        } else {
                            for item in items {
                                walk_node(&item, depth + 1, counter, visitor);
                            }
                        }
                    }
                }
            }
            visitor.end(node, attrs);
        }
    }
}
