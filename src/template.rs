use std::collections::VecDeque;

use crate::node::{Branch, FieldValue, NodeRef};

/// Why a position in a template walk diverged (spec.md §3 "Cut"). The
/// variant itself is the closed set of reasons; `Value` carries the loop
/// index and field name used to format `"value:<i>:<name>"`.
#[derive(Clone, Debug, PartialEq)]
pub enum CutReason {
    NodeType,
    FieldNames,
    Value(usize, &'static str),
    ChildNames,
    ChildArrayLength(&'static str),
    NullQueryChild(&'static str),
    NotnullQueryChild(&'static str),
}

impl CutReason {
    /// The branch this cut applies to, when it is a per-branch cut (the
    /// driver needs this to reroute the walker's descent).
    pub fn branch_name(&self) -> Option<&'static str> {
        match self {
            CutReason::ChildArrayLength(name)
            | CutReason::NullQueryChild(name)
            | CutReason::NotnullQueryChild(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for CutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CutReason::NodeType => write!(f, "node_type"),
            CutReason::FieldNames => write!(f, "field_names"),
            CutReason::Value(i, name) => write!(f, "value:{}:{}", i, name),
            CutReason::ChildNames => write!(f, "child_names"),
            CutReason::ChildArrayLength(name) => write!(f, "child_array_length:{}", name),
            CutReason::NullQueryChild(name) => write!(f, "null_query_child:{}", name),
            CutReason::NotnullQueryChild(name) => write!(f, "notnull_query_child:{}", name),
        }
    }
}

/// The substitution payload carried by a cut: exactly one of a scalar
/// value, a whole field-value map, a replacement node, or a replacement
/// node array (spec.md §3 "Cut").
#[derive(Clone)]
pub enum Subst {
    Value(FieldValue),
    ValueMap(Vec<(&'static str, FieldValue)>),
    Node(NodeRef),
    NodeArray(Vec<NodeRef>),
}

/// A single divergence point within a template walk (spec.md §3 "Cut").
#[derive(Clone)]
pub struct Cut {
    pub num: u32,
    pub reason: CutReason,
    pub descr: String,
    pub subst: Subst,
}

/// An origin subtree plus the cut points at which a query diverges from it
/// (spec.md §3 "Template").
#[derive(Clone)]
pub struct Template {
    pub tree: NodeRef,
    pub step_count: u32,
    pub cut_count: u32,
    pub cuts: Vec<Cut>,
}

impl Template {
    pub fn benefit(&self) -> i64 {
        self.step_count as i64 - 1
    }

    /// Re-runs `compute_template(self.tree, query)` and returns the
    /// resulting cuts iff `step_count`, `cut_count`, `cuts.len()` and every
    /// `cuts[i].num` agree with this template; otherwise `None`
    /// (spec.md §4.4 "template.matches").
    pub fn matches(&self, query: &NodeRef) -> Option<Vec<Cut>> {
        let candidate = compute_template(&self.tree, query);

        if candidate.step_count != self.step_count {
            return None;
        }
        if candidate.cut_count != self.cut_count {
            return None;
        }
        if candidate.cuts.len() != self.cuts.len() {
            return None;
        }
        for (a, b) in self.cuts.iter().zip(candidate.cuts.iter()) {
            if a.num != b.num {
                return None;
            }
        }

        Some(candidate.cuts)
    }
}

fn sorted_field_names(node: &NodeRef) -> Vec<&'static str> {
    let mut names = node.borrow().field_names();
    names.sort_unstable();
    names
}

fn sorted_branch_names(node: &NodeRef) -> Vec<&'static str> {
    let mut names = node.borrow().branch_names();
    names.sort_unstable();
    names
}

fn branch_of(node: &NodeRef, name: &str) -> Branch {
    node.borrow()
        .branch(name)
        .cloned()
        .unwrap_or(Branch::Single(None))
}

struct Accumulator {
    number: u32,
    step_count: u32,
    cut_count: u32,
    cuts: Vec<Cut>,
}

impl Accumulator {
    fn step(&mut self) {
        self.number += 1;
        self.step_count += 1;
    }

    fn cut(&mut self, reason: CutReason, descr: String, subst: Subst) {
        self.cuts.push(Cut { num: self.number, reason, descr, subst });
        self.number += 1;
        self.cut_count += 1;
    }
}

/// Computes the template that turns `origin` into `query`: the set of cut
/// points where they diverge plus step/cut accounting, walking both trees
/// in lockstep breadth-first (spec.md §4.4).
pub fn compute_template(origin: &NodeRef, query: &NodeRef) -> Template {
    let mut acc = Accumulator { number: 0, step_count: 0, cut_count: 0, cuts: Vec::new() };
    let mut queue: VecDeque<(NodeRef, NodeRef)> = VecDeque::new();
    queue.push_back((origin.clone(), query.clone()));

    while let Some((o, q)) = queue.pop_front() {
        match_nodes(&o, &q, &mut queue, &mut acc);
    }

    Template {
        tree: origin.clone(),
        step_count: acc.step_count,
        cut_count: acc.cut_count,
        cuts: acc.cuts,
    }
}

fn match_nodes(o: &NodeRef, q: &NodeRef, queue: &mut VecDeque<(NodeRef, NodeRef)>, acc: &mut Accumulator) {
    // Step 1: node type.
    let (o_type, q_type) = (o.borrow().node_type.name, q.borrow().node_type.name);
    if o_type != q_type {
        acc.cut(
            CutReason::NodeType,
            format!("{} != {}", o_type, q_type),
            Subst::Node(q.clone()),
        );
        return;
    }
    acc.step();

    // Step 3: field-name sets.
    let o_fields = sorted_field_names(o);
    let q_fields = sorted_field_names(q);
    if o_fields != q_fields {
        let q_field_values: Vec<(&'static str, FieldValue)> = q.borrow().fields.clone();
        acc.cut(
            CutReason::FieldNames,
            format!("{:?} != {:?}", o_fields, q_fields),
            Subst::ValueMap(q_field_values),
        );
        return;
    }

    // Step 4: per-field value equality. Per spec.md, a mismatch continues
    // rather than returning, so every field is still checked.
    for (i, name) in o_fields.iter().enumerate() {
        let o_val = o.borrow().field(name).cloned();
        let q_val = q.borrow().field(name).cloned();
        match (o_val, q_val) {
            (Some(ov), Some(qv)) if !ov.structurally_eq(&qv) => {
                acc.cut(
                    CutReason::Value(i, name),
                    format!("{:?} != {:?}", ov, qv),
                    Subst::Value(qv),
                );
            }
            (None, Some(qv)) => {
                acc.cut(CutReason::Value(i, name), "missing -> present".to_string(), Subst::Value(qv));
            }
            _ => {}
        }
    }

    // Step 5: branch-name sets.
    let o_branches = sorted_branch_names(o);
    let q_branches = sorted_branch_names(q);
    if o_branches != q_branches {
        acc.cut(
            CutReason::ChildNames,
            format!("{:?} != {:?}", o_branches, q_branches),
            Subst::Node(q.clone()),
        );
        return;
    }

    // Step 6.
    acc.step();

    // Step 7: per-branch comparison.
    for name in o_branches {
        let o_branch = branch_of(o, name);
        let q_branch = branch_of(q, name);

        match (o_branch, q_branch) {
            (Branch::Array(o_items), Branch::Array(q_items)) => {
                if o_items.len() == q_items.len() {
                    acc.step();
                    for (oc, qc) in o_items.into_iter().zip(q_items.into_iter()) {
                        queue.push_back((oc, qc));
                    }
                } else {
                    acc.cut(
                        CutReason::ChildArrayLength(name),
                        format!("{} != {}", o_items.len(), q_items.len()),
                        Subst::NodeArray(q_items),
                    );
                }
            }
            (Branch::Single(None), Branch::Single(None)) => {
                acc.step();
            }
            (Branch::Single(None), Branch::Single(Some(qc))) => {
                acc.cut(CutReason::NotnullQueryChild(name), "null -> node".to_string(), Subst::Node(qc));
            }
            (Branch::Single(Some(_)), Branch::Single(None)) => {
                acc.cut(CutReason::NullQueryChild(name), "node -> null".to_string(), Subst::Node(q.clone()));
            }
            (Branch::Single(Some(oc)), Branch::Single(Some(qc))) => {
                acc.step();
                queue.push_back((oc, qc));
            }
            // Array/non-array disagreement cannot occur: branch shape is
            // fixed by the schema descriptor and both nodes share a type.
            (o_other, q_other) => {
                acc.cut(
                    CutReason::ChildArrayLength(name),
                    "branch shape mismatch".to_string(),
                    match q_other {
                        Branch::Array(items) => Subst::NodeArray(items),
                        Branch::Single(Some(n)) => Subst::Node(n),
                        Branch::Single(None) => Subst::Node(q.clone()),
                    },
                );
                let _ = o_other;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifter::lift_must;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn lit(n: i64) -> NodeRef {
        lift_must(&json!({"type": "Literal", "value": n})).unwrap()
    }

    #[test]
    fn identical_subtrees_yield_no_cuts() {
        let a = lit(3);
        let t = compute_template(&a, &a);
        assert_eq!(t.cut_count, 0);
        assert_eq!(t.cuts.len(), 0);
        assert!(t.step_count >= 1);
        assert_eq!(t.benefit(), t.step_count as i64 - 1);
    }

    #[test]
    fn differing_values_produce_one_cut() {
        let a = lit(3);
        let b = lit(4);
        let t = compute_template(&a, &b);
        assert_eq!(t.cut_count, 1);
        assert_eq!(t.cuts.len(), 1);
        assert!(matches!(t.cuts[0].reason, CutReason::Value(0, "value")));
    }

    #[test]
    fn differing_types_cut_immediately() {
        let a = lit(3);
        let b = lift_must(&json!({"type": "Identifier", "name": "x"})).unwrap();
        let t = compute_template(&a, &b);
        assert_eq!(t.cut_count, 1);
        assert_eq!(t.step_count, 0);
        assert!(matches!(t.cuts[0].reason, CutReason::NodeType));
    }

    #[test]
    fn cuts_are_strictly_increasing() {
        let a = lift_must(&json!({
            "type": "BinaryExpression", "operator": "+",
            "left": {"type": "Literal", "value": 1},
            "right": {"type": "Literal", "value": 2},
        })).unwrap();
        let b = lift_must(&json!({
            "type": "BinaryExpression", "operator": "-",
            "left": {"type": "Literal", "value": 1},
            "right": {"type": "Literal", "value": 9},
        })).unwrap();

        let t = compute_template(&a, &b);
        assert_eq!(t.cut_count, 2);
        for w in t.cuts.windows(2) {
            assert!(w[0].num < w[1].num);
        }
    }

    #[test]
    fn matches_reruns_and_agrees_with_self() {
        let a = lift_must(&json!({
            "type": "BinaryExpression", "operator": "+",
            "left": {"type": "Literal", "value": 1},
            "right": {"type": "Literal", "value": 2},
        })).unwrap();
        let t = compute_template(&a, &a);
        let rerun = t.matches(&a).unwrap();
        assert_eq!(rerun.len(), 0);
    }

    #[test]
    fn matches_returns_none_on_shape_disagreement() {
        let a = lift_must(&json!({
            "type": "BinaryExpression", "operator": "+",
            "left": {"type": "Literal", "value": 1},
            "right": {"type": "Literal", "value": 2},
        })).unwrap();
        let different_shape = lift_must(&json!({"type": "Identifier", "name": "z"})).unwrap();
        let t = compute_template(&a, &a);
        assert!(t.matches(&different_shape).is_none());
    }
}
