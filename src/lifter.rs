use serde_json::Value;

use crate::error::{CompressError, Result};
use crate::node::{attach_parent, Branch, FieldValue, NodeData, NodeRef};
use crate::schema::{registry, NodeType};

/// Properties tolerated on any raw node regardless of schema (spec.md §6).
const TOLERATED_PROPERTIES: [&str; 3] = ["type", "range", "loc"];

fn json_to_field_value(v: &Value) -> FieldValue {
    match v {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Int(i)
            } else {
                FieldValue::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => FieldValue::Str(s.clone()),
        Value::Array(arr) => FieldValue::Array(arr.iter().map(json_to_field_value).collect()),
        Value::Object(_) => {
            // Raw field values are scalars or homogeneous arrays per spec.md §3;
            // a nested object here is not expected for a field (only for
            // branches), but we degrade gracefully rather than panic.
            FieldValue::Null
        }
    }
}

fn raw_type_name(raw: &Value) -> Option<&str> {
    raw.get("type").and_then(Value::as_str)
}

/// Reads a single child, recursively lifting it. `strict` controls whether
/// `lift_must` (verify + fail) or `lift_sloppy` semantics apply recursively.
fn lift_node_value(raw: &Value, strict: bool) -> Result<NodeRef> {
    if strict {
        lift_must(raw)
    } else {
        Ok(lift_sloppy(raw))
    }
}

fn build_node(raw: &Value, node_type: &'static NodeType, strict: bool) -> Result<NodeRef> {
    let node = NodeData::new(node_type);

    for fd in node_type.fields.iter().filter(|f| !f.deleted) {
        let raw_value = raw.get(fd.name);
        match raw_value {
            Some(v) if !v.is_null() => {
                node.borrow_mut().fields.push((fd.name, json_to_field_value(v)));
            }
            _ => {
                if !fd.optional {
                    if strict {
                        return Err(CompressError::MissingField(node_type.name.to_string(), fd.name));
                    }
                }
            }
        }
    }

    for bd in node_type.branches.iter().filter(|b| !b.deleted) {
        let raw_value = raw.get(bd.name);
        match raw_value {
            Some(Value::Array(items)) => {
                if !bd.array {
                    if strict {
                        return Err(CompressError::ArrayShapeMismatch(node_type.name.to_string(), bd.name));
                    }
                }
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    let child = lift_node_value(item, strict)?;
                    attach_parent(&child, &node, bd.name, bd.name.to_string());
                    children.push(child);
                }
                node.borrow_mut().children.push((bd.name, Branch::Array(children)));
            }
            Some(v) if !v.is_null() => {
                if bd.array {
                    if strict {
                        return Err(CompressError::ArrayShapeMismatch(node_type.name.to_string(), bd.name));
                    }
                    node.borrow_mut().children.push((bd.name, Branch::Array(vec![])));
                    continue;
                }
                let child = lift_node_value(v, strict)?;
                attach_parent(&child, &node, bd.name, bd.name.to_string());
                node.borrow_mut().children.push((bd.name, Branch::Single(Some(child))));
            }
            _ => {
                if !bd.optional && strict {
                    return Err(CompressError::MissingBranch(node_type.name.to_string(), bd.name));
                }
                if bd.array {
                    node.borrow_mut().children.push((bd.name, Branch::Array(vec![])));
                } else {
                    node.borrow_mut().children.push((bd.name, Branch::Single(None)));
                }
            }
        }
    }

    Ok(node)
}

/// Rejects any raw property that is neither a tolerated property nor a
/// declared field/branch name, and confirms required fields/branches are
/// present and array shapes agree (spec.md §4.1 "verify").
fn verify(raw: &Value, node_type: &'static NodeType) -> Result<()> {
    let obj = match raw.as_object() {
        Some(o) => o,
        None => return Ok(()),
    };

    for key in obj.keys() {
        if TOLERATED_PROPERTIES.contains(&key.as_str()) {
            continue;
        }
        if node_type.field(key).is_some() || node_type.branch(key).is_some() {
            continue;
        }
        return Err(CompressError::UnknownProperty(node_type.name.to_string(), key.clone()));
    }

    for fd in node_type.fields.iter().filter(|f| !f.deleted && !f.optional) {
        match obj.get(fd.name) {
            Some(v) if !v.is_null() => {}
            _ => return Err(CompressError::MissingField(node_type.name.to_string(), fd.name)),
        }
    }

    for bd in node_type.branches.iter().filter(|b| !b.deleted) {
        match obj.get(bd.name) {
            Some(Value::Array(_)) => {
                if !bd.array {
                    return Err(CompressError::ArrayShapeMismatch(node_type.name.to_string(), bd.name));
                }
            }
            Some(v) if !v.is_null() => {
                if bd.array {
                    return Err(CompressError::ArrayShapeMismatch(node_type.name.to_string(), bd.name));
                }
            }
            _ => {
                if !bd.optional {
                    return Err(CompressError::MissingBranch(node_type.name.to_string(), bd.name));
                }
            }
        }
    }

    Ok(())
}

/// Promotes a raw untyped node object into a typed, schema-validated node,
/// recursively lifting children. Fails with `UnknownType` if the schema has
/// no entry for `raw["type"]`, and runs `verify` after construction
/// (spec.md §4.1 "lift_must").
pub fn lift_must(raw: &Value) -> Result<NodeRef> {
    let type_name = raw_type_name(raw).ok_or_else(|| CompressError::UnknownType(String::new()))?;
    let node_type = registry()
        .lookup(type_name)
        .ok_or_else(|| CompressError::UnknownType(type_name.to_string()))?;

    verify(raw, node_type)?;
    log::debug!("lift_must: {} verified", node_type.name);
    build_node(raw, node_type, true)
}

/// Same as `lift_must`, but substitutes `Unknown` when no schema matches and
/// performs no verification (spec.md §4.1 "lift_sloppy").
pub fn lift_sloppy(raw: &Value) -> NodeRef {
    let type_name = raw_type_name(raw).unwrap_or("Unknown");
    let reg = registry();
    let node_type = reg.lookup(type_name).unwrap_or_else(|| reg.unknown());

    build_node(raw, node_type, false).unwrap_or_else(|_| NodeData::new(reg.unknown()))
}

/// Assigns `attrs.number` in pre-order starting at 0 and `attrs.depth`
/// matching the parent chain, visiting children in declared branch order
/// with array branches visited in index order (spec.md §4.1).
pub fn depth_first_number(root: &NodeRef) {
    fn visit(node: &NodeRef, depth: u32, counter: &mut u32) {
        {
            let mut n = node.borrow_mut();
            n.attrs.number = Some(*counter);
            n.attrs.depth = depth;
        }
        *counter += 1;

        let children: Vec<NodeRef> = node
            .borrow()
            .children
            .iter()
            .flat_map(|(_, b)| match b {
                Branch::Single(Some(c)) => vec![c.clone()],
                Branch::Single(None) => vec![],
                Branch::Array(cs) => cs.clone(),
            })
            .collect();

        for child in children {
            visit(&child, depth + 1, counter);
        }
    }

    let mut counter = 0u32;
    visit(root, 0, &mut counter);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn lifts_simple_identifier() {
        let raw = json!({"type": "Identifier", "name": "x"});
        let node = lift_must(&raw).unwrap();
        let n = node.borrow();
        assert_eq!(n.node_type.name, "Identifier");
        assert_eq!(n.field("name"), Some(&FieldValue::Str("x".to_string())));
    }

    #[test]
    fn unknown_type_is_fatal_under_strict_lift() {
        let raw = json!({"type": "TotallyMadeUp"});
        assert!(matches!(lift_must(&raw), Err(CompressError::UnknownType(_))));
    }

    #[test]
    fn sloppy_lift_falls_back_to_unknown() {
        let raw = json!({"type": "TotallyMadeUp"});
        let node = lift_sloppy(&raw);
        assert_eq!(node.borrow().node_type.name, "Unknown");
    }

    #[test]
    fn missing_required_field_is_fatal() {
        let raw = json!({"type": "Identifier"});
        assert!(matches!(lift_must(&raw), Err(CompressError::MissingField(_, "name"))));
    }

    #[test]
    fn unknown_property_is_fatal() {
        let raw = json!({"type": "Identifier", "name": "x", "bogus": 1});
        assert!(matches!(lift_must(&raw), Err(CompressError::UnknownProperty(_, _))));
    }

    #[test]
    fn tolerated_properties_pass_verify() {
        let raw = json!({"type": "Identifier", "name": "x", "range": [0, 1], "loc": {}});
        assert!(lift_must(&raw).is_ok());
    }

    #[test]
    fn depth_first_numbering_is_preorder_and_contiguous() {
        let raw = json!({
            "type": "Program",
            "sourceType": "script",
            "body": [
                {"type": "ExpressionStatement", "expression": {"type": "Identifier", "name": "a"}},
                {"type": "ExpressionStatement", "expression": {"type": "Identifier", "name": "b"}},
            ],
        });
        let root = lift_must(&raw).unwrap();
        depth_first_number(&root);

        assert_eq!(root.borrow().attrs.number, Some(0));
        assert_eq!(root.borrow().attrs.depth, 0);

        let body = match root.borrow().branch("body").unwrap() {
            Branch::Array(v) => v.clone(),
            _ => panic!("expected array branch"),
        };
        assert_eq!(body[0].borrow().attrs.number, Some(1));
        assert_eq!(body[0].borrow().attrs.depth, 1);
        assert_eq!(body[1].borrow().attrs.number, Some(3));
    }
}
