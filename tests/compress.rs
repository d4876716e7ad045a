use ast_compress::driver::{compress_document, CompressorOptions};
use ast_compress::lifter::{depth_first_number, lift_must};
use ast_compress::schema::registry;
use ast_compress::string_table::StringTable;
use ast_compress::template::compute_template;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn single_char_identifier_end_to_end() {
    let root = lift_must(&json!({"type": "Identifier", "name": "x"})).unwrap();
    let bytes = compress_document(&root, &CompressorOptions::default());
    // table size 0, raw-ident type code 2, then ASCII 'x'.
    assert_eq!(bytes, vec![0x00, 0x02, b'x']);
}

#[test]
fn cache_hit_emits_subtree_reference() {
    let root = lift_must(&json!({
        "type": "Program",
        "sourceType": "script",
        "body": [
            {"type": "ExpressionStatement", "expression": {"type": "Identifier", "name": "foo"}},
            {"type": "ExpressionStatement", "expression": {"type": "Identifier", "name": "foo"}},
        ],
    }))
    .unwrap();
    let bytes = compress_document(&root, &CompressorOptions::default());
    let marker = bytes.windows(4).position(|w| w[0] == 0x00 && w[3] == 0xFF);
    assert!(marker.is_some(), "expected a subtree-ref marker (00 .. .. FF) in {:?}", bytes);
}

#[test]
fn template_divergence_on_operator_field() {
    let a = lift_must(&json!({
        "type": "BinaryExpression", "operator": "+",
        "left": {"type": "Literal", "value": 1},
        "right": {"type": "Literal", "value": 2},
    }))
    .unwrap();
    let b = lift_must(&json!({
        "type": "BinaryExpression", "operator": "-",
        "left": {"type": "Literal", "value": 1},
        "right": {"type": "Literal", "value": 2},
    }))
    .unwrap();

    let t = compute_template(&a, &b);
    assert_eq!(t.cut_count, 1);
    assert!(t.step_count >= 1);
    assert!(matches!(t.cuts[0].reason, ast_compress::template::CutReason::Value(_, "operator")));
}

#[test]
fn numbering_is_bijective_over_range() {
    let root = lift_must(&json!({
        "type": "Program",
        "sourceType": "script",
        "body": [
            {"type": "ExpressionStatement", "expression": {"type": "Identifier", "name": "a"}},
            {"type": "ExpressionStatement", "expression": {"type": "Identifier", "name": "b"}},
            {"type": "ExpressionStatement", "expression": {"type": "Literal", "value": 3}},
        ],
    }))
    .unwrap();
    depth_first_number(&root);

    fn collect_numbers(node: &ast_compress::NodeRef, out: &mut Vec<u32>) {
        let n = node.borrow();
        out.push(n.attrs.number.expect("numbered"));
        let children: Vec<ast_compress::NodeRef> = n
            .children
            .iter()
            .flat_map(|(_, b)| match b {
                ast_compress::node::Branch::Single(Some(c)) => vec![c.clone()],
                ast_compress::node::Branch::Single(None) => vec![],
                ast_compress::node::Branch::Array(cs) => cs.clone(),
            })
            .collect();
        drop(n);
        for c in children {
            collect_numbers(&c, out);
        }
    }

    let mut numbers = Vec::new();
    collect_numbers(&root, &mut numbers);
    numbers.sort_unstable();
    let expected: Vec<u32> = (0..numbers.len() as u32).collect();
    assert_eq!(numbers, expected);
}

#[test]
fn string_table_lookup_succeeds_for_every_source_string() {
    let root = lift_must(&json!({
        "type": "Program",
        "sourceType": "module",
        "body": [
            {"type": "ExpressionStatement", "expression": {"type": "Identifier", "name": "hello"}},
            {"type": "ExpressionStatement", "expression": {"type": "Literal", "value": "world"}},
        ],
    }))
    .unwrap();

    let mut table = StringTable::new();
    fn walk(node: &ast_compress::NodeRef, table: &mut StringTable) {
        let n = node.borrow();
        for (_, v) in &n.fields {
            table.add_value_recursive(v);
        }
        if n.node_type.name == "Identifier" {
            if let Some(ast_compress::node::FieldValue::Str(name)) = n.field("name") {
                table.add_identifier(name);
            }
        }
        let children: Vec<ast_compress::NodeRef> = n
            .children
            .iter()
            .flat_map(|(_, b)| match b {
                ast_compress::node::Branch::Single(Some(c)) => vec![c.clone()],
                ast_compress::node::Branch::Single(None) => vec![],
                ast_compress::node::Branch::Array(cs) => cs.clone(),
            })
            .collect();
        drop(n);
        for c in children {
            walk(&c, table);
        }
    }
    walk(&root, &mut table);
    table.finalize();

    for s in ["module", "hello", "world"] {
        assert!(table.lookup(s).is_ok(), "expected lookup to succeed for {:?}", s);
    }
}

#[test]
fn every_registered_type_has_a_unique_code_from_first_node_type_code() {
    let reg = registry();
    let mut codes: Vec<u32> = reg.types.iter().map(|t| t.code).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), reg.types.len(), "expected all type codes to be unique");
    assert_eq!(*codes.first().unwrap(), ast_compress::schema::FIRST_NODE_TYPE_CODE);
}
