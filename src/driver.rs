use crate::cache::{CacheHit, DepthCache};
use crate::encoder::{write_direct_node, write_subtree_ref, write_template_ref, write_value};
use crate::error::Result;
use crate::node::{Attrs, Branch, NodeRef};
use crate::string_table::StringTable;
use crate::template::{Cut, Subst, Template};
use crate::walker::{walk, ChildOrArray, Descend, Visitor};

/// Tunable knobs with no effect on wire format, only on what the greedy
/// cache search considers (SPEC_FULL.md §9).
#[derive(Clone, Debug)]
pub struct CompressorOptions {
    pub collect_identifiers: bool,
    pub depth_cache_width: usize,
}

impl Default for CompressorOptions {
    fn default() -> Self {
        CompressorOptions { collect_identifiers: true, depth_cache_width: crate::cache::WIDTH }
    }
}

fn collect_strings(node: &NodeRef, table: &mut StringTable, options: &CompressorOptions) {
    let n = node.borrow();
    let is_identifier = n.node_type.name == "Identifier";
    for (name, value) in &n.fields {
        if is_identifier && *name == "name" {
            continue;
        }
        table.add_value_recursive(value);
    }
    if options.collect_identifiers && is_identifier {
        if let Some(crate::node::FieldValue::Str(name)) = n.field("name") {
            table.add_identifier(name);
        }
    }
    drop(n);

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
        collect_strings(&child, table, options);
    }
}

fn emit_subst_value(buf: &mut Vec<u8>, cut: &Cut, table: &StringTable, descend: &mut Vec<(&'static str, ChildOrArray)>, branch_name: &'static str) -> Result<()> {
    match &cut.subst {
        Subst::Value(v) => write_value(buf, v, table),
        Subst::ValueMap(_) => Ok(()),
        Subst::Node(n) => {
            descend.push((branch_name, ChildOrArray::Child(n.clone())));
            Ok(())
        }
        Subst::NodeArray(items) => {
            descend.push((branch_name, ChildOrArray::Array(items.clone())));
            Ok(())
        }
    }
}

/// Walks the lifted tree twice: a string-collection pass, then a
/// compression pass driven through `walker::walk` (spec.md §4.6).
pub struct CompressionDriver<'a> {
    pub buf: Vec<u8>,
    table: &'a StringTable,
    cache: DepthCache,
    pending_template: Option<(u32, Template)>,
}

impl<'a> CompressionDriver<'a> {
    pub fn new(table: &'a StringTable, depth_cache_width: usize) -> Self {
        CompressionDriver {
            buf: Vec::new(),
            table,
            cache: DepthCache::with_width(depth_cache_width),
            pending_template: None,
        }
    }

    fn emit_match(&mut self, depth: u32, hit: CacheHit) -> Descend {
        match hit {
            CacheHit::Template { delta, reverse_index, cuts } => {
                log::info!("template cache hit: delta={} rev={} cuts={}", delta, reverse_index, cuts.len());
                if write_template_ref(&mut self.buf, delta, reverse_index).is_err() {
                    return Descend::Natural;
                }
                self.emit_cuts(&cuts)
            }
            CacheHit::Subtree { delta, reverse_index, cuts, template } => {
                log::info!("tree cache hit: delta={} rev={} cuts={}", delta, reverse_index, cuts.len());
                let cut_nums: Vec<u32> = cuts.iter().map(|c| c.num).collect();
                if write_subtree_ref(&mut self.buf, delta, reverse_index, &cut_nums).is_err() {
                    return Descend::Natural;
                }
                self.pending_template = Some((depth, template));
                self.emit_cuts(&cuts)
            }
        }
    }

    fn emit_cuts(&mut self, cuts: &[Cut]) -> Descend {
        let mut overrides: Vec<(&'static str, ChildOrArray)> = Vec::new();
        for cut in cuts {
            match &cut.subst {
                Subst::Value(v) => {
                    let _ = write_value(&mut self.buf, v, self.table);
                }
                // No wire encoding is specified for a whole-map substitution
                // (spec.md §4.4 step 3); such a divergence is large enough
                // that the cache search never selects it as beneficial.
                Subst::ValueMap(_) => {}
                Subst::Node(_) | Subst::NodeArray(_) => {
                    let branch_name = cut.reason.branch_name().unwrap_or("");
                    let _ = emit_subst_value(&mut self.buf, cut, self.table, &mut overrides, branch_name);
                }
            }
        }
        Descend::Override(overrides)
    }
}

impl<'a> Visitor for CompressionDriver<'a> {
    fn begin(&mut self, node: &NodeRef, attrs: Attrs) -> Descend {
        if attrs.depth > 0 {
            if let Some(hit) = self.cache.search(attrs.depth, node) {
                return self.emit_match(attrs.depth, hit);
            }
        }

        if write_direct_node(&mut self.buf, node, self.table).is_err() {
            log::debug!("direct-node encode failed for {}", node.borrow().node_type.name);
        }
        Descend::Natural
    }

    fn end(&mut self, node: &NodeRef, attrs: Attrs) {
        self.cache.push_tree(attrs.depth, node.clone());
        if let Some((depth, template)) = self.pending_template.take() {
            self.cache.push_template(depth, template);
        }
    }

    fn empty_array(&mut self, _name: &'static str, _parent_attrs: Attrs) {
        self.buf.push(0x20);
    }
}

/// Runs the full pipeline: string collection, then a compression walk,
/// returning the framed byte stream (table + top-level node encoding)
/// (spec.md §4.6, §6).
pub fn compress_document(root: &NodeRef, options: &CompressorOptions) -> Vec<u8> {
    let mut table = StringTable::new();
    collect_strings(root, &mut table, options);
    table.finalize();
    log::info!("string table finalized with {} entries", table.len());

    let mut out = Vec::new();
    crate::encoder::write_string_table(&mut out, &table).expect("string table write cannot fail after finalize");

    let mut driver = CompressionDriver::new(&table, options.depth_cache_width);
    walk(root, &mut driver);
    out.extend_from_slice(&driver.buf);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifter::lift_must;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_program_matches_spec_vector() {
        let root = lift_must(&json!({"type": "Program", "sourceType": "script", "body": []})).unwrap();
        let bytes = compress_document(&root, &CompressorOptions::default());
        let program_code = crate::schema::registry().lookup("Program").unwrap().code as u8;
        assert_eq!(
            bytes,
            vec![0x01, 0x06, b's', b'c', b'r', b'i', b'p', b't', program_code, 0x14, 0x00, 0x20]
        );
    }

    #[test]
    fn repeated_identifier_siblings_reference_each_other() {
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
        // A subtree reference marker (varuint 0 = byte 0x00) must appear somewhere
        // in the stream once the second identical `Identifier("foo")` is reached.
        assert!(bytes.windows(4).any(|w| w[0] == 0x00 && w[3] == 0xFF));
    }
}
