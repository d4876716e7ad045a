use std::collections::VecDeque;

use crate::node::NodeRef;
use crate::template::{compute_template, Cut, Template};

/// Bounded FIFO: appends to the tail, drops the head once `WIDTH` is
/// exceeded (spec.md §3 "Depth cache").
pub const WIDTH: usize = 64;

pub struct RingBuffer<T> {
    items: VecDeque<T>,
    width: usize,
}

impl<T> RingBuffer<T> {
    fn with_width(width: usize) -> Self {
        RingBuffer { items: VecDeque::with_capacity(width), width }
    }

    fn push(&mut self, item: T) {
        if self.items.len() >= self.width {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Iterates newest-first; index 0 is the most recently pushed item.
    fn iter_newest_first(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items.iter().rev().enumerate()
    }
}

pub struct Entry {
    pub trees: RingBuffer<NodeRef>,
    pub templates: RingBuffer<Template>,
}

impl Entry {
    fn with_width(width: usize) -> Self {
        Entry { trees: RingBuffer::with_width(width), templates: RingBuffer::with_width(width) }
    }
}

/// A positive-benefit match found by `search`, carrying enough information
/// for the driver to emit the reference and recurse into substitutions
/// (spec.md §4.6).
pub enum CacheHit {
    Template { delta: i32, reverse_index: u8, cuts: Vec<Cut> },
    Subtree { delta: i32, reverse_index: u8, cuts: Vec<Cut>, template: Template },
}

const TEMPLATE_DELTAS: [i32; 5] = [0, -1, 1, -2, 2];
const TREE_DELTAS: [i32; 3] = [0, -1, 1];

/// Per-depth bounded history of emitted subtrees and derived templates
/// (spec.md §4.5).
pub struct DepthCache {
    entries: Vec<Entry>,
    width: usize,
}

impl DepthCache {
    pub fn new() -> Self {
        Self::with_width(WIDTH)
    }

    /// Overrides the ring-buffer capacity per depth (`CompressorOptions::depth_cache_width`).
    pub fn with_width(width: usize) -> Self {
        DepthCache { entries: Vec::new(), width }
    }

    fn ensure_depth(&mut self, depth: usize) {
        while self.entries.len() <= depth {
            self.entries.push(Entry::with_width(self.width));
        }
    }

    pub fn push_tree(&mut self, depth: u32, node: NodeRef) {
        self.ensure_depth(depth as usize);
        self.entries[depth as usize].trees.push(node);
    }

    pub fn push_template(&mut self, depth: u32, template: Template) {
        self.ensure_depth(depth as usize);
        self.entries[depth as usize].templates.push(template);
    }

    fn entry_at(&self, depth: i64) -> Option<&Entry> {
        if depth < 0 {
            return None;
        }
        self.entries.get(depth as usize)
    }

    fn template_search(&self, depth: u32, query: &NodeRef) -> Option<(i64, i32, u8, Vec<Cut>)> {
        let mut best: Option<(i64, i32, u8, Vec<Cut>)> = None;
        for delta in TEMPLATE_DELTAS {
            let probe = depth as i64 + delta as i64;
            let entry = match self.entry_at(probe) {
                Some(e) => e,
                None => continue,
            };
            for (reverse_index, prior) in entry.templates.iter_newest_first() {
                if let Some(cuts) = prior.matches(query) {
                    let benefit = prior.benefit();
                    if best.as_ref().map_or(true, |(b, ..)| benefit > *b) {
                        best = Some((benefit, delta, reverse_index as u8, cuts));
                    }
                }
            }
        }
        best
    }

    fn tree_search(&self, depth: u32, query: &NodeRef) -> Option<(i64, i32, u8, Template)> {
        let query_type = query.borrow().node_type.name;
        let mut best: Option<(i64, i32, u8, Template)> = None;
        for delta in TREE_DELTAS {
            let probe = depth as i64 + delta as i64;
            let entry = match self.entry_at(probe) {
                Some(e) => e,
                None => continue,
            };
            for (reverse_index, prior) in entry.trees.iter_newest_first() {
                if prior.borrow().node_type.name != query_type {
                    continue;
                }
                let tmpl = compute_template(prior, query);
                let benefit = tmpl.step_count as i64 - tmpl.cut_count as i64 - 1;
                if best.as_ref().map_or(true, |(b, ..)| benefit > *b) {
                    best = Some((benefit, delta, reverse_index as u8, tmpl));
                }
            }
        }
        best
    }

    /// Runs both sub-searches and returns the higher-benefit positive
    /// candidate; ties favor the template match (spec.md §4.5).
    pub fn search(&self, depth: u32, query: &NodeRef) -> Option<CacheHit> {
        let template_best = self.template_search(depth, query);
        let tree_best = self.tree_search(depth, query);

        let template_benefit = template_best.as_ref().map(|(b, ..)| *b).filter(|b| *b > 0);
        let tree_benefit = tree_best.as_ref().map(|(b, ..)| *b).filter(|b| *b > 0);

        match (template_benefit, tree_benefit) {
            (Some(tb), Some(rb)) => {
                if rb > tb {
                    let (_, delta, reverse_index, tmpl) = tree_best.unwrap();
                    Some(CacheHit::Subtree { delta, reverse_index, cuts: tmpl.cuts.clone(), template: tmpl })
                } else {
                    let (_, delta, reverse_index, cuts) = template_best.unwrap();
                    Some(CacheHit::Template { delta, reverse_index, cuts })
                }
            }
            (Some(_), None) => {
                let (_, delta, reverse_index, cuts) = template_best.unwrap();
                Some(CacheHit::Template { delta, reverse_index, cuts })
            }
            (None, Some(_)) => {
                let (_, delta, reverse_index, tmpl) = tree_best.unwrap();
                Some(CacheHit::Subtree { delta, reverse_index, cuts: tmpl.cuts.clone(), template: tmpl })
            }
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifter::lift_must;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ident(name: &str) -> NodeRef {
        lift_must(&json!({"type": "Identifier", "name": name})).unwrap()
    }

    #[test]
    fn no_match_on_empty_cache() {
        let cache = DepthCache::new();
        let q = ident("foo");
        assert!(cache.search(0, &q).is_none());
    }

    #[test]
    fn tree_search_finds_identical_sibling() {
        let mut cache = DepthCache::new();
        let a = ident("foo");
        cache.push_tree(2, a.clone());

        let b = ident("foo");
        let hit = cache.search(2, &b).unwrap();
        match hit {
            CacheHit::Subtree { delta, reverse_index, cuts, .. } => {
                assert_eq!(delta, 0);
                assert_eq!(reverse_index, 0);
                assert!(cuts.is_empty());
            }
            CacheHit::Template { .. } => panic!("expected a tree match"),
        }
    }

    #[test]
    fn tree_search_respects_depth_range_of_one() {
        let mut cache = DepthCache::new();
        let a = ident("foo");
        cache.push_tree(5, a);

        let b = ident("foo");
        // depth 5 is three away from depth 2: outside {0,-1,1}.
        assert!(cache.search(2, &b).is_none());
    }

    #[test]
    fn ring_buffer_evicts_head_past_width() {
        let mut rb: RingBuffer<u32> = RingBuffer::with_width(WIDTH);
        for i in 0..(WIDTH as u32 + 10) {
            rb.push(i);
        }
        let newest: Vec<u32> = rb.iter_newest_first().map(|(_, v)| *v).collect();
        assert_eq!(newest.len(), WIDTH);
        assert_eq!(newest[0], WIDTH as u32 + 9);
    }

    #[test]
    fn ring_buffer_honors_custom_width() {
        let mut rb: RingBuffer<u32> = RingBuffer::with_width(3);
        for i in 0..5u32 {
            rb.push(i);
        }
        let newest: Vec<u32> = rb.iter_newest_first().map(|(_, v)| *v).collect();
        assert_eq!(newest, vec![4, 3, 2]);
    }
}
