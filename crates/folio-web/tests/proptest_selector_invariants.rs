//! Property-based invariant tests for selector matching and the memory
//! document.
//!
//! 1. Parsing arbitrary input never panics.
//! 2. `.c` matches exactly the elements whose class list contains `c`.
//! 3. `X:not(Y)` is `X` minus `Y`.
//! 4. Query results are in document order, without duplicates.
//! 5. Class edits through the document keep `has_class` consistent.

use folio_core::geometry::Viewport;
use folio_web::selector::Selector;
use folio_web::{Document, MemoryDocument, NodeId};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

const CLASSES: [&str; 4] = ["reveal", "active", "lazy", "hero"];

/// `(parent index, class mask)` per node; parents always precede children.
fn tree_strategy() -> impl Strategy<Value = Vec<(usize, u8)>> {
    prop::collection::vec((any::<usize>(), 0u8..16), 1..40)
}

fn build(shape: &[(usize, u8)]) -> (MemoryDocument, Vec<(NodeId, u8)>) {
    let mut doc = MemoryDocument::new(Viewport::new(0.0, 800.0, 600.0));
    let mut nodes: Vec<(NodeId, u8)> = Vec::new();
    for &(parent, mask) in shape {
        let parent = if nodes.is_empty() {
            doc.body()
        } else {
            nodes[parent % nodes.len()].0
        };
        let class: Vec<&str> = CLASSES
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, c)| *c)
            .collect();
        let node = doc.insert(parent, "div", &[("class", &class.join(" "))]);
        nodes.push((node, mask));
    }
    (doc, nodes)
}

proptest! {
    #[test]
    fn parse_never_panics(input in ".{0,40}") {
        let _ = Selector::parse(&input);
    }

    #[test]
    fn class_selector_matches_class_list(shape in tree_strategy(), which in 0usize..4) {
        let (doc, nodes) = build(&shape);
        let found = doc.query_selector_all(&format!(".{}", CLASSES[which]));
        for (node, mask) in nodes {
            prop_assert_eq!(found.contains(&node), mask & (1 << which) != 0);
        }
    }

    #[test]
    fn negation_is_set_difference(shape in tree_strategy(), a in 0usize..4, b in 0usize..4) {
        let (doc, _) = build(&shape);
        let with_a = doc.query_selector_all(&format!("div.{}", CLASSES[a]));
        let with_b = doc.query_selector_all(&format!(".{}", CLASSES[b]));
        let expected: Vec<NodeId> = with_a.into_iter().filter(|n| !with_b.contains(n)).collect();
        let got = doc.query_selector_all(&format!("div.{}:not(.{})", CLASSES[a], CLASSES[b]));
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn queries_are_ordered_and_unique(shape in tree_strategy()) {
        let (doc, _) = build(&shape);
        let all = doc.query_selector_all("div");
        let mut deduped = all.clone();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), all.len());
        let descendants = doc.query_selector_all("div div");
        prop_assert!(descendants.iter().all(|n| all.contains(n)));
        // Nested matches keep the relative order of the full list.
        let positions: Vec<usize> = descendants
            .iter()
            .filter_map(|n| all.iter().position(|m| m == n))
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn class_edits_are_consistent(
        shape in tree_strategy(),
        ops in prop::collection::vec((any::<usize>(), 0usize..4, any::<bool>()), 0..30),
    ) {
        let (mut doc, nodes) = build(&shape);
        for (pick, class, on) in ops {
            let node = nodes[pick % nodes.len()].0;
            doc.toggle_class(node, CLASSES[class], on);
            prop_assert_eq!(doc.has_class(node, CLASSES[class]), on);
        }
    }
}
