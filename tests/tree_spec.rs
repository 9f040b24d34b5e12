use mission_checklist::models::*;
use speculate2::speculate;

fn step(title: &str) -> StepRecord {
    StepRecord::new(title, Criterion::Unconditional)
}

fn titles(tree: &StepTree, ids: &[NodeId]) -> Vec<String> {
    ids.iter()
        .map(|&id| tree.record(id).expect("Missing node").title.clone())
        .collect()
}

fn outline(tree: &StepTree) -> Vec<String> {
    tree.depth_first()
        .into_iter()
        .map(|id| {
            format!(
                "{} {}",
                tree.path_of(id).expect("Detached node"),
                tree.record(id).expect("Missing node").title
            )
        })
        .collect()
}

speculate! {
    before {
        // A
        // ├── A1
        // │   └── A1a
        // └── A2
        // B
        let mut tree = StepTree::new();
        let a = tree.add_root(step("A"));
        let a1 = tree.add_child(a, step("A1")).expect("Failed to add A1");
        let a1a = tree.add_child(a1, step("A1a")).expect("Failed to add A1a");
        let a2 = tree.add_child(a, step("A2")).expect("Failed to add A2");
        let b = tree.add_root(step("B"));
    }

    describe "building" {
        it "keeps roots and children in insertion order" {
            assert_eq!(titles(&tree, tree.roots()), vec!["A", "B"]);
            assert_eq!(titles(&tree, tree.children(a)), vec!["A1", "A2"]);
            assert_eq!(tree.len(), 5);
        }

        it "maintains parent handles" {
            assert_eq!(tree.parent(a1a), Some(a1));
            assert_eq!(tree.parent(a1), Some(a));
            assert_eq!(tree.parent(a), None);
            assert_eq!(tree.depth(a1a), 2);
        }

        it "inserts at an index and appends past the end" {
            let first = tree.insert(Some(a), 0, step("A0")).expect("Insert failed");
            tree.insert(None, 99, step("C")).expect("Insert failed");
            assert_eq!(tree.position(first), Some(0));
            assert_eq!(titles(&tree, tree.children(a)), vec!["A0", "A1", "A2"]);
            assert_eq!(titles(&tree, tree.roots()), vec!["A", "B", "C"]);
        }

        it "refuses a parent that is not in the tree" {
            let mut other = StepTree::new();
            let stranger = other.add_root(step("X"));
            assert!(tree.add_child(stranger, step("Y")).is_none());
            assert_eq!(tree.len(), 5);
        }

        it "hands out distinct ids across trees" {
            let mut other = StepTree::new();
            let x = other.add_root(step("X"));
            assert!(!tree.contains(x));
            assert_ne!(x, a);
            assert!(x.get() > b.get());
        }
    }

    describe "paths" {
        it "resolves dotted 1-based paths" {
            assert_eq!(tree.resolve_path("1"), Some(a));
            assert_eq!(tree.resolve_path("1.1.1"), Some(a1a));
            assert_eq!(tree.resolve_path(" 2 "), Some(b));
        }

        it "rejects paths that do not exist" {
            assert_eq!(tree.resolve_path("0"), None);
            assert_eq!(tree.resolve_path("3"), None);
            assert_eq!(tree.resolve_path("1.3"), None);
            assert_eq!(tree.resolve_path("1.x"), None);
            assert_eq!(tree.resolve_path(""), None);
        }

        it "computes the path of a node" {
            assert_eq!(tree.path_of(a2), Some("1.2".to_string()));
            assert_eq!(tree.path_of(a1a), Some("1.1.1".to_string()));
        }

        it "lists nodes in document order" {
            assert_eq!(
                outline(&tree),
                vec!["1 A", "1.1 A1", "1.1.1 A1a", "1.2 A2", "2 B"]
            );
        }
    }

    describe "remove" {
        it "removes the whole subtree" {
            let removed = tree.remove(a1).expect("Remove failed");
            assert_eq!(removed.title, "A1");
            assert!(!tree.contains(a1));
            assert!(!tree.contains(a1a));
            assert_eq!(titles(&tree, tree.children(a)), vec!["A2"]);
            assert_eq!(tree.len(), 3);
        }

        it "returns None for a missing node" {
            tree.remove(a1).expect("Remove failed");
            assert!(tree.remove(a1).is_none());
        }
    }

    describe "move_node" {
        it "re-parents a subtree" {
            assert!(tree.move_node(a1, Some(b), 0));
            assert_eq!(tree.parent(a1), Some(b));
            assert_eq!(tree.parent(a1a), Some(a1));
            assert_eq!(titles(&tree, tree.children(a)), vec!["A2"]);
            assert_eq!(titles(&tree, tree.children(b)), vec!["A1"]);
        }

        it "moves a node to the roots" {
            assert!(tree.move_node(a1a, None, 1));
            assert_eq!(titles(&tree, tree.roots()), vec!["A", "A1a", "B"]);
            assert_eq!(tree.parent(a1a), None);
            assert!(tree.children(a1).is_empty());
        }

        it "counts the index after taking the node out" {
            let a3 = tree.add_child(a, step("A3")).expect("Failed to add A3");
            assert!(tree.move_node(a1, Some(a), 1));
            assert_eq!(titles(&tree, tree.children(a)), vec!["A2", "A1", "A3"]);
            assert_eq!(tree.position(a3), Some(2));
        }

        it "refuses to move a node into its own subtree" {
            let before = outline(&tree);
            assert!(!tree.move_node(a, Some(a1a), 0));
            assert!(!tree.move_node(a1, Some(a1), 0));
            assert_eq!(outline(&tree), before);
            assert_eq!(tree.parent(a1), Some(a));
        }
    }

    describe "shift" {
        it "swaps with the previous sibling" {
            assert!(tree.shift_up(a2));
            assert_eq!(titles(&tree, tree.children(a)), vec!["A2", "A1"]);
        }

        it "swaps roots" {
            assert!(tree.shift_down(a));
            assert_eq!(titles(&tree, tree.roots()), vec!["B", "A"]);
        }

        it "does nothing at the ends" {
            assert!(!tree.shift_up(a1));
            assert!(!tree.shift_down(a2));
            assert!(!tree.shift_up(a1a));
            assert_eq!(titles(&tree, tree.children(a)), vec!["A1", "A2"]);
        }
    }

    describe "promote and demote" {
        it "promotes a node to just after its parent" {
            assert!(tree.promote(a1a));
            assert_eq!(titles(&tree, tree.children(a)), vec!["A1", "A1a", "A2"]);
            assert!(tree.children(a1).is_empty());
        }

        it "promotes a child of a root to the roots" {
            assert!(tree.promote(a1));
            assert_eq!(titles(&tree, tree.roots()), vec!["A", "A1", "B"]);
            assert_eq!(tree.parent(a1a), Some(a1));
        }

        it "refuses to promote a root" {
            assert!(!tree.promote(a));
        }

        it "demotes a node into its previous sibling" {
            assert!(tree.demote(a2));
            assert_eq!(titles(&tree, tree.children(a1)), vec!["A1a", "A2"]);
            assert_eq!(tree.parent(a2), Some(a1));
        }

        it "refuses to demote a first child" {
            assert!(!tree.demote(a1));
            assert!(!tree.demote(a));
        }

        it "undoes a demote with a promote" {
            let before = outline(&tree);
            assert!(tree.demote(b));
            assert!(tree.promote(b));
            assert_eq!(outline(&tree), before);
        }
    }

    describe "duplicate" {
        it "deep-copies right after the original" {
            tree.record_mut(a1a).expect("Missing node").completed = true;
            tree.get_mut(a1).expect("Missing node").mode = AggregationMode::RequireAny;

            let copy = tree.duplicate(a1).expect("Duplicate failed");
            assert_eq!(tree.position(copy), Some(1));
            assert_eq!(titles(&tree, tree.children(a)), vec!["A1", "A1", "A2"]);
            assert_eq!(tree.get(copy).expect("Missing copy").mode, AggregationMode::RequireAny);

            let copied_child = tree.children(copy)[0];
            assert_ne!(copied_child, a1a);
            assert_eq!(tree.record(copied_child).expect("Missing node").title, "A1a");
            assert!(!tree.record(copied_child).expect("Missing node").completed);
            assert!(tree.record(a1a).expect("Missing node").completed);
        }

        it "leaves the original untouched by edits to the copy" {
            let copy = tree.duplicate(a2).expect("Duplicate failed");
            tree.record_mut(copy).expect("Missing copy").title = "Changed".to_string();
            assert_eq!(tree.record(a2).expect("Missing node").title, "A2");
        }
    }

    describe "reset_completion" {
        it "clears a subtree or the whole tree" {
            for id in tree.depth_first() {
                tree.record_mut(id).expect("Missing node").completed = true;
            }
            assert_eq!(tree.reset_completion(Some(a1)), 2);
            assert!(tree.record(a).expect("Missing node").completed);
            assert_eq!(tree.reset_completion(None), 3);
            assert_eq!(tree.reset_completion(None), 0);
        }
    }

    describe "structural equality" {
        it "ignores ids" {
            let mut other = StepTree::new();
            let oa = other.add_root(step("A"));
            let oa1 = other.add_child(oa, step("A1")).expect("Failed to add");
            other.add_child(oa1, step("A1a")).expect("Failed to add");
            other.add_child(oa, step("A2")).expect("Failed to add");
            other.add_root(step("B"));
            assert!(tree.structurally_eq(&other));

            other.get_mut(oa).expect("Missing node").expanded = false;
            assert!(!tree.structurally_eq(&other));
        }
    }
}
