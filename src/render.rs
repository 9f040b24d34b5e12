//! ASCII tree rendering for checklists.

use crate::models::{AggregationMode, NodeId, StepNode, StepTree};

const COMPLETE: char = '●';
const PENDING: char = '○';
const INACTIVE: char = '◌';

/// Extra text for one node, appended after its title.
pub type Annotator<'a> = &'a dyn Fn(NodeId) -> Option<String>;

#[derive(Clone, Copy, Default)]
pub struct RenderOptions<'a> {
    /// Prefix each title with its dotted path (`2.1`).
    pub show_paths: bool,
    /// Render children of collapsed nodes too.
    pub show_all: bool,
    pub annotate: Option<Annotator<'a>>,
}

/// Get the status symbol for a step.
fn status_symbol(node: &StepNode) -> char {
    if node.record.completed {
        COMPLETE
    } else if !node.record.active {
        INACTIVE
    } else {
        PENDING
    }
}

/// Render a step tree as ASCII art with status symbols.
///
/// Example output:
/// ```text
/// ○ Reach orbit
/// ├── ● Batteries charged
/// └── ○ Circularize (any) [locked]
///     ├── ◌ Low orbit
///     └── ○ High orbit
/// ● Plant a flag [+2]
/// ```
pub fn render_tree(tree: &StepTree, options: &RenderOptions<'_>) -> String {
    let mut renderer = Renderer {
        tree,
        options,
        output: String::new(),
    };
    let roots = tree.roots();
    for (i, &root) in roots.iter().enumerate() {
        let is_last = i == roots.len() - 1;
        renderer.render_node(root, "", is_last, true);
    }
    renderer.output
}

struct Renderer<'t, 'o> {
    tree: &'t StepTree,
    options: &'o RenderOptions<'o>,
    output: String,
}

impl Renderer<'_, '_> {
    /// Recursively render a node and its visible children.
    fn render_node(&mut self, id: NodeId, prefix: &str, is_last: bool, is_root: bool) {
        let tree = self.tree;
        let Some(node) = tree.get(id) else {
            return;
        };

        if !is_root {
            let branch = if is_last { "└── " } else { "├── " };
            self.output.push_str(prefix);
            self.output.push_str(branch);
        }
        self.output.push(status_symbol(node));
        self.output.push(' ');
        self.push_label(node);
        self.output.push('\n');

        if !self.children_visible(node) {
            return;
        }

        // Roots carry no branch, so their children start at the margin
        let child_prefix = if is_root {
            String::new()
        } else {
            let continuation = if is_last { "    " } else { "│   " };
            format!("{}{}", prefix, continuation)
        };

        let children = node.children();
        for (i, &child) in children.iter().enumerate() {
            let child_is_last = i == children.len() - 1;
            self.render_node(child, &child_prefix, child_is_last, false);
        }
    }

    fn push_label(&mut self, node: &StepNode) {
        if self.options.show_paths {
            if let Some(path) = self.tree.path_of(node.id()) {
                self.output.push_str(&path);
                self.output.push(' ');
            }
        }
        self.output.push_str(&node.record.title);
        if node.mode == AggregationMode::RequireAny && !node.children().is_empty() {
            self.output.push_str(" (any)");
        }
        if node.record.locked {
            self.output.push_str(" [locked]");
        }
        if !self.children_visible(node) {
            let hidden = self.tree.subtree(node.id()).len() - 1;
            self.output.push_str(&format!(" [+{}]", hidden));
        }
        if let Some(note) = self.options.annotate.and_then(|annotate| annotate(node.id())) {
            self.output.push_str("  ");
            self.output.push_str(&note);
        }
    }

    fn children_visible(&self, node: &StepNode) -> bool {
        node.children().is_empty() || node.expanded || self.options.show_all
    }
}
