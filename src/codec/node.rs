//! Nested key/value blocks and their text form.
//!
//! ```text
//! MISSION
//! {
//! 	name = Mun Landing
//! 	STEPS
//! 	{
//! 	}
//! }
//! ```
//!
//! A block is a name line followed by `{`, any number of `key = value` lines and
//! nested blocks, and a closing `}`. Values and blocks keep their order.

const INDENT: char = '\t';

/// An ordered block of values and child blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigNode {
    pub name: String,
    values: Vec<(String, String)>,
    nodes: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_value(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.values.push((key.into(), value.to_string()));
        self
    }

    /// Replace the first value named `key`, or append it.
    pub fn set_value(&mut self, key: &str, value: impl ToString) -> &mut Self {
        match self.values.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.values.push((key.to_string(), value.to_string())),
        }
        self
    }

    pub fn add_node(&mut self, node: ConfigNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// First value named `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child block named `name`.
    pub fn node(&self, name: &str) -> Option<&ConfigNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Child blocks named `name`, in order.
    pub fn nodes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ConfigNode> + 'a {
        self.nodes.iter().filter(move |n| n.name == name)
    }

    /// Render this block (name line included) as text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_block(&mut out, 0);
        out
    }

    fn write_block(&self, out: &mut String, depth: usize) {
        push_indent(out, depth);
        out.push_str(&self.name);
        out.push('\n');
        push_indent(out, depth);
        out.push_str("{\n");
        for (key, value) in &self.values {
            push_indent(out, depth + 1);
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(&escape(value));
            out.push('\n');
        }
        for node in &self.nodes {
            node.write_block(out, depth + 1);
        }
        push_indent(out, depth);
        out.push_str("}\n");
    }

    /// Parse text into an unnamed container holding the top-level values and
    /// blocks. Parsing never fails: blank lines and `//` comments are skipped, a
    /// stray `}` is ignored and blocks left open at the end are closed.
    pub fn parse(text: &str) -> ConfigNode {
        let mut stack: Vec<ConfigNode> = vec![ConfigNode::default()];
        let mut pending_name: Option<String> = None;

        for raw in text.lines() {
            let line = raw.trim_start().strip_suffix('\r').unwrap_or(raw.trim_start());
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }
            if trimmed == "{" {
                stack.push(ConfigNode::new(pending_name.take().unwrap_or_default()));
                continue;
            }
            if trimmed == "}" {
                pending_name = None;
                if stack.len() > 1 {
                    if let Some(done) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.nodes.push(done);
                        }
                    }
                }
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    pending_name = None;
                    let value = value.strip_prefix(' ').unwrap_or(value);
                    if let Some(current) = stack.last_mut() {
                        current.values.push((key.trim().to_string(), unescape(value)));
                    }
                }
                None => pending_name = Some(trimmed.to_string()),
            }
        }

        while stack.len() > 1 {
            if let Some(done) = stack.pop() {
                if let Some(parent) = stack.last_mut() {
                    parent.nodes.push(done);
                }
            }
        }
        stack.pop().unwrap_or_default()
    }
}

fn push_indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat(INDENT).take(depth));
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
