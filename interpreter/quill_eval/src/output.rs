//! Rendered output tree.

use std::fmt;

/// One rendered node. Control tags never appear here; opaque pass-through
/// tags re-emit as `Element` with their attribute expressions already
/// evaluated.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputNode {
    Text(String),
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<OutputNode>,
    },
}

impl OutputNode {
    fn render(&self, out: &mut String) {
        match self {
            OutputNode::Text(text) => out.push_str(text),
            OutputNode::Element {
                name,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
                if children.is_empty() {
                    out.push_str(" />");
                } else {
                    out.push('>');
                    for child in children {
                        child.render(out);
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }
}

impl fmt::Display for OutputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out);
        f.write_str(&out)
    }
}

/// Accumulates output during execution, coalescing adjacent text runs.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    nodes: Vec<OutputNode>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        OutputBuffer::default()
    }

    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(OutputNode::Text(run)) = self.nodes.last_mut() {
            run.push_str(text);
        } else {
            self.nodes.push(OutputNode::Text(text.to_string()));
        }
    }

    pub fn push_element(
        &mut self,
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<OutputNode>,
    ) {
        self.nodes.push(OutputNode::Element {
            name,
            attrs,
            children,
        });
    }

    /// Swap in an empty buffer, returning the accumulated nodes. Used to
    /// capture the children of a pass-through element.
    pub fn take(&mut self) -> Vec<OutputNode> {
        std::mem::take(&mut self.nodes)
    }

    pub fn restore(&mut self, nodes: Vec<OutputNode>) {
        self.nodes = nodes;
    }

    pub fn into_nodes(self) -> Vec<OutputNode> {
        self.nodes
    }
}

/// Flatten a node list to one string.
pub fn render_to_string(nodes: &[OutputNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.render(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn adjacent_text_coalesces() {
        let mut buf = OutputBuffer::new();
        buf.push_text("a");
        buf.push_text("b");
        buf.push_text("");
        let nodes = buf.into_nodes();
        assert_eq!(nodes, vec![OutputNode::Text("ab".to_string())]);
    }

    #[test]
    fn element_renders_with_attrs() {
        let node = OutputNode::Element {
            name: "div".to_string(),
            attrs: vec![("class".to_string(), "row".to_string())],
            children: vec![OutputNode::Text("hi".to_string())],
        };
        assert_eq!(node.to_string(), "<div class=\"row\">hi</div>");
    }
}
