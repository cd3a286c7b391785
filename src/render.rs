//! Leaf-to-root rendering through a template's layout chain.

use crate::chain::{ChainEnd, walk_chain_id_call};
use crate::load::{Layout, Template};
use crate::module::RenderFn;
use anyhow::{Context, Result};
use serde_json::Value;

/// A render step on the chain: the template itself or one of the
/// layouts it inherits from.
struct RenderNode<'a> {
    label: &'a str,
    id: Option<&'a str>,
    link: Option<&'a str>,
    render: Option<&'a RenderFn>,
}

/// Render `template` through its layout chain.
///
/// The template renders first with an empty previous result; each layout
/// up the chain then wraps the output below it. Every step sees the same
/// merged data. A node without a render export passes the previous
/// result through unchanged. Broken chains render what was reachable;
/// the returned [`ChainEnd`] says how the chain ended.
pub(crate) fn render_template(
    template: &Template<'_>,
    layouts: &[Layout<'_>],
    data: &Value,
) -> Result<(String, ChainEnd)> {
    let template_label = template.file.source_path_rel();
    let mut nodes = Vec::with_capacity(layouts.len() + 1);
    nodes.push(RenderNode {
        label: &template_label,
        id: None,
        link: template.layout_path.as_deref(),
        render: template.render,
    });
    for layout in layouts {
        nodes.push(RenderNode {
            label: &layout.id,
            id: Some(&layout.id),
            link: layout.layout_path.as_deref(),
            render: layout.render,
        });
    }

    walk_chain_id_call(
        &nodes[0],
        &nodes,
        |node| node.link,
        |node| node.id,
        |node, previous: Option<String>| {
            let previous = previous.unwrap_or_default();
            match node.render {
                None => Ok(previous),
                Some(render) => render(data, &previous)
                    .with_context(|| format!("render of `{}` failed", node.label)),
            }
        },
    )
}
