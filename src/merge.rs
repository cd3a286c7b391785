//! Data merging strategies and the cascade steps that use them.
//!
//! Data flows global → layout chain → template; at every step the later
//! contributor wins key conflicts. The strategy (deep or shallow) is
//! picked once per site and threaded through as a [`MergeFn`].

use crate::chain::{ChainEnd, walk_chain_id_merge};
use crate::load::{Layout, Template};
use crate::logger::Warnings;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A merge strategy: combines `source` over `target`, source wins.
pub type MergeFn = Arc<dyn Fn(Value, Value) -> Value + Send + Sync>;

/// Merge `source` over `target`, replacing top-level keys wholesale.
///
/// When either side is not an object, `source` replaces `target`.
pub fn shallow_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                target_map.insert(key, value);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Merge `source` over `target`, recursing into object values.
///
/// Keys keep the order they first appeared in `target`; keys new in
/// `source` append in their own order. Non-object values (arrays
/// included) are replaced, not combined.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(&key) {
                    Some(slot) => {
                        let existing = std::mem::take(slot);
                        *slot = deep_merge(existing, source_value);
                    }
                    None => {
                        target_map.insert(key, source_value);
                    }
                }
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Fold all global data files into one object, later files winning.
pub(crate) fn merge_globals(
    globals: &[crate::load::GlobalFile],
    merge: &dyn Fn(Value, Value) -> Value,
) -> Value {
    globals
        .iter()
        .filter_map(|g| g.data.clone())
        .fold(Value::Object(Map::new()), |acc, data| merge(acc, data))
}

/// Memoize each layout's chain-merged data.
///
/// For every layout, resolves its chain and stores global data merged
/// with the chain's cascade (root-to-leaf, this layout last). Broken
/// chains degrade to whatever was reachable and emit a warning.
pub(crate) fn merge_layout_chains(
    layouts: &mut [Layout<'_>],
    global: &Value,
    merge: &dyn Fn(Value, Value) -> Value,
    warnings: &Warnings,
) {
    let resolved: Vec<(Option<Value>, ChainEnd)> = {
        let view: &[Layout<'_>] = layouts;
        view.iter()
            .map(|layout| {
                walk_chain_id_merge(
                    layout,
                    view,
                    |l| l.layout_path.as_deref(),
                    |l| Some(l.id.as_str()),
                    |l| l.data.as_ref(),
                    merge,
                )
            })
            .collect()
    };

    for (layout, (chain_data, end)) in layouts.iter_mut().zip(resolved) {
        match end {
            ChainEnd::Root => {}
            ChainEnd::MissingLink(link) => warnings.emit(&format!(
                "layout `{}` chain links to `{link}`, which does not exist; using partial chain",
                layout.id
            )),
            ChainEnd::Cycle(link) => warnings.emit(&format!(
                "layout `{}` chain cycles back to `{link}`; using partial chain",
                layout.id
            )),
        }
        layout.data_merged = Some(match chain_data {
            Some(data) => merge(global.clone(), data),
            None => global.clone(),
        });
    }
}

/// Compute the data a template renders with.
///
/// Base is the named layout's memoized chain data, or global data when
/// the template names no layout. A layout name that resolves to nothing
/// also falls back to global data; the warning message is returned so
/// the caller can emit it once.
pub(crate) fn merge_template_data(
    template: &Template<'_>,
    layouts: &[Layout<'_>],
    global: &Value,
    merge: &dyn Fn(Value, Value) -> Value,
) -> (Value, Option<String>) {
    let (base, warning) = match template.layout_path.as_deref() {
        None => (global.clone(), None),
        Some(link) => match layouts.iter().find(|l| l.id == link) {
            Some(layout) => (
                layout
                    .data_merged
                    .clone()
                    .unwrap_or_else(|| global.clone()),
                None,
            ),
            None => (
                global.clone(),
                Some(format!(
                    "template `{}` names layout `{link}`, which does not exist; using global data",
                    template.file.source_path_rel()
                )),
            ),
        },
    };
    let merged = match template.data.clone() {
        Some(data) => merge(base, data),
        None => base,
    };
    (merged, warning)
}
