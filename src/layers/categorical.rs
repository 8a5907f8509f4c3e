use serde::Serialize;

use super::table::{LeafValueTable, EMPTY_TOKEN};
use super::LayerDescriptor;

/// Consecutive leaves sharing one token, drawn as a single sector or band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRun {
    /// Leaf order of the first leaf in the run.
    pub start: usize,
    /// Leaf order of the last leaf in the run, inclusive.
    pub end: usize,
    pub token: String,
    /// Alternating grey shade for parent layers: 0 and 1 alternate, 2 marks
    /// an odd final run so it never matches its neighbour. Always 0 for
    /// categorical layers.
    pub shade: u8,
}

/// Group the leaves of `layer` into runs of equal tokens. `leaf_labels` is
/// the visible leaf order.
///
/// Parent layers skip leaves without a parent; categorical layers report an
/// empty cell as the `None` category.
pub fn category_runs<S: AsRef<str>>(
    layer: &LayerDescriptor,
    table: &LeafValueTable,
    leaf_labels: &[S],
) -> Vec<CategoryRun> {
    let tokens: Vec<Option<&str>> = leaf_labels
        .iter()
        .map(|label| {
            table
                .value(label.as_ref(), layer.index)
                .and_then(|value| value.as_token())
        })
        .collect();

    let mut groups: Vec<(usize, usize, Option<&str>)> = Vec::new();
    for (order, &token) in tokens.iter().enumerate() {
        match groups.last_mut() {
            Some((_, end, current)) if *current == token => *end = order,
            _ => groups.push((order, order, token)),
        }
    }

    let mut runs: Vec<CategoryRun> = groups
        .into_iter()
        .filter_map(|(start, end, token)| {
            let token = if layer.is_parent() {
                token.filter(|token| !token.is_empty())?.to_owned()
            } else {
                match token {
                    None | Some("") | Some("null") => EMPTY_TOKEN.to_owned(),
                    Some(token) => token.to_owned(),
                }
            };
            Some(CategoryRun {
                start,
                end,
                token,
                shade: 0,
            })
        })
        .collect();

    if layer.is_parent() {
        let last = runs.len().saturating_sub(1);
        for (position, run) in runs.iter_mut().enumerate() {
            run.shade = match (position % 2 == 1, position == last) {
                (true, true) => 2,
                (true, false) => 1,
                (false, _) => 0,
            };
        }
    }

    runs
}
