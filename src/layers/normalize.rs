use std::collections::BTreeMap;

use super::table::{LayerValue, LeafValueTable};
use super::{LayerKind, LayerSet};

/// Largest normalized value per numerical layer, keyed by column index.
pub type ParamMax = BTreeMap<usize, f64>;

/// Apply each numeric layer's normalization in place and record the largest
/// normalized value of every numerical layer.
///
/// NaN cells are left as they are; they only count as 0 for the maximum.
pub fn normalize_values(table: &mut LeafValueTable, layers: &LayerSet) -> ParamMax {
    let mut param_max = ParamMax::new();

    for row in table.rows_mut() {
        for layer in layers.iter() {
            let Some(value) = row.values.get_mut(layer.index) else {
                continue;
            };
            let normalization = layer.view.normalization;

            match (layer.kind, value) {
                (LayerKind::Categorical | LayerKind::Parent, _) => {}
                (LayerKind::StackBar, LayerValue::Segments(segments)) => {
                    for segment in segments.iter_mut() {
                        *segment = normalization.apply(*segment);
                    }
                }
                (LayerKind::Numerical, LayerValue::Scalar(scalar)) => {
                    *scalar = normalization.apply(*scalar);

                    let candidate = if scalar.is_nan() { 0.0 } else { *scalar };
                    param_max
                        .entry(layer.index)
                        .and_modify(|max| *max = max.max(candidate))
                        .or_insert(candidate);
                }
                _ => {}
            }
        }
    }

    param_max
}
