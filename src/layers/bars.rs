use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use super::normalize::ParamMax;
use super::table::{LayerValue, LeafValueTable};
use super::{LayerDescriptor, LayerKind, LayerSet};

/// Range of normalized values seen while auto-scaling a layer. Reported to
/// pre-populate editable min/max fields; never used for scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObservedRange {
    pub min: f64,
    pub max: f64,
}

impl ObservedRange {
    fn observe(range: &mut Option<Self>, value: f64) {
        if value.is_nan() {
            return;
        }
        match range {
            Some(range) => {
                range.min = range.min.min(value);
                range.max = range.max.max(value);
            }
            None => {
                *range = Some(Self {
                    min: value,
                    max: value,
                })
            }
        }
    }
}

/// Turn normalized values into pixel extents bounded by each layer's height,
/// overwriting the table in place.
pub fn calculate_bar_sizes(
    table: &mut LeafValueTable,
    layers: &LayerSet,
    param_max: &ParamMax,
) -> BTreeMap<usize, ObservedRange> {
    let mut observed = BTreeMap::new();

    for layer in layers.iter() {
        match layer.kind {
            LayerKind::Parent | LayerKind::Categorical => {}
            LayerKind::StackBar => scale_stack_bars(table, layer),
            LayerKind::Numerical => {
                if let Some(range) = scale_numerical(table, layer, param_max) {
                    observed.insert(layer.index, range);
                }
            }
        }
    }

    observed
}

fn scale_stack_bars(table: &mut LeafValueTable, layer: &LayerDescriptor) {
    let height = layer.visual.height;
    for row in table.rows_mut() {
        if let Some(LayerValue::Segments(segments)) = row.values.get_mut(layer.index) {
            scale_segments(segments, height);
        }
    }
}

/// Scale segments so they sum to `height`. Non-finite segments count as 0.
pub fn scale_segments(segments: &mut [f64], height: f64) {
    let total: f64 = segments.iter().filter(|value| value.is_finite()).sum();
    let multiplier = height / total;

    if total == 0.0 || !multiplier.is_finite() {
        segments.iter_mut().for_each(|segment| *segment = 0.0);
        return;
    }

    for segment in segments.iter_mut() {
        *segment = if segment.is_finite() {
            *segment * multiplier
        } else {
            0.0
        };
    }
}

fn scale_numerical(
    table: &mut LeafValueTable,
    layer: &LayerDescriptor,
    param_max: &ParamMax,
) -> Option<ObservedRange> {
    let height = layer.visual.height;

    if let Some((min, max)) = layer.view.clamped_range() {
        if max <= min {
            debug!(
                "layer {} has an empty min/max range; bars collapse to 0",
                layer.index
            );
        }
        for row in table.rows_mut() {
            if let Some(LayerValue::Scalar(value)) = row.values.get_mut(layer.index) {
                *value = clamped_extent(*value, min, max, height);
            }
        }
        return None;
    }

    let layer_max = param_max.get(&layer.index).copied().unwrap_or(0.0);
    let mut range = None;
    for row in table.rows_mut() {
        if let Some(LayerValue::Scalar(value)) = row.values.get_mut(layer.index) {
            ObservedRange::observe(&mut range, *value);
            *value = auto_extent(*value, layer_max, height);
        }
    }
    range
}

/// Extent of a value clamped into `[min, max]`.
pub fn clamped_extent(value: f64, min: f64, max: f64, height: f64) -> f64 {
    let range = max - min;
    if range <= 0.0 {
        return 0.0;
    }

    let bar_size = if value > max {
        range
    } else if value < min {
        0.0
    } else {
        value - min
    };

    finite_or_zero(bar_size * height / range)
}

/// Extent of a value relative to the layer's largest value.
pub fn auto_extent(value: f64, layer_max: f64, height: f64) -> f64 {
    if value == 0.0 || layer_max == 0.0 {
        return 0.0;
    }
    finite_or_zero(value * height / layer_max)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
