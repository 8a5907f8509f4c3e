use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use super::table::LeafValueTable;
use super::LayerSet;
use crate::settings::Settings;
use crate::tree::layout::TreeLayoutType;

/// Width of one monospace glyph relative to its font size.
pub const MONOSPACE_FONT_ASPECT_RATIO: f64 = 0.6;

/// Extents of the tree body and of every visible layer along the layer axis
/// (radius or x), indexed by layer order. Entry 0 is the tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerBoundaries {
    pub boundaries: Vec<[f64; 2]>,
    /// Font size of auto-sized text layers, by layer order.
    pub fonts: BTreeMap<usize, f64>,
    /// Height every layer was laid out with, by layer order.
    pub heights: BTreeMap<usize, f64>,
}

impl LayerBoundaries {
    pub fn get(&self, order: usize) -> Option<[f64; 2]> {
        self.boundaries.get(order).copied()
    }

    /// Outer edge of the tree body.
    pub fn tree_end(&self) -> f64 {
        self.boundaries.first().map_or(0.0, |tree| tree[1])
    }

    /// Start of the first layer, or the tree's edge when there are none.
    pub fn first_layer_start(&self) -> f64 {
        self.boundaries
            .get(1)
            .map_or_else(|| self.tree_end(), |layer| layer[0])
    }

    /// Outer end of the last layer.
    pub fn total_extent(&self) -> f64 {
        self.boundaries.last().map_or(0.0, |last| last[1])
    }
}

/// Stack the visible layers outward from the tree. Text layers without a
/// height get one derived from their font, and the derived height is written
/// back into the layer.
pub fn calculate_layer_boundaries(
    layers: &mut LayerSet,
    table: &LeafValueTable,
    settings: &Settings,
    has_tree: bool,
    smallest_leaf_size: f64,
) -> LayerBoundaries {
    let seed = match settings.tree_type {
        TreeLayoutType::Phylogram if has_tree => [0.0, settings.width()],
        TreeLayoutType::Phylogram => [0.0, 0.0],
        TreeLayoutType::Circlephylogram => [0.0, settings.radius()],
    };

    let mut result = LayerBoundaries {
        boundaries: vec![seed],
        ..LayerBoundaries::default()
    };

    for layer in layers.iter_mut() {
        let margin = layer.margin(settings);
        let previous_end = result.total_extent();

        if layer.has_auto_height() {
            let leaf_perimeter = match settings.tree_type {
                TreeLayoutType::Circlephylogram => smallest_leaf_size * (previous_end + margin),
                TreeLayoutType::Phylogram => smallest_leaf_size,
            };
            let font = leaf_perimeter.min(settings.max_font_size);
            let longest = table.longest_token_len(layer.index) + 2;
            let height = (longest as f64 * MONOSPACE_FONT_ASPECT_RATIO * font).ceil() + 1.0;

            debug!(
                "text layer {} sized to {height}px with a {font:.2}px font",
                layer.index
            );
            result.fonts.insert(layer.order, font);
            layer.visual.height = height;
        }

        let start = previous_end + margin;
        let end = start + layer.visual.height;
        result.boundaries.push([start, end]);
        result.heights.insert(layer.order, layer.visual.height);
    }

    result
}
