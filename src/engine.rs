use std::collections::BTreeMap;

use log::{debug, info};
use serde::Serialize;

use crate::error::{LayoutError, Result};
use crate::layers::bars::{calculate_bar_sizes, ObservedRange};
use crate::layers::boundaries::{calculate_layer_boundaries, LayerBoundaries};
use crate::layers::normalize::{normalize_values, ParamMax};
use crate::layers::table::LeafValueTable;
use crate::layers::LayerSet;
use crate::scene::{SceneBuilder, SceneItem};
use crate::settings::Settings;
use crate::tree::layout::{TreeLayout, TreeLayoutType};
use crate::tree::{NodeId, Tree};

/// State of one layout request. Built fresh from the caller's inputs and
/// consumed by [`LayoutContext::run`]; nothing outlives the request.
#[derive(Debug, Clone)]
pub struct LayoutContext<'a> {
    tree: &'a Tree,
    settings: Settings,
    table: LeafValueTable,
    layers: LayerSet,
    collapsed: Vec<NodeId>,
}

impl<'a> LayoutContext<'a> {
    /// Resolve collapsed labels and visible layers. Fails before any value is
    /// touched when the configuration does not match the inputs.
    pub fn new(tree: &'a Tree, table: &LeafValueTable, settings: &Settings) -> Result<Self> {
        let collapsed = settings
            .collapsed_nodes
            .iter()
            .map(|label| {
                tree.find_by_label(label)
                    .ok_or_else(|| LayoutError::UnknownNode {
                        label: label.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let layers = LayerSet::resolve(settings, table)?;

        Ok(Self {
            tree,
            settings: settings.clone(),
            table: table.clone(),
            layers,
            collapsed,
        })
    }

    pub fn run(mut self) -> Result<LayoutModel> {
        for &node_id in &self.collapsed {
            let label = &self.tree.nodes[node_id].label;
            debug!("collapsing {label}");
            self.table.insert_synthetic(label);
        }

        let param_max = normalize_values(&mut self.table, &self.layers);
        let observed_ranges = calculate_bar_sizes(&mut self.table, &self.layers, &param_max);

        let layout = TreeLayout::compute(self.tree, &self.collapsed, &self.settings)?;

        let boundaries = calculate_layer_boundaries(
            &mut self.layers,
            &self.table,
            &self.settings,
            true,
            layout.smallest_leaf_size,
        );

        let scene = SceneBuilder::new(
            &layout,
            &self.layers,
            &self.table,
            &boundaries,
            &self.settings,
        )
        .build();

        info!(
            "laid out {} leaves and {} layers ({} scene primitives)",
            layout.leaf_count(),
            self.layers.len(),
            scene.len()
        );

        Ok(LayoutModel {
            layout_type: layout.layout_type,
            total_radius: boundaries.total_extent(),
            beginning_of_layers: boundaries.first_layer_start(),
            layout,
            boundaries,
            param_max,
            observed_ranges,
            layers: self.layers,
            table: self.table,
            scene,
        })
    }
}

/// Everything a renderer needs to draw one tree with its layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutModel {
    pub layout_type: TreeLayoutType,
    pub layout: TreeLayout,
    pub boundaries: LayerBoundaries,
    /// Outer end of the last layer.
    pub total_radius: f64,
    pub beginning_of_layers: f64,
    pub param_max: ParamMax,
    pub observed_ranges: BTreeMap<usize, ObservedRange>,
    pub layers: LayerSet,
    /// Pixel extents per leaf and layer.
    pub table: LeafValueTable,
    pub scene: Vec<SceneItem>,
}

/// Lay out `tree` with the layers described by `settings`. The inputs are
/// never modified; the whole layout either succeeds or fails.
pub fn compute_layout(
    tree: &Tree,
    table: &LeafValueTable,
    settings: &Settings,
) -> Result<LayoutModel> {
    LayoutContext::new(tree, table, settings)?.run()
}
