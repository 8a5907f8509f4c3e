use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::layers::table::LeafValueTable;
use crate::layers::{
    LayerKind, LayerStyle, ViewAttributes, ViewEntry, VisualAttributes, VisualEntry,
};
use crate::tree::layout::TreeLayoutType;

pub const DEFAULT_VIEW: &str = "default";

/// Drawing settings for one layout request, keyed the way the interactive
/// settings file spells them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub tree_type: TreeLayoutType,
    /// Degrees.
    pub angle_min: f64,
    /// Degrees.
    pub angle_max: f64,
    pub tree_width: f64,
    pub tree_height: f64,
    pub tree_radius: f64,
    pub viewer_width: f64,
    pub viewer_height: f64,
    pub top: f64,
    pub left: f64,
    pub layer_margin: f64,
    pub custom_layer_margin: bool,
    pub max_font_size: f64,
    pub max_font_size_label: f64,
    /// Opacity of bar layer backgrounds; text layers are always opaque.
    pub background_opacity: f64,
    pub root_length: f64,
    /// Overrides the computed longest root-to-node path, so several trees can
    /// share one scale.
    pub max_path_length: Option<f64>,
    pub layer_order: Vec<usize>,
    pub current_view: String,
    pub views: BTreeMap<String, BTreeMap<usize, ViewEntry>>,
    pub layers: BTreeMap<usize, VisualEntry>,
    pub collapsed_nodes: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tree_type: TreeLayoutType::Circlephylogram,
            angle_min: 0.0,
            angle_max: 270.0,
            tree_width: 0.0,
            tree_height: 0.0,
            tree_radius: 0.0,
            viewer_width: 1200.0,
            viewer_height: 900.0,
            top: 0.0,
            left: 0.0,
            layer_margin: 15.0,
            custom_layer_margin: false,
            max_font_size: 60.0,
            max_font_size_label: 60.0,
            background_opacity: 0.1,
            root_length: 0.1,
            max_path_length: None,
            layer_order: Vec::new(),
            current_view: DEFAULT_VIEW.to_owned(),
            views: BTreeMap::new(),
            layers: BTreeMap::new(),
            collapsed_nodes: Vec::new(),
        }
    }
}

impl Settings {
    /// Tree width, falling back to the viewer width when unset.
    pub fn width(&self) -> f64 {
        if self.tree_width == 0.0 {
            self.viewer_width
        } else {
            self.tree_width
        }
    }

    pub fn height(&self) -> f64 {
        if self.tree_height == 0.0 {
            self.viewer_height
        } else {
            self.tree_height
        }
    }

    /// Outer tree radius; defaults to the larger of width and height.
    pub fn radius(&self) -> f64 {
        if self.tree_radius == 0.0 {
            self.width().max(self.height())
        } else {
            self.tree_radius
        }
    }

    /// Angular span available to leaves, in radians.
    pub fn angular_span(&self) -> f64 {
        (self.angle_max - self.angle_min).to_radians()
    }

    /// All view entries of the active view.
    pub fn current_view(&self) -> Option<&BTreeMap<usize, ViewEntry>> {
        self.views.get(&self.current_view)
    }

    /// Make every data column visible and give it complete default attributes
    /// unless the settings already describe it. Leaves an explicit layer order
    /// alone.
    pub fn fill_defaults(&mut self, table: &LeafValueTable) {
        if self.layer_order.is_empty() {
            self.layer_order = (1..table.column_count()).collect();
        }

        let view_name = self.current_view.clone();
        let view = self.views.entry(view_name).or_default();

        for index in 1..table.column_count() {
            let kind = table.kind(index).unwrap_or(LayerKind::Categorical);
            self.layers.entry(index).or_insert_with(|| {
                debug!("using default visual attributes for layer {index} ({kind:?})");
                VisualAttributes::default_for(kind).into()
            });
            view.entry(index)
                .or_insert_with(|| ViewAttributes::default().into());
        }
    }
}

impl VisualAttributes {
    pub fn default_for(kind: LayerKind) -> Self {
        let (height, layer_type) = match kind {
            LayerKind::Numerical => (180.0, LayerStyle::Bar),
            LayerKind::StackBar => (180.0, LayerStyle::Bar),
            LayerKind::Categorical => (90.0, LayerStyle::Color),
            LayerKind::Parent => (50.0, LayerStyle::Color),
        };
        Self {
            height,
            layer_type,
            ..Self::default()
        }
    }
}
