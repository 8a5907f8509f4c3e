use std::collections::HashSet;
use std::ops::ControlFlow;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::settings::Settings;

pub mod bars;
pub mod boundaries;
pub mod categorical;
pub mod normalize;
pub mod table;

use table::LeafValueTable;

/// Header of the column carrying parent groupings.
pub const PARENT_COLUMN: &str = "__parent__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Parent,
    StackBar,
    Categorical,
    Numerical,
}

impl LayerKind {
    /// Classify a data column from its header and first value.
    pub fn detect(header: &str, sample: Option<&str>) -> Self {
        if header == PARENT_COLUMN {
            LayerKind::Parent
        } else if header.contains(';') {
            LayerKind::StackBar
        } else if sample.is_some_and(|value| value.trim().parse::<f64>().is_ok()) {
            LayerKind::Numerical
        } else {
            LayerKind::Categorical
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    #[default]
    None,
    Sqrt,
    Log,
}

impl Normalization {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Normalization::None => value,
            Normalization::Sqrt => value.sqrt(),
            Normalization::Log => (value + 1.0).log10(),
        }
    }
}

/// How a layer is painted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerStyle {
    #[default]
    Bar,
    Intensity,
    Color,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBound {
    pub value: f64,
    pub disabled: bool,
}

impl Default for RangeBound {
    fn default() -> Self {
        Self {
            value: 0.0,
            disabled: true,
        }
    }
}

/// Per-view attributes of a layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewAttributes {
    pub normalization: Normalization,
    pub min: RangeBound,
    pub max: RangeBound,
}

impl ViewAttributes {
    /// The min/max pair is only honoured while the min bound is enabled.
    pub fn clamped_range(&self) -> Option<(f64, f64)> {
        (!self.min.disabled).then_some((self.min.value, self.max.value))
    }
}

/// Visual attributes of a layer, shared by all views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct VisualAttributes {
    pub height: f64,
    pub color: String,
    pub color_start: String,
    pub margin: f64,
    #[serde(rename = "type")]
    pub layer_type: LayerStyle,
}

impl Default for VisualAttributes {
    fn default() -> Self {
        Self {
            height: 0.0,
            color: "#000000".to_owned(),
            color_start: "#FFFFFF".to_owned(),
            margin: 15.0,
            layer_type: LayerStyle::Bar,
        }
    }
}

/// A view entry as written in a settings file. Keys stay optional until the
/// layer is resolved, so a missing one can be reported by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalization: Option<Normalization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<RangeBound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<RangeBound>,
}

impl ViewEntry {
    pub fn resolve(&self, layer: usize) -> Result<ViewAttributes> {
        Ok(ViewAttributes {
            normalization: self
                .normalization
                .ok_or_else(|| LayoutError::missing(layer, "normalization"))?,
            min: self.min.ok_or_else(|| LayoutError::missing(layer, "min"))?,
            max: self.max.ok_or_else(|| LayoutError::missing(layer, "max"))?,
        })
    }
}

impl From<ViewAttributes> for ViewEntry {
    fn from(view: ViewAttributes) -> Self {
        Self {
            normalization: Some(view.normalization),
            min: Some(view.min),
            max: Some(view.max),
        }
    }
}

/// A layer entry as written in a settings file. `height` and `type` are
/// required; `margin` only while custom layer margins are on. Colors fall
/// back to black on white.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VisualEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub layer_type: Option<LayerStyle>,
}

impl VisualEntry {
    pub fn resolve(&self, layer: usize, custom_margin: bool) -> Result<VisualAttributes> {
        let defaults = VisualAttributes::default();
        let margin = match self.margin {
            Some(margin) => margin,
            None if custom_margin => return Err(LayoutError::missing(layer, "margin")),
            None => defaults.margin,
        };
        Ok(VisualAttributes {
            height: self
                .height
                .ok_or_else(|| LayoutError::missing(layer, "height"))?,
            layer_type: self
                .layer_type
                .ok_or_else(|| LayoutError::missing(layer, "type"))?,
            margin,
            color: self.color.clone().unwrap_or(defaults.color),
            color_start: self.color_start.clone().unwrap_or(defaults.color_start),
        })
    }
}

impl From<VisualAttributes> for VisualEntry {
    fn from(visual: VisualAttributes) -> Self {
        Self {
            height: Some(visual.height),
            color: Some(visual.color),
            color_start: Some(visual.color_start),
            margin: Some(visual.margin),
            layer_type: Some(visual.layer_type),
        }
    }
}

/// One visible layer with its attributes resolved for the current view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerDescriptor {
    /// Position in the drawing order; 0 belongs to the tree.
    pub order: usize,
    /// Data column.
    pub index: usize,
    pub name: String,
    pub kind: LayerKind,
    pub visual: VisualAttributes,
    pub view: ViewAttributes,
}

impl LayerDescriptor {
    pub fn is_parent(&self) -> bool {
        self.kind == LayerKind::Parent
    }

    pub fn is_stackbar(&self) -> bool {
        self.kind == LayerKind::StackBar
    }

    pub fn is_categorical(&self) -> bool {
        self.kind == LayerKind::Categorical
    }

    pub fn is_numerical(&self) -> bool {
        self.kind == LayerKind::Numerical
    }

    /// Categorical layer drawn as per-leaf text.
    pub fn is_text(&self) -> bool {
        self.is_categorical() && self.visual.layer_type == LayerStyle::Text
    }

    /// Text layers with no height get one derived from their font.
    pub fn has_auto_height(&self) -> bool {
        self.is_text() && self.visual.height == 0.0
    }

    /// Categorical or parent layer painted as colored runs.
    pub fn draws_runs(&self) -> bool {
        self.is_parent() || (self.is_categorical() && self.visual.layer_type == LayerStyle::Color)
    }

    pub fn margin(&self, settings: &Settings) -> f64 {
        if settings.custom_layer_margin {
            self.visual.margin
        } else {
            settings.layer_margin
        }
    }
}

/// The visible layers of one layout request, in drawing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerSet {
    layers: Vec<LayerDescriptor>,
}

impl LayerSet {
    /// Resolve `settings.layer_order` against the configuration and the data
    /// columns. Duplicate entries are dropped.
    pub fn resolve(settings: &Settings, table: &LeafValueTable) -> Result<Self> {
        let view = settings.current_view();
        let mut seen = HashSet::new();
        let mut layers = Vec::with_capacity(settings.layer_order.len());

        for &index in &settings.layer_order {
            if !seen.insert(index) {
                warn!("layer {index} is listed more than once in the layer order; ignoring repeat");
                continue;
            }

            let kind = table
                .kind(index)
                .ok_or_else(|| LayoutError::missing(index, "data column"))?;
            let visual = settings
                .layers
                .get(&index)
                .ok_or_else(|| LayoutError::missing(index, "visual attributes"))?
                .resolve(index, settings.custom_layer_margin)?;

            // Only numeric layers read their view attributes.
            let view = match (kind, view.and_then(|entries| entries.get(&index))) {
                (LayerKind::Parent | LayerKind::Categorical, _) => ViewAttributes::default(),
                (_, Some(entry)) => entry.resolve(index)?,
                (_, None) => return Err(LayoutError::missing(index, "view attributes")),
            };

            layers.push(LayerDescriptor {
                order: layers.len() + 1,
                index,
                name: table.header(index).unwrap_or_default().to_owned(),
                kind,
                visual,
                view,
            });
        }

        Ok(Self { layers })
    }

    pub fn from_descriptors(layers: Vec<LayerDescriptor>) -> Self {
        Self { layers }
    }

    /// Call `visitor` for each layer in order until it breaks.
    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(&LayerDescriptor) -> ControlFlow<()>,
    {
        for layer in &self.layers {
            if visitor(layer).is_break() {
                break;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.layers.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut LayerDescriptor> {
        self.layers.iter_mut()
    }

    pub fn by_order(&self, order: usize) -> Option<&LayerDescriptor> {
        order
            .checked_sub(1)
            .and_then(|position| self.layers.get(position))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
