use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::Serialize;

use crate::layers::boundaries::{LayerBoundaries, MONOSPACE_FONT_ASPECT_RATIO};
use crate::layers::categorical::category_runs;
use crate::layers::table::{LayerValue, LeafValueTable};
use crate::layers::{LayerDescriptor, LayerSet, LayerStyle};
use crate::settings::Settings;
use crate::tree::layout::{NodePlacement, NodeState, Point, TreeLayout, TreeLayoutType};
use crate::tree::NodeId;

const PARENT_SHADES: [&str; 3] = ["#666666", "#888888", "#AAAAAA"];

/// Group a primitive is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SceneBin {
    Tree,
    GuideLines,
    LayerBackground { order: usize },
    Layer { order: usize },
    LayerLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Fill {
    Color { color: String },
    /// Blend `fraction` of the way from `from` to `to`.
    Gradient {
        from: String,
        to: String,
        fraction: f64,
    },
    /// Color picked by the renderer's palette for this category.
    Category { token: String },
    /// Color picked by the renderer's palette for this stack segment.
    StackSegment { segment: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ScenePrimitive {
    Line {
        from: Point,
        to: Point,
    },
    /// Circle arc around the origin.
    Arc {
        from: Point,
        to: Point,
        radius: f64,
        large_arc: bool,
    },
    Triangle {
        points: [Point; 3],
    },
    /// Ring sector around the origin; angles in radians.
    Sector {
        start_angle: f64,
        end_angle: f64,
        inner_radius: f64,
        outer_radius: f64,
        large_arc: bool,
        fill: Fill,
        opacity: f64,
    },
    /// Axis-aligned band: `start`/`extent` along the layer axis, `center`/`span`
    /// along the leaf axis.
    Band {
        start: f64,
        extent: f64,
        center: f64,
        span: f64,
        fill: Fill,
        opacity: f64,
    },
    Text {
        text: String,
        anchor: Point,
        /// Degrees.
        rotation: f64,
        align: TextAlign,
        size: f64,
        color: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneItem {
    pub bin: SceneBin,
    #[serde(flatten)]
    pub primitive: ScenePrimitive,
}

/// Geometry handed to a renderer. Produces no drawing calls; every primitive
/// is in layout space with the tree centred on the origin (radial) or laid
/// out left to right (rectangular).
pub struct SceneBuilder<'a> {
    layout: &'a TreeLayout,
    layers: &'a LayerSet,
    table: &'a LeafValueTable,
    boundaries: &'a LayerBoundaries,
    settings: &'a Settings,
    items: Vec<SceneItem>,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(
        layout: &'a TreeLayout,
        layers: &'a LayerSet,
        table: &'a LeafValueTable,
        boundaries: &'a LayerBoundaries,
        settings: &'a Settings,
    ) -> Self {
        Self {
            layout,
            layers,
            table,
            boundaries,
            settings,
            items: Vec::new(),
        }
    }

    /// Everything, in painting order.
    pub fn build(mut self) -> Vec<SceneItem> {
        self.tree();
        self.layer_backgrounds();
        self.guide_lines();
        self.categorical_layers();
        self.numerical_layers();
        self.stack_bar_layers();
        self.layer_names();
        self.items
    }

    fn push(&mut self, bin: SceneBin, primitive: ScenePrimitive) {
        self.items.push(SceneItem { bin, primitive });
    }

    fn radial(&self) -> bool {
        self.layout.layout_type == TreeLayoutType::Circlephylogram
    }

    fn leaves(&self) -> impl Iterator<Item = &'a NodePlacement> + 'a {
        let layout = self.layout;
        layout
            .leaf_order
            .iter()
            .map(move |&node_id| &layout.placements[node_id])
    }

    fn tree(&mut self) {
        let layout = self.layout;
        let mut children: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for &(parent, child) in &layout.edges {
            children.entry(parent).or_default().push(child);
        }

        let root = &layout.placements[layout.root];
        let root_end = if self.radial() {
            Point::ORIGIN
        } else {
            Point::new(self.settings.left, root.xy.y)
        };
        self.push(
            SceneBin::Tree,
            ScenePrimitive::Line {
                from: root.xy,
                to: root_end,
            },
        );

        for placement in &layout.placements {
            if placement.state != NodeState::Positioned {
                continue;
            }
            if let Some(backarc) = placement.backarc {
                self.push(
                    SceneBin::Tree,
                    ScenePrimitive::Line {
                        from: placement.xy,
                        to: backarc,
                    },
                );
            }

            let Some(kids) = children.get(&placement.id) else {
                continue;
            };
            let (Some(&first), Some(&last)) = (kids.first(), kids.last()) else {
                continue;
            };
            let first = &layout.placements[first];
            let last = &layout.placements[last];

            let primitive = if self.radial() {
                let (Some(from), Some(to)) = (first.backarc, last.backarc) else {
                    continue;
                };
                ScenePrimitive::Arc {
                    from,
                    to,
                    radius: placement.radius,
                    large_arc: (last.angle - first.angle).abs() > PI,
                }
            } else {
                ScenePrimitive::Line {
                    from: Point::new(placement.xy.x, first.xy.y),
                    to: Point::new(placement.xy.x, last.xy.y),
                }
            };
            self.push(SceneBin::Tree, primitive);
        }

        for envelope in &layout.envelopes {
            self.push(
                SceneBin::Tree,
                ScenePrimitive::Triangle {
                    points: [envelope.apex, envelope.near, envelope.far],
                },
            );
        }
    }

    /// Every other leaf, starting with the first, gets a line out to where
    /// the layers begin.
    fn guide_lines(&mut self) {
        let beginning = self.boundaries.tree_end();
        let lines: Vec<ScenePrimitive> = self
            .leaves()
            .step_by(2)
            .map(|leaf| {
                if self.radial() {
                    ScenePrimitive::Line {
                        from: Point::polar(leaf.radius, leaf.angle),
                        to: Point::polar(beginning, leaf.angle),
                    }
                } else {
                    ScenePrimitive::Line {
                        from: leaf.xy,
                        to: Point::new(beginning, leaf.xy.y),
                    }
                }
            })
            .collect();
        for line in lines {
            self.push(SceneBin::GuideLines, line);
        }
    }

    fn layer_backgrounds(&mut self) {
        let layers = self.layers;
        for layer in layers.iter() {
            let numeric_bar = layer.is_numerical() && layer.visual.layer_type == LayerStyle::Bar;
            if !(numeric_bar || layer.is_text()) {
                continue;
            }
            let Some([start, end]) = self.boundaries.get(layer.order) else {
                continue;
            };

            let (fill, opacity) = if layer.is_text() {
                (color(&layer.visual.color_start), 1.0)
            } else {
                (color(&layer.visual.color), self.settings.background_opacity)
            };

            let Some(primitive) = self.across_all_leaves(start, end, fill, opacity) else {
                continue;
            };
            self.push(SceneBin::LayerBackground { order: layer.order }, primitive);
        }
    }

    /// One shape covering the whole leaf axis between `start` and `end`.
    fn across_all_leaves(
        &self,
        start: f64,
        end: f64,
        fill: Fill,
        opacity: f64,
    ) -> Option<ScenePrimitive> {
        let first = self.layout.leaf(0)?;
        let last = self.layout.leaf(self.layout.leaf_count().checked_sub(1)?)?;
        Some(self.leaf_span(first, last, start, end, fill, opacity))
    }

    /// Sector or band from the start of `first` to the end of `last`.
    fn leaf_span(
        &self,
        first: &NodePlacement,
        last: &NodePlacement,
        start: f64,
        end: f64,
        fill: Fill,
        opacity: f64,
    ) -> ScenePrimitive {
        if self.radial() {
            let start_angle = first.angle - first.size / 2.0;
            let end_angle = last.angle + last.size / 2.0;
            ScenePrimitive::Sector {
                start_angle,
                end_angle,
                inner_radius: start,
                outer_radius: end,
                large_arc: end_angle - start_angle > PI,
                fill,
                opacity,
            }
        } else {
            let span = last.xy.y - first.xy.y;
            ScenePrimitive::Band {
                start,
                extent: end - start,
                center: first.xy.y + span / 2.0,
                span: span + self.layout.smallest_leaf_size,
                fill,
                opacity,
            }
        }
    }

    /// Sector or band covering a single leaf.
    fn leaf_cell(&self, leaf: &NodePlacement, start: f64, end: f64, fill: Fill) -> ScenePrimitive {
        if self.radial() {
            ScenePrimitive::Sector {
                start_angle: leaf.angle - leaf.size / 2.0,
                end_angle: leaf.angle + leaf.size / 2.0,
                inner_radius: start,
                outer_radius: end,
                large_arc: false,
                fill,
                opacity: 1.0,
            }
        } else {
            ScenePrimitive::Band {
                start,
                extent: end - start,
                center: leaf.xy.y,
                span: leaf.size,
                fill,
                opacity: 1.0,
            }
        }
    }

    fn categorical_layers(&mut self) {
        let layers = self.layers;
        for layer in layers.iter() {
            if layer.visual.height == 0.0 || !(layer.is_categorical() || layer.is_parent()) {
                continue;
            }
            let Some([start, end]) = self.boundaries.get(layer.order) else {
                continue;
            };

            if layer.draws_runs() {
                self.run_layer(layer, start, end);
            } else if layer.is_text() {
                self.text_layer(layer, start);
            }
        }
    }

    fn run_layer(&mut self, layer: &LayerDescriptor, start: f64, end: f64) {
        let labels: Vec<&str> = self.leaves().map(|leaf| leaf.label.as_str()).collect();
        for run in category_runs(layer, self.table, &labels) {
            let (Some(first), Some(last)) = (self.layout.leaf(run.start), self.layout.leaf(run.end))
            else {
                continue;
            };
            let fill = if layer.is_parent() {
                color(PARENT_SHADES[usize::from(run.shade)])
            } else {
                Fill::Category { token: run.token }
            };
            let primitive = self.leaf_span(first, last, start, end, fill, 1.0);
            self.push(SceneBin::Layer { order: layer.order }, primitive);
        }
    }

    fn text_layer(&mut self, layer: &LayerDescriptor, start: f64) {
        let font = self
            .boundaries
            .fonts
            .get(&layer.order)
            .copied()
            .unwrap_or_else(|| layer.visual.height.min(self.settings.max_font_size));

        let labels: Vec<ScenePrimitive> = self
            .leaves()
            .map(|leaf| {
                let text = self
                    .table
                    .value(&leaf.label, layer.index)
                    .and_then(LayerValue::as_token)
                    .unwrap_or_default()
                    .to_owned();

                if self.radial() {
                    let radius = start + font * MONOSPACE_FONT_ASPECT_RATIO;
                    let font_gap = (font / radius).atan() / 3.0;
                    let flipped = leaf.angle > PI / 2.0 && leaf.angle < 1.5 * PI;
                    let (anchor_angle, rotation, align) = if flipped {
                        (leaf.angle - font_gap, leaf.angle.to_degrees() + 180.0, TextAlign::Right)
                    } else {
                        (leaf.angle + font_gap, leaf.angle.to_degrees(), TextAlign::Left)
                    };
                    ScenePrimitive::Text {
                        text,
                        anchor: Point::polar(radius, anchor_angle),
                        rotation,
                        align,
                        size: font,
                        color: layer.visual.color.clone(),
                    }
                } else {
                    ScenePrimitive::Text {
                        text,
                        anchor: Point::new(start + font * MONOSPACE_FONT_ASPECT_RATIO, leaf.xy.y),
                        rotation: 0.0,
                        align: TextAlign::Left,
                        size: font,
                        color: layer.visual.color.clone(),
                    }
                }
            })
            .collect();

        for label in labels {
            self.push(SceneBin::Layer { order: layer.order }, label);
        }
    }

    fn numerical_layers(&mut self) {
        let layers = self.layers;
        for layer in layers.iter() {
            if layer.visual.height == 0.0 || !layer.is_numerical() {
                continue;
            }
            let Some([start, end]) = self.boundaries.get(layer.order) else {
                continue;
            };

            let cells: Vec<ScenePrimitive> = self
                .leaves()
                .filter_map(|leaf| {
                    let extent = self
                        .table
                        .value(&leaf.label, layer.index)
                        .and_then(LayerValue::as_scalar)
                        .unwrap_or(0.0);

                    if layer.visual.layer_type == LayerStyle::Intensity {
                        let fill = Fill::Gradient {
                            from: layer.visual.color_start.clone(),
                            to: layer.visual.color.clone(),
                            fraction: extent / layer.visual.height,
                        };
                        return Some(self.leaf_cell(leaf, start, end, fill));
                    }

                    if extent <= 0.0 {
                        return None;
                    }
                    let fill = color(&layer.visual.color);
                    // Radial bars grow outward from the ring start, rectangular
                    // bars hang from the band end.
                    Some(if self.radial() {
                        self.leaf_cell(leaf, start, start + extent, fill)
                    } else {
                        self.leaf_cell(leaf, end - extent, end, fill)
                    })
                })
                .collect();

            for cell in cells {
                self.push(SceneBin::Layer { order: layer.order }, cell);
            }
        }
    }

    fn stack_bar_layers(&mut self) {
        let layers = self.layers;
        for layer in layers.iter() {
            if layer.visual.height == 0.0 || !layer.is_stackbar() {
                continue;
            }
            let Some([start, end]) = self.boundaries.get(layer.order) else {
                continue;
            };

            let mut cells = Vec::new();
            for leaf in self.leaves() {
                let Some(segments) = self
                    .table
                    .value(&leaf.label, layer.index)
                    .and_then(LayerValue::as_segments)
                else {
                    continue;
                };

                let mut offset = 0.0;
                for (segment, &extent) in segments.iter().enumerate() {
                    let fill = Fill::StackSegment { segment };
                    cells.push(if self.radial() {
                        self.leaf_cell(leaf, start + offset, start + offset + extent, fill)
                    } else {
                        self.leaf_cell(leaf, end - offset - extent, end - offset, fill)
                    });
                    offset += extent;
                }
            }

            for cell in cells {
                self.push(SceneBin::Layer { order: layer.order }, cell);
            }
        }
    }

    fn layer_names(&mut self) {
        let layers = self.layers;
        for layer in layers.iter() {
            let height = layer.visual.height;
            if height == 0.0 {
                continue;
            }
            let Some([start, end]) = self.boundaries.get(layer.order) else {
                continue;
            };

            let size = height.min(self.settings.max_font_size_label);
            let text = format!(" {}", layer.name.replace('_', " "));
            let primitive = if self.radial() {
                let angle_max = self.settings.angle_max.to_radians();
                let distance = start + height / 2.0 - size / 3.0;
                ScenePrimitive::Text {
                    text,
                    anchor: Point::polar(distance, angle_max),
                    rotation: (angle_max + PI / 2.0).to_degrees(),
                    align: TextAlign::Left,
                    size,
                    color: layer.visual.color.clone(),
                }
            } else {
                ScenePrimitive::Text {
                    text,
                    anchor: Point::new(
                        end - height / 2.0 + size / 3.0,
                        self.settings.width() + 40.0,
                    ),
                    rotation: -90.0,
                    align: TextAlign::Right,
                    size,
                    color: layer.visual.color.clone(),
                }
            };
            self.push(SceneBin::LayerLabels, primitive);
        }
    }
}

fn color(color: &str) -> Fill {
    Fill::Color {
        color: color.to_owned(),
    }
}
