use serde::Serialize;

use super::{Frame, NodePlacement, NodeState, Point, TreeLayoutType};
use crate::tree::{NodeId, Tree};

/// Placeholder triangle drawn in place of a collapsed subtree: from the
/// collapse point out to the deepest hidden extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CollapsedEnvelope {
    pub node: NodeId,
    pub apex: Point,
    pub near: Point,
    pub far: Point,
}

/// Record on every collapsed node the furthest x (phylogram) or radius
/// (circlephylogram) reached by its hidden descendants. Hidden nodes get
/// their axis coordinate assigned on the way.
///
/// `collapse_order` must list inner collapsed nodes before their ancestors.
pub(super) fn record_extents(
    tree: &Tree,
    collapse_order: &[NodeId],
    frame: &Frame,
    placements: &mut [NodePlacement],
) {
    for &node_id in collapse_order {
        let mut extent: Option<f64> = None;

        for descendant in tree.descendants(node_id) {
            let axis = frame.axis_at(placements[descendant].path_length);
            let placement = &mut placements[descendant];
            let recorded = match frame.layout_type {
                TreeLayoutType::Phylogram => {
                    placement.xy.x = axis;
                    placement.max_child_x
                }
                TreeLayoutType::Circlephylogram => {
                    placement.radius = axis;
                    placement.max_child_radius
                }
            };

            let deepest = recorded.map_or(axis, |recorded| recorded.max(axis));
            extent = Some(extent.map_or(deepest, |extent: f64| extent.max(deepest)));
        }

        // A collapsed leaf has nothing hidden; its own position is the extent.
        let own_axis = frame.axis_at(placements[node_id].path_length);
        let extent = extent.unwrap_or(own_axis);
        match frame.layout_type {
            TreeLayoutType::Phylogram => placements[node_id].max_child_x = Some(extent),
            TreeLayoutType::Circlephylogram => placements[node_id].max_child_radius = Some(extent),
        }
    }
}

/// Triangles for the collapsed nodes that are still visible.
pub(super) fn envelopes(
    frame: &Frame,
    collapse_order: &[NodeId],
    placements: &[NodePlacement],
) -> Vec<CollapsedEnvelope> {
    collapse_order
        .iter()
        .map(|&node_id| &placements[node_id])
        .filter(|placement| placement.state == NodeState::Positioned)
        .filter_map(|placement| {
            let half = placement.size / 2.0;
            let (near, far) = match frame.layout_type {
                TreeLayoutType::Phylogram => {
                    let x = placement.max_child_x?;
                    (
                        Point::new(x, placement.xy.y - half),
                        Point::new(x, placement.xy.y + half),
                    )
                }
                TreeLayoutType::Circlephylogram => {
                    let radius = placement.max_child_radius?;
                    (
                        Point::polar(radius, placement.angle + half),
                        Point::polar(radius, placement.angle - half),
                    )
                }
            };
            Some(CollapsedEnvelope {
                node: placement.id,
                apex: placement.xy,
                near,
                far,
            })
        })
        .collect()
}
