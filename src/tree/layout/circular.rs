use super::{positioned_extremes, Frame, LeafSizes, NodePlacement, NodeState, Point};
use crate::error::{LayoutError, Result};
use crate::tree::Tree;

/// Circlephylogram placement: angle from the packed leaf sizes, radius from
/// path length. Each child gets a backarc point on its parent's arc.
pub(super) fn place(
    tree: &Tree,
    frame: &Frame,
    sizes: &LeafSizes,
    placements: &mut [NodePlacement],
) -> Result<()> {
    let leaf_angles = leaf_angles(sizes);

    for node_id in tree.postorder() {
        let radius = frame.radius_at(placements[node_id].path_length);

        let angle = if tree.nodes[node_id].is_leaf() {
            placements[node_id]
                .order
                .and_then(|order| leaf_angles.get(order).copied())
                .ok_or_else(|| LayoutError::malformed(format!("leaf {node_id} has no order")))?
        } else {
            let (first, last) = positioned_extremes(tree, node_id, placements)?;
            let left_angle = placements[first].angle;
            let right_angle = placements[last].angle;

            for &child_id in &tree.nodes[node_id].children {
                let child_angle = placements[child_id].angle;
                placements[child_id].backarc = Some(Point::polar(radius, child_angle));
            }

            left_angle + (right_angle - left_angle) / 2.0
        };

        let placement = &mut placements[node_id];
        placement.angle = angle;
        placement.radius = radius;
        placement.xy = Point::polar(radius, angle);
        placement.state = NodeState::Positioned;
    }

    Ok(())
}

/// Running angular cursor: each leaf starts where the previous one ends.
fn leaf_angles(sizes: &LeafSizes) -> Vec<f64> {
    let mut angles: Vec<f64> = Vec::with_capacity(sizes.sizes.len());
    for (order, &size) in sizes.sizes.iter().enumerate() {
        let angle = match order.checked_sub(1) {
            None => size / 2.0,
            Some(previous) => angles[previous] + sizes.sizes[previous] / 2.0 + size / 2.0,
        };
        angles.push(angle);
    }
    angles
}
