use super::{positioned_extremes, Frame, NodePlacement, NodeState, Point};
use crate::error::{LayoutError, Result};
use crate::tree::Tree;

/// Phylogram placement: x from path length, y from leaf order. Internal nodes
/// sit halfway between their first and right-most child.
pub(super) fn place(tree: &Tree, frame: &Frame, placements: &mut [NodePlacement]) -> Result<()> {
    for node_id in tree.postorder() {
        let x = frame.x_at(placements[node_id].path_length);

        let y = if tree.nodes[node_id].is_leaf() {
            let order = placements[node_id].order.ok_or_else(|| {
                LayoutError::malformed(format!("leaf {node_id} has no order"))
            })?;
            frame.top + order as f64 * frame.leaf_gap
        } else {
            let (first, last) = positioned_extremes(tree, node_id, placements)?;
            let first_y = placements[first].xy.y;
            let last_y = placements[last].xy.y;

            for &child_id in &tree.nodes[node_id].children {
                let child_y = placements[child_id].xy.y;
                placements[child_id].backarc = Some(Point::new(x, child_y));
            }

            first_y + (last_y - first_y) / 2.0
        };

        let placement = &mut placements[node_id];
        placement.xy = Point::new(x, y);
        placement.state = NodeState::Positioned;
    }

    Ok(())
}
