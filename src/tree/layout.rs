use log::debug;
use serde::{Deserialize, Serialize};

use super::{NodeId, Tree};
use crate::error::{LayoutError, Result};
use crate::settings::Settings;

mod circular;
mod collapse;
pub mod leaf_sizes;
mod rectangular;

pub use collapse::CollapsedEnvelope;
pub use leaf_sizes::LeafSizes;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TreeLayoutType {
    /// Rectangular: path length on the horizontal axis, leaves stacked vertically.
    Phylogram,
    /// Radial: path length on the radius, leaves spread over an angle.
    #[default]
    Circlephylogram,
}

pub(super) const DEFAULT_BRANCH_LENGTH: f64 = 1.0;
/// Branch lengths below this are treated as 0.
pub(super) const MIN_BRANCH_LENGTH: f64 = 1e-5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn polar(radius: f64, angle: f64) -> Self {
        Self {
            x: radius * angle.cos(),
            y: radius * angle.sin(),
        }
    }
}

/// Progress of a node through one layout pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeState {
    #[default]
    Unvisited,
    /// Leaf with an order and a size.
    Sized,
    /// Internal node waiting for its children.
    AwaitingChildren,
    Positioned,
    /// Below a collapsed node.
    Hidden,
}

/// Computed geometry of one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodePlacement {
    pub id: NodeId,
    pub label: String,
    pub ancestor: Option<NodeId>,
    pub state: NodeState,
    /// Leaf order; `None` for internal and hidden nodes.
    pub order: Option<usize>,
    pub size: f64,
    pub edge_length: f64,
    pub path_length: f64,
    pub angle: f64,
    pub radius: f64,
    pub xy: Point,
    /// Where the connector to the parent meets the parent's arc (radial) or
    /// the parent's vertical line (rectangular).
    pub backarc: Option<Point>,
    pub collapsed: bool,
    pub max_child_radius: Option<f64>,
    pub max_child_x: Option<f64>,
}

/// Drawing frame derived from the settings and the visible leaf count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub layout_type: TreeLayoutType,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
    pub root_length: f64,
    pub max_path_length: f64,
    pub leaf_gap: f64,
    pub node_gap: f64,
    pub rooted: bool,
}

impl Frame {
    pub fn new(settings: &Settings, leaf_count: usize, rooted: bool, max_path_length: f64) -> Self {
        let width = settings.width();
        let height = settings.height();

        let leaf_gap = if leaf_count > 1 {
            height / (leaf_count - 1) as f64
        } else {
            0.0
        };

        // A rooted tree reserves one node gap on the left for the root edge.
        let (left, width, node_gap) = if rooted && leaf_count > 0 {
            let gap = width / leaf_count as f64;
            (settings.left + gap, width - gap, gap)
        } else if leaf_count > 1 {
            (settings.left, width, width / (leaf_count - 1) as f64)
        } else {
            (settings.left, width, 0.0)
        };

        Self {
            layout_type: settings.tree_type,
            left,
            top: settings.top,
            width,
            height,
            radius: settings.radius(),
            root_length: settings.root_length,
            max_path_length,
            leaf_gap,
            node_gap,
            rooted,
        }
    }

    /// Path length scaled into `[0, 1]`.
    pub fn normalized(&self, path_length: f64) -> f64 {
        if self.max_path_length > 0.0 {
            path_length / self.max_path_length
        } else {
            0.0
        }
    }

    pub fn x_at(&self, path_length: f64) -> f64 {
        self.left + self.normalized(path_length) * self.width
    }

    /// Path length maps inward from the outer radius.
    pub fn radius_at(&self, path_length: f64) -> f64 {
        self.radius - (self.root_length + self.normalized(path_length) * (self.radius / 2.0))
    }

    /// Position along the path-length axis for the active projection.
    pub fn axis_at(&self, path_length: f64) -> f64 {
        match self.layout_type {
            TreeLayoutType::Phylogram => self.x_at(path_length),
            TreeLayoutType::Circlephylogram => self.radius_at(path_length),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeLayout {
    pub layout_type: TreeLayoutType,
    pub root: NodeId,
    /// Indexed by node id; covers hidden nodes too.
    pub placements: Vec<NodePlacement>,
    /// Visible leaves by order.
    pub leaf_order: Vec<NodeId>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub smallest_leaf_size: f64,
    pub max_path_length: f64,
    pub frame: Frame,
    pub envelopes: Vec<CollapsedEnvelope>,
}

impl TreeLayout {
    /// Place every node of `tree` with the nodes in `collapsed` folded into
    /// single leaves. `tree` itself is left untouched.
    pub fn compute(tree: &Tree, collapsed: &[NodeId], settings: &Settings) -> Result<Self> {
        tree.validate()?;
        let root_id = tree.root.ok_or(LayoutError::EmptyTree)?;
        if let Some(&node) = collapsed.iter().find(|&&id| id >= tree.nodes.len()) {
            return Err(LayoutError::NodeOutOfRange { node });
        }

        let mut placements: Vec<NodePlacement> = tree
            .nodes
            .iter()
            .map(|node| NodePlacement {
                id: node.id,
                label: node.label.clone(),
                ancestor: node.parent,
                ..NodePlacement::default()
            })
            .collect();

        let computed_max = assign_path_lengths(tree, root_id, &mut placements);
        let max_path_length = settings.max_path_length.unwrap_or(computed_max);

        // Collapse inner nodes before their ancestors.
        let collapse_order: Vec<NodeId> = tree
            .postorder()
            .into_iter()
            .filter(|id| collapsed.contains(id))
            .collect();

        let mut visible = tree.clone();
        for &node_id in &collapse_order {
            for hidden in tree.descendants(node_id) {
                placements[hidden].state = NodeState::Hidden;
            }
            visible.collapse(node_id)?;
            placements[node_id].collapsed = true;
        }

        let leaf_order = visible.leaves();
        let leaf_count = leaf_order.len();
        let frame = Frame::new(settings, leaf_count, visible.is_rooted(), max_path_length);

        let sizes = match settings.tree_type {
            TreeLayoutType::Circlephylogram => {
                LeafSizes::weighted(leaf_count, settings.angular_span())
            }
            TreeLayoutType::Phylogram => {
                let size = if leaf_count > 1 {
                    frame.leaf_gap
                } else {
                    frame.height
                };
                LeafSizes::uniform(leaf_count, size)
            }
        };

        for node_id in visible.preorder() {
            placements[node_id].state = if visible.nodes[node_id].is_leaf() {
                NodeState::Sized
            } else {
                NodeState::AwaitingChildren
            };
        }
        for (order, &leaf_id) in leaf_order.iter().enumerate() {
            placements[leaf_id].order = Some(order);
            placements[leaf_id].size = sizes.get(order);
        }

        debug!(
            "laying out {} visible leaves ({:?}, max path length {:.4}, {} collapsed)",
            leaf_count,
            settings.tree_type,
            max_path_length,
            collapse_order.len()
        );

        match settings.tree_type {
            TreeLayoutType::Phylogram => rectangular::place(&visible, &frame, &mut placements)?,
            TreeLayoutType::Circlephylogram => {
                circular::place(&visible, &frame, &sizes, &mut placements)?
            }
        }

        collapse::record_extents(tree, &collapse_order, &frame, &mut placements);
        let envelopes = collapse::envelopes(&frame, &collapse_order, &placements);

        let edges = visible
            .preorder()
            .into_iter()
            .flat_map(|parent| {
                visible.nodes[parent]
                    .children
                    .iter()
                    .map(move |&child| (parent, child))
            })
            .collect();

        Ok(Self {
            layout_type: settings.tree_type,
            root: root_id,
            placements,
            leaf_order,
            edges,
            smallest_leaf_size: sizes.smallest,
            max_path_length,
            frame,
            envelopes,
        })
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_order.len()
    }

    pub fn placement(&self, node_id: NodeId) -> Option<&NodePlacement> {
        self.placements.get(node_id)
    }

    /// Placement of the leaf at `order`.
    pub fn leaf(&self, order: usize) -> Option<&NodePlacement> {
        self.leaf_order
            .get(order)
            .and_then(|&node_id| self.placements.get(node_id))
    }
}

/// Fill in edge and path lengths for every reachable node; returns the
/// longest path.
fn assign_path_lengths(tree: &Tree, root_id: NodeId, placements: &mut [NodePlacement]) -> f64 {
    let mut max_path_length = 0.0f64;

    for node_id in tree.preorder() {
        let node = &tree.nodes[node_id];
        let (edge_length, path_length) = if node_id == root_id {
            let length = node.length.unwrap_or(0.0);
            (length, length)
        } else {
            let mut length = node.length.unwrap_or(DEFAULT_BRANCH_LENGTH);
            if length < MIN_BRANCH_LENGTH {
                length = 0.0;
            }
            let parent_path = node
                .parent
                .map(|parent| placements[parent].path_length)
                .unwrap_or(0.0);
            (length, parent_path + length)
        };

        placements[node_id].edge_length = edge_length;
        placements[node_id].path_length = path_length;
        max_path_length = max_path_length.max(path_length);
    }

    max_path_length
}

/// The first and right-most children of `node_id`, both already positioned.
pub(super) fn positioned_extremes(
    tree: &Tree,
    node_id: NodeId,
    placements: &[NodePlacement],
) -> Result<(NodeId, NodeId)> {
    let (Some(first), Some(last)) = (tree.first_child(node_id), tree.last_child(node_id)) else {
        return Err(LayoutError::malformed(format!(
            "internal node {node_id} has no children"
        )));
    };

    if let Some(&pending) = tree.nodes[node_id]
        .children
        .iter()
        .find(|&&child| placements[child].state != NodeState::Positioned)
    {
        return Err(LayoutError::malformed(format!(
            "node {node_id} was reached before its child {pending} was positioned"
        )));
    }

    Ok((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeNode;
    use std::f64::consts::TAU;

    fn settings(tree_type: TreeLayoutType) -> Settings {
        Settings {
            tree_type,
            tree_width: 100.0,
            tree_height: 60.0,
            tree_radius: 200.0,
            angle_min: 0.0,
            angle_max: 360.0,
            ..Settings::default()
        }
    }

    fn layout(newick: &str, tree_type: TreeLayoutType) -> (Tree, TreeLayout) {
        let tree = Tree::from_newick(newick).unwrap();
        let layout = TreeLayout::compute(&tree, &[], &settings(tree_type)).unwrap();
        (tree, layout)
    }

    fn leaf(layout: &TreeLayout, tree: &Tree, label: &str) -> NodePlacement {
        layout.placements[tree.find_by_label(label).unwrap()].clone()
    }

    #[test]
    fn leaf_orders_are_a_permutation() {
        let (tree, layout) = layout(
            "(((A:1,B:2):1,(C:1,D:1):0.5):1,(E:1,(F:1,G:1):2):1,H:3);",
            TreeLayoutType::Circlephylogram,
        );
        let mut orders: Vec<usize> = layout
            .placements
            .iter()
            .filter_map(|placement| placement.order)
            .collect();
        orders.sort_unstable();
        assert_eq!(orders, (0..tree.leaf_count()).collect::<Vec<_>>());
        assert_eq!(layout.leaf_count(), 8);
    }

    #[test]
    fn path_lengths_accumulate_from_the_root() {
        let (tree, layout) = layout(
            "((A:0.5,B:0.000001):1.5,(C:2,D:0.25):0.75);",
            TreeLayoutType::Phylogram,
        );
        let root = tree.root.unwrap();
        assert_eq!(layout.placements[root].path_length, 0.0);

        let mut expected_max = 0.0f64;
        for node in &tree.nodes {
            let placement = &layout.placements[node.id];
            if let Some(parent) = node.parent {
                let expected = layout.placements[parent].path_length + placement.edge_length;
                assert!((placement.path_length - expected).abs() < 1e-12);
            }
            expected_max = expected_max.max(placement.path_length);
        }
        assert_eq!(layout.max_path_length, expected_max);
        assert!((layout.max_path_length - 2.75).abs() < 1e-12);
        assert_eq!(leaf(&layout, &tree, "B").edge_length, 0.0);
    }

    #[test]
    fn root_path_length_is_its_own_edge() {
        let mut root = TreeNode::new(0, None, Some(0.5));
        root.children = vec![1, 2];
        let mut a = TreeNode::new(1, Some("A".into()), Some(1.0));
        a.parent = Some(0);
        let mut b = TreeNode::new(2, Some("B".into()), None);
        b.parent = Some(0);
        let tree = Tree::from_nodes(0, vec![root, a, b]).unwrap();

        let layout = TreeLayout::compute(&tree, &[], &settings(TreeLayoutType::Phylogram)).unwrap();
        assert_eq!(layout.placements[0].path_length, 0.5);
        assert_eq!(layout.placements[1].path_length, 1.5);
        // Missing branch lengths count as 1.
        assert_eq!(layout.placements[2].path_length, 1.5);
        assert_eq!(layout.max_path_length, 1.5);
    }

    #[test]
    fn radial_leaf_sizes_follow_order() {
        let (tree, layout) = layout("(A:1,B:1,C:1);", TreeLayoutType::Circlephylogram);
        let a = leaf(&layout, &tree, "A");
        let b = leaf(&layout, &tree, "B");
        let c = leaf(&layout, &tree, "C");

        assert!((a.size - TAU / 6.0).abs() < 1e-12);
        assert!((b.size - 2.0 * a.size).abs() < 1e-12);
        assert!((c.size - 3.0 * a.size).abs() < 1e-12);
        assert!((a.size + b.size + c.size - TAU).abs() < 1e-12);
        assert_eq!(layout.smallest_leaf_size, a.size);

        // Leaves are packed edge to edge.
        assert!((a.angle - a.size / 2.0).abs() < 1e-12);
        assert!(
            (b.angle - (a.angle + a.size / 2.0 + b.size / 2.0)).abs() < 1e-12
        );
        assert!(
            (c.angle - (b.angle + b.size / 2.0 + c.size / 2.0)).abs() < 1e-12
        );
    }

    #[test]
    fn radial_radius_maps_path_length_inward() {
        let (tree, layout) = layout("((A:1,B:2):2,C:4);", TreeLayoutType::Circlephylogram);
        let radius = 200.0;
        let root_length = 0.1;

        let c = leaf(&layout, &tree, "C");
        assert!(
            (c.radius - (radius - (root_length + radius / 2.0))).abs() < 1e-9
        );
        assert!((c.xy.x - c.radius * c.angle.cos()).abs() < 1e-9);
        assert!((c.xy.y - c.radius * c.angle.sin()).abs() < 1e-9);

        let root = &layout.placements[tree.root.unwrap()];
        assert!((root.radius - (radius - root_length)).abs() < 1e-9);
    }

    #[test]
    fn internal_angle_is_midpoint_of_extreme_children() {
        let (tree, layout) = layout("((A:1,B:1,C:1):1,D:1);", TreeLayoutType::Circlephylogram);
        let inner = tree.find_by_label("Int_1").unwrap();
        let a = leaf(&layout, &tree, "A");
        let c = leaf(&layout, &tree, "C");
        let expected = a.angle + (c.angle - a.angle) / 2.0;
        assert!((layout.placements[inner].angle - expected).abs() < 1e-12);
    }

    #[test]
    fn backarc_uses_parent_radius_and_own_angle() {
        let (tree, layout) = layout("((A:1,B:1):1,C:1);", TreeLayoutType::Circlephylogram);
        let inner = tree.find_by_label("Int_1").unwrap();
        let parent_radius = layout.placements[inner].radius;
        let a = leaf(&layout, &tree, "A");
        let backarc = a.backarc.unwrap();
        assert!((backarc.x - parent_radius * a.angle.cos()).abs() < 1e-9);
        assert!((backarc.y - parent_radius * a.angle.sin()).abs() < 1e-9);
        assert!(layout.placements[tree.root.unwrap()].backarc.is_none());
    }

    #[test]
    fn phylogram_equal_paths_share_x() {
        let (tree, layout) = layout("(A:1,B:1,C:1,D:1);", TreeLayoutType::Phylogram);
        let leaves: Vec<NodePlacement> = ["A", "B", "C", "D"]
            .iter()
            .map(|label| leaf(&layout, &tree, label))
            .collect();

        for placement in &leaves {
            assert_eq!(placement.xy.x, leaves[0].xy.x);
        }
        assert!((leaves[0].xy.x - 100.0).abs() < 1e-9);
        for (order, placement) in leaves.iter().enumerate() {
            assert!((placement.xy.y - order as f64 * 20.0).abs() < 1e-9);
        }
    }

    #[test]
    fn phylogram_internal_y_is_between_extreme_children() {
        let (tree, layout) = layout("((A:1,B:1,C:1):1,D:1);", TreeLayoutType::Phylogram);
        let inner = &layout.placements[tree.find_by_label("Int_1").unwrap()];
        let a = leaf(&layout, &tree, "A");
        let c = leaf(&layout, &tree, "C");
        assert!((inner.xy.y - (a.xy.y + c.xy.y) / 2.0).abs() < 1e-12);

        let shoulder = a.backarc.unwrap();
        assert_eq!(shoulder, Point::new(inner.xy.x, a.xy.y));
    }

    #[test]
    fn rooted_phylogram_reserves_a_node_gap() {
        let (tree, layout) = layout("((A:1,B:1):1,(C:1,D:1):1);", TreeLayoutType::Phylogram);
        assert!(layout.frame.rooted);
        assert!((layout.frame.node_gap - 25.0).abs() < 1e-12);

        let root = &layout.placements[tree.root.unwrap()];
        assert!((root.xy.x - 25.0).abs() < 1e-12);
        let a = leaf(&layout, &tree, "A");
        assert!((a.xy.x - 100.0).abs() < 1e-12);
    }

    #[test]
    fn single_leaf_tree_is_finite() {
        let leaf = TreeNode::new(0, Some("A".into()), Some(1.0));
        let tree = Tree::from_nodes(0, vec![leaf]).unwrap();

        let layout = TreeLayout::compute(&tree, &[], &settings(TreeLayoutType::Phylogram)).unwrap();
        let only = &layout.placements[0];
        assert_eq!(only.order, Some(0));
        assert_eq!(only.xy.y, 0.0);
        assert!(only.xy.x.is_finite());
        assert_eq!(layout.frame.leaf_gap, 0.0);

        let radial =
            TreeLayout::compute(&tree, &[], &settings(TreeLayoutType::Circlephylogram)).unwrap();
        let only = &radial.placements[0];
        assert!((only.size - TAU).abs() < 1e-12);
        assert!(only.xy.x.is_finite() && only.xy.y.is_finite());
    }

    #[test]
    fn zero_length_tree_stays_finite() {
        let (_, layout) = layout("((A:0,B:0):0,C:0);", TreeLayoutType::Phylogram);
        assert_eq!(layout.max_path_length, 0.0);
        for placement in &layout.placements {
            assert!(placement.xy.x.is_finite());
            assert!(placement.xy.y.is_finite());
        }
    }

    #[test]
    fn max_path_length_override_rescales() {
        let tree = Tree::from_newick("(A:1,B:1,C:1);").unwrap();
        let settings = Settings {
            max_path_length: Some(2.0),
            ..settings(TreeLayoutType::Phylogram)
        };
        let layout = TreeLayout::compute(&tree, &[], &settings).unwrap();
        let a = &layout.placements[tree.find_by_label("A").unwrap()];
        assert!((a.xy.x - 50.0).abs() < 1e-12);
    }

    #[test]
    fn every_visible_node_is_positioned() {
        let (_, layout) = layout(
            "((A:1,B:1):1,(C:1,(D:1,E:1):1):1);",
            TreeLayoutType::Circlephylogram,
        );
        assert!(layout
            .placements
            .iter()
            .all(|placement| placement.state == NodeState::Positioned));
        assert_eq!(layout.edges.len(), layout.placements.len() - 1);
    }

    #[test]
    fn collapsing_keeps_outside_nodes_in_place() {
        let tree = Tree::from_newick("((A:1,B:3):1,(C:1,D:1):1,E:1);").unwrap();
        let settings = settings(TreeLayoutType::Circlephylogram);
        let full = TreeLayout::compute(&tree, &[], &settings).unwrap();

        let inner = tree.find_by_label("Int_1").unwrap();
        let folded = TreeLayout::compute(&tree, &[inner], &settings).unwrap();

        for label in ["Int_0", "Int_1", "Int_2", "C", "D", "E"] {
            let node_id = tree.find_by_label(label).unwrap();
            assert_eq!(
                folded.placements[node_id].radius, full.placements[node_id].radius,
                "{label}"
            );
        }
        assert_eq!(folded.leaf_count(), 4);
        assert!(folded.placements[inner].collapsed);
        assert_eq!(folded.placements[inner].order, Some(0));
    }

    #[test]
    fn collapsed_node_records_deepest_descendant() {
        let tree = Tree::from_newick("((A:1,B:3):1,(C:1,D:1):1,E:1);").unwrap();
        let settings = settings(TreeLayoutType::Circlephylogram);
        let full = TreeLayout::compute(&tree, &[], &settings).unwrap();

        let inner = tree.find_by_label("Int_1").unwrap();
        let folded = TreeLayout::compute(&tree, &[inner], &settings).unwrap();
        let a = tree.find_by_label("A").unwrap();
        let b = tree.find_by_label("B").unwrap();

        // Radius shrinks with path length, so the furthest extent is the
        // largest of the hidden radii.
        let expected = full.placements[a].radius.max(full.placements[b].radius);
        assert_eq!(folded.placements[inner].max_child_radius, Some(expected));
        assert_eq!(folded.placements[a].state, NodeState::Hidden);
        assert_eq!(folded.placements[b].state, NodeState::Hidden);
        assert_eq!(folded.placements[b].radius, full.placements[b].radius);
        assert!(
            folded.edges.iter().all(|&(_, child)| child != a && child != b)
        );
    }

    #[test]
    fn nested_collapse_folds_inner_extent_into_outer() {
        let tree = Tree::from_newick("(((A:1,B:1):1,C:1):1,D:1);").unwrap();
        let settings = settings(TreeLayoutType::Phylogram);
        let outer = tree.find_by_label("Int_1").unwrap();
        let inner = tree.find_by_label("Int_2").unwrap();

        let folded = TreeLayout::compute(&tree, &[outer, inner], &settings).unwrap();
        let a = tree.find_by_label("A").unwrap();
        assert_eq!(
            folded.placements[inner].max_child_x,
            Some(folded.placements[a].xy.x)
        );
        assert_eq!(
            folded.placements[outer].max_child_x,
            folded.placements[inner].max_child_x
        );
        assert_eq!(folded.placements[inner].state, NodeState::Hidden);

        // Only the outer node is still visible, so only it gets a triangle.
        assert_eq!(folded.envelopes.len(), 1);
        let envelope = folded.envelopes[0];
        assert_eq!(envelope.node, outer);
        assert_eq!(envelope.apex, folded.placements[outer].xy);
        assert_eq!(envelope.near.x, envelope.far.x);
        assert!(
            (envelope.far.y - envelope.near.y - folded.placements[outer].size).abs() < 1e-9
        );
    }

    #[test]
    fn radial_envelope_spans_the_leaf_size() {
        let tree = Tree::from_newick("((A:1,B:1):1,C:1);").unwrap();
        let inner = tree.find_by_label("Int_1").unwrap();
        let settings = settings(TreeLayoutType::Circlephylogram);
        let layout = TreeLayout::compute(&tree, &[inner], &settings).unwrap();
        let placement = &layout.placements[inner];
        let envelope = layout.envelopes[0];
        let radius = placement.max_child_radius.unwrap();

        let near = Point::polar(radius, placement.angle + placement.size / 2.0);
        assert!((envelope.near.x - near.x).abs() < 1e-9);
        assert!((envelope.near.y - near.y).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_collapse_is_rejected() {
        let tree = Tree::from_newick("(A:1,B:1);").unwrap();
        let err =
            TreeLayout::compute(&tree, &[42], &settings(TreeLayoutType::Phylogram)).unwrap_err();
        assert!(matches!(err, LayoutError::NodeOutOfRange { node: 42 }));
    }
}
