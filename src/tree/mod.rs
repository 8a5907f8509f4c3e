use phylotree::tree::{Node as PhyloNode, Tree as PhyloTree};

use crate::error::{LayoutError, Result};

pub mod layout;

pub type NodeId = phylotree::tree::NodeId;

/// Representation of a phylogenetic tree as an arena of nodes indexed by id.
#[derive(Debug, Clone)]
pub struct Tree {
    pub id: usize,
    pub label: Option<String>,
    pub newick: String,
    pub root: Option<NodeId>,
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn new(id: usize, label: Option<String>, newick: String, phylo: &PhyloTree) -> Self {
        let root = phylo.get_root().ok();
        let nodes = Self::build_nodes_from_phylo(phylo);
        let mut tree = Self {
            id,
            label,
            newick,
            root,
            nodes,
        };
        tree.assign_labels();
        tree
    }

    /// Parse a single Newick string into an arena tree.
    pub fn from_newick(newick: &str) -> Result<Self> {
        let phylo = PhyloTree::from_newick(newick)
            .map_err(|err| LayoutError::malformed(format!("failed to parse newick tree: {err}")))?;
        let tree = Self::new(0, None, newick.to_owned(), &phylo);
        tree.validate()?;
        Ok(tree)
    }

    /// Build a tree from an explicit node list (ids must match positions).
    pub fn from_nodes(root: NodeId, nodes: Vec<TreeNode>) -> Result<Self> {
        let mut tree = Self {
            id: 0,
            label: None,
            newick: String::new(),
            root: Some(root),
            nodes,
        };
        tree.validate()?;
        tree.assign_labels();
        Ok(tree)
    }

    /// Check the parent/child links: one root, every child points back at its
    /// parent and each node is reached exactly once from the root.
    pub fn validate(&self) -> Result<()> {
        let root = self.root.ok_or(LayoutError::EmptyTree)?;
        if self.nodes.is_empty() {
            return Err(LayoutError::EmptyTree);
        }
        if root >= self.nodes.len() {
            return Err(LayoutError::malformed(format!(
                "root {root} is out of range"
            )));
        }
        if self.nodes[root].parent.is_some() {
            return Err(LayoutError::malformed(format!("root {root} has a parent")));
        }

        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(node_id) = stack.pop() {
            if seen[node_id] {
                return Err(LayoutError::malformed(format!(
                    "node {node_id} is reachable more than once"
                )));
            }
            seen[node_id] = true;

            for &child_id in &self.nodes[node_id].children {
                let child = self.nodes.get(child_id).ok_or_else(|| {
                    LayoutError::malformed(format!("node {node_id} has unknown child {child_id}"))
                })?;
                if child.parent != Some(node_id) {
                    return Err(LayoutError::malformed(format!(
                        "child {child_id} does not point back to parent {node_id}"
                    )));
                }
                stack.push(child_id);
            }
        }

        for (node_id, node) in self.nodes.iter().enumerate() {
            if node.id != node_id {
                return Err(LayoutError::malformed(format!(
                    "node at position {node_id} carries id {}",
                    node.id
                )));
            }
        }

        Ok(())
    }

    /// Name every node: leaves keep their taxon name, internal nodes are
    /// numbered `Int_<k>` in pre-order.
    fn assign_labels(&mut self) {
        let mut internal_counter = 0usize;
        for node_id in self.preorder() {
            let node = &mut self.nodes[node_id];
            node.label = if node.children.is_empty() {
                node.name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| format!("Leaf_{node_id}"))
            } else {
                let label = format!("Int_{internal_counter}");
                internal_counter += 1;
                label
            };
        }
    }

    /// Depth-first pre-order from the root, children in stored order.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.preorder_from(self.root)
    }

    fn preorder_from(&self, start: Option<NodeId>) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = start.into_iter().collect();
        while let Some(node_id) = stack.pop() {
            order.push(node_id);
            stack.extend(self.nodes[node_id].children.iter().rev());
        }
        order
    }

    /// Post-order: every node appears after all of its descendants.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let Some(root_id) = self.root else {
            return order;
        };

        let mut stack = vec![(root_id, false)];
        while let Some((node_id, expanded)) = stack.pop() {
            if expanded {
                order.push(node_id);
                continue;
            }
            stack.push((node_id, true));
            for &child_id in self.nodes[node_id].children.iter().rev() {
                stack.push((child_id, false));
            }
        }
        order
    }

    /// All nodes below `node_id` in pre-order, excluding the node itself.
    pub fn descendants(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut nodes = self.preorder_from(Some(node_id));
        nodes.remove(0);
        nodes
    }

    /// Leaves in drawing order (left to right).
    pub fn leaves(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.nodes[id].is_leaf())
            .collect()
    }

    pub fn first_child(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id)?.children.first().copied()
    }

    /// Right-most sibling of the first child.
    pub fn last_child(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id)?.children.last().copied()
    }

    /// Sibling chain: the next child of the same parent.
    pub fn next_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(node_id)?.parent?;
        let siblings = &self.nodes[parent].children;
        let position = siblings.iter().position(|&id| id == node_id)?;
        siblings.get(position + 1).copied()
    }

    /// A tree is considered rooted when its root is bifurcating.
    pub fn is_rooted(&self) -> bool {
        self.root()
            .map(|root| root.children.len() == 2)
            .unwrap_or(false)
    }

    /// Hide the subtree below `node_id`; the node becomes a leaf.
    pub fn collapse(&mut self, node_id: NodeId) -> Result<Vec<NodeId>> {
        if node_id >= self.nodes.len() {
            return Err(LayoutError::NodeOutOfRange { node: node_id });
        }
        let hidden = self.descendants(node_id);
        self.nodes[node_id].children.clear();
        Ok(hidden)
    }

    pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
        self.nodes.iter().position(|node| node.label == label)
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.and_then(|id| self.nodes.get(id))
    }

    /// Number of leaves reachable from the root.
    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    fn build_nodes_from_phylo(phylo: &PhyloTree) -> Vec<TreeNode> {
        let mut nodes = Vec::with_capacity(phylo.size());
        for idx in 0..phylo.size() {
            match phylo.get(&idx) {
                Ok(node) => nodes.push(TreeNode::from_phylo(node)),
                Err(_) => nodes.push(TreeNode::new(idx, None, None)),
            }
        }
        nodes
    }
}

/// Node within a phylogenetic tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: Option<String>,
    pub label: String,
    pub length: Option<f64>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl TreeNode {
    pub fn new(id: NodeId, name: Option<String>, length: Option<f64>) -> Self {
        Self {
            id,
            name,
            label: String::new(),
            length,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn from_phylo(node: &PhyloNode) -> Self {
        let mut tree_node = TreeNode::new(node.id, node.name.clone(), node.parent_edge);
        tree_node.parent = node.parent;
        tree_node.children = node.children.clone();
        tree_node
    }
}

/// Container for the full contents of an imported file.
#[derive(Debug, Clone)]
pub struct TreeBundle {
    pub format: TreeFileFormat,
    pub trees: Vec<Tree>,
}

impl TreeBundle {
    pub fn new(format: TreeFileFormat, trees: Vec<Tree>) -> Self {
        Self { format, trees }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TreeFileFormat {
    Newick,
    Nexus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId, parent: Option<NodeId>, children: Vec<NodeId>) -> TreeNode {
        let mut node = TreeNode::new(id, Some(format!("n{id}")), Some(1.0));
        node.parent = parent;
        node.children = children;
        node
    }

    #[test]
    fn labels_internal_nodes_in_preorder() {
        let tree = Tree::from_newick("((A:1,B:1):1,C:1);").unwrap();
        let root = tree.root.unwrap();
        assert_eq!(tree.nodes[root].label, "Int_0");

        let inner = tree.first_child(root).unwrap();
        assert_eq!(tree.nodes[inner].label, "Int_1");

        let labels: Vec<&str> = tree
            .leaves()
            .into_iter()
            .map(|id| tree.nodes[id].label.as_str())
            .collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn postorder_visits_children_first() {
        let tree = Tree::from_newick("((A:1,B:1):1,(C:1,D:1):1);").unwrap();
        let order = tree.postorder();
        assert_eq!(order.len(), tree.nodes.len());

        let position: Vec<usize> = {
            let mut position = vec![0; tree.nodes.len()];
            for (index, &id) in order.iter().enumerate() {
                position[id] = index;
            }
            position
        };
        for node in &tree.nodes {
            for &child in &node.children {
                assert!(position[child] < position[node.id]);
            }
        }
        assert_eq!(*order.last().unwrap(), tree.root.unwrap());
    }

    #[test]
    fn sibling_chain_and_extreme_children() {
        let tree = Tree::from_newick("(A:1,B:1,C:1);").unwrap();
        let root = tree.root.unwrap();
        let first = tree.first_child(root).unwrap();
        let second = tree.next_sibling(first).unwrap();
        let third = tree.next_sibling(second).unwrap();
        assert_eq!(tree.last_child(root), Some(third));
        assert_eq!(tree.next_sibling(third), None);
        assert!(!tree.is_rooted());
    }

    #[test]
    fn bifurcating_root_is_rooted() {
        let tree = Tree::from_newick("((A:1,B:1):1,C:1);").unwrap();
        assert!(tree.is_rooted());
    }

    #[test]
    fn collapse_turns_node_into_leaf() {
        let mut tree = Tree::from_newick("((A:1,B:1):1,C:1);").unwrap();
        let inner = tree.find_by_label("Int_1").unwrap();
        let hidden = tree.collapse(inner).unwrap();
        assert_eq!(hidden.len(), 2);
        assert!(tree.nodes[inner].is_leaf());
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn rejects_child_without_back_reference() {
        let nodes = vec![
            node(0, None, vec![1, 2]),
            node(1, Some(0), vec![]),
            node(2, None, vec![]),
        ];
        let err = Tree::from_nodes(0, nodes).unwrap_err();
        assert!(matches!(err, LayoutError::MalformedTree { .. }));
    }

    #[test]
    fn rejects_cycles() {
        let nodes = vec![node(0, None, vec![1]), node(1, Some(0), vec![0])];
        assert!(Tree::from_nodes(0, nodes).is_err());
    }
}
