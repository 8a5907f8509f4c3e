/// Per-leaf extent along the leaf axis, indexed by leaf order.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafSizes {
    pub sizes: Vec<f64>,
    pub smallest: f64,
}

impl LeafSizes {
    /// Split `total_span` so that leaf `i` gets a share proportional to
    /// `i + 1`. Later leaves are drawn wider.
    pub fn weighted(leaf_count: usize, total_span: f64) -> Self {
        let total_weight = (leaf_count * (leaf_count + 1) / 2) as f64;
        let sizes: Vec<f64> = (0..leaf_count)
            .map(|order| (order + 1) as f64 * (total_span / total_weight))
            .collect();
        Self::from_sizes(sizes)
    }

    /// Every leaf gets the same extent.
    pub fn uniform(leaf_count: usize, size: f64) -> Self {
        Self::from_sizes(vec![size; leaf_count])
    }

    fn from_sizes(sizes: Vec<f64>) -> Self {
        let smallest = sizes.iter().copied().fold(f64::INFINITY, f64::min);
        Self {
            smallest: if smallest.is_finite() { smallest } else { 0.0 },
            sizes,
        }
    }

    pub fn get(&self, order: usize) -> f64 {
        self.sizes.get(order).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.sizes.iter().sum()
    }
}
