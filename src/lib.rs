//! Layout engine for phylogenetic trees drawn with rings or bands of per-leaf
//! annotation layers.
//!
//! [`engine::compute_layout`] runs one full layout: layer values are
//! normalized and scaled to pixel extents, the tree is placed as a phylogram
//! or circlephylogram, layer boundaries are stacked outward from the tree, and
//! the result is flattened into renderer-ready [`scene`] primitives.

pub mod app;
pub mod engine;
pub mod error;
pub mod io;
pub mod layers;
pub mod scene;
pub mod settings;
pub mod tree;
pub mod ui;

pub use engine::{compute_layout, LayoutContext, LayoutModel};
pub use error::{LayoutError, Result};
