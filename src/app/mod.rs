use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn};

use crate::engine::compute_layout;
use crate::layers::table::LeafValueTable;
use crate::tree::layout::TreeLayoutType;
use crate::{io, ui};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "phylolayers",
    about = "Lay out a phylogenetic tree with per-leaf annotation layers."
)]
pub struct AppConfig {
    /// Tree file to load (Newick or Nexus formats). The first tree is used.
    #[arg(value_name = "TREE_FILE")]
    pub tree_path: PathBuf,

    /// Tab-separated layer data; the first column holds leaf labels.
    #[arg(short, long, value_name = "TSV")]
    pub data: Option<PathBuf>,

    /// Drawing settings as JSON.
    #[arg(short, long, value_name = "JSON")]
    pub settings: Option<PathBuf>,

    /// Override the tree type from the settings file.
    #[arg(long, value_enum)]
    pub tree_type: Option<TreeLayoutType>,

    /// Collapse the node with this label (repeatable).
    #[arg(long = "collapse", value_name = "LABEL")]
    pub collapse: Vec<String>,

    /// Write the computed layout as JSON to this path.
    #[arg(short, long, value_name = "JSON")]
    pub output: Option<PathBuf>,

    /// Skip the text summary.
    #[arg(short, long)]
    pub quiet: bool,
}

pub struct PhyloLayersApp;

impl PhyloLayersApp {
    pub fn run(config: &AppConfig) -> Result<()> {
        let bundle = io::load_trees(&config.tree_path)?;
        if bundle.trees.len() > 1 {
            warn!(
                "{} contains {} trees; laying out the first one",
                config.tree_path.display(),
                bundle.trees.len()
            );
        }
        let tree = bundle
            .trees
            .first()
            .ok_or_else(|| anyhow!("tree file did not contain any trees"))?;

        let table = match &config.data {
            Some(path) => io::load_layer_data(path)?,
            None => LeafValueTable::default(),
        };

        let mut settings = io::load_settings(config.settings.as_deref())?;
        if let Some(tree_type) = config.tree_type {
            settings.tree_type = tree_type;
        }
        for label in &config.collapse {
            if !settings.collapsed_nodes.contains(label) {
                settings.collapsed_nodes.push(label.clone());
            }
        }
        if config.settings.is_none() {
            settings.fill_defaults(&table);
        }

        let model = compute_layout(tree, &table, &settings)
            .with_context(|| format!("failed to lay out {}", config.tree_path.display()))?;

        if !config.quiet {
            ui::render_preview(&bundle, tree, &model);
        }

        if let Some(dest) = &config.output {
            let json = serde_json::to_string_pretty(&model)
                .context("failed to serialise the layout")?;
            fs::write(dest, json)
                .with_context(|| format!("failed to write layout: {}", dest.display()))?;
            info!("wrote layout to {}", dest.display());
        }

        Ok(())
    }
}
