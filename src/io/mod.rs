use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use phylotree::tree::{NewickFormat, Tree as PhyloTree};

use crate::layers::table::LeafValueTable;
use crate::settings::Settings;
use crate::tree::{Tree, TreeBundle, TreeFileFormat};

/// Load every tree of a Newick or NEXUS file.
pub fn load_trees(path: &Path) -> Result<TreeBundle> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read tree file: {}", path.display()))?;

    let format = detect_format(&raw);
    let trees = match format {
        TreeFileFormat::Newick => parse_newick(&raw)?,
        TreeFileFormat::Nexus => parse_nexus(&raw)?,
    };

    if trees.is_empty() {
        bail!("tree file did not contain any trees");
    }

    info!(
        "loaded {} tree(s) from {} ({:?})",
        trees.len(),
        path.display(),
        format
    );
    Ok(TreeBundle::new(format, trees))
}

fn detect_format(raw: &str) -> TreeFileFormat {
    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            continue;
        }

        if trimmed.to_ascii_uppercase().starts_with("#NEXUS") {
            return TreeFileFormat::Nexus;
        }

        if trimmed.starts_with('(') || trimmed.contains('(') && trimmed.contains(')') {
            return TreeFileFormat::Newick;
        }

        let upper = trimmed.to_ascii_uppercase();
        if upper.starts_with("BEGIN ") || upper.starts_with("TREE ") {
            return TreeFileFormat::Nexus;
        }
    }

    TreeFileFormat::Newick
}

fn parse_newick(raw: &str) -> Result<Vec<Tree>> {
    let mut trees = Vec::new();

    for chunk in raw.split_inclusive(';') {
        let candidate = chunk.trim();
        if candidate.is_empty() {
            continue;
        }
        if !candidate.ends_with(';') {
            continue;
        }

        let newick = normalise_newick(candidate);
        let index = trees.len();
        let tree = build_tree(index, None, newick)?;
        trees.push(tree);
    }

    Ok(trees)
}

/// Pull the tree definitions out of a NEXUS `TREES` block. Definitions may
/// span several lines; trees that fail to parse are skipped with a warning.
fn parse_nexus(raw: &str) -> Result<Vec<Tree>> {
    let mut trees = Vec::new();
    let mut in_trees_block = false;
    let mut pending: Vec<String> = Vec::new();

    let flush = |pending: &mut Vec<String>, trees: &mut Vec<Tree>| {
        if pending.is_empty() {
            return;
        }
        let definition = pending.join(" ");
        pending.clear();

        let parsed = parse_nexus_tree_line(&definition)
            .and_then(|(label, newick)| build_tree(trees.len(), label, newick));
        match parsed {
            Ok(tree) => trees.push(tree),
            Err(err) => warn!("skipping nexus tree: {err:#}"),
        }
    };

    for line in raw.lines() {
        let line = strip_nexus_comment(line.trim());
        if line.is_empty() {
            continue;
        }

        let upper = line.to_ascii_uppercase();
        if upper.starts_with("BEGIN TREES") {
            in_trees_block = true;
            continue;
        }
        if upper.starts_with("END") {
            in_trees_block = false;
            flush(&mut pending, &mut trees);
            continue;
        }
        if !in_trees_block {
            continue;
        }

        let lower = line.to_ascii_lowercase();
        if lower.starts_with("translate") {
            continue;
        }

        if lower.starts_with("tree ") || lower.starts_with("utree ") {
            flush(&mut pending, &mut trees);
            pending.push(line.clone());
        } else if !pending.is_empty() {
            pending.push(line.clone());
        } else {
            continue;
        }

        if line.ends_with(';') {
            flush(&mut pending, &mut trees);
        }
    }

    flush(&mut pending, &mut trees);
    Ok(trees)
}

/// Drop a `[...]` comment; an unterminated one runs to the end of the line.
fn strip_nexus_comment(line: &str) -> String {
    let Some(start) = line.find('[') else {
        return line.to_owned();
    };
    match line[start..].find(']') {
        Some(end) => format!("{}{}", &line[..start], &line[start + end + 1..])
            .trim()
            .to_owned(),
        None => line[..start].trim().to_owned(),
    }
}

fn build_tree(index: usize, label: Option<String>, newick: String) -> Result<Tree> {
    let phylo = PhyloTree::from_newick(&newick)
        .map_err(|err| anyhow!("failed to parse newick tree: {err}"))?;
    let canonical_newick = phylo
        .to_formatted_newick(NewickFormat::NoComments)
        .unwrap_or_else(|_| newick.clone());

    let tree = Tree::new(index, label, canonical_newick, &phylo);
    tree.validate()
        .with_context(|| format!("tree #{} has an inconsistent topology", index + 1))?;
    Ok(tree)
}

fn parse_nexus_tree_line(line: &str) -> Result<(Option<String>, String)> {
    let tree_start = if line.to_ascii_lowercase().starts_with("tree ") {
        5
    } else if line.to_ascii_lowercase().starts_with("utree ") {
        6
    } else {
        return Err(anyhow!("Invalid tree line: {line}"));
    };

    let tree_def = &line[tree_start..].trim();

    let mut parts = tree_def.splitn(2, '=');
    let label_part = parts
        .next()
        .ok_or_else(|| anyhow!("missing tree identifier in nexus line: {line}"))?;
    let tree_part = parts
        .next()
        .ok_or_else(|| anyhow!("missing tree definition in nexus line: {line}"))?;

    // Labels may be quoted and carry a `*` rooted marker.
    let label = {
        let cleaned_label = label_part.trim().trim_start_matches('*');
        if cleaned_label.is_empty() {
            None
        } else {
            Some(
                cleaned_label
                    .trim_matches('"')
                    .trim_matches('\'')
                    .to_owned(),
            )
        }
    };

    let mut payload = tree_part.trim();

    payload = payload.trim_end_matches(';').trim();

    // Leading `[&R]`-style annotations.
    while payload.starts_with('[') {
        if let Some(end_idx) = payload.find(']') {
            payload = payload[end_idx + 1..].trim();
        } else {
            break;
        }
    }

    let newick = normalise_newick(payload);

    Ok((label, newick))
}

fn normalise_newick(raw: &str) -> String {
    let mut cleaned = raw.trim().trim_end_matches(';').trim().to_owned();
    cleaned.push(';');
    cleaned
}

/// Read a tab-separated layer data file. The first row holds the headers and
/// the first column the leaf labels.
pub fn load_layer_data(path: &Path) -> Result<LeafValueTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read layer data: {}", path.display()))?;
    let table = parse_layer_data(&raw)
        .with_context(|| format!("invalid layer data in {}", path.display()))?;
    info!(
        "loaded {} row(s) with {} layer column(s) from {}",
        table.len(),
        table.column_count().saturating_sub(1),
        path.display()
    );
    Ok(table)
}

fn parse_layer_data(raw: &str) -> Result<LeafValueTable> {
    let mut lines = raw
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty());

    let headers: Vec<String> = lines
        .next()
        .ok_or_else(|| anyhow!("layer data is empty"))?
        .split('\t')
        .map(|header| header.trim().to_owned())
        .collect();
    if headers.len() < 2 {
        bail!("layer data needs a label column and at least one layer column");
    }

    let rows: Vec<Vec<String>> = lines
        .map(|line| line.split('\t').map(str::to_owned).collect::<Vec<_>>())
        .inspect(|row| {
            if row.len() > headers.len() {
                debug!(
                    "ignoring {} extra cell(s) for {}",
                    row.len() - headers.len(),
                    row[0]
                );
            }
        })
        .collect();

    Ok(LeafValueTable::from_rows(headers, rows))
}

/// Read drawing settings from JSON. A missing file yields the defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings: {}", path.display()))
}
