use crate::engine::LayoutModel;
use crate::tree::{Tree, TreeBundle};

/// Print a short text summary of a computed layout.
pub fn render_preview(bundle: &TreeBundle, tree: &Tree, model: &LayoutModel) {
    println!(
        "Loaded {:?} file with {} tree(s).",
        bundle.format,
        bundle.trees.len()
    );

    let preview = if tree.newick.len() > 64 {
        let cut = (0..=64)
            .rev()
            .find(|&index| tree.newick.is_char_boundary(index))
            .unwrap_or(0);
        format!("{}...", &tree.newick[..cut])
    } else {
        tree.newick.clone()
    };
    match &tree.label {
        Some(label) => println!("- {} => {}", label, preview),
        None => println!("- tree #{} => {}", tree.id + 1, preview),
    }

    println!(
        "Laid out {} leaves as a {:?} (max path length {:.4}, {} collapsed).",
        model.layout.leaf_count(),
        model.layout_type,
        model.layout.max_path_length,
        model.layout.envelopes.len()
    );

    for layer in model.layers.iter() {
        let [start, end] = model
            .boundaries
            .get(layer.order)
            .unwrap_or_default();
        let font = model
            .boundaries
            .fonts
            .get(&layer.order)
            .map(|font| format!(", font {font:.1}px"))
            .unwrap_or_default();
        println!(
            "  layer {} `{}` ({:?}): {:.1} -> {:.1}{}",
            layer.order, layer.name, layer.kind, start, end, font
        );
    }

    println!(
        "Layers span {:.1} -> {:.1}; {} scene primitive(s).",
        model.beginning_of_layers,
        model.total_radius,
        model.scene.len()
    );
}
