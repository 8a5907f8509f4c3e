use std::fs;
use std::path::Path;

use phylolayers::app::{AppConfig, PhyloLayersApp};
use phylolayers::layers::table::LayerValue;
use phylolayers::settings::Settings;
use phylolayers::tree::layout::{NodeState, TreeLayoutType};
use phylolayers::{compute_layout, io, LayoutError};
use tempfile::TempDir;

const TREE: &str = "(((A:0.1,B:0.2):0.3,(C:0.4,D:0.1):0.2):0.5,(E:0.3,F:0.6):0.2);\n";

const DATA: &str = "item\t__parent__\tcoverage\tphylum\ta;b;c\n\
A\tp1\t12\tFirmicutes\t1;1;2\n\
B\tp1\t3\tFirmicutes\t0;0;0\n\
C\t\t7.5\tProteobacteria\t3;1;0\n\
D\tp2\t0\tProteobacteria\t1;2;3\n\
E\tp2\tbad\tnull\t4;4;4\n\
F\tp3\t20\tActinobacteria\t0;5;5\n";

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn load(dir: &Path) -> (phylolayers::tree::Tree, phylolayers::layers::table::LeafValueTable) {
    let bundle = io::load_trees(&dir.join("tree.nwk")).unwrap();
    let table = io::load_layer_data(&dir.join("layers.tsv")).unwrap();
    (bundle.trees.into_iter().next().unwrap(), table)
}

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "tree.nwk", TREE);
    write(&dir, "layers.tsv", DATA);
    dir
}

#[test]
fn circlephylogram_from_files() {
    let dir = fixture();
    let (tree, table) = load(dir.path());
    let mut settings = Settings {
        tree_radius: 400.0,
        angle_max: 360.0,
        ..Settings::default()
    };
    settings.fill_defaults(&table);

    let model = compute_layout(&tree, &table, &settings).unwrap();
    assert_eq!(model.layout_type, TreeLayoutType::Circlephylogram);
    assert_eq!(model.layout.leaf_count(), 6);

    let sizes: f64 = model
        .layout
        .leaf_order
        .iter()
        .map(|&id| model.layout.placements[id].size)
        .sum();
    assert!((sizes - std::f64::consts::TAU).abs() < 1e-9);

    // Boundaries stack outward with the default margin.
    let boundaries = &model.boundaries.boundaries;
    assert_eq!(boundaries.len(), 5);
    for pair in boundaries.windows(2) {
        assert!(
            (pair[1][0] - (pair[0][1] + settings.layer_margin)).abs() < 1e-9
        );
    }

    // Coverage is auto-ranged against its maximum of 20.
    let coverage = |label: &str| model.table.value(label, 2).and_then(LayerValue::as_scalar);
    assert_eq!(coverage("F"), Some(180.0));
    assert_eq!(coverage("A"), Some(12.0 * 180.0 / 20.0));
    assert_eq!(coverage("E"), Some(0.0));

    // Stack bars fill the layer height unless every segment is zero.
    let stack = |label: &str| {
        model
            .table
            .value(label, 4)
            .and_then(LayerValue::as_segments)
            .map(|segments| segments.iter().sum::<f64>())
    };
    assert!((stack("A").unwrap() - 180.0).abs() < 1e-9);
    assert_eq!(stack("B"), Some(0.0));
}

#[test]
fn phylogram_collapse_keeps_other_leaves_apart() {
    let dir = fixture();
    let (tree, table) = load(dir.path());
    let mut settings = Settings {
        tree_type: TreeLayoutType::Phylogram,
        tree_width: 500.0,
        tree_height: 300.0,
        collapsed_nodes: vec!["Int_2".into()],
        ..Settings::default()
    };
    settings.fill_defaults(&table);

    let model = compute_layout(&tree, &table, &settings).unwrap();
    assert_eq!(model.layout.leaf_count(), 5);

    let collapsed = tree.find_by_label("Int_2").unwrap();
    let placement = &model.layout.placements[collapsed];
    assert!(placement.collapsed);
    assert!(placement.max_child_x.unwrap() > placement.xy.x);
    for hidden in tree.descendants(collapsed) {
        assert_eq!(model.layout.placements[hidden].state, NodeState::Hidden);
    }

    let ys: Vec<f64> = model
        .layout
        .leaf_order
        .iter()
        .map(|&id| model.layout.placements[id].xy.y)
        .collect();
    assert_eq!(ys, vec![0.0, 75.0, 150.0, 225.0, 300.0]);
    assert!(model.table.row("Int_2").unwrap().synthetic);
}

#[test]
fn unknown_layer_fails_the_whole_layout() {
    let dir = fixture();
    let (tree, table) = load(dir.path());
    let mut settings = Settings::default();
    settings.fill_defaults(&table);
    settings.layer_order.push(12);

    let err = compute_layout(&tree, &table, &settings).unwrap_err();
    assert!(matches!(err, LayoutError::MissingAttribute { layer: 12, .. }));
}

#[test]
fn settings_file_round_trips_through_the_loader() {
    let dir = fixture();
    let path = write(
        &dir,
        "settings.json",
        r#"{
            "tree-type": "phylogram",
            "tree-width": 250,
            "layer-margin": 5,
            "collapsed-nodes": ["Int_1"]
        }"#,
    );
    let settings = io::load_settings(Some(&path)).unwrap();
    assert_eq!(settings.tree_type, TreeLayoutType::Phylogram);
    assert_eq!(settings.width(), 250.0);
    assert_eq!(settings.layer_margin, 5.0);
    assert_eq!(settings.collapsed_nodes, vec!["Int_1".to_string()]);
}

#[test]
fn settings_file_with_empty_layer_entries_is_rejected() {
    let dir = fixture();
    let (tree, table) = load(dir.path());
    let path = write(
        &dir,
        "settings.json",
        r#"{"layer-order": [2], "views": {"default": {"2": {}}}, "layers": {"2": {}}}"#,
    );
    let settings = io::load_settings(Some(&path)).unwrap();

    let err = compute_layout(&tree, &table, &settings).unwrap_err();
    assert!(matches!(err, LayoutError::MissingAttribute { layer: 2, .. }));
    assert_eq!(err.to_string(), "layer 2 is missing attribute `height`");
}

#[test]
fn complete_settings_file_lays_out() {
    let dir = fixture();
    let (tree, table) = load(dir.path());
    let path = write(
        &dir,
        "settings.json",
        r#"{
            "layer-order": [2],
            "views": {"default": {"2": {
                "normalization": "none",
                "min": {"value": 0, "disabled": true},
                "max": {"value": 0, "disabled": true}
            }}},
            "layers": {"2": {"height": 100, "type": "bar"}}
        }"#,
    );
    let settings = io::load_settings(Some(&path)).unwrap();

    let model = compute_layout(&tree, &table, &settings).unwrap();
    assert_eq!(model.layers.len(), 1);
    let coverage = model.table.value("F", 2).and_then(LayerValue::as_scalar);
    assert_eq!(coverage, Some(100.0));
}

#[test]
fn broken_settings_file_is_reported() {
    let dir = fixture();
    let path = write(&dir, "settings.json", "{ not json");
    let err = io::load_settings(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse settings"));
}

#[test]
fn cli_writes_the_layout_as_json() {
    let dir = fixture();
    let output = dir.path().join("layout.json");
    let config = AppConfig {
        tree_path: dir.path().join("tree.nwk"),
        data: Some(dir.path().join("layers.tsv")),
        settings: None,
        tree_type: Some(TreeLayoutType::Phylogram),
        collapse: vec!["Int_4".into()],
        output: Some(output.clone()),
        quiet: true,
    };
    PhyloLayersApp::run(&config).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["layout_type"], "phylogram");
    assert_eq!(json["layout"]["leaf_order"].as_array().unwrap().len(), 5);
    assert!(!json["scene"].as_array().unwrap().is_empty());
}

#[test]
fn missing_tree_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        tree_path: dir.path().join("absent.nwk"),
        data: None,
        settings: None,
        tree_type: None,
        collapse: Vec::new(),
        output: None,
        quiet: true,
    };
    let err = PhyloLayersApp::run(&config).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read tree file"));
}
