use trellis_graph::{Cell, Graph};
use trellis_paper::{Error, Paper, PaperOptions, Sorting, UnfreezeOptions, layer_names};

fn rect(id: &str, z: i64) -> Cell {
    Cell::element(id).with_size(10.0, 10.0).with_z(z)
}

/// Children of a layer group: model ids, with pivots shown as `|`.
fn layer_content(paper: &Paper, layer: &str) -> Vec<String> {
    let dom = paper.dom();
    let group = paper.layer_node(layer).expect("layer exists");
    dom.children(group)
        .iter()
        .map(|n| match dom.attr(*n, "model-id") {
            Some(id) => id.to_string(),
            None => "|".to_string(),
        })
        .collect()
}

fn cell_ids(paper: &Paper, layer: &str) -> Vec<String> {
    layer_content(paper, layer)
        .into_iter()
        .filter(|s| s != "|")
        .collect()
}

#[test]
fn implicit_layers_are_created_in_document_order() {
    let mut graph = Graph::new();
    let paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    assert_eq!(
        paper.layer_ids(),
        vec!["grid", "back", "cells", "labels", "front", "tools"]
    );

    let dom = paper.dom();
    let groups: Vec<_> = dom.children(dom.root()).to_vec();
    let ids: Vec<&str> = groups
        .iter()
        .filter_map(|g| dom.attr(*g, "layer-id"))
        .collect();
    assert_eq!(ids, paper.layer_ids());
}

#[test]
fn the_grid_is_drawn_only_when_enabled() {
    let mut graph = Graph::new();
    let plain = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    let grid = plain.layer_node(layer_names::GRID).unwrap();
    assert!(plain.dom().children(grid).is_empty());

    let opts = PaperOptions::from_json(serde_json::json!({ "gridSize": 10, "drawGrid": true }))
        .unwrap();
    let drawn = Paper::new(&mut graph, opts).unwrap();
    let grid = drawn.layer_node(layer_names::GRID).unwrap();
    assert!(!drawn.dom().children(grid).is_empty());
    assert!(drawn.to_svg().contains("url(#trellis-grid-pattern)"));
}

#[test]
fn approximate_layers_bucket_by_z_in_insertion_order() {
    let mut graph = Graph::new();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    assert!(!paper.is_exact_sorting());

    for (id, z) in [("a", 1), ("b", 0), ("c", 1), ("d", 2), ("e", 0)] {
        graph.add_cell(rect(id, z)).unwrap();
        paper.sync(&graph);
    }
    assert_eq!(
        layer_content(&paper, "cells"),
        vec!["b", "e", "|", "a", "c", "|", "d", "|"]
    );

    // A z change moves the node into its new bucket, opening a pivot for the new z only.
    graph.set_z("a", 3).unwrap();
    paper.sync(&graph);
    assert_eq!(
        layer_content(&paper, "cells"),
        vec!["b", "e", "|", "c", "|", "d", "|", "a", "|"]
    );
    graph.set_z("e", 2).unwrap();
    paper.sync(&graph);
    assert_eq!(cell_ids(&paper, "cells"), vec!["b", "c", "d", "e", "a"]);
}

#[test]
fn unsorted_layers_keep_insertion_order() {
    let mut graph = Graph::new();
    let opts = PaperOptions::default().with_sorting(Sorting::None);
    let mut paper = Paper::new(&mut graph, opts).unwrap();
    for (id, z) in [("a", 3), ("b", 1), ("c", 2)] {
        graph.add_cell(rect(id, z)).unwrap();
    }
    paper.sync(&graph);
    graph.set_z("a", -1).unwrap();
    paper.sync(&graph);
    assert_eq!(layer_content(&paper, "cells"), vec!["a", "b", "c"]);
}

#[test]
fn exact_sorting_is_deferred_while_frozen() {
    let mut graph = Graph::new();
    graph.add_cells([rect("a", 0), rect("b", 1)]).unwrap();
    let opts = PaperOptions::default().with_sorting(Sorting::Exact);
    let mut paper = Paper::new(&mut graph, opts).unwrap();
    let sorts = paper.exact_sort_count();

    paper.freeze(None);
    graph.set_z("a", 5).unwrap();
    paper.sync(&graph);
    assert_eq!(paper.exact_sort_count(), sorts);
    assert_eq!(cell_ids(&paper, "cells"), vec!["a", "b"]);

    paper.unfreeze(&graph, UnfreezeOptions::new());
    assert_eq!(paper.exact_sort_count(), sorts + 1);
    assert_eq!(cell_ids(&paper, "cells"), vec!["b", "a"]);
}

#[test]
fn custom_layers_hold_the_cells_that_name_them() {
    let mut graph = Graph::new();
    graph
        .add_cells([rect("a", 0), rect("b", 1).with_layer("overlay")])
        .unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    // Unknown layer names fall back to `cells`.
    assert_eq!(cell_ids(&paper, "cells"), vec!["a", "b"]);

    paper.add_layer(&graph, "overlay").unwrap();
    assert_eq!(
        paper.layer_ids(),
        vec!["grid", "back", "cells", "overlay", "labels", "front", "tools"]
    );
    assert_eq!(cell_ids(&paper, "cells"), vec!["a"]);
    assert_eq!(cell_ids(&paper, "overlay"), vec!["b"]);

    graph.add_cell(rect("c", 2).with_layer("overlay")).unwrap();
    paper.sync(&graph);
    assert_eq!(cell_ids(&paper, "overlay"), vec!["b", "c"]);

    paper.remove_layer(&graph, "overlay").unwrap();
    assert!(paper.layer_node("overlay").is_none());
    assert_eq!(cell_ids(&paper, "cells"), vec!["a", "b", "c"]);
    assert!(!paper.has_scheduled_updates());
}

#[test]
fn layer_management_errors() {
    let mut graph = Graph::new();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    assert!(matches!(
        paper.add_layer(&graph, "cells"),
        Err(Error::DuplicateLayer { .. })
    ));
    assert!(matches!(
        paper.add_layer(&graph, "grid"),
        Err(Error::DuplicateLayer { .. })
    ));
    assert!(matches!(
        paper.remove_layer(&graph, "front"),
        Err(Error::ImplicitLayer { .. })
    ));
    assert!(matches!(
        paper.remove_layer(&graph, "nope"),
        Err(Error::UnknownLayer { .. })
    ));
}

#[test]
fn layer_removal_waits_for_the_flush() {
    let mut graph = Graph::new();
    graph.add_cell(rect("a", 0).with_layer("extra")).unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    paper.add_layer(&graph, "extra").unwrap();

    paper.freeze(None);
    paper.remove_layer(&graph, "extra").unwrap();
    assert!(paper.layer_node("extra").is_some());
    assert!(paper.has_scheduled_updates());

    paper.unfreeze(&graph, UnfreezeOptions::new());
    assert!(paper.layer_node("extra").is_none());
    assert_eq!(cell_ids(&paper, "cells"), vec!["a"]);
}

#[test]
fn invalid_options_are_rejected() {
    let mut graph = Graph::new();
    let err = PaperOptions::from_json(serde_json::json!({ "gridSize": -2 })).unwrap_err();
    assert!(matches!(err, Error::InvalidOptions { .. }));

    let mut opts = PaperOptions::default();
    opts.width = -1.0;
    assert!(matches!(
        Paper::new(&mut graph, opts),
        Err(Error::InvalidOptions { .. })
    ));
}
