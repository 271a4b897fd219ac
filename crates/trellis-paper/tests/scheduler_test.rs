use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use trellis_graph::{Cell, CellId, ConnectorRef, EndRef, Graph, batch};
use trellis_paper::{
    Error, Paper, PaperHooks, PaperOptions, Sorting, UnfreezeOptions, UpdateFlag, UpdateOptions,
};

fn rect(id: &str, x: f64, y: f64) -> Cell {
    Cell::element(id).with_position(x, y).with_size(10.0, 10.0)
}

fn link(id: &str, source: &str, target: &str) -> Cell {
    Cell::link(id)
        .with_source(EndRef::cell(source))
        .with_target(EndRef::cell(target))
}

fn sample_graph() -> Graph {
    let mut graph = Graph::new();
    graph
        .add_cells([
            rect("a", 0.0, 0.0).with_attr("attrs", json!({ "body": { "fill": "red" } })),
            rect("b", 100.0, 0.0),
            link("l", "a", "b"),
        ])
        .unwrap();
    graph
}

fn cell_order(paper: &Paper, layer: &str) -> Vec<String> {
    let dom = paper.dom();
    let group = paper.layer_node(layer).expect("layer exists");
    dom.children(group)
        .iter()
        .filter_map(|n| dom.attr(*n, "model-id"))
        .map(str::to_string)
        .collect()
}

fn graph_order(graph: &Graph) -> Vec<String> {
    graph.cells().iter().map(|c| c.id().to_string()).collect()
}

fn link_path(paper: &Paper, id: &str) -> Option<String> {
    let root = paper.find_view_by_model(id)?.root();
    let path = paper.dom().first_child(root)?;
    paper.dom().attr(path, "d").map(str::to_string)
}

#[test]
fn views_are_rendered_for_existing_cells() {
    let mut graph = sample_graph();
    let paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    assert_eq!(paper.view_ids().count(), 3);
    assert_eq!(cell_order(&paper, "cells"), vec!["a", "b", "l"]);
    assert_eq!(link_path(&paper, "l").as_deref(), Some("M 5 5 L 105 5"));

    let a = paper.find_view_by_model("a").unwrap().root();
    let body = paper.dom().first_child(a).unwrap();
    assert_eq!(paper.dom().attr(body, "fill"), Some("red"));
    assert_eq!(paper.dom().attr(a, "transform"), Some("translate(0,0)"));
    assert!(!paper.has_scheduled_updates());
    assert!(paper.to_svg().starts_with("<svg"));
}

#[test]
fn flushing_again_without_model_changes_leaves_the_tree_untouched() {
    let mut graph = sample_graph();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    let svg = paper.to_svg();
    let revision = paper.dom().revision();

    for id in ["a", "b", "l"] {
        assert!(paper.request_view_update(
            &graph,
            &CellId::new(id),
            UpdateFlag::Render | UpdateFlag::Update,
            None,
            UpdateOptions::default(),
        ));
    }
    paper.update_views(&graph);

    assert!(!paper.has_scheduled_updates());
    assert_eq!(paper.dom().revision(), revision);
    assert_eq!(paper.to_svg(), svg);
}

#[test]
fn exact_layers_follow_the_graph_order_after_every_resort() {
    let mut graph = Graph::new();
    graph
        .add_cells((0..6i64).map(|i| rect(&format!("e{i}"), 0.0, 0.0).with_z(i % 3)))
        .unwrap();
    let opts = PaperOptions::default().with_sorting(Sorting::Exact);
    let mut paper = Paper::new(&mut graph, opts).unwrap();
    assert_eq!(cell_order(&paper, "cells"), graph_order(&graph));

    for (id, z) in [("e0", 5), ("e4", -1), ("e2", 0), ("e5", 5), ("e1", 2), ("e3", 5)] {
        graph.set_z(id, z).unwrap();
        paper.sync(&graph);
        assert_eq!(
            cell_order(&paper, "cells"),
            graph_order(&graph),
            "after moving {id} to z {z}"
        );
    }

    graph.to_back("e5").unwrap();
    graph.add_cell(rect("late", 0.0, 0.0).with_z(0)).unwrap();
    paper.sync(&graph);
    assert_eq!(cell_order(&paper, "cells"), graph_order(&graph));
}

#[test]
fn z_changes_inside_one_batch_resort_once() {
    let mut graph = Graph::new();
    graph
        .add_cells((0..5).map(|i| rect(&format!("e{i}"), 0.0, 0.0)))
        .unwrap();
    let opts = PaperOptions::default().with_sorting(Sorting::Exact);
    let mut paper = Paper::new(&mut graph, opts).unwrap();

    let before = paper.exact_sort_count();
    graph.batch(batch::TO_FRONT, |g| {
        for (i, id) in ["e3", "e1", "e0"].into_iter().enumerate() {
            g.set_z(id, 10 + i as i64).unwrap();
        }
        // A nested sort-delaying batch closing early does not resort either.
        g.batch(batch::ADD, |g| g.set_z("e2", 20).unwrap());
    });
    paper.sync(&graph);
    assert_eq!(paper.exact_sort_count(), before + 1);
    assert_eq!(cell_order(&paper, "cells"), graph_order(&graph));

    let before = paper.exact_sort_count();
    for id in ["e4", "e3"] {
        graph.set_z(id, -5).unwrap();
    }
    paper.sync(&graph);
    assert_eq!(paper.exact_sort_count(), before + 2);
}

#[test]
fn a_frozen_paper_defers_every_mutation_until_unfreeze() {
    let mut graph = Graph::new();
    graph.add_cell(rect("a", 0.0, 0.0).with_z(1)).unwrap();
    let exact = PaperOptions::default().with_sorting(Sorting::Exact);
    let mut frozen = Paper::new(&mut graph, exact.clone().frozen(true)).unwrap();
    let mut live = Paper::new(&mut graph, exact).unwrap();
    let revision = frozen.dom().revision();

    graph
        .add_cells([rect("b", 50.0, 50.0).with_z(0), rect("c", 80.0, 0.0).with_z(3)])
        .unwrap();
    graph.add_cell(link("l", "a", "b").with_z(2)).unwrap();
    graph.set_position("a", 20.0, 30.0).unwrap();
    graph.set_z("c", -1).unwrap();
    graph
        .set("b", "attrs", json!({ "body": { "stroke": "blue" } }))
        .unwrap();
    frozen.sync(&graph);
    live.sync(&graph);

    assert!(frozen.is_frozen());
    assert!(frozen.has_scheduled_updates());
    assert_eq!(frozen.dom().revision(), revision);

    frozen.unfreeze(&graph, UnfreezeOptions::new());
    assert!(!frozen.is_frozen());
    assert!(!frozen.has_scheduled_updates());
    assert_ne!(frozen.dom().revision(), revision);
    assert_eq!(frozen.to_svg(), live.to_svg());
}

#[test]
fn keyed_freezes_only_thaw_with_their_key() {
    let mut graph = sample_graph();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    paper.freeze(Some("drag"));
    paper.freeze(Some("other"));
    paper.unfreeze(&graph, UnfreezeOptions::new().key("other"));
    assert!(paper.is_frozen());
    paper.unfreeze(&graph, UnfreezeOptions::new().key("drag"));
    assert!(!paper.is_frozen());

    // Freezing by key an already frozen paper keeps it frozen after the keyed thaw.
    paper.freeze(None);
    paper.freeze(Some("drag"));
    paper.unfreeze(&graph, UnfreezeOptions::new().key("drag"));
    assert!(paper.is_frozen());
    paper.unfreeze(&graph, UnfreezeOptions::new());
    assert!(!paper.is_frozen());
}

#[test]
fn chunked_unfreeze_reports_progress_until_done() {
    let mut graph = Graph::new();
    graph
        .add_cells([
            rect("a", 0.0, 0.0),
            rect("b", 40.0, 0.0),
            rect("c", 80.0, 0.0),
            link("ab", "a", "b"),
            link("bc", "b", "c"),
        ])
        .unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default().frozen(true)).unwrap();

    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    paper.unfreeze(
        &graph,
        UnfreezeOptions::new()
            .batch_size(2)
            .progress(move |done, current, total| sink.borrow_mut().push((done, current, total))),
    );
    assert!(paper.is_frozen());
    assert!(calls.borrow().is_empty());

    assert!(paper.tick(&graph));
    assert!(paper.is_frozen());
    paper.run_until_idle(&graph);
    assert!(!paper.is_frozen());
    assert!(!paper.tick(&graph));

    assert_eq!(
        *calls.borrow(),
        vec![(false, 2, 5), (false, 4, 5), (true, 5, 5)]
    );
    assert_eq!(link_path(&paper, "bc").as_deref(), Some("M 45 5 L 85 5"));
}

#[test]
fn freezing_cancels_a_chunked_unfreeze() {
    let mut graph = Graph::new();
    graph
        .add_cells([
            rect("a", 0.0, 0.0),
            rect("b", 40.0, 0.0),
            rect("c", 80.0, 0.0),
            link("ab", "a", "b"),
            link("bc", "b", "c"),
        ])
        .unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default().frozen(true)).unwrap();
    paper.unfreeze(&graph, UnfreezeOptions::new().batch_size(2));
    assert!(paper.tick(&graph));

    paper.freeze(None);
    assert!(!paper.tick(&graph));
    assert!(paper.is_frozen());
    assert!(paper.has_scheduled_updates());
    assert_eq!(link_path(&paper, "bc"), None);

    paper.unfreeze(&graph, UnfreezeOptions::new());
    assert!(!paper.has_scheduled_updates());
    assert_eq!(link_path(&paper, "bc").as_deref(), Some("M 45 5 L 85 5"));
}

#[test]
fn cells_added_during_a_chunked_unfreeze_join_the_running_flush() {
    let mut graph = Graph::new();
    graph
        .add_cells([rect("a", 0.0, 0.0), rect("b", 20.0, 0.0), rect("c", 40.0, 0.0)])
        .unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default().frozen(true)).unwrap();

    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    paper.unfreeze(
        &graph,
        UnfreezeOptions::new()
            .batch_size(1)
            .progress(move |done, current, total| sink.borrow_mut().push((done, current, total))),
    );
    assert!(paper.tick(&graph));

    graph
        .add_cells([rect("d", 60.0, 0.0), rect("e", 80.0, 0.0)])
        .unwrap();
    paper.sync(&graph);
    assert!(paper.is_frozen());
    paper.run_until_idle(&graph);

    assert!(!paper.is_frozen());
    assert!(!paper.has_scheduled_updates());
    let calls = calls.borrow();
    assert_eq!(calls.first(), Some(&(false, 1, 3)));
    assert_eq!(calls.last(), Some(&(true, 5, 5)));
    assert_eq!(calls.iter().filter(|(done, _, _)| *done).count(), 1);
    assert_eq!(cell_order(&paper, "cells"), vec!["a", "b", "c", "d", "e"]);
}

#[test]
fn graph_reset_during_a_chunked_unfreeze_restarts_the_count() {
    let mut graph = Graph::new();
    graph
        .add_cells([rect("a", 0.0, 0.0), rect("b", 20.0, 0.0), rect("c", 40.0, 0.0)])
        .unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default().frozen(true)).unwrap();

    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    paper.unfreeze(
        &graph,
        UnfreezeOptions::new()
            .batch_size(1)
            .progress(move |done, current, total| sink.borrow_mut().push((done, current, total))),
    );
    assert!(paper.tick(&graph));

    graph
        .reset_cells([rect("x", 0.0, 0.0), rect("y", 20.0, 0.0)])
        .unwrap();
    paper.sync(&graph);
    paper.run_until_idle(&graph);

    assert!(!paper.is_frozen());
    assert!(!paper.has_scheduled_updates());
    assert_eq!(calls.borrow().last(), Some(&(true, 3, 3)));
    assert_eq!(cell_order(&paper, "cells"), vec!["x", "y"]);
}

#[test]
fn chunked_unfreeze_with_nothing_pending_finishes_on_the_first_tick() {
    let mut graph = Graph::new();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    paper.freeze(None);
    paper.unfreeze(
        &graph,
        UnfreezeOptions::new()
            .batch_size(10)
            .progress(move |done, current, total| sink.borrow_mut().push((done, current, total))),
    );
    assert!(!paper.tick(&graph));
    assert_eq!(*calls.borrow(), vec![(true, 0, 0)]);
    assert!(!paper.is_frozen());
}

#[test]
fn updates_of_removed_models_are_dropped() {
    let mut graph = Graph::new();
    graph
        .add_cells([rect("a", 0.0, 0.0), rect("b", 20.0, 0.0)])
        .unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    paper.freeze(None);

    graph.set_position("a", 5.0, 5.0).unwrap();
    paper.sync(&graph);
    assert!(paper.has_scheduled_updates());

    // The removal is not synced yet; the queued update now targets a stale view.
    graph.remove_cell("a").unwrap();
    let stats = paper.update_views(&graph);
    assert!(stats.errors.is_empty());
    assert!(!paper.has_scheduled_updates());

    paper.sync(&graph);
    paper.unfreeze(&graph, UnfreezeOptions::new());
    assert!(paper.find_view_by_model("a").is_none());
    assert_eq!(cell_order(&paper, "cells"), vec!["b"]);
}

#[test]
fn failing_views_are_reported_and_the_flush_goes_on() {
    let mut graph = Graph::new();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    let failed = Rc::new(RefCell::new(Vec::new()));
    let recorded = Rc::new(RefCell::new(0));
    let (failed_sink, recorded_sink) = (Rc::clone(&failed), Rc::clone(&recorded));
    paper.set_hooks(PaperHooks {
        on_view_error: Some(Box::new(move |id: &CellId, err: &Error| {
            assert!(matches!(err, Error::UnknownConnector { .. }));
            failed_sink.borrow_mut().push(id.to_string());
        })),
        after_render: Some(Box::new(move |stats: &trellis_paper::RenderStats| {
            *recorded_sink.borrow_mut() += stats.errors.len();
        })),
        ..PaperHooks::default()
    });

    graph
        .add_cells([
            rect("a", 0.0, 0.0),
            rect("b", 100.0, 0.0),
            link("broken", "a", "b").with_connector(ConnectorRef::new("bogus")),
            link("fine", "b", "a"),
        ])
        .unwrap();
    paper.sync(&graph);

    assert_eq!(*failed.borrow(), vec!["broken"]);
    assert_eq!(*recorded.borrow(), 1);
    assert!(!paper.has_scheduled_updates());
    assert_eq!(link_path(&paper, "fine").as_deref(), Some("M 105 5 L 5 5"));
    assert_eq!(link_path(&paper, "broken"), None);
}

#[test]
fn moving_an_element_updates_its_links() {
    let mut graph = sample_graph();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    graph.set_position("a", 0.0, 50.0).unwrap();
    paper.sync(&graph);
    assert_eq!(link_path(&paper, "l").as_deref(), Some("M 5 55 L 105 5"));

    // Isolated requests stay on the view itself.
    assert!(paper.request_view_update(
        &graph,
        &CellId::new("b"),
        UpdateFlag::Translate.into(),
        None,
        UpdateOptions::isolated(),
    ));
    assert!(!paper.has_scheduled_updates());
}

#[test]
fn translate_batches_hold_back_the_flush() {
    let mut graph = sample_graph();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    graph.start_batch(batch::TRANSLATE);
    graph.set_position("b", 100.0, 100.0).unwrap();
    paper.sync(&graph);
    assert!(paper.has_scheduled_updates());
    assert_eq!(link_path(&paper, "l").as_deref(), Some("M 5 5 L 105 5"));

    graph.stop_batch(batch::TRANSLATE);
    paper.sync(&graph);
    assert!(!paper.has_scheduled_updates());
    assert_eq!(link_path(&paper, "l").as_deref(), Some("M 5 5 L 105 105"));
}

#[test]
fn require_view_flushes_a_single_view_while_frozen() {
    let mut graph = Graph::new();
    let mut paper = Paper::new(&mut graph, PaperOptions::default().frozen(true)).unwrap();
    graph
        .add_cells([rect("a", 0.0, 0.0), rect("b", 10.0, 0.0)])
        .unwrap();
    paper.sync(&graph);

    let id = CellId::new("a");
    assert!(!paper.pending_flags(&id).is_empty());
    let root = paper.require_view(&graph, &id).unwrap().unwrap().root();
    assert_eq!(paper.dom().attr(root, "model-id"), Some("a"));
    assert!(paper.pending_flags(&id).is_empty());
    assert!(!paper.pending_flags(&CellId::new("b")).is_empty());
    assert!(paper.is_frozen());
}

#[test]
fn links_wait_for_their_end_views() {
    let mut graph = Graph::new();
    let mut paper = Paper::new(&mut graph, PaperOptions::default().frozen(true)).unwrap();
    graph
        .add_cells([rect("a", 0.0, 0.0), rect("b", 20.0, 0.0), link("l", "a", "b")])
        .unwrap();
    paper.sync(&graph);

    // The link is flushed before its ends are mounted and keeps its flags.
    let l = CellId::new("l");
    paper.require_view(&graph, &l).unwrap();
    assert!(paper.pending_flags(&l).contains(UpdateFlag::Render));

    paper.unfreeze(&graph, UnfreezeOptions::new());
    assert!(paper.pending_flags(&l).is_empty());
    assert_eq!(link_path(&paper, "l").as_deref(), Some("M 5 5 L 25 5"));
}

#[test]
fn papers_on_one_graph_are_independent() {
    let mut graph = sample_graph();
    let mut first = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    let mut second = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    second.freeze(None);

    graph.set_size("b", 30.0, 30.0).unwrap();
    first.sync(&graph);
    second.sync(&graph);

    assert!(!first.has_scheduled_updates());
    assert!(second.has_scheduled_updates());
    assert_eq!(link_path(&first, "l").as_deref(), Some("M 5 5 L 115 15"));
    assert_eq!(link_path(&second, "l").as_deref(), Some("M 5 5 L 105 5"));
}

#[test]
fn graph_reset_rebuilds_every_view() {
    let mut graph = sample_graph();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    graph
        .reset_cells([rect("x", 0.0, 0.0), rect("y", 0.0, 0.0).with_z(-1)])
        .unwrap();
    paper.sync(&graph);

    let mut ids: Vec<String> = paper.view_ids().map(|id| id.to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["x", "y"]);
    assert_eq!(cell_order(&paper, "cells"), vec!["y", "x"]);
}

#[test]
fn removed_papers_ignore_the_graph() {
    let mut graph = sample_graph();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    paper.remove();

    graph.add_cell(rect("c", 0.0, 0.0)).unwrap();
    paper.sync(&graph);
    paper.unfreeze(&graph, UnfreezeOptions::new());

    assert_eq!(paper.view_ids().count(), 0);
    assert!(paper.is_frozen());
    assert!(paper.layer_node("cells").is_none());
    assert!(!paper.to_svg().contains("<g"));
}

#[test]
fn updates_at_the_lowest_priority_are_flushed() {
    let mut graph = Graph::new();
    graph.add_cell(rect("a", 0.0, 0.0)).unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    assert!(paper.request_view_update(
        &graph,
        &CellId::new("a"),
        UpdateFlag::Resize.into(),
        Some(u8::MAX),
        UpdateOptions::default(),
    ));
    assert!(!paper.has_scheduled_updates());
}

#[test]
fn repeated_resets_reuse_tree_slots() {
    let mut graph = Graph::new();
    let cells = || (0..10_i32).map(|i| rect(&format!("n{i}"), f64::from(i) * 20.0, 0.0));
    graph.add_cells(cells()).unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    graph.reset_cells(cells()).unwrap();
    paper.sync(&graph);
    let capacity = paper.dom().capacity();
    let live = paper.dom().live_count();

    for _ in 0..100 {
        graph.reset_cells(cells()).unwrap();
        paper.sync(&graph);
    }
    assert_eq!(paper.dom().capacity(), capacity);
    assert_eq!(paper.dom().live_count(), live);
    assert_eq!(paper.view_ids().count(), 10);
}
