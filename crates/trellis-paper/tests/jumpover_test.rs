use serde_json::json;
use trellis_graph::{Cell, CellId, ConnectorRef, EndRef, Graph};
use trellis_geom::point;
use trellis_paper::{Paper, PaperOptions};

fn segment(id: &str, from: (f64, f64), to: (f64, f64)) -> Cell {
    Cell::link(id)
        .with_source(EndRef::point(from.0, from.1))
        .with_target(EndRef::point(to.0, to.1))
}

fn jumpover(args: serde_json::Value) -> ConnectorRef {
    ConnectorRef::new("jumpover").with_args(args)
}

fn rect(id: &str, x: f64, y: f64) -> Cell {
    Cell::element(id).with_position(x, y).with_size(10.0, 10.0)
}

fn path(paper: &Paper, id: &str) -> String {
    let root = paper.find_view_by_model(id).expect("view").root();
    let node = paper.dom().first_child(root).expect("connection");
    paper.dom().attr(node, "d").unwrap_or_default().to_string()
}

fn has_jump(d: &str) -> bool {
    d.contains('C') || d.matches('M').count() > 1
}

#[test]
fn the_upper_link_gaps_over_the_lower_one() {
    let mut graph = Graph::new();
    let gap = json!({ "jump": "gap", "size": 5 });
    graph
        .add_cells([
            segment("B", (50.0, -50.0), (50.0, 50.0))
                .with_z(0)
                .with_connector(jumpover(gap.clone())),
            segment("A", (0.0, 0.0), (100.0, 0.0))
                .with_z(1)
                .with_connector(jumpover(gap)),
        ])
        .unwrap();
    let paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    assert_eq!(path(&paper, "A"), "M 0 0 L 45 0 M 55 0 L 100 0");
    assert_eq!(path(&paper, "B"), "M 50 -50 L 50 50");
}

#[test]
fn exactly_one_of_two_crossing_links_jumps() {
    let mut graph = Graph::new();
    graph
        .add_cells([
            segment("B", (50.0, -50.0), (50.0, 50.0)).with_connector(jumpover(json!({}))),
            segment("A", (0.0, 0.0), (100.0, 0.0)).with_connector(jumpover(json!({}))),
        ])
        .unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    assert_eq!(
        path(&paper, "A"),
        "M 0 0 L 45 0 C 45 -3.333 46.667 -5 50 -5 C 53.333 -5 55 -3.333 55 0 L 100 0"
    );
    assert!(!has_jump(&path(&paper, "B")));

    // Bringing B to the front swaps the roles once the batch closes.
    graph.to_front("B").unwrap();
    paper.sync(&graph);
    assert!(has_jump(&path(&paper, "B")));
    assert_eq!(path(&paper, "A"), "M 0 0 L 100 0");
}

#[test]
fn a_link_bending_on_this_line_is_jumped_once() {
    let mut graph = Graph::new();
    graph
        .add_cells([
            segment("B", (50.0, -50.0), (50.0, 50.0))
                .with_vertices(&[point(50.0, 0.0)])
                .with_z(0),
            segment("A", (0.0, 0.0), (100.0, 0.0))
                .with_z(1)
                .with_connector(jumpover(json!({}))),
        ])
        .unwrap();
    let paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    let d = path(&paper, "A");
    assert_eq!(d.matches('C').count(), 2);
    assert_eq!(
        d,
        "M 0 0 L 45 0 C 45 -3.333 46.667 -5 50 -5 C 53.333 -5 55 -3.333 55 0 L 100 0"
    );
}

#[test]
fn a_lone_link_draws_its_plain_polyline() {
    let mut graph = Graph::new();
    graph
        .add_cell(
            segment("A", (0.0, 0.0), (100.0, 100.0))
                .with_vertices(&[point(100.0, 0.0)])
                .with_connector(jumpover(json!({ "jump": "cubic" }))),
        )
        .unwrap();
    let paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    assert_eq!(path(&paper, "A"), "M 0 0 L 100 0 L 100 100");
}

#[test]
fn corners_are_rounded_with_a_radius() {
    let mut graph = Graph::new();
    graph
        .add_cell(
            segment("A", (0.0, 0.0), (100.0, 100.0))
                .with_vertices(&[point(100.0, 0.0)])
                .with_connector(jumpover(json!({ "radius": 10 }))),
        )
        .unwrap();
    let paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    assert_eq!(
        path(&paper, "A"),
        "M 0 0 L 90 0 C 96.667 0 100 3.333 100 10 L 100 100"
    );
}

#[test]
fn ignored_connectors_are_not_jumped_but_others_are() {
    let mut graph = Graph::new();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    graph
        .add_cells([
            segment("smooth", (30.0, -50.0), (30.0, 50.0))
                .with_connector(ConnectorRef::new("smooth")),
            segment("A", (0.0, 0.0), (100.0, 0.0))
                .with_connector(jumpover(json!({ "jump": "gap" }))),
            // Above A and rendered after it, but plain links are always jumped.
            segment("straight", (70.0, -50.0), (70.0, 50.0)),
        ])
        .unwrap();
    paper.sync(&graph);
    assert_eq!(path(&paper, "A"), "M 0 0 L 65 0 M 75 0 L 100 0");
}

#[test]
fn jumps_are_recomputed_when_the_outermost_batch_closes() {
    let mut graph = Graph::new();
    let arc = jumpover(json!({}));
    graph
        .add_cells([
            rect("e1", 0.0, 0.0),
            rect("e2", 100.0, 0.0),
            rect("e3", 200.0, -50.0),
            rect("e4", 200.0, 50.0),
            Cell::link("B")
                .with_source(EndRef::cell("e3"))
                .with_target(EndRef::cell("e4"))
                .with_connector(arc.clone()),
            Cell::link("A")
                .with_source(EndRef::cell("e1"))
                .with_target(EndRef::cell("e2"))
                .with_connector(arc),
        ])
        .unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    assert_eq!(path(&paper, "A"), "M 5 5 L 105 5");

    graph.start_batch("move");
    graph.set_position("e3", 50.0, -50.0).unwrap();
    graph.set_position("e4", 50.0, 50.0).unwrap();
    paper.sync(&graph);
    // B followed its ends right away; A is only refreshed at the end of the batch.
    assert_eq!(path(&paper, "B"), "M 55 -45 L 55 55");
    assert_eq!(path(&paper, "A"), "M 5 5 L 105 5");

    graph.stop_batch("move");
    paper.sync(&graph);
    assert!(path(&paper, "A").starts_with("M 5 5 L 50 5 C"));
    assert!(path(&paper, "A").ends_with("L 105 5"));
}

#[test]
fn the_registry_follows_connector_changes_removals_and_resets() {
    let mut graph = Graph::new();
    graph
        .add_cells([
            segment("B", (50.0, -50.0), (50.0, 50.0)).with_connector(jumpover(json!({}))),
            segment("A", (0.0, 0.0), (100.0, 0.0)).with_connector(jumpover(json!({}))),
        ])
        .unwrap();
    let mut paper = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    let ids: Vec<&str> = paper.jumpover().ids().map(CellId::as_str).collect();
    assert_eq!(ids, vec!["B", "A"]);

    graph
        .set_connector("A", Some(ConnectorRef::new("normal")))
        .unwrap();
    paper.sync(&graph);
    assert!(!paper.jumpover().contains(&CellId::new("A")));
    assert_eq!(path(&paper, "A"), "M 0 0 L 100 0");

    graph.remove_cell("B").unwrap();
    paper.sync(&graph);
    assert!(paper.jumpover().is_empty());

    graph
        .reset_cells([
            segment("x", (0.0, 10.0), (10.0, 10.0)).with_connector(jumpover(json!({}))),
            segment("y", (0.0, 20.0), (10.0, 20.0)).with_connector(jumpover(json!({}))),
        ])
        .unwrap();
    paper.sync(&graph);
    assert_eq!(paper.jumpover().len(), 2);
}

#[test]
fn each_paper_keeps_its_own_registry() {
    let mut graph = Graph::new();
    graph
        .add_cell(segment("A", (0.0, 0.0), (1.0, 0.0)).with_connector(jumpover(json!({}))))
        .unwrap();
    let mut first = Paper::new(&mut graph, PaperOptions::default()).unwrap();
    let second = Paper::new(&mut graph, PaperOptions::default()).unwrap();

    graph.remove_cell("A").unwrap();
    first.sync(&graph);
    assert!(first.jumpover().is_empty());
    assert_eq!(second.jumpover().len(), 1);
}
