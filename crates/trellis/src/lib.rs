#![forbid(unsafe_code)]

//! `trellis` is a headless diagram toolkit.
//!
//! A [`Graph`] owns the cells and emits change events; a paper renders the graph into an
//! in-memory SVG tree and keeps it current through a priority-ordered, batch-aware update
//! queue. Any number of papers may observe the same graph.
//!
//! # Features
//!
//! - `paper`: enable views and rendering (`trellis::paper`)

pub use trellis_graph::*;

/// Plane geometry shared by the model and the connectors.
pub mod geom {
    pub use trellis_geom::*;
}

#[cfg(feature = "paper")]
pub mod paper {
    use std::cell::RefCell;
    use std::rc::Rc;

    use trellis_graph::{CellId, Graph};

    pub use trellis_paper::*;

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Model(#[from] trellis_graph::Error),
        #[error(transparent)]
        Paper(#[from] trellis_paper::Error),
        #[error("view of cell `{id}` failed to render: {message}")]
        View { id: CellId, message: String },
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Renders a graph given as JSON (`{"cells": [...]}`) to an SVG document.
    pub fn render_svg(graph_json: &str, options: PaperOptions) -> Result<String> {
        let mut graph = Graph::from_json_str(graph_json)?;
        render_graph_svg(&mut graph, options)
    }

    /// Renders `graph` once to an SVG document.
    ///
    /// `options.frozen` is ignored: the one-shot paper renders immediately. The first view that
    /// fails to update turns into [`HeadlessError::View`].
    pub fn render_graph_svg(graph: &mut Graph, options: PaperOptions) -> Result<String> {
        let failures: Rc<RefCell<Vec<(CellId, String)>>> = Rc::default();
        let sink = Rc::clone(&failures);
        let hooks = PaperHooks {
            on_view_error: Some(Box::new(move |id: &CellId, err: &trellis_paper::Error| {
                sink.borrow_mut().push((id.clone(), err.to_string()));
            })),
            ..PaperHooks::default()
        };
        let paper = Paper::with_hooks(graph, options.frozen(false), hooks)?;
        tracing::debug!(views = paper.view_ids().count(), "rendered graph");

        if let Some((id, message)) = failures.take().into_iter().next() {
            return Err(HeadlessError::View { id, message });
        }
        Ok(paper.to_svg())
    }

}
