//! The paper: cell views, layer views and the prioritized update scheduler.
//!
//! A paper never mutates its graph. It subscribes to the graph's event channel and turns
//! events into pending view updates; [`Paper::sync`] drains the channel. Pending updates are
//! flushed right away unless the paper is frozen, a chunked flush is running, or an
//! update-delaying batch was open when the request was made.
//!
//! Flushing walks the priorities in ascending order (layers, then elements, then links) and
//! the targets of one priority in request order. Flags a view could not handle yet stay
//! queued in place and are retried by the next pass; passes repeat while they make progress.

use std::sync::mpsc::Receiver;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use tracing::{debug, trace, warn};
use trellis_graph::{AddPosition, BatchSnapshot, Cell, CellId, Graph, GraphEvent, GraphEventKind};

use crate::connector::{Connector, ConnectorRegistry, JumpOverRegistry};
use crate::dom::{Dom, NodeId};
use crate::error::{Error, Result};
use crate::flags::{UpdateFlag, UpdateFlags};
use crate::layer::sync::{GraphLayerSync, UPDATE_DELAYING_BATCHES};
use crate::layer::{GridLayer, Layer, PlainLayer, cell_layer, create_group, names};
use crate::options::{PaperHooks, PaperOptions, ProgressFn, Sorting, UnfreezeOptions, UpdateOptions};
use crate::scheduler::{PendingUpdate, Scheduled, UpdateQueue, UpdateTarget};
use crate::view::{CellView, LAYER_PRIORITY, ViewContext, ViewRegistry, create_view};

const ADD_CELLS_KEY: &str = "addCells";
const RESET_KEY: &str = "reset";

/// What one flush did.
#[derive(Debug, Default)]
pub struct RenderStats {
    /// Targets whose pending flags were all handled.
    pub updated: usize,
    /// Targets still waiting with leftover flags.
    pub postponed: usize,
    /// Lowest priority that saw an update.
    pub priority: Option<u8>,
    pub passes: usize,
    /// Views whose update failed; their entries were dropped.
    pub errors: Vec<(CellId, Error)>,
}

#[derive(Debug, Default, Clone, Copy)]
struct PassOutcome {
    updated: usize,
    postponed: usize,
    progressed: bool,
}

enum TargetOutcome {
    Done,
    Stale,
    Leftover(UpdateFlags),
    Failed(Error),
}

struct ChunkedFlush {
    batch_size: usize,
    progress: Option<ProgressFn>,
    processed: usize,
    total: usize,
}

pub struct Paper {
    options: PaperOptions,
    events: Receiver<GraphEvent>,
    dom: Dom,
    grid: GridLayer,
    layers: IndexMap<String, Box<dyn Layer>, FxBuildHasher>,
    views: ViewRegistry,
    queue: UpdateQueue,
    frozen: bool,
    freeze_key: Option<String>,
    key_frozen: bool,
    sort_pending: bool,
    chunked: Option<ChunkedFlush>,
    layer_sync: GraphLayerSync,
    connectors: ConnectorRegistry,
    jumpover: JumpOverRegistry,
    hooks: PaperHooks,
    exact_sorts: usize,
    removed: bool,
}

impl std::fmt::Debug for Paper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paper")
            .field("options", &self.options)
            .field("views", &self.views)
            .field("pending", &self.queue.len())
            .field("frozen", &self.frozen)
            .field("freeze_key", &self.freeze_key)
            .finish_non_exhaustive()
    }
}

impl Paper {
    /// Subscribes to `graph`, builds the layer groups and renders the existing cells.
    pub fn new(graph: &mut Graph, options: PaperOptions) -> Result<Self> {
        Self::with_hooks(graph, options, PaperHooks::default())
    }

    /// Like [`Paper::new`], with `hooks` in place before the first render.
    pub fn with_hooks(
        graph: &mut Graph,
        options: PaperOptions,
        hooks: PaperHooks,
    ) -> Result<Self> {
        options.validate()?;
        let events = graph.subscribe();

        let mut dom = Dom::new("svg");
        let root = dom.root();
        dom.set_attr(root, "xmlns", "http://www.w3.org/2000/svg");
        dom.set_attr(root, "class", "joint-paper");
        dom.set_attr(root, "width", &trellis_geom::fmt::fmt_num(options.width));
        dom.set_attr(root, "height", &trellis_geom::fmt::fmt_num(options.height));

        let grid_group = create_group(&mut dom, names::GRID);
        dom.append_child(root, grid_group);
        let mut grid = GridLayer::new(grid_group);
        grid.draw(
            &mut dom,
            options.grid_size,
            options.width,
            options.height,
            options.draw_grid,
        );

        let mut layers: IndexMap<String, Box<dyn Layer>, FxBuildHasher> = IndexMap::default();
        for id in names::IMPLICIT.into_iter().filter(|id| *id != names::GRID) {
            let layer: Box<dyn Layer> = if id == names::CELLS {
                cell_layer(&mut dom, id, options.sorting)
            } else {
                let group = create_group(&mut dom, id);
                Box::new(PlainLayer::new(id, group, false))
            };
            dom.append_child(root, layer.group());
            layers.insert(id.to_string(), layer);
        }

        let mut paper = Self {
            layer_sync: GraphLayerSync::new(options.sorting),
            frozen: options.frozen,
            options,
            events,
            dom,
            grid,
            layers,
            views: ViewRegistry::new(),
            queue: UpdateQueue::new(),
            freeze_key: None,
            key_frozen: false,
            sort_pending: false,
            chunked: None,
            connectors: ConnectorRegistry::default(),
            jumpover: JumpOverRegistry::default(),
            hooks,
            exact_sorts: 0,
            removed: false,
        };
        paper.reset_views(graph);
        Ok(paper)
    }

    pub fn options(&self) -> &PaperOptions {
        &self.options
    }

    pub fn set_hooks(&mut self, hooks: PaperHooks) {
        self.hooks = hooks;
    }

    /// Adds or replaces a connector available to this paper's links.
    pub fn register_connector(&mut self, connector: Box<dyn Connector>) {
        self.connectors.register(connector);
    }

    /// Dispatches every graph event received since the last call.
    pub fn sync(&mut self, graph: &Graph) {
        while let Ok(event) = self.events.try_recv() {
            if self.removed {
                continue;
            }
            self.dispatch(graph, event);
        }
    }

    fn dispatch(&mut self, graph: &Graph, event: GraphEvent) {
        let GraphEvent { kind, batches } = event;
        match kind {
            GraphEventKind::Add { id, position } => self.on_cell_added(graph, &id, position, &batches),
            GraphEventKind::Remove { id } => self.on_cell_removed(graph, &id, &batches),
            GraphEventKind::Reset => self.reset_views(graph),
            GraphEventKind::Sort => {
                if self.layer_sync.resort_on_sort(&batches) {
                    self.sort_layer_views(graph);
                }
            }
            GraphEventKind::Change { id, key } => self.on_cell_changed(graph, &id, &key, &batches),
            GraphEventKind::BatchStart { .. } => {}
            GraphEventKind::BatchStop { name } => self.on_batch_stop(graph, &name, &batches),
        }
    }

    fn on_cell_added(
        &mut self,
        graph: &Graph,
        id: &CellId,
        position: Option<AddPosition>,
        batches: &BatchSnapshot,
    ) {
        let Some(position) = position else {
            self.render_view(graph, id, batches);
            return;
        };
        // A multi-cell add renders everything in one flush. A running chunked flush already
        // holds the paper and picks the new views up in its next chunks.
        let hold = self.chunked.is_none();
        if hold && position.position == position.max_position {
            self.freeze(Some(ADD_CELLS_KEY));
        }
        self.render_view(graph, id, batches);
        if hold && position.position == 0 {
            self.unfreeze(graph, UnfreezeOptions::new().key(ADD_CELLS_KEY));
        }
    }

    fn on_cell_removed(&mut self, graph: &Graph, id: &CellId, batches: &BatchSnapshot) {
        self.jumpover.deregister(id);
        let Some(priority) = self.views.get(id).map(|v| v.update_priority()) else {
            return;
        };
        self.request_update(
            graph,
            UpdateTarget::Cell(id.clone()),
            UpdateFlag::Remove.into(),
            priority,
            UpdateOptions::default(),
            batches,
        );
    }

    fn on_cell_changed(&mut self, graph: &Graph, id: &CellId, key: &str, batches: &BatchSnapshot) {
        if key == "connector" {
            self.jumpover.deregister(id);
        }
        let Some(view) = self.views.get(id) else {
            return;
        };
        let mut flags = view.presentation_flags(key);
        match key {
            "z" => flags |= self.layer_sync.flags_on_z_change(),
            "layer" => flags |= UpdateFlag::Insert,
            _ => {}
        }
        if flags.is_empty() {
            return;
        }
        let priority = view.update_priority();
        self.request_update(
            graph,
            UpdateTarget::Cell(id.clone()),
            flags,
            priority,
            UpdateOptions::default(),
            batches,
        );
    }

    fn on_batch_stop(&mut self, graph: &Graph, name: &str, batches: &BatchSnapshot) {
        if self.layer_sync.resort_on_batch_stop(name, batches) {
            self.sort_layer_views(graph);
        }
        if !self.is_frozen()
            && self.chunked.is_none()
            && UPDATE_DELAYING_BATCHES.contains(&name)
            && !batches.contains_any(&UPDATE_DELAYING_BATCHES)
        {
            self.update_views(graph);
        }
        if batches.is_empty() {
            self.update_jumpovers(graph, batches);
        }
    }

    /// Re-runs the connector of every link drawn with the jump-over connector.
    fn update_jumpovers(&mut self, graph: &Graph, batches: &BatchSnapshot) {
        if self.jumpover.is_empty() {
            return;
        }
        let links: Vec<(CellId, u8)> = self
            .jumpover
            .ids()
            .filter_map(|id| Some((id.clone(), self.views.get(id)?.update_priority())))
            .collect();
        debug!(links = links.len(), "recomputing jump-over links");
        for (id, priority) in links {
            self.schedule_update(
                graph,
                &UpdateTarget::Cell(id),
                UpdateFlag::Connector.into(),
                priority,
                UpdateOptions::default(),
            );
        }
        self.flush_if_allowed(graph, batches);
    }

    /// Creates the view of a cell, or re-inserts an existing one.
    fn render_view(&mut self, graph: &Graph, id: &CellId, batches: &BatchSnapshot) {
        let Some(cell) = graph.get(id.as_str()) else {
            debug!(cell = %id, "not rendering a cell that left the graph");
            return;
        };
        let target = UpdateTarget::Cell(id.clone());

        if let Some(view) = self.views.get(id) {
            if view.kind() == cell.kind() {
                // A pending removal is cancelled by the insert.
                let flags = UpdateFlags::from(UpdateFlag::Insert) | view.init_flags();
                let priority = view.update_priority();
                self.request_update(graph, target, flags, priority, UpdateOptions::default(), batches);
                return;
            }
            self.queue.forget(&target);
            if let Some(mut old) = self.views.remove(id) {
                old.remove(&mut self.dom);
            }
        }

        let view = create_view(cell, &mut self.dom);
        let flags = UpdateFlag::Insert | UpdateFlag::Init | view.init_flags();
        let priority = view.update_priority();
        self.views.insert(view);
        self.request_update(graph, target, flags, priority, UpdateOptions::default(), batches);
    }

    /// Drops every view and renders the graph from scratch.
    fn reset_views(&mut self, graph: &Graph) {
        self.queue.clear();
        if let Some(chunk) = self.chunked.as_mut() {
            chunk.total = chunk.processed;
        }
        self.jumpover.clear();
        for mut view in self.views.drain() {
            view.remove(&mut self.dom);
        }
        for layer in self.layers.values_mut().filter(|l| l.holds_cells()) {
            let orphans = layer.prepare_remove(&mut self.dom, &|id| graph.contains(id));
            if orphans > 0 {
                debug!(layer = layer.id(), orphans, "removed orphaned cell nodes");
            }
            layer.reset(&mut self.dom);
        }

        let hold = self.chunked.is_none();
        if hold {
            self.freeze(Some(RESET_KEY));
        }
        let batches = BatchSnapshot::default();
        for cell in graph.cells() {
            self.render_view(graph, cell.id(), &batches);
        }
        if hold {
            self.unfreeze(graph, UnfreezeOptions::new().key(RESET_KEY));
        }
        // Jump-over links rendered before the links they cross are routed again.
        self.update_jumpovers(graph, &batches);
        self.sort_layer_views(graph);
    }

    /// Requests an update of the view of `id`; returns `false` when there is no such view.
    ///
    /// `priority` defaults to the view's own priority.
    pub fn request_view_update(
        &mut self,
        graph: &Graph,
        id: &CellId,
        flags: UpdateFlags,
        priority: Option<u8>,
        opts: UpdateOptions,
    ) -> bool {
        let Some(own) = self.views.get(id).map(|v| v.update_priority()) else {
            return false;
        };
        let batches = graph.batch_snapshot();
        self.request_update(
            graph,
            UpdateTarget::Cell(id.clone()),
            flags,
            priority.unwrap_or(own).max(own),
            opts,
            &batches,
        );
        true
    }

    fn request_update(
        &mut self,
        graph: &Graph,
        target: UpdateTarget,
        flags: UpdateFlags,
        priority: u8,
        opts: UpdateOptions,
        batches: &BatchSnapshot,
    ) {
        self.schedule_update(graph, &target, flags, priority, opts);
        self.flush_if_allowed(graph, batches);
    }

    fn flush_if_allowed(&mut self, graph: &Graph, batches: &BatchSnapshot) {
        if self.is_frozen()
            || self.chunked.is_some()
            || batches.contains_any(&UPDATE_DELAYING_BATCHES)
        {
            return;
        }
        self.update_views(graph);
    }

    fn schedule_update(
        &mut self,
        graph: &Graph,
        target: &UpdateTarget,
        flags: UpdateFlags,
        priority: u8,
        opts: UpdateOptions,
    ) {
        let own = match target {
            UpdateTarget::Cell(id) => self
                .views
                .get(id)
                .map_or(priority, |v| v.update_priority()),
            UpdateTarget::Layer(_) => LAYER_PRIORITY,
        };
        let outcome = self.queue.schedule(target, flags, priority, own, opts);
        trace!(%target, ?flags, priority, ?outcome, "schedule view update");
        if outcome == Scheduled::Unchanged {
            return;
        }
        if outcome == Scheduled::New {
            if let Some(chunk) = self.chunked.as_mut() {
                chunk.total += 1;
            }
        }
        if flags.intersects(UpdateFlag::Insert | UpdateFlag::Remove) || opts.isolate || opts.mounting {
            return;
        }
        let UpdateTarget::Cell(id) = target else {
            return;
        };
        self.request_connected_links_update(graph, id, priority, opts);
    }

    fn request_connected_links_update(
        &mut self,
        graph: &Graph,
        id: &CellId,
        priority: u8,
        opts: UpdateOptions,
    ) {
        for link in graph.connected_links(id) {
            let Some(link_priority) = self.views.get(link.id()).map(|v| v.update_priority()) else {
                continue;
            };
            let mut flags = UpdateFlags::from(UpdateFlag::Update);
            if link.target().as_ref().and_then(|e| e.cell_id()) == Some(id) {
                flags |= UpdateFlag::Target;
            }
            if link.source().as_ref().and_then(|e| e.cell_id()) == Some(id) {
                flags |= UpdateFlag::Source;
            }
            let next = priority.saturating_add(1).max(link_priority);
            self.schedule_update(graph, &UpdateTarget::Cell(link.id().clone()), flags, next, opts);
        }
    }

    /// Flushes every pending update synchronously.
    pub fn update_views(&mut self, graph: &Graph) -> RenderStats {
        let mut stats = RenderStats::default();
        if self.removed {
            return stats;
        }
        if let Some(before) = self.hooks.before_render.as_mut() {
            before();
        }
        loop {
            let pass = self.update_views_batch(graph, usize::MAX, &mut stats);
            stats.passes += 1;
            stats.postponed = pass.postponed;
            if self.queue.is_empty() || !pass.progressed {
                break;
            }
        }
        debug!(
            updated = stats.updated,
            postponed = stats.postponed,
            priority = ?stats.priority,
            passes = stats.passes,
            "flushed view updates"
        );
        if let Some(after) = self.hooks.after_render.as_mut() {
            after(&stats);
        }
        stats
    }

    /// One pass over the queue, handling at most `budget` updates.
    fn update_views_batch(&mut self, graph: &Graph, budget: usize, stats: &mut RenderStats) -> PassOutcome {
        let mut pass = PassOutcome::default();
        let priorities = (0..self.queue.priorities()).filter_map(|i| u8::try_from(i).ok());
        for priority in priorities {
            for target in self.queue.targets_at(priority) {
                if pass.updated >= budget {
                    return pass;
                }
                let Some(entry) = self.queue.get(&target, priority) else {
                    continue;
                };
                match self.update_target(graph, &target, entry) {
                    TargetOutcome::Done => {
                        self.queue.remove(&target, priority);
                        pass.updated += 1;
                        pass.progressed = true;
                        stats.updated += 1;
                        stats.priority = Some(stats.priority.map_or(priority, |p| p.min(priority)));
                    }
                    TargetOutcome::Stale => {
                        debug!(%target, "dropping update of a stale view");
                        self.queue.remove(&target, priority);
                        pass.progressed = true;
                    }
                    TargetOutcome::Leftover(flags) => {
                        if flags != entry.flags {
                            pass.progressed = true;
                        }
                        self.queue.set_flags(&target, priority, flags);
                        pass.postponed += 1;
                    }
                    TargetOutcome::Failed(err) => {
                        self.queue.remove(&target, priority);
                        pass.progressed = true;
                        let UpdateTarget::Cell(id) = target else {
                            continue;
                        };
                        warn!(cell = %id, error = %err, "view update failed");
                        if let Some(hook) = self.hooks.on_view_error.as_mut() {
                            hook(&id, &err);
                        }
                        stats.errors.push((id, err));
                    }
                }
            }
        }
        pass
    }

    fn update_target(&mut self, graph: &Graph, target: &UpdateTarget, entry: PendingUpdate) -> TargetOutcome {
        match target {
            UpdateTarget::Cell(id) => self.update_cell_view(graph, id, entry),
            UpdateTarget::Layer(id) => {
                if entry.flags.contains(UpdateFlag::Remove) {
                    self.remove_layer_view(graph, id);
                }
                TargetOutcome::Done
            }
        }
    }

    fn update_cell_view(&mut self, graph: &Graph, id: &CellId, entry: PendingUpdate) -> TargetOutcome {
        let Some(mut view) = self.views.take(id) else {
            return TargetOutcome::Stale;
        };
        let mut flags = entry.flags;
        if flags.contains(UpdateFlag::Remove) {
            view.remove(&mut self.dom);
            self.views.remove(id);
            return TargetOutcome::Done;
        }
        if !graph.contains(id.as_str()) {
            self.views.restore(view);
            return TargetOutcome::Stale;
        }
        if flags.contains(UpdateFlag::Insert) {
            self.insert_view(graph, view.as_ref());
            flags = flags.without(UpdateFlag::Insert | UpdateFlag::Init);
        }

        let result = if flags.is_empty() {
            Ok(UpdateFlags::EMPTY)
        } else {
            let mut ctx = ViewContext {
                graph,
                dom: &mut self.dom,
                views: &self.views,
                connectors: &self.connectors,
                jumpover: &mut self.jumpover,
                default_connector: &self.options.default_connector,
            };
            view.confirm_update(flags, entry.opts, &mut ctx)
        };
        self.views.restore(view);

        match result {
            Ok(leftover) if leftover.is_empty() => TargetOutcome::Done,
            Ok(leftover) => TargetOutcome::Leftover(leftover),
            Err(err) => TargetOutcome::Failed(err),
        }
    }

    /// The layer a cell belongs to: its `layer` attribute when that names a cell layer.
    fn cell_layer_id<'c>(&self, cell: &'c Cell) -> &'c str {
        match cell.layer() {
            Some(id) if self.layers.get(id).is_some_and(|l| l.holds_cells()) => id,
            _ => names::CELLS,
        }
    }

    fn insert_view(&mut self, graph: &Graph, view: &dyn CellView) {
        let Some(cell) = graph.get(view.id().as_str()) else {
            return;
        };
        let layer_id = self.cell_layer_id(cell);
        if let Some(layer) = self.layers.get_mut(layer_id) {
            layer.insert_cell_view(&mut self.dom, view.root(), cell.z());
        }
    }

    /// Runs an exact resort now, or once the paper thaws.
    fn sort_layer_views(&mut self, graph: &Graph) {
        if !self.is_exact_sorting() {
            return;
        }
        if self.is_frozen() {
            self.sort_pending = true;
            return;
        }
        for layer in self.layers.values_mut().filter(|l| l.holds_cells()) {
            layer.sort(&mut self.dom, &|id| graph.get(id).map(Cell::z));
        }
        self.exact_sorts += 1;
        debug!(sorts = self.exact_sorts, "sorted cell layers");
    }

    /// Freezes the paper; requests only accumulate until [`Paper::unfreeze`].
    ///
    /// A keyed freeze does not override a different key that froze the paper first.
    pub fn freeze(&mut self, key: Option<&str>) {
        if let Some(key) = key {
            if self.freeze_key.as_deref() != Some(key) {
                if self.frozen && self.freeze_key.is_some() {
                    return;
                }
                self.freeze_key = Some(key.to_string());
                self.key_frozen = self.frozen;
            }
        }
        self.frozen = true;
        if self.chunked.take().is_some() {
            debug!(pending = self.queue.len(), "chunked flush cancelled by freeze");
        }
    }

    /// Flushes pending updates and thaws the paper.
    ///
    /// A keyed unfreeze is ignored while a different key holds the paper. Thawing the key that
    /// froze an already frozen paper leaves it frozen. With a `batch_size` the flush is chunked:
    /// the host drives it with [`Paper::tick`] and the paper thaws after the final chunk.
    pub fn unfreeze(&mut self, graph: &Graph, opts: UnfreezeOptions) {
        if self.removed {
            warn!("unfreeze on a removed paper");
            return;
        }
        let key = opts.key.as_deref();
        if let (Some(key), Some(held)) = (key, self.freeze_key.as_deref()) {
            if key != held {
                return;
            }
        }
        let held = self.freeze_key.take();
        if key.is_some() && key == held.as_deref() && self.key_frozen {
            return;
        }
        if self.chunked.is_some() {
            self.run_until_idle(graph);
        }

        match opts.batch_size {
            Some(batch_size) => {
                self.frozen = true;
                self.chunked = Some(ChunkedFlush {
                    batch_size: batch_size.max(1),
                    progress: opts.progress,
                    processed: 0,
                    total: self.queue.len(),
                });
            }
            None => {
                self.update_views(graph);
                self.thaw(graph);
            }
        }
    }

    fn thaw(&mut self, graph: &Graph) {
        self.frozen = false;
        self.key_frozen = false;
        if self.sort_pending {
            self.sort_pending = false;
            self.sort_layer_views(graph);
        }
    }

    /// Runs one chunk of a chunked unfreeze. Returns whether more chunks remain.
    pub fn tick(&mut self, graph: &Graph) -> bool {
        let Some(mut chunk) = self.chunked.take() else {
            return false;
        };
        if let Some(before) = self.hooks.before_render.as_mut() {
            before();
        }
        let mut stats = RenderStats::default();
        let mut budget = chunk.batch_size;
        loop {
            let pass = self.update_views_batch(graph, budget, &mut stats);
            stats.passes += 1;
            stats.postponed = pass.postponed;
            budget -= pass.updated.min(budget);
            if self.queue.is_empty() || budget == 0 || !pass.progressed {
                break;
            }
        }
        chunk.processed += stats.updated;
        // Budget left over means the remaining entries are all waiting on something.
        let done = self.queue.is_empty() || budget > 0;
        debug!(
            processed = chunk.processed,
            total = chunk.total,
            done,
            "flushed view update chunk"
        );
        if let Some(after) = self.hooks.after_render.as_mut() {
            after(&stats);
        }
        if let Some(progress) = chunk.progress.as_mut() {
            progress(done, chunk.processed, chunk.total);
        }
        if done {
            self.thaw(graph);
            return false;
        }
        self.chunked = Some(chunk);
        true
    }

    /// Drives a chunked unfreeze to its end.
    pub fn run_until_idle(&mut self, graph: &Graph) {
        while self.tick(graph) {}
    }

    /// Applies the pending flags of one view right away, wherever they are queued.
    pub fn require_view(&mut self, graph: &Graph, id: &CellId) -> Result<Option<&dyn CellView>> {
        let target = UpdateTarget::Cell(id.clone());
        let flags = self.queue.flags_of(&target);
        if !flags.is_empty() {
            self.queue.forget(&target);
            let entry = PendingUpdate {
                flags,
                opts: UpdateOptions::default(),
            };
            match self.update_cell_view(graph, id, entry) {
                TargetOutcome::Leftover(leftover) => {
                    if let Some(own) = self.views.get(id).map(|v| v.update_priority()) {
                        self.queue
                            .schedule(&target, leftover, own, own, UpdateOptions::default());
                    }
                }
                TargetOutcome::Failed(err) => return Err(err),
                TargetOutcome::Done | TargetOutcome::Stale => {}
            }
        }
        Ok(self.views.get(id))
    }

    /// Adds an empty cell layer right below the `labels` layer.
    pub fn add_layer(&mut self, graph: &Graph, id: &str) -> Result<()> {
        if id == names::GRID || self.layers.contains_key(id) {
            return Err(Error::DuplicateLayer { id: id.to_string() });
        }
        let layer = cell_layer(&mut self.dom, id, self.options.sorting);
        let labels = self.layers.get_index_of(names::LABELS);
        let reference = labels.and_then(|i| self.layers.get_index(i)).map(|(_, l)| l.group());
        let root = self.dom.root();
        self.dom.insert_before(root, layer.group(), reference);
        match labels {
            Some(index) => {
                self.layers.shift_insert(index, id.to_string(), layer);
            }
            None => {
                self.layers.insert(id.to_string(), layer);
            }
        }
        debug!(layer = id, "added cell layer");

        let members: Vec<(CellId, u8)> = graph
            .cells()
            .iter()
            .filter(|c| c.layer() == Some(id))
            .filter_map(|c| Some((c.id().clone(), self.views.get(c.id())?.update_priority())))
            .collect();
        let batches = graph.batch_snapshot();
        for (cell, priority) in members {
            self.schedule_update(
                graph,
                &UpdateTarget::Cell(cell),
                UpdateFlag::Insert.into(),
                priority,
                UpdateOptions::default(),
            );
        }
        self.flush_if_allowed(graph, &batches);
        self.sort_layer_views(graph);
        Ok(())
    }

    /// Schedules the removal of a layer added with [`Paper::add_layer`].
    ///
    /// Its cell views move back to the `cells` layer when the removal is flushed.
    pub fn remove_layer(&mut self, graph: &Graph, id: &str) -> Result<()> {
        if names::IMPLICIT.contains(&id) {
            return Err(Error::ImplicitLayer { id: id.to_string() });
        }
        if !self.layers.contains_key(id) {
            return Err(Error::UnknownLayer { id: id.to_string() });
        }
        let batches = graph.batch_snapshot();
        self.request_update(
            graph,
            UpdateTarget::Layer(id.to_string()),
            UpdateFlag::Remove.into(),
            LAYER_PRIORITY,
            UpdateOptions::default(),
            &batches,
        );
        Ok(())
    }

    fn remove_layer_view(&mut self, graph: &Graph, id: &str) {
        let Some(mut layer) = self.layers.shift_remove(id) else {
            return;
        };
        let orphans = layer.prepare_remove(&mut self.dom, &|cell| graph.contains(cell));
        let group = layer.group();
        let members: Vec<(NodeId, i64)> = self
            .views
            .ids()
            .filter_map(|cell| {
                let root = self.views.get(cell)?.root();
                (self.dom.parent(root) == Some(group))
                    .then(|| (root, graph.get(cell.as_str()).map_or(0, Cell::z)))
            })
            .collect();
        if let Some(cells) = self.layers.get_mut(names::CELLS) {
            for (root, z) in &members {
                cells.insert_cell_view(&mut self.dom, *root, *z);
            }
        }
        self.dom.remove(group);
        debug!(layer = id, moved = members.len(), orphans, "removed cell layer");
        self.sort_layer_views(graph);
    }

    /// Tears the paper down: freezes it for good and drops every view and layer.
    pub fn remove(&mut self) {
        self.freeze(None);
        self.removed = true;
        self.chunked = None;
        self.queue.clear();
        for mut view in self.views.drain() {
            view.remove(&mut self.dom);
        }
        let root = self.dom.root();
        self.dom.clear_children(root);
        self.layers.clear();
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_exact_sorting(&self) -> bool {
        self.options.sorting == Sorting::Exact
    }

    pub fn has_scheduled_updates(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Pending flags of a view, merged over all priorities.
    pub fn pending_flags(&self, id: &CellId) -> UpdateFlags {
        self.queue.flags_of(&UpdateTarget::Cell(id.clone()))
    }

    pub fn find_view_by_model(&self, id: &str) -> Option<&dyn CellView> {
        self.views.get(&CellId::new(id))
    }

    pub fn view_ids(&self) -> impl Iterator<Item = &CellId> {
        self.views.ids()
    }

    /// Group node of a layer.
    pub fn layer_node(&self, id: &str) -> Option<NodeId> {
        if id == names::GRID && !self.removed {
            return Some(self.grid.group());
        }
        self.layers.get(id).map(|l| l.group())
    }

    /// Layer ids in document order.
    pub fn layer_ids(&self) -> Vec<&str> {
        let mut ids = vec![names::GRID];
        ids.extend(self.layers.keys().map(String::as_str));
        ids
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn to_svg(&self) -> String {
        self.dom.to_svg(self.dom.root())
    }

    pub fn jumpover(&self) -> &JumpOverRegistry {
        &self.jumpover
    }

    /// Number of exact resort passes run so far.
    pub fn exact_sort_count(&self) -> usize {
        self.exact_sorts
    }
}
