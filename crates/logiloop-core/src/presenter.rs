//! Glue between an engine and whatever draws it.
//!
//! A [`Presenter`] owns the engine and a [`LoopView`]. Commands go through
//! the presenter's queue; after each one the presenter takes a fresh
//! snapshot and hands the view only the records that changed.

use crate::command::{Command, CommandOutcome, CommandQueue};
use crate::engine::{LoopEngine, LoopError};
use crate::query::{ContainerRow, ViewNode, changed_nodes, container_table};

/// The seam to a user interface.
pub trait LoopView {
    /// Called once with the full snapshot before any command runs.
    fn initialize(&mut self, nodes: &[ViewNode]);

    /// Called after a command with the records that changed. Never called
    /// with an empty slice.
    fn update(&mut self, changed: &[ViewNode]);

    fn show_error(&mut self, error: &LoopError);
}

pub struct Presenter<V: LoopView> {
    engine: LoopEngine,
    view: V,
    queue: CommandQueue,
    /// The full snapshot the view currently reflects.
    cache: Vec<ViewNode>,
}

impl<V: LoopView> Presenter<V> {
    pub fn new(engine: LoopEngine, view: V) -> Self {
        Self::with_queue(engine, view, CommandQueue::new())
    }

    /// Like [`Presenter::new`], retaining up to `max_history` executed
    /// commands.
    pub fn with_history(engine: LoopEngine, view: V, max_history: usize) -> Self {
        Self::with_queue(engine, view, CommandQueue::with_max_history(max_history))
    }

    fn with_queue(engine: LoopEngine, mut view: V, queue: CommandQueue) -> Self {
        let cache = engine.view_nodes();
        view.initialize(&cache);
        Self {
            engine,
            view,
            queue,
            cache,
        }
    }

    /// Run one command right away and refresh the view.
    pub fn receive_input(&mut self, command: Command) -> Result<CommandOutcome, LoopError> {
        self.queue.record(self.engine.tick(), &command);
        self.run(command)
    }

    /// Queue a command for the next [`Presenter::flush`].
    pub fn queue(&mut self, command: Command) {
        self.queue.push(command);
    }

    /// Execute every queued command in order. Errors are shown on the view
    /// and do not stop later commands.
    pub fn flush(&mut self) -> Vec<Result<CommandOutcome, LoopError>> {
        let commands = self.queue.drain(self.engine.tick());
        commands.into_iter().map(|command| self.run(command)).collect()
    }

    fn run(&mut self, command: Command) -> Result<CommandOutcome, LoopError> {
        let result = self.engine.execute(command);
        if let Err(error) = &result {
            tracing::debug!(%error, "command failed");
            self.view.show_error(error);
        }
        self.refresh();
        result
    }

    /// Diff a fresh snapshot against the cached one and push the changes.
    pub fn refresh(&mut self) {
        let snapshot = self.engine.view_nodes();
        let changed = changed_nodes(Some(self.cache.as_slice()), &snapshot);
        if !changed.is_empty() {
            self.view.update(&changed);
        }
        self.cache = snapshot;
    }

    pub fn container_table(&self) -> Vec<ContainerRow> {
        container_table(&self.cache)
    }

    pub fn engine(&self) -> &LoopEngine {
        &self.engine
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn history(&self) -> &[(u64, Command)] {
        self.queue.history()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.pending_count()
    }
}
