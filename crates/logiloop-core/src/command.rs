//! Commands a presentation layer can issue against the engine.
//!
//! Commands are queued by the caller (UI, script, stdin reader) and executed
//! in submission order. Each command is a single atomic operation on the
//! engine; see [`LoopEngine::execute`](crate::engine::LoopEngine::execute).

use crate::engine::StepReport;
use crate::id::{NodeId, TransportUnitNumber};

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A single command that can be submitted to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Advance the simulation by one tick.
    Step,
    /// Release the container on a commissioning node back into the loop.
    Commission { node: NodeId },
    /// Bring a new container out of the warehouse onto a retrieval node.
    ///
    /// `transport_unit` is advisory: the engine always assigns its own
    /// number and only logs a supplied one.
    Retrieve {
        node: NodeId,
        content: String,
        transport_unit: Option<TransportUnitNumber>,
    },
}

impl Command {
    /// Shorthand for a retrieve command without a suggested number.
    pub fn retrieve(node: NodeId, content: impl Into<String>) -> Self {
        Command::Retrieve {
            node,
            content: content.into(),
            transport_unit: None,
        }
    }
}

/// What a successfully executed command produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Stepped(StepReport),
    Commissioned,
    Retrieved(TransportUnitNumber),
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// A queue of commands waiting to be executed.
///
/// Supports optional history tracking for replay and debugging.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
    /// Executed commands as (tick at execution, command).
    history: Vec<(u64, Command)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl CommandQueue {
    /// Create a new empty command queue with no history tracking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new command queue that retains up to `max_history` entries.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Drain all pending commands, moving them to history with the given tick.
    /// Returns the drained commands in submission order.
    pub fn drain(&mut self, tick: u64) -> Vec<Command> {
        let commands: Vec<Command> = self.pending.drain(..).collect();
        for cmd in &commands {
            self.record(tick, cmd);
        }
        commands
    }

    /// Add a command that bypassed the queue to the history.
    pub fn record(&mut self, tick: u64, command: &Command) {
        if self.max_history == 0 {
            return;
        }
        self.history.push((tick, command.clone()));
        let excess = self.history.len().saturating_sub(self.max_history);
        if excess > 0 {
            self.history.drain(..excess);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(u64, Command)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn commission() -> Command {
        Command::Commission { node: NodeId(0) }
    }

    // -----------------------------------------------------------------------
    // Test 1: Queueing
    // -----------------------------------------------------------------------
    #[test]
    fn new_queue_is_empty() {
        let queue = CommandQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.pending_count(), 0);
        assert!(queue.history().is_empty());
    }

    #[test]
    fn drain_preserves_order() {
        let mut queue = CommandQueue::new();
        queue.push(Command::retrieve(NodeId(14), "Apples"));
        queue.push_batch([Command::Step, commission()]);
        assert_eq!(queue.pending_count(), 3);

        let drained = queue.drain(0);
        assert_eq!(
            drained,
            vec![Command::retrieve(NodeId(14), "Apples"), Command::Step, commission()]
        );
        assert!(queue.is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 2: History
    // -----------------------------------------------------------------------
    #[test]
    fn no_history_by_default() {
        let mut queue = CommandQueue::new();
        queue.push(Command::Step);
        queue.drain(3);
        assert!(queue.history().is_empty());
    }

    #[test]
    fn history_records_tick_and_trims_oldest() {
        let mut queue = CommandQueue::with_max_history(2);
        queue.push(commission());
        queue.drain(1);
        queue.push_batch([Command::Step, Command::Step]);
        queue.drain(2);

        let history = queue.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], (2, Command::Step));
        assert_eq!(history[1], (2, Command::Step));

        queue.clear_history();
        assert!(queue.history().is_empty());
    }

    #[test]
    fn retrieve_shorthand_has_no_suggested_number() {
        let Command::Retrieve { transport_unit, content, .. } = Command::retrieve(NodeId(14), "Pears")
        else {
            panic!("expected a retrieve command");
        };
        assert_eq!(transport_unit, None);
        assert_eq!(content, "Pears");
    }
}
