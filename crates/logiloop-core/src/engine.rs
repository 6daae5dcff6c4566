//! The simulation engine: owns the loop layout and moves containers over it
//! one discrete tick at a time.
//!
//! # Tick pipeline
//!
//! Each [`LoopEngine::step`] partitions the nodes into handled and unhandled
//! and runs, strictly in order:
//! 1. **Discard** -- storage nodes hand their containers to the warehouse
//! 2. **Store** -- storage-bound containers leave the ring
//! 3. **Deliver** -- commissioning-bound containers enter a free station
//! 4. **Admit** -- retrieval nodes feed the ring, subject to admission
//! 5. **Shift** -- every remaining ring container advances one edge
//! 6. **Admit** -- a second admission pass for conveyors freed by the shift
//!
//! A node that acted in one sub-step is handled and takes no further part in
//! the tick, so every container moves at most once per tick.

use crate::command::{Command, CommandOutcome};
use crate::config::{EngineConfig, LoopConfig};
use crate::event::{Event, EventBuffer};
use crate::graph::AdjacencyGraph;
use crate::id::{NodeId, TransportUnitNumber};
use crate::layout::{Layout, LayoutConfig, LayoutError, WarehouseSpec};
use crate::node::{Container, GraphNode, NodeType};
use crate::query::ViewNode;
use crate::sim::StateHash;
use std::collections::BTreeSet;
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Broad classification of a [`LoopError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller addressed the wrong node. A bug in the caller.
    Usage,
    /// A rule of the loop refused the command. State is unchanged.
    BusinessRule,
    /// Internal consistency was violated. A bug in the engine.
    Invariant,
}

/// Why the move primitive refused a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejection {
    #[error("node does not exist")]
    UnknownNode,
    #[error("source node is empty")]
    SourceEmpty,
    #[error("destination node is occupied")]
    DestinationOccupied,
    #[error("transfer between these node types is not allowed")]
    IllegalTransfer,
}

/// What went wrong inside a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StepFailure {
    #[error("layout has no nodes")]
    NoNodes,
    #[error("closing the loop rotation hit occupied node {node}")]
    LoopInconsistent { node: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
    #[error("node {node} is not a {expected} node")]
    WrongNodeType {
        node: NodeId,
        expected: NodeType,
        /// `None` when the id does not exist.
        found: Option<NodeType>,
    },
    #[error("cannot move container from {from} to {to}: {reason}")]
    InvalidMove {
        from: NodeId,
        to: NodeId,
        reason: MoveRejection,
    },
    #[error("The retrieval node is not empty thus could not retrieve container from warehouse.")]
    RetrievalOccupied { node: NodeId },
    #[error(
        "The node after commission node is occupied thus could not move container into conveyor loop."
    )]
    CommissionBlocked { node: NodeId },
    #[error("no transport unit numbers left after {last}")]
    TransportUnitsExhausted { node: NodeId, last: TransportUnitNumber },
    #[error("Could not step a cycle forward.")]
    StepFailed { cause: StepFailure },
}

impl LoopError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoopError::WrongNodeType { .. } | LoopError::InvalidMove { .. } => ErrorKind::Usage,
            LoopError::RetrievalOccupied { .. }
            | LoopError::CommissionBlocked { .. }
            | LoopError::TransportUnitsExhausted { .. } => ErrorKind::BusinessRule,
            LoopError::StepFailed { .. } => ErrorKind::Invariant,
        }
    }

    pub fn is_usage_error(&self) -> bool {
        self.kind() == ErrorKind::Usage
    }
}

// ---------------------------------------------------------------------------
// Step report
// ---------------------------------------------------------------------------

/// Summary of one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// The tick that just completed (1 for the first step).
    pub tick: u64,
    /// Containers that moved over an edge.
    pub moved: usize,
    /// Containers handed from storage to the warehouse.
    pub stored: usize,
    /// Containers that entered the ring from a retrieval node.
    pub retrieved_into_loop: usize,
}

/// Per-tick bookkeeping threaded through the sub-steps.
struct TickContext {
    tick: u64,
    unhandled: BTreeSet<NodeId>,
    /// Retrieval nodes whose deferral was already recorded this tick.
    deferred: BTreeSet<NodeId>,
    report: StepReport,
}

impl TickContext {
    fn is_unhandled(&self, node: NodeId) -> bool {
        self.unhandled.contains(&node)
    }

    fn handle(&mut self, node: NodeId) {
        self.unhandled.remove(&node);
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A closed conveyor loop with its stations and the containers on it.
#[derive(Debug, Clone)]
pub struct LoopEngine {
    graph: AdjacencyGraph,
    /// Node arena indexed by the dense `NodeId`.
    nodes: Vec<GraphNode>,
    /// Presentation-only warehouse records.
    warehouses: Vec<WarehouseSpec>,
    /// Conveyor ids in travel order.
    ring: Vec<NodeId>,
    last_transport_unit: u32,
    tick: u64,
    events: EventBuffer,
}

impl Default for LoopEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopEngine {
    /// An engine over the built-in basic loop with default settings.
    ///
    /// The built-in table is constant; `layout::tests::basic_loop_is_valid`
    /// keeps the `expect` below from ever firing.
    pub fn new() -> Self {
        let layout = LayoutConfig::basic_loop()
            .validate()
            .expect("built-in layout is valid");
        Self::from_layout(layout, &EngineConfig::default())
    }

    /// Validate `config.layout` and build an engine over it.
    pub fn from_config(config: &LoopConfig) -> Result<Self, LayoutError> {
        let layout = config.layout.validate()?;
        Ok(Self::from_layout(layout, &config.engine))
    }

    pub fn from_layout(layout: Layout, config: &EngineConfig) -> Self {
        debug!(
            nodes = layout.nodes.len(),
            conveyors = layout.ring.len(),
            "loop engine created"
        );
        Self {
            graph: layout.graph,
            nodes: layout.nodes,
            warehouses: layout.warehouses,
            ring: layout.ring,
            last_transport_unit: config.transport_unit_base,
            tick: 0,
            events: EventBuffer::new(config.event_capacity),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Conveyor ids in travel order.
    pub fn ring(&self) -> &[NodeId] {
        &self.ring
    }

    pub fn graph(&self) -> &AdjacencyGraph {
        &self.graph
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The most recently assigned transport unit number (the configured base
    /// before the first retrieval).
    pub fn last_transport_unit(&self) -> TransportUnitNumber {
        TransportUnitNumber(self.last_transport_unit)
    }

    pub fn events(&self) -> &EventBuffer {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    /// Hash of the tick counter, the number counter and every slot.
    pub fn state_hash(&self) -> u64 {
        let mut hash = StateHash::new();
        hash.write_u64(self.tick);
        hash.write_u32(self.last_transport_unit);
        for node in &self.nodes {
            hash.write_slot(node.container());
        }
        hash.finish()
    }

    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.adjacent_nodes(node).into_iter().flatten()
    }

    fn node_type(&self, node: NodeId) -> Option<NodeType> {
        self.node(node).map(GraphNode::node_type)
    }

    fn is_empty_node(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(GraphNode::is_empty)
    }

    fn expect_type(&self, node: NodeId, expected: NodeType) -> Result<(), LoopError> {
        match self.node_type(node) {
            Some(found) if found == expected => Ok(()),
            found => Err(LoopError::WrongNodeType {
                node,
                expected,
                found,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// Every graph node followed by the warehouse records.
    pub fn view_nodes(&self) -> Vec<ViewNode> {
        let graph_nodes = self.nodes.iter().map(|node| {
            let mut following: Vec<NodeId> = self.successors(node.id()).collect();
            if node.node_type() == NodeType::Storage {
                following.extend(
                    self.warehouses
                        .iter()
                        .filter(|w| w.fed_by.contains(&node.id()))
                        .map(|w| w.id),
                );
            }
            ViewNode {
                node_type: node.node_type(),
                node_id: node.id(),
                coordinates: node.coordinates(),
                following,
                container: node.container().cloned(),
            }
        });
        let warehouses = self.warehouses.iter().map(|w| ViewNode {
            node_type: NodeType::Warehouse,
            node_id: w.id,
            coordinates: w.coordinates,
            following: w.following.clone(),
            container: None,
        });
        graph_nodes.chain(warehouses).collect()
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    pub fn execute(&mut self, command: Command) -> Result<CommandOutcome, LoopError> {
        match command {
            Command::Step => self.step().map(CommandOutcome::Stepped),
            Command::Commission { node } => self
                .commission_container(node)
                .map(|()| CommandOutcome::Commissioned),
            Command::Retrieve {
                node,
                content,
                transport_unit,
            } => {
                if let Some(suggested) = transport_unit {
                    debug!(%suggested, "ignoring suggested transport unit number");
                }
                self.retrieve_container(node, content)
                    .map(CommandOutcome::Retrieved)
            }
        }
    }

    /// Send the container on a commissioning node back into the loop, bound
    /// for storage. An empty commissioning node is left alone.
    pub fn commission_container(&mut self, node: NodeId) -> Result<(), LoopError> {
        self.expect_type(node, NodeType::Commissioning)?;
        if self.is_empty_node(node) {
            return Ok(());
        }

        let Some(to) = self.successors(node).find(|&n| self.is_empty_node(n)) else {
            return Err(LoopError::CommissionBlocked { node });
        };
        self.check_move(node, to)?;

        let tick = self.tick;
        if let Some(container) = self.nodes[node.index()].container_mut() {
            container.set_destination(NodeType::Storage);
            let transport_unit = container.transport_unit();
            debug!(%transport_unit, %node, "container commissioned");
            self.events.push(Event::ContainerCommissioned {
                transport_unit,
                node,
                tick,
            });
        }
        self.transfer(node, to, tick)?;
        Ok(())
    }

    /// Bring a fresh container with `content` onto an empty retrieval node.
    pub fn retrieve_container(
        &mut self,
        node: NodeId,
        content: impl Into<String>,
    ) -> Result<TransportUnitNumber, LoopError> {
        self.expect_type(node, NodeType::Retrieval)?;
        if !self.is_empty_node(node) {
            return Err(LoopError::RetrievalOccupied { node });
        }

        let transport_unit = self.next_transport_unit(node)?;
        let container = Container::new(transport_unit, content, NodeType::Commissioning);
        debug!(%transport_unit, %node, content = container.content(), "container retrieved");
        if self.nodes[node.index()].put(container).is_err() {
            return Err(LoopError::RetrievalOccupied { node });
        }
        self.last_transport_unit = transport_unit.0;
        self.events.push(Event::ContainerRetrieved {
            transport_unit,
            node,
            tick: self.tick,
        });
        Ok(transport_unit)
    }

    /// The number the next container gets. Does not consume it.
    fn next_transport_unit(&self, node: NodeId) -> Result<TransportUnitNumber, LoopError> {
        self.last_transport_unit
            .checked_add(1)
            .map(TransportUnitNumber)
            .ok_or(LoopError::TransportUnitsExhausted {
                node,
                last: TransportUnitNumber(self.last_transport_unit),
            })
    }

    // -----------------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------------

    /// Whether a retrieval container may enter the ring at `target` without
    /// risking a loop full of containers that can never be delivered.
    ///
    /// Allowed if any node other than `target` is an empty commissioning
    /// node, an empty conveyor, or a conveyor whose container is not bound
    /// for commissioning.
    pub fn is_retrieval_allowed(&self, target: NodeId) -> bool {
        self.nodes
            .iter()
            .filter(|n| n.id() != target)
            .any(|n| match (n.node_type(), n.container()) {
                (NodeType::Commissioning, None) | (NodeType::Conveyor, None) => true,
                (NodeType::Conveyor, Some(c)) => c.destination() != NodeType::Commissioning,
                _ => false,
            })
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Advance the loop by one tick.
    pub fn step(&mut self) -> Result<StepReport, LoopError> {
        if self.nodes.is_empty() {
            warn!("step on an engine without nodes");
            return Err(LoopError::StepFailed {
                cause: StepFailure::NoNodes,
            });
        }

        let tick = self.tick + 1;
        let mut ctx = TickContext {
            tick,
            unhandled: self.nodes.iter().map(GraphNode::id).collect(),
            deferred: BTreeSet::new(),
            report: StepReport {
                tick,
                ..StepReport::default()
            },
        };

        trace!(tick, "sub-step: discard");
        self.discard_stored(&mut ctx);
        trace!(tick, "sub-step: store");
        self.route_out(NodeType::Storage, &mut ctx)?;
        trace!(tick, "sub-step: deliver");
        self.route_out(NodeType::Commissioning, &mut ctx)?;
        trace!(tick, "sub-step: admit");
        self.admit_retrievals(&mut ctx)?;
        trace!(tick, "sub-step: shift");
        self.shift_loop(&mut ctx)?;
        trace!(tick, "sub-step: admit again");
        self.admit_retrievals(&mut ctx)?;

        self.tick = tick;
        Ok(ctx.report)
    }

    fn discard_stored(&mut self, ctx: &mut TickContext) {
        for node in &mut self.nodes {
            if node.node_type() != NodeType::Storage {
                continue;
            }
            if let Some(container) = node.take() {
                let transport_unit = container.transport_unit();
                debug!(%transport_unit, node = %node.id(), "container stored");
                self.events.push(Event::ContainerStored {
                    transport_unit,
                    node: node.id(),
                    tick: ctx.tick,
                });
                ctx.report.stored += 1;
            }
            ctx.unhandled.remove(&node.id());
        }
    }

    /// Move each unhandled conveyor container bound for `destination` onto an
    /// adjacent empty node of that type.
    fn route_out(&mut self, destination: NodeType, ctx: &mut TickContext) -> Result<(), LoopError> {
        let candidates: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.node_type() == NodeType::Conveyor && ctx.is_unhandled(n.id()))
            .filter(|n| n.container().is_some_and(|c| c.destination() == destination))
            .map(GraphNode::id)
            .collect();

        for from in candidates {
            let target = self.successors(from).find(|&to| {
                self.node(to)
                    .is_some_and(|n| n.node_type() == destination && n.is_empty())
            });
            if let Some(to) = target {
                self.transfer(from, to, ctx.tick)?;
                ctx.report.moved += 1;
                ctx.handle(from);
            }
        }
        Ok(())
    }

    fn admit_retrievals(&mut self, ctx: &mut TickContext) -> Result<(), LoopError> {
        let sources: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.node_type() == NodeType::Retrieval && !n.is_empty())
            .map(GraphNode::id)
            .filter(|&id| ctx.is_unhandled(id))
            .collect();

        for from in sources {
            let Some(to) = self
                .successors(from)
                .find(|&n| self.node_type(n) == Some(NodeType::Conveyor))
            else {
                continue;
            };
            if !self.is_empty_node(to) {
                continue;
            }
            if !self.is_retrieval_allowed(to) {
                if ctx.deferred.insert(from) {
                    self.defer_retrieval(from, ctx.tick);
                }
                continue;
            }
            self.transfer(from, to, ctx.tick)?;
            ctx.report.moved += 1;
            ctx.report.retrieved_into_loop += 1;
            ctx.handle(from);
            ctx.handle(to);
        }
        Ok(())
    }

    fn defer_retrieval(&mut self, node: NodeId, tick: u64) {
        let waiting = self
            .node(node)
            .and_then(GraphNode::container)
            .map(Container::transport_unit);
        if let Some(transport_unit) = waiting {
            debug!(
                %transport_unit,
                %node,
                "retrieval deferred: loop would fill with containers bound for commissioning"
            );
            self.events.push(Event::RetrievalDeferred {
                transport_unit,
                node,
                tick,
            });
        }
    }

    /// Advance every unhandled ring container one edge where the next
    /// conveyor is empty or is vacated during this same walk.
    fn shift_loop(&mut self, ctx: &mut TickContext) -> Result<(), LoopError> {
        let n = self.ring.len();
        if n == 0 {
            return Ok(());
        }

        let anchor = self
            .ring
            .iter()
            .position(|&id| !ctx.is_unhandled(id) || self.is_empty_node(id));
        let Some(anchor) = anchor else {
            return self.rotate_loop(ctx);
        };

        // Walk backwards from the anchor so each vacated slot can be filled
        // by its predecessor in the same pass.
        for offset in 1..n {
            let from = self.ring[(anchor + n - offset) % n];
            let to = self.ring[(anchor + n - offset + 1) % n];
            if !ctx.is_unhandled(from) {
                continue;
            }
            if !self.is_empty_node(from) && self.is_empty_node(to) {
                self.transfer(from, to, ctx.tick)?;
                ctx.report.moved += 1;
            }
            ctx.handle(from);
        }
        Ok(())
    }

    /// Every ring conveyor is occupied and unhandled: turn the whole ring by
    /// one position.
    fn rotate_loop(&mut self, ctx: &mut TickContext) -> Result<(), LoopError> {
        let n = self.ring.len();
        if n < 2 {
            return Ok(());
        }

        let first = self.ring[0];
        let second = self.ring[1];
        let Some(lifted) = self.nodes[first.index()].take() else {
            return Ok(());
        };

        for k in (1..n).rev() {
            let from = self.ring[k];
            let to = self.ring[(k + 1) % n];
            self.transfer(from, to, ctx.tick)?;
        }

        let transport_unit = lifted.transport_unit();
        if self.nodes[second.index()].put(lifted).is_err() {
            warn!(%transport_unit, node = %second, "loop rotation could not close");
            return Err(LoopError::StepFailed {
                cause: StepFailure::LoopInconsistent { node: second },
            });
        }
        debug!(%transport_unit, from = %first, to = %second, "container moved");
        self.events.push(Event::ContainerMoved {
            transport_unit,
            from: first,
            to: second,
            tick: ctx.tick,
        });

        ctx.report.moved += n;
        for &id in &self.ring {
            ctx.unhandled.remove(&id);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Move primitive
    // -----------------------------------------------------------------------

    fn check_move(&self, from: NodeId, to: NodeId) -> Result<(), LoopError> {
        let reject = |reason| LoopError::InvalidMove { from, to, reason };
        let (Some(source), Some(target)) = (self.node(from), self.node(to)) else {
            return Err(reject(MoveRejection::UnknownNode));
        };
        if source.is_empty() {
            return Err(reject(MoveRejection::SourceEmpty));
        }
        if !target.is_empty() {
            return Err(reject(MoveRejection::DestinationOccupied));
        }
        if !source.node_type().can_transfer_to(target.node_type()) {
            return Err(reject(MoveRejection::IllegalTransfer));
        }
        Ok(())
    }

    /// Move the container on `from` onto `to` in one operation.
    fn transfer(&mut self, from: NodeId, to: NodeId, tick: u64) -> Result<(), LoopError> {
        self.check_move(from, to)?;
        let Some(container) = self.nodes[from.index()].take() else {
            return Err(LoopError::InvalidMove {
                from,
                to,
                reason: MoveRejection::SourceEmpty,
            });
        };
        let transport_unit = container.transport_unit();
        if let Err(container) = self.nodes[to.index()].put(container) {
            // Restore the source; `check_move` saw the destination empty.
            let _ = self.nodes[from.index()].put(container);
            return Err(LoopError::InvalidMove {
                from,
                to,
                reason: MoveRejection::DestinationOccupied,
            });
        }
        debug!(%transport_unit, %from, %to, "container moved");
        self.events.push(Event::ContainerMoved {
            transport_unit,
            from,
            to,
            tick,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Test support
    // -----------------------------------------------------------------------

    /// Put a new container straight onto any empty graph node, bypassing
    /// retrieval. Consumes a transport unit number like a retrieval does.
    /// Returns `None` if the node does not exist or is occupied.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn place_container(
        &mut self,
        node: NodeId,
        content: impl Into<String>,
        destination: NodeType,
    ) -> Option<TransportUnitNumber> {
        if !self.nodes.get(node.index())?.is_empty() {
            return None;
        }
        let transport_unit = self.next_transport_unit(node).ok()?;
        self.nodes[node.index()]
            .put(Container::new(transport_unit, content, destination))
            .ok()?;
        self.last_transport_unit = transport_unit.0;
        Some(transport_unit)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
