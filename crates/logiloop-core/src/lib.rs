//! Logiloop Core -- a deterministic, discrete-step simulation of a closed
//! conveyor loop.
//!
//! A fixed directed graph of typed nodes (conveyor, storage, commissioning,
//! retrieval) carries at most one container per node. Each tick moves
//! containers according to per-type transfer rules, with admission control
//! on the retrieval spur so the loop can never fill with containers that
//! have nowhere to go.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::LoopEngine::step`] runs six ordered sub-steps:
//!
//! 1. **Discard** -- Storage nodes hand their containers to the warehouse.
//! 2. **Store** -- Storage-bound conveyor containers leave the ring.
//! 3. **Deliver** -- Commissioning-bound containers enter a free station.
//! 4. **Admit** -- Retrieval containers enter the ring if admission allows.
//! 5. **Shift** -- Every remaining ring container advances one edge.
//! 6. **Admit** -- A second admission pass for conveyors freed by the shift.
//!
//! # Usage
//!
//! ```rust
//! use logiloop_core::engine::LoopEngine;
//! use logiloop_core::id::NodeId;
//!
//! let mut engine = LoopEngine::new();
//! let tun = engine.retrieve_container(NodeId(14), "Apples").unwrap();
//! assert_eq!(tun.0, 10_001);
//! engine.step().unwrap();
//! assert!(engine.node(NodeId(8)).is_some_and(|n| !n.is_empty()));
//! ```
//!
//! # Key Types
//!
//! - [`engine::LoopEngine`] -- Owns the layout and runs commands.
//! - [`layout::LayoutConfig`] -- Plain-data layout table, validated into a
//!   [`layout::Layout`].
//! - [`query::ViewNode`] -- Snapshot record with diff-friendly equality.
//! - [`presenter::Presenter`] -- Drives a [`presenter::LoopView`] with only
//!   the records that changed.
//! - [`event::EventBuffer`] -- Ring buffer of typed container events.

pub mod command;
pub mod config;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod engine;
pub mod event;
pub mod graph;
pub mod id;
pub mod layout;
pub mod node;
pub mod presenter;
pub mod query;
pub mod sim;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
