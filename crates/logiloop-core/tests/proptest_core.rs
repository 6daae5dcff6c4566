//! Property-based tests for the logiloop engine.
//!
//! Uses proptest to generate random command sequences against the built-in
//! loop, then verify structural invariants hold after every command.

use logiloop_core::engine::{ErrorKind, LoopEngine};
use logiloop_core::id::TransportUnitNumber;
use logiloop_core::node::NodeType;
use logiloop_core::test_utils::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum Op {
    Step,
    Retrieve,
    Commission,
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            3 => Just(Op::Step),
            2 => Just(Op::Retrieve),
            1 => Just(Op::Commission),
        ],
        1..=max_ops,
    )
}

/// Running totals kept alongside the engine.
#[derive(Debug, Default)]
struct Ledger {
    retrieved: usize,
    stored: usize,
    last_number: Option<TransportUnitNumber>,
}

fn apply(engine: &mut LoopEngine, op: &Op, ledger: &mut Ledger) -> Result<(), TestCaseError> {
    match op {
        Op::Step => {
            let report = engine.step();
            prop_assert!(report.is_ok(), "step failed: {:?}", report);
            if let Ok(report) = report {
                ledger.stored += report.stored;
                prop_assert_eq!(report.tick, engine.tick());
            }
        }
        Op::Retrieve => match engine.retrieve_container(RETRIEVAL, "Apples") {
            Ok(tun) => {
                if let Some(last) = ledger.last_number {
                    prop_assert!(tun > last);
                } else {
                    prop_assert_eq!(tun, TransportUnitNumber(10_001));
                }
                ledger.last_number = Some(tun);
                ledger.retrieved += 1;
            }
            Err(e) => {
                prop_assert_eq!(e.kind(), ErrorKind::BusinessRule);
            }
        },
        Op::Commission => {
            if let Err(e) = engine.commission_container(COMMISSIONING) {
                prop_assert_eq!(e.kind(), ErrorKind::BusinessRule);
            }
        }
    }
    Ok(())
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Containers are conserved and numbers stay unique after every command.
    #[test]
    fn invariants_hold_for_any_sequence(ops in arb_ops(200)) {
        let mut engine = LoopEngine::new();
        let mut ledger = Ledger::default();

        for op in &ops {
            apply(&mut engine, op, &mut ledger)?;

            let numbers = container_numbers(&engine);
            let unique: BTreeSet<_> = numbers.iter().copied().collect();
            prop_assert_eq!(unique.len(), numbers.len());
            prop_assert_eq!(numbers.len(), ledger.retrieved - ledger.stored);

            let view = engine.view_nodes();
            prop_assert!(view
                .iter()
                .filter(|v| v.node_type == NodeType::Warehouse)
                .all(|v| v.container.is_none()));
        }
    }

    /// The same command sequence always lands in the same state.
    #[test]
    fn deterministic_replay(ops in arb_ops(120)) {
        let mut a = LoopEngine::new();
        let mut b = LoopEngine::new();
        let mut ledger_a = Ledger::default();
        let mut ledger_b = Ledger::default();

        for op in &ops {
            apply(&mut a, op, &mut ledger_a)?;
            apply(&mut b, op, &mut ledger_b)?;
        }

        prop_assert_eq!(a.state_hash(), b.state_hash());
        prop_assert_eq!(a.view_nodes(), b.view_nodes());
    }

    /// A container never skips ring positions: between two ticks it either
    /// stays, advances along an edge, or leaves the graph.
    #[test]
    fn containers_move_along_edges(ops in arb_ops(150)) {
        let mut engine = LoopEngine::new();
        let mut ledger = Ledger::default();

        for op in &ops {
            let before: Vec<_> = container_numbers(&engine)
                .into_iter()
                .filter_map(|tun| position_of(&engine, tun).map(|node| (tun, node)))
                .collect();
            apply(&mut engine, op, &mut ledger)?;

            for (tun, from) in before {
                if let Some(to) = position_of(&engine, tun) {
                    prop_assert!(
                        to == from || engine.graph().has_edge(from, to),
                        "container {} jumped from {} to {}", tun, from, to
                    );
                }
            }
        }
    }
}
