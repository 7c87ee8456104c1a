use crate::layout::LayoutEdge;
use blockview_core::{Address, EdgeClass, FunctionGraph, Terminator};

/// Color-only classification from the source block's terminator.
pub fn edge_class(terminator: &Terminator, target: Address) -> EdgeClass {
    match *terminator {
        Terminator::Conditional { taken, fallthrough } if taken != fallthrough => {
            if target == taken {
                EdgeClass::TrueBranch
            } else if target == fallthrough {
                EdgeClass::FalseBranch
            } else {
                EdgeClass::Normal
            }
        }
        _ => EdgeClass::Normal,
    }
}

/// Tag every edge in place. Back-edges keep their tag.
pub fn classify(edges: &mut [LayoutEdge], function: &FunctionGraph) {
    for edge in edges.iter_mut().filter(|edge| !edge.is_back_edge()) {
        edge.class = match function.block(edge.source) {
            Some(block) => edge_class(&block.terminator, edge.target),
            None => {
                tracing::debug!("No block {} to classify edge from", edge.source);
                EdgeClass::Normal
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeIndex;
    use blockview_core::BasicBlock;

    fn edge(index: usize, source: u64, target: u64, class: EdgeClass) -> LayoutEdge {
        LayoutEdge {
            index: EdgeIndex(index),
            source: Address(source),
            target: Address(target),
            coordinates: Vec::new(),
            class,
        }
    }

    fn function() -> FunctionGraph {
        FunctionGraph {
            function: Address(0x10),
            entry: Address(0x10),
            blocks: vec![
                BasicBlock::new(
                    0x10,
                    Vec::new(),
                    Terminator::Conditional {
                        taken: Address(0x30),
                        fallthrough: Address(0x20),
                    },
                ),
                BasicBlock::new(0x20, Vec::new(), Terminator::Jump { target: Address(0x10) }),
                BasicBlock::new(
                    0x30,
                    Vec::new(),
                    Terminator::Conditional {
                        taken: Address(0x40),
                        fallthrough: Address(0x40),
                    },
                ),
            ],
            edges: Vec::new(),
        }
    }

    #[test]
    fn test_conditional_targets() {
        let mut edges = vec![
            edge(0, 0x10, 0x20, EdgeClass::Normal),
            edge(1, 0x10, 0x30, EdgeClass::Normal),
        ];
        classify(&mut edges, &function());
        assert_eq!(edges[0].class, EdgeClass::FalseBranch);
        assert_eq!(edges[1].class, EdgeClass::TrueBranch);
    }

    #[test]
    fn test_back_edges_untouched() {
        let mut edges = vec![edge(0, 0x20, 0x10, EdgeClass::BackEdge)];
        classify(&mut edges, &function());
        assert_eq!(edges[0].class, EdgeClass::BackEdge);
    }

    #[test]
    fn test_same_target_stays_normal() {
        let mut edges = vec![edge(0, 0x30, 0x40, EdgeClass::Normal), edge(1, 0x99, 0x10, EdgeClass::Normal)];
        classify(&mut edges, &function());
        assert_eq!(edges[0].class, EdgeClass::Normal);
        assert_eq!(edges[1].class, EdgeClass::Normal);
    }

    #[test]
    fn test_unconditional_is_normal() {
        let term = Terminator::Call {
            target: Address(0x100),
            return_to: Address(0x20),
        };
        assert_eq!(edge_class(&term, Address(0x20)), EdgeClass::Normal);
    }
}
