use blockview_core::{Address, BasicBlock, FunctionGraph, Instruction, Terminator, Vec2};
use std::collections::HashMap;

const BASE: u64 = 0x400000;
const STRIDE: u64 = 0x40;

fn addr(i: usize) -> Address {
    Address(BASE + i as u64 * STRIDE)
}

fn block(i: usize, terminator: Terminator) -> BasicBlock {
    let start = BASE + i as u64 * STRIDE;
    BasicBlock::new(
        start,
        vec![
            Instruction::new(start, "mov", &["eax", "ebx"]),
            Instruction::new(start + 4, "add", &["eax", "1"]),
        ],
        terminator,
    )
}

/// A chain of `block_count` blocks where every block branches forward two
/// steps and every `loop_every`-th block jumps back to an earlier one.
pub fn branchy_function(block_count: usize, loop_every: usize) -> FunctionGraph {
    let mut blocks = Vec::with_capacity(block_count);
    let mut edges = Vec::new();
    for i in 0..block_count {
        let next = i + 1;
        let skip = i + 2;
        let terminator = if skip < block_count {
            edges.push((addr(i), addr(skip)));
            edges.push((addr(i), addr(next)));
            Terminator::Conditional {
                taken: addr(skip),
                fallthrough: addr(next),
            }
        } else if next < block_count {
            edges.push((addr(i), addr(next)));
            Terminator::Fallthrough { next: addr(next) }
        } else {
            Terminator::Return
        };
        if loop_every > 0 && i > 0 && i % loop_every == 0 {
            edges.push((addr(i), addr(i / 2)));
        }
        blocks.push(block(i, terminator));
    }
    FunctionGraph {
        function: addr(0),
        entry: addr(0),
        blocks,
        edges,
    }
}

/// Sizes that vary with the block index so layers are uneven.
pub fn block_sizes(graph: &FunctionGraph) -> HashMap<Address, Vec2> {
    graph
        .blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let width = 120.0 + (i % 7) as f32 * 25.0;
            let height = 40.0 + (i % 5) as f32 * 16.0;
            (block.addr, Vec2::new(width, height))
        })
        .collect()
}
