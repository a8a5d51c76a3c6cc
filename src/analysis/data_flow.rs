/*
 * tacgen: lower syntax trees to three-address code, and analyse liveness.
 * Copyright (C) 2022  Ruifeng Xie
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Data flow analyses, at the granularity of single lines.
//!
//! # Design Notes
//! We don't introduce dedicated ENTRY and EXIT nodes for analysis: blocks ending with a `return`
//! have no successors, and take the boundary value [`BackwardAnalysis::v_exit`] as their output.
//! Facts are kept per line rather than per block, because their consumers (e.g. the code emitter)
//! ask about single statements.

use std::fmt::Debug;
use derivative::Derivative;
use tracing::debug;

use super::control_flow::ControlFlow;
use super::lattice::JoinSemiLattice;

/// Result of a data flow analysis: `IN` and `OUT` for every line, or `None` for lines outside of
/// the control flow (i.e. unreachable ones).
#[derive(Derivative)]
#[derivative(Debug(bound = "T: Debug"), Clone(bound = "T: Clone"))]
#[derivative(Eq(bound = "T: Eq"), PartialEq(bound = "T: PartialEq"))]
#[derivative(Default(bound = ""))]
pub struct LineFacts<T> {
    /// `IN[L]` for every line `L`.
    pub r#in: Vec<Option<T>>,
    /// `OUT[L]` for every line `L`.
    pub out: Vec<Option<T>>,
}

/// Backward data flow analysis.
pub trait BackwardAnalysis {
    /// Facts at every program point.
    type Fact: JoinSemiLattice + Clone + Eq;

    /// The boundary condition: value for the end of exit blocks.
    fn v_exit(&self) -> Self::Fact { Self::Fact::bottom() }

    /// Transfer function `f` for a single line such that `IN[L] = f(OUT[L])`.
    fn transfer_function(&self, line: usize, output: &Self::Fact) -> Self::Fact;

    /// Facts before the first iteration: `⊥` for every line in the control flow.
    fn initial_facts<F: ControlFlow>(&self, flow: &F, line_count: usize) -> LineFacts<Self::Fact> {
        let mut facts = LineFacts { r#in: vec![None; line_count], out: vec![None; line_count] };
        for block_idx in 0..flow.block_count() {
            for line in flow.block_lines(block_idx) {
                facts.r#in[line] = Some(Self::Fact::bottom());
                facts.out[line] = Some(Self::Fact::bottom());
            }
        }
        facts
    }

    /// One pass through every line of every block, returning whether or not anything changed.
    fn sweep<F: ControlFlow>(&self, flow: &F, facts: &mut LineFacts<Self::Fact>) -> bool {
        let mut changed = false;
        // post-order: successors are (mostly) updated before their predecessors
        for block_idx in flow.reverse_post_order().into_iter().rev() {
            let successors = flow.successor_blocks(block_idx);
            let mut output = if successors.is_empty() {
                self.v_exit()
            } else {
                let mut output = Self::Fact::bottom();
                output.join_assign_many(successors.into_iter().filter_map(|successor| {
                    facts.r#in[*flow.block_lines(successor).start()].as_ref()
                }));
                output
            };
            for line in flow.block_lines(block_idx).rev() {
                let input = self.transfer_function(line, &output);
                changed |= update(&mut facts.out[line], output);
                output = input;
                changed |= update(&mut facts.r#in[line], output.clone());
            }
        }
        changed
    }

    /// Run this backward data flow analysis until a fixed point is reached.
    fn run_backward<F: ControlFlow>(&self, flow: &F, line_count: usize) -> LineFacts<Self::Fact> {
        let mut facts = self.initial_facts(flow, line_count);
        let mut iterations = 1;
        while self.sweep(flow, &mut facts) { iterations += 1; }
        debug!(iterations, "data flow analysis converged");
        facts
    }
}

fn update<T: Eq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) { return false; }
    *slot = Some(value);
    true
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::ops::RangeInclusive;
    use super::BackwardAnalysis;
    use crate::analysis::control_flow::{ControlFlow, NextBlocks};

    /// Lines `0..=1` and `2..=3`, looping back from the second block to the first.
    struct Loop;

    impl ControlFlow for Loop {
        fn block_count(&self) -> usize { 2 }
        fn entry_block(&self) -> usize { 0 }
        fn successor_blocks(&self, block_idx: usize) -> NextBlocks {
            match block_idx {
                0 => NextBlocks::Continuous(1),
                _ => NextBlocks::Branching { fallthrough: 0, branch_to: 0 },
            }
        }
        fn block_lines(&self, block_idx: usize) -> RangeInclusive<usize> {
            2 * block_idx..=2 * block_idx + 1
        }
    }

    /// Every line "uses" its own number.
    struct Uses;

    impl BackwardAnalysis for Uses {
        type Fact = BTreeSet<usize>;
        fn transfer_function(&self, line: usize, output: &BTreeSet<usize>) -> BTreeSet<usize> {
            let mut input = output.clone();
            input.insert(line);
            input
        }
    }

    #[test]
    fn test_run_backward() {
        let facts = Uses.run_backward(&Loop, 5);
        let all = BTreeSet::from([0, 1, 2, 3]);
        for line in 0..4 {
            assert_eq!(facts.r#in[line].as_ref(), Some(&all));
        }
        assert_eq!(facts.r#in[4], None);
        assert_eq!(facts.out[4], None);
        let mut again = facts.clone();
        assert!(!Uses.sweep(&Loop, &mut again));
        assert_eq!(again, facts);
    }
}
