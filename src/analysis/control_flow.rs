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

//! Analysis related to control flows.

use std::ops::RangeInclusive;
use smallvec::{SmallVec, smallvec};

use crate::ir::{Op, Statement};
use crate::symbol::SymbolId;

/// Successor blocks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NextBlocks {
    /// Control flow terminates here: block ends with a `return`.
    Terminated,
    /// Control flow is continuous: block ends with an unconditional jump, or a normal statement.
    Continuous(usize),
    /// Control flow branches here: block ends with a conditional jump.
    Branching {
        /// If the condition is not satisfied, the control flow falls through to this block.
        fallthrough: usize,
        /// If the condition is satisfied, the control flow branches to this block.
        branch_to: usize,
    },
}

impl NextBlocks {
    /// Whether or not the control flow terminates here.
    pub fn is_empty(self) -> bool { self == NextBlocks::Terminated }

    /// Renumber the successors, e.g. from lines to blocks. The fall-through one goes first.
    pub fn map(self, mut f: impl FnMut(usize) -> usize) -> NextBlocks {
        use NextBlocks::*;
        match self {
            Terminated => Terminated,
            Continuous(m) => Continuous(f(m)),
            Branching { fallthrough, branch_to } => {
                let fallthrough = f(fallthrough);
                Branching { fallthrough, branch_to: f(branch_to) }
            }
        }
    }
}

impl IntoIterator for NextBlocks {
    type Item = usize;
    type IntoIter = smallvec::IntoIter<[usize; 2]>;
    fn into_iter(self) -> Self::IntoIter {
        match self {
            NextBlocks::Terminated => SmallVec::new(),
            NextBlocks::Continuous(m) => smallvec![m],
            NextBlocks::Branching { fallthrough: m, branch_to: n } => smallvec![m, n],
        }.into_iter()
    }
}

/// A control flow: a series of basic blocks indexed `0..block_count()`, each covering a range of
/// lines, with a successor relation given by `successor_blocks`.
pub trait ControlFlow {
    /// Get the total number of basic blocks in this control flow.
    fn block_count(&self) -> usize;
    /// The block where the control flow starts.
    fn entry_block(&self) -> usize;
    /// All the blocks the control flow might start from, the entry block first.
    fn roots(&self) -> Vec<usize> { vec![self.entry_block()] }
    /// Which blocks are following this one (in the control flow graph)?
    fn successor_blocks(&self, block_idx: usize) -> NextBlocks;
    /// Lines covered by this block.
    fn block_lines(&self, block_idx: usize) -> RangeInclusive<usize>;

    /// All the blocks reachable from the roots, in reverse post-order: except along back edges,
    /// every block comes before all of its successors.
    fn reverse_post_order(&self) -> Vec<usize> {
        let mut visited = vec![false; self.block_count()];
        let mut order = Vec::with_capacity(self.block_count());
        for root in self.roots() {
            if root >= visited.len() || visited[root] { continue; }
            visited[root] = true;
            let mut stack = vec![(root, self.successor_blocks(root).into_iter())];
            while let Some((block_idx, successors)) = stack.last_mut() {
                let block_idx = *block_idx;
                let next = successors.next();
                match next {
                    Some(n) if n < visited.len() && !visited[n] => {
                        visited[n] = true;
                        stack.push((n, self.successor_blocks(n).into_iter()));
                    }
                    Some(_) => {}
                    None => {
                        order.push(block_idx);
                        stack.pop();
                    }
                }
            }
        }
        order.reverse();
        order
    }
}

/// Behaviour of a branching statement.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BranchingBehaviour<Dest = usize> {
    /// Whether or not the control flow might fall through to the next statement.
    pub might_fallthrough: bool,
    /// Whether and where will the control flow branch after execution of this statement.
    pub alternative_dest: Option<Dest>,
}

impl<Dest> BranchingBehaviour<Dest> {
    /// Resolve the destination, e.g. from a label to a line.
    pub fn try_map_dest<T, E>(self, f: impl FnOnce(Dest) -> Result<T, E>)
                              -> Result<BranchingBehaviour<T>, E> {
        Ok(BranchingBehaviour {
            might_fallthrough: self.might_fallthrough,
            alternative_dest: self.alternative_dest.map(f).transpose()?,
        })
    }
}

impl BranchingBehaviour {
    /// Get the successor blocks for this branching behaviour.
    pub fn get_successor_blocks(self, fallthrough: usize) -> NextBlocks {
        use NextBlocks::*;
        match self.alternative_dest {
            Some(branch_to) if self.might_fallthrough && branch_to != fallthrough =>
                Branching { fallthrough, branch_to },
            Some(branch_to) => Continuous(branch_to),
            None if self.might_fallthrough => Continuous(fallthrough),
            None => Terminated,
        }
    }
}

/// Indicates that this entity has a [`BranchingBehaviour`].
pub trait HasBranchingBehaviour {
    /// How destinations are represented.
    type Dest;
    /// Get the [`BranchingBehaviour`] for this "statement".
    fn get_branching_behaviour(&self) -> BranchingBehaviour<Self::Dest>;
}

impl HasBranchingBehaviour for Statement {
    type Dest = SymbolId;
    /// Jumps branch to the line of their target label. Calls always come back, so they simply
    /// fall through as far as a single function is concerned.
    fn get_branching_behaviour(&self) -> BranchingBehaviour<SymbolId> {
        BranchingBehaviour {
            might_fallthrough: !matches!(self.op(), Op::Return | Op::Goto),
            alternative_dest: self.jump_target(),
        }
    }
}
