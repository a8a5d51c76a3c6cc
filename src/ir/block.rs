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

//! Basic blocks, and the control flow graph over them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use itertools::Itertools;
use displaydoc::Display as DisplayDoc;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::warn;

use crate::analysis::control_flow::{ControlFlow, HasBranchingBehaviour, NextBlocks};
use crate::ir::{Op, Operand, Program};
use crate::symbol::{SymbolId, SymbolTable};

/// Index of a block in a [`FlowGraph`].
pub type BlockId = usize;

/// Failure to build a [`FlowGraph`].
#[derive(Debug, DisplayDoc, Error, Clone, Eq, PartialEq)]
pub enum Error {
    /// no entry point found: there is no function named `{0}`
    NoEntryPoint(String),
    /**
     * unresolved jump target:
     * - the statement at line {line} jumps to label {label}
     * - but no `label` statement defines it
     */
    UnresolvedLabel {
        /// The offending jump.
        line: usize,
        /// Its target.
        label: SymbolId,
    },
}

/// Problems in the input which do not prevent building the graph.
#[derive(Debug, DisplayDoc, Clone, Eq, PartialEq)]
pub enum Diagnostic {
    /// control flows off the end of a function without a `return` after line {line}
    FallsOffEnd {
        /// The last statement executed.
        line: usize,
    },
}

/// Facts about a program collected in a single pass, before building blocks.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ProgramInfo {
    /// Lines starting a basic block.
    pub leaders: BTreeSet<usize>,
    /// Line of every label.
    pub labels: HashMap<SymbolId, usize>,
    /// Lines calling each function.
    pub calls: BTreeMap<SymbolId, Vec<usize>>,
    /// Line of the entry (i.e. the `func` statement) of every function.
    pub entries: BTreeMap<SymbolId, usize>,
    /// Enclosing function for every line.
    pub functions: Vec<Option<SymbolId>>,
}

impl ProgramInfo {
    /// Scan `program` for leaders, labels, functions and call sites.
    ///
    /// Leaders are: the first line; every function entry; every line following a jump, a call,
    /// or a `return`; every jump target.
    pub fn collect(program: &Program) -> Result<ProgramInfo, Error> {
        let mut info = ProgramInfo::default();
        let mut jumps = Vec::new();
        let mut function = None;
        if !program.is_empty() { info.leaders.insert(0); }
        for (line, statement) in program.iter().enumerate() {
            let op = statement.op();
            match op {
                Op::Func => {
                    function = statement.operand1().and_then(Operand::symbol_id);
                    if let Some(f) = function { info.entries.insert(f, line); }
                    info.leaders.insert(line);
                }
                Op::Label => if let Some(label) = statement.operand1().and_then(Operand::symbol_id) {
                    info.labels.insert(label, line);
                }
                Op::Call => if let Some(callee) = statement.callee() {
                    info.add_call(callee, line);
                }
                _ => {}
            }
            info.functions.push(function);
            if (op.is_jump() || op == Op::Return) && line + 1 < program.len() {
                info.leaders.insert(line + 1);
            }
            if let Some(label) = statement.jump_target() { jumps.push((line, label)); }
        }
        for (line, label) in jumps {
            let target = info.resolve(line, label)?;
            info.leaders.insert(target);
        }
        Ok(info)
    }

    fn add_call(&mut self, function: SymbolId, line: usize) {
        self.calls.entry(function).or_default().push(line);
    }

    /// Line of `label`, as the jump target of the statement at `line`.
    pub fn resolve(&self, line: usize, label: SymbolId) -> Result<usize, Error> {
        self.labels.get(&label).copied().ok_or(Error::UnresolvedLabel { line, label })
    }

    /// Function containing `line`.
    pub fn function_of(&self, line: usize) -> Option<SymbolId> {
        self.functions.get(line).copied().flatten()
    }
}

/// Basic block: lines `start..=end` of a program.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BasicBlock {
    /// First line.
    pub start: usize,
    /// Last line.
    pub end: usize,
    /// Successors.
    pub next: NextBlocks,
    /// Predecessors, in the order they got linked.
    pub parents: Vec<BlockId>,
}

impl BasicBlock {
    /// Lines in this block.
    pub fn lines(&self) -> RangeInclusive<usize> { self.start..=self.end }
    /// Successors, the fall-through one first.
    pub fn children(&self) -> SmallVec<[BlockId; 2]> { self.next.into_iter().collect() }
}

/// Control flow graph: all the basic blocks reachable from the entry function.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FlowGraph {
    blocks: Vec<BasicBlock>,
    roots: Vec<BlockId>,
    block_of_line: Vec<Option<BlockId>>,
    info: ProgramInfo,
    diagnostics: Vec<Diagnostic>,
}

impl FlowGraph {
    /// Build the control flow graph for `program`, starting from the function `entry_point`.
    ///
    /// Blocks are only built when reached. Functions called from a reached block become extra
    /// roots of the graph; the call itself simply falls through to the next line.
    pub fn build(program: &Program, table: &SymbolTable, entry_point: &str)
                 -> Result<FlowGraph, Error> {
        let info = ProgramInfo::collect(program)?;
        let entry = table.find_function(entry_point)
            .and_then(|main| info.entries.get(&main).copied())
            .ok_or_else(|| {
                warn!(entry_point, "no entry point found");
                Error::NoEntryPoint(entry_point.to_string())
            })?;
        let mut graph = FlowGraph {
            blocks: Vec::new(),
            roots: Vec::new(),
            block_of_line: vec![None; program.len()],
            info,
            diagnostics: Vec::new(),
        };
        let mut pending = Vec::new();
        graph.add_root(entry, &mut pending);
        while let Some(block_idx) = pending.pop() {
            let end = graph.blocks[block_idx].end;
            let next = graph.next_lines(program, end)?
                .map(|start| graph.block_at(start, &mut pending));
            for child in next {
                graph.blocks[child].parents.push(block_idx);
            }
            graph.blocks[block_idx].next = next;
            let callee = program[end].callee().and_then(|f| graph.info.entries.get(&f).copied());
            if let Some(callee) = callee { graph.add_root(callee, &mut pending); }
        }
        Ok(graph)
    }

    fn add_root(&mut self, start: usize, pending: &mut Vec<BlockId>) {
        let block_idx = self.block_at(start, pending);
        if !self.roots.contains(&block_idx) { self.roots.push(block_idx); }
    }

    /// The block starting at leader `start`, built (and scheduled for linking) if new.
    fn block_at(&mut self, start: usize, pending: &mut Vec<BlockId>) -> BlockId {
        if let Some(block_idx) = self.block_of_line[start] { return block_idx; }
        let end = self.info.leaders.range(start + 1..).next()
            .map_or(self.block_of_line.len() - 1, |next| next - 1);
        let block_idx = self.blocks.len();
        self.blocks.push(BasicBlock { start, end, next: NextBlocks::Terminated, parents: Vec::new() });
        for line in start..=end { self.block_of_line[line] = Some(block_idx); }
        pending.push(block_idx);
        block_idx
    }

    /// Lines following the block ending at `end`.
    fn next_lines(&mut self, program: &Program, end: usize) -> Result<NextBlocks, Error> {
        let info = &self.info;
        let mut behaviour = program[end].get_branching_behaviour()
            .try_map_dest(|label| info.resolve(end, label))?;
        let fallthrough = end + 1;
        let falls_off = program.get(fallthrough).map_or(true, |s| s.op() == Op::Func);
        if behaviour.might_fallthrough && falls_off {
            warn!(line = end, function = ?self.info.function_of(end),
                  "control flows off the end of a function");
            self.diagnostics.push(Diagnostic::FallsOffEnd { line: end });
            behaviour.might_fallthrough = false;
        }
        Ok(behaviour.get_successor_blocks(fallthrough))
    }

    /// All the blocks.
    pub fn blocks(&self) -> &[BasicBlock] { &self.blocks }

    /// Block containing `line`, if reachable.
    pub fn block_of(&self, line: usize) -> Option<BlockId> {
        self.block_of_line.get(line).copied().flatten()
    }

    /// Is `line` reachable from the entry?
    pub fn is_reachable(&self, line: usize) -> bool { self.block_of(line).is_some() }

    /// Leaders, labels, call sites, etc.
    pub fn info(&self) -> &ProgramInfo { &self.info }

    /// Problems found while building this graph.
    pub fn diagnostics(&self) -> &[Diagnostic] { &self.diagnostics }
}

impl ControlFlow for FlowGraph {
    fn block_count(&self) -> usize { self.blocks.len() }
    fn entry_block(&self) -> usize { self.roots[0] }
    fn roots(&self) -> Vec<usize> { self.roots.clone() }
    fn successor_blocks(&self, block_idx: usize) -> NextBlocks { self.blocks[block_idx].next }
    fn block_lines(&self, block_idx: usize) -> RangeInclusive<usize> { self.blocks[block_idx].lines() }
}

impl Display for FlowGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for block_idx in self.reverse_post_order() {
            let block = &self.blocks[block_idx];
            if block_idx == self.entry_block() { write!(f, "(ENTRY) ")?; }
            writeln!(f, "Block #{} [{}, {}]:", block_idx, block.start, block.end)?;
            writeln!(f, "  children: [{}]", block.children().iter().join(", "))?;
            writeln!(f, "  parents: [{}]", block.parents.iter().join(", "))?;
        }
        Ok(())
    }
}
