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

//! Live variable analysis.
//!
//! A variable is live at a program point if its current value might still be read along some
//! path from that point. Only scalar variables, parameters and temporaries are tracked; arrays
//! always stay in memory.

use std::collections::BTreeSet;

use crate::ir::{FlowGraph, Program};
use crate::symbol::{SymbolId, SymbolTable};
use super::data_flow::{BackwardAnalysis, LineFacts};

/// Set of live variables.
pub type LiveSet = BTreeSet<SymbolId>;

struct LiveVariables<'a> {
    gen: &'a [LiveSet],
    kill: &'a [LiveSet],
}

impl BackwardAnalysis for LiveVariables<'_> {
    type Fact = LiveSet;
    /// `IN[L] = (OUT[L] - KILL[L]) ∪ GEN[L]`
    fn transfer_function(&self, line: usize, output: &LiveSet) -> LiveSet {
        output.difference(&self.kill[line])
            .chain(self.gen[line].iter())
            .copied()
            .collect()
    }
}

/// Live variables at every reachable line of a program.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Liveness {
    gen: Vec<LiveSet>,
    kill: Vec<LiveSet>,
    facts: LineFacts<LiveSet>,
}

impl Liveness {
    /// Compute liveness for all the lines in `graph`.
    pub fn compute(program: &Program, table: &SymbolTable, graph: &FlowGraph) -> Liveness {
        let (gen, kill) = program.iter()
            .map(|statement| {
                let gen = statement.reads(table).into_iter().collect::<LiveSet>();
                let kill = statement.writes(table).into_iter().collect::<LiveSet>();
                (gen, kill)
            })
            .unzip::<_, _, Vec<_>, Vec<_>>();
        let facts = LiveVariables { gen: &gen, kill: &kill }.run_backward(graph, program.len());
        Liveness { gen, kill, facts }
    }

    /// Make one more pass through the whole graph, returning whether or not anything changed.
    /// Once computed, liveness is already a fixed point, so this should always return `false`.
    pub fn refine(&mut self, graph: &FlowGraph) -> bool {
        let analysis = LiveVariables { gen: &self.gen, kill: &self.kill };
        analysis.sweep(graph, &mut self.facts)
    }

    /// Variables read by the statement at `line`.
    pub fn gen(&self, line: usize) -> Option<&LiveSet> { self.gen.get(line) }

    /// Variables overwritten by the statement at `line`.
    pub fn kill(&self, line: usize) -> Option<&LiveSet> { self.kill.get(line) }

    /// Variables live right before `line`.
    pub fn live_in(&self, line: usize) -> Option<&LiveSet> {
        self.facts.r#in.get(line)?.as_ref()
    }

    /// Variables live right after `line`.
    pub fn live_out(&self, line: usize) -> Option<&LiveSet> {
        self.facts.out.get(line)?.as_ref()
    }

    /// Is `line` reachable from the entry?
    pub fn is_reachable(&self, line: usize) -> bool { self.live_in(line).is_some() }

    /// Is `symbol` live right before or right after `line`?
    pub fn live_at(&self, line: usize, symbol: SymbolId) -> bool {
        self.live_out(line).map_or(false, |s| s.contains(&symbol))
            || self.live_in(line).map_or(false, |s| s.contains(&symbol))
    }

    /// All the variables live right before or right after `line`.
    pub fn get_live_at(&self, line: usize) -> LiveSet {
        self.live_in(line).into_iter()
            .chain(self.live_out(line))
            .flatten()
            .copied()
            .collect()
    }

    /// All the variables live right after `line`.
    pub fn get_live_out_at(&self, line: usize) -> LiveSet {
        self.live_out(line).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::{LiveSet, Liveness};
    use crate::ir::{FlowGraph, Immediate, Op, Operand, Program, Statement, SymbolRef, Width};
    use crate::samples;
    use crate::symbol::{SymbolId, SymbolTable, ValueType};
    use crate::{generate, Options};

    fn set<const N: usize>(ids: [SymbolId; N]) -> LiveSet { LiveSet::from(ids) }

    /// ```text
    /// 0: func.void main
    /// 1: jz.long x -> L     (or `goto.void L`)
    /// 2: assign.long 1 -> y
    /// 3: label.void L
    /// 4: return.void y
    /// ```
    fn branch(conditional: bool) -> (SymbolTable, Program, [SymbolId; 2]) {
        let mut table = SymbolTable::new();
        let main = table.add_function("main", ValueType::Int);
        let x = table.add_variable(main, "x", ValueType::Int).unwrap();
        let y = table.add_variable(main, "y", ValueType::Int).unwrap();
        let label = table.add_label("@0", main).unwrap();
        let sym = |id, ty| Some(Operand::from(SymbolRef::new(id, ty)));
        let jump = if conditional {
            let target = sym(label, ValueType::Void);
            Statement::new(Width::Long, Op::Jz, sym(x, ValueType::Int), None, target)
        } else {
            Statement::new(Width::Void, Op::Goto, sym(label, ValueType::Void), None, None)
        };
        let statements = [
            Statement::new(Width::Void, Op::Func, sym(main, ValueType::Int), None, None),
            jump,
            Statement::new(Width::Long, Op::Assign, Some(Operand::from(Immediate::Int(1))), None,
                           sym(y, ValueType::Int)),
            Statement::new(Width::Void, Op::Label, sym(label, ValueType::Void), None, None),
            Statement::new(Width::Void, Op::Return, sym(y, ValueType::Int), None, None),
        ];
        let mut program = Program::new();
        for statement in statements { program.append(statement).unwrap(); }
        (table, program, [x, y])
    }

    #[test]
    fn test_branch() {
        let (table, program, [x, y]) = branch(true);
        let graph = FlowGraph::build(&program, &table, "main").unwrap();
        let liveness = Liveness::compute(&program, &table, &graph);
        assert_eq!(liveness.live_in(4), Some(&set([y])));
        assert_eq!(liveness.live_out(4), Some(&set([])));
        assert_eq!(liveness.live_in(3), Some(&set([y])));
        assert_eq!(liveness.live_in(2), Some(&set([])));
        assert_eq!(liveness.live_out(1), Some(&set([y])));
        assert_eq!(liveness.live_in(1), Some(&set([x, y])));
        assert_eq!(liveness.live_in(0), Some(&set([x, y])));
        assert!(liveness.live_at(2, y));
        assert!(!liveness.live_at(2, x));
        assert_eq!(liveness.get_live_at(1), set([x, y]));
        assert_eq!(liveness.get_live_out_at(1), set([y]));
    }

    #[test]
    fn test_unreachable() {
        let (table, program, [_, y]) = branch(false);
        let graph = FlowGraph::build(&program, &table, "main").unwrap();
        let liveness = Liveness::compute(&program, &table, &graph);
        assert!(!liveness.is_reachable(2));
        assert_eq!(liveness.live_in(2), None);
        assert_eq!(liveness.live_out(2), None);
        assert!(!liveness.live_at(2, y));
        assert_eq!(liveness.get_live_at(2), set([]));
        // y is read uninitialised, if the dead assignment is skipped
        assert_eq!(liveness.live_in(0), Some(&set([y])));
    }

    #[test]
    fn test_countdown() {
        let sample = samples::countdown();
        let n = sample.ids["n"];
        let mut table = sample.table;
        let result = generate(&sample.tree, &mut table, &Options::default()).unwrap();
        let liveness = &result.liveness;
        let temporary = SymbolId(5);
        assert_eq!(liveness.live_in(1), Some(&set([])));
        assert_eq!(liveness.live_out(1), Some(&set([n])));
        assert_eq!(liveness.live_in(2), Some(&set([n])));
        assert_eq!(liveness.live_in(4), Some(&set([n])));
        assert_eq!(liveness.live_out(4), Some(&set([temporary])));
        assert_eq!(liveness.live_out(5), Some(&set([n])));
        assert_eq!(liveness.live_out(8), Some(&set([])));
        assert_eq!(liveness.gen(4), Some(&set([n])));
        assert_eq!(liveness.kill(4), Some(&set([temporary])));
        // label symbols are never tracked
        assert_eq!(liveness.kill(3), Some(&set([])));
    }

    #[test]
    fn test_fixed_point() {
        for sample in [samples::countdown(), samples::gcd()] {
            let mut table = sample.table;
            let result = generate(&sample.tree, &mut table, &Options::default()).unwrap();
            let (program, graph) = (&result.program, &result.graph);
            let mut liveness = result.liveness.clone();
            for (block_idx, block) in graph.blocks().iter().enumerate() {
                for line in block.lines() {
                    let output = liveness.live_out(line).unwrap();
                    let input = output.difference(liveness.kill(line).unwrap())
                        .chain(liveness.gen(line).unwrap())
                        .copied()
                        .collect::<LiveSet>();
                    assert_eq!(liveness.live_in(line), Some(&input), "line {}", line);
                    if line < block.end {
                        assert_eq!(liveness.live_in(line + 1), Some(output));
                    }
                }
                let successors = block.children().into_iter()
                    .flat_map(|child| liveness.live_in(graph.blocks()[child].start).unwrap())
                    .copied()
                    .collect::<LiveSet>();
                assert_eq!(liveness.live_out(block.end), Some(&successors), "block {}", block_idx);
            }
            for line in 0..program.len() {
                assert_eq!(liveness.is_reachable(line), graph.is_reachable(line));
            }
            assert!(!liveness.refine(graph));
            assert_eq!(liveness, result.liveness);
        }
    }
}
