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

//! Lower syntax trees to three-address code, and analyse liveness.
//!
//! The pipeline for a compilation unit:
//! 1. [`lower`]: every function body in the [`SyntaxTree`] is lowered into a single flat
//!    [`Program`], allocating temporaries and labels in the [`SymbolTable`];
//! 2. [`ir::block`]: the program is split into basic blocks, linked into a [`FlowGraph`] starting
//!    from the entry point;
//! 3. [`analysis::liveness`]: live variables are computed for every reachable line.
//!
//! [`generate`] runs all three.

#![warn(missing_docs)]

pub mod symbol;
pub mod ast;
pub mod ir;
pub mod lower;
pub mod analysis;

#[cfg(test)]
mod samples;

use displaydoc::Display;
use thiserror::Error;
use tracing::info;

pub use ast::{Node, NodeKind, SyntaxTree};
pub use ir::{FlowGraph, Program};
pub use analysis::Liveness;
pub use symbol::{SymbolId, SymbolTable, ValueType};

/// Options for [`generate`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Options {
    /// Name of the function where the control flow starts.
    pub entry_point: String,
}

impl Default for Options {
    fn default() -> Self { Options { entry_point: "main".to_string() } }
}

/// Everything produced for a compilation unit.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Intermediate {
    /// Three-address code for all the functions.
    pub program: Program,
    /// Control flow graph reachable from the entry point.
    pub graph: FlowGraph,
    /// Live variables at every reachable line.
    pub liveness: Liveness,
}

/// Failure to generate the intermediate representation.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// {0}
    Lowering(#[from] lower::Error),
    /// {0}
    FlowGraph(#[from] ir::block::Error),
}

/// Lower every function in `table` (in ascending symbol id order), then build the control flow
/// graph and compute liveness. Functions without a body in `tree` get an empty one.
pub fn generate(tree: &SyntaxTree, table: &mut SymbolTable, options: &Options)
                -> Result<Intermediate, Error> {
    let mut program = Program::new();
    let functions = table.functions().collect::<Vec<_>>();
    let mut lowering = lower::Lowering::new(table, &mut program);
    for function in functions {
        match tree.root(function) {
            Some(root) => lowering.visit_function(function, root)?,
            None => lowering.visit_function(function, &Node::empty())?,
        }
    }
    let graph = FlowGraph::build(&program, table, &options.entry_point)?;
    let liveness = Liveness::compute(&program, table, &graph);
    info!(lines = program.len(), blocks = graph.blocks().len(), "intermediate code generated");
    Ok(Intermediate { program, graph, liveness })
}
