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

//! Intermediate representation: three-address code, and its basic blocks.

pub mod instr;
pub mod program;
pub mod block;

pub use instr::{Immediate, Op, Operand, Relation, Statement, SymbolRef, Width};
pub use program::Program;
pub use block::{BasicBlock, BlockId, Diagnostic, FlowGraph};
