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

//! Analyses over the control flow graph.

pub mod control_flow;
pub mod lattice;
pub mod data_flow;
pub mod liveness;

pub use control_flow::{ControlFlow, NextBlocks};
pub use liveness::{LiveSet, Liveness};
