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

//! Sample compilation units for tests, together with their expected three-address code.

use std::collections::HashMap;
use indoc::indoc;

use crate::ast::{Node, NodeKind, SyntaxTree};
use crate::ir::Immediate;
use crate::symbol::{SymbolId, SymbolTable, ValueType};

pub struct Sample {
    pub table: SymbolTable,
    pub tree: SyntaxTree,
    pub ids: HashMap<&'static str, SymbolId>,
}

fn int(id: SymbolId) -> Node { Node::id(id, ValueType::Int) }

fn num(value: i32) -> Node { Node::num(Immediate::Int(value)) }

fn assign(target: SymbolId, value: Node) -> Node {
    Node::binary(NodeKind::Assignment, ValueType::Void, int(target), value)
}

fn ret(value: Node) -> Node { Node::unary(NodeKind::Return, ValueType::Void, value) }

fn block(statements: Vec<Node>) -> Node { Node::list(NodeKind::StatementList, statements) }

/// ```c
/// int main() {
///     int n;
///     n = 10;
///     while (n > 0) n = n - 1;
///     return n;
/// }
/// ```
pub fn countdown() -> Sample {
    let mut table = SymbolTable::new();
    let main = table.add_function("main", ValueType::Int);
    let n = table.add_variable(main, "n", ValueType::Int).unwrap();
    let cond = Node::binary(NodeKind::RelGt, ValueType::Bool, int(n), num(0));
    let body = block(vec![
        assign(n, Node::binary(NodeKind::Sub, ValueType::Int, int(n), num(1))),
    ]);
    let root = block(vec![
        assign(n, num(10)),
        Node::binary(NodeKind::While, ValueType::Void, cond, body),
        ret(int(n)),
    ]);
    let mut tree = SyntaxTree::new();
    tree.insert(main, root);
    Sample { table, tree, ids: HashMap::from([("main", main), ("n", n)]) }
}

pub const COUNTDOWN: &str = indoc! {"
    0: func.void #1
    1: assign.long 10 -> #2
    2: label.void #3
    3: jle.long #2 0 -> #4
    4: sub.long #2 1 -> #5
    5: assign.long #5 -> #2
    6: goto.void #3
    7: label.void #4
    8: return.void #2
    "};

/// ```c
/// int gcd(int a, int b) {
///     int t;
///     while (b != 0) { t = a % b; a = b; b = t; }
///     return a;
/// }
/// void noop() {}
/// int main() {
///     int x;
///     x = gcd(12, 18);
///     return x;
/// }
/// ```
pub fn gcd() -> Sample {
    let mut table = SymbolTable::new();
    let gcd = table.add_function("gcd", ValueType::Int);
    let a = table.add_parameter(gcd, "a", ValueType::Int).unwrap();
    let b = table.add_parameter(gcd, "b", ValueType::Int).unwrap();
    let t = table.add_variable(gcd, "t", ValueType::Int).unwrap();
    let noop = table.add_function("noop", ValueType::Void);
    let main = table.add_function("main", ValueType::Int);
    let x = table.add_variable(main, "x", ValueType::Int).unwrap();

    let cond = Node::binary(NodeKind::RelNotEqual, ValueType::Bool, int(b), num(0));
    let body = block(vec![
        assign(t, Node::binary(NodeKind::Mod, ValueType::Int, int(a), int(b))),
        assign(a, int(b)),
        assign(b, int(t)),
    ]);
    let gcd_body = block(vec![
        Node::binary(NodeKind::While, ValueType::Void, cond, body),
        ret(int(a)),
    ]);
    let call = Node::binary(NodeKind::FunctionCall, ValueType::Int, int(gcd),
                            Node::list(NodeKind::ExprList, vec![num(12), num(18)]));
    let main_body = block(vec![assign(x, call), ret(int(x))]);

    let mut tree = SyntaxTree::new();
    tree.insert(gcd, gcd_body);
    tree.insert(noop, Node::empty());
    tree.insert(main, main_body);
    let ids = HashMap::from([
        ("gcd", gcd), ("a", a), ("b", b), ("t", t),
        ("noop", noop), ("main", main), ("x", x),
    ]);
    Sample { table, tree, ids }
}

pub const GCD: &str = indoc! {"
    0: func.void #1
    1: label.void #8
    2: je.long #3 0 -> #9
    3: imod.long #2 #3 -> #10
    4: assign.long #10 -> #4
    5: assign.long #3 -> #2
    6: assign.long #4 -> #3
    7: goto.void #8
    8: label.void #9
    9: return.void #2
    10: func.void #5
    11: func.void #6
    12: param.long 12
    13: param.long 18
    14: call.long #1 -> #11
    15: assign.long #11 -> #7
    16: return.void #7
    "};
