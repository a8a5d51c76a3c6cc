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

//! Syntax trees, as handed over by the parser.
//!
//! Every node carries a [`NodeKind`] tag and the static type the type checker decided for it.
//! Lists are right-nested: `StatementList(first, rest)`, terminated by an `Empty` node (or by a
//! plain last element).

use std::collections::BTreeMap;
use parse_display::Display;

use crate::ir::{Immediate, Relation};
use crate::symbol::{SymbolId, ValueType};

/// Kinds of syntax tree nodes.
#[derive(Debug, Display, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[display(style = "snake_case")]
#[allow(missing_docs)]
pub enum NodeKind {
    Unknown,
    Error,
    StatementList,
    Assignment,
    If,
    IfTargets,
    While,
    LArray,
    RArray,
    Return,
    FunctionCall,
    ExprList,
    RelEqual,
    RelLt,
    RelGt,
    RelLte,
    RelGte,
    RelNotEqual,
    Add,
    Sub,
    Or,
    Mul,
    Div,
    IDiv,
    Mod,
    And,
    Num,
    Id,
    Empty,
    Not,
    SignPlus,
    SignMinus,
    Coercion,
}

impl NodeKind {
    /// Relation tested by a relational node.
    pub fn relation(self) -> Option<Relation> {
        use NodeKind::*;
        match self {
            RelEqual => Some(Relation::Eq),
            RelNotEqual => Some(Relation::Ne),
            RelLt => Some(Relation::Lt),
            RelGt => Some(Relation::Gt),
            RelLte => Some(Relation::Le),
            RelGte => Some(Relation::Ge),
            _ => None,
        }
    }

    /// Binary operators, relational ones included.
    pub fn is_binary_operator(self) -> bool {
        use NodeKind::*;
        self.relation().is_some() || matches!(self, Add | Sub | Or | Mul | Div | IDiv | Mod | And)
    }

    /// Unary operators, casts included.
    pub fn is_unary_operator(self) -> bool {
        use NodeKind::*;
        matches!(self, Not | SignPlus | SignMinus | Coercion)
    }
}

/// Payload of a syntax tree node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NodeData {
    /// Nothing.
    Leaf,
    /// Literal value, for [`NodeKind::Num`].
    Constant(Immediate),
    /// Symbol, for [`NodeKind::Id`].
    Symbol(SymbolId),
    /// Single child.
    Unary(Box<Node>),
    /// Left and right children.
    Binary(Box<Node>, Box<Node>),
}

/// Syntax tree node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Node {
    /// Kind of this node.
    pub kind: NodeKind,
    /// Static type of this node.
    pub ty: ValueType,
    /// Payload.
    pub data: NodeData,
}

impl Node {
    /// Node without payload.
    pub fn leaf(kind: NodeKind, ty: ValueType) -> Node { Node { kind, ty, data: NodeData::Leaf } }

    /// The empty node.
    pub fn empty() -> Node { Node::leaf(NodeKind::Empty, ValueType::Void) }

    /// Literal.
    pub fn num(value: Immediate) -> Node {
        Node { kind: NodeKind::Num, ty: value.value_type(), data: NodeData::Constant(value) }
    }

    /// Identifier.
    pub fn id(symbol: SymbolId, ty: ValueType) -> Node {
        Node { kind: NodeKind::Id, ty, data: NodeData::Symbol(symbol) }
    }

    /// Node with a single child.
    pub fn unary(kind: NodeKind, ty: ValueType, child: Node) -> Node {
        Node { kind, ty, data: NodeData::Unary(Box::new(child)) }
    }

    /// Node with two children.
    pub fn binary(kind: NodeKind, ty: ValueType, lhs: Node, rhs: Node) -> Node {
        Node { kind, ty, data: NodeData::Binary(Box::new(lhs), Box::new(rhs)) }
    }

    /// Right-nested list of `kind` ([`NodeKind::StatementList`] or [`NodeKind::ExprList`]).
    pub fn list(kind: NodeKind, items: Vec<Node>) -> Node {
        items.into_iter().rev().fold(Node::empty(), |rest, item| {
            Node::binary(kind, ValueType::Void, item, rest)
        })
    }

    /// Whether or not this is the empty node.
    pub fn is_empty(&self) -> bool { self.kind == NodeKind::Empty }

    /// The only child.
    pub fn child(&self) -> Option<&Node> {
        match &self.data {
            NodeData::Unary(child) => Some(&**child),
            _ => None,
        }
    }

    /// Left and right children.
    pub fn children(&self) -> Option<(&Node, &Node)> {
        match &self.data {
            NodeData::Binary(lhs, rhs) => Some((&**lhs, &**rhs)),
            _ => None,
        }
    }

    /// Symbol of an identifier.
    pub fn symbol(&self) -> Option<SymbolId> {
        match self.data {
            NodeData::Symbol(id) => Some(id),
            _ => None,
        }
    }

    /// Value of a literal.
    pub fn constant(&self) -> Option<Immediate> {
        match self.data {
            NodeData::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Items of the list rooted at this node, see [`Node::list`].
    pub fn list_items(&self, kind: NodeKind) -> ListItems {
        ListItems { kind, rest: Some(self) }
    }
}

/// Iterator through the items of a right-nested list.
#[derive(Debug, Clone)]
pub struct ListItems<'a> {
    kind: NodeKind,
    rest: Option<&'a Node>,
}

impl<'a> Iterator for ListItems<'a> {
    type Item = &'a Node;
    fn next(&mut self) -> Option<&'a Node> {
        let node = self.rest.take()?;
        if node.is_empty() { return None; }
        if node.kind != self.kind { return Some(node); }
        let (item, rest) = node.children()?;
        self.rest = Some(rest);
        Some(item)
    }
}

/// Syntax trees for all the functions in a compilation unit.
#[derive(Debug, Default, Clone)]
pub struct SyntaxTree {
    roots: BTreeMap<SymbolId, Node>,
}

impl SyntaxTree {
    /// Create an empty tree.
    pub fn new() -> Self { Self::default() }

    /// Set the body of `function`.
    pub fn insert(&mut self, function: SymbolId, root: Node) -> Option<Node> {
        self.roots.insert(function, root)
    }

    /// Body of `function`.
    pub fn root(&self, function: SymbolId) -> Option<&Node> { self.roots.get(&function) }
}
