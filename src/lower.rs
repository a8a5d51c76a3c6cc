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

//! Lowering syntax trees into three-address code.
//!
//! [`Lowering`] walks the syntax tree of one function at a time, and appends [`Statement`]s to a
//! [`Program`]. Expressions are lowered to an [`Operand`] holding their value: literals and
//! identifiers are used in place, everything else is computed into a fresh temporary.
//!
//! Temporaries are named `&N` and labels `@N`, neither of which is a valid identifier in the
//! source language. Both counters are shared by all the functions in a compilation unit.

mod expr;

use derivative::Derivative;
use displaydoc::Display as DisplayDoc;
use thiserror::Error;
use tracing::debug;

use crate::ast::{Node, NodeKind};
use crate::ir::{program, Op, Operand, Program, Statement, SymbolRef, Width};
use crate::symbol::{SymbolId, SymbolKind, SymbolTable, ValueType};

/// Lowering errors. These indicate a syntax tree the type checker should never have let through.
#[derive(Debug, DisplayDoc, Error)]
pub enum Error {
    /// cannot allocate a {0} outside of any function
    NoEnclosingFunction(&'static str),
    /// symbol {0} is not a function
    NotAFunction(SymbolId),
    /// expected a value from this `{0}` node, found none
    ValueExpected(NodeKind),
    /// cannot assign to a `{0}` node
    NotAssignable(NodeKind),
    /// {0}
    Program(#[from] program::Error),
}

/// Destination of an assignment.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Destination {
    /// A plain variable.
    Symbol(SymbolRef),
    /// An element in an array.
    Element {
        /// The array.
        array: SymbolRef,
        /// Index into the array.
        index: Operand,
    },
}

/// Lowering visitor.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Lowering<'a> {
    #[derivative(Debug = "ignore")]
    table: &'a mut SymbolTable,
    program: &'a mut Program,
    temporaries: usize,
    labels: usize,
    function: Option<SymbolId>,
}

impl<'a> Lowering<'a> {
    /// Lower into `program`, allocating temporaries and labels in `table`.
    pub fn new(table: &'a mut SymbolTable, program: &'a mut Program) -> Self {
        Lowering { table, program, temporaries: 0, labels: 0, function: None }
    }

    /// Function currently being lowered.
    pub fn current_function(&self) -> Option<SymbolId> { self.function }

    /// Start lowering `function`, returning the previous one.
    pub fn enter_function(&mut self, function: SymbolId) -> Option<SymbolId> {
        self.function.replace(function)
    }

    /// Done with the current function.
    pub fn leave_function(&mut self) -> Option<SymbolId> { self.function.take() }

    /// Append a statement to the program, returning its line.
    pub fn emit(&mut self, width: Width, op: Op, operand1: Option<Operand>,
                operand2: Option<Operand>, result: Option<Operand>) -> Result<usize, Error> {
        Ok(self.program.append(Statement::new(width, op, operand1, operand2, result))?)
    }

    fn emit_label(&mut self, label: SymbolRef) -> Result<usize, Error> {
        self.emit(Width::Void, Op::Label, Some(label.into()), None, None)
    }

    fn emit_goto(&mut self, label: SymbolRef) -> Result<usize, Error> {
        self.emit(Width::Void, Op::Goto, Some(label.into()), None, None)
    }

    /// Allocate a fresh temporary in the current function.
    pub fn make_temporary(&mut self, ty: ValueType) -> Result<SymbolRef, Error> {
        let function = self.current_function().ok_or(Error::NoEnclosingFunction("temporary"))?;
        let name = format!("&{}", self.temporaries);
        let id = self.table.add_temporary(name, ty, function)
            .ok_or(Error::NotAFunction(function))?;
        self.temporaries += 1;
        Ok(SymbolRef::new(id, ty))
    }

    /// Allocate a fresh label in the current function.
    pub fn make_label(&mut self) -> Result<SymbolRef, Error> {
        let function = self.current_function().ok_or(Error::NoEnclosingFunction("label"))?;
        let name = format!("@{}", self.labels);
        let id = self.table.add_label(name, function)
            .ok_or(Error::NotAFunction(function))?;
        self.labels += 1;
        Ok(SymbolRef::new(id, ValueType::Void))
    }

    fn return_type(&self) -> Option<ValueType> {
        self.current_function().and_then(|f| self.table.get(f)).map(|symbol| symbol.ty)
    }

    /// Lower a whole function: its entry, followed by its body.
    pub fn visit_function(&mut self, function: SymbolId, root: &Node) -> Result<(), Error> {
        let symbol = self.table.get(function)
            .filter(|symbol| symbol.kind == SymbolKind::Function)
            .ok_or(Error::NotAFunction(function))?;
        debug!(function = %symbol.name, "lowering function");
        let entry = SymbolRef::new(function, symbol.ty);
        self.enter_function(function);
        self.emit(Width::Void, Op::Func, Some(entry.into()), None, None)?;
        self.accept(root)?;
        self.leave_function();
        Ok(())
    }

    /// Lower a statement. Expressions and unrecognised nodes are ignored.
    pub fn accept(&mut self, node: &Node) -> Result<(), Error> {
        match node.kind {
            NodeKind::StatementList => {
                for statement in node.list_items(NodeKind::StatementList) {
                    self.accept(statement)?;
                }
            }
            NodeKind::Assignment => if let Some((lvalue, expr)) = node.children() {
                self.visit_assignment(lvalue, expr)?;
            }
            NodeKind::If => if let Some((cond, targets)) = node.children() {
                match (targets.kind, targets.children()) {
                    (NodeKind::IfTargets, Some((consequent, alternative))) =>
                        self.visit_if_else(cond, consequent, Some(alternative))?,
                    _ => self.visit_if_else(cond, targets, None)?,
                }
            }
            NodeKind::While => if let Some((cond, body)) = node.children() {
                self.visit_while(cond, body)?;
            }
            NodeKind::Return => match node.child() {
                Some(value) => self.visit_return(value)?,
                None => self.visit_return(&Node::empty())?,
            }
            NodeKind::FunctionCall => { self.visit_func_call(node)?; }
            _ => {}
        }
        Ok(())
    }

    fn visit_destination(&mut self, node: &Node) -> Result<Destination, Error> {
        let destination = match node.kind {
            NodeKind::Id => node.symbol()
                .map(|id| Destination::Symbol(SymbolRef::new(id, node.ty))),
            NodeKind::LArray => self.visit_larray_access(node)?,
            _ => None,
        };
        destination.ok_or(Error::NotAssignable(node.kind))
    }

    /// Lower `lvalue = expr`. The value is computed before the destination.
    pub fn visit_assignment(&mut self, lvalue: &Node, expr: &Node) -> Result<(), Error> {
        let value = self.expect_value(expr)?;
        match self.visit_destination(lvalue)? {
            Destination::Symbol(target) => {
                let value = self.widen(value, target.ty)?;
                self.emit(target.ty.width(), Op::Assign, Some(value), None, Some(target.into()))?;
            }
            Destination::Element { array, index } => {
                let element = array.ty.element().unwrap_or_else(|| value.value_type());
                let value = self.widen(value, element)?;
                self.emit(element.width(), Op::Store, Some(value), Some(index), Some(array.into()))?;
            }
        }
        Ok(())
    }

    /// Lower `if (cond) consequent else alternative`:
    ///
    /// ```text
    ///     <jump to L1 unless cond>
    ///     <consequent>
    ///     goto L2
    /// L1: <alternative>
    /// L2:
    /// ```
    ///
    /// Without an alternative, `L1` directly follows the consequent.
    pub fn visit_if_else(&mut self, cond: &Node, consequent: &Node,
                         alternative: Option<&Node>) -> Result<(), Error> {
        let otherwise = self.make_label()?;
        self.visit_jump_expr(cond, otherwise)?;
        self.accept(consequent)?;
        match alternative {
            Some(alternative) => {
                let end = self.make_label()?;
                self.emit_goto(end)?;
                self.emit_label(otherwise)?;
                self.accept(alternative)?;
                self.emit_label(end)?;
            }
            None => { self.emit_label(otherwise)?; }
        }
        Ok(())
    }

    /// Lower `while (cond) body`, testing the condition before every iteration.
    pub fn visit_while(&mut self, cond: &Node, body: &Node) -> Result<(), Error> {
        let head = self.make_label()?;
        let end = self.make_label()?;
        self.emit_label(head)?;
        self.visit_jump_expr(cond, end)?;
        self.accept(body)?;
        self.emit_goto(head)?;
        self.emit_label(end)?;
        Ok(())
    }

    /// Jump to `label` if `cond` does not hold.
    ///
    /// A relational condition becomes a single relational jump (for the negated relation). Any
    /// other condition is computed into a value first, and tested against zero.
    pub fn visit_jump_expr(&mut self, cond: &Node, label: SymbolRef) -> Result<(), Error> {
        if let (Some(relation), Some((lhs, rhs))) = (cond.kind.relation(), cond.children()) {
            let (lhs, rhs, ty) = self.visit_operands(lhs, rhs, None)?;
            let op = Op::jump(relation.negate(), ty.is_signed());
            self.emit(ty.width(), op, Some(lhs), Some(rhs), Some(label.into()))?;
        } else {
            let value = self.expect_value(cond)?;
            self.emit(value.value_type().width(), Op::Jz, Some(value), None, Some(label.into()))?;
        }
        Ok(())
    }

    /// Lower `return value;`, or `return;` if `value` is empty (or left over from a syntax error).
    pub fn visit_return(&mut self, value: &Node) -> Result<(), Error> {
        let value = match value.kind {
            NodeKind::Empty | NodeKind::Error | NodeKind::Unknown => None,
            _ => {
                let value = self.expect_value(value)?;
                Some(match self.return_type() {
                    Some(ty) => self.widen(value, ty)?,
                    None => value,
                })
            }
        };
        self.emit(Width::Void, Op::Return, value, None, None)?;
        Ok(())
    }
}
