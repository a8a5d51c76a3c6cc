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

//! Lowering expressions.

use crate::ast::{Node, NodeKind};
use crate::ir::{Op, Operand, SymbolRef};
use crate::symbol::{SymbolId, ValueType};
use super::{Destination, Error, Lowering};

fn arithmetic(kind: NodeKind, signed: bool) -> Option<Op> {
    Some(match kind {
        NodeKind::Add => Op::Add,
        NodeKind::Sub => Op::Sub,
        NodeKind::Mul => Op::Mul,
        NodeKind::Div | NodeKind::IDiv => if signed { Op::IDiv } else { Op::Div },
        NodeKind::Mod => if signed { Op::IMod } else { Op::Mod },
        NodeKind::And => Op::And,
        NodeKind::Or => Op::Or,
        _ => return None,
    })
}

impl Lowering<'_> {
    /// Lower an expression, returning the operand holding its value.
    ///
    /// Statement nodes and unrecognised nodes have no value, and produce no code.
    pub fn accept_expr(&mut self, node: &Node) -> Result<Option<Operand>, Error> {
        match node.kind {
            NodeKind::Num => Ok(node.constant().map(Operand::from)),
            NodeKind::Id => Ok(node.symbol().map(|id| Operand::from(SymbolRef::new(id, node.ty)))),
            NodeKind::RArray => self.visit_rarray_access(node),
            NodeKind::FunctionCall => self.visit_func_call(node),
            kind if kind.is_unary_operator() => self.visit_unary_op(node),
            kind if kind.is_binary_operator() => self.visit_binary_op(node),
            _ => Ok(None),
        }
    }

    pub(super) fn expect_value(&mut self, node: &Node) -> Result<Operand, Error> {
        self.accept_expr(node)?.ok_or(Error::ValueExpected(node.kind))
    }

    /// Convert `value` to type `ty`, into a fresh temporary.
    pub(super) fn coerce(&mut self, value: Operand, ty: ValueType) -> Result<Operand, Error> {
        let result = self.make_temporary(ty)?;
        self.emit(ty.width(), Op::Coerce, Some(value), None, Some(result.into()))?;
        Ok(result.into())
    }

    /// Coerce `value` to `ty` if that widens it, otherwise leave it as is.
    pub(super) fn widen(&mut self, value: Operand, ty: ValueType) -> Result<Operand, Error> {
        if value.value_type().widens_to(ty) { self.coerce(value, ty) } else { Ok(value) }
    }

    /// Lower both operands of a binary operator, and bring them to a common type.
    ///
    /// The common type is `ty` if provided and wide enough for both operands, otherwise decided
    /// by the operands. Operands are never narrowed.
    pub(super) fn visit_operands(&mut self, lhs: &Node, rhs: &Node, ty: Option<ValueType>)
                                 -> Result<(Operand, Operand, ValueType), Error> {
        let lhs = self.expect_value(lhs)?;
        let rhs = self.expect_value(rhs)?;
        let common = lhs.value_type().common(rhs.value_type());
        let ty = match ty {
            Some(ty) if common.width().bytes() <= ty.width().bytes() => ty,
            Some(ty) => ty.common(common),
            None => common,
        };
        let lhs = self.widen(lhs, ty)?;
        let rhs = self.widen(rhs, ty)?;
        Ok((lhs, rhs, ty))
    }

    /// Lower a binary operator into a fresh temporary.
    ///
    /// Relational operators produce a boolean; see [`Lowering::visit_jump_expr`] for the
    /// conditions of `if` and `while`, where no boolean is needed.
    pub fn visit_binary_op(&mut self, node: &Node) -> Result<Option<Operand>, Error> {
        let (lhs, rhs) = match node.children() {
            Some(children) if node.kind.is_binary_operator() => children,
            _ => return Ok(None),
        };
        if let Some(relation) = node.kind.relation() {
            let (lhs, rhs, ty) = self.visit_operands(lhs, rhs, None)?;
            let result = self.make_temporary(ValueType::Bool)?;
            let op = Op::set(relation, ty.is_signed());
            self.emit(ty.width(), op, Some(lhs), Some(rhs), Some(result.into()))?;
            return Ok(Some(result.into()));
        }
        let ty = Some(node.ty).filter(|ty| ty.is_scalar());
        let (lhs, rhs, ty) = self.visit_operands(lhs, rhs, ty)?;
        let op = match arithmetic(node.kind, ty.is_signed()) {
            Some(op) => op,
            None => return Ok(None),
        };
        let result = self.make_temporary(ty)?;
        self.emit(ty.width(), op, Some(lhs), Some(rhs), Some(result.into()))?;
        Ok(Some(result.into()))
    }

    /// Lower a unary operator, or a cast.
    pub fn visit_unary_op(&mut self, node: &Node) -> Result<Option<Operand>, Error> {
        let child = match node.child() {
            Some(child) => child,
            None => return Ok(None),
        };
        let op = match node.kind {
            NodeKind::Not => Op::Not,
            NodeKind::SignMinus => Op::Neg,
            NodeKind::SignPlus => {
                let value = self.expect_value(child)?;
                return self.widen(value, node.ty).map(Some);
            }
            NodeKind::Coercion => {
                let value = self.expect_value(child)?;
                if !node.ty.is_scalar() || value.value_type() == node.ty { return Ok(Some(value)); }
                return self.coerce(value, node.ty).map(Some);
            }
            _ => return Ok(None),
        };
        let value = self.expect_value(child)?;
        let ty = if node.ty.is_scalar() { node.ty } else { value.value_type() };
        let value = self.widen(value, ty)?;
        let result = self.make_temporary(ty)?;
        self.emit(ty.width(), op, Some(value), None, Some(result.into()))?;
        Ok(Some(result.into()))
    }

    fn parameter_types(&self, function: SymbolId) -> Vec<ValueType> {
        self.table.parameters(function).unwrap_or_default().iter()
            .filter_map(|&p| self.table.get(p))
            .map(|p| p.ty)
            .collect()
    }

    /// Pass the arguments in `list`, widened to the `formals` where provided.
    ///
    /// All the arguments are evaluated before the first one gets passed, so that calls nested
    /// in the arguments have their parameters all to themselves.
    fn visit_arguments(&mut self, list: &Node, formals: &[ValueType]) -> Result<(), Error> {
        let mut actuals = Vec::new();
        for (k, argument) in list.list_items(NodeKind::ExprList).enumerate() {
            let value = self.expect_value(argument)?;
            actuals.push(match formals.get(k) {
                Some(&ty) => self.widen(value, ty)?,
                None => value,
            });
        }
        for value in actuals {
            self.emit(value.value_type().width(), Op::Param, Some(value), None, None)?;
        }
        Ok(())
    }

    /// Pass all the expressions in `list` as parameters, in order.
    pub fn visit_expr_list(&mut self, list: &Node) -> Result<(), Error> {
        self.visit_arguments(list, &[])
    }

    /// Lower a function call, returning its result (absent for `void` functions).
    pub fn visit_func_call(&mut self, node: &Node) -> Result<Option<Operand>, Error> {
        let (callee, arguments) = match node.children() {
            Some(children) => children,
            None => return Ok(None),
        };
        let function = match callee.symbol() {
            Some(id) => SymbolRef::new(id, callee.ty),
            None => return Ok(None),
        };
        let formals = self.parameter_types(function.id);
        self.visit_arguments(arguments, &formals)?;
        let result = if function.ty.is_scalar() {
            Some(Operand::from(self.make_temporary(function.ty)?))
        } else {
            None
        };
        self.emit(function.ty.width(), Op::Call, Some(function.into()), None, result)?;
        Ok(result)
    }

    fn visit_element(&mut self, node: &Node) -> Result<Option<(SymbolRef, Operand)>, Error> {
        let (array, index) = match node.children() {
            Some(children) => children,
            None => return Ok(None),
        };
        let array = match array.symbol() {
            Some(id) => SymbolRef::new(id, array.ty),
            None => return Ok(None),
        };
        Ok(Some((array, self.expect_value(index)?)))
    }

    /// Lower an array element read into a fresh temporary.
    pub fn visit_rarray_access(&mut self, node: &Node) -> Result<Option<Operand>, Error> {
        let (array, index) = match self.visit_element(node)? {
            Some(element) => element,
            None => return Ok(None),
        };
        let ty = array.ty.element().unwrap_or(node.ty);
        let result = self.make_temporary(ty)?;
        self.emit(ty.width(), Op::Load, Some(array.into()), Some(index), Some(result.into()))?;
        Ok(Some(result.into()))
    }

    /// Lower the index of an array element to be written. The store itself is left to the
    /// assignment, see [`Lowering::visit_assignment`].
    pub fn visit_larray_access(&mut self, node: &Node) -> Result<Option<Destination>, Error> {
        Ok(self.visit_element(node)?.map(|(array, index)| Destination::Element { array, index }))
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use crate::ast::{Node, NodeKind};
    use crate::ir::{Immediate, Op, Operand, Program, SymbolRef, Width};
    use crate::lower::{Destination, Lowering};
    use crate::symbol::{SymbolId, SymbolTable, ValueType};

    #[test]
    fn test_void_call() {
        let mut table = SymbolTable::new();
        let f = table.add_function("f", ValueType::Void);
        let mut program = Program::new();
        let call = Node::binary(NodeKind::FunctionCall, ValueType::Void,
                                Node::id(f, ValueType::Void), Node::empty());
        let result = Lowering::new(&mut table, &mut program).accept_expr(&call).unwrap();
        assert_eq!(result, None);
        assert_eq!(program.len(), 1);
        assert_eq!((program[0].op(), program[0].width()), (Op::Call, Width::Void));
        assert_eq!(program[0].callee(), Some(f));
        assert_eq!(program[0].result(), None);
    }

    #[test]
    fn test_call_arguments() {
        let mut table = SymbolTable::new();
        let g = table.add_function("g", ValueType::UInt8);
        table.add_parameter(g, "c", ValueType::UInt8).unwrap();
        let f = table.add_function("f", ValueType::Int);
        table.add_parameter(f, "a", ValueType::Int).unwrap();
        table.add_parameter(f, "b", ValueType::Int).unwrap();
        let main = table.add_function("main", ValueType::Void);
        let call = |function, ty, arguments| Node::binary(
            NodeKind::FunctionCall, ty, Node::id(function, ty),
            Node::list(NodeKind::ExprList, arguments),
        );
        // f(g(7u8), g(8u8))
        let nested = |value| call(g, ValueType::UInt8, vec![Node::num(Immediate::UInt8(value))]);
        let outer = call(f, ValueType::Int, vec![nested(7), nested(8)]);
        let mut program = Program::new();
        let mut lowering = Lowering::new(&mut table, &mut program);
        lowering.enter_function(main);
        let result = lowering.accept_expr(&outer).unwrap();
        assert_eq!(result, Some(Operand::from(SymbolRef::new(SymbolId(11), ValueType::Int))));
        assert_eq!(program.to_string(), indoc! {"
            0: param.byte 7u8
            1: call.byte #1 -> #7
            2: coerce.long #7 -> #8
            3: param.byte 8u8
            4: call.byte #1 -> #9
            5: coerce.long #9 -> #10
            6: param.long #8
            7: param.long #10
            8: call.long #3 -> #11
        "});
    }

    #[test]
    fn test_arrays() {
        let mut table = SymbolTable::new();
        let f = table.add_function("f", ValueType::Void);
        let xs = table.add_variable(f, "xs", ValueType::IntArray).unwrap();
        let i = table.add_variable(f, "i", ValueType::Int).unwrap();
        let array = || Node::id(xs, ValueType::IntArray);
        let element = |kind| Node::binary(kind, ValueType::Int, array(), Node::id(i, ValueType::Int));
        let mut program = Program::new();
        let mut lowering = Lowering::new(&mut table, &mut program);
        lowering.enter_function(f);

        let destination = lowering.visit_larray_access(&element(NodeKind::LArray)).unwrap();
        assert_eq!(destination, Some(Destination::Element {
            array: SymbolRef::new(xs, ValueType::IntArray),
            index: Operand::from(SymbolRef::new(i, ValueType::Int)),
        }));
        // xs[i] = xs[i] + 1
        let increment = Node::binary(NodeKind::Add, ValueType::Int, element(NodeKind::RArray),
                                     Node::num(Immediate::Int(1)));
        lowering.visit_assignment(&element(NodeKind::LArray), &increment).unwrap();
        assert_eq!(program.to_string(), indoc! {"
            0: load.long #2 #3 -> #4
            1: add.long #4 1 -> #5
            2: store.long #5 #3 -> #2
        "});
    }

    #[test]
    fn test_division() {
        let mut table = SymbolTable::new();
        let f = table.add_function("f", ValueType::Void);
        let s = table.add_variable(f, "s", ValueType::Int).unwrap();
        let u = table.add_variable(f, "u", ValueType::UInt8).unwrap();
        let mut program = Program::new();
        let mut lowering = Lowering::new(&mut table, &mut program);
        lowering.enter_function(f);
        let signed = Node::binary(NodeKind::Div, ValueType::Int,
                                  Node::id(s, ValueType::Int), Node::num(Immediate::Int(2)));
        let unsigned = Node::binary(NodeKind::Mod, ValueType::UInt8,
                                    Node::id(u, ValueType::UInt8), Node::num(Immediate::UInt8(3)));
        let not = Node::unary(NodeKind::Not, ValueType::Bool, Node::num(Immediate::Bool(false)));
        for node in [signed, unsigned, not] {
            assert!(lowering.accept_expr(&node).unwrap().is_some());
        }
        let ops = program.iter().map(|s| (s.op(), s.width())).collect::<Vec<_>>();
        assert_eq!(ops, [(Op::IDiv, Width::Long), (Op::Mod, Width::Byte), (Op::Not, Width::Byte)]);
    }

    #[test]
    fn test_wide_operand() {
        let mut table = SymbolTable::new();
        let f = table.add_function("f", ValueType::Void);
        let v = table.add_variable(f, "v", ValueType::Int8).unwrap();
        let mut program = Program::new();
        let mut lowering = Lowering::new(&mut table, &mut program);
        lowering.enter_function(f);
        // computed in the wider operand type, never in the narrower node type
        let add = Node::binary(NodeKind::Add, ValueType::Int8, Node::id(v, ValueType::Int8),
                               Node::num(Immediate::Int(1000)));
        let result = lowering.accept_expr(&add).unwrap().unwrap();
        assert_eq!(result.value_type(), ValueType::Int);
        assert_eq!(program.to_string(), indoc! {"
            0: coerce.long #2 -> #3
            1: add.long #3 1000 -> #4
        "});
    }

    #[test]
    fn test_expr_list() {
        let mut table = SymbolTable::new();
        let f = table.add_function("f", ValueType::Void);
        let x = table.add_variable(f, "x", ValueType::UInt8).unwrap();
        let mut program = Program::new();
        let mut lowering = Lowering::new(&mut table, &mut program);
        lowering.enter_function(f);
        let list = Node::list(NodeKind::ExprList, vec![
            Node::num(Immediate::Int(3)),
            Node::id(x, ValueType::UInt8),
            Node::num(Immediate::Bool(true)),
        ]);
        lowering.visit_expr_list(&list).unwrap();
        assert_eq!(program.to_string(), indoc! {"
            0: param.long 3
            1: param.byte #2
            2: param.byte true
        "});
    }
}
