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

//! Statements for three-address code.

use std::fmt::{Display, Formatter};
use parse_display::{Display, FromStr};
use smallvec::SmallVec;

use crate::symbol::{SymbolId, SymbolTable, ValueType};

/// Physical width class of an operation.
#[derive(Debug, Display, FromStr, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[display(style = "lowercase")]
pub enum Width {
    /// No value involved.
    Void,
    /// 8-bit.
    Byte,
    /// 16-bit.
    Word,
    /// 32-bit.
    Long,
    /// 64-bit, also used for addresses.
    Quad,
}

impl Width {
    /// Size in bytes of a value of this width.
    pub fn bytes(self) -> usize {
        match self {
            Width::Void => 0,
            Width::Byte => 1,
            Width::Word => 2,
            Width::Long => 4,
            Width::Quad => 8,
        }
    }
}

impl From<ValueType> for Width {
    fn from(ty: ValueType) -> Width { ty.width() }
}

/// Operators.
#[derive(Debug, Display, FromStr, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[display(style = "lowercase")]
#[allow(missing_docs)]
pub enum Op {
    // structural
    Func,
    Return,
    Param,
    Call,
    Label,
    Goto,
    // data movement
    Assign,
    Load,
    Store,
    // arithmetic and logic
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
    IMod,
    And,
    Or,
    Not,
    Neg,
    // relational jumps
    Je,
    Jne,
    Jb,
    Jl,
    Jnb,
    Jge,
    Jbe,
    Jle,
    Ja,
    Jg,
    Jnz,
    Jz,
    // relational sets
    Sete,
    Setne,
    Setg,
    Setge,
    Setl,
    Setle,
    Seta,
    Setnb,
    Setb,
    Setbe,
    // conversion
    Coerce,
}

/// How a statement fills one of its operand (or result) slots.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Slot {
    /// Must be left empty.
    Unused,
    /// Must be filled.
    Required,
    /// Might be filled.
    Optional,
}

impl Slot {
    /// Does this slot admit being `filled` (or not)?
    pub fn admits(self, filled: bool) -> bool {
        match self {
            Slot::Unused => !filled,
            Slot::Required => filled,
            Slot::Optional => true,
        }
    }
}

/// Which slots of a statement an operator uses.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(missing_docs)]
pub struct Signature {
    pub operand1: Slot,
    pub operand2: Slot,
    pub result: Slot,
}

/// Relations for comparisons.
#[derive(Debug, Display, FromStr, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[display(style = "lowercase")]
#[allow(missing_docs)]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Relation {
    /// The relation holding exactly when `self` does not.
    pub fn negate(self) -> Relation {
        use Relation::*;
        match self {
            Eq => Ne,
            Ne => Eq,
            Lt => Ge,
            Ge => Lt,
            Gt => Le,
            Le => Gt,
        }
    }
}

impl Op {
    /// All the operators.
    pub const ALL: [Op; 43] = {
        use Op::*;
        [
            Func, Return, Param, Call, Label, Goto,
            Assign, Load, Store,
            Add, Sub, Mul, Div, IDiv, Mod, IMod, And, Or, Not, Neg,
            Je, Jne, Jb, Jl, Jnb, Jge, Jbe, Jle, Ja, Jg, Jnz, Jz,
            Sete, Setne, Setg, Setge, Setl, Setle, Seta, Setnb, Setb, Setbe,
            Coerce,
        ]
    };

    /// Slots used by statements with this operator.
    pub fn signature(self) -> Signature {
        use Op::*;
        use Slot::*;
        let (operand1, operand2, result) = match self {
            Func | Param | Label | Goto => (Required, Unused, Unused),
            Return => (Optional, Unused, Unused),
            Call => (Required, Unused, Optional),
            Assign | Not | Neg | Coerce | Jz | Jnz => (Required, Unused, Required),
            Load | Store => (Required, Required, Required),
            Add | Sub | Mul | Div | IDiv | Mod | IMod | And | Or => (Required, Required, Required),
            Je | Jne | Jb | Jl | Jnb | Jge | Jbe | Jle | Ja | Jg => (Required, Required, Required),
            Sete | Setne | Setg | Setge | Setl | Setle | Seta | Setnb | Setb | Setbe =>
                (Required, Required, Required),
        };
        Signature { operand1, operand2, result }
    }

    /// Number of operands that might hold a value.
    ///
    /// The operand of `call`, `label` and `goto` names a function or a label instead, so they
    /// have no value operand at all.
    pub fn arity(self) -> usize {
        use Op::*;
        match self {
            Call | Label | Goto => 0,
            Func | Return | Param | Assign | Not | Neg | Coerce | Jz | Jnz => 1,
            _ => 2,
        }
    }

    /// Whether or not statements with this operator (might) fill in the result slot.
    pub fn has_result(self) -> bool { self.signature().result != Slot::Unused }

    /// Function calls, and unconditional or conditional jumps.
    pub fn is_jump(self) -> bool {
        matches!(self, Op::Call | Op::Goto) || self.is_conditional_jump()
    }

    /// Conditional jumps.
    pub fn is_conditional_jump(self) -> bool {
        use Op::*;
        matches!(self, Je | Jne | Jb | Jl | Jnb | Jge | Jbe | Jle | Ja | Jg | Jnz | Jz)
    }

    /// Jump to the result label if `relation` holds for the operands.
    pub fn jump(relation: Relation, signed: bool) -> Op {
        use Op::*;
        match relation {
            Relation::Eq => Je,
            Relation::Ne => Jne,
            Relation::Lt => if signed { Jl } else { Jb },
            Relation::Gt => if signed { Jg } else { Ja },
            Relation::Le => if signed { Jle } else { Jbe },
            Relation::Ge => if signed { Jge } else { Jnb },
        }
    }

    /// Set the (boolean) result to whether `relation` holds for the operands.
    pub fn set(relation: Relation, signed: bool) -> Op {
        use Op::*;
        match relation {
            Relation::Eq => Sete,
            Relation::Ne => Setne,
            Relation::Lt => if signed { Setl } else { Setb },
            Relation::Gt => if signed { Setg } else { Seta },
            Relation::Le => if signed { Setle } else { Setbe },
            Relation::Ge => if signed { Setge } else { Setnb },
        }
    }
}

/// Immediate operands, i.e. literal values.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum Immediate {
    #[display("{0}i8")]
    Int8(i8),
    #[display("{0}u8")]
    UInt8(u8),
    #[display("{0}")]
    Int(i32),
    #[display("{0}u")]
    UInt(u32),
    #[display("{0}")]
    Bool(bool),
}

impl Immediate {
    /// Static type of this value.
    pub fn value_type(self) -> ValueType {
        match self {
            Immediate::Int8(_) => ValueType::Int8,
            Immediate::UInt8(_) => ValueType::UInt8,
            Immediate::Int(_) => ValueType::Int,
            Immediate::UInt(_) => ValueType::UInt,
            Immediate::Bool(_) => ValueType::Bool,
        }
    }
}

/// Reference to a symbol, together with its static type.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
#[display("#{id}")]
pub struct SymbolRef {
    /// The symbol referred to.
    pub id: SymbolId,
    /// Its static type.
    pub ty: ValueType,
}

impl SymbolRef {
    /// Create a new symbol reference.
    pub fn new(id: SymbolId, ty: ValueType) -> Self { SymbolRef { id, ty } }
}

/// Operands.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Operand {
    /// Literal value.
    #[display("{0}")]
    Immediate(Immediate),
    /// Value of a symbol (or the symbol itself, for functions and labels).
    #[display("{0}")]
    Symbol(SymbolRef),
}

impl Operand {
    /// Static type of this operand.
    pub fn value_type(&self) -> ValueType {
        match self {
            Operand::Immediate(imm) => imm.value_type(),
            Operand::Symbol(sym) => sym.ty,
        }
    }

    /// The symbol referred to, if this is a symbol operand.
    pub fn symbol(&self) -> Option<SymbolRef> {
        match self {
            Operand::Symbol(sym) => Some(*sym),
            Operand::Immediate(_) => None,
        }
    }

    /// Id of the symbol referred to, if this is a symbol operand.
    pub fn symbol_id(&self) -> Option<SymbolId> { self.symbol().map(|sym| sym.id) }
}

impl From<Immediate> for Operand {
    fn from(imm: Immediate) -> Self { Operand::Immediate(imm) }
}

impl From<SymbolRef> for Operand {
    fn from(sym: SymbolRef) -> Self { Operand::Symbol(sym) }
}

/// Three-address statement: `result = operand1 op operand2`, roughly.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Statement {
    width: Width,
    op: Op,
    operand1: Option<Operand>,
    operand2: Option<Operand>,
    result: Option<Operand>,
}

impl Statement {
    /// Create a new statement. Whether it fits the signature of `op` is checked once it gets
    /// appended to a [`Program`](super::Program).
    pub fn new(width: Width, op: Op, operand1: Option<Operand>, operand2: Option<Operand>,
               result: Option<Operand>) -> Self {
        Statement { width, op, operand1, operand2, result }
    }

    /// Statement with no operands at all.
    pub fn bare(op: Op) -> Self { Statement::new(Width::Void, op, None, None, None) }

    /// Width class.
    pub fn width(&self) -> Width { self.width }
    /// Operator.
    pub fn op(&self) -> Op { self.op }
    /// First operand.
    pub fn operand1(&self) -> Option<&Operand> { self.operand1.as_ref() }
    /// Second operand.
    pub fn operand2(&self) -> Option<&Operand> { self.operand2.as_ref() }
    /// Result.
    pub fn result(&self) -> Option<&Operand> { self.result.as_ref() }

    /// Does this statement fill exactly the slots its operator expects?
    pub fn conforms(&self) -> bool {
        let Signature { operand1, operand2, result } = self.op.signature();
        operand1.admits(self.operand1.is_some())
            && operand2.admits(self.operand2.is_some())
            && result.admits(self.result.is_some())
    }

    /// All the operands present (the result excluded).
    pub fn operands(&self) -> SmallVec<[&Operand; 2]> {
        self.operand1.iter().chain(self.operand2.iter()).collect()
    }

    /// Label this statement might jump to.
    pub fn jump_target(&self) -> Option<SymbolId> {
        match self.op {
            Op::Goto => self.operand1.and_then(|x| x.symbol_id()),
            op if op.is_conditional_jump() => self.result.and_then(|x| x.symbol_id()),
            _ => None,
        }
    }

    /// Function called by this statement.
    pub fn callee(&self) -> Option<SymbolId> {
        match self.op {
            Op::Call => self.operand1.and_then(|x| x.symbol_id()),
            _ => None,
        }
    }

    /// Does this statement read the value of the variable in `operand1`?
    pub fn reads_operand1(&self, table: &SymbolTable) -> bool {
        self.op.arity() >= 1 && tracked(table, self.operand1.as_ref()).is_some()
    }

    /// Does this statement read the value of the variable in `operand2`?
    pub fn reads_operand2(&self, table: &SymbolTable) -> bool {
        self.op.arity() == 2 && tracked(table, self.operand2.as_ref()).is_some()
    }

    /// Does this statement overwrite the variable in `result`?
    pub fn writes_result(&self, table: &SymbolTable) -> bool {
        self.op.has_result() && tracked(table, self.result.as_ref()).is_some()
    }

    /// Variables read by this statement.
    pub fn reads(&self, table: &SymbolTable) -> SmallVec<[SymbolId; 2]> {
        let mut reads = SmallVec::new();
        if self.reads_operand1(table) { reads.extend(self.operand1.and_then(|x| x.symbol_id())); }
        if self.reads_operand2(table) { reads.extend(self.operand2.and_then(|x| x.symbol_id())); }
        reads
    }

    /// Variable written by this statement.
    pub fn writes(&self, table: &SymbolTable) -> Option<SymbolId> {
        if self.writes_result(table) { self.result.and_then(|x| x.symbol_id()) } else { None }
    }
}

/// Symbol behind `operand`, if it is a scalar variable (arrays always stay in memory).
fn tracked(table: &SymbolTable, operand: Option<&Operand>) -> Option<SymbolId> {
    let id = operand?.symbol_id()?;
    let symbol = table.get(id)?;
    (symbol.kind.is_variable() && !symbol.ty.is_array()).then(|| id)
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.op, self.width)?;
        for x in self.operands() { write!(f, " {}", x)?; }
        if let Some(result) = &self.result { write!(f, " -> {}", result)?; }
        Ok(())
    }
}
