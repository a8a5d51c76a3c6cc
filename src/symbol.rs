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

//! Symbols, their static types, and the symbol table.
//!
//! The table is filled in by the parser (functions, parameters, variables), and extended during
//! lowering with temporaries and labels. Later stages only read it.

use std::collections::BTreeMap;
use parse_display::{Display, FromStr};

use crate::ir::Width;

/// Identifier of a symbol, unique across the whole compilation unit.
#[derive(Debug, Display, FromStr, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[display("{0}")]
pub struct SymbolId(pub usize);

/// Static type of a value (or of a symbol, or the return type of a function).
#[derive(Debug, Display, FromStr, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum ValueType {
    #[display("unknown")]
    Unknown,
    #[display("error")]
    Error,
    #[display("void")]
    Void,
    #[display("int")]
    Int,
    #[display("int[]")]
    IntArray,
    #[display("int8")]
    Int8,
    #[display("int8[]")]
    Int8Array,
    #[display("unsigned")]
    UInt,
    #[display("unsigned[]")]
    UIntArray,
    #[display("unsigned8")]
    UInt8,
    #[display("unsigned8[]")]
    UInt8Array,
    #[display("bool")]
    Bool,
}

impl ValueType {
    /// Is this an array type?
    pub fn is_array(self) -> bool {
        use ValueType::*;
        matches!(self, IntArray | Int8Array | UIntArray | UInt8Array)
    }

    /// Is this a signed type? Arrays are signed if their elements are.
    pub fn is_signed(self) -> bool {
        use ValueType::*;
        matches!(self, Int | Int8 | IntArray | Int8Array)
    }

    /// Is this a type of a single value, i.e. something an operand can carry?
    pub fn is_scalar(self) -> bool {
        use ValueType::*;
        matches!(self, Int | Int8 | UInt | UInt8 | Bool)
    }

    /// Element type of an array type.
    pub fn element(self) -> Option<ValueType> {
        use ValueType::*;
        match self {
            IntArray => Some(Int),
            Int8Array => Some(Int8),
            UIntArray => Some(UInt),
            UInt8Array => Some(UInt8),
            _ => None,
        }
    }

    /// Physical width of values of this type. Arrays are passed around by address.
    pub fn width(self) -> Width {
        use ValueType::*;
        match self {
            Int | UInt => Width::Long,
            Int8 | UInt8 | Bool => Width::Byte,
            IntArray | Int8Array | UIntArray | UInt8Array => Width::Quad,
            Unknown | Error | Void => Width::Void,
        }
    }

    /// Type in which a binary operation on `self` and `other` is computed.
    pub fn common(self, other: ValueType) -> ValueType {
        use ValueType::*;
        match (self, other) {
            _ if self == other => self,
            (UInt, _) | (_, UInt) => UInt,
            _ => Int,
        }
    }

    /// Does a value of type `self` need an implicit (widening) coercion to be used as `target`?
    ///
    /// Narrowing never happens implicitly, only through an explicit cast in the source.
    pub fn widens_to(self, target: ValueType) -> bool {
        self.is_scalar() && target.is_scalar()
            && self.width().bytes() < target.width().bytes()
    }
}

/// What a symbol stands for.
#[derive(Debug, Display, FromStr, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[display(style = "lowercase")]
#[allow(missing_docs)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    Temporary,
    Label,
}

impl SymbolKind {
    /// Variables, parameters and temporaries hold values; functions and labels do not.
    pub fn is_variable(self) -> bool {
        matches!(self, SymbolKind::Variable | SymbolKind::Parameter | SymbolKind::Temporary)
    }
}

/// A symbol: a named entity in the program.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Symbol {
    /// Name, unique within its scope. Temporaries are named `&N`, labels `@N`.
    pub name: String,
    /// Static type; the return type for functions, [`ValueType::Void`] for labels.
    pub ty: ValueType,
    /// Kind of this symbol.
    pub kind: SymbolKind,
    /// Enclosing function, or `None` for globals and functions.
    pub owner: Option<SymbolId>,
}

#[derive(Debug, Default, Clone)]
struct FunctionInfo {
    parameters: Vec<SymbolId>,
    variables: Vec<SymbolId>,
}

/// The symbol table.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    // symbol `k` lives at index `k - 1`
    symbols: Vec<Symbol>,
    functions: BTreeMap<SymbolId, FunctionInfo>,
}

impl SymbolTable {
    /// Create an empty symbol table.
    pub fn new() -> Self { Self::default() }

    /// Number of symbols in this table.
    pub fn len(&self) -> usize { self.symbols.len() }

    /// Whether or not this table is empty.
    pub fn is_empty(&self) -> bool { self.symbols.is_empty() }

    fn push(&mut self, name: impl Into<String>, ty: ValueType, kind: SymbolKind,
            owner: Option<SymbolId>) -> SymbolId {
        self.symbols.push(Symbol { name: name.into(), ty, kind, owner });
        SymbolId(self.symbols.len())
    }

    fn function_info(&mut self, function: SymbolId) -> Option<&mut FunctionInfo> {
        self.functions.get_mut(&function)
    }

    /// Register a global variable.
    pub fn add_global(&mut self, name: impl Into<String>, ty: ValueType) -> SymbolId {
        self.push(name, ty, SymbolKind::Variable, None)
    }

    /// Register a function with the given return type.
    pub fn add_function(&mut self, name: impl Into<String>, return_type: ValueType) -> SymbolId {
        let id = self.push(name, return_type, SymbolKind::Function, None);
        self.functions.insert(id, FunctionInfo::default());
        id
    }

    /// Register the next parameter of `function`.
    pub fn add_parameter(&mut self, function: SymbolId, name: impl Into<String>,
                         ty: ValueType) -> Option<SymbolId> {
        self.function_info(function)?;
        let id = self.push(name, ty, SymbolKind::Parameter, Some(function));
        self.function_info(function)?.parameters.push(id);
        Some(id)
    }

    /// Register a local variable of `function`.
    pub fn add_variable(&mut self, function: SymbolId, name: impl Into<String>,
                        ty: ValueType) -> Option<SymbolId> {
        self.function_info(function)?;
        let id = self.push(name, ty, SymbolKind::Variable, Some(function));
        self.function_info(function)?.variables.push(id);
        Some(id)
    }

    /// Allocate a temporary in `function`.
    pub fn add_temporary(&mut self, name: impl Into<String>, ty: ValueType,
                         function: SymbolId) -> Option<SymbolId> {
        self.function_info(function)?;
        let id = self.push(name, ty, SymbolKind::Temporary, Some(function));
        self.function_info(function)?.variables.push(id);
        Some(id)
    }

    /// Allocate a label in `function`.
    pub fn add_label(&mut self, name: impl Into<String>, function: SymbolId) -> Option<SymbolId> {
        self.function_info(function)?;
        Some(self.push(name, ValueType::Void, SymbolKind::Label, Some(function)))
    }

    /// Look up a symbol.
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        id.0.checked_sub(1).and_then(|k| self.symbols.get(k))
    }

    /// All the functions, in ascending order of their ids.
    pub fn functions(&self) -> impl Iterator<Item=SymbolId> + '_ {
        self.functions.keys().copied()
    }

    /// Find a function by its name.
    pub fn find_function(&self, name: &str) -> Option<SymbolId> {
        self.functions().find(|&f| self.get(f).map_or(false, |s| s.name == name))
    }

    /// Parameters of `function`, in declaration order.
    pub fn parameters(&self, function: SymbolId) -> Option<&[SymbolId]> {
        self.functions.get(&function).map(|info| info.parameters.as_slice())
    }

    /// Local variables and temporaries of `function`, in allocation order.
    pub fn variables(&self, function: SymbolId) -> Option<&[SymbolId]> {
        self.functions.get(&function).map(|info| info.variables.as_slice())
    }

    /// Is this symbol a global (i.e. not owned by any function)?
    pub fn is_global(&self, id: SymbolId) -> bool {
        self.get(id).map_or(false, |s| s.owner.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::{SymbolId, SymbolKind, SymbolTable, ValueType};
    use crate::ir::Width;

    #[test]
    fn test_value_type() {
        use ValueType::*;
        assert_eq!(Int.width(), Width::Long);
        assert_eq!(UInt8.width(), Width::Byte);
        assert_eq!(Bool.width(), Width::Byte);
        assert_eq!(Int8Array.width(), Width::Quad);
        assert_eq!(Void.width(), Width::Void);
        assert_eq!(IntArray.element(), Some(Int));
        assert_eq!(UInt8Array.element(), Some(UInt8));
        assert_eq!(Bool.element(), None);
        assert_eq!(Int8.common(Int), Int);
        assert_eq!(Int.common(UInt), UInt);
        assert_eq!(Int8.common(UInt8), Int);
        assert!(Int8.widens_to(Int));
        assert!(Bool.widens_to(UInt));
        assert!(!Int.widens_to(Int8));
        assert!(!Int.widens_to(UInt));
        assert!(!IntArray.widens_to(Int));
        assert_eq!("unsigned8[]".parse::<ValueType>().unwrap(), UInt8Array);
    }

    #[test]
    fn test_symbol_table() {
        let mut table = SymbolTable::new();
        let g = table.add_global("g", ValueType::Int);
        let f = table.add_function("f", ValueType::Void);
        let p = table.add_parameter(f, "p", ValueType::Int8).unwrap();
        let t = table.add_temporary("&0", ValueType::Int, f).unwrap();
        let l = table.add_label("@0", f).unwrap();
        assert_eq!(g, SymbolId(1));
        assert!(table.get(SymbolId(0)).is_none());
        assert!(table.is_global(g) && table.is_global(f) && !table.is_global(p));
        assert_eq!(table.parameters(f), Some(&[p][..]));
        assert_eq!(table.variables(f), Some(&[t][..]));
        assert_eq!(table.get(l).unwrap().kind, SymbolKind::Label);
        assert_eq!(table.get(t).unwrap().owner, Some(f));
        assert_eq!(table.find_function("f"), Some(f));
        assert_eq!(table.find_function("g"), None);
        // not a function: nothing to attach to
        assert_eq!(table.add_label("@1", g), None);
        assert_eq!(table.add_temporary("&1", ValueType::Int, p), None);
        assert_eq!(table.len(), 5);
    }
}
