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

//! Three-address programs.

use std::fmt::{Display, Formatter};
use std::ops::Index;
use displaydoc::Display as DisplayDoc;
use thiserror::Error;

use super::instr::Statement;

/// Errors when building up a [`Program`].
#[derive(Debug, DisplayDoc, Error)]
pub enum Error {
    /// malformed statement for line {line}: `{statement}` does not fit its operator
    MalformedStatement {
        /// Line this statement was going to occupy.
        line: usize,
        /// The offending statement.
        statement: Statement,
    },
}

/// A program is a series of [`Statement`]s, addressed by their index ("line").
///
/// Programs only ever grow at the end, so line numbers stay valid once handed out.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Program {
    statements: Vec<Statement>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self { Self::default() }

    /// Number of statements.
    pub fn len(&self) -> usize { self.statements.len() }

    /// Whether or not this program is empty.
    pub fn is_empty(&self) -> bool { self.statements.is_empty() }

    /// Statement at `line`.
    pub fn get(&self, line: usize) -> Option<&Statement> { self.statements.get(line) }

    /// Iterate through all the statements.
    pub fn iter(&self) -> std::slice::Iter<Statement> { self.statements.iter() }

    /// Append a statement, returning its line.
    pub fn append(&mut self, statement: Statement) -> Result<usize, Error> {
        let line = self.statements.len();
        if !statement.conforms() {
            return Err(Error::MalformedStatement { line, statement });
        }
        self.statements.push(statement);
        Ok(line)
    }
}

impl Index<usize> for Program {
    type Output = Statement;
    fn index(&self, line: usize) -> &Statement { &self.statements[line] }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;
    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (line, statement) in self.iter().enumerate() {
            writeln!(f, "{}: {}", line, statement)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use itertools::assert_equal;
    use super::{Error, Program};
    use crate::ir::{Immediate, Op, Statement, Width};

    #[test]
    fn test_append() {
        let mut program = Program::new();
        let ret = Statement::new(Width::Void, Op::Return, Some(Immediate::Int(0).into()), None, None);
        assert_eq!(program.append(ret.clone()).unwrap(), 0);
        assert!(matches!(
            program.append(Statement::bare(Op::Add)),
            Err(Error::MalformedStatement { line: 1, .. })
        ));
        assert_eq!(program.len(), 1);
        assert_eq!(program[0], ret);
        assert_equal(program.to_string().lines(), ["0: return.void 0"]);
    }
}
