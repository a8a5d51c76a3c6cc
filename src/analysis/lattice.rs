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

//! (Semi-)Lattice for data flow analysis.

use std::collections::BTreeSet;

/// Semi-lattice with a `⊔` operation.
///
/// # Note
/// This trait does not require a [`PartialOrd`], because the partial order implied by the
/// semi-lattice structure is usually different from the `#[derive(PartialOrd)]` order: e.g.
/// [`PartialOrd`] for [`BTreeSet`] is a lexicographical order, while the lattice order on sets is
/// inclusion. We make no use of the partial order itself in data flow analysis anyway.
pub trait JoinSemiLattice {
    /// The `⊥` element for this semi-lattice: `⊥ ⊔ x = x`.
    fn bottom() -> Self;
    /// Update `self` to `self ⊔ other`, returning whether or not the value becomes different.
    fn join_assign(&mut self, other: &Self) -> bool;
    /// Join all of `others` into `self`, returning whether or not the value becomes different.
    fn join_assign_many<'a>(&mut self, others: impl Iterator<Item=&'a Self>) -> bool
        where Self: 'a {
        let mut changed = false;
        for other in others {
            changed |= self.join_assign(other);
        }
        changed
    }
}

/// Sets form a lattice under inclusion, with `∪` as the join.
impl<T: Ord + Clone> JoinSemiLattice for BTreeSet<T> {
    fn bottom() -> Self { BTreeSet::new() }
    fn join_assign(&mut self, other: &Self) -> bool {
        let old_len = self.len();
        self.extend(other.iter().cloned());
        self.len() != old_len
    }
}
