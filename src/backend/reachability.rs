//! Transitive-closure analysis over the global definition table.
//!
//! Whatever this analysis does not reach is dead code: it is never lowered,
//! optimized, tagged, or emitted.

use std::collections::VecDeque;

use hashbrown::HashSet;

use crate::context::{Context, Name};

/// A visited/accumulator set of names. Membership tests must stay O(1);
/// units can reach thousands of definitions.
pub type NameSet = HashSet<Name>;

/// Collects every name transitively reachable from `roots` through the
/// "refers-to" edges of the definition table, roots included.
///
/// This is an explicit work-queue loop rather than recursion: reference
/// graphs contain mutual recursion (cycles) and can be deep enough to
/// threaten the stack. The visited check runs before expansion, so no name
/// is expanded twice and termination is guaranteed. Names absent from the
/// table (forward declarations without bodies, pruned dead code) are
/// skipped without error.
///
/// Newly discovered edges are queued in declaration order behind whatever
/// is already pending, so the traversal is breadth-first-like but not
/// strictly level-ordered. Callers must not rely on any particular
/// enumeration order of the result.
pub fn reachable_names(ctx: &Context, roots: &[Name]) -> NameSet {
    let mut visited = NameSet::new();
    let mut queue: VecDeque<Name> = roots.iter().cloned().collect();

    while let Some(name) = queue.pop_front() {
        if visited.contains(&name) {
            continue;
        }

        let Some(definition) = ctx.lookup(&name) else {
            continue;
        };

        queue.extend(definition.refers_to.iter().cloned());
        visited.insert(name);
    }

    visited
}
