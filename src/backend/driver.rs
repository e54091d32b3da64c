//! Whole-unit compilation driver.
//!
//! Given a closed entry term, works out exactly which definitions the unit
//! needs, numbers their constructors, and pushes every one of them through
//! lowering and optimization before a backend sees any of it.

use tracing::debug;

use crate::{
    backend::{
        reachability::reachable_names,
        tags::{TagTable, build_tag_table},
    },
    context::{Context, Name},
    term::Term,
};

/// Compiler-internal helpers pulled into every unit so the optimizer can
/// specialize bignum arithmetic down to fixed-width operations where the
/// result provably fits. Membership here only affects optimization
/// opportunities, never correctness, so this is configuration rather than
/// language semantics; helpers a unit never defines simply stay
/// unreachable.
const INT_SPECIALIZATION_HELPERS: &[&str] = &[
    "prelude.types.nat_to_integer",
    "prelude.types.integer_to_nat",
    "prelude.num.integer_plus",
    "prelude.num.integer_minus",
    "prelude.num.integer_mult",
];

/// Everything a backend needs to emit one compilation unit
#[derive(Debug)]
pub struct CompiledUnit {
    /// Every reachable definition in canonical form, deterministically
    /// ordered
    pub names: Vec<Name>,
    /// Runtime tags for every reachable type constructor
    pub tags: TagTable,
}

/// Determines which definitions `term` needs, numbers their type
/// constructors, and lowers then optimizes every one of them.
///
/// Lowering runs over the entire reachable set before the first
/// optimization call: inlining a callee requires its already-lowered form,
/// so the two passes are strictly sequential across the whole unit.
/// Dangling references never raise; they are a legitimate state for
/// forward-declared names.
pub fn compile_unit(ctx: &mut Context, term: &Term) -> CompiledUnit {
    let mut roots = term.references();

    for helper in INT_SPECIALIZATION_HELPERS {
        // Resolved to canonical form before use
        if let Some(full_name) = ctx.canonical(&Name::parse(helper)) {
            roots.push(full_name);
        }
    }

    let reachable = reachable_names(ctx, &roots);
    debug!(count = reachable.len(), "reachability analysis complete");

    // Canonical form plus a fixed ordering makes enumeration (and with it
    // tag allocation) reproducible across runs.
    let mut names: Vec<Name> = reachable
        .iter()
        .filter_map(|name| ctx.canonical(name))
        .collect();
    names.sort_by_cached_key(Name::to_string);

    let tags = build_tag_table(ctx, &names);

    for name in &names {
        ctx.lower_def(name);
    }
    for name in &names {
        ctx.optimize_def(name);
    }

    debug!(count = names.len(), "unit lowered and optimized");

    CompiledUnit { names, tags }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::compile_unit;
    use crate::{
        backend::tags::USER_TAG_BASE,
        context::{Context, DefKind, Definition, Name},
        term::Term,
    };

    fn function(refs: &[&str]) -> Definition {
        Definition::new(
            DefKind::Function,
            refs.iter().map(|r| Name::parse(r)).collect(),
        )
    }

    fn small_program() -> Context {
        let mut ctx = Context::new();

        ctx.add_def(Name::parse("main"), function(&["list.map", "list.List"]));
        ctx.add_def(Name::parse("list.map"), function(&["list.map"]));
        ctx.add_def(Name::parse("list.List"), Definition::new(DefKind::TypeCtor, Vec::new()));
        ctx.add_def(Name::parse("dead.code"), function(&[]));

        ctx
    }

    #[test]
    fn unreachable_definitions_are_never_lowered() {
        let mut ctx = small_program();

        let unit = compile_unit(&mut ctx, &Term::Ref(Name::parse("main")));

        assert!(!unit.names.contains(&Name::parse("dead.code")));
        assert_eq!(ctx.lookup(&Name::parse("dead.code")).unwrap().compiled, None);
    }

    #[test]
    fn the_name_list_is_sorted_and_canonical() {
        let mut ctx = small_program();

        let unit = compile_unit(&mut ctx, &Term::Ref(Name::parse("main")));

        assert_eq!(
            unit.names,
            vec![
                Name::parse("list.List"),
                Name::parse("list.map"),
                Name::parse("main"),
            ]
        );
    }

    #[test]
    fn every_definition_is_lowered_before_any_is_optimized() {
        let mut ctx = small_program();

        let unit = compile_unit(&mut ctx, &Term::Ref(Name::parse("main")));

        let stamps: Vec<_> = unit
            .names
            .iter()
            .map(|name| ctx.lookup(name).unwrap().compiled.clone().unwrap())
            .collect();

        let last_lowering = stamps.iter().map(|c| c.lowered_at).max().unwrap();
        let first_optimization = stamps
            .iter()
            .map(|c| c.optimized_at.expect("every reachable definition is optimized"))
            .min()
            .unwrap();

        assert!(last_lowering < first_optimization);
    }

    #[test]
    fn reachable_type_constructors_are_tagged() {
        let mut ctx = small_program();

        let unit = compile_unit(&mut ctx, &Term::Ref(Name::parse("main")));

        assert_eq!(unit.tags.get(&Name::parse("list.List")), Some(&USER_TAG_BASE));
        assert_eq!(unit.tags.get(&Name::parse("main")), None);
    }

    #[test]
    fn arithmetic_helpers_join_the_roots_when_defined() {
        let mut ctx = small_program();
        ctx.add_def(
            Name::parse("prelude.num.integer_plus"),
            function(&["prelude.num.carry"]),
        );
        ctx.add_def(Name::parse("prelude.num.carry"), function(&[]));

        let unit = compile_unit(&mut ctx, &Term::Ref(Name::parse("main")));

        assert!(unit.names.contains(&Name::parse("prelude.num.integer_plus")));
        assert!(unit.names.contains(&Name::parse("prelude.num.carry")));
    }

    #[test]
    fn undefined_helpers_change_nothing() {
        let mut ctx = small_program();

        let unit = compile_unit(&mut ctx, &Term::Ref(Name::parse("main")));

        assert_eq!(unit.names.len(), 3);
    }

    #[test]
    fn a_literal_entry_term_reaches_nothing() {
        let mut ctx = Context::new();

        let unit = compile_unit(&mut ctx, &Term::Lit(1));

        assert!(unit.names.is_empty());
        // Reserved tags are present even in an empty unit
        assert!(!unit.tags.is_empty());
    }
}
