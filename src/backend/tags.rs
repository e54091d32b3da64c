//! Runtime tag allocation for type constructors.
//!
//! Every type constructor in a compilation unit gets a small integer
//! discriminant. A fixed low range is reserved for the function-type
//! constructor, the type of types, and the built-in scalar types; user
//! constructors are numbered from [`USER_TAG_BASE`] upward, which leaves
//! headroom to add built-ins later without renumbering user types. Tags
//! are unique and stable within one unit only.

use hashbrown::HashMap;
use strum::{EnumIter, IntoEnumIterator};

use crate::context::{Context, DefKind, Name};

/// A runtime discriminant for a type constructor
pub type Tag = u32;

/// Per-unit map from type-constructor names to their runtime tags
pub type TagTable = HashMap<Name, Tag>;

/// Tag of the function-type constructor
pub const FUNCTION_TYPE_TAG: Tag = 1;
/// Tag of the type-of-types constructor
pub const TYPE_OF_TYPES_TAG: Tag = 2;
/// First tag handed out to the built-in scalar types
pub const PRIM_TAG_BASE: Tag = 3;
/// First tag handed out to user type constructors; strictly above
/// everything in the reserved range
pub const USER_TAG_BASE: Tag = 100;

/// The built-in scalar types occupying the reserved tag range
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PrimType {
    Int,
    Integer,
    Double,
    Char,
    Str,
}

impl PrimType {
    pub fn tag(self) -> Tag {
        PRIM_TAG_BASE + self as Tag
    }

    /// The table name under which this scalar is registered
    pub fn name(self) -> Name {
        Name::qualified(&["prim"], &self.to_string())
    }
}

/// Name under which the function-type constructor is tagged
pub fn function_type_name() -> Name {
    Name::qualified(&["prim"], "arrow")
}

/// Name under which the type-of-types constructor is tagged
pub fn type_of_types_name() -> Name {
    Name::qualified(&["prim"], "type")
}

/// Seeds the reserved low range. These entries are present with the same
/// values in every unit, no matter which user constructors appear.
pub fn reserved_tags() -> TagTable {
    let mut table = TagTable::new();

    table.insert(function_type_name(), FUNCTION_TYPE_TAG);
    table.insert(type_of_types_name(), TYPE_OF_TYPES_TAG);

    for prim in PrimType::iter() {
        table.insert(prim.name(), prim.tag());
    }

    table
}

/// Assigns `counter`-and-up tags to every type constructor in `names`, in
/// the order supplied.
///
/// The table and counter are threaded explicitly (in and out) rather than
/// kept in ambient state, so allocation is reproducible and testable in
/// isolation. Names that do not resolve, and definitions that are not type
/// constructors, receive no entry.
pub fn assign_tags(
    ctx: &Context,
    names: &[Name],
    mut table: TagTable,
    mut counter: Tag,
) -> (TagTable, Tag) {
    for name in names {
        let Some(definition) = ctx.lookup(name) else {
            continue;
        };

        if definition.kind == DefKind::TypeCtor {
            let Some(full_name) = ctx.canonical(name) else {
                continue;
            };

            table.insert(full_name, counter);
            counter += 1;
        }
    }

    (table, counter)
}

/// Builds the unit's full tag table: the reserved entries plus every user
/// type constructor among `names`, numbered from [`USER_TAG_BASE`].
///
/// `names` must already be in the driver's deterministic enumeration order
/// for builds to be reproducible.
pub fn build_tag_table(ctx: &Context, names: &[Name]) -> TagTable {
    let (table, _) = assign_tags(ctx, names, reserved_tags(), USER_TAG_BASE);

    table
}
