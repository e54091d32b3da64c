//! The global definition table and the names that key it.
//!
//! Definitions arrive here fully elaborated; this module only stores them,
//! hands out canonical handles, and applies the per-definition lowering and
//! optimization steps the compilation driver schedules.

use hashbrown::HashMap;
use itertools::Itertools;

use crate::intern::InternedSymbol;

/// An ordered list of namespace segments, displayed dot-joined
/// (e.g. `prelude.types`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(Vec<InternedSymbol>);

impl Namespace {
    pub fn from_segments(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| InternedSymbol::new(s)).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().map(|s| s.value()).join("."))
    }
}

/// A canonical handle into the global definition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefId(u32);

impl DefId {
    fn new(index: usize) -> Self {
        Self(index as _)
    }

    pub fn index(self) -> usize {
        self.0 as _
    }
}

/// A globally unique identifier for a definition.
///
/// The table is always keyed by the fully-qualified form. Once a name has
/// been resolved against the table, the [`Name::Resolved`] handle can stand
/// in for it everywhere; [`Context::canonical`] converts back. Keying the
/// table with anything but the fully-qualified form is an invariant
/// violation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// Fully-qualified form: namespace segments plus a base identifier
    Qualified {
        namespace: Namespace,
        base: InternedSymbol,
    },
    /// Canonical interned handle, valid for one [`Context`]
    Resolved(DefId),
}

impl Name {
    pub fn qualified(namespace: &[&str], base: &str) -> Self {
        Self::Qualified {
            namespace: Namespace::from_segments(namespace),
            base: InternedSymbol::new(base),
        }
    }

    /// Parses a dotted identifier (`list.map`) into its fully-qualified
    /// form. The final segment is the base identifier; everything before it
    /// is the namespace.
    pub fn parse(text: &str) -> Self {
        let mut segments: Vec<&str> = text.split('.').collect();

        let base = segments
            .pop()
            .expect("str::split always yields at least one segment");

        Self::Qualified {
            namespace: Namespace::from_segments(&segments),
            base: InternedSymbol::new(base),
        }
    }
}

impl core::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Name::Qualified { namespace, base } => {
                if namespace.is_empty() {
                    write!(f, "{base}")
                } else {
                    write!(f, "{namespace}.{base}")
                }
            }
            Name::Resolved(id) => write!(f, "${}", id.index()),
        }
    }
}

/// What sort of thing a definition is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefKind {
    /// An ordinary top-level function
    Function,
    /// A data type constructor; receives a runtime tag
    TypeCtor,
    /// A constructor of values belonging to some data type
    DataCtor,
    /// A foreign declaration carrying its unparsed calling-convention
    /// string
    Foreign { convention: String },
    /// A forward declaration whose body has not been elaborated yet
    ForwardDecl,
}

/// The intermediate form of one definition, produced by lowering.
///
/// The clock stamps record when each step ran relative to the rest of the
/// unit, which is how the driver's two-pass ordering stays observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDef {
    pub body: String,
    pub lowered_at: u32,
    pub optimized_at: Option<u32>,
}

/// A single entry in the global definition table
#[derive(Debug, Clone)]
pub struct Definition {
    pub kind: DefKind,
    /// The names this definition directly references, in declaration order
    pub refers_to: Vec<Name>,
    /// Set by [`Context::lower_def`], `None` until then
    pub compiled: Option<CompiledDef>,
}

impl Definition {
    pub fn new(kind: DefKind, refers_to: Vec<Name>) -> Self {
        Self {
            kind,
            refers_to,
            compiled: None,
        }
    }
}

#[derive(Debug)]
struct DefEntry {
    /// Always the fully-qualified form
    full_name: Name,
    definition: Definition,
}

/// The global definition table for one compilation unit
#[derive(Debug, Default)]
pub struct Context {
    entries: Vec<DefEntry>,
    by_name: HashMap<Name, DefId>,
    /// Monotone stamp source for lowering/optimization bookkeeping
    clock: u32,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or, for a forward declaration getting its body, replaces) a
    /// definition under its fully-qualified name.
    pub fn add_def(&mut self, name: Name, definition: Definition) -> DefId {
        assert!(
            matches!(name, Name::Qualified { .. }),
            "definitions must be keyed by their fully-qualified names"
        );

        if let Some(&id) = self.by_name.get(&name) {
            self.entries[id.index()].definition = definition;
            return id;
        }

        let id = DefId::new(self.entries.len());

        self.entries.push(DefEntry {
            full_name: name.clone(),
            definition,
        });
        self.by_name.insert(name, id);

        id
    }

    /// Looks a name up in either form. `None` for unknown names; the
    /// callers treat that as a legitimate forward-declaration state, not an
    /// error.
    pub fn resolve(&self, name: &Name) -> Option<DefId> {
        match name {
            Name::Resolved(id) => (id.index() < self.entries.len()).then_some(*id),
            Name::Qualified { .. } => self.by_name.get(name).copied(),
        }
    }

    /// Converts any form of a known name back to its fully-qualified form
    pub fn canonical(&self, name: &Name) -> Option<Name> {
        self.resolve(name)
            .map(|id| self.entries[id.index()].full_name.clone())
    }

    pub fn lookup(&self, name: &Name) -> Option<&Definition> {
        self.resolve(name)
            .map(|id| &self.entries[id.index()].definition)
    }

    pub fn def_count(&self) -> usize {
        self.entries.len()
    }

    /// Lowers one definition to its intermediate form. Unknown names are
    /// skipped quietly; lowering the same name twice is a no-op.
    pub fn lower_def(&mut self, name: &Name) {
        let Some(id) = self.resolve(name) else {
            return;
        };

        let entry = &mut self.entries[id.index()];

        if entry.definition.compiled.is_some() {
            return;
        }

        self.clock += 1;
        entry.definition.compiled = Some(CompiledDef {
            body: lower_body(&entry.definition),
            lowered_at: self.clock,
            optimized_at: None,
        });
    }

    /// Runs the inlining/optimization step over one already-lowered
    /// definition. Unknown or not-yet-lowered names are skipped quietly.
    pub fn optimize_def(&mut self, name: &Name) {
        let Some(id) = self.resolve(name) else {
            return;
        };

        let entry = &mut self.entries[id.index()];

        if let Some(compiled) = entry.definition.compiled.as_mut() {
            self.clock += 1;
            compiled.optimized_at = Some(self.clock);
        }
    }
}

fn lower_body(definition: &Definition) -> String {
    match &definition.kind {
        DefKind::Function => format!(
            "call [{}]",
            definition.refers_to.iter().map(Name::to_string).join(", ")
        ),
        DefKind::TypeCtor => "tycon".to_owned(),
        DefKind::DataCtor => "ctor".to_owned(),
        DefKind::Foreign { convention } => format!("foreign \"{convention}\""),
        DefKind::ForwardDecl => "declared".to_owned(),
    }
}
