//! Closed program terms, as handed over by the elaborator.
//!
//! The driver only ever inspects which global definitions a term mentions;
//! everything else about the term is the backend's business.

use crate::context::Name;

/// A closed program expression (no free variables)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A reference to a global definition
    Ref(Name),
    /// Application of one term to another
    App(Box<Term>, Box<Term>),
    /// An integer literal
    Lit(i64),
    /// The unit value
    Unit,
}

impl Term {
    pub fn app(function: Term, argument: Term) -> Self {
        Self::App(Box::new(function), Box::new(argument))
    }

    /// The names this term directly mentions, in syntactic order.
    /// Duplicates are preserved; the reachability analysis deduplicates.
    pub fn references(&self) -> Vec<Name> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, out: &mut Vec<Name>) {
        match self {
            Term::Ref(name) => out.push(name.clone()),
            Term::App(function, argument) => {
                function.collect_references(out);
                argument.collect_references(out);
            }
            Term::Lit(_) | Term::Unit => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::Term;
    use crate::context::Name;

    #[test]
    fn references_come_out_in_syntactic_order() {
        let term = Term::app(
            Term::app(Term::Ref(Name::parse("plus")), Term::Ref(Name::parse("one"))),
            Term::Lit(2),
        );

        assert_eq!(
            term.references(),
            vec![Name::parse("plus"), Name::parse("one")]
        );
    }

    #[test]
    fn literals_reference_nothing() {
        assert_eq!(Term::Lit(42).references(), vec![]);
        assert_eq!(Term::Unit.references(), vec![]);
    }
}
