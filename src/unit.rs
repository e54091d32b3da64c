//! Loader for `.unit` compilation-unit listings.
//!
//! A unit file is the elaborated form a front end would normally hand the
//! backend driver: one definition per line plus an entry point. It exists
//! so the driver can be exercised without a full front end.
//!
//! ```text
//! # a small program
//! type list.List
//! ctor list.Nil: list.List
//! fn list.map: list.List, list.map
//! foreign io.puts "C:puts,libc,stdio.h"
//! decl later.defined
//! fn main: list.map, io.puts
//! entry main
//! ```

use std::{io, path::{Path, PathBuf}, str::FromStr};

use strum::EnumString;
use thiserror::Error;

use crate::{
    context::{Context, DefKind, Definition, Name},
    term::Term,
};

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("failed to read '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("unit file declares no entry point")]
    MissingEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum Keyword {
    Fn,
    Type,
    Ctor,
    Foreign,
    Decl,
    Entry,
}

/// A parsed unit: the definition table plus the closed entry term
#[derive(Debug)]
pub struct Unit {
    pub context: Context,
    pub entry: Term,
}

pub fn load_unit(path: &Path) -> Result<Unit, UnitError> {
    let contents = std::fs::read_to_string(path).map_err(|source| UnitError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_unit(&contents)
}

pub fn parse_unit(contents: &str) -> Result<Unit, UnitError> {
    let mut context = Context::new();
    let mut entry = None;

    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        let number = index + 1;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (keyword, rest) = line.split_once(char::is_whitespace).ok_or(UnitError::Parse {
            line: number,
            message: "expected a keyword followed by a name".to_owned(),
        })?;

        let keyword = Keyword::from_str(keyword).map_err(|_| UnitError::Parse {
            line: number,
            message: format!("unknown keyword '{keyword}'"),
        })?;
        let rest = rest.trim();

        match keyword {
            Keyword::Entry => {
                entry = Some(Term::Ref(Name::parse(rest)));
            }
            Keyword::Foreign => {
                let (name, convention) =
                    rest.split_once(char::is_whitespace)
                        .ok_or(UnitError::Parse {
                            line: number,
                            message: "foreign declaration needs a convention string".to_owned(),
                        })?;

                context.add_def(
                    Name::parse(name),
                    Definition::new(
                        DefKind::Foreign {
                            convention: convention.trim().trim_matches('"').to_owned(),
                        },
                        Vec::new(),
                    ),
                );
            }
            Keyword::Fn | Keyword::Type | Keyword::Ctor | Keyword::Decl => {
                let (name, refers_to) = match rest.split_once(':') {
                    Some((name, refs)) => (
                        name.trim(),
                        refs.split(',')
                            .map(str::trim)
                            .filter(|r| !r.is_empty())
                            .map(Name::parse)
                            .collect(),
                    ),
                    None => (rest, Vec::new()),
                };

                let kind = match keyword {
                    Keyword::Fn => DefKind::Function,
                    Keyword::Type => DefKind::TypeCtor,
                    Keyword::Ctor => DefKind::DataCtor,
                    Keyword::Decl => DefKind::ForwardDecl,
                    Keyword::Foreign | Keyword::Entry => unreachable!(),
                };

                context.add_def(Name::parse(name), Definition::new(kind, refers_to));
            }
        }
    }

    let entry = entry.ok_or(UnitError::MissingEntry)?;

    Ok(Unit { context, entry })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{UnitError, parse_unit};
    use crate::{
        context::{DefKind, Name},
        term::Term,
    };

    const SMALL_UNIT: &str = r#"
        # a small program
        type list.List
        ctor list.Nil: list.List
        fn list.map: list.List, list.map
        foreign io.puts "C:puts,libc,stdio.h"
        decl later.defined
        fn main: list.map, io.puts
        entry main
    "#;

    #[test]
    fn a_small_unit_parses() {
        let unit = parse_unit(SMALL_UNIT).unwrap();

        assert_eq!(unit.entry, Term::Ref(Name::parse("main")));
        assert_eq!(unit.context.def_count(), 6);

        let map = unit.context.lookup(&Name::parse("list.map")).unwrap();
        assert_eq!(
            map.refers_to,
            vec![Name::parse("list.List"), Name::parse("list.map")]
        );

        let puts = unit.context.lookup(&Name::parse("io.puts")).unwrap();
        assert_eq!(
            puts.kind,
            DefKind::Foreign {
                convention: "C:puts,libc,stdio.h".to_owned()
            }
        );
    }

    #[test]
    fn unknown_keywords_report_the_line() {
        let error = parse_unit("frobnicate main\nentry main").unwrap_err();

        match error {
            UnitError::Parse { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("frobnicate"));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn a_missing_entry_point_is_an_error() {
        let error = parse_unit("fn main").unwrap_err();

        assert!(matches!(error, UnitError::MissingEntry));
    }

    #[test]
    fn definitions_without_references_parse() {
        let unit = parse_unit("fn lonely\nentry lonely").unwrap();

        assert_eq!(
            unit.context.lookup(&Name::parse("lonely")).unwrap().refers_to,
            vec![]
        );
    }
}
