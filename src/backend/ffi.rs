//! Foreign linkage: calling-convention parsing and dynamic-library
//! resolution.
//!
//! Foreign declarations carry a convention string of the form
//! `"<target>[:<opt1>[,<opt2>...]]"` naming the backend that handles the
//! call plus backend-specific options (conventionally the foreign symbol,
//! the library, and a header). Libraries named there get resolved against
//! the configured search path and copied next to the build artifacts.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    backend::{BackendError, Directories},
    context::{Context, DefKind, Name},
};

/// Parsed foreign-declaration metadata: which backend handles the call,
/// plus its linkage options in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallingConvention {
    pub target: String,
    pub opts: Vec<String>,
}

/// Parses a calling-convention string.
///
/// An empty string means "no convention specified", which is distinct from
/// a convention with zero options. The string splits on the first colon
/// into a target and a comma-separated option list; target and options are
/// trimmed. Nothing else is validated here; unknown targets are a backend
/// concern.
pub fn parse_cc(input: &str) -> Option<CallingConvention> {
    if input.is_empty() {
        return None;
    }

    match input.split_once(':') {
        Some((target, options)) => Some(CallingConvention {
            target: target.trim().to_owned(),
            opts: options.split(',').map(|opt| opt.trim().to_owned()).collect(),
        }),
        None => Some(CallingConvention {
            target: input.trim().to_owned(),
            opts: Vec::new(),
        }),
    }
}

/// Platform family for dynamic-library file naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LibSuffix {
    Dll,
    Dylib,
    So,
}

impl LibSuffix {
    /// The suffix for the platform this compiler was built for
    pub fn host() -> Self {
        if cfg!(windows) {
            LibSuffix::Dll
        } else if cfg!(target_vendor = "apple") {
            LibSuffix::Dylib
        } else {
            LibSuffix::So
        }
    }
}

/// Builds the platform-appropriate file name for a library spec of the
/// form `"name [version ...]"`.
///
/// A bare name gets the suffix appended; a name already containing a `.`
/// is taken verbatim (its extension is explicit); a name plus version
/// becomes `name-version.dll`, `name.version.dylib`, or `name.so.version`
/// depending on the platform family.
pub fn versioned_filename(spec: &str, suffix: LibSuffix) -> String {
    let mut tokens = spec.split_whitespace();

    let Some(name) = tokens.next() else {
        return String::new();
    };

    match tokens.next() {
        None if name.contains('.') => name.to_owned(),
        None => format!("{name}.{suffix}"),
        Some(version) => match suffix {
            LibSuffix::Dll => format!("{name}-{version}.{suffix}"),
            LibSuffix::Dylib => format!("{name}.{version}.{suffix}"),
            LibSuffix::So => format!("{name}.{suffix}.{version}"),
        },
    }
}

/// A dynamic library requested by a foreign declaration, paired with
/// wherever it was found. `name == path` means the system's own loader is
/// expected to resolve it at link or load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySpec {
    pub name: String,
    pub path: PathBuf,
}

/// Computes the file name for `spec` and searches the configured library
/// directories for it. When nothing matches, falls back to the bare name
/// and leaves resolution to the dynamic loader.
pub fn locate(spec: &str, dirs: &Directories) -> LibrarySpec {
    let name = versioned_filename(spec, LibSuffix::host());

    for dir in &dirs.lib_dirs {
        let candidate = dir.join(&name);

        if candidate.exists() {
            return LibrarySpec {
                name,
                path: candidate,
            };
        }
    }

    LibrarySpec {
        path: PathBuf::from(&name),
        name,
    }
}

/// Copies a located library into the current (build) directory so the
/// artifacts can link against it. Libraries left to the system loader need
/// no copy.
pub fn copy_lib(lib: &LibrarySpec) -> Result<(), BackendError> {
    if lib.path == Path::new(&lib.name) {
        return Ok(());
    }

    let contents = fs::read(&lib.path).map_err(|source| BackendError::File {
        path: lib.path.clone(),
        source,
    })?;

    fs::write(&lib.name, contents).map_err(|source| BackendError::File {
        path: PathBuf::from(&lib.name),
        source,
    })?;

    Ok(())
}

/// Locates and copies every dynamic library requested by the reachable
/// foreign declarations targeting `backend`.
///
/// Options follow the `symbol[, library[, header]]` layout; declarations
/// without a library option link against nothing extra.
pub fn resolve_foreign_libs(
    ctx: &Context,
    names: &[Name],
    backend: &str,
    dirs: &Directories,
) -> Result<Vec<LibrarySpec>, BackendError> {
    let mut libs = Vec::new();

    for name in names {
        let Some(definition) = ctx.lookup(name) else {
            continue;
        };
        let DefKind::Foreign { convention } = &definition.kind else {
            continue;
        };
        let Some(cc) = parse_cc(convention) else {
            continue;
        };

        if cc.target != backend {
            continue;
        }

        let Some(library) = cc.opts.get(1).filter(|l| !l.is_empty()) else {
            continue;
        };

        let lib = locate(library, dirs);
        debug!(name = %name, lib = %lib.name, "resolving foreign library");

        copy_lib(&lib)?;
        libs.push(lib);
    }

    Ok(libs)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::{
        CallingConvention, LibSuffix, LibrarySpec, copy_lib, locate, parse_cc, versioned_filename,
    };
    use crate::backend::{BackendError, Directories, test_support};

    fn cc(target: &str, opts: &[&str]) -> CallingConvention {
        CallingConvention {
            target: target.to_owned(),
            opts: opts.iter().map(|&o| o.to_owned()).collect(),
        }
    }

    #[test]
    fn empty_input_means_no_convention() {
        assert_eq!(parse_cc(""), None);
    }

    #[test]
    fn target_and_options_split_on_the_first_colon() {
        assert_eq!(
            parse_cc("C:puts,libc,stdio.h"),
            Some(cc("C", &["puts", "libc", "stdio.h"]))
        );
    }

    #[test]
    fn a_single_option_still_parses() {
        assert_eq!(parse_cc("scheme:display"), Some(cc("scheme", &["display"])));
    }

    #[test]
    fn a_bare_target_gets_an_empty_option_list() {
        assert_eq!(parse_cc("  js  "), Some(cc("js", &[])));
    }

    #[test]
    fn options_and_targets_are_trimmed() {
        assert_eq!(
            parse_cc(" C : puts , libc "),
            Some(cc("C", &["puts", "libc"]))
        );
    }

    #[test]
    fn bare_names_get_the_platform_suffix() {
        assert_eq!(versioned_filename("gmp", LibSuffix::So), "gmp.so");
        assert_eq!(versioned_filename("gmp", LibSuffix::Dylib), "gmp.dylib");
        assert_eq!(versioned_filename("gmp", LibSuffix::Dll), "gmp.dll");
    }

    #[test]
    fn explicit_extensions_pass_through_verbatim() {
        assert_eq!(versioned_filename("libgmp.so.10", LibSuffix::So), "libgmp.so.10");
    }

    #[test]
    fn versioned_names_follow_the_platform_layout() {
        assert_eq!(versioned_filename("gmp 10", LibSuffix::So), "gmp.so.10");
        assert_eq!(versioned_filename("gmp 10", LibSuffix::Dylib), "gmp.10.dylib");
        assert_eq!(versioned_filename("gmp 10", LibSuffix::Dll), "gmp-10.dll");
    }

    #[test]
    fn an_empty_spec_produces_an_empty_filename() {
        assert_eq!(versioned_filename("", LibSuffix::So), "");
        assert_eq!(versioned_filename("   ", LibSuffix::So), "");
    }

    #[test]
    fn locate_falls_back_to_the_system_loader() {
        let dirs = Directories::new("build");

        let lib = locate("surely_not_installed_anywhere", &dirs);

        assert_eq!(PathBuf::from(&lib.name), lib.path);
    }

    #[test]
    fn locate_finds_libraries_on_the_search_path() {
        let tmp = tempfile::tempdir().unwrap();
        let expected = tmp.path().join(versioned_filename("gmp", LibSuffix::host()));
        std::fs::write(&expected, b"not really a library").unwrap();

        let mut dirs = Directories::new("build");
        dirs.lib_dirs.push(tmp.path().to_path_buf());

        let lib = locate("gmp", &dirs);

        assert_eq!(lib.path, expected);
    }

    #[test]
    fn system_resolved_libraries_are_not_copied() {
        let lib = LibrarySpec {
            name: "a.so".to_owned(),
            path: PathBuf::from("a.so"),
        };

        assert!(copy_lib(&lib).is_ok());
        assert!(!PathBuf::from("a.so").exists());
    }

    #[test]
    fn copying_an_unreadable_source_names_the_offending_path() {
        let lib = LibrarySpec {
            name: "a.so".to_owned(),
            path: PathBuf::from("/definitely/not/here/a.so"),
        };

        let error = copy_lib(&lib).unwrap_err();

        match &error {
            BackendError::File { path, .. } => {
                assert_eq!(path, &PathBuf::from("/definitely/not/here/a.so"));
            }
            other => panic!("expected a file error, got {other:?}"),
        }
        assert!(error.to_string().contains("/definitely/not/here/a.so"));
    }

    #[test]
    fn located_libraries_are_copied_into_the_current_directory() {
        let _cwd = test_support::lock_cwd();
        let source_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();

        let name = versioned_filename("gmp", LibSuffix::host());
        std::fs::write(source_dir.path().join(&name), b"library bytes").unwrap();

        let mut dirs = Directories::new("build");
        dirs.lib_dirs.push(source_dir.path().to_path_buf());

        let before = std::env::current_dir().unwrap();
        std::env::set_current_dir(work_dir.path()).unwrap();

        let lib = locate("gmp", &dirs);
        let result = copy_lib(&lib);

        std::env::set_current_dir(before).unwrap();

        result.unwrap();
        assert_eq!(
            std::fs::read(work_dir.path().join(&name)).unwrap(),
            b"library bytes"
        );
    }
}
