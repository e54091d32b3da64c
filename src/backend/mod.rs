//! Backend orchestration: the codegen contract every native code generator
//! implements, and the directory-scoped `compile`/`execute` entry points
//! the rest of the compiler goes through.
//!
//! Backends are allowed to assume the build directory is the process
//! working directory for the duration of a call (relative temp files,
//! assembler invocations, etc.). The scoped switch/restore in this module
//! is what makes that assumption safe: callers never observe a changed
//! working directory, even when a backend fails.

use std::{
    env, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use strum::EnumString;
use thiserror::Error;

use crate::{context::Context, term::Term};

pub mod driver;
pub mod ffi;
pub mod ir_dump;
pub mod reachability;
pub mod tags;

/// Errors surfaced by backend operations and the foreign linkage helpers
#[derive(Debug, Error)]
pub enum BackendError {
    /// A filesystem operation failed; always names the offending path
    #[error("file i/o error on '{}'", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A backend-specific failure, propagated unchanged through
    /// [`compile`]/[`execute`]
    #[error("backend '{backend}': {message}")]
    Codegen {
        backend: &'static str,
        message: String,
    },
}

/// Directory configuration for one compilation
#[derive(Debug, Clone, Default)]
pub struct Directories {
    /// Where backends run and place their artifacts. Created on first use.
    pub build_dir: PathBuf,
    /// Search path for foreign dynamic libraries
    pub lib_dirs: Vec<PathBuf>,
}

impl Directories {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            lib_dirs: Vec::new(),
        }
    }
}

/// An abstract native code generator.
///
/// The driver depends only on this trait; concrete backends are selected
/// through [`Target`]. Both operations may perform arbitrary filesystem and
/// process side effects inside the build directory.
pub trait Codegen {
    /// Identifies the backend, both for error messages and for matching
    /// foreign calling-convention targets
    fn name(&self) -> &'static str;

    /// Compiles a closed term and everything it reaches to a file, named
    /// from `output_base`. Returns the produced artifact's path (relative
    /// to the build directory) if one was written.
    fn compile_expr(
        &self,
        ctx: &mut Context,
        dirs: &Directories,
        term: &Term,
        output_base: &str,
    ) -> Result<Option<PathBuf>, BackendError>;

    /// Compiles a closed term and runs it in-process
    fn execute_expr(
        &self,
        ctx: &mut Context,
        dirs: &Directories,
        term: &Term,
    ) -> Result<(), BackendError>;
}

/// Every backend the driver can hand a unit to
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Target {
    Ir,
}

impl Target {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    pub fn codegen(self) -> impl Codegen {
        match self {
            Target::Ir => ir_dump::IrDump,
        }
    }
}

/// Restores the saved working directory when dropped
struct ScopedDir {
    previous: PathBuf,
}

impl ScopedDir {
    /// Creates `target` if missing and switches the process working
    /// directory into it
    fn enter(target: &Path) -> Result<Self, BackendError> {
        std::fs::create_dir_all(target).map_err(|source| BackendError::File {
            path: target.to_path_buf(),
            source,
        })?;

        let previous = env::current_dir().map_err(|source| BackendError::File {
            path: PathBuf::from("."),
            source,
        })?;

        env::set_current_dir(target).map_err(|source| BackendError::File {
            path: target.to_path_buf(),
            source,
        })?;

        Ok(Self { previous })
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        // Nothing useful to report from a drop; a failed restore surfaces
        // as an error on the next scoped switch.
        let _ = env::set_current_dir(&self.previous);
    }
}

/// Compiles `term` with the given backend, scoped to the build directory.
///
/// The backend runs with the build directory as the current directory; the
/// previous working directory is restored on every exit path before the
/// result (or error) reaches the caller.
pub fn compile(
    codegen: &dyn Codegen,
    ctx: &mut Context,
    dirs: &Directories,
    term: &Term,
    output_base: &str,
) -> Result<Option<PathBuf>, BackendError> {
    let _guard = ScopedDir::enter(&dirs.build_dir)?;

    codegen.compile_expr(ctx, dirs, term, output_base)
}

/// Executes `term` with the given backend, scoped to the build directory.
/// Same working-directory guarantee as [`compile`].
pub fn execute(
    codegen: &dyn Codegen,
    ctx: &mut Context,
    dirs: &Directories,
    term: &Term,
) -> Result<(), BackendError> {
    let _guard = ScopedDir::enter(&dirs.build_dir)?;

    codegen.execute_expr(ctx, dirs, term)
}
