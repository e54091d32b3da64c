use std::path::PathBuf;

use clap::{CommandFactory, Parser as ClapParser, error::ErrorKind};
use colored::Colorize;

use crate::backend::{Directories, Target};

mod backend;
mod context;
mod intern;
mod term;
mod unit;

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Compilation unit listing to drive the backend with
    unit_file: PathBuf,

    /// Backend to hand the unit to
    #[arg(long, default_value = "ir")]
    backend: String,

    /// Base name for the produced artifact
    #[arg(short, long, default_value = "out")]
    output: String,

    /// Execute the entry term instead of compiling to a file
    #[arg(long)]
    run: bool,

    /// Directory the backend runs in
    #[arg(long, default_value = "build")]
    build_dir: PathBuf,

    /// Extra directories to search for foreign dynamic libraries
    #[arg(long = "lib-dir")]
    lib_dirs: Vec<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if !args.unit_file.exists() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Unit file '{}' does not exist!", args.unit_file.display()),
            )
            .exit()
    }

    if !args.unit_file.is_file() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Input path '{}' is not a file!", args.unit_file.display()),
            )
            .exit()
    }

    let Some(target) = Target::from_name(&args.backend) else {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Unknown backend '{}'!", args.backend),
            )
            .exit()
    };

    let mut unit = match unit::load_unit(&args.unit_file) {
        Ok(unit) => unit,
        Err(error) => exit_with_error(&error),
    };

    let mut dirs = Directories::new(args.build_dir);
    dirs.lib_dirs = args.lib_dirs;

    let codegen = target.codegen();

    let result = if args.run {
        backend::execute(&codegen, &mut unit.context, &dirs, &unit.entry)
    } else {
        match backend::compile(&codegen, &mut unit.context, &dirs, &unit.entry, &args.output) {
            Ok(Some(artifact)) => {
                println!("{}", dirs.build_dir.join(artifact).display());
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(error) => Err(error),
        }
    };

    if let Err(error) = result {
        exit_with_error(&error);
    }
}

fn exit_with_error(error: &dyn std::error::Error) -> ! {
    eprintln!("{} {error}", "error:".red().bold());

    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  {} {cause}", "caused by:".yellow());
        source = cause.source();
    }

    std::process::exit(1)
}
