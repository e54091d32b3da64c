//! Reference backend emitting a readable listing of a compiled unit.
//!
//! This is the simplest implementation of the [`Codegen`] contract: it
//! drives the whole pipeline (reachability, tagging, lowering,
//! optimization, foreign-library resolution) and writes the result out as
//! text instead of machine code. Useful for inspecting what a unit
//! compiles to, and as the model for real native backends.

use std::path::PathBuf;

use itertools::Itertools;

use crate::{
    backend::{
        BackendError, Codegen, Directories,
        driver::compile_unit,
        ffi::resolve_foreign_libs,
    },
    context::{Context, Name},
    term::Term,
};

pub struct IrDump;

const TARGET: &str = "ir";

impl IrDump {
    fn render_unit(
        ctx: &mut Context,
        dirs: &Directories,
        term: &Term,
    ) -> Result<String, BackendError> {
        let unit = compile_unit(ctx, term);

        resolve_foreign_libs(ctx, &unit.names, TARGET, dirs)?;

        let tags = unit
            .tags
            .iter()
            .sorted_by_key(|entry| *entry.1)
            .map(|(name, tag)| format!("{tag:>4} {name}"))
            .join("\n");

        let defs = unit
            .names
            .iter()
            .map(|name| {
                let body = ctx
                    .lookup(name)
                    .and_then(|def| def.compiled.as_ref())
                    .map(|compiled| compiled.body.as_str())
                    .unwrap_or("<not lowered>");

                format!("{name}:\n    {body}")
            })
            .join("\n");

        Ok(format!(
            indoc::indoc! {r#"
            ; rill intermediate listing
            ; entry: {0}

            [tags]
            {1}

            [defs]
            {2}
            "#},
            term.references()
                .first()
                .map(Name::to_string)
                .unwrap_or_else(|| "<constant>".to_owned()),
            tags,
            defs,
        ))
    }
}

impl Codegen for IrDump {
    fn name(&self) -> &'static str {
        TARGET
    }

    fn compile_expr(
        &self,
        ctx: &mut Context,
        dirs: &Directories,
        term: &Term,
        output_base: &str,
    ) -> Result<Option<PathBuf>, BackendError> {
        let listing = Self::render_unit(ctx, dirs, term)?;
        let output = PathBuf::from(format!("{output_base}.rir"));

        std::fs::write(&output, listing).map_err(|source| BackendError::File {
            path: output.clone(),
            source,
        })?;

        Ok(Some(output))
    }

    fn execute_expr(
        &self,
        ctx: &mut Context,
        dirs: &Directories,
        term: &Term,
    ) -> Result<(), BackendError> {
        let listing = Self::render_unit(ctx, dirs, term)?;

        print!("{listing}");

        Ok(())
    }
}
