//! Shared diagnostic rendering for the checking subcommands.

use pincheck::{
    diagnostics::{error_count, warning_count},
    Diagnostic, Severity,
};

use super::terminal::Colorize;

/// Output format
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}

/// Renders diagnostics in the requested format.
pub fn emit(diagnostics: &[Diagnostic], output: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    match output {
        OutputFormat::Table => emit_table(diagnostics, quiet),
        OutputFormat::Json => emit_json(diagnostics)?,
        OutputFormat::Summary => println!(
            "errors={} warnings={}",
            error_count(diagnostics),
            warning_count(diagnostics)
        ),
    }
    Ok(())
}

fn emit_table(diagnostics: &[Diagnostic], quiet: bool) {
    for diagnostic in diagnostics {
        if quiet && diagnostic.severity != Severity::Error {
            continue;
        }
        let line = diagnostic.to_string();
        match diagnostic.severity {
            Severity::Error => println!("{}", line.error()),
            Severity::Warning => println!("{}", line.warning()),
        }
    }

    if quiet {
        return;
    }

    let errors = error_count(diagnostics);
    let warnings = warning_count(diagnostics);
    if diagnostics.is_empty() {
        println!("{}", "✅ No issues found.".success());
    } else {
        println!();
        println!(
            "{}",
            format!("Summary: {errors} errors, {warnings} warnings").warning()
        );
    }
}

fn emit_json(diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
    use serde_json::json;

    let output = json!({
        "diagnostics": diagnostics,
        "summary": {
            "errors": error_count(diagnostics),
            "warnings": warning_count(diagnostics),
        },
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Exits with code 2 when the findings should fail the run (for CI).
pub fn exit_if_dirty(diagnostics: &[Diagnostic], strict: bool) {
    let dirty = error_count(diagnostics) > 0 || (strict && warning_count(diagnostics) > 0);
    if dirty {
        std::process::exit(2);
    }
}
