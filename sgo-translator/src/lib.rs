//! # SGo translator
//!
//! Lowers checked SGo source to base-language source with minimum churn:
//! the original text is copied verbatim — which keeps struct-literal
//! initialisers bit-identical — and rewrites are spliced in at the SGo
//! constructs. `?` is erased, `\` forms become conventional multi-value
//! shapes with zero values injected on the failure side, and runtime
//! optional-nil guards are inserted at type-assertion boundaries and
//! type-switch cases.
//!
//! The translator never fails on a program the checker accepted; any
//! internal disagreement is a checker bug.

mod convert;

#[cfg(test)]
mod tests;

use sgo_typechecker::CheckedUnit;

/// Translates a checked unit back to base-language source text.
pub fn translate(unit: &CheckedUnit, src: &str, filename: &str) -> String {
    convert::Translator::new(unit, src, filename).run()
}

/// Parses, checks and translates in one step.
pub fn translate_source(
    src: &str,
    filename: &str,
    importer: &mut dyn sgo_typechecker::importer::Importer,
    config: &sgo_typechecker::check::Config,
) -> Result<String, sgo_typechecker::CheckError> {
    let unit = sgo_typechecker::check_source(src, filename, importer, config)?;
    Ok(translate(&unit, src, filename))
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
