//! # SGo type checker
//!
//! A type checker for SGo, the nil-safe dialect of a Go-family base
//! language. On top of the base rules it implements optional types with
//! flow-sensitive refinement, usability tracking for zero-value-less
//! variables, entangled multi-return analysis, and annotation-driven
//! import translation.
//!
//! ```
//! use sgo_typechecker::{check_source, importer::NoImports, check::Config};
//!
//! let src = r#"
//! package main
//!
//! func main() {
//!     var p ?*int = nil
//!     if p != nil {
//!         _ = *p
//!     }
//! }
//! "#;
//!
//! let unit = check_source(src, "main.sgo", &mut NoImports, &Config::default()).unwrap();
//! assert!(unit.info.types.len() > 0);
//! ```

pub mod annotations;
pub mod check;
pub mod constants;
pub mod error;
pub mod importer;
pub mod info;
pub mod lookup;
pub mod objects;
pub mod optionables;
pub mod types;
pub mod universe;

#[cfg(test)]
mod tests;

use check::{check_unit, Config, Context};
use error::{TypeError, TypeErrorReport};
use importer::Importer;
use miette::Diagnostic;
use sgo_parser::{File, ParseError};
use thiserror::Error;

pub use error::TypeResult;
pub use info::{Info, OperandMode, TypeAndValue};
pub use objects::PkgId;
pub use optionables::{find_optionables, OptionablePath, PathStep};
pub use types::{TypeArena, TypeId, TypeKind};

/// A successfully checked translation unit: the arenas, the package, the
/// parsed file, and the side tables the translator reads.
pub struct CheckedUnit {
    pub ctx: Context,
    pub pkg: PkgId,
    pub file: File,
    pub info: Info,
    /// Advisory diagnostics (narrowing disabled by aliasing) that did not
    /// fail the check.
    pub advisories: Vec<TypeError>,
}

/// Parse or type failure of one unit.
#[derive(Error, Diagnostic, Debug)]
pub enum CheckError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(#[from] TypeErrorReport),
}

/// Parses and checks a single SGo source file.
pub fn check_source(
    src: &str,
    filename: &str,
    importer: &mut dyn Importer,
    config: &Config,
) -> Result<CheckedUnit, CheckError> {
    let file = sgo_parser::parse_file(src)?;
    check_file(file, src, filename, importer, config).map_err(CheckError::Type)
}

/// Checks an already parsed file.
pub fn check_file(
    file: File,
    src: &str,
    filename: &str,
    importer: &mut dyn Importer,
    config: &Config,
) -> Result<CheckedUnit, TypeErrorReport> {
    let mut ctx = Context::new();
    let (pkg, info, errors) = check_unit(&mut ctx, src, &file, importer, config, true);
    let (advisories, hard): (Vec<_>, Vec<_>) =
        errors.into_iter().partition(|e| e.is_advisory());
    if !hard.is_empty() {
        let mut all = hard;
        all.extend(advisories);
        return Err(TypeErrorReport::new(
            all,
            src.to_string(),
            filename.to_string(),
        ));
    }
    Ok(CheckedUnit {
        ctx,
        pkg,
        file,
        info,
        advisories,
    })
}

/// Pass/fail entry point for drivers that only need the error count.
pub fn check_status(
    src: &str,
    filename: &str,
    importer: &mut dyn Importer,
    config: &Config,
) -> Result<(), usize> {
    match check_source(src, filename, importer, config) {
        Ok(_) => Ok(()),
        Err(CheckError::Parse(_)) => Err(1),
        Err(CheckError::Type(report)) => Err(report.error_count()),
    }
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
