//! Checker tests driving the public check API with source snippets.

mod test_annotations;
mod test_assertions;
mod test_entangled_bindings;
mod test_entangled_returns;
mod test_optional_narrowing;
mod test_package_decls;
mod test_usability;

use crate::check::Config;
use crate::error::TypeErrorReport;
use crate::importer::NoImports;
use crate::{check_source, CheckError, CheckedUnit};

pub(crate) fn check(src: &str) -> Result<CheckedUnit, CheckError> {
    check_source(src, "test.sgo", &mut NoImports, &Config::default())
}

pub(crate) fn check_err(src: &str) -> TypeErrorReport {
    match check(src) {
        Err(CheckError::Type(report)) => report,
        Err(CheckError::Parse(err)) => panic!("unexpected parse error: {err}"),
        Ok(_) => panic!("expected type errors, program was accepted"),
    }
}

pub(crate) fn assert_ok(src: &str) {
    match check(src) {
        Ok(_) => {}
        Err(CheckError::Parse(err)) => panic!("unexpected parse error: {err}"),
        Err(CheckError::Type(report)) => {
            panic!("expected program to check, got: {:#?}", report.errors)
        }
    }
}
