//! Annotation ingestion over imported base-language packages.

use crate::annotations::Catalogue;
use crate::check::Config;
use crate::importer::SourceImporter;
use crate::{check_source, CheckError, CheckedUnit};

const LIB_SRC: &str = "package lib\n\ntype Thing struct {\n\tN int\n}\n\nfunc New() *Thing {\n\treturn nil\n}\n\nvar Default *Thing\n";

fn check_with(importer: &mut SourceImporter, config: &Config, src: &str) -> Result<CheckedUnit, CheckError> {
    check_source(src, "main.sgo", importer, config)
}

#[test]
fn imported_pointers_default_to_optional() {
    let mut importer = SourceImporter::new();
    importer.add("lib", LIB_SRC);
    let src = "package main\n\nimport \"lib\"\n\nfunc main() {\n\tt := lib.New()\n\t_ = t.N\n}\n";
    match check_with(&mut importer, &Config::default(), src) {
        Err(CheckError::Type(report)) => {
            // lib.New returns ?*Thing; the field access needs a nil check
            assert!(report.has_kind("optional_use"), "{:?}", report.errors);
        }
        other => panic!("expected optional_use, got {:?}", other.is_ok()),
    }
}

#[test]
fn narrowed_imported_optional_is_usable() {
    let mut importer = SourceImporter::new();
    importer.add("lib", LIB_SRC);
    let src = "package main\n\nimport \"lib\"\n\nfunc main() {\n\tt := lib.New()\n\tif t != nil {\n\t\t_ = t.N\n\t}\n}\n";
    check_with(&mut importer, &Config::default(), src).expect("narrowed access should check");
}

#[test]
fn doc_comment_annotation_overrides_default() {
    let mut importer = SourceImporter::new();
    importer.add(
        "lib",
        "package lib\n\ntype Thing struct {\n\tN int\n}\n\n// For SGo: func() *Thing\nfunc New() *Thing {\n\treturn nil\n}\n",
    );
    let src = "package main\n\nimport \"lib\"\n\nfunc main() {\n\tt := lib.New()\n\t_ = t.N\n}\n";
    check_with(&mut importer, &Config::default(), src)
        .expect("annotated non-optional result should be directly usable");
}

#[test]
fn sidecar_annotation_overrides_default() {
    let mut importer = SourceImporter::new();
    importer.add_with_sidecar(
        "lib",
        LIB_SRC,
        "New func() *Thing\n",
    );
    let src = "package main\n\nimport \"lib\"\n\nfunc main() {\n\tt := lib.New()\n\t_ = t.N\n}\n";
    check_with(&mut importer, &Config::default(), src)
        .expect("side-car annotated result should be directly usable");
}

#[test]
fn catalogue_annotation_overrides_default() {
    let mut importer = SourceImporter::new();
    importer.add("lib", LIB_SRC);
    let mut config = Config::default();
    config.catalogue = Catalogue::builtin();
    config.catalogue.insert("lib", "New", "func() *Thing");
    let src = "package main\n\nimport \"lib\"\n\nfunc main() {\n\tt := lib.New()\n\t_ = t.N\n}\n";
    check_with(&mut importer, &config, src)
        .expect("catalogue annotated result should be directly usable");
}

#[test]
fn malformed_sidecar_reports_import_error() {
    let mut importer = SourceImporter::new();
    importer.add_with_sidecar("lib", LIB_SRC, "A {oops\n");
    let src = "package main\n\nimport \"lib\"\n\nfunc main() {}\n";
    match check_with(&mut importer, &Config::default(), src) {
        Err(CheckError::Type(report)) => {
            assert!(report.has_kind("import_failed"), "{:?}", report.errors);
        }
        other => panic!("expected import failure, got ok={}", other.is_ok()),
    }
}

#[test]
fn missing_package_reports_import_error() {
    let mut importer = SourceImporter::new();
    let src = "package main\n\nimport \"nowhere\"\n\nfunc main() {}\n";
    match check_with(&mut importer, &Config::default(), src) {
        Err(CheckError::Type(report)) => {
            assert!(report.has_kind("import_failed"));
        }
        other => panic!("expected import failure, got ok={}", other.is_ok()),
    }
}

#[test]
fn imported_optional_variable_requires_check() {
    let mut importer = SourceImporter::new();
    importer.add("lib", LIB_SRC);
    let src = "package main\n\nimport \"lib\"\n\nfunc main() {\n\t_ = lib.Default.N\n}\n";
    match check_with(&mut importer, &Config::default(), src) {
        Err(CheckError::Type(report)) => {
            assert!(report.has_kind("optional_use"));
        }
        other => panic!("expected optional_use, got ok={}", other.is_ok()),
    }
}
