//! Importing base-language packages.
//!
//! An importer resolves an import path to base-language source (and an
//! optional side-car annotation file). The package is parsed, checked
//! once raw to learn which names denote interface types, converted by the
//! annotation rules, and then re-checked — the re-check is mandatory, and
//! its result is the imported package.

use crate::annotations::{self, AnnotationSet};
use crate::check::{check_unit, Config, Context};
use crate::objects::{ObjKind, PkgId};
use sgo_parser::NodeId;
use std::collections::{HashMap, HashSet};

/// Base-language source for one import path.
#[derive(Debug, Clone)]
pub struct ImportedSource {
    pub src: String,
    pub sidecar: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ImportError {
    Failed(String),
    Annotation(String),
}

/// Resolves import paths to package sources.
pub trait Importer {
    fn resolve(&mut self, path: &str) -> Result<ImportedSource, String>;
}

/// An importer with no packages; every import fails.
pub struct NoImports;

impl Importer for NoImports {
    fn resolve(&mut self, path: &str) -> Result<ImportedSource, String> {
        Err(format!("package {path} not found"))
    }
}

/// An in-memory importer mapping paths to sources, used by the driver and
/// tests.
#[derive(Default)]
pub struct SourceImporter {
    packages: HashMap<String, ImportedSource>,
}

impl SourceImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: &str, src: &str) -> &mut Self {
        self.packages.insert(
            path.to_string(),
            ImportedSource {
                src: src.to_string(),
                sidecar: None,
            },
        );
        self
    }

    pub fn add_with_sidecar(&mut self, path: &str, src: &str, sidecar: &str) -> &mut Self {
        self.packages.insert(
            path.to_string(),
            ImportedSource {
                src: src.to_string(),
                sidecar: Some(sidecar.to_string()),
            },
        );
        self
    }
}

impl Importer for SourceImporter {
    fn resolve(&mut self, path: &str) -> Result<ImportedSource, String> {
        self.packages
            .get(path)
            .cloned()
            .ok_or_else(|| format!("package {path} not found"))
    }
}

/// Imports `path` into the shared context, caching the result.
pub fn import_package(
    ctx: &mut Context,
    importer: &mut dyn Importer,
    config: &Config,
    path: &str,
) -> Result<PkgId, String> {
    if let Some(pkg) = ctx.imported.get(path) {
        return Ok(*pkg);
    }
    if ctx.importing.contains(path) {
        return Err(format!("import cycle through {path}"));
    }
    ctx.importing.insert(path.to_string());
    let result = import_uncached(ctx, importer, config, path);
    ctx.importing.remove(path);
    let pkg = result?;
    ctx.imported.insert(path.to_string(), pkg);
    Ok(pkg)
}

fn import_uncached(
    ctx: &mut Context,
    importer: &mut dyn Importer,
    config: &Config,
    path: &str,
) -> Result<PkgId, String> {
    let imported = importer.resolve(path)?;
    let file = sgo_parser::parse_file(&imported.src)
        .map_err(|err| format!("parsing {path}: {err}"))?;

    // First pass over the raw file: which identifiers name interface
    // types. Bodies are not checked for imports.
    let (_, raw_info, _) = check_unit(ctx, &imported.src, &file, importer, config, false);
    let mut iface_idents: HashSet<NodeId> = HashSet::new();
    for (node, obj) in &raw_info.uses {
        let data = ctx.objs.get(*obj);
        if matches!(data.kind, ObjKind::TypeName) && ctx.arena.is_interface(data.typ) {
            iface_idents.insert(*node);
        }
    }

    // Annotation sources: catalogue entries for this path, then side-car
    // items. Doc comments ride on the AST.
    let mut anns = AnnotationSet::default();
    if let Some(entries) = config.catalogue.package(path) {
        anns.catalogue = entries.clone();
    }
    if let Some(sidecar) = &imported.sidecar {
        anns.sidecar = annotations::parse(sidecar)
            .map_err(|err| format!("annotations for {path}: {err}"))?;
    }

    let mut converted = file.clone();
    let conversion_errors = annotations::convert_file(&mut converted, &anns, &iface_idents);
    if let Some(first) = conversion_errors.first() {
        return Err(format!("annotations for {path}: {first}"));
    }

    // The mandatory re-check of the converted declarations produces the
    // package that importing code sees.
    let (pkg, _, _) = check_unit(ctx, &imported.src, &converted, importer, config, false);
    Ok(pkg)
}
