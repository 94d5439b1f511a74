use clap::{Parser, Subcommand};
use miette::MietteHandlerOpts;
use sgo_typechecker::check::Config;
use sgo_typechecker::importer::{Importer, ImportedSource, NoImports};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

// Exit codes: 0 success, 1 type or parse errors, 2 I/O or driver errors.
const EXIT_TYPE_ERRORS: i32 = 1;
const EXIT_DRIVER_ERROR: i32 = 2;

#[derive(Parser)]
#[command(
    name = "sgo",
    version,
    about = "The SGo translator",
    long_about = "SGo is a nil-safe dialect of a Go-family base language. \
                  The translator type-checks SGo source and emits equivalent base-language source."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Type-check SGo source files without generating output
    Check {
        /// Source files to check (use '-' to read from stdin)
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Directory with importable base-language packages
        #[arg(long, value_name = "DIR")]
        import_root: Option<PathBuf>,
    },
    /// Translate SGo source files to base-language files next to them
    Translate {
        /// Source files to translate (use '-' to write to stdout)
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Directory with importable base-language packages
        #[arg(long, value_name = "DIR")]
        import_root: Option<PathBuf>,

        /// Write the generated source to stdout instead of files
        #[arg(long)]
        stdout: bool,
    },
}

fn main() {
    setup_miette_handler();
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Check { files, import_root } => run_check(&files, import_root.as_deref()),
        Commands::Translate {
            files,
            import_root,
            stdout,
        } => run_translate(&files, import_root.as_deref(), stdout),
    };
    process::exit(code);
}

fn setup_miette_handler() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .tab_width(4)
                .with_cause_chain()
                .build(),
        )
    }))
    .ok();
}

/// Importer resolving packages against a directory tree mirroring import
/// paths; side-car annotation files sit next to the source as
/// `<package>.sgoann`.
struct FsImporter {
    root: PathBuf,
}

impl Importer for FsImporter {
    fn resolve(&mut self, path: &str) -> Result<ImportedSource, String> {
        let dir = self.root.join(path);
        let mut src = String::new();
        let entries = fs::read_dir(&dir).map_err(|e| format!("{}: {e}", dir.display()))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|ext| ext == "go").unwrap_or(false))
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(format!("no source files in {}", dir.display()));
        }
        for file in files {
            let text = fs::read_to_string(&file).map_err(|e| format!("{}: {e}", file.display()))?;
            src.push_str(&text);
            src.push('\n');
        }
        let base = path.rsplit('/').next().unwrap_or(path);
        let sidecar = fs::read_to_string(dir.join(format!("{base}.sgoann"))).ok();
        Ok(ImportedSource { src, sidecar })
    }
}

fn importer_for(root: Option<&Path>) -> Box<dyn Importer> {
    match root {
        Some(root) => Box::new(FsImporter {
            root: root.to_path_buf(),
        }),
        None => Box::new(NoImports),
    }
}

fn read_source(path: &Path) -> Result<(String, String), String> {
    if path.to_str() == Some("-") {
        let mut src = String::new();
        std::io::stdin()
            .read_to_string(&mut src)
            .map_err(|e| format!("<stdin>: {e}"))?;
        return Ok((src, "<stdin>".to_string()));
    }
    let src = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok((src, path.display().to_string()))
}

fn run_check(files: &[PathBuf], import_root: Option<&Path>) -> i32 {
    let config = Config::default();
    let mut code = 0;
    for path in files {
        let (src, name) = match read_source(path) {
            Ok(pair) => pair,
            Err(err) => {
                eprintln!("{err}");
                return EXIT_DRIVER_ERROR;
            }
        };
        let mut importer = importer_for(import_root);
        match sgo_typechecker::check_source(&src, &name, importer.as_mut(), &config) {
            Ok(unit) => {
                for advisory in &unit.advisories {
                    eprintln!("{name}: warning: {advisory}");
                }
            }
            Err(err) => {
                eprintln!("{:?}", miette::Report::new(err));
                code = EXIT_TYPE_ERRORS;
            }
        }
    }
    code
}

fn run_translate(files: &[PathBuf], import_root: Option<&Path>, stdout: bool) -> i32 {
    let config = Config::default();
    for path in files {
        let (src, name) = match read_source(path) {
            Ok(pair) => pair,
            Err(err) => {
                eprintln!("{err}");
                return EXIT_DRIVER_ERROR;
            }
        };
        let mut importer = importer_for(import_root);
        let generated =
            match sgo_translator::translate_source(&src, &name, importer.as_mut(), &config) {
                Ok(out) => out,
                Err(err) => {
                    eprintln!("{:?}", miette::Report::new(err));
                    return EXIT_TYPE_ERRORS;
                }
            };
        if stdout || path.to_str() == Some("-") {
            print!("{generated}");
            continue;
        }
        let out_path = path.with_extension("go");
        if let Err(err) = fs::write(&out_path, generated) {
            eprintln!("{}: {err}", out_path.display());
            return EXIT_DRIVER_ERROR;
        }
        println!("{}", out_path.display());
    }
    0
}
