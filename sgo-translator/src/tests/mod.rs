//! Translation tests: checked SGo source in, base-language source out.

mod test_translate;

use sgo_typechecker::check::Config;
use sgo_typechecker::importer::NoImports;

pub(crate) fn translate(src: &str) -> String {
    crate::translate_source(src, "test.sgo", &mut NoImports, &Config::default())
        .expect("source should check")
}
