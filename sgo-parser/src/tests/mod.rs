//! Parser tests driving the public parse API with source snippets.

mod test_declarations;
mod test_entangled_syntax;
mod test_optional_types;
mod test_statements;
