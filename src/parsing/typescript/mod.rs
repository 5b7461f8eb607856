//! TypeScript and JavaScript front end.

pub mod parser;

pub use parser::{
    ParserSet, SUPPORTED_EXTENSIONS, TypeScriptParser, is_declaration_file, is_supported, uses_tsx_grammar,
};
