//! Tampio: an interpreter for an equational language written in inflected
//! Finnish noun phrases. See `spec.md`/`SPEC_FULL.md` for the language
//! this crate implements; `src/main.rs` is the CLI entry point built on
//! top of the pieces exported here.

pub mod diagnostics;
pub mod driver;
pub mod eval;
pub mod lexer;
pub mod lib;
pub mod morph;
pub mod parser;
pub mod repl;
pub mod rules;
pub mod tree;
