pub mod cli;
pub mod config;
pub mod crypto;
pub mod document;
pub mod envelope;
pub mod errors;
pub mod format;
pub mod keywrap;
pub mod scope;
