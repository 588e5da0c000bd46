pub mod batch;
pub mod cover;
pub mod fallback;
pub mod parser;
pub mod presenter;
pub mod processor;
pub mod prompt;
pub mod renamer;
pub mod resolver;
pub mod selector;
pub mod tagger;
