//! `protostar_core` is the template composition engine behind
//! [protostar](https://github.com/protostar-build/protostar). It flattens HTML
//! prototypes built from nested fragments into single pages, driven by
//! placeholders embedded in HTML comments.
//!
//! ## Placeholders
//!
//! ```html
//! <!-- file:/header -->                         include a fragment
//! <!-- content:main -->                         declare a slot
//! <!-- content:aside(wrap=/frame) -->           a slot that wraps what it receives
//! <!-- layout:/base(main=file:/body;aside='<hr>') -->
//! <!-- layout:/base(file:/body;'<hr>') -->      fill slots by position
//! <!-- wrap:/frame -->                          place this document in a wrapper
//! <!-- linkCss:default -->                      register a stylesheet
//! <!-- linkScript:/js/app -->                   register a script
//! ```
//!
//! ## Processing Pipeline
//!
//! ```text
//! HTML template
//!   → Attribute pre-pass (data-editable refs, relative ps: links)
//!   → Scanner (finds placeholders, normalizes relative names)
//!   → Composition runs (backward replacement, until no placeholder is left
//!     or the run limit is reached)
//!   → Composition { content, metadata, runs, converged }
//! ```
//!
//! With `mark_regions` enabled every resolved `file` and `layout` region is
//! surrounded by `begin_`/`end_` comments, which [`decompile`] collapses back
//! into placeholders.
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading from `protostar.toml`.
//! - [`project`] - Template discovery and composing or building a whole
//!   project.
//! - [`decompiler`] - The inverse of a marked composition.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use protostar_core::Composer;
//! use protostar_core::ProjectResolver;
//! use std::path::Path;
//!
//! let resolver = ProjectResolver::new("site");
//! let composer = Composer::new(&resolver);
//! let path = Path::new("site/index.html");
//! let source = std::fs::read_to_string(path).unwrap();
//! let composition = composer.compose(path, &source).unwrap();
//!
//! println!("{}", composition.content);
//! println!("styles: {:?}", composition.metadata.include.style);
//! ```

pub use attributes::*;
pub use config::*;
pub use decompiler::*;
pub use engine::*;
pub use error::*;
pub use layout::BindingMode;
pub use project::*;
pub use resolver::*;
pub use scanner::*;

mod attributes;
pub mod config;
pub mod decompiler;
mod engine;
#[allow(unused_assignments)]
mod error;
mod layout;
pub mod project;
mod resolver;
mod scanner;

#[cfg(test)]
mod __fixtures;
