//! The library code for the `sitegen` static site generator. A build is a
//! single pass made of three steps:
//!
//! 1. Parsing posts from source files on disk ([`crate::parser`]). Each
//!    source file is a YAML frontmatter block, a `---` line, and a Markdown
//!    body ([`crate::post`]). Bodies are rendered to HTML and measured for
//!    word count and reading time ([`crate::markdown`], [`crate::readtime`]).
//! 2. Writing one page per post, mirroring the source directory structure
//!    under the output directory ([`crate::write`]).
//! 3. Writing the home page, which lists every post by date, most recent
//!    first.
//!
//! Parsing is independent per file and may be spread over worker threads;
//! everything after that happens on the calling thread. [`crate::build`]
//! ties the steps together and decides whether a bad post aborts the build
//! or is skipped and reported.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod readtime;
mod value;
pub mod write;
