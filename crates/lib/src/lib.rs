//! buildmatrix-lib: cross-compilation of Go projects across a target matrix.
//!
//! - `config`: the project file and its defaults
//! - `context`: run-wide state and the artifact log
//! - `template`: name and flag templates
//! - `build`: entry point checks, matrix expansion and toolchain invocation
//! - `execute`: the staged pipeline that ties them together

pub mod build;
pub mod config;
pub mod consts;
pub mod context;
pub mod execute;
pub mod platform;
pub mod template;
pub mod util;
