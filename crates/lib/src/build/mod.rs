//! Per-build steps that don't run anything themselves.
//!
//! - [`entrypoint`] - checks the entry point declares `func main()`
//! - [`matrix`] - expands a build into its target list
//! - [`toolchain`] - turns one resolved target into a `go build` invocation

pub mod entrypoint;
pub mod matrix;
pub mod toolchain;
