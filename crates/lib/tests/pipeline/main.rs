//! End-to-end runs of the build pipeline against a stand-in toolchain.

#![cfg(unix)]

mod build_tests;
mod common;
mod hooks_tests;
