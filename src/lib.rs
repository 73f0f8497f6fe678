//! This library implements the form checker for [Wasm](https://webassembly.org/)
//! function bodies: given a decoded instruction sequence and the surrounding
//! module context it decides whether the sequence is well-typed, and computes
//! the branch bookkeeping an execution engine needs. It implements
//! - the abstract type-stack algorithm from the appendix of the Wasm
//!   specification, extended with reference types, tail calls, fixed-width
//!   SIMD and the threads proposal,
//! - initialisation tracking for non-defaultable locals, and
//! - stack-erase and jump-distance annotation of branch instructions.
//!
//! The main entry point is [`FormChecker`](validate::FormChecker): populate
//! the module context through its `add_*` methods and check each function
//! body with [`validate`](validate::FormChecker::validate). Decoding modules
//! and executing them are out of scope for this crate.

pub mod constants;
pub mod errors;
pub mod types;
pub mod validate;

#[cfg(test)]
mod validation_tests;
