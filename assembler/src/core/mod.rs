//! Deterministic, pure logic shared by the assembler stages.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! documents and return deterministic outputs suitable for tests.

pub mod assembler;
pub mod document;
pub mod grammar;
pub mod layout;
pub mod manifest;
pub mod resolver;
pub mod template;
pub mod types;
pub mod validator;
