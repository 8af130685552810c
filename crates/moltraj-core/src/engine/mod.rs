//! # Engine Module
//!
//! The stateful layer of moltraj: open file handles with their lazily built
//! frame index.
//!
//! ## Architecture
//!
//! - **Frame index** ([`index`]) - Strictly increasing byte offsets of the frames discovered so far
//! - **Indexed reads** ([`step_reader`]) - Random access by step, sequential reads and step counts
//! - **Writing** ([`writer`]) - Sequential frame output with the format trailer written on finish
//! - **Session** ([`trajectory`]) - One open file in read, write or append mode
//! - **Configuration** ([`config`]) - Open options and conversion settings with their builders
//! - **Progress Monitoring** ([`progress`]) - Progress events for long conversions
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! Each handle owns its index and cursor without internal locking; a handle
//! must not be shared between threads without external synchronization.

pub mod config;
pub mod error;
pub mod index;
pub mod progress;
pub mod step_reader;
pub mod trajectory;
pub mod writer;
