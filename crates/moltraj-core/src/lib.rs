//! # moltraj Core Library
//!
//! Random access to text-based molecular trajectory files (PDB, GRO, SDF,
//! MOL2, BGF, CSSR and LAMMPS data), with reconstruction of the connectivity
//! that these grammars only encode partially.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless frame containers, the line-oriented file
//!   abstraction, one module per text grammar, and the topology reconstruction run
//!   on parsed frames (residue templates, canonical bonded types, molecule grouping,
//!   backbone bonds).
//!
//! - **[`engine`]: The Logic Core.** Open file handles and their state: the lazily
//!   built `FrameIndex` of byte offsets, the `StepReader` that uses it for random
//!   access, the `FrameWriter`, and the `Trajectory` session tying them to an open mode.
//!
//! - **[`workflows`]: The Public API.** Complete procedures built on the engine, such
//!   as converting a trajectory between formats or summarizing its steps.
//!
//! ```no_run
//! use moltraj::engine::trajectory::{OpenMode, Trajectory};
//!
//! let mut trajectory = Trajectory::open("water.gro", OpenMode::Read)?;
//! let steps = trajectory.step_count()?;
//! let last = trajectory.read_step(steps - 1)?;
//! println!("{} atoms in the last step", last.size());
//! # Ok::<(), moltraj::engine::error::EngineError>(())
//! ```

pub mod core;
pub mod engine;
pub mod workflows;
