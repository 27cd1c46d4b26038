//! # Polarix Core Library
//!
//! A self-consistent induced point-dipole polarization solver for molecular
//! force-field evaluations, built around a dense dipole-interaction tensor and
//! a damped Gauss-Seidel/Jacobi fixed-point iteration.
//!
//! ## Architectural Philosophy
//!
//! The library is split into two layers with a strict dependency direction, plus
//! a thin convenience facade:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Particle`,
//!   `ParticleSystem`), periodic-geometry abstractions (`MinimumImage`), and
//!   physical constants. Nothing in this layer knows about the solver.
//!
//! - **[`engine`]: The Logic Core.** The stateful per-evaluation machinery:
//!   static-field accumulation, the dense `DipoleFieldMatrix`, the coupling-rank
//!   heuristic, the `InducedDipoleSolver` state machine, and the conversion of
//!   converged dipoles into forces and decomposed energies. All scratch buffers
//!   are owned by a `PolarizationEvaluator` and rebuilt every force evaluation.
//!
//! - **[`workflows`]: The Public API.** One-call entry points that wire the
//!   engine together for the common single-process case.

pub mod core;
pub mod engine;
pub mod workflows;
