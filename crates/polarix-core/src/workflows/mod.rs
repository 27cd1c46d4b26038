//! # Workflows Module
//!
//! This module provides the high-level entry points that orchestrate a complete
//! polarization evaluation for the common single-process case.
//!
//! ## Overview
//!
//! Workflows are the top-level API for users of the library. They wire the
//! engine together — ghost synchronization, static-field accumulation, the
//! self-consistent dipole solve and the final force pass — behind one call,
//! handling geometry selection, diagnostics reporting and result organization.
//!
//! ## Architecture
//!
//! The module is organized around specific evaluation workflows:
//!
//! - **Evaluation Workflow** ([`evaluate`]) - One full force evaluation of a
//!   particle system, from static fields through converged induced dipoles to
//!   forces, decomposed energies and the virial.

pub mod evaluate;
