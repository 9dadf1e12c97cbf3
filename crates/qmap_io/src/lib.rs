//! I/O utilities for loading circuits and sampler output.
//!
//! Provides the collaborators the mapping pipeline consumes: a parser for
//! Stim circuit text (instruction stream and qubit coordinates) and loaders
//! for the per-shot measurement rows a sampler writes to disk.

/// Loaders for sampled measurement data.
///
/// Reads bit-packed `.b8` files and line-oriented `01` files and slices them
/// into one boolean row per shot.
pub mod loader;

/// Parser for Stim circuit text.
///
/// Produces the flattened instruction stream used for role classification
/// and the coordinate table used for spatial ordering.
pub mod parser;
