//! Core measurement mapping pipeline for surface-code style circuits.
//!
//! This crate turns the flat boolean rows produced by a stabilizer sampler
//! into labeled, spatially ordered records. It recovers which bit belongs to
//! which qubit, round and stabilizer role purely from program order and
//! circuit metadata, then re-imposes a deterministic ordering and encodes it
//! as a bitstream. Every stage is a pure function of its inputs, so shots can
//! be processed independently and in any order.

/// Stage 4: grouping packed measurements into rounds and sorting them spatially.
///
/// Produces one `ShotRecord` per shot and the multi-shot `ArrangedResult`
/// that is serialized as the canonical artifact.
pub mod arrange;

/// Stage 5: flattening an arranged result into a `'0'`/`'1'` string.
///
/// The section order is controlled by a format string over `x`, `z` and `d`
/// that is validated in full before any output is produced.
pub mod bitstream;

/// Qubit coordinate lookup attached to measurements during packing.
///
/// Coordinates are supplied once per circuit and never mutated afterwards.
pub mod coords;

/// Stage 2: splitting one raw shot vector into labeled measurements.
///
/// Chunks the vector round by round against the ascending ancilla order,
/// followed by the data qubits, and labels each bit with its role.
pub mod demux;

/// Rotated surface code size checks.
///
/// Validates the code distance and predicts the measurement count per shot
/// so that a circuit/configuration mismatch is caught before mapping.
pub mod layout;

/// Per-circuit facade bundling roles, coordinates and round count.
///
/// Runs demultiplexing, packing and arranging for a single shot without any
/// shared mutable state, which lets callers fan shots out across threads.
pub mod mapper;

/// Stage 3: attaching coordinates to labeled measurements.
pub mod pack;

/// Stage 1: classifying qubits into X ancilla, Z ancilla and data roles.
///
/// Scans the instruction stream once and yields an immutable `RoleSet` whose
/// iteration order is ascending qubit index.
pub mod roles;

use roles::Role;
use thiserror::Error;

/// Result type alias for mapping operations.
pub type Result<T> = std::result::Result<T, MapError>;

/// Error types returned by the mapping pipeline.
///
/// All variants are local input validation failures. None of them are
/// recovered automatically; each carries enough context to diagnose the
/// mismatch without rerunning with verbose logging.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    /// The raw measurement vector does not have the predicted width.
    ///
    /// The expected width is `rounds * ancillas + data`. The vector is never
    /// truncated or padded to make it fit.
    #[error("measurement vector length mismatch: expected {expected} bits, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A measured qubit has no entry in the coordinate map.
    ///
    /// Indicates that the circuit's coordinate annotations and its
    /// measurement instructions disagree.
    #[error("qubit {qubit} has no coordinates")]
    MissingCoordinate { qubit: u32 },

    /// An ancilla role's measurement count is not a multiple of the round count.
    #[error("{count} {role} measurements cannot be split evenly into {rounds} rounds")]
    UnevenRoundDivision {
        role: Role,
        count: usize,
        rounds: usize,
    },

    /// The bitstream format string contains a character outside `x`, `z`, `d`.
    #[error(
        "invalid format character {character:?} at position {position}; allowed: 'x', 'z', 'd'"
    )]
    InvalidFormatCharacter { character: char, position: usize },

    /// The round count is zero.
    #[error("rounds must be at least 1")]
    InvalidRounds,

    /// The shot width for this round count does not fit in `usize`.
    #[error("{rounds} rounds overflow the measurement vector length")]
    ShotLengthOverflow { rounds: usize },

    /// The surface code distance is even or smaller than three.
    #[error("surface code distance must be odd and at least 3, got {distance}")]
    InvalidDistance { distance: usize },
}
