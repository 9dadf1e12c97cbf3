//! Common definitions shared across the measurement mapping workspace.
//!
//! This crate provides the circuit instruction vocabulary produced by the
//! circuit parser and consumed by the qubit role classifier. It carries no
//! behaviour beyond naming and classification so that both the I/O layer and
//! the core pipeline agree on what an instruction is.

#![no_std]

extern crate alloc;

/// Instruction model for stabilizer circuits.
///
/// Describes a single circuit operation as an upper-case name, optional
/// numeric arguments, and an ordered list of targets. The layout mirrors the
/// Stim text format closely enough that every line of a circuit file maps to
/// exactly one `Instruction`.
pub mod isa {
    use alloc::string::String;
    use alloc::vec::Vec;

    /// Classification of an instruction name for role assignment.
    ///
    /// Only the distinctions needed to recover qubit roles are made. Gates
    /// that neither change the measurement basis nor read out a qubit fall
    /// into `Other` and are ignored by the classifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum GateKind {
        /// Hadamard-type gate that rotates the qubit into the X basis.
        ///
        /// An ancilla that receives one of these anywhere in the program is
        /// read out as an X-stabilizer ancilla.
        BasisChange,

        /// Measurement immediately followed by a reset of the same qubit.
        ///
        /// Ancilla qubits are read out this way once per round.
        MeasureReset,

        /// Plain destructive measurement with no reset.
        ///
        /// Data qubits are read out this way once at the end of the circuit.
        Measure,

        /// Any other operation (gates, noise channels, annotations).
        Other,
    }

    impl GateKind {
        /// Classifies an instruction name. Matching is case-insensitive.
        pub fn of(name: &str) -> Self {
            const BASIS_CHANGE: &[&str] = &["H", "H_XZ"];
            const MEASURE_RESET: &[&str] = &["MR", "MRZ", "MRX", "MRY"];
            const MEASURE: &[&str] = &["M", "MZ", "MX", "MY", "MPP"];

            let matches = |table: &[&str]| table.iter().any(|n| n.eq_ignore_ascii_case(name));
            if matches(BASIS_CHANGE) {
                GateKind::BasisChange
            } else if matches(MEASURE_RESET) {
                GateKind::MeasureReset
            } else if matches(MEASURE) {
                GateKind::Measure
            } else {
                GateKind::Other
            }
        }

        /// True for any operation that produces a measurement record.
        pub fn is_measurement(self) -> bool {
            matches!(self, GateKind::MeasureReset | GateKind::Measure)
        }
    }

    /// Pauli basis letter used by Pauli-product targets such as `X3`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PauliBasis {
        X,
        Y,
        Z,
    }

    /// One target of a circuit instruction.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Target {
        /// A physical qubit, optionally with an inverted result (`!5`).
        Qubit { index: u32, inverted: bool },

        /// A Pauli-qualified qubit, as used by `MPP` (`X3`, `!Z4`).
        Pauli {
            basis: PauliBasis,
            index: u32,
            inverted: bool,
        },

        /// A lookback into the measurement record (`rec[-1]`).
        Record(i32),

        /// A sweep bit (`sweep[3]`).
        Sweep(u32),

        /// The `*` combiner joining Pauli-product terms.
        Combiner,
    }

    impl Target {
        /// Physical qubit addressed by this target, if any.
        pub fn qubit(&self) -> Option<u32> {
            match *self {
                Target::Qubit { index, .. } | Target::Pauli { index, .. } => Some(index),
                Target::Record(_) | Target::Sweep(_) | Target::Combiner => None,
            }
        }
    }

    /// A single circuit instruction in program order.
    ///
    /// Names are normalized to upper case at construction so lookups in
    /// `GateKind::of` and downstream comparisons do not depend on the case
    /// used in the source file.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Instruction {
        /// Upper-case operation name, e.g. `MR` or `QUBIT_COORDS`.
        pub name: String,

        /// Parenthesized numeric arguments (probabilities, coordinates).
        pub args: Vec<f64>,

        /// Targets in the order they appear on the line.
        pub targets: Vec<Target>,
    }

    impl Instruction {
        /// Constructs an instruction, upper-casing the operation name.
        pub fn new(name: &str, args: Vec<f64>, targets: Vec<Target>) -> Self {
            Self {
                name: name.to_ascii_uppercase(),
                args,
                targets,
            }
        }

        /// Convenience constructor for an instruction acting on plain qubits.
        pub fn on_qubits(name: &str, qubits: &[u32]) -> Self {
            let targets = qubits
                .iter()
                .map(|&index| Target::Qubit {
                    index,
                    inverted: false,
                })
                .collect();
            Self::new(name, Vec::new(), targets)
        }

        pub fn kind(&self) -> GateKind {
            GateKind::of(&self.name)
        }

        /// Qubit indices addressed by this instruction, in target order.
        pub fn qubit_targets(&self) -> impl Iterator<Item = u32> + '_ {
            self.targets.iter().filter_map(Target::qubit)
        }
    }

}
