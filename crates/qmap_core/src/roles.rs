//! Qubit role classification from a circuit instruction stream.
//!
//! A single pass over the program collects three sets: qubits that receive a
//! basis change, qubits that are measured and reset, and qubits that are
//! measured at all. Measure-reset qubits are ancillas; they are X ancillas if
//! they were basis-changed anywhere in the program and Z ancillas otherwise.
//! Everything measured but never measure-reset is a data qubit.
//!
//! All sets iterate in ascending qubit index. The demultiplexer zips that
//! order positionally against raw measurement bits, so it must never depend
//! on insertion order.

use crate::{MapError, Result};
use qmap_common::isa::{GateKind, Instruction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

/// Syndrome role of a measured qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Ancilla measuring an X-type stabilizer.
    #[serde(rename = "ancx")]
    AncX,
    /// Ancilla measuring a Z-type stabilizer.
    #[serde(rename = "ancz")]
    AncZ,
    /// Data qubit, measured once at the end.
    #[serde(rename = "data")]
    Data,
}

impl Role {
    /// Label used in serialized output.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::AncX => "ancx",
            Role::AncZ => "ancz",
            Role::Data => "data",
        }
    }

    /// Maps a bitstream format character to its section, if valid.
    pub fn from_format_char(c: char) -> Option<Self> {
        match c {
            'x' => Some(Role::AncX),
            'z' => Some(Role::AncZ),
            'd' => Some(Role::Data),
            _ => None,
        }
    }

    pub fn format_char(self) -> char {
        match self {
            Role::AncX => 'x',
            Role::AncZ => 'z',
            Role::Data => 'd',
        }
    }

    pub fn is_ancilla(self) -> bool {
        self != Role::Data
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the classifier can read: an operation name and its qubit targets.
///
/// Keeps the classifier independent of any particular circuit representation.
pub trait Operation {
    fn name(&self) -> &str;

    /// Qubit indices targeted by the operation, in program order.
    fn qubits(&self) -> impl Iterator<Item = u32> + '_;
}

impl Operation for Instruction {
    fn name(&self) -> &str {
        &self.name
    }

    fn qubits(&self) -> impl Iterator<Item = u32> + '_ {
        self.qubit_targets()
    }
}

impl<S: AsRef<str>, T: AsRef<[u32]>> Operation for (S, T) {
    fn name(&self) -> &str {
        self.0.as_ref()
    }

    fn qubits(&self) -> impl Iterator<Item = u32> + '_ {
        self.1.as_ref().iter().copied()
    }
}

impl<O: Operation + ?Sized> Operation for &O {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn qubits(&self) -> impl Iterator<Item = u32> + '_ {
        (**self).qubits()
    }
}

/// Partition of the measured qubits of one circuit into roles.
///
/// Built once per circuit by [`classify_roles`] and read-only afterwards.
/// `ancx ∪ ancz` is exactly the measure-reset set and `data` is disjoint
/// from it by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet {
    basis_changed: BTreeSet<u32>,
    measure_reset: BTreeSet<u32>,
    data: BTreeSet<u32>,
    unordered_readouts: usize,
}

impl RoleSet {
    /// Ancilla qubits in ascending index order.
    pub fn ancillas(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        self.measure_reset.iter().copied()
    }

    /// Data qubits in ascending index order.
    pub fn data(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        self.data.iter().copied()
    }

    /// Role of a measure-reset qubit.
    ///
    /// Any basis change anywhere in the program makes it an X ancilla.
    pub fn ancilla_role(&self, qubit: u32) -> Role {
        if self.basis_changed.contains(&qubit) {
            Role::AncX
        } else {
            Role::AncZ
        }
    }

    /// Role of any qubit, or `None` if it is never measured.
    pub fn role_of(&self, qubit: u32) -> Option<Role> {
        if self.measure_reset.contains(&qubit) {
            Some(self.ancilla_role(qubit))
        } else if self.data.contains(&qubit) {
            Some(Role::Data)
        } else {
            None
        }
    }

    pub fn anc_x(&self) -> BTreeSet<u32> {
        self.measure_reset
            .intersection(&self.basis_changed)
            .copied()
            .collect()
    }

    pub fn anc_z(&self) -> BTreeSet<u32> {
        self.measure_reset
            .difference(&self.basis_changed)
            .copied()
            .collect()
    }

    pub fn num_ancillas(&self) -> usize {
        self.measure_reset.len()
    }

    pub fn num_data(&self) -> usize {
        self.data.len()
    }

    /// Width of one shot vector: `rounds * ancillas + data`.
    ///
    /// Fails with `ShotLengthOverflow` when the width does not fit in `usize`.
    pub fn expected_shot_len(&self, rounds: usize) -> Result<usize> {
        rounds
            .checked_mul(self.measure_reset.len())
            .and_then(|ancilla_bits| ancilla_bits.checked_add(self.data.len()))
            .ok_or(MapError::ShotLengthOverflow { rounds })
    }

    /// Number of measurement instructions whose targets were not listed in
    /// ascending qubit order.
    ///
    /// Samplers record bits in target order, so a nonzero count means the
    /// positional labeling disagrees with the recorded layout.
    pub fn unordered_readouts(&self) -> usize {
        self.unordered_readouts
    }

    /// Every qubit that contributes a bit to a shot, ancillas first.
    pub fn measured_qubits(&self) -> impl Iterator<Item = u32> + '_ {
        self.ancillas().chain(self.data())
    }
}

#[derive(Default)]
struct Scan {
    basis_changed: BTreeSet<u32>,
    measure_reset: BTreeSet<u32>,
    measured: BTreeSet<u32>,
    plain_measured: BTreeSet<u32>,
    unordered_readouts: usize,
}

impl Scan {
    fn step<O: Operation>(mut self, op: O) -> Self {
        let kind = GateKind::of(op.name());
        if kind.is_measurement() && !is_ascending(op.qubits()) {
            self.unordered_readouts += 1;
        }
        match kind {
            GateKind::BasisChange => self.basis_changed.extend(op.qubits()),
            GateKind::MeasureReset => {
                for q in op.qubits() {
                    self.measure_reset.insert(q);
                    self.measured.insert(q);
                }
            }
            GateKind::Measure => {
                for q in op.qubits() {
                    self.plain_measured.insert(q);
                    self.measured.insert(q);
                }
            }
            GateKind::Other => {}
        }
        self
    }
}

fn is_ascending(mut qubits: impl Iterator<Item = u32>) -> bool {
    let Some(mut prev) = qubits.next() else {
        return true;
    };
    qubits.all(|q| {
        let ordered = prev < q;
        prev = q;
        ordered
    })
}

/// Classifies the qubits of a circuit into roles.
///
/// Traverses `instructions` exactly once in program order. Malformed circuits
/// are not rejected here: a qubit that is both measure-reset and plainly
/// measured is logged and kept as an ancilla, and the resulting width
/// mismatch surfaces in [`crate::demux::demultiplex`].
pub fn classify_roles<I>(instructions: I) -> RoleSet
where
    I: IntoIterator,
    I::Item: Operation,
{
    let scan = instructions.into_iter().fold(Scan::default(), Scan::step);

    let overlap: Vec<u32> = scan
        .measure_reset
        .intersection(&scan.plain_measured)
        .copied()
        .collect();
    if !overlap.is_empty() {
        warn!(qubits = ?overlap, "qubits are both measure-reset and plainly measured");
    }
    if scan.unordered_readouts > 0 {
        warn!(
            instructions = scan.unordered_readouts,
            "measurement targets not in ascending qubit order; labels follow ascending order"
        );
    }

    let data = scan
        .measured
        .difference(&scan.measure_reset)
        .copied()
        .collect();

    let roles = RoleSet {
        basis_changed: scan.basis_changed,
        measure_reset: scan.measure_reset,
        data,
        unordered_readouts: scan.unordered_readouts,
    };

    debug!(
        ancx = ?roles.anc_x(),
        ancz = ?roles.anc_z(),
        data = ?roles.data,
        "classified qubit roles"
    );

    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_x_like() -> Vec<(&'static str, Vec<u32>)> {
        vec![
            ("R", vec![1, 3, 5, 8, 10, 12, 15, 17, 19]),
            ("RX", vec![2, 9, 11, 13, 14, 16, 18, 25]),
            ("H", vec![2, 11, 16, 25]),
            ("CX", vec![2, 3, 16, 17, 11, 12]),
            ("H", vec![2, 11, 16, 25]),
            ("MR", vec![2, 9, 11, 13, 14, 16, 18, 25]),
            ("MX", vec![1, 3, 5, 8, 10, 12, 15, 17, 19]),
        ]
    }

    #[test]
    fn test_classify_partitions_measure_reset() {
        let roles = classify_roles(memory_x_like());

        let anc_x = roles.anc_x();
        let anc_z = roles.anc_z();
        assert_eq!(anc_x.iter().copied().collect::<Vec<_>>(), vec![2, 11, 16, 25]);
        assert_eq!(anc_z.iter().copied().collect::<Vec<_>>(), vec![9, 13, 14, 18]);
        assert!(anc_x.is_disjoint(&anc_z));

        let union: BTreeSet<u32> = anc_x.union(&anc_z).copied().collect();
        let ancillas: BTreeSet<u32> = roles.ancillas().collect();
        assert_eq!(union, ancillas);
        assert_eq!(roles.num_data(), 9);
        assert_eq!(roles.expected_shot_len(2), Ok(25));
    }

    #[test]
    fn test_iteration_is_ascending_regardless_of_program_order() {
        let roles = classify_roles(vec![("MR", vec![30u32, 4, 17]), ("M", vec![9, 2])]);
        assert_eq!(roles.ancillas().collect::<Vec<_>>(), vec![4, 17, 30]);
        assert_eq!(roles.data().collect::<Vec<_>>(), vec![2, 9]);
    }

    #[test]
    fn test_unordered_readouts_are_counted() {
        let ordered = classify_roles(memory_x_like());
        assert_eq!(ordered.unordered_readouts(), 0);

        let roles = classify_roles(vec![
            ("H", vec![9u32, 2]),
            ("MR", vec![4, 3]),
            ("MR", vec![3, 4]),
            ("M", vec![0, 2, 1]),
            ("M", vec![5, 5]),
        ]);
        // H is not a readout; the repeated 5 is not strictly ascending
        assert_eq!(roles.unordered_readouts(), 3);
    }

    #[test]
    fn test_basis_change_anywhere_marks_x_ancilla() {
        // H after the last readout still counts.
        let roles = classify_roles(vec![("MR", vec![0u32, 1]), ("H", vec![1, 7])]);
        assert_eq!(roles.ancilla_role(0), Role::AncZ);
        assert_eq!(roles.ancilla_role(1), Role::AncX);
        // Basis-changed but never measured: no role.
        assert_eq!(roles.role_of(7), None);
    }

    #[test]
    fn test_reset_measured_qubit_is_never_data() {
        let roles = classify_roles(vec![("MR", vec![3u32]), ("M", vec![3, 4])]);
        assert_eq!(roles.role_of(3), Some(Role::AncZ));
        assert_eq!(roles.data().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_classify_instruction_values() {
        let program = vec![
            Instruction::on_qubits("h", &[5]),
            Instruction::on_qubits("mr", &[5, 6]),
            Instruction::on_qubits("m", &[0]),
        ];
        let roles = classify_roles(&program);
        assert_eq!(roles.role_of(5), Some(Role::AncX));
        assert_eq!(roles.role_of(6), Some(Role::AncZ));
        assert_eq!(roles.role_of(0), Some(Role::Data));
    }

    #[test]
    fn test_format_chars() {
        for role in [Role::AncX, Role::AncZ, Role::Data] {
            assert_eq!(Role::from_format_char(role.format_char()), Some(role));
        }
        assert_eq!(Role::from_format_char('y'), None);
    }
}
