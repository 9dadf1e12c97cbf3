//! Demultiplexing of one raw shot vector into labeled measurements.
//!
//! A shot vector is laid out in circuit program order: one chunk of ancilla
//! measure-reset outcomes per round, each chunk in ascending ancilla index
//! order, followed by a single chunk of data qubit outcomes in ascending data
//! index order. Demultiplexing zips each chunk positionally against the
//! corresponding index order and labels every bit with its role. No spatial
//! reordering happens here.

use crate::roles::{Role, RoleSet};
use crate::{MapError, Result};
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::trace;

/// One raw bit tagged with the qubit that produced it and that qubit's role.
///
/// Serialized as the tuple `[value, qubit, type]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabeledMeasurement {
    pub value: bool,
    pub qubit: u32,
    pub role: Role,
}

impl Serialize for LabeledMeasurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&self.value)?;
        tup.serialize_element(&self.qubit)?;
        tup.serialize_element(&self.role)?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for LabeledMeasurement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TupleVisitor;

        impl<'de> Visitor<'de> for TupleVisitor {
            type Value = LabeledMeasurement;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [value, qubit, type] triple")
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let value = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let qubit = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let role = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                Ok(LabeledMeasurement { value, qubit, role })
            }
        }

        deserializer.deserialize_tuple(3, TupleVisitor)
    }
}

/// Splits one shot vector into labeled measurements.
///
/// Fails fast with `LengthMismatch` unless
/// `shot.len() == rounds * roles.num_ancillas() + roles.num_data()`.
/// The output has the same length and order as `shot`.
pub fn demultiplex(
    shot: &[bool],
    roles: &RoleSet,
    rounds: usize,
) -> Result<Vec<LabeledMeasurement>> {
    if rounds == 0 {
        return Err(MapError::InvalidRounds);
    }

    let expected = roles.expected_shot_len(rounds)?;
    if shot.len() != expected {
        return Err(MapError::LengthMismatch {
            expected,
            actual: shot.len(),
        });
    }

    let ancillas: Vec<u32> = roles.ancillas().collect();
    let (ancilla_bits, data_bits) = shot.split_at(rounds * ancillas.len());
    let mut labeled = Vec::with_capacity(shot.len());

    if !ancillas.is_empty() {
        for (round, chunk) in ancilla_bits.chunks_exact(ancillas.len()).enumerate() {
            let start = round * ancillas.len();
            trace!(
                round = round + 1,
                start,
                end = start + chunk.len(),
                "ancilla chunk"
            );
            labeled.extend(chunk.iter().zip(&ancillas).map(|(&value, &qubit)| {
                LabeledMeasurement {
                    value,
                    qubit,
                    role: roles.ancilla_role(qubit),
                }
            }));
        }
    }

    trace!(start = ancilla_bits.len(), end = shot.len(), "data chunk");
    labeled.extend(
        data_bits
            .iter()
            .zip(roles.data())
            .map(|(&value, qubit)| LabeledMeasurement {
                value,
                qubit,
                role: Role::Data,
            }),
    );

    Ok(labeled)
}
