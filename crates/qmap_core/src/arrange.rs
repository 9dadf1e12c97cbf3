//! Round grouping and spatial ordering of packed measurements.
//!
//! Each ancilla role is cut into `rounds` contiguous chunks of equal size and
//! every chunk is re-sorted by coordinate. Data qubits have no rounds and are
//! sorted as a single group. The result for a batch is keyed `"shot 1"`,
//! `"shot 2"`, ... in ascending shot order.

use crate::pack::PackedMeasurement;
use crate::roles::Role;
use crate::{MapError, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Measurements of one role in one round, in spatial order.
///
/// `round` is `None` for the data section, which is serialized without a
/// `round` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<usize>,
    pub ord_qubits: Vec<PackedMeasurement>,
}

impl RoundRecord {
    fn sorted(round: Option<usize>, mut ord_qubits: Vec<PackedMeasurement>) -> Self {
        ord_qubits.sort_by(PackedMeasurement::spatial_cmp);
        Self { round, ord_qubits }
    }

    pub fn values(&self) -> impl Iterator<Item = bool> + '_ {
        self.ord_qubits.iter().map(|m| m.value)
    }
}

/// Arranged measurements of a single shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    /// 1-based shot index; carried by the map key when serialized.
    #[serde(skip)]
    pub shot: usize,
    pub ancx: Vec<RoundRecord>,
    pub ancz: Vec<RoundRecord>,
    pub data: RoundRecord,
}

impl ShotRecord {
    /// Rounds of an ancilla section in ascending round order.
    ///
    /// The data section is returned as its single record.
    pub fn section(&self, role: Role) -> Vec<&RoundRecord> {
        let mut records: Vec<&RoundRecord> = match role {
            Role::AncX => self.ancx.iter().collect(),
            Role::AncZ => self.ancz.iter().collect(),
            Role::Data => return vec![&self.data],
        };
        records.sort_by_key(|r| r.round);
        records
    }

    /// Values of one section in emission order: round-major, then spatial.
    pub fn section_values(&self, role: Role) -> Vec<bool> {
        self.section(role)
            .into_iter()
            .flat_map(RoundRecord::values)
            .collect()
    }

    /// Number of bits the section contributes to a bitstream.
    pub fn section_len(&self, role: Role) -> usize {
        self.section(role).iter().map(|r| r.ord_qubits.len()).sum()
    }
}

fn group_rounds(
    role: Role,
    items: Vec<PackedMeasurement>,
    rounds: usize,
) -> Result<Vec<RoundRecord>> {
    if items.len() % rounds != 0 {
        return Err(MapError::UnevenRoundDivision {
            role,
            count: items.len(),
            rounds,
        });
    }
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let per_round = items.len() / rounds;
    Ok(items
        .chunks(per_round)
        .enumerate()
        .map(|(i, chunk)| RoundRecord::sorted(Some(i + 1), chunk.to_vec()))
        .collect())
}

/// Arranges the packed measurements of one shot.
///
/// Input order within each role must be round-major, as produced by
/// [`crate::demux::demultiplex`]. A role with no measurements yields an empty
/// round list.
pub fn arrange_shot(
    shot: usize,
    packed: &[PackedMeasurement],
    rounds: usize,
) -> Result<ShotRecord> {
    if rounds == 0 {
        return Err(MapError::InvalidRounds);
    }

    let of_role = |role: Role| -> Vec<PackedMeasurement> {
        packed.iter().filter(|m| m.role == role).copied().collect()
    };

    Ok(ShotRecord {
        shot,
        ancx: group_rounds(Role::AncX, of_role(Role::AncX), rounds)?,
        ancz: group_rounds(Role::AncZ, of_role(Role::AncZ), rounds)?,
        data: RoundRecord::sorted(None, of_role(Role::Data)),
    })
}

/// Arranges a batch of shots, numbering them from 1 in input order.
pub fn arrange(
    packed_per_shot: &[Vec<PackedMeasurement>],
    rounds: usize,
) -> Result<ArrangedResult> {
    let shots = packed_per_shot
        .iter()
        .enumerate()
        .map(|(i, packed)| arrange_shot(i + 1, packed, rounds))
        .collect::<Result<Vec<_>>>()?;
    Ok(ArrangedResult { shots })
}

/// Arranged measurements of a batch, ordered by ascending shot index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrangedResult {
    shots: Vec<ShotRecord>,
}

impl ArrangedResult {
    /// Builds a result from independently computed shots in any order.
    pub fn from_shots(mut shots: Vec<ShotRecord>) -> Self {
        shots.sort_by_key(|s| s.shot);
        Self { shots }
    }

    pub fn shots(&self) -> &[ShotRecord] {
        &self.shots
    }

    pub fn get(&self, shot: usize) -> Option<&ShotRecord> {
        self.shots
            .binary_search_by_key(&shot, |s| s.shot)
            .ok()
            .map(|i| &self.shots[i])
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }
}

const SHOT_KEY_PREFIX: &str = "shot ";

impl Serialize for ArrangedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.shots.len()))?;
        for shot in &self.shots {
            map.serialize_entry(&format!("{SHOT_KEY_PREFIX}{}", shot.shot), shot)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ArrangedResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ShotMapVisitor;

        impl<'de> Visitor<'de> for ShotMapVisitor {
            type Value = ArrangedResult;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map keyed \"shot N\"")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut shots = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, mut record)) = access.next_entry::<String, ShotRecord>()? {
                    record.shot = key
                        .strip_prefix(SHOT_KEY_PREFIX)
                        .and_then(|n| n.parse().ok())
                        .ok_or_else(|| de::Error::custom(format!("bad shot key {key:?}")))?;
                    shots.push(record);
                }
                Ok(ArrangedResult::from_shots(shots))
            }
        }

        deserializer.deserialize_map(ShotMapVisitor)
    }
}
