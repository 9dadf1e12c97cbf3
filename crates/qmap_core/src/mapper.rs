use crate::arrange::{ArrangedResult, ShotRecord, arrange_shot};
use crate::coords::CoordinateMap;
use crate::demux::{LabeledMeasurement, demultiplex};
use crate::pack::pack;
use crate::roles::RoleSet;
use crate::{MapError, Result};

/// Read-only per-circuit state for mapping shots.
///
/// Holds the role partition, the coordinate table and the round count. All
/// methods take `&self`, so one mapper can be shared by any number of worker
/// threads.
#[derive(Debug, Clone)]
pub struct MeasurementMapper {
    roles: RoleSet,
    coords: CoordinateMap,
    rounds: usize,
    shot_len: usize,
}

impl MeasurementMapper {
    /// Creates a mapper, checking that every measured qubit has coordinates.
    ///
    /// Catching a missing coordinate here reports it once instead of once per
    /// shot.
    pub fn new(roles: RoleSet, coords: CoordinateMap, rounds: usize) -> Result<Self> {
        if rounds == 0 {
            return Err(MapError::InvalidRounds);
        }
        let shot_len = roles.expected_shot_len(rounds)?;
        for qubit in roles.measured_qubits() {
            coords.lookup(qubit)?;
        }
        Ok(Self {
            roles,
            coords,
            rounds,
            shot_len,
        })
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn coords(&self) -> &CoordinateMap {
        &self.coords
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Width every shot vector must have.
    pub fn shot_len(&self) -> usize {
        self.shot_len
    }

    pub fn label(&self, bits: &[bool]) -> Result<Vec<LabeledMeasurement>> {
        demultiplex(bits, &self.roles, self.rounds)
    }

    /// Arranges already labeled measurements as shot number `shot`.
    pub fn arrange_labeled(
        &self,
        shot: usize,
        labeled: &[LabeledMeasurement],
    ) -> Result<ShotRecord> {
        let packed = pack(labeled, &self.coords)?;
        arrange_shot(shot, &packed, self.rounds)
    }

    /// Demultiplexes, packs and arranges one raw shot vector.
    pub fn map_shot(&self, shot: usize, bits: &[bool]) -> Result<ShotRecord> {
        self.arrange_labeled(shot, &self.label(bits)?)
    }

    /// Maps a batch sequentially, numbering shots from 1.
    pub fn map_batch<B: AsRef<[bool]>>(&self, shots: &[B]) -> Result<ArrangedResult> {
        shots
            .iter()
            .enumerate()
            .map(|(i, bits)| self.map_shot(i + 1, bits.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(ArrangedResult::from_shots)
    }
}
