use crate::roles::RoleSet;
use crate::{MapError, Result};

/// Size bookkeeping for a rotated surface code memory experiment.
///
/// A distance-`d` patch has `d²` data qubits and `d² - 1` stabilizer
/// ancillas, half X-type and half Z-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCodeLayout {
    distance: usize,
    rounds: usize,
    shot_len: usize,
}

impl SurfaceCodeLayout {
    /// Validates that `distance` is odd and at least 3 and `rounds` is positive.
    ///
    /// Fails with `ShotLengthOverflow` if the shot width does not fit in `usize`.
    pub fn new(distance: usize, rounds: usize) -> Result<Self> {
        if distance < 3 || distance % 2 == 0 {
            return Err(MapError::InvalidDistance { distance });
        }
        if rounds == 0 {
            return Err(MapError::InvalidRounds);
        }
        let num_data = distance
            .checked_mul(distance)
            .ok_or(MapError::InvalidDistance { distance })?;
        let shot_len = rounds
            .checked_mul(num_data - 1)
            .and_then(|ancilla_bits| ancilla_bits.checked_add(num_data))
            .ok_or(MapError::ShotLengthOverflow { rounds })?;
        Ok(Self {
            distance,
            rounds,
            shot_len,
        })
    }

    pub fn distance(&self) -> usize {
        self.distance
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn num_data(&self) -> usize {
        self.distance * self.distance
    }

    pub fn num_ancillas(&self) -> usize {
        self.num_data() - 1
    }

    /// Bits per shot: `rounds * (d² - 1) + d²`.
    pub fn shot_len(&self) -> usize {
        self.shot_len
    }

    /// Checks that a classified circuit produces the width this layout predicts.
    pub fn check(&self, roles: &RoleSet) -> Result<()> {
        let actual = roles.expected_shot_len(self.rounds)?;
        if actual != self.shot_len {
            return Err(MapError::LengthMismatch {
                expected: self.shot_len,
                actual,
            });
        }
        Ok(())
    }
}
