use crate::Result;
use crate::coords::{Coord, CoordinateMap};
use crate::demux::LabeledMeasurement;
use crate::roles::Role;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A labeled measurement with the measured qubit's coordinates attached.
///
/// Field order matches the serialized artifact: `qubit, value, type, coords`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackedMeasurement {
    pub qubit: u32,
    pub value: bool,
    #[serde(rename = "type")]
    pub role: Role,
    pub coords: Coord,
}

impl PackedMeasurement {
    /// Spatial order: x, then y, then qubit index for coincident positions.
    pub fn spatial_cmp(&self, other: &Self) -> Ordering {
        self.coords
            .spatial_cmp(&other.coords)
            .then_with(|| self.qubit.cmp(&other.qubit))
    }
}

/// Attaches coordinates to every measurement, preserving order.
///
/// Fails with `MissingCoordinate` on the first qubit absent from `coords`.
pub fn pack(
    labeled: &[LabeledMeasurement],
    coords: &CoordinateMap,
) -> Result<Vec<PackedMeasurement>> {
    labeled
        .iter()
        .map(|m| {
            Ok(PackedMeasurement {
                qubit: m.qubit,
                value: m.value,
                role: m.role,
                coords: coords.lookup(m.qubit)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapError;

    fn labeled(qubit: u32, value: bool, role: Role) -> LabeledMeasurement {
        LabeledMeasurement { value, qubit, role }
    }

    #[test]
    fn test_pack_preserves_order() {
        let coords: CoordinateMap = [(3, Coord::new(0.0, 2.0)), (1, Coord::new(5.0, 5.0))]
            .into_iter()
            .collect();
        let input = [labeled(1, true, Role::AncX), labeled(3, false, Role::Data)];
        let packed = pack(&input, &coords).unwrap();
        assert_eq!(packed[0].qubit, 1);
        assert_eq!(packed[0].coords, Coord::new(5.0, 5.0));
        assert_eq!(packed[1].qubit, 3);
        assert!(!packed[1].value);
    }

    #[test]
    fn test_pack_missing_coordinate() {
        let coords: CoordinateMap = [(1, Coord::new(0.0, 0.0))].into_iter().collect();
        let input = [labeled(1, true, Role::AncZ), labeled(6, true, Role::AncZ)];
        assert_eq!(pack(&input, &coords), Err(MapError::MissingCoordinate { qubit: 6 }));
    }

    #[test]
    fn test_packed_field_order() {
        let m = PackedMeasurement {
            qubit: 2,
            value: false,
            role: Role::AncX,
            coords: Coord::new(2.0, 0.0),
        };
        assert_eq!(
            serde_json::to_string(&m).unwrap(),
            r#"{"qubit":2,"value":false,"type":"ancx","coords":[2.0,0.0]}"#
        );
    }

    #[test]
    fn test_coincident_coordinates_order_by_qubit() {
        let at = |qubit| PackedMeasurement {
            qubit,
            value: false,
            role: Role::Data,
            coords: Coord::new(1.0, 1.0),
        };
        assert_eq!(at(4).spatial_cmp(&at(9)), Ordering::Less);
        assert_eq!(at(9).spatial_cmp(&at(4)), Ordering::Greater);
    }
}
