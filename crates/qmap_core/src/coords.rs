use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Planar position of a physical qubit.
///
/// Serialized as a two-element array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Total order by x, then y.
    pub fn spatial_cmp(&self, other: &Self) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

impl From<[f64; 2]> for Coord {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Coord> for [f64; 2] {
    fn from(c: Coord) -> Self {
        [c.x, c.y]
    }
}

/// Qubit index to coordinate lookup for one circuit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateMap {
    entries: BTreeMap<u32, Coord>,
}

impl CoordinateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a coordinate, replacing any earlier one for the same qubit.
    pub fn insert(&mut self, qubit: u32, coord: Coord) -> Option<Coord> {
        self.entries.insert(qubit, coord)
    }

    pub fn get(&self, qubit: u32) -> Option<Coord> {
        self.entries.get(&qubit).copied()
    }

    /// Exact-key lookup that fails with `MissingCoordinate`.
    pub fn lookup(&self, qubit: u32) -> Result<Coord> {
        self.get(qubit).ok_or(MapError::MissingCoordinate { qubit })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending qubit order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Coord)> + '_ {
        self.entries.iter().map(|(&q, &c)| (q, c))
    }
}

impl FromIterator<(u32, Coord)> for CoordinateMap {
    fn from_iter<I: IntoIterator<Item = (u32, Coord)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_reports_missing_qubit() {
        let map: CoordinateMap = [(0, Coord::new(1.0, 1.0))].into_iter().collect();
        assert_eq!(map.lookup(0), Ok(Coord::new(1.0, 1.0)));
        assert_eq!(map.lookup(9), Err(MapError::MissingCoordinate { qubit: 9 }));
    }

    #[test]
    fn test_spatial_cmp_breaks_ties_on_y() {
        let a = Coord::new(2.0, 4.0);
        let b = Coord::new(2.0, 0.0);
        let c = Coord::new(1.0, 9.0);
        assert_eq!(a.spatial_cmp(&b), Ordering::Greater);
        assert_eq!(c.spatial_cmp(&b), Ordering::Less);
        assert_eq!(a.spatial_cmp(&a), Ordering::Equal);
    }

    #[test]
    fn test_coord_serializes_as_pair() {
        let json = serde_json::to_string(&Coord::new(3.0, 0.5)).unwrap();
        assert_eq!(json, "[3.0,0.5]");
        let back: Coord = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(back, Coord::new(1.0, 2.0));
    }
}
