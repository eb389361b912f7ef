//! Placement records: the canonical exchange format with persistence and scoring.
//!
//! A record is keyed by `"{N}_{index}"` and carries `x`, `y`, `deg`. Numeric
//! fields are written with a single leading `s` marker that readers strip
//! before parsing. The marker has no meaning of its own; it is kept so that
//! files round-trip byte-for-byte with the external tooling.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::configuration::{ConfigError, Configuration};
use crate::piece::Placement;
use crate::shape::BaseShape;

/// Leading marker on numeric fields.
pub const MARKER: char = 's';

/// Malformed or inconsistent records.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    BadId { raw: String },
    BadNumber { raw: String },
    WrongGroup { expected: usize, found: usize },
    MissingIndex { group: usize, index: usize },
    DuplicateIndex { group: usize, index: usize },
    IndexOutOfRange { group: usize, index: usize },
    Config(ConfigError),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::BadId { raw } => write!(f, "bad record id {raw:?} (want N_index)"),
            RecordError::BadNumber { raw } => write!(f, "bad numeric field {raw:?}"),
            RecordError::WrongGroup { expected, found } => {
                write!(f, "record for group {found} in group {expected}")
            }
            RecordError::MissingIndex { group, index } => {
                write!(f, "group {group} is missing piece {index}")
            }
            RecordError::DuplicateIndex { group, index } => {
                write!(f, "group {group} has piece {index} twice")
            }
            RecordError::IndexOutOfRange { group, index } => {
                write!(f, "piece index {index} out of range for group {group}")
            }
            RecordError::Config(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for RecordError {
    fn from(e: ConfigError) -> Self {
        RecordError::Config(e)
    }
}

/// Marker-prefixed float. Reads accept the value with or without the marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkedValue(pub f64);

impl fmt::Display for MarkedValue {
    // `{}` on f64 is the shortest text that parses back to the same bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MARKER}{}", self.0)
    }
}

impl FromStr for MarkedValue {
    type Err = RecordError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix(MARKER).unwrap_or(trimmed);
        digits
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(MarkedValue)
            .ok_or_else(|| RecordError::BadNumber {
                raw: raw.to_string(),
            })
    }
}

impl Serialize for MarkedValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MarkedValue {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Composite key `(group size, piece index)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId {
    pub group: usize,
    pub index: usize,
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}_{}", self.group, self.index)
    }
}

impl FromStr for PieceId {
    type Err = RecordError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let bad = || RecordError::BadId {
            raw: raw.to_string(),
        };
        let (g, i) = raw.trim().split_once('_').ok_or_else(bad)?;
        Ok(PieceId {
            group: g.parse().map_err(|_| bad())?,
            index: i.parse().map_err(|_| bad())?,
        })
    }
}

impl Serialize for PieceId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PieceId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One row of the store: `id,x,y,deg`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub id: PieceId,
    pub x: MarkedValue,
    pub y: MarkedValue,
    pub deg: MarkedValue,
}

impl PlacementRecord {
    pub fn new(id: PieceId, placement: Placement) -> Self {
        Self {
            id,
            x: MarkedValue(placement.x),
            y: MarkedValue(placement.y),
            deg: MarkedValue(placement.deg),
        }
    }

    #[inline]
    pub fn placement(&self) -> Placement {
        Placement::new(self.x.0, self.y.0, self.deg.0)
    }
}

/// One record per piece, in index order. Pure projection.
pub fn encode(config: &Configuration) -> Vec<PlacementRecord> {
    let group = config.len();
    config
        .pieces()
        .iter()
        .enumerate()
        .map(|(index, piece)| PlacementRecord::new(PieceId { group, index }, piece.placement()))
        .collect()
}

/// Rebuild the configuration of `group` from its records (any order).
///
/// Requires exactly one record per index `0..group`, all tagged with `group`.
pub fn decode(
    shape: Arc<BaseShape>,
    group: usize,
    records: &[PlacementRecord],
) -> Result<Configuration, RecordError> {
    if group == 0 {
        return Err(ConfigError::Empty.into());
    }
    if let Some(r) = records.iter().find(|r| r.id.group != group) {
        return Err(RecordError::WrongGroup {
            expected: group,
            found: r.id.group,
        });
    }
    // `group` comes from untrusted ids; size nothing by it until the records cover it.
    if records.len() < group {
        let present: BTreeSet<usize> = records.iter().map(|r| r.id.index).collect();
        let index = (0..=records.len())
            .find(|i| !present.contains(i))
            .unwrap_or(records.len());
        return Err(RecordError::MissingIndex { group, index });
    }
    let mut slots: Vec<Option<Placement>> = vec![None; group];
    for r in records {
        let slot = slots
            .get_mut(r.id.index)
            .ok_or(RecordError::IndexOutOfRange {
                group,
                index: r.id.index,
            })?;
        if slot.is_some() {
            return Err(RecordError::DuplicateIndex {
                group,
                index: r.id.index,
            });
        }
        *slot = Some(r.placement());
    }
    let placements = slots
        .into_iter()
        .enumerate()
        .map(|(index, p)| p.ok_or(RecordError::MissingIndex { group, index }))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Configuration::with_group_size(shape, group, &placements)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Arc<BaseShape> {
        Arc::new(BaseShape::tree())
    }

    #[test]
    fn marked_value_reads_with_or_without_marker() {
        assert_eq!("s1.25".parse::<MarkedValue>().unwrap(), MarkedValue(1.25));
        assert_eq!("-0.5".parse::<MarkedValue>().unwrap(), MarkedValue(-0.5));
        assert_eq!("s-3e-2".parse::<MarkedValue>().unwrap(), MarkedValue(-0.03));
        assert!("ss1.0".parse::<MarkedValue>().is_err());
        assert!("s".parse::<MarkedValue>().is_err());
        assert!("sNaN".parse::<MarkedValue>().is_err());
        assert!(matches!(
            "x1".parse::<MarkedValue>(),
            Err(RecordError::BadNumber { .. })
        ));
    }

    #[test]
    fn marked_value_writes_marker_and_exact_digits() {
        assert_eq!(MarkedValue(0.1).to_string(), "s0.1");
        assert_eq!(MarkedValue(-2.0).to_string(), "s-2");
        let v = 0.1 + 0.2;
        let back: MarkedValue = MarkedValue(v).to_string().parse().unwrap();
        assert_eq!(back.0.to_bits(), v.to_bits());
    }

    #[test]
    fn piece_id_parse_and_pad() {
        let id: PieceId = "007_3".parse().unwrap();
        assert_eq!(id, PieceId { group: 7, index: 3 });
        assert_eq!(id.to_string(), "007_3");
        assert_eq!("150_12".parse::<PieceId>().unwrap().group, 150);
        assert!("7-3".parse::<PieceId>().is_err());
        assert!("a_1".parse::<PieceId>().is_err());
    }

    #[test]
    fn encode_decode_round_trip() {
        let placements = [
            Placement::new(0.123456789, -4.5, 33.3),
            Placement::new(1e-7, 2.0 / 3.0, 359.999),
            Placement::new(-1.0, 0.1 + 0.2, 0.0),
        ];
        let c = Configuration::from_placements(tree(), &placements).unwrap();
        let records = encode(&c);
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].id, PieceId { group: 3, index: 1 });
        // Every field goes through its text form, as it does in a store.
        let reparsed: Vec<PlacementRecord> = records
            .iter()
            .map(|r| PlacementRecord {
                id: r.id.to_string().parse().unwrap(),
                x: r.x.to_string().parse().unwrap(),
                y: r.y.to_string().parse().unwrap(),
                deg: r.deg.to_string().parse().unwrap(),
            })
            .collect();
        assert!(reparsed.iter().all(|r| r.x.to_string().starts_with(MARKER)));
        let back = decode(tree(), 3, &reparsed).unwrap();
        for (a, b) in back.placements().iter().zip(&placements) {
            assert!((a.x - b.x).abs() < 1e-12);
            assert!((a.y - b.y).abs() < 1e-12);
            assert!((a.deg - b.deg).abs() < 1e-12);
        }
    }

    #[test]
    fn decode_accepts_any_order() {
        let c = Configuration::grid(tree(), 4, 1.5).unwrap();
        let mut records = encode(&c);
        records.reverse();
        let back = decode(tree(), 4, &records).unwrap();
        assert_eq!(back.placements(), c.placements());
    }

    #[test]
    fn decode_rejects_inconsistent_groups() {
        let c = Configuration::grid(tree(), 3, 1.5).unwrap();
        let records = encode(&c);
        assert_eq!(
            decode(tree(), 3, &records[..2]).unwrap_err(),
            RecordError::MissingIndex { group: 3, index: 2 }
        );
        assert!(matches!(
            decode(tree(), 4, &records),
            Err(RecordError::WrongGroup { expected: 4, found: 3 })
        ));
        assert_eq!(
            decode(tree(), 4, &[]).unwrap_err(),
            RecordError::MissingIndex { group: 4, index: 0 }
        );
        let mut stray = records.clone();
        stray[0].id.index = 9;
        assert_eq!(
            decode(tree(), 3, &stray).unwrap_err(),
            RecordError::IndexOutOfRange { group: 3, index: 9 }
        );
        let mut dup = records.clone();
        dup[2] = dup[1];
        assert_eq!(
            decode(tree(), 3, &dup).unwrap_err(),
            RecordError::DuplicateIndex { group: 3, index: 1 }
        );
        assert!(matches!(
            decode(tree(), 0, &[]),
            Err(RecordError::Config(ConfigError::Empty))
        ));
    }

    #[test]
    fn huge_group_is_rejected_without_allocating() {
        let r = PlacementRecord::new(
            PieceId {
                group: usize::MAX / 8,
                index: 0,
            },
            Placement::default(),
        );
        assert_eq!(
            decode(tree(), usize::MAX / 8, &[r]).unwrap_err(),
            RecordError::MissingIndex {
                group: usize::MAX / 8,
                index: 1
            }
        );
    }

    #[test]
    fn serde_uses_string_fields() {
        let r = PlacementRecord::new(PieceId { group: 2, index: 0 }, Placement::new(1.5, -0.25, 90.0));
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"id":"002_0","x":"s1.5","y":"s-0.25","deg":"s90"}"#);
        let back: PlacementRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
