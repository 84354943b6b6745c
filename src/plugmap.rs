//! Plug-map holes and the guide field selection
//!
//! A [PlugMap] is the `PLUGMAPOBJ` table of a plPlugMapP file with its
//! `HOLETYPE` and `OBJTYPE` enumerations. [select_field_records] partitions the
//! holes of a plug map for one guide field, [FieldSelection::apply_permutation]
//! assigns the guide fibers and [FieldSelection::into_records] concatenates the
//! retained holes in plPlugMapM order.

use std::ops::RangeInclusive;

use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    field::{self, Field, Pointing},
    lookup::Lookup,
    yanny::{EnumDef, ParFile, Row, StructDef, Table, Value},
    N_GUIDES,
};

pub const PLUGMAPOBJ: &str = "PLUGMAPOBJ";
pub const HOLETYPE: &str = "HOLETYPE";
pub const OBJTYPE: &str = "OBJTYPE";

#[derive(Debug, thiserror::Error)]
pub enum PlugMapError {
    #[error("no PLUGMAPOBJ table")]
    MissingTable,
    #[error("PLUGMAPOBJ has no {0:?} member")]
    MissingMember(&'static str),
    #[error("no typedef enum {0}")]
    MissingEnum(&'static str),
    #[error("PLUGMAPOBJ row #{row}: {member} value {value:?} is not declared in {enumeration}")]
    UnknownEnumValue {
        row: usize,
        member: &'static str,
        value: String,
        enumeration: &'static str,
    },
    #[error("PLUGMAPOBJ row #{row}: fiberId {value:?} is not an integer")]
    FiberId { row: usize, value: String },
    #[error("found {found} guides with fiberId in {range:?}, expected {expected}")]
    FieldRange {
        expected: usize,
        found: usize,
        range: RangeInclusive<i64>,
    },
    #[error("guide slot {slot} does not match the lookup table: {detail}")]
    PermutationMismatch { slot: usize, detail: &'static str },
}
type Result<T> = std::result::Result<T, PlugMapError>;

/// Kind of a plate hole
#[derive(EnumIter, EnumString, Display, Clone, Copy, PartialEq, Eq, Debug)]
pub enum HoleKind {
    #[strum(serialize = "LIGHT_TRAP")]
    LightTrap,
    #[strum(serialize = "GUIDE")]
    Guide,
    #[strum(serialize = "ALIGNMENT")]
    Alignment,
    #[strum(serialize = "OTHER")]
    Other,
}
impl HoleKind {
    /// The kind of a `holeType` value, any other plate object is [HoleKind::Other]
    pub fn from_hole_type(hole_type: &str) -> Self {
        hole_type.parse().unwrap_or(HoleKind::Other)
    }
}

/// A `PLUGMAPOBJ` row
#[derive(Debug, Clone, PartialEq)]
pub struct Hole {
    pub kind: HoleKind,
    pub hole_type: String,
    pub obj_type: String,
    pub fiber_id: i64,
    row: Row,
}
impl Hole {
    pub fn row(&self) -> &Row {
        &self.row
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    hole_type: usize,
    obj_type: usize,
    fiber_id: usize,
}

/// The holes of a plPlugMapP file
#[derive(Debug, Clone)]
pub struct PlugMap {
    def: StructDef,
    columns: Columns,
    enums: Vec<EnumDef>,
    pub holes: Vec<Hole>,
}
impl PlugMap {
    /// Extracts the `PLUGMAPOBJ` holes of a yanny file
    ///
    /// Every `holeType` and `objType` must be declared in the file
    /// `HOLETYPE` and `OBJTYPE` enumerations
    pub fn from_par(par: &ParFile) -> Result<Self> {
        let table = par.table(PLUGMAPOBJ).ok_or(PlugMapError::MissingTable)?;
        let position = |name: &'static str| {
            table
                .def
                .position(name)
                .ok_or(PlugMapError::MissingMember(name))
        };
        let columns = Columns {
            hole_type: position("holeType")?,
            obj_type: position("objType")?,
            fiber_id: position("fiberId")?,
        };
        let enums = [HOLETYPE, OBJTYPE]
            .into_iter()
            .map(|name| {
                par.enumeration(name)
                    .cloned()
                    .ok_or(PlugMapError::MissingEnum(name))
            })
            .collect::<Result<Vec<_>>>()?;
        let enum_value = |row: usize,
                          values: &Row,
                          column: usize,
                          member: &'static str,
                          enumeration: &'static str| {
            let value = values.0[column].as_scalar().unwrap_or_default();
            let def = enums.iter().find(|e| e.name == enumeration);
            match def {
                Some(def) if def.contains(value) => Ok(value.to_string()),
                _ => Err(PlugMapError::UnknownEnumValue {
                    row,
                    member,
                    value: value.to_string(),
                    enumeration,
                }),
            }
        };
        let holes = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let hole_type = enum_value(i + 1, row, columns.hole_type, "holeType", HOLETYPE)?;
                let obj_type = enum_value(i + 1, row, columns.obj_type, "objType", OBJTYPE)?;
                let fiber_value = row.0[columns.fiber_id].as_scalar().unwrap_or_default();
                let fiber_id = fiber_value
                    .parse::<i64>()
                    .map_err(|_| PlugMapError::FiberId {
                        row: i + 1,
                        value: fiber_value.to_string(),
                    })?;
                Ok(Hole {
                    kind: HoleKind::from_hole_type(&hole_type),
                    hole_type,
                    obj_type,
                    fiber_id,
                    row: row.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            def: table.def.clone(),
            columns,
            enums,
            holes,
        })
    }
    /// The `HOLETYPE` and `OBJTYPE` declarations
    pub fn enums(&self) -> &[EnumDef] {
        &self.enums
    }
    /// Builds a `PLUGMAPOBJ` table from `holes` with the schema of this plug map
    ///
    /// The `fiberId` member of each row is set to the hole fiber id
    pub fn to_table(&self, holes: &[Hole]) -> Table {
        let rows = holes
            .iter()
            .map(|hole| {
                let mut row = hole.row.clone();
                row.0[self.columns.fiber_id] = Value::Scalar(hole.fiber_id.to_string());
                row
            })
            .collect();
        Table {
            def: self.def.clone(),
            rows,
        }
    }
}

/// The holes retained for a guide field
#[derive(Debug, Clone)]
pub struct FieldSelection {
    pub range: RangeInclusive<i64>,
    pub light_traps: Vec<Hole>,
    pub alignments: Vec<Hole>,
    pub guides: Vec<Hole>,
}

/// Partitions `holes` into light traps, alignment holes and guides of a field
///
/// Light traps are kept whatever the field, alignment holes and guides only
/// if their fiber id belongs to the field range.
/// There must be exactly [N_GUIDES] guides in the field.
pub fn select_field_records(
    holes: impl IntoIterator<Item = Hole>,
    pointing: Pointing,
    field: Field,
) -> Result<FieldSelection> {
    let range = field::fiber_range(pointing, field);
    let mut selection = FieldSelection {
        range: range.clone(),
        light_traps: vec![],
        alignments: vec![],
        guides: vec![],
    };
    for hole in holes {
        match hole.kind {
            HoleKind::LightTrap => selection.light_traps.push(hole),
            HoleKind::Alignment if range.contains(&hole.fiber_id) => {
                selection.alignments.push(hole)
            }
            HoleKind::Guide if range.contains(&hole.fiber_id) => selection.guides.push(hole),
            _ => (),
        }
    }
    if selection.guides.len() != N_GUIDES {
        return Err(PlugMapError::FieldRange {
            expected: N_GUIDES,
            found: selection.guides.len(),
            range,
        });
    }
    Ok(selection)
}

impl FieldSelection {
    /// Reorders the guides and sets their fiber ids according to the lookup table
    ///
    /// The guide at position `hole` in the plPlugMapP field order goes to
    /// position `i` with fiber id `fiber`, `(fiber, hole)` being the `i`th pair
    /// of the lookup table.
    /// The guide fiber ids must cover the field range once each.
    pub fn apply_permutation(self, lookup: &Lookup) -> Result<Self> {
        let start = *self.range.start();
        let mut seen = [false; N_GUIDES];
        for guide in &self.guides {
            let slot = usize::try_from(guide.fiber_id - start)
                .ok()
                .filter(|&s| s < N_GUIDES)
                .ok_or(PlugMapError::PermutationMismatch {
                    slot: 0,
                    detail: "guide fiber id outside of the field range",
                })?;
            if std::mem::replace(&mut seen[slot], true) {
                return Err(PlugMapError::PermutationMismatch {
                    slot: slot + 1,
                    detail: "several guides share the fiber id",
                });
            }
        }
        let mut slots: Vec<Option<Hole>> = self.guides.into_iter().map(Some).collect();
        let guides = lookup
            .pairs()
            .iter()
            .map(|&(fiber, hole)| {
                let mut guide = slots
                    .get_mut(hole - 1)
                    .and_then(Option::take)
                    .ok_or(PlugMapError::PermutationMismatch {
                        slot: hole,
                        detail: "no guide left for the slot",
                    })?;
                guide.fiber_id = fiber as i64;
                Ok(guide)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { guides, ..self })
    }
    /// Concatenates light traps, alignment holes and guides
    pub fn into_records(self) -> Vec<Hole> {
        build_output_records(self.light_traps, self.alignments, self.guides)
    }
}

/// Light traps first, then alignment holes, then guides
pub fn build_output_records(
    light_traps: Vec<Hole>,
    alignments: Vec<Hole>,
    guides: Vec<Hole>,
) -> Vec<Hole> {
    let mut records = Vec::with_capacity(light_traps.len() + alignments.len() + guides.len());
    records.extend(light_traps);
    records.extend(alignments);
    records.extend(guides);
    records
}
