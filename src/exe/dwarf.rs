//! DWARF reading: subprogram discovery and line tables.

use crate::error::Result;
use crate::successors::Pos;
use gimli::{AttributeValue, EndianSlice, RunTimeEndian};
use object::{Object, ObjectSection};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;

type Reader<'a> = EndianSlice<'a, RunTimeEndian>;

/// One row of a compile unit's line program, plus end-of-sequence markers.
struct LineRow {
    address: u64,
    pos: Pos,
    end_sequence: bool,
}

/// A compile unit's line program flattened into an address-sorted table.
pub(crate) struct LineTable {
    rows: Vec<LineRow>,
}

impl LineTable {
    /// The source position attributed to the instruction at `pc`: the row
    /// with the greatest address not above `pc`. Past an end-of-sequence
    /// marker, or before the first row, there is no attribution.
    pub(crate) fn pos_for_pc(&self, pc: u64) -> Pos {
        let idx = self.rows.partition_point(|row| row.address <= pc);
        if idx == 0 {
            return Pos::default();
        }
        let row = &self.rows[idx - 1];
        if row.end_sequence {
            Pos::default()
        } else {
            row.pos.clone()
        }
    }
}

pub(crate) struct Subprogram {
    pub(crate) name: String,
    pub(crate) low_pc: u64,
    pub(crate) high_pc: u64,
}

/// A compile unit's matching subprograms together with its line table.
pub(crate) struct UnitFunctions {
    pub(crate) line_table: LineTable,
    pub(crate) subprograms: Vec<Subprogram>,
}

/// Walk every compile unit, collecting `DW_TAG_subprogram` entries whose
/// name matches `pattern`. Go initializer symbols (`.init` suffix,
/// `.init.` infix) are skipped, as are entries without a PC range.
pub(crate) fn matching_subprograms(
    obj: &object::File,
    pattern: &Regex,
) -> Result<Vec<UnitFunctions>> {
    let endian = if obj.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };
    let load_section = |id: gimli::SectionId| -> std::result::Result<Cow<[u8]>, gimli::Error> {
        match obj.section_by_name(id.name()) {
            Some(section) => Ok(section
                .uncompressed_data()
                .unwrap_or(Cow::Borrowed(&[][..]))),
            None => Ok(Cow::Borrowed(&[][..])),
        }
    };
    let sections = gimli::DwarfSections::load(load_section)?;
    let dwarf = sections.borrow(|section| EndianSlice::new(section, endian));

    let mut out = Vec::new();
    let mut units = dwarf.units();
    while let Some(header) = units.next()? {
        let unit = dwarf.unit(header)?;
        let mut subprograms = Vec::new();

        let mut entries = unit.entries();
        while let Some((_, entry)) = entries.next_dfs()? {
            if entry.tag() != gimli::DW_TAG_subprogram {
                continue;
            }
            let Some(name) = attr_string(&dwarf, &unit, entry.attr_value(gimli::DW_AT_name)?)
            else {
                continue;
            };
            if !pattern.is_match(&name) {
                continue;
            }
            if name.ends_with(".init") || name.contains(".init.") {
                continue;
            }
            let Some(AttributeValue::Addr(low_pc)) = entry.attr_value(gimli::DW_AT_low_pc)?
            else {
                debug!("{}: no low pc, skipping", name);
                continue;
            };
            let high_pc = match entry.attr_value(gimli::DW_AT_high_pc)? {
                Some(AttributeValue::Addr(addr)) => addr,
                Some(other) => match other.udata_value() {
                    Some(size) => low_pc + size,
                    None => continue,
                },
                None => continue,
            };
            subprograms.push(Subprogram {
                name,
                low_pc,
                high_pc,
            });
        }

        if subprograms.is_empty() {
            continue;
        }
        let line_table = read_line_table(&dwarf, &unit)?;
        out.push(UnitFunctions {
            line_table,
            subprograms,
        });
    }
    Ok(out)
}

fn read_line_table(
    dwarf: &gimli::Dwarf<Reader>,
    unit: &gimli::Unit<Reader>,
) -> Result<LineTable> {
    let mut rows = Vec::new();
    let Some(program) = unit.line_program.clone() else {
        return Ok(LineTable { rows });
    };

    let comp_dir = unit
        .comp_dir
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut file_cache: FxHashMap<u64, String> = FxHashMap::default();

    let mut sm = program.rows();
    while let Some((header, row)) = sm.next_row()? {
        if row.end_sequence() {
            rows.push(LineRow {
                address: row.address(),
                pos: Pos::default(),
                end_sequence: true,
            });
            continue;
        }
        let file = match row.file(header) {
            Some(entry) => file_cache
                .entry(row.file_index())
                .or_insert_with(|| render_file(dwarf, unit, header, entry, &comp_dir))
                .clone(),
            None => String::new(),
        };
        let line = row.line().map(|l| l.get() as i64).unwrap_or(0);
        rows.push(LineRow {
            address: row.address(),
            pos: Pos::new(file, line),
            end_sequence: false,
        });
    }

    // Sequences are emitted in arbitrary order; the lookup wants one
    // address-sorted table.
    rows.sort_by_key(|row| row.address);
    Ok(LineTable { rows })
}

/// Resolve a line-program file entry to a path: directory joined with the
/// file name, under the unit's compilation directory when relative.
fn render_file(
    dwarf: &gimli::Dwarf<Reader>,
    unit: &gimli::Unit<Reader>,
    header: &gimli::LineProgramHeader<Reader>,
    entry: &gimli::FileEntry<Reader>,
    comp_dir: &str,
) -> String {
    let mut path = PathBuf::new();
    if !comp_dir.is_empty() {
        path.push(comp_dir);
    }
    if let Some(dir) = entry.directory(header) {
        if let Ok(dir) = dwarf.attr_string(unit, dir) {
            let dir = dir.to_string_lossy();
            if Path::new(dir.as_ref()).is_absolute() {
                path = PathBuf::from(dir.as_ref());
            } else {
                path.push(dir.as_ref());
            }
        }
    }
    if let Ok(name) = dwarf.attr_string(unit, entry.path_name()) {
        let name = name.to_string_lossy();
        if Path::new(name.as_ref()).is_absolute() {
            path = PathBuf::from(name.as_ref());
        } else {
            path.push(name.as_ref());
        }
    }
    path.to_string_lossy().into_owned()
}

fn attr_string(
    dwarf: &gimli::Dwarf<Reader>,
    unit: &gimli::Unit<Reader>,
    value: Option<AttributeValue<Reader>>,
) -> Option<String> {
    let value = value?;
    dwarf
        .attr_string(unit, value)
        .ok()
        .map(|s| s.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: Vec<(u64, i64, bool)>) -> LineTable {
        LineTable {
            rows: rows
                .into_iter()
                .map(|(address, line, end_sequence)| LineRow {
                    address,
                    pos: if end_sequence {
                        Pos::default()
                    } else {
                        Pos::new("main.go", line)
                    },
                    end_sequence,
                })
                .collect(),
        }
    }

    #[test]
    fn pos_for_pc_picks_greatest_row_at_or_below() {
        let t = table(vec![(0x100, 5, false), (0x108, 6, false), (0x110, 0, true)]);
        assert_eq!(t.pos_for_pc(0x100), Pos::new("main.go", 5));
        assert_eq!(t.pos_for_pc(0x107), Pos::new("main.go", 5));
        assert_eq!(t.pos_for_pc(0x108), Pos::new("main.go", 6));
        assert_eq!(t.pos_for_pc(0x10f), Pos::new("main.go", 6));
    }

    #[test]
    fn pos_for_pc_has_no_attribution_outside_sequences() {
        let t = table(vec![(0x100, 5, false), (0x110, 0, true)]);
        assert_eq!(t.pos_for_pc(0xff), Pos::default());
        assert_eq!(t.pos_for_pc(0x110), Pos::default());
        assert_eq!(t.pos_for_pc(0x200), Pos::default());
    }
}
