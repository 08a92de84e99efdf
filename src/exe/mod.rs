//! Executable reading.
//!
//! Opens an ELF, Mach-O or PE binary, captures the text section, and
//! collects the functions matching a pattern together with their decoded
//! instructions and DWARF line attributions.
//!
//! # Architecture
//! - `dwarf`: compile-unit iteration, subprogram discovery, line tables
//! - `disasm`: x86-64 decoding and branch classification

mod disasm;
mod dwarf;

pub use disasm::AsmInstruction;

use crate::error::{Result, StepcheckError};
use crate::successors::FuncSpan;
use object::{Object, ObjectSection};
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A function from the executable's debug information. `decl` is filled in
/// by the successor engine when it finds the matching source declaration.
#[derive(Debug, Default)]
pub struct Function {
    pub name: String,
    pub start: u64,
    pub end: u64,
    pub text: Vec<AsmInstruction>,
    pub decl: Option<FuncSpan>,
}

impl Function {
    /// A bare function record, as used before source analysis attaches a
    /// declaration.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Index of the instruction starting exactly at `pc`, if any.
    pub fn instruction_index_at(&self, pc: u64) -> Option<usize> {
        self.text.binary_search_by_key(&pc, |inst| inst.pc).ok()
    }
}

/// An opened executable: raw container bytes plus the text section.
pub struct Executable {
    path: std::path::PathBuf,
    data: Vec<u8>,
    pub text_start: u64,
    pub text: Vec<u8>,
}

impl Executable {
    /// Read and validate an executable. Only x86-64 containers with a text
    /// section and DWARF debug information are usable.
    pub fn open(path: &Path) -> Result<Executable> {
        let data = fs::read(path)?;
        let obj = object::File::parse(&*data).map_err(|err| {
            StepcheckError::unrecognized_container(path, err.to_string())
        })?;

        if obj.architecture() != object::Architecture::X86_64 {
            return Err(StepcheckError::UnsupportedArchitecture {
                arch: format!("{:?}", obj.architecture()),
            });
        }

        // object maps ".text" onto "__text" for Mach-O, same for the DWARF
        // section names below.
        let text_section = obj
            .section_by_name(".text")
            .ok_or_else(|| StepcheckError::MissingTextSection { path: path.into() })?;
        if obj.section_by_name(".debug_info").is_none() {
            return Err(StepcheckError::MissingDebugInfo { path: path.into() });
        }

        let text_start = text_section.address();
        let text = text_section
            .data()
            .map_err(|err| StepcheckError::unrecognized_container(path, err.to_string()))?
            .to_vec();

        Ok(Executable {
            path: path.into(),
            data,
            text_start,
            text,
        })
    }

    /// Every function whose DWARF name matches `pattern`, disassembled and
    /// line-attributed. Go initializer symbols are excluded.
    pub fn functions_matching(&self, pattern: &Regex) -> Result<Vec<Function>> {
        let obj = object::File::parse(&*self.data).map_err(|err| {
            StepcheckError::unrecognized_container(&self.path, err.to_string())
        })?;

        let mut functions = Vec::new();
        for unit in dwarf::matching_subprograms(&obj, pattern)? {
            for sub in unit.subprograms {
                debug!(
                    "disassembling {} [{:#x}, {:#x})",
                    sub.name, sub.low_pc, sub.high_pc
                );
                let text = disasm::disassemble(
                    &self.text,
                    self.text_start,
                    sub.low_pc,
                    sub.high_pc,
                    &unit.line_table,
                );
                functions.push(Function {
                    name: sub.name,
                    start: sub.low_pc,
                    end: sub.high_pc,
                    text,
                    decl: None,
                });
            }
        }
        Ok(functions)
    }
}

/// The sorted, deduplicated source files referenced by the collected
/// instructions.
pub fn all_files(functions: &[Function]) -> Vec<String> {
    let mut files: Vec<String> = functions
        .iter()
        .flat_map(|f| f.text.iter())
        .map(|inst| inst.pos.file.clone())
        .filter(|file| !file.is_empty())
        .collect();
    files.sort();
    files.dedup();
    files
}
