//! Successor set inference.
//!
//! For every source line of every analyzed function this module computes
//! the set of lines to which control could plausibly flow next (`S`), a
//! looser quasi-acceptable envelope (`Sq`, e.g. "exit from an if back to
//! its condition"), and a line-group tag (`G`) used to grade how badly a
//! violating transition deviates.
//!
//! The inference is syntactic: it walks the tree-sitter AST of each
//! function and approximates control flow at the granularity at which
//! compilers emit line-number records. It does not evaluate expressions,
//! resolve call targets, or model inlining.
//!
//! # Architecture
//! - `pos`: `Pos`, `PosSet`, group-tag helpers
//! - `positions`: node offset → line mapping, line footprints
//! - `cursor`: frontier primitives
//! - `walker`: one recipe per statement kind

mod cursor;
mod pos;
mod positions;
mod walker;

pub use pos::{group_fn_id, group_number, same_function, FuncSpan, Pos, PosSet, GROUP_MASK};

use crate::exe::Function;
use rustc_hash::FxHashMap;
use std::fs;
use tracing::{debug, warn};
use tree_sitter::{Node, Parser};
use walker::FileWalker;

/// Whether a path from a line table names a real, analyzable Go source
/// file. Synthesized names like `<autogenerated>` are rejected.
pub fn accepted_file(path: &str) -> bool {
    !path.is_empty() && !path.contains('<') && path.ends_with(".go")
}

/// Membership test with the `Any` rule: an `Any` set contains every
/// position.
pub fn pos_set_contains(set: &PosSet, pos: &Pos) -> bool {
    set.contains(pos)
}

/// The successor tables for one analyzed program.
///
/// `S[p]` is the set of acceptable successors of line `p`, `Sq[p]` the set
/// of quasi-acceptable ones, and `G[p]` the line-group tag of `p`: the most
/// significant 32 bits identify the enclosing top-level function, the least
/// significant 32 bits a visually contiguous group of lines within it.
pub struct Successors {
    pub s: FxHashMap<Pos, PosSet>,
    pub sq: FxHashMap<Pos, PosSet>,
    pub groups: FxHashMap<Pos, u64>,
    parser: Parser,
    pub(crate) cur: Vec<Pos>,
    pub(crate) cur_fn_end: Pos,
    pub(crate) cur_group: u64,
}

impl Successors {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .expect("Go grammar incompatible with linked tree-sitter");
        Self {
            s: FxHashMap::default(),
            sq: FxHashMap::default(),
            groups: FxHashMap::default(),
            parser,
            cur: Vec::new(),
            cur_fn_end: Pos::default(),
            cur_group: 0,
        }
    }

    /// Analyze one source file, populating the tables for every function
    /// declaration in it that matches an entry of `funcs` (by symbol-name
    /// suffix) and has a body. Files that fail the acceptance rule or do
    /// not parse are skipped; the tables stay valid and partial.
    pub fn analyze_file(&mut self, path: &str, funcs: &mut [Function]) {
        if !accepted_file(path) {
            return;
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("{}: {}", path, err);
                return;
            }
        };
        self.analyze_source(path, &content, funcs);
    }

    /// Same as [`analyze_file`](Self::analyze_file) for source already in
    /// memory.
    pub fn analyze_source(&mut self, path: &str, content: &str, funcs: &mut [Function]) {
        let tree = match self.parser.parse(content, None) {
            Some(tree) => tree,
            None => {
                warn!("{}: parse failed", path);
                return;
            }
        };
        let root = tree.root_node();
        if root.has_error() {
            warn!("{}: syntax errors, skipping", path);
            return;
        }

        let src = content.as_bytes();
        let package = package_name(root, src);

        let mut walker = FileWalker::new(self, path, content);
        let mut cursor = root.walk();
        for decl in root.named_children(&mut cursor) {
            if decl.kind() != "function_declaration" && decl.kind() != "method_declaration" {
                continue;
            }
            let name = match symbol_name(&package, decl, src) {
                Some(name) => name,
                None => continue,
            };
            let body = decl.child_by_field_name("body");

            let span = FuncSpan {
                start: walker.to_pos(decl.start_byte()),
                end: walker.to_pos(decl.end_byte()),
            };

            let mut found = false;
            for func in funcs.iter_mut() {
                if func.name.ends_with(&name) {
                    if body.is_some() {
                        func.decl = Some(span.clone());
                    }
                    found = true;
                    break;
                }
            }
            let Some(body) = body else { continue };
            if !found {
                continue;
            }
            debug!("inferring successors for {}", name);

            walker.succ.cur = vec![span.start.clone()];
            walker.succ.cur_fn_end = span.end;
            walker.succ.set_group(std::slice::from_ref(&span.start));
            walker.walk_block(body);
            // All final frontier lines can flow to function exit.
            walker.succ.cont(false, vec![Pos::function_exit()]);
            walker.succ.cur_group = ((walker.succ.cur_group >> 32) + 1) << 32;
        }
    }
}

impl Default for Successors {
    fn default() -> Self {
        Self::new()
    }
}

fn package_name(root: Node, src: &[u8]) -> String {
    let mut cursor = root.walk();
    let result = root
        .named_children(&mut cursor)
        .find(|n| n.kind() == "package_clause")
        .and_then(|clause| {
            let mut inner = clause.walk();
            let result = clause
                .named_children(&mut inner)
                .find(|n| n.kind() == "package_identifier")
                .and_then(|n| n.utf8_text(src).ok())
                .map(str::to_string);
            result
        })
        .unwrap_or_default();
    result
}

/// The linker-style name of a declaration: `pkg.Func` for plain functions,
/// `pkg.(Recv).Method` for methods, matching Go symbol names by suffix.
fn symbol_name(package: &str, decl: Node, src: &[u8]) -> Option<String> {
    let fn_name = decl
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(src).ok())?;
    let mut name = package.to_string();
    if decl.kind() == "method_declaration" {
        let recv_type = decl
            .child_by_field_name("receiver")
            .and_then(|params| {
                let mut cursor = params.walk();
                let result = params
                    .named_children(&mut cursor)
                    .find(|n| n.kind() == "parameter_declaration")
                    .and_then(|p| p.child_by_field_name("type"))
                    .and_then(|t| t.utf8_text(src).ok())
                    .map(str::to_string);
                result
            })
            .unwrap_or_default();
        name.push_str(&format!(".({})", recv_type));
    }
    name.push('.');
    name.push_str(fn_name);
    Some(name)
}
