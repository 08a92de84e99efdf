//! Per-statement successor inference.
//!
//! One dispatch arm per tree-sitter-go statement kind. Each arm records the
//! lines the statement occupies, wires them into the successor tables, and
//! leaves the frontier at the positions from which control continues.
//!
//! Control-flow constructs follow the shape of the line records compilers
//! actually emit rather than precise semantics: a loop condition is
//! re-enterable from the bottom of the body, an `if` exit may fall back to
//! its condition (quasi-acceptable), switch clauses may be tested in any
//! order, and a labelled jump accepts any successor.

use super::pos::Pos;
use super::positions::LineIndex;
use super::Successors;
use tracing::debug;
use tree_sitter::Node;

/// Walks one parsed source file, borrowing the shared tables.
pub(crate) struct FileWalker<'a> {
    pub(crate) succ: &'a mut Successors,
    pub(crate) file: String,
    pub(crate) lines: LineIndex,
}

/// Named children that are statements: comments are tree-sitter extras and
/// can appear anywhere in a statement list.
fn statement_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

/// First anonymous child with the given token kind.
fn token_child<'t>(node: Node<'t>, token: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).find(|c| c.kind() == token);
    result
}

impl<'a> FileWalker<'a> {
    pub(crate) fn new(succ: &'a mut Successors, file: &str, src: &str) -> Self {
        Self {
            succ,
            file: file.to_string(),
            lines: LineIndex::new(src),
        }
    }

    /// A `{ … }` body. The brace lines are predecessors and successors of
    /// the interior, so a compiler may attribute a block's final record to
    /// the closing brace. The interior is its own line group.
    pub(crate) fn walk_body<'t>(
        &mut self,
        lbrace: Pos,
        rbrace: Pos,
        stmts: impl IntoIterator<Item = Node<'t>>,
    ) {
        self.succ.bump_group();
        self.succ.also_cont(true, vec![lbrace]);

        for stmt in stmts {
            self.walk_stmt(stmt);
        }

        self.succ.also_cont(true, vec![rbrace]);
        self.succ.bump_group();
    }

    /// A block node's braces plus its statement list.
    pub(crate) fn walk_block(&mut self, block: Node) {
        let lbrace = token_child(block, "{")
            .map(|n| self.to_pos(n.start_byte()))
            .unwrap_or_else(|| self.to_pos(block.start_byte()));
        let rbrace = token_child(block, "}")
            .map(|n| self.to_pos(n.start_byte()))
            .unwrap_or_else(|| self.to_pos(block.end_byte()));
        self.walk_body(lbrace, rbrace, statement_children(block));
    }

    pub(crate) fn walk_stmt(&mut self, stmt: Node) {
        match stmt.kind() {
            "var_declaration" => self.walk_var_decl(stmt),
            // Imports, types and constants produce no code.
            "const_declaration" | "type_declaration" => {}
            // Straight-line transfer; a goroutine body is only analyzed at
            // its own top-level declaration.
            "go_statement" | "send_statement" => {
                let start = self.to_pos(stmt.start_byte());
                let end = self.to_pos(stmt.end_byte());
                self.succ.cont(true, vec![start, end]);
            }
            "defer_statement" => {
                let start = self.to_pos(stmt.start_byte());
                let end = self.to_pos(stmt.end_byte());
                self.succ.cont(true, vec![start, end]);
                // Deferred calls also run at function exit.
                self.succ.also_cont(false, vec![Pos::function_exit()]);
            }
            "empty_statement" => {}
            "expression_statement"
            | "assignment_statement"
            | "short_var_declaration"
            | "inc_statement"
            | "dec_statement" => self.walk_simple(stmt),
            "for_statement" => self.walk_for(stmt),
            "if_statement" => self.walk_if(stmt),
            "labeled_statement" => {
                if let Some(colon) = token_child(stmt, ":") {
                    let colon_pos = self.to_pos(colon.start_byte());
                    self.succ.also_cont(true, vec![colon_pos]);
                }
                let label = stmt.child_by_field_name("label");
                for child in statement_children(stmt) {
                    if Some(child.id()) == label.map(|l| l.id()) {
                        continue;
                    }
                    self.walk_stmt(child);
                }
            }
            "select_statement" => {
                let key = self.to_pos(stmt.start_byte());
                self.walk_switch(stmt, key, None, None, Vec::new());
            }
            "expression_switch_statement" => {
                let key = self.to_pos(stmt.start_byte());
                let init = stmt.child_by_field_name("initializer");
                let tag = stmt.child_by_field_name("value");
                self.walk_switch(stmt, key, init, tag, Vec::new());
            }
            "type_switch_statement" => {
                let key = self.to_pos(stmt.start_byte());
                let init = stmt.child_by_field_name("initializer");
                let assign = self.type_switch_assign_positions(stmt);
                self.walk_switch(stmt, key, init, None, assign);
            }
            "break_statement" | "continue_statement" | "goto_statement"
            | "fallthrough_statement" => {
                let ps = self.all_positions(Some(stmt));
                self.succ.cont(true, ps);
                self.succ.cont_any();
            }
            "return_statement" => self.walk_return(stmt),
            other => {
                let pos = self.to_pos(stmt.start_byte());
                debug!("{}:{}: unknown statement kind {}", pos.file, pos.line, other);
            }
        }
    }

    fn walk_var_decl(&mut self, stmt: Node) {
        for child in statement_children(stmt) {
            match child.kind() {
                "var_spec" => {
                    let ps = self.all_positions(Some(child));
                    self.succ.cont(true, ps);
                }
                "var_spec_list" => {
                    for spec in statement_children(child) {
                        if spec.kind() == "var_spec" {
                            let ps = self.all_positions(Some(spec));
                            self.succ.cont(true, ps);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Expression, assignment, increment/decrement: every line of the
    /// statement is a mutual successor of every other, so the compiler may
    /// emit records at any intermediate offset of a multi-line expression.
    fn walk_simple(&mut self, stmt: Node) {
        let ps = self.all_positions(Some(stmt));
        for pos in &ps {
            self.succ.add_succ(pos, &ps);
        }
        self.succ.cont(true, ps);
    }

    fn walk_return(&mut self, stmt: Node) {
        let mut ps = self.all_positions(Some(stmt));
        ps.push(self.succ.cur_fn_end.clone());
        ps.push(Pos::function_exit());
        let fn_end = self.succ.cur_fn_end.clone();
        self.succ.add_succ(&fn_end, &ps);
        for pos in ps.clone() {
            self.succ.add_succ(&pos, &ps);
        }
        self.succ.cont(true, ps);
    }

    /// `for init; cond; post { body }`, `for cond { body }` and
    /// `for { body }`. The condition re-enters from the bottom of the body,
    /// the post statement is reachable from the bottom, and exiting falls
    /// through past the closing brace.
    fn walk_for(&mut self, stmt: Node) {
        if let Some(range) = token_child(stmt, "range_clause") {
            self.walk_range(stmt, range);
            return;
        }

        let clause = token_child(stmt, "for_clause");
        let (init, cond, post) = match clause {
            Some(clause) => (
                clause.child_by_field_name("initializer"),
                clause.child_by_field_name("condition"),
                clause.child_by_field_name("update"),
            ),
            // `for cond { … }` has the bare condition as the only named
            // child besides the body; `for { … }` has none.
            None => {
                let body = stmt.child_by_field_name("body");
                let cond = statement_children(stmt)
                    .into_iter()
                    .find(|c| Some(c.id()) != body.map(|b| b.id()));
                (None, cond, None)
            }
        };

        self.succ.bump_group();

        let mut cond_ps = self.all_positions(cond);
        cond_ps.push(self.to_pos(stmt.start_byte()));

        let init_ps = self.all_positions(init);
        if !init_ps.is_empty() {
            self.succ.cont(true, init_ps);
        }
        self.succ.cont(true, cond_ps.clone());

        let post_ps = self.all_positions(post);
        self.succ.set_group(&post_ps);

        let body = stmt.child_by_field_name("body");
        let rbrace = body.and_then(|b| token_child(b, "}"));
        if let Some(body) = body {
            self.walk_block(body);
        }

        if !post_ps.is_empty() {
            self.succ.cont(false, post_ps);
        }
        self.succ.also_cont(false, cond_ps);
        if let Some(rbrace) = rbrace {
            let rb = self.to_pos(rbrace.start_byte());
            self.succ.also_cont(false, vec![rb]);
        }
        self.succ.bump_group();
    }

    /// `for k, v := range X { body }`: the ranged expression is the loop
    /// header; the bottom of the body flows back to the `for` keyword.
    fn walk_range(&mut self, stmt: Node, range: Node) {
        self.succ.bump_group();
        let xs = self.all_positions(range.child_by_field_name("right"));
        self.succ.set_group(&xs);
        self.succ.cont(true, xs);
        if let Some(body) = stmt.child_by_field_name("body") {
            self.walk_block(body);
        }
        let for_kw = self.to_pos(stmt.start_byte());
        self.succ.also_cont(false, vec![for_kw]);
    }

    /// An `if`/`else if`/`else` chain. After the chain, the frontier is the
    /// block ends of every branch plus every condition of the chain: code
    /// below the `if` is reachable by falling out of any branch or by
    /// failing the last test. Falling from a branch end back to the branch's
    /// condition is quasi-acceptable.
    fn walk_if(&mut self, stmt: Node) {
        self.succ.bump_group();

        let mut header_positions: Vec<Pos> = Vec::new();
        let mut last_if_cond: Vec<Pos> = Vec::new();
        let mut block_ends: Vec<Pos> = Vec::new();

        let mut link = Some(stmt);
        while let Some(node) = link {
            match node.kind() {
                "if_statement" => {
                    let cond_ps = self.all_positions(node.child_by_field_name("condition"));
                    last_if_cond = cond_ps.clone();
                    header_positions.extend(cond_ps.iter().cloned());

                    let init_ps = self.all_positions(node.child_by_field_name("initializer"));
                    if !init_ps.is_empty() {
                        self.succ.cont(true, init_ps);
                    }
                    self.succ.cont(true, cond_ps);
                    let after_cond = self.succ.save_cursor();

                    if let Some(body) = node.child_by_field_name("consequence") {
                        self.walk_block(body);
                    }
                    block_ends.extend(self.succ.cursor().to_vec());
                    self.succ.quasi_cont(&after_cond);
                    self.succ.set_cursor(after_cond);

                    link = node.child_by_field_name("alternative");
                }
                // Terminal `else { … }`.
                _ => {
                    self.walk_block(node);
                    block_ends.extend(self.succ.cursor().to_vec());
                    self.succ.quasi_cont(&last_if_cond);
                    self.succ.set_cursor(Vec::new());
                    link = None;
                }
            }
        }

        self.succ.extend_cursor(block_ends);
        self.succ.extend_cursor(header_positions);
    }

    /// The span of a type switch's `x := y.(type)` header, from the alias
    /// (or the operand) to the closing parenthesis of the type assertion.
    fn type_switch_assign_positions(&self, stmt: Node) -> Vec<Pos> {
        let start = stmt
            .child_by_field_name("alias")
            .or_else(|| stmt.child_by_field_name("value"));
        let (Some(start), Some(rparen)) = (start, token_child(stmt, ")")) else {
            return Vec::new();
        };
        self.positions_in_range(start.start_byte(), rparen.end_byte())
    }

    /// `switch`, type switch and `select`, unified. Clauses share the
    /// header's group and are mutual successors of each other (they may be
    /// tested in any order); falling from a clause back to the tag is
    /// quasi-acceptable. A clause body is walked with the clause colon
    /// standing in for the opening brace and the switch's closing brace for
    /// the closing one.
    fn walk_switch(
        &mut self,
        stmt: Node,
        key: Pos,
        init: Option<Node>,
        tag: Option<Node>,
        assign_ps: Vec<Pos>,
    ) {
        self.succ.bump_group();

        let init_ps = self.all_positions(init);
        if !init_ps.is_empty() {
            self.succ.cont(true, init_ps);
        }
        let mut tag_ps = self.all_positions(tag);
        tag_ps.push(key);
        self.succ.cont(true, tag_ps.clone());

        let header_group = self.succ.cur_group;
        let cursor_header = self.succ.save_cursor();
        let rbrace_pos = token_child(stmt, "}")
            .map(|n| self.to_pos(n.start_byte()))
            .unwrap_or_else(|| self.to_pos(stmt.end_byte()));

        let mut clause_positions: Vec<Pos> = Vec::new();
        let mut block_ends: Vec<Pos> = Vec::new();

        for clause in statement_children(stmt) {
            let headers: Vec<Node> = match clause.kind() {
                "expression_case" => clause
                    .child_by_field_name("value")
                    .map(statement_children)
                    .unwrap_or_default(),
                "type_case" => {
                    let mut cursor = clause.walk();
                    clause.children_by_field_name("type", &mut cursor).collect()
                }
                "communication_case" => {
                    clause.child_by_field_name("communication").into_iter().collect()
                }
                "default_case" => Vec::new(),
                _ => continue,
            };

            self.succ.set_cursor(Vec::new());
            for header in headers {
                let vp = self.all_positions(Some(header));
                self.succ.set_group(&vp);
                self.succ.extend_cursor(vp);
            }
            let clause_pos = self.to_pos(clause.start_byte());
            self.succ.set_group(std::slice::from_ref(&clause_pos));
            self.succ.extend_cursor(vec![clause_pos]);

            clause_positions.extend(self.succ.cursor().to_vec());

            // The type switch header assignment is re-emitted per clause,
            // once for each shadowed variable the compiler materializes.
            if !assign_ps.is_empty() {
                self.succ.cont(false, assign_ps.clone());
            }

            let colon = token_child(clause, ":");
            let colon_pos = colon
                .map(|n| self.to_pos(n.start_byte()))
                .unwrap_or_else(|| self.to_pos(clause.start_byte()));
            let colon_end = colon.map(|n| n.end_byte()).unwrap_or(0);
            let stmts: Vec<Node> = statement_children(clause)
                .into_iter()
                .filter(|c| c.start_byte() >= colon_end)
                .collect();
            self.walk_body(colon_pos, rbrace_pos.clone(), stmts);

            block_ends.extend(self.succ.cursor().to_vec());
            self.succ.quasi_cont(&tag_ps);
        }

        // Clause headers all belong to the switch header's group; this is
        // the one place a group tag is deliberately overwritten.
        for pos in &clause_positions {
            self.succ.groups.insert(pos.clone(), header_group);
        }
        for pos in clause_positions.clone() {
            self.succ.add_succ(&pos, &clause_positions);
            self.succ.add_quasi(&pos, &tag_ps);
        }

        self.succ.set_cursor(cursor_header);
        self.succ.also_cont(false, clause_positions);
        self.succ.also_cont(false, vec![rbrace_pos]);
        self.succ.extend_cursor(block_ends);
    }
}
