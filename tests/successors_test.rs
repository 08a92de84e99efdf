//! Engine behavior over real files on disk, through the same entry point
//! the driver uses.

use std::fs;
use stepcheck::{Function, Pos, Successors};
use tempfile::TempDir;

fn write_source(dir: &TempDir, name: &str, code: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, code).unwrap();
    path.display().to_string()
}

#[test]
fn analyzes_functions_from_a_file_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_source(
        &dir,
        "main.go",
        r#"package main

func f() {
	a := 1
	b := 2
}
"#,
    );

    let mut funcs = vec![Function::named("main.f")];
    let mut succs = Successors::new();
    succs.analyze_file(&path, &mut funcs);

    let decl = funcs[0].decl.as_ref().expect("declaration attached");
    assert_eq!(decl.start, Pos::new(path.clone(), 3));
    assert_eq!(decl.end, Pos::new(path.clone(), 6));

    let set = &succs.s[&Pos::new(path.clone(), 4)];
    assert!(set.contains(&Pos::new(path.clone(), 5)));
    let set = &succs.s[&Pos::new(path.clone(), 5)];
    assert!(set.contains(&Pos::function_exit()));
}

#[test]
fn skips_files_that_fail_the_acceptance_rule() {
    let mut funcs = vec![Function::named("main.f")];
    let mut succs = Successors::new();
    succs.analyze_file("<autogenerated>", &mut funcs);
    succs.analyze_file("", &mut funcs);
    succs.analyze_file("not_go.c", &mut funcs);
    assert!(succs.s.is_empty());
}

#[test]
fn missing_files_leave_the_tables_valid_and_partial() {
    let dir = TempDir::new().unwrap();
    let good = write_source(
        &dir,
        "good.go",
        r#"package main

func f() {
	work()
}
"#,
    );
    let missing = dir.path().join("missing.go").display().to_string();

    let mut funcs = vec![Function::named("main.f")];
    let mut succs = Successors::new();
    succs.analyze_file(&missing, &mut funcs);
    succs.analyze_file(&good, &mut funcs);

    assert!(succs.s.contains_key(&Pos::new(good.clone(), 3)));
}

#[test]
fn group_tags_distinguish_functions_across_files() {
    let dir = TempDir::new().unwrap();
    let first = write_source(
        &dir,
        "first.go",
        r#"package main

func f() {
	a()
}
"#,
    );
    let second = write_source(
        &dir,
        "second.go",
        r#"package main

func g() {
	b()
}
"#,
    );

    let mut funcs = vec![Function::named("main.f"), Function::named("main.g")];
    let mut succs = Successors::new();
    succs.analyze_file(&first, &mut funcs);
    succs.analyze_file(&second, &mut funcs);

    let f_group = succs.groups[&Pos::new(first.clone(), 4)];
    let g_group = succs.groups[&Pos::new(second.clone(), 4)];
    assert_ne!(f_group >> 32, g_group >> 32);
}

#[test]
fn reanalyzing_a_file_reuses_existing_group_assignments() {
    let dir = TempDir::new().unwrap();
    let path = write_source(
        &dir,
        "main.go",
        r#"package main

func f() {
	a()
}
"#,
    );

    let mut funcs = vec![Function::named("main.f")];
    let mut succs = Successors::new();
    succs.analyze_file(&path, &mut funcs);
    let before = succs.groups.clone();
    // A second pass over the same file must not rewrite any group.
    succs.analyze_file(&path, &mut funcs);
    for (pos, group) in &before {
        assert_eq!(succs.groups[pos], *group, "group rewritten for {:?}", pos);
    }
}
