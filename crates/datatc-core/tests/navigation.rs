use std::fs;
use std::path::Path;

use datatc_core::provenance::LoadOptions;
use datatc_core::vcs::FixedVcs;
use datatc_core::{Data, DataContext, DataError, DirectoryNode};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

fn open(tmp: &TempDir) -> DirectoryNode {
    let ctx = DataContext::new().with_vcs(FixedVcs::untracked()).into_shared();
    DirectoryNode::open(tmp.path(), ctx).unwrap()
}

#[test]
fn extracts_latest_and_select() {
    let tmp = TempDir::new().unwrap();
    let extracts = tmp.path().join("extracts");
    write(&extracts, "a_2020-01-01.csv", "id\n1\n");
    write(&extracts, "a_2020-03-01.csv", "id\n3\n");
    write(&extracts, "b_2020-02-01.csv", "id\n2\n");

    let root = open(&tmp);
    let extracts = root.get("extracts").unwrap();
    let latest = extracts.latest().unwrap();
    assert_eq!(latest.name(), "a_2020-03-01.csv");

    match extracts.select("a").unwrap_err() {
        DataError::AmbiguousSelection { matches, .. } => {
            assert_eq!(matches, vec!["a_2020-01-01.csv", "a_2020-03-01.csv"])
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    assert_eq!(extracts.select("b").unwrap().name(), "b_2020-02-01.csv");

    let table = latest.load(&LoadOptions::new()).unwrap().into_data();
    let table = table.as_table().unwrap();
    assert_eq!(table.column("id").unwrap(), vec!["3"]);
}

#[test]
fn exact_name_then_unique_substring() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("Raw"), "x.txt", "x");
    write(&tmp.path().join("raw_backup"), "y.txt", "y");
    write(tmp.path(), "summary.json", "{}");

    let root = open(&tmp);
    assert_eq!(root.get("Raw").unwrap().name(), "Raw");
    assert_eq!(root.get("BACKUP").unwrap().name(), "raw_backup");
    assert_eq!(root.get("summ").unwrap().name(), "summary.json");
    assert!(matches!(
        root.get("raw").unwrap_err(),
        DataError::AmbiguousSelection { .. }
    ));
}

#[test]
fn chained_select_narrows() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("model_a").join("runs"), "run_1.json", "1");
    write(&tmp.path().join("model_a").join("runs"), "run_2.json", "2");
    write(&tmp.path().join("model_b"), "notes.txt", "b");

    let root = open(&tmp);
    let a = root.select("_a").unwrap();
    let runs = a.select("run").unwrap();
    assert_eq!(runs.parent_path(), Some(a.path()));
    assert_eq!(runs.select("2").unwrap().name(), "run_2.json");
    assert_eq!(
        runs.select("2").unwrap().load(&LoadOptions::new()).unwrap().into_data(),
        Data::Json(2.into())
    );
}

#[test]
fn listing_renders_tree() {
    let tmp = TempDir::new().unwrap();
    let many = tmp.path().join("many");
    for i in 0..4 {
        write(&many, &format!("part_{i}.csv"), "a\n1\n");
    }
    write(&tmp.path().join("few"), "one.txt", "1");
    write(tmp.path(), "top.md", "# top");

    let root = open(&tmp);
    let text = root.ls(false).unwrap().to_string();
    let name = tmp.path().file_name().unwrap().to_str().unwrap();
    assert_eq!(
        text,
        format!("{name}/\n├── few/\n│   └── one.txt\n├── many/\n│   └── 4 csv items\n└── top.md\n")
    );

    let full = root.ls(true).unwrap().to_string();
    assert!(full.contains("part_3.csv"));
}
