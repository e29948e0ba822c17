use std::fs;

use datatc_core::provenance::{LoadOptions, TransformCatalog, UnitInfo, UNTRACKED};
use datatc_core::vcs::FixedVcs;
use datatc_core::{
    transform, Data, DataContext, DataError, DirectoryNode, Kwargs, SelfAwareData, Table,
    Transform, TransformOptions,
};
use git2::{Repository, Signature};
use tempfile::TempDir;

transform! {
    /// Drop rows whose `qty` is zero.
    fn drop_empty(data, _kwargs) {
        let mut table = data
            .as_table()
            .cloned()
            .ok_or_else(|| DataError::transform("drop_empty", "expected a table"))?;
        let qty = table
            .column_index("qty")
            .ok_or_else(|| DataError::transform("drop_empty", "no qty column"))?;
        table.rows.retain(|row| row.get(qty).is_some_and(|v| v != "0"));
        Ok(Data::Table(table))
    }
}

transform! {
    fn scale_qty(data, kwargs) {
        let factor: i64 = kwargs.get_or("factor", 1)?;
        let mut table = data
            .as_table()
            .cloned()
            .ok_or_else(|| DataError::transform("scale_qty", "expected a table"))?;
        let mut bad = None;
        table.map_column("qty", |v| match v.parse::<i64>() {
            Ok(n) => (n * factor).to_string(),
            Err(_) => {
                bad = Some(v.to_string());
                v.to_string()
            }
        });
        if let Some(v) = bad {
            return Err(DataError::transform("scale_qty", format!("not a number: {v}")));
        }
        Ok(Data::Table(table))
    }
}

fn inventory(rows: &[(&str, &str)]) -> Data {
    Table::new(vec!["item".into(), "qty".into()])
        .with_rows(
            rows.iter()
                .map(|(i, q)| vec![i.to_string(), q.to_string()])
                .collect(),
        )
        .into()
}

fn clean_ctx() -> DataContext {
    DataContext::new()
        .with_vcs(FixedVcs::clean("0f1e2d3"))
        .with_loader(TransformCatalog::new().with(drop_empty()).with(scale_qty()))
}

fn pipeline(ctx: &DataContext, raw: Data) -> SelfAwareData {
    SelfAwareData::new(raw)
        .transform(ctx, drop_empty(), &TransformOptions::new().tag("nonzero"))
        .unwrap()
        .transform(
            ctx,
            scale_qty(),
            &TransformOptions::new().tag("doubled").arg("factor", 2).unwrap(),
        )
        .unwrap()
}

#[test]
fn transform_is_append_only() {
    let ctx = clean_ctx();
    let raw = SelfAwareData::new(inventory(&[("bolt", "4"), ("nut", "0")]));
    let once = raw
        .transform(&ctx, drop_empty(), &TransformOptions::new())
        .unwrap();

    let expected = drop_empty()
        .apply(raw.data(), &Kwargs::new())
        .unwrap();
    assert_eq!(once.data(), &expected);
    assert_eq!(once.len(), raw.len() + 1);
    assert_eq!(raw.data(), &inventory(&[("bolt", "4"), ("nut", "0")]));
    assert!(raw.history().is_empty());
}

#[test]
fn rerun_after_save_and_load() {
    let tmp = TempDir::new().unwrap();
    let ctx = clean_ctx();
    let built = pipeline(&ctx, inventory(&[("bolt", "4"), ("nut", "0")]));
    let unit = built
        .save(&ctx, &tmp.path().join("stock.csv"), &Kwargs::new())
        .unwrap();

    let loaded = SelfAwareData::load(&ctx, &unit, &LoadOptions::new()).unwrap();
    assert_eq!(loaded.data(), built.data());
    assert_eq!(loaded.len(), 2);
    for (saved, restored) in built.history().iter().zip(loaded.history()) {
        assert_eq!(saved.code, restored.code);
        assert_eq!(saved.kwargs, restored.kwargs);
        assert_eq!(saved.timestamp, restored.timestamp);
        assert_eq!(saved.tag, restored.tag);
    }

    let fresh = inventory(&[("washer", "0"), ("gear", "5")]);
    assert_eq!(
        loaded.rerun(&fresh).unwrap(),
        inventory(&[("gear", "10")])
    );
    assert_eq!(loaded.rerun(&fresh).unwrap(), built.rerun(&fresh).unwrap());
}

#[test]
fn load_without_functions_keeps_metadata() {
    let tmp = TempDir::new().unwrap();
    let ctx = clean_ctx();
    let unit = pipeline(&ctx, inventory(&[("bolt", "1")]))
        .save(&ctx, &tmp.path().join("stock.csv"), &Kwargs::new())
        .unwrap();

    let bare = DataContext::new().with_vcs(FixedVcs::untracked());
    assert!(matches!(
        SelfAwareData::load(&bare, &unit, &LoadOptions::new()).unwrap_err(),
        DataError::SourceUnavailable { .. }
    ));

    let loaded =
        SelfAwareData::load(&bare, &unit, &LoadOptions::new().load_function(false)).unwrap();
    assert_eq!(loaded.data(), &inventory(&[("bolt", "2")]));
    let info = loaded.get_info();
    assert_eq!(info[1]["kwargs"]["factor"], 2);
    assert_eq!(info[1]["git_hash"], "0f1e2d3");
    assert!(matches!(
        loaded.rerun(&inventory(&[])).unwrap_err(),
        DataError::FunctionNotLoaded { index: 0, .. }
    ));

    let info = UnitInfo::read(&unit).unwrap();
    assert_eq!(info.data_type(), "csv");
    assert_eq!(info.tag(), Some("stock"));
}

#[test]
fn simulated_dirty_repository() {
    let ctx = DataContext::new().with_vcs(FixedVcs::dirty("0f1e2d3", &["src/model.rs"]));
    let raw = SelfAwareData::new(inventory(&[("bolt", "1")]));

    match raw
        .transform(&ctx, drop_empty(), &TransformOptions::new())
        .unwrap_err()
    {
        DataError::DirtyRepository { files, .. } => assert_eq!(files, vec!["src/model.rs"]),
        other => panic!("expected dirty repository, got {other:?}"),
    }
    assert!(raw.is_empty());

    let allowed = raw
        .transform(
            &ctx,
            drop_empty(),
            &TransformOptions::new().enforce_clean_git(false),
        )
        .unwrap();
    assert_eq!(allowed.history()[0].git_hash, UNTRACKED);
}

fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

#[test]
fn real_repository_state() {
    let repo_dir = TempDir::new().unwrap();
    let repo = Repository::init(repo_dir.path()).unwrap();
    fs::write(repo_dir.path().join("pipeline.rs"), "// v1\n").unwrap();
    commit_all(&repo, "initial");

    let ctx = DataContext::new();
    let opts = TransformOptions::new().git_context(repo_dir.path());
    let raw = SelfAwareData::new(inventory(&[("bolt", "1")]));

    let tracked = raw.transform(&ctx, drop_empty(), &opts).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    let short = head.as_object().short_id().unwrap();
    assert_eq!(tracked.history()[0].git_hash, short.as_str().unwrap());
    assert_eq!(tracked.history()[0].git_hash.len(), 7);

    fs::write(repo_dir.path().join("pipeline.rs"), "// v2\n").unwrap();
    assert!(matches!(
        raw.transform(&ctx, drop_empty(), &opts).unwrap_err(),
        DataError::DirtyRepository { .. }
    ));
    let loose = raw
        .transform(&ctx, drop_empty(), &opts.clone().enforce_clean_git(false))
        .unwrap();
    assert_eq!(loose.history()[0].git_hash, UNTRACKED);
}

#[test]
fn node_save_with_transform_round_trip() {
    let tmp = TempDir::new().unwrap();
    let ctx = clean_ctx().into_shared();
    let root = DirectoryNode::open(tmp.path(), ctx).unwrap();
    root.save_transformed(
        &inventory(&[("bolt", "3"), ("nut", "0")]),
        "clean_stock.csv",
        drop_empty(),
        &TransformOptions::new(),
        &Kwargs::new(),
    )
    .unwrap();

    let root = root.refresh().unwrap();
    let unit = root.select("clean_stock").unwrap();
    assert!(unit.is_self_aware());
    let artifact = unit
        .load(&LoadOptions::new())
        .unwrap()
        .into_self_aware()
        .unwrap();
    assert_eq!(artifact.data(), &inventory(&[("bolt", "3")]));
    assert!(artifact.view_steps().contains("fn drop_empty(data, _kwargs)"));
    assert!(unit.path().join("provenance.json").is_file());
}
