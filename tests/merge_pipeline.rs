mod common;

use std::fs;
use std::process::Command;

use pretty_assertions::assert_eq;
use table_batch::{
    ArtifactStore, ExportForms, ImageSource, IngestOptions, MergeOptions, PipelineError,
    TableSource, discover, merge, merge_directory, write_table,
};
use tempfile::tempdir;

use common::{table, write_markup_table};

fn strings(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
        .collect()
}

#[test]
fn merges_persisted_artifacts_into_csv() {
    let root = tempdir().expect("tempdir should be created");
    let store = ArtifactStore::new(root.path(), ExportForms::default());
    store
        .persist(
            &ImageSource::from_path("img1.jpg"),
            &[table(0, &[&["h1", "h2"], &["1", "2"], &["3", "4"]])],
        )
        .expect("persist should succeed");
    store
        .persist(
            &ImageSource::from_path("img2.jpg"),
            &[table(0, &[&["h1", "h2", "h3"], &["5", "6", "7"]])],
        )
        .expect("persist should succeed");

    let report = merge_directory(
        root.path(),
        "merged.csv".as_ref(),
        &MergeOptions::default(),
    )
    .expect("merge should succeed");

    assert_eq!(report.files_found, 2, "workbook twins must not be ingested");
    assert_eq!(report.table_count, 2);
    assert_eq!(report.row_count, 3);
    assert_eq!(report.column_count, 3);
    assert_eq!(report.duplicates_removed, 0);

    let csv = fs::read_to_string(root.path().join("merged.csv")).expect("csv should be readable");
    assert_eq!(csv, "col_1,col_2,col_3\n1,2,\n3,4,\n5,6,7\n");
}

#[test]
fn rerunning_merge_does_not_ingest_its_own_output() {
    let root = tempdir().expect("tempdir should be created");
    write_markup_table(
        &root.path().join("a/table_0.html"),
        &[&["h"], &["x"], &["y"]],
    );

    let first = merge_directory(root.path(), "merged.csv".as_ref(), &MergeOptions::default())
        .expect("first merge should succeed");
    let second = merge_directory(root.path(), "merged.csv".as_ref(), &MergeOptions::default())
        .expect("second merge should succeed");

    assert_eq!(first.files_found, 1);
    assert_eq!(second.files_found, 1);
    assert_eq!(first.row_count, second.row_count);
}

#[test]
fn identical_rows_across_images_appear_once() {
    let root = tempdir().expect("tempdir should be created");
    write_markup_table(&root.path().join("a/table_0.html"), &[&["h", "h"], &["A", "B"]]);
    write_markup_table(&root.path().join("b/table_0.html"), &[&["h", "h"], &["A", "B"]]);

    let ingested = discover(root.path(), &IngestOptions::default()).expect("discover");
    let merged = merge(ingested.tables, &MergeOptions::default()).expect("merge");

    assert_eq!(merged.rows, strings(&[&["A", "B"]]));
    assert_eq!(merged.duplicates_removed, 1);
}

#[test]
fn discovery_orders_by_path_and_skips_broken_files() {
    let root = tempdir().expect("tempdir should be created");
    write_markup_table(&root.path().join("b/table_0.html"), &[&["b"]]);
    write_markup_table(&root.path().join("a/table_1.html"), &[&["a1"]]);
    write_markup_table(&root.path().join("a/table_0.html"), &[&["a0"]]);
    fs::write(root.path().join("a/notes.html"), "<p>no table here</p>").expect("fixture");
    fs::write(root.path().join("bad.csv"), [0xff_u8, 0xfe, b',', b'\n']).expect("fixture");
    fs::write(root.path().join("readme.txt"), "ignored").expect("fixture");

    let ingested = discover(root.path(), &IngestOptions::default()).expect("discover");

    let origins = ingested
        .tables
        .iter()
        .map(|table| {
            table
                .origin()
                .strip_prefix(root.path())
                .expect("origin under root")
                .to_path_buf()
        })
        .collect::<Vec<_>>();
    assert_eq!(
        origins,
        vec![
            std::path::PathBuf::from("a/table_0.html"),
            std::path::PathBuf::from("a/table_1.html"),
            std::path::PathBuf::from("b/table_0.html"),
        ]
    );

    let mut skipped = ingested
        .skipped
        .iter()
        .map(|file| file.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    skipped.sort();
    assert_eq!(skipped, vec!["bad.csv", "notes.html"]);
    assert_eq!(ingested.files_found, 5);
}

#[test]
fn reads_top_level_curated_workbook() {
    let root = tempdir().expect("tempdir should be created");
    let rows = strings(&[&["", "name", "qty"], &["", "pen", "3"]]);
    write_table(&root.path().join("curated.xlsx"), None, &rows).expect("workbook written");

    let ingested = discover(root.path(), &IngestOptions::default()).expect("discover");

    assert_eq!(ingested.tables.len(), 1);
    assert_eq!(ingested.tables[0].source, TableSource::Workbook);
    assert_eq!(ingested.tables[0].rows, rows);
}

#[test]
fn hidden_staging_directories_are_ignored() {
    let root = tempdir().expect("tempdir should be created");
    write_markup_table(&root.path().join("a/table_0.html"), &[&["h"], &["kept"]]);
    write_markup_table(
        &root.path().join(".a.staging-123/table_0.html"),
        &[&["h"], &["partial"]],
    );

    let ingested = discover(root.path(), &IngestOptions::default()).expect("discover");
    assert_eq!(ingested.tables.len(), 1);
}

#[test]
fn empty_tree_is_empty_input() {
    let root = tempdir().expect("tempdir should be created");
    fs::create_dir(root.path().join("nothing")).expect("fixture");

    let err = merge_directory(root.path(), "merged.xlsx".as_ref(), &MergeOptions::default())
        .expect_err("nothing to merge");
    assert!(matches!(err, PipelineError::EmptyInput));
    assert!(!root.path().join("merged.xlsx").exists());
}

#[test]
fn missing_input_directory_is_source_not_found() {
    let root = tempdir().expect("tempdir should be created");
    let err = discover(&root.path().join("missing"), &IngestOptions::default())
        .expect_err("missing dir");
    assert!(matches!(err, PipelineError::SourceNotFound(_)));
}

#[test]
fn cli_merge_writes_workbook_inside_input_dir() {
    let root = tempdir().expect("tempdir should be created");
    write_markup_table(&root.path().join("a/table_0.html"), &[&["h1", "h2"], &["1", "2"]]);

    let status = Command::new(env!("CARGO_BIN_EXE_tablebatch"))
        .args([
            "merge",
            "--input-dir",
            &root.path().to_string_lossy(),
            "--column-labels",
            "date,event",
        ])
        .status()
        .expect("CLI should run");

    assert_eq!(status.code(), Some(0));
    assert!(root.path().join("merged_results.xlsx").is_file());
}

#[test]
fn cli_merge_exits_one_without_tables() {
    let root = tempdir().expect("tempdir should be created");

    let status = Command::new(env!("CARGO_BIN_EXE_tablebatch"))
        .args(["merge", "--input-dir", &root.path().to_string_lossy()])
        .status()
        .expect("CLI should run");

    assert_eq!(status.code(), Some(1));
}
