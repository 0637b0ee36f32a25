//! Corruption recovery tests for the iching binary.
//!
//! Damaged journal rows are flagged and skipped; the rest of the journal
//! stays usable and new readings can still be appended.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use tempfile::TempDir;

fn cli(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("iching"));
    cmd.env("XDG_CONFIG_HOME", temp_dir.path().join("config"))
        .env_remove("OPENAI_API_KEY");
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

const HEADER: &str =
    "Date,Question,Lines,Primary Hexagram Number,Evolving Hexagram Number,AI Interpretation\n";

#[test]
fn test_corrupted_rows_are_flagged() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(
        data_dir.join("i_ching_journal.csv"),
        format!(
            "{}2024-01-05 08:15:00,Readable,\"7,7,7,7,7,7\",1,,\n\
             garbage,Broken,\"1,2\",x,,\n\
             2024-01-07 09:00:00,Also readable,\"8,8,8,8,8,8\",2,,\n",
            HEADER
        ),
    )
    .unwrap();

    cli(&temp_dir)
        .arg("journal")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Readable"))
        .stdout(predicate::str::contains("Also readable"))
        .stdout(predicate::str::contains("2. [unreadable entry"))
        .stderr(predicate::str::contains("1 journal entries could not be shown"));

    cli(&temp_dir)
        .args(["show", "2"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .failure();
}

#[test]
fn test_unknown_hexagram_number_is_skipped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(
        data_dir.join("i_ching_journal.csv"),
        format!("{}2024-01-05 08:15:00,Stale,\"7,7,7,7,7,7\",99,,\n", HEADER),
    )
    .unwrap();

    cli(&temp_dir)
        .args(["show", "1"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be shown"));
}

#[test]
fn test_append_after_corruption() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    let journal_path = data_dir.join("i_ching_journal.csv");

    let mut file = fs::File::create(&journal_path).unwrap();
    write!(file, "{}not,a,valid,row,,\n", HEADER).unwrap();
    drop(file);

    cli(&temp_dir)
        .args(["cast", "Fresh start?", "--save"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    let contents = fs::read_to_string(&journal_path).unwrap();
    assert_eq!(contents.matches("Date,Question").count(), 1);

    cli(&temp_dir)
        .arg("journal")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Fresh start?"));
}
