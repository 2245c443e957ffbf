use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn generate(out: &Path, n: usize, seed: u64) {
    Command::cargo_bin("gen_dataset")
        .expect("binary exists")
        .args(["--n", &n.to_string(), "--sq", "8", "--seed", &seed.to_string(), "--no-progress"])
        .arg("--out")
        .arg(out)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Wrote {n} samples")));
}

#[test]
fn generated_rows_match_image_files() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("data");
    generate(&out, 5, 3);

    let text = fs::read_to_string(out.join("metadata.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(
        lines[0],
        "id,fen,turn,move_number,castling_rights,en_passant,is_check,is_game_over"
    );

    let ids: BTreeSet<String> = lines[1..]
        .iter()
        .map(|l| l.split(',').next().unwrap().to_string())
        .collect();
    let stems: BTreeSet<String> = fs::read_dir(out.join("images"))
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path();
            assert_eq!(path.extension().and_then(|s| s.to_str()), Some("png"));
            path.file_stem().unwrap().to_string_lossy().into_owned()
        })
        .collect();
    assert_eq!(ids, stems);
    assert!(ids.contains("000001") && ids.contains("000005"));
}

#[test]
fn sample_count_and_output_dir_are_required() {
    let tmp = TempDir::new().unwrap();

    Command::cargo_bin("gen_dataset")
        .expect("binary exists")
        .current_dir(tmp.path())
        .args(["--sq", "8", "--no-progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--n"))
        .stderr(predicate::str::contains("--out"));
    assert!(!tmp.path().join("dataset").exists());

    Command::cargo_bin("gen_dataset")
        .expect("binary exists")
        .current_dir(tmp.path())
        .args(["--n", "2", "--sq", "8", "--no-progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--out"));
}

#[test]
fn generated_dataset_validates_clean() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("data");
    generate(&out, 4, 9);
    let warnings = tmp.path().join("warnings.txt");

    Command::cargo_bin("validate_dataset")
        .expect("binary exists")
        .arg(out.join("metadata.csv"))
        .arg("--warnings")
        .arg(&warnings)
        .assert()
        .success()
        .stdout(predicate::str::contains("All 4 positions are valid"));
    assert!(!warnings.exists());
}

#[test]
fn same_seed_gives_same_metadata() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("a");
    let b = tmp.path().join("b");
    generate(&a, 3, 21);
    generate(&b, 3, 21);
    assert_eq!(
        fs::read_to_string(a.join("metadata.csv")).unwrap(),
        fs::read_to_string(b.join("metadata.csv")).unwrap()
    );
}

#[test]
fn validator_reports_only_the_bad_row() {
    let tmp = TempDir::new().unwrap();
    let metadata = tmp.path().join("metadata.csv");
    fs::write(
        &metadata,
        format!(
            "id,fen\n000001,{START}\n000002,4k3/8/8/8/8/8/8/4R1K1 w - - 0 1\n000003,{START}\n"
        ),
    )
    .unwrap();
    let warnings = tmp.path().join("warnings.txt");

    Command::cargo_bin("validate_dataset")
        .expect("binary exists")
        .arg(&metadata)
        .arg("--warnings")
        .arg(&warnings)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 3 rows invalid"));

    let report = fs::read_to_string(&warnings).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("000002: 4k3/8/8/8/8/8/8/4R1K1 w - - 0 1  -->  "));
}

#[test]
fn validator_uses_default_paths() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("metadata.csv"), "id,fen\n1,garbage\n").unwrap();

    Command::cargo_bin("validate_dataset")
        .expect("binary exists")
        .current_dir(tmp.path())
        .assert()
        .success();
    let report = fs::read_to_string(tmp.path().join("warnings.txt")).unwrap();
    assert!(report.starts_with("1: garbage  -->  "));
}

#[test]
fn validator_fails_on_missing_table() {
    let tmp = TempDir::new().unwrap();
    Command::cargo_bin("validate_dataset")
        .expect("binary exists")
        .arg(tmp.path().join("nope.csv"))
        .assert()
        .failure();
}
