//! Binary-level tests: exit codes and output format.

use std::fs;
use std::path::Path;
use std::process::Command;

fn phz() -> Command {
    Command::new(env!("CARGO_BIN_EXE_phz"))
}

fn write(dir: &Path, name: &str, source: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, source).expect("write fixture");
    path
}

#[test]
fn clean_file_exits_zero_with_no_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(dir.path(), "clean.php", "<?php $x = 1; print($x);");
    let output = phz().arg(&file).output().expect("run phz");
    assert!(output.status.success(), "{output:?}");
    assert!(output.stdout.is_empty(), "{output:?}");
}

#[test]
fn diagnostics_exit_one_and_use_the_block_format() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(dir.path(), "bad.php", "<?php\nprint($x);");
    let output = phz().arg(&file).output().expect("run phz");
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("` line 2:\nUndefined variable `$x`"),
        "unexpected output: {stdout}"
    );
}

#[test]
fn directories_are_walked_for_php_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a.php", "<?php $a = 1;");
    write(dir.path(), "b.php", "<?php print($b);");
    write(dir.path(), "notes.txt", "not php");
    let output = phz().arg(dir.path()).output().expect("run phz");
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Undefined variable `$b`"), "{stdout}");
}

#[test]
fn ignore_file_prefix_excludes_files_from_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let vendor = dir.path().join("vendor");
    fs::create_dir(&vendor).expect("mkdir vendor");
    write(&vendor, "lib.php", "<?php print($undefined);");
    write(dir.path(), "app.php", "<?php $ok = 1;");
    let canonical_vendor = fs::canonicalize(&vendor).expect("canonicalize");
    let output = phz()
        .arg(dir.path())
        .arg("--ignore-file-prefix")
        .arg(canonical_vendor.display().to_string())
        .output()
        .expect("run phz");
    assert!(output.status.success(), "{output:?}");
}

#[test]
fn statistics_lists_checked_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(dir.path(), "app.php", "<?php $n = 1;\n$m = 2;\n");
    let output = phz()
        .arg(&file)
        .arg("--statistics")
        .output()
        .expect("run phz");
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Lines analyzed"), "{stdout}");
    assert!(stdout.contains("Checked files"), "{stdout}");
}

#[test]
fn statistics_json_is_machine_readable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(dir.path(), "app.php", "<?php $n = 1;");
    let output = phz()
        .arg(&file)
        .arg("--statistics")
        .arg("--json")
        .output()
        .expect("run phz");
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).expect("valid JSON");
    assert_eq!(value["errors"], 0);
    assert!(value["checked_files"].is_array());
}

#[test]
fn preload_supplies_definitions_without_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bootstrap = write(
        dir.path(),
        "bootstrap.php",
        "<?php function boot_helper(): void {} print($bootstrap_only);",
    );
    let app = write(dir.path(), "app.php", "<?php boot_helper();");
    let output = phz()
        .arg(&app)
        .arg("--preload")
        .arg(&bootstrap)
        .output()
        .expect("run phz");
    assert!(output.status.success(), "{output:?}");
    assert!(output.stdout.is_empty(), "{output:?}");
}

#[test]
fn self_check_flag_suppresses_redeclarations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(dir.path(), "dup.php", "<?php class A {} class A {}");
    let plain = phz().arg(&file).output().expect("run phz");
    assert_eq!(plain.status.code(), Some(1));
    let relaxed = phz()
        .arg(&file)
        .arg("--self-check")
        .output()
        .expect("run phz");
    assert!(relaxed.status.success(), "{relaxed:?}");
}

#[test]
fn runs_are_byte_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(
        dir.path(),
        "mix.php",
        "<?php class A {} new B(); print($x);\n$y = 1; if ($y === 'a') {}",
    );
    let first = phz().arg(&file).output().expect("run phz");
    let second = phz().arg(&file).output().expect("run phz");
    assert_eq!(first.stdout, second.stdout);
    assert_eq!(first.status.code(), second.status.code());
}
