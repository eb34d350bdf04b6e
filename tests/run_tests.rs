use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Find all test directories in tests/run/
fn find_run_tests() -> Vec<PathBuf> {
    let run_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/run");
    let mut test_dirs = Vec::new();

    if let Ok(entries) = fs::read_dir(run_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() && path.join("input.bas").exists() {
                test_dirs.push(path);
            }
        }
    }

    test_dirs.sort();
    test_dirs
}

/// Crunch a case's input.bas into a tokenized file under the temp dir
fn build_image(test_dir: &Path, test_name: &str) -> Result<PathBuf, String> {
    let source = fs::read_to_string(test_dir.join("input.bas"))
        .map_err(|e| format!("Test '{}': failed to read input.bas: {}", test_name, e))?;
    let image = sbc::encode::crunch(&source)
        .map_err(|e| format!("Test '{}': failed to tokenize input.bas: {}", test_name, e))?;

    let path = std::env::temp_dir().join(format!("sbc_run_{}.bbc", test_name));
    fs::write(&path, image)
        .map_err(|e| format!("Test '{}': failed to write image: {}", test_name, e))?;
    Ok(path)
}

/// Run a single test case
///
/// A case with expected_output.txt must parse and print exactly that tree.
/// A case with expected_error.txt must fail with that message.
fn run_test_case(test_dir: &Path) -> Result<(), String> {
    let test_name = test_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    let image = build_image(test_dir, test_name)?;
    let output = Command::new(env!("CARGO_BIN_EXE_sbc"))
        .arg("parse")
        .arg(&image)
        .output()
        .map_err(|e| format!("Test '{}': failed to execute sbc parse: {}", test_name, e))?;
    let _ = fs::remove_file(&image);

    let expected_output_file = test_dir.join("expected_output.txt");
    let expected_error_file = test_dir.join("expected_error.txt");

    if expected_output_file.exists() {
        let expected = fs::read_to_string(&expected_output_file).map_err(|e| {
            format!("Test '{}': failed to read expected_output.txt: {}", test_name, e)
        })?;

        if !output.status.success() {
            return Err(format!(
                "Test '{}': sbc parse failed with exit code {:?}\nStderr: {}",
                test_name,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let actual = String::from_utf8_lossy(&output.stdout);
        if actual.trim_end() != expected.trim_end() {
            return Err(format!(
                "Test '{}': output mismatch\nExpected:\n{}\nActual:\n{}",
                test_name,
                expected.trim_end(),
                actual.trim_end()
            ));
        }
        return Ok(());
    }

    if expected_error_file.exists() {
        let expected = fs::read_to_string(&expected_error_file).map_err(|e| {
            format!("Test '{}': failed to read expected_error.txt: {}", test_name, e)
        })?;

        if output.status.code() != Some(1) {
            return Err(format!(
                "Test '{}': expected exit code 1, got {:?}",
                test_name,
                output.status.code()
            ));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.contains(expected.trim()) {
            return Err(format!(
                "Test '{}': error mismatch\nExpected:\n{}\nStderr:\n{}",
                test_name,
                expected.trim(),
                stderr.trim()
            ));
        }
        return Ok(());
    }

    Err(format!(
        "Test '{}': expected_output.txt or expected_error.txt not found",
        test_name
    ))
}

#[test]
fn test_run_integration() {
    let test_dirs = find_run_tests();

    if test_dirs.is_empty() {
        panic!("No integration tests found in tests/run/");
    }

    let mut failures = Vec::new();

    for test_dir in &test_dirs {
        let test_name = test_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");

        print!("Running test '{}' ... ", test_name);

        match run_test_case(test_dir) {
            Ok(_) => {
                println!("ok");
            }
            Err(e) => {
                println!("FAILED");
                failures.push(e);
            }
        }
    }

    if !failures.is_empty() {
        eprintln!("\nFailures:");
        for failure in &failures {
            eprintln!("  {}", failure);
        }
        panic!("{} test(s) failed", failures.len());
    }
}

// Individual test for each test case - makes it easier to run specific tests
#[test]
fn test_run_hello() {
    let test_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/run/hello");
    if let Err(e) = run_test_case(&test_dir) {
        panic!("{}", e);
    }
}
