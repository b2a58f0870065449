#![cfg(test)]

use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};

use crate::session::check_result::{CheckConfig, CheckResult};

// one possible implementation of walking a directory only visiting files
fn visit_dirs(dir: &Path, cb: &mut dyn FnMut(&DirEntry)) -> io::Result<()> {
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                visit_dirs(&path, cb)?;
            } else {
                cb(&entry);
            }
        }
    }
    Ok(())
}

/// Files named `ok_*.json` must check clean, `err_*.json` must not.
#[test]
fn check_all_programs() -> Result<(), String> {
    let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    d.push("tests");
    d.push("programs");
    let config = CheckConfig::default();
    let mut failures = Vec::new();
    let mut seen = 0;
    visit_dirs(&d, &mut |entry| {
        let path = entry.path();
        if !matches!(path.extension().map(|x| x.to_str()), Some(Some("json"))) {
            return;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let expect_valid = name.starts_with("ok_");
        seen += 1;

        let outcome = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|source| {
                CheckResult::from_json(&source, path.as_path().into(), &config)
                    .map_err(|e| e.to_string())
            });
        match outcome {
            Ok(result) if result.valid == expect_valid => {}
            Ok(result) => failures.push(format!("{}: {:?}", name, result.diagnostics)),
            Err(error) => failures.push(error),
        }
    })
    .map_err(|e| e.to_string())?;

    if seen == 0 {
        return Err(format!("no programs under {}", d.display()));
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures.join("\n"))
    }
}
