//! Upload parsers
//!
//! Two-column test spreadsheets, archives of paired test files, and
//! three-column rosters. Parsers only decode; callers write the rows.

use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, AppResult};

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("static pattern"));

/// One imported test pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedTest {
    pub input: String,
    pub expected_output: String,
}

/// One imported roster row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRosterEntry {
    pub nickname: String,
    pub organization: String,
    pub password: String,
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").trim().to_string()
}

/// Parse a two-column spreadsheet (input, expected output). Rows where both
/// columns are empty are skipped.
pub fn parse_tests_csv(data: &[u8]) -> AppResult<Vec<ImportedTest>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(data));

    let mut tests = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::InvalidInput(format!("bad spreadsheet row: {}", e)))?;
        if record.len() < 2 {
            return Err(AppError::InvalidInput(
                "expected two columns: input, expected output".to_string(),
            ));
        }
        let input = normalize(record.get(0).unwrap_or_default());
        let expected_output = normalize(record.get(1).unwrap_or_default());
        if input.is_empty() && expected_output.is_empty() {
            continue;
        }
        tests.push(ImportedTest {
            input,
            expected_output,
        });
    }

    Ok(tests)
}

/// Sort key for archive entries: the leading integer of the base name when
/// present, otherwise the name itself
fn archive_sort_key(path: &str) -> (Option<i64>, String) {
    let base = path.rsplit('/').next().unwrap_or(path).to_string();
    let number = LEADING_NUMBER
        .find(&base)
        .and_then(|m| m.as_str().parse::<i64>().ok());
    (number, base)
}

/// Extract paired tests from a ZIP archive. Pairs are either `NN` + `NN.a`
/// or `input_X` + `output_X`, in the same archive folder; pairs are added
/// in leading-integer order of the input's base name.
pub fn parse_tests_archive(data: &[u8]) -> AppResult<Vec<ImportedTest>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| AppError::InvalidInput(format!("not a valid ZIP archive: {}", e)))?;

    let names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    let mut pairs: Vec<(String, String)> = Vec::new();

    for name in &names {
        if name.ends_with('/') || name.contains("__MACOSX") {
            continue;
        }
        let (dir, base) = match name.rfind('/') {
            Some(idx) => (&name[..idx + 1], &name[idx + 1..]),
            None => ("", name.as_str()),
        };

        // "NN.a" output next to its "NN" input
        if let Some(input_base) = base.strip_suffix(".a") {
            let input_path = format!("{}{}", dir, input_base);
            if names.iter().any(|n| n == &input_path) {
                pairs.push((input_path, name.clone()));
                continue;
            }
        }

        // legacy "input_X" / "output_X" pairs
        if base.contains("input_") {
            let output_path = format!("{}{}", dir, base.replace("input_", "output_"));
            if names.iter().any(|n| n == &output_path) {
                pairs.push((name.clone(), output_path));
            }
        }
    }

    pairs.sort_by_key(|(input, _)| archive_sort_key(input));

    let mut read_entry = |path: &str| -> AppResult<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| AppError::InvalidInput(format!("archive entry {}: {}", path, e)))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| AppError::InvalidInput(format!("archive entry {}: {}", path, e)))?;
        Ok(normalize(&String::from_utf8_lossy(&buf)))
    };

    let mut tests = Vec::new();
    for (input_path, output_path) in pairs {
        let input = read_entry(&input_path)?;
        let expected_output = read_entry(&output_path)?;
        if input.is_empty() && expected_output.is_empty() {
            continue;
        }
        tests.push(ImportedTest {
            input,
            expected_output,
        });
    }

    Ok(tests)
}

/// Parse a three-column roster spreadsheet: nickname, organization, password
pub fn parse_roster_csv(data: &[u8]) -> AppResult<Vec<ImportedRosterEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(data));

    let mut entries = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::InvalidInput(format!("bad roster row: {}", e)))?;
        if record.len() < 3 {
            return Err(AppError::InvalidInput(
                "expected three columns: nickname, organization, password".to_string(),
            ));
        }
        let nickname = record.get(0).unwrap_or_default().trim().to_string();
        let organization = record.get(1).unwrap_or_default().trim().to_string();
        let password = record.get(2).unwrap_or_default().trim().to_string();
        if nickname.is_empty() {
            continue;
        }
        entries.push(ImportedRosterEntry {
            nickname,
            organization,
            password,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            for (name, content) in entries {
                writer
                    .start_file(name.to_string(), SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn csv_two_columns() {
        let data = b"1 2,3\n5 5,10\n,\n";
        let tests = parse_tests_csv(data).unwrap();
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].input, "1 2");
        assert_eq!(tests[0].expected_output, "3");
    }

    #[test]
    fn csv_rejects_single_column() {
        assert!(parse_tests_csv(b"only-one-column\n").is_err());
    }

    #[test]
    fn archive_pairs_nn_dot_a() {
        let data = build_zip(&[
            ("tests/02", "second in"),
            ("tests/02.a", "second out"),
            ("tests/01", "first in"),
            ("tests/01.a", "first out"),
            ("tests/readme.txt", "ignored"),
        ]);

        let tests = parse_tests_archive(&data).unwrap();
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].input, "first in");
        assert_eq!(tests[0].expected_output, "first out");
        assert_eq!(tests[1].input, "second in");
    }

    #[test]
    fn archive_pairs_input_output_names() {
        let data = build_zip(&[
            ("input_10.txt", "ten"),
            ("output_10.txt", "TEN"),
            ("input_2.txt", "two"),
            ("output_2.txt", "TWO"),
        ]);

        let tests = parse_tests_archive(&data).unwrap();
        // numeric sort: 2 before 10
        assert_eq!(tests[0].input, "two");
        assert_eq!(tests[1].input, "ten");
    }

    #[test]
    fn archive_skips_macosx_and_unpaired() {
        let data = build_zip(&[
            ("__MACOSX/01", "junk"),
            ("01", "lonely input"),
            ("03", "in"),
            ("03.a", "out"),
        ]);

        let tests = parse_tests_archive(&data).unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].input, "in");
    }

    #[test]
    fn archive_normalizes_crlf() {
        let data = build_zip(&[("1", "a\r\nb\r\n"), ("1.a", "c\r\n")]);
        let tests = parse_tests_archive(&data).unwrap();
        assert_eq!(tests[0].input, "a\nb");
        assert_eq!(tests[0].expected_output, "c");
    }

    #[test]
    fn garbage_is_not_a_zip() {
        assert!(parse_tests_archive(b"definitely not a zip").is_err());
    }

    #[test]
    fn roster_three_columns() {
        let data = b"alice,School 1,pw1\nbob,School 2,pw2\n";
        let roster = parse_roster_csv(data).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].nickname, "alice");
        assert_eq!(roster[1].password, "pw2");
    }
}
