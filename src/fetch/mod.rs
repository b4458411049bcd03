use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use reqwest::{Client, StatusCode};
use tokio::fs;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::config::Config;
use crate::error::{EtlError, Result};

const KAGGLE_API_BASE: &str = "https://www.kaggle.com/api/v1";

/// Extensions the normalizer can parse.
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "ods", "csv"];

/// Download a Kaggle dataset archive and expand it into `dest_dir`, creating
/// the directory if needed. `dataset` is an `owner/name` identifier. Returns
/// every file now present under `dest_dir`, sorted. Re-running overwrites
/// previously downloaded files.
pub async fn download_dataset(
    client: &Client,
    config: &Config,
    dataset: &str,
    dest_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let dest_dir = dest_dir.as_ref();
    fs::create_dir_all(dest_dir).await?;

    let url = format!("{KAGGLE_API_BASE}/datasets/download/{dataset}");
    info!(%dataset, "requesting dataset archive");

    let resp = client
        .get(&url)
        .basic_auth(&config.kaggle_username, Some(&config.kaggle_key))
        .send()
        .await
        .map_err(|e| EtlError::Transfer {
            context: "dataset download",
            message: e.to_string(),
        })?;

    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(EtlError::Authentication {
            service: "dataset service",
            message: rejection_message(resp).await,
        });
    }
    if !status.is_success() {
        return Err(EtlError::Transfer {
            context: "dataset download",
            message: format!("HTTP status {status}"),
        });
    }

    let bytes = resp.bytes().await.map_err(|e| EtlError::Transfer {
        context: "dataset download",
        message: e.to_string(),
    })?;
    info!(bytes = bytes.len(), "archive downloaded");

    let archive_path = dest_dir.join(format!("{}.zip", dataset.replace('/', "_")));
    fs::write(&archive_path, &bytes).await?;

    let extracted = unzip_archive(&archive_path, dest_dir)?;
    fs::remove_file(&archive_path).await?;
    info!(files = extracted, dir = %dest_dir.display(), "dataset expanded");

    list_files(dest_dir)
}

/// Pull a human-readable message out of a rejection response; Kaggle answers
/// auth failures with a small JSON body.
async fn rejection_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<serde_json::Value>().await {
        Ok(body) => body
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("HTTP status {status}")),
        Err(_) => format!("HTTP status {status}"),
    }
}

/// Expand every entry of `zip_path` into `dest_dir`. Entries whose names
/// would escape `dest_dir` are skipped. Returns the number of files written.
pub fn unzip_archive(zip_path: &Path, dest_dir: &Path) -> Result<usize> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| EtlError::Transfer {
        context: "archive expansion",
        message: e.to_string(),
    })?;

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| EtlError::Transfer {
            context: "archive expansion",
            message: e.to_string(),
        })?;
        let Some(relative) = entry.enclosed_name() else {
            debug!(entry = entry.name(), "skipping unsafe archive entry");
            continue;
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        count += 1;
    }

    Ok(count)
}

/// All regular files under `dir`, recursively, in sorted order.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("**/*").display().to_string();
    let entries = glob::glob(&pattern)
        .map_err(|e| EtlError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| EtlError::Io(e.into_error()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    debug!(count = files.len(), dir = %dir.display(), "listed files");
    Ok(files)
}

/// Keep only the files the normalizer understands; datasets often ship a
/// readme or license next to the data.
pub fn spreadsheet_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();
            for (name, body) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn unzip_expands_nested_entries() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("dataset.zip");
        let bytes = build_zip(&[
            ("menu.csv", "Food Item\nnasi goreng\n"),
            ("nested/extra.csv", "X\n1\n"),
        ]);
        std::fs::write(&zip_path, bytes).unwrap();

        let count = unzip_archive(&zip_path, dir.path()).unwrap();
        assert_eq!(count, 2);
        assert!(dir.path().join("menu.csv").is_file());
        assert!(dir.path().join("nested/extra.csv").is_file());
    }

    #[test]
    fn unzip_skips_entries_that_escape_the_target() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("evil.zip");
        let bytes = build_zip(&[("../escape.txt", "nope"), ("ok.csv", "X\n")]);
        std::fs::write(&zip_path, bytes).unwrap();

        let out = TempDir::new().unwrap();
        let count = unzip_archive(&zip_path, out.path()).unwrap();
        assert_eq!(count, 1);
        assert!(out.path().join("ok.csv").is_file());
        assert!(!out.path().parent().unwrap().join("escape.txt").exists());
    }

    #[test]
    fn list_files_is_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.csv"), "").unwrap();
        std::fs::write(dir.path().join("a.csv"), "").unwrap();
        std::fs::write(dir.path().join("sub/c.csv"), "").unwrap();

        let files = list_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv", "sub/c.csv"]);
    }

    #[test]
    fn spreadsheet_filter_keeps_known_extensions_only() {
        let paths: Vec<PathBuf> = [
            "data/menu.xlsx",
            "data/regions.CSV",
            "data/old.xls",
            "data/sheet.ods",
            "data/readme.md",
            "data/LICENSE",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        let kept = spreadsheet_files(&paths);
        let names: Vec<_> = kept
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["menu.xlsx", "regions.CSV", "old.xls", "sheet.ods"]);
    }
}
