// ABOUTME: best-effort codebase search collaborator: a walkdir-based scorer and
// ABOUTME: the bounded textual report the executor renders from its hits.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::DateTime;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};
use warden_common::{MediationError, SearchHit};

const MAX_SCANNED_FILE_BYTES: u64 = 512 * 1024;
const PREVIEW_CHARS: usize = 120;

/// Capability seam for the ranked-search collaborator.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, MediationError>;
}

/// Unranked-beyond-heuristics production provider: walks the repository,
/// scores files by term frequency with a filename boost, and skips hidden
/// directories, excluded entries, oversized files, and binary content.
pub struct WalkdirSearch {
    root: PathBuf,
    excluded: Vec<String>,
}

impl WalkdirSearch {
    pub fn new(root: impl Into<PathBuf>, excluded: Vec<String>) -> Self {
        Self {
            root: root.into(),
            excluded,
        }
    }
}

#[async_trait]
impl SearchProvider for WalkdirSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, MediationError> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Err(MediationError::search_failed("empty search query"));
        }

        let root = self.root.clone();
        let excluded = self.excluded.clone();
        let hits = tokio::task::spawn_blocking(move || scan(&root, &excluded, &query, max_results))
            .await
            .map_err(|e| MediationError::internal(format!("search task failed: {e}")))?;
        Ok(hits)
    }
}

fn scan(root: &Path, excluded: &[String], query: &str, max_results: usize) -> Vec<SearchHit> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();

    let mut hits: Vec<SearchHit> = Vec::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !skipped(e, root, excluded));
    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.len() > MAX_SCANNED_FILE_BYTES {
            continue;
        }
        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };
        if bytes.contains(&0) {
            continue;
        }
        let content = String::from_utf8_lossy(&bytes);
        let lower = content.to_lowercase();

        let matches: usize = terms.iter().map(|t| lower.matches(t.as_str()).count()).sum();
        let name = entry.file_name().to_string_lossy().to_lowercase();
        let name_boost = if terms.iter().any(|t| name.contains(t.as_str())) {
            2.0
        } else {
            0.0
        };
        if matches == 0 && name_boost == 0.0 {
            continue;
        }

        let line_count = content.lines().count();
        let score = matches as f64 / line_count.max(1) as f64 + name_boost;
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        let modified_unix = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        hits.push(SearchHit {
            path: relative,
            score,
            line_count,
            size: meta.len(),
            preview: preview(&content, &terms),
            modified_unix,
        });
    }

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(max_results);
    debug!(query = %query, hits = hits.len(), "search scan finished");
    hits
}

fn skipped(entry: &DirEntry, root: &Path, excluded: &[String]) -> bool {
    if entry.path() == root {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    excluded.iter().any(|e| e == name.as_ref())
}

fn preview(content: &str, terms: &[String]) -> String {
    let line = content
        .lines()
        .find(|l| {
            let lower = l.to_lowercase();
            terms.iter().any(|t| lower.contains(t.as_str()))
        })
        .or_else(|| content.lines().next())
        .unwrap_or("")
        .trim();
    line.chars().take(PREVIEW_CHARS).collect()
}

/// Renders the bounded textual report for a set of hits.
pub fn format_report(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results for \"{query}\"");
    }
    let mut out = format!("Search results for \"{query}\" ({} shown):\n", hits.len());
    for (rank, hit) in hits.iter().enumerate() {
        let date = DateTime::from_timestamp(hit.modified_unix as i64, 0)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        out.push_str(&format!(
            "{:2}. {} (score {:.2}, {} lines, {}, {})\n    {}\n",
            rank + 1,
            hit.path,
            hit.score,
            hit.line_count,
            human_size(hit.size),
            date,
            hit.preview
        ));
    }
    out
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn populate(dir: &tempfile::TempDir) {
        tokio::fs::write(
            dir.path().join("auth.rs"),
            "fn login() {}\nfn logout() {}\n",
        )
        .await
        .unwrap();
        tokio::fs::write(
            dir.path().join("readme.md"),
            "login flow documented here\nlogin login login\n",
        )
        .await
        .unwrap();
        tokio::fs::create_dir(dir.path().join("target")).await.unwrap();
        tokio::fs::write(dir.path().join("target/cache.rs"), "login login\n")
            .await
            .unwrap();
    }

    fn provider(dir: &tempfile::TempDir) -> WalkdirSearch {
        WalkdirSearch::new(dir.path(), vec!["target".to_string()])
    }

    #[tokio::test]
    async fn finds_matching_files_and_skips_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        populate(&dir).await;

        let hits = provider(&dir).search("login", 10).await.unwrap();
        let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
        assert!(paths.contains(&"auth.rs"));
        assert!(paths.contains(&"readme.md"));
        assert!(!paths.iter().any(|p| p.starts_with("target")));
    }

    #[tokio::test]
    async fn results_are_bounded_by_max_results() {
        let dir = tempfile::tempdir().unwrap();
        populate(&dir).await;

        let hits = provider(&dir).search("login", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = provider(&dir).search("   ", 10).await.unwrap_err();
        assert_eq!(err.kind, warden_common::ErrorKind::SearchFailed);
    }

    #[tokio::test]
    async fn hits_carry_size_lines_and_preview() {
        let dir = tempfile::tempdir().unwrap();
        populate(&dir).await;

        let hits = provider(&dir).search("logout", 10).await.unwrap();
        let hit = hits.iter().find(|h| h.path == "auth.rs").unwrap();
        assert_eq!(hit.line_count, 2);
        assert!(hit.size > 0);
        assert!(hit.preview.contains("logout"));
    }

    #[test]
    fn report_lists_rank_score_and_size() {
        let hits = vec![SearchHit {
            path: "src/auth.rs".to_string(),
            score: 1.5,
            line_count: 40,
            size: 2048,
            preview: "fn login() {}".to_string(),
            modified_unix: 1_700_000_000,
        }];
        let report = format_report("login", &hits);
        assert!(report.contains(" 1. src/auth.rs"));
        assert!(report.contains("score 1.50"));
        assert!(report.contains("2.0 KiB"));
        assert!(report.contains("fn login() {}"));
    }

    #[test]
    fn human_sizes_step_through_units() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MiB");
    }
}
