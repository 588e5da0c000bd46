use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};

use crate::error::BatchError;
use crate::models::{non_empty, ProviderKind, TrackJob};

/// Values given on the command line. CSV rows fall back to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDefaults {
    pub metadata_url: Option<String>,
    pub provider: Option<ProviderKind>,
}

impl JobDefaults {
    pub fn job(&self, download_url: &str) -> TrackJob {
        TrackJob {
            download_url: download_url.trim().to_string(),
            metadata_url: self.metadata_url.clone(),
            provider: self.provider,
        }
    }
}

pub fn load_jobs(path: &Path, defaults: &JobDefaults) -> Result<Vec<TrackJob>> {
    let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    let jobs = read_jobs(file, defaults);
    info!("Loaded {} track(s) from {}", jobs.len(), path.display());
    Ok(jobs)
}

/// Reads `download_url,metadata_url,meta_source` rows without a header.
/// Bad rows are skipped with a warning.
pub fn read_jobs(reader: impl Read, defaults: &JobDefaults) -> Vec<TrackJob> {
    let mut rows = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut jobs = Vec::new();
    for (index, record) in rows.records().enumerate() {
        let fallback_line = index as u64 + 1;
        let parsed = record
            .map_err(|e| BatchError::MalformedRow {
                line: e.position().map_or(fallback_line, |p| p.line()),
                reason: e.to_string(),
            })
            .and_then(|record| {
                let line = record.position().map_or(fallback_line, |p| p.line());
                parse_row(&record, line, defaults)
            });

        match parsed {
            Ok(job) => jobs.push(job),
            Err(e) => warn!("Skipping {}", e),
        }
    }
    jobs
}

fn parse_row(record: &StringRecord, line: u64, defaults: &JobDefaults) -> Result<TrackJob, BatchError> {
    let field = |i: usize| non_empty(record.get(i).map(str::to_string));

    let download_url = field(0).ok_or_else(|| BatchError::MalformedRow {
        line,
        reason: "missing download URL".to_string(),
    })?;
    if !(download_url.starts_with("http://") || download_url.starts_with("https://")) {
        return Err(BatchError::MalformedRow {
            line,
            reason: format!("'{}' is not an http(s) URL", download_url),
        });
    }

    let provider = match field(2) {
        Some(code) => match code.parse::<ProviderKind>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                warn!("Row {}: {}, ignoring it", line, e);
                None
            }
        },
        None => defaults.provider,
    };

    Ok(TrackJob {
        download_url,
        metadata_url: field(1).or_else(|| defaults.metadata_url.clone()),
        provider,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(jobs: &[TrackJob]) -> Vec<&str> {
        jobs.iter().map(|j| j.download_url.as_str()).collect()
    }

    #[test]
    fn test_rows_with_optional_columns() {
        let input = "\
https://youtube.com/watch?v=a
https://youtube.com/watch?v=b, https://musicbrainz.org/recording/x ,mb
https://music.youtube.com/watch?v=c,,IT
";
        let jobs = read_jobs(input.as_bytes(), &JobDefaults::default());
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].metadata_url, None);
        assert_eq!(jobs[0].provider, None);
        assert_eq!(
            jobs[1].metadata_url.as_deref(),
            Some("https://musicbrainz.org/recording/x")
        );
        assert_eq!(jobs[1].provider, Some(ProviderKind::MusicBrainz));
        assert_eq!(jobs[2].metadata_url, None);
        assert_eq!(jobs[2].provider, Some(ProviderKind::ITunes));
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let input = "\
,https://musicbrainz.org/recording/x
not-a-url
https://youtube.com/watch?v=ok
";
        let jobs = read_jobs(input.as_bytes(), &JobDefaults::default());
        assert_eq!(urls(&jobs), vec!["https://youtube.com/watch?v=ok"]);
    }

    #[test]
    fn test_blank_fields_inherit_cli_values() {
        let defaults = JobDefaults {
            metadata_url: Some("https://music.apple.com/us/album/x/1?i=2".to_string()),
            provider: Some(ProviderKind::ITunes),
        };
        let input = "\
https://youtube.com/watch?v=a,,
https://youtube.com/watch?v=b,https://musicbrainz.org/recording/y,mb
";
        let jobs = read_jobs(input.as_bytes(), &defaults);
        assert_eq!(jobs[0].metadata_url, defaults.metadata_url);
        assert_eq!(jobs[0].provider, Some(ProviderKind::ITunes));
        assert_eq!(
            jobs[1].metadata_url.as_deref(),
            Some("https://musicbrainz.org/recording/y")
        );
        assert_eq!(jobs[1].provider, Some(ProviderKind::MusicBrainz));
    }

    #[test]
    fn test_unknown_source_means_no_override() {
        let defaults = JobDefaults {
            metadata_url: None,
            provider: Some(ProviderKind::MusicBrainz),
        };
        let jobs = read_jobs("https://youtube.com/watch?v=a,,spotify\n".as_bytes(), &defaults);
        assert_eq!(jobs[0].provider, None);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let input = "# my list\n\nhttps://youtube.com/watch?v=a\n";
        let jobs = read_jobs(input.as_bytes(), &JobDefaults::default());
        assert_eq!(urls(&jobs), vec!["https://youtube.com/watch?v=a"]);
    }

    #[test]
    fn test_load_jobs_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tracks.csv");
        std::fs::write(&path, "https://youtube.com/watch?v=a\n").unwrap();
        let jobs = load_jobs(&path, &JobDefaults::default()).unwrap();
        assert_eq!(jobs.len(), 1);

        assert!(load_jobs(&dir.path().join("missing.csv"), &JobDefaults::default()).is_err());
    }
}
