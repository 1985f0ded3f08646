//! Assembly of the wide price-history table from per-item downloads.
//!
//! Each tracked card has one download file in the download directory. The
//! builder fetches files that are not cached yet, then reads every file and
//! outer-joins the series into a [`PriceHistoryTable`].

use crate::history_csv::read_item_series;
use crate::pacing::{Poller, Sleeper, ThreadSleeper};
use lotscout_core::config::HistoryConfig;
use lotscout_core::{CardId, ItemKey, PriceHistoryTable, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a price source did for one fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The file was written before `fetch` returned.
    Complete,
    /// A download was started and the file will appear later.
    Started,
    /// The source cannot fetch this item.
    Unavailable,
}

/// A source of per-item daily price series.
#[cfg_attr(test, mockall::automock)]
pub trait PriceSource {
    /// Request `card`'s series to be stored at `dest`.
    fn fetch(&mut self, card: &CardId, dest: &Path) -> Result<FetchStatus>;
}

/// Source for downloads placed in the download directory out of band.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

impl PriceSource for OfflineSource {
    fn fetch(&mut self, card: &CardId, _dest: &Path) -> Result<FetchStatus> {
        debug!(item = %card.column_name(), "offline source, not fetching");
        Ok(FetchStatus::Unavailable)
    }
}

/// Outcome of a build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// The assembled table.
    pub table: PriceHistoryTable,
    /// Items fetched during this run.
    pub fetched: Vec<ItemKey>,
    /// Items whose download was already present.
    pub cached: Vec<ItemKey>,
    /// Items whose fetch failed or timed out.
    pub failed: Vec<ItemKey>,
    /// Items without a download file.
    pub missing: Vec<ItemKey>,
    /// Items whose download was empty or unreadable (deleted).
    pub empty: Vec<ItemKey>,
}

/// Builds the price-history table for a card list.
pub struct HistoryBuilder<P: PriceSource, S: Sleeper = ThreadSleeper> {
    source: P,
    poller: Poller<S>,
    download_dir: PathBuf,
    force_refresh: bool,
    fetch_delay: Duration,
}

impl<P: PriceSource> HistoryBuilder<P, ThreadSleeper> {
    /// Create a builder that sleeps on the current thread.
    pub fn new(source: P, config: &HistoryConfig) -> Self {
        Self::with_sleeper(source, ThreadSleeper, config)
    }
}

impl<P: PriceSource, S: Sleeper> HistoryBuilder<P, S> {
    /// Create a builder with a custom sleeper.
    pub fn with_sleeper(source: P, sleeper: S, config: &HistoryConfig) -> Self {
        let timeout = Duration::from_millis(config.download_timeout_ms);
        let interval = Duration::from_millis(config.download_poll_interval_ms);
        Self {
            source,
            poller: Poller::with_sleeper(timeout, interval, sleeper),
            download_dir: config.download_dir.clone(),
            force_refresh: config.force_refresh,
            fetch_delay: Duration::from_millis(config.fetch_delay_ms),
        }
    }

    /// Fetch uncached items, then assemble the table.
    pub fn build(&mut self, cards: &[CardId]) -> Result<BuildReport> {
        std::fs::create_dir_all(&self.download_dir)?;
        let mut report = BuildReport::default();

        self.fetch_all(cards, &mut report);

        let mut seen = HashSet::new();
        let mut series = Vec::with_capacity(cards.len());
        for card in cards {
            let key = card.column_name();
            if !seen.insert(key.clone()) {
                warn!(item = %key, "duplicate card in list, skipping");
                continue;
            }
            let path = self.download_path(card);
            if !path.exists() {
                warn!(item = %key, path = %path.display(), "no download file");
                report.missing.push(key);
                continue;
            }
            match read_download(&path) {
                Ok(points) if !points.is_empty() => series.push((key, points)),
                outcome => {
                    if let Err(e) = outcome {
                        warn!(item = %key, error = %e, "unreadable download");
                    } else {
                        warn!(item = %key, "empty download");
                    }
                    // Removed so the next run fetches it again.
                    if let Err(e) = std::fs::remove_file(&path) {
                        warn!(item = %key, error = %e, "could not delete download");
                    }
                    report.empty.push(key);
                }
            }
        }

        report.table = PriceHistoryTable::from_series(series)?;
        info!(
            items = report.table.column_count(),
            days = report.table.row_count(),
            fetched = report.fetched.len(),
            cached = report.cached.len(),
            missing = report.missing.len(),
            empty = report.empty.len(),
            "price history assembled"
        );
        Ok(report)
    }

    fn download_path(&self, card: &CardId) -> PathBuf {
        self.download_dir.join(card.download_file_name())
    }

    fn fetch_all(&mut self, cards: &[CardId], report: &mut BuildReport) {
        let mut requests = 0usize;
        for card in cards {
            let key = card.column_name();
            let dest = self.download_path(card);
            if dest.exists() && !self.force_refresh {
                debug!(item = %key, "cached");
                report.cached.push(key);
                continue;
            }
            if dest.exists() {
                if let Err(e) = std::fs::remove_file(&dest) {
                    warn!(item = %key, error = %e, "could not remove stale download");
                }
            }

            if requests > 0 {
                self.poller.pause(self.fetch_delay);
            }
            requests += 1;

            match self.source.fetch(card, &dest) {
                Ok(FetchStatus::Complete) => {
                    info!(item = %key, "fetched");
                    report.fetched.push(key);
                }
                Ok(FetchStatus::Started) => {
                    match self.poller.wait_for(|| Ok(dest.exists().then_some(()))) {
                        Ok(()) => {
                            info!(item = %key, "fetched");
                            report.fetched.push(key);
                        }
                        Err(e) => {
                            warn!(item = %key, error = %e, "download did not land");
                            report.failed.push(key);
                        }
                    }
                }
                Ok(FetchStatus::Unavailable) => {}
                Err(e) => {
                    warn!(item = %key, error = %e, "fetch failed");
                    report.failed.push(key);
                }
            }
        }
    }
}

fn read_download(path: &Path) -> Result<BTreeMap<chrono::NaiveDate, f64>> {
    read_item_series(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history_csv::write_price_history;
    use lotscout_core::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Vec<Duration>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.slept.push(duration);
        }
    }

    static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn scratch_dir(tag: &str) -> PathBuf {
        let n = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "lotscout-history-{}-{}-{}",
            tag,
            std::process::id(),
            n
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn config(dir: &Path) -> HistoryConfig {
        HistoryConfig {
            download_dir: dir.to_path_buf(),
            fetch_delay_ms: 600,
            download_timeout_ms: 1000,
            download_poll_interval_ms: 300,
            ..HistoryConfig::default()
        }
    }

    fn cards() -> Vec<CardId> {
        vec![
            CardId::new("Black Lotus", "LEA", None),
            CardId::new("Plains", "LEA", Some("A".to_string())),
        ]
    }

    fn write_download(dest: &Path, card: &CardId) -> Result<FetchStatus> {
        let body = if card.name == "Plains" {
            "2021-01-02, 1.5\n"
        } else {
            "2021-01-01, 10\n2021-01-02, 12\n"
        };
        std::fs::write(dest, body)?;
        Ok(FetchStatus::Complete)
    }

    #[test]
    fn test_build_fetches_then_caches() {
        let dir = scratch_dir("cache");
        let cfg = config(&dir);

        let mut source = MockPriceSource::new();
        source
            .expect_fetch()
            .times(2)
            .returning(|card, dest| write_download(dest, card));
        let mut builder = HistoryBuilder::with_sleeper(source, RecordingSleeper::default(), &cfg);
        let first = builder.build(&cards()).unwrap();
        assert_eq!(first.fetched.len(), 2);
        assert_eq!(first.table.column_names(), &["Black Lotus_LEA", "Plains_LEA_A"]);
        assert_eq!(first.table.row_count(), 2);
        assert_eq!(builder.poller.sleeper().slept, vec![Duration::from_millis(600)]);

        let mut cached_source = MockPriceSource::new();
        cached_source.expect_fetch().times(0);
        let mut builder =
            HistoryBuilder::with_sleeper(cached_source, RecordingSleeper::default(), &cfg);
        let second = builder.build(&cards()).unwrap();
        assert_eq!(second.cached.len(), 2);
        assert!(second.fetched.is_empty());

        let mut a = Vec::new();
        let mut b = Vec::new();
        write_price_history(&mut a, &first.table).unwrap();
        write_price_history(&mut b, &second.table).unwrap();
        assert_eq!(a, b);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_force_refresh_refetches() {
        let dir = scratch_dir("force");
        let mut cfg = config(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Black Lotus [LEA].csv"), "2020-01-01, 1\n").unwrap();
        cfg.force_refresh = true;

        let mut source = MockPriceSource::new();
        source
            .expect_fetch()
            .times(2)
            .returning(|card, dest| write_download(dest, card));
        let mut builder = HistoryBuilder::with_sleeper(source, RecordingSleeper::default(), &cfg);
        let report = builder.build(&cards()).unwrap();
        assert!(report.cached.is_empty());
        let lotus = report.table.column("Black Lotus_LEA").unwrap();
        assert_eq!(lotus.iter().flatten().count(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failed_fetch_is_missing() {
        let dir = scratch_dir("failed");
        let cfg = config(&dir);

        let mut source = MockPriceSource::new();
        source.expect_fetch().returning(|card, dest| {
            if card.name == "Plains" {
                Err(Error::external("503"))
            } else {
                write_download(dest, card)
            }
        });
        let mut builder = HistoryBuilder::with_sleeper(source, RecordingSleeper::default(), &cfg);
        let report = builder.build(&cards()).unwrap();
        assert_eq!(report.failed, vec!["Plains_LEA_A".to_string()]);
        assert_eq!(report.missing, vec!["Plains_LEA_A".to_string()]);
        assert_eq!(report.table.column_names(), &["Black Lotus_LEA"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_download_deleted() {
        let dir = scratch_dir("empty");
        let cfg = config(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Black Lotus [LEA].csv"), "").unwrap();
        std::fs::write(dir.join("Plains _A_ [LEA].csv"), "2021-01-01, 2\n").unwrap();

        let mut builder =
            HistoryBuilder::with_sleeper(OfflineSource, RecordingSleeper::default(), &cfg);
        let report = builder.build(&cards()).unwrap();
        assert_eq!(report.empty, vec!["Black Lotus_LEA".to_string()]);
        assert!(!dir.join("Black Lotus [LEA].csv").exists());
        assert_eq!(report.table.column_names(), &["Plains_LEA_A"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_started_download_times_out() {
        let dir = scratch_dir("timeout");
        let cfg = config(&dir);

        let mut source = MockPriceSource::new();
        source.expect_fetch().returning(|_, _| Ok(FetchStatus::Started));
        let mut builder = HistoryBuilder::with_sleeper(source, RecordingSleeper::default(), &cfg);
        let report = builder.build(&cards()[..1]).unwrap();
        assert_eq!(report.failed, vec!["Black Lotus_LEA".to_string()]);
        assert!(report.table.is_empty());

        // Steps of the configured interval, the last one cut to the timeout
        let slept = &builder.poller.sleeper().slept;
        assert_eq!(
            slept,
            &vec![
                Duration::from_millis(300),
                Duration::from_millis(300),
                Duration::from_millis(300),
                Duration::from_millis(100),
            ]
        );
        let waited: Duration = slept.iter().sum();
        assert_eq!(waited, Duration::from_millis(1000));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_offline_source_reports_missing() {
        let dir = scratch_dir("offline");
        let cfg = config(&dir);
        let mut builder =
            HistoryBuilder::with_sleeper(OfflineSource, RecordingSleeper::default(), &cfg);
        let report = builder.build(&cards()).unwrap();
        assert_eq!(report.missing.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(report.table.column_count(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
