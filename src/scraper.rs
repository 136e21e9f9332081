use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use log::{error, info, warn};

use crate::date_parser::parse_french_date;
use crate::delay_manager;
use crate::extractor::Extractor;
use crate::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::record::JobRecord;

pub const DEFAULT_BASE_URL: &str = "https://www.emploi-public.ma";
pub const DEFAULT_LISTING_PATH: &str = "/fr/concours-liste";

/// How a parsed deadline is compared to the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutoffComparison {
    /// Keep deadlines at or after the cutoff.
    #[default]
    Inclusive,
    /// Keep deadlines strictly after the cutoff.
    Strict,
}

/// What to do with records whose deadline is missing or unparsable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndatedPolicy {
    #[default]
    Keep,
    Drop,
}

/// What to do once every attempt at a page has failed transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryExhaustion {
    #[default]
    AbortRun,
    SkipPage,
}

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub base_url: String,
    pub listing_url: String,
    pub cutoff: NaiveDateTime,
    pub comparison: CutoffComparison,
    pub undated: UndatedPolicy,
    pub max_attempts: u32,
    pub backoff_step: Duration,
    pub on_retry_exhausted: RetryExhaustion,
    /// With [`RetryExhaustion::SkipPage`], stop after this many pages in a row were skipped.
    pub max_consecutive_skips: u32,
    pub page_delay: Duration,
    pub max_pages: Option<u32>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        ScrapeOptions {
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_url: format!("{}{}", DEFAULT_BASE_URL, DEFAULT_LISTING_PATH),
            cutoff: Local::now().date_naive().and_time(NaiveTime::MIN),
            comparison: CutoffComparison::default(),
            undated: UndatedPolicy::default(),
            max_attempts: 3,
            backoff_step: Duration::from_secs(5),
            on_retry_exhausted: RetryExhaustion::default(),
            max_consecutive_skips: 3,
            page_delay: Duration::from_secs(2),
            max_pages: None,
        }
    }
}

/// Why pagination ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    LastPage,
    EmptyPage { page: u32 },
    UpstreamRejected { page: u32, status: u16 },
    RetriesExhausted { page: u32 },
    FetchFailed { page: u32 },
    PageLimit { limit: u32 },
}

#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub records: Vec<JobRecord>,
    pub pages_fetched: u32,
    pub discarded: usize,
    pub stop: StopReason,
}

enum Attempt {
    Fetched(FetchedPage),
    Exhausted(FetchError),
    Failed(FetchError),
}

pub struct Scraper<F: PageFetcher> {
    fetcher: F,
    extractor: Extractor,
    options: ScrapeOptions,
}

impl<F: PageFetcher> Scraper<F> {
    pub fn new(fetcher: F, options: ScrapeOptions) -> Self {
        Scraper {
            fetcher,
            extractor: Extractor::new(),
            options,
        }
    }

    /// Walks the listing from page 1, keeping the records that pass the deadline cutoff.
    ///
    /// Never fails: every stop condition ends the walk and returns what was
    /// accumulated so far, with the reason in [`ScrapeReport::stop`].
    pub fn scrape_all(&self) -> ScrapeReport {
        let mut report = ScrapeReport::default();
        let mut page_number = 1;
        let mut consecutive_skips = 0;

        let stop = loop {
            if let Some(limit) = self.options.max_pages {
                if page_number > limit {
                    info!("Reached the page limit ({}).", limit);
                    break StopReason::PageLimit { limit };
                }
            }

            info!("Scraping page {}...", page_number);
            let fetched = match self.fetch_with_retry(Some(page_number)) {
                Attempt::Fetched(page) => page,
                Attempt::Exhausted(e) => match self.options.on_retry_exhausted {
                    RetryExhaustion::SkipPage => {
                        consecutive_skips += 1;
                        if consecutive_skips >= self.options.max_consecutive_skips.max(1) {
                            error!(
                                "Failed to scrape page {} ({}), {} pages skipped in a row. Stopping.",
                                page_number, e, consecutive_skips
                            );
                            break StopReason::RetriesExhausted { page: page_number };
                        }
                        warn!("Failed to scrape page {} ({}). Skipping.", page_number, e);
                        page_number += 1;
                        delay_manager::page_delay(self.options.page_delay);
                        continue;
                    }
                    RetryExhaustion::AbortRun => {
                        error!("Failed to scrape page {} ({}). Stopping.", page_number, e);
                        break StopReason::RetriesExhausted { page: page_number };
                    }
                },
                Attempt::Failed(e) => {
                    error!("Error on page {}: {}", page_number, e);
                    break StopReason::FetchFailed { page: page_number };
                }
            };
            consecutive_skips = 0;

            if !fetched.is_success() {
                info!("Stopped: Status code {} at page {}", fetched.status, page_number);
                break StopReason::UpstreamRejected { page: page_number, status: fetched.status };
            }
            report.pages_fetched += 1;

            let listing = self.extractor.parse_listing(&fetched.body, &self.options.base_url);
            if listing.records.is_empty() {
                info!("No more items found on page {}. Stopping.", page_number);
                break StopReason::EmptyPage { page: page_number };
            }

            for record in listing.records {
                match self.admit(record) {
                    Some(record) => report.records.push(record),
                    None => report.discarded += 1,
                }
            }

            if !listing.has_next_page {
                info!("No 'Next' button found. Reached last page.");
                break StopReason::LastPage;
            }

            page_number += 1;
            delay_manager::page_delay(self.options.page_delay);
        };
        report.stop = stop;

        info!(
            "Scraped {} jobs from {} pages ({} skipped), stop reason: {:?}",
            report.records.len(),
            report.pages_fetched,
            report.discarded,
            report.stop
        );
        report
    }

    /// Scrapes the "Dernière chance pour postuler" section of the listing's first page.
    ///
    /// Deadlines are parsed but not filtered against the cutoff.
    pub fn scrape_last_chance(&self) -> ScrapeReport {
        let mut report = ScrapeReport::default();

        let fetched = match self.fetch_with_retry(None) {
            Attempt::Fetched(page) => page,
            Attempt::Exhausted(e) => {
                error!("Failed to fetch the last chance offers: {}", e);
                report.stop = StopReason::RetriesExhausted { page: 1 };
                return report;
            }
            Attempt::Failed(e) => {
                error!("Failed to fetch the last chance offers: {}", e);
                report.stop = StopReason::FetchFailed { page: 1 };
                return report;
            }
        };

        if !fetched.is_success() {
            warn!("Stopped: Status code {} for the last chance offers", fetched.status);
            report.stop = StopReason::UpstreamRejected { page: 1, status: fetched.status };
            return report;
        }
        report.pages_fetched = 1;

        report.records = self
            .extractor
            .extract_last_chance(&fetched.body, &self.options.base_url)
            .into_iter()
            .map(|mut record| {
                record.deadline_date = record.deadline.as_deref().and_then(parse_french_date);
                record
            })
            .collect();

        info!("Scraped {} last chance offers", report.records.len());
        report
    }

    fn fetch_with_retry(&self, page: Option<u32>) -> Attempt {
        let url = &self.options.listing_url;
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.fetcher.fetch(url, page) {
                Ok(fetched) => return Attempt::Fetched(fetched),
                Err(e) if !e.is_transient() => return Attempt::Failed(e),
                Err(e) if attempt >= max_attempts => return Attempt::Exhausted(e),
                Err(e) => {
                    warn!(
                        "{} on page {}, retrying ({}/{})...",
                        e,
                        page.unwrap_or(1),
                        attempt,
                        max_attempts
                    );
                    delay_manager::retry_delay(self.options.backoff_step, attempt);
                    attempt += 1;
                }
            }
        }
    }

    /// Applies the id requirement and the deadline cutoff to one extracted record.
    fn admit(&self, mut record: JobRecord) -> Option<JobRecord> {
        if record.id.is_none() {
            warn!("Skipped job without id: {}", record.short_title());
            return None;
        }

        record.deadline_date = record.deadline.as_deref().and_then(parse_french_date);

        let keep = match record.deadline_date {
            Some(date) => {
                let deadline = date.and_time(NaiveTime::MIN);
                match self.options.comparison {
                    CutoffComparison::Inclusive => deadline >= self.options.cutoff,
                    CutoffComparison::Strict => deadline > self.options.cutoff,
                }
            }
            None => self.options.undated == UndatedPolicy::Keep,
        };

        let deadline = record.deadline.as_deref().unwrap_or("N/A");
        if keep {
            info!("Added job: {}... (Deadline: {})", record.short_title(), deadline);
            Some(record)
        } else {
            info!(
                "Skipped job: {}... (Deadline: {} - expired or invalid)",
                record.short_title(),
                deadline
            );
            None
        }
    }
}
