pub mod config;
pub mod date_parser;
pub mod delay_manager;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod logger;
pub mod record;
pub mod scraper;
pub mod sink;

// Exporting types for convenience
pub use config::Settings;
pub use date_parser::parse_french_date;
pub use error::{ConfigError, SinkError};
pub use extractor::Extractor;
pub use fetcher::{FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use record::JobRecord;
pub use scraper::{CutoffComparison, RetryExhaustion, ScrapeOptions, ScrapeReport, Scraper, StopReason, UndatedPolicy};
pub use sink::{FirestoreSink, JsonStoreSink, MemorySink, Sink};
