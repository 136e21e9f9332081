use chrono::NaiveDate;
use serde::Serialize;

pub const NO_TITLE: &str = "No Title";
pub const UNKNOWN_ORGANIZATION: &str = "Unknown";

/// One job offer as it appears on the listing.
///
/// `id` is the last path segment of the detail link and is the key used by
/// every sink. The driver drops records that have none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub title: String,
    pub organization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency_message: Option<String>,
    /// Filled by the driver from `deadline`; only used for filtering.
    #[serde(skip)]
    pub deadline_date: Option<NaiveDate>,
}

impl Default for JobRecord {
    fn default() -> Self {
        JobRecord {
            id: None,
            url: None,
            title: NO_TITLE.to_string(),
            organization: UNKNOWN_ORGANIZATION.to_string(),
            posts_count: None,
            deadline: None,
            image_url: None,
            urgency_message: None,
            deadline_date: None,
        }
    }
}

impl JobRecord {
    /// Sets `url` and `id` from a page-relative href.
    pub fn set_link(&mut self, base_url: &str, href: &str) {
        self.url = Some(format!("{}{}", base_url.trim_end_matches('/'), href));
        self.id = id_from_href(href);
    }

    /// Title shortened for log lines.
    pub fn short_title(&self) -> String {
        self.title.chars().take(50).collect()
    }
}

/// Last path segment of a link, without query string or fragment.
pub fn id_from_href(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
