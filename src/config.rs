use std::env;

use chrono::NaiveDateTime;
use dotenvy::dotenv;
use url::Url;

use crate::date_parser::parse_cutoff;
use crate::error::ConfigError;
use crate::scraper::{DEFAULT_BASE_URL, DEFAULT_LISTING_PATH};
use crate::sink::ServiceAccount;

pub const SERVICE_ACCOUNT_VAR: &str = "FIREBASE_SERVICE_ACCOUNT";
pub const CUTOFF_VAR: &str = "SCRAPE_CUTOFF_DATE";
pub const BASE_URL_VAR: &str = "EMPLOI_PUBLIC_BASE_URL";
pub const LISTING_URL_VAR: &str = "EMPLOI_PUBLIC_LISTING_URL";

/// Settings read from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub service_account: Option<String>,
    pub cutoff: Option<String>,
    pub base_url: String,
    pub listing_url: String,
}

impl Settings {
    /// Load settings from environment variables, after a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = non_empty(BASE_URL_VAR)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let listing_url = non_empty(LISTING_URL_VAR)
            .unwrap_or_else(|| format!("{}{}", base_url, DEFAULT_LISTING_PATH));
        validate_url(&base_url)?;
        validate_url(&listing_url)?;

        Ok(Settings {
            service_account: non_empty(SERVICE_ACCOUNT_VAR),
            cutoff: non_empty(CUTOFF_VAR),
            base_url,
            listing_url,
        })
    }

    /// The parsed service account. Its absence is fatal for the Firestore sink.
    pub fn require_service_account(&self) -> Result<ServiceAccount, ConfigError> {
        let blob = self
            .service_account
            .as_deref()
            .ok_or(ConfigError::MissingCredential)?;
        ServiceAccount::from_json(blob)
    }

    /// The cutoff from `override_value` or the environment, `None` meaning "now".
    pub fn cutoff(&self, override_value: Option<&str>) -> Result<Option<NaiveDateTime>, ConfigError> {
        match override_value.or(self.cutoff.as_deref()) {
            Some(text) => parse_cutoff(text)
                .map(Some)
                .ok_or_else(|| ConfigError::InvalidCutoff(text.to_string())),
            None => Ok(None),
        }
    }
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    Url::parse(url).map(|_| ()).map_err(|e| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::NaiveDate;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_emploi_public() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings.base_url, "https://www.emploi-public.ma");
        assert_eq!(settings.listing_url, "https://www.emploi-public.ma/fr/concours-liste");
        assert!(settings.service_account.is_none());
        assert_eq!(settings.cutoff(None).unwrap(), None);
    }

    #[test]
    fn missing_credential_is_fatal() {
        let err = settings(&[]).unwrap().require_service_account().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential));

        let blank = settings(&[(SERVICE_ACCOUNT_VAR, "  ")]).unwrap();
        assert!(matches!(blank.require_service_account(), Err(ConfigError::MissingCredential)));
    }

    #[test]
    fn garbled_credential_is_invalid() {
        let settings = settings(&[(SERVICE_ACCOUNT_VAR, "{not json")]).unwrap();
        assert!(matches!(
            settings.require_service_account(),
            Err(ConfigError::InvalidCredential(_))
        ));
    }

    #[test]
    fn cutoff_override_wins() {
        let settings = settings(&[(CUTOFF_VAR, "15 Janvier 2026")]).unwrap();
        let midnight = |d| NaiveDate::from_ymd_opt(2026, 1, d).unwrap().and_hms_opt(0, 0, 0);

        assert_eq!(settings.cutoff(None).unwrap(), midnight(15));
        assert_eq!(settings.cutoff(Some("20 janvier 2026")).unwrap(), midnight(20));
    }

    #[test]
    fn unparsable_cutoff_is_rejected() {
        let settings = settings(&[(CUTOFF_VAR, "2026-01-15")]).unwrap();
        assert!(matches!(settings.cutoff(None), Err(ConfigError::InvalidCutoff(_))));
    }

    #[test]
    fn custom_base_url_drives_listing_url() {
        let local = settings(&[(BASE_URL_VAR, "http://localhost:8080/")]).unwrap();
        assert_eq!(local.base_url, "http://localhost:8080");
        assert_eq!(local.listing_url, "http://localhost:8080/fr/concours-liste");

        assert!(matches!(
            settings(&[(LISTING_URL_VAR, "not a url")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
