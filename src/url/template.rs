use crate::config::SiteConfig;
use crate::ConfigError;
use std::fmt;
use url::Url;

/// Builds listing page URLs for one run
#[derive(Debug, Clone)]
pub struct ListingTemplate {
    base: Url,
    bucket: String,
    subcategory: String,
}

impl ListingTemplate {
    /// Creates a template from the site section of the config
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the base URL does not parse.
    pub fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        let mut base = Url::parse(&site.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", site.base_url, e)))?;

        // Url::join replaces the last segment unless the path ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            bucket: site.bucket.clone(),
            subcategory: site.subcategory.clone(),
        })
    }

    /// Returns the request for a 1-based page number
    ///
    /// # Example
    ///
    /// ```
    /// use roster_crawler::config::SiteConfig;
    /// use roster_crawler::url::ListingTemplate;
    ///
    /// let template = ListingTemplate::new(&SiteConfig::default()).unwrap();
    /// let request = template.page(3).unwrap();
    /// assert_eq!(request.url.as_str(), "https://www.javrate.com/actor/list/1-0-3.html");
    /// ```
    pub fn page(&self, page_number: u32) -> Result<PageRequest, ConfigError> {
        if page_number == 0 {
            return Err(ConfigError::Validation(
                "page numbers start at 1".to_string(),
            ));
        }

        let relative = format!(
            "actor/list/{}-{}-{}.html",
            self.bucket, self.subcategory, page_number
        );
        let url = self
            .base
            .join(&relative)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", relative, e)))?;

        Ok(PageRequest { page_number, url })
    }
}

impl fmt::Display for ListingTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}actor/list/{}-{}-{{page}}.html",
            self.base, self.bucket, self.subcategory
        )
    }
}

/// A single listing page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based position in the listing
    pub page_number: u32,

    /// Absolute URL of the page
    pub url: Url,
}
