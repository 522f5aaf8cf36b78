//! Entity extraction from listing pages
//!
//! A listing page holds a grid of cards, one per entity, but the card markup
//! varies between page templates. Extraction runs in two stages:
//!
//! 1. **Matcher selection.** Each record selector is tried in priority order;
//!    the first one that matches anything on the page is used for every card.
//! 2. **Field fallback chains.** Each field walks its own ordered list of
//!    strategies and keeps the first usable answer.
//!
//! | Field      | Strategies, in order                                          |
//! |------------|---------------------------------------------------------------|
//! | name       | link `title` attribute, `h3` text (minus `svg`), image `alt`  |
//! | identifier | token in the link href, token in the image `src`/`data-src`   |
//!
//! Cards that end up without a name or identifier are skipped and logged;
//! extraction itself never fails.

use crate::config::validation::{validate_id_pattern, validate_selector};
use crate::config::ExtractConfig;
use crate::model::{normalize_whitespace, EntityRecord, RawPage};
use crate::ConfigError;
use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fmt;

/// One candidate strategy for a card field
type FieldStrategy = fn(&EntityExtractor, &ElementRef<'_>) -> Option<String>;

const NAME_CHAIN: &[FieldStrategy] = &[
    EntityExtractor::name_from_link_title,
    EntityExtractor::name_from_heading,
    EntityExtractor::name_from_image_alt,
];

const IDENTIFIER_CHAIN: &[FieldStrategy] = &[
    EntityExtractor::identifier_from_link,
    EntityExtractor::identifier_from_image,
];

/// A record selector together with its source text for logging
#[derive(Debug, Clone)]
pub struct StructuralMatcher {
    source: String,
    selector: Selector,
}

impl StructuralMatcher {
    pub fn new(source: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            source: source.to_string(),
            selector: validate_selector(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn select<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document.select(&self.selector).collect()
    }
}

/// Why a card produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No strategy produced a non-empty, non-placeholder name
    MissingName,

    /// A name was found but no identifier pattern matched
    MissingIdentifier { name: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingName => write!(f, "no usable name"),
            Self::MissingIdentifier { name } => write!(f, "no identifier for '{}'", name),
        }
    }
}

/// A card that was matched but discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCard {
    /// 1-based position among the matched cards
    pub position: usize,
    pub reason: SkipReason,
}

/// Full result of extracting one page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Source of the selector that matched, if any did
    pub matcher: Option<String>,

    /// Number of cards the matcher found
    pub candidates: usize,

    /// Records in document order
    pub records: Vec<EntityRecord>,

    pub skipped: Vec<SkippedCard>,
}

/// Pulls entity records out of listing page HTML
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    matchers: Vec<StructuralMatcher>,
    link_id: Regex,
    image_id: Regex,
    placeholders: Vec<String>,
    link: Selector,
    heading: Selector,
    image: Selector,
}

impl EntityExtractor {
    /// Compiles selectors and patterns from the extract config
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a selector or pattern is invalid.
    pub fn new(config: &ExtractConfig) -> Result<Self, ConfigError> {
        let matchers = config
            .record_selectors
            .iter()
            .map(|source| StructuralMatcher::new(source))
            .collect::<Result<Vec<_>, _>>()?;

        if matchers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one record selector is required".to_string(),
            ));
        }

        Ok(Self {
            matchers,
            link_id: validate_id_pattern(&config.link_id_pattern)?,
            image_id: validate_id_pattern(&config.image_id_pattern)?,
            placeholders: config
                .placeholder_names
                .iter()
                .map(|name| name.trim().to_lowercase())
                .collect(),
            link: validate_selector("a[href]")?,
            heading: validate_selector("h3")?,
            image: validate_selector("img")?,
        })
    }

    /// Record selectors in priority order
    pub fn matchers(&self) -> &[StructuralMatcher] {
        &self.matchers
    }

    /// Returns true if any record selector matches the content
    ///
    /// The fetcher uses this to reject truncated or challenge pages.
    pub fn has_structural_marker(&self, content: &str) -> bool {
        let document = Html::parse_document(content);
        self.matchers
            .iter()
            .any(|matcher| document.select(&matcher.selector).next().is_some())
    }

    /// Extracts records from a fetched page
    pub fn extract(&self, page: &RawPage) -> Vec<EntityRecord> {
        self.extract_html(&page.content).records
    }

    /// Extracts records from raw HTML, keeping the diagnostics
    ///
    /// # Example
    ///
    /// ```
    /// use roster_crawler::config::ExtractConfig;
    /// use roster_crawler::crawler::EntityExtractor;
    ///
    /// let extractor = EntityExtractor::new(&ExtractConfig::default()).unwrap();
    /// let html = r#"<div class="actor-card">
    ///     <a href="/Actor/Detail/ab12-cd34.html" title="Aoi Sora">profile</a>
    /// </div>"#;
    /// let extraction = extractor.extract_html(html);
    /// assert_eq!(extraction.records[0].identifier, "ab12-cd34");
    /// assert_eq!(extraction.records[0].name, "Aoi Sora");
    /// ```
    pub fn extract_html(&self, html: &str) -> Extraction {
        let document = Html::parse_document(html);

        let Some((matcher, cards)) = self.select_cards(&document) else {
            tracing::warn!("No record selector matched the page");
            return Extraction::default();
        };

        let mut extraction = Extraction {
            matcher: Some(matcher.source.clone()),
            candidates: cards.len(),
            ..Extraction::default()
        };

        for (index, card) in cards.iter().enumerate() {
            let position = index + 1;
            match self.extract_card(card) {
                Ok(record) => {
                    tracing::debug!(
                        "Card {}: {} (ID: {})",
                        position,
                        record.name,
                        record.identifier
                    );
                    extraction.records.push(record);
                }
                Err(reason) => {
                    tracing::warn!("Card {} skipped: {}", position, reason);
                    extraction.skipped.push(SkippedCard { position, reason });
                }
            }
        }

        extraction
    }

    /// Picks the first matcher with at least one hit
    fn select_cards<'a>(
        &'a self,
        document: &'a Html,
    ) -> Option<(&'a StructuralMatcher, Vec<ElementRef<'a>>)> {
        self.matchers.iter().find_map(|matcher| {
            let cards = matcher.select(document);
            tracing::trace!("Selector '{}' matched {} cards", matcher.source, cards.len());
            (!cards.is_empty()).then_some((matcher, cards))
        })
    }

    fn extract_card(&self, card: &ElementRef<'_>) -> Result<EntityRecord, SkipReason> {
        let name = self.extract_name(card).ok_or(SkipReason::MissingName)?;
        let identifier = self
            .extract_identifier(card)
            .ok_or_else(|| SkipReason::MissingIdentifier { name: name.clone() })?;
        Ok(EntityRecord { name, identifier })
    }

    fn extract_name(&self, card: &ElementRef<'_>) -> Option<String> {
        NAME_CHAIN.iter().find_map(|strategy| {
            strategy(self, card)
                .map(|raw| normalize_whitespace(&raw))
                .filter(|name| self.is_usable_name(name))
        })
    }

    fn extract_identifier(&self, card: &ElementRef<'_>) -> Option<String> {
        IDENTIFIER_CHAIN
            .iter()
            .find_map(|strategy| strategy(self, card))
    }

    fn is_usable_name(&self, name: &str) -> bool {
        !name.is_empty() && !self.placeholders.contains(&name.to_lowercase())
    }

    fn primary_link<'a>(&self, card: &ElementRef<'a>) -> Option<ElementRef<'a>> {
        card.select(&self.link).next()
    }

    fn first_image<'a>(&self, card: &ElementRef<'a>) -> Option<ElementRef<'a>> {
        card.select(&self.image).next()
    }

    fn name_from_link_title(&self, card: &ElementRef<'_>) -> Option<String> {
        let link = self.primary_link(card)?;
        link.value().attr("title").map(str::to_string)
    }

    fn name_from_heading(&self, card: &ElementRef<'_>) -> Option<String> {
        let heading = card.select(&self.heading).next()?;
        let heading_id = (*heading).id();

        let parts: Vec<&str> = heading
            .descendants()
            .filter(|node| {
                !node
                    .ancestors()
                    .take_while(|ancestor| ancestor.id() != heading_id)
                    .any(|ancestor| {
                        ancestor
                            .value()
                            .as_element()
                            .map_or(false, |element| element.name() == "svg")
                    })
            })
            .filter_map(|node| node.value().as_text())
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    fn name_from_image_alt(&self, card: &ElementRef<'_>) -> Option<String> {
        let image = self.first_image(card)?;
        image.value().attr("alt").map(str::to_string)
    }

    fn identifier_from_link(&self, card: &ElementRef<'_>) -> Option<String> {
        let href = self.primary_link(card)?.value().attr("href")?;
        capture_token(&self.link_id, href)
    }

    fn identifier_from_image(&self, card: &ElementRef<'_>) -> Option<String> {
        let image = self.first_image(card)?;
        ["src", "data-src"]
            .iter()
            .filter_map(|attr| image.value().attr(attr))
            .find_map(|src| capture_token(&self.image_id, src))
    }
}

/// First capture group of `pattern` in `haystack`
fn capture_token(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)?
        .get(1)
        .map(|token| token.as_str().to_string())
        .filter(|token| !token.is_empty())
}
