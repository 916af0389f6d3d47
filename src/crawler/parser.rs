//! HTML extraction for catalog listing and detail pages
//!
//! Listing pages yield raw `href` values (detail links and the optional
//! "next" link); resolving them is left to the worker. Detail pages yield a
//! `DetailRecord` whose missing fields are filled with placeholders rather
//! than failing the record.

use crate::config::SelectorConfig;
use crate::queue::{DetailRecord, MISSING_FIELD, UNKNOWN_RATING};
use crate::url::resolve_link;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Links found on a listing page, as written in the markup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// `href` of every detail-page link, in document order
    pub detail_links: Vec<String>,

    /// `href` of the "next page" link, if the page has one
    pub next_page: Option<String>,
}

/// Compiled CSS selectors for listing and detail pages
#[derive(Debug, Clone)]
pub struct Selectors {
    detail_link: Selector,
    next_page: Selector,
    title: Selector,
    price: Selector,
    availability: Selector,
    rating: Selector,
    category: Selector,
    description: Selector,
    image: Selector,
    product_info: Selector,
    header_cell: Selector,
    data_cell: Selector,
}

impl Selectors {
    /// Compiles every selector in `config`
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            detail_link: compile_one(&config.detail_link)?,
            next_page: compile_one(&config.next_page)?,
            title: compile_one(&config.title)?,
            price: compile_one(&config.price)?,
            availability: compile_one(&config.availability)?,
            rating: compile_one(&config.rating)?,
            category: compile_one(&config.category)?,
            description: compile_one(&config.description)?,
            image: compile_one(&config.image)?,
            product_info: compile_one(&config.product_info)?,
            header_cell: compile_one("th")?,
            data_cell: compile_one("td")?,
        })
    }
}

fn compile_one(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Extracts detail links and the next-page link from a listing page
pub fn parse_listing(html: &str, selectors: &Selectors) -> ListingPage {
    let document = Html::parse_document(html);

    let detail_links = document
        .select(&selectors.detail_link)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect();

    let next_page = document
        .select(&selectors.next_page)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .map(str::to_string);

    ListingPage {
        detail_links,
        next_page,
    }
}

/// Extracts a detail record from a detail page
///
/// `page_url` is recorded on the record and used to resolve the image link.
pub fn parse_detail(html: &str, page_url: &Url, selectors: &Selectors) -> DetailRecord {
    let document = Html::parse_document(html);
    let first = |selector: &Selector| document.select(selector).next();

    let text_or_missing = |selector: &Selector| {
        first(selector)
            .map(collapsed_text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| MISSING_FIELD.to_string())
    };

    let rating = first(&selectors.rating)
        .and_then(|element| element.value().attr("class"))
        .and_then(rating_from_class)
        .unwrap_or_else(|| UNKNOWN_RATING.to_string());

    let image_url = first(&selectors.image)
        .and_then(|element| element.value().attr("src"))
        .and_then(|src| resolve_link(page_url, src).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| MISSING_FIELD.to_string());

    let product_information = document
        .select(&selectors.product_info)
        .filter_map(|row| {
            let name = row.select(&selectors.header_cell).next().map(collapsed_text)?;
            let value = row
                .select(&selectors.data_cell)
                .next()
                .map(collapsed_text)
                .unwrap_or_default();
            (!name.is_empty()).then_some((name, value))
        })
        .collect();

    DetailRecord {
        title: text_or_missing(&selectors.title),
        price: text_or_missing(&selectors.price),
        availability: text_or_missing(&selectors.availability),
        rating,
        category: text_or_missing(&selectors.category),
        description: text_or_missing(&selectors.description),
        image_url,
        url: page_url.to_string(),
        product_information,
    }
}

/// Element text with runs of whitespace collapsed to single spaces
fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The rating word is the last class: `star-rating Three` -> `Three`
fn rating_from_class(class: &str) -> Option<String> {
    let words: Vec<&str> = class.split_whitespace().collect();
    match words.as_slice() {
        [.., _, last] => Some((*last).to_string()),
        _ => None,
    }
}
