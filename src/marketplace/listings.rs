//! # Marketplace Listings
//!
//! [`TransportMarketplaceScraper`] fetches a release's public marketplace page
//! through the raw transport and hands the body to a [`ListingsPageParser`].
//! Page layout is a deployment concern, so the parser is injected;
//! [`HtmlListingsParser`] is a CSS-selector implementation whose selectors are
//! configurable through [`ListingSelectors`].
//!
//! The scraper is wrapped by [`crate::client::ResilientClient::listings`], which
//! supplies caching, circuit breaking, rate limiting and retries.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

use crate::client::{MarketplaceScraper, Transport, UrlBuilder};
use crate::error::{AggregatorError, AggregatorResult, TransportError};
use crate::models::{Listing, Price};

/// Turns a fetched marketplace page into listings
pub trait ListingsPageParser: Send + Sync + Debug {
    fn parse(&self, url: &str, body: &str) -> Result<Vec<Listing>, TransportError>;
}

/// [`MarketplaceScraper`] over the raw transport and an injected page parser
#[derive(Debug, Clone)]
pub struct TransportMarketplaceScraper {
    transport: Arc<dyn Transport>,
    urls: Arc<dyn UrlBuilder>,
    parser: Arc<dyn ListingsPageParser>,
}

impl TransportMarketplaceScraper {
    pub fn new(
        transport: Arc<dyn Transport>,
        urls: Arc<dyn UrlBuilder>,
        parser: Arc<dyn ListingsPageParser>,
    ) -> Self {
        Self {
            transport,
            urls,
            parser,
        }
    }
}

#[async_trait]
impl MarketplaceScraper for TransportMarketplaceScraper {
    async fn listings_for_release(&self, release_id: u64) -> Result<Vec<Listing>, TransportError> {
        let url = self.urls.marketplace_listings_url(release_id);
        let body = self.transport.get_string(&url).await?;
        let listings = self.parser.parse(&url, &body)?;

        debug!(
            release_id = release_id,
            listings = listings.len(),
            "Parsed marketplace listings"
        );
        Ok(listings)
    }
}

/// CSS selectors for one marketplace page layout
///
/// Every selector except `row` is evaluated inside a matched row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    pub row: String,
    /// Element carrying `data-pricevalue` and `data-currency`
    pub price: String,
    pub condition: String,
    pub seller_name: String,
    /// Element whose text is a percentage such as `99.8%`
    pub seller_rating: String,
    /// Element whose text carries the rating count, e.g. `1,520 ratings`
    pub rating_count: String,
    /// Element whose text is `<ships_from_label> <country>`
    pub ships_from: String,
    pub ships_from_label: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            row: "tr.shortcut_navigable".to_string(),
            price: "td.item_price span.price".to_string(),
            condition: "p.item_condition span:not(.mplabel)".to_string(),
            seller_name: "td.seller_info .seller_block a".to_string(),
            seller_rating: "td.seller_info li strong".to_string(),
            rating_count: "td.seller_info a.section_link".to_string(),
            ships_from: "td.seller_info li".to_string(),
            ships_from_label: "Ships From:".to_string(),
        }
    }
}

/// [`ListingsPageParser`] for HTML marketplace pages
///
/// Rows without a parseable price or shipping origin are skipped.
#[derive(Debug)]
pub struct HtmlListingsParser {
    row: Selector,
    price: Selector,
    condition: Selector,
    seller_name: Selector,
    seller_rating: Selector,
    rating_count: Selector,
    ships_from: Selector,
    ships_from_label: String,
}

fn selector(field: &str, css: &str) -> AggregatorResult<Selector> {
    Selector::parse(css).map_err(|e| {
        AggregatorError::Configuration(format!("invalid listings selector {field} {css:?}: {e}"))
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl HtmlListingsParser {
    pub fn new(selectors: &ListingSelectors) -> AggregatorResult<Self> {
        Ok(Self {
            row: selector("row", &selectors.row)?,
            price: selector("price", &selectors.price)?,
            condition: selector("condition", &selectors.condition)?,
            seller_name: selector("seller_name", &selectors.seller_name)?,
            seller_rating: selector("seller_rating", &selectors.seller_rating)?,
            rating_count: selector("rating_count", &selectors.rating_count)?,
            ships_from: selector("ships_from", &selectors.ships_from)?,
            ships_from_label: selectors.ships_from_label.clone(),
        })
    }

    fn first_text(&self, row: ElementRef<'_>, selector: &Selector) -> Option<String> {
        row.select(selector)
            .map(text_of)
            .find(|text| !text.is_empty())
    }

    fn price(&self, row: ElementRef<'_>) -> Option<Price> {
        let element = row.select(&self.price).next()?;
        let value = element.value().attr("data-pricevalue")?.trim().parse().ok()?;
        let currency = element.value().attr("data-currency").unwrap_or_default();
        Some(Price {
            currency: currency.to_string(),
            value,
        })
    }

    fn ships_from(&self, row: ElementRef<'_>) -> Option<String> {
        row.select(&self.ships_from)
            .map(text_of)
            .find_map(|text| {
                text.split_once(self.ships_from_label.as_str())
                    .map(|(_, country)| country.trim().to_string())
            })
            .filter(|country| !country.is_empty())
    }

    fn seller_rating(&self, row: ElementRef<'_>) -> Option<f64> {
        row.select(&self.seller_rating)
            .map(text_of)
            .find_map(|text| text.trim().strip_suffix('%').and_then(|v| v.trim().parse().ok()))
    }

    fn rating_count(&self, row: ElementRef<'_>) -> Option<u32> {
        let text = self.first_text(row, &self.rating_count)?;
        let digits: String = text
            .split_whitespace()
            .next()?
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }

    fn listing(&self, row: ElementRef<'_>) -> Option<Listing> {
        Some(Listing {
            price: self.price(row)?,
            shipping_country: self.ships_from(row)?,
            condition: self.first_text(row, &self.condition).unwrap_or_default(),
            seller_name: self.first_text(row, &self.seller_name).unwrap_or_default(),
            seller_rating: self.seller_rating(row),
            rating_count: self.rating_count(row),
        })
    }
}

impl ListingsPageParser for HtmlListingsParser {
    fn parse(&self, url: &str, body: &str) -> Result<Vec<Listing>, TransportError> {
        let document = Html::parse_document(body);
        let rows: Vec<ElementRef<'_>> = document.select(&self.row).collect();
        let listings: Vec<Listing> = rows.iter().filter_map(|row| self.listing(*row)).collect();

        if listings.len() < rows.len() {
            debug!(
                url = url,
                rows = rows.len(),
                skipped = rows.len() - listings.len(),
                "Skipped marketplace rows without price or shipping origin"
            );
        }
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <html><body><table class="mpitems"><tbody>
          <tr class="shortcut_navigable">
            <td class="item_description">
              <p class="item_condition">
                <span class="mplabel">Media:</span>
                <span>Near Mint (NM or M-)</span>
              </p>
            </td>
            <td class="seller_info"><ul>
              <li><div class="seller_block"><strong><a href="/seller/hyperdub/profile">hyperdub</a></strong></div></li>
              <li><strong>99.8%</strong>, <a class="section_link" href="#">1,520 ratings</a></li>
              <li><span class="mplabel">Ships From:</span>United Kingdom</li>
            </ul></td>
            <td class="item_price"><span class="price" data-currency="GBP" data-pricevalue="14.50">£14.50</span></td>
          </tr>
          <tr class="shortcut_navigable">
            <td class="seller_info"><ul>
              <li><div class="seller_block"><a href="/seller/x/profile">x</a></div></li>
              <li><span class="mplabel">Ships From:</span>Germany</li>
            </ul></td>
            <td class="item_price"><span class="price" data-currency="EUR" data-pricevalue="9">€9</span></td>
          </tr>
          <tr class="shortcut_navigable">
            <td class="item_price"><span class="price">n/a</span></td>
          </tr>
        </tbody></table></body></html>
    "##;

    fn parser() -> HtmlListingsParser {
        HtmlListingsParser::new(&ListingSelectors::default()).unwrap()
    }

    #[test]
    fn test_parses_listing_rows() {
        let listings = parser().parse("https://www.test/sell/release/1", PAGE).unwrap();

        assert_eq!(listings.len(), 2);
        let first = &listings[0];
        assert_eq!(first.price.value, 14.5);
        assert_eq!(first.price.currency, "GBP");
        assert_eq!(first.condition, "Near Mint (NM or M-)");
        assert_eq!(first.seller_name, "hyperdub");
        assert_eq!(first.seller_rating, Some(99.8));
        assert_eq!(first.rating_count, Some(1520));
        assert_eq!(first.shipping_country, "United Kingdom");

        let second = &listings[1];
        assert_eq!(second.shipping_country, "Germany");
        assert_eq!(second.seller_rating, None);
        assert_eq!(second.rating_count, None);
    }

    #[test]
    fn test_page_without_rows_is_empty() {
        let listings = parser().parse("u", "<html><body>No items</body></html>").unwrap();
        assert!(listings.is_empty());
    }

    #[test]
    fn test_invalid_selector_is_a_configuration_error() {
        let selectors = ListingSelectors {
            row: "tr[".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HtmlListingsParser::new(&selectors),
            Err(AggregatorError::Configuration(_))
        ));
    }
}
