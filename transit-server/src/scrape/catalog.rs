//! Line listing extraction.
//!
//! Each line type has a listing page whose portfolio container holds one
//! anchor per line, labelled "Linia 35" (or "Line 35" on the English site).

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::domain::{Catalog, LineId, LineRecord, LineType};

/// Container that holds the line anchors once the listing has rendered.
pub const LISTING_SELECTOR: &str = "div.tzPortfolio";

/// Anchor labels that introduce a line identifier.
const LINE_LABELS: [&str; 2] = ["Linia", "Line"];

static LINE_ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.tzPortfolio a").expect("static selector is valid"));

/// Identifier named by an anchor's text, if it reads "<label> <identifier>".
///
/// Anything other than exactly two whitespace-separated tokens with a
/// known label is not a line anchor.
pub fn anchor_line_id(text: &str) -> Option<LineId> {
    let mut tokens = text.split_whitespace();
    let label = tokens.next()?;
    let id = tokens.next()?;

    if tokens.next().is_some() {
        return None;
    }

    if !LINE_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
        return None;
    }

    LineId::parse_normalized(id).ok()
}

/// Every line anchor on the page, with its href resolved against `page_url`.
fn line_anchors<'a>(
    document: &'a Html,
    page_url: &'a Url,
) -> impl Iterator<Item = (LineId, String)> + 'a {
    document.select(&LINE_ANCHORS).filter_map(move |anchor| {
        let id = anchor_line_id(&element_text(anchor))?;
        let href = anchor.value().attr("href")?;
        match page_url.join(href) {
            Ok(url) => Some((id, url.to_string())),
            Err(e) => {
                debug!(line = %id, href, error = %e, "Skipping anchor with unusable href");
                None
            }
        }
    })
}

/// Extract all lines advertised on a listing page, stamped with `line_type`.
///
/// Anchors that don't name a line are ignored. If an identifier appears
/// twice, the later anchor wins.
pub fn extract_catalog(document: &Html, page_url: &Url, line_type: LineType) -> Catalog {
    line_anchors(document, page_url)
        .map(|(id, url)| (id, LineRecord::new(url, line_type)))
        .collect()
}

/// URL of the detail page for `id`, if the listing advertises it.
pub fn find_line_url(document: &Html, page_url: &Url, id: &LineId) -> Option<String> {
    line_anchors(document, page_url)
        .find(|(candidate, _)| candidate == id)
        .map(|(_, url)| url)
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <nav><a href="/index.php/ro/">Linia 1</a></nav>
          <div class="tzPortfolio">
            <div class="item"><a href="/index.php/ro/orare-linii/linii-urbane/linia-35">Linia 35</a></div>
            <div class="item"><a href="https://ctpcj.ro/index.php/ro/orare-linii/linii-urbane/linia-3">
                Linia   3
            </a></div>
            <div class="item"><a href="linia-24b">Line 24b</a></div>
            <div class="item"><a href="/contact">Contact</a></div>
            <div class="item"><a href="/x">Linia 35 noua</a></div>
            <div class="item"><a>Linia 8</a></div>
          </div>
        </body></html>
    "#;

    fn page_url() -> Url {
        Url::parse("https://ctpcj.ro/index.php/ro/orare-linii/linii-urbane/").unwrap()
    }

    fn id(s: &str) -> LineId {
        LineId::parse_normalized(s).unwrap()
    }

    #[test]
    fn anchor_text_patterns() {
        assert_eq!(anchor_line_id("Linia 35"), Some(id("35")));
        assert_eq!(anchor_line_id("  Line\tM12 "), Some(id("M12")));
        assert_eq!(anchor_line_id("linia 24n"), Some(id("24N")));
        assert_eq!(anchor_line_id("Linia"), None);
        assert_eq!(anchor_line_id("Linia 35 noua"), None);
        assert_eq!(anchor_line_id("Traseu 35"), None);
        assert_eq!(anchor_line_id(""), None);
    }

    #[test]
    fn extracts_only_line_anchors_inside_listing() {
        let document = Html::parse_document(LISTING);
        let catalog = extract_catalog(&document, &page_url(), LineType::Urban);

        let keys: Vec<_> = catalog.keys().map(LineId::as_str).collect();
        assert_eq!(keys, vec!["24B", "3", "35"]);
        assert!(catalog.values().all(|r| r.line_type == LineType::Urban));
        assert!(catalog.values().all(|r| r.stations.is_none()));
    }

    #[test]
    fn resolves_relative_hrefs() {
        let document = Html::parse_document(LISTING);
        let catalog = extract_catalog(&document, &page_url(), LineType::Urban);

        assert_eq!(
            catalog[&id("35")].url,
            "https://ctpcj.ro/index.php/ro/orare-linii/linii-urbane/linia-35"
        );
        assert_eq!(
            catalog[&id("24B")].url,
            "https://ctpcj.ro/index.php/ro/orare-linii/linii-urbane/linia-24b"
        );
        assert_eq!(
            catalog[&id("3")].url,
            "https://ctpcj.ro/index.php/ro/orare-linii/linii-urbane/linia-3"
        );
    }

    #[test]
    fn stamps_caller_supplied_type() {
        let document = Html::parse_document(LISTING);
        let catalog = extract_catalog(&document, &page_url(), LineType::Express);
        assert!(catalog.values().all(|r| r.line_type == LineType::Express));
    }

    #[test]
    fn find_matches_whole_identifier() {
        let document = Html::parse_document(LISTING);

        assert_eq!(
            find_line_url(&document, &page_url(), &id("3")).as_deref(),
            Some("https://ctpcj.ro/index.php/ro/orare-linii/linii-urbane/linia-3")
        );
        // "5" must not match "Linia 35"
        assert_eq!(find_line_url(&document, &page_url(), &id("5")), None);
        // Anchors outside the listing container don't count
        assert_eq!(find_line_url(&document, &page_url(), &id("1")), None);
        // An anchor without href is not a usable match
        assert_eq!(find_line_url(&document, &page_url(), &id("8")), None);
    }

    #[test]
    fn empty_listing_yields_empty_catalog() {
        let document = Html::parse_document(r#"<div class="tzPortfolio"></div>"#);
        assert!(extract_catalog(&document, &page_url(), LineType::Night).is_empty());
    }
}
