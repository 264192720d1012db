//! HTML classification: title, heading histogram, links, login forms, doctype.

use data_model_lens::models::{LinkDetail, LinkList, PageSnapshot};
use scraper::{ElementRef, Html};
use url::Url;

pub const HTML5: &str = "HTML5";
pub const XHTML_1_0: &str = "XHTML 1.0";
pub const UNKNOWN_VERSION: &str = "Unknown";

const HEADING_LEVELS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Classifies the HTML `body` served at `page`.
///
/// Title, headings, anchors and forms are collected in a single pass over the
/// document tree, so every link sequence is in document order.
pub fn analyze_html(page: &Url, body: &str) -> PageSnapshot {
    let mut snapshot = PageSnapshot {
        html_version: html_version(body).to_string(),
        ..PageSnapshot::default()
    };
    let mut seen_title = false;

    let document = Html::parse_document(body);
    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        match element.value().name() {
            "title" if !seen_title => {
                seen_title = true;
                snapshot.title = element.text().collect::<String>().trim().to_string();
            }
            name if HEADING_LEVELS.contains(&name) => snapshot.heading_counts.increment(name),
            "a" => {
                if let Some(href) = element.value().attr("href") {
                    classify_link(page, href, anchor_text(&element), &mut snapshot);
                }
            }
            "form" => snapshot.has_login_form |= is_login_form(&element),
            _ => {}
        }
    }

    snapshot
}

/// Textual doctype sniff over the raw body, case-insensitive.
pub fn html_version(body: &str) -> &'static str {
    let body = body.to_ascii_lowercase();
    if body.contains("<!doctype html>") {
        HTML5
    } else if body.contains("-//w3c//dtd xhtml 1.0") {
        XHTML_1_0
    } else {
        UNKNOWN_VERSION
    }
}

/// A form is a login form if its text mentions "login" or it has a password input.
fn is_login_form(form: &ElementRef) -> bool {
    if form.text().collect::<String>().to_lowercase().contains("login") {
        return true;
    }

    form.descendants().filter_map(ElementRef::wrap).any(|child| {
        child.value().name() == "input"
            && child
                .value()
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("password"))
    })
}

fn anchor_text(anchor: &ElementRef) -> String {
    anchor.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Resolves an href against the page URL. `None` if it cannot be made into a URL.
///
/// Inner whitespace or control characters make an href inaccessible whether it
/// is absolute or relative; the URL parser would otherwise percent-encode them.
pub fn resolve_href(page: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => page.join(href).ok(),
        Err(_) => None,
    }
}

/// True if `host` is the page's host or one of its subdomains.
pub fn is_internal_host(host: &str, page_host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let page_host = page_host.trim_end_matches('.').to_ascii_lowercase();
    host == page_host || host.ends_with(&format!(".{}", page_host))
}

fn classify_link(page: &Url, href: &str, text: String, snapshot: &mut PageSnapshot) {
    let Some(resolved) = resolve_href(page, href) else {
        snapshot.inaccessible_links.push(LinkDetail::new(href, text));
        return;
    };

    let internal = match (resolved.host_str(), page.host_str()) {
        (None, _) => true,
        (Some(host), Some(page_host)) => is_internal_host(host, page_host),
        (Some(_), None) => false,
    };

    let target: &mut LinkList = if internal {
        &mut snapshot.internal_links
    } else {
        &mut snapshot.external_links
    };
    target.push(LinkDetail::new(resolved.to_string(), text));
}
