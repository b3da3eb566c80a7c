//! Report rendering.
//!
//! Produces the HTML email body for one run. Output depends only on the
//! inputs: the same query, timestamp, and results always give the same bytes.

use chrono::{DateTime, Utc};

use crate::models::CandidateResult;
use crate::utils::{html::escape, web_url};

/// Shown when every result was already sent in an earlier run.
pub const NO_NEW_RESULTS: &str =
    "No new results. Everything found for this search was already sent in an earlier email.";

/// Shown when the provider returned nothing at all.
pub const NO_RESULTS: &str = "No results found for this search query.";

/// Marks the document as machine-generated.
pub const FOOTER: &str = "This is an automated email from the Vacation Scheme Search Agent.";

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; line-height: 1.6; }
        h1 { color: #2c3e50; }
        h2 { color: #34495e; margin-top: 20px; }
        .result { border: 1px solid #ddd; padding: 15px; margin: 10px 0; border-radius: 5px; background-color: #f9f9f9; }
        .title { font-weight: bold; color: #2980b9; font-size: 16px; }
        .link { color: #27ae60; word-break: break-all; }
        .snippet { color: #555; margin-top: 5px; }
        .notice { color: #7f8c8d; font-style: italic; }
        .footer { margin-top: 30px; color: #7f8c8d; font-size: 12px; }
"#;

/// A rendered email body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub html: String,
}

/// Email subject for a run on the given date.
pub fn subject_for(timestamp: DateTime<Utc>) -> String {
    format!(
        "Vacation Scheme Search Results - {}",
        timestamp.format("%B %d, %Y")
    )
}

/// Render the report for one run.
///
/// `had_any_results` distinguishes "nothing new" from "nothing at all" when
/// `novel` is empty.
pub fn render(
    query: &str,
    timestamp: DateTime<Utc>,
    novel: &[CandidateResult],
    had_any_results: bool,
) -> Report {
    let mut html = String::with_capacity(2048 + novel.len() * 512);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str("<h1>Vacation Scheme Search Results</h1>\n");
    html.push_str(&format!(
        "<p><strong>Search Query:</strong> {}</p>\n",
        escape(query)
    ));
    html.push_str(&format!(
        "<p><strong>Search Date:</strong> {}</p>\n<hr>\n",
        timestamp.format("%B %d, %Y at %H:%M UTC")
    ));

    if !novel.is_empty() {
        html.push_str(&format!("<h2>New Results ({})</h2>\n", novel.len()));
        for (idx, result) in novel.iter().enumerate() {
            html.push_str(&render_entry(idx + 1, result));
        }
    } else if had_any_results {
        html.push_str(&format!("<p class=\"notice\">{NO_NEW_RESULTS}</p>\n"));
    } else {
        html.push_str(&format!("<p class=\"notice\">{NO_RESULTS}</p>\n"));
    }

    html.push_str("<hr>\n<div class=\"footer\">\n");
    html.push_str(&format!("<p>{FOOTER}</p>\n"));
    html.push_str("<p>Search powered by SerpAPI</p>\n</div>\n</body>\n</html>\n");

    Report { html }
}

fn render_entry(position: usize, result: &CandidateResult) -> String {
    // Non-web schemes such as javascript: are shown but never linked.
    let href = match web_url(&result.link) {
        Some(_) => escape(&result.link),
        None => "#".to_string(),
    };

    format!(
        concat!(
            "<div class=\"result\">\n",
            "  <div class=\"title\">{position}. {title}</div>\n",
            "  <div class=\"link\"><a href=\"{href}\">{link}</a></div>\n",
            "  <div class=\"snippet\">{snippet}</div>\n",
            "</div>\n"
        ),
        position = position,
        title = escape(&result.title),
        href = href,
        link = escape(&result.link),
        snippet = escape(&result.snippet),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use scraper::{Html, Selector};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 12, 7, 0, 0).unwrap()
    }

    fn result(link: &str, title: &str, snippet: &str) -> CandidateResult {
        CandidateResult::new(link, Some(title.into()), Some(snippet.into()))
    }

    fn select<'a>(doc: &'a Html, css: &str) -> Vec<scraper::ElementRef<'a>> {
        let selector = Selector::parse(css).unwrap();
        doc.select(&selector).collect()
    }

    #[test]
    fn test_header_and_footer() {
        let report = render("law vacation scheme", at(), &[], true);
        assert!(report.html.contains("law vacation scheme"));
        assert!(report.html.contains("October 12, 2026 at 07:00 UTC"));
        assert!(report.html.contains(FOOTER));
    }

    #[test]
    fn test_lists_results_in_order() {
        let novel = vec![
            result("https://a.example/vs", "Firm A Vacation Scheme", "Deadline 31 Jan"),
            result("https://b.example/vs", "Firm B Open Day", "Apply online"),
        ];
        let report = render("q", at(), &novel, true);
        let doc = Html::parse_document(&report.html);

        let titles: Vec<String> = select(&doc, "div.result .title")
            .iter()
            .map(|e| e.text().collect())
            .collect();
        assert_eq!(
            titles,
            vec!["1. Firm A Vacation Scheme", "2. Firm B Open Day"]
        );

        let hrefs: Vec<&str> = select(&doc, "div.result a")
            .iter()
            .filter_map(|e| e.value().attr("href"))
            .collect();
        assert_eq!(hrefs, vec!["https://a.example/vs", "https://b.example/vs"]);
        assert!(!report.html.contains(NO_NEW_RESULTS));
        assert!(!report.html.contains(NO_RESULTS));
    }

    #[test]
    fn test_no_new_results_message() {
        let report = render("q", at(), &[], true);
        let doc = Html::parse_document(&report.html);
        assert!(report.html.contains(NO_NEW_RESULTS));
        assert!(!report.html.contains(NO_RESULTS));
        assert!(select(&doc, "div.result").is_empty());
    }

    #[test]
    fn test_no_results_message() {
        let report = render("q", at(), &[], false);
        assert!(report.html.contains(NO_RESULTS));
        assert!(!report.html.contains(NO_NEW_RESULTS));
    }

    #[test]
    fn test_hostile_fields_are_escaped() {
        let novel = vec![result(
            "https://evil.example/?q=\"><script>alert(1)</script>",
            "<script>x</script>",
            "<img src=x onerror=alert(1)>",
        )];
        let report = render("<b>query</b>", at(), &novel, true);
        let doc = Html::parse_document(&report.html);

        assert!(!report.html.contains("<script>"));
        assert!(select(&doc, "script").is_empty());
        assert!(select(&doc, "img").is_empty());
        assert!(select(&doc, "b").is_empty());

        let title: String = select(&doc, "div.result .title")[0].text().collect();
        assert_eq!(title, "1. <script>x</script>");
    }

    #[test]
    fn test_non_web_links_are_not_clickable() {
        let novel = vec![result("javascript:alert(1)", "Bad", "Link")];
        let report = render("q", at(), &novel, true);
        let doc = Html::parse_document(&report.html);

        let anchor = select(&doc, "div.result a")[0];
        assert_eq!(anchor.value().attr("href"), Some("#"));
        assert_eq!(anchor.text().collect::<String>(), "javascript:alert(1)");
    }

    #[test]
    fn test_deterministic() {
        let novel = vec![result("https://a.example", "A", "S")];
        assert_eq!(render("q", at(), &novel, true), render("q", at(), &novel, true));
    }

    #[test]
    fn test_subject() {
        assert_eq!(
            subject_for(at()),
            "Vacation Scheme Search Results - October 12, 2026"
        );
    }
}
