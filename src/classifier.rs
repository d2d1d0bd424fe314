use scraper::Html;

use crate::{
    config::ClassifierConfig,
    domain::{FetchOutcome, FetchResult, Status, StatusKind},
};

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Maps a fetched page onto a [`Status`]. The checks run in a fixed order and
/// the first match wins, so a 403 is `Blocked` even when the body would pass
/// the keyword check.
#[derive(Debug, Clone)]
pub struct PageClassifier {
    config: ClassifierConfig,
    folded_keywords: Vec<String>,
}

impl PageClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let folded_keywords = if config.ignore_case {
            config
                .success_keywords
                .iter()
                .map(|kw| kw.to_lowercase())
                .collect()
        } else {
            config.success_keywords.clone()
        };
        Self {
            config,
            folded_keywords,
        }
    }

    pub fn classify(&self, result: &FetchResult) -> Status {
        let (status, body) = match &result.outcome {
            FetchOutcome::TransportError(cause) => {
                return Status::new(StatusKind::TransportError, cause.clone());
            }
            FetchOutcome::Response { status, body } => (*status, body),
        };

        if status == 403 {
            return Status::new(StatusKind::Blocked, "HTTP 403: request was refused");
        }
        if status != 200 {
            return Status::new(StatusKind::TransportError, format!("HTTP {status}"));
        }

        let text = visible_text(body);

        if let Some(keyword) = self.find_success_keyword(&text) {
            return Status::new(
                StatusKind::Available,
                format!("Booking keywords found: {keyword}"),
            );
        }

        let length = text.trim().chars().count();
        if length < self.config.min_content_length {
            return Status::new(
                StatusKind::Blocked,
                format!("page text is only {length} chars; likely an anti-bot page"),
            );
        }

        match self.find_wait_keyword(&text) {
            Some(keyword) => Status::new(
                StatusKind::Waiting,
                format!("Still waiting (page shows \"{keyword}\")"),
            ),
            None => Status::new(StatusKind::Waiting, "Still waiting..."),
        }
    }

    fn find_success_keyword(&self, text: &str) -> Option<&str> {
        let haystack = self.fold(text);
        self.folded_keywords
            .iter()
            .position(|kw| !kw.is_empty() && haystack.contains(kw.as_str()))
            .map(|idx| self.config.success_keywords[idx].as_str())
    }

    fn find_wait_keyword(&self, text: &str) -> Option<&str> {
        let haystack = self.fold(text);
        self.config
            .wait_keywords
            .iter()
            .find(|kw| {
                if self.config.ignore_case {
                    haystack.contains(kw.to_lowercase().as_str())
                } else {
                    haystack.contains(kw.as_str())
                }
            })
            .map(String::as_str)
    }

    fn fold(&self, text: &str) -> String {
        if self.config.ignore_case {
            text.to_lowercase()
        } else {
            text.to_string()
        }
    }
}

/// Concatenated text nodes of the document, skipping script-like elements.
pub fn visible_text(body: &str) -> String {
    let document = Html::parse_document(body);
    let mut text = String::with_capacity(body.len() / 2);
    for node in document.tree.root().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            text.push_str(fragment);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PageClassifier {
        PageClassifier::new(ClassifierConfig::default())
    }

    fn padded(core: &str, len: usize) -> String {
        let mut body = String::from(core);
        while body.len() < len {
            body.push_str(" lorem ipsum dolor");
        }
        body
    }

    #[test]
    fn select_seats_on_a_full_page_is_available() {
        let body = padded("...Select Seats for this match...", 2000);
        let status = classifier().classify(&FetchResult::response(200, body));
        assert_eq!(status.kind, StatusKind::Available);
        assert!(status.message.contains("Select Seats"));
    }

    #[test]
    fn empty_body_is_blocked() {
        let status = classifier().classify(&FetchResult::response(200, ""));
        assert_eq!(status.kind, StatusKind::Blocked);
    }

    #[test]
    fn forbidden_wins_over_keywords() {
        let body = padded("<html><body><button>Book Now</button>", 2000);
        let status = classifier().classify(&FetchResult::response(403, body));
        assert_eq!(status.kind, StatusKind::Blocked);
    }

    #[test]
    fn coming_soon_page_is_waiting() {
        let body = padded("Coming Soon! Notify me when tickets open.", 2000);
        let status = classifier().classify(&FetchResult::response(200, body));
        assert_eq!(status.kind, StatusKind::Waiting);
        assert!(status.message.contains("Coming Soon"));
    }

    #[test]
    fn keyword_on_a_short_page_still_counts() {
        let status = classifier().classify(&FetchResult::response(200, "<p>Buy Tickets</p>"));
        assert_eq!(status.kind, StatusKind::Available);
    }

    #[test]
    fn other_status_codes_are_transport_errors() {
        let status = classifier().classify(&FetchResult::response(503, padded("Book Now", 2000)));
        assert_eq!(status.kind, StatusKind::TransportError);
        assert_eq!(status.message, "HTTP 503");
    }

    #[test]
    fn transport_failure_passes_cause_through() {
        let status = classifier().classify(&FetchResult::transport_error("operation timed out"));
        assert_eq!(status.kind, StatusKind::TransportError);
        assert_eq!(status.message, "operation timed out");
    }

    #[test]
    fn matching_is_case_sensitive_by_default() {
        let body = padded("book now", 2000);
        let status = classifier().classify(&FetchResult::response(200, body));
        assert_eq!(status.kind, StatusKind::Waiting);
    }

    #[test]
    fn ignore_case_keeps_substring_semantics() {
        let config = ClassifierConfig {
            ignore_case: true,
            ..ClassifierConfig::default()
        };
        let body = padded("Click here to BOOK NOW!!", 2000);
        let status = PageClassifier::new(config).classify(&FetchResult::response(200, body));
        assert_eq!(status.kind, StatusKind::Available);
        assert!(status.message.contains("Book Now"));
    }

    #[test]
    fn keywords_inside_scripts_are_ignored() {
        let body = format!(
            "<html><head><script>var label = \"Book Now\";</script>\
             <style>.x:after {{ content: 'Buy Tickets'; }}</style></head>\
             <body><p>{}</p></body></html>",
            padded("Coming Soon", 1200)
        );
        let status = classifier().classify(&FetchResult::response(200, body));
        assert_eq!(status.kind, StatusKind::Waiting);
    }

    #[test]
    fn markup_heavy_page_with_little_text_is_blocked() {
        let body = format!(
            "<html><body><div id=\"captcha\"></div><script>{}</script></body></html>",
            "x".repeat(5000)
        );
        let status = classifier().classify(&FetchResult::response(200, body));
        assert_eq!(status.kind, StatusKind::Blocked);
    }

    #[test]
    fn visible_text_joins_across_inline_tags() {
        let text = visible_text("<p><b>Book</b> Now</p>");
        assert!(text.contains("Book Now"));
    }
}
