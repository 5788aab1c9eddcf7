use engine_logging::engine_warn;
use scraper::{Html, Selector};

/// Ordered list of CSS patterns for pulling related terms out of a search
/// results page.
///
/// The upstream markup drifts; recovery is adding a new pattern to the
/// configured list, not touching strategy code. Patterns are tried in the
/// configured order and the first one with at least one match wins — results
/// from different patterns are never merged.
#[derive(Debug, Clone)]
pub struct SelectorSet {
    selectors: Vec<(String, Selector)>,
}

impl SelectorSet {
    /// Compile the configured patterns. Invalid CSS is logged and skipped so
    /// one bad config entry does not disable the rest of the list.
    pub fn new(patterns: &[String]) -> Self {
        let mut selectors = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            match Selector::parse(pattern) {
                Ok(selector) => selectors.push((pattern.clone(), selector)),
                Err(err) => {
                    engine_warn!("Skipping unparsable selector pattern {pattern:?}: {err}");
                }
            }
        }
        Self { selectors }
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// First-match-wins extraction: returns the trimmed text of every node
    /// matched by the first pattern that matches anything, in document
    /// order. Empty vector when no pattern matches.
    pub fn extract(&self, html: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        for (pattern, selector) in &self.selectors {
            let matches: Vec<String> = doc
                .select(selector)
                .map(|node| node.text().collect::<String>().trim().to_string())
                .filter(|text| !text.is_empty())
                .collect();
            if !matches.is_empty() {
                engine_logging::engine_debug!(
                    "Selector {pattern:?} matched {} node(s)",
                    matches.len()
                );
                return matches;
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> SelectorSet {
        let owned: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        SelectorSet::new(&owned)
    }

    const PAGE: &str = r#"
        <html><body>
            <span class="keyword"> 스마트워치 추천 </span>
            <span class="keyword">갤럭시워치</span>
            <li class="related">fallback term</li>
        </body></html>
    "#;

    #[test]
    fn first_matching_pattern_wins() {
        let selectors = set(&["span.keyword", "li.related"]);
        let terms = selectors.extract(PAGE);
        assert_eq!(terms, vec!["스마트워치 추천", "갤럭시워치"]);
    }

    #[test]
    fn later_pattern_used_when_first_misses() {
        let selectors = set(&["div.absent", "li.related"]);
        assert_eq!(selectors.extract(PAGE), vec!["fallback term"]);
    }

    #[test]
    fn results_are_never_merged_across_patterns() {
        // Both patterns match; only the first one's nodes may appear.
        let selectors = set(&["li.related", "span.keyword"]);
        assert_eq!(selectors.extract(PAGE), vec!["fallback term"]);
    }

    #[test]
    fn no_match_yields_empty() {
        let selectors = set(&["div.absent"]);
        assert!(selectors.extract(PAGE).is_empty());
    }

    #[test]
    fn invalid_pattern_is_skipped() {
        let selectors = set(&["span..", "span.keyword"]);
        let terms = selectors.extract(PAGE);
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn whitespace_only_nodes_are_dropped() {
        let selectors = set(&["span.blank"]);
        let html = r#"<span class="blank">   </span>"#;
        assert!(selectors.extract(html).is_empty());
    }
}
