/// Local rule-based responder: picks a canned coaching reply by keyword
use serde::{Deserialize, Deserializer, Serialize};

/// One entry of the rule table: if `keyword` occurs in the input, answer with `reply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordRule {
    keyword: String,
    reply: String,
}

impl KeywordRule {
    /// The keyword is stored lowercased so matching stays case-insensitive.
    pub fn new(keyword: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into().to_lowercase(),
            reply: reply.into(),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn reply(&self) -> &str {
        &self.reply
    }

    fn matches(&self, normalized_input: &str) -> bool {
        normalized_input.contains(&self.keyword)
    }
}

impl<'de> Deserialize<'de> for KeywordRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawRule {
            keyword: String,
            reply: String,
        }

        let raw = RawRule::deserialize(deserializer)?;
        Ok(KeywordRule::new(raw.keyword, raw.reply))
    }
}

/// Result of a lookup: the reply plus the rule that produced it, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub reply: &'a str,
    pub matched: Option<&'a KeywordRule>,
}

impl Selection<'_> {
    pub fn is_fallback(&self) -> bool {
        self.matched.is_none()
    }
}

/// Maps free text to a canned reply.
///
/// Rules are scanned in table order and the first keyword contained in the
/// lowercased input wins, even if a later rule would be more specific
/// ("revenue" placed before "revenue growth" shadows it). Matching is plain
/// substring containment, not word matching: "marketing" matches
/// "remarketing".
#[derive(Debug, Clone)]
pub struct ResponseSelector {
    rules: Vec<KeywordRule>,
    fallback_reply: String,
}

impl ResponseSelector {
    pub fn new(rules: Vec<KeywordRule>, fallback_reply: impl Into<String>) -> Self {
        Self {
            rules,
            fallback_reply: fallback_reply.into(),
        }
    }

    pub fn select(&self, input: &str) -> &str {
        self.select_match(input).reply
    }

    pub fn select_match(&self, input: &str) -> Selection<'_> {
        let input_lower = input.to_lowercase();

        match self.rules.iter().find(|rule| rule.matches(&input_lower)) {
            Some(rule) => Selection {
                reply: rule.reply(),
                matched: Some(rule),
            },
            None => Selection {
                reply: &self.fallback_reply,
                matched: None,
            },
        }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn fallback_reply(&self) -> &str {
        &self.fallback_reply
    }
}
