//! Subscription filters.

use serde::Serialize;

use super::event::Event;
use crate::curve::PubKey;

/// Relay subscription filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<PubKey>,
    #[serde(rename = "#p", skip_serializing_if = "Vec::is_empty")]
    pub p_tags: Vec<String>,
    #[serde(rename = "#e", skip_serializing_if = "Vec::is_empty")]
    pub e_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: u16) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn author(mut self, author: PubKey) -> Self {
        self.authors.push(author);
        self
    }

    pub fn p_tag(mut self, value: impl Into<String>) -> Self {
        self.p_tags.push(value.into());
        self
    }

    pub fn e_tag(mut self, value: impl Into<String>) -> Self {
        self.e_tags.push(value.into());
        self
    }

    pub fn since(mut self, timestamp: u64) -> Self {
        self.since = Some(timestamp);
        self
    }

    /// Relay-side matching semantics, applied locally.
    pub fn matches(&self, event: &Event) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&event.kind))
            && (self.authors.is_empty() || self.authors.contains(&event.pubkey))
            && tag_matches(&self.p_tags, event, "p")
            && tag_matches(&self.e_tags, event, "e")
            && self.since.map_or(true, |since| event.created_at >= since)
    }
}

fn tag_matches(wanted: &[String], event: &Event, name: &str) -> bool {
    wanted.is_empty()
        || event
            .tags_named(name)
            .filter_map(|t| t.get(1))
            .any(|value| wanted.contains(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Keys;
    use crate::net::event::UnsignedEvent;

    #[test]
    fn test_matches_ack_shape() {
        let signer = Keys::generate();
        let sender = Keys::generate();
        let ack = UnsignedEvent::new(
            signer.public_key(),
            26429,
            vec![
                vec!["p".into(), sender.public_key().to_hex()],
                vec!["e".into(), "ab".repeat(32)],
            ],
            String::new(),
        )
        .sign(&signer)
        .unwrap();

        let filter = Filter::new()
            .kind(26429)
            .author(signer.public_key())
            .p_tag(sender.public_key().to_hex())
            .e_tag("ab".repeat(32));
        assert!(filter.matches(&ack));

        assert!(!Filter::new().kind(1).matches(&ack));
        assert!(!Filter::new().author(sender.public_key()).matches(&ack));
        assert!(!Filter::new().e_tag("cd").matches(&ack));
        assert!(!Filter::new().since(ack.created_at + 10).matches(&ack));
        assert!(Filter::new().matches(&ack));
    }

    #[test]
    fn test_serializes_tag_keys() {
        let keys = Keys::generate();
        let filter = Filter::new().kind(7).author(keys.public_key()).p_tag("aa");
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["kinds"], serde_json::json!([7]));
        assert_eq!(json["authors"][0], keys.public_key().to_hex());
        assert_eq!(json["#p"], serde_json::json!(["aa"]));
        assert!(json.get("#e").is_none());
        assert!(json.get("since").is_none());
    }
}
