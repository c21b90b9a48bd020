//! Parser directives: operator-supplied list fragments prepended onto a
//! subscription document.
//!
//! A subscription URI opts in with a `parsers` query parameter whose value is
//! itself a URI. That document is expected to look like:
//!
//! ```yaml
//! parsers:
//!   yaml:
//!     prepend-proxies: [...]
//!     prepend-proxy-groups: [...]
//!     prepend-rules: [...]
//! ```

use serde_yaml_ng::{Mapping, Value};
use url::Url;

use crate::document::{decode_mapping, encode_mapping, load_yaml};
use crate::feedback::{Feedback, Severity};
use crate::loader::ContentLoader;

/// Query parameter carrying the directive document URI.
pub const PARSERS_PARAM: &str = "parsers";

/// Subscription keys and the directive keys prepended onto them, in application order.
pub const PREPEND_TARGETS: [(&str, &str); 3] = [
    ("proxies", "prepend-proxies"),
    ("proxy-groups", "prepend-proxy-groups"),
    ("rules", "prepend-rules"),
];

/// Errors that make the subscription itself unusable for merging.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("failed to parse subscription YAML: {0}")]
    Decode(String),

    #[error("failed to marshal merged YAML: {0}")]
    Encode(#[from] serde_yaml_ng::Error),
}

/// Text produced by [`apply_directives`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merged {
    /// Directives were applied; the text is the re-encoded document.
    Applied(String),
    /// The input text, returned as-is. `reason` explains why when a
    /// directive was requested but could not be used.
    Unchanged {
        text: String,
        reason: Option<Feedback>,
    },
}

impl Merged {
    fn unchanged(text: String) -> Self {
        Self::Unchanged { text, reason: None }
    }

    fn degraded(text: String, reason: Feedback) -> Self {
        Self::Unchanged {
            text,
            reason: Some(reason),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Applied(text) | Self::Unchanged { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Applied(text) | Self::Unchanged { text, .. } => text,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn reason(&self) -> Option<&Feedback> {
        match self {
            Self::Unchanged { reason, .. } => reason.as_ref(),
            Self::Applied(_) => None,
        }
    }
}

/// Apply the `parsers` directive named in `subscription_uri` to `text`.
///
/// Without a `parsers` query parameter the text comes back untouched. An
/// unreachable, malformed, or ill-shaped directive document also leaves the
/// text untouched; only a subscription that cannot be decoded or re-encoded
/// is an error.
pub async fn apply_directives<L>(
    loader: &L,
    text: String,
    subscription_uri: &Url,
) -> Result<Merged, MergeError>
where
    L: ContentLoader + ?Sized,
{
    let Some(parsers_uri) = parsers_param(subscription_uri) else {
        return Ok(Merged::unchanged(text));
    };

    let mut subscription =
        decode_mapping(&text).map_err(|e| MergeError::Decode(e.to_string()))?;

    tracing::debug!(%parsers_uri, "loading parser directives");

    let parsers_url = match Url::parse(&parsers_uri) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(%parsers_uri, error = %e, "invalid parsers URI");
            return Ok(Merged::degraded(
                text,
                Feedback::directive(
                    Severity::Warning,
                    parsers_uri.as_str(),
                    format!("invalid URI: {e}"),
                ),
            ));
        }
    };

    let container = match load_yaml(loader, &parsers_url).await {
        Ok(container) => container,
        Err(e) => {
            tracing::warn!(%parsers_url, error = %e, "parser directives unavailable");
            return Ok(Merged::degraded(
                text,
                Feedback::directive(
                    Severity::Warning,
                    parsers_url.as_str(),
                    format!("unavailable: {e}"),
                ),
            ));
        }
    };

    let Some(directives) = yaml_directives(&container) else {
        tracing::debug!(%parsers_url, "no parsers.yaml node in directive document");
        return Ok(Merged::degraded(
            text,
            Feedback::directive(
                Severity::Info,
                parsers_url.as_str(),
                "no parsers.yaml section",
            ),
        ));
    };

    for (key, directive_key) in PREPEND_TARGETS {
        prepend(&mut subscription, key, directives, directive_key);
    }

    let merged = encode_mapping(&subscription)?;
    Ok(Merged::Applied(merged))
}

/// Prepend `directives[directive_key]` onto `doc[key]`.
///
/// A missing or non-sequence directive is a no-op. When `doc[key]` is a
/// sequence the directive entries go in front of it; otherwise `doc[key]` is
/// replaced by the directive entries.
pub fn prepend<'a>(
    doc: &'a mut Mapping,
    key: &str,
    directives: &Mapping,
    directive_key: &str,
) -> &'a mut Mapping {
    let Some(Value::Sequence(head)) = directives.get(directive_key) else {
        tracing::trace!(directive_key, "directive absent");
        return doc;
    };

    let mut merged = head.clone();
    if let Some(Value::Sequence(original)) = doc.get_mut(key) {
        merged.append(original);
    }

    tracing::trace!(key, entries = merged.len(), "prepended directive entries");
    doc.insert(Value::from(key), Value::Sequence(merged));
    doc
}

fn parsers_param(uri: &Url) -> Option<String> {
    uri.query_pairs()
        .find(|(name, _)| name == PARSERS_PARAM)
        .map(|(_, value)| value.into_owned())
}

fn yaml_directives(container: &Mapping) -> Option<&Mapping> {
    container
        .get("parsers")
        .and_then(Value::as_mapping)
        .and_then(|parsers| parsers.get("yaml"))
        .and_then(Value::as_mapping)
}

#[cfg(test)]
mod tests {
    use crate::test_support::InMemoryLoader;

    use super::*;

    fn seq(items: &[&str]) -> Value {
        Value::Sequence(items.iter().map(|s| Value::from(*s)).collect())
    }

    fn mapping(pairs: &[(&str, Value)]) -> Mapping {
        pairs
            .iter()
            .map(|(k, v)| (Value::from(*k), v.clone()))
            .collect()
    }

    #[test]
    fn prepend_puts_directives_first() {
        let mut doc = mapping(&[("rules", seq(&["c", "d"]))]);
        let directives = mapping(&[("prepend-rules", seq(&["a", "b"]))]);

        prepend(&mut doc, "rules", &directives, "prepend-rules");

        assert_eq!(doc.get("rules"), Some(&seq(&["a", "b", "c", "d"])));
    }

    #[test]
    fn prepend_onto_absent_key_yields_directives() {
        let mut doc = mapping(&[("mode", Value::from("rule"))]);
        let directives = mapping(&[("prepend-rules", seq(&["a", "b"]))]);

        prepend(&mut doc, "rules", &directives, "prepend-rules");

        assert_eq!(doc.get("rules"), Some(&seq(&["a", "b"])));
        assert_eq!(doc.get("mode"), Some(&Value::from("rule")));
    }

    #[test]
    fn prepend_replaces_non_sequence_target() {
        let mut doc = mapping(&[("rules", Value::from("MATCH,DIRECT"))]);
        let directives = mapping(&[("prepend-rules", seq(&["a"]))]);

        prepend(&mut doc, "rules", &directives, "prepend-rules");

        assert_eq!(doc.get("rules"), Some(&seq(&["a"])));
    }

    #[test]
    fn prepend_ignores_missing_or_non_sequence_directive() {
        let mut doc = mapping(&[("rules", seq(&["c"]))]);
        let directives = mapping(&[("prepend-rules", Value::from("nope"))]);

        prepend(&mut doc, "rules", &directives, "prepend-rules");
        prepend(&mut doc, "proxies", &directives, "prepend-proxies");

        assert_eq!(doc.get("rules"), Some(&seq(&["c"])));
        assert!(!doc.contains_key("proxies"));
    }

    #[test]
    fn prepend_keeps_duplicates() {
        let mut doc = mapping(&[("rules", seq(&["a"]))]);
        let directives = mapping(&[("prepend-rules", seq(&["a"]))]);

        prepend(&mut doc, "rules", &directives, "prepend-rules");

        assert_eq!(doc.get("rules"), Some(&seq(&["a", "a"])));
    }

    #[tokio::test]
    async fn no_parsers_param_is_identity() {
        let loader = InMemoryLoader::new();
        let uri = Url::parse("https://example.com/sub?token=abc").unwrap();
        let text = "this: is\n  not: [valid".to_owned();

        let merged = apply_directives(&loader, text.clone(), &uri).await.unwrap();

        assert_eq!(merged, Merged::Unchanged { text, reason: None });
        assert!(loader.requests().is_empty());
    }

    #[tokio::test]
    async fn unreachable_directive_returns_original() {
        let loader = InMemoryLoader::new();
        let uri =
            Url::parse("https://example.com/sub?parsers=https://example.com/missing.yaml").unwrap();
        let text = "rules:\n- MATCH,DIRECT\n".to_owned();

        let merged = apply_directives(&loader, text.clone(), &uri).await.unwrap();

        assert!(!merged.is_applied());
        assert_eq!(merged.text(), text);
        assert!(merged.reason().is_some_and(Feedback::is_warning));
    }

    #[tokio::test]
    async fn directive_without_yaml_section_returns_original() {
        let mut loader = InMemoryLoader::new();
        loader.insert("https://example.com/p.yaml", "parsers:\n  js: {}\n");
        let uri = Url::parse("https://example.com/sub?parsers=https://example.com/p.yaml").unwrap();
        let text = "rules: [x]\n".to_owned();

        let merged = apply_directives(&loader, text.clone(), &uri).await.unwrap();

        assert_eq!(merged.text(), text);
        assert!(!merged.is_applied());
    }

    #[tokio::test]
    async fn undecodable_subscription_is_an_error() {
        let mut loader = InMemoryLoader::new();
        loader.insert("https://example.com/p.yaml", "parsers: {yaml: {}}\n");
        let uri = Url::parse("https://example.com/sub?parsers=https://example.com/p.yaml").unwrap();

        let result = apply_directives(&loader, "rules: [x\n".to_owned(), &uri).await;

        assert!(matches!(result, Err(MergeError::Decode(_))));
    }

    #[tokio::test]
    async fn applies_all_three_directives() {
        let mut loader = InMemoryLoader::new();
        loader.insert(
            "https://example.com/p.yaml",
            "parsers:\n  yaml:\n    prepend-proxies: [P0]\n    prepend-proxy-groups: [G0]\n    prepend-rules: [R0]\n",
        );
        let uri = Url::parse("https://example.com/sub?parsers=https://example.com/p.yaml").unwrap();
        let text = "proxies: [P1]\nrules: [R1]\nmode: rule\n".to_owned();

        let merged = apply_directives(&loader, text, &uri).await.unwrap();
        assert!(merged.is_applied());

        let doc = decode_mapping(merged.text()).unwrap();
        assert_eq!(doc.get("proxies"), Some(&seq(&["P0", "P1"])));
        assert_eq!(doc.get("proxy-groups"), Some(&seq(&["G0"])));
        assert_eq!(doc.get("rules"), Some(&seq(&["R0", "R1"])));
        assert_eq!(doc.get("mode"), Some(&Value::from("rule")));
    }

    #[tokio::test]
    async fn double_application_prepends_twice() {
        let mut loader = InMemoryLoader::new();
        loader.insert(
            "https://example.com/p.yaml",
            "parsers:\n  yaml:\n    prepend-rules: [R0]\n",
        );
        let uri = Url::parse("https://example.com/sub?parsers=https://example.com/p.yaml").unwrap();

        let once = apply_directives(&loader, "rules: [R1]\n".to_owned(), &uri)
            .await
            .unwrap();
        let twice = apply_directives(&loader, once.into_text(), &uri)
            .await
            .unwrap();

        let doc = decode_mapping(twice.text()).unwrap();
        assert_eq!(doc.get("rules"), Some(&seq(&["R0", "R0", "R1"])));
    }
}
