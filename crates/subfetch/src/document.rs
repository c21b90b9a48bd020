use serde_yaml_ng::{Mapping, Value};
use url::Url;

use crate::loader::{ContentLoader, LoadError};

/// Errors that can occur while loading or decoding a YAML document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("failed to parse YAML: {0}")]
    Decode(#[from] serde_yaml_ng::Error),

    #[error("document root is not a mapping")]
    NotAMapping,
}

/// Decode YAML text into a generic key mapping.
///
/// An empty or all-comment document decodes to `null` and is rejected,
/// as is any root that is not a mapping.
pub fn decode_mapping(text: &str) -> Result<Mapping, DocumentError> {
    match serde_yaml_ng::from_str::<Value>(text)? {
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(DocumentError::NotAMapping),
    }
}

pub fn encode_mapping(mapping: &Mapping) -> Result<String, serde_yaml_ng::Error> {
    serde_yaml_ng::to_string(mapping)
}

/// Load a URI through `loader` and decode the body as a YAML mapping.
pub async fn load_yaml<L>(loader: &L, uri: &Url) -> Result<Mapping, DocumentError>
where
    L: ContentLoader + ?Sized,
{
    let bytes = loader.load(uri).await?;
    let text = String::from_utf8(bytes)?;
    decode_mapping(&text)
}

#[cfg(test)]
mod tests {
    use crate::test_support::InMemoryLoader;

    use super::*;

    #[test]
    fn decodes_mapping_root() {
        let mapping = decode_mapping("proxies: []\nmode: rule\n").unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("mode").and_then(Value::as_str), Some("rule"));
    }

    #[test]
    fn rejects_sequence_root() {
        let result = decode_mapping("- a\n- b\n");
        assert!(matches!(result, Err(DocumentError::NotAMapping)));
    }

    #[test]
    fn rejects_empty_document() {
        assert!(matches!(decode_mapping(""), Err(DocumentError::NotAMapping)));
    }

    #[test]
    fn reports_malformed_yaml() {
        let result = decode_mapping("proxies: [unterminated\n");
        assert!(matches!(result, Err(DocumentError::Decode(_))));
    }

    #[tokio::test]
    async fn load_yaml_goes_through_loader() {
        let mut loader = InMemoryLoader::new();
        loader.insert("https://example.com/p.yaml", "parsers: {}\n");

        let uri = Url::parse("https://example.com/p.yaml").unwrap();
        let mapping = load_yaml(&loader, &uri).await.unwrap();
        assert!(mapping.contains_key("parsers"));
    }

    #[tokio::test]
    async fn load_yaml_propagates_load_failure() {
        let loader = InMemoryLoader::new();
        let uri = Url::parse("https://example.com/missing.yaml").unwrap();
        let result = load_yaml(&loader, &uri).await;
        assert!(matches!(result, Err(DocumentError::Load(_))));
    }
}
