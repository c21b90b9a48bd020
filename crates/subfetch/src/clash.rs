//! Default [`ConfigEngine`] for Clash-style configuration files.

use std::path::Path;

use serde_yaml_ng::{Mapping, Value};

use crate::document::{DocumentError, decode_mapping};
use crate::engine::{ConfigEngine, EngineError, ProviderEntry, ProviderKind};
use crate::pipeline::CONFIG_FILE_NAME;

const PROVIDER_KINDS: [ProviderKind; 2] = [ProviderKind::Proxy, ProviderKind::Rule];

/// Summary of a configuration that passed structural validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub proxies: usize,
    pub proxy_groups: usize,
    pub rules: usize,
    pub providers: Vec<String>,
}

/// Reads `config.yaml`, anchors relative provider paths to the config
/// directory, and checks the shape of the sections the pipeline cares about.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClashEngine;

impl ClashEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigEngine for ClashEngine {
    type Validated = ValidatedConfig;

    fn unmarshal_and_patch(&self, config_dir: &Path) -> Result<Mapping, EngineError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        let text = std::fs::read_to_string(&path).map_err(|source| EngineError::Read {
            path: path.clone(),
            source,
        })?;

        let mut raw = match decode_mapping(&text) {
            Ok(raw) => raw,
            Err(DocumentError::NotAMapping) if text.trim().is_empty() => Mapping::new(),
            Err(e) => {
                return Err(EngineError::Decode {
                    path,
                    message: e.to_string(),
                });
            }
        };

        anchor_provider_paths(&mut raw, config_dir);
        Ok(raw)
    }

    fn providers(&self, raw: &Mapping) -> Vec<ProviderEntry> {
        let mut entries = Vec::new();

        for kind in PROVIDER_KINDS {
            let Some(section) = raw.get(kind.section()).and_then(Value::as_mapping) else {
                continue;
            };

            let mut named: Vec<ProviderEntry> = section
                .iter()
                .filter_map(|(name, descriptor)| {
                    Some(ProviderEntry {
                        name: name.as_str()?.to_owned(),
                        kind,
                        descriptor: descriptor.as_mapping()?.clone(),
                    })
                })
                .collect();
            named.sort_by(|a, b| a.name.cmp(&b.name));
            entries.extend(named);
        }

        entries
    }

    fn validate(&self, raw: Mapping) -> Result<ValidatedConfig, EngineError> {
        let proxies = named_entries(&raw, "proxies")?;
        let groups = named_entries(&raw, "proxy-groups")?;

        for group in &groups {
            if group.get("type").and_then(Value::as_str).is_none() {
                return Err(EngineError::Invalid(format!(
                    "proxy group {} has no type",
                    entry_name(group)
                )));
            }
        }

        let rules = match raw.get("rules") {
            None | Some(Value::Null) => 0,
            Some(Value::Sequence(rules)) => {
                if let Some(index) = rules.iter().position(|r| !r.is_string()) {
                    return Err(EngineError::Invalid(format!("rule #{index} is not a string")));
                }
                rules.len()
            }
            Some(_) => return Err(EngineError::Invalid("rules must be a list".into())),
        };

        let mut providers = Vec::new();
        for kind in PROVIDER_KINDS {
            match raw.get(kind.section()) {
                None | Some(Value::Null) => {}
                Some(Value::Mapping(section)) => {
                    for (name, descriptor) in section {
                        let name = name.as_str().ok_or_else(|| {
                            EngineError::Invalid(format!("{kind} has a non-string name"))
                        })?;
                        let has_type = descriptor
                            .as_mapping()
                            .and_then(|d| d.get("type"))
                            .is_some_and(Value::is_string);
                        if !has_type {
                            return Err(EngineError::Invalid(format!(
                                "{kind} entry {name} has no type"
                            )));
                        }
                        providers.push(name.to_owned());
                    }
                }
                Some(_) => return Err(EngineError::Invalid(format!("{kind} must be a mapping"))),
            }
        }

        Ok(ValidatedConfig {
            proxies: proxies.len(),
            proxy_groups: groups.len(),
            rules,
            providers,
        })
    }

    fn release(&self, validated: ValidatedConfig) {
        tracing::debug!(providers = validated.providers.len(), "released providers");
    }
}

/// Rewrite relative provider `path` values so they resolve under `config_dir`.
fn anchor_provider_paths(raw: &mut Mapping, config_dir: &Path) {
    for kind in PROVIDER_KINDS {
        let Some(Value::Mapping(section)) = raw.get_mut(kind.section()) else {
            continue;
        };

        for descriptor in section.values_mut() {
            let Some(descriptor) = descriptor.as_mapping_mut() else {
                continue;
            };
            let Some(path) = descriptor.get("path").and_then(Value::as_str) else {
                continue;
            };
            if Path::new(path).is_absolute() {
                continue;
            }

            let anchored = config_dir.join(path).to_string_lossy().into_owned();
            descriptor.insert(Value::from("path"), Value::from(anchored));
        }
    }
}

/// Entries of a list section, each required to be a mapping with a string `name`.
fn named_entries<'a>(raw: &'a Mapping, key: &str) -> Result<Vec<&'a Mapping>, EngineError> {
    let entries = match raw.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(entries)) => entries,
        Some(_) => return Err(EngineError::Invalid(format!("{key} must be a list"))),
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let mapping = entry
                .as_mapping()
                .ok_or_else(|| EngineError::Invalid(format!("{key} #{index} is not a mapping")))?;
            if mapping.get("name").and_then(Value::as_str).is_none() {
                return Err(EngineError::Invalid(format!("{key} #{index} has no name")));
            }
            Ok(mapping)
        })
        .collect()
}

fn entry_name(entry: &Mapping) -> &str {
    entry.get("name").and_then(Value::as_str).unwrap_or("?")
}
