use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Unreachable,
}

/// Where a platform's normalized ranking feed is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeedSource {
    /// A JSON document served over HTTP(S).
    Http { url: String },
    /// A JSON document on the local filesystem.
    File { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default = "default_availability")]
    pub status: Availability,
    #[serde(default)]
    pub source: Option<FeedSource>,
}

fn default_availability() -> Availability {
    Availability::Available
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformsFile {
    pub platforms: Vec<PlatformConfig>,
}

impl PlatformsFile {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PlatformConfig> {
        self.platforms.iter().find(|p| p.id == id)
    }

    /// Display name for `id`, falling back to the id itself for platforms
    /// missing from the catalog.
    #[must_use]
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map_or(id, |p| p.name.as_str())
    }
}

/// Load and validate the platform catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_platforms(path: &Path) -> Result<PlatformsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PlatformsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_platforms(&content)
}

/// Parse and validate a platform catalog from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text does not parse or fails validation.
pub fn parse_platforms(content: &str) -> Result<PlatformsFile, ConfigError> {
    let file: PlatformsFile =
        serde_yaml::from_str(content).map_err(ConfigError::PlatformsFileParse)?;
    validate_platforms(&file)?;
    Ok(file)
}

fn validate_platforms(file: &PlatformsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for platform in &file.platforms {
        let id = platform.id.trim();
        if id.is_empty() {
            return Err(ConfigError::Validation(
                "platform id must be non-empty".to_string(),
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(ConfigError::Validation(format!(
                "platform id '{id}' must be lowercase ascii, digits, '-' or '_'"
            )));
        }
        if platform.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "platform '{id}' has an empty name"
            )));
        }
        if !seen.insert(id.to_string()) {
            return Err(ConfigError::Validation(format!(
                "duplicate platform id: '{id}'"
            )));
        }
        if let Some(FeedSource::Http { url }) = &platform.source {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "platform '{id}' feed url must be http(s): '{url}'"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r"
platforms:
  - id: reelshort
    name: ReelShort
    region: global
    homepage: https://www.reelshort.com/
    source:
      kind: http
      url: https://feeds.example.com/reelshort.json
  - id: hongguo
    name: Hongguo
    region: cn
    source:
      kind: file
      path: ./feeds/hongguo.json
  - id: flextv
    name: FlexTV
    status: unreachable
";

    #[test]
    fn parses_catalog_with_both_source_kinds() {
        let file = parse_platforms(CATALOG).unwrap();
        assert_eq!(file.platforms.len(), 3);
        assert_eq!(
            file.get("reelshort").unwrap().source,
            Some(FeedSource::Http {
                url: "https://feeds.example.com/reelshort.json".to_string()
            })
        );
        assert_eq!(
            file.get("hongguo").unwrap().source,
            Some(FeedSource::File {
                path: PathBuf::from("./feeds/hongguo.json")
            })
        );
    }

    #[test]
    fn status_defaults_to_available() {
        let file = parse_platforms(CATALOG).unwrap();
        assert_eq!(file.get("reelshort").unwrap().status, Availability::Available);
        assert_eq!(file.get("flextv").unwrap().status, Availability::Unreachable);
        assert!(file.get("flextv").unwrap().source.is_none());
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let file = parse_platforms(CATALOG).unwrap();
        assert_eq!(file.display_name("reelshort"), "ReelShort");
        assert_eq!(file.display_name("unknown"), "unknown");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let yaml = "platforms:\n  - {id: a, name: A}\n  - {id: a, name: B}\n";
        let err = parse_platforms(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn rejects_uppercase_id() {
        let yaml = "platforms:\n  - {id: ReelShort, name: ReelShort}\n";
        assert!(matches!(
            parse_platforms(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_name() {
        let yaml = "platforms:\n  - {id: a, name: '  '}\n";
        assert!(matches!(
            parse_platforms(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_non_http_feed_url() {
        let yaml = "platforms:\n  - id: a\n    name: A\n    source: {kind: http, url: 'ftp://x'}\n";
        assert!(matches!(
            parse_platforms(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(matches!(
            parse_platforms("platforms: [[["),
            Err(ConfigError::PlatformsFileParse(_))
        ));
    }

    #[test]
    fn load_platforms_reports_missing_file() {
        let err = load_platforms(Path::new("/nonexistent/platforms.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::PlatformsFileIo { .. }));
    }

    #[test]
    fn load_platforms_from_shipped_catalog() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("platforms.yaml");
        assert!(path.exists(), "platforms.yaml missing at {path:?}");
        let catalog = load_platforms(&path).unwrap();
        assert!(catalog.get("reelshort").is_some());
        assert_eq!(
            catalog.get("flextv").map(|p| &p.status),
            Some(&Availability::Unreachable)
        );
    }
}
