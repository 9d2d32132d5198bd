use std::{
    borrow::Cow,
    io::ErrorKind,
    path::{Path, PathBuf},
    string::FromUtf8Error,
};

use clap::ValueEnum;
use compio::fs;
use fsnap::snapshot::CaseSensitivity;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::application::data::CaseMode;
use crate::ext::BestEffortPathExt;

const CONFIG_FILE_NAME: &str = "fsnap.yaml";

fn get_config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

fn key(name: &str) -> Yaml<'_> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

/// Project settings read from `fsnap.yaml`. Unset values leave the decision to the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeConfig {
    pub case_sensitivity: Option<CaseSensitivity>,
    pub list_directories: Option<bool>,
    pub fail_fast: Option<bool>,
    pub paths: Vec<String>,
    pub invalidate: Vec<String>,
}

impl ProbeConfig {
    pub async fn read(root: &Path) -> Result<Self, ProbeConfigCreationError> {
        Self::from_path(get_config_file_path(root)).await
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, ProbeConfigCreationError> {
        debug!("Reading config file: {}", path.best_effort_path_display());
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(error) => {
                return Err(error).context(ReadSnafu {
                    file_path: path.best_effort_path_display(),
                });
            }
        };
        debug!("Successfully read config file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    fn parse_path_list(
        top_level: &LinkedHashMap<Yaml, Yaml>,
        name: &'static str,
    ) -> Result<Vec<String>, ProbeConfigCreationError> {
        let Some(value) = top_level.get(&key(name)) else {
            return Ok(Vec::new());
        };

        value
            .as_sequence()
            .and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .context(PathsNotListSnafu { key: name })
    }

    fn parse_case_sensitivity(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Option<CaseSensitivity>, ProbeConfigCreationError> {
        let Some(value) = top_level.get(&key("caseSensitivity")) else {
            return Ok(None);
        };

        let text = value.as_str().unwrap_or_default();
        CaseMode::from_str(text, true)
            .ok()
            .map(|mode| Some(mode.to_case_sensitivity()))
            .context(InvalidCaseSensitivitySnafu {
                value: value
                    .as_str()
                    .map_or_else(|| format!("{value:?}"), str::to_string),
            })
    }

    fn parse_flag(
        top_level: &LinkedHashMap<Yaml, Yaml>,
        name: &'static str,
    ) -> Result<Option<bool>, ProbeConfigCreationError> {
        top_level
            .get(&key(name))
            .map(|value| value.as_bool().context(InvalidFlagSnafu { key: name }))
            .transpose()
    }
}

impl TryFrom<&str> for ProbeConfig {
    type Error = ProbeConfigCreationError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let contents_vec = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let contents = contents_vec
            .first()
            .context(MalformedConfigSnafu)?;

        let top_level = contents.as_mapping().context(TopLevelNotMapSnafu)?;

        Ok(ProbeConfig {
            case_sensitivity: Self::parse_case_sensitivity(top_level)?,
            list_directories: Self::parse_flag(top_level, "listDirectories")?,
            fail_fast: Self::parse_flag(top_level, "failFast")?,
            paths: Self::parse_path_list(top_level, "paths")?,
            invalidate: Self::parse_path_list(top_level, "invalidate")?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ProbeConfigCreationError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("The config file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted config file"))]
    MalformedConfig,
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("'{}' should be a list of paths", key))]
    PathsNotList { key: String },
    #[snafu(display(
        "Invalid caseSensitivity {}, expected 'sensitive' or 'insensitive'",
        value
    ))]
    InvalidCaseSensitivity { value: String },
    #[snafu(display("'{}' should be true or false", key))]
    InvalidFlag { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use tempfile::TempDir;

    fn parse(contents: &str) -> Result<ProbeConfig, ProbeConfigCreationError> {
        contents.try_into()
    }

    #[compio::test]
    async fn missing_file_yields_defaults() {
        let root = TempDir::new().expect("Failed to create temp directory");
        let config = ProbeConfig::read(root.path()).await.unwrap();
        assert_eq!(config, ProbeConfig::default());
    }

    #[compio::test]
    async fn config_is_read_from_root() {
        let root = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(
            root.path().join(CONFIG_FILE_NAME),
            "listDirectories: true\npaths: [src, Cargo.toml]\n",
        )
        .expect("Failed to write config file");

        let config = ProbeConfig::read(root.path()).await.unwrap();

        assert_eq!(config.list_directories, Some(true));
        assert_eq!(config.paths, ["src", "Cargo.toml"]);
    }

    #[compio::test]
    async fn unreadable_config_is_an_error() {
        let root = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir(root.path().join(CONFIG_FILE_NAME)).expect("Failed to create dir");

        let result = ProbeConfig::read(root.path()).await;
        assert!(matches!(
            result,
            Err(ProbeConfigCreationError::ReadError { .. })
        ));
    }

    #[test]
    fn full_config_is_parsed() {
        let config = parse(
            r#"
caseSensitivity: Insensitive
listDirectories: false
failFast: true
paths:
  - src/main.rs
  - target
invalidate:
  - src/main.rs
"#,
        )
        .unwrap();

        assert_eq!(
            config,
            ProbeConfig {
                case_sensitivity: Some(CaseSensitivity::Insensitive),
                list_directories: Some(false),
                fail_fast: Some(true),
                paths: vec!["src/main.rs".to_string(), "target".to_string()],
                invalidate: vec!["src/main.rs".to_string()],
            }
        );
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        assert_eq!(parse("other: value").unwrap(), ProbeConfig::default());
    }

    #[rstest]
    #[case::invalid_yaml("invalid: yaml: content: [unclosed")]
    fn invalid_yaml_fails_to_parse(#[case] contents: &str) {
        assert!(matches!(
            parse(contents),
            Err(ProbeConfigCreationError::ParseError { .. })
        ));
    }

    #[test]
    fn empty_file_is_malformed() {
        assert!(matches!(
            parse(""),
            Err(ProbeConfigCreationError::MalformedConfig)
        ));
    }

    #[rstest]
    #[case("- item1\n- item2")]
    #[case("just a string")]
    fn top_level_must_be_a_map(#[case] contents: &str) {
        assert!(matches!(
            parse(contents),
            Err(ProbeConfigCreationError::TopLevelNotMap)
        ));
    }

    #[rstest]
    #[case("paths: src", "paths")]
    #[case("paths:\n  - nested: map", "paths")]
    #[case("invalidate: {a: b}", "invalidate")]
    fn path_lists_must_hold_strings(#[case] contents: &str, #[case] expected_key: &str) {
        match parse(contents) {
            Err(ProbeConfigCreationError::PathsNotList { key }) => assert_eq!(key, expected_key),
            other => panic!("Expected PathsNotList, got {other:?}"),
        }
    }

    #[rstest]
    #[case("caseSensitivity: sometimes")]
    #[case("caseSensitivity: [sensitive]")]
    fn case_sensitivity_must_be_known(#[case] contents: &str) {
        assert!(matches!(
            parse(contents),
            Err(ProbeConfigCreationError::InvalidCaseSensitivity { .. })
        ));
    }

    #[rstest]
    #[case("listDirectories: often", "listDirectories")]
    #[case("failFast: [yes]", "failFast")]
    fn flags_must_be_booleans(#[case] contents: &str, #[case] expected_key: &str) {
        match parse(contents) {
            Err(ProbeConfigCreationError::InvalidFlag { key }) => assert_eq!(key, expected_key),
            other => panic!("Expected InvalidFlag, got {other:?}"),
        }
    }
}
