//! Loading mock specifications from files, and environment overrides.
//!
//! A spec file maps command names to either a string (print it, exit 0) or a
//! table of rules:
//!
//! ```toml
//! saynay = "Nay sayers say nay."
//!
//! [git]
//! otherwise = { stderr = "unexpected git call", returncode = 2 }
//!
//! [[git.when]]
//! args = ["rev-parse", "HEAD"]
//! stdout = "0123abcd"
//!
//! [[git.when]]
//! args = []
//! stdout = "usage: git"
//! returncode = 1
//! ```
//!
//! JSON files use the same shape.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::behavior::{ArgsSpec, BehaviorSpec, MockSpec, PartialReaction, ReactionSpec};
use crate::error::{MockError, Result};

/// Set to `1`, `true`, `yes` or `on` to keep every session's temp dir.
pub const KEEP_TEMP_DIR_ENV: &str = "SHMOCK_KEEP_TEMP_DIR";

/// Filter directive for [`crate::logging::init_test_logging`].
pub const LOG_ENV: &str = "SHMOCK_LOG";

/// Whether the environment asks for temp dirs to be preserved.
pub fn keep_temp_dir_from_env() -> bool {
    env::var(KEEP_TEMP_DIR_ENV)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArgsFile {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    args: ArgsFile,
    stdout: Option<String>,
    stderr: Option<String>,
    returncode: Option<i32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    #[serde(default)]
    when: Vec<RuleFile>,
    otherwise: Option<ReactionSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BehaviorFile {
    Always(String),
    Table(TableFile),
}

impl From<BehaviorFile> for BehaviorSpec {
    fn from(file: BehaviorFile) -> Self {
        let table = match file {
            BehaviorFile::Always(text) => return BehaviorSpec::Always(text),
            BehaviorFile::Table(table) => table,
        };
        let mut rules: Vec<(ArgsSpec, ReactionSpec)> = table
            .when
            .into_iter()
            .map(|rule| {
                let args = match rule.args {
                    ArgsFile::One(arg) => ArgsSpec::Single(arg),
                    ArgsFile::Many(args) => ArgsSpec::Sequence(args),
                };
                let reaction = PartialReaction {
                    stdout: rule.stdout,
                    stderr: rule.stderr,
                    returncode: rule.returncode,
                };
                (args, ReactionSpec::Partial(reaction))
            })
            .collect();
        if let Some(otherwise) = table.otherwise {
            rules.push((ArgsSpec::Wildcard, otherwise));
        }
        BehaviorSpec::Table(rules)
    }
}

fn from_files(files: BTreeMap<String, BehaviorFile>) -> MockSpec {
    files.into_iter().collect()
}

impl MockSpec {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let files: BTreeMap<String, BehaviorFile> = toml::from_str(s)?;
        Ok(from_files(files))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let files: BTreeMap<String, BehaviorFile> = serde_json::from_str(s)?;
        Ok(from_files(files))
    }

    /// Load a spec file, choosing the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let parse: fn(&str) -> Result<Self> = match extension.as_deref() {
            Some("toml") => Self::from_toml_str,
            Some("json") => Self::from_json_str,
            _ => return Err(MockError::UnsupportedSpecFormat(path.to_path_buf())),
        };
        let text = fs::read_to_string(path).map_err(|source| MockError::ReadSpec {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("loading mock spec from {}", path.display());
        parse(&text)
    }
}
