use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_schema() -> String {
    "public".to_string()
}

/// Whether a column's value is written to the flat file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

/// Dump configuration loaded from `dump-db.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DumpConfig {
    /// Namespace the configured tables live in.
    #[serde(default = "default_schema")]
    pub schema: String,
    pub tables: BTreeMap<String, TableConfig>,
}

/// Per-table export and restore rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    /// Tables that must precede this one in export and restore order.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// SQL predicate restricting which rows are exported.
    #[serde(default)]
    pub filter: Option<String>,
    pub columns: BTreeMap<String, Visibility>,
    /// Literal defaults installed for private columns while loading.
    #[serde(default)]
    pub column_defaults: BTreeMap<String, String>,
    /// Triggers that stay enabled while rows are loaded.
    #[serde(default)]
    pub load_triggers: Vec<String>,
}

impl DumpConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: DumpConfig = toml::from_str(contents)?;
        config.check_dependencies()?;
        config.check_filters()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Dependency edges keyed by table, pointing at the tables that depend on it.
    pub fn dependents(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (name, table) in &self.tables {
            graph.entry(name.clone()).or_default();
            for dependency in &table.dependencies {
                graph
                    .entry(dependency.clone())
                    .or_default()
                    .insert(name.clone());
            }
        }
        graph
    }

    fn check_dependencies(&self) -> Result<()> {
        for (name, table) in &self.tables {
            for dependency in &table.dependencies {
                if !self.tables.contains_key(dependency) {
                    return Err(Error::Configuration(format!(
                        "table `{name}` depends on `{dependency}`, which is not configured"
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_filters(&self) -> Result<()> {
        for (name, table) in &self.tables {
            if let Some(filter) = &table.filter {
                check_filter(name, filter)?;
            }
        }
        Ok(())
    }
}

static FILTER_TOKEN: LazyLock<std::result::Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|--|/\*|;|'|""#)
});

/// A filter is embedded in a single-line `WHERE (...)`, so it must not carry
/// comments, statement separators or unterminated quotes.
fn check_filter(table: &str, filter: &str) -> Result<()> {
    let pattern = FILTER_TOKEN
        .as_ref()
        .map_err(|err| Error::Configuration(format!("invalid filter pattern: {err}")))?;
    for token in pattern.find_iter(filter) {
        let problem = match token.as_str() {
            "--" | "/*" => "a comment",
            ";" => "a statement separator",
            "'" | "\"" => "an unterminated quote",
            _ => continue,
        };
        return Err(Error::Configuration(format!(
            "filter for table `{table}` contains {problem}"
        )));
    }
    Ok(())
}
