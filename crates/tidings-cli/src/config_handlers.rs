//! `tidings config` subcommands.
//!
//! Edits go through [`ConfigDocument`], which keeps the file's own TOML
//! tree (so keys the user never touched stay as written) but only saves
//! a tree that still deserializes into a [`TidingsConfig`].

use crate::cli::ConfigAction;
use crate::config::TidingsConfig;
use std::path::{Path, PathBuf};
use tidings_core::{Error, Result};

/// Run one `tidings config` action against the file named by `--config`.
///
/// Takes the raw flag rather than a loaded config: `path` and `init` must
/// work before any file exists.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let path = resolve(config_path)?;
            println!("{}", path.display());
            if !path.exists() {
                log::warn!("{} does not exist yet; `tidings config init` creates it", path.display());
            }
            Ok(())
        }
        ConfigAction::Get { key } => {
            println!("{}", show_value(&resolved_value(config_path, &key)?));
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let mut doc = ConfigDocument::open(&resolve(config_path)?)?;
            doc.assign(&key, &value)?;
            doc.save()?;
            println!("{key} = {value} ({})", doc.path.display());
            Ok(())
        }
        ConfigAction::Init { file, force } => {
            let path = match file {
                Some(file) => PathBuf::from(file),
                None => TidingsConfig::default_config_path()
                    .ok_or_else(|| Error::config("no config directory on this platform"))?,
            };
            write_defaults(&path, force)?;
            println!("wrote default configuration to {}", path.display());
            Ok(())
        }
        ConfigAction::Export => {
            for (name, value) in TidingsConfig::load(config_path)?.to_env_vars()? {
                println!("{name}={value}");
            }
            Ok(())
        }
    }
}

fn resolve(config_path: Option<&str>) -> Result<PathBuf> {
    TidingsConfig::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("no config directory on this platform"))
}

/// Look `key` up in the fully resolved configuration (file, env, defaults).
fn resolved_value(config_path: Option<&str>, key: &str) -> Result<toml::Value> {
    let config = TidingsConfig::load(config_path)?;
    let tree = toml::Value::try_from(&config).map_err(|e| Error::config(e.to_string()))?;
    walk(&tree, key)
        .cloned()
        .ok_or_else(|| Error::config(format!("unknown configuration key '{key}'")))
}

fn write_defaults(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::config(format!(
            "{} already exists (pass --force to replace it)",
            path.display()
        )));
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| Error::io_with_path(e, dir))?;
    }
    std::fs::write(path, TidingsConfig::default().to_toml_string()?)
        .map_err(|e| Error::io_with_path(e, path))
}

// ============================================================================
// ConfigDocument
// ============================================================================

/// A config file's TOML tree, edited by dotted key.
#[derive(Debug)]
struct ConfigDocument {
    path: PathBuf,
    root: toml::Table,
}

impl ConfigDocument {
    fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::config(format!(
                "{} does not exist; run `tidings config init` first",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        let root = text
            .parse::<toml::Table>()
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    /// Set `key` to `raw`, typed after the setting it names.
    ///
    /// The tree is left untouched when `key` is not a configuration
    /// setting or the result no longer parses as a [`TidingsConfig`].
    fn assign(&mut self, key: &str, raw: &str) -> Result<()> {
        let defaults = toml::Value::try_from(TidingsConfig::default())
            .map_err(|e| Error::config(e.to_string()))?;
        let value = typed_like(walk(&defaults, key), key, raw)?;

        let mut edited = self.root.clone();
        insert(&mut edited, key, value)?;

        let config: TidingsConfig = toml::Value::Table(edited.clone())
            .try_into()
            .map_err(|e| Error::config(format!("invalid value for '{key}': {e}")))?;
        let written = toml::Value::try_from(&config).map_err(|e| Error::config(e.to_string()))?;
        if walk(&written, key).is_none() {
            return Err(Error::config(format!("unknown configuration key '{key}'")));
        }

        self.root = edited;
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let text = toml::to_string_pretty(&self.root).map_err(|e| Error::config(e.to_string()))?;
        std::fs::write(&self.path, text).map_err(|e| Error::io_with_path(e, &self.path))
    }
}

// ============================================================================
// Dotted keys
// ============================================================================

fn walk<'a>(tree: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(tree, |node, part| node.as_table()?.get(part))
}

fn insert(root: &mut toml::Table, key: &str, value: toml::Value) -> Result<()> {
    let (sections, leaf) = match key.rsplit_once('.') {
        Some((sections, leaf)) => (sections.split('.').collect::<Vec<_>>(), leaf),
        None => (Vec::new(), key),
    };
    if leaf.is_empty() || sections.iter().any(|s| s.is_empty()) {
        return Err(Error::config(format!("malformed key '{key}'")));
    }

    let mut table = root;
    for section in sections {
        table = table
            .entry(section)
            .or_insert(toml::Value::Table(toml::Table::new()))
            .as_table_mut()
            .ok_or_else(|| Error::config(format!("'{section}' in '{key}' is not a section")))?;
    }
    table.insert(leaf.to_string(), value);
    Ok(())
}

/// Parse `raw` as the same TOML type as `template`.
///
/// Optional settings have no default to copy from and are kept as strings.
fn typed_like(template: Option<&toml::Value>, key: &str, raw: &str) -> Result<toml::Value> {
    let mismatch = |kind: &str| Error::config(format!("'{key}' expects {kind}, got '{raw}'"));
    Ok(match template {
        Some(toml::Value::Boolean(_)) => {
            toml::Value::Boolean(raw.parse().map_err(|_| mismatch("true or false"))?)
        }
        Some(toml::Value::Integer(_)) => {
            toml::Value::Integer(raw.parse().map_err(|_| mismatch("an integer"))?)
        }
        Some(toml::Value::Float(_)) => {
            toml::Value::Float(raw.parse().map_err(|_| mismatch("a number"))?)
        }
        Some(toml::Value::Table(_)) => return Err(mismatch("a section of settings")),
        _ => toml::Value::String(raw.to_string()),
    })
}

fn show_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Table(_) | toml::Value::Array(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
