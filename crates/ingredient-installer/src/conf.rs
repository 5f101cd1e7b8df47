use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// stanza -> key -> value
pub type Stanzas = BTreeMap<String, BTreeMap<String, String>>;

/// Stanza that collects settings written before the first header.
pub const GLOBAL_STANZA: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Keep stanzas and keys already on disk, overriding the ones given.
    Merge,
    /// Replace the file with exactly the given stanzas.
    Reset,
}

/// Parses `[stanza]` / `key = value` text. Comments and blank lines are
/// dropped; a line without `=` is ignored.
pub fn parse_conf(raw: &str) -> Stanzas {
    let mut stanzas = Stanzas::new();
    let mut current = GLOBAL_STANZA.to_string();

    for line in raw.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            current = name.trim().to_string();
            stanzas.entry(current.clone()).or_default();
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        stanzas
            .entry(current.clone())
            .or_default()
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    stanzas
}

pub fn render_conf(stanzas: &Stanzas) -> String {
    let mut out = String::new();
    for (name, entries) in stanzas {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{name}]\n"));
        for (key, value) in entries {
            out.push_str(&format!("{key} = {value}\n"));
        }
    }
    out
}

pub fn read_conf(path: &Path) -> Result<Option<Stanzas>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(parse_conf(&raw))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Value of `key` in `stanza`, if the file exists and carries it.
pub fn read_conf_value(path: &Path, stanza: &str, key: &str) -> Result<Option<String>> {
    Ok(read_conf(path)?
        .and_then(|mut stanzas| stanzas.remove(stanza))
        .and_then(|mut entries| entries.remove(key)))
}

/// Writes `stanzas` to `path`. Returns whether the file content changed.
pub fn write_conf(path: &Path, stanzas: &Stanzas, mode: WriteMode) -> Result<bool> {
    let existing = match fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let merged = match (mode, existing.as_deref()) {
        (WriteMode::Merge, Some(raw)) => {
            let mut merged = parse_conf(raw);
            for (name, entries) in stanzas {
                merged
                    .entry(name.clone())
                    .or_default()
                    .extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            merged
        }
        _ => stanzas.clone(),
    };

    let rendered = render_conf(&merged);
    if existing.as_deref() == Some(rendered.as_str()) {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
