//! Navigation et fusion dans l'arbre YAML de configuration.
//!
//! Keys are stored lowercase; every lookup lowercases the requested path.

use anyhow::{anyhow, Result};
use serde_yaml::{Mapping, Value};

fn key(name: &str) -> Value {
    Value::String(name.to_lowercase())
}

pub(crate) fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |node, name| node.as_mapping()?.get(&key(name)))
}

/// Writes `value` at `path`, creating the intermediate mappings.
pub(crate) fn insert(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for (depth, name) in parents.iter().enumerate() {
        let map = node
            .as_mapping_mut()
            .ok_or_else(|| anyhow!("{} is not a section", path[..depth].join(".")))?;
        node = map
            .entry(key(name))
            .or_insert(Value::Mapping(Mapping::new()));
    }

    node.as_mapping_mut()
        .ok_or_else(|| anyhow!("{} is not a section", parents.join(".")))?
        .insert(key(last), value);
    Ok(())
}

/// Layers `top` over `base`: sections merge key by key, anything else is
/// replaced.
pub(crate) fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Mapping(base), Value::Mapping(top)) => {
            for (name, value) in top {
                match base.get_mut(&name) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base.insert(name, value);
                    }
                }
            }
        }
        (base, top) => *base = top,
    }
}

pub(crate) fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(name, value)| {
                    let name = match name {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (name, lowercase_keys(value))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let root = yaml("server:\n  port: 7905\n");
        assert_eq!(lookup(&root, &["Server", "PORT"]), Some(&yaml("7905")));
        assert_eq!(lookup(&root, &["server", "host"]), None);
        assert_eq!(lookup(&root, &["server", "port", "deeper"]), None);
    }

    #[test]
    fn test_insert_creates_sections() {
        let mut root = yaml("a: 1\n");
        insert(&mut root, &["b", "c", "d"], Value::Bool(true)).unwrap();
        assert_eq!(root, yaml("a: 1\nb:\n  c:\n    d: true\n"));
    }

    #[test]
    fn test_insert_below_scalar_fails() {
        let mut root = yaml("a: 1\n");
        assert!(insert(&mut root, &["a", "b"], Value::Bool(true)).is_err());
        assert_eq!(root, yaml("a: 1\n"));
    }

    #[test]
    fn test_overlay_merges_sections_and_replaces_scalars() {
        let mut base = yaml("a: 1\nb:\n  c: 2\nlist: [1, 2]\n");
        overlay(&mut base, yaml("b:\n  c: 3\n  d: 4\nlist: [9]\n"));
        assert_eq!(base, yaml("a: 1\nb:\n  c: 3\n  d: 4\nlist: [9]\n"));
    }

    #[test]
    fn test_lowercase_keys_recurses() {
        let value = lowercase_keys(yaml("Remote:\n  Window:\n    - Size: 3\n"));
        assert_eq!(value, yaml("remote:\n  window:\n    - size: 3\n"));
    }
}
