//! Module-resolution aliases

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Rewrites imports of `find` (or `find/...`) to `replacement`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub find: String,
    pub replacement: PathBuf,
}

impl Alias {
    pub fn new(find: impl Into<String>, replacement: impl Into<PathBuf>) -> Self {
        Self {
            find: find.into(),
            replacement: replacement.into(),
        }
    }

    /// Resolves `specifier` if this alias applies to it
    pub fn resolve(&self, specifier: &str) -> Option<PathBuf> {
        if specifier == self.find {
            return Some(self.replacement.clone());
        }
        let rest = specifier.strip_prefix(&self.find)?.strip_prefix('/')?;
        Some(self.replacement.join(rest))
    }
}

/// The module-resolution part of a bundler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Ordered; the first matching alias wins
    pub alias: Vec<Alias>,
}

impl ResolveConfig {
    pub fn new(alias: Vec<Alias>) -> Self {
        Self { alias }
    }

    pub fn resolve(&self, specifier: &str) -> Option<PathBuf> {
        resolve_alias(&self.alias, specifier)
    }

    pub fn get(&self, find: &str) -> Option<&Alias> {
        self.alias.iter().find(|alias| alias.find == find)
    }
}

/// Resolves `specifier` with the first alias that applies
pub fn resolve_alias(aliases: &[Alias], specifier: &str) -> Option<PathBuf> {
    aliases.iter().find_map(|alias| alias.resolve(specifier))
}

/// Appends `namespace -> output_dir` to the caller's aliases.
///
/// Caller aliases are never dropped or reordered. If the caller already maps
/// `namespace`, their mapping is kept and nothing is added.
pub fn merge_aliases(existing: &[Alias], namespace: &str, output_dir: &Path) -> Vec<Alias> {
    let mut merged = existing.to_vec();
    if !existing.iter().any(|alias| alias.find == namespace) {
        merged.push(Alias::new(namespace, output_dir));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_resolution() {
        let alias = Alias::new("@tx3", "/app/node_modules/.tx3");

        assert_eq!(
            alias.resolve("@tx3"),
            Some(PathBuf::from("/app/node_modules/.tx3"))
        );
        assert_eq!(
            alias.resolve("@tx3/sample"),
            Some(PathBuf::from("/app/node_modules/.tx3/sample"))
        );
        assert_eq!(alias.resolve("@tx3x/sample"), None);
        assert_eq!(alias.resolve("react"), None);
    }

    #[test]
    fn test_merge_keeps_existing_aliases() {
        let existing = vec![Alias::new("@existing", "/path/to/existing")];
        let merged = ResolveConfig::new(merge_aliases(
            &existing,
            "@tx3",
            Path::new("/app/node_modules/.tx3"),
        ));

        assert_eq!(merged.alias.len(), 2);
        assert_eq!(merged.alias[0], existing[0]);
        assert_eq!(
            merged.resolve("@existing/lib"),
            Some(PathBuf::from("/path/to/existing/lib"))
        );
        assert_eq!(
            merged.resolve("@tx3/sample"),
            Some(PathBuf::from("/app/node_modules/.tx3/sample"))
        );
    }

    #[test]
    fn test_merge_prefers_caller_mapping_for_same_namespace() {
        let existing = vec![Alias::new("@tx3", "/custom/bindings")];
        let merged = merge_aliases(&existing, "@tx3", Path::new("/app/node_modules/.tx3"));

        assert_eq!(merged, existing);
    }

    #[test]
    fn test_first_matching_alias_wins() {
        let aliases = vec![
            Alias::new("@tx3", "/first"),
            Alias::new("@tx3", "/second"),
        ];
        assert_eq!(
            resolve_alias(&aliases, "@tx3/protocol"),
            Some(PathBuf::from("/first/protocol"))
        );
        assert_eq!(resolve_alias(&aliases, "@other"), None);
    }

    #[test]
    fn test_merge_into_empty_config() {
        let merged = merge_aliases(&[], "@tx3", Path::new("/out"));
        assert_eq!(merged, vec![Alias::new("@tx3", "/out")]);
    }
}
