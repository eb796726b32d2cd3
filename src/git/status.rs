//! git::status
//!
//! Change-set parsing and allow-list validation.
//!
//! # Policies
//!
//! Two mutually exclusive policies decide what a change set may publish:
//!
//! - [`AllowPolicy::RejectDisallowed`]: every changed path must sit under an
//!   allowed root, otherwise the whole publish is refused. Fails loudly.
//! - [`AllowPolicy::KeepAllowed`]: only paths under an allowed root *and*
//!   with an allowed extension are kept; everything else is silently left
//!   out of the commit. Stricter per file, but quieter about stray changes.
//!
//! A deployment runs exactly one of them (see `[publish] policy`).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Filename ignored by the root check (macOS Finder metadata).
pub const NOISE_FILENAME: &str = ".DS_Store";

/// Content roots the publish pipeline may commit by default.
pub const DEFAULT_ROOTS: &[&str] = &[
    "public/",
    "src/content/",
    "frontend/public/",
    "frontend/src/content/",
];

/// Extensions accepted under [`AllowPolicy::KeepAllowed`] by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".json", ".png", ".jpg", ".jpeg", ".webp", ".svg", ".pdf",
];

/// Extract repository-relative paths from `git status --porcelain` output.
///
/// Lines are trimmed and blank lines dropped, the status code is stripped,
/// and `old -> new` renames yield both sides as separate entries. Order is
/// preserved and duplicates pass through.
pub fn extract_changed_paths(status: &str) -> Vec<String> {
    status
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .flat_map(|line| strip_status_code(line).split(" -> "))
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strip a leading one- or two-letter status code and the whitespace after it.
///
/// Lines that do not start with a status code are returned unchanged.
fn strip_status_code(line: &str) -> &str {
    let is_code = |c: char| c.is_ascii_uppercase() || c == '?' || c == '!';

    let code_len = line.chars().take(2).take_while(|c| is_code(*c)).count();
    if code_len == 0 {
        return line;
    }

    let rest = &line[code_len..];
    if rest.starts_with(char::is_whitespace) {
        rest.trim_start()
    } else {
        line
    }
}

/// Deduplicate keeping the first occurrence of each path.
pub fn unique_list<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .map(Into::into)
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Which allow-list policy a deployment enforces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllowPolicy {
    /// Refuse the publish if any changed path is outside the roots.
    #[default]
    RejectDisallowed,
    /// Publish only paths matching a root and an extension.
    KeepAllowed,
}

/// Root prefixes and extension suffixes a change set is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    roots: Vec<String>,
    extensions: Vec<String>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(
            DEFAULT_ROOTS.iter().copied(),
            DEFAULT_EXTENSIONS.iter().copied(),
        )
    }
}

impl AllowList {
    /// Build an allow-list. Extensions are compared case-insensitively.
    pub fn new<R, E>(roots: R, extensions: E) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            extensions: extensions
                .into_iter()
                .map(|e| e.into().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Configured roots, in order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Whether `path` starts with an allowed root.
    pub fn is_under_root(&self, path: &str) -> bool {
        self.roots.iter().any(|root| path.starts_with(root.as_str()))
    }

    /// Whether `path` ends with an allowed extension.
    pub fn has_allowed_extension(&self, path: &str) -> bool {
        let lower = path.to_ascii_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    /// Paths outside every root, ignoring [`NOISE_FILENAME`].
    ///
    /// Empty exactly when every path is allowed.
    pub fn find_invalid_paths(&self, paths: &[String]) -> Vec<String> {
        paths
            .iter()
            .filter(|path| path.as_str() != NOISE_FILENAME)
            .filter(|path| !self.is_under_root(path))
            .cloned()
            .collect()
    }

    /// Paths under a root that also carry an allowed extension.
    pub fn allowed_paths(&self, paths: &[String]) -> Vec<String> {
        paths
            .iter()
            .filter(|path| self.is_under_root(path) && self.has_allowed_extension(path))
            .cloned()
            .collect()
    }

    /// Roots (without trailing slash) that at least one path falls under.
    pub fn touched_roots(&self, paths: &[String]) -> Vec<String> {
        self.roots
            .iter()
            .filter(|root| paths.iter().any(|path| path.starts_with(root.as_str())))
            .map(|root| root.trim_end_matches('/').to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    mod extract_changed_paths {
        use super::*;

        #[test]
        fn modified_and_untracked() {
            let status = " M src/content/pages/index.json\n?? public/images/new.png\n";
            assert_eq!(
                extract_changed_paths(status),
                strings(&["src/content/pages/index.json", "public/images/new.png"])
            );
        }

        #[test]
        fn rename_yields_both_sides() {
            let status = "R  src/content/pages/project/alpha.json -> src/content/pages/project/beta.json";
            assert_eq!(
                extract_changed_paths(status),
                strings(&[
                    "src/content/pages/project/alpha.json",
                    "src/content/pages/project/beta.json"
                ])
            );
        }

        #[test]
        fn two_letter_codes() {
            assert_eq!(
                extract_changed_paths("MM src/a.json\nAM b.txt\n!! ignored.log"),
                strings(&["src/a.json", "b.txt", "ignored.log"])
            );
        }

        #[test]
        fn blank_lines_dropped() {
            assert_eq!(
                extract_changed_paths("\n\n  \n M a.json\n\n"),
                strings(&["a.json"])
            );
        }

        #[test]
        fn duplicates_pass_through() {
            assert_eq!(
                extract_changed_paths(" M a.json\n M a.json"),
                strings(&["a.json", "a.json"])
            );
        }

        #[test]
        fn line_without_code_kept_verbatim() {
            assert_eq!(extract_changed_paths("plain/path"), strings(&["plain/path"]));
        }

        #[test]
        fn empty_output() {
            assert!(extract_changed_paths("").is_empty());
        }
    }

    mod allow_list {
        use super::*;

        #[test]
        fn invalid_paths_are_those_outside_roots() {
            let list = AllowList::default();
            let paths = strings(&[
                "src/content/pages/index.json",
                "package.json",
                "frontend/public/logo.svg",
                "src/pages/index.vue",
            ]);

            assert_eq!(
                list.find_invalid_paths(&paths),
                strings(&["package.json", "src/pages/index.vue"])
            );
        }

        #[test]
        fn noise_file_ignored() {
            let list = AllowList::default();
            assert!(list.find_invalid_paths(&strings(&[".DS_Store"])).is_empty());
        }

        #[test]
        fn allowed_paths_need_root_and_extension() {
            let list = AllowList::default();
            let paths = strings(&[
                "src/content/pages/index.json",
                "src/content/notes.txt",
                "public/images/A.PNG",
                "nuxt.config.ts",
            ]);

            assert_eq!(
                list.allowed_paths(&paths),
                strings(&["src/content/pages/index.json", "public/images/A.PNG"])
            );
        }

        #[test]
        fn touched_roots_in_root_order() {
            let list = AllowList::default();
            let paths = strings(&["src/content/a.json", "public/x.png", "src/content/b.json"]);

            assert_eq!(list.touched_roots(&paths), strings(&["public", "src/content"]));
        }

        #[test]
        fn custom_roots() {
            let list = AllowList::new(["content/"], [".md"]);
            assert!(list.is_under_root("content/post.md"));
            assert!(!list.is_under_root("contents/post.md"));
        }
    }

    #[test]
    fn unique_list_keeps_first_occurrence() {
        assert_eq!(
            unique_list(["b", "a", "b", "c", "a"]),
            strings(&["b", "a", "c"])
        );
    }

    #[test]
    fn policy_deserializes_kebab_case() {
        #[derive(Deserialize)]
        struct Wrap {
            policy: AllowPolicy,
        }
        let w: Wrap = toml::from_str("policy = \"keep-allowed\"").expect("parse");
        assert_eq!(w.policy, AllowPolicy::KeepAllowed);
    }
}
