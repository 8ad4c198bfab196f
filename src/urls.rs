//! # URL and Path Arithmetic
//!
//! This module provides the purely lexical URL operations the resolver is
//! built on: joining a base URL with a relative segment, deriving the
//! default sibling URL for a dependency that only has a name, and
//! classifying URLs as absolute or relative.
//!
//! A URL is either absolute (`https://`, `ssh://`, `file://`, any other
//! scheme, or the opaque `user@host:path` form git accepts) or a relative
//! path. No network access happens here; everything operates on strings.

use url::Url;

/// Check whether `url` is absolute.
///
/// # Examples
///
/// ```
/// use git_ws::urls::is_absolute;
///
/// assert!(is_absolute("https://example.com/repo.git"));
/// assert!(is_absolute("file:///srv/git/repo"));
/// assert!(is_absolute("git@github.com:user/repo.git"));
/// assert!(!is_absolute("../repo.git"));
/// assert!(!is_absolute("repo.git"));
/// ```
pub fn is_absolute(url: &str) -> bool {
    scp_path_start(url).is_some() || Url::parse(url).is_ok()
}

/// Resolve `url` relative to `base`.
///
/// Unlike a plain RFC 3986 join, this supports relative URLs against
/// `ssh://` and `user@host:path` bases, which is what git remotes use.
/// The base is always treated as a directory, and `..` segments are
/// collapsed against its path component. The base's scheme (including
/// `file://`) is preserved.
///
/// # Examples
///
/// ```
/// use git_ws::urls::join;
///
/// assert_eq!(
///     join(Some("https://domain.com/base/repo1.git"), "../repo2.git"),
///     "https://domain.com/base/repo2.git"
/// );
/// assert_eq!(
///     join(Some("https://domain.com/base/repo1.git/"), "repo2.git"),
///     "https://domain.com/base/repo1.git/repo2.git"
/// );
/// assert_eq!(
///     join(Some("git@host.com:base/repo1.git"), "../repo2.git"),
///     "git@host.com:base/repo2.git"
/// );
/// assert_eq!(join(None, "../repo2.git"), "../repo2.git");
/// assert_eq!(
///     join(Some("ssh://h/a/b"), "ssh://h/c"),
///     "ssh://h/c"
/// );
/// ```
pub fn join(base: Option<&str>, url: &str) -> String {
    let base = match base {
        Some(base) if !base.is_empty() => base,
        _ => return url.to_string(),
    };
    if is_absolute(url) {
        return url.to_string();
    }

    let (prefix, base_path) = split_base(base);
    let rooted = base_path.starts_with('/');

    // A rooted relative URL replaces the whole path component.
    let (mut segments, rel): (Vec<&str>, &str) = if let Some(stripped) = url.strip_prefix('/') {
        (Vec::new(), stripped)
    } else {
        (
            base_path
                .split('/')
                .filter(|seg| !seg.is_empty() && *seg != ".")
                .collect(),
            url,
        )
    };

    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|seg| *seg != "..") {
                    segments.pop();
                } else if !rooted && prefix.is_none() {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match prefix {
        Some(prefix) => format!("{prefix}{joined}"),
        None if rooted => format!("/{joined}"),
        None => joined,
    }
}

/// Derive the default sub-URL for dependency `name`, carrying over the
/// suffix of `base`'s last path segment.
///
/// If the repository containing the manifest uses a `.git`-style suffix,
/// its dependencies default to the same convention.
///
/// # Examples
///
/// ```
/// use git_ws::urls::url_sub;
///
/// assert_eq!(url_sub(Some("https://d.com/base/repo1"), "repo2"), "repo2");
/// assert_eq!(url_sub(Some("https://d.com/base/repo1.git"), "repo2"), "repo2.git");
/// assert_eq!(url_sub(Some("https://d.com/base/repo1.a.b"), "repo2"), "repo2.b");
/// assert_eq!(url_sub(None, "repo2.git"), "repo2.git");
/// ```
pub fn url_sub(base: Option<&str>, name: &str) -> String {
    let base = match base {
        Some(base) if !base.is_empty() => base,
        _ => return name.to_string(),
    };
    let path = url_path(base);
    let last = path.rsplit('/').next().unwrap_or("");
    match last.rsplit_once('.') {
        Some((stem, suffix)) if !stem.is_empty() && !suffix.is_empty() => {
            format!("{name}.{suffix}")
        }
        _ => name.to_string(),
    }
}

/// Normalize a workspace-relative path: strip `.` segments, collapse `..`,
/// and unify separators. Returns `None` if the path is absolute or escapes
/// the workspace root.
///
/// # Examples
///
/// ```
/// use git_ws::urls::normalize_path;
///
/// assert_eq!(normalize_path("./libs//foo/"), Some("libs/foo".to_string()));
/// assert_eq!(normalize_path("libs/../foo"), Some("foo".to_string()));
/// assert_eq!(normalize_path("../outside"), None);
/// assert_eq!(normalize_path("/absolute"), None);
/// ```
pub fn normalize_path(path: &str) -> Option<String> {
    let path = path.replace('\\', "/");
    if path.starts_with('/') {
        return None;
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// Extract the path component of an absolute or relative git URL.
fn url_path(url: &str) -> &str {
    if let Some(start) = scp_path_start(url) {
        return &url[start..];
    }
    if let Some(scheme_end) = url.find("://") {
        let rest = &url[scheme_end + 3..];
        return match rest.find('/') {
            Some(slash) => &rest[slash..],
            None => "",
        };
    }
    url
}

/// Offset of the path component in a `user@host:path` URL, or `None` if
/// the URL is not of that form.
fn scp_path_start(url: &str) -> Option<usize> {
    let colon = url.find(':')?;
    if url[colon..].starts_with("://") {
        return None;
    }
    let head = &url[..colon];
    if head.contains('/') || !head.contains('@') {
        return None;
    }
    Some(colon + 1)
}

/// Split a base URL into an opaque prefix (scheme + authority, or
/// `user@host:`) and its path component.
fn split_base(base: &str) -> (Option<String>, &str) {
    if let Some(start) = scp_path_start(base) {
        return (Some(base[..start].to_string()), &base[start..]);
    }
    if let Some(scheme_end) = base.find("://") {
        let rest = &base[scheme_end + 3..];
        return match rest.find('/') {
            Some(slash) => {
                let authority_end = scheme_end + 3 + slash;
                (Some(base[..authority_end].to_string() + "/"), &base[authority_end..])
            }
            None => (Some(base.to_string() + "/"), ""),
        };
    }
    (None, base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_absolute_wins() {
        assert_eq!(
            join(Some("https://d.com/a/b"), "https://other.com/c"),
            "https://other.com/c"
        );
        assert_eq!(
            join(Some("https://d.com/a/b"), "git@host:c/d.git"),
            "git@host:c/d.git"
        );
    }

    #[test]
    fn test_join_sibling() {
        assert_eq!(
            join(Some("https://example.com/app"), "../mylib"),
            "https://example.com/mylib"
        );
    }

    #[test]
    fn test_join_clamps_at_root() {
        assert_eq!(join(Some("https://d.com/a"), "../../../x"), "https://d.com/x");
    }

    #[test]
    fn test_join_keeps_leading_dotdot_for_relative_base() {
        assert_eq!(join(Some("a"), "../../x"), "../x");
        assert_eq!(join(Some("a/b"), "../c"), "a/c");
    }

    #[test]
    fn test_join_file_scheme_preserved() {
        assert_eq!(
            join(Some("file:///srv/git/app"), "../lib"),
            "file:///srv/git/lib"
        );
    }

    #[test]
    fn test_join_ssh() {
        assert_eq!(
            join(Some("ssh://domain.com/base/repo1.git"), "../repo2.git"),
            "ssh://domain.com/base/repo2.git"
        );
        assert_eq!(
            join(Some("ssh://domain.com/base/repo1.git/"), "repo2.git"),
            "ssh://domain.com/base/repo1.git/repo2.git"
        );
    }

    #[test]
    fn test_join_scp_like() {
        assert_eq!(
            join(Some("git@github.com:user/app.git"), "../lib.git"),
            "git@github.com:user/lib.git"
        );
    }

    #[test]
    fn test_join_without_base() {
        assert_eq!(join(None, "repo2.git"), "repo2.git");
        assert_eq!(join(Some(""), "../repo2.git"), "../repo2.git");
    }

    #[test]
    fn test_join_rooted_relative() {
        assert_eq!(join(Some("https://d.com/a/b"), "/x/y"), "https://d.com/x/y");
    }

    #[test]
    fn test_url_sub_no_suffix() {
        assert_eq!(url_sub(Some("https://d.com/base/repo1"), "repo2"), "repo2");
    }

    #[test]
    fn test_url_sub_git_suffix() {
        assert_eq!(
            url_sub(Some("git@host:base/repo1.git"), "repo2"),
            "repo2.git"
        );
    }

    #[test]
    fn test_url_sub_hidden_dir_is_not_a_suffix() {
        // A leading dot (e.g. '.repo') marks a hidden name, not a suffix.
        assert_eq!(url_sub(Some("https://d.com/base/.repo"), "other"), "other");
    }

    #[test]
    fn test_is_absolute() {
        assert!(is_absolute("https://example.com/x"));
        assert!(is_absolute("ssh://example.com/x"));
        assert!(is_absolute("file:///x"));
        assert!(is_absolute("user@host:path/repo.git"));
        assert!(!is_absolute("path/repo.git"));
        assert!(!is_absolute("../repo.git"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("a/b/c"), Some("a/b/c".to_string()));
        assert_eq!(normalize_path("a/./b/"), Some("a/b".to_string()));
        assert_eq!(normalize_path("a/../b"), Some("b".to_string()));
        assert_eq!(normalize_path("a/../../b"), None);
        assert_eq!(normalize_path(""), None);
    }
}
