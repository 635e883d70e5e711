//! Utility functions for paths, repository URLs and templates

use std::path::Path;

/// Check if a repository location is a local filesystem path (not a remote URL)
///
/// Returns true for:
/// - Absolute paths on Unix: /path/to/repo
/// - Absolute paths on Windows: C:\path\to\repo or C:/path/to/repo
/// - Relative paths: ./path or ../path
/// - file:// URLs
///
/// Returns false for:
/// - SSH URLs: git@github.com:user/repo.git
/// - HTTPS URLs: <https://github.com/user/repo.git>
pub fn is_local_path(path: &str) -> bool {
  if path.starts_with("file://") {
    return true;
  }

  if path.starts_with("./") || path.starts_with("../") {
    return true;
  }

  // Windows drive letter (C:\ or C:/), checked before the URL heuristics since it contains ':'
  if path.len() >= 3 {
    let bytes = path.as_bytes();
    if bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && (bytes[2] == b'\\' || bytes[2] == b'/') {
      return true;
    }
  }

  if path.starts_with('/') && !path.contains("://") && !path.contains('@') {
    return true;
  }

  if path.contains("://") || path.contains('@') {
    return false;
  }

  Path::new(path).is_absolute()
}

/// Convert a path to Git format (always forward slashes)
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}

/// Extract `(owner, repo)` from a repository URL
///
/// Handles `git@host:owner/repo.git`, `https://host/owner/repo(.git)`,
/// `git+https://...`, `github:owner/repo`, the `owner/repo` shorthand and
/// local paths (last two path components), which is what a local bare
/// remote such as `/srv/git/my-package.git` resolves to.
pub fn repo_slug(url: &str) -> Option<(String, String)> {
  let url = url.trim().trim_end_matches('/');
  let url = url.strip_prefix("git+").unwrap_or(url);
  let url = url.strip_prefix("github:").unwrap_or(url);

  let path = if let Some((_, rest)) = url.split_once("://") {
    // scheme://[user@]host[:port]/owner/repo
    rest.split_once('/').map(|(_, p)| p)?
  } else if !is_local_path(url) && url.contains('@') && url.contains(':') {
    // scp-like: git@host:owner/repo
    url.split_once(':').map(|(_, p)| p)?
  } else {
    url
  };

  let mut parts = path.rsplit(['/', '\\']).filter(|s| !s.is_empty());
  let repo = parts.next()?;
  let owner = parts.next()?;
  let repo = repo.strip_suffix(".git").unwrap_or(repo);

  if owner.is_empty() || repo.is_empty() {
    return None;
  }

  Some((owner.to_string(), repo.to_string()))
}

/// Substitute `{key}` placeholders. Unknown placeholders are left untouched.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
  let mut out = template.to_string();
  for (key, value) in vars {
    out = out.replace(&format!("{{{}}}", key), value);
  }
  out
}

/// Placeholder names still present in a template
pub fn template_placeholders(template: &str) -> Vec<&str> {
  let mut found = Vec::new();
  let mut rest = template;
  while let Some(start) = rest.find('{') {
    let after = &rest[start + 1..];
    let Some(end) = after.find('}') else { break };
    let name = &after[..end];
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
      found.push(name);
    }
    rest = &after[end + 1..];
  }
  found
}

/// Put `credentials` (`user:secret`, already encoded) into an http(s) URL
///
/// Any userinfo already in the URL is replaced. SSH, `file://` and local
/// paths are returned unchanged since they authenticate differently.
pub fn url_with_credentials(url: &str, credentials: &str) -> String {
  let Some((scheme, rest)) = split_http_url(url) else {
    return url.to_string();
  };
  let host_and_path = strip_userinfo(rest);
  format!("{}://{}@{}", scheme, credentials, host_and_path)
}

/// Replace the userinfo of an http(s) URL with `***`
pub fn redact_url(url: &str) -> String {
  match split_http_url(url) {
    Some((scheme, rest)) if strip_userinfo(rest) != rest => {
      format!("{}://***@{}", scheme, strip_userinfo(rest))
    }
    _ => url.to_string(),
  }
}

/// Percent-encode one userinfo component (RFC 3986 unreserved characters pass through)
pub fn encode_userinfo(part: &str) -> String {
  let mut out = String::with_capacity(part.len());
  for byte in part.bytes() {
    if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
      out.push(byte as char);
    } else {
      out.push_str(&format!("%{:02X}", byte));
    }
  }
  out
}

fn split_http_url(url: &str) -> Option<(&str, &str)> {
  let (scheme, rest) = url.split_once("://")?;
  (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")).then_some((scheme, rest))
}

fn strip_userinfo(rest: &str) -> &str {
  let authority_end = rest.find('/').unwrap_or(rest.len());
  match rest[..authority_end].rfind('@') {
    Some(at) => &rest[at + 1..],
    None => rest,
  }
}
