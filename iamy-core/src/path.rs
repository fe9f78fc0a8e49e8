//! Mapping between a resource's identity and its file path in a YAML tree.
//!
//! A [`PathTemplate`] is written once, e.g. `{account}/{kind}{path}{name}.yaml`,
//! and both directions are derived from it: rendering substitutes the
//! placeholders, and parsing uses a regex generated from the same segments.
//! Keeping a single source for both is what makes `parse(render(r)) == r` hold
//! for every resource the renderer accepts.

use std::fmt;

use regex::Regex;

use crate::account::Account;
use crate::error::{IamyError, Result};
use crate::models::{IamResource, ResourceKind};

/// Layout used by default: `<account>/<kind><iam path><name>.yaml`.
pub const DEFAULT_PATH_TEMPLATE: &str = "{account}/{kind}{path}{name}.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Account,
    Kind,
    Path,
    Name,
}

impl Placeholder {
    const ALL: [Self; 4] = [Self::Account, Self::Kind, Self::Path, Self::Name];

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "account" => Some(Self::Account),
            "kind" => Some(Self::Kind),
            "path" => Some(Self::Path),
            "name" => Some(Self::Name),
            _ => None,
        }
    }

    fn token(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Kind => "kind",
            Self::Path => "path",
            Self::Name => "name",
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            Self::Account => "(?P<account>[^/]+)",
            Self::Kind => "(?P<kind>user|group|policy|role)",
            Self::Path => "(?P<path>/(?:.*/)?)",
            Self::Name => "(?P<name>[^/]+)",
        }
    }

    /// Account and name are free text without a delimiter of their own.
    fn needs_delimiter(self) -> bool {
        matches!(self, Self::Account | Self::Name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// Identity decoded from a file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocation {
    /// Canonical account string, as used for the account directory.
    pub account: String,
    pub kind: ResourceKind,
    pub path: String,
    pub name: String,
}

/// A file path layout, usable in both directions.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    template: String,
    segments: Vec<Segment>,
    matcher: Regex,
}

impl PathTemplate {
    pub fn new(template: &str) -> Result<Self> {
        let segments = parse_segments(template)?;
        validate_segments(template, &segments)?;

        let mut pattern = String::from("^");
        for segment in &segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Placeholder(p) => pattern.push_str(p.pattern()),
            }
        }
        pattern.push('$');

        let matcher = Regex::new(&pattern).map_err(|e| invalid_template(template, e.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            segments,
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Relative directory holding every file of one account.
    pub fn account_dir(&self, account: &Account) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(Placeholder::Account) => {
                    out.push_str(&account.to_string());
                    break;
                }
                Segment::Placeholder(_) => break,
            }
        }
        out
    }

    /// Relative, `/`-separated file path of a resource.
    pub fn render<R: IamResource + ?Sized>(&self, account: &Account, resource: &R) -> Result<String> {
        validate_identity(resource.path(), resource.name())?;

        let account = account.to_string();
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(Placeholder::Account) => out.push_str(&account),
                Segment::Placeholder(Placeholder::Kind) => out.push_str(resource.kind().as_str()),
                Segment::Placeholder(Placeholder::Path) => out.push_str(resource.path()),
                Segment::Placeholder(Placeholder::Name) => out.push_str(resource.name()),
            }
        }
        Ok(out)
    }

    /// Decode a relative, `/`-separated file path.
    ///
    /// Returns `Ok(None)` for paths outside the layout; those files are not
    /// managed by this tree.
    pub fn parse(&self, relative_path: &str) -> Result<Option<ResourceLocation>> {
        let Some(captures) = self.matcher.captures(relative_path) else {
            return Ok(None);
        };

        Ok(Some(ResourceLocation {
            account: captures["account"].to_string(),
            kind: captures["kind"].parse()?,
            path: captures["path"].to_string(),
            name: captures["name"].to_string(),
        }))
    }
}

impl Default for PathTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_TEMPLATE).expect("default path template is valid")
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn invalid_template(template: &str, reason: impl Into<String>) -> IamyError {
    IamyError::InvalidPathTemplate {
        template: template.to_string(),
        reason: reason.into(),
    }
}

fn parse_segments(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while !rest.is_empty() {
        match rest.find(['{', '}']) {
            Some(pos) if rest[pos..].starts_with('}') => {
                return Err(invalid_template(template, "unmatched '}'"));
            }
            Some(pos) => {
                if pos > 0 {
                    segments.push(Segment::Literal(rest[..pos].to_string()));
                }
                let after = &rest[pos + 1..];
                let end = after
                    .find('}')
                    .ok_or_else(|| invalid_template(template, "unmatched '{'"))?;
                let token = &after[..end];
                let placeholder = Placeholder::from_token(token).ok_or_else(|| {
                    invalid_template(template, format!("unknown placeholder '{{{token}}}'"))
                })?;
                segments.push(Segment::Placeholder(placeholder));
                rest = &after[end + 1..];
            }
            None => {
                segments.push(Segment::Literal(rest.to_string()));
                rest = "";
            }
        }
    }

    Ok(segments)
}

fn validate_segments(template: &str, segments: &[Segment]) -> Result<()> {
    for placeholder in Placeholder::ALL {
        let count = segments
            .iter()
            .filter(|s| **s == Segment::Placeholder(placeholder))
            .count();
        if count != 1 {
            return Err(invalid_template(
                template,
                format!(
                    "placeholder '{{{}}}' must appear exactly once, found {}",
                    placeholder.token(),
                    count
                ),
            ));
        }
    }

    // The account must be a whole directory so each account owns a subtree.
    let account_at = segments
        .iter()
        .position(|s| *s == Segment::Placeholder(Placeholder::Account))
        .unwrap_or_default();
    let prefix_ok = match &segments[..account_at] {
        [] => true,
        [Segment::Literal(text)] => text.ends_with('/'),
        _ => false,
    };
    let suffix_ok = matches!(
        segments.get(account_at + 1),
        Some(Segment::Literal(text)) if text.starts_with('/')
    );
    if !prefix_ok || !suffix_ok {
        return Err(invalid_template(
            template,
            "'{account}' must be a whole directory, preceded only by literal directories",
        ));
    }

    for pair in segments.windows(2) {
        if let [Segment::Placeholder(a), Segment::Placeholder(b)] = pair {
            if a.needs_delimiter() || (b.needs_delimiter() && *a != Placeholder::Path) {
                return Err(invalid_template(
                    template,
                    format!(
                        "'{{{}}}' and '{{{}}}' need literal text between them",
                        a.token(),
                        b.token()
                    ),
                ));
            }
        }
    }

    Ok(())
}

/// IAM paths are `/` or `/seg/.../`; names are non-empty and slash free, and
/// neither holds control characters.
/// Anything else would not survive the trip through a filesystem.
fn validate_identity(path: &str, name: &str) -> Result<()> {
    let invalid = |reason: &str| IamyError::InvalidResourcePath {
        path: path.to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if path.chars().chain(name.chars()).any(char::is_control) {
        return Err(invalid("path and name must not contain control characters"));
    }
    if !path.starts_with('/') || !path.ends_with('/') {
        return Err(invalid("path must start and end with '/'"));
    }
    if path != "/" {
        let inner = &path[1..path.len() - 1];
        if inner
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(invalid("path segments must be non-empty and not '.' or '..'"));
        }
    }
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(invalid("name must be non-empty and must not contain '/'"));
    }

    Ok(())
}
