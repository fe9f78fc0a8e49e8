//! Account identity: the canonical `alias-id` directory name and ARN helpers.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{IamyError, Result};
use crate::models::{IamResource, ResourceKind};

/// Partition used for every ARN this crate builds.
pub const ARN_PARTITION: &str = "aws";

const ACCOUNT_PATTERN: &str = r"^(?:([A-Za-z0-9_-]+)-)?([0-9]+)$";

fn account_regex() -> &'static Regex {
    static ACCOUNT_REGEX: OnceLock<Regex> = OnceLock::new();
    ACCOUNT_REGEX.get_or_init(|| Regex::new(ACCOUNT_PATTERN).expect("account pattern is valid"))
}

/// An AWS account, identified by its numeric id and optionally named by its alias.
///
/// The canonical string form (`prod-123456789012`, or `123456789012` without an
/// alias) is used as the account's directory name in a YAML tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Account {
    id: String,
    alias: Option<String>,
}

impl Account {
    /// Create an account from its id and optional alias.
    ///
    /// An empty alias is treated as no alias. The pair must survive a
    /// format/parse round trip, so the id must be numeric and the alias limited
    /// to ASCII word characters and hyphens.
    pub fn new(id: impl Into<String>, alias: Option<&str>) -> Result<Self> {
        let account = Self {
            id: id.into(),
            alias: alias.filter(|a| !a.is_empty()).map(str::to_string),
        };
        let reparsed: Self = account.to_string().parse()?;
        if reparsed == account {
            Ok(account)
        } else {
            Err(IamyError::MalformedAccountIdentifier {
                input: account.to_string(),
            })
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// `arn:aws:iam::<id>:<kind><path><name>`
    pub fn arn_for(&self, kind: ResourceKind, path: &str, name: &str) -> String {
        format!(
            "arn:{}:iam::{}:{}{}{}",
            ARN_PARTITION,
            self.id,
            kind.as_str(),
            path,
            name
        )
    }

    /// ARN of any IAM resource in this account.
    pub fn arn<R: IamResource + ?Sized>(&self, resource: &R) -> String {
        self.arn_for(resource.kind(), resource.path(), resource.name())
    }

    /// Turn an attached policy reference into a full ARN.
    ///
    /// References already starting with `arn:` are returned unchanged; bare names
    /// are resolved against this account at the root path.
    pub fn policy_arn_from_name_or_arn(&self, name_or_arn: &str) -> String {
        if name_or_arn.starts_with("arn:") {
            return name_or_arn.to_string();
        }
        format!(
            "arn:{}:iam::{}:policy/{}",
            ARN_PARTITION, self.id, name_or_arn
        )
    }

    /// Shorten an ARN of one of this account's own policies back to the form
    /// written in YAML files. ARNs from other accounts (including AWS managed
    /// policies) are left alone.
    pub fn normalise_policy_arn(&self, arn: &str) -> String {
        let prefix = format!("arn:{}:iam::{}:policy/", ARN_PARTITION, self.id);
        arn.strip_prefix(&prefix).unwrap_or(arn).to_string()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{}-{}", alias, self.id),
            None => f.write_str(&self.id),
        }
    }
}

impl FromStr for Account {
    type Err = IamyError;

    fn from_str(s: &str) -> Result<Self> {
        let captures =
            account_regex()
                .captures(s)
                .ok_or_else(|| IamyError::MalformedAccountIdentifier {
                    input: s.to_string(),
                })?;

        Ok(Self {
            id: captures[2].to_string(),
            alias: captures.get(1).map(|m| m.as_str().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("prod-123456789012", Some("prod"), "123456789012")]
    #[case("123456789012", None, "123456789012")]
    #[case("my-team-prod-42", Some("my-team-prod"), "42")]
    #[case("snake_case-7", Some("snake_case"), "7")]
    fn test_parse_and_format(
        #[case] input: &str,
        #[case] alias: Option<&str>,
        #[case] id: &str,
    ) {
        let account: Account = input.parse().expect("should parse");
        assert_eq!(account.alias(), alias);
        assert_eq!(account.id(), id);
        assert_eq!(account.to_string(), input);
    }

    #[rstest]
    #[case("")]
    #[case("prod")]
    #[case("prod-")]
    #[case("-123")]
    #[case("prod-12a")]
    #[case("prod/123")]
    #[case("prød-123")]
    fn test_parse_rejects_malformed(#[case] input: &str) {
        let err = input.parse::<Account>().unwrap_err();
        assert!(matches!(err, IamyError::MalformedAccountIdentifier { .. }));
    }

    #[test]
    fn test_new_treats_empty_alias_as_none() {
        let account = Account::new("999", Some("")).unwrap();
        assert_eq!(account.alias(), None);
        assert_eq!(account.to_string(), "999");
    }

    #[test]
    fn test_new_rejects_non_numeric_id() {
        assert!(Account::new("abc", None).is_err());
        assert!(Account::new("123", Some("has space")).is_err());
    }

    #[test]
    fn test_arn_for() {
        let account: Account = "prod-123456789012".parse().unwrap();
        assert_eq!(
            account.arn_for(ResourceKind::Role, "/svc/", "deploy"),
            "arn:aws:iam::123456789012:role/svc/deploy"
        );
        assert_eq!(
            account.arn_for(ResourceKind::User, "/", "bob"),
            "arn:aws:iam::123456789012:user/bob"
        );
    }

    #[test]
    fn test_policy_arn_from_name_or_arn() {
        let account = Account::new("123456789012", None).unwrap();
        assert_eq!(
            account.policy_arn_from_name_or_arn("ReadOnly"),
            "arn:aws:iam::123456789012:policy/ReadOnly"
        );
        assert_eq!(
            account.policy_arn_from_name_or_arn("arn:aws:iam::aws:policy/ReadOnlyAccess"),
            "arn:aws:iam::aws:policy/ReadOnlyAccess"
        );
    }

    #[test]
    fn test_normalise_policy_arn() {
        let account = Account::new("123456789012", None).unwrap();
        assert_eq!(
            account.normalise_policy_arn("arn:aws:iam::123456789012:policy/ReadOnly"),
            "ReadOnly"
        );
        assert_eq!(
            account.normalise_policy_arn("arn:aws:iam::aws:policy/ReadOnlyAccess"),
            "arn:aws:iam::aws:policy/ReadOnlyAccess"
        );
        assert_eq!(
            account.normalise_policy_arn("arn:aws:iam::999:policy/Other"),
            "arn:aws:iam::999:policy/Other"
        );
    }
}
