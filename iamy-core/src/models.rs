//! IAM resource models and the per-account collection.
//!
//! Each resource is written to its own YAML file. A resource's name and IAM
//! path are never part of the file body: they are derived from where the file
//! lives in the tree, so the serde attributes skip them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::error::IamyError;
use crate::policy::PolicyDocument;

/// Path used for resources created without an explicit IAM path.
pub const ROOT_PATH: &str = "/";

/// The closed set of resource kinds kept in a YAML tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    User,
    Group,
    Role,
    Policy,
}

impl ResourceKind {
    /// The token used in ARNs and file paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Role => "role",
            Self::Policy => "policy",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = IamyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            "role" => Ok(Self::Role),
            "policy" => Ok(Self::Policy),
            other => Err(IamyError::UnknownEntityKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Identity shared by every resource kept in a YAML tree.
pub trait IamResource {
    fn kind(&self) -> ResourceKind;
    fn name(&self) -> &str;
    fn path(&self) -> &str;

    /// Set the identity decoded from a file's location.
    fn set_identity(&mut self, name: String, path: String);
}

macro_rules! impl_iam_resource {
    ($ty:ty, $kind:expr) => {
        impl IamResource for $ty {
            fn kind(&self) -> ResourceKind {
                $kind
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn path(&self) -> &str {
                &self.path
            }

            fn set_identity(&mut self, name: String, path: String) {
                self.name = name;
                self.path = path;
            }
        }
    };
}

/// A policy document embedded in a single user, group or role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub name: String,
    pub policy: PolicyDocument,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_policies: Vec<InlinePolicy>,
    /// Attached managed policies, as names (this account) or ARNs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_policies: Vec<InlinePolicy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    pub assume_role_policy_document: PolicyDocument,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_policies: Vec<InlinePolicy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
}

/// A standalone managed policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    pub policy: PolicyDocument,
}

impl_iam_resource!(User, ResourceKind::User);
impl_iam_resource!(Group, ResourceKind::Group);
impl_iam_resource!(Role, ResourceKind::Role);
impl_iam_resource!(Policy, ResourceKind::Policy);

fn find_by_identity<T: IamResource + Clone>(items: &[T], name: &str, path: &str) -> Option<T> {
    items
        .iter()
        .find(|item| item.name() == name && item.path() == path)
        .cloned()
}

fn sort_by_identity<T: IamResource>(items: &mut [T]) {
    items.sort_by(|a, b| (a.path(), a.name()).cmp(&(b.path(), b.name())));
}

/// Every IAM resource of one account.
///
/// Built fresh by each load, or by a cloud fetch before a dump. Collections keep
/// the order resources were added in; call [`AccountData::sort`] when a stable
/// order matters.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountData {
    pub account: Account,
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub roles: Vec<Role>,
    pub policies: Vec<Policy>,
}

impl AccountData {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            users: Vec::new(),
            groups: Vec::new(),
            roles: Vec::new(),
            policies: Vec::new(),
        }
    }

    pub fn add_user(&mut self, user: User) {
        self.users.push(user);
    }

    pub fn add_group(&mut self, group: Group) {
        self.groups.push(group);
    }

    pub fn add_role(&mut self, role: Role) {
        self.roles.push(role);
    }

    pub fn add_policy(&mut self, policy: Policy) {
        self.policies.push(policy);
    }

    /// Returns a copy of the user with exactly this name and IAM path.
    pub fn find_user(&self, name: &str, path: &str) -> Option<User> {
        find_by_identity(&self.users, name, path)
    }

    pub fn find_group(&self, name: &str, path: &str) -> Option<Group> {
        find_by_identity(&self.groups, name, path)
    }

    pub fn find_role(&self, name: &str, path: &str) -> Option<Role> {
        find_by_identity(&self.roles, name, path)
    }

    pub fn find_policy(&self, name: &str, path: &str) -> Option<Policy> {
        find_by_identity(&self.policies, name, path)
    }

    /// Order every collection by (path, name).
    pub fn sort(&mut self) {
        sort_by_identity(&mut self.users);
        sort_by_identity(&mut self.groups);
        sort_by_identity(&mut self.roles);
        sort_by_identity(&mut self.policies);
    }

    pub fn resource_count(&self) -> usize {
        self.users.len() + self.groups.len() + self.roles.len() + self.policies.len()
    }

    /// ARNs of every resource, in dump order.
    pub fn resource_arns(&self) -> Vec<String> {
        let users = self.users.iter().map(|u| self.account.arn(u));
        let policies = self.policies.iter().map(|p| self.account.arn(p));
        let groups = self.groups.iter().map(|g| self.account.arn(g));
        let roles = self.roles.iter().map(|r| self.account.arn(r));
        users.chain(policies).chain(groups).chain(roles).collect()
    }
}
