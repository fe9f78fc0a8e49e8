//! This crate provides the core of IAMY, a YAML mirror of AWS IAM accounts:
//! - Account identity: canonical `alias-id` names and ARN construction
//! - Policy documents: YAML, JSON and URL-encoded JSON codecs
//! - Resource models for users, groups, roles and managed policies
//! - The file-tree loader and dumper, built on a reversible path layout
//!
//! Talking to the IAM API and diffing two sets of resources are left to the
//! callers; they exchange [`AccountData`] with this crate.

mod account;
mod error;
mod models;
mod path;
mod policy;
mod tree;

// Re-exports for a small, focused public API
pub use account::{Account, ARN_PARTITION};
pub use error::{IamyError, Result};
pub use models::{
    AccountData, Group, IamResource, InlinePolicy, Policy, ResourceKind, Role, User, ROOT_PATH,
};
pub use path::{PathTemplate, ResourceLocation, DEFAULT_PATH_TEMPLATE};
pub use policy::PolicyDocument;
pub use tree::{LoadReport, TreeConfig, YamlTree};
