//! Loading and dumping a directory tree of YAML resource files.
//!
//! Every file under the root whose relative path fits the [`PathTemplate`] is
//! one resource. Its account, kind, IAM path and name come from the path; the
//! YAML body holds everything else. Files that do not fit are skipped and
//! reported, so a tree can also hold READMEs, CI config and the like.
//!
//! All I/O is sequential and the first failure aborts the operation. A failed
//! dump may leave some files written and others not.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::account::Account;
use crate::error::{IamyError, Result};
use crate::models::{AccountData, IamResource, ResourceKind};
use crate::path::{PathTemplate, ResourceLocation, DEFAULT_PATH_TEMPLATE};

/// Where a YAML tree lives and how its files are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Root directory of the tree.
    pub dir: PathBuf,
    /// Layout of resource files below `dir`.
    #[serde(default = "default_path_template")]
    pub path_template: String,
}

fn default_path_template() -> String {
    DEFAULT_PATH_TEMPLATE.to_string()
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            path_template: default_path_template(),
        }
    }
}

/// Result of loading a tree: the accounts found plus every file that was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// One entry per account directory, ordered by canonical account string.
    pub accounts: Vec<AccountData>,
    /// Sorted relative paths of files outside the layout, and of entries that
    /// cannot be read as files.
    pub skipped: Vec<String>,
}

/// A YAML tree rooted at a directory.
#[derive(Debug, Clone)]
pub struct YamlTree {
    dir: PathBuf,
    template: PathTemplate,
}

impl YamlTree {
    pub fn new(config: &TreeConfig) -> Result<Self> {
        Ok(Self {
            dir: config.dir.clone(),
            template: PathTemplate::new(&config.path_template)?,
        })
    }

    /// A tree using the default layout.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            template: PathTemplate::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Directory holding every file of one account.
    pub fn account_dir(&self, account: &Account) -> PathBuf {
        self.dir.join(self.template.account_dir(account))
    }

    /// Load every account in the tree.
    pub fn load(&self) -> Result<Vec<AccountData>> {
        self.load_report().map(|report| report.accounts)
    }

    /// Load every account in the tree and report the files that were skipped.
    pub fn load_report(&self) -> Result<LoadReport> {
        info!("Loading YAML IAM data from {}", self.dir.display());

        let mut accounts: BTreeMap<String, AccountData> = BTreeMap::new();
        let (files, mut skipped) = self.files_recursively()?;

        for file in files {
            let relative = file.relative.as_str();
            let Some(location) = self
                .template
                .parse(relative)
                .map_err(|e| e.in_file(relative))?
            else {
                info!("Skipping {}", relative);
                skipped.push(file.relative);
                continue;
            };

            debug!("Loading {}", relative);
            let data = match accounts.entry(location.account.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let account: Account =
                        location.account.parse().map_err(|e: IamyError| e.in_file(relative))?;
                    entry.insert(AccountData::new(account))
                }
            };
            load_resource(data, &file.path, location)?;
        }
        skipped.sort();

        Ok(LoadReport {
            accounts: accounts.into_values().collect(),
            skipped,
        })
    }

    /// Write every resource of one account.
    ///
    /// With `can_delete`, the account's directory is removed first so the tree
    /// ends up mirroring `account_data` exactly. Without it, files of resources
    /// that no longer exist are left in place.
    pub fn dump(&self, account_data: &AccountData, can_delete: bool) -> Result<()> {
        let account = &account_data.account;
        info!("Dumping YAML IAM data for {} to {}", account, self.dir.display());

        if can_delete {
            let dest = self.account_dir(account);
            match fs::remove_dir_all(&dest) {
                Ok(()) => debug!("Removed {}", dest.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(IamyError::file_system("remove", &dest, e)),
            }
        }

        for user in &account_data.users {
            self.write_resource(account, user)?;
        }
        for policy in &account_data.policies {
            self.write_resource(account, policy)?;
        }
        for group in &account_data.groups {
            self.write_resource(account, group)?;
        }
        for role in &account_data.roles {
            self.write_resource(account, role)?;
        }

        Ok(())
    }

    /// Every file below the root, in file-name order, plus the relative paths
    /// of entries that cannot be resources.
    ///
    /// Symlinks are read through when they point at a file. Dangling links,
    /// links to directories, special files and names that are not UTF-8 are
    /// reported as skipped.
    fn files_recursively(&self) -> Result<(Vec<TreeFile>, Vec<String>)> {
        let mut files = Vec::new();
        let mut skipped = Vec::new();

        for entry in WalkDir::new(&self.dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.dir).to_path_buf();
                IamyError::file_system("walk", path, e.into())
            })?;
            if entry.file_type().is_dir() {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.dir).unwrap_or(entry.path());
            let joined = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if relative.to_str().is_none() {
                warn!("Skipping {}: file name is not valid UTF-8", joined);
                skipped.push(joined);
            } else if entry.path().is_file() {
                files.push(TreeFile {
                    relative: joined,
                    path: entry.into_path(),
                });
            } else {
                info!("Skipping {}: not a regular file", joined);
                skipped.push(joined);
            }
        }

        Ok((files, skipped))
    }

    fn write_resource<R>(&self, account: &Account, resource: &R) -> Result<()>
    where
        R: Serialize + IamResource,
    {
        let relative = self.template.render(account, resource)?;
        let path = self.dir.join(&relative);

        let yaml =
            serde_yaml::to_string(resource).map_err(|e| IamyError::invalid_document(&path, e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| IamyError::file_system("create directory", parent, e))?;
        }
        fs::write(&path, yaml).map_err(|e| IamyError::file_system("write", &path, e))?;

        debug!("Wrote {}", relative);
        Ok(())
    }
}

/// A file found while walking a tree.
struct TreeFile {
    /// `/`-joined path below the root, matched against the template.
    relative: String,
    /// Path on disk, read as is.
    path: PathBuf,
}

fn load_resource(data: &mut AccountData, path: &Path, location: ResourceLocation) -> Result<()> {
    match location.kind {
        ResourceKind::User => data.add_user(read_resource(path, location)?),
        ResourceKind::Group => data.add_group(read_resource(path, location)?),
        ResourceKind::Role => data.add_role(read_resource(path, location)?),
        ResourceKind::Policy => data.add_policy(read_resource(path, location)?),
    }
    Ok(())
}

fn read_resource<T>(path: &Path, location: ResourceLocation) -> Result<T>
where
    T: DeserializeOwned + IamResource,
{
    let contents = fs::read_to_string(path).map_err(|e| IamyError::file_system("read", path, e))?;

    // An empty file is an empty mapping, not a missing document.
    let body = if contents.trim().is_empty() {
        "{}"
    } else {
        contents.as_str()
    };
    let mut resource: T =
        serde_yaml::from_str(body).map_err(|e| IamyError::invalid_document(path, e))?;

    resource.set_identity(location.name, location.path);
    Ok(resource)
}
