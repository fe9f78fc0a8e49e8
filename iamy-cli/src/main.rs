//! IAMY command-line interface.
//!
//! Works on a local YAML tree only:
//!   iamy check                 load the tree and summarise it
//!   iamy fmt [--delete]        rewrite every file in canonical form
//!   iamy arns [--account A]    list the ARN of every resource
//!   iamy policy <account> <name> [--path P] [--encoded]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use iamy_core::{
    Account, AccountData, TreeConfig, YamlTree, DEFAULT_PATH_TEMPLATE, ROOT_PATH,
};
use log::{debug, info};

#[derive(Parser)]
#[command(name = "iamy")]
#[command(version)]
#[command(about = "Read and write AWS IAM users, policies, groups and roles from YAML files.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debugging output
    #[arg(long, global = true)]
    debug: bool,

    /// The directory holding the YAML files (defaults to the current directory)
    #[arg(short, long, global = true, env = "IAMY_DIR")]
    dir: Option<PathBuf>,

    /// Layout of resource files below the directory
    #[arg(long, global = true, env = "IAMY_PATH_TEMPLATE", default_value = DEFAULT_PATH_TEMPLATE)]
    path_template: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every file and print a summary of each account
    Check,
    /// Rewrite every resource file in canonical form
    Fmt {
        /// Delete extraneous files from each account directory
        #[arg(long)]
        delete: bool,
    },
    /// Print the ARN of every resource
    Arns {
        /// Only list resources of this account (alias-id or id)
        #[arg(short, long)]
        account: Option<String>,
    },
    /// Print a managed policy document
    Policy {
        /// Account (alias-id or id)
        account: String,

        /// Policy name
        name: String,

        /// IAM path of the policy
        #[arg(short, long, default_value = ROOT_PATH)]
        path: String,

        /// Print URL-encoded JSON instead of pretty JSON
        #[arg(long)]
        encoded: bool,
    },
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn default_dir() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    cwd.canonicalize()
        .with_context(|| format!("Failed to resolve {}", cwd.display()))
}

fn open_tree(cli: &Cli) -> Result<YamlTree> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => default_dir()?,
    };
    debug!("Using tree at {} with layout {}", dir.display(), cli.path_template);

    YamlTree::new(&TreeConfig {
        dir,
        path_template: cli.path_template.clone(),
    })
    .context("Invalid tree configuration")
}

fn load(tree: &YamlTree) -> Result<Vec<AccountData>> {
    tree.load()
        .with_context(|| format!("Failed to load {}", tree.dir().display()))
}

fn check(tree: &YamlTree) -> Result<()> {
    let report = tree
        .load_report()
        .with_context(|| format!("Failed to load {}", tree.dir().display()))?;

    for data in &report.accounts {
        println!(
            "{}: {} users, {} groups, {} roles, {} policies",
            data.account,
            data.users.len(),
            data.groups.len(),
            data.roles.len(),
            data.policies.len()
        );
    }
    for skipped in &report.skipped {
        println!("skipped {}", skipped);
    }
    Ok(())
}

fn fmt(tree: &YamlTree, delete: bool) -> Result<()> {
    let accounts = load(tree)?;
    for data in &accounts {
        tree.dump(data, delete)
            .with_context(|| format!("Failed to write account {}", data.account))?;
        info!("Formatted {} resources for {}", data.resource_count(), data.account);
    }
    Ok(())
}

fn arns(tree: &YamlTree, account: Option<&str>) -> Result<()> {
    let filter = account
        .map(str::parse::<Account>)
        .transpose()
        .context("Invalid --account")?;

    let mut arns: Vec<String> = load(tree)?
        .iter()
        .filter(|data| filter.as_ref().map_or(true, |a| *a == data.account))
        .flat_map(AccountData::resource_arns)
        .collect();
    arns.sort();

    for arn in arns {
        println!("{}", arn);
    }
    Ok(())
}

fn policy(tree: &YamlTree, account: &str, name: &str, path: &str, encoded: bool) -> Result<()> {
    let account: Account = account.parse().context("Invalid account")?;

    let accounts = load(tree)?;
    let Some(data) = accounts.iter().find(|data| data.account == account) else {
        bail!("No files found for account {}", account);
    };
    let Some(policy) = data.find_policy(name, path) else {
        bail!("No policy {}{} in account {}", path, name, account);
    };

    if encoded {
        println!("{}", policy.policy.encode());
    } else {
        println!("{}", policy.policy.to_pretty_json()?);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let tree = open_tree(&cli)?;
    match &cli.command {
        Commands::Check => check(&tree),
        Commands::Fmt { delete } => fmt(&tree, *delete),
        Commands::Arns { account } => arns(&tree, account.as_deref()),
        Commands::Policy {
            account,
            name,
            path,
            encoded,
        } => policy(&tree, account, name, path, *encoded),
    }
}
