//! End-to-end tests of the YAML tree through the public API: a tree written by
//! hand is loaded, mirrored into a second directory and loaded again.

use std::fs;
use std::path::Path;

use iamy_core::{Account, AccountData, IamResource, PolicyDocument, ResourceKind, YamlTree};
use serde_json::json;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("file has a parent")).expect("failed to create dirs");
    fs::write(path, contents).expect("failed to write file");
}

fn hand_written_tree() -> TempDir {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let root = temp_dir.path();

    write(
        root,
        "prod-123456789012/user/engineering/alice.yaml",
        "Groups:
  - developers
InlinePolicies:
  - Name: assume-deploy
    Policy:
      Version: '2012-10-17'
      Statement:
        - Effect: Allow
          Action: sts:AssumeRole
          Resource: arn:aws:iam::123456789012:role/svc/deploy
Policies:
  - arn:aws:iam::aws:policy/IAMUserChangePassword
",
    );
    write(
        root,
        "prod-123456789012/group/developers.yaml",
        "Policies:\n  - ReadOnly\n",
    );
    write(
        root,
        "prod-123456789012/policy/ReadOnly.yaml",
        "Policy:
  Version: '2012-10-17'
  Statement:
    - Effect: Allow
      Action:
        - ec2:Describe*
        - s3:List*
      Resource: '*'
",
    );
    write(
        root,
        "prod-123456789012/role/svc/deploy.yaml",
        "AssumeRolePolicyDocument:
  Version: '2012-10-17'
  Statement:
    - Effect: Allow
      Principal:
        AWS: arn:aws:iam::123456789012:root
      Action: sts:AssumeRole
Policies:
  - ReadOnly
",
    );
    write(root, "555/user/ci.yaml", "");
    write(root, ".gitignore", "*.swp\n");
    temp_dir
}

fn sorted(mut accounts: Vec<AccountData>) -> Vec<AccountData> {
    for data in &mut accounts {
        data.sort();
    }
    accounts
}

#[test]
fn test_hand_written_tree_loads() {
    let tree_dir = hand_written_tree();
    let report = YamlTree::with_dir(tree_dir.path())
        .load_report()
        .expect("tree should load");

    assert_eq!(report.skipped, vec![".gitignore"]);
    assert_eq!(report.accounts.len(), 2);

    let ci = &report.accounts[0];
    assert_eq!(ci.account, Account::new("555", None).expect("valid account"));
    assert_eq!(ci.resource_count(), 1);

    let prod = &report.accounts[1];
    let alice = prod
        .find_user("alice", "/engineering/")
        .expect("alice should load");
    assert_eq!(alice.kind(), ResourceKind::User);
    assert_eq!(alice.groups, vec!["developers"]);
    assert_eq!(alice.inline_policies.len(), 1);
    assert_eq!(alice.inline_policies[0].name, "assume-deploy");

    let read_only = prod.find_policy("ReadOnly", "/").expect("policy should load");
    assert_eq!(
        read_only.policy,
        PolicyDocument::try_from(json!({
            "Version": "2012-10-17",
            "Statement": [{"Effect": "Allow", "Action": ["ec2:Describe*", "s3:List*"], "Resource": "*"}]
        }))
        .expect("valid document")
    );
    assert_eq!(
        prod.account.policy_arn_from_name_or_arn(&prod.find_role("deploy", "/svc/").expect("role").policies[0]),
        "arn:aws:iam::123456789012:policy/ReadOnly"
    );
}

#[test]
fn test_mirrored_tree_loads_identically() {
    let source_dir = hand_written_tree();
    let source = YamlTree::with_dir(source_dir.path());
    let original = source.load().expect("source should load");

    let mirror_dir = TempDir::new().expect("failed to create temp dir");
    let mirror = YamlTree::with_dir(mirror_dir.path());
    for data in &original {
        mirror.dump(data, true).expect("dump should succeed");
    }

    let reloaded = mirror.load_report().expect("mirror should load");
    assert!(reloaded.skipped.is_empty());
    assert_eq!(sorted(reloaded.accounts), sorted(original));
}

#[test]
fn test_dumped_trust_policy_keeps_key_order() {
    let source_dir = hand_written_tree();
    let original = YamlTree::with_dir(source_dir.path())
        .load()
        .expect("source should load");

    let mirror_dir = TempDir::new().expect("failed to create temp dir");
    let mirror = YamlTree::with_dir(mirror_dir.path());
    for data in &original {
        mirror.dump(data, false).expect("dump should succeed");
    }

    let role = fs::read_to_string(mirror_dir.path().join("prod-123456789012/role/svc/deploy.yaml"))
        .expect("role file should exist");
    let version = role.find("Version").expect("Version key");
    let statement = role.find("Statement").expect("Statement key");
    assert!(version < statement, "keys reordered:\n{}", role);
    assert!(!role.contains("Name:"));
    assert!(!role.contains("Path:"));
}
