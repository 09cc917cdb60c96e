//! Build requests derived from GitHub push webhook payloads.

use serde::{Deserialize, Deserializer};

/// The subset of a GitHub `push` event the pipeline uses.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: Repository,
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
    #[serde(default)]
    pub pusher: Pusher,
    #[serde(default)]
    pub sender: Sender,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    #[serde(deserialize_with = "site_name")]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadCommit {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub committer: Committer,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Committer {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pusher {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub login: String,
}

/// One requested site rebuild. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub repo_name: String,
    pub repo_full_name: String,
    pub branch: String,
    pub commit: CommitInfo,
    pub pusher_name: String,
    pub pusher_email: String,
    pub sender: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub message: String,
    pub timestamp: String,
    pub committer_email: String,
}

impl BuildRequest {
    pub fn from_push(event: PushEvent) -> Self {
        let commit = event.head_commit.unwrap_or_default();
        let repo_full_name = if event.repository.full_name.is_empty() {
            event.repository.name.clone()
        } else {
            event.repository.full_name
        };

        Self {
            branch: branch_from_ref(&event.git_ref).to_string(),
            repo_name: event.repository.name,
            repo_full_name,
            commit: CommitInfo {
                id: commit.id,
                message: commit.message,
                timestamp: commit.timestamp,
                committer_email: commit.committer.email,
            },
            pusher_name: event.pusher.name,
            pusher_email: event.pusher.email,
            sender: event.sender.login,
        }
    }

    /// Parse a raw push payload.
    pub fn from_payload(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice::<PushEvent>(body).map(Self::from_push)
    }
}

/// Whether `name` can be used as a single directory name under the
/// repository and output roots.
pub fn is_valid_repo_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

fn site_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    if is_valid_repo_name(&name) {
        Ok(name)
    } else {
        Err(serde::de::Error::custom(format!(
            "invalid repository name {name:?}"
        )))
    }
}

/// Last path segment of a ref: `refs/heads/18f-pages` -> `18f-pages`.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.rsplit('/').next().unwrap_or(git_ref)
}
