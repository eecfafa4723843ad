//! GitHub REST v3 client
//!
//! Reads repository content at a revision (commits, trees, contents, blobs)
//! and drives check runs and pull-request comments. Every request goes
//! through one blocking agent with a global timeout.

use crate::report::{CheckSink, CheckStatus, Conclusion, SinkError};
use crate::source::{ContentError, EntryKind, Encoding, FileEntry, RevisionContent, TreeEntry, TreeListing};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("day0guard/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Check-run output fields are capped at 65535 characters
const MAX_OUTPUT_CHARS: usize = 65535;

/// Upper bound on any single response body
const MAX_BODY_BYTES: u64 = 100 * 1024 * 1024;

/// A repository as `owner/name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((owner, name)) = s.trim().split_once('/') else {
            return Err(format!("Invalid repository '{}'. Expected owner/name", s));
        };
        let name = name.trim_end_matches(".git");
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(format!("Invalid repository '{}'. Expected owner/name", s));
        }
        Ok(RepoRef {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

pub struct GithubClient {
    agent: ureq::Agent,
    api_url: String,
    repo: RepoRef,
    token: Option<String>,
}

enum Verb {
    Post,
    Patch,
}

impl GithubClient {
    pub fn new(api_url: &str, repo: RepoRef, token: Option<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            api_url: api_url.trim_end_matches('/').to_string(),
            repo,
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// `{api}/repos/{owner}/{name}/{tail}`
    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, self.repo.owner, self.repo.name, tail
        )
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request
            .header("User-Agent", USER_AGENT)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// GET a JSON document; `Ok(None)` on 404
    fn get_text(&self, url: &str) -> Result<Option<String>, ContentError> {
        tracing::debug!(url, "GET");
        let mut response = self
            .authorize(self.agent.get(url))
            .call()
            .map_err(|e| ContentError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ContentError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .map(Some)
            .map_err(|e| ContentError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>, ContentError> {
        let Some(body) = self.get_text(url)? else {
            return Ok(None);
        };
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ContentError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    /// POST or PATCH a JSON payload, returning the response body
    fn send_json(&self, verb: Verb, url: &str, payload: &serde_json::Value) -> Result<String, String> {
        let body = serde_json::to_string(payload).map_err(|e| e.to_string())?;
        let request = match verb {
            Verb::Post => self.agent.post(url),
            Verb::Patch => self.agent.patch(url),
        };
        let mut response = self
            .authorize(request)
            .header("Content-Type", "application/json")
            .send(body)
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let text = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .unwrap_or_default();
        if !status.is_success() {
            return Err(format!("HTTP {}: {}", status.as_u16(), first_line(&text)));
        }
        Ok(text)
    }
}

// === Revision content ===

#[derive(Deserialize)]
struct CommitResponse {
    commit: CommitBody,
}

#[derive(Deserialize)]
struct CommitBody {
    tree: ObjectRef,
}

#[derive(Deserialize)]
struct ObjectRef {
    sha: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

/// File body as returned by the contents and blobs endpoints
#[derive(Deserialize)]
struct ContentBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    download_url: Option<String>,
}

impl RevisionContent for GithubClient {
    fn resolve_tree(&self, revision: &str) -> Result<String, ContentError> {
        let url = self.repo_url(&format!("commits/{}", revision));
        match self.get_json::<CommitResponse>(&url)? {
            Some(commit) => Ok(commit.commit.tree.sha),
            None => Err(ContentError::UnknownRevision {
                revision: revision.to_string(),
            }),
        }
    }

    fn list_tree(&self, tree: &str) -> Result<TreeListing, ContentError> {
        let url = self.repo_url(&format!("git/trees/{}?recursive=1", tree));
        let response: TreeResponse = self
            .get_json(&url)?
            .ok_or_else(|| ContentError::Status {
                url: url.clone(),
                status: 404,
            })?;
        Ok(tree_listing(response))
    }

    fn file(&self, revision: &str, path: &str) -> Result<Option<FileEntry>, ContentError> {
        let url = self.repo_url(&format!("contents/{}?ref={}", path, revision));
        let Some(body) = self.get_text(&url)? else {
            return Ok(None);
        };
        parse_contents(&body).map_err(|message| ContentError::Decode { url, message })
    }

    fn blob(&self, id: &str) -> Result<Option<FileEntry>, ContentError> {
        let url = self.repo_url(&format!("git/blobs/{}", id));
        Ok(self.get_json::<ContentBody>(&url)?.map(file_entry))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, ContentError> {
        tracing::debug!(url, "download");
        let mut response = self
            .authorize(self.agent.get(url))
            .call()
            .map_err(|e| ContentError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| ContentError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

fn tree_listing(response: TreeResponse) -> TreeListing {
    TreeListing {
        entries: response
            .tree
            .into_iter()
            .map(|item| TreeEntry {
                kind: match item.kind.as_str() {
                    "blob" => EntryKind::Blob,
                    "tree" => EntryKind::Tree,
                    _ => EntryKind::Other,
                },
                path: item.path,
                id: item.sha,
            })
            .collect(),
        truncated: response.truncated,
    }
}

/// The contents endpoint answers a directory with an array
fn parse_contents(body: &str) -> Result<Option<FileEntry>, String> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
    if value.is_array() {
        return Ok(Some(FileEntry::Directory));
    }
    let content: ContentBody = serde_json::from_value(value).map_err(|e| e.to_string())?;
    match content.kind.as_deref() {
        Some("file") | None => Ok(Some(file_entry(content))),
        Some("dir") => Ok(Some(FileEntry::Directory)),
        // Symlinks and submodules have no lockfile body of their own
        Some(_) => Ok(None),
    }
}

fn file_entry(body: ContentBody) -> FileEntry {
    let encoding = match body.encoding.as_deref() {
        Some("base64") => Encoding::Base64,
        Some("utf-8") | Some("utf8") => Encoding::Utf8,
        _ => Encoding::None,
    };
    FileEntry::File {
        encoding,
        content: body.content.unwrap_or_default(),
        size: body.size,
        download_url: body.download_url,
    }
}

// === Check runs ===

impl CheckSink for GithubClient {
    fn start(&self, name: &str, head_sha: &str) -> Result<u64, SinkError> {
        let payload = serde_json::json!({
            "name": name,
            "head_sha": head_sha,
            "status": CheckStatus::InProgress.as_str(),
            "started_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        });
        let url = self.repo_url("check-runs");
        let body = self
            .send_json(Verb::Post, &url, &payload)
            .map_err(|message| SinkError::Create {
                name: name.to_string(),
                message,
            })?;

        #[derive(Deserialize)]
        struct Created {
            id: u64,
        }
        let created: Created = serde_json::from_str(&body).map_err(|e| SinkError::Create {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        tracing::info!(repo = %self.repo, id = created.id, head_sha, "created check run");
        Ok(created.id)
    }

    fn complete(
        &self,
        id: u64,
        conclusion: Conclusion,
        title: &str,
        summary: &str,
    ) -> Result<(), SinkError> {
        let status = CheckStatus::Completed(conclusion);
        let payload = serde_json::json!({
            "status": status.as_str(),
            "conclusion": conclusion.as_str(),
            "completed_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "output": {
                "title": truncate_chars(title, MAX_OUTPUT_CHARS),
                "summary": truncate_chars(summary, MAX_OUTPUT_CHARS),
            },
        });
        let url = self.repo_url(&format!("check-runs/{}", id));
        self.send_json(Verb::Patch, &url, &payload)
            .map(|_| ())
            .map_err(|message| SinkError::Complete { id, message })
    }

    fn comment(&self, pr: u64, body: &str) -> Result<(), SinkError> {
        let payload = serde_json::json!({ "body": truncate_chars(body, MAX_OUTPUT_CHARS) });
        let url = self.repo_url(&format!("issues/{}/comments", pr));
        self.send_json(Verb::Post, &url, &payload)
            .map(|_| ())
            .map_err(|message| SinkError::Comment { pr, message })?;
        tracing::info!(repo = %self.repo, pr, "commented on pull request");
        Ok(())
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}
