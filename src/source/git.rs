use crate::error::{Result, VersionError};
use crate::source::{run_with_timeout, SourceProvider};
use git2::{Cred, CredentialType, Direction, Remote, RemoteCallbacks, Repository, Sort};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Highest release tag of a local repository plus commits since it
pub struct GitTagProvider {
    repository: PathBuf,
}

impl GitTagProvider {
    pub fn new(repository: PathBuf) -> Self {
        GitTagProvider { repository }
    }
}

impl SourceProvider for GitTagProvider {
    fn describe(&self) -> String {
        format!("git tags in {}", self.repository.display())
    }

    fn fetch(&self, timeout: Duration) -> Result<String> {
        let provider = self.describe();
        let path = self.repository.clone();
        let context = provider.clone();

        run_with_timeout(provider, timeout, move || {
            let unavailable = |e: git2::Error| VersionError::source_unavailable(context.clone(), e.message());

            let repo = Repository::discover(&path).map_err(unavailable)?;
            let names = repo.tag_names(None).map_err(unavailable)?;
            let (tag, version) = highest_release(names.iter().flatten()).ok_or_else(|| {
                VersionError::source_unavailable(context.clone(), "no release tags found")
            })?;

            let tag_commit = repo
                .revparse_single(&format!("refs/tags/{}", tag))
                .and_then(|obj| obj.peel_to_commit())
                .map_err(unavailable)?;

            let mut revwalk = repo.revwalk().map_err(unavailable)?;
            revwalk.set_sorting(Sort::TOPOLOGICAL).map_err(unavailable)?;
            revwalk.push_head().map_err(unavailable)?;
            revwalk.hide(tag_commit.id()).map_err(unavailable)?;
            let commits = revwalk.count();

            debug!(%tag, commits, "latest local tag");
            Ok(format!(
                "{}.{}.{}-{}",
                version.major, version.minor, version.patch, commits
            ))
        })
    }
}

/// Highest release tag advertised by a remote (by name or URL)
pub struct GitRemoteProvider {
    repository: PathBuf,
    remote: String,
}

impl GitRemoteProvider {
    pub fn new(repository: PathBuf, remote: impl Into<String>) -> Self {
        GitRemoteProvider {
            repository,
            remote: remote.into(),
        }
    }

    fn is_url(&self) -> bool {
        self.remote.contains("://") || self.remote.contains('@')
    }
}

impl SourceProvider for GitRemoteProvider {
    fn describe(&self) -> String {
        format!("git remote {}", self.remote)
    }

    fn fetch(&self, timeout: Duration) -> Result<String> {
        let provider = self.describe();
        let context = provider.clone();
        let path = self.repository.clone();
        let remote_name = self.remote.clone();
        let detached = self.is_url();

        run_with_timeout(provider, timeout, move || {
            let unavailable = |e: git2::Error| VersionError::source_unavailable(context.clone(), e.message());

            let names = if detached {
                let mut remote = Remote::create_detached(remote_name.as_str()).map_err(unavailable)?;
                list_remote_tags(&mut remote).map_err(unavailable)?
            } else {
                let repo = Repository::discover(&path).map_err(unavailable)?;
                let mut remote = repo.find_remote(&remote_name).map_err(unavailable)?;
                list_remote_tags(&mut remote).map_err(unavailable)?
            };

            let (tag, version) = highest_release(names.iter().map(String::as_str)).ok_or_else(|| {
                VersionError::source_unavailable(context.clone(), "remote advertises no release tags")
            })?;

            debug!(%tag, "latest remote tag");
            Ok(format!("{}.{}.{}", version.major, version.minor, version.patch))
        })
    }
}

/// Pick the highest tag that is a plain `X.Y.Z` release, ignoring a `v` prefix.
fn highest_release<'a, I>(tags: I) -> Option<(String, semver::Version)>
where
    I: IntoIterator<Item = &'a str>,
{
    tags.into_iter()
        .filter_map(|tag| {
            let clean = tag
                .strip_prefix('v')
                .or_else(|| tag.strip_prefix('V'))
                .unwrap_or(tag);
            semver::Version::parse(clean)
                .ok()
                .filter(|v| v.pre.is_empty())
                .map(|v| (tag.to_string(), v))
        })
        .max_by(|a, b| a.1.cmp(&b.1))
}

fn list_remote_tags(remote: &mut Remote<'_>) -> std::result::Result<Vec<String>, git2::Error> {
    let connection = remote.connect_auth(Direction::Fetch, Some(credential_callbacks()), None)?;
    let tags = connection
        .list()?
        .iter()
        .filter_map(|head| head.name().strip_prefix("refs/tags/"))
        .filter(|name| !name.ends_with("^{}"))
        .map(str::to_string)
        .collect();
    Ok(tags)
}

/// SSH keys from ~/.ssh, then the agent, then libgit2's defaults.
fn credential_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        Cred::default()
    });
    callbacks
}
