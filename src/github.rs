use std::{path::Path, process::Command};

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::ForgeError,
    graphql::{
        GraphQLResponse, TeamData, create_activity_query, create_team_members_query,
        parse_activity_response,
    },
    types::{ActivityQuery, ActivityQueryResult, Forge, RepoNaming},
};

const TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN", "TOKEN"];

#[derive(Debug, Default, Deserialize)]
struct CredentialFile {
    token: Option<String>,
}

fn read_config_token(config_path: &Path) -> Result<Option<String>> {
    let contents = match std::fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| {
                format!("Failed to read config file '{}'", config_path.display())
            });
        }
    };

    let config: CredentialFile = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid config file '{}'", config_path.display()))?;

    Ok(config
        .token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty()))
}

fn read_env_token() -> Option<String> {
    TOKEN_ENV_VARS.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

fn read_gh_cli_token() -> Result<String> {
    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context("No token in config or environment, and the gh CLI could not be run")?;

    if !output.status.success() {
        anyhow::bail!(
            "No GitHub token found. Add a \"token\" to the config file, set GITHUB_TOKEN, or run 'gh auth login'"
        );
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();

    if token.is_empty() {
        anyhow::bail!("Empty token returned from gh CLI");
    }

    Ok(token)
}

/// Resolves the bearer credential: config file first, then environment, then
/// the gh CLI.
pub fn get_github_token(config_path: &Path) -> Result<String> {
    if let Some(token) = read_config_token(config_path)? {
        debug!(path = %config_path.display(), "Using token from config file");
        return Ok(token);
    }

    if let Some(token) = read_env_token() {
        debug!("Using token from environment");
        return Ok(token);
    }

    read_gh_cli_token()
}

/// Creates an authenticated GitHub client using available credentials.
pub fn setup_github_client(config_path: &Path) -> Result<Octocrab> {
    let token =
        get_github_token(config_path).context("Failed to obtain GitHub authentication token")?;
    Octocrab::builder()
        .personal_token(token)
        .build()
        .context("Failed to create GitHub client")
}

/// Maps an octocrab failure onto the forge error taxonomy.
fn classify_error(operation: String, err: octocrab::Error) -> ForgeError {
    let unauthorized = matches!(
        &err,
        octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 401
    );
    if unauthorized {
        ForgeError::Unauthorized { operation }
    } else {
        ForgeError::transport(operation, err)
    }
}

/// GitHub GraphQL API backed forge.
pub struct GitHub {
    client: Octocrab,
    repo_naming: RepoNaming,
}

impl GitHub {
    pub fn new(client: Octocrab, repo_naming: RepoNaming) -> Self {
        Self {
            client,
            repo_naming,
        }
    }
}

#[async_trait]
impl Forge for GitHub {
    async fn fetch_activity(
        &self,
        query: &ActivityQuery,
    ) -> Result<ActivityQueryResult, ForgeError> {
        let operation = format!(
            "search {}/{} {} activity",
            query.owner, query.subject, query.role
        );
        debug!(
            owner = %query.owner,
            subject = %query.subject,
            role = %query.role,
            "Fetching activity"
        );

        let body: serde_json::Value = self
            .client
            .graphql(&create_activity_query(query))
            .await
            .map_err(|e| classify_error(operation.clone(), e))?;

        parse_activity_response(body, self.repo_naming)
            .map_err(|e| ForgeError::transport(operation, e))
    }

    async fn fetch_team_members(
        &self,
        owner: &str,
        team_slug: &str,
    ) -> Result<Vec<String>, ForgeError> {
        let operation = format!("list members of {}/{}", owner, team_slug);
        debug!(owner, team = team_slug, "Fetching team members");

        let response: GraphQLResponse<TeamData> = self
            .client
            .graphql(&create_team_members_query(owner, team_slug))
            .await
            .map_err(|e| classify_error(operation.clone(), e))?;

        let data = match response
            .into_result()
            .map_err(|e| ForgeError::transport(operation.clone(), e))?
        {
            Ok(data) => data,
            Err(errors) => return Err(ForgeError::Query { operation, errors }),
        };

        data.into_logins().ok_or_else(|| ForgeError::TeamNotFound {
            owner: owner.to_string(),
            team: team_slug.to_string(),
        })
    }
}
