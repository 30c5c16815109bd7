//! GraphQL documents, response shapes and conversion into records.
//!
//! Every connection is requested with a single page of 100 nodes. Subjects
//! with more than 100 matching pull requests in the window are undercounted,
//! and so are teams with more than 100 members.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::{
    ActivityQuery, ActivityQueryResult, ErrorDetail, Participant, PrState, PullRequestRecord,
    RepoNaming, Role,
};

pub const SEARCH_PAGE_SIZE: usize = 100;
pub const PARTICIPANT_PAGE_SIZE: usize = 100;
pub const TEAM_PAGE_SIZE: usize = 100;

const ACTIVITY_QUERY: &str = r#"
    query($query: String!, $first: Int!, $participants: Int!) {
        search(query: $query, type: ISSUE, first: $first) {
            nodes {
                __typename
                ... on PullRequest {
                    title
                    url
                    state
                    createdAt
                    updatedAt
                    mergedAt
                    author {
                        login
                    }
                    repository {
                        name
                        nameWithOwner
                    }
                    participants(first: $participants) {
                        nodes {
                            name
                            login
                        }
                    }
                }
            }
        }
    }
"#;

const TEAM_MEMBERS_QUERY: &str = r#"
    query($owner: String!, $team: String!, $first: Int!) {
        organization(login: $owner) {
            team(slug: $team) {
                members(first: $first) {
                    nodes {
                        login
                    }
                }
            }
        }
    }
"#;

/// Builds a GitHub issue-search string term by term.
#[derive(Debug, Default)]
pub struct SearchQueryBuilder {
    terms: Vec<String>,
}

impl SearchQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pr_type(&mut self) -> &mut Self {
        self.terms.push("is:pr".to_string());
        self
    }

    pub fn owner(&mut self, owner: &str) -> &mut Self {
        self.terms.push(format!("user:{}", owner));
        self
    }

    pub fn role(&mut self, role: Role, subject: &str) -> &mut Self {
        self.terms.push(format!("{}:{}", role.as_str(), subject));
        self
    }

    pub fn created_since(&mut self, since: NaiveDate) -> &mut Self {
        self.terms.push(format!("created:>={}", since.format("%Y-%m-%d")));
        self
    }

    pub fn newest_first(&mut self) -> &mut Self {
        self.terms.push("sort:created-desc".to_string());
        self
    }

    pub fn build(&self) -> String {
        self.terms.join(" ")
    }
}

pub fn activity_search_string(query: &ActivityQuery) -> String {
    SearchQueryBuilder::new()
        .pr_type()
        .owner(&query.owner)
        .role(query.role, &query.subject)
        .created_since(query.since)
        .newest_first()
        .build()
}

pub fn create_activity_query(query: &ActivityQuery) -> serde_json::Value {
    serde_json::json!({
        "query": ACTIVITY_QUERY,
        "variables": {
            "query": activity_search_string(query),
            "first": SEARCH_PAGE_SIZE,
            "participants": PARTICIPANT_PAGE_SIZE,
        }
    })
}

pub fn create_team_members_query(owner: &str, team_slug: &str) -> serde_json::Value {
    serde_json::json!({
        "query": TEAM_MEMBERS_QUERY,
        "variables": {
            "owner": owner,
            "team": team_slug,
            "first": TEAM_PAGE_SIZE,
        }
    })
}

/// Turns a human-readable team name into the slug GitHub expects.
pub fn team_slug(team_name: &str) -> String {
    team_name.trim().replace(' ', "-")
}

#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<ErrorDetail>>,
}

impl<T> GraphQLResponse<T> {
    /// Splits the response into its errors (if any) or its data.
    pub fn into_result(self) -> Result<std::result::Result<T, Vec<ErrorDetail>>> {
        match self.errors {
            Some(errors) if !errors.is_empty() => Ok(Err(errors)),
            _ => self
                .data
                .map(Ok)
                .context("GraphQL response carried neither data nor errors"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: SearchResults,
}

/// Search nodes stay raw until their `__typename` says what they are, so a
/// pull request that fails to decode can be told apart from an issue.
#[derive(Debug, Deserialize)]
pub struct SearchResults {
    pub nodes: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLPullRequest {
    pub title: String,
    pub url: String,
    pub state: PrState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub author: Option<GraphQLActor>,
    pub repository: GraphQLRepository,
    pub participants: GraphQLParticipantConnection,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLActor {
    pub login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRepository {
    pub name: String,
    pub name_with_owner: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLParticipantConnection {
    pub nodes: Vec<GraphQLParticipant>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLParticipant {
    pub name: Option<String>,
    pub login: String,
}

impl GraphQLParticipant {
    /// Profile name when set, otherwise the login.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => self.login.as_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TeamData {
    pub organization: Option<GraphQLOrganization>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLOrganization {
    pub team: Option<GraphQLTeam>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLTeam {
    pub members: GraphQLMemberConnection,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLMemberConnection {
    pub nodes: Vec<GraphQLActor>,
}

impl TeamData {
    /// Member logins in API order, or `None` when the organization or team
    /// does not exist.
    pub fn into_logins(self) -> Option<Vec<String>> {
        self.organization
            .and_then(|org| org.team)
            .map(|team| team.members.nodes.into_iter().map(|m| m.login).collect())
    }
}

/// Converts a GraphQL pull request node into a record.
pub fn convert_graphql_pr(pr: GraphQLPullRequest, naming: RepoNaming) -> PullRequestRecord {
    let participants = pr
        .participants
        .nodes
        .iter()
        .map(|p| Participant {
            display_name: p.display_name().to_string(),
        })
        .collect();

    let repository = match naming {
        RepoNaming::Name => pr.repository.name,
        RepoNaming::NameWithOwner => pr.repository.name_with_owner,
    };

    let merged_at = match pr.state {
        PrState::Merged => pr.merged_at,
        PrState::Open | PrState::Closed => None,
    };

    PullRequestRecord {
        title: pr.title,
        url: pr.url,
        state: pr.state,
        // Deleted accounts come back as a null author.
        author_login: pr
            .author
            .map(|a| a.login)
            .unwrap_or_else(|| "ghost".to_string()),
        created_at: pr.created_at,
        updated_at: pr.updated_at,
        merged_at,
        repository,
        participants,
    }
}

fn convert_search_node(node: serde_json::Value, naming: RepoNaming) -> Option<PullRequestRecord> {
    let typename = node.get("__typename").and_then(|t| t.as_str());
    if typename != Some("PullRequest") {
        debug!(typename, "Skipping non pull request search node");
        return None;
    }

    let url = node
        .get("url")
        .and_then(|u| u.as_str())
        .unwrap_or("<unknown>")
        .to_string();
    match serde_json::from_value::<GraphQLPullRequest>(node) {
        Ok(pr) => Some(convert_graphql_pr(pr, naming)),
        Err(err) => {
            warn!(%url, error = %err, "Dropping pull request that could not be decoded");
            None
        }
    }
}

/// Converts a raw search response body into an activity envelope.
pub fn parse_activity_response(
    body: serde_json::Value,
    naming: RepoNaming,
) -> Result<ActivityQueryResult> {
    let response: GraphQLResponse<SearchData> =
        serde_json::from_value(body).context("Failed to decode search response")?;

    let data = match response.into_result()? {
        Ok(data) => data,
        Err(errors) => return Ok(ActivityQueryResult::Errors(errors)),
    };

    let records = data
        .search
        .nodes
        .into_iter()
        .filter_map(|node| convert_search_node(node, naming))
        .collect();

    Ok(ActivityQueryResult::Records(records))
}
