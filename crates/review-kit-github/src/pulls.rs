//! Pull requests, reviews and reviewer requests

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use review_kit_core::Repository;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::GitHubClient;
use crate::error::GitHubError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    pub head: GitRef,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    /// `None` for reviews by deleted accounts
    #[serde(default)]
    pub user: Option<User>,
    pub state: ReviewState,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Review {
    pub fn login(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

/// The latest submitted review of each reviewer, in order of first review.
///
/// Pending (unsubmitted) reviews are ignored.
pub fn latest_reviews(reviews: &[Review]) -> Vec<Review> {
    let mut order: Vec<&str> = Vec::new();
    let mut latest: HashMap<&str, &Review> = HashMap::new();

    for review in reviews.iter().filter(|r| r.state != ReviewState::Pending) {
        let Some(login) = review.login() else {
            continue;
        };
        if latest.insert(login, review).is_none() {
            order.push(login);
        }
    }
    order
        .into_iter()
        .filter_map(|login| latest.get(login).map(|r| (*r).clone()))
        .collect()
}

/// Logins whose latest review is an approval.
pub fn approved_reviewers(latest: &[Review]) -> BTreeSet<String> {
    latest
        .iter()
        .filter(|r| r.state == ReviewState::Approved)
        .filter_map(|r| r.login().map(str::to_string))
        .collect()
}

/// A team, written `org/slug`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamRef {
    pub org: String,
    pub slug: String,
}

impl fmt::Display for TeamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.slug)
    }
}

/// Users and teams to request a review from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewersRequest {
    pub reviewers: Vec<String>,
    pub teams: Vec<TeamRef>,
}

impl ReviewersRequest {
    /// Parse reviewer arguments: `user`, `org/team`, each optionally
    /// prefixed with `@`. Duplicates are dropped, order is kept.
    pub fn parse<I, S>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut request = ReviewersRequest::default();
        for item in items {
            let raw = item.as_ref().trim();
            let name = raw.strip_prefix('@').unwrap_or(raw);
            match name.split_once('/') {
                Some((org, slug)) if !org.is_empty() && !slug.is_empty() && !slug.contains('/') => {
                    let team = TeamRef {
                        org: org.to_string(),
                        slug: slug.to_string(),
                    };
                    if !request.teams.contains(&team) {
                        request.teams.push(team);
                    }
                }
                None if !name.is_empty() => {
                    if !request.reviewers.iter().any(|r| r == name) {
                        request.reviewers.push(name.to_string());
                    }
                }
                _ => {
                    return Err(GitHubError::InvalidArgument(format!(
                        "invalid reviewer {raw:?}"
                    )))
                }
            }
        }
        Ok(request)
    }

    pub fn is_empty(&self) -> bool {
        self.reviewers.is_empty() && self.teams.is_empty()
    }

    /// Body of the `requested_reviewers` endpoint (team slugs only).
    fn payload(&self) -> serde_json::Value {
        json!({
            "reviewers": self.reviewers,
            "team_reviewers": self.teams.iter().map(|t| t.slug.as_str()).collect::<Vec<_>>(),
        })
    }
}

impl GitHubClient {
    pub async fn get_pull_request(&self, repo: &Repository, number: u64) -> Result<PullRequest> {
        self.get_json(&format!("{}/pulls/{}", repo.api_path(), number))
            .await
    }

    /// All reviews of a pull request, oldest first.
    pub async fn list_reviews(&self, repo: &Repository, number: u64) -> Result<Vec<Review>> {
        self.get_all(
            &format!("{}/pulls/{}/reviews", repo.api_path(), number),
            |page: Vec<Review>| page,
        )
        .await
    }

    pub async fn list_team_members(&self, team: &TeamRef) -> Result<Vec<User>> {
        self.get_all(
            &format!("/orgs/{}/teams/{}/members", team.org, team.slug),
            |page: Vec<User>| page,
        )
        .await
    }

    /// Replace every team in `request` by its members.
    pub async fn expand_team_reviewers(&self, request: ReviewersRequest) -> Result<ReviewersRequest> {
        let mut expanded = ReviewersRequest {
            reviewers: request.reviewers,
            teams: Vec::new(),
        };
        for team in &request.teams {
            for member in self.list_team_members(team).await? {
                if !expanded.reviewers.contains(&member.login) {
                    expanded.reviewers.push(member.login);
                }
            }
        }
        Ok(expanded)
    }

    /// Request (or re-request) reviews on a pull request.
    pub async fn request_reviewers(
        &self,
        repo: &Repository,
        number: u64,
        request: &ReviewersRequest,
    ) -> Result<PullRequest> {
        self.post_json(
            &format!("{}/pulls/{}/requested_reviewers", repo.api_path(), number),
            &request.payload(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: u64, login: &str, state: ReviewState) -> Review {
        Review {
            id,
            user: Some(User {
                login: login.to_string(),
            }),
            state,
            submitted_at: None,
        }
    }

    #[test]
    fn test_parse_reviewers_and_teams() {
        let request =
            ReviewersRequest::parse(["alice", "@bob", "octo/core", "@octo/docs", "alice"]).unwrap();
        assert_eq!(request.reviewers, vec!["alice", "bob"]);
        assert_eq!(
            request.teams.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
            vec!["octo/core", "octo/docs"]
        );
    }

    #[test]
    fn test_parse_rejects_malformed_reviewers() {
        for bad in ["", "@", "octo/", "/core", "a/b/c"] {
            assert!(ReviewersRequest::parse([bad]).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_payload_uses_team_slugs() {
        let request = ReviewersRequest::parse(["alice", "octo/core"]).unwrap();
        assert_eq!(
            request.payload(),
            json!({"reviewers": ["alice"], "team_reviewers": ["core"]})
        );
    }

    #[test]
    fn test_latest_reviews_keeps_last_state_per_user() {
        let reviews = vec![
            review(1, "alice", ReviewState::ChangesRequested),
            review(2, "bob", ReviewState::Commented),
            review(3, "alice", ReviewState::Approved),
            review(4, "carol", ReviewState::Pending),
        ];
        let latest = latest_reviews(&reviews);
        let ids: Vec<u64> = latest.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2]);

        let approved = approved_reviewers(&latest);
        assert_eq!(approved.into_iter().collect::<Vec<_>>(), vec!["alice"]);
    }

    #[test]
    fn test_review_from_deleted_account_is_skipped() {
        let reviews = vec![Review {
            id: 1,
            user: None,
            state: ReviewState::Approved,
            submitted_at: None,
        }];
        assert!(latest_reviews(&reviews).is_empty());
    }

    #[test]
    fn test_pull_request_deserializes() {
        let pr: PullRequest = serde_json::from_value(json!({
            "number": 12,
            "title": "Fix parser",
            "state": "open",
            "head": {"ref": "fix-parser", "sha": "deadbeef"},
            "html_url": "https://github.com/o/r/pull/12"
        }))
        .unwrap();
        assert_eq!(pr.head.sha, "deadbeef");
        assert_eq!(pr.head.ref_name, "fix-parser");
    }
}
