//! Choosing whom to re-request a review from.

use std::collections::{BTreeSet, HashMap};

use review_kit_github::{Review, ReviewState, ReviewersRequest, TeamRef};
use tracing::info;

/// Everyone with a submitted review, optionally skipping reviewers whose
/// latest review is an approval.
pub fn from_latest_reviews(latest: &[Review], exclude_approved: bool) -> ReviewersRequest {
    let mut request = ReviewersRequest::default();
    for review in latest {
        let Some(login) = review.login() else {
            continue;
        };
        if exclude_approved && review.state == ReviewState::Approved {
            info!(reviewer = login, "Skipping approved reviewer");
            continue;
        }
        if !request.reviewers.iter().any(|r| r == login) {
            request.reviewers.push(login.to_string());
        }
    }
    request
}

/// Drop approved users, and teams with at least one approving member.
pub fn drop_approved(
    request: ReviewersRequest,
    approved: &BTreeSet<String>,
    team_members: &HashMap<TeamRef, Vec<String>>,
) -> ReviewersRequest {
    let reviewers = request
        .reviewers
        .into_iter()
        .filter(|reviewer| {
            let keep = !approved.contains(reviewer);
            if !keep {
                info!(reviewer = %reviewer, "Skipping approved reviewer");
            }
            keep
        })
        .collect();

    let teams = request
        .teams
        .into_iter()
        .filter(|team| {
            let members = team_members.get(team).map(Vec::as_slice).unwrap_or_default();
            match members.iter().find(|m| approved.contains(*m)) {
                Some(member) => {
                    info!(team = %team, member = %member, "Skipping approved team reviewer member");
                    false
                }
                None => true,
            }
        })
        .collect();

    ReviewersRequest { reviewers, teams }
}
