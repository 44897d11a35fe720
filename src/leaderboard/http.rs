//! Hosted leaderboard over HTTP
//!
//! Blocking `ureq` calls, each on its own worker thread so the game loop
//! never waits on the network.

use std::time::Duration;

use super::{
    Identity, LeaderboardBackend, LeaderboardEntry, LeaderboardPage, LeaderboardQuery,
    PendingReply, SubmitRequest, SubmitResponse,
};
use crate::error::LeaderboardError;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Client for `{base_url}/api/leaderboard`
#[derive(Clone)]
pub struct HttpLeaderboard {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpLeaderboard {
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoint: format!("{}/api/leaderboard", base_url.trim_end_matches('/')),
            agent: build_agent(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post_score(
        &self,
        request: &SubmitRequest,
        token: &str,
    ) -> Result<SubmitResponse, LeaderboardError> {
        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &format!("Bearer {}", token))
            .send_json(request)
            .map_err(map_error)?;
        response
            .body_mut()
            .read_json()
            .map_err(|e| LeaderboardError::Decode(e.to_string()))
    }

    fn get_page(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let mut response = self
            .agent
            .get(&self.endpoint)
            .query("game", query.game_param())
            .query("limit", query.limit.to_string())
            .call()
            .map_err(map_error)?;
        let page: LeaderboardPage = response
            .body_mut()
            .read_json()
            .map_err(|e| LeaderboardError::Decode(e.to_string()))?;
        Ok(page.leaderboard)
    }
}

impl LeaderboardBackend for HttpLeaderboard {
    fn name(&self) -> &'static str {
        "http"
    }

    fn submit(&self, request: &SubmitRequest, identity: &Identity) -> PendingReply<SubmitResponse> {
        let (tx, reply) = PendingReply::channel();
        let client = self.clone();
        let request = request.clone();
        let token = identity.token.clone();
        std::thread::spawn(move || tx.send(client.post_score(&request, &token)));
        reply
    }

    fn fetch(&self, query: &LeaderboardQuery) -> PendingReply<Vec<LeaderboardEntry>> {
        let (tx, reply) = PendingReply::channel();
        let client = self.clone();
        let query = *query;
        std::thread::spawn(move || tx.send(client.get_page(&query)));
        reply
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .build();
    config.into()
}

fn map_error(e: ureq::Error) -> LeaderboardError {
    match e {
        ureq::Error::StatusCode(401) => LeaderboardError::Unauthorized,
        ureq::Error::StatusCode(code) => LeaderboardError::Status(code),
        other => LeaderboardError::Network(other.to_string()),
    }
}
