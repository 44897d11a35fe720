//! Hosted leaderboard from the browser
//!
//! Same wire format as the native client, sent with `fetch` on a local
//! future. The reply lands in the [`PendingReply`] when the promise settles.

use serde::de::DeserializeOwned;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Headers, Request, RequestInit, Response};

use super::{
    Identity, LeaderboardBackend, LeaderboardEntry, LeaderboardPage, LeaderboardQuery,
    PendingReply, SubmitRequest, SubmitResponse,
};
use crate::error::LeaderboardError;

/// Client for `{base_url}/api/leaderboard`; an empty base means same origin
#[derive(Debug, Clone)]
pub struct FetchLeaderboard {
    endpoint: String,
}

impl FetchLeaderboard {
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoint: format!("{}/api/leaderboard", base_url.trim_end_matches('/')),
        }
    }
}

fn js_error(e: JsValue) -> LeaderboardError {
    LeaderboardError::Network(format!("{e:?}"))
}

fn build_submit(
    endpoint: &str,
    request: &SubmitRequest,
    token: &str,
) -> Result<Request, LeaderboardError> {
    let body = serde_json::to_string(request).map_err(|e| LeaderboardError::Decode(e.to_string()))?;
    let headers = Headers::new().map_err(js_error)?;
    headers
        .set("Content-Type", "application/json")
        .map_err(js_error)?;
    headers
        .set("Authorization", &format!("Bearer {token}"))
        .map_err(js_error)?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(&body));
    Request::new_with_str_and_init(endpoint, &init).map_err(js_error)
}

fn build_fetch(endpoint: &str, query: &LeaderboardQuery) -> Result<Request, LeaderboardError> {
    let url = format!(
        "{endpoint}?game={}&limit={}",
        query.game_param(),
        query.limit
    );
    let init = RequestInit::new();
    init.set_method("GET");
    Request::new_with_str_and_init(&url, &init).map_err(js_error)
}

async fn send<T: DeserializeOwned>(request: Request) -> Result<T, LeaderboardError> {
    let window =
        web_sys::window().ok_or_else(|| LeaderboardError::Network("no window".into()))?;
    let value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_error)?;
    let response: Response = value.dyn_into().map_err(js_error)?;

    match response.status() {
        401 => return Err(LeaderboardError::Unauthorized),
        _ if !response.ok() => return Err(LeaderboardError::Status(response.status())),
        _ => {}
    }

    let text = JsFuture::from(response.text().map_err(js_error)?)
        .await
        .map_err(js_error)?
        .as_string()
        .ok_or_else(|| LeaderboardError::Decode("non-text body".into()))?;
    serde_json::from_str(&text).map_err(|e| LeaderboardError::Decode(e.to_string()))
}

impl LeaderboardBackend for FetchLeaderboard {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn submit(&self, request: &SubmitRequest, identity: &Identity) -> PendingReply<SubmitResponse> {
        let request = match build_submit(&self.endpoint, request, &identity.token) {
            Ok(request) => request,
            Err(e) => return PendingReply::ready(Err(e)),
        };
        let (tx, reply) = PendingReply::channel();
        spawn_local(async move { tx.send(send(request).await) });
        reply
    }

    fn fetch(&self, query: &LeaderboardQuery) -> PendingReply<Vec<LeaderboardEntry>> {
        let request = match build_fetch(&self.endpoint, query) {
            Ok(request) => request,
            Err(e) => return PendingReply::ready(Err(e)),
        };
        let (tx, reply) = PendingReply::channel();
        spawn_local(async move {
            tx.send(send::<LeaderboardPage>(request).await.map(|page| page.leaderboard))
        });
        reply
    }
}
