//! Blocking JSON-over-HTTP implementation of `Transport`.
//!
//! Routes:
//!
//! | Operation        | Request                         |
//! |------------------|---------------------------------|
//! | create_action    | `POST /actions`                 |
//! | submit_evidence  | `POST /evidence`                |
//! | get_policy       | `GET /policy[?actionType=..]`   |
//! | set_policy       | `POST /policy`                  |
//! | get_action       | `GET /actions/{id}`             |
//! | list_actions     | `GET /actions[?filters]`        |
//! | get_evidence     | `GET /evidence/{id}`            |
//! | approve_action   | `POST /approve/{id}`            |
//! | reject_action    | `POST /reject/{id}`             |
//!
//! Each call is one request. Nothing is retried here.

use reqwest::{
    blocking::{Client, RequestBuilder},
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Url,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use apaai_contracts::{
    Action, ActionFilters, ApaaiError, ApaaiResult, Decision, Evidence, EvidenceReceipt, Policy,
};
use apaai_core::Transport;

use crate::config::ClientConfig;

/// A `Transport` that talks to an APAAI service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

/// A successful response: status code and raw body.
struct Reply {
    status: u16,
    body: String,
}

impl HttpTransport {
    /// Build a transport from `config`.
    ///
    /// Returns `ApaaiError::Config` for an invalid endpoint, an unusable
    /// header, or an HTTP client that cannot be constructed.
    pub fn new(config: &ClientConfig) -> ApaaiResult<Self> {
        let base = config.base_url()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApaaiError::config(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApaaiError::config(format!("invalid value for header '{name}': {e}")))?;
            headers.insert(name, value);
        }
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| ApaaiError::config("api key contains characters not allowed in a header"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApaaiError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base })
    }

    /// The base URL every route is resolved against.
    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    /// Resolve `segments` below the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> ApaaiResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApaaiError::config(format!("endpoint '{}' cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, &str)]) -> ApaaiResult<T> {
        let url = self.url(segments)?;
        let mut request = self.client.get(url.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        let reply = self.send("GET", &url, request)?;
        decode(&reply, "GET", &url)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, segments: &[&str], body: &B) -> ApaaiResult<T> {
        let reply = self.post_raw(segments, body)?;
        decode(&reply.0, "POST", &reply.1)
    }

    fn post_raw<B: Serialize>(&self, segments: &[&str], body: &B) -> ApaaiResult<(Reply, Url)> {
        let url = self.url(segments)?;
        let request = self.client.post(url.clone()).json(body);
        let reply = self.send("POST", &url, request)?;
        Ok((reply, url))
    }

    fn send(&self, method: &str, url: &Url, request: RequestBuilder) -> ApaaiResult<Reply> {
        let path = url.path();
        debug!(method = method, path = %path, "sending request");

        let response = request.send().map_err(|e| {
            warn!(method = method, path = %path, error = %e, "request failed");
            ApaaiError::transport(
                e.status().map(|s| s.as_u16()),
                format!("{method} {path} failed: {e}"),
            )
        })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| {
            ApaaiError::transport(Some(status), format!("{method} {path}: unreadable response body: {e}"))
        })?;

        if !(200..300).contains(&status) {
            warn!(method = method, path = %path, status = status, "server returned an error");
            let detail = body.trim();
            let reason = if detail.is_empty() {
                format!("{method} {path} -> {status}")
            } else {
                format!("{method} {path} -> {status}: {detail}")
            };
            return Err(ApaaiError::transport(Some(status), reason));
        }

        Ok(Reply { status, body })
    }
}

fn decode<T: DeserializeOwned>(reply: &Reply, method: &str, url: &Url) -> ApaaiResult<T> {
    serde_json::from_str(&reply.body).map_err(|e| {
        ApaaiError::transport(
            Some(reply.status),
            format!("{method} {}: malformed response body: {e}", url.path()),
        )
    })
}

/// `GET /evidence/{id}` answers with a list, but older servers return a
/// single object.
#[derive(Deserialize)]
#[serde(untagged)]
enum EvidenceBatches {
    Many(Vec<Evidence>),
    One(Evidence),
}

fn optional_field(key: &str, value: Option<&str>) -> Map<String, Value> {
    let mut body = Map::new();
    if let Some(value) = value {
        body.insert(key.to_string(), Value::String(value.to_string()));
    }
    body
}

impl Transport for HttpTransport {
    fn create_action(&self, action: &Action) -> ApaaiResult<Decision> {
        self.post(&["actions"], action)
    }

    fn submit_evidence(&self, evidence: &Evidence) -> ApaaiResult<EvidenceReceipt> {
        let (reply, url) = self.post_raw(&["evidence"], evidence)?;
        // 204 No Content and empty 200s are valid acknowledgments.
        if reply.body.trim().is_empty() {
            return Ok(EvidenceReceipt::default());
        }
        decode(&reply, "POST", &url)
    }

    fn get_policy(&self, action_type: Option<&str>) -> ApaaiResult<Policy> {
        match action_type {
            Some(action_type) => self.get(&["policy"], &[("actionType", action_type)]),
            None => self.get(&["policy"], &[]),
        }
    }

    fn set_policy(&self, policy: &Policy) -> ApaaiResult<Policy> {
        self.post(&["policy"], policy)
    }

    fn approve_action(&self, action_id: &str, approver: Option<&str>) -> ApaaiResult<Decision> {
        self.post(&["approve", action_id], &optional_field("approver", approver))
    }

    fn reject_action(&self, action_id: &str, reason: Option<&str>) -> ApaaiResult<Decision> {
        self.post(&["reject", action_id], &optional_field("reason", reason))
    }

    fn get_action(&self, action_id: &str) -> ApaaiResult<Action> {
        self.get(&["actions", action_id], &[])
    }

    fn list_actions(&self, filters: Option<&ActionFilters>) -> ApaaiResult<Vec<Action>> {
        let query: Vec<(&str, &str)> = filters.map(|f| f.pairs().collect()).unwrap_or_default();
        self.get(&["actions"], &query)
    }

    fn get_evidence(&self, action_id: &str) -> ApaaiResult<Vec<Evidence>> {
        let batches: EvidenceBatches = self.get(&["evidence", action_id], &[])?;
        Ok(match batches {
            EvidenceBatches::Many(list) => list,
            EvidenceBatches::One(single) => vec![single],
        })
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use apaai_contracts::{Actor, Check, DecisionStatus};

    use super::*;

    fn transport(server: &Server) -> HttpTransport {
        HttpTransport::new(&ClientConfig::new(server.url()).with_api_key("sk_test")).unwrap()
    }

    fn action(id: &str) -> Action {
        Action {
            id: id.to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            action_type: "send_email".to_string(),
            actor: Actor::agent("mail-bot"),
            target: Some("mailto:sarah@acme.com".to_string()),
            params: None,
            status: None,
            checks: vec![],
            agent_id: None,
            extra: Default::default(),
        }
    }

    // ── create_action ────────────────────────────────────────────────────────

    #[test]
    fn create_action_posts_action_with_bearer_auth() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/actions")
            .match_header("authorization", "Bearer sk_test")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "id": "act_1",
                "timestamp": "2026-01-01T00:00:00Z",
                "type": "send_email",
                "actor": { "kind": "agent", "name": "mail-bot" },
                "target": "mailto:sarah@acme.com"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "actionId": "act_1", "status": "requires_approval", "checks": ["reviewer_approval"] })
                    .to_string(),
            )
            .create();

        let decision = transport(&server).create_action(&action("act_1")).unwrap();

        mock.assert();
        assert_eq!(decision.status, DecisionStatus::RequiresApproval);
        assert_eq!(decision.checks[0].name(), "reviewer_approval");
    }

    #[test]
    fn no_authorization_header_without_api_key() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/policy")
            .match_header("authorization", Matcher::Missing)
            .with_body(json!({ "rules": [] }).to_string())
            .create();

        let transport = HttpTransport::new(&ClientConfig::new(server.url())).unwrap();
        transport.get_policy(None).unwrap();

        mock.assert();
    }

    #[test]
    fn extra_headers_and_user_agent_are_sent() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/policy")
            .match_header("x-tenant", "acme")
            .match_header("user-agent", Matcher::Regex("^apaai-rs/".to_string()))
            .with_body("{}")
            .create();

        let config = ClientConfig::new(server.url()).with_header("x-tenant", "acme");
        HttpTransport::new(&config).unwrap().get_policy(None).unwrap();

        mock.assert();
    }

    // ── error handling ───────────────────────────────────────────────────────

    #[test]
    fn non_success_status_is_preserved() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/actions")
            .with_status(503)
            .with_body("maintenance window")
            .expect(1)
            .create();

        let err = transport(&server).create_action(&action("act_1")).unwrap_err();

        mock.assert();
        assert_eq!(err.status(), Some(503));
        let msg = err.to_string();
        assert!(msg.contains("POST /actions -> 503"), "got: {msg}");
        assert!(msg.contains("maintenance window"));
    }

    #[test]
    fn malformed_success_body_is_a_transport_error() {
        let mut server = Server::new();
        server.mock("POST", "/actions").with_status(200).with_body("not json").create();

        let err = transport(&server).create_action(&action("act_1")).unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.status(), Some(200));
        assert!(err.to_string().contains("malformed response body"));
    }

    #[test]
    fn decision_missing_status_is_rejected() {
        let mut server = Server::new();
        server
            .mock("POST", "/actions")
            .with_body(json!({ "actionId": "act_1" }).to_string())
            .create();

        let err = transport(&server).create_action(&action("act_1")).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn connection_failure_has_no_status() {
        let transport = HttpTransport::new(&ClientConfig::new("http://127.0.0.1:1")).unwrap();
        let err = transport.get_policy(None).unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn invalid_header_is_config_error() {
        let config = ClientConfig::default().with_header("bad header", "x");
        assert!(matches!(HttpTransport::new(&config), Err(ApaaiError::Config { .. })));
    }

    // ── evidence ─────────────────────────────────────────────────────────────

    #[test]
    fn submit_evidence_posts_checks() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/evidence")
            .match_body(Matcher::Json(json!({
                "actionId": "act_1",
                "checks": [{ "name": "email_sent", "pass": true, "note": "id=msg_1" }]
            })))
            .with_body(json!({ "verified": true }).to_string())
            .create();

        let evidence = Evidence::new("act_1", vec![Check::passed("email_sent").with_note("id=msg_1")]);
        let receipt = transport(&server).submit_evidence(&evidence).unwrap();

        mock.assert();
        assert_eq!(receipt.verified, Some(true));
    }

    #[test]
    fn submit_evidence_accepts_no_content() {
        let mut server = Server::new();
        server.mock("POST", "/evidence").with_status(204).create();

        let receipt = transport(&server)
            .submit_evidence(&Evidence::new("act_1", vec![Check::passed("ok")]))
            .unwrap();
        assert_eq!(receipt, EvidenceReceipt::default());
    }

    #[test]
    fn get_evidence_accepts_list_or_single_object() {
        let mut server = Server::new();
        server
            .mock("GET", "/evidence/act_1")
            .with_body(
                json!([
                    { "actionId": "act_1", "checks": [{ "name": "queued", "pass": true }] },
                    { "actionId": "act_1", "checks": [{ "name": "delivered", "pass": true }] }
                ])
                .to_string(),
            )
            .create();
        server
            .mock("GET", "/evidence/act_2")
            .with_body(json!({ "actionId": "act_2", "checks": [] }).to_string())
            .create();

        let transport = transport(&server);
        let many = transport.get_evidence("act_1").unwrap();
        let one = transport.get_evidence("act_2").unwrap();

        assert_eq!(many.len(), 2);
        assert_eq!(many[1].checks[0].name, "delivered");
        assert_eq!(one, vec![Evidence::new("act_2", vec![])]);
    }

    // ── policy ───────────────────────────────────────────────────────────────

    #[test]
    fn get_policy_sends_action_type_query() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/policy")
            .match_query(Matcher::UrlEncoded("actionType".into(), "send email".into()))
            .with_body(json!({ "rules": [{ "when": { "action": "send email" } }] }).to_string())
            .create();

        let policy = transport(&server).get_policy(Some("send email")).unwrap();

        mock.assert();
        assert!(policy.rules()[0].names("send email"));
    }

    #[test]
    fn get_policy_accepts_unmodeled_rule_shapes() {
        let document = json!({
            "owner": null,
            "rules": [{ "when": { "action": "send_email" }, "mode": "audit" }]
        });
        let mut server = Server::new();
        server
            .mock("GET", "/policy")
            .with_body(document.to_string())
            .create();

        let policy = transport(&server).get_policy(None).unwrap();

        assert_eq!(serde_json::to_value(&policy).unwrap(), document);
        assert!(policy.rules().is_empty());
    }

    #[test]
    fn non_object_policy_body_is_malformed() {
        let mut server = Server::new();
        server.mock("GET", "/policy").with_body("[]").create();

        let err = transport(&server).get_policy(None).unwrap_err();
        assert_eq!(err.status(), Some(200));
        assert!(err.to_string().contains("malformed response body"));
    }

    #[test]
    fn set_policy_round_trips_unknown_fields() {
        let document = json!({ "version": 2, "rules": [{ "require": ["owner_approval"], "weight": 5 }] });
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/policy")
            .match_body(Matcher::Json(document.clone()))
            .with_body(document.to_string())
            .create();

        let policy: Policy = serde_json::from_value(document.clone()).unwrap();
        let stored = transport(&server).set_policy(&policy).unwrap();

        mock.assert();
        assert_eq!(serde_json::to_value(stored).unwrap(), document);
    }

    // ── approval ─────────────────────────────────────────────────────────────

    #[test]
    fn approve_sends_approver_only_when_given() {
        let mut server = Server::new();
        let with_approver = server
            .mock("POST", "/approve/act_1")
            .match_body(Matcher::Json(json!({ "approver": "sarah" })))
            .with_body(json!({ "actionId": "act_1", "status": "approved" }).to_string())
            .create();
        let without = server
            .mock("POST", "/approve/act_2")
            .match_body(Matcher::Json(json!({})))
            .with_body(json!({ "actionId": "act_2", "status": "approved" }).to_string())
            .create();

        let transport = transport(&server);
        let decision = transport.approve_action("act_1", Some("sarah")).unwrap();
        transport.approve_action("act_2", None).unwrap();

        with_approver.assert();
        without.assert();
        assert_eq!(decision.status, DecisionStatus::Approved);
    }

    #[test]
    fn reject_sends_reason() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/reject/act_1")
            .match_body(Matcher::Json(json!({ "reason": "wrong recipient" })))
            .with_body(json!({ "actionId": "act_1", "status": "rejected" }).to_string())
            .create();

        let decision = transport(&server).reject_action("act_1", Some("wrong recipient")).unwrap();

        mock.assert();
        assert_eq!(decision.status, DecisionStatus::Rejected);
    }

    #[test]
    fn conflicting_approval_surfaces_status() {
        let mut server = Server::new();
        server
            .mock("POST", "/approve/act_1")
            .with_status(409)
            .with_body("action is not awaiting approval")
            .create();

        let err = transport(&server).approve_action("act_1", None).unwrap_err();
        assert_eq!(err.status(), Some(409));
    }

    // ── actions ──────────────────────────────────────────────────────────────

    #[test]
    fn get_action_encodes_id_as_one_segment() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", Matcher::Regex("^/actions/a%2Fb$".to_string()))
            .with_body(
                json!({
                    "id": "a/b",
                    "timestamp": "2026-01-01T00:00:00Z",
                    "type": "send_email",
                    "actor": { "kind": "agent", "name": "mail-bot" },
                    "status": "approved"
                })
                .to_string(),
            )
            .create();

        let action = transport(&server).get_action("a/b").unwrap();

        mock.assert();
        assert_eq!(action.id, "a/b");
        assert_eq!(action.status, Some(DecisionStatus::Approved));
    }

    #[test]
    fn list_actions_sends_filters_as_query() {
        let mut server = Server::new();
        let filtered = server
            .mock("GET", "/actions")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "requires_approval".into()),
                Matcher::UrlEncoded("limit".into(), "5".into()),
            ]))
            .with_body("[]")
            .create();

        let filters = ActionFilters::new().status(DecisionStatus::RequiresApproval).limit(5);
        let actions = transport(&server).list_actions(Some(&filters)).unwrap();

        filtered.assert();
        assert!(actions.is_empty());
    }

    #[test]
    fn list_actions_without_filters_has_no_query() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/actions")
            .match_query(Matcher::Missing)
            .with_body(json!([action("act_1")]).to_string())
            .create();

        let actions = transport(&server).list_actions(None).unwrap();

        mock.assert();
        assert_eq!(actions, vec![action("act_1")]);
    }

    #[test]
    fn endpoint_path_prefix_is_respected() {
        let mut server = Server::new();
        let mock = server.mock("GET", "/api/v1/policy").with_body("{}").create();

        let config = ClientConfig::new(format!("{}/api/v1/", server.url()));
        HttpTransport::new(&config).unwrap().get_policy(None).unwrap();

        mock.assert();
    }
}
