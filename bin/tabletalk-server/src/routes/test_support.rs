//! In-process providers and request helpers for router tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{request, Request};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tabletalk_relay::row::{reshape, TableRow};
use tabletalk_relay::{
    AccessToken, ChatModel, ChatTurn, FieldList, RelayError, Row, TokenExchanger, Warehouse,
};
use tower::ServiceExt;
use url::Url;

use crate::config::test::base_env;
use crate::config::Config;
use crate::session::MemorySessionStore;
use crate::state::AppState;
use crate::views::Views;

/// The only code [`FakeOAuth`] accepts.
pub const VALID_CODE: &str = "good-code";
pub const ISSUED_TOKEN: &str = "tok-1";

pub struct FakeOAuth {
    url: Url,
    pub codes: Mutex<Vec<String>>,
}

#[async_trait]
impl TokenExchanger for FakeOAuth {
    fn authorize_url(&self, state: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("state", state);
        url
    }

    async fn exchange_code(&self, code: &str) -> tabletalk_relay::Result<AccessToken> {
        self.codes.lock().unwrap().push(code.to_owned());
        if code == VALID_CODE {
            Ok(AccessToken::new(ISSUED_TOKEN))
        } else {
            Err(RelayError::Upstream {
                service: "oauth",
                status: 400,
                message: "invalid_grant: Malformed auth code.".into(),
            })
        }
    }
}

pub struct FakeWarehouse {
    rows: Vec<Row>,
    /// `(token, sql)` per call.
    pub queries: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn run_query(&self, token: &AccessToken, sql: &str) -> tabletalk_relay::Result<Vec<Row>> {
        self.queries
            .lock()
            .unwrap()
            .push((token.secret().to_owned(), sql.to_owned()));
        Ok(self.rows.clone())
    }
}

pub struct FakeChat {
    reply: String,
    pub turns: Mutex<Vec<ChatTurn>>,
}

#[async_trait]
impl ChatModel for FakeChat {
    fn label(&self) -> &str {
        "fake/model"
    }

    async fn send(&self, turn: &ChatTurn) -> tabletalk_relay::Result<String> {
        self.turns.lock().unwrap().push(turn.clone());
        Ok(self.reply.clone())
    }
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub store: MemorySessionStore,
    pub oauth: Arc<FakeOAuth>,
    pub warehouse: Arc<FakeWarehouse>,
    pub chat: Arc<FakeChat>,
}

/// A router wired to fakes, with the `acme-prod.crm.people` table.
pub fn harness() -> Harness {
    let env = base_env();
    let config = Config::from_lookup(|k| env.get(k).map(|v| (*v).to_owned())).unwrap();

    let raw: Vec<TableRow> = serde_json::from_value(json!([
        { "f": [{ "v": "42" }, { "v": "Jane" }, { "v": "Doe" }, { "v": "jane@x.com" }] }
    ]))
    .unwrap();

    let oauth = Arc::new(FakeOAuth {
        url: Url::parse("https://accounts.example/auth?client_id=client-1").unwrap(),
        codes: Mutex::default(),
    });
    let warehouse = Arc::new(FakeWarehouse {
        rows: reshape(&raw, &FieldList::default()).unwrap(),
        queries: Mutex::default(),
    });
    let chat = Arc::new(FakeChat {
        reply: "```sql\nSELECT unique_id FROM `acme-prod.crm.people`\n```".into(),
        turns: Mutex::default(),
    });

    let store = MemorySessionStore::new();
    let state = Arc::new(AppState {
        config: Arc::new(config),
        sessions: store.clone(),
        views: Arc::new(Views::new().unwrap()),
        oauth: oauth.clone(),
        warehouse: warehouse.clone(),
        chat: chat.clone(),
    });

    Harness {
        state,
        store,
        oauth,
        warehouse,
        chat,
    }
}

impl Harness {
    pub fn app(&self) -> Router {
        crate::routes::build(self.state.clone())
    }

    /// Walk the sign-in flow and return the `Cookie` header of a session
    /// that holds [`ISSUED_TOKEN`].
    pub async fn sign_in(&self) -> String {
        let page = self.app().oneshot(get("/", None)).await.unwrap();
        let cookie = session_cookie(&page).unwrap();
        let nonce = state_param(&body_text(page).await).unwrap();
        let uri = format!("/oauth/callback?code={VALID_CODE}&state={nonce}");
        self.app().oneshot(get(&uri, Some(&cookie))).await.unwrap();
        cookie
    }
}

/// `name=value` of the cookie a response sets.
pub fn session_cookie(resp: &Response) -> Option<String> {
    let header = resp.headers().get(SET_COOKIE)?.to_str().ok()?;
    header.split(';').next().map(str::to_owned)
}

/// The `state` query value of the first consent link in `html`.
pub fn state_param(html: &str) -> Option<String> {
    let (_, rest) = html.split_once("state=")?;
    let value: String = rest.chars().take_while(char::is_ascii_alphanumeric).collect();
    (!value.is_empty()).then_some(value)
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>) -> request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match cookie {
        Some(c) => builder.header(COOKIE, c),
        None => builder,
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    request("GET", uri, cookie).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    request(method, uri, cookie)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_text(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
