//! Test doubles and fixtures.

use std::{cell::RefCell, collections::VecDeque, time::Duration};

use common::{DateTime, Handler};
use http::StatusCode;
use serde::Serialize;

use crate::{
    domain::{AccessToken, Role},
    infra::{transport, Request, Response},
};

/// Secret the test tokens are signed with.
const SECRET: &[u8] = b"test-secret";

/// [`Transport`] replying with scripted outcomes in their order.
///
/// Yields to the executor once before replying, so concurrent callers can
/// interleave.
///
/// [`Transport`]: crate::infra::Transport
#[derive(Debug, Default)]
pub(crate) struct Scripted {
    /// Outcomes to reply with.
    replies: RefCell<VecDeque<Result<Response, transport::Error>>>,

    /// Received requests.
    requests: RefCell<Vec<Request>>,
}

impl Scripted {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Scripts a reply with the provided `status` and JSON `body`.
    pub(crate) fn reply_json(&self, status: StatusCode, body: &impl Serialize) {
        self.replies.borrow_mut().push_back(Ok(Response {
            status,
            body: serde_json::to_vec(body).unwrap(),
        }));
    }

    /// Scripts a reply with the provided `status` and an empty body.
    pub(crate) fn reply_empty(&self, status: StatusCode) {
        self.replies.borrow_mut().push_back(Ok(Response {
            status,
            body: Vec::new(),
        }));
    }

    /// Scripts a connection failure.
    pub(crate) fn fail(&self, reason: &str) {
        self.replies
            .borrow_mut()
            .push_back(Err(transport::Error::Connection(reason.to_owned())));
    }

    /// Returns the requests received so far.
    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }
}

impl Handler<Request> for Scripted {
    type Ok = Response;
    type Err = transport::Error;

    async fn execute(&self, req: Request) -> Result<Self::Ok, Self::Err> {
        self.requests.borrow_mut().push(req.clone());
        tokio::task::yield_now().await;
        self.replies.borrow_mut().pop_front().unwrap_or_else(|| {
            panic!("unexpected `{} {}` request", req.method, req.path)
        })
    }
}

/// Signs the provided claims into an [`AccessToken`].
pub(crate) fn encode(claims: &impl Serialize) -> AccessToken {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET),
    )
    .unwrap()
    .into()
}

/// Creates a valid [`AccessToken`] of the user with the provided `id` and
/// [`Role`], expiring in 15 minutes.
pub(crate) fn access_token(id: i64, role: Role) -> AccessToken {
    let now = DateTime::now();
    claims_token(id, role, now, now + Duration::from_secs(15 * 60))
}

/// Creates an [`AccessToken`] of the user with the provided `id` and
/// [`Role`], which has expired already.
pub(crate) fn expired_access_token(id: i64, role: Role) -> AccessToken {
    let now = DateTime::now();
    claims_token(
        id,
        role,
        now - Duration::from_secs(30 * 60),
        now - Duration::from_secs(15 * 60),
    )
}

fn claims_token(
    id: i64,
    role: Role,
    issued_at: DateTime,
    expires_at: DateTime,
) -> AccessToken {
    encode(&serde_json::json!({
        "id": id,
        "email": format!("user{id}@example.com"),
        "username": format!("user{id}"),
        "role": role,
        "iat": issued_at.unix_timestamp(),
        "exp": expires_at.unix_timestamp(),
    }))
}
