//! Test doubles and fixtures.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use common::Handler;
use http::StatusCode;
use session::{
    domain::{AccessToken, Role, TokenPair},
    infra::{storage::Memory, transport, Request, Response},
    Session,
};

use crate::Api;

/// [`Transport`] replying with the pushed JSON responses in their order.
///
/// [`Transport`]: session::Transport
#[derive(Debug, Default)]
pub(crate) struct Replies {
    /// Responses to reply with.
    replies: RefCell<VecDeque<(StatusCode, serde_json::Value)>>,

    /// Received requests.
    requests: RefCell<Vec<Request>>,
}

impl Replies {
    /// Pushes a response with the provided `status` and JSON `body`.
    pub(crate) fn push(&self, status: StatusCode, body: serde_json::Value) {
        self.replies.borrow_mut().push_back((status, body));
    }

    /// Returns the requests received so far.
    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }
}

impl Handler<Request> for Replies {
    type Ok = Response;
    type Err = transport::Error;

    async fn execute(&self, req: Request) -> Result<Self::Ok, Self::Err> {
        self.requests.borrow_mut().push(req.clone());
        let (status, body) =
            self.replies.borrow_mut().pop_front().unwrap_or_else(|| {
                panic!("unexpected `{} {}` request", req.method, req.path)
            });
        Ok(Response {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        })
    }
}

/// Creates a signed [`AccessToken`] of the user with the provided `id` and
/// [`Role`].
pub(crate) fn token(id: i64, role: Role) -> AccessToken {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &serde_json::json!({
            "id": id,
            "email": format!("user{id}@example.com"),
            "username": format!("user{id}"),
            "role": role,
        }),
        &jsonwebtoken::EncodingKey::from_secret(b"secret"),
    )
    .unwrap()
    .into()
}

/// Creates an [`Api`] without any session.
pub(crate) fn signed_out(replies: &Rc<Replies>) -> Api<Memory, Rc<Replies>> {
    Api::new(Session::new(Memory::new(), Rc::clone(replies)))
}

/// Creates an [`Api`] signed in as the user with the provided `id` and
/// [`Role`].
pub(crate) fn signed_in(
    replies: &Rc<Replies>,
    id: i64,
    role: Role,
) -> Api<Memory, Rc<Replies>> {
    let api = signed_out(replies);
    api.session()
        .projector()
        .login(TokenPair::new(token(id, role), "refresh"));
    api
}
