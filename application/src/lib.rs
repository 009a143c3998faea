//! Application provides a command line client of the dish catalog API.

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod config;
pub mod error;
#[cfg(test)]
mod testing;

use common::Handler as _;
use secrecy::SecretString;
use serde::Serialize;
use session::{
    infra::{transport, Request, Response},
    Access, Storage, Transport,
};
use tracerr::Traced;
// Used in binary.
use tokio as _;
use tracing_subscriber as _;

use self::{
    api::{user, Fetch},
    args::Users,
};

pub use self::{
    api::Api,
    args::{Args, Command},
    config::Config,
    error::Error,
};

/// Executes the provided [`Command`] via the provided [`Api`].
///
/// Returns the output of the [`Command`] to print, if any.
///
/// # Errors
///
/// If the [`Command`] fails.
pub async fn run<S, T>(
    api: &Api<S, T>,
    command: Command,
) -> Result<Option<serde_json::Value>, Traced<Error>>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    match command {
        Command::Register {
            email,
            username,
            password,
        } => {
            let created = api
                .execute(user::Register {
                    email,
                    username,
                    password: SecretString::from(password),
                })
                .await
                .map_err(tracerr::wrap!())?;
            output(&created)
        }
        Command::Login { email, password } => {
            let identity = api
                .execute(user::Login {
                    email,
                    password: SecretString::from(password),
                })
                .await
                .map_err(tracerr::wrap!())?;
            output(&identity)
        }
        Command::Logout => {
            api.execute(user::Logout).await.map_err(tracerr::wrap!())?;
            Ok(None)
        }
        Command::Whoami => {
            let identity = api
                .session()
                .projector()
                .authorize(Access::Authenticated)
                .map_err(tracerr::from_and_wrap!(=> Error))?;
            output(&identity)
        }
        Command::Users(Users::List) => {
            let users =
                api.execute(user::List).await.map_err(tracerr::wrap!())?;
            output(&users)
        }
        Command::Users(Users::Get { id }) => {
            let found = api
                .execute(user::Get { id: id.into() })
                .await
                .map_err(tracerr::wrap!())?;
            output(&found)
        }
        Command::Users(Users::Update {
            id,
            email,
            username,
            password,
        }) => {
            let updated = api
                .execute(user::Update {
                    id: id.into(),
                    email,
                    username,
                    password: password.map(SecretString::from),
                })
                .await
                .map_err(tracerr::wrap!())?;
            output(&updated)
        }
        Command::Users(Users::Role { id, role }) => {
            let updated = api
                .execute(user::ChangeRole { id: id.into(), role })
                .await
                .map_err(tracerr::wrap!())?;
            output(&updated)
        }
        Command::Users(Users::Delete { id }) => {
            api.execute(user::Delete { id: id.into() })
                .await
                .map_err(tracerr::wrap!())?;
            Ok(None)
        }
        Command::Get { path } => api
            .execute(Fetch { path })
            .await
            .map(Some)
            .map_err(tracerr::wrap!()),
    }
}

/// Converts the provided `value` into the output to print.
fn output(
    value: &impl Serialize,
) -> Result<Option<serde_json::Value>, Traced<Error>> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(tracerr::from_and_wrap!(=> Error))
}

#[cfg(test)]
mod spec {
    use std::rc::Rc;

    use http::StatusCode;
    use session::{domain::Role, AccessError};

    use crate::{
        args::Users,
        testing::{self, Replies},
        Command, Error,
    };

    use super::run;

    #[tokio::test]
    async fn prints_signed_in_user() {
        let replies = Rc::new(Replies::default());
        let api = testing::signed_in(&replies, 9, Role::User);

        let output = run(&api, Command::Whoami).await.unwrap().unwrap();

        assert_eq!(output["id"], 9);
        assert_eq!(output["username"], "user9");
        assert_eq!(output["role"], "USER");
    }

    #[tokio::test]
    async fn requires_session_for_whoami() {
        let replies = Rc::new(Replies::default());
        let api = testing::signed_out(&replies);

        let err = run(&api, Command::Whoami)
            .await
            .unwrap_err()
            .into_inner();

        assert!(matches!(
            &err,
            Error::Access(AccessError::AuthenticationRequired),
        ));
    }

    #[tokio::test]
    async fn prints_nothing_after_logout() {
        let replies = Rc::new(Replies::default());
        let api = testing::signed_in(&replies, 1, Role::User);

        let output = run(&api, Command::Logout).await.unwrap();

        assert_eq!(output, None);
        assert_eq!(api.session().store().access(), None);
    }

    #[tokio::test]
    async fn prints_fetched_body() {
        let replies = Rc::new(Replies::default());
        let api = testing::signed_in(&replies, 1, Role::User);
        replies.push(StatusCode::OK, serde_json::json!({ "id": 4 }));

        let output = run(
            &api,
            Command::Get {
                path: "/dishes/4".to_owned(),
            },
        )
        .await
        .unwrap();

        assert_eq!(output, Some(serde_json::json!({ "id": 4 })));
    }

    #[tokio::test]
    async fn reports_api_errors() {
        let replies = Rc::new(Replies::default());
        let api = testing::signed_in(&replies, 1, Role::User);
        replies.push(
            StatusCode::NOT_FOUND,
            serde_json::json!({ "message": "User not found" }),
        );

        let err = run(&api, Command::Users(Users::Get { id: 42 }))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "User not found");
    }
}
