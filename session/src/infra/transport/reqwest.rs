//! [`Transport`] implementation backed by [`reqwest`].
//!
//! [`Transport`]: super::Transport

use std::time::Duration;

use ::reqwest::Url;
use common::Handler;
use tracerr::Traced;
use tracing as log;

use super::{Error, Request, Response};

/// [`Reqwest`] transport configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL every [`Request::path`] is resolved against.
    pub base_url: String,

    /// Timeout of a single [`Request`].
    pub timeout: Duration,
}

/// HTTP [`Transport`] backed by a [`reqwest::Client`].
///
/// [`Transport`]: super::Transport
#[derive(Clone, Debug)]
pub struct Reqwest {
    /// Underlying HTTP client.
    client: ::reqwest::Client,

    /// Base URL, always ending with a slash.
    base_url: Url,
}

impl Reqwest {
    /// Creates a new [`Reqwest`] transport out of the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the [`Config::base_url`] is not a valid URL, or the underlying
    /// [`reqwest::Client`] cannot be built.
    pub fn new(config: &Config) -> Result<Self, Traced<Error>> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| {
            tracerr::new!(Error::InvalidUrl(format!(
                "`{}`: {e}",
                config.base_url,
            )))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = ::reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        Ok(Self { client, base_url })
    }

    /// Resolves the provided `path` against the base URL.
    ///
    /// Paths leading outside of the API origin are rejected, so credentials
    /// never leave it.
    fn url(&self, path: &str) -> Result<Url, Error> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("`{path}`: {e}")))?;
        if url.origin() != self.base_url.origin() {
            return Err(Error::ForeignOrigin(url.into()));
        }
        Ok(url)
    }
}

impl Handler<Request> for Reqwest {
    type Ok = Response;
    type Err = Error;

    async fn execute(&self, req: Request) -> Result<Self::Ok, Self::Err> {
        let Request {
            method,
            path,
            headers,
            body,
        } = req;

        let url = self.url(&path)?;
        log::trace!("sending `{method} {url}` request");

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?.to_vec();

        Ok(Response { status, body })
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::{Config, Error, Reqwest};

    fn transport(base_url: &str) -> Reqwest {
        Reqwest::new(&Config {
            base_url: base_url.to_owned(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn joins_paths_with_base_url() {
        for base_url in
            ["http://localhost:3000/api", "http://localhost:3000/api/"]
        {
            let api = transport(base_url);

            assert_eq!(
                api.url("/users/refresh").unwrap().as_str(),
                "http://localhost:3000/api/users/refresh",
            );
            assert_eq!(
                api.url("users/7").unwrap().as_str(),
                "http://localhost:3000/api/users/7",
            );
        }
    }

    #[test]
    fn rejects_foreign_origins() {
        let api = transport("http://localhost:3000/api");

        for path in [
            "https://cdn.example.com/a.png",
            "http://localhost:4000/api/users",
        ] {
            assert!(
                matches!(api.url(path), Err(Error::ForeignOrigin(_))),
                "{path}",
            );
        }
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = Reqwest::new(&Config {
            base_url: "localhost".to_owned(),
            timeout: Duration::from_secs(1),
        })
        .unwrap_err()
        .into_inner();

        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
