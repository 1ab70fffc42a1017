//! Authenticated portal session
//!
//! The portal is only readable after a form login. A [`Session`] owns the
//! cookie jar that login fills and two HTTP clients over it:
//! - a redirect-following client for login, course listing and downloads
//! - a no-redirect client for page fetches, so resource redirects stay visible

use crate::KrakenError;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{redirect::Policy, Client};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Environment key holding the portal user name
pub const USER_KEY: &str = "STUDENT_USER";

/// Environment key holding the portal password
pub const PASSWORD_KEY: &str = "STUDENT_PASSWORD";

const USER_AGENT: &str = concat!("course-kraken/", env!("CARGO_PKG_VERSION"));

/// Portal login credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reads `STUDENT_USER` and `STUDENT_PASSWORD` from a dotenv file
    ///
    /// Keys missing from the file (or a missing file) fall back to the process
    /// environment. The process environment is not modified.
    ///
    /// # Errors
    ///
    /// `KrakenError::Auth` when the file is malformed or a key is found nowhere.
    pub fn from_env_file(path: &Path) -> Result<Self, KrakenError> {
        let mut values = HashMap::new();

        if path.exists() {
            let entries = dotenvy::from_path_iter(path).map_err(|e| {
                KrakenError::Auth(format!("cannot read {}: {}", path.display(), e))
            })?;
            for entry in entries {
                let (key, value) = entry.map_err(|e| {
                    KrakenError::Auth(format!("malformed {}: {}", path.display(), e))
                })?;
                values.insert(key, value);
            }
            tracing::info!("Loaded credentials file {}", path.display());
        } else {
            tracing::warn!(
                "Credentials file {} not found, using the process environment",
                path.display()
            );
        }

        let lookup = |key: &str| {
            values
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| KrakenError::Auth(format!("{} is not set", key)))
        };

        Ok(Self {
            username: lookup(USER_KEY)?,
            password: lookup(PASSWORD_KEY)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Shared authenticated HTTP state
///
/// Cloning is cheap; all clones share the same cookie jar.
#[derive(Clone)]
pub struct Session {
    client: Client,
    no_redirect: Client,
    jar: Arc<Jar>,
}

impl Session {
    /// Builds both clients over a fresh cookie jar
    pub fn new(timeout: Duration) -> Result<Self, KrakenError> {
        let jar = Arc::new(Jar::default());

        let client = build_client(&jar, timeout, Policy::limited(10))?;
        let no_redirect = build_client(&jar, timeout, Policy::none())?;

        Ok(Self {
            client,
            no_redirect,
            jar,
        })
    }

    /// Redirect-following client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Client that reports redirects instead of following them
    pub fn no_redirect_client(&self) -> &Client {
        &self.no_redirect
    }

    /// Logs in through the portal's login form
    ///
    /// # Flow
    ///
    /// 1. GET the login page
    /// 2. Read `form#login[action]` and the hidden `logintoken`
    /// 3. POST `username`, `password` and `logintoken` to the form action
    ///
    /// # Errors
    ///
    /// `KrakenError::Auth` if the form is missing, a request fails, the portal
    /// answers with a non-success status or shows the login form again.
    pub async fn login(&self, login_url: &Url, credentials: &Credentials) -> Result<(), KrakenError> {
        tracing::info!("Logging in at {}", login_url);

        let response = self
            .client
            .get(login_url.clone())
            .send()
            .await
            .map_err(|e| KrakenError::Auth(format!("login page unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(KrakenError::Auth(format!(
                "login page returned {}",
                response.status()
            )));
        }

        let page_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| KrakenError::Auth(format!("login page unreadable: {}", e)))?;

        let form = login_form(&body)
            .ok_or_else(|| KrakenError::Auth("login form not found".to_string()))?;
        let action = page_url
            .join(&form.action)
            .map_err(|e| KrakenError::Auth(format!("bad login form action: {}", e)))?;

        let params = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("logintoken", form.token.as_str()),
        ];

        let response = self
            .client
            .post(action)
            .form(&params)
            .send()
            .await
            .map_err(|e| KrakenError::Auth(format!("login request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KrakenError::Auth(format!("login returned {}", status)));
        }

        let body = response.text().await.unwrap_or_default();
        if login_form(&body).is_some() {
            return Err(KrakenError::Auth("credentials rejected".to_string()));
        }

        tracing::info!("Login successful as {}", credentials.username);
        Ok(())
    }

    /// Cookies the jar would send to `url`, as name/value pairs
    pub fn cookies_for(&self, url: &Url) -> Vec<(String, String)> {
        let Some(header) = self.jar.cookies(url) else {
            return Vec::new();
        };
        let Ok(header) = header.to_str() else {
            return Vec::new();
        };

        header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((name.to_string(), value.to_string()))
            })
            .collect()
    }

    /// Seeds a cookie into the shared jar
    pub fn add_cookie(&self, cookie: &str, url: &Url) {
        self.jar.add_cookie_str(cookie, url);
    }
}

fn build_client(jar: &Arc<Jar>, timeout: Duration, policy: Policy) -> Result<Client, KrakenError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .cookie_provider(Arc::clone(jar))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(policy)
        .gzip(true)
        .brotli(true)
        .build()?)
}

/// The fields of a login form needed to submit it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub action: String,
    pub token: String,
}

/// Finds `form#login` and its hidden `logintoken` input
pub fn login_form(html: &str) -> Option<LoginForm> {
    let document = Html::parse_document(html);

    let form_sel = Selector::parse("form#login").ok()?;
    let form = document.select(&form_sel).next()?;
    let action = form.value().attr("action")?.to_string();

    let token_sel = Selector::parse("input[name=logintoken]").ok()?;
    let token = document
        .select(&token_sel)
        .next()
        .and_then(|input| input.value().attr("value"))
        .unwrap_or_default()
        .to_string();

    Some(LoginForm { action, token })
}
