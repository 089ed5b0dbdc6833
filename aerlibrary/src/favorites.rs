//! Liked-tracks client
//!
//! Thin REST client over the library service. Tracks are keyed by
//! `(title, artist)`; reading works anonymously, every mutation requires a
//! session from the injected [`AuthProvider`].

use crate::auth::AuthProvider;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A liked track as stored by the library service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteTrack {
    pub title: String,
    pub artist: String,
}

/// REST client for the liked-tracks collection.
pub struct FavoritesClient {
    http: reqwest::Client,
    base_url: Url,
    auth: Arc<dyn AuthProvider>,
}

impl FavoritesClient {
    pub fn new(base_url: &str, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    fn endpoint(&self) -> Result<Url> {
        Ok(self.base_url.join("api/favorites")?)
    }

    async fn bearer(&self) -> Option<String> {
        self.auth
            .current_session()
            .await
            .map(|session| session.token)
    }

    async fn require_bearer(&self) -> Result<String> {
        self.bearer().await.ok_or(Error::NoSession)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Lists the liked tracks, authenticated when a session exists.
    pub async fn list(&self) -> Result<Vec<FavoriteTrack>> {
        let mut request = self.http.get(self.endpoint()?);
        if let Some(token) = self.bearer().await {
            request = request.bearer_auth(token);
        }
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Whether `(title, artist)` is currently liked.
    pub async fn contains(&self, title: &str, artist: &str) -> Result<bool> {
        Ok(self
            .list()
            .await?
            .iter()
            .any(|track| track.title == title && track.artist == artist))
    }

    /// Likes a track. Requires a session.
    pub async fn add(&self, title: &str, artist: &str) -> Result<()> {
        let token = self.require_bearer().await?;
        debug!(title, artist, "Adding liked track");
        let response = self
            .http
            .post(self.endpoint()?)
            .bearer_auth(token)
            .json(&FavoriteTrack {
                title: title.to_string(),
                artist: artist.to_string(),
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Unlikes a track. Requires a session.
    pub async fn remove(&self, title: &str, artist: &str) -> Result<()> {
        let token = self.require_bearer().await?;
        debug!(title, artist, "Removing liked track");
        let response = self
            .http
            .delete(self.endpoint()?)
            .bearer_auth(token)
            .json(&FavoriteTrack {
                title: title.to_string(),
                artist: artist.to_string(),
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
