//! `reqwest` implementation of the marketplace API.

use std::sync::{Arc, PoisonError, RwLock};

use craftify_core::{CartLineId, Credential, ItemId, UserId};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use super::types::{
    Comment, Item, ItemDraft, LoginRequest, Order, Profile, ProfileUpdate, SignUp, TokenResponse,
    UserPage,
};
use super::{ApiError, MarketplaceApi};
use crate::checkout::CheckoutRequest;
use crate::config::ClientConfig;
use crate::orders::OrderWindow;

/// Longest response body kept in logs.
const LOG_BODY_LIMIT: usize = 500;
/// Longest response body kept in error values shown to users.
const ERROR_BODY_LIMIT: usize = 200;

/// HTTP client for the marketplace REST API.
///
/// Cheaply cloneable. The bearer credential is configured once by the
/// session layer via [`MarketplaceApi::authorize`] and attached to every
/// request until it is dropped.
#[derive(Clone)]
pub struct HttpMarketplace {
    inner: Arc<HttpMarketplaceInner>,
}

struct HttpMarketplaceInner {
    client: reqwest::Client,
    base_url: Url,
    bearer: RwLock<Option<Credential>>,
}

impl HttpMarketplace {
    /// Create a client for the configured API.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpMarketplaceInner {
                client,
                base_url: config.api_url.clone(),
                bearer: RwLock::new(None),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Start a request, attaching the bearer credential when one is set.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        let bearer = self
            .inner
            .bearer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match bearer {
            Some(credential) => builder.bearer_auth(credential.expose()),
            None => builder,
        }
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!(status = %status, "Marketplace API rejected credential");
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Marketplace API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        Ok(body)
    }

    /// Send a request and parse the JSON response.
    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.send(builder).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Failed to parse marketplace API response"
            );
            ApiError::Parse(e)
        })
    }
}

impl MarketplaceApi for HttpMarketplace {
    fn authorize(&self, credential: Option<Credential>) {
        *self
            .inner
            .bearer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credential;
    }

    #[instrument(skip(self, password), fields(username = %username))]
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Credential, ApiError> {
        let url = self.endpoint("login/")?;
        let builder = self
            .request(Method::POST, url)
            .json(&LoginRequest { username, password });

        let token: TokenResponse = self.send_json(builder).await?;
        Ok(Credential::new(token.access))
    }

    #[instrument(skip(self, form), fields(username = %form.username))]
    async fn sign_up(&self, form: &SignUp) -> Result<Credential, ApiError> {
        let url = self.endpoint("signup/")?;
        let builder = self.request(Method::POST, url).json(form);

        let token: TokenResponse = self.send_json(builder).await?;
        Ok(Credential::new(token.access))
    }

    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<serde_json::Value, ApiError> {
        let url = self.endpoint("cart/")?;
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn add_to_cart(
        &self,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<serde_json::Value, ApiError> {
        let url = self.endpoint(&format!("cart/add/{item_id}/"))?;
        let builder = self
            .request(Method::POST, url)
            .json(&json!({ "quantity": quantity }));
        self.send_json(builder).await
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    async fn remove_cart_line(&self, line_id: CartLineId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("cart/items/{line_id}/"))?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        let url = self.endpoint("cart/")?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_items(&self) -> Result<Vec<Item>, ApiError> {
        let url = self.endpoint("items/")?;
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn get_item(&self, item_id: ItemId) -> Result<Item, ApiError> {
        let url = self.endpoint(&format!("items/{item_id}/"))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, ApiError> {
        let url = self.endpoint("items/")?;
        self.send_json(self.request(Method::POST, url).json(draft))
            .await
    }

    #[instrument(skip(self, draft), fields(item_id = %item_id))]
    async fn update_item(&self, item_id: ItemId, draft: &ItemDraft) -> Result<Item, ApiError> {
        let url = self.endpoint(&format!("items/{item_id}/"))?;
        self.send_json(self.request(Method::PUT, url).json(draft))
            .await
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn delete_item(&self, item_id: ItemId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("items/{item_id}/"))?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    #[instrument(skip(self, request))]
    async fn checkout(&self, request: &CheckoutRequest) -> Result<Order, ApiError> {
        let url = self.endpoint("checkout/")?;
        let builder = self.request(Method::POST, url).json(request);
        self.send_json(builder).await
    }

    #[instrument(skip(self), fields(days = window.days()))]
    async fn list_orders(&self, window: OrderWindow) -> Result<Vec<Order>, ApiError> {
        let mut url = self.endpoint("orders/")?;
        url.query_pairs_mut()
            .append_pair("days", &window.days().to_string());
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_profile(&self, user_id: &UserId) -> Result<Profile, ApiError> {
        let url = self.endpoint(&format!("user/{user_id}/"))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self, update), fields(user_id = %user_id))]
    async fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, ApiError> {
        let url = self.endpoint(&format!("user/{user_id}/"))?;
        let builder = self.request(Method::PUT, url).json(update);
        self.send_json(builder).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_comments(&self, user_id: &UserId) -> Result<Vec<Comment>, ApiError> {
        let url = self.endpoint(&format!("user/{user_id}/comments/"))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self, text), fields(user_id = %user_id))]
    async fn post_comment(&self, user_id: &UserId, text: &str) -> Result<Comment, ApiError> {
        let url = self.endpoint(&format!("user/{user_id}/comments/"))?;
        let builder = self
            .request(Method::POST, url)
            .json(&json!({ "comment": text }));
        self.send_json(builder).await
    }

    #[instrument(skip(self))]
    async fn list_users(&self, page: u32) -> Result<UserPage, ApiError> {
        let mut url = self.endpoint("users/")?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn delete_user(&self, user_id: &UserId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("users/{user_id}/"))?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> HttpMarketplace {
        let config = ClientConfig::for_api_url("http://127.0.0.1:8000/api").unwrap();
        HttpMarketplace::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_resolves_under_api_prefix() {
        let api = client();
        assert_eq!(
            api.endpoint("cart/add/7/").unwrap().as_str(),
            "http://127.0.0.1:8000/api/cart/add/7/"
        );
        assert_eq!(
            api.endpoint("cart/items/3/").unwrap().path(),
            "/api/cart/items/3/"
        );
    }

    fn auth_header(api: &HttpMarketplace) -> Option<String> {
        let request = api
            .request(Method::GET, api.endpoint("cart/").unwrap())
            .build()
            .unwrap();
        request
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .map(|value| value.to_str().unwrap().to_string())
    }

    #[test]
    fn test_authorize_sets_and_clears_bearer() {
        let api = client();
        assert!(auth_header(&api).is_none());

        api.authorize(Some(Credential::new("h.p.s")));
        assert_eq!(auth_header(&api).as_deref(), Some("Bearer h.p.s"));

        api.authorize(None);
        assert!(auth_header(&api).is_none());
    }

    #[test]
    fn test_clones_share_the_bearer() {
        let api = client();
        let clone = api.clone();
        api.authorize(Some(Credential::new("h.p.s")));
        assert!(auth_header(&clone).is_some());
    }

    #[test]
    fn test_nested_routes_resolve() {
        let api = client();
        assert_eq!(
            api.endpoint("user/5/comments/").unwrap().path(),
            "/api/user/5/comments/"
        );
        assert_eq!(api.endpoint("users/5/").unwrap().path(), "/api/users/5/");
    }
}
