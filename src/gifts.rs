//! Gift list API client
//!
//! Owner operations go through `TokenManager::fetch_with_auth`; the public
//! list is read without credentials.

use crate::auth::{error_message, RequestOptions, TokenManager};
use crate::config::{paths, PreviewConfig};
use crate::error::ApiError;
use crate::preview::PreviewClient;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gift {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub link: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewGift {
    pub name: String,
    pub link: String,
    pub image: String,
    pub user_id: String,
}

/// Gift fields as entered; blank name or image may come from a link preview
#[derive(Debug, Clone, Default)]
pub struct GiftDraft {
    pub name: Option<String>,
    pub link: String,
    pub image: Option<String>,
}

impl GiftDraft {
    /// Fill a blank name from the link's title and a blank image from its
    /// preview image. A failed preview leaves both as they are; the
    /// placeholder title is never used as a name.
    pub async fn complete(self, previews: &PreviewClient, user_id: &str) -> NewGift {
        let mut name = self.name.filter(|n| !n.trim().is_empty());
        let mut image = self.image.filter(|i| !i.trim().is_empty());

        if (name.is_none() || image.is_none()) && !self.link.trim().is_empty() {
            match previews.extract_preview(&self.link).await {
                Ok(preview) => {
                    if name.is_none() {
                        name = preview.title.suggestion().map(String::from);
                    }
                    if image.is_none() && !preview.image.is_empty() {
                        image = Some(preview.image);
                    }
                }
                Err(e) => tracing::debug!(link = %self.link, error = %e, "no preview for gift link"),
            }
        }

        NewGift {
            name: name.unwrap_or_default(),
            link: self.link,
            image: image.unwrap_or_default(),
            user_id: user_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GiftUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl GiftUpdate {
    pub fn is_empty(&self) -> bool {
        [&self.name, &self.link, &self.image]
            .iter()
            .all(|f| f.as_deref().map_or(true, str::is_empty))
    }
}

#[derive(Serialize)]
struct StampedUpdate<'a> {
    #[serde(flatten)]
    update: &'a GiftUpdate,
    updated_at: DateTime<Utc>,
}

/// A user's shared, read-only list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicList {
    pub gifts: Vec<Gift>,
    #[serde(rename = "userName")]
    pub user_name: String,
}

#[derive(Clone)]
pub struct GiftsClient {
    tokens: TokenManager,
}

impl GiftsClient {
    pub fn new(tokens: TokenManager) -> Self {
        Self { tokens }
    }

    /// Id of the signed-in user, from the stored identity record
    pub fn current_user_id(&self) -> Result<Option<String>, ApiError> {
        let user = self.tokens.user().map_err(crate::error::AuthError::from)?;
        Ok(user.and_then(|u| u.get("id").and_then(|id| id.as_str()).map(String::from)))
    }

    /// Gifts owned by `user_id`, newest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<Gift>, ApiError> {
        let mut url = self.tokens.config().endpoint(paths::GIFTS)?;
        url.query_pairs_mut().append_pair("user_id", user_id);

        let response = self
            .tokens
            .fetch_with_auth(url.as_str(), RequestOptions::new(Method::GET))
            .await?;
        decode(response).await
    }

    pub async fn create(&self, gift: &NewGift) -> Result<Gift, ApiError> {
        for (field, value) in [
            ("name", &gift.name),
            ("link", &gift.link),
            ("image", &gift.image),
            ("user_id", &gift.user_id),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::InvalidInput(format!("{} is required", field)));
            }
        }

        let options = RequestOptions::new(Method::POST)
            .json(gift)
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        let response = self.tokens.fetch_with_auth(paths::GIFTS, options).await?;
        decode(response).await
    }

    /// Apply the set fields of `update`; stamps `updated_at` with the current time
    pub async fn update(&self, id: &str, update: &GiftUpdate) -> Result<Gift, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidInput("nothing to update".to_string()));
        }

        let body = StampedUpdate {
            update,
            updated_at: Utc::now(),
        };
        let options = RequestOptions::new(Method::PUT)
            .json(&body)
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        let url = self.gift_url(id)?;
        let response = self.tokens.fetch_with_auth(url.as_str(), options).await?;
        decode(response).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let url = self.gift_url(id)?;
        let response = self
            .tokens
            .fetch_with_auth(url.as_str(), RequestOptions::new(Method::DELETE))
            .await?;
        check(response).await.map(|_| ())
    }

    /// The public list of `user_id`; needs no credentials
    pub async fn public_list(&self, user_id: &str) -> Result<PublicList, ApiError> {
        let url = self.endpoint_with(paths::PUBLIC_GIFTS, user_id)?;
        let response = self.tokens.client().get(url).send().await?;
        decode(response).await
    }

    fn gift_url(&self, id: &str) -> Result<Url, ApiError> {
        self.endpoint_with(paths::GIFTS, id)
    }

    /// `path` with `segment` appended as one percent-encoded path segment
    fn endpoint_with(&self, path: &str, segment: &str) -> Result<Url, ApiError> {
        let url = self.tokens.config().endpoint(path)?;
        with_segment(url, segment)
    }
}

fn with_segment(mut url: Url, segment: &str) -> Result<Url, ApiError> {
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidInput("endpoint URL cannot take a path".to_string()))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(ApiError::Status {
        status,
        message: error_message(response).await,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    Ok(check(response).await?.json().await?)
}

#[derive(Args)]
pub struct GiftsArgs {
    #[command(subcommand)]
    pub command: GiftsCommand,
}

#[derive(Subcommand)]
pub enum GiftsCommand {
    /// List your gifts
    List,
    /// Add a gift; a missing name or image is taken from the link's preview
    Add {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        link: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// Change a gift's name, link or image
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Delete a gift
    Remove { id: String },
    /// Show a user's public list (no sign-in needed)
    Public { user_id: String },
}

/// Run the gifts command
pub async fn run_gifts(
    args: GiftsArgs,
    tokens: TokenManager,
    previews: &PreviewConfig,
) -> Result<()> {
    let client = GiftsClient::new(tokens);

    let output = match args.command {
        GiftsCommand::List => {
            let user_id = signed_in_user(&client)?;
            let gifts = client.list(&user_id).await?;
            eprintln!("{} gift{}", gifts.len(), if gifts.len() == 1 { "" } else { "s" });
            serde_json::to_string(&gifts)?
        }
        GiftsCommand::Add { name, link, image } => {
            let user_id = signed_in_user(&client)?;
            let draft = GiftDraft { name, link, image };
            let new_gift = draft
                .complete(&PreviewClient::new(previews)?, &user_id)
                .await;
            let gift = client.create(&new_gift).await?;
            serde_json::to_string(&gift)?
        }
        GiftsCommand::Update {
            id,
            name,
            link,
            image,
        } => {
            let gift = client
                .update(&id, &GiftUpdate { name, link, image })
                .await?;
            serde_json::to_string(&gift)?
        }
        GiftsCommand::Remove { id } => {
            client.delete(&id).await?;
            serde_json::json!({ "deleted": id }).to_string()
        }
        GiftsCommand::Public { user_id } => {
            let list = client.public_list(&user_id).await?;
            serde_json::to_string(&list)?
        }
    };

    println!("{}", output);
    Ok(())
}

fn signed_in_user(client: &GiftsClient) -> Result<String> {
    client
        .current_user_id()?
        .context("Not signed in. Run `giftlist login` first.")
}
