//! giftlist: wish-list client tooling
//!
//! - Token manager: single-flight refresh and authenticated requests
//!   retried once after a 401
//! - Link previews: Open Graph extraction from arbitrary pages
//! - Gift API client and a preview HTTP endpoint

pub mod account;
pub mod auth;
pub mod config;
pub mod error;
pub mod gifts;
pub mod meta;
pub mod preview;
pub mod serve;
pub mod store;

pub use auth::{LogNavigator, Navigator, RequestOptions, TokenManager};
pub use config::{ClientConfig, PreviewConfig};
pub use error::{ApiError, AuthError, PreviewError, RefreshCause, StoreError};
pub use gifts::{Gift, GiftDraft, GiftUpdate, GiftsClient, NewGift, PublicList};
pub use preview::{parse_document, PreviewClient, PreviewResult, PreviewTitle};
pub use store::{CredentialKey, FileStore, MemoryStore, TokenStore};
