//! Rust client for the IBM Watson Developer Cloud services.
//!
//! Each service is a façade over a shared request/authentication/mapping core:
//!
//! ```no_run
//! use std::sync::Arc;
//! use watson_sdk::core::auth::BasicAuthentication;
//! use watson_sdk::services::language_translator::{LanguageTranslator, TranslateWith};
//!
//! # async fn run() -> watson_sdk::Result<()> {
//! let translator = LanguageTranslator::new(Arc::new(BasicAuthentication::new("user", "pass")));
//! let response = translator
//!     .translate(&["Hello".to_string()], &TranslateWith::languages("en", "es"))
//!     .await?;
//! println!("{}", response.translations[0].translation);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod domain;
pub mod services;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::CredentialsConfig;

pub use core::auth::{
    ApiKeyAuthentication, BasicAuthentication, IamAccessToken, IamAuthentication, NoAuthentication,
    TokenExchangeAuthentication,
};
pub use core::{MediaType, RestRequest, WatsonGateway, WatsonService};
pub use domain::ports::AuthenticationStrategy;
pub use utils::error::{ErrorCategory, Result, WatsonError};
