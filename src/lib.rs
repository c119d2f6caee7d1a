//! oidc-session: session and token lifecycle for OpenID Connect clients.
//!
//! The crate sits between an application and an external OIDC client library.
//! It keeps exactly one current session, renews it silently shortly before the
//! id token expires, resolves sign-in callbacks on entry, and notifies
//! subscribers whenever the session changes.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use oidc_session::client::UserManager;
//! use oidc_session::config::load_config;
//! use oidc_session::facade::AuthFacadeBuilder;
//!
//! # async fn example(client: Arc<dyn UserManager>) {
//! let config = load_config(None).unwrap();
//! let auth = AuthFacadeBuilder::from_config(&config)
//!     .connect(move |_settings| Ok(client))
//!     .unwrap();
//! auth.subscribe(|session| println!("signed in: {}", session.is_some()));
//! if auth.entry_point().await.unwrap().is_none() {
//!     auth.signin().await.unwrap();
//! }
//! let id_token = auth.token().await.unwrap();
//! # let _ = id_token;
//! # }
//! ```

pub mod build_info;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod facade;
pub mod frame;
pub mod navigation;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod store;
#[cfg(test)]
pub mod testsupport;
