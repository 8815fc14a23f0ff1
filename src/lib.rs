#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod export;
pub mod identity;
pub mod mail;
pub mod reporting;
pub mod session;
pub mod web;

// Re-exports for convenient access
pub use config::AppConfig;
pub use error::Error;
pub use export::{DeliveredExport, ExportOrchestrator};
pub use identity::{AuthorizationRequest, IdentityClient, TokenResponse, UserInfo};
pub use mail::MailClient;
pub use reporting::{EmbedTokenBundle, ExportJob, ExportStatus, ReportingClient};
pub use session::{InMemorySessionStore, SessionStore, SessionUser};
pub use web::{router, AppState};
