pub mod client;
pub mod insights;
pub mod level;
pub mod sanitize;
pub mod sync;
pub mod token;

pub use client::{AdsPlatform, GraphRequest, HttpAdsPlatform, PlatformError};
pub use level::{MirrorPath, SyncLevel};
pub use sync::{AdsSyncService, SyncError, SyncOutcome, SyncRequest, SyncSettings};
pub use token::{AccessTokenState, RefreshOutcome, TokenRefresher};
