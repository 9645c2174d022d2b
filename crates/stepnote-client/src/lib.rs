pub mod content;
pub mod error;
pub mod proxy;
pub mod session;

pub use content::ContentFetcher;
pub use error::{ClientError, Result};
pub use proxy::{ProxyClient, DEFAULT_PROXY_URL};
pub use session::{mount_forms, section_progress, ReviewSession, SectionProgress};
