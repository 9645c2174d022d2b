pub mod annotate;
pub mod colors;
pub mod progress;
pub mod render;
pub mod serve;
pub mod source;
pub mod task;
pub mod tasks;

use std::future::Future;
use stepnote_client::ProxyClient;
use stepnote_core::prefs::PrefsStore;

/// Settings shared by every client-side command.
pub struct Context {
    pub proxy_url: String,
    pub prefs: PrefsStore,
    pub json: bool,
}

impl Context {
    pub fn client(&self) -> ProxyClient {
        ProxyClient::new(&self.proxy_url)
    }
}

/// Drive one async operation to completion from a synchronous command.
pub fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Runtime::new()?;
    Ok(rt.block_on(fut))
}
