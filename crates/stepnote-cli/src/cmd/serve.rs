use anyhow::Result;
use clap::Args;
use stepnote_server::config::{ProxyConfig, DEFAULT_API_URL, DEFAULT_BASE_ID, DEFAULT_TABLE_NAME};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (0 = OS-assigned)
    #[arg(long, default_value = "3141")]
    pub port: u16,

    /// Personal access token for the table service
    #[arg(long, env = "AIRTABLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "AIRTABLE_BASE_ID", default_value = DEFAULT_BASE_ID)]
    pub base_id: String,

    #[arg(long = "table", env = "AIRTABLE_TABLE_NAME", default_value = DEFAULT_TABLE_NAME)]
    pub table_name: String,

    #[arg(long, env = "AIRTABLE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

impl ServeArgs {
    fn config(self) -> ProxyConfig {
        let config = ProxyConfig {
            base_id: self.base_id,
            table_name: self.table_name,
            ..ProxyConfig::default()
        }
        .with_api_url(self.api_url);
        match self.api_key {
            Some(key) => config.with_api_key(key),
            None => config,
        }
    }
}

pub fn run(args: ServeArgs) -> Result<()> {
    let port = args.port;
    let config = args.config();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        println!("stepnote proxy → http://localhost:{actual_port}/api");

        tokio::select! {
            res = stepnote_server::serve_on(config, listener) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(api_key: Option<&str>) -> ServeArgs {
        ServeArgs {
            port: 0,
            api_key: api_key.map(str::to_string),
            base_id: "appX".into(),
            table_name: "Review Tasks".into(),
            api_url: "http://localhost:9/v0".into(),
        }
    }

    #[test]
    fn flags_flow_into_config() {
        let config = args(Some("pat")).config();
        assert_eq!(config.api_key.as_deref(), Some("pat"));
        assert_eq!(config.base_id, "appX");
        assert_eq!(config.table_name, "Review Tasks");
        assert_eq!(config.api_url, "http://localhost:9/v0");
    }

    #[test]
    fn absent_key_stays_absent() {
        assert!(args(None).config().api_key.is_none());
        assert!(args(Some("")).config().api_key.is_none());
    }
}
