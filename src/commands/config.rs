use anyhow::Result;
use log::debug;
use reqwest::Client;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::OAuthRefresher;
use crate::fetch::Fetcher;
use crate::http::{ErrorClassifier, RequestExecutor};
use crate::retry::RetryPolicy;
use crate::runtime::Runtime;
use crate::store::TokenStore;

/// Environment variable holding the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "TOKFETCH_CLIENT_SECRET";

const USER_AGENT: &str = "tokfetch-cli";
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// User-supplied options, typically from the command line.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub token_file: Option<PathBuf>,
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub retry_statuses: Vec<u16>,
}

impl Settings {
    /// Default policy with any overrides applied.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        let mut policy = RetryPolicy::default();

        if let Some(max_attempts) = self.max_attempts {
            if max_attempts == 0 {
                anyhow::bail!("--max-attempts must be at least 1");
            }
            policy.max_attempts = max_attempts;
        }
        if let Some(ms) = self.base_delay_ms {
            policy.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.max_delay_ms {
            policy.max_delay = Duration::from_millis(ms);
        }
        if !self.retry_statuses.is_empty() {
            policy.retryable = self.retry_statuses.iter().copied().collect::<HashSet<_>>();
        }

        Ok(policy)
    }
}

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub client: Client,
    pub token_file: PathBuf,
    pub settings: Settings,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, settings: Settings) -> Result<Self> {
        let token_file = match &settings.token_file {
            Some(path) => path.clone(),
            None => TokenStore::default_path(&runtime)?,
        };
        debug!("Using token file {:?}", token_file);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            runtime,
            client,
            token_file,
            settings,
        })
    }

    pub fn store(&self) -> TokenStore<'_, R> {
        TokenStore::new(&self.runtime, self.token_file.clone())
    }

    /// Refresher for the configured endpoint. A missing `--token-url` only
    /// fails once a refresh is actually needed.
    pub fn refresher(&self) -> OAuthRefresher {
        let client_id = self.settings.client_id.clone().unwrap_or_default();
        let client_secret = self.runtime.env_var(CLIENT_SECRET_ENV).ok();

        OAuthRefresher::new(
            self.client.clone(),
            self.settings.token_url.clone(),
            client_id,
            client_secret,
        )
    }

    pub fn fetcher(&self) -> Result<Fetcher<OAuthRefresher>> {
        let executor = RequestExecutor::new(
            self.client.clone(),
            ErrorClassifier::default(),
            self.refresher(),
        );
        Ok(Fetcher::new(executor, self.settings.retry_policy()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    fn runtime_with_config_dir() -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_config_dir()
            .returning(|| Some(PathBuf::from("/home/user/.config")));
        runtime
    }

    #[test]
    fn test_config_default_token_file() {
        let config = Config::new(runtime_with_config_dir(), Settings::default()).unwrap();
        assert_eq!(
            config.token_file,
            PathBuf::from("/home/user/.config/tokfetch/token.json")
        );
    }

    #[test]
    fn test_config_explicit_token_file() {
        let settings = Settings {
            token_file: Some(PathBuf::from("/tmp/t.json")),
            ..Settings::default()
        };
        let config = Config::new(MockRuntime::new(), settings).unwrap();
        assert_eq!(config.token_file, PathBuf::from("/tmp/t.json"));
        assert_eq!(config.store().path(), std::path::Path::new("/tmp/t.json"));
    }

    #[test]
    fn test_refresher_without_token_url() {
        let mut runtime = runtime_with_config_dir();
        runtime
            .expect_env_var()
            .returning(|_| Err(std::env::VarError::NotPresent));

        let config = Config::new(runtime, Settings::default()).unwrap();
        assert_eq!(config.refresher().token_url(), None);
        assert!(config.fetcher().is_ok());
    }

    #[test]
    fn test_refresher_reads_client_secret_from_env() {
        let mut runtime = runtime_with_config_dir();
        runtime
            .expect_env_var()
            .with(eq(CLIENT_SECRET_ENV))
            .times(1)
            .returning(|_| Ok("s3cret".to_string()));

        let settings = Settings {
            token_url: Some("https://idp.example/token".to_string()),
            ..Settings::default()
        };
        let config = Config::new(runtime, settings).unwrap();
        let refresher = config.refresher();
        assert_eq!(refresher.token_url(), Some("https://idp.example/token"));
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = Settings::default().retry_policy().unwrap();
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn test_retry_policy_overrides() {
        let settings = Settings {
            max_attempts: Some(3),
            base_delay_ms: Some(250),
            max_delay_ms: Some(4_000),
            retry_statuses: vec![429, 503],
            ..Settings::default()
        };
        let policy = settings.retry_policy().unwrap();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_secs(4));
        assert_eq!(policy.retryable, HashSet::from([429, 503]));
    }

    #[test]
    fn test_retry_policy_rejects_zero_attempts() {
        let settings = Settings {
            max_attempts: Some(0),
            ..Settings::default()
        };
        assert!(settings.retry_policy().is_err());
    }
}
