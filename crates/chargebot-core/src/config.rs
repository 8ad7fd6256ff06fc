use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration for the bot.
///
/// Constructed once at startup and passed by `Arc` to every component that
/// needs it; there is no global config singleton.
#[derive(Clone, Debug)]
pub struct Config {
    /// Telegram bot API token.
    pub bot_token: String,
    /// Path of the JSON state file backing the subscription repository.
    pub state_file: PathBuf,
    /// Fixed size of the outbound send worker pool.
    pub send_workers: usize,
    /// Server-side long-poll timeout for the inbound update stream.
    pub poll_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("CHARGEBOT_BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "CHARGEBOT_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let state_file = env_str("CHARGEBOT_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/var/lib/chargebot/state.json"));

        let send_workers = env_usize("CHARGEBOT_SEND_WORKERS").unwrap_or(4).max(1);
        let poll_timeout =
            Duration::from_secs(env_u64("CHARGEBOT_POLL_TIMEOUT_SECS").unwrap_or(60));

        Ok(Self {
            bot_token,
            state_file,
            send_workers,
            poll_timeout,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|v| v.trim().parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|v| v.trim().parse().ok())
}

/// Minimal `.env` loader: `KEY=VALUE` lines, `#` comments, no quoting
/// rules beyond trimming a single pair of matching quotes. Existing
/// environment variables win.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_does_not_override_existing_vars() {
        let dir = std::env::temp_dir().join(format!("chargebot-env-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env");
        std::fs::write(&path, "CHARGEBOT_TEST_EXISTING=from_file\n# comment\n").unwrap();

        env::set_var("CHARGEBOT_TEST_EXISTING", "from_env");
        load_dotenv_if_present(&path);
        assert_eq!(env::var("CHARGEBOT_TEST_EXISTING").unwrap(), "from_env");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn dotenv_strips_quotes() {
        let dir = std::env::temp_dir().join(format!("chargebot-env-q-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env");
        std::fs::write(&path, "CHARGEBOT_TEST_QUOTED=\"hello world\"\n").unwrap();

        env::remove_var("CHARGEBOT_TEST_QUOTED");
        load_dotenv_if_present(&path);
        assert_eq!(env::var("CHARGEBOT_TEST_QUOTED").unwrap(), "hello world");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
