//! Process configuration.
//!
//! Loaded once at startup and passed down explicitly; nothing below the
//! composition root reads the environment.

use thiserror::Error;

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error("environment variable {0} holds an invalid value: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Env {
    /// Redis document-store URL. Absent means "run on the in-memory store"
    /// (single-process, volatile — fine for local work and tests).
    pub redis_url: Option<String>,
    pub api_port: u16,
    /// Seed the built-in demo season when the match collection is empty.
    pub seed_demo_season: bool,
}

impl Env {
    pub fn load() -> EnvResult<Self> {
        // a missing .env file is fine; real deployments set vars directly
        dotenvy::dotenv().ok();

        let redis_url = optional("REDIS_URL");

        let api_port = match optional("API_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| EnvErr::Invalid("API_PORT", raw))?,
            None => 8080,
        };

        let seed_demo_season = match optional("SEED_DEMO_SEASON") {
            Some(raw) => matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
            None => true,
        };

        Ok(Self {
            redis_url,
            api_port,
            seed_demo_season,
        })
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_read_as_absent() {
        // SAFETY: test-local env mutation; no other test reads this name
        unsafe {
            std::env::set_var("FLEXLEAGUE_TEST_BLANK", "   ");
        }
        assert_eq!(optional("FLEXLEAGUE_TEST_BLANK"), None);
        assert_eq!(optional("FLEXLEAGUE_TEST_MISSING"), None);
    }
}
