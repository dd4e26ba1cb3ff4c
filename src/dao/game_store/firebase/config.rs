use super::error::{RtdbDaoError, RtdbResult};

/// Runtime configuration describing how to reach the realtime database.
#[derive(Debug, Clone)]
pub struct RtdbConfig {
    /// Root URL of the database, e.g. `https://my-quiz.europe-west1.firebasedatabase.app`.
    pub base_url: String,
    /// Database secret or ID token appended as the `auth` query parameter.
    pub auth: Option<String>,
}

impl RtdbConfig {
    /// Construct a configuration from an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: None,
        }
    }

    /// Attach the credential sent with every request.
    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> RtdbResult<Self> {
        let base_url = std::env::var("RTDB_BASE_URL").map_err(|_| RtdbDaoError::MissingEnvVar {
            var: "RTDB_BASE_URL",
        })?;

        let mut config = Self::new(base_url);
        if let Some(auth) = std::env::var("RTDB_AUTH").ok().filter(|v| !v.is_empty()) {
            config = config.with_auth(auth);
        }

        Ok(config)
    }
}
