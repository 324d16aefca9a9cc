use std::net::SocketAddr;

use serde::Deserialize;

/// Default listen address for the push server.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5001";

/// Default push message time-to-live (24 hours).
const DEFAULT_PUSH_TTL_SECONDS: u32 = 86_400;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// VAPID private key: PEM (PKCS#8 or SEC1) or a base64url raw P-256 scalar
    pub vapid_private_key: String,

    /// VAPID public key as handed to browsers; cross-checked against the private key
    pub vapid_public_key: Option<String>,

    /// VAPID `sub` claim (`mailto:` or `https:` contact URI)
    pub vapid_subject: String,

    /// Socket address the HTTP server binds to
    pub bind_addr: SocketAddr,

    /// TTL in seconds the push service should hold undelivered messages
    pub push_ttl_seconds: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vapid_private_key = lookup("VAPID_PRIVATE_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("VAPID_PRIVATE_KEY environment variable is required"))?;

        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let vapid_subject = non_blank("VAPID_SUBJECT")
            .or_else(|| non_blank("VAPID_EMAIL"))
            .ok_or_else(|| {
                anyhow::anyhow!("VAPID_SUBJECT (or VAPID_EMAIL) environment variable is required")
            })?;

        Ok(Self {
            // .env files commonly carry PEM keys on one line with literal "\n"
            vapid_private_key: vapid_private_key.trim().replace("\\n", "\n"),
            vapid_public_key: lookup("VAPID_PUBLIC_KEY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            vapid_subject: normalize_subject(vapid_subject.trim()),
            bind_addr: lookup("BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("BIND_ADDR must be a valid socket address"))?,
            push_ttl_seconds: lookup("PUSH_TTL_SECONDS")
                .unwrap_or_else(|| DEFAULT_PUSH_TTL_SECONDS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PUSH_TTL_SECONDS must be a valid u32"))?,
        })
    }
}

/// Push services require the subject to be a URI; bare emails get `mailto:`.
fn normalize_subject(subject: &str) -> String {
    if subject.starts_with("mailto:") || subject.starts_with("https://") {
        subject.to_string()
    } else {
        format!("mailto:{}", subject)
    }
}
