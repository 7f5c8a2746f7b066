// ABOUTME: Command-line and environment configuration for the media service
// ABOUTME: Splits server settings from the upload and permalink policy used by the registry

use clap::Parser;
use std::path::PathBuf;

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
const DEFAULT_ACCEPTED_MIME_TYPES: &[&str] = &["image/", "video/", "audio/", "application/pdf"];

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Media library service with reference tracking", long_about = None)]
pub struct Args {
    /// Interface to bind
    #[arg(long, env = "MEDIATHEQUE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "MEDIATHEQUE_PORT", default_value_t = 3000)]
    pub port: u16,

    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:mediatheque.db?mode=rwc")]
    pub database_url: String,

    /// Directory where uploaded binaries are written and served from under /uploads
    #[arg(long, env = "UPLOADS_DIR", default_value = "public/uploads")]
    pub uploads_dir: PathBuf,

    /// CDN origin that permalinks redirect to (e.g. https://cdn.example.org)
    #[arg(long, env = "CDN_URL")]
    pub public_base_url: Option<String>,

    /// Largest accepted upload in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    /// Accepted MIME types; entries ending in '/' match a whole family
    #[arg(long, env = "ACCEPTED_MIME_TYPES", value_delimiter = ',')]
    pub accepted_mime_types: Vec<String>,
}

impl Args {
    pub fn registry_config(&self) -> RegistryConfig {
        let mut config = RegistryConfig {
            max_upload_bytes: self.max_upload_bytes,
            public_base_url: self
                .public_base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            ..RegistryConfig::default()
        };
        if !self.accepted_mime_types.is_empty() {
            config.accepted_mime_types = self
                .accepted_mime_types
                .iter()
                .map(|m| m.trim().to_ascii_lowercase())
                .filter(|m| !m.is_empty())
                .collect();
        }
        config
    }
}

/// Upload and permalink policy for [`crate::registry::MediaRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub max_upload_bytes: u64,
    pub accepted_mime_types: Vec<String>,
    pub public_base_url: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_mime_types: DEFAULT_ACCEPTED_MIME_TYPES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            public_base_url: None,
        }
    }
}

impl RegistryConfig {
    pub fn accepts(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.to_ascii_lowercase();
        self.accepted_mime_types.iter().any(|accepted| {
            if accepted.ends_with('/') {
                mime_type.starts_with(accepted.as_str())
            } else {
                mime_type == *accepted
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_families_and_exact_types() {
        let config = RegistryConfig::default();
        assert!(config.accepts("image/jpeg"));
        assert!(config.accepts("VIDEO/mp4"));
        assert!(config.accepts("application/pdf"));
        assert!(!config.accepts("application/zip"));
        assert!(!config.accepts("text/html"));
    }

    #[test]
    fn test_args_override_mime_list_and_trim_cdn() {
        let args = Args::parse_from([
            "mediatheque",
            "--accepted-mime-types",
            "image/png, application/pdf",
            "--public-base-url",
            "https://cdn.example.org/",
        ]);
        let config = args.registry_config();
        assert!(config.accepts("image/png"));
        assert!(!config.accepts("image/jpeg"));
        assert_eq!(config.public_base_url.as_deref(), Some("https://cdn.example.org"));
    }
}
