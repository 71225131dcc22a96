//! Configuration handling for the server.

use clap::Parser;

use crate::MAX_UPLOAD_BYTES;

/// Image drive server backed by ImageKit storage and Clerk sign-in.
#[derive(Parser, Debug, Clone)]
#[command(name = "imagedrive")]
#[command(about = "Personal image drive API server using ImageKit storage and Clerk identity")]
pub struct Config {
    /// ImageKit public key
    #[arg(long, env = "IMAGEKIT_PUBLIC_KEY")]
    pub imagekit_public_key: String,

    /// ImageKit private key
    #[arg(long, env = "IMAGEKIT_PRIVATE_KEY", hide_env_values = true)]
    pub imagekit_private_key: String,

    /// ImageKit URL endpoint, handed to clients for direct uploads
    #[arg(long, env = "IMAGEKIT_URL_ENDPOINT")]
    pub imagekit_url_endpoint: String,

    /// Root folder on ImageKit for all uploads
    #[arg(long, env = "IMAGEKIT_FOLDER", default_value = "/imagedrive")]
    pub imagekit_folder: String,

    /// Clerk secret key
    #[arg(long, env = "CLERK_SECRET_KEY", hide_env_values = true)]
    pub clerk_secret_key: String,

    /// Let the server check passwords and open Clerk sessions itself
    /// (development instances only)
    #[arg(long, env = "CLERK_PASSWORD_SIGN_IN", default_value = "false")]
    pub clerk_password_sign_in: bool,

    /// Database URL (sqlite: or postgres:)
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:imagedrive.db?mode=rwc")]
    pub database_url: String,

    /// Server listen address (host or IP)
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1")]
    pub listen_addr: String,

    /// Server listen port
    #[arg(long, env = "LISTEN_PORT", default_value_t = 3000)]
    pub listen_port: u16,

    /// Origin allowed to call the API from a browser; same-origin only when unset
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Largest accepted upload in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    /// Retries on provider rate limiting (HTTP 429); 0 disables them
    #[arg(long, env = "PROVIDER_RETRIES", default_value_t = 0)]
    pub provider_retries: usize,
}

impl Config {
    /// `host:port` to bind.
    pub fn listen_on(&self) -> String {
        if self.listen_addr.contains(':') && !self.listen_addr.starts_with('[') {
            format!("[{}]:{}", self.listen_addr, self.listen_port)
        } else {
            format!("{}:{}", self.listen_addr, self.listen_port)
        }
    }
}
