//! Settings for the QR redirect server.
//!
//! Every field can be set in `cfg.json`; the Redis host and auth secret
//! default to environment indirections so they can stay out of the document.

crate::config_schema! {
    #[derive(Debug, Clone, Default)]
    pub struct ServerConfig {
        #[config(key = "redis_host", default = "$ENV$REDIS_HOST")]
        pub redis_host: String,
        /// Empty when `REDIS_AUTH` is unset, which disables `AUTH`.
        #[config(key = "redis_auth", default = "$ENV$REDIS_AUTH")]
        pub redis_auth: String,
        #[config(key = "redis_port", default = "6379")]
        pub redis_port: String,

        #[config(key = "host_port", default = "localhost:8333")]
        pub host_port: String,
        /// Directory static files are served from.
        #[config(key = "dir", default = "./www")]
        pub dir: String,
        /// Directory generated QR images are written to.
        #[config(key = "qr_dir", default = "./www/q")]
        pub qr_dir: String,
        /// URL path QR images are served under.
        #[config(key = "qr_uri", default = "./q")]
        pub qr_uri: String,
        #[config(key = "log_file", default = "./log/log.out")]
        pub log_file: String,

        /// Auth token lifetime in seconds (30 days).
        #[config(key = "session_persistence", default = "2592000")]
        pub login_ttl: i64,

        /// QR error-correction level: L, M, Q or H.
        #[config(key = "qr_level", default = "H")]
        pub qr_level: String,
        /// Edge length of generated images, in pixels.
        #[config(key = "qr_size", default = "256")]
        pub qr_size: i64,
    }
}

impl ServerConfig {
    /// `host:port` of the Redis server.
    pub fn redis_addr(&self) -> String {
        format!("{}:{}", self.redis_host, self.redis_port)
    }

    pub fn redis_auth_enabled(&self) -> bool {
        !self.redis_auth.is_empty()
    }
}

/// Command-line overrides applied on top of the frozen configuration.
#[derive(Debug, Clone, Default)]
pub struct ListenOverrides {
    pub host_port: Option<String>,
    pub dir: Option<String>,
}

/// Where the server listens and what it serves, after CLI overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenSettings {
    pub host_port: String,
    pub dir: String,
}

impl ListenSettings {
    pub fn new(config: &ServerConfig, overrides: &ListenOverrides) -> Self {
        Self {
            host_port: overrides
                .host_port
                .clone()
                .unwrap_or_else(|| config.host_port.clone()),
            dir: overrides.dir.clone().unwrap_or_else(|| config.dir.clone()),
        }
    }
}
