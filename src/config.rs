use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Access and refresh token settings
    #[serde(default)]
    pub jwt: JwtConfig,
    /// Route prefix and exemption lists
    #[serde(default)]
    pub router: RouterConfig,
    /// Tenant resolution settings
    #[serde(default)]
    pub tenant: TenantConfig,
    #[serde(default)]
    pub captcha: CaptchaConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Seed account used when the database is empty
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Full connection URL, takes precedence over the individual fields
    #[serde(default)]
    pub url: Option<String>,
    /// Database host
    #[serde(default = "default_db_host")]
    pub host: String,
    /// Database port
    #[serde(default = "default_db_port")]
    pub port: u16,
    /// Database name
    #[serde(default = "default_db_name", rename = "database")]
    pub name: String,
    /// Database user
    #[serde(default = "default_db_user", rename = "username")]
    pub user: String,
    /// Database password
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// HMAC secret for access tokens
    #[serde(default = "default_jwt_secret")]
    pub secret: String,
    /// Access token lifetime in seconds
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_expires_in")]
    pub refresh_expires_in: i64,
    /// Application tag written into issued tokens
    #[serde(default = "default_app")]
    pub app: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterConfig {
    /// Prefix all API routes are nested under
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Routes that do not require a login. A trailing `*` matches by prefix.
    #[serde(default = "default_except_login")]
    pub except_login: Vec<String>,
    /// Routes that require a login but no permission
    #[serde(default = "default_except_auth")]
    pub except_auth: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenantConfig {
    #[serde(default = "default_tenant_header")]
    pub header: String,
    #[serde(default = "default_tenant_query_param")]
    pub query_param: String,
    /// The query parameter lookup is meant for development only
    #[serde(default)]
    pub allow_query_param: bool,
    #[serde(default = "default_tenant_id")]
    pub default_tenant_id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptchaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Captcha lifetime in seconds
    #[serde(default = "default_captcha_ttl")]
    pub ttl: u64,
    #[serde(default = "default_captcha_length")]
    pub length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_size: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// bcrypt work factor for stored passwords
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

// Default value functions
fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "tenantry".to_string()
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    50
}

fn default_jwt_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_expires_in() -> i64 {
    86_400
}

fn default_refresh_expires_in() -> i64 {
    7 * 86_400
}

fn default_app() -> String {
    "api".to_string()
}

fn default_prefix() -> String {
    "/api".to_string()
}

fn default_except_login() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/user/login".to_string(),
        "/user/refresh".to_string(),
        "/user/captcha".to_string(),
    ]
}

fn default_except_auth() -> Vec<String> {
    vec![
        "/user/logout".to_string(),
        "/user/profile".to_string(),
        "/user/password".to_string(),
        "/user/menus".to_string(),
        "/user/routers".to_string(),
        "/user/permissions".to_string(),
    ]
}

fn default_tenant_header() -> String {
    "X-Tenant-Id".to_string()
}

fn default_tenant_query_param() -> String {
    "tenant_id".to_string()
}

fn default_tenant_id() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_captcha_ttl() -> u64 {
    300
}

fn default_captcha_length() -> usize {
    4
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    100
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            max_body_size: default_max_body_size(),
            log: LogConfig::default(),
            database: DatabaseConfig::default(),
            jwt: JwtConfig::default(),
            router: RouterConfig::default(),
            tenant: TenantConfig::default(),
            captcha: CaptchaConfig::default(),
            pagination: PaginationConfig::default(),
            bootstrap: BootstrapConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_db_host(),
            port: default_db_port(),
            name: default_db_name(),
            user: default_db_user(),
            password: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_jwt_secret(),
            expires_in: default_expires_in(),
            refresh_expires_in: default_refresh_expires_in(),
            app: default_app(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            except_login: default_except_login(),
            except_auth: default_except_auth(),
        }
    }
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            header: default_tenant_header(),
            query_param: default_tenant_query_param(),
            allow_query_param: false,
            default_tenant_id: default_tenant_id(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: default_captcha_ttl(),
            length: default_captcha_length(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_size: default_page_size(),
            max_size: default_max_page_size(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl DatabaseConfig {
    /// Generate database connection URL
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

impl RouterConfig {
    /// Strip the API prefix from a request path
    pub fn relative_path<'a>(&self, path: &'a str) -> &'a str {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return path;
        }
        match path.strip_prefix(prefix) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        }
    }

    pub fn is_except_login(&self, path: &str) -> bool {
        matches_any(&self.except_login, path)
    }

    pub fn is_except_auth(&self, path: &str) -> bool {
        matches_any(&self.except_auth, path)
    }
}

fn matches_any(patterns: &[String], path: &str) -> bool {
    patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => pattern == path,
    })
}

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        if config.jwt.secret == default_jwt_secret() {
            tracing::warn!("jwt.secret is using the built-in default, set a real secret");
        }
        Ok(config)
    }
}
