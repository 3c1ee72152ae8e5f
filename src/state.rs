use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::cache::TtlCache;
use crate::captcha::Captcha;
use crate::config::Config;
use crate::password::PasswordHasher;
use crate::token::{RefreshTokens, TokenBlacklist, TokenCodec};

/// Application state shared across handlers and middleware
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    /// Backing store for refresh tokens, the token blacklist and captchas
    pub cache: Arc<TtlCache>,
    pub tokens: TokenCodec,
    pub refresh_tokens: RefreshTokens,
    pub blacklist: TokenBlacklist,
    pub captcha: Captcha,
    pub hasher: PasswordHasher,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let cache = Arc::new(TtlCache::new());
        Self::with_cache(db, config, cache)
    }

    pub fn with_cache(db: DatabaseConnection, config: Config, cache: Arc<TtlCache>) -> Self {
        let tokens = TokenCodec::new(&config.jwt.secret, config.jwt.expires_in);
        let refresh_tokens = RefreshTokens::new(cache.clone(), config.jwt.refresh_expires_in);
        let blacklist = TokenBlacklist::new(cache.clone());
        let captcha = Captcha::new(cache.clone(), config.captcha.clone());
        let hasher = PasswordHasher::new(config.security.bcrypt_cost);

        Self {
            db,
            config: Arc::new(config),
            cache,
            tokens,
            refresh_tokens,
            blacklist,
            captcha,
            hasher,
        }
    }
}
