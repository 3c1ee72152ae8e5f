//! Numeric login captcha
//!
//! Codes live in the shared cache and are consumed on first verification.

use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::config::CaptchaConfig;
use crate::error::{AppError, AppResult};

const CAPTCHA_PREFIX: &str = "captcha:";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaChallenge {
    pub captcha_id: String,
    pub captcha_image: String,
}

#[derive(Clone)]
pub struct Captcha {
    cache: Arc<TtlCache>,
    config: CaptchaConfig,
}

impl Captcha {
    pub fn new(cache: Arc<TtlCache>, config: CaptchaConfig) -> Self {
        Self { cache, config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn issue(&self) -> CaptchaChallenge {
        let code = self.generate_code();
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.cache.set(
            format!("{}{}", CAPTCHA_PREFIX, id),
            code.clone(),
            Duration::from_secs(self.config.ttl),
        );
        CaptchaChallenge {
            captcha_id: id,
            captcha_image: render_svg(&code),
        }
    }

    pub fn verify(&self, id: &str, code: &str) -> AppResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        if id.is_empty() || code.is_empty() {
            return Err(AppError::InvalidCaptcha);
        }
        match self.cache.take(&format!("{}{}", CAPTCHA_PREFIX, id)) {
            Some(expected) if expected == code.trim() => Ok(()),
            _ => Err(AppError::InvalidCaptcha),
        }
    }

    fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.config.length.max(1))
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

/// Render the code as a tiny SVG data URI
fn render_svg(code: &str) -> String {
    let width = 24 * code.len() + 16;
    let svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"40\">\
         <rect width=\"100%\" height=\"100%\" fill=\"#f2f2f2\"/>\
         <text x=\"8\" y=\"28\" font-family=\"monospace\" font-size=\"26\" letter-spacing=\"6\">{code}</text>\
         </svg>",
        w = width,
        code = code
    );
    format!(
        "data:image/svg+xml;base64,{}",
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, svg)
    )
}
