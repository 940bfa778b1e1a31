use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// URL prefix under which stored media is served back to clients.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";
