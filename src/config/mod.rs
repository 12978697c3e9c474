use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_RESERVATION_TTL_MINUTES: i64 = 30;
const DEFAULT_PAYOUT_HOLD_DAYS: i64 = 7;
const DEFAULT_REFUND_RATE_THRESHOLD: f64 = 0.2;
const DEFAULT_EXPIRY_SWEEP_SECS: u64 = 60;
const DEFAULT_PAYOUT_SWEEP_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Shared secret for payment processor webhook signatures.
    pub payment_webhook_secret: String,
    /// Server-side secret for deriving ticket codes.
    pub ticket_code_secret: String,
    /// How long an unconfirmed reservation holds inventory. Aligned to the
    /// checkout-session expiry of the payment processor.
    pub reservation_ttl_minutes: i64,
    /// Grace window between event end and organizer fund release, sized to
    /// cover the refund policy.
    pub payout_hold_days: i64,
    /// Refund rate above which a due payout is held back for manual review.
    pub refund_rate_threshold: f64,
    pub expiry_sweep_interval_secs: u64,
    pub payout_sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/tessera".to_string()),
            port: parse_env("PORT", DEFAULT_PORT),
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "whsec_dev_only".to_string()),
            ticket_code_secret: env::var("TICKET_CODE_SECRET")
                .unwrap_or_else(|_| "tessera_dev_code_secret".to_string()),
            reservation_ttl_minutes: parse_env(
                "RESERVATION_TTL_MINUTES",
                DEFAULT_RESERVATION_TTL_MINUTES,
            ),
            payout_hold_days: parse_env("PAYOUT_HOLD_DAYS", DEFAULT_PAYOUT_HOLD_DAYS),
            refund_rate_threshold: parse_env(
                "REFUND_RATE_THRESHOLD",
                DEFAULT_REFUND_RATE_THRESHOLD,
            ),
            expiry_sweep_interval_secs: parse_env(
                "EXPIRY_SWEEP_INTERVAL_SECS",
                DEFAULT_EXPIRY_SWEEP_SECS,
            ),
            payout_sweep_interval_secs: parse_env(
                "PAYOUT_SWEEP_INTERVAL_SECS",
                DEFAULT_PAYOUT_SWEEP_SECS,
            ),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid value for {}, using default", key);
                default
            }
        },
        Err(_) => default,
    }
}
