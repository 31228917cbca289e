use std::env;

use kohi_common::{parse_boolean_flag, Secret};
use kohi_order_engine::vnpay::VnPayConfig;
use log::*;

const DEFAULT_KOS_HOST: &str = "127.0.0.1";
const DEFAULT_KOS_PORT: u16 = 8360;
const DEFAULT_VNPAY_ENDPOINT: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// VNPay merchant configuration used for signing payment URLs and verifying return callbacks.
    pub vnpay: VnPayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_KOS_HOST.to_string(),
            port: DEFAULT_KOS_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            vnpay: VnPayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("KOHI_HOST").ok().unwrap_or_else(|| DEFAULT_KOS_HOST.into());
        let port = env::var("KOHI_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for KOHI_PORT. {e} Using the default, {DEFAULT_KOS_PORT}, \
                         instead."
                    );
                    DEFAULT_KOS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_KOS_PORT);
        let database_url = env::var("KOHI_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ KOHI_DATABASE_URL is not set. Please set it to the URL for the order database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("KOHI_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("KOHI_USE_FORWARDED").ok(), false);
        let vnpay = vnpay_config_from_env();
        Self { host, port, database_url, use_x_forwarded_for, use_forwarded, vnpay }
    }
}

fn vnpay_config_from_env() -> VnPayConfig {
    let tmn_code = env::var("KOHI_VNPAY_TMN_CODE").ok().unwrap_or_else(|| {
        error!("🪛️ KOHI_VNPAY_TMN_CODE is not set. Payment URLs cannot be issued without the merchant code.");
        String::default()
    });
    let hmac_secret = env::var("KOHI_VNPAY_HMAC_SECRET").ok().unwrap_or_else(|| {
        error!("🪛️ KOHI_VNPAY_HMAC_SECRET is not set. Payment callbacks cannot be verified without it.");
        String::default()
    });
    let payment_endpoint = env::var("KOHI_VNPAY_ENDPOINT").ok().unwrap_or_else(|| {
        info!("KOHI_VNPAY_ENDPOINT is not set. Using the sandbox gateway, {DEFAULT_VNPAY_ENDPOINT}.");
        DEFAULT_VNPAY_ENDPOINT.into()
    });
    let return_url = env::var("KOHI_VNPAY_RETURN_URL").ok().unwrap_or_else(|| {
        error!("🪛️ KOHI_VNPAY_RETURN_URL is not set. The gateway will have nowhere to redirect customers back to.");
        String::default()
    });
    VnPayConfig::new(&tmn_code, Secret::new(hmac_secret), &payment_endpoint, &return_url)
}

/// The subset of the server configuration that request handlers need to resolve the client IP.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProxyConfig {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl From<&ServerConfig> for ProxyConfig {
    fn from(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
