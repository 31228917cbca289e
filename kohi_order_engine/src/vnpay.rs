//! VNPay payment-gateway integration.
//!
//! The gateway contract is bit-exact: parameters are sorted lexicographically by key, values are URL-encoded, the
//! pairs are joined with `&` into a canonical query string, and an HMAC-SHA512 over that string (keyed with the
//! merchant's shared secret) is appended as `vnp_SecureHash`. The callback verification path reconstructs the
//! canonical string with the *identical* sort/encode rule, otherwise every legitimate callback would be rejected.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use kohi_common::{Secret, Vnd, VND_CURRENCY_CODE};
use sha2::Sha512;
use thiserror::Error;

type HmacSha512 = Hmac<Sha512>;

pub const VNPAY_VERSION: &str = "2.1.0";
pub const VNPAY_COMMAND_PAY: &str = "pay";
pub const VNPAY_LOCALE: &str = "vn";
/// Gateway response code denoting a successful payment. Every other code is a failure.
pub const VNPAY_RESPONSE_SUCCESS: &str = "00";
const SECURE_HASH_FIELD: &str = "vnp_SecureHash";
const SECURE_HASH_TYPE_FIELD: &str = "vnp_SecureHashType";
const CREATE_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, Error)]
pub enum VnPayError {
    #[error("Invalid VNPay configuration. {0}")]
    ConfigurationError(String),
    #[error("The callback signature is missing or does not match the payload.")]
    InvalidSignature,
    #[error("The callback is malformed. {0}")]
    MalformedCallback(String),
}

//--------------------------------------     VnPayConfig     ---------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct VnPayConfig {
    /// The merchant code assigned by VNPay (`vnp_TmnCode`).
    pub tmn_code: String,
    /// The shared secret used to sign the canonical query string.
    pub hmac_secret: Secret<String>,
    /// The gateway endpoint clients are redirected to.
    pub payment_endpoint: String,
    /// The URL the gateway redirects back to after payment.
    pub return_url: String,
}

impl VnPayConfig {
    pub fn new(tmn_code: &str, hmac_secret: Secret<String>, payment_endpoint: &str, return_url: &str) -> Self {
        Self {
            tmn_code: tmn_code.into(),
            hmac_secret,
            payment_endpoint: payment_endpoint.into(),
            return_url: return_url.into(),
        }
    }

    /// The merchant code and shared secret are non-negotiable: without them every signature we produce or check
    /// would be garbage, so refuse to construct a signer at all.
    fn check(&self) -> Result<(), VnPayError> {
        if self.tmn_code.is_empty() {
            return Err(VnPayError::ConfigurationError("The VNPay merchant code is not set".into()));
        }
        if self.hmac_secret.reveal().is_empty() {
            return Err(VnPayError::ConfigurationError("The VNPay HMAC secret is not set".into()));
        }
        Ok(())
    }
}

//--------------------------------------   PaymentUrlParams  ---------------------------------------------------------
/// The order-specific inputs for a payment URL. Everything else comes from [`VnPayConfig`] or is a protocol
/// constant.
#[derive(Debug, Clone)]
pub struct PaymentUrlParams {
    pub order_id: i64,
    pub amount: Vnd,
    pub client_ip: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentUrlParams {
    pub fn new(order_id: i64, amount: Vnd, client_ip: &str, created_at: DateTime<Utc>) -> Self {
        Self { order_id, amount, client_ip: client_ip.into(), created_at }
    }
}

//--------------------------------------    CallbackResult   ---------------------------------------------------------
/// The decoded fields of a signature-verified gateway callback. A verified callback can still encode a *failed*
/// payment; check [`CallbackResult::is_success`].
#[derive(Debug, Clone)]
pub struct CallbackResult {
    /// The transaction reference, i.e. the order id the URL was issued for.
    pub txn_ref: String,
    /// The paid amount in đồng (the gateway reports it scaled by 100).
    pub amount: Option<Vnd>,
    pub bank_code: Option<String>,
    pub response_code: String,
}

impl CallbackResult {
    pub fn is_success(&self) -> bool {
        self.response_code == VNPAY_RESPONSE_SUCCESS
    }
}

/// Builds the canonical query string: empty values dropped, keys sorted lexicographically, values URL-encoded,
/// pairs joined with `&`. This exact byte sequence is the signing input on both the build and verify paths.
fn canonical_query(params: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs.iter().map(|(k, v)| format!("{k}={}", urlencoding::encode(v))).collect::<Vec<String>>().join("&")
}

fn sign(secret: &str, canonical: &str) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Builds the signed gateway redirect URL for an order. Pure: no side effects, no clock access (the caller supplies
/// the creation timestamp).
pub fn build_payment_url(config: &VnPayConfig, params: &PaymentUrlParams) -> Result<String, VnPayError> {
    config.check()?;
    let fields = vec![
        ("vnp_Version".to_string(), VNPAY_VERSION.to_string()),
        ("vnp_Command".to_string(), VNPAY_COMMAND_PAY.to_string()),
        ("vnp_TmnCode".to_string(), config.tmn_code.clone()),
        ("vnp_Amount".to_string(), params.amount.gateway_value().to_string()),
        ("vnp_CurrCode".to_string(), VND_CURRENCY_CODE.to_string()),
        ("vnp_TxnRef".to_string(), params.order_id.to_string()),
        ("vnp_OrderInfo".to_string(), format!("Anteiku Kohi - Order #{}", params.order_id)),
        ("vnp_OrderType".to_string(), "billpayment".to_string()),
        ("vnp_Locale".to_string(), VNPAY_LOCALE.to_string()),
        ("vnp_CreateDate".to_string(), params.created_at.format(CREATE_DATE_FORMAT).to_string()),
        ("vnp_IpAddr".to_string(), params.client_ip.clone()),
        ("vnp_ReturnUrl".to_string(), config.return_url.clone()),
    ];
    let canonical = canonical_query(&fields);
    let signature = sign(config.hmac_secret.reveal(), &canonical);
    Ok(format!("{}?{canonical}&{SECURE_HASH_FIELD}={signature}", config.payment_endpoint))
}

/// Verifies a gateway return callback. The signature field is split off, the canonical string is rebuilt from the
/// remaining parameters and the HMAC is compared in constant time. An `Err(InvalidSignature)` means the callback
/// is untrusted and **no** order state may be mutated in response to it.
pub fn verify_callback(
    config: &VnPayConfig,
    query_params: &HashMap<String, String>,
) -> Result<CallbackResult, VnPayError> {
    config.check()?;
    let provided = query_params.get(SECURE_HASH_FIELD).ok_or(VnPayError::InvalidSignature)?;
    let provided = hex::decode(provided).map_err(|_| VnPayError::InvalidSignature)?;
    let fields: Vec<(String, String)> = query_params
        .iter()
        .filter(|(k, _)| k.as_str() != SECURE_HASH_FIELD && k.as_str() != SECURE_HASH_TYPE_FIELD)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let canonical = canonical_query(&fields);
    let mut mac = HmacSha512::new_from_slice(config.hmac_secret.reveal().as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(canonical.as_bytes());
    mac.verify_slice(&provided).map_err(|_| VnPayError::InvalidSignature)?;
    let txn_ref = query_params
        .get("vnp_TxnRef")
        .cloned()
        .ok_or_else(|| VnPayError::MalformedCallback("vnp_TxnRef is missing".into()))?;
    let amount = query_params
        .get("vnp_Amount")
        .map(|a| {
            a.parse::<i64>()
                .map(|cents| Vnd::from(cents / 100))
                .map_err(|e| VnPayError::MalformedCallback(format!("vnp_Amount is not an integer: {e}")))
        })
        .transpose()?;
    let bank_code = query_params.get("vnp_BankCode").cloned();
    let response_code = query_params.get("vnp_ResponseCode").cloned().unwrap_or_default();
    Ok(CallbackResult { txn_ref, amount, bank_code, response_code })
}
