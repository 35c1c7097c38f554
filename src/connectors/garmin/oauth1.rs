// ABOUTME: OAuth 1.0a request signing with HMAC-SHA1 for Garmin Connect
// ABOUTME: Builds signature base strings and Authorization headers with a fresh nonce per request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use ring::hmac;
use std::fmt::Write as _;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LENGTH: usize = 32;

/// Token half of the signing key
#[derive(Clone, Copy)]
pub struct TokenCredentials<'a> {
    /// `oauth_token`
    pub key: &'a str,
    /// Token secret
    pub secret: &'a str,
}

/// Signs requests with the consumer key pair and, when present, a token pair
pub struct OAuth1Signer<'a> {
    consumer_key: &'a str,
    consumer_secret: &'a str,
    token: Option<TokenCredentials<'a>>,
}

impl<'a> OAuth1Signer<'a> {
    /// Signer holding only the consumer credentials (request-token step)
    #[must_use]
    pub const fn new(consumer_key: &'a str, consumer_secret: &'a str) -> Self {
        Self {
            consumer_key,
            consumer_secret,
            token: None,
        }
    }

    /// Add the request or access token pair
    #[must_use]
    pub const fn with_token(mut self, key: &'a str, secret: &'a str) -> Self {
        self.token = Some(TokenCredentials { key, secret });
        self
    }

    /// Authorization header for a request, with a fresh nonce and timestamp
    ///
    /// `query` are the request's query parameters; `extra_oauth` are protocol
    /// parameters such as `oauth_callback` or `oauth_verifier`.
    #[must_use]
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        query: &[(&str, &str)],
        extra_oauth: &[(&str, &str)],
    ) -> String {
        let nonce = generate_nonce();
        let timestamp = Utc::now().timestamp().to_string();
        self.authorization_header_with(method, url, query, extra_oauth, &nonce, &timestamp)
    }

    /// Authorization header for fixed nonce and timestamp
    #[must_use]
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        query: &[(&str, &str)],
        extra_oauth: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> String {
        let mut oauth_params: Vec<(&str, &str)> = vec![
            ("oauth_consumer_key", self.consumer_key),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", SIGNATURE_METHOD),
            ("oauth_timestamp", timestamp),
            ("oauth_version", OAUTH_VERSION),
        ];
        if let Some(token) = self.token {
            oauth_params.push(("oauth_token", token.key));
        }
        oauth_params.extend_from_slice(extra_oauth);

        let mut all_params = oauth_params.clone();
        all_params.extend_from_slice(query);
        let token_secret = self.token.map_or("", |t| t.secret);
        let signature = sign(method, url, &all_params, self.consumer_secret, token_secret);

        oauth_params.push(("oauth_signature", signature.as_str()));
        oauth_params.sort_unstable();

        let mut header = String::from("OAuth ");
        for (i, (key, value)) in oauth_params.iter().enumerate() {
            if i > 0 {
                header.push_str(", ");
            }
            let _ = write!(header, "{}=\"{}\"", encode(key), encode(value));
        }
        header
    }
}

/// RFC 3986 percent-encoding: only unreserved characters pass through
#[must_use]
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Signature base string: `METHOD&enc(url)&enc(sorted params)`
#[must_use]
pub fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort_unstable();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&normalized)
    )
}

/// HMAC-SHA1 signature, base64 encoded
///
/// `url` must not carry a query string; pass query parameters in `params`.
#[must_use]
pub fn sign(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    consumer_secret: &str,
    token_secret: &str,
) -> String {
    let base = signature_base_string(method, url, params);
    let signing_key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, signing_key.as_bytes());
    STANDARD.encode(hmac::sign(&key, base.as_bytes()).as_ref())
}

fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}
