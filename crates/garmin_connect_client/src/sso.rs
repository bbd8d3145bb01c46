//! Garmin SSO sign-in and the OAuth1 → OAuth2 token dance that follows it.
//!
//! The flow mirrors the one used by the Garmin Connect mobile app:
//!
//! 1. load the SSO embed page so the session cookies are set,
//! 2. scrape the `_csrf` token from the sign-in page and post the credentials,
//! 3. scrape the service ticket from the success page,
//! 4. trade the ticket for an OAuth1 token (`/oauth-service/oauth/preauthorized`),
//! 5. exchange the OAuth1 token for a short-lived OAuth2 bearer token.
//!
//! Steps 4 and 5 are signed with HMAC-SHA1 using the app's public consumer
//! key pair. Step 5 is also how an expired OAuth2 token gets replaced.

use crate::observability::record_api_result;
use crate::tokens::{OAuth1Token, OAuth2Token, TokenSet};
use crate::{Credentials, GarminError};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use regex::Regex;
use reqwest::header::{AUTHORIZATION, REFERER, USER_AGENT};
use secrecy::ExposeSecret;
use sha1::Sha1;
use std::sync::LazyLock;
use tracing::debug;

const CONSUMER_KEY: &str = "fc3e99d2-118c-44b8-8ae3-03370dde24c0";
const CONSUMER_SECRET: &str = "E08WAR897WEy2knn7aFBrvegVAf0AFdWBBF";
const MOBILE_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";

static CSRF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="_csrf"\s+value="(.+?)""#).expect("valid regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>(.+?)</title>").expect("valid regex"));
static TICKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"embed\?ticket=([^"]+)""#).expect("valid regex"));

#[derive(Clone, Debug)]
pub struct OAuthConsumer {
    pub key: String,
    pub secret: String,
}

impl Default for OAuthConsumer {
    fn default() -> Self {
        Self {
            key: CONSUMER_KEY.to_string(),
            secret: CONSUMER_SECRET.to_string(),
        }
    }
}

/// Full credential login. Returns both tokens so they can be cached.
pub async fn login(
    client: &reqwest::Client,
    sso_url: &str,
    api_url: &str,
    credentials: &Credentials,
) -> Result<TokenSet, GarminError> {
    let ticket = sign_in(client, sso_url, credentials).await?;
    debug!("sso: obtained service ticket");
    let consumer = OAuthConsumer::default();
    let oauth1 = preauthorize(client, api_url, sso_url, &consumer, &ticket).await?;
    let oauth2 = exchange(client, api_url, &consumer, &oauth1).await?;
    Ok(TokenSet {
        oauth1: Some(oauth1),
        oauth2,
    })
}

async fn sign_in(
    client: &reqwest::Client,
    sso_url: &str,
    credentials: &Credentials,
) -> Result<String, GarminError> {
    let sso = format!("{sso_url}/sso");
    let embed = format!("{sso_url}/sso/embed");
    let signin = format!("{sso_url}/sso/signin");
    let embed_params = [
        ("id", "gauth-widget"),
        ("embedWidget", "true"),
        ("gauthHost", sso.as_str()),
    ];
    let signin_params = [
        ("id", "gauth-widget"),
        ("embedWidget", "true"),
        ("gauthHost", embed.as_str()),
        ("service", embed.as_str()),
        ("source", embed.as_str()),
        ("redirectAfterAccountLoginUrl", embed.as_str()),
        ("redirectAfterAccountCreationUrl", embed.as_str()),
    ];

    fetch_text(client.get(&embed).query(&embed_params)).await?;

    let page = fetch_text(
        client
            .get(&signin)
            .query(&signin_params)
            .header(REFERER, &embed),
    )
    .await?;
    let csrf = capture(&CSRF_RE, &page)
        .ok_or_else(|| GarminError::Auth("sign-in page carries no csrf token".into()))?;

    let form = [
        ("username", credentials.username.as_str()),
        ("password", credentials.password.expose_secret()),
        ("embed", "true"),
        ("_csrf", csrf.as_str()),
    ];
    let page = fetch_text(
        client
            .post(&signin)
            .query(&signin_params)
            .header(REFERER, &signin)
            .form(&form),
    )
    .await?;

    let title = capture(&TITLE_RE, &page).unwrap_or_default();
    if title != "Success" {
        if title.contains("MFA") {
            return Err(GarminError::Auth(
                "multi-factor authentication is not supported".into(),
            ));
        }
        return Err(GarminError::Auth(format!(
            "sign-in rejected (page title `{title}`)"
        )));
    }
    capture(&TICKET_RE, &page)
        .ok_or_else(|| GarminError::Auth("sign-in succeeded without a service ticket".into()))
}

async fn preauthorize(
    client: &reqwest::Client,
    api_url: &str,
    sso_url: &str,
    consumer: &OAuthConsumer,
    ticket: &str,
) -> Result<OAuth1Token, GarminError> {
    let url = format!("{api_url}/oauth-service/oauth/preauthorized");
    let login_url = format!("{sso_url}/sso/embed");
    let query = [
        ("ticket", ticket),
        ("login-url", login_url.as_str()),
        ("accepts-mfa-tokens", "true"),
    ];
    let auth = authorization_header("GET", &url, &query, consumer, None, &nonce(), now())?;
    let body = fetch_text(
        client
            .get(&url)
            .query(&query)
            .header(AUTHORIZATION, auth)
            .header(USER_AGENT, MOBILE_USER_AGENT),
    )
    .await?;
    parse_oauth1(&body)
}

/// Trade an OAuth1 token for a fresh OAuth2 bearer token.
pub async fn exchange(
    client: &reqwest::Client,
    api_url: &str,
    consumer: &OAuthConsumer,
    oauth1: &OAuth1Token,
) -> Result<OAuth2Token, GarminError> {
    let url = format!("{api_url}/oauth-service/oauth/exchange/user/2.0");
    let mut form: Vec<(&str, &str)> = Vec::new();
    if let Some(mfa) = &oauth1.mfa_token {
        form.push(("mfa_token", mfa.as_str()));
    }
    let auth = authorization_header("POST", &url, &form, consumer, Some(oauth1), &nonce(), now())?;
    let resp = client
        .post(&url)
        .header(AUTHORIZATION, auth)
        .header(USER_AGENT, MOBILE_USER_AGENT)
        .form(&form)
        .send()
        .await?;
    let status = resp.status();
    record_api_result("oauth_exchange", status.is_success());
    if !status.is_success() {
        let body: String = resp.text().await.unwrap_or_default().chars().take(256).collect();
        return Err(GarminError::from_status(status.as_u16(), body));
    }
    let token: OAuth2Token = resp.json().await?;
    Ok(token.stamped(now()))
}

/// Build an OAuth1 `Authorization` header value (HMAC-SHA1, RFC 5849).
///
/// `params` are the query or form parameters of the request; they take part in
/// the signature but are not repeated in the header.
pub fn authorization_header(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    consumer: &OAuthConsumer,
    token: Option<&OAuth1Token>,
    nonce: &str,
    timestamp: i64,
) -> Result<String, GarminError> {
    let timestamp = timestamp.to_string();
    let mut oauth: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", consumer.key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_version", "1.0"),
    ];
    if let Some(token) = token {
        oauth.push(("oauth_token", token.oauth_token.as_str()));
    }

    let mut encoded: Vec<(String, String)> = oauth
        .iter()
        .chain(params.iter())
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let base = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&param_string)
    );
    let key = format!(
        "{}&{}",
        encode(&consumer.secret),
        encode(token.map(|t| t.oauth_token_secret.as_str()).unwrap_or(""))
    );

    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
        .map_err(|e| GarminError::Config(format!("oauth signing key: {e}")))?;
    mac.update(base.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    let mut fields: Vec<String> = oauth
        .iter()
        .map(|(k, v)| format!(r#"{}="{}""#, encode(k), encode(v)))
        .collect();
    fields.push(format!(r#"oauth_signature="{}""#, encode(&signature)));
    Ok(format!("OAuth {}", fields.join(", ")))
}

fn parse_oauth1(body: &str) -> Result<OAuth1Token, GarminError> {
    let mut token = None;
    let mut secret = None;
    let mut mfa_token = None;
    let mut mfa_expiration = None;
    for pair in body.trim().split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "oauth_token" => token = Some(value),
            "oauth_token_secret" => secret = Some(value),
            "mfa_token" => mfa_token = Some(value),
            "mfa_expiration_timestamp" => mfa_expiration = Some(value),
            _ => {}
        }
    }
    match (token, secret) {
        (Some(oauth_token), Some(oauth_token_secret)) => Ok(OAuth1Token {
            oauth_token,
            oauth_token_secret,
            mfa_token,
            mfa_expiration_timestamp: mfa_expiration,
            domain: Some("garmin.com".into()),
        }),
        _ => Err(GarminError::Auth(
            "preauthorized response lacks oauth_token/oauth_token_secret".into(),
        )),
    }
}

async fn fetch_text(request: reqwest::RequestBuilder) -> Result<String, GarminError> {
    let resp = request.send().await?;
    let status = resp.status();
    record_api_result("sso", status.is_success());
    if !status.is_success() {
        let body: String = resp.text().await.unwrap_or_default().chars().take(256).collect();
        return Err(GarminError::from_status(status.as_u16(), body));
    }
    Ok(resp.text().await?)
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn nonce() -> String {
    format!("{:032x}", rand::random::<u128>())
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(secret: &str) -> OAuth1Token {
        OAuth1Token {
            oauth_token: "tok".into(),
            oauth_token_secret: secret.into(),
            mfa_token: None,
            mfa_expiration_timestamp: None,
            domain: None,
        }
    }

    #[test]
    fn header_is_deterministic_for_fixed_nonce_and_time() {
        let consumer = OAuthConsumer::default();
        let params = [("ticket", "ST-1 x")];
        let a = authorization_header("get", "https://x/y", &params, &consumer, None, "n", 1).unwrap();
        let b = authorization_header("GET", "https://x/y", &params, &consumer, None, "n", 1).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("OAuth oauth_consumer_key=\""));
        assert!(a.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(a.contains("oauth_signature=\""));
        assert!(!a.contains("ticket"));
        assert!(!a.contains("oauth_token="));
    }

    #[test]
    fn signature_depends_on_token_secret() {
        let consumer = OAuthConsumer::default();
        let one = authorization_header("POST", "https://x", &[], &consumer, Some(&token("a")), "n", 1)
            .unwrap();
        let two = authorization_header("POST", "https://x", &[], &consumer, Some(&token("b")), "n", 1)
            .unwrap();
        assert!(one.contains("oauth_token=\"tok\""));
        assert_ne!(one, two);
    }

    #[test]
    fn parse_oauth1_decodes_form_body() {
        let parsed = parse_oauth1("oauth_token=abc&oauth_token_secret=d%2Fe&mfa_token=m\n").unwrap();
        assert_eq!(parsed.oauth_token, "abc");
        assert_eq!(parsed.oauth_token_secret, "d/e");
        assert_eq!(parsed.mfa_token.as_deref(), Some("m"));
    }

    #[test]
    fn parse_oauth1_requires_both_halves() {
        assert!(matches!(
            parse_oauth1("oauth_token=abc"),
            Err(GarminError::Auth(_))
        ));
    }

    #[test]
    fn scrapers_find_values() {
        let page = r#"<input type="hidden" name="_csrf"   value="CSRF123" />"#;
        assert_eq!(capture(&CSRF_RE, page).as_deref(), Some("CSRF123"));
        let success = r#"<title>Success</title><script>var u = "https://sso/embed?ticket=ST-42-abc";</script>"#;
        assert_eq!(capture(&TITLE_RE, success).as_deref(), Some("Success"));
        assert_eq!(capture(&TICKET_RE, success).as_deref(), Some("ST-42-abc"));
    }
}
