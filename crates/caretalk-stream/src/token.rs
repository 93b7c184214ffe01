use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

/// Claims of a client-side user token. The backend's server SDKs sign these
/// with the API secret; the mobile apps present them to authenticate as the
/// user. No expiry; revocation is handled backend-side.
#[derive(Debug, Serialize, Deserialize)]
struct UserClaims {
    user_id: String,
}

/// Claims of the server token sent with every API request.
#[derive(Debug, Serialize, Deserialize)]
struct ServerClaims {
    server: bool,
}

pub fn mint_user_token(
    api_secret: &str,
    user_id: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = UserClaims { user_id: user_id.to_string() };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(api_secret.as_bytes()),
    )
}

pub fn mint_server_token(api_secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        &ServerClaims { server: true },
        &EncodingKey::from_secret(api_secret.as_bytes()),
    )
}
