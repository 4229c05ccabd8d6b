use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Claims issued by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    /// Present only if this user is linked to an employee record
    #[serde(default)]
    pub employee_id: Option<String>,
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
pub(crate) fn issue_token(
    user_id: &str,
    role: u8,
    employee_id: Option<&str>,
    secret: &str,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        user_id: user_id.to_string(),
        sub: user_id.to_string(),
        role,
        exp: (chrono::Utc::now().timestamp() + 600) as usize,
        employee_id: employee_id.map(str::to_string),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
