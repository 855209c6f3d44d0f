//! JWT encoding and decoding utilities.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use super::types::Claims;

/// Encode claims into a JWT token.
pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Decode and validate a JWT token.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn encode_decode_roundtrip() {
        let secret = "test_secret_key_32_chars_long!!!";
        let claims = Claims::new(Uuid::new_v4(), "Alice", vec!["Reader".into()], 3600);

        let token = encode_token(&claims, secret).unwrap();
        let decoded = decode_token(&token, secret).unwrap();

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.roles, claims.roles);
        assert!(decoded.has_access);
        assert!(!decoded.is_super_user);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = Claims::new(Uuid::new_v4(), "Alice", vec![], 3600);
        let token = encode_token(&claims, "secret_one_is_32_characters_long").unwrap();

        assert!(decode_token(&token, "secret_two_is_32_characters_long").is_err());
    }
}
