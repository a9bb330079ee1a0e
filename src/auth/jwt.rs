use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::{
    model::user::User,
    models::{Claims, TokenType},
};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn claims_for(user: &User, token_type: TokenType, ttl: usize) -> Claims {
    let iat = now();
    Claims {
        sub: user.email.clone(),
        user_id: user.id,
        iat,
        exp: iat + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    }
}

fn sign(claims: &Claims, secret: &str) -> Result<String, Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn generate_access_token(user: &User, secret: &str, ttl: usize) -> Result<String, Error> {
    sign(&claims_for(user, TokenType::Access, ttl), secret)
}

/// Returns the token together with its claims so the caller can persist the `jti`.
pub fn generate_refresh_token(
    user: &User,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = claims_for(user, TokenType::Refresh, ttl);
    let token = sign(&claims, secret)?;
    Ok((token, claims))
}

/// HS256 signature plus `exp` check.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

impl Claims {
    pub fn ensure_type(self, expected: TokenType) -> Option<Self> {
        (self.token_type == expected).then_some(self)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::role::Role;

    pub(crate) fn user() -> User {
        User {
            id: 42,
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            hashed_password: String::new(),
            role: Role::Editor,
        }
    }

    #[test]
    fn access_token_round_trips_subject() {
        let token = generate_access_token(&user(), "s3cret", 60).unwrap();
        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, "jdoe@example.com");
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp, claims.iat + 60);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&user(), "s3cret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = claims_for(&user(), TokenType::Access, 0);
        // Past the default 60s leeway.
        claims.exp = now() - 3600;
        let token = sign(&claims, "s3cret").unwrap();
        let err = verify_token(&token, "s3cret").unwrap_err();
        assert_eq!(
            *err.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        );
    }

    #[test]
    fn refresh_tokens_get_unique_jti() {
        let (_, a) = generate_refresh_token(&user(), "s3cret", 60).unwrap();
        let (_, b) = generate_refresh_token(&user(), "s3cret", 60).unwrap();
        assert_ne!(a.jti, b.jti);
        assert_eq!(a.token_type, TokenType::Refresh);
    }

    #[test]
    fn ensure_type_rejects_confusion() {
        let (token, _) = generate_refresh_token(&user(), "s3cret", 60).unwrap();
        let claims = verify_token(&token, "s3cret").unwrap();
        assert!(claims.clone().ensure_type(TokenType::Access).is_none());
        assert!(claims.ensure_type(TokenType::Refresh).is_some());
    }
}
