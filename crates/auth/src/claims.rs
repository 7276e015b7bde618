//! JWT claims types

use serde::{Deserialize, Deserializer, Serialize};

/// Registered claims carried by tokens this crate issues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Subject (entity primary key)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "subject_string"
    )]
    pub sub: Option<String>,
    /// Expires at, epoch seconds
    pub exp: i64,
    /// Issued at, epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Token id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// `aud` is either one recipient or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

/// Numeric subjects are read as their decimal text
fn subject_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSubject {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(
        Option::<RawSubject>::deserialize(deserializer)?.map(|raw| match raw {
            RawSubject::Text(text) => text,
            RawSubject::Number(number) => number.to_string(),
        }),
    )
}
