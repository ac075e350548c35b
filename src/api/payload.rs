//! Admin request bodies, accepted as JSON or as an urlencoded form

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::backend::InstanceAddress;
use crate::error::{AppError, Result};

/// Where an admin request came from; decides the response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// API client, answered with JSON
    Json,
    /// Web UI form, answered with a redirect
    Form,
}

/// Body parsed from JSON when the content type says so. Anything else is
/// decoded as an urlencoded form, whatever its content type.
#[derive(Debug)]
pub struct AdminPayload<T> {
    pub value: T,
    pub source: PayloadSource,
}

#[async_trait]
impl<S, T> FromRequest<S> for AdminPayload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim_start().starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
            Ok(Self {
                value,
                source: PayloadSource::Json,
            })
        } else {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
            let value = serde_urlencoded::from_bytes(&body)
                .map_err(|e| AppError::InvalidRequest(format!("malformed form body: {}", e)))?;
            Ok(Self {
                value,
                source: PayloadSource::Form,
            })
        }
    }
}

/// Integer that may arrive as a JSON number (integral or float) or as text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberField {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberField {
    /// Integer value; floats count only when they have no fractional part
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NumberField::Int(value) => Some(*value),
            NumberField::Float(value) => whole_number(*value),
            NumberField::Text(text) => {
                let text = text.trim();
                text.parse()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().and_then(whole_number))
            }
        }
    }
}

impl std::fmt::Display for NumberField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberField::Int(value) => write!(f, "{}", value),
            NumberField::Float(value) => write!(f, "{}", value),
            NumberField::Text(text) => write!(f, "'{}'", text),
        }
    }
}

fn whole_number(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then(|| value as i64)
}

/// `{ip, port}` for `/add_instance`
#[derive(Debug, Clone, Deserialize)]
pub struct AddInstanceInput {
    pub ip: Option<String>,
    pub port: Option<NumberField>,
}

impl AddInstanceInput {
    pub fn address(&self) -> Result<InstanceAddress> {
        let ip = self
            .ip
            .as_deref()
            .ok_or_else(|| AppError::InvalidAddress("ip is required".to_string()))?;
        let port = match &self.port {
            Some(NumberField::Text(text)) => InstanceAddress::parse_port(text)?,
            Some(number) => number
                .as_i64()
                .and_then(|value| u16::try_from(value).ok())
                .ok_or_else(|| AppError::InvalidAddress(format!("{} is not a valid port", number)))?,
            None => return Err(AppError::InvalidAddress("port is required".to_string())),
        };
        InstanceAddress::new(ip, port)
    }
}

/// `{index}` for `/remove_instance`
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveInstanceInput {
    pub index: Option<NumberField>,
}

impl RemoveInstanceInput {
    /// Position to remove; a missing or non-numeric index becomes -1,
    /// which is always out of range
    pub fn index(&self) -> i64 {
        self.index.as_ref().and_then(NumberField::as_i64).unwrap_or(-1)
    }
}
