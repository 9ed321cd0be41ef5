use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};

/// The uniform body of every API response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T> Envelope<T> {
    /// A successful response carrying `data`.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            count: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> Envelope<Vec<T>> {
    /// A successful response carrying a list and its length.
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        let mut envelope = Self::data(items);
        envelope.count = Some(count);
        envelope
    }
}

impl Envelope<()> {
    /// A successful response with nothing but a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
            count: None,
        }
    }

    /// A failed response.
    pub fn failure(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error,
            count: None,
        }
    }
}

/// An envelope paired with its HTTP status.
pub struct Reply<T> {
    status: Status,
    envelope: Envelope<T>,
}

impl<T> Reply<T> {
    pub fn ok(envelope: Envelope<T>) -> Self {
        Self {
            status: Status::Ok,
            envelope,
        }
    }

    pub fn created(envelope: Envelope<T>) -> Self {
        Self {
            status: Status::Created,
            envelope,
        }
    }
}

impl<'r, 'o: 'r, T> Responder<'r, 'o> for Reply<T>
where
    T: Serialize,
{
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        (self.status, Json(self.envelope)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Tally {
        votes: u32,
    }

    #[test]
    fn decodes_payloads_without_default() {
        let envelope: Envelope<Tally> =
            serde_json::from_str(r#"{"success":true,"data":{"votes":3}}"#).unwrap();
        assert_eq!(envelope.data, Some(Tally { votes: 3 }));

        // Failures carry no data at all.
        let envelope: Envelope<Tally> =
            serde_json::from_str(r#"{"success":false,"message":"Not Found"}"#).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.as_deref(), Some("Not Found"));
    }
}
