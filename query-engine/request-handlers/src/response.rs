use crate::HandlerError;
use query_core::Document;
use serde::Serialize;
use serde_json::Value;

/// Successful response body.
#[derive(Debug, Serialize, Default, PartialEq)]
pub struct Envelope {
    pub data: Vec<Document>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page_num: usize,
    pub page_size: usize,

    /// Link to the following page. Absent on the last one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Serialize, Default, PartialEq)]
pub struct ErrorEnvelope {
    pub errors: Vec<RestError>,
}

#[derive(Debug, Serialize, serde::Deserialize, PartialEq)]
pub struct RestError {
    error: String,
    user_facing_error: user_facing_errors::Error,
}

impl RestError {
    pub fn code(&self) -> Option<&str> {
        self.user_facing_error.as_known().map(|err| err.error_code.as_ref())
    }

    pub fn message(&self) -> &str {
        self.user_facing_error.message()
    }

    pub fn from_user_facing_error(err: user_facing_errors::Error) -> Self {
        RestError {
            error: err.message().to_owned(),
            user_facing_error: err,
        }
    }

    pub fn from_handler_error(err: HandlerError) -> Self {
        RestError {
            error: err.to_string(),
            user_facing_error: user_facing_errors::Error::from(err),
        }
    }

    pub fn from_panic_payload(panic_payload: Box<dyn std::any::Any + Send + 'static>) -> Self {
        Self::from_user_facing_error(user_facing_errors::Error::from_panic_payload(panic_payload))
    }
}

/// What goes back over the wire: a status, headers and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RestResponse {
    pub fn ok(envelope: Envelope) -> crate::Result<Self> {
        Self::with_envelope(200, envelope)
    }

    pub fn created(envelope: Envelope, locations: Vec<String>) -> crate::Result<Self> {
        let mut response = Self::with_envelope(201, envelope)?;

        if !locations.is_empty() {
            response.headers.push(("Location".to_owned(), locations.join(", ")));
        }

        Ok(response)
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            headers: vec![],
            body: None,
        }
    }

    pub fn error(status: u16, error: RestError) -> Self {
        let envelope = ErrorEnvelope { errors: vec![error] };

        Self {
            status,
            headers: vec![],
            // Serializing plain strings and JSON values cannot fail.
            body: serde_json::to_value(envelope).ok(),
        }
    }

    fn with_envelope(status: u16, envelope: Envelope) -> crate::Result<Self> {
        Ok(Self {
            status,
            headers: vec![],
            body: Some(serde_json::to_value(envelope)?),
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `data` array of a successful response.
    pub fn data(&self) -> &[Value] {
        self.body
            .as_ref()
            .and_then(|body| body.get("data"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The first error code of a failed response.
    pub fn error_code(&self) -> Option<&str> {
        self.body
            .as_ref()?
            .get("errors")?
            .get(0)?
            .get("user_facing_error")?
            .get("error_code")?
            .as_str()
    }
}

impl From<HandlerError> for RestResponse {
    fn from(err: HandlerError) -> Self {
        let status = err.status();
        Self::error(status, RestError::from_handler_error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn next_is_omitted_on_the_last_page() {
        let envelope = Envelope {
            data: vec![],
            meta: Some(PageMeta {
                page_num: 3,
                page_size: 2,
                next: None,
            }),
        };

        assert_eq!(
            serde_json::to_value(envelope).unwrap(),
            json!({ "data": [], "meta": { "pageNum": 3, "pageSize": 2 } })
        );
    }

    #[test]
    fn created_responses_list_locations() {
        let response = RestResponse::created(
            Envelope::default(),
            vec!["http://localhost/owners/3".into(), "http://localhost/owners/4".into()],
        )
        .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(
            response.header("location"),
            Some("http://localhost/owners/3, http://localhost/owners/4")
        );
    }
}
