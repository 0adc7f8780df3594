use crate::HandlerError;
use serde_json::Value;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl FromStr for Method {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(HandlerError::UnsupportedMethod(s.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };

        f.write_str(name)
    }
}

/// One incoming REST call, already stripped of its transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    /// Path below the engine's base URL, e.g. `/owners/1/pets`.
    pub path: String,
    /// Decoded query string pairs, in arrival order.
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub principal: Option<String>,
}

impl RestRequest {
    /// Builds a request from a target such as `/owners?sort=-name&pageSize=2`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };

        let query = url::form_urlencoded::parse(query.as_bytes())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        Self {
            method,
            path: path.to_owned(),
            query,
            body: None,
            principal: None,
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn delete(target: &str) -> Self {
        Self::new(Method::Delete, target)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub(crate) fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn targets_split_into_path_and_decoded_query() {
        let request = RestRequest::get("/owners?name=Ann%20Lee&sort=-age");

        assert_eq!(request.path, "/owners");
        assert_eq!(
            request.query,
            vec![
                ("name".to_owned(), "Ann Lee".to_owned()),
                ("sort".to_owned(), "-age".to_owned())
            ]
        );
    }

    #[test]
    fn methods_parse_case_insensitively() {
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
        assert!("TRACE".parse::<Method>().is_err());
    }
}
