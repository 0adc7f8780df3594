use crate::{error::EngineError, EngineResult};
use request_handlers::{Method, RequestHandler, RestRequest};
use serde_json::{Map, Value};

/// Loads seed documents by posting them through the front door, one batch per collection, in file
/// order. Nested documents and links are written the same way a client's would be.
pub async fn seed(handler: &RequestHandler<'_>, seed: Map<String, Value>) -> EngineResult<usize> {
    let mut written = 0;

    for (path, documents) in seed {
        let count = match &documents {
            Value::Array(items) => items.len(),
            _ => {
                return Err(EngineError::ConfigurationError(format!(
                    "Seed entry `{path}` must be an array of documents."
                )))
            }
        };

        if count == 0 {
            continue;
        }

        let request = RestRequest::new(Method::Post, &format!("/{path}")).with_body(documents);
        let response = handler.handle(request).await;

        if !response.is_success() {
            let body = response.body.map(|body| body.to_string()).unwrap_or_default();

            return Err(EngineError::InvocationError(format!(
                "Seeding `{path}` failed with status {}: {body}",
                response.status
            )));
        }

        tracing::info!(collection = path.as_str(), documents = count, "Seeded.");
        written += count;
    }

    Ok(written)
}
