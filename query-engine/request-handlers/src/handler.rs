use crate::{
    front_door::GuardedFrontDoor,
    guard::{Access, AllowAll, GuardedRequest, RequestGuard},
    response::{Envelope, PageMeta, RestError, RestResponse},
    route::{self, Route},
    HandlerError, Method, RestRequest,
};
use futures::FutureExt;
use query_connector::Connector;
use query_core::{
    document::{self, Document, HREF},
    read, term, translate, write, CoreError, DeleteTarget, EngineConfig, Page, RequestContext, TranslatedQuery,
};
use query_structure::{Collection, EntityKey, InternalSchema};
use serde_json::Value;
use std::{fmt, panic::AssertUnwindSafe};
use tracing::Instrument;

/// The front door of the engine. Routes REST requests to the read and write engines, one backend
/// transaction per request.
pub struct RequestHandler<'a> {
    connector: &'a dyn Connector,
    schema: &'a InternalSchema,
    config: &'a EngineConfig,
    guard: &'a dyn RequestGuard,
}

impl fmt::Debug for RequestHandler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler")
            .field("connector", &self.connector.name())
            .finish()
    }
}

impl<'a> RequestHandler<'a> {
    pub fn new(connector: &'a dyn Connector, schema: &'a InternalSchema, config: &'a EngineConfig) -> Self {
        Self {
            connector,
            schema,
            config,
            guard: &AllowAll,
        }
    }

    pub fn with_guard(mut self, guard: &'a dyn RequestGuard) -> Self {
        self.guard = guard;
        self
    }

    pub async fn handle(&self, request: RestRequest) -> RestResponse {
        let span = tracing::info_span!("rest:request", method = %request.method, path = %request.path);

        match AssertUnwindSafe(self.handle_in_transaction(&request))
            .catch_unwind()
            .instrument(span)
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                tracing::debug!(status = err.status(), "Request failed: {err}");
                err.into()
            }
            Err(panic) => RestResponse::error(500, RestError::from_panic_payload(panic)),
        }
    }

    async fn handle_in_transaction(&self, request: &RestRequest) -> crate::Result<RestResponse> {
        let route = Route::resolve(self.schema, self.config, &request.path)?;

        self.guard.check(&GuardedRequest {
            principal: request.principal.as_deref(),
            collection: &route.collection,
            access: access_of(request.method),
            nested: false,
        })?;

        let conn = self.connector.get_connection().await?;
        let tx = conn.start_transaction().await?;
        let front_door = GuardedFrontDoor::new(self.guard);

        let ctx = RequestContext::new(self.config, tx.as_connection_like(), &front_door)
            .with_principal(request.principal.as_deref());

        match self.dispatch(&ctx, &route, request).await {
            Ok(response) => {
                tx.commit().await?;
                Ok(response)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!("Rollback failed after `{err}`: {rollback_err}");
                }

                Err(err)
            }
        }
    }

    async fn dispatch(
        &self,
        ctx: &RequestContext<'_>,
        route: &Route,
        request: &RestRequest,
    ) -> crate::Result<RestResponse> {
        match request.method {
            Method::Get => self.read(ctx, route, request).await,
            Method::Post | Method::Put => self.upsert(ctx, route, request).await,
            Method::Patch => self.patch(ctx, route, request).await,
            Method::Delete => self.delete(ctx, route, request).await,
        }
    }

    async fn read(&self, ctx: &RequestContext<'_>, route: &Route, request: &RestRequest) -> crate::Result<RestResponse> {
        let terms = term::parse_query(request.query_pairs(), self.config)?;

        match (&route.relationship, &route.keys) {
            (Some(relationship), _) => {
                let key = route
                    .single_key()
                    .ok_or_else(|| CoreError::client("A relationship route takes exactly one entity key."))?;

                let query = translate(&terms, &relationship.related(), self.config)?;
                let page = read::find_related(ctx, relationship, key, &query).await?;

                self.page_response(request, &query, page)
            }
            (None, Some(keys)) => {
                let query = translate(&terms, &route.collection, self.config)?;
                let data = read::find_by_keys(ctx, &route.collection, keys, &query).await?;

                RestResponse::ok(Envelope { data, meta: None })
            }
            (None, None) => {
                let query = translate(&terms, &route.collection, self.config)?;
                let page = read::find_page(ctx, &route.collection, &query).await?;

                self.page_response(request, &query, page)
            }
        }
    }

    async fn upsert(&self, ctx: &RequestContext<'_>, route: &Route, request: &RestRequest) -> crate::Result<RestResponse> {
        read_only_relationship(route)?;

        if request.method == Method::Post && route.keys.is_some() {
            return Err(CoreError::client("POST goes to the collection. Use PUT to address an entity.").into());
        }

        let mut documents = documents_of(request.body.as_ref())?;
        self.bind_route_key(route, &mut documents)?;

        let created: Vec<bool> = documents
            .iter()
            .map(|document| document::href_of(document).is_none())
            .collect();

        let keys = write::upsert(ctx, &route.collection, &mut documents).await?;
        tracing::debug!(keys = keys.len(), "Upsert finished.");

        let locations: Vec<String> = documents
            .iter()
            .zip(created)
            .filter(|(_, created)| *created)
            .filter_map(|(document, _)| document::href_of(document).map(str::to_owned))
            .collect();

        let envelope = Envelope {
            data: documents,
            meta: None,
        };

        if locations.is_empty() {
            RestResponse::ok(envelope)
        } else {
            RestResponse::created(envelope, locations)
        }
    }

    async fn patch(&self, ctx: &RequestContext<'_>, route: &Route, request: &RestRequest) -> crate::Result<RestResponse> {
        read_only_relationship(route)?;

        let mut documents = documents_of(request.body.as_ref())?;
        self.bind_route_key(route, &mut documents)?;

        let keys = write::patch(ctx, &route.collection, &documents).await?;
        let query = translate(&[], &route.collection, self.config)?;
        let data = read::find_by_keys(ctx, &route.collection, &keys, &query).await?;

        RestResponse::ok(Envelope { data, meta: None })
    }

    async fn delete(&self, ctx: &RequestContext<'_>, route: &Route, request: &RestRequest) -> crate::Result<RestResponse> {
        read_only_relationship(route)?;

        let terms = term::parse_query(request.query_pairs(), self.config)?;
        let query = Some(terms).filter(|terms| !terms.is_empty());

        let hrefs = request
            .body
            .as_ref()
            .filter(|body| !body.is_null())
            .map(hrefs_of)
            .transpose()?;

        let target = DeleteTarget::exactly_one(route.keys.clone(), query, hrefs)?;
        let deleted = write::delete(ctx, &route.collection, target).await?;

        tracing::info!(collection = route.collection.name(), deleted, "Deleted entities.");

        Ok(RestResponse::no_content())
    }

    /// A write addressed at `/<collection>/<key>` carries exactly one document whose href, if
    /// present, must agree with the URL.
    fn bind_route_key(&self, route: &Route, documents: &mut [Document]) -> crate::Result<()> {
        let Some(keys) = &route.keys else {
            return Ok(());
        };

        let (key, document) = match (keys.as_slice(), documents) {
            ([key], [document]) => (key, document),
            _ => {
                return Err(CoreError::client("A write to an entity URL takes exactly one key and one document.").into());
            }
        };

        bind_href(&route.collection, key, document, self.config.base_url())
    }

    fn page_response(&self, request: &RestRequest, query: &TranslatedQuery, page: Page) -> crate::Result<RestResponse> {
        let next = page.has_next.then(|| self.next_link(request, query));

        RestResponse::ok(Envelope {
            data: page.documents,
            meta: Some(PageMeta {
                page_num: page.page_num,
                page_size: page.page_size,
                next,
            }),
        })
    }

    /// The request URL with its window moved forward by one page. A request that positioned
    /// itself with `offset` keeps doing so; everything else advances `page`.
    fn next_link(&self, request: &RestRequest, query: &TranslatedQuery) -> String {
        let by_offset = request.query.iter().any(|(name, _)| window_param(name) == Some("offset"));

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());

        for (name, value) in request.query.iter().filter(|(name, _)| window_param(name).is_none()) {
            serializer.append_pair(name, value);
        }

        if by_offset {
            serializer.append_pair("offset", &query.offset.saturating_add(query.limit).to_string());
        } else {
            serializer.append_pair("page", &query.page_num.saturating_add(1).to_string());
        }

        format!(
            "{}{}?{}",
            self.config.base_url(),
            route::strip_base_path(self.config, &request.path),
            serializer.finish()
        )
    }
}

fn access_of(method: Method) -> Access {
    match method {
        Method::Get => Access::Read,
        Method::Post | Method::Put | Method::Patch => Access::Write,
        Method::Delete => Access::Delete,
    }
}

fn read_only_relationship(route: &Route) -> crate::Result<()> {
    match &route.relationship {
        Some(relationship) => Err(CoreError::client(format!(
            "The relationship route `{relationship}` is read-only. Write the parent document instead."
        ))
        .into()),
        None => Ok(()),
    }
}

/// Names the paging parameter `name` stands for, either as `page=2` or as `page(2)`.
fn window_param(name: &str) -> Option<&'static str> {
    let function = name.split('(').next().unwrap_or_default().trim();

    ["page", "pagenum", "offset"]
        .into_iter()
        .find(|window| function.eq_ignore_ascii_case(window))
        .map(|window| if window == "offset" { "offset" } else { "page" })
}

fn documents_of(body: Option<&Value>) -> crate::Result<Vec<Document>> {
    match body {
        Some(Value::Object(document)) => Ok(vec![document.clone()]),
        Some(Value::Array(items)) if items.is_empty() => Err(HandlerError::invalid_body("The batch is empty.")),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(document) => Ok(document.clone()),
                _ => Err(HandlerError::invalid_body("Every element of a batch must be a JSON object.")),
            })
            .collect(),
        Some(_) => Err(HandlerError::invalid_body("Expected a JSON object or an array of objects.")),
        None => Err(HandlerError::invalid_body("A write needs a JSON body.")),
    }
}

/// Hrefs of a delete body: an array of href strings or of `{ "href": ... }` objects.
fn hrefs_of(body: &Value) -> crate::Result<Vec<String>> {
    let items = body
        .as_array()
        .ok_or_else(|| HandlerError::invalid_body("A delete body must be an array of hrefs."))?;

    items
        .iter()
        .map(|item| {
            document::reference_href(item)
                .map(str::to_owned)
                .ok_or_else(|| HandlerError::invalid_body(format!("`{item}` is not an href.")))
        })
        .collect()
}

fn bind_href(collection: &Collection, key: &EntityKey, document: &mut Document, base_url: &str) -> crate::Result<()> {
    if let Some(href) = document::href_of(document) {
        if &collection.key_from_href(href)? != key {
            return Err(CoreError::client(format!("The href `{href}` does not match the URL.")).into());
        }

        return Ok(());
    }

    document.insert(HREF.to_owned(), Value::String(collection.href(base_url, key)));

    Ok(())
}
