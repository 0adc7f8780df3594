use crate::{document::Document, write, EngineConfig};
use async_trait::async_trait;
use query_connector::ConnectionLike;
use query_structure::{Collection, EntityKey};

/// Per-request state handed to every engine operation: settings, the transaction all reads and
/// writes go through, the entry point for nested writes and the acting principal.
#[derive(Clone, Copy)]
pub struct RequestContext<'a> {
    pub config: &'a EngineConfig,
    pub conn: &'a dyn ConnectionLike,
    pub front_door: &'a dyn FrontDoor,
    pub principal: Option<&'a str>,
    nested: bool,
}

impl<'a> RequestContext<'a> {
    pub fn new(config: &'a EngineConfig, conn: &'a dyn ConnectionLike, front_door: &'a dyn FrontDoor) -> Self {
        Self {
            config,
            conn,
            front_door,
            principal: None,
            nested: false,
        }
    }

    pub fn with_principal(mut self, principal: Option<&'a str>) -> Self {
        self.principal = principal;
        self
    }

    /// The context child writes run in: same transaction, flagged as nested.
    pub fn nested(&self) -> Self {
        Self { nested: true, ..*self }
    }

    pub fn is_nested(&self) -> bool {
        self.nested
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }
}

/// A batch of child documents submitted by a parent write.
#[derive(Debug, Clone)]
pub struct NestedWrite {
    pub collection: Collection,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Default)]
pub struct NestedWriteResult {
    pub keys: Vec<EntityKey>,
    /// The submitted documents with their `href` filled in, same order.
    pub documents: Vec<Document>,
}

/// Where nested writes re-enter the system.
///
/// Child documents go through the same validation and authorization a top-level request of the
/// child collection would, so the engine never writes children directly.
#[async_trait]
pub trait FrontDoor: Send + Sync {
    async fn nested_write(&self, ctx: &RequestContext<'_>, command: NestedWrite) -> crate::Result<NestedWriteResult>;
}

/// Sends nested writes straight back into the write engine without further checks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectFrontDoor;

#[async_trait]
impl FrontDoor for DirectFrontDoor {
    async fn nested_write(&self, ctx: &RequestContext<'_>, command: NestedWrite) -> crate::Result<NestedWriteResult> {
        let NestedWrite {
            collection,
            mut documents,
        } = command;

        let keys = write::upsert(ctx, &collection, &mut documents).await?;

        Ok(NestedWriteResult { keys, documents })
    }
}
