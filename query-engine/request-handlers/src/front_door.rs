use crate::guard::{Access, GuardedRequest, RequestGuard};
use async_trait::async_trait;
use query_core::{write, FrontDoor, NestedWrite, NestedWriteResult, RequestContext};

/// Nested writes re-enter here and pass the same guard as a top-level write of the child
/// collection before reaching the write engine. They stay inside the caller's transaction.
pub struct GuardedFrontDoor<'a> {
    guard: &'a dyn RequestGuard,
}

impl<'a> GuardedFrontDoor<'a> {
    pub fn new(guard: &'a dyn RequestGuard) -> Self {
        Self { guard }
    }
}

#[async_trait]
impl FrontDoor for GuardedFrontDoor<'_> {
    async fn nested_write(&self, ctx: &RequestContext<'_>, command: NestedWrite) -> query_core::Result<NestedWriteResult> {
        let NestedWrite {
            collection,
            mut documents,
        } = command;

        self.guard.check(&GuardedRequest {
            principal: ctx.principal,
            collection: &collection,
            access: Access::Write,
            nested: ctx.is_nested(),
        })?;

        tracing::debug!(
            collection = collection.name(),
            documents = documents.len(),
            "Nested write through the front door."
        );

        let keys = write::upsert(ctx, &collection, &mut documents).await?;

        Ok(NestedWriteResult { keys, documents })
    }
}
