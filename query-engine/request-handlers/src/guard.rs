use query_structure::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Delete,
}

/// A request as the guard sees it.
#[derive(Debug, Clone, Copy)]
pub struct GuardedRequest<'a> {
    pub principal: Option<&'a str>,
    pub collection: &'a Collection,
    pub access: Access,
    /// Set for child writes submitted by a parent document.
    pub nested: bool,
}

/// Authorization hook consulted for every top-level request and every nested write.
pub trait RequestGuard: Send + Sync {
    /// Returns `CoreError::Forbidden` to deny the request.
    fn check(&self, request: &GuardedRequest<'_>) -> query_core::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl RequestGuard for AllowAll {
    fn check(&self, _: &GuardedRequest<'_>) -> query_core::Result<()> {
        Ok(())
    }
}
