//! Resolving a name-or-ID reference into a canonical ID.
//!
//! A handle stores the canonical ID rather than the caller's reference, so
//! the handle keeps addressing the same object after that object is renamed.
//! The service does the lookup: `GET /api/v3/{collection}/{reference}`
//! accepts either form and echoes the object, whose `id` is taken. A
//! canonical ID therefore resolves to itself.

use serde::Deserialize;

use crate::client::Client;
use crate::context::Context;
use crate::error::{ClientError, Result};
use crate::request::ApiRequest;

#[derive(Deserialize)]
struct Identified {
    id: String,
}

impl Client {
    /// Canonical ID for `reference` within `collection`.
    ///
    /// Failures are wrapped in `ClientError::Resolve` naming `kind` and the
    /// reference; no lookup failure ever yields an empty ID.
    pub fn resolve_ref(
        &self,
        ctx: &Context,
        kind: &'static str,
        collection: &str,
        reference: &str,
    ) -> Result<String> {
        self.lookup_id(ctx, collection, reference)
            .map_err(|source| ClientError::Resolve {
                kind,
                reference: reference.to_string(),
                source: Box::new(source),
            })
    }

    fn lookup_id(&self, ctx: &Context, collection: &str, reference: &str) -> Result<String> {
        if reference.trim().is_empty() {
            return Err(ClientError::InvalidReference("reference is empty".to_string()));
        }
        let found: Identified = self.call(ctx, &ApiRequest::get([collection, reference]))?;
        if found.id.is_empty() {
            return Err(ClientError::InvalidReference(
                "service returned an empty id".to_string(),
            ));
        }
        tracing::trace!(collection, reference, id = %found.id, "resolved reference");
        Ok(found.id)
    }
}
