//! Typed handles bound to one resolved resource.
//!
//! # Design
//! Every resource kind shares one `Handle<K>` implementation. A kind only
//! names its collection and its wire types through `ResourceKind`; requests,
//! retries and decoding all come from the client. A handle is immutable:
//! it is created by resolution or from a known ID and never re-resolved, so
//! two handles of the same kind with the same ID are interchangeable.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::Client;
use crate::context::Context;
use crate::error::Result;
use crate::http::HttpMethod;
use crate::pager::Pager;
use crate::request::ApiRequest;

/// Static description of one resource collection.
pub trait ResourceKind {
    /// Singular name used in error messages, e.g. `"dataset"`.
    const KIND: &'static str;
    /// Path segment of the collection under the API prefix.
    const COLLECTION: &'static str;
    /// Representation returned by `get` and `patch`.
    type Item: DeserializeOwned;
    /// Partial update document. Unset fields must be omitted on the wire.
    type Patch: Serialize;
}

/// Handle to a single resource of kind `K`.
pub struct Handle<K: ResourceKind> {
    client: Client,
    id: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> Handle<K> {
    /// Bind `id` without consulting the service.
    pub fn from_id(client: Client, id: impl Into<String>) -> Self {
        Self {
            client,
            id: id.into(),
            _kind: PhantomData,
        }
    }

    /// Stable ID this handle addresses.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn request(&self, method: HttpMethod) -> ApiRequest {
        ApiRequest::new(method, [K::COLLECTION, self.id.as_str()])
    }

    /// Fetch the resource's current state.
    pub fn get(&self, ctx: &Context) -> Result<K::Item> {
        self.client.call(ctx, &self.request(HttpMethod::Get))
    }

    /// Apply a partial update and return the updated resource.
    pub fn patch(&self, ctx: &Context, patch: &K::Patch) -> Result<K::Item> {
        let request = self.request(HttpMethod::Patch).json(patch)?;
        self.client.call(ctx, &request)
    }

    /// Delete the resource, or move it to its terminal state where the
    /// service keeps terminated objects around.
    pub fn delete(&self, ctx: &Context) -> Result<()> {
        self.client
            .execute(ctx, &self.request(HttpMethod::Delete))
            .map(drop)
    }
}

impl<K: ResourceKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            id: self.id.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: ResourceKind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K: ResourceKind> Eq for Handle<K> {}

impl<K: ResourceKind> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<K: ResourceKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::KIND)
            .field("id", &self.id)
            .finish()
    }
}

impl Client {
    /// Resolve `reference` (a name or an ID) and bind a handle to the
    /// resulting canonical ID. The handle keeps working if the object is
    /// later renamed.
    pub fn resource<K: ResourceKind>(&self, ctx: &Context, reference: &str) -> Result<Handle<K>> {
        let id = self.resolve_ref(ctx, K::KIND, K::COLLECTION, reference)?;
        Ok(Handle::from_id(self.clone(), id))
    }

    /// Bind a handle to an ID that is already known to be canonical.
    pub fn handle<K: ResourceKind>(&self, id: impl Into<String>) -> Handle<K> {
        Handle::from_id(self.clone(), id)
    }

    /// Page through every resource of kind `K`.
    pub fn pager<K: ResourceKind>(&self) -> Pager<K::Item> {
        Pager::new(self.clone(), [K::COLLECTION])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::Backoff;
    use crate::retry::tests::{fast_config, status, ScriptedTransport};
    use crate::types::{DatasetPatch, Datasets, Experiments};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn client(transport: Arc<ScriptedTransport>) -> Client {
        Client::with_transport(
            fast_config(),
            transport,
            Arc::new(Backoff::new(StdRng::seed_from_u64(11))),
        )
    }

    #[test]
    fn handles_with_same_id_are_equal() {
        let client = client(ScriptedTransport::new(vec![status(200, "{}")]));
        let a: Handle<Datasets> = client.handle("ds1");
        let b = Handle::<Datasets>::from_id(client.clone(), "ds1");
        let c: Handle<Datasets> = client.handle("ds2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn resource_binds_resolved_id() {
        let transport = ScriptedTransport::new(vec![status(
            200,
            r#"{"id":"ex42","name":"ana/sweep"}"#,
        )]);
        let handle = client(transport)
            .resource::<Experiments>(&Context::background(), "ana/sweep")
            .unwrap();
        assert_eq!(handle.id(), "ex42");
        assert_eq!(format!("{handle:?}"), r#"Handle { kind: "experiment", id: "ex42" }"#);
    }

    #[test]
    fn patch_sends_only_set_fields() {
        let client = client(ScriptedTransport::new(vec![status(200, "{}")]));
        let handle: Handle<Datasets> = client.handle("ds1");
        let patch = DatasetPatch {
            description: Some(String::new()),
            ..DatasetPatch::default()
        };
        let request = handle.request(HttpMethod::Patch).json(&patch).unwrap();
        let built = client.build_request(&request).unwrap();
        assert_eq!(built.method, HttpMethod::Patch);
        assert!(built.url.ends_with("/api/v3/datasets/ds1"));
        assert_eq!(built.body.as_deref(), Some(r#"{"description":""}"#));
    }

    #[test]
    fn delete_accepts_empty_success() {
        let transport = ScriptedTransport::new(vec![status(204, "")]);
        let handle: Handle<Datasets> = client(transport.clone()).handle("ds1");
        handle.delete(&Context::background()).unwrap();
        assert_eq!(transport.calls(), 1);
    }
}
