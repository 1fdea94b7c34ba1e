//! Cursor-based paging over list endpoints.
//!
//! List endpoints take `cursor` and `limit` query parameters and answer with
//! `{"data": [...], "nextCursor": "..."}`. An empty cursor on a request means
//! "from the beginning"; an empty `nextCursor` in a response means there is
//! nothing left.
//!
//! Consistency is best effort. The service takes no snapshot, so objects
//! created, deleted or reordered while a traversal is in progress may be
//! skipped or seen twice. Against an unchanged collection, following every
//! cursor from the start yields each element exactly once.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::client::Client;
use crate::context::Context;
use crate::error::Result;
use crate::request::ApiRequest;

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub next_cursor: String,
}

/// Where a list call starts and how much it returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub cursor: String,
    /// Page size; the server default when `None`.
    pub limit: Option<u64>,
}

impl Client {
    /// Fetch the single page of `segments` described by `opts`.
    pub fn list<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        segments: &[&str],
        opts: &ListOptions,
    ) -> Result<Page<T>> {
        let mut request =
            ApiRequest::get(segments.iter().copied()).query("cursor", opts.cursor.as_str());
        if let Some(limit) = opts.limit.filter(|limit| *limit > 0) {
            request = request.query("limit", limit.to_string());
        }
        self.call(ctx, &request)
    }
}

/// Lazy, forward-only walk over a paginated collection.
///
/// Each `next_page` call issues one request. `cursor` reports where the walk
/// stands, and a walk can be resumed later with `Pager::starting_at`.
#[derive(Debug, Clone)]
pub struct Pager<T> {
    client: Client,
    segments: Vec<String>,
    limit: Option<u64>,
    cursor: String,
    done: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Pager<T> {
    pub fn new<I, S>(client: Client, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client,
            segments: segments.into_iter().map(Into::into).collect(),
            limit: None,
            cursor: String::new(),
            done: false,
            _item: PhantomData,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after the page that returned `cursor`.
    #[must_use]
    pub fn starting_at(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self.done = false;
        self
    }

    /// Cursor the next request will send. Empty before the first page.
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Next page of elements, or `None` once the collection is exhausted.
    ///
    /// On error the cursor is left unchanged, so the same page can be asked
    /// for again.
    pub fn next_page(&mut self, ctx: &Context) -> Result<Option<Vec<T>>> {
        if self.done {
            return Ok(None);
        }
        let segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        let opts = ListOptions {
            cursor: self.cursor.clone(),
            limit: self.limit,
        };
        let page: Page<T> = self.client.list(ctx, &segments, &opts)?;
        self.done = page.next_cursor.is_empty();
        self.cursor = page.next_cursor;
        Ok(Some(page.data))
    }

    /// Walk the rest of the collection one element at a time.
    pub fn items<'a>(&'a mut self, ctx: &'a Context) -> Items<'a, T> {
        Items {
            pager: self,
            ctx,
            buffer: Vec::new().into_iter(),
            failed: false,
        }
    }

    /// Drain every remaining page into one vector.
    pub fn collect_all(&mut self, ctx: &Context) -> Result<Vec<T>> {
        self.items(ctx).collect()
    }
}

/// Element iterator over a `Pager`, fetching pages on demand.
pub struct Items<'a, T> {
    pager: &'a mut Pager<T>,
    ctx: &'a Context,
    buffer: std::vec::IntoIter<T>,
    failed: bool,
}

impl<T: DeserializeOwned> Iterator for Items<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }
            if self.failed {
                return None;
            }
            match self.pager.next_page(self.ctx) {
                Ok(Some(page)) => self.buffer = page.into_iter(),
                Ok(None) => return None,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::Backoff;
    use crate::retry::tests::{fast_config, status, ScriptedTransport};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn client(transport: Arc<ScriptedTransport>) -> Client {
        Client::with_transport(
            fast_config(),
            transport,
            Arc::new(Backoff::new(StdRng::seed_from_u64(9))),
        )
    }

    #[test]
    fn page_defaults_when_fields_missing() {
        let page: Page<u32> = serde_json::from_str("{}").unwrap();
        assert!(page.data.is_empty());
        assert!(page.next_cursor.is_empty());
    }

    #[test]
    fn walks_until_cursor_is_empty() {
        let transport = ScriptedTransport::new(vec![
            status(200, r#"{"data":[1,2],"nextCursor":"2"}"#),
            status(200, r#"{"data":[3],"nextCursor":""}"#),
        ]);
        let mut pager: Pager<u32> = Pager::new(client(transport.clone()), ["clusters"]);
        let ctx = Context::background();
        assert_eq!(pager.next_page(&ctx).unwrap(), Some(vec![1, 2]));
        assert_eq!(pager.cursor(), "2");
        assert_eq!(pager.next_page(&ctx).unwrap(), Some(vec![3]));
        assert!(pager.is_done());
        assert_eq!(pager.next_page(&ctx).unwrap(), None);
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn items_flattens_pages() {
        let transport = ScriptedTransport::new(vec![
            status(200, r#"{"data":[1],"nextCursor":"a"}"#),
            status(200, r#"{"data":[],"nextCursor":"b"}"#),
            status(200, r#"{"data":[2,3]}"#),
        ]);
        let mut pager: Pager<u32> = Pager::new(client(transport), ["datasets"]);
        let all = pager.collect_all(&Context::background()).unwrap();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[test]
    fn error_leaves_cursor_in_place() {
        let transport = ScriptedTransport::new(vec![
            status(200, r#"{"data":[1],"nextCursor":"c1"}"#),
            status(400, r#"{"code":400,"message":"bad cursor"}"#),
        ]);
        let mut pager: Pager<u32> = Pager::new(client(transport), ["datasets"]);
        let ctx = Context::background();
        pager.next_page(&ctx).unwrap();
        assert!(pager.next_page(&ctx).is_err());
        assert_eq!(pager.cursor(), "c1");
    }
}
