//! The sync client: single source of truth for all network exchanges.

use crate::config::ClientConfig;
use crate::entity::{validate_space_key, PageEntity, PageStatus};
use pagesync_protocol::wire::{RemoteLabelList, RemotePage, ResultsPage, WriteLabel};
use pagesync_protocol::{
    ClientError, ClientResult, HttpClient, HttpMethod, HttpRequest, HttpResponse, LabelName,
    LabelSet, PageId, ScaffoldData, LABEL_PREFIX,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Characters escaped in query-string values.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Expansions requested on every page fetch.
const BASE_EXPAND: &str = "space,version,ancestors.space,ancestors.version,metadata.labels,\
                           history.lastUpdated,restrictions.read.restrictions.user,\
                           restrictions.read.restrictions.group,\
                           restrictions.update.restrictions.user,\
                           restrictions.update.restrictions.group";

/// Extra expansions when the caller wants body content.
const CONTENT_EXPAND: &str = ",body.storage,body.styled_view";

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE).to_string()
}

fn expand(include_content: bool) -> String {
    if include_content {
        format!("{BASE_EXPAND}{CONTENT_EXPAND}")
    } else {
        BASE_EXPAND.to_string()
    }
}

/// True if the query already contains a `type` clause: the bare word `type`
/// followed by a comparison operator. A substring inside another word
/// ("typewriter", "subtype") does not count.
fn has_type_clause(query: &str) -> bool {
    fn is_word_char(byte: u8) -> bool {
        byte.is_ascii_alphanumeric() || byte == b'_'
    }

    let lower = query.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut from = 0;
    while let Some(offset) = lower[from..].find("type") {
        let at = from + offset;
        let end = at + 4;
        from = end;
        if at > 0 && is_word_char(bytes[at - 1]) {
            continue;
        }
        if end < bytes.len() && is_word_char(bytes[end]) {
            continue;
        }
        let rest = lower[end..].trim_start();
        if rest.starts_with('=')
            || rest.starts_with("!=")
            || rest.starts_with("in ")
            || rest.starts_with("in(")
            || rest.starts_with("not in")
        {
            return true;
        }
    }
    false
}

pub(crate) struct ClientInner {
    http: Box<dyn HttpClient>,
    config: ClientConfig,
    last_error: parking_lot::RwLock<Option<String>>,
}

/// Client for one page server.
///
/// Every operation follows the same skeleton: build the request, execute it
/// through the injected [`HttpClient`], branch on the status code, decode or
/// record a failure. Structural mistakes (bad input, entity in the wrong
/// state) are `Err`; remote failures come back as `Ok(None)` / `Ok(false)`
/// with the message retrievable through [`SyncClient::last_error`].
///
/// Cloning is cheap and shares the underlying transport; entities remain
/// valid for every clone of their originating client.
#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncClient")
            .field("base_url", &self.inner.config.base_url)
            .finish_non_exhaustive()
    }
}

impl SyncClient {
    /// Creates a client over the given transport.
    pub fn new(http: impl HttpClient + 'static, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http: Box::new(http),
                config,
                last_error: parking_lot::RwLock::new(None),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn shares_inner(&self, other: &Arc<ClientInner>) -> bool {
        Arc::ptr_eq(&self.inner, other)
    }

    /// Returns the message of the most recent remote failure.
    ///
    /// Overwritten on each occurrence, not accumulated.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.read().clone()
    }

    /// Creates an empty entity owned by this client, for pre-creation use.
    #[must_use]
    pub fn new_page(&self) -> PageEntity {
        PageEntity::bare(Arc::downgrade(&self.inner))
    }

    pub(crate) fn entity_from_remote(&self, remote: RemotePage) -> PageEntity {
        PageEntity::from_remote(&Arc::downgrade(&self.inner), remote)
    }

    // ---- read operations -------------------------------------------------

    /// Runs a CQL search, paginating until the server returns an empty page.
    ///
    /// A `type=page` clause is appended when the query does not already
    /// constrain the content type. Returns `None` if any page of the
    /// search failed.
    pub fn search(
        &self,
        query: &str,
        include_content: bool,
    ) -> ClientResult<Option<Vec<PageEntity>>> {
        let query = query.trim();
        if query.len() < self.inner.config.min_query_len {
            return Err(ClientError::validation(format!(
                "search query too short (minimum {} characters)",
                self.inner.config.min_query_len
            )));
        }
        let cql = if has_type_clause(query) {
            query.to_string()
        } else {
            format!("{query} and type=page")
        };
        Ok(self.paginate(
            &self.inner.config.search_url(),
            &[("cql", cql.as_str())],
            include_content,
        ))
    }

    /// Lists the direct children of a page.
    #[must_use]
    pub fn list_children(&self, parent: PageId, include_content: bool) -> Option<Vec<PageEntity>> {
        self.paginate(
            &self.inner.config.child_pages_url(parent),
            &[],
            include_content,
        )
    }

    /// Lists all descendants of a page via an ancestor-scoped search.
    pub fn list_descendants(
        &self,
        parent: PageId,
        include_content: bool,
    ) -> ClientResult<Option<Vec<PageEntity>>> {
        self.search(&format!("ancestor = {parent}"), include_content)
    }

    /// Fetches one page by id. `None` means not found or remote failure.
    #[must_use]
    pub fn fetch_by_id(&self, id: PageId) -> Option<PageEntity> {
        let url = format!(
            "{}?expand={}",
            self.inner.config.content_id_url(id),
            expand(true)
        );
        let response = self.send(HttpRequest::new(HttpMethod::Get, url), "fetch page")?;
        if response.status != 200 {
            self.record_status_failure("fetch page", &response);
            return None;
        }
        match RemotePage::from_json(&response.body) {
            Ok(remote) => Some(self.entity_from_remote(remote)),
            Err(err) => {
                self.record_failure("fetch page", &format!("decode failed: {err}"));
                None
            }
        }
    }

    /// Fetches one page by space key and title.
    ///
    /// Zero matches decode to `Ok(None)` without recording a failure.
    pub fn fetch_by_key_and_title(
        &self,
        collection_key: &str,
        title: &str,
    ) -> ClientResult<Option<PageEntity>> {
        let key = validate_space_key(collection_key)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(ClientError::validation("title must be a non-empty string"));
        }

        let url = format!(
            "{}?spaceKey={}&title={}&expand={}",
            self.inner.config.content_url(),
            encode(&key),
            encode(title),
            expand(true)
        );
        let Some(response) = self.send(HttpRequest::new(HttpMethod::Get, url), "fetch by title")
        else {
            return Ok(None);
        };
        if response.status != 200 {
            self.record_status_failure("fetch by title", &response);
            return Ok(None);
        }
        match ResultsPage::from_json(&response.body) {
            Ok(results) => Ok(results
                .results
                .into_iter()
                .next()
                .map(|remote| self.entity_from_remote(remote))),
            Err(err) => {
                self.record_failure("fetch by title", &format!("decode failed: {err}"));
                Ok(None)
            }
        }
    }

    /// Fetches the sidecar form record for a page.
    ///
    /// When `allow` is given the returned record is filtered to those field
    /// names. The filter is applied client-side; the server always returns
    /// the full record.
    #[must_use]
    pub fn fetch_sidecar(&self, id: PageId, allow: Option<&[&str]>) -> Option<ScaffoldData> {
        let url = self.inner.config.scaffold_url(id);
        let response = self.send(HttpRequest::new(HttpMethod::Get, url), "fetch sidecar")?;
        if response.status != 200 {
            self.record_status_failure("fetch sidecar", &response);
            return None;
        }
        match ScaffoldData::from_json(&response.body) {
            Ok(mut data) => {
                if let Some(allow) = allow {
                    data.retain_names(allow);
                }
                Some(data)
            }
            Err(err) => {
                self.record_failure("fetch sidecar", &format!("decode failed: {err}"));
                None
            }
        }
    }

    // ---- write operations ------------------------------------------------

    /// Pushes page-level changes to the server.
    ///
    /// Requires the minimum write-capable fields: id, version, parent,
    /// title, and space key. On success the entity's version is overwritten
    /// with the server's authoritative value; the server may no-op a write
    /// that changes nothing, in which case it does not bump the version and
    /// the optimistic `current + 1` must be corrected back down.
    pub fn update(
        &self,
        entity: &mut PageEntity,
        suppress_notifications: bool,
    ) -> ClientResult<bool> {
        self.ensure_owns(entity)?;
        if entity.parent_id().is_none() {
            return Err(ClientError::validation("entity has no parent"));
        }
        let id = entity
            .id()
            .ok_or_else(|| ClientError::validation("entity has no id"))?;
        let payload = entity.write_payload(false, suppress_notifications)?;

        let Some(body) = self.encode_payload(&payload, "update page") else {
            return Ok(false);
        };
        let request = HttpRequest::new(HttpMethod::Put, self.inner.config.content_id_url(id))
            .with_json_body(body);
        let Some(response) = self.send(request, "update page") else {
            return Ok(false);
        };
        if response.status != 200 {
            self.record_status_failure("update page", &response);
            return Ok(false);
        }

        match RemotePage::from_json(&response.body) {
            Ok(remote) => match remote.version {
                Some(version) if version.number > 0 => {
                    entity.set_version(version.number)?;
                    Ok(true)
                }
                _ => {
                    self.record_failure("update page", "response carried no version number");
                    Ok(false)
                }
            },
            Err(err) => {
                self.record_failure("update page", &format!("decode failed: {err}"));
                Ok(false)
            }
        }
    }

    /// Pushes the sidecar form record to the form subsystem.
    ///
    /// The record must have been loaded (or populated) on the entity first.
    /// A 200 bumps the entity's version locally, because the server records
    /// the write as a new content version without returning one; a 304
    /// means the data was already identical and counts as success.
    pub fn update_sidecar(&self, entity: &mut PageEntity) -> ClientResult<bool> {
        self.ensure_owns(entity)?;
        let id = entity
            .id()
            .ok_or_else(|| ClientError::usage("entity has no id"))?;
        let data = entity
            .scaffold()
            .filter(|data| !data.is_empty())
            .ok_or_else(|| {
                ClientError::usage("no sidecar data loaded; fetch the form record first")
            })?;

        let body = match data.to_json() {
            Ok(body) => body,
            Err(err) => {
                self.record_failure("update sidecar", &format!("encode failed: {err}"));
                return Ok(false);
            }
        };
        let request = HttpRequest::new(HttpMethod::Put, self.inner.config.scaffold_url(id))
            .with_json_body(body);
        let Some(response) = self.send(request, "update sidecar") else {
            return Ok(false);
        };
        match response.status {
            200 => {
                if entity.version().is_some() {
                    entity.bump_version()?;
                }
                entity.clear_scaffold_dirty();
                Ok(true)
            }
            // Not modified: the server already holds identical data.
            304 => {
                entity.clear_scaffold_dirty();
                Ok(true)
            }
            _ => {
                self.record_status_failure("update sidecar", &response);
                Ok(false)
            }
        }
    }

    /// Creates the page on the server.
    ///
    /// On success the entity adopts the server-assigned id and version and
    /// becomes current. Labels carried by the entity are pushed immediately
    /// afterwards; the API cannot set labels in the creation request.
    pub fn create(&self, entity: &mut PageEntity) -> ClientResult<bool> {
        self.ensure_owns(entity)?;
        if entity.id().is_some() {
            return Err(ClientError::usage("entity already has an id"));
        }
        if entity.parent_id().is_none() {
            return Err(ClientError::validation("entity has no parent"));
        }
        let payload = entity.write_payload(true, false)?;

        let Some(body) = self.encode_payload(&payload, "create page") else {
            return Ok(false);
        };
        let request = HttpRequest::new(HttpMethod::Post, self.inner.config.content_url())
            .with_json_body(body);
        let Some(response) = self.send(request, "create page") else {
            return Ok(false);
        };
        if response.status != 200 {
            self.record_status_failure("create page", &response);
            return Ok(false);
        }

        let remote = match RemotePage::from_json(&response.body) {
            Ok(remote) => remote,
            Err(err) => {
                self.record_failure("create page", &format!("decode failed: {err}"));
                return Ok(false);
            }
        };
        let (Some(id), Some(version)) = (remote.id, remote.version) else {
            self.record_failure("create page", "response carried no id or version");
            return Ok(false);
        };
        if version.number == 0 {
            self.record_failure("create page", "response carried an invalid version");
            return Ok(false);
        }
        entity.set_id(id)?;
        entity.set_version(version.number)?;
        entity.set_status(PageStatus::Current);

        if entity.labels().is_empty() {
            return Ok(true);
        }
        let names: Vec<LabelName> = entity.labels().iter().cloned().collect();
        let ok = self.send_add_labels(id, &names);
        if ok {
            entity.clear_labels_dirty();
        }
        Ok(ok)
    }

    /// Adds labels to an existing page, mirroring them locally on success.
    pub fn add_labels(&self, entity: &mut PageEntity, names: &[&str]) -> ClientResult<bool> {
        self.ensure_owns(entity)?;
        let id = entity
            .id()
            .ok_or_else(|| ClientError::usage("entity has no id"))?;
        if names.is_empty() {
            return Err(ClientError::validation("no label names given"));
        }
        let parsed: Vec<LabelName> = names
            .iter()
            .map(|name| LabelName::parse(name))
            .collect::<ClientResult<_>>()?;

        let ok = self.send_add_labels(id, &parsed);
        if ok {
            for name in parsed {
                entity.mirror_label_add(name);
            }
        }
        Ok(ok)
    }

    /// Removes one label from an existing page.
    pub fn remove_label(&self, entity: &mut PageEntity, name: &str) -> ClientResult<bool> {
        self.ensure_owns(entity)?;
        let id = entity
            .id()
            .ok_or_else(|| ClientError::usage("entity has no id"))?;
        let name = LabelName::parse(name)?;

        let ok = self.send_remove_label(id, &name);
        if ok {
            entity.mirror_label_remove(&name);
        }
        Ok(ok)
    }

    /// Makes the server's label set equal to the entity's local set.
    ///
    /// The server has no "replace all labels" endpoint, so equality is
    /// reached through the symmetric difference: one remove call per label
    /// present only remotely, one add call per label present only locally.
    /// A failing sub-call never aborts the rest; the result is true only
    /// when every sub-call succeeded.
    pub fn reconcile_labels(&self, entity: &mut PageEntity) -> ClientResult<bool> {
        self.ensure_owns(entity)?;
        let id = entity
            .id()
            .ok_or_else(|| ClientError::usage("entity has no id"))?;

        let url = self.inner.config.label_url(id);
        let Some(response) = self.send(HttpRequest::new(HttpMethod::Get, url), "list labels")
        else {
            return Ok(false);
        };
        if response.status != 200 {
            self.record_status_failure("list labels", &response);
            return Ok(false);
        }
        let remote = match RemoteLabelList::from_json(&response.body) {
            Ok(list) => list,
            Err(err) => {
                self.record_failure("list labels", &format!("decode failed: {err}"));
                return Ok(false);
            }
        };

        let mut server_set = LabelSet::new();
        for label in &remote.results {
            match LabelName::parse(&label.name) {
                Ok(name) => {
                    server_set.insert(name);
                }
                Err(_) => warn!(name = %label.name, "skipping unparseable server label"),
            }
        }

        let to_remove = server_set.difference(entity.labels());
        let to_add = entity.labels().difference(&server_set);
        debug!(
            page = %id,
            remove = to_remove.len(),
            add = to_add.len(),
            "reconciling labels"
        );

        let mut ok = true;
        for name in &to_remove {
            ok &= self.send_remove_label(id, name);
        }
        for name in &to_add {
            ok &= self.send_add_labels(id, std::slice::from_ref(name));
        }
        if ok {
            entity.clear_labels_dirty();
        }
        Ok(ok)
    }

    /// Moves a page to the trash.
    ///
    /// Deleting an already-trashed entity is a usage error, caught before
    /// any network call.
    pub fn delete(&self, entity: &mut PageEntity) -> ClientResult<bool> {
        self.ensure_owns(entity)?;
        let id = entity
            .id()
            .ok_or_else(|| ClientError::usage("entity has no id"))?;
        if entity.status() == PageStatus::Trashed {
            return Err(ClientError::usage("page is already trashed"));
        }

        let request = HttpRequest::new(HttpMethod::Delete, self.inner.config.content_id_url(id));
        let Some(response) = self.send(request, "delete page") else {
            return Ok(false);
        };
        match response.status {
            200 | 204 => {
                entity.set_status(PageStatus::Trashed);
                Ok(true)
            }
            _ => {
                self.record_status_failure("delete page", &response);
                Ok(false)
            }
        }
    }

    // ---- shared plumbing -------------------------------------------------

    fn ensure_owns(&self, entity: &PageEntity) -> ClientResult<()> {
        if entity.is_valid_for(self) {
            Ok(())
        } else {
            Err(ClientError::validation(
                "entity does not belong to this client",
            ))
        }
    }

    /// Paginates a listing endpoint until an empty page terminates it.
    ///
    /// There is no bound beyond natural termination; the server's
    /// pagination contract is trusted.
    fn paginate(
        &self,
        base: &str,
        params: &[(&str, &str)],
        include_content: bool,
    ) -> Option<Vec<PageEntity>> {
        let limit = self.inner.config.page_size;
        let mut start: u64 = 0;
        let mut entities = Vec::new();

        loop {
            let mut url = format!(
                "{base}?start={start}&limit={limit}&expand={}",
                expand(include_content)
            );
            for (key, value) in params {
                url.push('&');
                url.push_str(key);
                url.push('=');
                url.push_str(&encode(value));
            }

            let response = self.send(HttpRequest::new(HttpMethod::Get, url), "list pages")?;
            if response.status != 200 {
                self.record_status_failure("list pages", &response);
                return None;
            }
            let page = match ResultsPage::from_json(&response.body) {
                Ok(page) => page,
                Err(err) => {
                    self.record_failure("list pages", &format!("decode failed: {err}"));
                    return None;
                }
            };
            if page.results.is_empty() {
                break;
            }
            start += page.results.len() as u64;
            entities.extend(
                page.results
                    .into_iter()
                    .map(|remote| self.entity_from_remote(remote)),
            );
        }
        Some(entities)
    }

    fn send_add_labels(&self, id: PageId, names: &[LabelName]) -> bool {
        let payload: Vec<WriteLabel> = names
            .iter()
            .map(|name| WriteLabel {
                prefix: LABEL_PREFIX,
                name: name.as_str().to_string(),
            })
            .collect();
        let body = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(err) => {
                self.record_failure("add labels", &format!("encode failed: {err}"));
                return false;
            }
        };
        let request = HttpRequest::new(HttpMethod::Post, self.inner.config.label_url(id))
            .with_json_body(body);
        let Some(response) = self.send(request, "add labels") else {
            return false;
        };
        if response.status == 200 {
            true
        } else {
            self.record_status_failure("add labels", &response);
            false
        }
    }

    fn send_remove_label(&self, id: PageId, name: &LabelName) -> bool {
        let url = format!(
            "{}?name={}",
            self.inner.config.label_url(id),
            encode(name.as_str())
        );
        let Some(response) = self.send(HttpRequest::new(HttpMethod::Delete, url), "remove label")
        else {
            return false;
        };
        if response.status == 204 {
            true
        } else {
            self.record_status_failure("remove label", &response);
            false
        }
    }

    fn encode_payload<T: serde::Serialize>(&self, payload: &T, context: &str) -> Option<String> {
        match serde_json::to_string(payload) {
            Ok(body) => Some(body),
            Err(err) => {
                self.record_failure(context, &format!("encode failed: {err}"));
                None
            }
        }
    }

    fn send(&self, request: HttpRequest, context: &str) -> Option<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "dispatching request");
        match self.inner.http.execute(&request) {
            Ok(response) => Some(response),
            Err(message) => {
                self.record_failure(context, &message);
                None
            }
        }
    }

    fn record_failure(&self, context: &str, detail: &str) {
        error!(context, detail, "remote operation failed");
        *self.inner.last_error.write() = Some(format!("{context}: {detail}"));
    }

    fn record_status_failure(&self, context: &str, response: &HttpResponse) {
        let body = response.body.as_str();
        let mut end = body.len().min(200);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        self.record_failure(
            context,
            &format!("unexpected status {}: {}", response.status, &body[..end]),
        );
    }
}
