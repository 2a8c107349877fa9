//! The in-memory page entity and its change tracking.

use crate::client::{ClientInner, SyncClient};
use chrono::{DateTime, FixedOffset};
use pagesync_protocol::wire::{
    RemotePage, RemoteRestriction, WriteAncestor, WriteBody, WriteContent, WritePage, WriteSpace,
    WriteVersion,
};
use pagesync_protocol::{
    ClientError, ClientResult, LabelName, LabelSet, PageId, ScaffoldData,
};
use std::sync::Weak;

/// Lifecycle status of a page on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// The page is live.
    Current,
    /// The page has been moved to the trash.
    Trashed,
}

impl PageStatus {
    fn from_wire(status: Option<&str>) -> Self {
        match status {
            Some("trashed") => PageStatus::Trashed,
            _ => PageStatus::Current,
        }
    }
}

/// Who last modified a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    /// Login name.
    pub username: String,
    /// Human-readable name.
    pub display_name: String,
}

/// Per-field-group dirty flags.
///
/// A set flag means "possibly diverged from the last confirmed server
/// state"; a clear flag is a strict guarantee of "identical to the server
/// as of the last version sync".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    /// Title changed locally.
    pub title: bool,
    /// Space key changed locally.
    pub collection_key: bool,
    /// Parent changed locally.
    pub parent: bool,
    /// Body changed locally.
    pub body: bool,
    /// Label set changed locally.
    pub labels: bool,
    /// Sidecar form data changed locally.
    pub scaffold: bool,
}

/// A mutable local projection of one remote page resource.
///
/// An entity mirrors the server state it was decoded from and tracks which
/// field groups have been mutated since. Write operations go through the
/// [`SyncClient`] that created the entity; passing an entity to any other
/// client is rejected.
#[derive(Debug, Clone)]
pub struct PageEntity {
    origin: Weak<ClientInner>,
    id: Option<PageId>,
    status: PageStatus,
    title: Option<String>,
    collection_key: Option<String>,
    version: Option<u32>,
    body: Option<String>,
    rendered_view: Option<String>,
    parent_id: Option<PageId>,
    ancestors: Vec<PageEntity>,
    labels: LabelSet,
    scaffold: Option<ScaffoldData>,
    user_read_restrictions: Vec<String>,
    group_read_restrictions: Vec<String>,
    user_write_restrictions: Vec<String>,
    group_write_restrictions: Vec<String>,
    modified_by: Option<UserRef>,
    modified_at: Option<DateTime<FixedOffset>>,
    dirty: DirtyFlags,
}

impl PageEntity {
    /// Creates an empty entity stamped with its originating client.
    pub(crate) fn bare(origin: Weak<ClientInner>) -> Self {
        Self {
            origin,
            id: None,
            status: PageStatus::Current,
            title: None,
            collection_key: None,
            version: None,
            body: None,
            rendered_view: None,
            parent_id: None,
            ancestors: Vec::new(),
            labels: LabelSet::new(),
            scaffold: None,
            user_read_restrictions: Vec::new(),
            group_read_restrictions: Vec::new(),
            user_write_restrictions: Vec::new(),
            group_write_restrictions: Vec::new(),
            modified_by: None,
            modified_at: None,
            dirty: DirtyFlags::default(),
        }
    }

    /// Builds an entity from a decoded server response.
    ///
    /// Ancestors are decoded recursively with the same origin. The parent
    /// id is taken from the last ancestor: the server orders the chain from
    /// the root down to the immediate parent.
    pub(crate) fn from_remote(origin: &Weak<ClientInner>, remote: RemotePage) -> Self {
        let mut entity = Self::bare(origin.clone());

        entity.id = remote.id;
        entity.status = PageStatus::from_wire(remote.status.as_deref());
        entity.title = remote.title;
        entity.collection_key = remote.space.map(|s| s.key);
        entity.version = remote.version.map(|v| v.number);

        if let Some(body) = remote.body {
            entity.body = body.storage.map(|c| c.value);
            entity.rendered_view = body.styled_view.map(|c| c.value);
        }

        for raw in remote
            .metadata
            .as_ref()
            .and_then(|m| m.labels.as_ref())
            .map(|l| l.results.as_slice())
            .unwrap_or_default()
        {
            if let Ok(name) = LabelName::parse(&raw.name) {
                entity.labels.insert(name);
            }
        }

        if let Some(updated) = remote.history.and_then(|h| h.last_updated) {
            entity.modified_by = updated.by.map(|user| UserRef {
                username: user.username.unwrap_or_default(),
                display_name: user.display_name.unwrap_or_default(),
            });
            entity.modified_at = updated
                .when
                .as_deref()
                .and_then(|when| DateTime::parse_from_rfc3339(when).ok());
        }

        if let Some(restrictions) = remote.restrictions {
            let (users, groups) = split_subjects(restrictions.read.as_ref());
            entity.user_read_restrictions = users;
            entity.group_read_restrictions = groups;
            let (users, groups) = split_subjects(restrictions.update.as_ref());
            entity.user_write_restrictions = users;
            entity.group_write_restrictions = groups;
        }

        entity.ancestors = remote
            .ancestors
            .into_iter()
            .map(|ancestor| Self::from_remote(origin, ancestor))
            .collect();
        entity.parent_id = entity.ancestors.last().and_then(|a| a.id);

        entity
    }

    // ---- accessors -------------------------------------------------------

    /// Server-assigned id, if the entity has been created.
    #[must_use]
    pub fn id(&self) -> Option<PageId> {
        self.id
    }

    /// Lifecycle status.
    #[must_use]
    pub fn status(&self) -> PageStatus {
        self.status
    }

    /// Page title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Space key of the containing collection.
    #[must_use]
    pub fn collection_key(&self) -> Option<&str> {
        self.collection_key.as_deref()
    }

    /// Last known server version number.
    #[must_use]
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Body in storage-format markup.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Server-computed rendering of the body. Never written back.
    #[must_use]
    pub fn rendered_view(&self) -> Option<&str> {
        self.rendered_view.as_deref()
    }

    /// Id of the hierarchical parent.
    #[must_use]
    pub fn parent_id(&self) -> Option<PageId> {
        self.parent_id
    }

    /// Ancestor chain, root first, immediate parent last.
    #[must_use]
    pub fn ancestors(&self) -> &[PageEntity] {
        &self.ancestors
    }

    /// Current local label set.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Sidecar form data, if loaded.
    #[must_use]
    pub fn scaffold(&self) -> Option<&ScaffoldData> {
        self.scaffold.as_ref()
    }

    /// Users the page is read-restricted to at fetch time.
    #[must_use]
    pub fn user_read_restrictions(&self) -> &[String] {
        &self.user_read_restrictions
    }

    /// Groups the page is read-restricted to at fetch time.
    #[must_use]
    pub fn group_read_restrictions(&self) -> &[String] {
        &self.group_read_restrictions
    }

    /// Users the page is write-restricted to at fetch time.
    #[must_use]
    pub fn user_write_restrictions(&self) -> &[String] {
        &self.user_write_restrictions
    }

    /// Groups the page is write-restricted to at fetch time.
    #[must_use]
    pub fn group_write_restrictions(&self) -> &[String] {
        &self.group_write_restrictions
    }

    /// Who last modified the page, when history was expanded.
    #[must_use]
    pub fn modified_by(&self) -> Option<&UserRef> {
        self.modified_by.as_ref()
    }

    /// When the page was last modified, when history was expanded.
    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<FixedOffset>> {
        self.modified_at
    }

    /// Current dirty-flag summary.
    #[must_use]
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    /// True if any page-level field (title, space, parent, body) is dirty.
    #[must_use]
    pub fn is_page_dirty(&self) -> bool {
        self.dirty.title || self.dirty.collection_key || self.dirty.parent || self.dirty.body
    }

    /// True if anything at all is dirty.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.is_page_dirty() || self.dirty.labels || self.dirty.scaffold
    }

    // ---- mutators --------------------------------------------------------

    /// Sets the server-assigned id. Ids are set once: changing an already
    /// assigned id to a different value is a usage error.
    pub fn set_id(&mut self, id: PageId) -> ClientResult<()> {
        match self.id {
            Some(existing) if existing != id => Err(ClientError::usage(format!(
                "page id is immutable: {existing} cannot become {id}"
            ))),
            _ => {
                self.id = Some(id);
                Ok(())
            }
        }
    }

    /// Sets the title. The title dirty flag is raised only if the value
    /// actually changed.
    pub fn set_title(&mut self, title: &str) -> ClientResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ClientError::validation("title must be a non-empty string"));
        }
        if self.title.as_deref() != Some(title) {
            self.title = Some(title.to_string());
            self.dirty.title = true;
        }
        Ok(())
    }

    /// Sets the space key.
    pub fn set_collection_key(&mut self, key: &str) -> ClientResult<()> {
        let key = validate_space_key(key)?;
        if self.collection_key.as_deref() != Some(key.as_str()) {
            self.collection_key = Some(key);
            self.dirty.collection_key = true;
        }
        Ok(())
    }

    /// Sets the parent page.
    pub fn set_parent(&mut self, parent: PageId) {
        if self.parent_id != Some(parent) {
            self.parent_id = Some(parent);
            self.dirty.parent = true;
        }
    }

    /// Sets the body in storage-format markup.
    pub fn set_body(&mut self, body: &str) {
        if self.body.as_deref() != Some(body) {
            self.body = Some(body.to_string());
            self.dirty.body = true;
        }
    }

    /// Sets the version number to a server-confirmed value.
    ///
    /// When the new version differs from the current one the title, space,
    /// parent, and body dirty flags are cleared: a confirmed version means
    /// the local edit set was accepted (or is stale and must be re-derived).
    /// Label and scaffold dirtiness is untouched; those reconcile through
    /// separate calls with their own version semantics.
    pub fn set_version(&mut self, version: u32) -> ClientResult<()> {
        if version == 0 {
            return Err(ClientError::validation(
                "version number must be a positive integer",
            ));
        }
        if self.version != Some(version) {
            self.version = Some(version);
            self.dirty.title = false;
            self.dirty.collection_key = false;
            self.dirty.parent = false;
            self.dirty.body = false;
        }
        Ok(())
    }

    /// Increments the version number by one.
    ///
    /// Used after a sidecar-only write succeeds: the server records that as
    /// a new content version without returning the full entity.
    pub fn bump_version(&mut self) -> ClientResult<()> {
        match self.version {
            Some(version) => {
                self.version = Some(version + 1);
                Ok(())
            }
            None => Err(ClientError::usage(
                "cannot increment version before one is set",
            )),
        }
    }

    /// Adds a label. Idempotent; the label dirty flag is raised only when
    /// the set actually changed.
    pub fn add_label(&mut self, name: &str) -> ClientResult<()> {
        let name = LabelName::parse(name)?;
        if self.labels.insert(name) {
            self.dirty.labels = true;
        }
        Ok(())
    }

    /// Removes a label. Removing an absent label is a no-op that leaves the
    /// dirty flag alone.
    pub fn remove_label(&mut self, name: &str) -> ClientResult<()> {
        let name = LabelName::parse(name)?;
        if self.labels.remove(&name) {
            self.dirty.labels = true;
        }
        Ok(())
    }

    /// Returns true if the (normalized) label is present.
    #[must_use]
    pub fn has_label(&self, name: &str) -> bool {
        LabelName::parse(name)
            .map(|name| self.labels.contains(&name))
            .unwrap_or(false)
    }

    /// Looks up a sidecar form field value by name.
    #[must_use]
    pub fn scaffold_value(&self, name: &str) -> Option<&str> {
        self.scaffold.as_ref().and_then(|data| data.value(name))
    }

    /// Sets a sidecar form field, creating it if absent. `None` stores the
    /// empty string. Any call marks the scaffold dirty.
    pub fn set_scaffold_value(&mut self, name: &str, value: Option<&str>) {
        self.scaffold
            .get_or_insert_with(ScaffoldData::new)
            .set_value(name, value);
        self.dirty.scaffold = true;
    }

    /// Attaches a sidecar record fetched from the server and clears the
    /// scaffold dirty flag.
    pub fn install_scaffold(&mut self, data: ScaffoldData) {
        self.scaffold = Some(data);
        self.dirty.scaffold = false;
    }

    /// Returns true if this entity was created by `client`.
    ///
    /// Every write-path entry point on [`SyncClient`] rejects entities that
    /// fail this check; it catches entities decoded by one client
    /// configuration being pushed through another.
    #[must_use]
    pub fn is_valid_for(&self, client: &SyncClient) -> bool {
        self.origin
            .upgrade()
            .map(|inner| client.shares_inner(&inner))
            .unwrap_or(false)
    }

    // ---- serialization ---------------------------------------------------

    /// Builds the request payload for a create or update call.
    ///
    /// Updates carry the id and `version.number = current + 1`; suppressing
    /// notifications marks that version block as a minor edit. Create
    /// payloads never carry an id or version, even if the entity has them.
    pub fn write_payload(
        &self,
        is_create: bool,
        suppress_notifications: bool,
    ) -> ClientResult<WritePage> {
        let title = self
            .title
            .clone()
            .ok_or_else(|| ClientError::validation("entity has no title"))?;
        let key = self
            .collection_key
            .clone()
            .ok_or_else(|| ClientError::validation("entity has no space key"))?;

        let (id, version) = if is_create {
            (None, None)
        } else {
            let id = self
                .id
                .ok_or_else(|| ClientError::validation("entity has no id"))?;
            let current = self
                .version
                .ok_or_else(|| ClientError::validation("entity has no version number"))?;
            let version = WriteVersion {
                number: current + 1,
                minor_edit: suppress_notifications,
            };
            (Some(id), Some(version))
        };

        Ok(WritePage {
            id,
            content_type: "page",
            title,
            space: WriteSpace { key },
            version,
            body: self.body.clone().map(|value| WriteBody {
                storage: WriteContent {
                    value,
                    representation: "storage",
                },
            }),
            ancestors: self
                .parent_id
                .map(|id| vec![WriteAncestor { id }]),
        })
    }

    // ---- client-side bookkeeping ----------------------------------------

    pub(crate) fn set_status(&mut self, status: PageStatus) {
        self.status = status;
    }

    /// Mirrors a server-confirmed label addition without touching dirtiness.
    pub(crate) fn mirror_label_add(&mut self, name: LabelName) {
        self.labels.insert(name);
    }

    /// Mirrors a server-confirmed label removal without touching dirtiness.
    pub(crate) fn mirror_label_remove(&mut self, name: &LabelName) {
        self.labels.remove(name);
    }

    pub(crate) fn clear_labels_dirty(&mut self) {
        self.dirty.labels = false;
    }

    pub(crate) fn clear_scaffold_dirty(&mut self) {
        self.dirty.scaffold = false;
    }

    fn origin(&self) -> ClientResult<SyncClient> {
        self.origin
            .upgrade()
            .map(SyncClient::from_inner)
            .ok_or_else(|| ClientError::usage("originating client no longer exists"))
    }

    // ---- delegating convenience methods ----------------------------------

    /// Saves page-level changes through the originating client.
    ///
    /// A clean entity is a no-op success; no request is made.
    pub fn save(&mut self, suppress_notifications: bool) -> ClientResult<bool> {
        let client = self.origin()?;
        if !self.is_page_dirty() {
            return Ok(true);
        }
        client.update(self, suppress_notifications)
    }

    /// Reconciles local labels to the server if the label set is dirty.
    pub fn save_labels(&mut self) -> ClientResult<bool> {
        let client = self.origin()?;
        if !self.dirty.labels {
            return Ok(true);
        }
        client.reconcile_labels(self)
    }

    /// Saves sidecar form data if it is dirty.
    pub fn save_sidecar(&mut self) -> ClientResult<bool> {
        let client = self.origin()?;
        if !self.dirty.scaffold {
            return Ok(true);
        }
        client.update_sidecar(self)
    }

    /// Creates the page through the originating client.
    pub fn create(&mut self) -> ClientResult<bool> {
        let client = self.origin()?;
        client.create(self)
    }

    /// Moves the page to the trash through the originating client.
    pub fn delete(&mut self) -> ClientResult<bool> {
        let client = self.origin()?;
        client.delete(self)
    }

    /// Runs page save, then label save, then sidecar save.
    ///
    /// Short-circuits to failure on the first failing step; later steps are
    /// skipped, not attempted. Steps that already ran stay applied.
    pub fn sync_all(&mut self, suppress_notifications: bool) -> ClientResult<bool> {
        if !self.save(suppress_notifications)? {
            return Ok(false);
        }
        if !self.save_labels()? {
            return Ok(false);
        }
        self.save_sidecar()
    }
}

/// Validates a space key: non-empty, alphanumerics plus `~ _ -` (the tilde
/// covers personal spaces). Returns the trimmed key.
pub(crate) fn validate_space_key(key: &str) -> ClientResult<String> {
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '~' | '_' | '-'))
    {
        return Err(ClientError::validation(format!("invalid space key: {key:?}")));
    }
    Ok(key.to_string())
}

fn split_subjects(restriction: Option<&RemoteRestriction>) -> (Vec<String>, Vec<String>) {
    let Some(subjects) = restriction.and_then(|r| r.restrictions.as_ref()) else {
        return (Vec::new(), Vec::new());
    };
    let collect = |list: Option<&pagesync_protocol::wire::RemoteSubjectList>| {
        list.map(|l| {
            l.results
                .iter()
                .filter_map(|subject| subject.identifier().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
    };
    (
        collect(subjects.user.as_ref()),
        collect(subjects.group.as_ref()),
    )
}
