//! JSON wire model for the page REST API.
//!
//! Read-side DTOs mirror the server's response shapes; unknown fields are
//! always ignored because the server adds expansions freely. Write-side
//! payloads are separate structs so that create and update requests only
//! ever contain the fields the endpoint accepts.

use crate::id::PageId;
use serde::{Deserialize, Serialize};

/// A page resource as returned by the server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemotePage {
    /// Server-assigned identifier.
    pub id: Option<PageId>,
    /// Lifecycle status, e.g. `"current"` or `"trashed"`.
    pub status: Option<String>,
    /// Page title.
    pub title: Option<String>,
    /// Containing space.
    pub space: Option<RemoteSpace>,
    /// Version record.
    pub version: Option<RemoteVersion>,
    /// Body renderings.
    pub body: Option<RemoteBody>,
    /// Label metadata, present when expanded.
    pub metadata: Option<RemoteMetadata>,
    /// Modification history, present when expanded.
    pub history: Option<RemoteHistory>,
    /// Access restrictions, present when expanded.
    pub restrictions: Option<RemoteRestrictions>,
    /// Ancestor chain ordered root first, immediate parent last.
    #[serde(default)]
    pub ancestors: Vec<RemotePage>,
}

impl RemotePage {
    /// Decodes a single page from a response body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Returns the raw label names carried in the metadata expansion.
    #[must_use]
    pub fn label_names(&self) -> Vec<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.labels.as_ref())
            .map(|l| l.results.iter().map(|r| r.name.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Space reference inside a page resource.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSpace {
    /// Space key.
    pub key: String,
}

/// Version record inside a page resource.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteVersion {
    /// Monotonically increasing version number.
    pub number: u32,
}

/// Body renderings inside a page resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteBody {
    /// Native storage-format markup.
    pub storage: Option<RemoteContent>,
    /// Server-computed rendering, never written back.
    pub styled_view: Option<RemoteContent>,
}

/// A single rendering of the page body.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteContent {
    /// The markup or markup fragment.
    pub value: String,
}

/// Metadata expansion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteMetadata {
    /// Label list.
    pub labels: Option<RemoteLabelList>,
}

/// A list of labels, also the response shape of the label-list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteLabelList {
    /// The labels.
    #[serde(default)]
    pub results: Vec<RemoteLabel>,
}

impl RemoteLabelList {
    /// Decodes a label-list response body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// One label entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteLabel {
    /// Label namespace; effectively always `"global"`.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Label name as stored by the server.
    pub name: String,
}

/// History expansion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteHistory {
    /// Most recent modification.
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<RemoteLastUpdated>,
}

/// Who last touched the page and when.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteLastUpdated {
    /// The modifying user.
    pub by: Option<RemoteUser>,
    /// ISO-8601 modification timestamp.
    pub when: Option<String>,
}

/// A user reference.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    /// Login name.
    pub username: Option<String>,
    /// Human-readable name.
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

/// Restrictions expansion, keyed by operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteRestrictions {
    /// Read restrictions.
    pub read: Option<RemoteRestriction>,
    /// Write restrictions.
    pub update: Option<RemoteRestriction>,
}

/// Restriction subjects for one operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteRestriction {
    /// Subject lists.
    pub restrictions: Option<RemoteSubjects>,
}

/// User and group subject lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteSubjects {
    /// Restricted-to users.
    pub user: Option<RemoteSubjectList>,
    /// Restricted-to groups.
    pub group: Option<RemoteSubjectList>,
}

/// A wrapped subject list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteSubjectList {
    /// The subjects.
    #[serde(default)]
    pub results: Vec<RemoteSubject>,
}

/// One restriction subject, either a user or a group.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSubject {
    /// Login name, for user subjects.
    pub username: Option<String>,
    /// Group name, for group subjects.
    pub name: Option<String>,
}

impl RemoteSubject {
    /// Returns whichever identifier the subject carries.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.username.as_deref().or(self.name.as_deref())
    }
}

/// Paginated wrapper around search and listing results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsPage {
    /// The decoded page resources.
    #[serde(default)]
    pub results: Vec<RemotePage>,
    /// Number of results in this page.
    #[serde(default)]
    pub size: u64,
}

impl ResultsPage {
    /// Decodes a search or listing response body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Write payload for create and update requests.
#[derive(Debug, Clone, Serialize)]
pub struct WritePage {
    /// Present only on updates; the server assigns ids at creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<PageId>,
    /// Always `"page"`.
    #[serde(rename = "type")]
    pub content_type: &'static str,
    /// Page title.
    pub title: String,
    /// Containing space.
    pub space: WriteSpace,
    /// Present only on updates; carries the optimistic next version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<WriteVersion>,
    /// Present only when the caller has body content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<WriteBody>,
    /// Present only when a parent is set; a single-element list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ancestors: Option<Vec<WriteAncestor>>,
}

/// Space reference in a write payload.
#[derive(Debug, Clone, Serialize)]
pub struct WriteSpace {
    /// Space key.
    pub key: String,
}

/// Version block in an update payload.
#[derive(Debug, Clone, Serialize)]
pub struct WriteVersion {
    /// The optimistic next version, current + 1.
    pub number: u32,
    /// Marks the edit as minor, which suppresses watcher notifications.
    #[serde(rename = "minorEdit")]
    pub minor_edit: bool,
}

/// Body block in a write payload. Only the storage rendering is writable.
#[derive(Debug, Clone, Serialize)]
pub struct WriteBody {
    /// Storage-format markup.
    pub storage: WriteContent,
}

/// Storage content in a write payload.
#[derive(Debug, Clone, Serialize)]
pub struct WriteContent {
    /// The markup.
    pub value: String,
    /// Always `"storage"`.
    pub representation: &'static str,
}

/// Parent reference in a write payload.
#[derive(Debug, Clone, Serialize)]
pub struct WriteAncestor {
    /// The direct parent's id.
    pub id: PageId,
}

/// Label entry in an add-labels payload.
#[derive(Debug, Clone, Serialize)]
pub struct WriteLabel {
    /// Label namespace, always `"global"`.
    pub prefix: &'static str,
    /// Normalized label name.
    pub name: String,
}
