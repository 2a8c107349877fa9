//! Sidecar form data ("scaffolding" fields).
//!
//! The form subsystem attaches an ordered list of named fields to a page,
//! versioned independently from the page body. On the wire it is a flat
//! JSON array of `{name, value}` objects with no wrapper; an empty or
//! whitespace-only body decodes as the empty list.

use serde::{Deserialize, Serialize};

/// One named field of the sidecar form record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaffoldField {
    /// Field name, unique within a record.
    pub name: String,
    /// Field value. Empty string for unset fields.
    pub value: String,
}

/// The ordered sidecar record attached to one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaffoldData {
    fields: Vec<ScaffoldField>,
}

impl ScaffoldData {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a record from a response body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        if body.trim().is_empty() {
            return Ok(Self::new());
        }
        let fields: Vec<ScaffoldField> = serde_json::from_str(body)?;
        Ok(Self { fields })
    }

    /// Serializes the record to its flat-array wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.fields)
    }

    /// Looks up a field value by name.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Sets a field value, creating the field if absent.
    ///
    /// `None` stores the empty string, matching the form subsystem's
    /// representation of a cleared field.
    pub fn set_value(&mut self, name: &str, value: Option<&str>) {
        let value = value.unwrap_or("").to_string();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(ScaffoldField {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Keeps only the fields whose names appear in `allow`.
    ///
    /// This is a read-side projection; the server always returns the full
    /// record.
    pub fn retain_names(&mut self, allow: &[&str]) {
        self.fields.retain(|f| allow.contains(&f.name.as_str()));
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the fields in server order.
    pub fn iter(&self) -> impl Iterator<Item = &ScaffoldField> {
        self.fields.iter()
    }
}

impl FromIterator<ScaffoldField> for ScaffoldData {
    fn from_iter<I: IntoIterator<Item = ScaffoldField>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
