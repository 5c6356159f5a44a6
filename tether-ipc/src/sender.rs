//! Privileged sender guard
//!
//! Advisory hardening, not a cryptographic boundary: it keeps ordinary page
//! content from driving handlers that only privileged surfaces may use.

use serde::{Deserialize, Serialize};

/// Who sent an inbound message, derived per message and never persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderIdentity {
    /// Extension id the sender claims to belong to
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub declared_id: Option<String>,

    /// URL of the sending document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Whether the sender lives inside a tab
    #[serde(default, rename = "tab")]
    pub has_tab_context: bool,
}

impl SenderIdentity {
    /// An extension surface with no document URL and no tab
    pub fn extension(id: impl Into<String>) -> Self {
        Self {
            declared_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn in_tab(mut self) -> Self {
        self.has_tab_context = true;
        self
    }
}

/// Decide whether `sender` is a trusted extension surface.
pub fn is_privileged(
    sender: Option<&SenderIdentity>,
    expected_id: &str,
    expected_origin_prefix: &str,
) -> bool {
    let Some(sender) = sender else {
        return false;
    };

    if let Some(declared) = sender.declared_id.as_deref() {
        if declared != expected_id {
            return false;
        }
    }

    if let Some(url) = sender.url.as_deref() {
        if url.starts_with(expected_origin_prefix) {
            return true;
        }
    }

    // Background and other internal surfaces carry neither a URL nor a tab
    sender.url.is_none() && !sender.has_tab_context
}

/// `is_privileged` bound to one extension id and origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegedSenderGuard {
    expected_id: String,
    origin_prefix: String,
}

impl PrivilegedSenderGuard {
    pub fn new(expected_id: impl Into<String>, origin_prefix: impl Into<String>) -> Self {
        Self {
            expected_id: expected_id.into(),
            origin_prefix: origin_prefix.into(),
        }
    }

    /// Guard for `chrome-extension://<id>/`
    pub fn for_extension(expected_id: impl Into<String>) -> Self {
        let expected_id = expected_id.into();
        let origin_prefix = format!("chrome-extension://{}/", expected_id);
        Self::new(expected_id, origin_prefix)
    }

    pub fn allows(&self, sender: Option<&SenderIdentity>) -> bool {
        is_privileged(sender, &self.expected_id, &self.origin_prefix)
    }

    pub fn expected_id(&self) -> &str {
        &self.expected_id
    }

    pub fn origin_prefix(&self) -> &str {
        &self.origin_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "X";
    const ORIGIN: &str = "chrome-extension://X/";

    #[test]
    fn test_absent_sender_rejected() {
        assert!(!is_privileged(None, ID, ORIGIN));
    }

    #[test]
    fn test_foreign_url_rejected_even_with_matching_id() {
        let sender = SenderIdentity::extension(ID).with_url("https://evil.example/");
        assert!(!is_privileged(Some(&sender), ID, ORIGIN));
    }

    #[test]
    fn test_internal_surface_accepted() {
        let sender = SenderIdentity::extension(ID);
        assert!(is_privileged(Some(&sender), ID, ORIGIN));
    }

    #[test]
    fn test_mismatched_id_rejected_before_url() {
        let sender = SenderIdentity::extension("Y").with_url("chrome-extension://X/popup.html");
        assert!(!is_privileged(Some(&sender), ID, ORIGIN));
    }

    #[test]
    fn test_extension_page_accepted_without_declared_id() {
        let sender = SenderIdentity::default()
            .with_url("chrome-extension://X/dialog.html")
            .in_tab();
        assert!(is_privileged(Some(&sender), ID, ORIGIN));
    }

    #[test]
    fn test_tab_without_url_rejected() {
        let sender = SenderIdentity::extension(ID).in_tab();
        assert!(!is_privileged(Some(&sender), ID, ORIGIN));
    }

    #[test]
    fn test_guard_builds_origin_from_id() {
        let guard = PrivilegedSenderGuard::for_extension(ID);
        assert_eq!(guard.origin_prefix(), ORIGIN);
        assert!(guard.allows(Some(&SenderIdentity::extension(ID))));
        assert!(!guard.allows(Some(
            &SenderIdentity::default().with_url("https://example.com/").in_tab()
        )));
    }

    #[test]
    fn test_identity_wire_names() {
        let sender: SenderIdentity =
            serde_json::from_value(serde_json::json!({"id": "X"})).unwrap();
        assert_eq!(sender, SenderIdentity::extension("X"));
    }
}
