use serde_json::Value;

use crate::model::{LayoutDocument, TileConfig};

use super::lifecycle::TileLifecycle;

/// Requests a tile raises through its context. The dashboard applies them
/// after the current render pass or timer callback returns.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextRequest {
    /// Shallow-merge `patch` into the instance's config and persist.
    UpdateConfig {
        instance_id: String,
        patch: TileConfig,
    },
    /// Persist and rebuild the surface.
    Rerender,
}

/// Context passed to a tile's render call and its timers.
pub struct TileContext<'a> {
    instance_id: &'a str,
    document: &'a LayoutDocument,
    requests: &'a mut Vec<ContextRequest>,
    lifecycle: &'a mut TileLifecycle,
}

impl<'a> TileContext<'a> {
    pub(crate) fn new(
        instance_id: &'a str,
        document: &'a LayoutDocument,
        requests: &'a mut Vec<ContextRequest>,
        lifecycle: &'a mut TileLifecycle,
    ) -> Self {
        Self {
            instance_id,
            document,
            requests,
            lifecycle,
        }
    }

    pub fn instance_id(&self) -> &str {
        self.instance_id
    }

    /// Shared document, for cross-tile data such as the calendar blob.
    pub fn document(&self) -> &LayoutDocument {
        self.document
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.document.extras.get(key)
    }

    /// Queue a config patch for this tile.
    pub fn update_config(&mut self, patch: TileConfig) {
        self.requests.push(ContextRequest::UpdateConfig {
            instance_id: self.instance_id.to_string(),
            patch,
        });
    }

    pub fn set_config(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let mut patch = TileConfig::new();
        patch.insert(key.into(), value.into());
        self.update_config(patch);
    }

    pub fn request_rerender(&mut self) {
        self.requests.push(ContextRequest::Rerender);
    }

    /// Timers and teardown hooks scoped to this render of the tile.
    pub fn lifecycle(&mut self) -> &mut TileLifecycle {
        self.lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_are_queued_for_the_owning_tile() {
        let mut doc = LayoutDocument::default();
        doc.set_extra("icsCalendar", "BEGIN:VCALENDAR");
        let mut requests = Vec::new();
        let mut lifecycle = TileLifecycle::new("notes-1");
        {
            let mut ctx = TileContext::new("notes-1", &doc, &mut requests, &mut lifecycle);
            assert_eq!(ctx.extra("icsCalendar"), Some(&json!("BEGIN:VCALENDAR")));
            ctx.set_config("text", "hi");
            ctx.request_rerender();
        }
        assert_eq!(requests.len(), 2);
        match &requests[0] {
            ContextRequest::UpdateConfig { instance_id, patch } => {
                assert_eq!(instance_id, "notes-1");
                assert_eq!(patch["text"], json!("hi"));
            }
            other => panic!("unexpected request {other:?}"),
        }
        assert_eq!(requests[1], ContextRequest::Rerender);
    }
}
