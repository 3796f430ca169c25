//! Per-tile settings panel: a common header (label, Delete/Save/Close) plus a
//! type-specific section contributed by the tile definition.

mod controller;

pub use controller::{build_panel, save_panel};

use crate::model::LayoutDocument;

/// Read-only view handed to settings hooks.
pub struct SettingsContext<'a> {
    document: &'a LayoutDocument,
}

impl<'a> SettingsContext<'a> {
    pub fn new(document: &'a LayoutDocument) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &LayoutDocument {
        self.document
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Toggle(bool),
    Choice { options: Vec<String>, selected: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsField {
    pub key: String,
    pub label: String,
    pub value: FieldValue,
}

/// Ordered form that a tile definition fills and later reads back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsHost {
    fields: Vec<SettingsField>,
}

impl SettingsHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, key: &str, label: &str, value: FieldValue) -> &mut Self {
        match self.fields.iter_mut().find(|field| field.key == key) {
            Some(existing) => {
                existing.label = label.to_string();
                existing.value = value;
            }
            None => self.fields.push(SettingsField {
                key: key.to_string(),
                label: label.to_string(),
                value,
            }),
        }
        self
    }

    pub fn add_text(&mut self, key: &str, label: &str, value: impl Into<String>) -> &mut Self {
        self.push(key, label, FieldValue::Text(value.into()))
    }

    pub fn add_number(&mut self, key: &str, label: &str, value: f64) -> &mut Self {
        self.push(key, label, FieldValue::Number(value))
    }

    pub fn add_toggle(&mut self, key: &str, label: &str, value: bool) -> &mut Self {
        self.push(key, label, FieldValue::Toggle(value))
    }

    pub fn add_choice(
        &mut self,
        key: &str,
        label: &str,
        options: &[&str],
        selected: &str,
    ) -> &mut Self {
        let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        let selected = options.iter().position(|o| o == selected).unwrap_or(0);
        self.push(key, label, FieldValue::Choice { options, selected })
    }

    pub fn fields(&self) -> &[SettingsField] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [SettingsField] {
        &mut self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, key: &str) -> Option<&SettingsField> {
        self.fields.iter().find(|field| field.key == key)
    }

    /// Replace a field's value. Returns false when the key is unknown.
    pub fn set(&mut self, key: &str, value: FieldValue) -> bool {
        match self.fields.iter_mut().find(|field| field.key == key) {
            Some(field) => {
                field.value = value;
                true
            }
            None => false,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.field(key).map(|f| &f.value) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Numbers are also read from text fields so free typing works.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.field(key).map(|f| &f.value) {
            Some(FieldValue::Number(n)) => Some(*n),
            Some(FieldValue::Text(text)) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn toggle(&self, key: &str) -> Option<bool> {
        match self.field(key).map(|f| &f.value) {
            Some(FieldValue::Toggle(on)) => Some(*on),
            _ => None,
        }
    }

    pub fn choice(&self, key: &str) -> Option<&str> {
        match self.field(key).map(|f| &f.value) {
            Some(FieldValue::Choice { options, selected }) => {
                options.get(*selected).map(String::as_str)
            }
            _ => None,
        }
    }
}

/// Settings panel attached to every rendered frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPanel {
    pub instance_id: String,
    /// Editable label, committed on save.
    pub label: String,
    pub section: SettingsHost,
    pub has_type_section: bool,
    pub open: bool,
    /// Last failure from building or saving the type section.
    pub error: Option<String>,
}

impl SettingsPanel {
    pub fn new(instance_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            label: label.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_match_field_kinds() {
        let mut host = SettingsHost::new();
        host.add_text("url", "Stream URL", "http://cam")
            .add_number("max", "Max events", 20.0)
            .add_toggle("past", "Show past", false)
            .add_choice("mode", "Layout", &["full", "hud"], "hud");

        assert_eq!(host.text("url"), Some("http://cam"));
        assert_eq!(host.number("max"), Some(20.0));
        assert_eq!(host.toggle("past"), Some(false));
        assert_eq!(host.choice("mode"), Some("hud"));
        assert_eq!(host.toggle("url"), None);
    }

    #[test]
    fn numbers_parse_from_text() {
        let mut host = SettingsHost::new();
        host.add_text("interval", "Interval", " 15 ");
        assert_eq!(host.number("interval"), Some(15.0));
    }

    #[test]
    fn re_adding_a_key_replaces_it() {
        let mut host = SettingsHost::new();
        host.add_toggle("a", "A", false).add_toggle("a", "A2", true);
        assert_eq!(host.len(), 1);
        assert_eq!(host.toggle("a"), Some(true));
        assert!(!host.set("missing", FieldValue::Toggle(true)));
    }
}
