use std::collections::HashMap;

use crate::error::DefinitionError;

use super::definition::TileDefinition;

/// Registry mapping tile type ids to their definitions, in registration order.
#[derive(Debug, Default, Clone)]
pub struct TileRegistry {
    order: Vec<String>,
    entries: HashMap<String, TileDefinition>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: TileDefinition) -> Result<(), DefinitionError> {
        definition.validate()?;
        let type_id = definition.type_id().to_string();
        if self.entries.contains_key(&type_id) {
            return Err(DefinitionError::Duplicate(type_id));
        }
        self.order.push(type_id.clone());
        self.entries.insert(type_id, definition);
        Ok(())
    }

    pub fn with(mut self, definition: TileDefinition) -> Result<Self, DefinitionError> {
        self.register(definition)?;
        Ok(self)
    }

    /// Register a loaded definition, or an unavailable placeholder when loading failed.
    pub fn register_or_unavailable(
        &mut self,
        type_id: &str,
        loaded: Result<TileDefinition, String>,
    ) -> Result<(), DefinitionError> {
        match loaded {
            Ok(definition) => self.register(definition),
            Err(reason) => self.register(TileDefinition::unavailable(type_id, reason)),
        }
    }

    pub fn get(&self, type_id: &str) -> Option<&TileDefinition> {
        self.entries.get(type_id)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.entries.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileDefinition> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Definitions offered by the tile manager.
    pub fn listed(&self) -> impl Iterator<Item = &TileDefinition> {
        self.iter().filter(|definition| definition.is_listed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(type_id: &str) -> TileDefinition {
        TileDefinition::from_fn(type_id, |_host, _tile, _ctx| Ok(()))
    }

    #[test]
    fn register_rejects_duplicates_and_empty_ids() {
        let mut registry = TileRegistry::new();
        registry.register(noop("clock")).unwrap();
        assert_eq!(
            registry.register(noop("clock")).unwrap_err(),
            DefinitionError::Duplicate("clock".into())
        );
        assert_eq!(
            registry.register(noop("  ")).unwrap_err(),
            DefinitionError::EmptyTypeId
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_rejects_zero_default_size() {
        let mut registry = TileRegistry::new();
        let err = registry
            .register(noop("wide").with_default_size(0, 1))
            .unwrap_err();
        assert!(matches!(err, DefinitionError::ZeroSize { .. }));
    }

    #[test]
    fn iteration_follows_registration_order() {
        let registry = TileRegistry::new()
            .with(noop("b"))
            .and_then(|r| r.with(noop("a")))
            .and_then(|r| r.with(noop("c").unlisted()))
            .unwrap();
        let all: Vec<_> = registry.iter().map(|d| d.type_id()).collect();
        assert_eq!(all, vec!["b", "a", "c"]);
        let listed: Vec<_> = registry.listed().map(|d| d.type_id()).collect();
        assert_eq!(listed, vec!["b", "a"]);
    }

    #[test]
    fn failed_load_registers_unlisted_placeholder() {
        let mut registry = TileRegistry::new();
        registry
            .register_or_unavailable("radar", Err("module missing".into()))
            .unwrap();
        let definition = registry.get("radar").unwrap();
        assert_eq!(definition.label(), "Unavailable Tile");
        assert!(!definition.is_listed());
        assert!(definition.create_initial_config().is_empty());
    }
}
