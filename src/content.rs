use crate::errors::{ContentError, ContentResult};
use schema::{
    standard_status_definitions, ClassDefinition, ContentPack, EffectKind, FightEffect,
    SkillDescriptor, StatusDefinition, UnitTemplate,
};
use std::collections::HashMap;
use std::path::Path;

/// Indexed, read-only view over a `ContentPack`. Lookups return `None` for
/// unknown ids; callers skip the step that needed them.
#[derive(Debug, Clone)]
pub struct ContentLibrary {
    classes: HashMap<String, ClassDefinition>,
    statuses: HashMap<EffectKind, StatusDefinition>,
    units: HashMap<String, UnitTemplate>,
    fight_effects: HashMap<String, FightEffect>,
}

impl Default for ContentLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentLibrary {
    /// An empty library holding only the standard status definitions.
    pub fn new() -> Self {
        let statuses = standard_status_definitions()
            .into_iter()
            .map(|definition| (definition.kind, definition))
            .collect();
        Self {
            classes: HashMap::new(),
            statuses,
            units: HashMap::new(),
            fight_effects: HashMap::new(),
        }
    }

    /// Build a library from a pack. Status definitions in the pack override
    /// the standard ones.
    pub fn from_pack(pack: ContentPack) -> Self {
        let mut library = Self::new();
        for class in pack.classes {
            library.insert_class(class);
        }
        for status in pack.statuses {
            library.insert_status(status);
        }
        for unit in pack.units {
            library.insert_unit(unit);
        }
        for effect in pack.fight_effects {
            library.fight_effects.insert(effect.name.clone(), effect);
        }
        library
    }

    pub fn from_ron_str(text: &str) -> ContentResult<Self> {
        let pack: ContentPack =
            ron::from_str(text).map_err(|e| ContentError::Malformed(e.to_string()))?;
        Ok(Self::from_pack(pack))
    }

    pub fn load_file(path: impl AsRef<Path>) -> ContentResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ContentError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_ron_str(&text)
    }

    pub fn from_bundle(bytes: &[u8]) -> ContentResult<Self> {
        let pack = ContentPack::from_bundle(bytes).map_err(|e| ContentError::Bundle(e.to_string()))?;
        Ok(Self::from_pack(pack))
    }

    /// Export the library as a pack with every table sorted by id.
    pub fn to_pack(&self) -> ContentPack {
        let mut classes: Vec<_> = self.classes.values().cloned().collect();
        classes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut statuses: Vec<_> = self.statuses.values().cloned().collect();
        statuses.sort_by_key(|s| s.kind);
        let mut units: Vec<_> = self.units.values().cloned().collect();
        units.sort_by(|a, b| a.id.cmp(&b.id));
        let mut fight_effects: Vec<_> = self.fight_effects.values().cloned().collect();
        fight_effects.sort_by(|a, b| a.name.cmp(&b.name));
        ContentPack {
            classes,
            statuses,
            units,
            fight_effects,
        }
    }

    pub fn to_bundle(&self) -> ContentResult<Vec<u8>> {
        self.to_pack()
            .to_bundle()
            .map_err(|e| ContentError::Bundle(e.to_string()))
    }

    pub fn insert_class(&mut self, class: ClassDefinition) {
        self.classes.insert(class.id.clone(), class);
    }

    pub fn insert_status(&mut self, status: StatusDefinition) {
        self.statuses.insert(status.kind, status);
    }

    pub fn insert_unit(&mut self, unit: UnitTemplate) {
        self.units.insert(unit.id.clone(), unit);
    }

    pub fn class(&self, id: &str) -> Option<&ClassDefinition> {
        self.classes.get(id)
    }

    pub fn status(&self, kind: EffectKind) -> Option<&StatusDefinition> {
        self.statuses.get(&kind)
    }

    pub fn unit(&self, id: &str) -> Option<&UnitTemplate> {
        self.units.get(id)
    }

    pub fn fight_effect(&self, name: &str) -> Option<&FightEffect> {
        self.fight_effects.get(name)
    }

    pub fn unit_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.units.keys().map(String::as_str).collect();
        ids.sort();
        ids
    }

    /// Case-insensitive skill search across every unit template.
    pub fn find_skill(&self, name: &str) -> Option<(&UnitTemplate, &SkillDescriptor)> {
        let mut units: Vec<&UnitTemplate> = self.units.values().collect();
        units.sort_by(|a, b| a.id.cmp(&b.id));
        units.into_iter().find_map(|unit| {
            unit.skills
                .iter()
                .find(|skill| skill.name.eq_ignore_ascii_case(name))
                .map(|skill| (unit, skill))
        })
    }
}
