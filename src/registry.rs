//! Class and multiplier registry.
//!
//! Classes live in one flat table keyed by `ClassId`. Base classes own a
//! tiered list of advanced classes keyed by the minimum character level
//! that unlocks them; every advanced entry points back at its base through
//! `parent`. Lookups are total: an unknown id resolves to a neutral
//! definition with no multipliers.

use crate::error::RegistryError;
use crate::stat::StatKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Interned identifier for a class.
///
/// Uses `Arc<str>` so registry entries, tiers and character records can
/// share one allocation per id.
///
/// # Examples
///
/// ```rust
/// use duelcore::ClassId;
///
/// let a = ClassId::from("gladiator");
/// let b: ClassId = String::from("gladiator").into();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "gladiator");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassId(Arc<str>);

impl ClassId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for ClassId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClassId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(ClassId::from(s))
    }
}

impl From<&str> for ClassId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ClassId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Borrow<str> for ClassId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-stat class multipliers. Stats absent from the map multiply by 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatMultipliers(HashMap<StatKey, f64>);

impl StatMultipliers {
    pub fn new(values: HashMap<StatKey, f64>) -> Self {
        Self(values)
    }

    /// Build a full multiplier set in `StatKey::ALL` order.
    pub fn from_array(values: [f64; 6]) -> Self {
        Self(StatKey::ALL.into_iter().zip(values).collect())
    }

    pub fn get(&self, key: StatKey) -> f64 {
        self.0.get(&key).copied().unwrap_or(0.0)
    }

    pub fn is_neutral(&self) -> bool {
        self.0.values().all(|m| *m == 0.0)
    }

    fn iter(&self) -> impl Iterator<Item = (StatKey, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// A base or advanced class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDefinition {
    pub id: ClassId,
    pub name: String,
    pub description: String,
    pub stat_multipliers: StatMultipliers,
    /// Owning base class; `None` for base classes.
    pub parent: Option<ClassId>,
    /// Level that unlocks this class; `None` for base classes.
    pub min_level: Option<u32>,
}

impl ClassDefinition {
    /// Definition used for ids the registry does not know.
    pub fn neutral() -> Self {
        Self {
            id: ClassId::from(DEFAULT_BASE),
            name: String::new(),
            description: String::new(),
            stat_multipliers: StatMultipliers::default(),
            parent: None,
            min_level: None,
        }
    }

    pub fn is_advanced(&self) -> bool {
        self.parent.is_some()
    }
}

/// Advanced class entry: unlock level, id, name, description and
/// multipliers in `StatKey::ALL` order.
type AdvancedRow = (u32, &'static str, &'static str, &'static str, [f64; 6]);

const BUILTIN: &[(&str, &str, &str, &[AdvancedRow])] = &[
    (
        "warrior",
        "Warrior",
        "Базовый воин, владеющий физическим боем.",
        &[
            (
                20,
                "gladiator",
                "Gladiator",
                "Сильный воин с акцентом на необузданную ярость и мощь.",
                [1.3, 0.9, 0.8, 1.0, 1.4, 1.3],
            ),
            (
                20,
                "warlord",
                "Warlord",
                "Могучий лидер, обладающий повышенной выносливостью и защитой.",
                [1.25, 1.0, 0.85, 1.0, 1.45, 1.35],
            ),
            (
                40,
                "champion",
                "Champion",
                "Легендарный воин с непревзойденной физической силой.",
                [1.5, 1.0, 0.8, 1.05, 1.6, 1.4],
            ),
            (
                80,
                "titan",
                "Titan",
                "Воплощение мощи и несокрушимости.",
                [1.7, 1.1, 0.75, 1.1, 1.8, 1.5],
            ),
        ],
    ),
    (
        "mage",
        "Mage",
        "Базовый маг, владеющий заклинаниями.",
        &[
            (
                20,
                "battlemage",
                "Battlemage",
                "Маг, сочетающий заклинания с физической атакой.",
                [0.9, 1.0, 1.4, 1.1, 1.0, 0.9],
            ),
            (
                20,
                "spellbreaker",
                "Spellbreaker",
                "Маг, специализирующийся на разрушительных заклинаниях.",
                [0.85, 1.0, 1.45, 1.0, 1.0, 0.85],
            ),
            (
                40,
                "archmage",
                "Archmage",
                "Великий маг, владеющий самыми мощными заклинаниями.",
                [0.8, 1.0, 1.6, 1.2, 1.0, 0.8],
            ),
            (
                80,
                "grand_sorcerer",
                "Grand Sorcerer",
                "Повелитель магии, способный менять исход сражений.",
                [0.75, 1.0, 1.8, 1.25, 1.0, 0.75],
            ),
        ],
    ),
    (
        "archer",
        "Archer",
        "Базовый стрелок, мастер дальнего боя.",
        &[
            (
                20,
                "ranger",
                "Ranger",
                "Опытный стрелок с высокой точностью.",
                [1.0, 1.3, 1.0, 1.2, 1.0, 1.0],
            ),
            (
                20,
                "assassin",
                "Assassin",
                "Мастер скрытных атак и быстрых ударов.",
                [1.0, 1.35, 1.0, 1.15, 1.0, 1.0],
            ),
            (
                40,
                "marksman",
                "Marksman",
                "Безупречный стрелок, мастер дальнего боя.",
                [1.0, 1.5, 1.0, 1.3, 1.0, 1.0],
            ),
            (
                80,
                "storm_archer",
                "Storm Archer",
                "Легенда среди стрелков, способный наносить молниеносные удары.",
                [1.0, 1.7, 1.0, 1.4, 1.0, 1.0],
            ),
        ],
    ),
];

/// Sentinel returned by [`ClassRegistry::resolve_base_class`] for unknown ids.
pub const DEFAULT_BASE: &str = "default";

/// Owning base class of a class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseClass {
    /// The id is an advanced class owned by this base.
    Base(ClassId),
    /// The id is itself a base class or is unknown.
    Default,
}

impl BaseClass {
    pub fn as_str(&self) -> &str {
        match self {
            BaseClass::Base(id) => id.as_str(),
            BaseClass::Default => DEFAULT_BASE,
        }
    }
}

/// Flat class registry.
///
/// # Examples
///
/// ```rust
/// use duelcore::{BaseClass, ClassId, ClassRegistry, StatKey};
///
/// let registry = ClassRegistry::builtin();
/// let titan = registry.resolve_class_definition("titan");
/// assert_eq!(titan.stat_multipliers.get(StatKey::Strength), 1.7);
/// assert_eq!(
///     registry.resolve_base_class("titan"),
///     BaseClass::Base(ClassId::from("warrior"))
/// );
/// assert!(registry.resolve_class_definition("bard").stat_multipliers.is_neutral());
/// ```
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    classes: HashMap<ClassId, ClassDefinition>,
    /// Advanced tiers per base class: level threshold -> class ids.
    tiers: HashMap<ClassId, BTreeMap<u32, Vec<ClassId>>>,
    /// Base classes in registration order.
    bases: Vec<ClassId>,
    neutral: ClassDefinition,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ClassRegistry {
    /// Create a registry with no classes.
    pub fn empty() -> Self {
        Self {
            classes: HashMap::new(),
            tiers: HashMap::new(),
            bases: Vec::new(),
            neutral: ClassDefinition::neutral(),
        }
    }

    /// The three archetypes with their 20/40/80 advancement tiers.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (base, name, description, tiers) in BUILTIN {
            registry.insert_base(base, name, description);
            for (level, id, name, description, multipliers) in *tiers {
                registry.insert_advanced(base, *level, id, name, description, *multipliers);
            }
        }
        registry
    }

    /// Load a registry from a JSON document.
    ///
    /// The document maps base class ids to
    /// `{ name, description, statMultipliers, advanced: { "<level>": [...] } }`.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON, a class id used twice anywhere
    /// in the tree, a tier key that is not a level, or a negative multiplier.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let raw: BTreeMap<String, RawBaseClass> = serde_json::from_str(json)?;
        let mut registry = Self::empty();

        for (base_id, base) in raw {
            let base_key = ClassId::from(base_id);
            registry.check_new(&base_key, &base.stat_multipliers)?;
            registry.insert(ClassDefinition {
                id: base_key.clone(),
                name: base.name,
                description: base.description,
                stat_multipliers: base.stat_multipliers,
                parent: None,
                min_level: None,
            });

            for (level_key, options) in base.advanced {
                let level: u32 = level_key.trim().parse().map_err(|_| RegistryError::InvalidTier {
                    class: base_key.clone(),
                    level: level_key.clone(),
                })?;
                for option in options {
                    let id = ClassId::from(option.id);
                    registry.check_new(&id, &option.stat_multipliers)?;
                    registry.insert(ClassDefinition {
                        id,
                        name: option.name,
                        description: option.description,
                        stat_multipliers: option.stat_multipliers,
                        parent: Some(base_key.clone()),
                        min_level: Some(level),
                    });
                }
            }
        }

        tracing::debug!(classes = registry.classes.len(), "Loaded class registry");
        Ok(registry)
    }

    /// Add or replace a class. Advanced classes are filed under their
    /// parent's tier for `min_level`; a replaced class leaves its old tier.
    pub fn insert(&mut self, definition: ClassDefinition) {
        if let Some(previous) = self.classes.get(&definition.id) {
            match (&previous.parent, previous.min_level) {
                (Some(parent), Some(level)) => {
                    if let Some(tiers) = self.tiers.get_mut(parent) {
                        if let Some(ids) = tiers.get_mut(&level) {
                            ids.retain(|id| *id != definition.id);
                            if ids.is_empty() {
                                tiers.remove(&level);
                            }
                        }
                    }
                }
                _ => self.bases.retain(|id| *id != definition.id),
            }
        }

        match (&definition.parent, definition.min_level) {
            (Some(parent), Some(level)) => {
                self.tiers
                    .entry(parent.clone())
                    .or_default()
                    .entry(level)
                    .or_default()
                    .push(definition.id.clone());
            }
            _ => {
                if !self.bases.contains(&definition.id) {
                    self.bases.push(definition.id.clone());
                }
            }
        }
        self.classes.insert(definition.id.clone(), definition);
    }

    fn check_new(&self, id: &ClassId, multipliers: &StatMultipliers) -> Result<(), RegistryError> {
        if self.classes.contains_key(id) {
            return Err(RegistryError::DuplicateClass(id.clone()));
        }
        if let Some((stat, _)) = multipliers.iter().find(|(_, m)| *m < 0.0) {
            return Err(RegistryError::NegativeMultiplier {
                class: id.clone(),
                stat,
            });
        }
        Ok(())
    }

    fn insert_base(&mut self, id: &str, name: &str, description: &str) {
        self.insert(ClassDefinition {
            id: ClassId::from(id),
            name: name.to_string(),
            description: description.to_string(),
            stat_multipliers: StatMultipliers::from_array([0.0; 6]),
            parent: None,
            min_level: None,
        });
    }

    fn insert_advanced(
        &mut self,
        base: &str,
        level: u32,
        id: &str,
        name: &str,
        description: &str,
        multipliers: [f64; 6],
    ) {
        self.insert(ClassDefinition {
            id: ClassId::from(id),
            name: name.to_string(),
            description: description.to_string(),
            stat_multipliers: StatMultipliers::from_array(multipliers),
            parent: Some(ClassId::from(base)),
            min_level: Some(level),
        });
    }

    /// Resolve a class id to its definition, falling back to a neutral
    /// zero-multiplier definition for unknown ids.
    pub fn resolve_class_definition(&self, class_id: &str) -> &ClassDefinition {
        self.classes.get(class_id).unwrap_or(&self.neutral)
    }

    /// Resolve the base class owning `class_id`.
    ///
    /// Returns [`BaseClass::Default`] when the id is a base class itself or
    /// is unknown.
    pub fn resolve_base_class(&self, class_id: &str) -> BaseClass {
        match self.classes.get(class_id).and_then(|def| def.parent.clone()) {
            Some(parent) => BaseClass::Base(parent),
            None => BaseClass::Default,
        }
    }

    /// Lineage root of a class id: itself for a base class, its parent for
    /// an advanced class, `None` when unknown.
    pub fn lineage(&self, class_id: &str) -> Option<&ClassId> {
        let def = self.classes.get(class_id)?;
        Some(def.parent.as_ref().unwrap_or(&def.id))
    }

    /// Advanced classes unlocked at the highest threshold not above `level`.
    pub fn advancement_options(&self, base: &str, level: u32) -> Vec<&ClassDefinition> {
        self.tiers
            .get(base)
            .and_then(|tiers| tiers.range(..=level).next_back())
            .map(|(_, ids)| {
                ids.iter()
                    .filter_map(|id| self.classes.get(id.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lowest threshold above `level` for a base class.
    pub fn next_threshold(&self, base: &str, level: u32) -> Option<u32> {
        self.tiers
            .get(base)?
            .range(level.saturating_add(1)..)
            .next()
            .map(|(threshold, _)| *threshold)
    }

    /// All thresholds registered under a base class, ascending.
    pub fn thresholds(&self, base: &str) -> Vec<u32> {
        self.tiers
            .get(base)
            .map(|tiers| tiers.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn base_classes(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.bases.iter().filter_map(|id| self.classes.get(id.as_str()))
    }

    pub fn contains(&self, class_id: &str) -> bool {
        self.classes.contains_key(class_id)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBaseClass {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    stat_multipliers: StatMultipliers,
    #[serde(default)]
    advanced: BTreeMap<String, Vec<RawAdvancedClass>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAdvancedClass {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    stat_multipliers: StatMultipliers,
}
