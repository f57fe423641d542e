//! Per object-type declarations of what must be synchronized

use crate::{Coordinate, Error, Result, StateAssociation, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One property an object type pulls from the diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    /// Element id used when no state association applies, and as a
    /// fallback for associations without their own id
    #[serde(default)]
    pub remote_id: Option<i64>,
    /// Element ids keyed by state association title
    #[serde(default)]
    pub state_remote_ids: IndexMap<String, i64>,
    /// Static default when neither backend nor cache can supply a value
    #[serde(default)]
    pub default: Option<Value>,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_id: None,
            state_remote_ids: IndexMap::new(),
            default: None,
        }
    }

    pub fn with_remote_id(mut self, id: i64) -> Self {
        self.remote_id = Some(id);
        self
    }

    pub fn with_state_id(mut self, title: impl Into<String>, id: i64) -> Self {
        self.state_remote_ids.insert(title.into(), id);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn remote_id_for(&self, sa: Option<&StateAssociation>) -> Option<i64> {
        sa.and_then(|sa| self.state_remote_ids.get(sa.title()).copied())
            .or(self.remote_id)
    }
}

/// Declaration of what one object type synchronizes
///
/// Manifests are plain data and can be written by hand in RON:
///
/// ```ron
/// Manifest(
///     object_name: Some("hero"),
///     properties: [
///         (name: "health", remote_id: Some(12)),
///     ],
///     events_to_emit: ["Jump"],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Object type name, `None` for shared objects
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
    /// Associations that only apply to the named property
    #[serde(default)]
    pub states_per_property: IndexMap<String, Vec<StateAssociation>>,
    /// Associations applied to every property
    #[serde(default)]
    pub common_states: Vec<StateAssociation>,
    /// Event names this object type may send to the backend
    #[serde(default)]
    pub events_to_emit: Vec<String>,
}

impl Manifest {
    /// Create an empty manifest for an object type
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: Some(object_name.into()),
            ..Default::default()
        }
    }

    /// Create an empty manifest for a shared object
    pub fn shared() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, property: PropertySpec) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_states_for(
        mut self,
        property: impl Into<String>,
        states: Vec<StateAssociation>,
    ) -> Self {
        self.states_per_property
            .entry(property.into())
            .or_default()
            .extend(states);
        self
    }

    pub fn with_common_states(mut self, states: Vec<StateAssociation>) -> Self {
        self.common_states.extend(states);
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.events_to_emit.push(event.into());
        self
    }

    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Whether this object type may send `event`
    pub fn emits(&self, event: &str) -> bool {
        self.events_to_emit.iter().any(|e| e == event)
    }

    /// All associations applying to a property: common ones first
    pub fn states_for_property(&self, name: &str) -> Vec<StateAssociation> {
        let mut states = self.common_states.clone();
        if let Some(own) = self.states_per_property.get(name) {
            for sa in own {
                if !states.contains(sa) {
                    states.push(sa.clone());
                }
            }
        }
        states
    }

    /// Build every coordinate this manifest needs resolved
    ///
    /// One target per property and applicable association, or a single
    /// target without association when none apply.
    pub fn targets(&self) -> Result<Vec<Coordinate>> {
        if let Some(name) = self
            .states_per_property
            .keys()
            .find(|name| self.property(name).is_none())
        {
            return Err(Error::UnknownProperty(format!(
                "{}.{}",
                self.object_name().unwrap_or("N/A"),
                name
            )));
        }

        let mut targets = Vec::new();
        for property in &self.properties {
            let states = self.states_for_property(&property.name);
            if states.is_empty() {
                targets.push(self.target(property, None)?);
            } else {
                for sa in states {
                    targets.push(self.target(property, Some(sa))?);
                }
            }
        }
        Ok(targets)
    }

    fn target(&self, property: &PropertySpec, sa: Option<StateAssociation>) -> Result<Coordinate> {
        let remote_id = property.remote_id_for(sa.as_ref()).ok_or_else(|| {
            Error::MissingRemoteId(format!(
                "{}.{}.{}",
                self.object_name().unwrap_or("N/A"),
                property.name,
                sa.as_ref().map(|s| s.title()).unwrap_or("N/A")
            ))
        })?;
        Ok(
            Coordinate::new(self.object_name.clone(), property.name.clone(), sa, remote_id)
                .with_default(property.default.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explore() -> StateAssociation {
        StateAssociation::new("Explore").with_game_states(["Exploring"])
    }

    fn fight() -> StateAssociation {
        StateAssociation::new("Fight").with_game_states(["Fighting"])
    }

    #[test]
    fn test_single_target_without_states() {
        let manifest = Manifest::new("shop").with_property(PropertySpec::new("gold").with_remote_id(7));
        let targets = manifest.targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].remote_id(), 7);
        assert!(targets[0].state_association().is_none());
    }

    #[test]
    fn test_cross_product_with_common_states() {
        let manifest = Manifest::new("hero")
            .with_property(
                PropertySpec::new("health")
                    .with_state_id("Explore", 10)
                    .with_state_id("Fight", 11)
                    .with_state_id("Boss", 12),
            )
            .with_property(PropertySpec::new("speed").with_remote_id(20))
            .with_common_states(vec![explore(), fight()])
            .with_states_for("health", vec![StateAssociation::new("Boss")]);

        let targets = manifest.targets().unwrap();
        let ids: Vec<i64> = targets.iter().map(Coordinate::remote_id).collect();
        // speed falls back to its own id for both common associations
        assert_eq!(ids, vec![10, 11, 12, 20, 20]);
        assert_eq!(manifest.states_for_property("speed").len(), 2);
        assert_eq!(manifest.states_for_property("health").len(), 3);
    }

    #[test]
    fn test_missing_remote_id() {
        let manifest = Manifest::new("hero")
            .with_property(PropertySpec::new("health"))
            .with_common_states(vec![explore()]);
        assert!(matches!(manifest.targets(), Err(Error::MissingRemoteId(_))));
    }

    #[test]
    fn test_states_for_unknown_property() {
        let manifest = Manifest::new("hero")
            .with_property(PropertySpec::new("health").with_remote_id(1))
            .with_states_for("mana", vec![fight()]);
        assert!(matches!(manifest.targets(), Err(Error::UnknownProperty(_))));
    }

    #[test]
    fn test_defaults_carried_into_targets() {
        let manifest = Manifest::shared()
            .with_property(PropertySpec::new("gold").with_remote_id(7).with_default(Value::new(50)));
        let targets = manifest.targets().unwrap();
        assert_eq!(targets[0].object_name(), None);
        assert_eq!(targets[0].default_value().map(Value::base), Some(50));
    }

    #[test]
    fn test_emits() {
        let manifest = Manifest::new("hero").with_event("Jump");
        assert!(manifest.emits("Jump"));
        assert!(!manifest.emits("Die"));
    }

    #[test]
    fn test_load_from_ron() {
        let text = r#"Manifest(
            object_name: Some("hero"),
            properties: [
                (name: "health", state_remote_ids: {"Explore": 10}),
            ],
            common_states: [(title: "Explore", game_states: ["Exploring"])],
            events_to_emit: ["Jump"],
        )"#;
        let manifest: Manifest = ron::from_str(text).unwrap();
        let targets = manifest.targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].remote_id(), 10);
        assert_eq!(targets[0].state_association(), Some(&explore()));
    }
}
