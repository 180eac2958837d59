use derive_more::From;
use serde::{Deserialize, Serialize};

/// Feature definition a [`Flag`] refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    name: String,
}

impl Feature {
    /// Name of the feature, as configured in the Flagsmith dashboard.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Evaluated state of a feature.
///
/// Flags are only ever produced by the server. Note that `enabled` and `value` are independent: a
/// flag may be enabled with a null value, or disabled while still carrying a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    feature: Feature,
    enabled: bool,
    #[serde(default)]
    feature_state_value: Value,
}

impl Flag {
    /// The feature this flag describes.
    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Shortcut for `flag.feature().name()`.
    pub fn name(&self) -> &str {
        self.feature.name()
    }

    /// Whether the feature is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Remote config value attached to the feature.
    pub fn value(&self) -> &Value {
        &self.feature_state_value
    }
}

/// Dynamic scalar used for flag values and trait values.
#[derive(Debug, Clone, Default, PartialEq, PartialOrd, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum Value {
    /// A string value.
    String(String),
    /// Whole number. Tried before [`Value::Number`] so integers keep their exact value.
    Integer(i64),
    /// Any other number.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// Absent value.
    #[default]
    Null,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl Value {
    /// The string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The exact integer, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Any numeric value as `f64`. Integers beyond 2^53 lose precision.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the value is absent.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Key-value attribute attached to an identity.
///
/// The server reports traits as `trait_key`/`trait_value`; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trait {
    #[serde(alias = "trait_key")]
    key: String,
    #[serde(alias = "trait_value", default)]
    value: Value,
}

impl Trait {
    /// Create a new trait.
    ///
    /// ```
    /// # use flagsmith::Trait;
    /// let plan = Trait::new("plan", "premium");
    /// assert_eq!(plan.key(), "plan");
    /// ```
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Trait {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Trait key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Trait value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// The subject flags and traits are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    identifier: String,
}

impl Identity {
    /// Wrap a user, device or segment key.
    pub fn new(identifier: impl Into<String>) -> Self {
        Identity {
            identifier: identifier.into(),
        }
    }

    /// The identity key.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Flags and traits of an identified user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityFlagsAndTraits {
    flags: Vec<Flag>,
    #[serde(default)]
    traits: Vec<Trait>,
}

impl IdentityFlagsAndTraits {
    /// Flags evaluated for the identity.
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    /// Traits stored on the identity.
    pub fn traits(&self) -> &[Trait] {
        &self.traits
    }

    /// Consume the bundle, keeping only the flags.
    pub fn into_flags(self) -> Vec<Flag> {
        self.flags
    }

    /// Consume the bundle, keeping only the traits.
    pub fn into_traits(self) -> Vec<Trait> {
        self.traits
    }

    /// Find a trait by key.
    pub fn find_trait(&self, key: &str) -> Option<&Trait> {
        self.traits.iter().find(|t| t.key == key)
    }
}

/// A single trait together with the identity it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitWithIdentity {
    #[serde(alias = "trait_key")]
    key: String,
    #[serde(alias = "trait_value", default)]
    value: Value,
    identity: Identity,
}

impl TraitWithIdentity {
    pub(crate) fn new(trait_: &Trait, identity: &str) -> Self {
        TraitWithIdentity {
            key: trait_.key.clone(),
            value: trait_.value.clone(),
            identity: Identity::new(identity),
        }
    }

    /// Trait key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Trait value as stored by the server.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Identity the trait belongs to.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Body of a bulk trait write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TraitsWithIdentity<'a> {
    pub identifier: &'a str,
    pub traits: &'a [Trait],
}
