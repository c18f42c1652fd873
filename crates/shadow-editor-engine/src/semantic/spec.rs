//! Typed update specification.
//!
//! Callers describe an update as `remove`, `add` and `set` sections keyed by
//! a fixed attribute vocabulary. Loose JSON input is resolved into these types
//! once, by [`UpdateSpec::from_json`]; everything downstream works on
//! explicit value kinds.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::EditorError;

/// Attributes the update editor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrKey {
    About,
    Property,
    Datatype,
    Typeof,
    Resource,
    Rel,
    Rev,
    Content,
}

impl AttrKey {
    pub const ALL: [AttrKey; 8] = [
        AttrKey::About,
        AttrKey::Property,
        AttrKey::Datatype,
        AttrKey::Typeof,
        AttrKey::Resource,
        AttrKey::Rel,
        AttrKey::Rev,
        AttrKey::Content,
    ];

    /// Attribute name on the host element.
    pub fn name(self) -> &'static str {
        match self {
            AttrKey::About => "about",
            AttrKey::Property => "property",
            AttrKey::Datatype => "datatype",
            AttrKey::Typeof => "typeof",
            AttrKey::Resource => "resource",
            AttrKey::Rel => "rel",
            AttrKey::Rev => "rev",
            AttrKey::Content => "content",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// Keys whose values only make sense when overwritten.
    fn set_only(self) -> bool {
        matches!(self, AttrKey::Content | AttrKey::Datatype)
    }
}

/// Key naming the inner content override.
pub const INNER_CONTENT_KEY: &str = "innerHTML";

/// Key in `add` that forces a structural strategy.
pub const FORCE_CONTEXT_KEY: &str = "forceNewContext";

#[derive(Debug, Clone)]
pub enum ValueMatcher {
    Literal(String),
    Pattern(Regex),
}

impl ValueMatcher {
    pub fn matches(&self, token: &str) -> bool {
        match self {
            ValueMatcher::Literal(literal) => literal == token,
            ValueMatcher::Pattern(pattern) => pattern.is_match(token),
        }
    }
}

/// Which tokens of an attribute to remove.
#[derive(Debug, Clone)]
pub enum RemoveValue {
    /// Drop the attribute outright.
    All,
    Literal(String),
    Pattern(Regex),
    List(Vec<ValueMatcher>),
}

impl RemoveValue {
    pub fn matches(&self, token: &str) -> bool {
        match self {
            RemoveValue::All => true,
            RemoveValue::Literal(literal) => literal == token,
            RemoveValue::Pattern(pattern) => pattern.is_match(token),
            RemoveValue::List(matchers) => matchers.iter().any(|m| m.matches(token)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceContext {
    Wrap,
    Nest,
}

#[derive(Debug, Clone, Default)]
pub struct RemoveSpec {
    pub attributes: BTreeMap<AttrKey, RemoveValue>,
    /// Clear the inner content of every target.
    pub inner_content: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AddSpec {
    pub attributes: BTreeMap<AttrKey, Vec<String>>,
    pub force_new_context: Option<ForceContext>,
}

#[derive(Debug, Clone, Default)]
pub struct SetSpec {
    pub attributes: BTreeMap<AttrKey, String>,
    /// Replacement inner markup for every target.
    pub inner_markup: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSpec {
    pub remove: Option<RemoveSpec>,
    pub add: Option<AddSpec>,
    pub set: Option<SetSpec>,
    /// Free text for diagnostics.
    pub desc: Option<String>,
}

impl UpdateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(mut self, key: AttrKey, value: RemoveValue) -> Self {
        self.remove
            .get_or_insert_with(RemoveSpec::default)
            .attributes
            .insert(key, value);
        self
    }

    pub fn remove_inner_content(mut self) -> Self {
        self.remove.get_or_insert_with(RemoveSpec::default).inner_content = true;
        self
    }

    /// Appends `value` to the tokens of `key`. Content and datatype can only
    /// be set, so adding them is logged and ignored.
    pub fn add(mut self, key: AttrKey, value: impl Into<String>) -> Self {
        if key.set_only() {
            log::warn!("adding {} is not supported, use set", key.name());
            return self;
        }
        self.add
            .get_or_insert_with(AddSpec::default)
            .attributes
            .entry(key)
            .or_default()
            .push(value.into());
        self
    }

    pub fn force_new_context(mut self, force: ForceContext) -> Self {
        self.add.get_or_insert_with(AddSpec::default).force_new_context = Some(force);
        self
    }

    pub fn set(mut self, key: AttrKey, value: impl Into<String>) -> Self {
        self.set
            .get_or_insert_with(SetSpec::default)
            .attributes
            .insert(key, value.into());
        self
    }

    pub fn set_inner_markup(mut self, markup: impl Into<String>) -> Self {
        self.set.get_or_insert_with(SetSpec::default).inner_markup = Some(markup.into());
        self
    }

    pub fn describe(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    /// True when the spec would change nothing.
    pub fn is_empty(&self) -> bool {
        let remove = self
            .remove
            .as_ref()
            .is_none_or(|r| r.attributes.is_empty() && !r.inner_content);
        let add = self.add.as_ref().is_none_or(|a| a.attributes.is_empty());
        let set = self
            .set
            .as_ref()
            .is_none_or(|s| s.attributes.is_empty() && s.inner_markup.is_none());
        remove && add && set
    }

    pub fn has_content_override(&self) -> bool {
        self.remove.as_ref().is_some_and(|r| r.inner_content)
            || self.set.as_ref().is_some_and(|s| s.inner_markup.is_some())
    }

    pub fn has_attribute_changes(&self) -> bool {
        self.remove.as_ref().is_some_and(|r| !r.attributes.is_empty())
            || self.add.as_ref().is_some_and(|a| !a.attributes.is_empty())
            || self.set.as_ref().is_some_and(|s| !s.attributes.is_empty())
    }

    /// Resolves a loosely shaped JSON specification.
    ///
    /// Unknown keys, malformed values and invalid patterns are logged and
    /// skipped; the recognised rest is kept. Only input that is not an
    /// object at all is rejected.
    pub fn from_json(value: &Value) -> Result<Self, EditorError> {
        let raw = RawSpec::deserialize(value)
            .map_err(|e| EditorError::UnsupportedSpecification(e.to_string()))?;
        for key in raw.unknown.keys() {
            log::warn!("unsupported update section {key:?}, ignoring it");
        }

        let mut spec = UpdateSpec {
            desc: raw.desc,
            ..Self::default()
        };
        if let Some(section) = raw.remove {
            spec.remove = Some(parse_remove(&section));
        }
        if let Some(section) = raw.add {
            spec.add = Some(parse_add(&section));
        }
        if let Some(section) = raw.set {
            spec.set = Some(parse_set(&section));
        }
        Ok(spec)
    }
}

#[derive(Debug, Deserialize)]
struct RawSpec {
    remove: Option<Map<String, Value>>,
    add: Option<Map<String, Value>>,
    set: Option<Map<String, Value>>,
    desc: Option<String>,
    #[serde(flatten)]
    unknown: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawMatcher {
    Literal(String),
    Pattern { pattern: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRemove {
    Flag(bool),
    One(RawMatcher),
    Many(Vec<RawMatcher>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValues {
    One(String),
    Many(Vec<String>),
}

impl RawValues {
    fn into_vec(self) -> Vec<String> {
        match self {
            RawValues::One(value) => vec![value],
            RawValues::Many(values) => values,
        }
    }
}

fn unsupported(section: &str, key: &str, reason: &str) {
    let err = EditorError::UnsupportedSpecification(format!("{section}.{key}: {reason}"));
    log::warn!("{err}, ignoring it");
}

fn compile(section: &str, key: &str, pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            unsupported(section, key, &format!("invalid pattern {pattern:?} ({e})"));
            None
        }
    }
}

fn resolve_matcher(key: &str, raw: RawMatcher) -> Option<ValueMatcher> {
    match raw {
        RawMatcher::Literal(literal) => Some(ValueMatcher::Literal(literal)),
        RawMatcher::Pattern { pattern } => {
            compile("remove", key, &pattern).map(ValueMatcher::Pattern)
        }
    }
}

fn parse_remove(section: &Map<String, Value>) -> RemoveSpec {
    let mut spec = RemoveSpec::default();
    for (key, value) in section {
        if key == INNER_CONTENT_KEY {
            match value {
                Value::Bool(flag) => spec.inner_content = *flag,
                _ => unsupported("remove", key, "expected true"),
            }
            continue;
        }
        let Some(attr) = AttrKey::from_name(key) else {
            unsupported("remove", key, "unknown key");
            continue;
        };
        let resolved = match RawRemove::deserialize(value) {
            Ok(RawRemove::Flag(true)) => Some(RemoveValue::All),
            Ok(RawRemove::Flag(false)) => None,
            Ok(RawRemove::One(RawMatcher::Literal(literal))) => Some(RemoveValue::Literal(literal)),
            Ok(RawRemove::One(RawMatcher::Pattern { pattern })) => {
                compile("remove", key, &pattern).map(RemoveValue::Pattern)
            }
            Ok(RawRemove::Many(raw)) => Some(RemoveValue::List(
                raw.into_iter()
                    .filter_map(|m| resolve_matcher(key, m))
                    .collect(),
            )),
            Err(_) => {
                unsupported("remove", key, "expected true, a string, a pattern or a list");
                None
            }
        };
        if let Some(resolved) = resolved {
            spec.attributes.insert(attr, resolved);
        }
    }
    spec
}

fn parse_add(section: &Map<String, Value>) -> AddSpec {
    let mut spec = AddSpec::default();
    for (key, value) in section {
        if key == FORCE_CONTEXT_KEY {
            spec.force_new_context = match value.as_str() {
                Some("wrap") => Some(ForceContext::Wrap),
                Some("nest") => Some(ForceContext::Nest),
                _ => {
                    unsupported("add", key, "expected \"wrap\" or \"nest\"");
                    None
                }
            };
            continue;
        }
        if key == INNER_CONTENT_KEY {
            log::warn!("adding {INNER_CONTENT_KEY} is not supported, use set");
            continue;
        }
        let Some(attr) = AttrKey::from_name(key) else {
            unsupported("add", key, "unknown key");
            continue;
        };
        if attr.set_only() {
            log::warn!("adding {key} is not supported, use set");
            continue;
        }
        match RawValues::deserialize(value) {
            Ok(values) => spec.attributes.entry(attr).or_default().extend(values.into_vec()),
            Err(_) => unsupported("add", key, "expected a string or a list of strings"),
        }
    }
    spec
}

fn parse_set(section: &Map<String, Value>) -> SetSpec {
    let mut spec = SetSpec::default();
    for (key, value) in section {
        if key == INNER_CONTENT_KEY {
            match value.as_str() {
                Some(markup) => spec.inner_markup = Some(markup.to_string()),
                None => unsupported("set", key, "expected a markup string"),
            }
            continue;
        }
        let Some(attr) = AttrKey::from_name(key) else {
            unsupported("set", key, "unknown key");
            continue;
        };
        match RawValues::deserialize(value) {
            Ok(values) => {
                spec.attributes.insert(attr, values.into_vec().join(" "));
            }
            Err(_) => unsupported("set", key, "expected a string or a list of strings"),
        }
    }
    spec
}
