//! Include/exclude selectors.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::core::expr::{ScalarExpr, SetExpr, is_blank};
use crate::error::SelectionError;
use crate::node::NodeEntry;

pub const HOSTNAME: &str = "hostname";
pub const NAME: &str = "name";
/// Reserved; accepted in configuration but never matched.
pub const TYPE: &str = "type";
pub const TAGS: &str = "tags";
pub const OS_NAME: &str = "os-name";
pub const OS_FAMILY: &str = "os-family";
pub const OS_ARCH: &str = "os-arch";
pub const OS_VERSION: &str = "os-version";

/// Filter keys exposed on the command line.
pub const FILTER_KEYS: [&str; 8] = [
    HOSTNAME, NAME, TYPE, TAGS, OS_NAME, OS_FAMILY, OS_ARCH, OS_VERSION,
];

/// Built-in selector fields, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Hostname,
    Name,
    Tags,
    OsFamily,
    OsArch,
    OsName,
    OsVersion,
}

impl FilterKey {
    pub const ALL: [FilterKey; 7] = [
        FilterKey::Hostname,
        FilterKey::Name,
        FilterKey::Tags,
        FilterKey::OsFamily,
        FilterKey::OsArch,
        FilterKey::OsName,
        FilterKey::OsVersion,
    ];

    /// Configuration key for this field.
    pub fn name(self) -> &'static str {
        match self {
            FilterKey::Hostname => HOSTNAME,
            FilterKey::Name => NAME,
            FilterKey::Tags => TAGS,
            FilterKey::OsFamily => OS_FAMILY,
            FilterKey::OsArch => OS_ARCH,
            FilterKey::OsName => OS_NAME,
            FilterKey::OsVersion => OS_VERSION,
        }
    }

    pub fn from_name(name: &str) -> Option<FilterKey> {
        FilterKey::ALL.into_iter().find(|key| key.name() == name)
    }

    /// Expression configured on `selector` for this field.
    pub fn selector_value(self, selector: &Selector) -> &str {
        match self {
            FilterKey::Hostname => &selector.hostname,
            FilterKey::Name => &selector.name,
            FilterKey::Tags => &selector.tags,
            FilterKey::OsFamily => &selector.os_family,
            FilterKey::OsArch => &selector.os_arch,
            FilterKey::OsName => &selector.os_name,
            FilterKey::OsVersion => &selector.os_version,
        }
    }

    fn selector_value_mut(self, selector: &mut Selector) -> &mut String {
        match self {
            FilterKey::Hostname => &mut selector.hostname,
            FilterKey::Name => &mut selector.name,
            FilterKey::Tags => &mut selector.tags,
            FilterKey::OsFamily => &mut selector.os_family,
            FilterKey::OsArch => &mut selector.os_arch,
            FilterKey::OsName => &mut selector.os_name,
            FilterKey::OsVersion => &mut selector.os_version,
        }
    }

    /// Node value for a scalar field; `None` for tags.
    fn node_value(self, node: &impl NodeEntry) -> Option<&str> {
        match self {
            FilterKey::Hostname => Some(node.hostname()),
            FilterKey::Name => Some(node.nodename()),
            FilterKey::Tags => None,
            FilterKey::OsFamily => Some(node.os_family()),
            FilterKey::OsArch => Some(node.os_arch()),
            FilterKey::OsName => Some(node.os_name()),
            FilterKey::OsVersion => Some(node.os_version()),
        }
    }
}

/// A bag of match expressions, one per node field plus custom attributes.
///
/// Empty expressions leave their field unconstrained. A selector with no
/// expressions at all is blank and matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selector {
    pub hostname: String,
    pub name: String,
    pub tags: String,
    pub os_family: String,
    pub os_arch: String,
    pub os_name: String,
    pub os_version: String,
    /// Custom attribute name to expression; every entry must match.
    pub attributes: BTreeMap<String, String>,
    /// Include wins over exclude when both match. Only read on includes.
    pub dominant: bool,
}

impl Selector {
    /// Build a selector from configuration keys.
    ///
    /// Known filter keys set their field, `type` is ignored, and any other key
    /// becomes a custom attribute expression.
    pub fn populate<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut selector = Selector::default();
        for (key, value) in entries {
            let key = key.as_ref();
            if key == TYPE {
                continue;
            }
            match FilterKey::from_name(key) {
                Some(field) => *field.selector_value_mut(&mut selector) = value.into(),
                None => {
                    selector.attributes.insert(key.to_string(), value.into());
                }
            }
        }
        selector
    }

    pub fn with_dominant(mut self, dominant: bool) -> Self {
        self.dominant = dominant;
        self
    }

    pub fn is_dominant(&self) -> bool {
        self.dominant
    }

    pub fn is_blank(&self) -> bool {
        FilterKey::ALL
            .into_iter()
            .all(|key| is_blank(key.selector_value(self)))
            && self.attributes.is_empty()
    }

    /// Compile every configured expression once for repeated matching.
    ///
    /// Only `/.../` expressions that fail to compile produce an error, naming
    /// the field or attribute they were configured on.
    pub fn compile(&self) -> Result<CompiledSelector, SelectionError> {
        let mut scalars = Vec::new();
        let mut tags = None;
        for key in FilterKey::ALL {
            let expression = key.selector_value(self);
            if is_blank(expression) {
                continue;
            }
            let invalid = |err| SelectionError::invalid_pattern(key.name(), expression, err);
            match key {
                FilterKey::Tags => tags = Some(SetExpr::compile(expression).map_err(invalid)?),
                _ => scalars.push((key, ScalarExpr::compile(expression).map_err(invalid)?)),
            }
        }
        let attributes = self
            .attributes
            .iter()
            .map(|(key, expression)| {
                ScalarExpr::compile(expression)
                    .map(|compiled| (key.clone(), compiled))
                    .map_err(|err| SelectionError::invalid_pattern(key, expression, err))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompiledSelector {
            selector: self.clone(),
            scalars,
            tags,
            attributes,
        })
    }

    /// True if every configured expression matches `node`.
    ///
    /// A blank selector never matches. Compiles on every call; use
    /// [`Selector::compile`] when matching many nodes.
    pub fn matches(&self, node: &impl NodeEntry) -> Result<bool, SelectionError> {
        Ok(self.compile()?.matches(node))
    }

    /// Check that every explicit `/.../` expression compiles.
    pub fn validate(&self) -> Result<(), SelectionError> {
        self.compile().map(|_| ())
    }
}

/// A [`Selector`] with its expressions compiled.
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    selector: Selector,
    scalars: Vec<(FilterKey, ScalarExpr)>,
    tags: Option<SetExpr>,
    attributes: Vec<(String, ScalarExpr)>,
}

impl CompiledSelector {
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Every configured field and every attribute must match. A blank
    /// selector never matches.
    pub fn matches(&self, node: &impl NodeEntry) -> bool {
        if self.selector.is_blank() {
            return false;
        }
        let scalars_match = self
            .scalars
            .iter()
            .all(|(key, expr)| key.node_value(node).is_some_and(|value| expr.is_match(value)));
        let tags_match = self
            .tags
            .as_ref()
            .is_none_or(|expr| expr.is_match(node.tags()));
        let attributes_match = self.attributes.iter().all(|(key, expr)| {
            node.attributes()
                .get(key)
                .is_some_and(|value| expr.is_match(value))
        });
        scalars_match && tags_match && attributes_match
    }
}

impl PartialEq for CompiledSelector {
    fn eq(&self, other: &Self) -> bool {
        self.selector == other.selector
    }
}

impl Eq for CompiledSelector {}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for key in FilterKey::ALL {
            let expression = key.selector_value(self);
            if !is_blank(expression) {
                write!(f, "{}={}, ", key.name(), expression)?;
            }
        }
        write!(f, "dominant={}", self.dominant)?;
        if !self.attributes.is_empty() {
            let attributes: Vec<String> = self
                .attributes
                .iter()
                .map(|(key, expression)| format!("{key}={expression}"))
                .collect();
            write!(f, ", attributes={{{}}}", attributes.join(", "))?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{node, web_node};

    #[test]
    fn blank_selector_never_matches() {
        let selector = Selector::default();
        assert!(selector.is_blank());
        assert!(!selector.matches(&web_node()).expect("match"));
        assert!(!selector.matches(&node("empty")).expect("match"));
    }

    #[test]
    fn whitespace_only_fields_are_blank() {
        let selector = Selector::populate([(HOSTNAME, "  "), (TAGS, "")]);
        assert!(selector.is_blank());
    }

    #[test]
    fn dominant_flag_alone_is_blank() {
        let selector = Selector::default().with_dominant(true);
        assert!(selector.is_blank());
        assert!(!selector.matches(&web_node()).expect("match"));
    }

    #[test]
    fn populate_routes_known_and_custom_keys() {
        let selector = Selector::populate([
            (HOSTNAME, "web.*"),
            (TAGS, "prod"),
            (OS_FAMILY, "unix"),
            (OS_ARCH, "x86_64"),
            (OS_NAME, "Linux"),
            (OS_VERSION, "6.1"),
            (NAME, "web01"),
            (TYPE, "ignored"),
            ("rack", "r1"),
        ]);
        assert_eq!(selector.hostname, "web.*");
        assert_eq!(selector.tags, "prod");
        assert_eq!(selector.os_family, "unix");
        assert_eq!(selector.os_arch, "x86_64");
        assert_eq!(selector.os_name, "Linux");
        assert_eq!(selector.os_version, "6.1");
        assert_eq!(selector.name, "web01");
        assert_eq!(
            selector.attributes,
            BTreeMap::from([("rack".to_string(), "r1".to_string())])
        );
    }

    #[test]
    fn every_configured_field_must_match() {
        let selector = Selector::populate([(TAGS, "web+prod"), (OS_FAMILY, "unix")]);
        assert!(selector.matches(&web_node()).expect("match"));

        let selector = Selector::populate([(TAGS, "web+prod"), (OS_FAMILY, "windows")]);
        assert!(!selector.matches(&web_node()).expect("match"));
    }

    #[test]
    fn empty_node_value_does_not_match() {
        let selector = Selector::populate([(OS_VERSION, ".*")]);
        assert!(!selector.matches(&node("bare")).expect("match"));
    }

    #[test]
    fn attributes_require_all_keys() {
        let mut target = web_node();
        target.attributes.insert("rack".to_string(), "r1".to_string());

        let selector = Selector::populate([("rack", "r1")]);
        assert!(selector.matches(&target).expect("match"));

        let selector = Selector::populate([("rack", "r1"), ("zone", "eu")]);
        assert!(!selector.matches(&target).expect("match"));
    }

    #[test]
    fn explicit_regex_error_names_field() {
        let selector = Selector::populate([(HOSTNAME, "/web(/")]);
        let err = selector.matches(&web_node()).expect_err("invalid regex");
        assert_eq!(err.to_string(), "invalid regex for 'hostname': /web(/");
        assert!(selector.validate().is_err());
    }

    #[test]
    fn validate_accepts_implicit_invalid_regex() {
        let selector = Selector::populate([(NAME, "web("), ("rack", "r[")]);
        assert!(selector.validate().is_ok());
    }

    #[test]
    fn compiled_selector_matches_like_selector() {
        let selector =
            Selector::populate([(TAGS, "web+prod"), (HOSTNAME, "web.*"), ("rack", "r1")]);
        let compiled = selector.compile().expect("compile");
        let mut target = web_node();
        assert!(!compiled.matches(&target));
        target.attributes.insert("rack".to_string(), "r1".to_string());
        assert!(compiled.matches(&target));
        assert_eq!(selector.matches(&target).expect("match"), compiled.matches(&target));
        assert!(!compiled.matches(&node("web01")));
    }

    #[test]
    fn compile_error_names_attribute() {
        let selector = Selector::populate([("rack", "/r(/")]);
        let err = selector.compile().expect_err("invalid regex");
        assert_eq!(err.to_string(), "invalid regex for 'rack': /r(/");
    }

    #[test]
    fn display_lists_configured_fields() {
        let selector = Selector::populate([(TAGS, "web"), ("rack", "r1")]).with_dominant(true);
        assert_eq!(
            selector.to_string(),
            "{tags=web, dominant=true, attributes={rack=r1}}"
        );
    }
}
