//! Include/exclude resolution for a single selection request.

use std::fmt;
use std::path::PathBuf;

use tracing::trace;

use crate::core::selector::{CompiledSelector, Selector};
use crate::error::SelectionError;
use crate::node::NodeEntry;

/// Include and exclude selectors plus an optional single-node override.
///
/// Selectors are compiled when installed, so evaluating nodes cannot fail.
///
/// Also carries execution hints (`thread_count`, `keepgoing`,
/// `failed_nodes_file`) for whoever runs work on the selected nodes. They do
/// not affect selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSet {
    include: Option<CompiledSelector>,
    exclude: Option<CompiledSelector>,
    single_node: Option<String>,
    pub thread_count: usize,
    pub keepgoing: bool,
    pub failed_nodes_file: Option<PathBuf>,
}

impl Default for NodeSet {
    fn default() -> Self {
        Self {
            include: None,
            exclude: None,
            single_node: None,
            thread_count: 1,
            keepgoing: false,
            failed_nodes_file: None,
        }
    }
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node set that selects exactly the node named `name`.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            single_node: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn for_node(node: &impl NodeEntry) -> Self {
        Self::single(node.nodename())
    }

    pub fn include(&self) -> Option<&Selector> {
        self.include.as_ref().map(CompiledSelector::selector)
    }

    pub fn exclude(&self) -> Option<&Selector> {
        self.exclude.as_ref().map(CompiledSelector::selector)
    }

    pub fn single_node(&self) -> Option<&str> {
        self.single_node.as_deref()
    }

    pub fn set_single_node(&mut self, name: Option<String>) {
        self.single_node = name;
    }

    /// Install the include selector. Fails if one is already set.
    pub fn set_include(&mut self, selector: Selector) -> Result<&Selector, SelectionError> {
        if self.include.is_some() {
            return Err(SelectionError::DuplicateInclude);
        }
        let compiled = selector.compile()?;
        Ok(self.include.insert(compiled).selector())
    }

    /// Install the exclude selector. Fails if one is already set.
    pub fn set_exclude(&mut self, selector: Selector) -> Result<&Selector, SelectionError> {
        if self.exclude.is_some() {
            return Err(SelectionError::DuplicateExclude);
        }
        let compiled = selector.compile()?;
        Ok(self.exclude.insert(compiled).selector())
    }

    /// Populate and install the include selector from configuration keys.
    pub fn create_include<K, V>(
        &mut self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<&Selector, SelectionError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.set_include(Selector::populate(entries))
    }

    /// Populate and install the exclude selector from configuration keys.
    pub fn create_exclude<K, V>(
        &mut self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<&Selector, SelectionError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.set_exclude(Selector::populate(entries))
    }

    /// True if no filter is configured at all.
    pub fn is_blank(&self) -> bool {
        is_unset(self.include()) && is_unset(self.exclude()) && self.single_node.is_none()
    }

    /// Decide whether `node` is left out of the selection.
    ///
    /// - A single-node override excludes every other node.
    /// - With only an include, nodes it does not match are excluded. With
    ///   nothing configured, every node is excluded.
    /// - With only an exclude, nodes it matches are excluded.
    /// - With both, a dominant include keeps every node it matches; otherwise
    ///   the exclude wins.
    pub fn should_exclude(&self, node: &impl NodeEntry) -> bool {
        if let Some(name) = &self.single_node {
            return name != node.nodename();
        }

        let includes_match = self.include.as_ref().is_some_and(|s| s.matches(node));
        let excludes_match = self.exclude.as_ref().is_some_and(|s| s.matches(node));

        let excluded = if is_unset(self.exclude()) {
            !includes_match
        } else if is_unset(self.include()) {
            excludes_match
        } else if self.include().is_some_and(Selector::is_dominant) {
            !includes_match && excludes_match
        } else {
            !includes_match || excludes_match
        };
        trace!(
            node = node.nodename(),
            includes_match, excludes_match, excluded, "node verdict"
        );
        excluded
    }

    /// Check execution hints.
    ///
    /// A `failed_nodes_file` that is still an unexpanded `${...}` property
    /// reference is dropped.
    pub fn validate(&mut self) -> Result<(), SelectionError> {
        if self.thread_count == 0 {
            return Err(SelectionError::InvalidThreadCount);
        }
        let unexpanded = self
            .failed_nodes_file
            .as_ref()
            .and_then(|path| path.file_name())
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("${") && name.ends_with('}'));
        if unexpanded {
            self.failed_nodes_file = None;
        }
        Ok(())
    }
}

fn is_unset(selector: Option<&Selector>) -> bool {
    selector.is_none_or(Selector::is_blank)
}

impl fmt::Display for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeSet{{")?;
        if let Some(exclude) = self.exclude().filter(|s| !s.is_blank()) {
            write!(f, "excludes={exclude}, ")?;
        }
        if let Some(include) = self.include().filter(|s| !s.is_blank()) {
            write!(f, "includes={include}")?;
        }
        if let Some(name) = &self.single_node {
            write!(f, "singleNode={name}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::selector::{NAME, OS_FAMILY, TAGS};
    use crate::node::Node;
    use crate::test_support::{fleet, node, web_node};

    fn with_filters(include: Option<Selector>, exclude: Option<Selector>) -> NodeSet {
        let mut set = NodeSet::new();
        if let Some(include) = include {
            set.set_include(include).expect("include");
        }
        if let Some(exclude) = exclude {
            set.set_exclude(exclude).expect("exclude");
        }
        set
    }

    fn excluded(set: &NodeSet, node: &Node) -> bool {
        set.should_exclude(node)
    }

    #[test]
    fn unconfigured_set_excludes_everything() {
        let set = NodeSet::new();
        assert!(set.is_blank());
        for target in fleet() {
            assert!(excluded(&set, &target));
        }
    }

    #[test]
    fn single_node_overrides_filters() {
        let mut set = with_filters(
            Some(Selector::populate([(TAGS, "db")])),
            Some(Selector::populate([(NAME, "web01")])),
        );
        set.set_single_node(Some("web01".to_string()));
        assert!(!set.is_blank());
        for target in fleet() {
            assert_eq!(excluded(&set, &target), target.nodename != "web01");
        }
    }

    #[test]
    fn for_node_selects_only_that_node() {
        let set = NodeSet::for_node(&web_node());
        assert_eq!(set.single_node(), Some("web01"));
        assert!(!excluded(&set, &web_node()));
        assert!(excluded(&set, &node("db01")));
    }

    #[test]
    fn include_only_excludes_non_matching() {
        let include = Selector::populate([(TAGS, "web")]);
        for exclude in [None, Some(Selector::default())] {
            let set = with_filters(Some(include.clone()), exclude);
            for target in fleet() {
                let matched = include.matches(&target).expect("match");
                assert_eq!(excluded(&set, &target), !matched);
            }
        }
    }

    #[test]
    fn exclude_only_excludes_matching() {
        let exclude = Selector::populate([(OS_FAMILY, "windows")]);
        for include in [None, Some(Selector::default())] {
            let set = with_filters(include, Some(exclude.clone()));
            for target in fleet() {
                let matched = exclude.matches(&target).expect("match");
                assert_eq!(excluded(&set, &target), matched);
            }
        }
    }

    #[test]
    fn exclude_wins_when_include_not_dominant() {
        let set = with_filters(
            Some(Selector::populate([(TAGS, "web+prod")])),
            Some(Selector::populate([(OS_FAMILY, "unix")])),
        );
        let target = web_node();
        assert!(set.include().expect("include").matches(&target).expect("match"));
        assert!(set.exclude().expect("exclude").matches(&target).expect("match"));
        assert!(excluded(&set, &target));
    }

    #[test]
    fn dominant_include_wins() {
        let set = with_filters(
            Some(Selector::populate([(TAGS, "web+prod")]).with_dominant(true)),
            Some(Selector::populate([(OS_FAMILY, "unix")])),
        );
        assert!(!excluded(&set, &web_node()));
    }

    #[test]
    fn dominant_include_only_drops_nodes_matching_exclude() {
        let set = with_filters(
            Some(Selector::populate([(TAGS, "web")]).with_dominant(true)),
            Some(Selector::populate([(OS_FAMILY, "windows")])),
        );
        let verdicts: Vec<(String, bool)> = fleet()
            .into_iter()
            .map(|target| {
                let verdict = excluded(&set, &target);
                (target.nodename, verdict)
            })
            .collect();
        assert_eq!(
            verdicts,
            vec![
                ("web01".to_string(), false),
                ("web02".to_string(), false),
                ("db01".to_string(), false),
                ("win01".to_string(), true),
            ]
        );
    }

    #[test]
    fn second_include_or_exclude_is_rejected() {
        let mut set = NodeSet::new();
        set.create_include([(TAGS, "web")]).expect("include");
        assert!(matches!(
            set.create_include([(TAGS, "db")]),
            Err(SelectionError::DuplicateInclude)
        ));
        set.create_exclude([(TAGS, "db")]).expect("exclude");
        assert!(matches!(
            set.create_exclude([(TAGS, "web")]),
            Err(SelectionError::DuplicateExclude)
        ));
    }

    #[test]
    fn invalid_explicit_regex_is_rejected_at_configuration() {
        let mut set = NodeSet::new();
        let err = set.create_include([(TAGS, "/web(/+prod")]).expect_err("invalid");
        assert!(matches!(err, SelectionError::InvalidPattern { ref field, .. } if field == "tags"));
        assert!(set.include().is_none());
    }

    #[test]
    fn installed_selectors_keep_their_expressions() {
        let include = Selector::populate([(TAGS, "web,db"), ("rack", "r1")]).with_dominant(true);
        let mut set = NodeSet::new();
        assert_eq!(set.set_include(include.clone()).expect("include"), &include);
        assert_eq!(set.include(), Some(&include));

        let copy = set.clone();
        assert_eq!(copy, set);
        for target in fleet() {
            assert_eq!(excluded(&copy, &target), excluded(&set, &target));
        }
    }

    #[test]
    fn validate_drops_unexpanded_failed_nodes_file() {
        let mut set = NodeSet {
            failed_nodes_file: Some(PathBuf::from("/tmp/${failed.file}")),
            ..NodeSet::new()
        };
        set.validate().expect("validate");
        assert_eq!(set.failed_nodes_file, None);

        set.failed_nodes_file = Some(PathBuf::from("/tmp/failed.txt"));
        set.validate().expect("validate");
        assert_eq!(set.failed_nodes_file, Some(PathBuf::from("/tmp/failed.txt")));
    }

    #[test]
    fn validate_rejects_zero_threads() {
        let mut set = NodeSet {
            thread_count: 0,
            ..NodeSet::new()
        };
        assert!(matches!(
            set.validate(),
            Err(SelectionError::InvalidThreadCount)
        ));
    }

    #[test]
    fn display_shows_configured_parts() {
        let set = with_filters(
            Some(Selector::populate([(TAGS, "web")])),
            Some(Selector::populate([(OS_FAMILY, "windows")])),
        );
        assert_eq!(
            set.to_string(),
            "NodeSet{excludes={os-family=windows, dominant=false}, includes={tags=web, dominant=false}}"
        );
        assert_eq!(NodeSet::single("web01").to_string(), "NodeSet{singleNode=web01}");
    }
}
