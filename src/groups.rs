//! # Group-Filter Engine
//!
//! Dependencies can be categorized into groups. A dependency which belongs
//! to a group is optional and only materialized when a filter selects one
//! of its groups. Filters are written as `+group`, `-group`, `+group@path`
//! or `-group@path` and are evaluated in order: the manifest's
//! `group-filters` first, then filters inherited from ancestor manifests
//! via `with-groups`, then command-line filters. Within the effective list,
//! the last matching rule per group wins.
//!
//! The engine reports which rule decided a project, so `info dep-tree
//! --primary` can explain why a dependency is (not) part of the workspace.

use crate::error::{Error, Result};
use crate::manifest::check_identifier;

/// A single parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFilter {
    /// `true` for `+group`, `false` for `-group`.
    pub select: bool,

    /// Group name the rule applies to.
    pub group: String,

    /// Optional workspace path the rule is limited to. Matches on exact
    /// equality with the project's resolved path.
    pub path: Option<String>,
}

impl GroupFilter {
    /// Parse a filter expression.
    ///
    /// # Examples
    ///
    /// ```
    /// use git_ws::groups::GroupFilter;
    ///
    /// let filter = GroupFilter::parse("+test").unwrap();
    /// assert!(filter.select);
    /// assert_eq!(filter.group, "test");
    /// assert_eq!(filter.path, None);
    ///
    /// let filter = GroupFilter::parse("-doc@third_party/doc").unwrap();
    /// assert!(!filter.select);
    /// assert_eq!(filter.path.as_deref(), Some("third_party/doc"));
    ///
    /// assert!(GroupFilter::parse("test").is_err());
    /// ```
    pub fn parse(expr: &str) -> Result<GroupFilter> {
        let expr = expr.trim();
        let err = |reason: &str| Error::InvalidGroupFilter {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };
        let (select, rest) = match expr.chars().next() {
            Some('+') => (true, &expr[1..]),
            Some('-') => (false, &expr[1..]),
            _ => return Err(err("must start with '+' or '-'")),
        };
        let (group, path) = match rest.split_once('@') {
            Some((group, path)) => {
                if path.is_empty() {
                    return Err(err("empty path after '@'"));
                }
                (group, Some(path.to_string()))
            }
            None => (rest, None),
        };
        check_identifier(group).map_err(|_| err("group is not a valid identifier"))?;
        Ok(GroupFilter {
            select,
            group: group.to_string(),
            path,
        })
    }

    /// Parse a list of expressions, in order.
    pub fn parse_list(exprs: &[String]) -> Result<Vec<GroupFilter>> {
        exprs.iter().map(|expr| GroupFilter::parse(expr)).collect()
    }
}

impl std::fmt::Display for GroupFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.select { '+' } else { '-' };
        match &self.path {
            Some(path) => write!(f, "{sign}{}@{path}", self.group),
            None => write!(f, "{sign}{}", self.group),
        }
    }
}

/// Which source contributed a rule to the effective filter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterSource {
    /// The main manifest's `group-filters` list.
    Manifest,
    /// `with-groups` at an ancestor dependency site.
    Inherited,
    /// Command-line `--group-filter` arguments.
    CommandLine,
}

impl std::fmt::Display for FilterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FilterSource::Manifest => "manifest",
            FilterSource::Inherited => "with-groups",
            FilterSource::CommandLine => "command line",
        };
        f.write_str(name)
    }
}

/// A filter rule plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub filter: GroupFilter,
    pub source: FilterSource,
}

/// Outcome of evaluating a project against the effective filter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the project is part of the workspace.
    pub selected: bool,

    /// The rule which decided the outcome, if any rule matched at all.
    pub winner: Option<FilterRule>,
}

impl Decision {
    fn unconditional() -> Decision {
        Decision {
            selected: true,
            winner: None,
        }
    }
}

/// The effective, ordered filter list for one resolution context.
///
/// Rules are kept in evaluation order: manifest rules, then inherited
/// `with-groups` rules, then command-line rules. [`GroupSelection::child`]
/// derives the context for a dependency's own manifest by inserting its
/// `with-groups` in front of the command-line rules.
#[derive(Debug, Clone, Default)]
pub struct GroupSelection {
    rules: Vec<FilterRule>,
}

impl GroupSelection {
    /// Build the main resolution context.
    pub fn new(manifest_filters: &[GroupFilter], cli_filters: &[GroupFilter]) -> GroupSelection {
        let mut rules = Vec::with_capacity(manifest_filters.len() + cli_filters.len());
        rules.extend(manifest_filters.iter().map(|filter| FilterRule {
            filter: filter.clone(),
            source: FilterSource::Manifest,
        }));
        rules.extend(cli_filters.iter().map(|filter| FilterRule {
            filter: filter.clone(),
            source: FilterSource::CommandLine,
        }));
        GroupSelection { rules }
    }

    /// Derive the context for a dependency manifest, activating the groups
    /// listed at the dependency site via `with-groups`.
    pub fn child(&self, with_groups: &[String]) -> GroupSelection {
        let mut rules = self.rules.clone();
        let insert_at = rules
            .iter()
            .position(|rule| rule.source == FilterSource::CommandLine)
            .unwrap_or(rules.len());
        let inherited = with_groups.iter().map(|group| FilterRule {
            filter: GroupFilter {
                select: true,
                group: group.clone(),
                path: None,
            },
            source: FilterSource::Inherited,
        });
        rules.splice(insert_at..insert_at, inherited);
        GroupSelection { rules }
    }

    /// Evaluate the predicate for a candidate `(groups, path)`.
    ///
    /// The main project is always selected; so is any project with an empty
    /// group list. Otherwise the project is selected iff at least one of
    /// its groups ends up selected after the last matching rule per group
    /// has spoken.
    pub fn decide(&self, path: &str, groups: &[String], is_main: bool) -> Decision {
        if is_main || groups.is_empty() {
            return Decision::unconditional();
        }
        let mut states: Vec<(bool, Option<&FilterRule>)> = vec![(false, None); groups.len()];
        for rule in &self.rules {
            if rule
                .filter
                .path
                .as_deref()
                .is_some_and(|rule_path| rule_path != path)
            {
                continue;
            }
            for (group, state) in groups.iter().zip(states.iter_mut()) {
                if *group == rule.filter.group {
                    *state = (rule.filter.select, Some(rule));
                }
            }
        }
        let selected = states.iter().any(|(selected, _)| *selected);
        let winner = states
            .iter()
            .filter(|(state, _)| *state == selected)
            .filter_map(|(_, rule)| *rule)
            .next_back()
            .cloned();
        Decision { selected, winner }
    }

    /// The rules of this context, in evaluation order.
    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(exprs: &[&str]) -> Vec<GroupFilter> {
        exprs
            .iter()
            .map(|expr| GroupFilter::parse(expr).unwrap())
            .collect()
    }

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_parse_rejects_bare_group() {
        assert!(GroupFilter::parse("test").is_err());
        assert!(GroupFilter::parse("").is_err());
        assert!(GroupFilter::parse("+no spaces").is_err());
        assert!(GroupFilter::parse("+g@").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for expr in ["+test", "-doc", "+feature@dep/path"] {
            assert_eq!(GroupFilter::parse(expr).unwrap().to_string(), expr);
        }
    }

    #[test]
    fn test_main_always_selected() {
        let selection = GroupSelection::new(&filters(&["-dev"]), &[]);
        assert!(selection.decide("app", &groups(&["dev"]), true).selected);
    }

    #[test]
    fn test_empty_groups_always_selected() {
        let selection = GroupSelection::new(&filters(&["-dev"]), &[]);
        let decision = selection.decide("iolib", &[], false);
        assert!(decision.selected);
        assert!(decision.winner.is_none());
    }

    #[test]
    fn test_grouped_project_needs_plus_rule() {
        let selection = GroupSelection::new(&[], &[]);
        assert!(!selection.decide("simpleut", &groups(&["dev"]), false).selected);

        let selection = GroupSelection::new(&[], &filters(&["+dev"]));
        assert!(selection.decide("simpleut", &groups(&["dev"]), false).selected);
    }

    #[test]
    fn test_last_match_wins() {
        let selection = GroupSelection::new(&filters(&["+test", "-test"]), &[]);
        assert!(!selection.decide("p", &groups(&["test"]), false).selected);

        let selection = GroupSelection::new(&filters(&["-test", "+test"]), &[]);
        assert!(selection.decide("p", &groups(&["test"]), false).selected);
    }

    #[test]
    fn test_cli_overrides_manifest() {
        let selection = GroupSelection::new(&filters(&["+test"]), &filters(&["-test"]));
        assert!(!selection.decide("p", &groups(&["test"]), false).selected);
    }

    #[test]
    fn test_path_qualified_rule() {
        let selection = GroupSelection::new(&filters(&["+feature@dep"]), &[]);
        assert!(selection.decide("dep", &groups(&["feature"]), false).selected);
        assert!(!selection.decide("sub", &groups(&["feature"]), false).selected);
    }

    #[test]
    fn test_any_selected_group_suffices() {
        let selection = GroupSelection::new(&filters(&["+test", "-doc"]), &[]);
        assert!(selection.decide("p", &groups(&["test", "doc"]), false).selected);
    }

    #[test]
    fn test_unknown_group_filter_is_noop() {
        let selection = GroupSelection::new(&filters(&["+nosuch"]), &[]);
        assert!(!selection.decide("p", &groups(&["dev"]), false).selected);
        assert!(selection.decide("p", &[], false).selected);
    }

    #[test]
    fn test_child_inserts_with_groups_before_cli() {
        // with-groups selects 'doc' for the child context, but the command
        // line still has the last word.
        let selection = GroupSelection::new(&[], &filters(&["-doc"]));
        let child = selection.child(&groups(&["doc"]));
        assert!(!child.decide("p", &groups(&["doc"]), false).selected);

        let selection = GroupSelection::new(&[], &[]);
        let child = selection.child(&groups(&["doc"]));
        assert!(child.decide("p", &groups(&["doc"]), false).selected);
    }

    #[test]
    fn test_winner_trace() {
        let selection = GroupSelection::new(&filters(&["+test"]), &filters(&["-test"]));
        let decision = selection.decide("p", &groups(&["test"]), false);
        let winner = decision.winner.unwrap();
        assert_eq!(winner.source, FilterSource::CommandLine);
        assert_eq!(winner.filter.to_string(), "-test");
    }

    #[test]
    fn test_monotonic_enable() {
        // Enabling a group never removes a previously selected project.
        let base = GroupSelection::new(&filters(&["+a"]), &[]);
        let more = GroupSelection::new(&filters(&["+a", "+b"]), &[]);
        for (path, grps) in [("x", groups(&["a"])), ("y", groups(&["a", "b"]))] {
            if base.decide(path, &grps, false).selected {
                assert!(more.decide(path, &grps, false).selected);
            }
        }
    }
}
