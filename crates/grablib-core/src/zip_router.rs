//! Routes zip archive members to destination templates.

use crate::spec::ZipRules;

/// A member selected for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub member: String,
    /// Index of the winning rule in declaration order.
    pub rule_index: usize,
    /// Unresolved destination templates.
    pub destinations: Vec<String>,
}

/// For each member, the first rule matching at the start of its name wins.
/// Directories, members whose winning rule has no targets, and members no rule
/// matches are dropped.
pub fn route<S: AsRef<str>>(members: &[S], rules: &ZipRules) -> Vec<Route> {
    let mut routes = Vec::new();
    for member in members {
        let member = member.as_ref();
        if member.ends_with('/') {
            continue;
        }
        let Some((rule_index, rule)) = rules
            .rules
            .iter()
            .enumerate()
            .find(|(_, r)| r.matches(member))
        else {
            tracing::debug!("\"{}\" no target found", member);
            continue;
        };
        match &rule.targets {
            None => {
                tracing::debug!(
                    "\"{}\" skipping (regex: \"{}\")",
                    member,
                    rule.pattern.as_str()
                );
            }
            Some(targets) => routes.push(Route {
                member: member.to_string(),
                rule_index,
                destinations: targets.clone(),
            }),
        }
    }
    routes
}
