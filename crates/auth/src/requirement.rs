//! Operation → requirement mapping (route guard table).
//!
//! Rules are evaluated in registration order and the first match wins.
//! Specific rules must therefore be registered before general ones; the
//! builder rejects literal rules that an earlier rule already covers.

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::permissions::Action;

/// What an operation needs: `action` on `resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub resource: String,
    pub action: Action,
}

impl Requirement {
    pub fn new(resource: impl Into<String>, action: Action) -> Self {
        Self {
            resource: resource.into(),
            action,
        }
    }
}

#[derive(Debug, Clone)]
pub enum OperationMatcher {
    /// The operation id must equal the literal.
    Exact(String),
    /// Segment-aware prefix: `/users` matches `/users` and `/users/42`,
    /// never `/usersettings`.
    Prefix(String),
    /// Regular expression over the whole operation id.
    Pattern(Regex),
}

impl OperationMatcher {
    pub fn matches(&self, operation_id: &str) -> bool {
        match self {
            OperationMatcher::Exact(literal) => operation_id == literal,
            OperationMatcher::Prefix(prefix) => match operation_id.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || prefix.ends_with('/') || rest.starts_with('/'),
                None => false,
            },
            OperationMatcher::Pattern(re) => re.is_match(operation_id),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            OperationMatcher::Exact(s) => format!("exact:{s}"),
            OperationMatcher::Prefix(s) => format!("prefix:{s}"),
            OperationMatcher::Pattern(re) => format!("regex:{}", re.as_str()),
        }
    }

    fn literal(&self) -> Option<&str> {
        match self {
            OperationMatcher::Exact(s) | OperationMatcher::Prefix(s) => Some(s),
            OperationMatcher::Pattern(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequirementRule {
    pub matcher: OperationMatcher,
    pub requirement: Requirement,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("rule '{rule}' can never match: shadowed by earlier rule '{by}'")]
    ShadowedRule { rule: String, by: String },

    #[error("rule '{0}' has an empty operation literal")]
    EmptyLiteral(String),
}

/// Ordered, read-only rule list.
#[derive(Debug, Clone, Default)]
pub struct RequirementRegistry {
    rules: Vec<RequirementRule>,
}

impl RequirementRegistry {
    pub fn builder() -> RequirementRegistryBuilder {
        RequirementRegistryBuilder::default()
    }

    /// First matching rule's requirement; `None` means the operation is public.
    pub fn resolve(&self, operation_id: &str) -> Option<&Requirement> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(operation_id))
            .map(|rule| &rule.requirement)
    }

    pub fn rules(&self) -> &[RequirementRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

enum PendingMatcher {
    Exact(String),
    Prefix(String),
    Pattern(String),
}

#[derive(Default)]
pub struct RequirementRegistryBuilder {
    pending: Vec<(PendingMatcher, Requirement)>,
}

impl RequirementRegistryBuilder {
    pub fn exact(mut self, operation_id: impl Into<String>, resource: impl Into<String>, action: Action) -> Self {
        self.pending
            .push((PendingMatcher::Exact(operation_id.into()), Requirement::new(resource, action)));
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>, resource: impl Into<String>, action: Action) -> Self {
        self.pending
            .push((PendingMatcher::Prefix(prefix.into()), Requirement::new(resource, action)));
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>, resource: impl Into<String>, action: Action) -> Self {
        self.pending
            .push((PendingMatcher::Pattern(pattern.into()), Requirement::new(resource, action)));
        self
    }

    /// Compile the rules and reject literal rules made unreachable by an
    /// earlier rule. Regex rules are compiled but not analysed.
    pub fn build(self) -> Result<RequirementRegistry, RegistryError> {
        let mut rules: Vec<RequirementRule> = Vec::with_capacity(self.pending.len());

        for (pending, requirement) in self.pending {
            let matcher = match pending {
                PendingMatcher::Exact(s) => OperationMatcher::Exact(s),
                PendingMatcher::Prefix(s) => OperationMatcher::Prefix(s),
                PendingMatcher::Pattern(p) => {
                    let anchored = format!("^(?:{p})$");
                    let re = Regex::new(&anchored).map_err(|e| RegistryError::InvalidPattern {
                        pattern: p.clone(),
                        message: e.to_string(),
                    })?;
                    OperationMatcher::Pattern(re)
                }
            };

            if let Some(literal) = matcher.literal() {
                if literal.is_empty() {
                    return Err(RegistryError::EmptyLiteral(matcher.describe()));
                }
                if let Some(earlier) = rules.iter().find(|r| shadows(&r.matcher, &matcher, literal)) {
                    return Err(RegistryError::ShadowedRule {
                        rule: matcher.describe(),
                        by: earlier.matcher.describe(),
                    });
                }
            }

            rules.push(RequirementRule { matcher, requirement });
        }

        Ok(RequirementRegistry { rules })
    }
}

/// Whether `earlier` matches every operation `later` could match.
fn shadows(earlier: &OperationMatcher, later: &OperationMatcher, literal: &str) -> bool {
    match later {
        OperationMatcher::Exact(_) => earlier.matches(literal),
        // A segment prefix of the later prefix covers everything under it.
        OperationMatcher::Prefix(_) => {
            matches!(earlier, OperationMatcher::Prefix(_)) && earlier.matches(literal)
        }
        OperationMatcher::Pattern(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins() {
        let registry = RequirementRegistry::builder()
            .prefix("/users/new", "users", Action::Manage)
            .prefix("/users", "users", Action::View)
            .build()
            .unwrap();

        assert_eq!(registry.resolve("/users/new").map(|r| r.action), Some(Action::Manage));
        assert_eq!(registry.resolve("/users/42").map(|r| r.action), Some(Action::View));
        assert_eq!(registry.resolve("/users").map(|r| r.action), Some(Action::View));
    }

    #[test]
    fn general_rule_before_specific_is_rejected() {
        let err = RequirementRegistry::builder()
            .prefix("/users", "users", Action::View)
            .prefix("/users/new", "users", Action::Manage)
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            RegistryError::ShadowedRule {
                rule: "prefix:/users/new".to_string(),
                by: "prefix:/users".to_string(),
            }
        );
    }

    #[test]
    fn exact_rule_after_covering_prefix_is_rejected() {
        let err = RequirementRegistry::builder()
            .prefix("/settings", "system", Action::View)
            .exact("/settings/billing", "billing", Action::Manage)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::ShadowedRule { .. }));
    }

    #[test]
    fn prefix_is_segment_aware() {
        let registry = RequirementRegistry::builder()
            .prefix("/users", "users", Action::View)
            .build()
            .unwrap();

        assert!(registry.resolve("/usersettings").is_none());
        assert!(registry.resolve("/users/7/edit").is_some());
    }

    #[test]
    fn sibling_prefixes_do_not_shadow() {
        let registry = RequirementRegistry::builder()
            .prefix("/user", "profile", Action::View)
            .prefix("/users", "users", Action::View)
            .build()
            .unwrap();
        assert_eq!(registry.resolve("/users").map(|r| r.resource.as_str()), Some("users"));
    }

    #[test]
    fn unmatched_operation_is_public() {
        let registry = RequirementRegistry::builder()
            .prefix("/accounting", "accounting", Action::View)
            .build()
            .unwrap();
        assert!(registry.resolve("/login").is_none());
    }

    #[test]
    fn regex_rules_match_whole_operation() {
        let registry = RequirementRegistry::builder()
            .pattern(r"(GET|POST) /api/invoices(/.*)?", "accounting", Action::View)
            .build()
            .unwrap();

        assert!(registry.resolve("GET /api/invoices/9").is_some());
        assert!(registry.resolve("DELETE /api/invoices/9").is_none());
        assert!(registry.resolve("xGET /api/invoices").is_none());
    }

    #[test]
    fn invalid_regex_is_reported() {
        let err = RequirementRegistry::builder()
            .pattern("(unclosed", "x", Action::View)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPattern { .. }));
    }
}
