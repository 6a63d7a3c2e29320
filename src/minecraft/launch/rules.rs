use crate::minecraft::dto::piston_meta::Rule;
use crate::utils::system_info::{Architecture, OperatingSystem, ARCHITECTURE, OS};

pub struct RuleProcessor;

impl RuleProcessor {
    fn rule_matches(rule: &Rule, os: OperatingSystem, arch: Architecture) -> bool {
        if let Some(os_rule) = &rule.os {
            if let Some(required) = &os_rule.name {
                match os.rule_name() {
                    Some(current) if current == required => {}
                    _ => return false,
                }
            }
            if let Some(required) = &os_rule.arch {
                match arch.rule_name() {
                    Some(current) if current == required => {}
                    _ => return false,
                }
            }
            // os.version constraints are regexes over the kernel version;
            // no shipped version JSON gates anything we support on it.
        }

        if let Some(features) = &rule.features {
            // None of the optional launcher features (demo mode, quick play,
            // custom resolution) are active, so any requested feature fails.
            if features.values().any(|required| *required) {
                return false;
            }
        }

        true
    }

    fn evaluate(rules: &[Rule], os: OperatingSystem, arch: Architecture) -> bool {
        // Last matching rule wins; with rules present and none matching,
        // nothing allowed the entry.
        let mut allowed = false;
        for rule in rules {
            if Self::rule_matches(rule, os, arch) {
                allowed = rule.action == "allow";
            }
        }
        allowed
    }

    /// A library is included iff the last matching rule allows it, or no
    /// rules are attached at all.
    pub fn library_allowed(rules: &Option<Vec<Rule>>) -> bool {
        Self::library_allowed_for(rules, OS, ARCHITECTURE)
    }

    pub fn library_allowed_for(
        rules: &Option<Vec<Rule>>,
        os: OperatingSystem,
        arch: Architecture,
    ) -> bool {
        match rules {
            None => true,
            Some(rules) if rules.is_empty() => true,
            Some(rules) => Self::evaluate(rules, os, arch),
        }
    }

    /// Conditional arguments use the same evaluation.
    pub fn argument_allowed(rules: &[Rule]) -> bool {
        if rules.is_empty() {
            return true;
        }
        Self::evaluate(rules, OS, ARCHITECTURE)
    }
}
