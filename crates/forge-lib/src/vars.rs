//! The variable resolver: substitutes `$ROOT`, `$APPNAME`/`$APP`,
//! `$UUID`, `$GITCOMMIT` in strings. A composite of single-variable
//! replacers, applied in order; `$UUID` expands fresh on every call, the
//! rest are constants for the lifetime of a loader.

use uuid::Uuid;

/// A single-variable replacer: substitutes one literal token for a value.
/// The current replacers are infallible, but the trait leaves room for one
/// that isn't (composition itself never fails).
trait Replacer {
    fn apply(&self, text: &str) -> String;
}

struct Literal {
    token: &'static str,
    value: String,
}

impl Replacer for Literal {
    fn apply(&self, text: &str) -> String {
        text.replace(self.token, &self.value)
    }
}

struct UuidToken;

impl Replacer for UuidToken {
    fn apply(&self, text: &str) -> String {
        if !text.contains("$UUID") {
            return text.to_string();
        }
        // A 20-character collision-resistant identifier: a v4 UUID's 16
        // bytes hex-encoded, truncated to 20 hex characters.
        let id = Uuid::new_v4().simple().to_string();
        text.replace("$UUID", &id[..20])
    }
}

/// The composite resolver applied to: include paths; task command; every
/// input path and env entry; every output path; upload destination fields.
pub struct VariableResolver {
    replacers: Vec<Box<dyn Replacer + Send + Sync>>,
}

impl VariableResolver {
    /// The include-path resolver: `$ROOT` only, used to resolve `app.includes`
    /// entries before the rest of the app's variables are known.
    pub fn root_only(root: impl Into<String>) -> Self {
        Self {
            replacers: vec![Box::new(Literal { token: "$ROOT", value: root.into() })],
        }
    }

    /// The full resolver, applied to every string field of every task.
    pub fn full(root: impl Into<String>, app_name: impl Into<String>, git_commit: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            replacers: vec![
                Box::new(Literal { token: "$ROOT", value: root.into() }),
                Box::new(Literal { token: "$APPNAME", value: app_name.clone() }),
                Box::new(Literal { token: "$APP", value: app_name }),
                Box::new(Literal { token: "$GITCOMMIT", value: git_commit.into() }),
                Box::new(UuidToken),
            ],
        }
    }

    pub fn resolve(&self, text: &str) -> String {
        let mut out = text.to_string();
        for replacer in &self.replacers {
            out = replacer.apply(&out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_all_known_tokens() {
        let resolver = VariableResolver::full("/repo", "pay", "abc123");
        let resolved = resolver.resolve("dist/$APPNAME-$GITCOMMIT.tar under $ROOT");
        assert_eq!(resolved, "dist/pay-abc123.tar under /repo");
    }

    #[test]
    fn uuid_expands_fresh_per_call() {
        let resolver = VariableResolver::full("/repo", "pay", "abc123");
        let first = resolver.resolve("$UUID");
        let second = resolver.resolve("$UUID");
        assert_ne!(first, second);
        assert_eq!(first.len(), 20);
    }

    #[test]
    fn root_only_resolver_leaves_other_tokens_untouched() {
        let resolver = VariableResolver::root_only("/repo");
        assert_eq!(resolver.resolve("$ROOT/$APPNAME"), "/repo/$APPNAME");
    }
}
