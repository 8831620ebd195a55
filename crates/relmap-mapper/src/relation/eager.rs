//! Eager-load specifications.
//!
//! An [`Eager`] lists the relationships to stitch after a fetch, in
//! resolution order. Through-relationships must list their join
//! relationship first; levels resolve strictly sequentially because
//! later levels read the stitched output of earlier ones.

use relmap_query::SelectBuilder;
use std::fmt;
use std::sync::Arc;

/// Callback adjusting the foreign fetch of one relationship before it
/// runs (extra criteria, ordering, limits).
pub type TuneFn = dyn Fn(SelectBuilder) -> SelectBuilder + Send + Sync;

/// One relationship to eager-load.
#[derive(Clone)]
pub struct EagerSpec {
    name: String,
    tune: Option<Arc<TuneFn>>,
}

impl EagerSpec {
    /// The relationship name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tune callback, if any.
    pub fn tune(&self) -> Option<&Arc<TuneFn>> {
        self.tune.as_ref()
    }
}

impl fmt::Debug for EagerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerSpec")
            .field("name", &self.name)
            .field("tuned", &self.tune.is_some())
            .finish()
    }
}

/// An ordered set of relationships to eager-load.
#[derive(Debug, Clone, Default)]
pub struct Eager {
    specs: Vec<EagerSpec>,
}

impl Eager {
    /// Load nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Load the named relationships, in order.
    #[must_use]
    pub fn with<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut eager = Self::default();
        for name in names {
            eager = eager.include(name);
        }
        eager
    }

    /// Append a relationship.
    #[must_use]
    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.specs.push(EagerSpec {
            name: name.into(),
            tune: None,
        });
        self
    }

    /// Append a relationship with a customization callback applied to
    /// its foreign fetch.
    #[must_use]
    pub fn include_tuned(
        mut self,
        name: impl Into<String>,
        tune: impl Fn(SelectBuilder) -> SelectBuilder + Send + Sync + 'static,
    ) -> Self {
        self.specs.push(EagerSpec {
            name: name.into(),
            tune: Some(Arc::new(tune)),
        });
        self
    }

    /// Whether anything is to be loaded.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Iterate over the specs in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &EagerSpec> {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_preserves_order() {
        let eager = Eager::with(["taggings", "tags"]);
        let names: Vec<_> = eager.iter().map(EagerSpec::name).collect();
        assert_eq!(names, vec!["taggings", "tags"]);
    }

    #[test]
    fn test_none_is_empty() {
        assert!(Eager::none().is_empty());
        assert!(!Eager::with(["replies"]).is_empty());
    }

    #[test]
    fn test_tuned_spec() {
        let eager = Eager::none().include_tuned("replies", |select| select.limit(5));
        let spec = eager.iter().next().unwrap();
        assert_eq!(spec.name(), "replies");
        assert!(spec.tune().is_some());

        let select = SelectBuilder::new("replies");
        let tuned = (spec.tune().unwrap())(select);
        assert!(tuned.build().sql.contains("LIMIT 5"));
    }
}
