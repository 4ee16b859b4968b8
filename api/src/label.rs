use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLabel<'a>(Cow<'a, str>);

impl<'a> SourceLabel<'a> {
    pub fn new(name: impl ToString) -> SourceLabel<'static> {
        SourceLabel(Cow::Owned(name.to_string()))
    }

    pub const fn borrow(name: &'a str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl fmt::Display for SourceLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sources.knative.dev/{}", self.0)
    }
}

pub const CONTAINER_SOURCE_LABEL: SourceLabel<'static> = SourceLabel::borrow("containerSource");

/// Selector labels shared by a source's deployment and its pods.
pub fn source_labels(source_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(CONTAINER_SOURCE_LABEL.to_string(), source_name.to_string())])
}
