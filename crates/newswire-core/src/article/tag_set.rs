use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Upper bound on tags per article
pub const MAX_TAGS: usize = 8;

/// Set of short lowercase topic tags, never more than [`MAX_TAGS`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    /// Build a tag set, lowercasing and trimming each tag.
    ///
    /// Duplicates collapse. Blank tags or more than [`MAX_TAGS`] distinct
    /// tags are rejected.
    pub fn new<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for tag in tags {
            let tag = tag.as_ref().trim().to_lowercase();
            if tag.is_empty() {
                return Err(Error::InvalidTagSet("blank tag".to_string()));
            }
            set.insert(tag);
        }

        if set.len() > MAX_TAGS {
            return Err(Error::InvalidTagSet(format!(
                "{} tags exceeds the limit of {}",
                set.len(),
                MAX_TAGS
            )));
        }

        Ok(Self(set))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for TagSet {
    type Error = Error;

    fn try_from(tags: Vec<String>) -> Result<Self> {
        Self::new(tags)
    }
}

impl From<TagSet> for Vec<String> {
    fn from(tags: TagSet) -> Self {
        tags.0.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_and_dedupes() {
        let tags = TagSet::new(["Budget", " budget ", "TAX"]).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("budget"));
        assert!(tags.contains("tax"));
    }

    #[test]
    fn test_rejects_more_than_eight() {
        let tags: Vec<String> = (0..9).map(|i| format!("tag-{}", i)).collect();
        let err = TagSet::new(&tags).unwrap_err();
        assert!(matches!(err, Error::InvalidTagSet(_)));

        assert_eq!(TagSet::new(&tags[..8]).unwrap().len(), MAX_TAGS);
    }

    #[test]
    fn test_rejects_blank_tag() {
        assert!(TagSet::new(["economy", "  "]).is_err());
    }

    #[test]
    fn test_empty_is_valid() {
        let tags = TagSet::new(Vec::<String>::new()).unwrap();
        assert!(tags.is_empty());
        assert_eq!(tags, TagSet::empty());
    }
}
