use crate::constants::TOPIC_SEPARATOR;
use std::fmt;

/// Topic prefix that always ends with a separator.
///
/// The prefix itself is the count topic; block `i` lives at `<prefix><i>`.
/// Receivers tell the two apart by the trailing separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPrefix(String);

impl TopicPrefix {
    pub fn new(raw: &str) -> Self {
        let mut prefix = raw.to_string();
        if !prefix.ends_with(TOPIC_SEPARATOR) {
            prefix.push(TOPIC_SEPARATOR);
        }
        TopicPrefix(prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Topic carrying the decimal block count.
    pub fn count_topic(&self) -> &str {
        &self.0
    }

    pub fn block_topic(
        &self,
        index: usize,
    ) -> String {
        format!("{}{}", self.0, index)
    }
}

impl fmt::Display for TopicPrefix {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}
