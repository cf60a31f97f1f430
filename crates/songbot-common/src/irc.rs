/// Struct of tags.
#[derive(Debug, Clone, Default)]
pub struct Tags {
    /// Badges of the user, like `broadcaster/1,subscriber/12`.
    pub badges: Option<String>,
}

impl Tags {
    /// Extract tags from message.
    pub fn from_tags<I, K, V>(tags: I) -> Tags
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut badges = None;

        for (key, value) in tags {
            match key.as_ref() {
                "badges" => badges = Some(value.as_ref().to_owned()),
                key => {
                    tracing::trace!(key, value = value.as_ref(), "unsupported tag");
                }
            }
        }

        Tags { badges }
    }

    /// Test if the user carries the given badge.
    pub fn has_badge(&self, name: &str) -> bool {
        let Some(badges) = &self.badges else {
            return false;
        };

        badges
            .split(',')
            .any(|badge| badge.split('/').next() == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::Tags;

    #[test]
    fn test_badges() {
        let tags = Tags::from_tags([
            ("badges", "moderator/1,subscriber/12"),
            ("display-name", "Alice"),
            ("color", "#FF0000"),
        ]);

        assert!(tags.has_badge("moderator"));
        assert!(tags.has_badge("subscriber"));
        assert!(!tags.has_badge("broadcaster"));
        assert!(!Tags::default().has_badge("moderator"));
    }
}
