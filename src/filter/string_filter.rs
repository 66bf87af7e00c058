use super::Filter;
use memchr::memmem;

/// Case-insensitive substring filter
pub struct StringFilter {
    finder: memmem::Finder<'static>,
}

impl StringFilter {
    pub fn new(pattern: &str) -> Self {
        Self {
            finder: memmem::Finder::new(pattern.to_lowercase().as_bytes()).into_owned(),
        }
    }
}

impl Filter for StringFilter {
    fn matches(&self, line: &str) -> bool {
        self.finder.find(line.to_lowercase().as_bytes()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive() {
        let filter = StringFilter::new("Error");

        assert!(filter.matches("ERROR: disk full"));
        assert!(filter.matches("an error occurred"));
        assert!(!filter.matches("all good"));
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        assert!(StringFilter::new("").matches("anything"));
    }

    #[test]
    fn test_unicode() {
        assert!(StringFilter::new("ÜBER").matches("{\"msg\":\"über\"}"));
    }
}
