use super::Filter;
use regex::{Regex, RegexBuilder};

/// Compiled program limit for patterns typed into the prompt
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Regex filter over the raw line text, case-sensitive unless the
/// pattern says `(?i)`
pub struct RegexFilter {
    regex: Regex,
}

impl RegexFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()?;
        Ok(Self { regex })
    }
}

impl Filter for RegexFilter {
    fn matches(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}
