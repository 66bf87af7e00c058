pub mod engine;
pub mod regex_filter;
pub mod string_filter;

/// Trait for extensible filtering
pub trait Filter: Send + Sync {
    fn matches(&self, line: &str) -> bool;
}

/// How the text typed into the filter prompt is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Plain,
    Regex,
}

impl FilterMode {
    pub fn toggle(self) -> Self {
        match self {
            FilterMode::Plain => FilterMode::Regex,
            FilterMode::Regex => FilterMode::Plain,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterMode::Plain => "Plain",
            FilterMode::Regex => "Regex",
        }
    }

    /// Compile `pattern` into a filter for this mode
    pub fn build(self, pattern: &str) -> Result<Box<dyn Filter>, regex::Error> {
        Ok(match self {
            FilterMode::Plain => Box::new(string_filter::StringFilter::new(pattern)),
            FilterMode::Regex => Box::new(regex_filter::RegexFilter::new(pattern)?),
        })
    }
}
