use crate::types::ProductMarker;

/// Substring filter picking one product's grids out of an archive listing
#[derive(Debug, Clone)]
pub struct MemberFilter<'a> {
    pub marker: &'a str,
    pub extension: &'a str,
    pub exclude: &'a str,
}

impl<'a> MemberFilter<'a> {
    pub fn new(marker: &'a ProductMarker, extension: &'a str, exclude: &'a str) -> Self {
        Self {
            marker: marker.as_str(),
            extension,
            exclude,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        name.contains(self.marker)
            && name.ends_with(self.extension)
            && (self.exclude.is_empty() || !name.contains(self.exclude))
    }

    /// Matching members, in archive order
    pub fn select(&self, names: &[String]) -> Vec<String> {
        names.iter().filter(|n| self.matches(n)).cloned().collect()
    }
}
