use crate::adapter::DeviceDescriptor;

/// Accepts devices whose advertised name contains one of a set of
/// patterns, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    /// Lowercased, never empty.
    patterns: Vec<String>,
}

impl Default for DeviceFilter {
    fn default() -> Self {
        DeviceFilter::elite()
    }
}

impl DeviceFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        Self { patterns }
    }

    /// Elite trainers advertise either as "ELITE_..." or as "Suito...",
    /// depending on firmware and region.
    pub fn elite() -> Self {
        DeviceFilter::new(["ELITE_", "Suito"])
    }

    /// Only Suito-T trainers.
    pub fn suito_t() -> Self {
        DeviceFilter::new(["Suito-T"])
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches<I>(&self, device: &DeviceDescriptor<I>) -> bool {
        device
            .name
            .as_deref()
            .is_some_and(|name| self.matches_name(name))
    }

    pub fn matches_name(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        let name = name.to_lowercase();
        self.patterns.iter().any(|pattern| name.contains(pattern.as_str()))
    }
}
