/// Port for reading proxy environment variables
pub trait EnvSource: Send + Sync {
    /// Raw value of exactly `name`
    fn var(&self, name: &str) -> Option<String>;

    /// Value of a conventional variable, lowercase spelling first
    ///
    /// Empty values count as unset.
    fn lookup(&self, name: &str) -> Option<String> {
        [name.to_ascii_lowercase(), name.to_ascii_uppercase()]
            .iter()
            .filter_map(|candidate| self.var(candidate))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}
