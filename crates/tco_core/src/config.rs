/// Per-decoration configuration.
///
/// There is no persisted or file-based configuration layer: decoration has
/// no persisted state, and the only knob is an opt-in toggle for more
/// verbose error payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// When set, `NotTailRecursive` violation messages include the
    /// offending sub-expression's reconstructed source alongside the line
    /// number, rather than just a category label.
    pub verbose_errors: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }
}
