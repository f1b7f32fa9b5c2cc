/// One order export, split into the two shapes the extractors scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    /// Trimmed, non-blank lines in source order.
    pub lines: Vec<String>,
    /// Whole text with every whitespace run (newlines included) collapsed to one space.
    pub flat: String,
}

impl NormalizedText {
    pub fn new(text: &str) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");

        Self { lines, flat }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
