/// Upload percentage for one in-flight submission.
///
/// Updates only arrive when the total size is known and nonzero; the value is
/// clamped to `0..=100` and never moves backwards until [`reset`](Self::reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    percent: u8,
}

impl UploadProgress {
    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn reset(&mut self) {
        self.percent = 0;
    }

    /// Returns the updated percentage, or `None` when the event carries no
    /// usable total.
    pub fn observe(&mut self, loaded: u64, total: Option<u64>) -> Option<u8> {
        let total = total.filter(|t| *t > 0)?;
        let ratio = loaded as f64 / total as f64;
        let pct = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;
        self.percent = self.percent.max(pct);
        Some(self.percent)
    }
}
