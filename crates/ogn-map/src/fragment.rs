/// Tracks URL fragments this viewer wrote so its own writes are not re-applied,
/// and suppresses writes while an incoming fragment is being applied.
#[derive(Debug, Default, Clone)]
pub struct FragmentGuard {
    last_written: Option<String>,
    applying: bool,
}

impl FragmentGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(fragment: &str) -> &str {
        fragment.strip_prefix('#').unwrap_or(fragment)
    }

    /// True when `fragment` is the one this viewer last wrote.
    pub fn is_own(&self, fragment: &str) -> bool {
        self.last_written.as_deref() == Some(Self::normalize(fragment))
    }

    /// Starts applying an external fragment. It becomes the reference for
    /// [`Self::is_own`] so a repeat delivery is ignored too.
    pub fn begin_apply(&mut self, fragment: &str) {
        self.last_written = Some(Self::normalize(fragment).to_string());
        self.applying = true;
    }

    pub fn end_apply(&mut self) {
        self.applying = false;
    }

    /// Records `fragment` as written; returns it unless a fragment is being applied.
    pub fn write(&mut self, fragment: String) -> Option<String> {
        if self.applying {
            return None;
        }
        self.last_written = Some(fragment.clone());
        Some(fragment)
    }

    pub fn last_written(&self) -> Option<&str> {
        self.last_written.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_writes_are_recognised() {
        let mut guard = FragmentGuard::new();
        assert_eq!(guard.write("a,b,".to_string()).as_deref(), Some("a,b,"));
        assert!(guard.is_own("#a,b,"));
        assert!(!guard.is_own("a,c,"));
    }

    #[test]
    fn writes_are_suppressed_while_applying() {
        let mut guard = FragmentGuard::new();
        guard.begin_apply("#x,,");
        assert!(guard.write("y,,".to_string()).is_none());
        assert!(guard.is_own("x,,"));
        guard.end_apply();
        assert!(guard.write("y,,".to_string()).is_some());
        assert!(guard.is_own("y,,"));
    }
}
