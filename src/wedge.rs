//! Keyboard-wedge input.
//!
//! Fob readers and handheld barcode scanners present themselves as a
//! keyboard: they type the code and finish with Enter.

/// Key as seen by a wedge, independent of the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WedgeKey {
    Char(char),
    Enter,
    Other,
}

/// Accumulates typed characters until a terminator arrives.
#[derive(Debug, Default)]
pub struct KeyWedge {
    buffer: String,
}

impl KeyWedge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key. Returns the completed input on Enter.
    ///
    /// The buffer is reset on every Enter; empty input yields nothing.
    pub fn push(&mut self, key: WedgeKey) -> Option<String> {
        match key {
            WedgeKey::Char(c) => {
                self.buffer.push(c);
                None
            }
            WedgeKey::Enter => {
                let line = std::mem::take(&mut self.buffer);
                let line = line.trim();
                (!line.is_empty()).then(|| line.to_string())
            }
            WedgeKey::Other => None,
        }
    }

    /// Text typed so far
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(wedge: &mut KeyWedge, s: &str) {
        for c in s.chars() {
            assert_eq!(wedge.push(WedgeKey::Char(c)), None);
        }
    }

    #[test]
    fn emits_on_enter_and_resets() {
        let mut wedge = KeyWedge::new();
        type_str(&mut wedge, "0012345");
        assert_eq!(wedge.push(WedgeKey::Enter).as_deref(), Some("0012345"));
        assert_eq!(wedge.pending(), "");

        type_str(&mut wedge, "99");
        assert_eq!(wedge.push(WedgeKey::Enter).as_deref(), Some("99"));
    }

    #[test]
    fn empty_input_is_ignored() {
        let mut wedge = KeyWedge::new();
        assert_eq!(wedge.push(WedgeKey::Enter), None);
        wedge.push(WedgeKey::Other);
        assert_eq!(wedge.push(WedgeKey::Enter), None);
    }
}
