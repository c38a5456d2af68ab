//! Cut/Copy/Paste for the URL field's right-click menu.

/// Text clipboard the URL field edits through
pub trait TextClipboard {
    fn get_text(&mut self) -> Option<String>;
    fn set_text(&mut self, text: &str) -> bool;
}

/// The desktop clipboard. Kept alive for the app's lifetime; on X11 the
/// copied text is served by this handle.
pub struct SystemClipboard(arboard::Clipboard);

impl SystemClipboard {
    pub fn open() -> Option<Self> {
        match arboard::Clipboard::new() {
            Ok(clipboard) => Some(Self(clipboard)),
            Err(e) => {
                tracing::warn!("clipboard unavailable: {e}");
                None
            }
        }
    }
}

impl TextClipboard for SystemClipboard {
    fn get_text(&mut self) -> Option<String> {
        self.0.get_text().map_err(|e| tracing::debug!("clipboard read failed: {e}")).ok()
    }

    fn set_text(&mut self, text: &str) -> bool {
        self.0
            .set_text(text.to_owned())
            .map_err(|e| tracing::warn!("clipboard write failed: {e}"))
            .is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Cut,
    Copy,
    Paste,
}

impl EditAction {
    pub const ALL: [EditAction; 3] = [EditAction::Cut, EditAction::Copy, EditAction::Paste];

    pub fn label(self) -> &'static str {
        match self {
            EditAction::Cut => "Cut",
            EditAction::Copy => "Copy",
            EditAction::Paste => "Paste",
        }
    }
}

/// Applies `action` to the whole field. Cut only clears the field once the
/// text is on the clipboard; Paste replaces the field with the clipboard's
/// first line.
pub fn apply(action: EditAction, field: &mut String, clipboard: &mut impl TextClipboard) {
    match action {
        EditAction::Copy => {
            clipboard.set_text(field);
        }
        EditAction::Cut => {
            if clipboard.set_text(field) {
                field.clear();
            }
        }
        EditAction::Paste => {
            if let Some(text) = clipboard.get_text() {
                let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
                *field = line.to_owned();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Memory {
        text: Option<String>,
        broken: bool,
    }

    impl TextClipboard for Memory {
        fn get_text(&mut self) -> Option<String> {
            self.text.clone()
        }

        fn set_text(&mut self, text: &str) -> bool {
            if self.broken {
                return false;
            }
            self.text = Some(text.to_owned());
            true
        }
    }

    #[test]
    fn copy_keeps_the_field() {
        let mut clip = Memory::default();
        let mut field = "https://example.com/v".to_owned();
        apply(EditAction::Copy, &mut field, &mut clip);
        assert_eq!(field, "https://example.com/v");
        assert_eq!(clip.text.as_deref(), Some("https://example.com/v"));
    }

    #[test]
    fn cut_clears_only_after_a_successful_copy() {
        let mut clip = Memory::default();
        let mut field = "https://example.com/v".to_owned();
        apply(EditAction::Cut, &mut field, &mut clip);
        assert!(field.is_empty());
        assert_eq!(clip.text.as_deref(), Some("https://example.com/v"));

        let mut broken = Memory { broken: true, ..Memory::default() };
        let mut field = "keep me".to_owned();
        apply(EditAction::Cut, &mut field, &mut broken);
        assert_eq!(field, "keep me");
    }

    #[test]
    fn paste_takes_the_first_non_blank_line() {
        let mut clip = Memory { text: Some("\n  https://youtu.be/abc  \nsecond".into()), ..Memory::default() };
        let mut field = "old".to_owned();
        apply(EditAction::Paste, &mut field, &mut clip);
        assert_eq!(field, "https://youtu.be/abc");
    }

    #[test]
    fn paste_from_an_empty_clipboard_changes_nothing() {
        let mut clip = Memory::default();
        let mut field = "old".to_owned();
        apply(EditAction::Paste, &mut field, &mut clip);
        assert_eq!(field, "old");
    }
}
