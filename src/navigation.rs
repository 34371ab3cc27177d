#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Start,
    Scanner,
}

impl Screen {
    /// The start button only exists on the start screen.
    pub fn start_scan(self) -> Screen {
        match self {
            Screen::Start => Screen::Scanner,
            other => other,
        }
    }

    /// Back from the scanner, once it agreed to close.
    pub fn back(self) -> Screen {
        Screen::Start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_button_opens_scanner_once() {
        let screen = Screen::default();
        assert_eq!(screen.start_scan(), Screen::Scanner);
        assert_eq!(Screen::Scanner.start_scan(), Screen::Scanner);
        assert_eq!(Screen::Scanner.back(), Screen::Start);
    }
}
