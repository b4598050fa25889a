//! State of the collapsible side panel.

/// Collapsible side panel holding the description, the basemap selector and the legend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidePanel {
    minimized: bool,
}

impl SidePanel {
    /// Creates an expanded panel.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if only the toggle button is shown.
    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Expands a minimized panel and minimizes an expanded one.
    pub fn toggle(&mut self) {
        self.minimized = !self.minimized;
    }

    /// Label of the toggle button.
    pub fn button_label(&self) -> &'static str {
        if self.minimized {
            "About the map"
        } else {
            "Minimize"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_label() {
        let mut panel = SidePanel::new();
        assert!(!panel.is_minimized());
        assert_eq!(panel.button_label(), "Minimize");

        panel.toggle();
        assert!(panel.is_minimized());
        assert_eq!(panel.button_label(), "About the map");

        panel.toggle();
        assert_eq!(panel.button_label(), "Minimize");
    }
}
