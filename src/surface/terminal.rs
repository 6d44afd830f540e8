use colored::{ColoredString, Colorize};

use super::{Element, Grid};

/// Which element classes get special treatment when drawn.
#[derive(Debug, Clone, Default)]
pub(crate) struct Styles {
    pub(crate) focus: Option<String>,
    pub(crate) flash: Option<String>,
    pub(crate) highlight: Option<String>,
}

fn carries(element: &Element, class: &Option<String>) -> bool {
    class
        .as_ref()
        .map_or(false, |class| element.classes.contains(class))
}

fn paint(element: &Element, styles: &Styles) -> ColoredString {
    let text = if element.text.is_empty() {
        "   ".to_string()
    } else {
        format!(" {} ", element.text)
    };

    if carries(element, &styles.flash) {
        return text.bold().white().on_blue();
    }
    if carries(element, &styles.focus) || carries(element, &styles.highlight) {
        return text.black().on_yellow();
    }
    match element.background.as_deref() {
        Some("black") => text.on_black(),
        Some("white") => text.black().on_white(),
        Some(other) => text.on_color(other.to_string()),
        None => text.normal(),
    }
}

/// Draws the grid as rows of coloured cells, prefixed with a cursor-home
/// escape so repeated renders overwrite each other.
pub(crate) fn render(grid: &Grid) -> String {
    let mut output = String::from("\x1b[H");
    for row in grid.elements.chunks(grid.columns) {
        for element in row {
            output.push_str(&paint(element, &grid.styles).to_string());
        }
        output.push('\n');
    }
    output
}
