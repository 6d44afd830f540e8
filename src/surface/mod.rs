// src/surface/mod.rs

pub mod terminal;

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::config::ClassesConfig;

/// Presentation surface addressed by element id.
///
/// Stimulators only toggle style classes and background colours; how that is
/// drawn is up to the implementation.
pub trait Surface {
    fn add_class(&mut self, id: &str, class: &str);
    fn remove_class(&mut self, id: &str, class: &str);
    fn set_background(&mut self, id: &str, color: Option<&str>);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: String,
    pub text: String,
    pub classes: BTreeSet<String>,
    pub background: Option<String>,
}

/// One recorded mutation of the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    AddClass { id: String, class: String },
    RemoveClass { id: String, class: String },
    Background { id: String, color: Option<String> },
}

#[derive(Debug, Default)]
pub(crate) struct Grid {
    pub(crate) elements: Vec<Element>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) columns: usize,
    pub(crate) changes: Vec<Change>,
    pub(crate) styles: terminal::Styles,
    pub(crate) live: bool,
}

// ELEMENT SURFACE -------------------------------------------------------------

/// In-memory element table laid out as a grid. Clones share state, so a
/// caller can keep a handle while a stimulator owns the boxed surface.
#[derive(Debug, Clone)]
pub struct ElementSurface {
    grid: Rc<RefCell<Grid>>,
}

impl ElementSurface {
    fn from_elements(elements: Vec<Element>, columns: usize, styles: terminal::Styles) -> Self {
        let index = elements
            .iter()
            .enumerate()
            .map(|(i, element)| (element.id.clone(), i))
            .collect();
        Self {
            grid: Rc::new(RefCell::new(Grid {
                elements,
                index,
                columns: columns.max(1),
                changes: Vec::new(),
                styles,
                live: false,
            })),
        }
    }

    /// One element per symbol, id `<symbol class>_<index>`.
    pub fn speller_grid(symbols: &[char], columns: usize, classes: &ClassesConfig) -> Self {
        let elements = symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| Element {
                id: symbol_id(&classes.symbol, i),
                text: symbol.to_string(),
                classes: BTreeSet::from([classes.symbol.clone()]),
                background: None,
            })
            .collect();

        let styles = terminal::Styles {
            focus: Some(classes.focus.clone()),
            flash: Some(classes.flash.clone()),
            highlight: None,
        };
        Self::from_elements(elements, columns, styles)
    }

    /// `rows x columns` cells with ids `cell_<row>_<column>`.
    pub fn flicker_grid(rows: usize, columns: usize, class: &str) -> Self {
        let mut elements = Vec::with_capacity(rows * columns);
        for row in 0..rows {
            for column in 0..columns {
                elements.push(Element {
                    id: format!("cell_{}_{}", row, column),
                    text: String::new(),
                    classes: BTreeSet::from([class.to_string()]),
                    background: None,
                });
            }
        }

        let styles = terminal::Styles {
            focus: None,
            flash: None,
            highlight: Some("highlight".to_string()),
        };
        Self::from_elements(elements, columns, styles)
    }

    /// Redraw the grid in the terminal after every change.
    pub fn set_live(&self, live: bool) {
        self.grid.borrow_mut().live = live;
    }

    pub fn ids(&self) -> Vec<String> {
        self.grid
            .borrow()
            .elements
            .iter()
            .map(|element| element.id.clone())
            .collect()
    }

    /// Ids of all elements carrying `class`, in grid order.
    pub fn ids_with_class(&self, class: &str) -> Vec<String> {
        self.grid
            .borrow()
            .elements
            .iter()
            .filter(|element| element.classes.contains(class))
            .map(|element| element.id.clone())
            .collect()
    }

    pub fn element(&self, id: &str) -> Option<Element> {
        let grid = self.grid.borrow();
        grid.index.get(id).map(|&i| grid.elements[i].clone())
    }

    pub fn has_class(&self, id: &str, class: &str) -> bool {
        self.element(id)
            .map(|element| element.classes.contains(class))
            .unwrap_or(false)
    }

    pub fn background(&self, id: &str) -> Option<String> {
        self.element(id).and_then(|element| element.background)
    }

    pub fn changes(&self) -> Vec<Change> {
        self.grid.borrow().changes.clone()
    }

    pub fn render(&self) -> String {
        terminal::render(&self.grid.borrow())
    }

    fn mutate(&mut self, id: &str, change: Change, apply: impl FnOnce(&mut Element)) {
        let mut grid = self.grid.borrow_mut();
        let Some(&i) = grid.index.get(id) else {
            tracing::warn!("Unknown element id {}", id);
            return;
        };
        apply(&mut grid.elements[i]);
        grid.changes.push(change);
        if grid.live {
            print!("{}", terminal::render(&grid));
        }
    }
}

impl Surface for ElementSurface {
    fn add_class(&mut self, id: &str, class: &str) {
        let change = Change::AddClass {
            id: id.to_string(),
            class: class.to_string(),
        };
        self.mutate(id, change, |element| {
            element.classes.insert(class.to_string());
        });
    }

    fn remove_class(&mut self, id: &str, class: &str) {
        let change = Change::RemoveClass {
            id: id.to_string(),
            class: class.to_string(),
        };
        self.mutate(id, change, |element| {
            element.classes.remove(class);
        });
    }

    fn set_background(&mut self, id: &str, color: Option<&str>) {
        let change = Change::Background {
            id: id.to_string(),
            color: color.map(str::to_string),
        };
        self.mutate(id, change, |element| {
            element.background = color.map(str::to_string);
        });
    }
}

pub fn symbol_id(prefix: &str, index: usize) -> String {
    format!("{}_{}", prefix, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speller_grid_ids_follow_symbol_class() {
        let surface = ElementSurface::speller_grid(&['A', 'B', 'C'], 2, &ClassesConfig::default());
        assert_eq!(surface.ids(), vec!["symbol_0", "symbol_1", "symbol_2"]);
        assert_eq!(surface.element("symbol_1").unwrap().text, "B");
        assert!(surface.has_class("symbol_2", "symbol"));
    }

    #[test]
    fn class_toggling_is_recorded() {
        let mut surface = ElementSurface::flicker_grid(2, 2, "cell");
        let handle = surface.clone();

        surface.add_class("cell_1_0", "highlight");
        assert!(handle.has_class("cell_1_0", "highlight"));
        surface.remove_class("cell_1_0", "highlight");
        surface.set_background("cell_0_1", Some("black"));

        assert!(!handle.has_class("cell_1_0", "highlight"));
        assert_eq!(handle.background("cell_0_1").as_deref(), Some("black"));
        assert_eq!(handle.changes().len(), 3);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut surface = ElementSurface::flicker_grid(1, 1, "cell");
        surface.add_class("cell_9_9", "highlight");
        assert!(surface.changes().is_empty());
    }
}
