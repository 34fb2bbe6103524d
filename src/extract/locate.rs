//! Record container location
//!
//! Record containers are found with an ordered chain of strategies; the first
//! strategy that yields rows wins. Each strategy reduces whatever it found to
//! plain [`RawRow`]s so decoding never cares how the rows were laid out.

use scraper::{ElementRef, Html, Selector};

/// Class/id fragments that hint at a record container
const CONTAINER_HINTS: [&str; 4] = ["table", "list", "data", "result"];

/// Class fragments that mark a row inside a div-based grid
const GRID_ROW_HINTS: [&str; 3] = ["row", "item", "tr"];

/// Class fragments that mark a header row inside a div-based grid
const GRID_HEADER_HINTS: [&str; 2] = ["header", "thead"];

/// Ways of finding the record container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocateStrategy {
    /// The first `table` holding a data cell
    DirectTable,
    /// A `table` nested in a container whose class or id hints at records
    HintedContainer,
    /// A hinted element laid out as rows of child elements
    HintedGrid,
}

impl LocateStrategy {
    /// All strategies in priority order
    pub const CHAIN: [LocateStrategy; 3] = [
        LocateStrategy::DirectTable,
        LocateStrategy::HintedContainer,
        LocateStrategy::HintedGrid,
    ];

    /// Reads the rows this strategy finds, `None` when it finds no container
    pub(crate) fn rows(&self, document: &Html) -> Option<Vec<RawRow>> {
        match self {
            Self::DirectTable => direct_table(document),
            Self::HintedContainer => hinted_container(document),
            Self::HintedGrid => hinted_grid(document),
        }
    }
}

/// A cell reduced to its text and first link
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawCell {
    pub text: String,
    pub link: Option<String>,
}

impl RawCell {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A row reduced to its cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawRow {
    pub cells: Vec<RawCell>,
    /// Row sits in an explicit header section
    pub in_header: bool,
}

impl RawRow {
    pub fn non_empty_cells(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    pub fn has_link(&self) -> bool {
        self.cells.iter().any(|cell| cell.link.is_some())
    }

    pub fn texts(&self) -> Vec<&str> {
        self.cells.iter().map(|cell| cell.text.as_str()).collect()
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn collapse(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_link(element: &ElementRef) -> Option<String> {
    let anchor = selector("a[href]")?;
    element
        .select(&anchor)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:"))
        .map(str::to_string)
}

fn child_elements<'a>(element: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

fn hint_text(element: &ElementRef) -> String {
    let value = element.value();
    format!(
        "{} {}",
        value.attr("class").unwrap_or(""),
        value.attr("id").unwrap_or("")
    )
    .to_lowercase()
}

fn has_hint(element: &ElementRef, hints: &[&str]) -> bool {
    let text = hint_text(element);
    hints.iter().any(|hint| text.contains(hint))
}

fn table_row(tr: ElementRef) -> Option<RawRow> {
    let cells: Vec<RawCell> = child_elements(&tr)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| RawCell {
            text: collapse(&cell),
            link: first_link(&cell),
        })
        .collect();

    if cells.is_empty() {
        return None;
    }

    let in_header = tr
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| parent.value().name() == "thead");

    Some(RawRow { cells, in_header })
}

fn table_rows(table: ElementRef) -> Vec<RawRow> {
    let Some(tr) = selector("tr") else {
        return Vec::new();
    };
    table.select(&tr).filter_map(table_row).collect()
}

fn has_data_cell(table: &ElementRef) -> bool {
    selector("tr td").is_some_and(|cell| table.select(&cell).next().is_some())
}

fn direct_table(document: &Html) -> Option<Vec<RawRow>> {
    let table = selector("table")?;
    document
        .select(&table)
        .find(has_data_cell)
        .map(table_rows)
}

fn hinted_container(document: &Html) -> Option<Vec<RawRow>> {
    let containers = selector("div, section")?;
    let table = selector("table")?;

    document
        .select(&containers)
        .filter(|container| has_hint(container, &CONTAINER_HINTS))
        .find_map(|container| container.select(&table).next())
        .map(table_rows)
        .filter(|rows| !rows.is_empty())
}

fn grid_row(row: ElementRef, in_header: bool) -> Option<RawRow> {
    let children: Vec<ElementRef> = child_elements(&row).collect();
    let cells: Vec<RawCell> = if children.is_empty() {
        vec![RawCell {
            text: collapse(&row),
            link: first_link(&row),
        }]
    } else {
        children
            .iter()
            .map(|cell| RawCell {
                text: collapse(cell),
                link: first_link(cell),
            })
            .collect()
    };

    (!cells.is_empty()).then_some(RawRow { cells, in_header })
}

fn hinted_grid(document: &Html) -> Option<Vec<RawRow>> {
    let candidates = selector("div, section, ul")?;

    document
        .select(&candidates)
        .filter(|element| has_hint(element, &CONTAINER_HINTS))
        .find_map(|grid| {
            let mut rows = Vec::new();
            let mut data_rows = 0;

            for child in child_elements(&grid) {
                if has_hint(&child, &GRID_HEADER_HINTS) {
                    rows.extend(grid_row(child, true));
                } else if has_hint(&child, &GRID_ROW_HINTS) {
                    if let Some(row) = grid_row(child, false) {
                        data_rows += 1;
                        rows.push(row);
                    }
                }
            }

            (data_rows >= 2).then_some(rows)
        })
}

/// Finds an explicit header row outside the located container
///
/// Split-table widgets render the header in a table of its own.
pub(crate) fn detached_header(document: &Html) -> Option<RawRow> {
    let header_rows = selector("thead tr")?;
    document
        .select(&header_rows)
        .filter_map(table_row)
        .find(|row| row.non_empty_cells() >= 2)
}

/// Counts the rows of the first container the chain finds
///
/// A header-only table counts as one row.
pub fn count_rows(content: &str) -> usize {
    let document = Html::parse_document(content);
    LocateStrategy::CHAIN
        .iter()
        .find_map(|strategy| strategy.rows(&document))
        .map(|rows| rows.len())
        .unwrap_or(0)
}
