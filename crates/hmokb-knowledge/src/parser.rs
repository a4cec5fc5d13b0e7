//! Structural parser: benefits HTML → ordered [`Entry`] sequence.
//!
//! One pass over `h2`, `h3`, `p`, `ul` and `table` elements in document
//! order. The only traversal state is the current `h2` title, carried in an
//! explicit accumulator folded over the matched elements. An `h3` emits
//! nothing; it becomes a list's subtitle only as that list's immediate
//! previous sibling.

use hmokb_core::error::{HmoKbError, Result};
use hmokb_core::types::{CellContext, Entry};
use scraper::{ElementRef, Html, Node, Selector};

/// Separator between list items in a list entry's content.
pub const LIST_ITEM_SEPARATOR: &str = " \n ";

/// Compiled selectors; build once, parse many documents.
#[derive(Debug, Clone)]
pub struct StructuralParser {
    blocks: Selector,
    rows: Selector,
    thead_rows: Selector,
    labels: Selector,
}

impl StructuralParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            blocks: compile("h2, h3, p, ul, table")?,
            rows: compile("tr")?,
            thead_rows: compile("thead tr")?,
            labels: compile("strong")?,
        })
    }

    /// Parse one document. Empty or binary input is a [`HmoKbError::Parse`].
    pub fn parse(&self, doc_id: &str, html: &str) -> Result<Vec<Entry>> {
        if html.trim().is_empty() {
            return Err(HmoKbError::parse(doc_id, "empty document"));
        }
        if html.contains('\0') {
            return Err(HmoKbError::parse(doc_id, "binary content"));
        }

        let document = Html::parse_document(html);
        let acc = document
            .select(&self.blocks)
            .fold(Accumulator::default(), |acc, element| {
                acc.visit(self, doc_id, element)
            });
        Ok(acc.entries)
    }

    fn table_entries(&self, doc_id: &str, title: &str, table: ElementRef<'_>) -> Vec<Entry> {
        let rows: Vec<ElementRef<'_>> = table.select(&self.rows).collect();
        let header_row = table
            .select(&self.thead_rows)
            .next()
            .or_else(|| rows.first().copied());
        let headers: Vec<String> = header_row
            .map(|row| row_cells(row).into_iter().map(|c| joined_text(c, " ")).collect())
            .unwrap_or_default();
        let header_id = header_row.map(|row| row.id());

        let mut entries = Vec::new();
        for row in rows {
            if Some(row.id()) == header_id {
                continue;
            }
            let cells = row_cells(row);
            if !cells.iter().any(|c| c.value().name() == "td") {
                continue;
            }
            let subject = joined_text(cells[0], " ");
            if subject.is_empty() {
                tracing::debug!("{doc_id}: skipping table row without a subject");
                continue;
            }

            for (col_idx, cell) in cells.iter().enumerate().skip(1) {
                let column = headers
                    .get(col_idx)
                    .filter(|h| !h.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("Column {}", col_idx + 1));
                let context = |level: String| CellContext {
                    row: subject.clone(),
                    column: column.clone(),
                    level,
                };

                let labels: Vec<ElementRef<'_>> = cell.select(&self.labels).collect();
                if labels.is_empty() {
                    let content = joined_text(*cell, " ");
                    if !content.is_empty() {
                        entries.push(Entry::table_cell(doc_id, title, context(String::new()), content));
                    }
                    continue;
                }

                for label in labels {
                    let level = joined_text(label, "").replace(':', "").trim().to_string();
                    let mut content = labelled_text(label);
                    if content.is_empty() {
                        content = joined_text(*cell, " ");
                    }
                    entries.push(Entry::table_cell(doc_id, title, context(level), content));
                }
            }
        }
        entries
    }
}

fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HmoKbError::parse("<selectors>", format!("{css}: {e:?}")))
}

#[derive(Default)]
struct Accumulator {
    title: String,
    entries: Vec<Entry>,
}

impl Accumulator {
    fn visit(mut self, parser: &StructuralParser, doc_id: &str, element: ElementRef<'_>) -> Self {
        let tag = element.value().name();
        // Blocks nested in a table or list item are covered by their container.
        if !matches!(tag, "h2" | "h3") && nested_in_container(element) {
            return self;
        }

        match tag {
            "h2" => self.title = joined_text(element, " "),
            "h3" => {}
            "p" => {
                let content = joined_text(element, " ");
                if !content.is_empty() {
                    self.entries.push(Entry::paragraph(doc_id, &self.title, content));
                }
            }
            "ul" => {
                let items: Vec<String> = element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| child.value().name() == "li")
                    .map(|li| joined_text(li, " "))
                    .filter(|text| !text.is_empty())
                    .collect();
                if !items.is_empty() {
                    let subtitle = immediate_subheading(element);
                    self.entries.push(Entry::list(
                        doc_id,
                        &self.title,
                        subtitle,
                        items.join(LIST_ITEM_SEPARATOR),
                    ));
                }
            }
            "table" => {
                let cells = parser.table_entries(doc_id, &self.title, element);
                self.entries.extend(cells);
            }
            _ => {}
        }
        self
    }
}

/// `th`/`td` children of a row, in column order.
fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "th" | "td"))
        .collect()
}

fn nested_in_container(element: ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| matches!(e.name(), "table" | "li"))
    })
}

/// Text of the `h3` directly above a list, ignoring blank text and comments.
/// Any other non-blank sibling in between means the list is not an
/// elaboration of that sub-heading.
fn immediate_subheading(list: ElementRef<'_>) -> Option<String> {
    for node in list.prev_siblings() {
        match node.value() {
            Node::Text(text) if text.trim().is_empty() => continue,
            Node::Comment(_) => continue,
            _ => {
                return ElementRef::wrap(node)
                    .filter(|e| e.value().name() == "h3")
                    .map(|h3| joined_text(h3, " "))
                    .filter(|text| !text.is_empty());
            }
        }
    }
    None
}

/// Text between a sub-label and the next sibling sub-label.
fn labelled_text(label: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for node in label.next_siblings() {
        let piece = match node.value() {
            Node::Text(text) => collapse_whitespace(text),
            Node::Element(e) if e.name() == "strong" => break,
            Node::Element(_) => ElementRef::wrap(node)
                .map(|e| joined_text(e, " "))
                .unwrap_or_default(),
            _ => String::new(),
        };
        if !piece.is_empty() {
            parts.push(piece);
        }
    }
    parts.join(" ").trim().to_string()
}

/// Descendant text nodes, whitespace-collapsed, blanks dropped, joined by `sep`.
fn joined_text(element: ElementRef<'_>, sep: &str) -> String {
    element
        .text()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
