use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::PipelineError;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded whitespace regex is valid"));

fn selector(css: &str) -> Result<Selector, PipelineError> {
    Selector::parse(css).map_err(|error| PipelineError::Markup(format!("invalid selector: {error}")))
}

pub(crate) fn clean_cell_text(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Reads the rows of the first `<table>` in `html`. Rows of nested tables
/// are not part of the outer table, and rows without cells are dropped.
pub(crate) fn parse_markup_table(html: &str) -> Result<Vec<Vec<String>>, PipelineError> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| PipelineError::Markup("no <table> element found".to_string()))?;

    let mut rows = Vec::new();
    for row in table.select(&row_selector) {
        let owned_by_table = row
            .ancestors()
            .find(|node| {
                node.value()
                    .as_element()
                    .is_some_and(|element| element.name() == "table")
            })
            .is_some_and(|node| node.id() == table.id());
        if !owned_by_table {
            continue;
        }

        let cells = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .map(|cell| clean_cell_text(&cell.text().collect::<String>()))
            .collect::<Vec<_>>();
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    Ok(rows)
}

pub(crate) fn max_width(rows: &[Vec<String>]) -> usize {
    rows.iter().map(Vec::len).max().unwrap_or(0)
}

pub(crate) fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

pub(crate) fn normalize_rows(rows: &[Vec<String>], width: usize) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let mut out = row.clone();
            if out.len() < width {
                out.resize(width, String::new());
            }
            out
        })
        .collect()
}
