//! Minimal CSV dialect matching the spreadsheet export endpoint.
//!
//! Double quotes toggle quoted context and `""` inside quotes is a literal
//! quote. Outside quotes, `,` ends a cell and either `\n` or `\r` ends a row.
//! A terminator with nothing pending is ignored, so `\r\n` line endings and
//! blank lines never produce empty rows. There are no header semantics here.

use crate::types::{ExternalRow, Grid};

/// Parses `text` into rows of cells.
pub fn parse(text: &str) -> Grid {
   let mut rows = Grid::new();
   let mut row = ExternalRow::new();
   let mut cur = String::new();
   let mut in_quotes = false;

   let mut chars = text.chars().peekable();
   while let Some(ch) = chars.next() {
      match ch {
         '"' => {
            if in_quotes && chars.peek() == Some(&'"') {
               cur.push('"');
               chars.next();
            } else {
               in_quotes = !in_quotes;
            }
         },
         ',' if !in_quotes => row.push(std::mem::take(&mut cur)),
         '\n' | '\r' if !in_quotes => {
            if !cur.is_empty() || !row.is_empty() {
               row.push(std::mem::take(&mut cur));
               rows.push(std::mem::take(&mut row));
            }
         },
         _ => cur.push(ch),
      }
   }

   if !cur.is_empty() || !row.is_empty() {
      row.push(cur);
      rows.push(row);
   }
   rows
}

fn needs_quoting(cell: &str) -> bool {
   cell.contains([',', '"', '\n', '\r'])
}

/// Renders `grid` so that [`parse`] reads it back unchanged.
///
/// A row made of a single empty cell has no textual form in this dialect and
/// is dropped by the parser.
pub fn serialize(grid: &[ExternalRow]) -> String {
   let mut out = String::new();
   for (i, row) in grid.iter().enumerate() {
      if i > 0 {
         out.push('\n');
      }
      for (j, cell) in row.iter().enumerate() {
         if j > 0 {
            out.push(',');
         }
         if needs_quoting(cell) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
         } else {
            out.push_str(cell);
         }
      }
   }
   out
}
