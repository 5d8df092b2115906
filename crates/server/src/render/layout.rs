//! Pure layout arithmetic for the document renderer.
//!
//! Everything here is an explicit accumulator: a [`Cursor`] goes in, a
//! [`Placement`] and the advanced cursor come out. Page-break decisions are
//! made per block, never inside one, so each block type is testable on its
//! own. Coordinates are top-down millimetres; the drawing layer converts to
//! PDF's bottom-up space at the last moment.

pub const PAGE_WIDTH: f64 = 210.0;
pub const PAGE_HEIGHT: f64 = 297.0;
pub const MARGIN: f64 = 20.0;
pub const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;

/// First baseline on a page.
pub const TOP_OFFSET: f64 = 20.0;
/// Content never descends into the footer band.
pub const FOOTER_RESERVE: f64 = 25.0;

pub const BODY_LINE_HEIGHT: f64 = 6.0;
pub const TABLE_LINE_HEIGHT: f64 = 4.5;
pub const CELL_PADDING: f64 = 1.5;

const PT_TO_MM: f64 = 0.352_778;
/// Average glyph advance as a fraction of the font size. Helvetica averages
/// close to half an em for mixed-case prose.
const AVG_GLYPH_EM: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cursor {
    pub page: usize,
    pub y: f64,
}

impl Cursor {
    pub fn start() -> Self {
        Self { page: 0, y: TOP_OFFSET }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub page: usize,
    pub y: f64,
    pub broke_page: bool,
}

/// Places a block of the given height: either at the current cursor, or at
/// the top of a fresh page when the remaining space is insufficient. A block
/// taller than a whole page still gets a fresh page and overflows it, the
/// same way the layout treats any oversized block.
pub fn place_block(cursor: Cursor, height: f64) -> (Placement, Cursor) {
    let limit = PAGE_HEIGHT - FOOTER_RESERVE;

    if cursor.y + height > limit && cursor.y > TOP_OFFSET {
        let placement = Placement { page: cursor.page + 1, y: TOP_OFFSET, broke_page: true };
        let next = Cursor { page: cursor.page + 1, y: TOP_OFFSET + height };
        (placement, next)
    } else {
        let placement = Placement { page: cursor.page, y: cursor.y, broke_page: false };
        let next = Cursor { page: cursor.page, y: cursor.y + height };
        (placement, next)
    }
}

/// Same-page advance for spacing between already-placed blocks.
pub fn advance(cursor: Cursor, dy: f64) -> Cursor {
    Cursor { page: cursor.page, y: cursor.y + dy }
}

/// Estimated width of a run of text, from the average-glyph model. Good
/// enough for centering headings and sizing table columns; not a shaping
/// engine.
pub fn text_width(text: &str, font_size_pt: f64) -> f64 {
    text.chars().count() as f64 * font_size_pt * AVG_GLYPH_EM * PT_TO_MM
}

/// X offset that centers `text` on the page.
pub fn centered_x(text: &str, font_size_pt: f64) -> f64 {
    ((PAGE_WIDTH - text_width(text, font_size_pt)) / 2.0).max(MARGIN)
}

/// How many characters fit a column of `width_mm` at the given font size.
pub fn max_chars_per_line(width_mm: f64, font_size_pt: f64) -> usize {
    let glyph = font_size_pt * AVG_GLYPH_EM * PT_TO_MM;
    ((width_mm / glyph).floor() as usize).max(1)
}

/// Greedy word wrap. Words longer than a line are hard-split rather than
/// overflowing the column.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split_at = word
                .char_indices()
                .nth(max_chars)
                .map(|(idx, _)| idx)
                .unwrap_or(word.len());
            lines.push(word[..split_at].to_string());
            word = &word[split_at..];
        }

        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Wraps every cell of a row into its column and returns the wrapped cells
/// plus the row height the tallest cell dictates.
pub fn measure_row(cells: &[String], col_widths: &[f64], font_size_pt: f64) -> (Vec<Vec<String>>, f64) {
    let wrapped: Vec<Vec<String>> = cells
        .iter()
        .zip(col_widths)
        .map(|(cell, width)| {
            let usable = (width - 2.0 * CELL_PADDING).max(1.0);
            wrap_text(cell, max_chars_per_line(usable, font_size_pt))
        })
        .collect();

    let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1);
    let height = line_count as f64 * TABLE_LINE_HEIGHT + 2.0 * CELL_PADDING;
    (wrapped, height)
}

/// Total height of a table: header row plus every measured body row.
pub fn table_height(rows: &[Vec<String>], col_widths: &[f64], font_size_pt: f64) -> f64 {
    let header = TABLE_LINE_HEIGHT + 2.0 * CELL_PADDING;
    header
        + rows
            .iter()
            .map(|row| measure_row(row, col_widths, font_size_pt).1)
            .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::{
        advance, centered_x, max_chars_per_line, measure_row, place_block, table_height,
        wrap_text, Cursor, CELL_PADDING, FOOTER_RESERVE, MARGIN, PAGE_HEIGHT, TABLE_LINE_HEIGHT,
        TOP_OFFSET,
    };

    #[test]
    fn block_that_fits_stays_on_the_current_page() {
        let cursor = Cursor::start();
        let (placement, next) = place_block(cursor, 50.0);

        assert!(!placement.broke_page);
        assert_eq!(placement.page, 0);
        assert_eq!(placement.y, TOP_OFFSET);
        assert_eq!(next.y, TOP_OFFSET + 50.0);
    }

    #[test]
    fn block_that_does_not_fit_breaks_to_a_fresh_page() {
        let cursor = Cursor { page: 0, y: PAGE_HEIGHT - FOOTER_RESERVE - 10.0 };
        let (placement, next) = place_block(cursor, 30.0);

        assert!(placement.broke_page);
        assert_eq!(placement.page, 1);
        assert_eq!(placement.y, TOP_OFFSET);
        assert_eq!(next.page, 1);
        assert_eq!(next.y, TOP_OFFSET + 30.0);
    }

    #[test]
    fn block_ending_exactly_at_the_limit_fits() {
        let limit = PAGE_HEIGHT - FOOTER_RESERVE;
        let cursor = Cursor { page: 2, y: limit - 30.0 };
        let (placement, _) = place_block(cursor, 30.0);

        assert!(!placement.broke_page);
        assert_eq!(placement.page, 2);
    }

    #[test]
    fn oversized_block_at_page_top_is_placed_without_breaking() {
        // Nothing would be gained by breaking: the block cannot fit anywhere.
        let cursor = Cursor::start();
        let (placement, _) = place_block(cursor, PAGE_HEIGHT * 2.0);

        assert!(!placement.broke_page);
        assert_eq!(placement.page, 0);
    }

    #[test]
    fn advance_moves_without_page_breaks() {
        let cursor = advance(Cursor::start(), 12.5);
        assert_eq!(cursor.page, 0);
        assert_eq!(cursor.y, TOP_OFFSET + 12.5);
    }

    #[test]
    fn wrap_respects_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 15);
        assert!(lines.iter().all(|line| line.chars().count() <= 15));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn wrap_hard_splits_oversized_words() {
        let lines = wrap_text("reorganization memorandum", 8);
        assert!(lines.iter().all(|line| line.chars().count() <= 8));
        assert_eq!(lines.concat().replace(' ', ""), "reorganizationmemorandum");
    }

    #[test]
    fn wrap_of_empty_text_yields_one_blank_line() {
        assert_eq!(wrap_text("", 40), vec![String::new()]);
    }

    #[test]
    fn row_height_follows_the_tallest_cell() {
        let widths = [10.0, 60.0];
        let cells = vec![
            "1".to_string(),
            "a considerably longer remark that needs several wrapped lines to fit".to_string(),
        ];
        let (wrapped, height) = measure_row(&cells, &widths, 8.0);

        assert_eq!(wrapped[0].len(), 1);
        assert!(wrapped[1].len() > 1);
        assert_eq!(height, wrapped[1].len() as f64 * TABLE_LINE_HEIGHT + 2.0 * CELL_PADDING);
    }

    #[test]
    fn table_height_sums_header_and_rows() {
        let widths = [20.0, 60.0];
        let rows =
            vec![vec!["1".to_string(), "short".to_string()], vec!["2".to_string(), "short".to_string()]];

        let header = TABLE_LINE_HEIGHT + 2.0 * CELL_PADDING;
        let row = TABLE_LINE_HEIGHT + 2.0 * CELL_PADDING;
        assert_eq!(table_height(&rows, &widths, 8.0), header + 2.0 * row);
    }

    #[test]
    fn centered_x_never_crosses_the_margin() {
        let very_long = "x".repeat(400);
        assert_eq!(centered_x(&very_long, 16.0), MARGIN);
        assert!(centered_x("MEMORANDUM", 14.0) > MARGIN);
    }

    #[test]
    fn narrow_columns_still_fit_at_least_one_character() {
        assert_eq!(max_chars_per_line(0.5, 8.0), 1);
    }
}
