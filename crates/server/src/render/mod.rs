//! Document rendering engine.
//!
//! Produces the paginated memo artifact in a single pass over a vertical
//! cursor: fixed header, metadata fields with a priority badge, word-wrapped
//! body, the approval table, comment blocks with embedded signature images,
//! then a footer pass stamping every produced page. Serialization happens
//! only after all content is placed.
//!
//! Signature fetches are the one fallible external input; a failed fetch is
//! logged and the block renders without the image.

pub mod layout;
pub mod signature;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerIndex, PdfLayerReference, PdfPageIndex, Point, Polygon, Rgb,
};
use thiserror::Error;
use tracing::warn;

use memoreg_core::config::RenderingConfig;
use memoreg_db::repositories::MemoDetail;

use layout::{
    advance, centered_x, max_chars_per_line, measure_row, place_block, table_height, wrap_text,
    Cursor, BODY_LINE_HEIGHT, CELL_PADDING, CONTENT_WIDTH, MARGIN, PAGE_HEIGHT, PAGE_WIDTH,
    TABLE_LINE_HEIGHT,
};
use signature::SignatureFetcher;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("font load failed: {0}")]
    Font(String),
    #[error("signature fetcher initialization failed: {0}")]
    Fetcher(String),
    #[error("document serialization failed: {0}")]
    Serialize(String),
}

/// A finished artifact plus the page count the layout produced.
pub struct RenderedMemo {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

pub struct DocumentRenderer {
    config: RenderingConfig,
    fetcher: SignatureFetcher,
}

const APPROVAL_COLUMNS: [f64; 7] = [8.0, 32.0, 22.0, 24.0, 22.0, 24.0, 38.0];
const APPROVAL_HEADER: [&str; 7] =
    ["#", "Approver", "Role", "Department", "Status", "Date", "Comments"];
const TABLE_FONT_SIZE: f64 = 8.0;
const SIGNATURE_BOX_W: f64 = 40.0;
const SIGNATURE_BOX_H: f64 = 16.0;
const IMAGE_DPI: f64 = 300.0;

impl DocumentRenderer {
    pub fn new(config: RenderingConfig) -> Result<Self, RenderError> {
        let fetcher =
            SignatureFetcher::new(&config).map_err(|e| RenderError::Fetcher(e.to_string()))?;
        Ok(Self { config, fetcher })
    }

    /// Renders the memo to PDF bytes. The caller resolves the memo first;
    /// a missing memo never reaches this point.
    pub async fn render_memo(&self, detail: &MemoDetail) -> Result<RenderedMemo, RenderError> {
        let signatures = self.fetch_signatures(detail).await;
        assemble_document(&self.config, detail, &signatures)
    }

    /// Resolves signature images for every comment author that carries a
    /// reference. Failures are non-fatal by contract.
    async fn fetch_signatures(&self, detail: &MemoDetail) -> HashMap<String, DynamicImage> {
        let mut images = HashMap::new();

        for comment in &detail.comments {
            let Some(reference) = comment.author.signature_ref.as_deref() else {
                continue;
            };

            match self.fetcher.fetch(reference).await {
                Ok(image) => {
                    images.insert(comment.id.0.clone(), image);
                }
                Err(error) => {
                    warn!(
                        event_name = "render.signature_fetch_failed",
                        memo_id = %detail.memo.id.0,
                        comment_id = %comment.id.0,
                        error = %error,
                        "signature unavailable, rendering without it"
                    );
                }
            }
        }

        images
    }
}

struct PageSet {
    pages: Vec<(PdfPageIndex, PdfLayerIndex)>,
}

impl PageSet {
    fn layer_for(&mut self, doc: &PdfDocumentReference, page: usize) -> PdfLayerReference {
        while self.pages.len() <= page {
            let (p, l) = doc.add_page(Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
            self.pages.push((p, l));
        }
        let (p, l) = self.pages[page];
        doc.get_page(p).get_layer(l)
    }

    fn count(&self) -> usize {
        self.pages.len()
    }
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn white() -> Color {
    Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None))
}

fn gray(level: f64) -> Color {
    Color::Rgb(Rgb::new(level as f32, level as f32, level as f32, None))
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0, None))
}

/// Table header fill, matching the dashboard accent.
fn table_header_fill() -> Color {
    rgb(59, 130, 246)
}

/// Draws text at a top-down y coordinate.
fn draw_text(
    layer: &PdfLayerReference,
    text: &str,
    size: f64,
    x: f64,
    y_top: f64,
    font: &IndirectFontRef,
) {
    layer.use_text(text, size as f32, Mm(x as f32), Mm((PAGE_HEIGHT - y_top) as f32), font);
}

fn fill_rect(layer: &PdfLayerReference, x: f64, y_top: f64, width: f64, height: f64, color: Color) {
    layer.set_fill_color(color);
    let rect = Polygon {
        rings: vec![vec![
            (Point::new(Mm(x as f32), Mm((PAGE_HEIGHT - y_top) as f32)), false),
            (Point::new(Mm((x + width) as f32), Mm((PAGE_HEIGHT - y_top) as f32)), false),
            (Point::new(Mm((x + width) as f32), Mm((PAGE_HEIGHT - y_top - height) as f32)), false),
            (Point::new(Mm(x as f32), Mm((PAGE_HEIGHT - y_top - height) as f32)), false),
        ]],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    };
    layer.add_polygon(rect);
    layer.set_fill_color(black());
}

fn stroke_line(layer: &PdfLayerReference, from: (f64, f64), to: (f64, f64)) {
    let line = Line {
        points: vec![
            (Point::new(Mm(from.0 as f32), Mm((PAGE_HEIGHT - from.1) as f32)), false),
            (Point::new(Mm(to.0 as f32), Mm((PAGE_HEIGHT - to.1) as f32)), false),
        ],
        is_closed: false,
    };
    layer.add_line(line);
}

fn separator(layer: &PdfLayerReference, y_top: f64) {
    layer.set_outline_color(gray(0.78));
    layer.set_outline_thickness(0.2);
    stroke_line(layer, (MARGIN, y_top), (PAGE_WIDTH - MARGIN, y_top));
}

fn format_long_date(ts: DateTime<Utc>) -> String {
    ts.format("%B %-d, %Y").to_string()
}

fn format_short_date(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Single-pass assembly over the layout cursor. Pure with respect to I/O:
/// signatures arrive pre-fetched, so tests can drive it directly.
pub(crate) fn assemble_document(
    config: &RenderingConfig,
    detail: &MemoDetail,
    signatures: &HashMap<String, DynamicImage>,
) -> Result<RenderedMemo, RenderError> {
    let memo = &detail.memo;
    let title = format!("memo-{}", memo.reference_number);
    let (doc, first_page, first_layer) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Font(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Font(e.to_string()))?;

    let mut pages = PageSet { pages: vec![(first_page, first_layer)] };
    let mut cursor = Cursor::start();

    // -- Header block, fixed top offset
    {
        let layer = pages.layer_for(&doc, cursor.page);
        let org = &config.organization_name;
        draw_text(&layer, org, 16.0, centered_x(org, 16.0), cursor.y, &bold);
        cursor = advance(cursor, 10.0);

        let abbr = &config.organization_abbr;
        draw_text(&layer, abbr, 12.0, centered_x(abbr, 12.0), cursor.y, &font);
        cursor = advance(cursor, 15.0);

        draw_text(&layer, "MEMORANDUM", 14.0, centered_x("MEMORANDUM", 14.0), cursor.y, &bold);
        cursor = advance(cursor, 15.0);
    }

    // -- Metadata fields
    {
        let layer = pages.layer_for(&doc, cursor.page);

        draw_text(&layer, &format!("Reference: {}", memo.reference_number), 10.0, MARGIN, cursor.y, &font);
        draw_text(
            &layer,
            &format!("Type: {}", memo.memo_type.label()),
            10.0,
            PAGE_WIDTH - 70.0,
            cursor.y,
            &font,
        );
        cursor = advance(cursor, 10.0);

        // Priority badge, color keyed by the priority enum.
        let (r, g, b) = memo.priority.badge_color();
        fill_rect(&layer, MARGIN, cursor.y - 3.0, 25.0, 6.0, rgb(r, g, b));
        layer.set_fill_color(white());
        let priority_label = memo.priority.as_str();
        let badge_text_x = MARGIN + 12.5 - layout::text_width(priority_label, 10.0) / 2.0;
        draw_text(&layer, priority_label, 10.0, badge_text_x, cursor.y + 1.0, &font);
        layer.set_fill_color(black());
        cursor = advance(cursor, 10.0);

        draw_text(&layer, &format!("Status: {}", memo.status.label()), 10.0, MARGIN, cursor.y, &font);
        cursor = advance(cursor, 10.0);

        separator(&layer, cursor.y);
        cursor = advance(cursor, 10.0);

        draw_text(&layer, "FROM:", 10.0, MARGIN, cursor.y, &bold);
        draw_text(
            &layer,
            &format!("{} ({})", detail.created_by.display_name(), detail.created_by.department_name()),
            10.0,
            45.0,
            cursor.y,
            &font,
        );
        cursor = advance(cursor, 8.0);

        draw_text(&layer, "DATE:", 10.0, MARGIN, cursor.y, &bold);
        draw_text(&layer, &format_long_date(memo.created_at), 10.0, 45.0, cursor.y, &font);
        cursor = advance(cursor, 8.0);

        draw_text(&layer, "TO:", 10.0, MARGIN, cursor.y, &bold);
        let recipients = if detail.recipients.is_empty() {
            "All Departments".to_string()
        } else {
            detail
                .recipients
                .iter()
                .map(|r| format!("{} ({})", r.user.display_name(), r.user.department_name()))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let recipient_lines =
            wrap_text(&recipients, max_chars_per_line(PAGE_WIDTH - 45.0 - MARGIN, 10.0));
        for line in &recipient_lines {
            draw_text(&layer, line, 10.0, 45.0, cursor.y, &font);
            cursor = advance(cursor, BODY_LINE_HEIGHT);
        }
        cursor = advance(cursor, 8.0);

        separator(&layer, cursor.y);
        cursor = advance(cursor, 10.0);

        draw_text(&layer, "SUBJECT:", 10.0, MARGIN, cursor.y, &bold);
        cursor = advance(cursor, 8.0);
        for line in wrap_text(&memo.subject, max_chars_per_line(CONTENT_WIDTH, 10.0)) {
            draw_text(&layer, &line, 10.0, MARGIN, cursor.y, &font);
            cursor = advance(cursor, BODY_LINE_HEIGHT);
        }
        cursor = advance(cursor, 4.0);
    }

    // -- Body, page-break before the block when it cannot fit
    {
        let layer = pages.layer_for(&doc, cursor.page);
        draw_text(&layer, "MESSAGE:", 10.0, MARGIN, cursor.y, &bold);
        cursor = advance(cursor, 8.0);

        let body_lines = wrap_text(&memo.body, max_chars_per_line(CONTENT_WIDTH, 10.0));
        let block_height = body_lines.len() as f64 * BODY_LINE_HEIGHT;
        let (placement, next) = place_block(cursor, block_height);
        cursor = next;

        let layer = pages.layer_for(&doc, placement.page);
        let mut line_y = placement.y;
        for line in &body_lines {
            draw_text(&layer, line, 10.0, MARGIN, line_y, &font);
            line_y += BODY_LINE_HEIGHT;
        }
        cursor = advance(cursor, 15.0);
    }

    // -- Approval table
    if !detail.steps.is_empty() {
        let rows: Vec<Vec<String>> = detail
            .steps
            .iter()
            .enumerate()
            .map(|(index, step_detail)| {
                vec![
                    (index + 1).to_string(),
                    step_detail.approver.display_name(),
                    step_detail.approver.role.clone(),
                    step_detail.approver.department_name().to_string(),
                    step_detail.step.status.as_str().to_string(),
                    step_detail
                        .step
                        .decided_at
                        .map(format_short_date)
                        .unwrap_or_else(|| "-".to_string()),
                    step_detail.step.comments.clone().unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();

        let label_height = 10.0;
        let block_height = label_height + table_height(&rows, &APPROVAL_COLUMNS, TABLE_FONT_SIZE);
        let (placement, next) = place_block(cursor, block_height);
        cursor = next;

        let layer = pages.layer_for(&doc, placement.page);
        draw_text(&layer, "APPROVAL WORKFLOW", 12.0, MARGIN, placement.y, &bold);
        draw_table(&layer, placement.y + label_height, &APPROVAL_HEADER, &rows, &font, &bold);
        cursor = advance(cursor, 15.0);
    }

    // -- Comments / minutes, one block per entry with the author's signature
    if !detail.comments.is_empty() {
        let (placement, next) = place_block(cursor, 10.0);
        cursor = next;
        let layer = pages.layer_for(&doc, placement.page);
        draw_text(&layer, "COMMENTS/MINUTES", 12.0, MARGIN, placement.y, &bold);

        for comment in &detail.comments {
            let image = signatures.get(&comment.id.0);
            let text_lines =
                wrap_text(&comment.text, max_chars_per_line(CONTENT_WIDTH, 9.0));

            let mut block_height = 5.0 + 4.5 + 4.5 + text_lines.len() as f64 * 4.5 + 4.0;
            if image.is_some() {
                block_height += SIGNATURE_BOX_H + 2.0;
            }

            let (placement, next) = place_block(cursor, block_height);
            cursor = next;
            let layer = pages.layer_for(&doc, placement.page);
            let mut y = placement.y;

            draw_text(&layer, &comment.author.display_name(), 10.0, MARGIN, y, &bold);
            y += 5.0;
            draw_text(
                &layer,
                &format!("{}, {}", comment.author.role, comment.author.department_name()),
                9.0,
                MARGIN,
                y,
                &font,
            );
            y += 4.5;
            layer.set_fill_color(gray(0.4));
            draw_text(&layer, &format_long_date(comment.created_at), 9.0, MARGIN, y, &font);
            layer.set_fill_color(black());
            y += 4.5;

            for line in &text_lines {
                draw_text(&layer, line, 9.0, MARGIN, y, &font);
                y += 4.5;
            }

            if let Some(image) = image {
                y += 2.0;
                draw_signature(&layer, image, MARGIN, y);
            }
        }
    }

    // -- Footer pass over every produced page
    let generated = format_long_date(Utc::now());
    let total = pages.count();
    for page in 0..total {
        let layer = pages.layer_for(&doc, page);
        let text = format!("Generated on {generated} | Page {} of {total}", page + 1);
        layer.set_fill_color(gray(0.5));
        draw_text(&layer, &text, 8.0, centered_x(&text, 8.0), PAGE_HEIGHT - 10.0, &font);
        layer.set_fill_color(black());
    }

    let bytes = doc.save_to_bytes().map_err(|e| RenderError::Serialize(e.to_string()))?;
    Ok(RenderedMemo { bytes, page_count: total })
}

fn draw_table(
    layer: &PdfLayerReference,
    y_top: f64,
    header: &[&str],
    rows: &[Vec<String>],
    font: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let col_widths = &APPROVAL_COLUMNS;
    let table_width: f64 = col_widths.iter().sum();
    let header_height = TABLE_LINE_HEIGHT + 2.0 * CELL_PADDING;

    fill_rect(layer, MARGIN, y_top, table_width, header_height, table_header_fill());
    layer.set_fill_color(white());
    let mut x = MARGIN;
    for (label, width) in header.iter().zip(col_widths) {
        draw_text(layer, label, TABLE_FONT_SIZE, x + CELL_PADDING, y_top + CELL_PADDING + 3.0, bold);
        x += width;
    }
    layer.set_fill_color(black());

    // Body rows.
    let mut row_y = y_top + header_height;
    let mut boundaries = vec![y_top, row_y];
    for row in rows {
        let (wrapped, row_height) = measure_row(row, col_widths, TABLE_FONT_SIZE);
        let mut x = MARGIN;
        for (cell_lines, width) in wrapped.iter().zip(col_widths) {
            let mut line_y = row_y + CELL_PADDING + 3.0;
            for line in cell_lines {
                draw_text(layer, line, TABLE_FONT_SIZE, x + CELL_PADDING, line_y, font);
                line_y += TABLE_LINE_HEIGHT;
            }
            x += width;
        }
        row_y += row_height;
        boundaries.push(row_y);
    }

    // Grid.
    layer.set_outline_color(gray(0.62));
    layer.set_outline_thickness(0.2);
    for boundary in &boundaries {
        stroke_line(layer, (MARGIN, *boundary), (MARGIN + table_width, *boundary));
    }
    let mut x = MARGIN;
    stroke_line(layer, (x, y_top), (x, row_y));
    for width in col_widths {
        x += width;
        stroke_line(layer, (x, y_top), (x, row_y));
    }
}

/// Places a signature image scaled into the fixed bounding box.
fn draw_signature(layer: &PdfLayerReference, image: &DynamicImage, x: f64, y_top: f64) {
    let natural_w = f64::from(image.width()) * 25.4 / IMAGE_DPI;
    let natural_h = f64::from(image.height()) * 25.4 / IMAGE_DPI;
    if natural_w <= 0.0 || natural_h <= 0.0 {
        return;
    }

    let scale = (SIGNATURE_BOX_W / natural_w).min(SIGNATURE_BOX_H / natural_h);
    let drawn_h = natural_h * scale;

    let pdf_image = Image::from_dynamic_image(image);
    pdf_image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x as f32)),
            translate_y: Some(Mm((PAGE_HEIGHT - y_top - drawn_h) as f32)),
            scale_x: Some(scale as f32),
            scale_y: Some(scale as f32),
            dpi: Some(IMAGE_DPI as f32),
            ..ImageTransform::default()
        },
    );
}
