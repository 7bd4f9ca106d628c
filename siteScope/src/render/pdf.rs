use chrono::Local;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Polygon, PolygonMode, Rgb, WindingOrder,
};
use tracing::info;

use crate::analysis::report_composer::{PlotBuffer, ReportArtifact};
use crate::config::constants::{
    PAGE_HEIGHT_MM, PAGE_MARGIN_MM, PAGE_WIDTH_MM, TABLE_ROWS_PER_PAGE,
};
use crate::error::ReportError;
use crate::render::charts::{BarChart, PoiTable};
use crate::render::map_renderer::MapSnapshot;
use crate::utils::logging::{self, OperationCategory};

const TITLE_SIZE: f32 = 14.0;
const LABEL_SIZE: f32 = 9.0;
const CELL_SIZE: f32 = 10.0;
const ROW_HEIGHT_MM: f32 = 6.0;
const PLOT_HEIGHT_MM: f32 = 150.0;
const LABEL_MAX_CHARS: usize = 18;

fn pdf_err<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Pdf(err.to_string())
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn point(x: f32, y: f32) -> (Point, bool) {
    (Point::new(Mm(x), Mm(y)), false)
}

fn filled(ring: Vec<(f32, f32)>, mode: PolygonMode) -> Polygon {
    Polygon {
        rings: vec![ring.into_iter().map(|(x, y)| point(x, y)).collect()],
        mode,
        winding_order: WindingOrder::NonZero,
    }
}

fn rect(x: f32, y: f32, w: f32, h: f32) -> Polygon {
    filled(vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)], PolygonMode::Fill)
}

fn polyline(points: Vec<(f32, f32)>, closed: bool) -> Line {
    Line {
        points: points.into_iter().map(|(x, y)| point(x, y)).collect(),
        is_closed: closed,
    }
}

fn truncate(label: &str) -> String {
    if label.chars().count() <= LABEL_MAX_CHARS {
        label.to_string()
    } else {
        let mut short: String = label.chars().take(LABEL_MAX_CHARS - 1).collect();
        short.push('~');
        short
    }
}

/// Writes each buffered artifact on its own A4 page, in buffer order.
struct PdfBuilder {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    first_page: Option<PdfLayerReference>,
}

impl PdfBuilder {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
        let first_page = Some(doc.get_page(page).get_layer(layer));
        Ok(Self { doc, font, bold, first_page })
    }

    /// Reuses the initial page for the first artifact, then adds pages.
    fn next_page(&mut self) -> PdfLayerReference {
        if let Some(layer) = self.first_page.take() {
            return layer;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.doc.get_page(page).get_layer(layer)
    }

    fn title(&self, layer: &PdfLayerReference, text: &str) {
        layer.set_fill_color(rgb(0.0, 0.0, 0.0));
        layer.use_text(text, TITLE_SIZE, Mm(PAGE_MARGIN_MM), Mm(PAGE_HEIGHT_MM - PAGE_MARGIN_MM - 10.0), &self.bold);
    }

    fn cover_line(&self, layer: &PdfLayerReference, text: &str) {
        layer.set_fill_color(rgb(0.3, 0.3, 0.3));
        layer.use_text(text, LABEL_SIZE, Mm(PAGE_MARGIN_MM), Mm(PAGE_HEIGHT_MM - PAGE_MARGIN_MM), &self.font);
    }

    fn bar_chart(&mut self, chart: &BarChart) {
        let layer = self.next_page();
        self.title(&layer, &chart.title);

        let plot_x = PAGE_MARGIN_MM + 15.0;
        let plot_y = PAGE_HEIGHT_MM - PAGE_MARGIN_MM - 30.0 - PLOT_HEIGHT_MM;
        let plot_w = PAGE_WIDTH_MM - plot_x - PAGE_MARGIN_MM;

        // Axes
        layer.set_outline_color(rgb(0.0, 0.0, 0.0));
        layer.set_outline_thickness(0.8);
        layer.add_line(polyline(
            vec![(plot_x, plot_y + PLOT_HEIGHT_MM), (plot_x, plot_y), (plot_x + plot_w, plot_y)],
            false,
        ));

        let max = chart.counts.max_count().max(1) as f32;
        layer.set_fill_color(rgb(0.0, 0.0, 0.0));
        layer.use_text(format!("{}", max as usize), LABEL_SIZE, Mm(PAGE_MARGIN_MM), Mm(plot_y + PLOT_HEIGHT_MM - 3.0), &self.font);
        layer.use_text("0", LABEL_SIZE, Mm(PAGE_MARGIN_MM + 8.0), Mm(plot_y), &self.font);

        if chart.counts.is_empty() {
            layer.use_text("No features within radius", CELL_SIZE, Mm(plot_x + 10.0), Mm(plot_y + PLOT_HEIGHT_MM / 2.0), &self.font);
            return;
        }

        let slot = plot_w / chart.counts.entries.len() as f32;
        let bar_w = slot * 0.7;
        for (i, (label, count)) in chart.counts.entries.iter().enumerate() {
            let x = plot_x + slot * i as f32 + (slot - bar_w) / 2.0;
            let h = PLOT_HEIGHT_MM * (*count as f32 / max);
            layer.set_fill_color(rgb(0.12, 0.47, 0.71));
            layer.add_polygon(rect(x, plot_y, bar_w, h));

            layer.set_fill_color(rgb(0.0, 0.0, 0.0));
            layer.use_text(count.to_string(), LABEL_SIZE, Mm(x), Mm(plot_y + h + 1.5), &self.font);
            // Stagger labels so neighbours do not overlap
            let label_y = plot_y - 6.0 - 4.0 * (i % 2) as f32;
            layer.use_text(truncate(label), LABEL_SIZE, Mm(x), Mm(label_y), &self.font);
        }
        layer.use_text(chart.counts.column.as_str(), CELL_SIZE, Mm(plot_x + plot_w / 2.0), Mm(plot_y - 20.0), &self.bold);
    }

    fn poi_table(&mut self, table: &PoiTable) {
        let [name_header, type_header] = PoiTable::headers();
        let type_x = PAGE_WIDTH_MM / 2.0;
        let chunks: Vec<_> = if table.rows.is_empty() {
            vec![&table.rows[..]]
        } else {
            table.rows.chunks(TABLE_ROWS_PER_PAGE).collect()
        };

        for (page_no, rows) in chunks.into_iter().enumerate() {
            let layer = self.next_page();
            let heading = if page_no == 0 {
                table.title.clone()
            } else {
                format!("{} (continued)", table.title)
            };
            self.title(&layer, &heading);

            let mut y = PAGE_HEIGHT_MM - PAGE_MARGIN_MM - 25.0;
            layer.set_fill_color(rgb(0.0, 0.0, 0.0));
            layer.use_text(name_header, CELL_SIZE, Mm(PAGE_MARGIN_MM), Mm(y), &self.bold);
            layer.use_text(type_header, CELL_SIZE, Mm(type_x), Mm(y), &self.bold);
            layer.set_outline_color(rgb(0.0, 0.0, 0.0));
            layer.set_outline_thickness(0.5);
            layer.add_line(polyline(
                vec![(PAGE_MARGIN_MM, y - 2.0), (PAGE_WIDTH_MM - PAGE_MARGIN_MM, y - 2.0)],
                false,
            ));

            if rows.is_empty() {
                y -= ROW_HEIGHT_MM;
                layer.use_text("No points of interest within radius", CELL_SIZE, Mm(PAGE_MARGIN_MM), Mm(y), &self.font);
            }
            for row in rows {
                y -= ROW_HEIGHT_MM;
                layer.use_text(row.name.as_str(), CELL_SIZE, Mm(PAGE_MARGIN_MM), Mm(y), &self.font);
                layer.use_text(row.poi_type.as_str(), CELL_SIZE, Mm(type_x), Mm(y), &self.font);
            }
        }
    }

    fn map_snapshot(&mut self, snapshot: &MapSnapshot) {
        let layer = self.next_page();
        self.title(&layer, &snapshot.title);

        // Square viewport centred on the page, metres mapped to millimetres
        let side = PAGE_WIDTH_MM - 2.0 * PAGE_MARGIN_MM;
        let origin_x = PAGE_MARGIN_MM + side / 2.0;
        let origin_y = PAGE_HEIGHT_MM - PAGE_MARGIN_MM - 30.0 - side / 2.0;
        let scale = side / (2.0 * snapshot.extent() as f32);
        let to_page = |(x, y): (f64, f64)| (origin_x + x as f32 * scale, origin_y + y as f32 * scale);

        layer.set_outline_color(rgb(0.35, 0.35, 0.35));
        layer.set_fill_color(rgb(0.7, 0.7, 0.7));
        layer.set_outline_thickness(0.3);
        for ring in snapshot.footprints.iter().filter(|ring| ring.len() > 2) {
            layer.add_polygon(filled(ring.iter().copied().map(to_page).collect(), PolygonMode::FillStroke));
        }

        layer.set_outline_color(rgb(0.0, 0.0, 1.0));
        layer.set_outline_thickness(1.2);
        layer.add_line(polyline(snapshot.circle_outline().into_iter().map(to_page).collect(), true));

        layer.set_fill_color(rgb(0.85, 0.1, 0.1));
        layer.add_polygon(rect(origin_x - 1.5, origin_y - 1.5, 3.0, 3.0));

        layer.set_fill_color(rgb(0.0, 0.0, 0.0));
        let caption = format!(
            "Centre {:.6}, {:.6} - radius {} m - {} footprints",
            snapshot.center.latitude(),
            snapshot.center.longitude(),
            snapshot.radius_m,
            snapshot.footprints.len()
        );
        layer.use_text(caption, LABEL_SIZE, Mm(PAGE_MARGIN_MM), Mm(origin_y - side / 2.0 - 8.0), &self.font);
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        self.doc.save_to_bytes().map_err(pdf_err)
    }
}

/// Serializes every artifact in the buffer into one PDF, one item per page
/// (long tables continue on extra pages). The buffer is consumed.
pub fn assemble_pdf(buffer: PlotBuffer) -> Result<Vec<u8>, ReportError> {
    let _timing = logging::start_timing("assemble_pdf", OperationCategory::PdfAssembly);

    if buffer.is_empty() {
        return Err(ReportError::EmptyReport);
    }

    let artifacts = buffer.into_artifacts();
    let mut builder = PdfBuilder::new("Site report")?;

    if let (Some(layer), Some(ReportArtifact::MapSnapshot(snapshot))) = (&builder.first_page, artifacts.first()) {
        let line = format!(
            "Generated {} for {:.6}, {:.6}",
            Local::now().format("%Y-%m-%d %H:%M"),
            snapshot.center.latitude(),
            snapshot.center.longitude()
        );
        builder.cover_line(layer, &line);
    }

    for artifact in &artifacts {
        match artifact {
            ReportArtifact::MapSnapshot(snapshot) => builder.map_snapshot(snapshot),
            ReportArtifact::BarChart(chart) => builder.bar_chart(chart),
            ReportArtifact::PoiTable(table) => builder.poi_table(table),
        }
    }

    let bytes = builder.finish()?;
    info!(artifacts = artifacts.len(), bytes = bytes.len(), "Assembled PDF report");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::radius_filter::filter_point;
    use crate::analysis::report_composer::compose_report;
    use crate::data::dataset_loader::GeoDatasets;
    use crate::models::feature::{FeatureCollection, FeatureRecord};
    use crate::models::query_point::QueryPoint;
    use geo::{point, polygon, Geometry};
    use serde_json::{json, Map, Value};

    fn record(props: Value) -> FeatureRecord {
        let geometry: Geometry<f64> = point!(x: 3.362485, y: 6.580364).into();
        let properties: Map<String, Value> = props.as_object().cloned().unwrap_or_default();
        FeatureRecord::new(geometry, properties)
    }

    fn buffer() -> PlotBuffer {
        let data = GeoDatasets::new(
            FeatureCollection::new("buildings", vec![record(json!({"Use": "Residential", "Height": 3}))]),
            FeatureCollection::new("roads", vec![record(json!({"Class": "Minor", "Condition": "Poor"}))]),
            FeatureCollection::new("pois", vec![record(json!({"Name": "Clinic", "Type": "Health"}))]),
        );
        let point = QueryPoint::new(6.580364, 3.362485).unwrap();
        let filtered = filter_point(&data, &point);
        let mut buffer = PlotBuffer::new();
        compose_report(&filtered, &point, &mut buffer).unwrap();
        buffer
    }

    #[test]
    fn produces_pdf_bytes() {
        let bytes = assemble_pdf(buffer()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn shapes_use_fill_modes() {
        let bar = rect(10.0, 20.0, 5.0, 8.0);
        assert_eq!(bar.rings.len(), 1);
        assert_eq!(bar.rings[0].len(), 4);
        assert!(matches!(bar.mode, PolygonMode::Fill));

        let footprint = filled(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)], PolygonMode::FillStroke);
        assert!(matches!(footprint.mode, PolygonMode::FillStroke));

        let axis = polyline(vec![(0.0, 10.0), (0.0, 0.0), (10.0, 0.0)], false);
        assert_eq!(axis.points.len(), 3);
        assert!(!axis.is_closed);
    }

    #[test]
    fn footprints_and_long_tables_are_drawn() {
        let footprint: Geometry<f64> = polygon![
            (x: 3.36240, y: 6.58030),
            (x: 3.36260, y: 6.58030),
            (x: 3.36260, y: 6.58045),
            (x: 3.36240, y: 6.58045),
        ]
        .into();
        let building = FeatureRecord::new(
            footprint,
            json!({"Use": "Residential", "Height": 2}).as_object().cloned().unwrap(),
        );
        let pois = (0..TABLE_ROWS_PER_PAGE + 5)
            .map(|i| record(json!({"Name": format!("Shop {}", i), "Type": "Retail"})))
            .collect();
        let data = GeoDatasets::new(
            FeatureCollection::new("buildings", vec![building]),
            FeatureCollection::new("roads", vec![record(json!({"Class": "Minor", "Condition": "Poor"}))]),
            FeatureCollection::new("pois", pois),
        );
        let point = QueryPoint::new(6.580364, 3.362485).unwrap();
        let filtered = filter_point(&data, &point);
        let mut long_buffer = PlotBuffer::new();
        compose_report(&filtered, &point, &mut long_buffer).unwrap();

        match &long_buffer.artifacts()[0] {
            ReportArtifact::MapSnapshot(snapshot) => assert_eq!(snapshot.footprints.len(), 1),
            other => panic!("expected map snapshot first, got {:?}", other.kind()),
        }

        let bytes = assemble_pdf(long_buffer).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_buffer_is_rejected() {
        assert!(matches!(assemble_pdf(PlotBuffer::new()), Err(ReportError::EmptyReport)));
    }

    #[test]
    fn long_labels_are_shortened() {
        assert_eq!(truncate("Short"), "Short");
        let long = truncate("A very long building use category");
        assert_eq!(long.chars().count(), LABEL_MAX_CHARS);
        assert!(long.ends_with('~'));
    }
}
