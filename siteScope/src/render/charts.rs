use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::attribute_counts::CategoryCounts;
use crate::analysis::report_composer::ArtifactKind;
use crate::config::constants::{
    CHART_HEIGHT_PX, CHART_WIDTH_PX, POI_NAME_COLUMN, POI_TABLE_TITLE, POI_TYPE_COLUMN,
    TABLE_ROW_HEIGHT_PX,
};
use crate::error::ReportError;
use crate::utils::logging::{self, OperationCategory, RenderType};

const TABLE_WIDTH_PX: u32 = 520;
const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

fn render_err<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Render(err.to_string())
}

/// Categorical bar chart of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub kind: ArtifactKind,
    pub title: String,
    pub counts: CategoryCounts,
}

impl BarChart {
    pub fn new(kind: ArtifactKind, title: &str, counts: CategoryCounts) -> Self {
        Self { kind, title: title.to_string(), counts }
    }

    pub fn labels(&self) -> Vec<String> {
        self.counts.entries.iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn to_svg(&self) -> Result<String, ReportError> {
        let _timing = logging::start_timing("bar_chart_svg",
            OperationCategory::Rendering { subcategory: RenderType::Chart });

        let labels = self.labels();
        let slots = labels.len().max(1) as u32;
        let y_max = self.counts.max_count() as u32 + 1;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (CHART_WIDTH_PX, CHART_HEIGHT_PX))
                .into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(&self.title, ("sans-serif", 18))
                .margin(12)
                .x_label_area_size(60)
                .y_label_area_size(45)
                .build_cartesian_2d((0u32..slots).into_segmented(), 0u32..y_max)
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(slots as usize)
                .x_label_formatter(&|value| match value {
                    SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
                    _ => String::new(),
                })
                .x_desc(self.counts.column.as_str())
                .y_desc("Count")
                .draw()
                .map_err(render_err)?;

            chart
                .draw_series(self.counts.entries.iter().enumerate().map(|(i, (_, count))| {
                    let i = i as u32;
                    let mut bar = Rectangle::new(
                        [(SegmentValue::Exact(i), 0u32), (SegmentValue::Exact(i + 1), *count as u32)],
                        BAR_COLOR.filled(),
                    );
                    bar.set_margin(0, 0, 6, 6);
                    bar
                }))
                .map_err(render_err)?;

            root.present().map_err(render_err)?;
        }
        Ok(svg)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub poi_type: String,
}

/// Name/type listing of the points of interest inside the radius.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiTable {
    pub title: String,
    pub rows: Vec<PoiRow>,
}

impl PoiTable {
    pub fn new(rows: Vec<PoiRow>) -> Self {
        Self { title: POI_TABLE_TITLE.to_string(), rows }
    }

    pub fn headers() -> [&'static str; 2] {
        [POI_NAME_COLUMN, POI_TYPE_COLUMN]
    }

    pub fn to_svg(&self) -> Result<String, ReportError> {
        let _timing = logging::start_timing("poi_table_svg",
            OperationCategory::Rendering { subcategory: RenderType::Table });

        // Title, header and one line per row
        let lines = self.rows.len() as u32 + 2;
        let height = (lines + 1) * TABLE_ROW_HEIGHT_PX;
        let row_h = TABLE_ROW_HEIGHT_PX as i32;
        let type_x = (TABLE_WIDTH_PX / 2) as i32;
        let right = TABLE_WIDTH_PX as i32 - 10;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (TABLE_WIDTH_PX, height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let title_style = TextStyle::from(("sans-serif", 16).into_font()).color(&BLACK);
            let header_style = TextStyle::from(("sans-serif", 14).into_font()).color(&BLACK);
            let cell_style = TextStyle::from(("sans-serif", 13).into_font()).color(&BLACK);

            root.draw(&Text::new(self.title.clone(), (10, 4), title_style)).map_err(render_err)?;

            let [name_header, type_header] = Self::headers();
            let header_y = row_h + 4;
            root.draw(&Text::new(name_header, (10, header_y), header_style.clone())).map_err(render_err)?;
            root.draw(&Text::new(type_header, (type_x, header_y), header_style)).map_err(render_err)?;
            root.draw(&PathElement::new(vec![(10, 2 * row_h), (right, 2 * row_h)], BLACK))
                .map_err(render_err)?;

            for (i, row) in self.rows.iter().enumerate() {
                let y = (i as i32 + 2) * row_h + 4;
                root.draw(&Text::new(row.name.clone(), (10, y), cell_style.clone())).map_err(render_err)?;
                root.draw(&Text::new(row.poi_type.clone(), (type_x, y), cell_style.clone()))
                    .map_err(render_err)?;
            }

            root.present().map_err(render_err)?;
        }
        Ok(svg)
    }
}
