use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::analysis::report_composer::ReportPanel;

const PAGE_STYLE: &str = "body { background-color: #000; color: #fff; font-family: Arial, sans-serif; } \
    h1 { text-align: center; margin-bottom: 20px; } \
    .controls { text-align: center; margin-bottom: 20px; } \
    .controls label { font-weight: bold; } \
    .controls input { margin-right: 20px; } \
    .controls button { margin-top: 20px; margin-right: 10px; background-color: #007bff; color: #fff; border: none; padding: 6px 12px; } \
    iframe { border: none; background: #fff; } \
    .row { display: flex; justify-content: space-around; margin-bottom: 2px; } \
    .error { color: #ff6b6b; text-align: center; }";

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (title) }
                style { (PreEscaped(PAGE_STYLE)) }
            }
            body { (body) }
        }
    }
}

/// Landing page: two coordinate inputs and the three action buttons.
pub fn index_page(default_lat: f64, default_lon: f64) -> Markup {
    layout("Site report", html! {
        h1 { "SITE REPORT DEMO" }
        form.controls method="get" action="/map" target="map-frame" {
            label for="input-lat" { "Latitude" }
            " "
            input #input-lat type="number" step="any" name="lat" value=(default_lat);
            label for="input-lon" { "Longitude" }
            " "
            input #input-lon type="number" step="any" name="lon" value=(default_lon);
            br;
            button #submit-val type="submit" formaction="/map" formtarget="map-frame" { "Submit" }
            button #generate-report type="submit" formaction="/report" formtarget="report-frame" { "Generate Report" }
            button #download-report type="submit" formaction="/report.pdf" formtarget="_self" { "Download Report" }
        }
        div #map-container style="text-align: center;" {
            iframe #map-iframe name="map-frame" src="/map" width="100%" height="600" {}
        }
        div #analysis-container style="text-align: center; margin-top: 20px;" {
            iframe #report-iframe name="report-frame" width="100%" height="1400" {}
        }
    })
}

/// The report panel: images two per row, in composition order.
pub fn report_page(panel: &ReportPanel) -> Markup {
    layout("Site report", html! {
        @for row in panel.images.chunks(2) {
            div.row {
                @for image in row {
                    figure title=(image.title) {
                        (PreEscaped(&image.svg))
                    }
                }
            }
        }
    })
}

pub fn error_page(message: &str) -> Markup {
    layout("Site report", html! {
        p.error { (message) }
    })
}
