// Search Constants
pub const SEARCH_RADIUS_M: f64 = 250.0;              // Inclusion boundary around the query point
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

// Coordinate Bounds
pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

// Default Map View
pub const DEFAULT_LATITUDE: f64 = 6.580364;
pub const DEFAULT_LONGITUDE: f64 = 3.362485;
pub const DEFAULT_ZOOM: u8 = 15;
pub const FIT_BOUNDS_PADDING_DEG: f64 = 0.01;        // Half-width of the fitted view around a marker
pub const CIRCLE_FILL_OPACITY: f64 = 0.2;
pub const CIRCLE_COLOR: &str = "blue";
pub const MARKER_POPUP: &str = "Subject Site";

// Leaflet assets
pub const LEAFLET_CSS_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
pub const LEAFLET_JS_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
pub const TILE_URL_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

// Dataset Sources
pub const BUILDING_FOOTPRINTS_URL: &str =
    "https://raw.githubusercontent.com/DonToba/Atopcon/main/Building_Footprints_4326.geojson";
pub const POIS_URL: &str = "https://raw.githubusercontent.com/DonToba/Atopcon/main/POIs.geojson";
pub const ROADS_URL: &str = "https://raw.githubusercontent.com/DonToba/Atopcon/main/roads.geojson";

// Attribute Columns
pub const BUILDING_USE_COLUMN: &str = "Use";
pub const BUILDING_HEIGHT_COLUMN: &str = "Height";
pub const ROAD_CLASS_COLUMN: &str = "Class";
pub const ROAD_CONDITION_COLUMN: &str = "Condition";
pub const POI_NAME_COLUMN: &str = "Name";
pub const POI_TYPE_COLUMN: &str = "Type";

// Chart Titles
pub const BUILDING_USE_TITLE: &str = "Chart showing Use of Buildings within 250m radius";
pub const BUILDING_HEIGHT_TITLE: &str = "Chart showing Height of Buildings within 250m radius";
pub const ROAD_CLASS_TITLE: &str = "Chart showing road classes within 250m radius";
pub const ROAD_CONDITION_TITLE: &str = "Chart showing condition of roads within 250m radius";
pub const MAP_SNAPSHOT_TITLE: &str = "Buildings within 250m radius";
pub const POI_TABLE_TITLE: &str = "Points of interest within 250m radius";

// Chart Geometry (SVG pixels)
pub const CHART_WIDTH_PX: u32 = 640;
pub const CHART_HEIGHT_PX: u32 = 420;
pub const MAP_SNAPSHOT_PX: u32 = 520;
pub const TABLE_ROW_HEIGHT_PX: u32 = 22;

// PDF Page Geometry (A4, millimetres)
pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const PAGE_MARGIN_MM: f32 = 15.0;
pub const TABLE_ROWS_PER_PAGE: usize = 40;

// Output Artifacts
pub const REPORT_FILE_NAME: &str = "report.pdf";
pub const POI_CSV_FILE_NAME: &str = "pois.csv";
pub const MAP_ARTIFACT_PATH: &str = "mymap.html";

// Server
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8050";
