pub mod geojson;
pub mod groups;
