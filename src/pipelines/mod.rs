pub mod html;
pub mod url;

pub use html::{extract, Pipeline};
pub use url::{process, process_all, ImportReport, PipelineSet};
