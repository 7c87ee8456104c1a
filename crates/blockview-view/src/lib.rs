pub mod export;
pub mod graph_view;
pub mod linear_view;
pub mod selection;
pub mod settings;
pub mod viewport;

pub use export::{ExportError, RasterCanvas, TextRaster};
pub use graph_view::DisasmGraphView;
pub use linear_view::LinearView;
pub use selection::{SelectionChange, SelectionModel};
pub use settings::{SettingsError, ViewSettings};
pub use viewport::{PointerOutcome, RedrawRequest, Viewport, ViewportConfig};
