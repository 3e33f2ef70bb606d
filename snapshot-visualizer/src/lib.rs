pub mod color;
pub mod figure;
pub mod font;
pub mod sheet;
pub mod ticks;

pub use color::{parse_color, ColorTable, Colormap};
pub use figure::{color_range, figure_title, render_field, Figure, RenderOptions};
pub use sheet::FigureSheet;
