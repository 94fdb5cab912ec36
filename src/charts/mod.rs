//! Charts module - PNG rendering of derived metrics

mod plotter;
mod renderer;

pub use plotter::ChartError;
pub use renderer::{ChartKind, ChartRenderer, RenderedChart};
