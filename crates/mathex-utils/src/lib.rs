mod latex;
mod strings;

pub use latex::{latex_function, latex_symbol};
pub use strings::{escape_latex, fill_template};
