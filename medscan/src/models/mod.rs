mod medication;
mod scan;

pub use medication::*;
pub use scan::*;
