mod correct;
mod scan;

pub use correct::correct;
pub use scan::scan;
