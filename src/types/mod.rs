mod browser_kind;
mod detection;
mod device_type;
mod field;
mod version;

pub use browser_kind::*;
pub use detection::*;
pub use device_type::*;
pub use field::*;
pub use version::*;
