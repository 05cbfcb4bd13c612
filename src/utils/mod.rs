pub mod equality;
pub mod json_pointer;

pub use equality::{deep_equal, first_duplicate, unique_extend};
pub use json_pointer::{escape_segment, join_path, resolve_pointer, unescape_segment};
