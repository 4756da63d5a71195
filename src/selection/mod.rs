pub mod logic;
pub mod tie_break;
