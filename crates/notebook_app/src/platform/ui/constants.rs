/// Width of the overall progress bar, in cells.
pub const PROGRESS_BAR_WIDTH: usize = 30;
pub const BAR_FILLED: char = '#';
pub const BAR_EMPTY: char = '.';
/// Prefix for continuation lines under a timeline row.
pub const INDENT: &str = "    ";
