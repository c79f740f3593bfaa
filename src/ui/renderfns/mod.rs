mod footer;
mod header;
mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{
  centered, first_line, format_date, medal_symbol, notice_line, page_bar, privacy_color,
  reaction_key, truncate,
};
