mod health;
mod search;
mod time;
mod util;
mod weather;

pub use health::{health_check, index};
pub use search::search;
pub use time::world_clock;
pub use weather::weather;
