//! Configuration section definitions.
//!
//! Each module corresponds to a section in `tablo.toml`:
//!
//! | Module      | TOML Section    | Purpose                              |
//! |-------------|-----------------|--------------------------------------|
//! | `feed`      | `[feed]`        | Feed address and reconnect policy    |
//! | `layout`    | `[layout]`      | Stop spacing and label measurement   |
//! | `animation` | `[animation]`   | Transition durations and frame rate  |

mod animation;
mod feed;
mod layout;

pub use animation::AnimationConfig;
pub use feed::FeedConfig;
pub use layout::LayoutSectionConfig;
