//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled                                      |
//! |----------|-------------------------------------------------------|
//! | `serve`  | `Serve`                                               |
//! | `app`    | `App`                                                 |
//! | `todo`   | `List`, `Add`, `Edit`, `Toggle`, `Remove`, `Health`   |

pub mod app;
pub mod serve;
pub mod todo;

pub use app::cmd_app;
pub use serve::cmd_serve;
pub use todo::{cmd_add, cmd_edit, cmd_health, cmd_list, cmd_remove, cmd_toggle};
