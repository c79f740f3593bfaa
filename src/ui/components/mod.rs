mod command_input;
mod composer;
mod confirm;
mod input;
mod paged_list;

pub use command_input::{CommandEvent, CommandInput};
pub use composer::{Composer, ComposerEvent};
pub use confirm::Confirm;
pub use input::{InputEvent, TextInput};
pub use paged_list::{apply_page_key, PageSource, PagedList};

/// How a component dealt with a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed with nothing for the parent to do
  Handled,
  /// Consumed, and the parent should act on this
  Event(T),
  /// Not consumed; try the next handler
  NotHandled,
}
