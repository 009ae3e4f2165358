mod amount;
mod command;
mod entry;
mod event;

pub use amount::Amount;
pub use command::{
    is_financial, Action, Command, ACTION_DETAILS, ACTION_READ, ACTION_REMOVE, ACTION_UPDATE,
};
pub use entry::Entry;
pub use event::{InboundEvent, Payload};
