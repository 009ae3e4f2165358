//! Sequences one inbound chat event across the command model, the
//! conversation state store, the ledger engine, and the collaborators.
//!
//! Every turn ends the same way: whatever happened in the branch, the
//! resolved command is written to the state store as the user's previous
//! command. That write must stay last; the next turn's bare amount is
//! interpreted against it.

use crate::api::{Documents, Messenger};
use crate::config::SheetSource;
use crate::ledger::Ledger;
use crate::model::{
    Action, Command, InboundEvent, Payload, ACTION_DETAILS, ACTION_READ, ACTION_REMOVE,
    ACTION_UPDATE,
};
use crate::store::CommandStore;
use crate::{Config, Error, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

const APOLOGY: &str = "Something went wrong...";
const GUIDANCE: &str = "Not sure what to do with that boyo. Type HELP.";
const REBUFF: &str = "Go away you prune head!";

const HELP_TEXT: &str = "\
PING - check I am awake
LIST - every category and its total
UPDATE - add an amount to a category
READ - the current total for a category
DETAILS - the individual amounts behind a category
REMOVE - take the last amount off a category
After UPDATE, pick a category and then just type the amount.";

pub struct Dispatcher {
    config: Arc<Config>,
    documents: Arc<dyn Documents>,
    store: Arc<dyn CommandStore>,
    messenger: Arc<dyn Messenger>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        documents: Arc<dyn Documents>,
        store: Arc<dyn CommandStore>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            config,
            documents,
            store,
            messenger,
        }
    }

    /// Handles one inbound event end to end. Command-level errors are
    /// answered in-channel and end the turn; branch failures produce a
    /// generic apology. Returns `Err` only when even the reply could not
    /// be delivered.
    pub async fn handle(&self, event: InboundEvent) -> Result<()> {
        let command = match self.resolve(&event) {
            Ok(command) => command,
            Err(Error::Command {
                response,
                chat_id,
                unauthorized,
            }) => {
                let reply = if unauthorized { REBUFF } else { response.as_str() };
                self.messenger.send_text(chat_id, reply).await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        info!(user_id = command.user_id, action = ?command.action, "Handling command");

        if let Err(e) = self.run(&command).await {
            warn!(error = %e, "Command failed");
            if let Err(send_err) = self.messenger.send_text(command.chat_id, APOLOGY).await {
                error!(error = %send_err, "Failed to send apology");
            }
        }

        // update the previous command for the next turn (this must go last)
        if let Err(e) = self.store.put(command.user_id, &command).await {
            error!(error = %e, "Failed to store command for user");
        }
        Ok(())
    }

    /// Authorization first, then classification: an unconfigured user
    /// never gets a command resolved.
    fn resolve(&self, event: &InboundEvent) -> Result<Command> {
        if !self.config.is_allowed(event.user_id) {
            warn!(user_id = event.user_id, "User not allowed");
            return Err(Error::Command {
                response: String::new(),
                chat_id: event.chat_id,
                unauthorized: true,
            });
        }

        match &event.payload {
            Payload::Text(text) => {
                Command::from_text(text, event.chat_id, event.message_id, event.user_id)
            }
            Payload::Callback(data) => {
                Command::from_callback(data, event.chat_id, event.message_id, event.user_id)
            }
        }
    }

    async fn run(&self, command: &Command) -> Result<()> {
        let chat_id = command.chat_id;
        match &command.action {
            Action::Ping => self.messenger.send_text(chat_id, "Pong").await,

            Action::List => {
                self.messenger
                    .send_text(chat_id, "Listing... Hang tight...")
                    .await?;
                let (ledger, source) = self.ledger_for(command.user_id)?;
                let bytes = self.documents.fetch(source).await?;
                let entries = ledger.list_entries(&bytes)?;
                self.messenger.send_entries(chat_id, &entries).await
            }

            Action::Update => self.send_picker(command, ACTION_UPDATE).await,
            Action::Read => self.send_picker(command, ACTION_READ).await,
            Action::Details => self.send_picker(command, ACTION_DETAILS).await,
            Action::Remove => self.send_picker(command, ACTION_REMOVE).await,

            Action::UpdateCategoryChosen { category } => {
                self.messenger
                    .clear_markup(chat_id, command.message_id)
                    .await?;
                self.messenger
                    .send_text(chat_id, &format!("How much do we add to {category}?"))
                    .await
            }

            Action::Amount { .. } => self.apply_amount(command).await,

            // UpdateFull only exists as a merged command; it never arrives
            // from the transport.
            Action::UpdateFull { .. } => Ok(()),

            Action::ReadCategoryChosen { category } => {
                self.messenger
                    .clear_markup(chat_id, command.message_id)
                    .await?;
                let (ledger, source) = self.ledger_for(command.user_id)?;
                let bytes = self.documents.fetch(source).await?;
                let value = ledger.read_value(&bytes, category, false)?;
                self.messenger
                    .send_text(chat_id, &format!("{category}: {value}"))
                    .await
            }

            Action::DetailsCategoryChosen { category } => {
                self.messenger
                    .clear_markup(chat_id, command.message_id)
                    .await?;
                let (ledger, source) = self.ledger_for(command.user_id)?;
                let bytes = self.documents.fetch(source).await?;
                let breakdown = ledger.read_value(&bytes, category, true)?;
                self.messenger
                    .send_text(chat_id, &format!("{category} is made up of: {breakdown}"))
                    .await
            }

            Action::RemoveCategoryChosen { category } => {
                self.messenger
                    .clear_markup(chat_id, command.message_id)
                    .await?;
                let (ledger, source) = self.ledger_for(command.user_id)?;
                let bytes = self.documents.fetch(source).await?;
                let removed = ledger.remove_last(&bytes, category)?;
                self.documents.store(source, &removed.bytes).await?;
                self.messenger
                    .send_text(
                        chat_id,
                        &format!(
                            "Removed {} from {category}. Was {}, new total: {}",
                            removed.removed_value, removed.old_value, removed.new_value
                        ),
                    )
                    .await
            }

            Action::Help => self.messenger.send_text(chat_id, HELP_TEXT).await,

            Action::Doris => self.messenger.send_text(chat_id, "Woof woof! 🐶").await,
            Action::Boobs => self.messenger.send_text(chat_id, "( . Y . )").await,
            Action::Alice => {
                self.messenger
                    .send_text(chat_id, "Alice is a legend ❤️")
                    .await
            }
        }
    }

    /// A bare amount only makes sense right after a category was chosen
    /// for an update; anything else gets the guidance message.
    async fn apply_amount(&self, command: &Command) -> Result<()> {
        let chat_id = command.chat_id;
        let previous = match self.store.get(command.user_id).await {
            Ok(previous) => previous,
            Err(Error::NotFound) => {
                return self.messenger.send_text(chat_id, GUIDANCE).await;
            }
            Err(e) => return Err(e),
        };

        if !matches!(previous.action, Action::UpdateCategoryChosen { .. }) {
            return self.messenger.send_text(chat_id, GUIDANCE).await;
        }

        let full = Command::merge_update(&previous, command);
        let Action::UpdateFull { category, value } = &full.action else {
            return self.messenger.send_text(chat_id, GUIDANCE).await;
        };

        self.messenger
            .send_text(chat_id, "On it, hang tight...")
            .await?;

        let (ledger, source) = self.ledger_for(command.user_id)?;
        let bytes = self.documents.fetch(source).await?;
        let (updated, total) = ledger.add_value(&bytes, category, *value)?;
        self.documents.store(source, &updated).await?;

        self.messenger
            .send_text(
                chat_id,
                &format!(
                    "Added £{:.2} to {category}. New total: {total}",
                    value.value()
                ),
            )
            .await
    }

    async fn send_picker(&self, command: &Command, action: &str) -> Result<()> {
        let (ledger, source) = self.ledger_for(command.user_id)?;
        let bytes = self.documents.fetch(source).await?;
        let entries = ledger.list_entries(&bytes)?;
        self.messenger
            .send_category_picker(command.chat_id, &entries, action)
            .await
    }

    fn ledger_for(&self, user_id: u64) -> Result<(Ledger, &SheetSource)> {
        let source = self
            .config
            .source_for(user_id)
            .ok_or(Error::NoSource(user_id))?;
        Ok((Ledger::new(source)?, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test::{sample_config, MemoryDocuments, RecordingMessenger, Sent, DOCUMENT};

    const USER: u64 = 111;
    const STRANGER: u64 = 999;

    struct Harness {
        dispatcher: Dispatcher,
        documents: Arc<MemoryDocuments>,
        store: Arc<MemoryStore>,
        messenger: Arc<RecordingMessenger>,
    }

    fn harness() -> Harness {
        let config = Arc::new(sample_config(USER));
        let documents = Arc::new(MemoryDocuments::new());
        documents.insert("budget/ledger.csv", DOCUMENT.as_bytes().to_vec());
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::new());
        let dispatcher = Dispatcher::new(
            config,
            documents.clone(),
            store.clone(),
            messenger.clone(),
        );
        Harness {
            dispatcher,
            documents,
            store,
            messenger,
        }
    }

    fn text_event(text: &str) -> InboundEvent {
        InboundEvent {
            chat_id: 10,
            message_id: 20,
            user_id: USER,
            payload: Payload::Text(text.to_string()),
        }
    }

    fn callback_event(data: &str) -> InboundEvent {
        InboundEvent {
            chat_id: 10,
            message_id: 21,
            user_id: USER,
            payload: Payload::Callback(data.to_string()),
        }
    }

    #[tokio::test]
    async fn test_ping_answers_pong_and_stores_command() {
        let h = harness();
        h.dispatcher.handle(text_event("ping")).await.unwrap();
        assert_eq!(h.messenger.sent(), vec![Sent::text(10, "Pong")]);
        let stored = h.store.get(USER).await.unwrap();
        assert_eq!(stored.action, Action::Ping);
    }

    #[tokio::test]
    async fn test_unauthorized_user_gets_rebuff_and_no_state() {
        let h = harness();
        let event = InboundEvent {
            chat_id: 10,
            message_id: 20,
            user_id: STRANGER,
            payload: Payload::Text("ping".to_string()),
        };
        h.dispatcher.handle(event).await.unwrap();
        assert_eq!(h.messenger.sent(), vec![Sent::text(10, REBUFF)]);
        assert!(matches!(h.store.get(STRANGER).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_unrecognized_text_is_echoed_and_not_stored() {
        let h = harness();
        h.dispatcher.handle(text_event("frobnicate")).await.unwrap();
        assert_eq!(
            h.messenger.sent(),
            vec![Sent::text(10, "frobnicate not a recognised command")]
        );
        assert!(matches!(h.store.get(USER).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_list_sends_entries() {
        let h = harness();
        h.dispatcher.handle(text_event("list")).await.unwrap();
        let sent = h.messenger.sent();
        assert_eq!(sent[0], Sent::text(10, "Listing... Hang tight..."));
        match &sent[1] {
            Sent::Entries { chat_id, entries } => {
                assert_eq!(*chat_id, 10);
                assert_eq!(entries[0].category, "Rent");
            }
            other => panic!("expected entries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_sends_picker_with_update_tag() {
        let h = harness();
        h.dispatcher.handle(text_event("update")).await.unwrap();
        match &h.messenger.sent()[0] {
            Sent::Picker {
                chat_id,
                categories,
                action,
            } => {
                assert_eq!(*chat_id, 10);
                assert_eq!(action, ACTION_UPDATE);
                assert!(categories.contains(&"Groceries".to_string()));
            }
            other => panic!("expected picker, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_full_update_conversation() {
        let h = harness();

        // turn 1: pick the update flow
        h.dispatcher.handle(text_event("update")).await.unwrap();
        // turn 2: choose a category from the keyboard
        h.dispatcher
            .handle(callback_event("UPDATE:Rent"))
            .await
            .unwrap();
        // turn 3: type the amount
        h.dispatcher.handle(text_event("100.00")).await.unwrap();

        let sent = h.messenger.sent();
        assert!(sent.contains(&Sent::clear_markup(10, 21)));
        assert!(sent.contains(&Sent::text(10, "How much do we add to Rent?")));
        assert!(sent.contains(&Sent::text(10, "On it, hang tight...")));
        assert!(sent.contains(&Sent::text(10, "Added £100.00 to Rent. New total: 100.00")));

        // the document was written back with the new value
        let bytes = h.documents.get("budget/ledger.csv").unwrap();
        let entries = Ledger::new(sample_config(USER).source_for(USER).unwrap())
            .unwrap()
            .list_entries(&bytes)
            .unwrap();
        assert_eq!(entries[0], crate::model::Entry::new("Rent", "100.00"));

        // the amount command is now the stored previous command
        let stored = h.store.get(USER).await.unwrap();
        assert!(matches!(stored.action, Action::Amount { .. }));
    }

    #[tokio::test]
    async fn test_amount_without_prior_command_gets_guidance() {
        let h = harness();
        h.dispatcher.handle(text_event("5.00")).await.unwrap();
        assert_eq!(h.messenger.sent(), vec![Sent::text(10, GUIDANCE)]);
    }

    #[tokio::test]
    async fn test_amount_after_wrong_prior_command_gets_guidance() {
        let h = harness();
        h.dispatcher.handle(text_event("ping")).await.unwrap();
        h.dispatcher.handle(text_event("5.00")).await.unwrap();
        let sent = h.messenger.sent();
        assert_eq!(sent.last().unwrap(), &Sent::text(10, GUIDANCE));
    }

    #[tokio::test]
    async fn test_read_and_details_and_remove_flows() {
        let h = harness();

        h.dispatcher
            .handle(callback_event("READ:Groceries"))
            .await
            .unwrap();
        assert!(h
            .messenger
            .sent()
            .contains(&Sent::text(10, "Groceries: 18.00")));

        h.dispatcher
            .handle(callback_event("DETAILS:Groceries"))
            .await
            .unwrap();
        assert!(h
            .messenger
            .sent()
            .contains(&Sent::text(10, "Groceries is made up of: 10.00+5.00+3.00")));

        h.dispatcher
            .handle(callback_event("REMOVE:Groceries"))
            .await
            .unwrap();
        assert!(h.messenger.sent().contains(&Sent::text(
            10,
            "Removed £3.00 from Groceries. Was 18.00, new total: 15.00"
        )));

        // the removal was persisted
        let bytes = h.documents.get("budget/ledger.csv").unwrap();
        let ledger = Ledger::new(sample_config(USER).source_for(USER).unwrap()).unwrap();
        assert_eq!(
            ledger.read_value(&bytes, "Groceries", true).unwrap(),
            "10.00+5.00"
        );
    }

    #[tokio::test]
    async fn test_failed_branch_still_stores_command() {
        let h = harness();
        h.documents.remove("budget/ledger.csv");
        h.dispatcher.handle(text_event("list")).await.unwrap();

        let sent = h.messenger.sent();
        assert_eq!(sent.last().unwrap(), &Sent::text(10, APOLOGY));
        // the turn still updated the previous command
        let stored = h.store.get(USER).await.unwrap();
        assert_eq!(stored.action, Action::List);
    }

    #[tokio::test]
    async fn test_help_and_eggs() {
        let h = harness();
        h.dispatcher.handle(text_event("help")).await.unwrap();
        h.dispatcher.handle(text_event("doris")).await.unwrap();
        let sent = h.messenger.sent();
        assert_eq!(sent[0], Sent::text(10, HELP_TEXT));
        assert_eq!(sent[1], Sent::text(10, "Woof woof! 🐶"));
    }
}
