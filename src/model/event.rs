/// An inbound chat event, already stripped of transport detail. This is
/// what the messaging layer hands to the dispatcher: who sent what, in
/// which chat, and whether it arrived as free text or as an inline
/// keyboard callback.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub chat_id: i64,
    pub message_id: i32,
    pub user_id: u64,
    pub payload: Payload,
}

#[derive(Debug, Clone)]
pub enum Payload {
    /// A plain text message.
    Text(String),
    /// The data attached to an inline keyboard button, `ACTION:CATEGORY`.
    Callback(String),
}
