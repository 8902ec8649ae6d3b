//! `ConversationValue` — ordered chat messages (spec.md §3), grounded on
//! `vtcode-core/src/llm/provider/message.rs`'s content-parts message model.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    Image { url: String },
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments_json: String,
}

/// Content is either a plain string or an ordered sequence of typed parts
/// (spec.md §3: "content (string *or* an ordered sequence of typed parts)").
#[derive(Debug, Clone)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
    pub name: Option<String>,
    pub tool_call_id: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

#[derive(Default, Clone)]
pub struct ConversationValue {
    pub messages: Vec<Message>,
}

impl ConversationValue {
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}
