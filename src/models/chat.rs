use serde::{ Deserialize, Deserializer, Serialize };
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "tina", alias = "assistant", alias = "model")]
    Assistant,
}

impl Role {
    /// Label used when a turn is rendered into the prompt.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    #[serde(rename = "content", alias = "text")]
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

/// Ordered turns exchanged so far. Appending always yields a new value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation(Vec<Turn>);

impl Conversation {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn turns(&self) -> &[Turn] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.0.last()
    }

    pub fn with_turn(&self, turn: Turn) -> Self {
        let mut turns = Vec::with_capacity(self.0.len() + 1);
        turns.extend_from_slice(&self.0);
        turns.push(turn);
        Self(turns)
    }

    pub fn with_exchange(&self, user_text: &str, reply: &str) -> Self {
        let mut turns = Vec::with_capacity(self.0.len() + 2);
        turns.extend_from_slice(&self.0);
        turns.push(Turn::user(user_text));
        turns.push(Turn::assistant(reply));
        Self(turns)
    }
}

impl From<Vec<Turn>> for Conversation {
    fn from(turns: Vec<Turn>) -> Self {
        Self(turns)
    }
}

/// Accepts anything for `chatHistory`; whatever is not a list of valid turns
/// becomes an empty conversation.
fn lenient_history<'de, D>(deserializer: D) -> Result<Conversation, D::Error>
    where D: Deserializer<'de>
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(
        raw
            .and_then(|value| serde_json::from_value::<Vec<Turn>>(value).ok())
            .map(Conversation::from)
            .unwrap_or_default()
    )
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(rename = "userResponse", default)]
    pub user_response: Option<String>,
    #[serde(rename = "chatHistory", default, deserialize_with = "lenient_history")]
    pub chat_history: Conversation,
}

impl ChatRequest {
    pub fn new(user_response: impl Into<String>, chat_history: Conversation) -> Self {
        Self {
            user_response: Some(user_response.into()),
            chat_history,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(rename = "aiResponse")]
    pub ai_response: String,
    #[serde(rename = "chatHistory")]
    pub chat_history: Conversation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_role_uses_tina_on_the_wire() {
        let turn = Turn::assistant("hello");
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value, json!({ "role": "tina", "content": "hello" }));
    }

    #[test]
    fn assistant_aliases_are_accepted() {
        for role in ["tina", "assistant", "model"] {
            let turn: Turn = serde_json::from_value(json!({ "role": role, "content": "x" })).unwrap();
            assert_eq!(turn.role, Role::Assistant);
        }
        let turn: Turn = serde_json::from_value(json!({ "role": "user", "text": "hi" })).unwrap();
        assert_eq!(turn, Turn::user("hi"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let res = serde_json::from_value::<Turn>(json!({ "role": "system", "content": "x" }));
        assert!(res.is_err());
    }

    #[test]
    fn with_exchange_leaves_original_untouched() {
        let original = Conversation::from(vec![Turn::assistant("May I ask a few questions?")]);
        let next = original.with_exchange("I agree", "How old is your car?");

        assert_eq!(original.len(), 1);
        assert_eq!(next.len(), 3);
        assert_eq!(next.turns()[1], Turn::user("I agree"));
        assert_eq!(next.last(), Some(&Turn::assistant("How old is your car?")));
    }

    #[test]
    fn missing_fields_default() {
        let req: ChatRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.user_response.is_none());
        assert!(req.chat_history.is_empty());
    }

    #[test]
    fn malformed_history_becomes_empty() {
        let cases = [
            json!("not a list"),
            json!(42),
            json!({ "role": "user", "content": "x" }),
            json!([{ "role": "user", "content": "ok" }, { "speaker": "nobody" }]),
            json!(null),
        ];
        for history in cases {
            let req: ChatRequest = serde_json
                ::from_value(json!({ "userResponse": "hi", "chatHistory": history }))
                .unwrap();
            assert!(req.chat_history.is_empty(), "expected empty history for {history}");
        }
    }

    #[test]
    fn well_formed_history_keeps_order() {
        let req: ChatRequest = serde_json
            ::from_value(
                json!({
                "userResponse": "a sedan",
                "chatHistory": [
                    { "role": "tina", "content": "What do you drive?" },
                    { "role": "user", "content": "a car" },
                ]
            })
            )
            .unwrap();
        assert_eq!(req.chat_history.turns()[0].role, Role::Assistant);
        assert_eq!(req.chat_history.turns()[1].text, "a car");
    }
}
