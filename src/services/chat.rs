//! Conversational assistant over the same LLM queue.
//!
//! The session is an explicit value owned by the caller (server state, REPL
//! loop); there is no process-global chat state. History is bounded so long
//! sessions cannot grow the prompt without limit.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::LlmError;
use crate::llm::TextGenerator;
use crate::writers::{chat::ChatWriter, Writer};

#[derive(Clone, Debug)]
pub struct ChatTurn {
    pub role: &'static str,
    pub content: String,
}

pub struct ChatSession {
    turns: VecDeque<ChatTurn>,
    max_turns: usize,
}

impl ChatSession {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns: max_turns.max(2),
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, role: &'static str, content: String) {
        if self.turns.len() >= self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(ChatTurn { role, content });
    }

    /// History serialized the way the chat prompt expects it.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            out.push_str(turn.role);
            out.push_str(": ");
            out.push_str(&turn.content);
            out.push('\n');
        }
        out
    }
}

#[derive(Clone)]
pub struct ChatService {
    llm: Arc<dyn TextGenerator>,
}

impl ChatService {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    pub async fn reply(
        &self,
        session: &mut ChatSession,
        message: &str,
    ) -> Result<String, LlmError> {
        let mut input = session.transcript();
        input.push_str("user: ");
        input.push_str(message);
        input.push('\n');

        let response = ChatWriter.run_high_priority(&input, self.llm.as_ref()).await?;

        session.push("user", message.to_string());
        session.push("assistant", response.clone());

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::llm::Priority;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(
            &self,
            _system_prompt: &str,
            user_input: &str,
            _priority: Priority,
        ) -> Result<String, LlmError> {
            Ok(format!("echo[{}]", user_input.lines().count()))
        }
    }

    #[tokio::test]
    async fn reply_records_both_turns() {
        let service = ChatService::new(Arc::new(EchoGenerator));
        let mut session = ChatSession::new(10);

        let response = service.reply(&mut session, "hello").await.unwrap();
        assert!(response.starts_with("echo["));
        assert_eq!(session.len(), 2);
        assert!(session.transcript().contains("user: hello"));
        assert!(session.transcript().contains("assistant: echo["));
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let service = ChatService::new(Arc::new(EchoGenerator));
        let mut session = ChatSession::new(4);

        for i in 0..10 {
            service.reply(&mut session, &format!("msg {}", i)).await.unwrap();
        }
        assert_eq!(session.len(), 4);
        // Oldest turns dropped, newest kept
        assert!(session.transcript().contains("msg 9"));
        assert!(!session.transcript().contains("msg 0"));
    }

    #[tokio::test]
    async fn transcript_grows_with_history() {
        let service = ChatService::new(Arc::new(EchoGenerator));
        let mut session = ChatSession::new(20);

        let first = service.reply(&mut session, "one").await.unwrap();
        let second = service.reply(&mut session, "two").await.unwrap();
        // Second call sees a longer transcript than the first
        assert_ne!(first, second);
    }
}
