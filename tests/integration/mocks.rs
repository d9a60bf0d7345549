//! In-memory doubles for the two outside services.
//!
//! `RecordingSink` stands in for the Telegram channel and keeps every
//! message. `ScriptedGenerator` answers text-generation prompts from a
//! closure and counts calls.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tipster::llm::TextGenerator;
use tipster::telegram::{BotIdentity, MessageSink};

/// A message sink that records instead of sending.
#[derive(Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<String>>>,
    /// Texts containing this marker fail to send.
    fail_marker: Arc<Mutex<Option<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every message that contains `marker`.
    pub fn fail_on(&self, marker: &str) {
        *self.fail_marker.lock().unwrap() = Some(marker.to_string());
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, text: &str) -> Result<i64> {
        if let Some(marker) = self.fail_marker.lock().unwrap().as_deref() {
            if text.contains(marker) {
                return Err(anyhow!("Bad Request: message rejected"));
            }
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(text.to_string());
        Ok(sent.len() as i64)
    }

    async fn identity(&self) -> Result<BotIdentity> {
        Ok(BotIdentity {
            id: 100,
            username: Some("tipster_test_bot".into()),
            first_name: "Tipster".into(),
        })
    }

    fn channel(&self) -> String {
        "@integration".into()
    }
}

type Responder = dyn Fn(&str, &str) -> Result<String> + Send + Sync;

/// A text generator that answers from a closure.
pub struct ScriptedGenerator {
    responder: Box<Responder>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(responder: impl Fn(&str, &str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails, as an unreachable provider would.
    pub fn failing() -> Self {
        Self::new(|_, _| Err(anyhow!("HTTP 503 Service Unavailable")))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(model, prompt)
    }

    fn name(&self) -> String {
        "scripted".into()
    }
}

/// A complete strict-format answer for the sport named in the prompt.
pub fn strict_answer(prompt: &str) -> String {
    let sport = ["Футбол", "Баскетбол", "Теннис", "Хоккей"]
        .into_iter()
        .find(|s| prompt.contains(&format!("СПОРТ: {s}")))
        .unwrap_or("Футбол");

    format!(
        "СПОРТ: {sport}\nЛИГА: Тестовая лига\nМАТЧ: Команда А - Команда Б\nВРЕМЯ: 19:30 МСК\n\
         ПРОГНОЗ: Победа хозяев\nКОЭФФИЦИЕНТ: 1.95\nУВЕРЕННОСТЬ: 80%\n\
         АНАЛИЗ: Хозяева заметно сильнее\nФАКТОРЫ: Форма, Дома, Мотивация"
    )
}
