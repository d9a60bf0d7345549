//! Publish runs through the real composer, renderer and publisher with
//! in-memory outside services.

use std::sync::Arc;
use std::time::Duration;

use tipster::composer::{Composer, Renderer};
use tipster::config::{DispatchMode, ExtractionMode};
use tipster::engine::publisher::{Publisher, PublisherSettings, RunOutcome};
use tipster::extract::KeywordTables;
use tipster::generator::{Catalog, LiveGenerator, LiveSettings, SyntheticGenerator};
use tipster::llm::TextGenerator;

use crate::mocks::{strict_answer, RecordingSink, ScriptedGenerator};

struct Harness {
    mode: DispatchMode,
    extraction: ExtractionMode,
    count: usize,
    live_only: bool,
    pause: Duration,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Separate,
            extraction: ExtractionMode::Strict,
            count: 3,
            live_only: false,
            pause: Duration::ZERO,
        }
    }
}

impl Harness {
    fn build(&self, llm: Option<Arc<ScriptedGenerator>>, sink: &RecordingSink) -> Publisher {
        let catalog = Arc::new(Catalog::default());
        let live = llm.map(|llm| {
            let llm: Arc<dyn TextGenerator> = llm;
            LiveGenerator::with_seed(
                llm,
                catalog.clone(),
                Arc::new(KeywordTables::default()),
                LiveSettings {
                    mode: self.extraction,
                    search_model: "sonar".into(),
                    reasoning_model: "sonar-reasoning".into(),
                    timezone: chrono_tz::Europe::Moscow,
                },
                21,
            )
        });

        let composer = Composer::new(
            live,
            SyntheticGenerator::with_seed(catalog.clone(), 21),
            self.live_only,
        );
        let renderer = Renderer::with_seed(catalog, composer.live_enabled(), 21);

        Publisher::new(
            composer,
            renderer,
            Arc::new(sink.clone()),
            PublisherSettings {
                predictions_per_run: self.count,
                mode: self.mode,
                pause: self.pause,
                timezone: chrono_tz::Europe::Moscow,
            },
        )
    }
}

#[tokio::test]
async fn test_synthetic_run_sends_header_items_footer() {
    let sink = RecordingSink::new();
    let publisher = Harness::default().build(None, &sink);

    let report = publisher.publish("test").await;

    assert_eq!(report.outcome, RunOutcome::Published);
    assert_eq!(report.predictions, 3);
    assert_eq!(report.extracted, 0);

    let messages = sink.messages();
    assert_eq!(messages.len(), 5);
    assert!(messages[0].contains("*Прогнозов сегодня:* 3"));
    for (i, text) in messages[1..4].iter().enumerate() {
        assert!(text.contains(&format!("ПРОГНОЗ #{}", i + 1)));
        assert!(text.contains("Алгоритмический анализ"));
    }
    assert!(messages[4].contains(&format!(
        "*Средняя уверенность:* {}%",
        report.average_confidence
    )));
}

#[tokio::test]
async fn test_strict_extraction_digest() {
    let llm = Arc::new(ScriptedGenerator::new(|_, prompt| Ok(strict_answer(prompt))));
    let sink = RecordingSink::new();
    let publisher = Harness {
        mode: DispatchMode::Digest,
        ..Harness::default()
    }
    .build(Some(llm.clone()), &sink);

    let report = publisher.publish("test").await;

    assert_eq!(report.outcome, RunOutcome::Published);
    assert_eq!(report.extracted, 3);
    assert_eq!(report.average_confidence, 80);
    assert_eq!(llm.calls(), 3);

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].matches("Команда А - Команда Б").count(), 3);
    assert!(messages[0].contains("Perplexity AI"));
}

#[tokio::test]
async fn test_missing_analysis_replaced_by_synthetic() {
    let llm = Arc::new(ScriptedGenerator::new(|_, prompt| {
        let answer = strict_answer(prompt);
        if prompt.contains("СПОРТ: Баскетбол") {
            Ok(answer
                .lines()
                .filter(|l| !l.starts_with("АНАЛИЗ"))
                .collect::<Vec<_>>()
                .join("\n"))
        } else {
            Ok(answer)
        }
    }));
    let sink = RecordingSink::new();
    let publisher = Harness::default().build(Some(llm), &sink);

    let report = publisher.publish("test").await;

    assert_eq!(report.outcome, RunOutcome::Published);
    assert_eq!(report.predictions, 3);
    assert_eq!(report.extracted, 2);
    assert_eq!(sink.messages().len(), 5);
}

#[tokio::test]
async fn test_loose_mode_single_prediction() {
    let llm = Arc::new(ScriptedGenerator::new(|_, prompt| {
        if prompt.starts_with("Какие футбольные") {
            Ok("Ла Лига, тур 10:\nБарселона - Севилья\nНачало в 22:00 МСК".into())
        } else if prompt.starts_with("Проанализируй") {
            Ok("Барселона явный фаворит.\n- Отличная форма\n- Травмы у гостей".into())
        } else {
            Ok("Ожидаем много голов в этом матче.".into())
        }
    }));
    let sink = RecordingSink::new();
    let publisher = Harness {
        extraction: ExtractionMode::Loose,
        count: 1,
        ..Harness::default()
    }
    .build(Some(llm.clone()), &sink);

    let report = publisher.publish("test").await;

    assert_eq!(report.extracted, 1);
    assert_eq!(llm.calls(), 3);

    let messages = sink.messages();
    assert_eq!(messages.len(), 3);
    assert!(messages[1].contains("Барселона - Севилья"));
    assert!(messages[1].contains("Тотал больше 2.5"));
}

#[tokio::test]
async fn test_live_only_unavailable_notice() {
    let llm = Arc::new(ScriptedGenerator::failing());
    let sink = RecordingSink::new();
    let publisher = Harness {
        live_only: true,
        ..Harness::default()
    }
    .build(Some(llm.clone()), &sink);

    let report = publisher.publish("test").await;

    assert_eq!(report.outcome, RunOutcome::Unavailable);
    assert_eq!(llm.calls(), 3);
    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("ПРОГНОЗЫ ВРЕМЕННО НЕДОСТУПНЫ"));
}

#[tokio::test]
async fn test_live_only_without_key_publishes_synthetic() {
    let sink = RecordingSink::new();
    let publisher = Harness {
        live_only: true,
        ..Harness::default()
    }
    .build(None, &sink);

    assert!(!publisher.live_only());
    let report = publisher.publish("test").await;

    assert_eq!(report.outcome, RunOutcome::Published);
    assert_eq!(report.predictions, 3);
}

#[tokio::test]
async fn test_failed_item_does_not_stop_run() {
    let sink = RecordingSink::new();
    sink.fail_on("ПРОГНОЗ #2");
    let publisher = Harness::default().build(None, &sink);

    let report = publisher.publish("test").await;

    assert_eq!(report.outcome, RunOutcome::Published);
    assert_eq!(report.messages_failed, 1);
    let messages = sink.messages();
    assert_eq!(messages.len(), 4);
    assert!(messages[3].contains("ВСЕ ПРОГНОЗЫ ОТПРАВЛЕНЫ"));
}

#[tokio::test]
async fn test_failed_footer_sends_error_notice() {
    let sink = RecordingSink::new();
    sink.fail_on("ВСЕ ПРОГНОЗЫ ОТПРАВЛЕНЫ");
    let publisher = Harness::default().build(None, &sink);

    let report = publisher.publish("test").await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    let messages = sink.messages();
    assert_eq!(messages.len(), 5);
    assert!(messages[4].contains("ТЕХНИЧЕСКИЕ ПРОБЛЕМЫ"));
    assert!(messages[4].contains("Failed to send footer"));
}

#[tokio::test]
async fn test_overlapping_trigger_is_skipped() {
    let sink = RecordingSink::new();
    let publisher = Harness {
        pause: Duration::from_millis(50),
        ..Harness::default()
    }
    .build(None, &sink);

    let (first, second) = tokio::join!(publisher.publish("scheduled"), publisher.publish("manual"));

    assert_eq!(first.outcome, RunOutcome::Published);
    assert_eq!(second.outcome, RunOutcome::Skipped);
    assert_eq!(publisher.runs_started(), 1);
    assert_eq!(sink.messages().len(), 5);
    assert_eq!(publisher.last_run().await.unwrap().trigger, "scheduled");
}
