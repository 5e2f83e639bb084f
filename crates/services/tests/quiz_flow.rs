use std::sync::Arc;

use learn_core::achievements::{FIRST_LESSON, WEEK_WARRIOR};
use learn_core::model::{LessonId, QuizId, sample_quiz};
use learn_core::time::fixed_clock;
use services::{
    AdvanceOutcome, FEEDBACK_DELAY, LearningContext, ProgressStore, QuizConfig, QuizEvent,
    QuizLoopService, QuizSessionError, QuizState,
};
use storage::progress_codec::{Decoded, decode_progress};
use storage::repository::{InMemoryRepository, KeyValueStore, PROGRESS_KEY, Storage};

async fn empty_progress(repo: &InMemoryRepository) -> ProgressStore {
    ProgressStore::load(fixed_clock(), Arc::new(repo.clone())).await
}

#[tokio::test(start_paused = true)]
async fn sample_quiz_advances_on_timer_and_persists_score() {
    let repo = InMemoryRepository::new();
    let mut progress = empty_progress(&repo).await;
    let service = QuizLoopService::default();
    let mut run = service.start(sample_quiz().unwrap());
    let started = tokio::time::Instant::now();

    let first = service.select_answer(&mut run, 1).unwrap();
    assert!(first.was_correct);
    assert!(run.has_pending_advance());
    let event = run.next_event().await.expect("feedback timer fired");
    let outcome = service.handle_event(&mut run, event, &mut progress).await.unwrap();
    assert_eq!(outcome, AdvanceOutcome::NextQuestion);
    assert_eq!(run.session().state(), QuizState::AwaitingAnswer);

    let second = service.select_answer(&mut run, 0).unwrap();
    assert!(!second.was_correct);
    assert_eq!(second.correct_index, 1);
    let event = run.next_event().await.expect("feedback timer fired");
    let AdvanceOutcome::Completed(outcome) =
        service.handle_event(&mut run, event, &mut progress).await.unwrap()
    else {
        panic!("quiz should complete after the last question");
    };

    assert!(started.elapsed() >= FEEDBACK_DELAY * 2);
    assert_eq!(outcome.result.score, 1);
    assert_eq!(outcome.result.total, 2);
    assert_eq!(outcome.result.percentage, 50);
    assert!(outcome.persisted);
    assert_eq!(run.outcome(), Some(outcome));
    assert!(!run.has_pending_advance());

    let raw = repo.get(PROGRESS_KEY).await.unwrap();
    let Decoded::Current(stored) = decode_progress(raw.as_deref(), fixed_clock().now()) else {
        panic!("stored progress should be current");
    };
    assert_eq!(stored.quiz_score("sample-quiz").unwrap().score, 50);
    assert!(stored.achievements().is_empty());
}

#[tokio::test(start_paused = true)]
async fn events_from_other_runs_are_ignored() {
    let repo = InMemoryRepository::new();
    let mut progress = empty_progress(&repo).await;
    let service = QuizLoopService::default();
    let mut discarded = service.start(sample_quiz().unwrap());
    let mut current = service.start(sample_quiz().unwrap());

    service.select_answer(&mut discarded, 1).unwrap();
    service.select_answer(&mut current, 1).unwrap();
    let stale = discarded.next_event().await.expect("timer fired");
    drop(discarded);

    let outcome = service.handle_event(&mut current, stale, &mut progress).await.unwrap();
    assert_eq!(outcome, AdvanceOutcome::Ignored);
    assert_eq!(current.session().state(), QuizState::ShowingFeedback);
    assert_eq!(current.session().current_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn manual_advance_cancels_the_pending_timer() {
    let repo = InMemoryRepository::new();
    let mut progress = empty_progress(&repo).await;
    let service = QuizLoopService::new(QuizConfig {
        feedback_delay: FEEDBACK_DELAY,
    });
    let mut run = service.start(sample_quiz().unwrap());

    service.select_answer(&mut run, 1).unwrap();
    let outcome = service.advance_now(&mut run, &mut progress).await.unwrap();
    assert_eq!(outcome, AdvanceOutcome::NextQuestion);
    assert!(!run.has_pending_advance());

    tokio::time::sleep(FEEDBACK_DELAY * 2).await;
    assert_eq!(run.next_event().await, None);

    // A late event for the first answer must not skip the second question.
    service.select_answer(&mut run, 1).unwrap();
    let late = QuizEvent::AdvanceDue {
        run_id: run.id(),
        answer_count: 1,
    };
    let outcome = service.handle_event(&mut run, late, &mut progress).await.unwrap();
    assert_eq!(outcome, AdvanceOutcome::Ignored);
    assert_eq!(run.session().state(), QuizState::ShowingFeedback);
    assert_eq!(run.session().current_index(), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_transitions_do_not_schedule_timers() {
    let repo = InMemoryRepository::new();
    let mut progress = empty_progress(&repo).await;
    let service = QuizLoopService::default();
    let mut run = service.start(sample_quiz().unwrap());

    assert!(matches!(
        service.advance_now(&mut run, &mut progress).await,
        Err(QuizSessionError::InvalidTransition { .. })
    ));

    service.select_answer(&mut run, 1).unwrap();
    service.advance_now(&mut run, &mut progress).await.unwrap();
    service.select_answer(&mut run, 1).unwrap();
    let outcome = service.advance_now(&mut run, &mut progress).await.unwrap();
    assert!(matches!(outcome, AdvanceOutcome::Completed(o) if o.result.percentage == 100));

    assert!(service.select_answer(&mut run, 0).is_err());
    assert!(!run.has_pending_advance());
    assert_eq!(progress.record().quiz_score("sample-quiz").unwrap().score, 100);
}

#[tokio::test(start_paused = true)]
async fn shuffled_run_keeps_every_question() {
    let service = QuizLoopService::default().with_shuffle_questions(true);
    let run = service.start(sample_quiz().unwrap());

    let mut ids: Vec<_> = run.session().questions().iter().map(|q| q.id()).collect();
    ids.sort_by_key(|id| id.value());
    let expected: Vec<_> = sample_quiz()
        .unwrap()
        .questions()
        .iter()
        .map(|q| q.id())
        .collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn first_lesson_through_context_survives_reload() {
    let repo = InMemoryRepository::new();
    let storage = Storage {
        kv: Arc::new(repo.clone()),
    };
    let mut ctx = LearningContext::new(fixed_clock(), &storage, QuizConfig::default())
        .await
        .unwrap();

    let notices = ctx.complete_lesson(LessonId::new("intro")).await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].id.as_str(), FIRST_LESSON);

    let reloaded = LearningContext::new(fixed_clock(), &storage, QuizConfig::default())
        .await
        .unwrap();
    assert!(reloaded.progress().record().lesson("intro").unwrap().completed);
    assert!(reloaded.progress().record().has_achievement(FIRST_LESSON));
}

#[tokio::test]
async fn legacy_progress_unlocks_week_warrior_on_seventh_lesson() {
    let lessons: Vec<String> = (1..=6)
        .map(|i| format!(r#""lesson-{i}":{{"completed":true,"completedAt":"2024-01-0{i}T10:00:00Z"}}"#))
        .collect();
    let legacy = format!(
        r#"{{"lessons":{{{}}},"quizzes":{{}},"projects":{{}},"streak":0,"totalTime":0,"achievements":["first-lesson"]}}"#,
        lessons.join(",")
    );
    let repo = InMemoryRepository::new().with_entry(PROGRESS_KEY, legacy);
    let storage = Storage {
        kv: Arc::new(repo.clone()),
    };
    let mut ctx = LearningContext::new(fixed_clock(), &storage, QuizConfig::default())
        .await
        .unwrap();
    assert_eq!(ctx.progress().record().completed_lesson_count(), 6);

    let notices = ctx.complete_lesson(LessonId::new("lesson-7")).await;
    let ids: Vec<_> = notices.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec![WEEK_WARRIOR]);
    assert_eq!(
        ctx.progress()
            .record()
            .achievements()
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>(),
        vec![FIRST_LESSON, WEEK_WARRIOR]
    );
}

#[tokio::test(start_paused = true)]
async fn context_quiz_run_records_score() {
    let mut ctx = LearningContext::in_memory(fixed_clock()).await.unwrap();
    let mut run = ctx.start_quiz(&QuizId::new("sample-quiz")).unwrap();

    for pick in [1, 1] {
        ctx.select_answer(&mut run, pick).unwrap();
        let event = run.next_event().await.unwrap();
        ctx.handle_quiz_event(&mut run, event).await.unwrap();
    }

    assert!(run.session().is_complete());
    assert_eq!(
        ctx.progress().record().quiz_score("sample-quiz").unwrap().score,
        100
    );
}
