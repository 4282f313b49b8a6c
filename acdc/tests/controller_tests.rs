//! Batch controller tests

mod helpers;

use std::sync::Arc;

use acdc::input::{SectionKind, SpecificationEvent};
use acdc::services::{BatchError, BatchOutcome, PagePile};
use acdc::session::{BatchController, ControllerMode};
use acdc_common::events::EventBus;
use helpers::{desired, p, FakeWiki};

fn controller(wiki: FakeWiki) -> (BatchController, Arc<FakeWiki>) {
    let wiki = Arc::new(wiki);
    let controller = BatchController::new(wiki.clone(), EventBus::new(100), vec!["BotSDC".into()]);
    (controller, wiki)
}

async fn add_titles(controller: &BatchController, titles: &[&str]) {
    controller
        .dispatch(SpecificationEvent::AddTitles {
            titles: titles.iter().map(|t| t.to_string()).collect(),
        })
        .await
        .unwrap();
}

async fn add_depicts(controller: &BatchController, item: &str) {
    controller
        .dispatch(SpecificationEvent::AddStatement {
            section: SectionKind::Add,
            statement: desired("P180", item),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_new_controller_is_editing_and_not_submittable() {
    let (controller, _) = controller(FakeWiki::new());
    assert_eq!(controller.mode().await, ControllerMode::Editing);

    let status = controller.status().await;
    assert_eq!(status.titles, 0);
    assert!(!status.can_submit);
    assert!(status.last_run_id.is_none());
}

#[tokio::test]
async fn test_publish_refused_while_invalid() {
    let (controller, wiki) = controller(FakeWiki::new().with_page("File:A.jpg", 1));
    add_titles(&controller, &["A.jpg"]).await;
    add_depicts(&controller, "Q146").await;
    add_depicts(&controller, "Q146").await;

    assert!(!controller.validity().await.can_submit);
    let result = controller.run(false).await;
    assert!(matches!(result, Err(BatchError::Invalid(_))));
    assert!(wiki.calls().is_empty());
    assert_eq!(controller.mode().await, ControllerMode::Editing);
}

#[tokio::test]
async fn test_stop_while_idle_is_rejected() {
    let (controller, _) = controller(FakeWiki::new());
    assert!(matches!(controller.stop().await, Err(BatchError::NotRunning)));
}

#[tokio::test]
async fn test_run_removes_completed_titles() {
    let wiki = FakeWiki::new()
        .with_page("File:A.jpg", 1)
        .with_page("File:B.jpg", 2);
    let (controller, wiki) = controller(wiki);
    add_titles(&controller, &["A.jpg", "B.jpg"]).await;
    add_depicts(&controller, "Q146").await;

    let outcome = controller.run(false).await.unwrap();

    assert!(outcome.is_finished());
    assert_eq!(outcome.summary().files_processed, 2);
    assert_eq!(wiki.writes().len(), 2);
    assert_eq!(wiki.statements(1, "P180").len(), 1);

    let spec = controller.specification().await;
    assert!(spec.titles().is_empty());
    assert_eq!(spec.add_sections().len(), 1);
    assert_eq!(controller.mode().await, ControllerMode::Editing);
    assert!(!controller.validity().await.can_submit);
}

#[tokio::test]
async fn test_dry_run_keeps_titles() {
    let (controller, wiki) = controller(FakeWiki::new().with_page("File:A.jpg", 1));
    add_titles(&controller, &["A.jpg"]).await;
    add_depicts(&controller, "Q146").await;

    let outcome = controller.run(true).await.unwrap();

    assert_eq!(outcome.summary().writes, 1);
    assert!(wiki.writes().is_empty());
    assert_eq!(controller.specification().await.titles(), &["File:A.jpg"]);
}

#[tokio::test]
async fn test_stop_keeps_unprocessed_titles() {
    let wiki = FakeWiki::new()
        .with_page("File:A.jpg", 1)
        .with_page("File:B.jpg", 2)
        .with_page("File:C.jpg", 3);
    let (controller, wiki) = controller(wiki);
    wiki.arm_stop(1, controller.stop_signal());
    add_titles(&controller, &["A.jpg", "B.jpg", "C.jpg"]).await;
    add_depicts(&controller, "Q146").await;

    let outcome = controller.run(false).await.unwrap();

    assert!(matches!(outcome, BatchOutcome::Stopped(_)));
    assert_eq!(wiki.writes().len(), 1);
    assert_eq!(
        controller.specification().await.titles(),
        &["File:B.jpg", "File:C.jpg"]
    );
}

#[tokio::test]
async fn test_stop_requested_while_idle_does_not_leak_into_next_run() {
    let (controller, wiki) = controller(FakeWiki::new().with_page("File:A.jpg", 1));
    controller.stop_signal().request();
    add_titles(&controller, &["A.jpg"]).await;
    add_depicts(&controller, "Q146").await;

    let outcome = controller.run(false).await.unwrap();
    assert!(outcome.is_finished());
    assert_eq!(wiki.writes().len(), 1);
}

#[tokio::test]
async fn test_write_failure_recorded_as_last_error() {
    let wiki = FakeWiki::new()
        .with_page("File:A.jpg", 1)
        .with_page("File:B.jpg", 2)
        .fail_write(1, "editconflict");
    let (controller, _) = controller(wiki);
    add_titles(&controller, &["A.jpg", "B.jpg"]).await;
    add_depicts(&controller, "Q146").await;

    let error = controller.run(false).await.unwrap_err();
    assert!(error.is_edit_conflict());

    let status = controller.status().await;
    assert_eq!(status.mode, ControllerMode::Editing);
    assert!(status.last_error.is_some());
    assert_eq!(controller.specification().await.titles(), &["File:B.jpg"]);
}

#[tokio::test]
async fn test_load_category_follows_continuation() {
    let wiki = FakeWiki::new().with_category(
        "Category:Maps",
        vec![
            vec!["File:A.jpg", "Category:Sub maps"],
            vec!["File:B.jpg", "File:A.jpg"],
        ],
    );
    let (controller, wiki) = controller(wiki);

    let added = controller.load_category("Maps").await.unwrap();

    assert_eq!(added, 2);
    assert_eq!(
        controller.specification().await.titles(),
        &["File:A.jpg", "File:B.jpg"]
    );
    assert_eq!(wiki.calls().len(), 2);
}

#[tokio::test]
async fn test_large_pagepile_needs_confirmation() {
    let (controller, _) = controller(FakeWiki::new());
    let pile = PagePile {
        id: 42,
        files: (0..150).map(|i| format!("File:{}.jpg", i)).collect(),
    };

    let load = controller.load_pagepile(pile.clone(), false).await.unwrap();
    assert!(load.needs_confirmation);
    assert_eq!(load.added, 0);
    assert!(controller.specification().await.titles().is_empty());

    let load = controller.load_pagepile(pile, true).await.unwrap();
    assert!(!load.needs_confirmation);
    assert_eq!(load.added, 150);
}

#[tokio::test]
async fn test_small_pagepile_loads_directly() {
    let (controller, _) = controller(FakeWiki::new());
    add_titles(&controller, &["A.jpg"]).await;
    let pile = PagePile {
        id: 7,
        files: vec!["File:A.jpg".into(), "File:B.jpg".into()],
    };

    let load = controller.load_pagepile(pile, false).await.unwrap();
    assert_eq!(load.files, 2);
    assert_eq!(load.added, 1);
}

#[tokio::test]
async fn test_suggestions_exclude_collected_titles() {
    let wiki = FakeWiki::new().with_search_results(&["File:Cat.jpg", "File:Cat 2.jpg", "File:Dog.jpg"]);
    let (controller, _) = controller(wiki);
    add_titles(&controller, &["Cat.jpg"]).await;

    let suggestions = controller.suggestions("Cat").await.unwrap();
    assert_eq!(suggestions, vec!["File:Cat 2.jpg".to_string()]);
}

#[tokio::test]
async fn test_events_refused_while_saving() {
    let (controller, _) = controller(FakeWiki::new().with_page("File:A.jpg", 1));
    add_titles(&controller, &["A.jpg"]).await;
    add_depicts(&controller, "Q146").await;

    controller.publish(false).await.unwrap();
    // The background run may already be done; only a Saving controller must refuse
    if controller.mode().await == ControllerMode::Saving {
        let result = controller
            .dispatch(SpecificationEvent::RemoveProperty {
                section: SectionKind::Add,
                property: p("P180"),
            })
            .await;
        assert!(matches!(result, Err(BatchError::AlreadyRunning)));
    }
}

#[tokio::test]
async fn test_panicking_background_run_returns_to_editing() {
    let wiki = FakeWiki::new()
        .with_page("File:A.jpg", 1)
        .panicking_writes();
    let (controller, _) = controller(wiki);
    add_titles(&controller, &["A.jpg"]).await;
    add_depicts(&controller, "Q146").await;

    controller.publish(false).await.unwrap();

    let mut waited = 0;
    while controller.mode().await == ControllerMode::Saving {
        assert!(waited < 200, "controller stuck in Saving");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        waited += 1;
    }

    let status = controller.status().await;
    assert!(status.last_error.unwrap().contains("aborted"));
    assert_eq!(controller.specification().await.titles(), &["File:A.jpg"]);
    assert!(controller
        .dispatch(SpecificationEvent::ClearTitles)
        .await
        .is_ok());
}
