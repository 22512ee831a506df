use super::*;
use std::sync::Arc;

use shared::{domain::PackageStatus, error::GatewayError};

use crate::test_support::{sample_package, TestGateway};
use crate::{Notice, Severity};

fn drain(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

fn three_packed() -> Arc<TestGateway> {
    Arc::new(TestGateway::with_packages(vec![
        sample_package("abc", PackageStatus::Packed, &[]),
        sample_package("def", PackageStatus::Packed, &[]),
        sample_package("ghi", PackageStatus::Packed, &[]),
    ]))
}

#[tokio::test]
async fn first_page_rows_are_numbered_from_one() {
    let controller = PackageListController::new(three_packed());
    controller.run_search().await;

    let state = controller.state().await;
    let seqs: Vec<u64> = state.rows.iter().map(|row| row.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
    assert_eq!(state.total_record, 3);
    assert!(!state.busy);
}

#[tokio::test]
async fn sequence_numbers_follow_the_page_offset() {
    let controller = PackageListController::new(three_packed());
    controller.set_page_size(10).await;
    controller.set_page(2).await;

    let state = controller.state().await;
    let seqs: Vec<u64> = state.rows.iter().map(|row| row.seq).collect();
    assert_eq!(seqs, vec![21, 22, 23]);
}

#[tokio::test]
async fn failed_search_keeps_previous_rows_and_emits_one_notice_per_message() {
    let gateway = three_packed();
    let controller = PackageListController::new(gateway.clone());
    controller.run_search().await;
    assert_eq!(controller.state().await.rows.len(), 3);

    gateway.fail_search(GatewayError::Rejected {
        messages: vec!["filter invalid".into(), "date range too wide".into()],
    });
    let mut rx = controller.subscribe_notices();
    controller.run_search().await;

    let state = controller.state().await;
    assert_eq!(state.rows.len(), 3, "previous rows must stay displayed");
    assert!(!state.busy);

    let notices = drain(&mut rx);
    assert_eq!(
        notices,
        vec![
            Notice::error("filter invalid"),
            Notice::error("date range too wide"),
        ]
    );
    assert!(notices.iter().all(|n| n.severity == Severity::Error));
}

#[tokio::test]
async fn non_empty_signal_reruns_the_search_and_empty_does_not() {
    let gateway = three_packed();
    let controller = PackageListController::new(gateway.clone());
    controller.run_search().await;
    assert_eq!(gateway.search_calls(), 1);

    controller.on_refresh_signal(&RefreshSet::new()).await;
    assert_eq!(gateway.search_calls(), 1);

    let signal: RefreshSet = [PackageId::new("unrelated")].into_iter().collect();
    controller.on_refresh_signal(&signal).await;
    assert_eq!(
        gateway.search_calls(),
        2,
        "any non-empty signal re-searches, no intersection gating"
    );
}

#[tokio::test]
async fn exactly_one_selected_row_drives_the_detail_view() {
    let controller = PackageListController::new(three_packed());

    controller.set_selection(vec![PackageId::new("abc")]).await;
    assert_eq!(
        controller.single_selection().await,
        Some(PackageId::new("abc"))
    );

    controller.set_selection(Vec::new()).await;
    assert_eq!(controller.single_selection().await, None);

    controller
        .set_selection(vec![PackageId::new("abc"), PackageId::new("def")])
        .await;
    assert_eq!(controller.single_selection().await, None);
}

#[tokio::test]
async fn staged_filters_apply_on_the_next_search() {
    let gateway = three_packed();
    let controller = PackageListController::new(gateway.clone());

    controller.set_filter("status", "PACKED").await;
    assert_eq!(gateway.search_calls(), 0, "staging a filter must not search");

    controller.run_search().await;
    assert_eq!(gateway.search_calls(), 1);
    assert_eq!(
        controller.state().await.filters.get("status"),
        Some(&"PACKED".to_string())
    );
}

#[tokio::test]
async fn sort_change_triggers_a_search() {
    let gateway = three_packed();
    let controller = PackageListController::new(gateway.clone());

    controller.set_sort("created_at", SortOrder::Desc).await;
    assert_eq!(gateway.search_calls(), 1);
    let state = controller.state().await;
    assert_eq!(state.page.sort_column, "created_at");
    assert_eq!(state.page.sort_order, SortOrder::Desc);
}
