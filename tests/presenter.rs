//! Prefetch Presenter Integration Tests
//!
//! Sequence-number staleness: completions arriving out of order must never
//! overwrite a slot with an image for an asset it no longer shows.

use std::sync::Arc;

use chrono::Utc;
use sortify::core::{
    CompletionOutcome, DecodeCompletion, DecodeRequest, PrefetchPresenter, Slot, SlotState,
};
use sortify::domain::{Asset, DecodedImage, TargetSize};

fn asset(id: &str) -> Asset {
    Asset::new(id, Utc::now())
}

fn image_for(request: &DecodeRequest) -> DecodedImage {
    DecodedImage::new(
        request.asset.id.clone(),
        request.asset.id.as_str().as_bytes().to_vec(),
        TargetSize::MAXIMUM,
    )
}

fn completion(request: &DecodeRequest) -> DecodeCompletion {
    DecodeCompletion::ready(request, image_for(request))
}

#[test]
fn test_out_of_order_completions_keep_latest_request() {
    let mut presenter = PrefetchPresenter::new();
    let (a, b, c) = (asset("a"), asset("b"), asset("c"));

    let r1 = presenter.issue(Slot::Current, Some(&a)).unwrap();
    let r2 = presenter.issue(Slot::Current, Some(&b)).unwrap();
    assert_eq!((r1.sequence, r2.sequence), (1, 2));

    // Completion 2 arrives first and is the latest: applied
    assert_eq!(presenter.complete(completion(&r2)), CompletionOutcome::Applied);
    assert_eq!(presenter.image(Slot::Current).unwrap().asset_id, b.id);

    // Completion 1 arrives late: discarded
    assert_eq!(presenter.complete(completion(&r1)), CompletionOutcome::Stale);
    assert_eq!(presenter.image(Slot::Current).unwrap().asset_id, b.id);

    // Request 3 supersedes 2
    let r3 = presenter.issue(Slot::Current, Some(&c)).unwrap();
    assert_eq!(r3.sequence, 3);
    assert_eq!(presenter.state(Slot::Current), &SlotState::Pending(3));
    assert_eq!(presenter.complete(completion(&r3)), CompletionOutcome::Applied);
    assert_eq!(presenter.image(Slot::Current).unwrap().asset_id, c.id);
}

#[test]
fn test_slots_are_sequenced_independently() {
    let mut presenter = PrefetchPresenter::new();
    let (a, b) = (asset("a"), asset("b"));

    let requests = presenter.refresh(Some(&a), Some(&b));
    assert_eq!(requests.len(), 2);
    assert_eq!(presenter.sequence(Slot::Current), 1);
    assert_eq!(presenter.sequence(Slot::Next), 1);

    presenter.issue(Slot::Next, None);
    assert_eq!(presenter.sequence(Slot::Current), 1);
    assert_eq!(presenter.sequence(Slot::Next), 2);

    // The next slot moved on; the current slot did not
    let next = requests.iter().find(|r| r.slot == Slot::Next).unwrap();
    let current = requests.iter().find(|r| r.slot == Slot::Current).unwrap();
    assert_eq!(presenter.complete(completion(next)), CompletionOutcome::Stale);
    assert_eq!(presenter.complete(completion(current)), CompletionOutcome::Applied);
    assert_eq!(presenter.state(Slot::Next), &SlotState::Idle);
}

#[test]
fn test_idle_slot_rejects_late_completion() {
    let mut presenter = PrefetchPresenter::new();
    let a = asset("a");

    let request = presenter.issue(Slot::Current, Some(&a)).unwrap();
    presenter.refresh(None, None);

    assert_eq!(presenter.complete(completion(&request)), CompletionOutcome::Stale);
    assert_eq!(presenter.state(Slot::Current), &SlotState::Idle);
    assert_eq!(presenter.state(Slot::Next), &SlotState::Idle);
    assert!(!presenter.is_pending());
}

#[test]
fn test_prefetched_next_image_is_promoted() {
    let mut presenter = PrefetchPresenter::new();
    let (a, b, c) = (asset("a"), asset("b"), asset("c"));

    let requests = presenter.refresh(Some(&a), Some(&b));
    for request in &requests {
        presenter.complete(completion(request));
    }
    let prefetched = presenter.image(Slot::Next).cloned().unwrap();

    // Queue advanced: b becomes current, c the new next
    let requests = presenter.refresh(Some(&b), Some(&c));
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].slot, Slot::Next);
    assert_eq!(requests[0].asset.id, c.id);

    assert_eq!(presenter.sequence(Slot::Current), 2);
    let shown = presenter.image(Slot::Current).unwrap();
    assert!(Arc::ptr_eq(&shown.bytes, &prefetched.bytes));
}

#[test]
fn test_failed_decode_marks_slot_failed() {
    let mut presenter = PrefetchPresenter::new();
    let a = asset("a");
    let request = presenter.issue(Slot::Current, Some(&a)).unwrap();

    let outcome = presenter.complete(DecodeCompletion {
        slot: request.slot,
        sequence: request.sequence,
        asset_id: request.asset.id.clone(),
        result: Ok(None),
    });

    assert_eq!(outcome, CompletionOutcome::Applied);
    assert_eq!(presenter.state(Slot::Current), &SlotState::Failed(1));
    assert!(presenter.image(Slot::Current).is_none());
}
