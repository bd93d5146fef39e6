use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::common::*;
use crate::listings::PropertyId;
use crate::memory::InMemoryStore;
use crate::reviews::ReviewStatus;
use crate::service::{ShortlistError, ShortlistService};

#[test]
fn rebuild_orders_by_aggregate_score() {
    let service = service();
    let cheap_and_small = service
        .create_property(house("Tiensesteenweg 40, 3001 Heverlee", 250_000, 400, &[]))
        .expect("property created");
    let complete = service
        .create_property(complete_house())
        .expect("property created");
    let middling = service
        .create_property(house("Dorpstraat 5, 3000 Leuven", 120_000, 700, &[]))
        .expect("property created");

    assert_eq!(service.aggregate_score(middling.id).expect("score"), 33);
    assert_eq!(service.aggregate_score(cheap_and_small.id).expect("score"), 0);

    let queue = service.rebuild_queue("ben").expect("queue built");
    assert_eq!(queue, vec![complete.id, middling.id, cheap_and_small.id]);
    assert_eq!(service.queue_for("ben").expect("queue"), queue);
}

#[test]
fn equal_scores_keep_insertion_order() {
    let service = service();
    let first = service
        .create_property(house("Dorpstraat 5, 3000 Leuven", 120_000, 700, &[]))
        .expect("property created");
    let second = service
        .create_property(house("Dorpstraat 7, 3000 Leuven", 120_000, 700, &[]))
        .expect("property created");

    assert_eq!(
        service.rebuild_queue("melissa").expect("queue built"),
        vec![first.id, second.id]
    );
}

#[test]
fn rebuild_skips_reviewed_and_sold_properties() {
    let service = service();
    let reviewed = service
        .create_property(complete_house())
        .expect("property created");
    let sold = service
        .create_property(house("Dorpstraat 5, 3000 Leuven", 120_000, 700, &[]))
        .expect("property created");
    let open = service
        .create_property(land("Veldweg 3, 3210 Lubbeek", 45_000, 1_500))
        .expect("land created");

    service
        .record_review("ben", reviewed.id, ReviewStatus::Accepted)
        .expect("review recorded");
    service.mark_sold(sold.id).expect("sold");

    assert_eq!(service.rebuild_queue("ben").expect("queue"), vec![open.id]);
    assert_eq!(
        service.rebuild_queue("melissa").expect("queue"),
        vec![reviewed.id, open.id]
    );
}

#[test]
fn selling_removes_from_every_queue_and_undo_does_not_requeue() {
    let service = service();
    let property = service
        .create_property(complete_house())
        .expect("property created");
    service
        .record_review("ben", property.id, ReviewStatus::Unsure)
        .expect("review recorded");
    assert_eq!(service.rebuild_all_queues().expect("rebuilt"), 2);
    assert_eq!(service.queue_for("melissa").expect("queue"), vec![property.id]);

    service.mark_sold(property.id).expect("sold");
    assert!(service.queue_for("melissa").expect("queue").is_empty());

    service.undo_review("ben", property.id).expect("undo");
    assert!(service.queue_for("ben").expect("queue").is_empty());
}

#[test]
fn next_in_queue_reports_what_is_left() {
    let service = service();
    let best = service
        .create_property(complete_house())
        .expect("property created");
    service
        .create_property(house("Dorpstraat 5, 3000 Leuven", 120_000, 700, &[]))
        .expect("property created");

    assert!(service.next_in_queue("ben").expect("head").is_none());
    service.rebuild_queue("ben").expect("queue built");

    let head = service
        .next_in_queue("ben")
        .expect("head")
        .expect("queue not empty");
    assert_eq!(head.property.id, best.id);
    assert_eq!(head.remaining, 1);

    service.delete_property(best.id).expect("deleted");
    let head = service
        .next_in_queue("ben")
        .expect("head")
        .expect("queue not empty");
    assert_eq!(head.remaining, 0);
}

#[test]
fn queues_belong_to_known_users() {
    let service = service();
    assert!(matches!(
        service.queue_for("ann"),
        Err(ShortlistError::UnknownUser(_))
    ));
    assert!(matches!(
        service.rebuild_queue("ann"),
        Err(ShortlistError::UnknownUser(_))
    ));
}

type PausingService = ShortlistService<InMemoryStore, PausingQueue>;

/// Holds ben's rebuild just before it writes the queue, starts `action` on
/// another thread, checks that it waits for the rebuild, then lets both
/// finish.
fn run_during_rebuild<T: Send>(
    service: &PausingService,
    pause: Pause,
    action: impl FnOnce() -> Result<T, ShortlistError> + Send,
) -> T {
    thread::scope(|scope| {
        let rebuild = scope.spawn(|| service.rebuild_queue("ben"));
        pause.entered.recv().expect("rebuild reached the queue write");

        let concurrent = scope.spawn(action);
        thread::sleep(Duration::from_millis(50));
        assert!(
            !concurrent.is_finished(),
            "queue change overtook a running rebuild"
        );

        pause.release.send(()).expect("rebuild still waiting");
        rebuild
            .join()
            .expect("rebuild thread")
            .expect("queue rebuilt");
        concurrent
            .join()
            .expect("concurrent thread")
            .expect("concurrent change applied")
    })
}

fn pausing_service() -> (PausingService, Pause) {
    let (queue, pause) = PausingQueue::new();
    (service_with_queue(Arc::new(queue)), pause)
}

fn assert_not_queued(service: &PausingService, property: PropertyId) {
    assert!(!service.queue_for("ben").expect("queue").contains(&property));
    if let Some(head) = service.next_in_queue("ben").expect("head") {
        assert_ne!(head.property.id, property);
    }
}

#[test]
fn sale_during_rebuild_leaves_the_property_out_of_the_queue() {
    let (service, pause) = pausing_service();
    let sold = service
        .create_property(complete_house())
        .expect("property created");
    let open = service
        .create_property(house("Dorpstraat 5, 3000 Leuven", 120_000, 700, &[]))
        .expect("property created");

    let stored = run_during_rebuild(&service, pause, || service.mark_sold(sold.id));
    assert!(stored.sold);

    assert_not_queued(&service, sold.id);
    assert_eq!(service.queue_for("ben").expect("queue"), vec![open.id]);
}

#[test]
fn deletion_during_rebuild_leaves_the_property_out_of_the_queue() {
    let (service, pause) = pausing_service();
    let removed = service
        .create_property(complete_house())
        .expect("property created");

    run_during_rebuild(&service, pause, || service.delete_property(removed.id));

    assert!(service.queue_for("ben").expect("queue").is_empty());
    assert!(service.next_in_queue("ben").expect("head").is_none());
}

#[test]
fn review_during_rebuild_leaves_the_property_out_of_the_queue() {
    let (service, pause) = pausing_service();
    let reviewed = service
        .create_property(complete_house())
        .expect("property created");
    let open = service
        .create_property(house("Dorpstraat 5, 3000 Leuven", 120_000, 700, &[]))
        .expect("property created");

    run_during_rebuild(&service, pause, || {
        service.record_review("ben", reviewed.id, ReviewStatus::Rejected)
    });

    assert_not_queued(&service, reviewed.id);
    assert_eq!(service.queue_for("ben").expect("queue"), vec![open.id]);
    assert_eq!(service.rebuild_queue("ben").expect("queue"), vec![open.id]);
}

#[test]
fn undo_racing_a_sale_never_requeues_the_sold_property() {
    let service = Arc::new(service());
    let property = service
        .create_property(complete_house())
        .expect("property created");
    service
        .record_review("ben", property.id, ReviewStatus::Unsure)
        .expect("review recorded");

    let undo = {
        let service = Arc::clone(&service);
        thread::spawn(move || service.undo_review("ben", property.id))
    };
    let sale = {
        let service = Arc::clone(&service);
        thread::spawn(move || service.mark_sold(property.id))
    };
    undo.join().expect("undo thread").expect("undo applied");
    sale.join().expect("sale thread").expect("sold");

    assert!(!service.queue_for("ben").expect("queue").contains(&property.id));
    assert!(service.next_in_queue("ben").expect("head").is_none());
}
