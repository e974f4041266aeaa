//! Circulation rules exercised through the service layer

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use circulation_desk::{
    circulation::{CirculationPolicy, ManualClock},
    config::AuthConfig,
    error::{AppError, AppResult, CirculationError},
    models::{Actor, LoanStatus, Reader, Role, Title, TitleDetails},
    repository::{JsonFileStore, MemoryStore, Repository, Store},
    services::Services,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap()
}

fn reader(id: &str, role: Role) -> Reader {
    Reader {
        id: id.to_string(),
        name: format!("Reader {}", id.to_uppercase()),
        email: format!("{}@library.test", id),
        registration: format!("2024-{}", id),
        password_hash: String::new(),
        role,
        loans: Vec::new(),
        reservations: Vec::new(),
    }
}

fn title(id: i32, copies: u32) -> Title {
    Title {
        id,
        title: format!("Title {}", id),
        author: "Octavia E. Butler".to_string(),
        publisher: "Seven Stories".to_string(),
        edition: "1st".to_string(),
        isbn: None,
        categories: Vec::new(),
        year: Some(1993),
        location: "Stacks".to_string(),
        total_copies: copies,
        on_loan_count: 0,
        reservation_queue: Vec::new(),
    }
}

struct Desk {
    services: Services,
    clock: Arc<ManualClock>,
    store: Arc<MemoryStore>,
}

impl Desk {
    async fn with_policy(policy: CirculationPolicy, titles: Vec<Title>) -> Self {
        let readers = vec![
            reader("a", Role::Student),
            reader("b", Role::Faculty),
            reader("c", Role::Student),
            reader("s", Role::Staff),
        ];
        let store = Arc::new(MemoryStore::with_snapshot(readers, titles));
        let clock = Arc::new(ManualClock::new(start()));
        let repository = Repository::load(store.clone(), policy).await.unwrap();

        Self {
            services: Services::new(repository, clock.clone(), AuthConfig::default()),
            clock,
            store,
        }
    }

    async fn new(titles: Vec<Title>) -> Self {
        Self::with_policy(CirculationPolicy::default(), titles).await
    }

    async fn on_loan(&self, title_id: i32) -> u32 {
        self.services
            .catalog
            .get_title(title_id)
            .await
            .unwrap()
            .on_loan_count
    }

    async fn queue(&self, title_id: i32) -> Vec<String> {
        self.services
            .catalog
            .list_reservations(&staff(), title_id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.reader_id)
            .collect()
    }
}

fn actor(id: &str) -> Actor {
    let role = match id {
        "s" => Role::Staff,
        "b" => Role::Faculty,
        _ => Role::Student,
    };
    Actor::new(id, role)
}

fn staff() -> Actor {
    actor("s")
}

fn rejection<T: std::fmt::Debug>(result: AppResult<T>) -> CirculationError {
    match result {
        Err(AppError::Circulation(e)) => e,
        other => panic!("expected a circulation error, got {:?}", other),
    }
}

#[tokio::test]
async fn returned_copy_goes_to_waiting_reader() {
    let desk = Desk::new(vec![title(1, 1)]).await;
    let circulation = &desk.services.circulation;

    let loan = circulation.borrow(&actor("a"), 1).await.unwrap();
    assert_eq!(loan.due_on, start() + Duration::days(14));
    assert_eq!(desk.on_loan(1).await, 1);

    assert_eq!(
        rejection(circulation.borrow(&actor("b"), 1).await),
        CirculationError::NoCopiesAvailable(1)
    );
    let reservation = circulation.reserve(&actor("b"), 1).await.unwrap();
    assert_eq!(reservation.position, 1);

    desk.clock.set(loan.due_on + Duration::days(3));
    let receipt = circulation.return_loan(&staff(), "a", 1).await.unwrap();

    assert_eq!(receipt.status, LoanStatus::ReturnedLate);
    assert_eq!(receipt.fee, Decimal::from(3));
    let assigned = receipt.auto_assigned.expect("b should receive the copy");
    assert_eq!(assigned.reader_id, "b");
    assert_eq!(assigned.due_on, loan.due_on + Duration::days(3 + 14));
    assert_eq!(desk.on_loan(1).await, 1);
    assert!(desk.queue(1).await.is_empty());

    let b = desk.services.readers.get_reader(&staff(), "b").await.unwrap();
    assert!(b.reservations.is_empty());
    assert_eq!(b.loans.len(), 1);
    assert_eq!(b.loans[0].status, LoanStatus::Active);

    // The committed state reached the store
    let saved = desk.store.titles();
    assert_eq!(saved[0].on_loan_count, 1);
    assert!(saved[0].reservation_queue.is_empty());
}

#[tokio::test]
async fn assignment_takes_only_the_head_of_the_queue() {
    let desk = Desk::new(vec![title(1, 1)]).await;
    let circulation = &desk.services.circulation;

    circulation.borrow(&actor("a"), 1).await.unwrap();
    circulation.reserve(&actor("b"), 1).await.unwrap();
    circulation.reserve(&actor("c"), 1).await.unwrap();

    let receipt = circulation.return_loan(&staff(), "a", 1).await.unwrap();

    assert_eq!(receipt.auto_assigned.unwrap().reader_id, "b");
    assert_eq!(desk.on_loan(1).await, 1);
    assert_eq!(desk.queue(1).await, vec!["c"]);

    let c = desk.services.readers.get_reader(&staff(), "c").await.unwrap();
    assert_eq!(c.reservations, vec![1]);
    assert!(c.loans.is_empty());
}

#[tokio::test]
async fn ineligible_head_keeps_its_place() {
    let desk = Desk::new(vec![title(1, 1), title(2, 1), title(3, 1), title(4, 1)]).await;
    let circulation = &desk.services.circulation;

    circulation.borrow(&actor("a"), 1).await.unwrap();
    for title_id in 2..=4 {
        circulation.borrow(&actor("b"), title_id).await.unwrap();
    }
    circulation.reserve(&actor("b"), 1).await.unwrap();
    circulation.reserve(&actor("c"), 1).await.unwrap();

    let receipt = circulation.return_loan(&staff(), "a", 1).await.unwrap();

    assert!(receipt.auto_assigned.is_none());
    assert_eq!(desk.on_loan(1).await, 0);
    assert_eq!(desk.queue(1).await, vec!["b", "c"]);
}

#[tokio::test]
async fn no_more_than_three_unfinished_loans() {
    let desk = Desk::new((1..=4).map(|id| title(id, 1)).collect()).await;
    let circulation = &desk.services.circulation;

    for title_id in 1..=3 {
        circulation.borrow(&actor("a"), title_id).await.unwrap();
    }
    assert_eq!(
        rejection(circulation.borrow(&actor("a"), 4).await),
        CirculationError::LoanLimitReached { open: 3, max: 3 }
    );

    // A return frees a slot
    circulation.return_loan(&staff(), "a", 2).await.unwrap();
    circulation.borrow(&actor("a"), 4).await.unwrap();
}

#[tokio::test]
async fn debt_of_ten_blocks_borrowing() {
    let desk = Desk::new(vec![title(1, 1), title(2, 1)]).await;
    let circulation = &desk.services.circulation;

    circulation.borrow(&actor("a"), 1).await.unwrap();
    desk.clock.advance(Duration::days(14 + 10));

    assert_eq!(
        rejection(circulation.borrow(&actor("a"), 2).await),
        CirculationError::DebtLimitExceeded {
            owed: Decimal::from(10),
            max: Decimal::from(10),
        }
    );
    assert_eq!(desk.on_loan(2).await, 0);
}

#[tokio::test]
async fn debt_just_under_the_limit_still_borrows() {
    let policy = CirculationPolicy {
        daily_fine: Decimal::new(333, 2),
        ..CirculationPolicy::default()
    };
    let desk = Desk::with_policy(policy, vec![title(1, 1), title(2, 1), title(3, 1)]).await;
    let circulation = &desk.services.circulation;

    circulation.borrow(&actor("a"), 1).await.unwrap();
    desk.clock.advance(Duration::days(14 + 3));

    let statement = circulation.statement(&actor("a"), "a").await.unwrap();
    assert_eq!(statement.open_debt, Decimal::new(999, 2));
    circulation.borrow(&actor("a"), 2).await.unwrap();

    desk.clock.advance(Duration::days(1));
    assert!(matches!(
        rejection(circulation.borrow(&actor("a"), 3).await),
        CirculationError::DebtLimitExceeded { .. }
    ));
}

#[tokio::test]
async fn fee_grows_one_per_whole_day() {
    let desk = Desk::new(vec![title(1, 1)]).await;
    let circulation = &desk.services.circulation;

    let due_on = circulation.borrow(&actor("a"), 1).await.unwrap().due_on;

    for (offset, expected) in [
        (Duration::zero(), 0),
        (Duration::hours(23), 0),
        (Duration::days(1), 1),
        (Duration::days(2) - Duration::seconds(1), 1),
        (Duration::days(2), 2),
        (Duration::days(7), 7),
    ] {
        desk.clock.set(due_on + offset);
        let statement = circulation.statement(&actor("a"), "a").await.unwrap();
        assert_eq!(statement.open_debt, Decimal::from(expected), "at due + {}", offset);
    }
}

#[tokio::test]
async fn reserving_does_not_allow_borrowing_at_zero_copies() {
    let desk = Desk::new(vec![title(1, 1)]).await;
    let circulation = &desk.services.circulation;

    circulation.borrow(&actor("a"), 1).await.unwrap();
    circulation.reserve(&actor("b"), 1).await.unwrap();

    assert_eq!(
        rejection(circulation.borrow(&actor("b"), 1).await),
        CirculationError::NoCopiesAvailable(1)
    );
    assert_eq!(desk.queue(1).await, vec!["b"]);
}

#[tokio::test]
async fn reserve_rejections() {
    let desk = Desk::new(vec![title(1, 1), title(2, 1)]).await;
    let circulation = &desk.services.circulation;

    assert_eq!(
        rejection(circulation.reserve(&actor("a"), 1).await),
        CirculationError::CopiesAvailableUseBorrow(1)
    );

    circulation.borrow(&actor("a"), 1).await.unwrap();
    assert_eq!(
        rejection(circulation.reserve(&actor("a"), 1).await),
        CirculationError::AlreadyBorrowed(1)
    );

    circulation.reserve(&actor("b"), 1).await.unwrap();
    assert_eq!(
        rejection(circulation.reserve(&actor("b"), 1).await),
        CirculationError::AlreadyReserved(1)
    );
    assert_eq!(
        rejection(circulation.reserve(&staff(), 1).await),
        CirculationError::RoleNotEligible("s".to_string())
    );
    assert_eq!(
        rejection(circulation.reserve(&actor("b"), 9).await),
        CirculationError::TitleNotFound(9)
    );
}

#[tokio::test]
async fn cancelling_keeps_the_rest_of_the_queue_in_order() {
    let desk = Desk::new(vec![title(1, 1)]).await;
    let circulation = &desk.services.circulation;

    circulation.borrow(&actor("a"), 1).await.unwrap();
    circulation.reserve(&actor("b"), 1).await.unwrap();
    let c = circulation.reserve(&actor("c"), 1).await.unwrap();
    assert_eq!(c.position, 2);

    assert_eq!(
        rejection(circulation.cancel_reservation(&actor("c"), "b", 1).await),
        CirculationError::Forbidden
    );
    circulation
        .cancel_reservation(&actor("b"), "b", 1)
        .await
        .unwrap();
    assert_eq!(desk.queue(1).await, vec!["c"]);

    assert_eq!(
        rejection(circulation.cancel_reservation(&actor("b"), "b", 1).await),
        CirculationError::ReservationNotFound(1)
    );
    circulation
        .cancel_reservation(&staff(), "c", 1)
        .await
        .unwrap();
    assert!(desk.queue(1).await.is_empty());
}

#[tokio::test]
async fn renewal_window_opens_five_days_before_due() {
    let desk = Desk::new(vec![title(1, 1), title(2, 1)]).await;
    let circulation = &desk.services.circulation;

    let due_on = circulation.borrow(&actor("a"), 1).await.unwrap().due_on;
    circulation.borrow(&actor("a"), 2).await.unwrap();

    desk.clock.set(due_on - Duration::days(6));
    assert_eq!(
        rejection(circulation.renew(&actor("a"), "a", 2).await),
        CirculationError::RenewalTooEarly {
            days_remaining: 6,
            window: 5,
        }
    );

    desk.clock.set(due_on - Duration::days(5));
    let renewal = circulation.renew(&actor("a"), "a", 1).await.unwrap();
    assert_eq!(renewal.due_on, due_on + Duration::days(14));
}

#[tokio::test]
async fn overdue_loan_can_be_renewed_while_debt_is_low() {
    let desk = Desk::new(vec![title(1, 1)]).await;
    let circulation = &desk.services.circulation;

    let due_on = circulation.borrow(&actor("a"), 1).await.unwrap().due_on;
    desk.clock.set(due_on + Duration::days(2));

    let renewal = circulation.renew(&staff(), "a", 1).await.unwrap();
    assert_eq!(renewal.due_on, due_on + Duration::days(14));

    let a = desk.services.readers.get_reader(&staff(), "a").await.unwrap();
    assert_eq!(a.loans[0].status, LoanStatus::Active);

    desk.clock.set(renewal.due_on + Duration::days(10));
    assert!(matches!(
        rejection(circulation.renew(&actor("a"), "a", 1).await),
        CirculationError::DebtLimitExceeded { .. }
    ));
}

#[tokio::test]
async fn on_time_return_leaves_nothing_to_settle() {
    let desk = Desk::new(vec![title(1, 1)]).await;
    let circulation = &desk.services.circulation;

    let due_on = circulation.borrow(&actor("a"), 1).await.unwrap().due_on;
    desk.clock.set(due_on);

    let receipt = circulation.return_loan(&staff(), "a", 1).await.unwrap();
    assert_eq!(receipt.status, LoanStatus::ReturnedOnTime);
    assert_eq!(receipt.fee, Decimal::ZERO);
    assert_eq!(
        rejection(circulation.settle_fee(&staff(), "a", 1).await),
        CirculationError::NoPendingFeeFound(1)
    );
    assert_eq!(
        rejection(circulation.return_loan(&staff(), "a", 1).await),
        CirculationError::ActiveLoanNotFound(1)
    );
}

#[tokio::test]
async fn late_fee_is_settled_once() {
    let desk = Desk::new(vec![title(1, 1)]).await;
    let circulation = &desk.services.circulation;

    let due_on = circulation.borrow(&actor("a"), 1).await.unwrap().due_on;
    desk.clock.set(due_on + Duration::days(4) + Duration::hours(5));
    circulation.return_loan(&staff(), "a", 1).await.unwrap();

    let statement = circulation.statement(&actor("a"), "a").await.unwrap();
    assert_eq!(statement.unsettled_fees, Decimal::from(4));
    assert_eq!(statement.open_debt, Decimal::ZERO);

    assert_eq!(
        rejection(circulation.settle_fee(&actor("a"), "a", 1).await),
        CirculationError::Forbidden
    );
    let settlement = circulation.settle_fee(&staff(), "a", 1).await.unwrap();
    assert_eq!(settlement.amount_paid, Decimal::from(4));

    let a = desk.services.readers.get_reader(&staff(), "a").await.unwrap();
    assert_eq!(a.loans[0].status, LoanStatus::ReturnedLate);
    assert_eq!(a.loans[0].fee_owed, Decimal::ZERO);
    assert_eq!(
        rejection(circulation.settle_fee(&staff(), "a", 1).await),
        CirculationError::NoPendingFeeFound(1)
    );
}

#[tokio::test]
async fn staff_only_operations() {
    let desk = Desk::new(vec![title(1, 2)]).await;
    let circulation = &desk.services.circulation;

    assert_eq!(
        rejection(circulation.lend(&actor("b"), "a", 1).await),
        CirculationError::Forbidden
    );
    circulation.lend(&staff(), "a", 1).await.unwrap();

    assert_eq!(
        rejection(circulation.return_loan(&actor("a"), "a", 1).await),
        CirculationError::Forbidden
    );
    assert_eq!(
        rejection(circulation.renew(&actor("b"), "a", 1).await),
        CirculationError::Forbidden
    );
    assert_eq!(
        rejection(circulation.lend(&staff(), "s", 1).await),
        CirculationError::RoleNotEligible("s".to_string())
    );
    assert_eq!(
        rejection(circulation.lend(&staff(), "zz", 1).await),
        CirculationError::ReaderNotFound("zz".to_string())
    );
}

#[tokio::test]
async fn second_copy_of_the_same_title_is_refused() {
    let desk = Desk::new(vec![title(1, 2)]).await;
    let circulation = &desk.services.circulation;

    circulation.borrow(&actor("a"), 1).await.unwrap();
    assert_eq!(
        rejection(circulation.borrow(&actor("a"), 1).await),
        CirculationError::DuplicateLoan(1)
    );
    assert_eq!(desk.on_loan(1).await, 1);
}

#[tokio::test]
async fn concurrent_borrows_of_the_last_copy() {
    let desk = Desk::new(vec![title(1, 1)]).await;
    let first = desk.services.circulation.clone();
    let second = desk.services.circulation.clone();

    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.borrow(&actor("a"), 1).await }),
        tokio::spawn(async move { second.borrow(&actor("b"), 1).await }),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(AppError::Circulation(CirculationError::NoCopiesAvailable(1)))
    )));
    assert_eq!(desk.on_loan(1).await, 1);
}

#[tokio::test]
async fn availability_never_goes_negative() {
    let desk = Desk::new(vec![title(1, 2)]).await;
    let circulation = &desk.services.circulation;

    let check = |details: TitleDetails| {
        assert!(details.on_loan_count <= details.total_copies);
        assert_eq!(
            details.available_copies,
            details.total_copies - details.on_loan_count
        );
    };

    circulation.borrow(&actor("a"), 1).await.unwrap();
    check(desk.services.catalog.get_title(1).await.unwrap());
    circulation.borrow(&actor("b"), 1).await.unwrap();
    check(desk.services.catalog.get_title(1).await.unwrap());
    let _ = circulation.borrow(&actor("c"), 1).await;
    circulation.reserve(&actor("c"), 1).await.unwrap();
    check(desk.services.catalog.get_title(1).await.unwrap());
    circulation.return_loan(&staff(), "a", 1).await.unwrap();
    check(desk.services.catalog.get_title(1).await.unwrap());
    circulation.return_loan(&staff(), "b", 1).await.unwrap();
    circulation.return_loan(&staff(), "c", 1).await.unwrap();
    let details = desk.services.catalog.get_title(1).await.unwrap();
    check(details.clone());
    assert_eq!(details.available_copies, 2);
}

#[tokio::test]
async fn state_survives_a_restart_on_disk() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).await.unwrap());
    store
        .save_readers(&[reader("a", Role::Student), reader("b", Role::Faculty)])
        .await
        .unwrap();
    store.save_titles(&[title(1, 1)]).await.unwrap();

    let clock = Arc::new(ManualClock::new(start()));
    let repository = Repository::load(store.clone(), CirculationPolicy::default())
        .await
        .unwrap();
    let services = Services::new(repository, clock.clone(), AuthConfig::default());
    services.circulation.borrow(&actor("a"), 1).await.unwrap();
    services.circulation.reserve(&actor("b"), 1).await.unwrap();

    let reopened = Arc::new(JsonFileStore::open(dir.path()).await.unwrap());
    let repository = Repository::load(reopened, CirculationPolicy::default())
        .await
        .unwrap();
    let services = Services::new(repository, clock, AuthConfig::default());

    let details = services.catalog.get_title(1).await.unwrap();
    assert_eq!(details.on_loan_count, 1);
    assert_eq!(details.queue_length, 1);
    let queue = services
        .catalog
        .list_reservations(&staff(), 1)
        .await
        .unwrap();
    assert_eq!(queue[0].reader_id, "b");
}
