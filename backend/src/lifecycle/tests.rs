use super::*;
use crate::accounts::Accounts;
use crate::notify::OutgoingMail;
use crate::storage::{LocalDocumentStore, StorageError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use taxdesk_common::model::user::{Role, User};
use taxdesk_common::requests::{CreateUserRequest, EnrollRequest};
use tokio::sync::mpsc;

const MIB: usize = 1024 * 1024;
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Local store that counts calls and can be told to fail the n-th one.
struct CountingStore {
    inner: LocalDocumentStore,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn store(
        &self,
        category: DocumentCategory,
        suggested_name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredDocument, StorageError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(StorageError::Io(std::io::Error::other("bucket unavailable")));
        }
        self.inner
            .store(category, suggested_name, bytes, content_type)
            .await
    }
}

struct Harness {
    lifecycle: SubmissionLifecycle,
    db: Database,
    accounts: Accounts,
    store: Arc<CountingStore>,
    mail: mpsc::Receiver<OutgoingMail>,
    citizen: User,
    admin: User,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with_failing_store_call(None)
    }

    fn with_failing_store_call(fail_on_call: Option<usize>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let accounts = Accounts::new(db.clone());
        let store = Arc::new(CountingStore {
            inner: LocalDocumentStore::new(dir.path(), "http://localhost:8080"),
            calls: AtomicUsize::new(0),
            fail_on_call,
        });
        let (notifier, mail) = Notifier::channel(32);

        let citizen = accounts.enroll(enroll("1234567890", "Ada Obi", "ada@example.com")).unwrap();
        let admin = accounts
            .create(CreateUserRequest {
                nstin: "9999999999".into(),
                name: "Reviewer".into(),
                email: "reviewer@example.com".into(),
                phone: "08000000000".into(),
                password: "secret1".into(),
                role: Some(Role::Admin),
            })
            .unwrap();

        let lifecycle = SubmissionLifecycle::new(
            db.clone(),
            Arc::new(accounts.clone()),
            store.clone(),
            notifier,
            10 * MIB,
        )
        .with_admin_email(Some("desk@example.com".into()));

        Self {
            lifecycle,
            db,
            accounts,
            store,
            mail,
            citizen,
            admin,
            _dir: dir,
        }
    }

    fn drain_mail(&mut self) -> Vec<OutgoingMail> {
        let mut sent = Vec::new();
        while let Ok(mail) = self.mail.try_recv() {
            sent.push(mail);
        }
        sent
    }

    fn store_calls(&self) -> usize {
        self.store.calls.load(Ordering::SeqCst)
    }

    fn total_submissions(&self) -> u64 {
        self.lifecycle
            .admin_list(&SubmissionFilter::default(), 1, ADMIN_PAGE_SIZE)
            .unwrap()
            .total
    }

    async fn file(&self, user_id: &str) -> Submission {
        self.lifecycle
            .create(new_submission(user_id, xlsx(1024), pdf(1024)))
            .await
            .unwrap()
    }
}

fn enroll(nstin: &str, name: &str, email: &str) -> EnrollRequest {
    EnrollRequest {
        nstin: nstin.into(),
        name: name.into(),
        email: email.into(),
        phone: "08012345678".into(),
        password: "secret1".into(),
    }
}

fn xlsx(len: usize) -> Option<UploadedFile> {
    Some(UploadedFile::new("annual-return.xlsx", XLSX, vec![1u8; len]))
}

fn pdf(len: usize) -> Option<UploadedFile> {
    Some(UploadedFile::new("receipt.pdf", "application/pdf", vec![2u8; len]))
}

fn new_submission(
    user_id: &str,
    main_file: Option<UploadedFile>,
    supporting_doc: Option<UploadedFile>,
) -> NewSubmission {
    NewSubmission {
        user_id: user_id.to_string(),
        template_type: TemplateType::AnnualReturns,
        tax_period: "2024".into(),
        main_file,
        supporting_doc,
        comments: Some("first filing".into()),
    }
}

#[actix_web::test]
async fn create_stores_both_documents_and_starts_pending() {
    let mut h = Harness::new();
    let submission = h
        .lifecycle
        .create(new_submission(&h.citizen.id, xlsx(2 * MIB), pdf(MIB)))
        .await
        .unwrap();

    assert_eq!(submission.status, SubmissionStatus::Pending);
    assert!(submission.review.is_none());
    assert!(submission.main_file.is_complete());
    assert!(submission.supporting_doc.is_complete());
    assert!(submission.main_file.url.ends_with(".xlsx"));
    assert!(submission
        .supporting_doc
        .reference_id
        .starts_with("tax-submissions/receipt-"));
    assert_eq!(h.store_calls(), 2);

    let stored = h.lifecycle.get(&submission.id).unwrap();
    assert_eq!(stored.main_file, submission.main_file);
    assert_eq!(stored.comments.as_deref(), Some("first filing"));

    let mail = h.drain_mail();
    assert_eq!(mail.len(), 2);
    assert_eq!(mail[0].to, "ada@example.com");
    assert_eq!(mail[0].subject, "Tax Return Submission Received");
    assert_eq!(mail[1].to, "desk@example.com");
}

#[actix_web::test]
async fn missing_document_is_rejected_before_anything_is_stored() {
    let mut h = Harness::new();

    let no_main = h
        .lifecycle
        .create(new_submission(&h.citizen.id, None, pdf(10)))
        .await;
    let no_supporting = h
        .lifecycle
        .create(new_submission(&h.citizen.id, xlsx(10), None))
        .await;

    assert!(matches!(no_main, Err(ApiError::Validation(_))));
    assert!(matches!(no_supporting, Err(ApiError::Validation(_))));
    assert_eq!(h.store_calls(), 0);
    assert_eq!(h.total_submissions(), 0);
    assert!(h.drain_mail().is_empty());
}

#[actix_web::test]
async fn disallowed_content_type_stores_neither_document() {
    let h = Harness::new();

    let gif_support = Some(UploadedFile::new("scan.gif", "image/gif", vec![0u8; 10]));
    let result = h
        .lifecycle
        .create(new_submission(&h.citizen.id, xlsx(10), gif_support))
        .await;
    assert!(matches!(result, Err(ApiError::Validation(_))));

    let png_main = Some(UploadedFile::new("return.png", "image/png", vec![0u8; 10]));
    let result = h
        .lifecycle
        .create(new_submission(&h.citizen.id, png_main, pdf(10)))
        .await;
    assert!(matches!(result, Err(ApiError::Validation(_))));

    let png_support = Some(UploadedFile::new("scan.png", "image/png", vec![0u8; 10]));
    h.lifecycle
        .create(new_submission(&h.citizen.id, xlsx(10), png_support))
        .await
        .unwrap();

    assert_eq!(h.store_calls(), 2);
    assert_eq!(h.total_submissions(), 1);
}

#[actix_web::test]
async fn oversized_document_is_file_too_large() {
    let h = Harness::new();
    let big_pdf = Some(UploadedFile::new("return.pdf", "application/pdf", vec![0u8; 11 * MIB]));

    let result = h
        .lifecycle
        .create(new_submission(&h.citizen.id, big_pdf, pdf(10)))
        .await;

    assert!(matches!(result, Err(ApiError::FileTooLarge { limit }) if limit == 10 * MIB));
    assert_eq!(h.store_calls(), 0);
}

#[actix_web::test]
async fn blank_tax_period_is_rejected() {
    let h = Harness::new();
    let mut request = new_submission(&h.citizen.id, xlsx(10), pdf(10));
    request.tax_period = "   ".into();

    let result = h.lifecycle.create(request).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert_eq!(h.store_calls(), 0);
}

#[actix_web::test]
async fn unknown_user_is_not_found() {
    let h = Harness::new();
    let result = h
        .lifecycle
        .create(new_submission("no-such-user", xlsx(10), pdf(10)))
        .await;

    assert!(matches!(result, Err(ApiError::NotFound("User"))));
    assert_eq!(h.store_calls(), 0);
}

#[actix_web::test]
async fn failed_second_store_leaves_no_record() {
    let mut h = Harness::with_failing_store_call(Some(2));
    let result = h
        .lifecycle
        .create(new_submission(&h.citizen.id, xlsx(10), pdf(10)))
        .await;

    assert!(matches!(result, Err(ApiError::Internal(_))));
    assert_eq!(h.total_submissions(), 0);
    assert!(h.drain_mail().is_empty());
}

#[actix_web::test]
async fn approve_records_the_review_and_notifies_the_owner() {
    let mut h = Harness::new();
    let submission = h.file(&h.citizen.id.clone()).await;
    h.drain_mail();

    let approved = h
        .lifecycle
        .approve(&submission.id, &h.admin.id, Some("looks good".into()))
        .unwrap();

    assert_eq!(approved.status, SubmissionStatus::Approved);
    let review = approved.review.clone().unwrap();
    assert_eq!(review.reviewed_by, h.admin.id);
    assert_eq!(review.review_comments, "looks good");

    let stored = h.lifecycle.get(&submission.id).unwrap();
    assert_eq!(stored.status, SubmissionStatus::Approved);
    let stored_review = stored.review.unwrap();
    assert_eq!(stored_review.reviewed_by, h.admin.id);
    assert_eq!(stored_review.review_comments, "looks good");

    let mail = h.drain_mail();
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].to, "ada@example.com");
    assert_eq!(mail[0].subject, "Tax Return Submission Approved");
}

#[actix_web::test]
async fn approve_without_comments_stores_an_empty_comment() {
    let h = Harness::new();
    let submission = h.file(&h.citizen.id).await;

    let approved = h
        .lifecycle
        .approve(&submission.id, &h.admin.id, None)
        .unwrap();
    assert_eq!(approved.review.unwrap().review_comments, "");
}

#[actix_web::test]
async fn decided_submissions_cannot_be_reviewed_again() {
    let mut h = Harness::new();
    let submission = h.file(&h.citizen.id).await;
    h.lifecycle
        .approve(&submission.id, &h.admin.id, Some("ok".into()))
        .unwrap();
    h.drain_mail();

    let again = h
        .lifecycle
        .approve(&submission.id, &h.admin.id, Some("ok again".into()));
    let flip = h
        .lifecycle
        .reject(&submission.id, &h.admin.id, Some("changed my mind".into()));

    assert!(matches!(again, Err(ApiError::Conflict(_))));
    assert!(matches!(flip, Err(ApiError::Conflict(_))));
    let stored = h.lifecycle.get(&submission.id).unwrap();
    assert_eq!(stored.status, SubmissionStatus::Approved);
    assert_eq!(stored.review.unwrap().review_comments, "ok");
    assert!(h.drain_mail().is_empty());
}

#[actix_web::test]
async fn review_update_only_applies_to_pending_rows() {
    let h = Harness::new();
    let submission = h.file(&h.citizen.id).await;
    let review = |by: &str, comments: &str| Review {
        reviewed_at: Utc::now(),
        reviewed_by: by.to_string(),
        review_comments: comments.to_string(),
    };
    let first = review(&h.admin.id, "approved first");
    let second = review("someone-else", "rejected second");

    let changed = h
        .db
        .call(|conn| {
            let approved = db::submissions::record_review(
                conn,
                &submission.id,
                SubmissionStatus::Approved,
                &first,
            )?;
            let rejected = db::submissions::record_review(
                conn,
                &submission.id,
                SubmissionStatus::Rejected,
                &second,
            )?;
            Ok((approved, rejected))
        })
        .unwrap();

    assert_eq!(changed, (1, 0));
    let stored = h.lifecycle.get(&submission.id).unwrap();
    assert_eq!(stored.status, SubmissionStatus::Approved);
    let kept = stored.review.unwrap();
    assert_eq!(kept.reviewed_by, h.admin.id);
    assert_eq!(kept.review_comments, "approved first");
}

#[actix_web::test]
async fn concurrent_reviews_yield_a_single_decision() {
    let mut h = Harness::new();
    let submission = h.file(&h.citizen.id).await;
    h.drain_mail();

    const REVIEWERS: usize = 8;
    let barrier = Barrier::new(REVIEWERS);
    let outcomes: Vec<Result<Submission, ApiError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..REVIEWERS)
            .map(|i| {
                let (lifecycle, barrier, id, admin) =
                    (&h.lifecycle, &barrier, &submission.id, &h.admin.id);
                scope.spawn(move || {
                    barrier.wait();
                    if i % 2 == 0 {
                        lifecycle.approve(id, admin, Some(format!("approve {i}")))
                    } else {
                        lifecycle.reject(id, admin, Some(format!("reject {i}")))
                    }
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let winners: Vec<&Submission> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(outcomes
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(ApiError::Conflict(_)))));

    let stored = h.lifecycle.get(&submission.id).unwrap();
    assert_eq!(stored.status, winners[0].status);
    assert_eq!(
        stored.review.unwrap().review_comments,
        winners[0].review.as_ref().unwrap().review_comments
    );
    assert_eq!(h.drain_mail().len(), 1);
}

#[actix_web::test]
async fn reject_requires_comments_and_leaves_submission_pending() {
    let mut h = Harness::new();
    let submission = h.file(&h.citizen.id).await;
    h.drain_mail();

    let empty = h
        .lifecycle
        .reject(&submission.id, &h.admin.id, Some("".into()));
    let absent = h.lifecycle.reject(&submission.id, &h.admin.id, None);

    assert!(matches!(empty, Err(ApiError::Validation(_))));
    assert!(matches!(absent, Err(ApiError::Validation(_))));
    let stored = h.lifecycle.get(&submission.id).unwrap();
    assert_eq!(stored.status, SubmissionStatus::Pending);
    assert!(stored.review.is_none());
    assert!(h.drain_mail().is_empty());
}

#[actix_web::test]
async fn reject_with_comments_sends_the_decline_notice() {
    let mut h = Harness::new();
    let submission = h.file(&h.citizen.id).await;
    h.drain_mail();

    let rejected = h
        .lifecycle
        .reject(&submission.id, &h.admin.id, Some("missing schedule B".into()))
        .unwrap();

    assert_eq!(rejected.status, SubmissionStatus::Rejected);
    assert_eq!(rejected.review.unwrap().review_comments, "missing schedule B");
    let mail = h.drain_mail();
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].subject, "Tax Return Submission Declined");
    assert!(mail[0].body_html.contains("missing schedule B"));
}

#[actix_web::test]
async fn reviewing_an_unknown_submission_is_not_found() {
    let h = Harness::new();
    assert!(matches!(
        h.lifecycle.approve("nope", &h.admin.id, None),
        Err(ApiError::NotFound("Submission"))
    ));
    assert!(matches!(
        h.lifecycle.reject("nope", &h.admin.id, Some("x".into())),
        Err(ApiError::NotFound("Submission"))
    ));
}

#[actix_web::test]
async fn decision_stands_when_the_owner_is_gone() {
    let mut h = Harness::new();
    let submission = h.file(&h.citizen.id).await;
    h.drain_mail();
    h.accounts.delete(&h.citizen.id).unwrap();

    let approved = h
        .lifecycle
        .approve(&submission.id, &h.admin.id, None)
        .unwrap();
    assert_eq!(approved.status, SubmissionStatus::Approved);
    assert!(h.drain_mail().is_empty());
}

#[actix_web::test]
async fn recent_lists_own_submissions_newest_first() {
    let h = Harness::new();
    let other = h
        .accounts
        .enroll(enroll("2222222222", "Bola Ade", "bola@example.com"))
        .unwrap();

    let mut mine = Vec::new();
    for _ in 0..6 {
        mine.push(h.file(&h.citizen.id).await.id);
    }
    h.file(&other.id).await;

    let recent = h.lifecycle.list_recent(&h.citizen.id, RECENT_LIMIT).unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].id, mine[5]);
    assert!(recent.iter().all(|s| s.user_id == h.citizen.id));
}

#[actix_web::test]
async fn admin_list_filters_by_status_and_owner() {
    let h = Harness::new();
    let other = h
        .accounts
        .enroll(enroll("2222222222", "Bola Ade", "bola@example.com"))
        .unwrap();

    let first = h.file(&h.citizen.id).await;
    h.file(&h.citizen.id).await;
    h.file(&h.citizen.id).await;
    h.file(&other.id).await;
    h.lifecycle
        .approve(&first.id, &h.admin.id, None)
        .unwrap();

    let pending = h
        .lifecycle
        .admin_list(
            &SubmissionFilter {
                status: Some(SubmissionStatus::Pending),
                search: None,
            },
            1,
            ADMIN_PAGE_SIZE,
        )
        .unwrap();
    assert_eq!(pending.total, 3);

    let bola = h
        .lifecycle
        .admin_list(
            &SubmissionFilter {
                status: None,
                search: Some("BOLA".into()),
            },
            1,
            ADMIN_PAGE_SIZE,
        )
        .unwrap();
    assert_eq!(bola.total, 1);
    let owner = bola.items[0].owner.as_ref().unwrap();
    assert_eq!(owner.nstin, "2222222222");

    let by_nstin = h
        .lifecycle
        .admin_list(
            &SubmissionFilter {
                status: Some(SubmissionStatus::Approved),
                search: Some("12345".into()),
            },
            1,
            ADMIN_PAGE_SIZE,
        )
        .unwrap();
    assert_eq!(by_nstin.total, 1);
    assert_eq!(by_nstin.items[0].submission.id, first.id);

    let paged = h
        .lifecycle
        .admin_list(&SubmissionFilter::default(), 2, 3)
        .unwrap();
    assert_eq!(paged.total, 4);
    assert_eq!(paged.total_pages, 2);
    assert_eq!(paged.current_page, 2);
    assert_eq!(paged.items.len(), 1);

    assert_eq!(h.lifecycle.count_pending().unwrap(), 3);
}

#[actix_web::test]
async fn admin_search_matches_accented_names_in_any_case() {
    let h = Harness::new();
    let emile = h
        .accounts
        .enroll(enroll("3333333333", "Émile Ôkafor", "emile@example.com"))
        .unwrap();
    let filed = h.file(&emile.id).await;
    h.file(&h.citizen.id).await;

    for term in ["Émile", "émile", "ÉMILE", "ôkafor"] {
        let found = h
            .lifecycle
            .admin_list(
                &SubmissionFilter {
                    status: None,
                    search: Some(term.into()),
                },
                1,
                ADMIN_PAGE_SIZE,
            )
            .unwrap();
        assert_eq!(found.total, 1, "{term}");
        assert_eq!(found.items[0].submission.id, filed.id);
    }
}
