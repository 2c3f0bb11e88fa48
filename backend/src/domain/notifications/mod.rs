//! Periodic irrigation digests.
//!
//! Each run checks every recipient's cadence against today's date. A due
//! recipient receives one digest about their own fields and one separate
//! digest per supervised account. Only serviceable fields are reported, and
//! a digest is withheld entirely if any of its fields lacks results. Lookup
//! failures are logged and counted; they never abort the rest of the run.

mod cadence;

pub use cadence::{Cadence, UnknownCadence};

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::ports::{
    CalculationResultsStore, DigestSender, FieldRepository, NotificationDirectory,
};
use crate::domain::{
    CalculationResults, DailyRecommendation, EmailLanguage, DomainError, FieldId, Recipient, User,
};

/// Digest entry for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDigest {
    pub field_id: FieldId,
    pub name: String,
    pub needs_irrigation: bool,
    pub recommended_days: Vec<DailyRecommendation>,
    pub results: CalculationResults,
}

/// One notification about the fields of `owner`, addressed to a recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationDigest {
    pub owner: User,
    pub language: EmailLanguage,
    pub generated_at: DateTime<Utc>,
    pub fields: Vec<FieldDigest>,
}

impl IrrigationDigest {
    pub fn subject(&self) -> String {
        format!("Irrigation status for user {}", self.owner)
    }
}

/// Counters describing one notification run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationRunReport {
    pub due_recipients: usize,
    pub sent: usize,
    /// Digests with no serviceable field.
    pub empty: usize,
    /// Digests withheld because a field had no results.
    pub missing_results: usize,
    /// Digests or supervisee lists that could not be read from storage.
    pub lookup_failures: usize,
    pub failed_deliveries: usize,
}

enum DigestOutcome {
    Sent,
    Empty,
    MissingResults,
    LookupFailed,
    DeliveryFailed,
}

/// Builds and sends digests for due recipients.
#[derive(Clone)]
pub struct NotificationService {
    directory: Arc<dyn NotificationDirectory>,
    fields: Arc<dyn FieldRepository>,
    results: Arc<dyn CalculationResultsStore>,
    sender: Arc<dyn DigestSender>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(
        directory: Arc<dyn NotificationDirectory>,
        fields: Arc<dyn FieldRepository>,
        results: Arc<dyn CalculationResultsStore>,
        sender: Arc<dyn DigestSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            fields,
            results,
            sender,
            clock,
        }
    }

    /// Run for the current UTC date.
    pub async fn run_today(&self) -> Result<NotificationRunReport, DomainError> {
        self.run(self.clock.utc().date_naive()).await
    }

    pub async fn run(&self, today: NaiveDate) -> Result<NotificationRunReport, DomainError> {
        let mut report = NotificationRunReport::default();
        for recipient in self.directory.list_recipients().await? {
            let due = recipient
                .profile
                .notification
                .is_some_and(|cadence| cadence.is_due(today));
            if !due {
                continue;
            }
            report.due_recipients += 1;

            let own = self.notify(&recipient, &recipient.user).await;
            report.record(own);

            let supervisees = match self.directory.list_supervisees(&recipient.user.id).await {
                Ok(supervisees) => supervisees,
                Err(err) => {
                    error!(
                        user_id = %recipient.user.id,
                        error = %err,
                        "could not list supervised accounts; skipping their digests"
                    );
                    report.lookup_failures += 1;
                    continue;
                }
            };
            for supervisee in supervisees {
                let outcome = self.notify(&recipient, &supervisee.user).await;
                report.record(outcome);
            }
        }
        info!(
            %today,
            due = report.due_recipients,
            sent = report.sent,
            missing_results = report.missing_results,
            lookup_failures = report.lookup_failures,
            failed = report.failed_deliveries,
            "notification run finished"
        );
        Ok(report)
    }

    async fn notify(&self, recipient: &Recipient, owner: &User) -> DigestOutcome {
        let fields = match self.fields.list_by_owner(&owner.id).await {
            Ok(fields) => fields,
            Err(err) => {
                error!(user_id = %owner.id, error = %err, "could not list fields for digest");
                return DigestOutcome::LookupFailed;
            }
        };

        let mut entries = Vec::new();
        for field in fields.into_iter().filter(|f| f.is_serviceable()) {
            let results = match self.results.get(&field.id).await {
                Ok(Some(results)) => results,
                Ok(None) => {
                    error!(
                        field_id = %field.id,
                        recipient = %recipient.user,
                        owner = %owner,
                        "Internal error: no results for field {} of user {}; omitting notification",
                        field.name,
                        owner
                    );
                    return DigestOutcome::MissingResults;
                }
                Err(err) => {
                    error!(field_id = %field.id, error = %err, "could not read results for digest");
                    return DigestOutcome::LookupFailed;
                }
            };
            entries.push(FieldDigest {
                field_id: field.id,
                name: field.name,
                needs_irrigation: results.needs_irrigation(),
                recommended_days: results.recommended_days(),
                results,
            });
        }
        if entries.is_empty() {
            return DigestOutcome::Empty;
        }

        let digest = IrrigationDigest {
            owner: owner.clone(),
            language: recipient.profile.email_language,
            generated_at: self.clock.utc(),
            fields: entries,
        };
        match self.sender.send(&recipient.user, &digest).await {
            Ok(()) => {
                info!(
                    recipient = %recipient.user,
                    owner = %owner,
                    fields = digest.fields.len(),
                    "Notifying user {} about the fields of user {}",
                    recipient.user,
                    owner
                );
                DigestOutcome::Sent
            }
            Err(err) => {
                warn!(recipient = %recipient.user, owner = %owner, error = %err, "digest delivery failed");
                DigestOutcome::DeliveryFailed
            }
        }
    }
}

impl NotificationRunReport {
    fn record(&mut self, outcome: DigestOutcome) {
        match outcome {
            DigestOutcome::Sent => self.sent += 1,
            DigestOutcome::Empty => self.empty += 1,
            DigestOutcome::MissingResults => self.missing_results += 1,
            DigestOutcome::LookupFailed => self.lookup_failures += 1,
            DigestOutcome::DeliveryFailed => self.failed_deliveries += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::field::fixtures::field;
    use crate::domain::ports::{
        DigestSenderError, FieldRepositoryError, MockCalculationResultsStore, MockDigestSender,
        MockFieldRepository, MockNotificationDirectory, NotificationDirectoryError,
    };
    use crate::domain::{Profile, UserId};
    use chrono::TimeZone;
    use mockable::MockClock;

    fn recipient(name: &str, cadence: Option<Cadence>) -> Recipient {
        let id = UserId::random();
        let mut profile = Profile::new_default(id);
        profile.notification = cadence;
        Recipient {
            user: User {
                id,
                username: name.to_owned(),
                email: format!("{name}@example.org"),
            },
            profile,
        }
    }

    fn results() -> CalculationResults {
        CalculationResults {
            raw: 10.0,
            taw: 20.0,
            forecast_start_date: NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid date"),
            days: Vec::new(),
            computed_at: Utc::now(),
        }
    }

    fn clock() -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_utc().returning(|| {
            Utc.with_ymd_and_hms(2024, 7, 1, 5, 0, 0)
                .single()
                .expect("valid time")
        });
        clock
    }

    fn service(
        directory: MockNotificationDirectory,
        fields: MockFieldRepository,
        results: MockCalculationResultsStore,
        sender: MockDigestSender,
    ) -> NotificationService {
        NotificationService::new(
            Arc::new(directory),
            Arc::new(fields),
            Arc::new(results),
            Arc::new(sender),
            Arc::new(clock()),
        )
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid date")
    }

    #[tokio::test]
    async fn recipients_not_due_are_skipped() {
        let mut directory = MockNotificationDirectory::new();
        let never = recipient("never", None);
        let monthly = recipient("monthly", Some(Cadence::Monthly));
        directory
            .expect_list_recipients()
            .return_once(move || Ok(vec![never, monthly]));
        directory.expect_list_supervisees().never();
        let mut sender = MockDigestSender::new();
        sender.expect_send().never();

        let tuesday = monday().succ_opt().expect("next day");
        let report = service(
            directory,
            MockFieldRepository::new(),
            MockCalculationResultsStore::new(),
            sender,
        )
        .run(tuesday)
        .await
        .expect("run");

        assert_eq!(report, NotificationRunReport::default());
    }

    #[tokio::test]
    async fn supervisor_gets_separate_digest_per_supervisee() {
        let boss = recipient("boss", Some(Cadence::Weekly));
        let worker = recipient("worker", Some(Cadence::Monthly));
        let boss_id = boss.user.id;
        let worker_id = worker.user.id;
        let mut directory = MockNotificationDirectory::new();
        directory
            .expect_list_recipients()
            .return_once(move || Ok(vec![boss]));
        directory
            .expect_list_supervisees()
            .return_once(move |_| Ok(vec![worker]));

        let mut fields = MockFieldRepository::new();
        fields.expect_list_by_owner().times(2).returning(|owner| {
            let mut f = field();
            f.owner = *owner;
            Ok(vec![f])
        });
        let mut store = MockCalculationResultsStore::new();
        store.expect_get().returning(|_| Ok(Some(results())));
        let mut sender = MockDigestSender::new();
        sender
            .expect_send()
            .times(2)
            .withf(move |to, digest| {
                to.id == boss_id
                    && digest.fields.len() == 1
                    && (digest.owner.id == boss_id || digest.owner.id == worker_id)
            })
            .returning(|_, _| Ok(()));

        let report = service(directory, fields, store, sender)
            .run(monday())
            .await
            .expect("run");

        assert_eq!(report.due_recipients, 1);
        assert_eq!(report.sent, 2);
    }

    #[tokio::test]
    async fn missing_results_withhold_the_digest() {
        let user = recipient("grower", Some(Cadence::Daily));
        let mut directory = MockNotificationDirectory::new();
        directory
            .expect_list_recipients()
            .return_once(move || Ok(vec![user]));
        directory
            .expect_list_supervisees()
            .return_once(|_| Ok(Vec::new()));
        let mut fields = MockFieldRepository::new();
        fields
            .expect_list_by_owner()
            .return_once(|_| Ok(vec![field(), field()]));
        let mut store = MockCalculationResultsStore::new();
        let mut calls = 0;
        store.expect_get().returning(move |_| {
            calls += 1;
            Ok((calls == 1).then(results))
        });
        let mut sender = MockDigestSender::new();
        sender.expect_send().never();

        let report = service(directory, fields, store, sender)
            .run(monday())
            .await
            .expect("run");

        assert_eq!(report.missing_results, 1);
        assert_eq!(report.sent, 0);
    }

    #[tokio::test]
    async fn uncovered_fields_never_produce_a_digest() {
        let user = recipient("grower", Some(Cadence::Daily));
        let mut directory = MockNotificationDirectory::new();
        directory
            .expect_list_recipients()
            .return_once(move || Ok(vec![user]));
        directory
            .expect_list_supervisees()
            .return_once(|_| Ok(Vec::new()));
        let mut fields = MockFieldRepository::new();
        fields.expect_list_by_owner().return_once(|_| {
            let mut f = field();
            f.in_covered_area = false;
            Ok(vec![f])
        });
        let mut store = MockCalculationResultsStore::new();
        store.expect_get().never();
        let mut sender = MockDigestSender::new();
        sender.expect_send().never();

        let report = service(directory, fields, store, sender)
            .run(monday())
            .await
            .expect("run");

        assert_eq!(report.empty, 1);
    }

    #[tokio::test]
    async fn delivery_failure_does_not_stop_the_run() {
        let first = recipient("first", Some(Cadence::Daily));
        let second = recipient("second", Some(Cadence::Daily));
        let mut directory = MockNotificationDirectory::new();
        directory
            .expect_list_recipients()
            .return_once(move || Ok(vec![first, second]));
        directory
            .expect_list_supervisees()
            .returning(|_| Ok(Vec::new()));
        let mut fields = MockFieldRepository::new();
        fields.expect_list_by_owner().returning(|_| Ok(vec![field()]));
        let mut store = MockCalculationResultsStore::new();
        store.expect_get().returning(|_| Ok(Some(results())));
        let mut sender = MockDigestSender::new();
        let mut attempts = 0;
        sender.expect_send().times(2).returning(move |_, _| {
            attempts += 1;
            if attempts == 1 {
                Err(DigestSenderError::delivery("smtp refused"))
            } else {
                Ok(())
            }
        });

        let report = service(directory, fields, store, sender)
            .run(monday())
            .await
            .expect("run");

        assert_eq!(report.failed_deliveries, 1);
        assert_eq!(report.sent, 1);
    }

    #[tokio::test]
    async fn supervisee_lookup_failure_does_not_stop_the_run() {
        let first = recipient("first", Some(Cadence::Daily));
        let second = recipient("second", Some(Cadence::Daily));
        let first_id = first.user.id;
        let mut directory = MockNotificationDirectory::new();
        directory
            .expect_list_recipients()
            .return_once(move || Ok(vec![first, second]));
        directory.expect_list_supervisees().returning(move |id| {
            if *id == first_id {
                Err(NotificationDirectoryError::connection("directory offline"))
            } else {
                Ok(Vec::new())
            }
        });
        let mut fields = MockFieldRepository::new();
        fields.expect_list_by_owner().returning(|_| Ok(vec![field()]));
        let mut store = MockCalculationResultsStore::new();
        store.expect_get().returning(|_| Ok(Some(results())));
        let mut sender = MockDigestSender::new();
        sender.expect_send().times(2).returning(|_, _| Ok(()));

        let report = service(directory, fields, store, sender)
            .run(monday())
            .await
            .expect("run");

        assert_eq!(report.due_recipients, 2);
        assert_eq!(report.sent, 2);
        assert_eq!(report.lookup_failures, 1);
    }

    #[tokio::test]
    async fn field_lookup_failure_is_not_missing_results() {
        let user = recipient("grower", Some(Cadence::Daily));
        let mut directory = MockNotificationDirectory::new();
        directory
            .expect_list_recipients()
            .return_once(move || Ok(vec![user]));
        directory
            .expect_list_supervisees()
            .return_once(|_| Ok(Vec::new()));
        let mut fields = MockFieldRepository::new();
        fields
            .expect_list_by_owner()
            .return_once(|_| Err(FieldRepositoryError::query("relation missing")));
        let mut sender = MockDigestSender::new();
        sender.expect_send().never();

        let report = service(directory, fields, MockCalculationResultsStore::new(), sender)
            .run(monday())
            .await
            .expect("run");

        assert_eq!(report.lookup_failures, 1);
        assert_eq!(report.missing_results, 0);
    }

    #[test]
    fn subject_names_the_owner() {
        let owner = recipient("alice", None).user;
        let digest = IrrigationDigest {
            owner,
            language: EmailLanguage::En,
            generated_at: Utc::now(),
            fields: Vec::new(),
        };
        assert_eq!(digest.subject(), "Irrigation status for user alice");
    }
}
