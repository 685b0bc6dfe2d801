use crate::domain::{group_events_by_day, Payment, SponsorshipAction, SponsorshipEvent, Tier};
use chrono::NaiveDate;

use super::{ReconstructionError, ShortMonthPolicy, SubscriptionSchedule};

/// Replays a sponsor's activity log one calendar day at a time and
/// accumulates the payments the platform would have charged.
pub struct PaymentReconstructor {
    pub schedule: SubscriptionSchedule,
    policy: ShortMonthPolicy,

    // Outputs accumulated during processing.
    payments: Vec<Payment>,
}

impl PaymentReconstructor {
    pub fn new(policy: ShortMonthPolicy) -> Self {
        Self {
            schedule: SubscriptionSchedule::new(),
            policy,
            payments: Vec::new(),
        }
    }

    /// Process every event of `day` against the schedule.
    ///
    /// Same-day ordering is part of the billing model and runs in three phases:
    /// 1. removals and adjustments, in log order
    /// 2. the scheduled recurring charge, if `day` is the billing day
    /// 3. new subscriptions, in log order
    ///
    /// A subscription started today is therefore not charged twice today, and
    /// one cancelled today is not charged on its billing day.
    pub fn process_day(
        &mut self,
        day: NaiveDate,
        events: &[&SponsorshipEvent],
    ) -> Result<(), ReconstructionError> {
        for event in events {
            self.apply_removal_or_adjustment(day, event)?;
        }

        self.charge_scheduled(day);

        for event in events {
            self.apply_addition(day, event)?;
        }

        Ok(())
    }

    fn apply_removal_or_adjustment(
        &mut self,
        day: NaiveDate,
        event: &SponsorshipEvent,
    ) -> Result<(), ReconstructionError> {
        let login = &event.recipient_login;
        match event.action {
            SponsorshipAction::CancelledSubscription => self.remove(day, event),
            // A pending change shows up later as its own concrete event.
            SponsorshipAction::PendingChange => Ok(()),
            // No known monetary effect.
            SponsorshipAction::MatchDisabled => Ok(()),
            SponsorshipAction::TierChange => {
                let tier = required_tier(day, event)?;
                if tier.is_one_time {
                    // Moving to a one-time tier is a final charge that ends
                    // the recurring relationship.
                    self.emit(day, event, tier.monthly_price_in_cents);
                    self.remove(day, event)
                } else if self.schedule.change_amount(login, tier.monthly_price_in_cents) {
                    Ok(())
                } else {
                    Err(ReconstructionError::inconsistent(day, event))
                }
            }
            SponsorshipAction::Refund => {
                let tier = required_tier(day, event)?;
                self.emit(day, event, -tier.monthly_price_in_cents);
                Ok(())
            }
            SponsorshipAction::NewSubscription => Ok(()),
        }
    }

    fn charge_scheduled(&mut self, day: NaiveDate) {
        if !self.schedule.is_billing_day(day, self.policy) {
            return;
        }
        let charges: Vec<Payment> = self
            .schedule
            .active()
            .map(|(login, amount)| Payment::new(day, login.clone(), amount))
            .collect();
        self.payments.extend(charges);
    }

    fn apply_addition(
        &mut self,
        day: NaiveDate,
        event: &SponsorshipEvent,
    ) -> Result<(), ReconstructionError> {
        match event.action {
            SponsorshipAction::NewSubscription => {
                let tier = required_tier(day, event)?;
                // The first charge happens at signup whatever the tier kind.
                self.emit(day, event, tier.monthly_price_in_cents);
                if !tier.is_one_time {
                    self.schedule.subscribe(
                        event.recipient_login.clone(),
                        tier.monthly_price_in_cents,
                        day,
                    );
                }
                Ok(())
            }
            SponsorshipAction::CancelledSubscription
            | SponsorshipAction::PendingChange
            | SponsorshipAction::MatchDisabled
            | SponsorshipAction::TierChange
            | SponsorshipAction::Refund => Ok(()),
        }
    }

    fn remove(&mut self, day: NaiveDate, event: &SponsorshipEvent) -> Result<(), ReconstructionError> {
        if self.schedule.remove(&event.recipient_login) {
            Ok(())
        } else {
            Err(ReconstructionError::inconsistent(day, event))
        }
    }

    fn emit(&mut self, day: NaiveDate, event: &SponsorshipEvent, amount_in_cents: i64) {
        self.payments
            .push(Payment::new(day, event.recipient_login.clone(), amount_in_cents));
    }

    /// Payments emitted so far.
    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// Get the accumulated payments.
    pub fn into_payments(self) -> Vec<Payment> {
        self.payments
    }
}

impl Default for PaymentReconstructor {
    fn default() -> Self {
        Self::new(ShortMonthPolicy::default())
    }
}

fn required_tier(day: NaiveDate, event: &SponsorshipEvent) -> Result<Tier, ReconstructionError> {
    let tier = event
        .tier
        .ok_or_else(|| ReconstructionError::malformed(day, event, "missing tier"))?;
    if tier.monthly_price_in_cents < 0 {
        return Err(ReconstructionError::malformed(day, event, "negative tier price"));
    }
    Ok(tier)
}

/// Reconstruct the payments of one sponsor for every day in `start..=end`.
///
/// `events` may span more days than the range; events outside it are ignored.
/// Any malformed or inconsistent event aborts the whole run.
pub fn reconstruct_payments(
    events: &[SponsorshipEvent],
    start: NaiveDate,
    end: NaiveDate,
    policy: ShortMonthPolicy,
) -> Result<Vec<Payment>, ReconstructionError> {
    if end < start {
        return Err(ReconstructionError::InvalidRange { start, end });
    }

    let buckets = group_events_by_day(events)?;
    let mut reconstructor = PaymentReconstructor::new(policy);

    for day in start.iter_days().take_while(|d| *d <= end) {
        reconstructor.process_day(day, buckets.events_on(day))?;
    }

    tracing::debug!(
        start = %start,
        end = %end,
        events = events.len(),
        event_days = buckets.len(),
        active = reconstructor.schedule.len(),
        payments = reconstructor.payments().len(),
        "Reconstruction finished"
    );

    Ok(reconstructor.into_payments())
}
