use crate::domain::{days_in_month, Login};
use chrono::{Datelike, NaiveDate};

/// How a billing anchor behaves in months that are shorter than it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortMonthPolicy {
    /// Charge only when the day-of-month equals the anchor exactly. An anchor
    /// of 31 produces no charge in 30-day months.
    #[default]
    Skip,
    /// Charge on the last day of a month that has no anchor day.
    ClampToMonthEnd,
}

impl ShortMonthPolicy {
    /// Whether a charge anchored on `anchor` falls on `day`.
    pub fn is_billing_day(&self, anchor: u32, day: NaiveDate) -> bool {
        match self {
            ShortMonthPolicy::Skip => day.day() == anchor,
            ShortMonthPolicy::ClampToMonthEnd => day.day() == anchor.min(days_in_month(day)),
        }
    }
}

/// Recurring subscriptions of one sponsor and their shared billing anchor.
///
/// All recurring charges of a sponsor are batched onto a single day-of-month:
/// the day the first recurring subscription started. Later subscriptions do
/// not get their own anchor; they are charged on that same day. The anchor is
/// only released once no recurring subscription remains.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionSchedule {
    /// (login, monthly amount in cents), in insertion order.
    active: Vec<(Login, i64)>,
    /// Unset exactly when `active` is empty.
    billing_day_of_month: Option<u32>,
}

impl SubscriptionSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn billing_day_of_month(&self) -> Option<u32> {
        self.billing_day_of_month
    }

    /// Active recurring subscriptions in insertion order.
    pub fn active(&self) -> impl Iterator<Item = (&Login, i64)> + '_ {
        self.active.iter().map(|(login, amount)| (login, *amount))
    }

    /// Start (or re-price) a recurring subscription that began on `day`.
    ///
    /// Anchors the billing day to `day` if no anchor is set yet.
    pub fn subscribe(&mut self, login: Login, amount_in_cents: i64, day: NaiveDate) {
        match self.active.iter_mut().find(|(l, _)| *l == login) {
            Some(entry) => entry.1 = amount_in_cents,
            None => self.active.push((login, amount_in_cents)),
        }
        if self.billing_day_of_month.is_none() {
            self.billing_day_of_month = Some(day.day());
        }
    }

    /// Change the amount of an existing subscription without moving the anchor.
    ///
    /// Returns false if `login` has no active subscription.
    pub fn change_amount(&mut self, login: &Login, amount_in_cents: i64) -> bool {
        match self.active.iter_mut().find(|(l, _)| l == login) {
            Some(entry) => {
                entry.1 = amount_in_cents;
                true
            }
            None => false,
        }
    }

    /// Remove a subscription, releasing the anchor when none remain.
    ///
    /// Returns false if `login` has no active subscription.
    pub fn remove(&mut self, login: &Login) -> bool {
        let Some(pos) = self.active.iter().position(|(l, _)| l == login) else {
            return false;
        };
        self.active.remove(pos);
        if self.active.is_empty() {
            self.billing_day_of_month = None;
        }
        true
    }

    /// Whether the shared recurring charge falls on `day`.
    pub fn is_billing_day(&self, day: NaiveDate, policy: ShortMonthPolicy) -> bool {
        self.billing_day_of_month
            .is_some_and(|anchor| policy.is_billing_day(anchor, day))
    }
}
