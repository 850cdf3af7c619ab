//! Works through the configured slots for a day and books each one.

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use lr_calendar::CalendarStore;
use lr_core::time::{immediate_window, portal_now, target_date};
use lr_core::{
    Booker, BookingOutcome, BookingRequest, CalendarEvent, ResourceCatalog, Schedule,
    ScheduleReport, SlotAttempt, SlotOutcome, SlotReport, TimeSlot,
};

use crate::config::BookingConfig;

/// Drives one booking run.
///
/// Slots are handled in configured order and resources in preference order.
/// A slot stops at the first confirmed resource; every confirmation is
/// written to the calendar file before the next request is sent.
pub struct ReservationScheduler<'a, B> {
    booker: &'a B,
    calendar: &'a mut CalendarStore,
    schedule: &'a Schedule,
    resources: &'a ResourceCatalog,
    settings: &'a BookingConfig,
}

impl<'a, B: Booker> ReservationScheduler<'a, B> {
    pub const fn new(
        booker: &'a B,
        calendar: &'a mut CalendarStore,
        schedule: &'a Schedule,
        resources: &'a ResourceCatalog,
        settings: &'a BookingConfig,
    ) -> Self {
        Self {
            booker,
            calendar,
            schedule,
            resources,
            settings,
        }
    }

    /// Books the slots of the day `day_offset` days from today.
    pub fn run(&mut self, day_offset: i64) -> Result<ScheduleReport> {
        let today = portal_now().date();
        let date = target_date(today, day_offset)
            .with_context(|| format!("day offset {day_offset} is out of range"))?;
        Ok(self.run_for(date))
    }

    /// Books every slot configured for `date`'s weekday.
    pub fn run_for(&mut self, date: NaiveDate) -> ScheduleReport {
        let mut report = ScheduleReport::new(date);
        let schedule = self.schedule;
        let slots = schedule.slots_for(date.weekday());
        tracing::info!(%date, slots = slots.len(), "starting booking run");

        for slot in slots {
            let outcome = self.book_slot(date, *slot);
            report.slots.push(SlotReport {
                slot: *slot,
                outcome,
            });
        }

        tracing::info!(
            %date,
            booked = report.booked_count(),
            unbooked = report.unbooked_count(),
            "booking run finished"
        );
        report
    }

    fn book_slot(&mut self, date: NaiveDate, slot: TimeSlot) -> SlotOutcome {
        if self.settings.skip_booked_slots {
            if let Some(existing) = self.calendar.booking_for_slot(date, &slot) {
                tracing::info!(%date, %slot, location = %existing.location, "slot already booked");
                return SlotOutcome::AlreadyBooked {
                    location: existing.location.clone(),
                };
            }
        }

        let resources = self.resources;
        let mut attempts = Vec::new();
        for (resource, resource_id) in resources.candidates() {
            let request = BookingRequest {
                date,
                slot,
                resource: resource.clone(),
                resource_id,
            };
            let outcome = self.booker.attempt(&request);
            let confirmed = outcome.is_confirmed();
            attempts.push(SlotAttempt {
                resource: resource.clone(),
                outcome,
            });
            if confirmed {
                self.record(&request);
                return SlotOutcome::Booked {
                    resource: resource.clone(),
                    attempts,
                };
            }
        }

        tracing::warn!(%date, %slot, tried = attempts.len(), "no resource available for slot");
        SlotOutcome::Unbooked { attempts }
    }

    /// Books the configured immediate resource starting right now.
    pub fn run_now(&mut self) -> Result<(BookingRequest, BookingOutcome)> {
        self.run_now_at(portal_now())
    }

    /// Makes a single immediate booking attempt relative to `now`.
    ///
    /// There is no fallback to other resources.
    pub fn run_now_at(&mut self, now: NaiveDateTime) -> Result<(BookingRequest, BookingOutcome)> {
        let (date, slot) = immediate_window(
            now,
            Duration::minutes(self.settings.immediate_lead_minutes),
            Duration::minutes(self.settings.immediate_minutes),
        )
        .context("cannot place an immediate booking now")?;
        let resource = self.settings.immediate_resource.clone();
        let resource_id = self
            .resources
            .resolve(&resource)
            .context("invalid booking.immediate_resource")?;

        let request = BookingRequest {
            date,
            slot,
            resource,
            resource_id,
        };
        let outcome = self.booker.attempt(&request);
        if outcome.is_confirmed() {
            self.record(&request);
        }
        Ok((request, outcome))
    }

    /// Appends a confirmed booking and flushes it at once.
    ///
    /// A failed flush leaves the store dirty, so closing the calendar tries
    /// again.
    fn record(&mut self, request: &BookingRequest) {
        self.calendar
            .append(CalendarEvent::for_booking(&self.settings.event_title, request));
        if let Err(err) = self.calendar.flush() {
            tracing::error!(error = %err, resource = %request.resource, "failed to save booking");
        }
    }
}
