//! CSV export of completed payouts.
//!
//! The export only projects fields that were persisted when the payout was
//! approved. It computes nothing and must not be read back as a source of
//! truth.

use std::io::Write;

use csv::Writer;
use serde::Serialize;

use crate::{Booking, PayoutStatus, ResultEngine};

#[derive(Debug, Serialize)]
struct PayoutRow<'a> {
    booking_number: &'a str,
    pandit_id: &'a str,
    event_date: String,
    dakshina: i64,
    platform_fee: Option<i64>,
    calculated_travel: Option<i64>,
    claimed_travel: Option<i64>,
    food_allowance: i64,
    samagri: i64,
    payout: Option<i64>,
    payment_method: Option<&'static str>,
    transaction_ref: Option<&'a str>,
    payment_date: Option<String>,
    completed_at: Option<String>,
    approved_by: Option<&'a str>,
}

impl<'a> From<&'a Booking> for PayoutRow<'a> {
    fn from(booking: &'a Booking) -> Self {
        Self {
            booking_number: &booking.booking_number,
            pandit_id: booking.pandit_id.as_deref().unwrap_or_default(),
            event_date: booking.event_date.to_rfc3339(),
            dakshina: booking.dakshina_amount.rupees(),
            platform_fee: booking.platform_fee.map(|fee| fee.rupees()),
            calculated_travel: booking.calculated_travel_cost.map(|cost| cost.rupees()),
            claimed_travel: booking.actual_travel_cost.map(|cost| cost.rupees()),
            food_allowance: booking.food_allowance_amount.rupees(),
            samagri: booking.samagri_amount.rupees(),
            payout: booking.payout.amount.map(|amount| amount.rupees()),
            payment_method: booking.payout.method.map(|method| method.as_str()),
            transaction_ref: booking.payout.reference.as_deref(),
            payment_date: booking.payout.payment_date.map(|d| d.to_string()),
            completed_at: booking.payout.completed_at.map(|at| at.to_rfc3339()),
            approved_by: booking.payout.approved_by.as_deref(),
        }
    }
}

/// Writes one row per completed payout in `bookings`, in the given order.
///
/// Returns the number of rows written.
pub fn write_payouts_csv<W: Write>(bookings: &[Booking], out: W) -> ResultEngine<usize> {
    let mut writer = Writer::from_writer(out);
    let mut rows = 0;
    for booking in bookings
        .iter()
        .filter(|b| b.payout.status == PayoutStatus::Completed)
    {
        writer.serialize(PayoutRow::from(booking))?;
        rows += 1;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(rows)
}
