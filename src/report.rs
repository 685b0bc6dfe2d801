//! CSV rendering of reconstructed payments.

use crate::domain::{format_day, Payment};
use std::io::Write;

pub const CSV_HEADER: [&str; 3] = ["Date", "Sponsorable", "Amount in US Cents"];

/// Write one CSV row per payment, preceded by a header row.
pub fn write_payments_csv<W: Write>(payments: &[Payment], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for payment in payments {
        csv_writer.write_record([
            format_day(payment.date),
            payment.recipient_login.to_string(),
            payment.amount_in_cents.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Render payments as a CSV string.
pub fn payments_to_csv(payments: &[Payment]) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    write_payments_csv(payments, &mut buf)?;
    String::from_utf8(buf).map_err(|e| {
        csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}
