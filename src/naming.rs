//! Download filenames and Indonesian calendar labels.

use chrono::{DateTime, Locale, NaiveDate, NaiveTime, Utc};

fn format_id(date: NaiveDate, fmt: &str) -> String {
    let at_midnight: DateTime<Utc> = date.and_time(NaiveTime::MIN).and_utc();
    at_midnight.format_localized(fmt, Locale::id_ID).to_string()
}

/// Weekday name in Indonesian, e.g. "Sabtu".
pub fn indonesian_weekday(date: NaiveDate) -> String {
    format_id(date, "%A")
}

/// "Sabtu, 17 Oktober 2026".
pub fn indonesian_long_date(date: NaiveDate) -> String {
    format_id(date, "%A, %-d %B %Y")
}

/// Keeps `[A-Za-z0-9_]`; whitespace and dashes become underscores.
pub fn sanitize(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for ch in part.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else if (ch.is_whitespace() || ch == '-') && !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "Tanpa_Nama".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn id_card_filename(name: &str) -> String {
    format!("IDCard_{}.pdf", sanitize(name))
}

pub fn certificate_filename(name: &str) -> String {
    format!("Sertifikat_{}.pdf", sanitize(name))
}

pub fn batch_certificate_filename(participants: usize) -> String {
    format!("Sertifikat_Batch_{participants}_Peserta.pdf")
}

pub fn batch_id_card_filename(participants: usize) -> String {
    format!("IDCard_Batch_{participants}_Peserta.pdf")
}

pub fn roster_filename(field_name: &str, date: NaiveDate) -> String {
    format!(
        "Daftar_Peserta_{}_{}_{}.pdf",
        sanitize(field_name),
        indonesian_weekday(date),
        date.format("%d-%m-%Y")
    )
}

pub fn batch_roster_filename(date: NaiveDate) -> String {
    format!(
        "BATCH_Daftar_Peserta_{}_{}.pdf",
        indonesian_weekday(date),
        date.format("%d-%m-%Y")
    )
}
